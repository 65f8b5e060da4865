use std::path::PathBuf;

use super::{Pipeline, Round, Task};
use crate::assemble::{detector_for, Assembler};
use crate::candidate::filter_completions;
use crate::error::{Result, SolveError};
use crate::logger::{ExecutionJournal, LogLevel};
use crate::problem::{build_prompt, ProblemSource, ProblemTemplate, Prompt};

/// A successful submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submitted {
    pub choice: usize,
    pub round: u32,
    pub attempts: u32,
    pub artifact: PathBuf,
}

impl<'a> Pipeline<'a> {
    /// Requests `n` completions and filters them to distinct candidates.
    pub fn generate_round(
        &self,
        prompt: &Prompt,
        signature: &str,
        n: usize,
        run: &str,
        number: u32,
        journal: &mut ExecutionJournal,
    ) -> Result<Round> {
        journal.log(
            LogLevel::Info,
            format!("Round {number}: requesting completions for prompt {}", prompt.digest()),
        );

        let (completions, _) = self.settings.retry.run(
            "Completion request",
            journal,
            self.sleeper,
            |_, journal| self.provider.complete(&prompt.text, n, journal),
        )?;

        journal.log(LogLevel::Info, "Generating function and fingerprints...");
        let filtered = filter_completions(&completions, signature, self.settings.max_function_len);
        journal.log(
            LogLevel::Info,
            format!(
                "{} of {} completions kept after deduplication.",
                filtered.candidates.len(),
                completions.len()
            ),
        );

        Ok(Round {
            run: run.to_string(),
            number,
            all_functions: filtered.all_functions,
            candidates: filtered.candidates,
        })
    }

    fn assembler_for(&self, template: &ProblemTemplate, prompt: &Prompt) -> Assembler {
        Assembler::new(
            &self.settings.libraries,
            prompt.preamble.clone(),
            template.outro.clone(),
            template.signature.clone(),
            detector_for(self.settings.detector),
        )
    }

    /// One batch, first candidate, submitted without local tests.
    pub fn run_untested(
        &self,
        task: &Task,
        template: &ProblemTemplate,
        journal: &mut ExecutionJournal,
    ) -> Result<Submitted> {
        let prompt = build_prompt(template);
        log::debug!("{}", prompt.text);
        let assembler = self.assembler_for(template, &prompt);
        let run = self.next_run_id();

        let round = self.generate_round(
            &prompt,
            &template.signature,
            self.settings.small_batch,
            &run,
            1,
            journal,
        )?;

        let Some(candidate) = round.candidates.first() else {
            journal.log(LogLevel::Error, "No candidate survived filtering.");
            return Err(SolveError::NoCandidates);
        };

        let code = assembler.assemble(&candidate.raw_text);
        self.submit(task, &round, candidate, &code, journal)
    }

    /// Generates rounds until a candidate passes the sample tests, then
    /// submits it. Bounded by `max_rounds` unless that is zero.
    pub fn run_tested(
        &self,
        task: &Task,
        template: &ProblemTemplate,
        journal: &mut ExecutionJournal,
    ) -> Result<Submitted> {
        let prompt = build_prompt(template);
        log::debug!("{}", prompt.text);
        let assembler = self.assembler_for(template, &prompt);
        let n = self.settings.batch_size(&task.problem);
        let max_rounds = self.settings.max_rounds;
        let run = self.next_run_id();

        let mut number = 0;
        loop {
            if max_rounds != 0 && number >= max_rounds {
                journal.log(
                    LogLevel::Error,
                    format!("No candidate passed within {number} rounds. Giving up."),
                );
                return Err(SolveError::RoundBudgetExhausted { rounds: number });
            }
            number += 1;

            let round =
                self.generate_round(&prompt, &template.signature, n, &run, number, journal)?;
            if round.candidates.is_empty() {
                journal.log(LogLevel::Warn, "No candidates in this round. Regenerating...");
                continue;
            }

            let report = self.verify_round(task, &round, &assembler, journal)?;
            match report.accepted {
                Some(accepted) => {
                    return self.submit(task, &round, &accepted.candidate, &accepted.code, journal);
                }
                None => journal.log(
                    LogLevel::Warn,
                    format!(
                        "All {} candidates of round {number} failed. Regenerating...",
                        report.attempted.len()
                    ),
                ),
            }
        }
    }

    /// Runs the configured flow for an already fetched problem.
    pub fn run(
        &self,
        task: &Task,
        template: &ProblemTemplate,
        journal: &mut ExecutionJournal,
    ) -> Result<Submitted> {
        journal.log(
            LogLevel::Info,
            format!(
                "job started (contest = {}, problem id = {})",
                task.contest, task.problem
            ),
        );

        if self.settings.verify {
            self.run_tested(task, template, journal)
        } else {
            self.run_untested(task, template, journal)
        }
    }

    pub fn solve(
        &self,
        source: &dyn ProblemSource,
        task: &Task,
        journal: &mut ExecutionJournal,
    ) -> Result<Submitted> {
        let template = source.fetch(&task.contest, &task.problem)?;
        self.run(task, &template, journal)
    }
}
