use std::fs;
use std::io;
use std::path::Path;

use super::{Pipeline, Round, Task};
use crate::artifact::{ArtifactName, RenderContext};
use crate::assemble::Assembler;
use crate::candidate::Candidate;
use crate::error::Result;
use crate::logger::{ExecutionJournal, LogLevel};
use crate::retry::exit_ok;

/// Progress of one verification round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundState {
    Pending,
    TestsDownloaded,
    Verifying(usize),
    Passed(usize),
    Exhausted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Passed,
    /// Test failure or runner error; carries the exit code.
    Failed(i32),
}

impl Verdict {
    pub fn from_exit(code: i32) -> Self {
        if code == 0 {
            Verdict::Passed
        } else {
            Verdict::Failed(code)
        }
    }
}

/// A candidate that passed the sample tests, with the code that passed.
#[derive(Debug, Clone)]
pub struct Accepted {
    pub candidate: Candidate,
    pub code: String,
}

#[derive(Debug, Clone)]
pub struct RoundReport {
    pub state: RoundState,
    /// Choices in the order they were run against the tests.
    pub attempted: Vec<usize>,
    pub accepted: Option<Accepted>,
}

fn advance(state: &mut RoundState, next: RoundState) {
    log::debug!("round state {state:?} -> {next:?}");
    *state = next;
}

fn clear_dir(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

impl<'a> Pipeline<'a> {
    /// Replaces the local test directory with a fresh download.
    pub fn download_tests(&self, task: &Task, journal: &mut ExecutionJournal) -> Result<()> {
        let dir = task.test_dir(&self.settings.work_dir);
        if let Some(parent) = dir.parent() {
            fs::create_dir_all(parent)?;
        }

        self.settings
            .retry
            .run("Test case download", journal, self.sleeper, |_, journal| {
                clear_dir(&dir).map_err(|e| e.to_string())?;
                journal.log(LogLevel::Info, "Downloading test cases...");
                exit_ok(self.judge.download(&task.url, &dir)).map_err(|e| e.to_string())
            })?;

        journal.log(LogLevel::Success, "Test cases downloaded.");
        Ok(())
    }

    /// Renders `code` for `candidate` and runs it against the downloaded
    /// tests.
    pub fn verify(
        &self,
        task: &Task,
        round: &Round,
        candidate: &Candidate,
        code: &str,
        journal: &mut ExecutionJournal,
    ) -> Result<Verdict> {
        let name = ArtifactName {
            contest: task.contest.clone(),
            problem: task.problem.clone(),
            run: round.run.clone(),
            round: round.number,
            choice: candidate.choice,
            attempt: None,
        };

        let snapshot = journal.snapshot();
        let path = self.renderer.write(
            &name,
            &RenderContext {
                code,
                execution_log: &snapshot,
                candidates: &round.all_functions,
                choice: candidate.choice,
            },
        )?;

        let command = format!("{} {}", self.settings.python_bin, path.display());
        let test_dir = task.test_dir(&self.settings.work_dir);

        journal.log(
            LogLevel::Info,
            format!("Verifying candidate {}...", candidate.choice),
        );
        let exit = self.judge.test(
            &command,
            &test_dir,
            self.settings.memory_limit_mb,
            self.settings.time_limit_secs,
        );
        journal.log(
            LogLevel::Info,
            format!("Verification finished. exit code = {exit}"),
        );

        Ok(Verdict::from_exit(exit))
    }

    /// Downloads tests once, then verifies candidates in order until one
    /// passes. Failed candidates are never retried.
    pub fn verify_round(
        &self,
        task: &Task,
        round: &Round,
        assembler: &Assembler,
        journal: &mut ExecutionJournal,
    ) -> Result<RoundReport> {
        let mut state = RoundState::Pending;
        let mut attempted = Vec::with_capacity(round.candidates.len());

        self.download_tests(task, journal)?;
        advance(&mut state, RoundState::TestsDownloaded);

        for candidate in &round.candidates {
            advance(&mut state, RoundState::Verifying(candidate.choice));
            attempted.push(candidate.choice);

            let code = assembler.assemble(&candidate.raw_text);
            match self.verify(task, round, candidate, &code, journal)? {
                Verdict::Passed => {
                    advance(&mut state, RoundState::Passed(candidate.choice));
                    journal.log(LogLevel::Success, "Test passed. Submitting the code...");
                    return Ok(RoundReport {
                        state,
                        attempted,
                        accepted: Some(Accepted {
                            candidate: candidate.clone(),
                            code,
                        }),
                    });
                }
                Verdict::Failed(_) => {
                    journal.log(LogLevel::Info, "Test didn't pass. Trying another candidate...");
                }
            }
        }

        advance(&mut state, RoundState::Exhausted);
        Ok(RoundReport {
            state,
            attempted,
            accepted: None,
        })
    }
}
