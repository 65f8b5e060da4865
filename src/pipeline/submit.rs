use super::{Pipeline, Round, Submitted, Task};
use crate::artifact::{ArtifactName, RenderContext};
use crate::candidate::Candidate;
use crate::error::Result;
use crate::logger::{ExecutionJournal, LogLevel};
use crate::retry::exit_ok;

impl<'a> Pipeline<'a> {
    /// Renders and submits `code`, retrying nonzero exits under the retry
    /// policy. Every attempt writes its own file with the journal as it is
    /// then.
    pub fn submit(
        &self,
        task: &Task,
        round: &Round,
        candidate: &Candidate,
        code: &str,
        journal: &mut ExecutionJournal,
    ) -> Result<Submitted> {
        let name = ArtifactName {
            contest: task.contest.clone(),
            problem: task.problem.clone(),
            run: round.run.clone(),
            round: round.number,
            choice: candidate.choice,
            attempt: None,
        };

        let (artifact, attempts) =
            self.settings
                .retry
                .run("Submission", journal, self.sleeper, |attempt, journal| {
                    let snapshot = journal.snapshot();
                    let name = ArtifactName {
                        attempt: Some(attempt),
                        ..name.clone()
                    };
                    let path = self
                        .renderer
                        .write(
                            &name,
                            &RenderContext {
                                code,
                                execution_log: &snapshot,
                                candidates: &round.all_functions,
                                choice: candidate.choice,
                            },
                        )
                        .map_err(|e| e.to_string())?;

                    journal.log(
                        LogLevel::Info,
                        format!(
                            "Submitting candidate {} (attempt {attempt})...",
                            candidate.choice
                        ),
                    );
                    exit_ok(self.judge.submit(&task.url, &path)).map_err(|e| e.to_string())?;
                    Ok::<_, String>(path)
                })?;

        journal.log(LogLevel::Success, "Submission succeeded.");

        Ok(Submitted {
            choice: candidate.choice,
            round: round.number,
            attempts,
            artifact,
        })
    }
}
