use std::fmt;
use std::thread;
use std::time::Duration;

use crate::error::{Result, SolveError};
use crate::logger::{ExecutionJournal, LogLevel};

pub trait Sleeper {
    fn sleep(&self, duration: Duration);
}

pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Nonzero exit status of an external command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "exit code {}", self.0)
    }
}

pub fn exit_ok(code: i32) -> Result<(), ExitCode> {
    if code == 0 {
        Ok(())
    } else {
        Err(ExitCode(code))
    }
}

/// Capped exponential backoff.
///
/// `max_attempts == 0` retries forever.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 8,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn fixed(delay: Duration, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: delay,
            max_delay: delay,
            multiplier: 1.0,
        }
    }

    /// Pause before the retry that follows the `failures`-th failure.
    pub fn delay_after(&self, failures: u32) -> Duration {
        let exp = failures.saturating_sub(1).min(63) as i32;
        let scaled = self.base_delay.as_secs_f64() * self.multiplier.max(1.0).powi(exp);
        let capped = scaled.min(self.max_delay.as_secs_f64());
        Duration::from_secs_f64(capped.max(0.0))
    }

    /// Runs `op` until it succeeds or the attempt budget is spent.
    ///
    /// Returns the value together with the number of attempts it took.
    pub fn run<T, E, F>(
        &self,
        operation: &str,
        journal: &mut ExecutionJournal,
        sleeper: &dyn Sleeper,
        mut op: F,
    ) -> Result<(T, u32)>
    where
        E: fmt::Display,
        F: FnMut(u32, &mut ExecutionJournal) -> Result<T, E>,
    {
        let mut attempt = 1;
        loop {
            match op(attempt, journal) {
                Ok(value) => return Ok((value, attempt)),
                Err(err) => {
                    if self.max_attempts != 0 && attempt >= self.max_attempts {
                        journal.log(
                            LogLevel::Error,
                            format!("{operation} failed after {attempt} attempts ({err}). Giving up."),
                        );
                        return Err(SolveError::RetryExhausted {
                            operation: operation.to_string(),
                            attempts: attempt,
                            last_error: err.to_string(),
                        });
                    }

                    let delay = self.delay_after(attempt);
                    journal.log(
                        LogLevel::Warn,
                        format!(
                            "{operation} failed ({err}). Trying after {:.1}s...",
                            delay.as_secs_f64()
                        ),
                    );
                    sleeper.sleep(delay);
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingSleeper {
        pauses: RefCell<Vec<Duration>>,
    }

    impl Sleeper for RecordingSleeper {
        fn sleep(&self, duration: Duration) {
            self.pauses.borrow_mut().push(duration);
        }
    }

    #[test]
    fn backoff_grows_then_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(3),
            multiplier: 2.0,
        };

        assert_eq!(policy.delay_after(1), Duration::from_millis(500));
        assert_eq!(policy.delay_after(2), Duration::from_secs(1));
        assert_eq!(policy.delay_after(3), Duration::from_secs(2));
        assert_eq!(policy.delay_after(4), Duration::from_secs(3));
        assert_eq!(policy.delay_after(40), Duration::from_secs(3));
    }

    #[test]
    fn two_failures_then_success_pauses_twice() {
        let sleeper = RecordingSleeper::default();
        let mut journal = ExecutionJournal::new();
        let codes = [1, 1, 0];

        let ((), attempts) = RetryPolicy::fixed(Duration::from_millis(500), 5)
            .run("submission", &mut journal, &sleeper, |attempt, _| {
                exit_ok(codes[attempt as usize - 1])
            })
            .unwrap();

        assert_eq!(attempts, 3);
        assert_eq!(sleeper.pauses.borrow().len(), 2);
    }

    #[test]
    fn exhaustion_reports_last_error() {
        let sleeper = RecordingSleeper::default();
        let mut journal = ExecutionJournal::new();

        let err = RetryPolicy::fixed(Duration::ZERO, 3)
            .run("download", &mut journal, &sleeper, |_, _| exit_ok(2))
            .unwrap_err();

        match err {
            SolveError::RetryExhausted {
                operation,
                attempts,
                last_error,
            } => {
                assert_eq!(operation, "download");
                assert_eq!(attempts, 3);
                assert_eq!(last_error, "exit code 2");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(sleeper.pauses.borrow().len(), 2);
    }

    #[test]
    fn zero_max_attempts_keeps_trying() {
        let sleeper = RecordingSleeper::default();
        let mut journal = ExecutionJournal::new();

        let (value, attempts) = RetryPolicy::fixed(Duration::ZERO, 0)
            .run("download", &mut journal, &sleeper, |attempt, _| {
                if attempt < 50 {
                    Err(ExitCode(1))
                } else {
                    Ok(attempt)
                }
            })
            .unwrap();

        assert_eq!(value, 50);
        assert_eq!(attempts, 50);
    }
}
