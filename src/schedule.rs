//! Once at startup, then daily at a fixed local time.

use std::time::Duration;

use chrono::{Days, Local, NaiveDateTime, NaiveTime};

use crate::retry::Sleeper;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
    next_run: NaiveDateTime,
}

fn following_day(t: NaiveDateTime) -> NaiveDateTime {
    t.checked_add_days(Days::new(1)).unwrap_or(NaiveDateTime::MAX)
}

impl DailySchedule {
    /// First run is today at `at`, or tomorrow if that has already passed.
    pub fn starting(at: NaiveTime, now: NaiveDateTime) -> Self {
        let today = now.date().and_time(at);
        let next_run = if today >= now { today } else { following_day(today) };
        Self { at, next_run }
    }

    pub fn at(&self) -> NaiveTime {
        self.at
    }

    pub fn next_run(&self) -> NaiveDateTime {
        self.next_run
    }

    /// True once per day; the next run moves past `now`.
    pub fn is_due(&mut self, now: NaiveDateTime) -> bool {
        if now < self.next_run {
            return false;
        }
        while self.next_run <= now {
            let next = following_day(self.next_run);
            if next == self.next_run {
                break;
            }
            self.next_run = next;
        }
        true
    }
}

/// Runs `job` immediately, then whenever the schedule is due, checking every
/// `poll` until `keep_going` returns false.
pub fn run_polling(
    schedule: &mut DailySchedule,
    poll: Duration,
    sleeper: &dyn Sleeper,
    mut clock: impl FnMut() -> NaiveDateTime,
    mut job: impl FnMut(),
    mut keep_going: impl FnMut() -> bool,
) {
    job();
    while keep_going() {
        if schedule.is_due(clock()) {
            log::info!("scheduled run at {}", schedule.at().format("%H:%M"));
            job();
        }
        sleeper.sleep(poll);
    }
}

pub fn run_forever(at: NaiveTime, poll: Duration, sleeper: &dyn Sleeper, job: impl FnMut()) {
    let now = || Local::now().naive_local();
    let mut schedule = DailySchedule::starting(at, now());
    log::info!("next run at {}", schedule.next_run().format("%Y-%m-%d %H:%M"));
    run_polling(&mut schedule, poll, sleeper, now, job, || true);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::cell::{Cell, RefCell};

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn day(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, d)
            .unwrap()
            .and_time(at(h, m))
    }

    #[test]
    fn first_run_is_today_when_still_ahead() {
        let s = DailySchedule::starting(at(21, 0), day(1, 9, 30));
        assert_eq!(s.next_run(), day(1, 21, 0));
    }

    #[test]
    fn first_run_is_tomorrow_when_already_passed() {
        let s = DailySchedule::starting(at(21, 0), day(1, 22, 15));
        assert_eq!(s.next_run(), day(2, 21, 0));
    }

    #[test]
    fn due_once_per_day() {
        let mut s = DailySchedule::starting(at(21, 0), day(1, 20, 0));
        assert!(!s.is_due(day(1, 20, 59)));
        assert!(s.is_due(day(1, 21, 0)));
        assert!(!s.is_due(day(1, 21, 0)));
        assert!(!s.is_due(day(2, 20, 0)));
        assert!(s.is_due(day(2, 21, 1)));
    }

    #[test]
    fn missed_days_collapse_into_one_run() {
        let mut s = DailySchedule::starting(at(21, 0), day(1, 20, 0));
        assert!(s.is_due(day(4, 22, 0)));
        assert_eq!(s.next_run(), day(5, 21, 0));
    }

    struct CountingSleeper(Cell<usize>);

    impl Sleeper for CountingSleeper {
        fn sleep(&self, _: Duration) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn job_runs_at_startup_and_when_due() {
        let mut s = DailySchedule::starting(at(21, 0), day(1, 20, 0));
        let times = RefCell::new(vec![day(1, 20, 30), day(1, 21, 0), day(1, 21, 0)].into_iter());
        let runs = Cell::new(0);
        let polls = Cell::new(0);
        let sleeper = CountingSleeper(Cell::new(0));

        run_polling(
            &mut s,
            Duration::from_millis(100),
            &sleeper,
            || times.borrow_mut().next().unwrap(),
            || runs.set(runs.get() + 1),
            || {
                polls.set(polls.get() + 1);
                polls.get() <= 3
            },
        );

        assert_eq!(runs.get(), 2);
        assert_eq!(sleeper.0.get(), 3);
    }
}
