use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use autosolve::artifact::{ArtifactRenderer, DEFAULT_TEMPLATE};
use autosolve::candidate::Completion;
use autosolve::config::Config;
use autosolve::judge::JudgeCli;
use autosolve::llm::CompletionProvider;
use autosolve::logger::{ExecutionJournal, LogLevel};
use autosolve::pipeline::{Pipeline, PipelineSettings, Task};
use autosolve::problem::LocalProblemSource;
use autosolve::retry::{RetryPolicy, Sleeper};
use autosolve::schedule::{run_polling, DailySchedule};
use chrono::{NaiveDate, NaiveTime};
use autosolve::{Result, SolveError};

struct CannedProvider {
    rounds: RefCell<VecDeque<Vec<String>>>,
}

impl CompletionProvider for CannedProvider {
    fn complete(
        &self,
        _prompt: &str,
        _n: usize,
        _journal: &mut ExecutionJournal,
    ) -> Result<Vec<Completion>> {
        let texts = self.rounds.borrow_mut().pop_front().unwrap_or_default();
        Ok(texts
            .into_iter()
            .enumerate()
            .map(|(index, text)| Completion { index, text })
            .collect())
    }
}

/// Passes a program only if it contains `needle`.
struct ContentJudge {
    needle: &'static str,
    submitted: RefCell<Vec<PathBuf>>,
    tested: Cell<usize>,
}

impl JudgeCli for ContentJudge {
    fn download(&self, _url: &str, dir: &Path) -> i32 {
        fs::create_dir_all(dir).map(|_| 0).unwrap_or(1)
    }

    fn test(&self, command: &str, _dir: &Path, _mle: u32, _tle: f64) -> i32 {
        self.tested.set(self.tested.get() + 1);
        let Some(path) = command.strip_prefix("python ") else {
            return 2;
        };
        match fs::read_to_string(path) {
            Ok(src) if src.contains(self.needle) => 0,
            _ => 1,
        }
    }

    fn submit(&self, _url: &str, file: &Path) -> i32 {
        self.submitted.borrow_mut().push(file.to_path_buf());
        0
    }
}

struct NoSleep;

impl Sleeper for NoSleep {
    fn sleep(&self, _: Duration) {}
}

const PROBLEM: &str = r#"
statement = "Given N, print 2N."
signature = "def solve(N: int) -> int:"
outro = """
N = int(input())
solve(N)
"""
"#;

fn setup(work: &Path) -> (LocalProblemSource, PipelineSettings, ArtifactRenderer) {
    let problems = work.join("problems");
    fs::create_dir_all(&problems).unwrap();
    fs::write(problems.join("abc300_b.toml"), PROBLEM).unwrap();

    let mut settings = PipelineSettings::from_config(&Config::default());
    settings.work_dir = work.to_path_buf();
    settings.retry = RetryPolicy::fixed(Duration::ZERO, 3);

    let renderer = ArtifactRenderer::new(DEFAULT_TEMPLATE, work.join("artifacts")).unwrap();
    (LocalProblemSource::new(problems), settings, renderer)
}

#[test]
fn solves_from_a_local_problem_file() {
    let work = tempfile::tempdir().unwrap();
    let (source, settings, renderer) = setup(work.path());

    let provider = CannedProvider {
        rounds: RefCell::new(
            vec![vec![
                "    return N + 1\n".to_string(),
                "    return N  +  1  # same thing\n".to_string(),
                "    return N * 2\n".to_string(),
            ]]
            .into(),
        ),
    };
    let judge = ContentJudge {
        needle: "\n    return N * 2",
        submitted: RefCell::new(Vec::new()),
        tested: Cell::new(0),
    };
    let pipeline = Pipeline::new(&provider, &judge, &NoSleep, renderer, settings);

    let task = Task::new("abc300", "b", "https://atcoder.jp").unwrap();
    let mut journal = ExecutionJournal::new();
    journal.log(LogLevel::Info, "it's a 'quoted' '''run'''");

    let done = pipeline.solve(&source, &task, &mut journal).unwrap();

    // The duplicate of choice 0 is never tested.
    assert_eq!(judge.tested.get(), 2);
    assert_eq!(done.choice, 2);
    assert_eq!(done.round, 1);

    let artifact = fs::read_to_string(&done.artifact).unwrap();
    assert!(artifact.contains("def solve(N: int) -> int:\n    return N * 2\n"));
    assert!(artifact.contains("print(solve(N))"));
    assert!(artifact.contains("it's a 'quoted' 'run'"));
    assert!(!artifact.contains("'''run'''"));
    assert!(artifact.contains("Test passed. Submitting the code..."));
}

#[test]
fn missing_problem_file_is_reported() {
    let work = tempfile::tempdir().unwrap();
    let (source, settings, renderer) = setup(work.path());

    let provider = CannedProvider {
        rounds: RefCell::new(VecDeque::new()),
    };
    let judge = ContentJudge {
        needle: "",
        submitted: RefCell::new(Vec::new()),
        tested: Cell::new(0),
    };
    let pipeline = Pipeline::new(&provider, &judge, &NoSleep, renderer, settings);

    let task = Task::new("abc300", "z", "https://atcoder.jp").unwrap();
    let mut journal = ExecutionJournal::new();
    let err = pipeline.solve(&source, &task, &mut journal).unwrap_err();

    assert!(matches!(err, SolveError::Problem { ref problem, .. } if problem == "z"));
    assert!(judge.submitted.borrow().is_empty());
}

#[test]
fn scheduled_jobs_share_one_journal() {
    let work = tempfile::tempdir().unwrap();
    let (source, settings, renderer) = setup(work.path());

    let provider = CannedProvider {
        rounds: RefCell::new(
            vec![
                vec!["    return N * 2\n".to_string()],
                vec!["    return 2 * N\n".to_string()],
            ]
            .into(),
        ),
    };
    let judge = ContentJudge {
        needle: "\n    return",
        submitted: RefCell::new(Vec::new()),
        tested: Cell::new(0),
    };
    let pipeline = Pipeline::new(&provider, &judge, &NoSleep, renderer, settings);
    let task = Task::new("abc300", "b", "https://atcoder.jp").unwrap();

    let at = NaiveTime::from_hms_opt(21, 0, 0).unwrap();
    let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
    let mut schedule = DailySchedule::starting(at, day.and_hms_opt(20, 0, 0).unwrap());

    let mut journal = ExecutionJournal::new();
    journal.log(LogLevel::Info, "Waiting for the beginning of the contest...");
    let mut polls = 0;
    let mut results = Vec::new();

    run_polling(
        &mut schedule,
        Duration::ZERO,
        &NoSleep,
        || day.and_hms_opt(21, 0, 0).unwrap(),
        || results.push(pipeline.solve(&source, &task, &mut journal).unwrap()),
        || {
            polls += 1;
            polls == 1
        },
    );

    assert_eq!(results.len(), 2);
    assert_ne!(results[0].artifact, results[1].artifact);

    let first = fs::read_to_string(&results[0].artifact).unwrap();
    let second = fs::read_to_string(&results[1].artifact).unwrap();
    assert!(first.contains("return N * 2"));
    assert!(second.contains("return 2 * N"));

    // The second job's artifact still carries the first job's trace.
    assert!(second.contains("Waiting for the beginning of the contest..."));
    assert_eq!(second.matches("job started").count(), 2);
    assert_eq!(second.matches("Submission succeeded.").count(), 1);
}
