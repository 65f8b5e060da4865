use anyhow::{Context, Result};
use clap::Parser;

use autosolve::artifact::ArtifactRenderer;
use autosolve::config::Config;
use autosolve::judge::OjCli;
use autosolve::llm::CompletionClient;
use autosolve::logger::{ExecutionJournal, LogLevel};
use autosolve::pipeline::{Pipeline, PipelineSettings, Task};
use autosolve::problem::LocalProblemSource;
use autosolve::retry::ThreadSleeper;
use autosolve::schedule;

#[derive(Parser)]
#[command(
    name = "autosolve",
    version,
    about = "Generates, verifies and submits solutions for a contest problem."
)]
struct Cli {
    /// Contest id, e.g. `abc300`
    contest: String,
    /// Problem id within the contest, e.g. `a`
    problem: String,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let cfg = Config::load().context("loading configuration")?;

    let task = Task::new(&cli.contest, &cli.problem, &cfg.task_url_base)
        .context("building the task url")?;
    let source = LocalProblemSource::new(cfg.problems_dir.clone());
    let provider = CompletionClient::new(&cfg).context("building the completion client")?;
    let judge = OjCli::new(cfg.judge_bin.clone());
    let sleeper = ThreadSleeper;
    let renderer = ArtifactRenderer::load(&cfg.template_path, cfg.artifact_dir())
        .with_context(|| format!("loading template {}", cfg.template_path.display()))?;
    let at = cfg.schedule_time().context("parsing schedule_at")?;

    let pipeline = Pipeline::new(
        &provider,
        &judge,
        &sleeper,
        renderer,
        PipelineSettings::from_config(&cfg),
    );

    // Lives as long as the process; scheduled jobs append to it.
    let mut journal = ExecutionJournal::new();
    journal.log(
        LogLevel::Info,
        format!(
            "Loaded config: contest = {}, problem id = {}",
            task.contest, task.problem
        ),
    );
    journal.log(LogLevel::Info, "Waiting for the beginning of the contest...");

    schedule::run_forever(at, cfg.poll_interval(), &sleeper, || {
        match pipeline.solve(&source, &task, &mut journal) {
            Ok(done) => log::info!(
                "submitted candidate {} from round {} after {} attempt(s): {}",
                done.choice,
                done.round,
                done.attempts,
                done.artifact.display()
            ),
            Err(e) => log::error!("job failed: {e}"),
        }
    });

    Ok(())
}
