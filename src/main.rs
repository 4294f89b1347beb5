//! chainrun - CLI

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use chainrun::runtime::scheduler::{
    AsyncFunction, AsyncRunner, AsyncRunnerExt, CurrentThreadAsyncRunner, RunnerRef,
};
use chainrun::util::config::{load_config, load_config_from, RuntimeConfig};
use chainrun::util::logger::{self, LogLevel};
use chainrun::{NAME, VERSION};

/// Drive runner-based task chains from the command line
#[derive(Parser, Debug)]
#[command(name = "chainrun")]
#[command(version = VERSION)]
#[command(about = NAME, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Config file (defaults to CHAINRUN_CONFIG or ~/.config/chainrun/config.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pass a value across a chain of runners, draining one hop at a time
    Chain {
        /// Number of runners in the chain
        #[arg(long, default_value_t = 3)]
        hops: usize,

        /// Starting value; each hop adds one
        #[arg(long, default_value_t = 0)]
        value: u64,
    },

    /// Schedule tasks that keep scheduling follow-ups on the same runner
    Fanout {
        /// Top-level tasks
        #[arg(long, default_value_t = 4)]
        tasks: usize,

        /// Follow-ups each task schedules, one after another
        #[arg(long, default_value_t = 3)]
        depth: usize,
    },

    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config_from(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => load_config().context("Failed to load config")?,
    };

    let level = if args.verbose {
        LogLevel::Debug
    } else {
        config
            .log
            .level
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?
    };
    logger::init_with_level(level);

    match args.command {
        Commands::Chain { hops, value } => run_chain(&config, hops, value),
        Commands::Fanout { tasks, depth } => run_fanout(&config, tasks, depth),
        Commands::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
    }
}

fn new_runner(
    config: &RuntimeConfig,
    index: usize,
) -> RunnerRef {
    let runner = CurrentThreadAsyncRunner::from_config(config);
    match &config.runner.name {
        Some(name) => runner.named(format!("{}-{}", name, index)).shared(),
        None => runner.shared(),
    }
}

fn print_counts(runners: &[RunnerRef]) {
    let counts: Vec<String> = runners
        .iter()
        .map(|r| format!("{}={}", r.name(), r.scheduled_task_count()))
        .collect();
    println!("  scheduled: [{}]", counts.join(", "));
}

fn run_chain(
    config: &RuntimeConfig,
    hops: usize,
    value: u64,
) -> Result<()> {
    if hops == 0 {
        bail!("--hops must be at least 1");
    }

    let runners: Vec<RunnerRef> = (0..hops).map(|i| new_runner(config, i)).collect();

    let first = runners[0].schedule_named("hop-0", move || value);
    let mut last: AsyncFunction<u64> = first.clone();
    for runner in &runners[1..] {
        last = last
            .then_on_with(Some(runner), Some(|v: &u64| v + 1))
            .context("continuation was not created")?;
    }

    println!("before draining:");
    println!("  paused on first task: {}", first.paused_task_count());
    print_counts(&runners);

    for runner in &runners {
        runner.await_all();
        println!("after draining {}:", runner.name());
        print_counts(&runners);
    }

    let result = last.wait().context("chain failed")?;
    println!("result: {}", result);
    Ok(())
}

fn schedule_level(
    runner: &RunnerRef,
    remaining: usize,
    counter: Arc<AtomicUsize>,
) {
    let next = runner.clone();
    runner.schedule(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        if remaining > 0 {
            schedule_level(&next, remaining - 1, counter);
        }
    });
}

fn run_fanout(
    config: &RuntimeConfig,
    tasks: usize,
    depth: usize,
) -> Result<()> {
    let runner = new_runner(config, 0);
    let counter = Arc::new(AtomicUsize::new(0));

    for _ in 0..tasks {
        schedule_level(&runner, depth, counter.clone());
    }
    println!("queued before drain: {}", runner.scheduled_task_count());

    runner.await_all();

    let stats = runner.stats().snapshot();
    println!("bodies run: {}", counter.load(Ordering::SeqCst));
    println!(
        "scheduled={} completed={} failed={} drains={}",
        stats.tasks_scheduled, stats.tasks_completed, stats.tasks_failed, stats.drains
    );
    Ok(())
}
