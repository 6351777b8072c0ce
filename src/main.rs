//! agentmark CLI
//!
//! Each positional argument names one benchmarked-program build context.
//! All targets share the two comparison groups, so one invocation produces
//! a single delta table across everything it benchmarked.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use agentmark::plan::BenchConfig;
use agentmark::report::{sanitize_target_name, Reporter};
use agentmark::runtime::DockerRuntime;
use agentmark::sched::Scheduler;
use agentmark::stats;

#[derive(Debug, Parser)]
#[command(
    name = "agentmark",
    version,
    about = "Measure profiling agent overhead across collector conditions"
)]
struct Cli {
    /// Build-context directories of the programs to benchmark
    #[arg(value_name = "TARGET_DIR", required = true)]
    targets: Vec<PathBuf>,

    /// Build context of the collector stub
    #[arg(long, default_value = "demos/collector")]
    collector: PathBuf,

    /// Timed repetitions per treatment
    #[arg(short = 'n', long, default_value_t = 5)]
    repetitions: usize,

    /// Significance level of the comparison
    #[arg(long, default_value_t = 0.05)]
    alpha: f64,

    /// Write the delta table to this file as well as stdout
    #[arg(long, value_name = "FILE")]
    out: Option<PathBuf>,

    /// Abort a repetition that runs longer than this many seconds.
    /// Without it a hung target stalls the suite indefinitely.
    #[arg(long, value_name = "SECONDS")]
    run_timeout: Option<u64>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = BenchConfig {
        repetitions: cli.repetitions,
        alpha: cli.alpha,
        run_timeout: cli.run_timeout.map(Duration::from_secs),
        ..BenchConfig::default()
    };

    let runtime = DockerRuntime::connect().await?;
    let scheduler = Scheduler::new(&runtime, &config);
    let mut reporter = Reporter::new();

    for target in &cli.targets {
        let name = sanitize_target_name(&target.display().to_string());
        info!("running {name} benchmark");
        let outcomes = scheduler
            .run(&cli.collector, target)
            .await
            .with_context(|| format!("benchmark of {} failed", target.display()))?;
        reporter.record_target(&name, &outcomes);
    }

    let table = stats::compare(reporter.no_profiling(), reporter.profiling(), config.alpha);
    print!("{table}");
    if let Some(path) = &cli.out {
        std::fs::write(path, table.to_string())
            .with_context(|| format!("unable to write results to {}", path.display()))?;
        info!("results written to {}", path.display());
    }
    Ok(())
}
