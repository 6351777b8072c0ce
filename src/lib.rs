//! # agentmark: Profiling-Agent Overhead Benchmark Harness
//!
//! agentmark measures the runtime overhead a profiling agent imposes on a
//! CPU-bound target program under four experimental treatments: a
//! responsive collector, a slow collector, no collector reachable, and no
//! profiling at all. Each treatment runs N times in a fresh, CPU-pinned
//! container on an isolated network; wall-clock durations are rendered as
//! benchmark-record lines and reduced with a two-sample Mann–Whitney test
//! into a baseline-vs-profiling delta table.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use agentmark::plan::BenchConfig;
//! use agentmark::report::Reporter;
//! use agentmark::runtime::DockerRuntime;
//! use agentmark::sched::Scheduler;
//! use std::path::Path;
//!
//! # async fn run() -> agentmark::Result<()> {
//! let runtime = DockerRuntime::connect().await?;
//! let config = BenchConfig::default();
//! let scheduler = Scheduler::new(&runtime, &config);
//! let outcomes = scheduler
//!     .run(Path::new("demos/collector"), Path::new("demos/fibonacci"))
//!     .await?;
//!
//! let mut reporter = Reporter::new();
//! reporter.record_target("fibonacci", &outcomes);
//! let table = agentmark::stats::compare(
//!     reporter.no_profiling(),
//!     reporter.profiling(),
//!     config.alpha,
//! );
//! println!("{table}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod env;
pub mod error;
pub mod image;
pub mod plan;
pub mod report;
pub mod runtime;
pub mod sched;
pub mod stats;

pub use error::{Error, Result};
