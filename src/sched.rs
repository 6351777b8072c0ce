//! Treatment scheduler
//!
//! Drives the ordered treatment plan to completion: builds the images,
//! walks the environment through each phase's collector configuration, and
//! times N fresh-container repetitions per treatment. Whatever happens
//! mid-plan, every resource created so far is torn down before control
//! returns to the caller.

use std::path::Path;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::image::{ImageBuilder, ImageSpec};
use crate::plan::{BenchConfig, Treatment};
use crate::report::{SampleSeries, TreatmentOutcome};
use crate::runtime::ContainerRuntime;

/// Executes one benchmark: a full treatment plan against one target image.
pub struct Scheduler<'a, R: ContainerRuntime> {
    runtime: &'a R,
    config: &'a BenchConfig,
    plan: Vec<Treatment>,
}

impl<'a, R: ContainerRuntime> Scheduler<'a, R> {
    /// Scheduler over the canonical four-phase plan.
    #[must_use]
    pub fn new(runtime: &'a R, config: &'a BenchConfig) -> Self {
        Self::with_plan(runtime, config, crate::plan::canonical_plan())
    }

    /// Scheduler over a caller-supplied plan. Used by tests to run tiny
    /// plans with small repetition counts.
    #[must_use]
    pub fn with_plan(runtime: &'a R, config: &'a BenchConfig, plan: Vec<Treatment>) -> Self {
        Self {
            runtime,
            config,
            plan,
        }
    }

    /// Build both images and execute the plan.
    ///
    /// Teardown of everything provisioned runs on every exit path; the
    /// first fatal error is returned after cleanup.
    ///
    /// # Errors
    ///
    /// Any [`Error::Build`], [`Error::Provision`], [`Error::RuntimeFailure`]
    /// or [`Error::Timeout`] aborts the remaining plan.
    pub async fn run(
        &self,
        collector_context: &Path,
        target_context: &Path,
    ) -> Result<Vec<TreatmentOutcome>> {
        let builder = ImageBuilder::new(self.runtime);
        builder
            .build(&ImageSpec::new(collector_context, self.config.collector_image()))
            .await?;
        builder
            .build(&ImageSpec::new(target_context, self.config.target_image()))
            .await?;

        let mut env = Environment::new(self.runtime, self.config);
        let outcome = self.execute_plan(&mut env).await;
        let report = env.teardown().await;
        if !report.is_clean() {
            warn!(
                "{} resource(s) could not be removed; they may need manual cleanup",
                report.failures.len()
            );
        }
        outcome
    }

    async fn execute_plan(
        &self,
        env: &mut Environment<'a, R>,
    ) -> Result<Vec<TreatmentOutcome>> {
        let mut outcomes = Vec::with_capacity(self.plan.len());
        for treatment in &self.plan {
            info!("treatment {}", treatment.name);
            self.prepare_environment(env, treatment).await?;
            let samples = self.run_treatment(env, treatment).await?;
            outcomes.push(TreatmentOutcome {
                treatment: *treatment,
                samples,
            });
        }
        Ok(outcomes)
    }

    /// Bring the environment into the shape the treatment requires.
    ///
    /// Collector-backed treatments get the shared network plus a freshly
    /// created collector of the right variant; collector-less treatments
    /// get the collector and network removed first so nothing is reachable.
    async fn prepare_environment(
        &self,
        env: &mut Environment<'a, R>,
        treatment: &Treatment,
    ) -> Result<()> {
        if treatment.collector.requires_collector() {
            env.create_network().await?;
            if env.handle().collector_id.is_some() {
                if let Err(e) = env.remove_collector().await {
                    warn!("stale collector not removed: {e}");
                }
            }
            env.create_collector(treatment.collector).await?;
            env.connect_collector().await?;
            env.start_collector().await?;
        } else {
            if let Err(e) = env.remove_collector().await {
                warn!("collector not removed before collector-less phase: {e}");
            }
            if let Err(e) = env.remove_network().await {
                warn!("network not removed before collector-less phase: {e}");
            }
        }
        Ok(())
    }

    async fn run_treatment(
        &self,
        env: &mut Environment<'a, R>,
        treatment: &Treatment,
    ) -> Result<SampleSeries> {
        let mut samples = SampleSeries::new();
        for repetition in 1..=self.config.repetitions {
            info!(
                ">>> {} repetition {repetition}/{}",
                treatment.name, self.config.repetitions
            );
            let timed = self.run_repetition(env, treatment).await;
            // The target is removed on every path; containers are never
            // reused across repetitions.
            if let Err(e) = env.remove_target().await {
                warn!("target not removed after repetition: {e}");
            }
            samples.push(timed?);
        }
        Ok(samples)
    }

    async fn run_repetition(
        &self,
        env: &mut Environment<'a, R>,
        treatment: &Treatment,
    ) -> Result<Duration> {
        env.create_target(treatment.profiling).await?;
        if treatment.collector.requires_collector() {
            env.connect_target().await?;
        }
        let started = Instant::now();
        env.start_target().await?;
        match self.config.run_timeout {
            Some(bound) => match tokio::time::timeout(bound, env.wait_target()).await {
                Ok(waited) => waited?,
                Err(_) => return Err(Error::Timeout(bound)),
            },
            None => env.wait_target().await?,
        }
        Ok(started.elapsed())
    }
}
