//! Experiment environment lifecycle
//!
//! One [`Environment`] owns the ephemeral network and the collector/target
//! containers that make up a single isolated experiment cell. Creation
//! operations record identifiers in the [`ResourceHandle`]; removal
//! operations are guarded by presence checks and clear the field only on
//! success, so teardown can always be re-attempted and an empty identifier
//! is never passed to the engine.

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::plan::{BenchConfig, CollectorVariant};
use crate::runtime::{ContainerRuntime, ContainerSpec};

/// Network alias under which the collector is resolvable by the target.
pub const COLLECTOR_ALIAS: &str = "collector";
/// Network alias given to the target container.
pub const TARGET_ALIAS: &str = "target";
/// Boolean-presence flag consumed by the benchmarked program.
pub const PROFILING_ENV: &str = "PROFILING_ENABLE";
/// Response-latency selector consumed by the collector stub.
pub const COLLECTOR_MODE_ENV: &str = "COLLECTOR_RESPONSE_MODE";

/// Identifiers of the resources currently owned by one environment.
///
/// Fields are set on successful creation and cleared on successful removal.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceHandle {
    /// Isolated virtual network, if allocated
    pub network_id: Option<String>,
    /// Collector container, if created
    pub collector_id: Option<String>,
    /// Target container of the current repetition, if created
    pub target_id: Option<String>,
}

/// Which resource a teardown failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// The isolated virtual network
    Network,
    /// The collector container
    Collector,
    /// The target container
    Target,
}

/// One failed removal, recorded instead of aborting teardown.
#[derive(Debug)]
pub struct TeardownFailure {
    /// Resource whose removal failed
    pub resource: ResourceKind,
    /// The removal error
    pub error: Error,
}

/// Outcome of a best-effort teardown pass.
///
/// Failures are collected rather than swallowed so callers and tests can
/// assert on partial-teardown outcomes.
#[derive(Debug, Default)]
pub struct TeardownReport {
    /// Removal failures, in teardown order
    pub failures: Vec<TeardownFailure>,
}

impl TeardownReport {
    /// True when every removal succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn record(&mut self, resource: ResourceKind, result: Result<()>) {
        if let Err(error) = result {
            warn!("teardown of {resource:?} failed: {error}");
            self.failures.push(TeardownFailure { resource, error });
        }
    }
}

/// Lifecycle manager for one experiment cell.
pub struct Environment<'a, R: ContainerRuntime> {
    runtime: &'a R,
    config: &'a BenchConfig,
    handle: ResourceHandle,
}

impl<'a, R: ContainerRuntime> Environment<'a, R> {
    /// Create an empty environment over the given runtime.
    #[must_use]
    pub fn new(runtime: &'a R, config: &'a BenchConfig) -> Self {
        Self {
            runtime,
            config,
            handle: ResourceHandle::default(),
        }
    }

    /// Current resource identifiers.
    #[must_use]
    pub const fn handle(&self) -> &ResourceHandle {
        &self.handle
    }

    /// Allocate the isolated network, reusing one that already exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Provision`] if the engine cannot create the network.
    pub async fn create_network(&mut self) -> Result<()> {
        if self.handle.network_id.is_some() {
            return Ok(());
        }
        let id = self.runtime.create_network(&self.config.bench_id).await?;
        self.handle.network_id = Some(id);
        Ok(())
    }

    /// Instantiate the collector image with the variant's latency selector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Provision`] if a collector already exists (the old
    /// one must be removed first) or if the variant needs no collector.
    pub async fn create_collector(&mut self, variant: CollectorVariant) -> Result<()> {
        if self.handle.collector_id.is_some() {
            return Err(Error::Provision(
                "collector already exists; remove it before recreating".to_string(),
            ));
        }
        let Some(mode) = variant.response_mode() else {
            return Err(Error::Provision(
                "collector variant does not run a collector".to_string(),
            ));
        };
        let spec = ContainerSpec::new(self.config.collector_image())
            .env(format!("{COLLECTOR_MODE_ENV}={mode}"))
            .exposed_port(self.config.collector_port);
        let id = self.runtime.create_container(&spec).await?;
        self.handle.collector_id = Some(id);
        Ok(())
    }

    /// Instantiate the target image, injecting the profiling flag when
    /// `profiling` is set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Provision`] if a target from a previous repetition
    /// is still present.
    pub async fn create_target(&mut self, profiling: bool) -> Result<()> {
        if self.handle.target_id.is_some() {
            return Err(Error::Provision(
                "target already exists; repetitions never reuse containers".to_string(),
            ));
        }
        let mut spec = ContainerSpec::new(self.config.target_image())
            .exposed_port(self.config.collector_port);
        if profiling {
            spec = spec.env(format!("{PROFILING_ENV}=true"));
        }
        let id = self.runtime.create_container(&spec).await?;
        self.handle.target_id = Some(id);
        Ok(())
    }

    /// Attach the collector to the network under its fixed alias.
    pub async fn connect_collector(&mut self) -> Result<()> {
        let (network, container) = self.pairing(ResourceKind::Collector)?;
        self.runtime
            .connect_network(&network, &container, COLLECTOR_ALIAS)
            .await
    }

    /// Attach the target to the network under its fixed alias.
    pub async fn connect_target(&mut self) -> Result<()> {
        let (network, container) = self.pairing(ResourceKind::Target)?;
        self.runtime
            .connect_network(&network, &container, TARGET_ALIAS)
            .await
    }

    fn pairing(&self, which: ResourceKind) -> Result<(String, String)> {
        let network = self
            .handle
            .network_id
            .clone()
            .ok_or_else(|| Error::Provision("no network to connect to".to_string()))?;
        let container = match which {
            ResourceKind::Collector => self.handle.collector_id.clone(),
            ResourceKind::Target => self.handle.target_id.clone(),
            ResourceKind::Network => None,
        }
        .ok_or_else(|| Error::Provision(format!("no {which:?} container to connect")))?;
        Ok((network, container))
    }

    /// Start the collector container.
    pub async fn start_collector(&mut self) -> Result<()> {
        let id = self
            .handle
            .collector_id
            .clone()
            .ok_or_else(|| Error::Provision("no collector to start".to_string()))?;
        self.runtime.start_container(&id).await
    }

    /// Start the target container.
    pub async fn start_target(&mut self) -> Result<()> {
        let id = self
            .handle
            .target_id
            .clone()
            .ok_or_else(|| Error::Provision("no target to start".to_string()))?;
        self.runtime.start_container(&id).await
    }

    /// Block until the target exits.
    ///
    /// # Errors
    ///
    /// A non-zero exit code indicates the benchmarked program itself
    /// malfunctioned; its stdout log is captured and attached to the
    /// returned [`Error::RuntimeFailure`].
    pub async fn wait_target(&mut self) -> Result<()> {
        let id = self
            .handle
            .target_id
            .clone()
            .ok_or_else(|| Error::Provision("no target to wait for".to_string()))?;
        let code = self.runtime.wait_container(&id).await?;
        if code != 0 {
            let log = self
                .runtime
                .container_logs(&id)
                .await
                .unwrap_or_else(|e| format!("<log capture failed: {e}>"));
            return Err(Error::RuntimeFailure { code, log });
        }
        Ok(())
    }

    /// Remove the target container. No-op when none exists.
    pub async fn remove_target(&mut self) -> Result<()> {
        let Some(id) = self.handle.target_id.clone() else {
            return Ok(());
        };
        self.runtime.remove_container(&id).await?;
        self.handle.target_id = None;
        Ok(())
    }

    /// Remove the collector container. No-op when none exists.
    pub async fn remove_collector(&mut self) -> Result<()> {
        let Some(id) = self.handle.collector_id.clone() else {
            return Ok(());
        };
        self.runtime.remove_container(&id).await?;
        self.handle.collector_id = None;
        Ok(())
    }

    /// Remove the network. No-op when none exists.
    pub async fn remove_network(&mut self) -> Result<()> {
        let Some(id) = self.handle.network_id.clone() else {
            return Ok(());
        };
        self.runtime.remove_network(&id).await?;
        self.handle.network_id = None;
        Ok(())
    }

    /// Best-effort removal of everything still owned, innermost-first:
    /// target, then collector, then network. A failed removal never stops
    /// the remaining attempts.
    pub async fn teardown(&mut self) -> TeardownReport {
        info!("tearing down experiment environment");
        let mut report = TeardownReport::default();
        let target = self.remove_target().await;
        report.record(ResourceKind::Target, target);
        let collector = self.remove_collector().await;
        report.record(ResourceKind::Collector, collector);
        let network = self.remove_network().await;
        report.record(ResourceKind::Network, network);
        report
    }
}
