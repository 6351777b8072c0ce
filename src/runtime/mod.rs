//! Container runtime abstraction
//!
//! The orchestrator talks to the container engine through the
//! [`ContainerRuntime`] trait so the whole treatment plan can be exercised
//! against an in-memory fake in tests. The production implementation,
//! [`DockerRuntime`], wraps a single shared [`bollard::Docker`] connection
//! used for one outstanding request at a time.

mod docker;

pub use docker::DockerRuntime;

use async_trait::async_trait;

use crate::error::Result;

/// Parameters for one container to be created.
///
/// The fixed resource-isolation policy (one pinned CPU core, matching quota,
/// ptrace capability) is applied by the runtime implementation, not carried
/// here: every container of a benchmark run is isolated identically so that
/// elapsed wall-clock time is a fair proxy for CPU-bound work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    /// Image tag to instantiate
    pub image: String,
    /// Environment entries in `KEY=value` form
    pub env: Vec<String>,
    /// TCP port the container exposes, if any
    pub exposed_port: Option<u16>,
}

impl ContainerSpec {
    /// Spec for `image` with no environment and no exposed port.
    #[must_use]
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            env: Vec::new(),
            exposed_port: None,
        }
    }

    /// Add an environment entry.
    #[must_use]
    pub fn env(mut self, entry: impl Into<String>) -> Self {
        self.env.push(entry.into());
        self
    }

    /// Expose a TCP port.
    #[must_use]
    pub const fn exposed_port(mut self, port: u16) -> Self {
        self.exposed_port = Some(port);
        self
    }
}

/// Operations the orchestrator needs from a container engine.
///
/// Error mapping contract: build operations fail with [`crate::Error::Build`],
/// create/connect/start/wait with [`crate::Error::Provision`], and removals
/// with [`crate::Error::Teardown`] so the scheduler can tell fatal failures
/// from best-effort cleanup failures without inspecting message text.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Remove the image registered under `tag`. A missing image is not an
    /// error; the call exists to evict stale tags before a rebuild.
    async fn remove_image(&self, tag: &str) -> Result<()>;

    /// Build an image from a tar archive of a build context and register it
    /// under `tag`. The build log stream must be consumed to completion and
    /// the final message checked for success: a build that ends without a
    /// success marker failed even if the transport reported no error.
    async fn build_image(&self, tag: &str, context_archive: Vec<u8>) -> Result<()>;

    /// Allocate an isolated virtual network and return its identifier.
    async fn create_network(&self, name: &str) -> Result<String>;

    /// Force-remove a network.
    async fn remove_network(&self, network_id: &str) -> Result<()>;

    /// Create a container and return its identifier. The container is
    /// created with the fixed isolation parameters (one CPU core, ptrace).
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String>;

    /// Attach a container to a network under a fixed alias so peers can
    /// resolve it by name.
    async fn connect_network(
        &self,
        network_id: &str,
        container_id: &str,
        alias: &str,
    ) -> Result<()>;

    /// Transition a created container to running.
    async fn start_container(&self, container_id: &str) -> Result<()>;

    /// Block until the container's process terminates and return its exit
    /// code. No timeout is imposed here; bounding the wait is the
    /// scheduler's decision.
    async fn wait_container(&self, container_id: &str) -> Result<i64>;

    /// Capture the container's standard-output log.
    async fn container_logs(&self, container_id: &str) -> Result<String>;

    /// Force-remove a container.
    async fn remove_container(&self, container_id: &str) -> Result<()>;
}
