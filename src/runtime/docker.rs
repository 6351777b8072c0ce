//! Docker Engine implementation of the runtime seam

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, LogsOptions, RemoveContainerOptions, StartContainerOptions,
    WaitContainerOptions,
};
use bollard::errors::Error as DockerError;
use bollard::image::{BuildImageOptions, RemoveImageOptions};
use bollard::models::{EndpointSettings, HostConfig};
use bollard::network::{ConnectNetworkOptions, CreateNetworkOptions};
use bollard::Docker;
use futures_util::StreamExt;

use super::{ContainerRuntime, ContainerSpec};
use crate::error::{Error, Result};

/// CPU scheduler period for the quota below, in microseconds.
const CPU_PERIOD: i64 = 100_000;
/// CPU quota equal to one full period: exactly one core's worth of time.
const CPU_QUOTA: i64 = 100_000;
/// The single core every benchmark container is pinned to.
const CPUSET_CPUS: &str = "0";
/// Profiling agents under test need low-level process instrumentation.
const PTRACE_CAPABILITY: &str = "SYS_PTRACE";

/// Container engine access over one shared Docker connection.
///
/// Every container is created pinned to core 0 with a one-core quota so
/// cross-run variance from host scheduling is minimized, and with the
/// ptrace capability required by profiling agents.
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect to the local Docker daemon and negotiate the API version.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Provision`] if the daemon is unreachable.
    pub async fn connect() -> Result<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| Error::Provision(format!("unable to connect to Docker daemon: {e}")))?;
        let docker = docker
            .negotiate_version()
            .await
            .map_err(|e| Error::Provision(format!("API version negotiation failed: {e}")))?;
        Ok(Self { docker })
    }

    /// Wrap an already-connected client. Useful for non-default endpoints.
    #[must_use]
    pub const fn new(docker: Docker) -> Self {
        Self { docker }
    }

    fn isolation_host_config() -> HostConfig {
        HostConfig {
            cap_add: Some(vec![PTRACE_CAPABILITY.to_string()]),
            cpu_period: Some(CPU_PERIOD),
            cpu_quota: Some(CPU_QUOTA),
            cpuset_cpus: Some(CPUSET_CPUS.to_string()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn remove_image(&self, tag: &str) -> Result<()> {
        let options = RemoveImageOptions {
            noprune: true,
            ..Default::default()
        };
        match self.docker.remove_image(tag, Some(options), None).await {
            Ok(_) => Ok(()),
            // A tag that was never built is fine; eviction only has to
            // guarantee the upcoming build cannot serve a stale image.
            Err(DockerError::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(()),
            Err(e) => Err(Error::Build(format!("unable to remove image {tag}: {e}"))),
        }
    }

    async fn build_image(&self, tag: &str, context_archive: Vec<u8>) -> Result<()> {
        let options = BuildImageOptions::<String> {
            t: tag.to_string(),
            rm: true,
            ..Default::default()
        };
        let mut stream = self
            .docker
            .build_image(options, None, Some(context_archive.into()));

        // The daemon streams progress messages and reports most build
        // failures in-band, not as transport errors. The last message must
        // carry the success marker or the build did not complete.
        let mut last_message = String::new();
        while let Some(update) = stream.next().await {
            let info =
                update.map_err(|e| Error::Build(format!("build of {tag} failed: {e}")))?;
            if let Some(error) = info.error {
                return Err(Error::Build(format!("build of {tag} failed: {error}")));
            }
            if let Some(message) = info.stream {
                if !message.trim().is_empty() {
                    tracing::debug!(target: "agentmark::build", "{}", message.trim_end());
                    last_message = message;
                }
            }
        }
        if !last_message.contains("Successfully") {
            return Err(Error::Build(format!(
                "unexpected last message when building {tag}: {}",
                last_message.trim_end()
            )));
        }
        Ok(())
    }

    async fn create_network(&self, name: &str) -> Result<String> {
        let options = CreateNetworkOptions::<String> {
            name: name.to_string(),
            ..Default::default()
        };
        let response = self
            .docker
            .create_network(options)
            .await
            .map_err(|e| Error::Provision(format!("unable to create network {name}: {e}")))?;
        if let Some(warning) = response.warning.as_deref() {
            if !warning.is_empty() {
                tracing::warn!("network {name}: {}", warning);
            }
        }
        Ok(response.id.unwrap_or_default())
    }

    async fn remove_network(&self, network_id: &str) -> Result<()> {
        self.docker
            .remove_network(network_id)
            .await
            .map_err(|e| Error::Teardown(format!("unable to remove network: {e}")))
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
        let exposed_ports = spec.exposed_port.map(|port| {
            let mut ports = std::collections::HashMap::new();
            ports.insert(format!("{port}/tcp"), std::collections::HashMap::new());
            ports
        });
        let config = Config::<String> {
            image: Some(spec.image.clone()),
            env: Some(spec.env.clone()),
            exposed_ports,
            host_config: Some(Self::isolation_host_config()),
            ..Default::default()
        };
        let response = self
            .docker
            .create_container(None::<CreateContainerOptions<String>>, config)
            .await
            .map_err(|e| {
                Error::Provision(format!("unable to create container from {}: {e}", spec.image))
            })?;
        Ok(response.id)
    }

    async fn connect_network(
        &self,
        network_id: &str,
        container_id: &str,
        alias: &str,
    ) -> Result<()> {
        let options = ConnectNetworkOptions {
            container: container_id.to_string(),
            endpoint_config: EndpointSettings {
                aliases: Some(vec![alias.to_string()]),
                ..Default::default()
            },
        };
        self.docker
            .connect_network(network_id, options)
            .await
            .map_err(|e| Error::Provision(format!("unable to connect {alias} to network: {e}")))
    }

    async fn start_container(&self, container_id: &str) -> Result<()> {
        self.docker
            .start_container(container_id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| Error::Provision(format!("unable to start container: {e}")))
    }

    async fn wait_container(&self, container_id: &str) -> Result<i64> {
        let options = WaitContainerOptions {
            condition: "not-running".to_string(),
        };
        let mut stream = self.docker.wait_container(container_id, Some(options));
        match stream.next().await {
            Some(Ok(response)) => Ok(response.status_code),
            // bollard folds a non-zero exit status into this error variant;
            // the exit code is still a normal wait outcome for us.
            Some(Err(DockerError::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) => Err(Error::Provision(format!("wait failed: {e}"))),
            None => Err(Error::Provision(
                "wait stream ended before the container exited".to_string(),
            )),
        }
    }

    async fn container_logs(&self, container_id: &str) -> Result<String> {
        let options = LogsOptions::<String> {
            stdout: true,
            ..Default::default()
        };
        let mut stream = self.docker.logs(container_id, Some(options));
        let mut captured = String::new();
        while let Some(chunk) = stream.next().await {
            let output = chunk
                .map_err(|e| Error::Provision(format!("unable to read container logs: {e}")))?;
            captured.push_str(&String::from_utf8_lossy(&output.into_bytes()));
        }
        Ok(captured)
    }

    async fn remove_container(&self, container_id: &str) -> Result<()> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        self.docker
            .remove_container(container_id, Some(options))
            .await
            .map_err(|e| Error::Teardown(format!("unable to remove container: {e}")))
    }
}
