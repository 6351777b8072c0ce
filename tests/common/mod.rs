//! In-memory container runtime for scheduler tests
//!
//! Records every engine call in order and can inject failures at chosen
//! points, so tests can assert that cleanup count equals creation count on
//! every exit path without a Docker daemon.

// Each test binary uses a different subset of the helpers.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use agentmark::error::{Error, Result};
use agentmark::runtime::{ContainerRuntime, ContainerSpec};

/// One recorded engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    RemoveImage(String),
    BuildImage(String),
    CreateNetwork(String),
    RemoveNetwork(String),
    CreateContainer { id: String, image: String },
    Connect { container: String, alias: String },
    Start(String),
    Wait(String),
    Logs(String),
    RemoveContainer(String),
}

#[derive(Debug, Default)]
pub struct MockState {
    pub events: Vec<Event>,
    pub specs: HashMap<String, ContainerSpec>,
    next_container: usize,
    next_network: usize,
}

impl MockState {
    pub fn created_containers(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::CreateContainer { id, .. } => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn removed_containers(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::RemoveContainer(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn started_containers(&self) -> Vec<String> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Start(id) => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, matcher: impl Fn(&Event) -> bool) -> usize {
        self.events.iter().filter(|e| matcher(e)).count()
    }
}

/// Configurable fake engine.
#[derive(Default)]
pub struct MockRuntime {
    pub state: Mutex<MockState>,
    /// Fail the k-th container creation (1-based)
    pub fail_create_at: Option<usize>,
    /// Fail every network removal
    pub fail_remove_network: bool,
    /// Exit code reported for every waited container
    pub exit_code: i64,
    /// Captured log text served for every container
    pub log_text: String,
    /// Simulated run duration of every waited container
    pub wait_delay: Option<Duration>,
}

impl MockRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_exit(code: i64, log: &str) -> Self {
        Self {
            exit_code: code,
            log_text: log.to_string(),
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<Event> {
        self.state.lock().unwrap().events.clone()
    }
}

#[async_trait]
impl ContainerRuntime for MockRuntime {
    async fn remove_image(&self, tag: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.events.push(Event::RemoveImage(tag.to_string()));
        Ok(())
    }

    async fn build_image(&self, tag: &str, _context_archive: Vec<u8>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.events.push(Event::BuildImage(tag.to_string()));
        Ok(())
    }

    async fn create_network(&self, name: &str) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.next_network += 1;
        let id = format!("net-{}", state.next_network);
        state.events.push(Event::CreateNetwork(name.to_string()));
        Ok(id)
    }

    async fn remove_network(&self, network_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if self.fail_remove_network {
            return Err(Error::Teardown("network is busy".to_string()));
        }
        state.events.push(Event::RemoveNetwork(network_id.to_string()));
        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.next_container += 1;
        if self.fail_create_at == Some(state.next_container) {
            return Err(Error::Provision("injected create failure".to_string()));
        }
        let id = format!("ctr-{}", state.next_container);
        state.events.push(Event::CreateContainer {
            id: id.clone(),
            image: spec.image.clone(),
        });
        state.specs.insert(id.clone(), spec.clone());
        Ok(id)
    }

    async fn connect_network(
        &self,
        _network_id: &str,
        container_id: &str,
        alias: &str,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.events.push(Event::Connect {
            container: container_id.to_string(),
            alias: alias.to_string(),
        });
        Ok(())
    }

    async fn start_container(&self, container_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.events.push(Event::Start(container_id.to_string()));
        Ok(())
    }

    async fn wait_container(&self, container_id: &str) -> Result<i64> {
        {
            let mut state = self.state.lock().unwrap();
            state.events.push(Event::Wait(container_id.to_string()));
        }
        if let Some(delay) = self.wait_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.exit_code)
    }

    async fn container_logs(&self, container_id: &str) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.events.push(Event::Logs(container_id.to_string()));
        Ok(self.log_text.clone())
    }

    async fn remove_container(&self, container_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.events.push(Event::RemoveContainer(container_id.to_string()));
        Ok(())
    }
}
