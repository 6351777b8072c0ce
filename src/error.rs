//! Error types for agentmark
//!
//! The taxonomy mirrors the orchestration phases: image build, resource
//! provisioning, the benchmarked run itself, and best-effort teardown.
//! Build, provisioning and runtime failures are fatal and abort the
//! remaining plan; teardown failures are collected and logged only.

use std::time::Duration;

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// agentmark error types
#[derive(Error, Debug)]
pub enum Error {
    /// Image build or context-archival failure. Never retried: a benchmark
    /// cannot proceed with a stale or missing image.
    #[error("image build failed: {0}")]
    Build(String),

    /// Network/container create, connect or start failure. Aborts the
    /// remaining plan after cleanup of everything already provisioned.
    #[error("provisioning failed: {0}")]
    Provision(String),

    /// The benchmarked container exited non-zero. Carries the captured
    /// stdout log so the malfunction can be diagnosed.
    #[error("target exited with code {code}\n--- captured container log ---\n{log}")]
    RuntimeFailure {
        /// Exit code reported by the container runtime
        code: i64,
        /// Captured standard-output log of the failed container
        log: String,
    },

    /// A timed run exceeded the configured bound. Only produced when a
    /// run timeout is explicitly configured; the default is to wait forever.
    #[error("run exceeded the configured timeout of {0:?}")]
    Timeout(Duration),

    /// Resource removal failure. Non-fatal: recorded in the teardown
    /// report while cleanup continues on the remaining resources.
    #[error("teardown failed: {0}")]
    Teardown(String),
}

impl Error {
    /// Whether this error aborts the treatment plan.
    ///
    /// Everything except teardown failures is fatal.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::Teardown(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_teardown_is_not_fatal() {
        assert!(!Error::Teardown("network busy".into()).is_fatal());
        assert!(Error::Build("no Dockerfile".into()).is_fatal());
        assert!(Error::Provision("create failed".into()).is_fatal());
    }

    #[test]
    fn test_runtime_failure_carries_log() {
        let err = Error::RuntimeFailure {
            code: 1,
            log: "panic: out of fib".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("code 1"));
        assert!(msg.contains("panic: out of fib"));
    }
}
