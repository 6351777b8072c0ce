//! Image builder
//!
//! Turns a directory containing a Dockerfile into a tagged, runnable image.
//! Any image already registered under the tag is evicted first so a stale
//! artifact can never satisfy the build; layer caching still makes the
//! rebuild fast when nothing changed.

use std::path::Path;

use tracing::info;

use crate::error::{Error, Result};
use crate::runtime::ContainerRuntime;

/// One image build request: a build-context directory and the tag the
/// resulting image is registered under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSpec {
    /// Directory containing the Dockerfile and build context
    pub source_path: std::path::PathBuf,
    /// Tag the built image is registered under
    pub tag: String,
}

impl ImageSpec {
    /// Spec for building `source_path` under `tag`.
    #[must_use]
    pub fn new(source_path: impl Into<std::path::PathBuf>, tag: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            tag: tag.into(),
        }
    }
}

/// Builds images through a [`ContainerRuntime`].
pub struct ImageBuilder<'a, R: ContainerRuntime> {
    runtime: &'a R,
}

impl<'a, R: ContainerRuntime> ImageBuilder<'a, R> {
    /// Create a builder over the given runtime.
    #[must_use]
    pub const fn new(runtime: &'a R) -> Self {
        Self { runtime }
    }

    /// Build the image and register it under the requested tag.
    ///
    /// The stale-tag eviction is unconditional: it runs whether or not an
    /// image currently exists under the tag, and a missing image is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Build`] on any archive or build failure. Build
    /// failures are fatal to the whole benchmark and are never retried.
    pub async fn build(&self, spec: &ImageSpec) -> Result<()> {
        info!(
            "building image {} from {}",
            spec.tag,
            spec.source_path.display()
        );
        self.runtime.remove_image(&spec.tag).await?;
        let archive = archive_context(&spec.source_path)?;
        self.runtime.build_image(&spec.tag, archive).await
    }
}

/// Archive a build-context directory into an uncompressed tar stream the
/// build endpoint accepts.
fn archive_context(source_path: &Path) -> Result<Vec<u8>> {
    if !source_path.is_dir() {
        return Err(Error::Build(format!(
            "build context {} is not a directory",
            source_path.display()
        )));
    }
    let mut builder = tar::Builder::new(Vec::new());
    builder
        .append_dir_all(".", source_path)
        .map_err(|e| Error::Build(format!("unable to archive {}: {e}", source_path.display())))?;
    builder
        .into_inner()
        .map_err(|e| Error::Build(format!("unable to finish archive: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_rejects_missing_directory() {
        let err = archive_context(Path::new("/nonexistent/context")).unwrap_err();
        assert!(matches!(err, Error::Build(_)));
    }

    #[test]
    fn test_archive_contains_dockerfile() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("Dockerfile"), "FROM scratch\n").expect("write");
        let bytes = archive_context(dir.path()).expect("archive");

        let mut found = false;
        let mut archive = tar::Archive::new(bytes.as_slice());
        for entry in archive.entries().expect("entries") {
            let entry = entry.expect("entry");
            if entry.path().expect("path").ends_with("Dockerfile") {
                found = true;
            }
        }
        assert!(found, "Dockerfile missing from context archive");
    }
}
