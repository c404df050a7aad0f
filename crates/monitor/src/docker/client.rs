//! Docker client: core struct, constructor, error types.
//!
//! Log-fetch and listing operations live in the sibling `local` module,
//! which adds an `impl DockerClient` block.

use bollard::Docker;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DockerError {
    #[error("Docker connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Container not found: {0}")]
    ContainerNotFound(String),
    #[error("Bollard error: {0}")]
    BollardError(#[from] bollard::errors::Error),
}

#[derive(Debug, Clone)]
pub struct DockerClient {
    /// The bollard Docker client. `pub(super)` so the `local` module
    /// can call bollard APIs directly.
    pub(super) client: Docker,
}

impl DockerClient {
    /// Connect to the local daemon (honours `DOCKER_HOST` when set).
    pub fn new() -> Result<Self, DockerError> {
        let client = Docker::connect_with_defaults()
            .map_err(|e| DockerError::ConnectionFailed(e.to_string()))?;
        Ok(DockerClient { client })
    }

    /// Startup probe: the daemon must answer a ping.
    pub async fn ping(&self) -> Result<(), DockerError> {
        self.client.ping().await?;
        Ok(())
    }
}
