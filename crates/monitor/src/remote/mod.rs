//! Remote host access: pooled SSH sessions and the Docker-over-SSH
//! adapter.

pub mod docker;
pub mod pool;

pub use docker::RemoteDocker;
pub use pool::{PooledSession, RemoteError, SshConnectionPool};
