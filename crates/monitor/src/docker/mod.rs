//! Local Docker daemon access: client wrapper and log fetching.

pub mod client;
pub mod local;

pub use client::{DockerClient, DockerError};
