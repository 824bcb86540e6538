//! Adapters layer - External system implementations.
//!
//! This module contains implementations of the port traits defined in `ports`.
//! Each adapter handles communication with external systems.

pub mod docker;
pub mod kube_client;

// Re-export main types for convenience
pub use docker::DockerCli;
pub use kube_client::{client_for, fetch_exposure_target, KubeVerifier};
