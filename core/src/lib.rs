//! vcexpose Core Library
//!
//! Makes a virtual cluster's API server reachable from the workstation when
//! the host cluster runs on a local distribution. Provides functionality to:
//! - Detect the local distribution from a kubeconfig context name
//! - Pick an exposure strategy per distribution (loopback node port,
//!   forwarding container, minikube node IP)
//! - Start, reuse and tear down forwarding containers with deterministic names
//! - Verify every candidate endpoint with a real, authenticated API request
//!
//! # Architecture
//! This library follows hexagonal architecture (ports & adapters):
//! - `domain`: Pure data models and naming rules
//! - `ports`: Trait definitions (interfaces)
//! - `adapters`: docker CLI and Kubernetes API implementations
//! - `application`: Use case services
//!
//! # Example
//! ```no_run
//! use vcexpose_core::{
//!     DistributionType, DockerCli, ExposeRequest, ExposeSettings, Exposer,
//!     ExposureTarget, KubeCredentialSnapshot, KubeVerifier, TargetPort,
//! };
//!
//! # async fn run() -> vcexpose_core::Result<()> {
//! let host = KubeCredentialSnapshot::read()?;
//! let mut virtual_credential = KubeCredentialSnapshot::read_from("vc.yaml")?;
//! let target = ExposureTarget {
//!     name: "vc".into(),
//!     namespace: "team-a".into(),
//!     ports: vec![TargetPort { name: None, port: 443, node_port: Some(30443) }],
//! };
//!
//! let exposer = Exposer::new(DockerCli::new(), KubeVerifier::new(), ExposeSettings::default());
//! let request = ExposeRequest {
//!     vcluster_name: "vc",
//!     vcluster_namespace: "team-a",
//!     host: &host,
//!     target: &target,
//!     local_port: 11443,
//! };
//! let distribution = DistributionType::detect(host.current_context().unwrap_or_default());
//! let exposure = exposer.expose(distribution, &request, &mut virtual_credential).await?;
//! println!("{:?}", exposure.server());
//! # Ok(())
//! # }
//! ```

// Hexagonal architecture layers
pub mod adapters;
pub mod application;
pub mod domain;
pub mod ports;

pub mod config;
pub mod error;
pub mod kubeconfig;

#[cfg(test)]
mod testing;

// Re-export domain types (primary API)
pub use domain::{
    background_proxy_name, context_name, loopback_server, parse_context_name, DistributionType,
    ExposureTarget, ParsedContextName, ProxyBackend, ProxyHandle, ProxySpec, ProxyState,
    TargetPort, VClusterIdentity,
};

// Re-export other commonly used types
pub use adapters::{DockerCli, KubeVerifier};
pub use application::{cleanup_local, ExposeRequest, Exposer, Exposure, PollPolicy, ProxyManager};
pub use config::{ExposeSettings, SettingsStore};
pub use error::{Error, Result};
pub use kubeconfig::KubeCredentialSnapshot;
pub use ports::{ConnectivityVerifier, ProcessRuntime, Reachability};
