//! Container runtime port (interface).

use std::collections::HashMap;

use crate::domain::ProxySpec;
use crate::error::Result;

/// Port for starting, inspecting and stopping named containers.
///
/// All container creation and removal goes through this trait so that
/// proxy naming and reuse stay in one place. Implementations shell out
/// to a runtime CLI; tests use an in-memory fake.
pub trait ProcessRuntime: Send + Sync {
    /// Start a detached container. Returns the runtime's container ID.
    fn run(&self, spec: &ContainerSpec) -> impl std::future::Future<Output = Result<String>> + Send;

    /// Inspect a container by name. `Ok(None)` when it does not exist.
    fn inspect(
        &self,
        name: &str,
    ) -> impl std::future::Future<Output = Result<Option<ContainerDetails>>> + Send;

    /// Stop a container. Succeeds when no such container exists.
    fn stop(&self, name: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Force-remove a container. Succeeds when no such container exists.
    fn remove(&self, name: &str) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Cheap existence probe. Says nothing about reachability.
    fn exists(&self, name: &str) -> impl std::future::Future<Output = bool> + Send;

    /// Whether the runtime daemon answers at all.
    fn is_available(&self) -> impl std::future::Future<Output = bool> + Send;
}

/// A container to start.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    /// `(host port, container port)` pairs to publish.
    pub published_ports: Vec<(u16, u16)>,
    pub env: Vec<(String, String)>,
    /// `(host path, container path)` bind mounts.
    pub volumes: Vec<(String, String)>,
    pub network: Option<String>,
    /// Remove the container once it exits.
    pub auto_remove: bool,
    /// Arguments passed to the image entrypoint.
    pub args: Vec<String>,
}

impl ContainerSpec {
    /// A TCP relay from `spec.host_port` to `BACKEND_HOST:BACKEND_PORT`.
    pub fn tcp_proxy(spec: &ProxySpec, image: &str) -> Self {
        Self {
            name: spec.name.clone(),
            image: image.to_string(),
            published_ports: vec![(spec.host_port, spec.backend_port)],
            env: vec![
                ("BACKEND_HOST".to_string(), spec.backend.host.clone()),
                ("BACKEND_PORT".to_string(), spec.backend_port.to_string()),
            ],
            volumes: Vec::new(),
            network: Some(spec.backend.network.clone()),
            auto_remove: true,
            args: Vec::new(),
        }
    }

    /// Arguments for `<runtime> run`, starting with `run -d`.
    pub fn run_args(&self) -> Vec<String> {
        let mut args = vec!["run".to_string(), "-d".to_string()];

        for (host, container) in &self.volumes {
            args.push("-v".to_string());
            args.push(format!("{}:{}", host, container));
        }
        for (host, container) in &self.published_ports {
            args.push("-p".to_string());
            args.push(format!("{}:{}", host, container));
        }
        if self.auto_remove {
            args.push("--rm".to_string());
        }
        args.push(format!("--name={}", self.name));
        for (key, value) in &self.env {
            args.push("-e".to_string());
            args.push(format!("{}={}", key, value));
        }
        if let Some(network) = &self.network {
            args.push(format!("--network={}", network));
        }

        args.push(self.image.clone());
        args.extend(self.args.iter().cloned());
        args
    }
}

/// What the runtime reports about an existing container.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContainerDetails {
    pub name: String,
    pub running: bool,
    /// TCP container port -> published host ports.
    pub port_bindings: HashMap<u16, Vec<u16>>,
    pub env: HashMap<String, String>,
    pub network_mode: Option<String>,
}

impl ContainerDetails {
    /// First host port published for a TCP container port.
    pub fn host_port_for(&self, container_port: u16) -> Option<u16> {
        self.port_bindings
            .get(&container_port)
            .and_then(|ports| ports.iter().copied().find(|p| *p != 0))
    }

    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }
}
