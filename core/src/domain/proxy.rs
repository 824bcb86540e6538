//! Proxy container handles and lifecycle states.

use std::fmt;

use super::distribution::ProxyBackend;

/// Server URL for a port published on the host loopback interface.
pub fn loopback_server(port: u16) -> String {
    format!("https://127.0.0.1:{}", port)
}

/// Everything needed to start a forwarding container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxySpec {
    /// Deterministic container name, see [`super::naming::context_name`].
    pub name: String,
    /// Port published on the host loopback interface.
    pub host_port: u16,
    /// Port the backend listens on inside the distribution network.
    pub backend_port: u16,
    pub backend: ProxyBackend,
}

impl ProxySpec {
    pub fn server_url(&self) -> String {
        loopback_server(self.host_port)
    }
}

/// A running forwarding container that passed a reachability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyHandle {
    pub name: String,
    pub host_port: u16,
    pub backend_port: u16,
    /// Backend the container forwards to, when it could be read back.
    pub backend: Option<ProxyBackend>,
}

impl ProxyHandle {
    pub fn server_url(&self) -> String {
        loopback_server(self.host_port)
    }
}

/// What inspecting a proxy name found.
///
/// Transitions are driven by the connectivity check alone: a container that
/// exists but cannot be verified is `Stale`, never `Healthy`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyState {
    /// No container with this name.
    Absent,
    /// A container exists but no verified endpoint could be derived from it.
    Stale { reason: String },
    /// A container exists and its published port answers as an API server.
    Healthy(ProxyHandle),
}

impl fmt::Display for ProxyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => f.write_str("absent"),
            Self::Stale { reason } => write!(f, "stale ({})", reason),
            Self::Healthy(handle) => write!(f, "healthy ({})", handle.server_url()),
        }
    }
}
