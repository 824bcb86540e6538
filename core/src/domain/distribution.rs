//! Local Kubernetes distributions and their container naming conventions.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// The local distribution a host kubeconfig context points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DistributionType {
    DockerDesktop,
    RancherDesktop,
    Kind,
    Minikube,
    K3d,
    #[default]
    Other,
}

/// Where a proxy container forwards to inside the distribution's network.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProxyBackend {
    /// Container name or IP of the node serving the NodePort.
    pub host: String,
    /// Container network the proxy joins.
    pub network: String,
}

impl DistributionType {
    pub const ALL: [DistributionType; 6] = [
        DistributionType::DockerDesktop,
        DistributionType::RancherDesktop,
        DistributionType::Kind,
        DistributionType::Minikube,
        DistributionType::K3d,
        DistributionType::Other,
    ];

    /// Classifies a host context by its name.
    ///
    /// Each distribution names the contexts it writes in a fixed way.
    /// Anything else, including renamed contexts, is [`DistributionType::Other`].
    pub fn detect(context: &str) -> Self {
        match context {
            "docker-desktop" | "docker-for-desktop" => Self::DockerDesktop,
            "rancher-desktop" => Self::RancherDesktop,
            "minikube" => Self::Minikube,
            c if c.starts_with("kind-") => Self::Kind,
            c if c.starts_with("k3d-") => Self::K3d,
            _ => Self::Other,
        }
    }

    /// Whether this is one of the known local distributions.
    pub fn is_local(&self) -> bool {
        !matches!(self, Self::Other)
    }

    /// Whether exposure goes through a proxy container.
    ///
    /// Minikube only does so with the docker driver; see
    /// [`DistributionType::proxy_backend`].
    pub fn uses_proxy(&self) -> bool {
        matches!(self, Self::Kind | Self::K3d | Self::Minikube)
    }

    /// Derives the node container and network from the host context name.
    pub fn proxy_backend(&self, context: &str) -> Option<ProxyBackend> {
        match self {
            // kind-<cluster> runs <cluster>-control-plane on the "kind" network
            Self::Kind => Some(ProxyBackend {
                host: format!("{}-control-plane", strip(context, "kind-")),
                network: "kind".to_string(),
            }),
            // k3d-<cluster> runs k3d-<cluster>-server-0 on the k3d-<cluster> network
            Self::K3d => {
                let cluster = strip(context, "k3d-");
                Some(ProxyBackend {
                    host: format!("k3d-{}-server-0", cluster),
                    network: format!("k3d-{}", cluster),
                })
            }
            // the docker driver names both the node container and network after the profile
            Self::Minikube => Some(ProxyBackend {
                host: context.to_string(),
                network: context.to_string(),
            }),
            Self::DockerDesktop | Self::RancherDesktop | Self::Other => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DockerDesktop => "docker-desktop",
            Self::RancherDesktop => "rancher-desktop",
            Self::Kind => "kind",
            Self::Minikube => "minikube",
            Self::K3d => "k3d",
            Self::Other => "other",
        }
    }
}

fn strip<'a>(context: &'a str, prefix: &str) -> &'a str {
    context.strip_prefix(prefix).unwrap_or(context)
}

impl fmt::Display for DistributionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistributionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|d| d.as_str() == needle)
            .ok_or_else(|| Error::UnknownDistribution(s.to_string()))
    }
}
