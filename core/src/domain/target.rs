//! The Service whose port must become reachable from the host.

use k8s_openapi::api::core::v1::Service;
use serde::{Deserialize, Serialize};

/// A port declared on the target Service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetPort {
    pub name: Option<String>,
    pub port: u16,
    /// Allocated NodePort, if the Service is of type NodePort or LoadBalancer.
    pub node_port: Option<u16>,
}

/// Ports of the Service that fronts the virtual cluster's API server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExposureTarget {
    pub name: String,
    pub namespace: String,
    pub ports: Vec<TargetPort>,
}

impl ExposureTarget {
    /// Reads name, namespace and declared ports of a Service object.
    ///
    /// Ports outside the `u16` range are dropped.
    pub fn from_service(service: &Service) -> Self {
        let ports = service
            .spec
            .as_ref()
            .and_then(|spec| spec.ports.as_ref())
            .map(|ports| {
                ports
                    .iter()
                    .filter_map(|p| {
                        Some(TargetPort {
                            name: p.name.clone(),
                            port: u16::try_from(p.port).ok()?,
                            node_port: p.node_port.and_then(|n| u16::try_from(n).ok()),
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            name: service.metadata.name.clone().unwrap_or_default(),
            namespace: service.metadata.namespace.clone().unwrap_or_default(),
            ports,
        }
    }

    /// The only declared port. `None` when the Service declares zero or
    /// several ports, which exposure does not support.
    pub fn single_port(&self) -> Option<&TargetPort> {
        match self.ports.as_slice() {
            [port] => Some(port),
            _ => None,
        }
    }

    /// NodePort of the only declared port.
    pub fn node_port(&self) -> Option<u16> {
        self.single_port().and_then(|p| p.node_port)
    }
}
