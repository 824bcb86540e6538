//! `docker inspect` JSON response parsing.

use std::collections::HashMap;

use serde::Deserialize;

use crate::ports::ContainerDetails;

/// One element of the array printed by `docker inspect`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InspectResponse {
    #[serde(default)]
    pub name: String,
    pub state: Option<InspectState>,
    pub config: Option<InspectConfig>,
    pub host_config: Option<InspectHostConfig>,
    pub network_settings: Option<InspectNetworkSettings>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InspectState {
    #[serde(default)]
    pub running: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InspectConfig {
    pub env: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InspectHostConfig {
    pub network_mode: Option<String>,
    pub port_bindings: Option<PortMap>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InspectNetworkSettings {
    pub ports: Option<PortMap>,
}

/// `"30443/tcp" -> [{"HostIp": "", "HostPort": "11443"}]`. Values may be null.
pub type PortMap = HashMap<String, Option<Vec<PortBinding>>>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PortBinding {
    #[serde(default)]
    pub host_ip: String,
    #[serde(default)]
    pub host_port: String,
}

impl InspectResponse {
    /// Converts the runtime response into the runtime-independent view.
    ///
    /// Requested bindings (`HostConfig`) take precedence; bindings that were
    /// left for the daemon to choose are read from `NetworkSettings`.
    pub fn into_details(self) -> ContainerDetails {
        let mut port_bindings = HashMap::new();
        let requested = self.host_config.as_ref().and_then(|h| h.port_bindings.as_ref());
        let actual = self.network_settings.as_ref().and_then(|n| n.ports.as_ref());
        for map in [actual, requested].into_iter().flatten() {
            for (container_port, ports) in tcp_bindings(map) {
                if !ports.is_empty() {
                    port_bindings.insert(container_port, ports);
                }
            }
        }

        let env = self
            .config
            .and_then(|c| c.env)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|entry| {
                let (key, value) = entry.split_once('=')?;
                Some((key.to_string(), value.to_string()))
            })
            .collect();

        ContainerDetails {
            name: self.name.trim_start_matches('/').to_string(),
            running: self.state.map(|s| s.running).unwrap_or(false),
            port_bindings,
            env,
            network_mode: self.host_config.and_then(|h| h.network_mode),
        }
    }
}

fn tcp_bindings(map: &PortMap) -> impl Iterator<Item = (u16, Vec<u16>)> + '_ {
    map.iter().filter_map(|(key, bindings)| {
        let (port, protocol) = key.split_once('/').unwrap_or((key.as_str(), "tcp"));
        if protocol != "tcp" {
            return None;
        }
        let port = port.parse::<u16>().ok()?;
        let host_ports = bindings
            .iter()
            .flatten()
            .filter_map(|b| b.host_port.parse::<u16>().ok())
            .filter(|p| *p != 0)
            .collect();
        Some((port, host_ports))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROXY_INSPECT: &str = r#"[
      {
        "Id": "4f7c0e",
        "Name": "/vcluster_vc_ns_kind-kind",
        "State": {"Status": "running", "Running": true},
        "Config": {"Env": ["BACKEND_HOST=kind-control-plane", "BACKEND_PORT=30443", "PATH=/usr/bin"]},
        "HostConfig": {
          "NetworkMode": "kind",
          "PortBindings": {"30443/tcp": [{"HostIp": "", "HostPort": "11443"}]}
        },
        "NetworkSettings": {
          "Ports": {"30443/tcp": [{"HostIp": "0.0.0.0", "HostPort": "11443"}], "53/udp": null}
        }
      }
    ]"#;

    #[test]
    fn test_parse_proxy_container() {
        let mut responses: Vec<InspectResponse> = serde_json::from_str(PROXY_INSPECT).unwrap();
        let details = responses.remove(0).into_details();

        assert_eq!(details.name, "vcluster_vc_ns_kind-kind");
        assert!(details.running);
        assert_eq!(details.host_port_for(30443), Some(11443));
        assert_eq!(details.env_var("BACKEND_HOST"), Some("kind-control-plane"));
        assert_eq!(details.network_mode.as_deref(), Some("kind"));
    }

    #[test]
    fn test_parse_dynamic_host_port() {
        let json = r#"[{
          "Name": "/p",
          "HostConfig": {"PortBindings": {"30443/tcp": [{"HostIp": "", "HostPort": ""}]}},
          "NetworkSettings": {"Ports": {"30443/tcp": [{"HostIp": "0.0.0.0", "HostPort": "49153"}]}}
        }]"#;
        let mut responses: Vec<InspectResponse> = serde_json::from_str(json).unwrap();
        let details = responses.remove(0).into_details();
        assert_eq!(details.host_port_for(30443), Some(49153));
        assert!(!details.running);
    }

    #[test]
    fn test_parse_without_bindings() {
        let json = r#"[{"Name": "/bg", "HostConfig": {"NetworkMode": "host", "PortBindings": null}}]"#;
        let mut responses: Vec<InspectResponse> = serde_json::from_str(json).unwrap();
        let details = responses.remove(0).into_details();
        assert!(details.port_bindings.is_empty());
        assert_eq!(details.host_port_for(443), None);
    }
}
