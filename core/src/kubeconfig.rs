//! Immutable kubeconfig snapshots used to attempt connections.
//!
//! Every mutation that might turn out to be wrong (server rewrite, TLS
//! relaxation) is available as a `&self -> Self` method returning a deep
//! copy. The in-place variants are for promoting a change after it has
//! been proven to work.

use std::path::Path;

use kube::config::{KubeConfigOptions, Kubeconfig};
use url::Url;

use crate::error::{Error, Result};

/// An owned copy of a kubeconfig's clusters, users and contexts.
#[derive(Debug, Clone)]
pub struct KubeCredentialSnapshot {
    config: Kubeconfig,
}

impl KubeCredentialSnapshot {
    pub fn new(config: Kubeconfig) -> Self {
        Self { config }
    }

    /// Loads the kubeconfig from `KUBECONFIG` or `~/.kube/config`.
    pub fn read() -> Result<Self> {
        Kubeconfig::read()
            .map(Self::new)
            .map_err(|e| Error::Kubeconfig(e.to_string()))
    }

    pub fn read_from(path: impl AsRef<Path>) -> Result<Self> {
        Kubeconfig::read_from(path)
            .map(Self::new)
            .map_err(|e| Error::Kubeconfig(e.to_string()))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Kubeconfig::from_yaml(text)
            .map(Self::new)
            .map_err(|e| Error::Kubeconfig(e.to_string()))
    }

    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(&self.config)?)
    }

    pub fn kubeconfig(&self) -> &Kubeconfig {
        &self.config
    }

    pub fn current_context(&self) -> Option<&str> {
        self.config.current_context.as_deref()
    }

    /// Switches the current context. Unknown names are rejected.
    pub fn set_current_context(&mut self, context: &str) -> Result<()> {
        if !self.config.contexts.iter().any(|c| c.name == context) {
            return Err(Error::Kubeconfig(format!("context {:?} not found", context)));
        }
        self.config.current_context = Some(context.to_string());
        Ok(())
    }

    /// Raw server URL of the cluster the current context points at.
    pub fn current_server(&self) -> Option<&str> {
        let context_name = self.current_context()?;
        let cluster_name = &self
            .config
            .contexts
            .iter()
            .find(|c| c.name == context_name)?
            .context
            .as_ref()?
            .cluster;

        self.config
            .clusters
            .iter()
            .find(|c| &c.name == cluster_name)?
            .cluster
            .as_ref()?
            .server
            .as_deref()
    }

    /// Deep copy with every cluster entry pointed at `server`.
    pub fn with_server(&self, server: &str) -> Self {
        let mut copy = self.clone();
        copy.set_server(server);
        copy
    }

    /// Points every cluster entry at `server`.
    pub fn set_server(&mut self, server: &str) {
        for named in &mut self.config.clusters {
            if let Some(cluster) = named.cluster.as_mut() {
                cluster.server = Some(server.to_string());
            }
        }
    }

    /// Deep copy with certificate authorities removed and TLS verification
    /// disabled on every cluster entry.
    pub fn relaxed(&self) -> Self {
        let mut copy = self.clone();
        copy.relax_tls();
        copy
    }

    /// Removes certificate authorities and disables TLS verification on
    /// every cluster entry.
    pub fn relax_tls(&mut self) {
        for named in &mut self.config.clusters {
            if let Some(cluster) = named.cluster.as_mut() {
                cluster.certificate_authority_data = None;
                cluster.certificate_authority = None;
                cluster.insecure_skip_tls_verify = Some(true);
            }
        }
    }

    /// Whether every cluster entry has TLS verification disabled and no CA.
    pub fn is_relaxed(&self) -> bool {
        self.config.clusters.iter().all(|named| {
            named.cluster.as_ref().map_or(true, |c| {
                c.insecure_skip_tls_verify == Some(true)
                    && c.certificate_authority_data.is_none()
                    && c.certificate_authority.is_none()
            })
        })
    }

    /// Builds a client configuration for the current context.
    pub async fn client_config(&self) -> Result<kube::Config> {
        kube::Config::from_custom_kubeconfig(self.config.clone(), &KubeConfigOptions::default())
            .await
            .map_err(|e| Error::Kubeconfig(e.to_string()))
    }
}

/// Checks that `server` is an absolute `http(s)://host:port` URL. The port
/// must be written out, even when it is the scheme default.
pub fn validate_server(server: &str) -> Result<Url> {
    let invalid = |reason: String| Error::InvalidServer {
        server: server.to_string(),
        reason,
    };

    let url = Url::parse(server).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "https" | "http") {
        return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    // `Url::port` hides an explicit default port, so look at the text too
    if url.port().is_none() && !has_explicit_port(server) {
        return Err(invalid("missing port".to_string()));
    }

    Ok(url)
}

fn has_explicit_port(server: &str) -> bool {
    let Some((_, rest)) = server.split_once("://") else {
        return false;
    };
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, hp)| hp);
    match host_port.rsplit_once(':') {
        Some((host, port)) => {
            !port.is_empty()
                && port.bytes().all(|b| b.is_ascii_digit())
                && (!host.starts_with('[') || host.ends_with(']'))
        }
        None => false,
    }
}

/// Host part of a server URL, without the port.
pub fn server_host(server: &str) -> Option<String> {
    let url = Url::parse(server).ok()?;
    url.host_str().map(|h| h.to_string())
}
