//! Forwarding container lifecycle: probe, reuse, create and tear down.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::ExposeSettings;
use crate::domain::{loopback_server, ProxyBackend, ProxyHandle, ProxySpec, ProxyState, VClusterIdentity};
use crate::error::{Error, Result};
use crate::kubeconfig::KubeCredentialSnapshot;
use crate::ports::{ConnectivityVerifier, ContainerSpec, ProcessRuntime};

use super::poll::{poll_until_reachable, PollPolicy};

/// Mount point of the host kubeconfig inside the background proxy.
const BACKGROUND_KUBECONFIG_MOUNT: &str = "/kube-config";

/// Port the vcluster service listens on in the host cluster.
const VCLUSTER_SERVICE_PORT: u16 = 443;

/// Owns every forwarding container this tool starts.
///
/// Containers are keyed by their deterministic name, so at most one proxy
/// exists per virtual cluster and host context.
pub struct ProxyManager<R: ProcessRuntime, V: ConnectivityVerifier> {
    runtime: R,
    verifier: V,
    settings: ExposeSettings,
}

impl<R: ProcessRuntime, V: ConnectivityVerifier> ProxyManager<R, V> {
    pub fn new(runtime: R, verifier: V, settings: ExposeSettings) -> Self {
        Self {
            runtime,
            verifier,
            settings,
        }
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn verifier(&self) -> &V {
        &self.verifier
    }

    pub fn settings(&self) -> &ExposeSettings {
        &self.settings
    }

    pub(crate) fn policy(&self, timeout: Duration) -> PollPolicy {
        PollPolicy::new(
            self.settings.poll_interval(),
            timeout,
            self.settings.request_timeout(),
        )
    }

    /// Inspects `name` and verifies the endpoint it publishes for `backend_port`.
    pub async fn probe(
        &self,
        name: &str,
        backend_port: u16,
        credential: &KubeCredentialSnapshot,
    ) -> Result<ProxyState> {
        let Some(details) = self.runtime.inspect(name).await? else {
            return Ok(ProxyState::Absent);
        };

        let Some(host_port) = details.host_port_for(backend_port) else {
            return Ok(ProxyState::Stale {
                reason: format!("no host port published for {}/tcp", backend_port),
            });
        };

        let server = loopback_server(host_port);
        let policy = self.policy(self.settings.reuse_timeout());
        match poll_until_reachable(&self.verifier, credential, &server, policy).await {
            Ok(()) => {
                let backend = details
                    .env_var("BACKEND_HOST")
                    .zip(details.network_mode.as_deref())
                    .map(|(host, network)| ProxyBackend {
                        host: host.to_string(),
                        network: network.to_string(),
                    });
                Ok(ProxyState::Healthy(ProxyHandle {
                    name: name.to_string(),
                    host_port,
                    backend_port,
                    backend,
                }))
            }
            Err(Error::Timeout { last_error, .. }) => Ok(ProxyState::Stale { reason: last_error }),
            Err(e) => Err(e),
        }
    }

    /// Returns the server URL of a verified proxy named `name`.
    ///
    /// A container that exists but cannot be verified is force-removed
    /// before returning `None`, so a following [`create`](Self::create)
    /// never conflicts with it, whether or not it was started with `--rm`.
    pub async fn find_existing(
        &self,
        name: &str,
        backend_port: u16,
        credential: &KubeCredentialSnapshot,
    ) -> Result<Option<String>> {
        match self.probe(name, backend_port, credential).await? {
            ProxyState::Healthy(handle) => {
                info!(name = %name, server = %handle.server_url(), "Reusing proxy container");
                Ok(Some(handle.server_url()))
            }
            ProxyState::Stale { reason } => {
                warn!(name = %name, reason = %reason, "Removing stale proxy container");
                self.discard(name).await?;
                Ok(None)
            }
            ProxyState::Absent => Ok(None),
        }
    }

    /// Starts a proxy and waits for it to answer. Callers go through
    /// [`ensure`](Self::ensure), which clears stale containers first.
    pub(crate) async fn create(
        &self,
        spec: &ProxySpec,
        credential: &KubeCredentialSnapshot,
    ) -> Result<String> {
        info!(
            name = %spec.name,
            host_port = spec.host_port,
            backend = %spec.backend.host,
            backend_port = spec.backend_port,
            "Starting proxy container"
        );

        let container = ContainerSpec::tcp_proxy(spec, &self.settings.proxy_image);
        self.runtime.run(&container).await?;

        let server = spec.server_url();
        let policy = self.policy(self.settings.proxy_start_timeout());
        poll_until_reachable(&self.verifier, credential, &server, policy).await?;
        Ok(server)
    }

    /// Reuses a verified proxy named `spec.name`, or starts a new one.
    pub async fn ensure(
        &self,
        spec: &ProxySpec,
        credential: &KubeCredentialSnapshot,
    ) -> Result<String> {
        if let Some(server) = self
            .find_existing(&spec.name, spec.backend_port, credential)
            .await?
        {
            return Ok(server);
        }
        self.create(spec, credential).await
    }

    /// Stops the proxy named `name`. Nothing to do when it does not exist.
    pub async fn teardown(&self, name: &str) -> Result<()> {
        if !self.runtime.exists(name).await {
            debug!(name = %name, "No proxy container to stop");
            return Ok(());
        }

        info!(name = %name, "Stopping proxy container");
        self.runtime.stop(name).await
    }

    /// Force-removes a stale proxy. Unlike `stop`, the name is free as
    /// soon as this returns.
    async fn discard(&self, name: &str) -> Result<()> {
        if !self.runtime.exists(name).await {
            return Ok(());
        }
        self.runtime.remove(name).await
    }

    pub async fn exists(&self, name: &str) -> bool {
        self.runtime.exists(name).await
    }

    /// Runs `kubectl port-forward` to the vcluster service in a host-network
    /// container, replacing any previous one, and waits for
    /// `https://127.0.0.1:<local_port>` to answer.
    pub async fn start_background_proxy(
        &self,
        identity: &VClusterIdentity,
        host: &KubeCredentialSnapshot,
        virtual_credential: &KubeCredentialSnapshot,
        local_port: u16,
    ) -> Result<String> {
        let name = identity.background_proxy_name();
        self.cleanup_background_proxy(&name).await?;

        let yaml = host.to_yaml()?;
        let kubeconfig_path = tokio::task::spawn_blocking(move || write_kubeconfig_file(&yaml))
            .await
            .map_err(|e| Error::Io(std::io::Error::other(e)))??;
        let container = ContainerSpec {
            name: name.clone(),
            image: self.settings.background_proxy_image.clone(),
            volumes: vec![(
                kubeconfig_path.display().to_string(),
                BACKGROUND_KUBECONFIG_MOUNT.to_string(),
            )],
            network: Some("host".to_string()),
            args: vec![
                "port-forward".to_string(),
                format!("svc/{}", identity.name),
                format!("{}:{}", local_port, VCLUSTER_SERVICE_PORT),
                "--kubeconfig".to_string(),
                BACKGROUND_KUBECONFIG_MOUNT.to_string(),
                "-n".to_string(),
                identity.namespace.clone(),
            ],
            ..Default::default()
        };

        info!(name = %name, local_port, "Starting background proxy container");
        self.runtime.run(&container).await?;

        let server = loopback_server(local_port);
        let policy = self.policy(self.settings.background_proxy_timeout());
        poll_until_reachable(&self.verifier, virtual_credential, &server, policy).await?;
        Ok(server)
    }

    /// Force-removes the background proxy named `name`, if any.
    pub async fn cleanup_background_proxy(&self, name: &str) -> Result<()> {
        if !self.runtime.exists(name).await {
            return Ok(());
        }

        info!(name = %name, "Removing background proxy container");
        self.runtime.remove(name).await
    }
}

/// Writes a kubeconfig to a fresh file the container user can read.
/// The file outlives this process; the container reads it at startup.
/// Blocking, run it on the blocking pool.
fn write_kubeconfig_file(yaml: &str) -> Result<PathBuf> {
    let mut file = tempfile::Builder::new()
        .prefix("vcexpose-kubeconfig-")
        .suffix(".yaml")
        .tempfile()?;
    file.write_all(yaml.as_bytes())?;
    file.flush()?;

    let (_, path) = file.keep().map_err(|e| Error::Io(e.error))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o666))?;
    }

    Ok(path)
}
