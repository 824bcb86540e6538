//! Per-distribution exposure strategies.
//!
//! Each local distribution reaches a NodePort differently:
//!
//! - docker-desktop, rancher-desktop: node ports are published on loopback
//! - kind, k3d: forwarding container on the cluster network
//! - minikube with a container driver: forwarding container on its network
//! - minikube with a VM driver: node IP directly, TLS verification off
//!
//! Anything else is left to the caller's fallback.

use tracing::{debug, info, warn};

use crate::config::ExposeSettings;
use crate::domain::{
    loopback_server, DistributionType, ExposureTarget, ProxySpec, VClusterIdentity,
};
use crate::error::{Error, Result};
use crate::kubeconfig::{server_host, KubeCredentialSnapshot};
use crate::ports::{ConnectivityVerifier, ProcessRuntime};

use super::poll::poll_until_reachable;
use super::proxy_manager::ProxyManager;
use super::teardown;

/// Result of an exposure attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exposure {
    /// The virtual cluster answers at `server`.
    Exposed { server: String },
    /// No local strategy applies. Not an error; callers fall back to their
    /// own mechanism, such as a port-forward.
    Unsupported,
}

impl Exposure {
    pub fn server(&self) -> Option<&str> {
        match self {
            Self::Exposed { server } => Some(server),
            Self::Unsupported => None,
        }
    }

    pub fn is_exposed(&self) -> bool {
        matches!(self, Self::Exposed { .. })
    }
}

/// Inputs to [`Exposer::expose`].
#[derive(Debug, Clone, Copy)]
pub struct ExposeRequest<'a> {
    pub vcluster_name: &'a str,
    pub vcluster_namespace: &'a str,
    /// Host cluster credential. Its current context names the distribution
    /// and, for minikube, its server carries the node IP.
    pub host: &'a KubeCredentialSnapshot,
    /// The vcluster service as found in the host cluster.
    pub target: &'a ExposureTarget,
    /// Loopback port for forwarding containers.
    pub local_port: u16,
}

impl ExposeRequest<'_> {
    fn host_context(&self) -> Result<&str> {
        self.host
            .current_context()
            .ok_or(Error::MissingCurrentContext)
    }

    fn identity(&self) -> Result<VClusterIdentity> {
        Ok(VClusterIdentity::new(
            self.vcluster_name,
            self.vcluster_namespace,
            self.host_context()?,
        ))
    }
}

/// Picks and runs the exposure strategy for a distribution.
pub struct Exposer<R: ProcessRuntime, V: ConnectivityVerifier> {
    proxies: ProxyManager<R, V>,
}

impl<R: ProcessRuntime, V: ConnectivityVerifier> Exposer<R, V> {
    pub fn new(runtime: R, verifier: V, settings: ExposeSettings) -> Self {
        Self {
            proxies: ProxyManager::new(runtime, verifier, settings),
        }
    }

    pub fn proxies(&self) -> &ProxyManager<R, V> {
        &self.proxies
    }

    /// Makes the virtual cluster reachable from this machine.
    ///
    /// `virtual_credential` is only modified when the minikube direct-IP
    /// strategy succeeds with TLS verification relaxed; the relaxed form is
    /// then kept so the returned server keeps working.
    pub async fn expose(
        &self,
        distribution: DistributionType,
        request: &ExposeRequest<'_>,
        virtual_credential: &mut KubeCredentialSnapshot,
    ) -> Result<Exposure> {
        let Some(port) = request.target.single_port() else {
            debug!(
                service = %request.target.name,
                ports = request.target.ports.len(),
                "Service does not expose exactly one port"
            );
            return Ok(Exposure::Unsupported);
        };
        let Some(node_port) = port.node_port else {
            warn!(
                service = %request.target.name,
                namespace = %request.target.namespace,
                "Service has no node port assigned"
            );
            return Ok(Exposure::Unsupported);
        };

        match distribution {
            DistributionType::DockerDesktop | DistributionType::RancherDesktop => {
                self.expose_loopback(node_port, virtual_credential).await
            }
            DistributionType::Kind | DistributionType::K3d => {
                self.expose_with_proxy(distribution, request, node_port, virtual_credential)
                    .await
            }
            DistributionType::Minikube => {
                let context = request.host_context()?;
                if self.proxies.exists(context).await {
                    self.expose_with_proxy(distribution, request, node_port, virtual_credential)
                        .await
                } else {
                    self.expose_node_ip(request, node_port, virtual_credential)
                        .await
                }
            }
            DistributionType::Other => Ok(Exposure::Unsupported),
        }
    }

    /// Removes whatever [`expose`](Self::expose) left running for `identity`.
    pub async fn cleanup(
        &self,
        identity: &VClusterIdentity,
        distribution: DistributionType,
    ) -> Result<()> {
        teardown::cleanup_local(&self.proxies, identity, distribution).await
    }

    async fn expose_loopback(
        &self,
        node_port: u16,
        virtual_credential: &KubeCredentialSnapshot,
    ) -> Result<Exposure> {
        let server = loopback_server(node_port);
        let policy = self.proxies.policy(self.proxies.settings().direct_timeout());
        poll_until_reachable(self.proxies.verifier(), virtual_credential, &server, policy).await?;
        Ok(Exposure::Exposed { server })
    }

    async fn expose_with_proxy(
        &self,
        distribution: DistributionType,
        request: &ExposeRequest<'_>,
        node_port: u16,
        virtual_credential: &KubeCredentialSnapshot,
    ) -> Result<Exposure> {
        let identity = request.identity()?;
        let Some(backend) = distribution.proxy_backend(&identity.host_context) else {
            return Ok(Exposure::Unsupported);
        };

        let spec = ProxySpec {
            name: identity.context_name(),
            host_port: request.local_port,
            backend_port: node_port,
            backend,
        };
        let server = self.proxies.ensure(&spec, virtual_credential).await?;
        Ok(Exposure::Exposed { server })
    }

    async fn expose_node_ip(
        &self,
        request: &ExposeRequest<'_>,
        node_port: u16,
        virtual_credential: &mut KubeCredentialSnapshot,
    ) -> Result<Exposure> {
        let Some(node_host) = request.host.current_server().and_then(server_host) else {
            debug!("Host kubeconfig has no usable server for the minikube node");
            return Ok(Exposure::Unsupported);
        };

        let server = format!("https://{}:{}", node_host, node_port);
        let relaxed = virtual_credential.relaxed();
        info!(server = %server, "Trying minikube node address");

        let policy = self.proxies.policy(self.proxies.settings().direct_timeout());
        poll_until_reachable(self.proxies.verifier(), &relaxed, &server, policy).await?;

        *virtual_credential = relaxed;
        Ok(Exposure::Exposed { server })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TargetPort;
    use crate::kubeconfig::tests::{host_kubeconfig, VCLUSTER_KUBECONFIG};
    use crate::testing::{FakeRuntime, FakeVerifier};

    fn target(ports: &[(u16, Option<u16>)]) -> ExposureTarget {
        ExposureTarget {
            name: "vc".to_string(),
            namespace: "ns".to_string(),
            ports: ports
                .iter()
                .map(|(port, node_port)| TargetPort {
                    name: Some("https".to_string()),
                    port: *port,
                    node_port: *node_port,
                })
                .collect(),
        }
    }

    fn request<'a>(host: &'a KubeCredentialSnapshot, target: &'a ExposureTarget) -> ExposeRequest<'a> {
        ExposeRequest {
            vcluster_name: "vc",
            vcluster_namespace: "ns",
            host,
            target,
            local_port: 11443,
        }
    }

    fn virtual_credential() -> KubeCredentialSnapshot {
        KubeCredentialSnapshot::from_yaml(VCLUSTER_KUBECONFIG).unwrap()
    }

    fn exposer(runtime: FakeRuntime, verifier: FakeVerifier) -> Exposer<FakeRuntime, FakeVerifier> {
        Exposer::new(runtime, verifier, ExposeSettings::default())
    }

    #[tokio::test]
    async fn test_multi_port_service_is_unsupported_everywhere() {
        let host = host_kubeconfig("kind-kind", "https://127.0.0.1:6443");
        let target = target(&[(443, Some(30443)), (8443, Some(30444))]);

        for distribution in DistributionType::ALL {
            let exposer = exposer(FakeRuntime::new(), FakeVerifier::always_reachable());
            let mut credential = virtual_credential();

            let exposure = exposer
                .expose(distribution, &request(&host, &target), &mut credential)
                .await
                .unwrap();

            assert_eq!(exposure, Exposure::Unsupported, "{distribution}");
            assert!(exposer.proxies().runtime().calls().is_empty());
            assert_eq!(exposer.proxies().verifier().calls(), 0);
        }
    }

    #[tokio::test]
    async fn test_missing_node_port_is_unsupported() {
        let host = host_kubeconfig("kind-kind", "https://127.0.0.1:6443");
        let target = target(&[(443, None)]);
        let exposer = exposer(FakeRuntime::new(), FakeVerifier::always_reachable());

        let exposure = exposer
            .expose(DistributionType::Kind, &request(&host, &target), &mut virtual_credential())
            .await
            .unwrap();
        assert_eq!(exposure, Exposure::Unsupported);
    }

    #[tokio::test(start_paused = true)]
    async fn test_docker_desktop_uses_loopback_node_port() {
        let host = host_kubeconfig("docker-desktop", "https://kubernetes.docker.internal:6443");
        let target = target(&[(443, Some(31000))]);
        let exposer = exposer(FakeRuntime::new(), FakeVerifier::reachable_on(3));

        let exposure = exposer
            .expose(
                DistributionType::DockerDesktop,
                &request(&host, &target),
                &mut virtual_credential(),
            )
            .await
            .unwrap();

        assert_eq!(exposure.server(), Some("https://127.0.0.1:31000"));
        assert_eq!(exposer.proxies().verifier().calls(), 3);
        assert!(exposer.proxies().runtime().calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rancher_desktop_times_out() {
        let host = host_kubeconfig("rancher-desktop", "https://127.0.0.1:6443");
        let target = target(&[(443, Some(31000))]);
        let exposer = exposer(FakeRuntime::new(), FakeVerifier::never_reachable("refused"));

        let err = exposer
            .expose(
                DistributionType::RancherDesktop,
                &request(&host, &target),
                &mut virtual_credential(),
            )
            .await
            .unwrap_err();
        assert!(err.is_timeout());
    }

    #[tokio::test(start_paused = true)]
    async fn test_kind_starts_named_proxy() {
        let host = host_kubeconfig("kind-kind", "https://127.0.0.1:6443");
        let target = target(&[(443, Some(30443))]);
        let exposer = exposer(FakeRuntime::new(), FakeVerifier::always_reachable());

        let exposure = exposer
            .expose(DistributionType::Kind, &request(&host, &target), &mut virtual_credential())
            .await
            .unwrap();

        assert_eq!(exposure.server(), Some("https://127.0.0.1:11443"));
        let started = exposer.proxies().runtime().started();
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].name, "vcluster_vc_ns_kind-kind");
        assert_eq!(started[0].network.as_deref(), Some("kind"));
        assert!(started[0]
            .env
            .contains(&("BACKEND_HOST".to_string(), "kind-control-plane".to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn test_k3d_reuses_existing_proxy() {
        let host = host_kubeconfig("k3d-dev", "https://0.0.0.0:6550");
        let target = target(&[(443, Some(30443))]);
        let runtime = FakeRuntime::new().with_proxy("vcluster_vc_ns_k3d-dev", 11600, 30443);
        let exposer = exposer(runtime, FakeVerifier::always_reachable());

        let exposure = exposer
            .expose(DistributionType::K3d, &request(&host, &target), &mut virtual_credential())
            .await
            .unwrap();

        assert_eq!(exposure.server(), Some("https://127.0.0.1:11600"));
        assert!(exposer.proxies().runtime().started().is_empty());
    }

    #[tokio::test]
    async fn test_proxy_strategy_needs_host_context() {
        let host = KubeCredentialSnapshot::from_yaml(
            r#"
apiVersion: v1
kind: Config
clusters:
- name: kind-kind
  cluster:
    server: https://127.0.0.1:6443
contexts: []
users: []
"#,
        )
        .unwrap();
        let target = target(&[(443, Some(30443))]);
        let exposer = exposer(FakeRuntime::new(), FakeVerifier::always_reachable());

        let err = exposer
            .expose(DistributionType::Kind, &request(&host, &target), &mut virtual_credential())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::MissingCurrentContext));
    }

    #[tokio::test(start_paused = true)]
    async fn test_minikube_container_driver_uses_proxy() {
        let host = host_kubeconfig("minikube", "https://127.0.0.1:32771");
        let target = target(&[(443, Some(30443))]);
        let runtime = FakeRuntime::new().with_container("minikube", Default::default());
        let exposer = exposer(runtime, FakeVerifier::always_reachable());
        let mut credential = virtual_credential();

        let exposure = exposer
            .expose(DistributionType::Minikube, &request(&host, &target), &mut credential)
            .await
            .unwrap();

        assert_eq!(exposure.server(), Some("https://127.0.0.1:11443"));
        let started = exposer.proxies().runtime().started();
        assert_eq!(started[0].name, "vcluster_vc_ns_minikube");
        assert_eq!(started[0].network.as_deref(), Some("minikube"));
        assert!(!credential.is_relaxed());
    }

    #[tokio::test(start_paused = true)]
    async fn test_minikube_vm_driver_uses_node_ip_with_relaxed_tls() {
        let host = host_kubeconfig("minikube", "https://192.168.49.2:8443");
        let target = target(&[(443, Some(30443))]);
        let verifier = FakeVerifier::new(|_, credential, _| {
            Ok(if credential.is_relaxed() {
                crate::ports::Reachability::Reachable
            } else {
                crate::ports::Reachability::unreachable("x509: certificate signed by unknown authority")
            })
        });
        let exposer = exposer(FakeRuntime::new(), verifier);
        let mut credential = virtual_credential();

        let exposure = exposer
            .expose(DistributionType::Minikube, &request(&host, &target), &mut credential)
            .await
            .unwrap();

        assert_eq!(exposure.server(), Some("https://192.168.49.2:30443"));
        assert_eq!(
            exposer.proxies().verifier().servers(),
            vec!["https://192.168.49.2:30443"]
        );
        assert!(exposer.proxies().verifier().credentials()[0].is_relaxed());
        assert!(credential.is_relaxed());
        assert!(exposer.proxies().runtime().started().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_minikube_vm_driver_failure_keeps_credential() {
        let host = host_kubeconfig("minikube", "https://192.168.49.2:8443");
        let target = target(&[(443, Some(30443))]);
        let exposer = exposer(FakeRuntime::new(), FakeVerifier::never_reachable("no route to host"));
        let mut credential = virtual_credential();

        let err = exposer
            .expose(DistributionType::Minikube, &request(&host, &target), &mut credential)
            .await
            .unwrap_err();

        assert!(err.is_timeout());
        assert!(!credential.is_relaxed());
        assert_eq!(credential.current_server(), Some("https://localhost:8443"));
    }

    #[tokio::test]
    async fn test_other_distribution_is_unsupported() {
        let host = host_kubeconfig("gke_prod", "https://34.1.2.3");
        let target = target(&[(443, Some(30443))]);
        let exposer = exposer(FakeRuntime::new(), FakeVerifier::always_reachable());

        let exposure = exposer
            .expose(DistributionType::Other, &request(&host, &target), &mut virtual_credential())
            .await
            .unwrap();
        assert_eq!(exposure, Exposure::Unsupported);
        assert!(exposer.proxies().runtime().calls().is_empty());
    }
}
