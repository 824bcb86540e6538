//! Kubernetes API adapters: the connectivity verifier and Service lookup.

use std::time::Duration;

use k8s_openapi::api::core::v1::{Namespace, Service};
use kube::{Api, Client};
use tracing::debug;

use crate::domain::ExposureTarget;
use crate::error::Result;
use crate::kubeconfig::{validate_server, KubeCredentialSnapshot};
use crate::ports::{ConnectivityVerifier, Reachability};

/// Namespace that exists in every cluster; reading it proves authentication.
const PROBE_NAMESPACE: &str = "default";

/// Verifies an endpoint by reading the `default` namespace through it.
#[derive(Debug, Clone, Copy, Default)]
pub struct KubeVerifier;

impl KubeVerifier {
    pub fn new() -> Self {
        Self
    }
}

impl ConnectivityVerifier for KubeVerifier {
    async fn verify(
        &self,
        credential: &KubeCredentialSnapshot,
        server: &str,
        timeout: Duration,
    ) -> Result<Reachability> {
        validate_server(server)?;

        let mut config = credential.with_server(server).client_config().await?;
        config.connect_timeout = Some(timeout);
        config.read_timeout = Some(timeout);
        let client = Client::try_from(config)?;

        let namespaces: Api<Namespace> = Api::all(client);
        let reachability = match tokio::time::timeout(timeout, namespaces.get(PROBE_NAMESPACE)).await
        {
            Ok(Ok(_)) => Reachability::Reachable,
            Ok(Err(e)) => Reachability::unreachable(format!("retrieve default namespace: {}", e)),
            Err(_) => Reachability::unreachable(format!(
                "retrieve default namespace: no response within {:?}",
                timeout
            )),
        };

        debug!(server = %server, reachable = reachability.is_reachable(), "Connectivity check");
        Ok(reachability)
    }
}

/// Creates a client for the current context of a kubeconfig snapshot.
pub async fn client_for(credential: &KubeCredentialSnapshot) -> Result<Client> {
    let config = credential.client_config().await?;
    Ok(Client::try_from(config)?)
}

/// Reads the Service that fronts a virtual cluster's API server.
pub async fn fetch_exposure_target(
    client: Client,
    namespace: &str,
    name: &str,
) -> Result<ExposureTarget> {
    let services: Api<Service> = Api::namespaced(client, namespace);
    let service = services.get(name).await?;
    Ok(ExposureTarget::from_service(&service))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::kubeconfig::tests::VCLUSTER_KUBECONFIG;

    #[tokio::test]
    async fn test_invalid_server_is_fatal() {
        let credential = KubeCredentialSnapshot::from_yaml(VCLUSTER_KUBECONFIG).unwrap();
        let result = KubeVerifier::new()
            .verify(&credential, "127.0.0.1:8443", Duration::from_secs(1))
            .await;
        assert!(matches!(result, Err(Error::InvalidServer { .. })));
    }
}
