//! Local cleanup when a virtual cluster is deleted or disconnected.

use tracing::debug;

use crate::domain::{DistributionType, VClusterIdentity};
use crate::error::Result;
use crate::ports::{ConnectivityVerifier, ProcessRuntime};

use super::proxy_manager::ProxyManager;

/// Stops the forwarding container that exposure may have started for
/// `identity`. Distributions that never get one are a no-op, and so is a
/// container that is already gone. Stop failures are returned.
pub async fn cleanup_local<R: ProcessRuntime, V: ConnectivityVerifier>(
    proxies: &ProxyManager<R, V>,
    identity: &VClusterIdentity,
    distribution: DistributionType,
) -> Result<()> {
    let proxied = match distribution {
        // only the container driver runs a node container to bridge into
        DistributionType::Minikube => proxies.exists(&identity.host_context).await,
        other => other.uses_proxy(),
    };
    if !proxied {
        debug!(vcluster = %identity, distribution = %distribution, "No local proxy to clean up");
        return Ok(());
    }

    proxies.teardown(&identity.context_name()).await
}
