//! Background proxy commands - kubectl port-forward in a container.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::json;
use vcexpose_core::KubeCredentialSnapshot;

use super::{free_local_port, Globals};

pub async fn start(
    globals: &Globals,
    name: &str,
    namespace: &str,
    vcluster_kubeconfig: &Path,
    local_port: Option<u16>,
) -> Result<()> {
    let host = globals.host()?;
    let identity = globals.identity(&host, name, namespace)?;
    let virtual_credential = KubeCredentialSnapshot::read_from(vcluster_kubeconfig)
        .with_context(|| format!("reading {}", vcluster_kubeconfig.display()))?;
    let local_port = match local_port {
        Some(port) => port,
        None => free_local_port()?,
    };

    let exposer = globals.exposer().await?;
    let server = exposer
        .proxies()
        .start_background_proxy(&identity, &host, &virtual_credential, local_port)
        .await?;

    if globals.json {
        let output = json!({
            "container": identity.background_proxy_name(),
            "server": server,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!(
            "Background proxy {} is serving {}",
            identity.background_proxy_name(),
            server
        );
    }
    Ok(())
}

pub async fn stop(globals: &Globals, name: &str, namespace: &str) -> Result<()> {
    let host = globals.host()?;
    let identity = globals.identity(&host, name, namespace)?;

    let exposer = globals.exposer().await?;
    exposer
        .proxies()
        .cleanup_background_proxy(&identity.background_proxy_name())
        .await?;

    if !globals.json {
        println!("Removed background proxy {}", identity.background_proxy_name());
    }
    Ok(())
}
