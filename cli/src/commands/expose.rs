//! Expose command - make a virtual cluster reachable from this machine.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::json;
use tokio::fs;
use tracing::info;
use vcexpose_core::adapters::{client_for, fetch_exposure_target};
use vcexpose_core::{DistributionType, ExposeRequest, Exposure, KubeCredentialSnapshot};

use super::{distribution_for, free_local_port, Globals};

pub struct ExposeArgs {
    pub name: String,
    pub namespace: String,
    pub vcluster_kubeconfig: PathBuf,
    pub service: Option<String>,
    pub local_port: Option<u16>,
    pub distribution: Option<DistributionType>,
    pub write: bool,
}

pub async fn run(globals: &Globals, args: ExposeArgs) -> Result<()> {
    let host = globals.host()?;
    let identity = globals.identity(&host, &args.name, &args.namespace)?;
    let distribution = distribution_for(&identity, args.distribution);

    let mut virtual_credential = KubeCredentialSnapshot::read_from(&args.vcluster_kubeconfig)
        .with_context(|| format!("reading {}", args.vcluster_kubeconfig.display()))?;

    let service = args.service.as_deref().unwrap_or(&args.name);
    let client = client_for(&host).await?;
    let target = fetch_exposure_target(client, &args.namespace, service)
        .await
        .with_context(|| format!("reading service {}/{}", args.namespace, service))?;

    let local_port = match args.local_port {
        Some(port) => port,
        None => free_local_port()?,
    };

    info!(vcluster = %identity, distribution = %distribution, "Exposing virtual cluster");

    let exposer = globals.exposer().await?;
    let request = ExposeRequest {
        vcluster_name: &args.name,
        vcluster_namespace: &args.namespace,
        host: &host,
        target: &target,
        local_port,
    };
    let exposure = exposer
        .expose(distribution, &request, &mut virtual_credential)
        .await?;

    if let Exposure::Exposed { server } = &exposure {
        if args.write {
            virtual_credential.set_server(server);
            fs::write(&args.vcluster_kubeconfig, virtual_credential.to_yaml()?)
                .await
                .with_context(|| format!("writing {}", args.vcluster_kubeconfig.display()))?;
        }
    }

    if globals.json {
        let output = json!({
            "vcluster": args.name,
            "namespace": args.namespace,
            "context": identity.context_name(),
            "distribution": distribution,
            "exposed": exposure.is_exposed(),
            "server": exposure.server(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match exposure.server() {
        Some(server) => {
            println!("{} is reachable at {}", identity.context_name(), server);
            if args.write {
                println!("Updated {}", args.vcluster_kubeconfig.display());
            }
        }
        None => println!(
            "No local exposure strategy for {} on {}. Use a port-forward instead.",
            identity.context_name(),
            distribution
        ),
    }
    Ok(())
}
