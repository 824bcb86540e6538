//! Status command - runtime and proxy container state.

use anyhow::Result;
use serde_json::json;
use vcexpose_core::{DistributionType, ProcessRuntime};

use super::Globals;

pub async fn show(globals: &Globals, name: &str, namespace: &str) -> Result<()> {
    let host = globals.host()?;
    let identity = globals.identity(&host, name, namespace)?;
    let distribution = DistributionType::detect(&identity.host_context);

    let exposer = globals.exposer().await?;
    let runtime = exposer.proxies().runtime();
    let runtime_available = runtime.is_available().await;
    let proxy = runtime.inspect(&identity.context_name()).await?;
    let background = runtime.exists(&identity.background_proxy_name()).await;

    let host_port = proxy
        .as_ref()
        .and_then(|details| details.port_bindings.values().flatten().copied().next());

    if globals.json {
        let output = json!({
            "context": identity.context_name(),
            "distribution": distribution,
            "local": distribution.is_local(),
            "runtime": runtime.binary().display().to_string(),
            "runtimeAvailable": runtime_available,
            "proxy": proxy.as_ref().map(|details| json!({
                "name": details.name,
                "running": details.running,
                "hostPort": host_port,
            })),
            "backgroundProxy": background,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{:<18} {}", "CONTEXT", identity.context_name());
    println!("{:<18} {}", "DISTRIBUTION", distribution);
    println!(
        "{:<18} {} ({})",
        "RUNTIME",
        runtime.binary().display(),
        if runtime_available { "available" } else { "unavailable" }
    );
    match (&proxy, host_port) {
        (Some(details), Some(port)) => println!(
            "{:<18} {} on 127.0.0.1:{}",
            "PROXY",
            if details.running { "running" } else { "stopped" },
            port
        ),
        (Some(_), None) => println!("{:<18} present, no published port", "PROXY"),
        (None, _) => println!("{:<18} none", "PROXY"),
    }
    println!(
        "{:<18} {}",
        "BACKGROUND PROXY",
        if background { "running" } else { "none" }
    );
    Ok(())
}
