//! Cleanup command - stop forwarding containers for a virtual cluster.

use anyhow::Result;
use serde_json::json;
use vcexpose_core::DistributionType;

use super::{distribution_for, Globals};

pub async fn run(
    globals: &Globals,
    name: &str,
    namespace: &str,
    distribution: Option<DistributionType>,
) -> Result<()> {
    let host = globals.host()?;
    let identity = globals.identity(&host, name, namespace)?;
    let distribution = distribution_for(&identity, distribution);

    let exposer = globals.exposer().await?;
    exposer.cleanup(&identity, distribution).await?;

    if globals.json {
        let output = json!({
            "context": identity.context_name(),
            "distribution": distribution,
            "cleaned": true,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("Cleaned up local proxies for {}", identity.context_name());
    }
    Ok(())
}
