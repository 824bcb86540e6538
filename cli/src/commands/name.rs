//! Name commands - build and parse virtual cluster context names.

use anyhow::Result;
use serde_json::json;
use vcexpose_core::{parse_context_name, ParsedContextName};

use super::Globals;

pub fn show(globals: &Globals, name: &str, namespace: &str) -> Result<()> {
    let host = globals.host()?;
    let identity = globals.identity(&host, name, namespace)?;

    if globals.json {
        let output = json!({
            "context": identity.context_name(),
            "backgroundProxy": identity.background_proxy_name(),
            "roundTrips": identity.round_trips(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("{}", identity.context_name());
    if !identity.round_trips() {
        eprintln!("warning: name or namespace contains '_', parsing this context name is ambiguous");
    }
    Ok(())
}

pub fn parse(context: &str, json: bool) -> Result<()> {
    let parsed = parse_context_name(context);

    if json {
        let output = match &parsed {
            Some(ParsedContextName::Managed(identity)) => json!({
                "managed": true,
                "name": identity.name,
                "namespace": identity.namespace,
                "hostContext": identity.host_context,
            }),
            Some(ParsedContextName::Custom(raw)) => json!({ "managed": false, "context": raw }),
            None => json!({ "managed": false, "context": null }),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    match parsed {
        Some(ParsedContextName::Managed(identity)) => {
            println!("NAME        {}", identity.name);
            println!("NAMESPACE   {}", identity.namespace);
            println!("CONTEXT     {}", identity.host_context);
        }
        Some(ParsedContextName::Custom(raw)) => {
            println!("{} is a custom context name", raw);
        }
        None => println!("{} is not a vcluster context", context),
    }
    Ok(())
}
