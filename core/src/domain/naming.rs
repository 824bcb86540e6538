//! Deterministic names for contexts and proxy containers.
//!
//! A proxy container carries the same name as the kubeconfig context that
//! points at the virtual cluster:
//!
//! ```text
//! vcluster_<name>_<namespace>_<host context>
//! ```
//!
//! Independently launched processes find each other's containers through
//! this name, so it must not change.

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;

const CONTEXT_PREFIX: &str = "vcluster_";
const SEPARATOR: char = '_';
const BACKGROUND_PROXY_SUFFIX: &str = "_background_proxy";

/// A virtual cluster as seen from one host kubeconfig context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VClusterIdentity {
    pub name: String,
    pub namespace: String,
    pub host_context: String,
}

impl VClusterIdentity {
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        host_context: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            host_context: host_context.into(),
        }
    }

    /// Context name, also used as the proxy container name.
    pub fn context_name(&self) -> String {
        context_name(&self.name, &self.namespace, &self.host_context)
    }

    /// Name of the background `kubectl port-forward` container.
    pub fn background_proxy_name(&self) -> String {
        background_proxy_name(&self.name, &self.namespace, &self.host_context)
    }

    /// Whether [`parse_context_name`] recovers exactly this identity.
    ///
    /// Only the name and namespace matter: the host context is the tail of
    /// the context name and may contain the separator freely.
    pub fn round_trips(&self) -> bool {
        !self.name.contains(SEPARATOR) && !self.namespace.contains(SEPARATOR)
    }
}

impl fmt::Display for VClusterIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({})", self.namespace, self.name, self.host_context)
    }
}

/// Builds `vcluster_<name>_<namespace>_<context>`.
pub fn context_name(name: &str, namespace: &str, host_context: &str) -> String {
    format!("{CONTEXT_PREFIX}{name}{SEPARATOR}{namespace}{SEPARATOR}{host_context}")
}

/// Builds the background proxy name: the context name with a
/// `_background_proxy` suffix and every character outside
/// `[a-zA-Z0-9_-]` removed.
pub fn background_proxy_name(name: &str, namespace: &str, host_context: &str) -> String {
    let raw = context_name(name, namespace, host_context) + BACKGROUND_PROXY_SUFFIX;
    disallowed_characters().replace_all(&raw, "").into_owned()
}

fn disallowed_characters() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9\-_]+").expect("valid regex"))
}

/// Result of parsing a context name that starts with `vcluster_`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedContextName {
    /// Name, namespace and host context were recovered.
    Managed(VClusterIdentity),
    /// Too few segments. Most likely a user-chosen context name, returned as is.
    Custom(String),
}

/// Splits a context name back into its components.
///
/// Returns `None` for names without the `vcluster_` prefix. The first two
/// segments after the prefix are the name and namespace; everything after
/// them, separators included, is the host context. Names or namespaces
/// containing `_` therefore parse into the wrong components; Kubernetes
/// object names cannot contain `_`, so this only affects hand-written names.
pub fn parse_context_name(context: &str) -> Option<ParsedContextName> {
    if !context.starts_with(CONTEXT_PREFIX) {
        return None;
    }

    let parts: Vec<&str> = context.split(SEPARATOR).collect();
    // vcluster_<name>_<namespace>_<context>
    if parts.len() >= 4 {
        return Some(ParsedContextName::Managed(VClusterIdentity::new(
            parts[1],
            parts[2],
            parts[3..].join("_"),
        )));
    }

    Some(ParsedContextName::Custom(context.to_string()))
}
