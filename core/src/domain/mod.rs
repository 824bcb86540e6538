//! Domain layer - Pure data models and naming rules.
//!
//! This module contains domain entities that represent core business concepts.
//! These types have no I/O dependencies and can be tested in isolation.

mod distribution;
mod naming;
mod proxy;
mod target;

// Re-export all domain types
pub use distribution::{DistributionType, ProxyBackend};
pub use naming::{
    background_proxy_name, context_name, parse_context_name, ParsedContextName, VClusterIdentity,
};
pub use proxy::{loopback_server, ProxyHandle, ProxySpec, ProxyState};
pub use target::{ExposureTarget, TargetPort};
