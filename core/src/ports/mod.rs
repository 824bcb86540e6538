//! Ports layer - Trait definitions (interfaces).
//!
//! This module defines the interfaces that the application layer uses
//! to interact with external systems. Implementations live in `adapters`.

mod runtime;
mod verifier;

pub use runtime::{ContainerDetails, ContainerSpec, ProcessRuntime};
pub use verifier::{ConnectivityVerifier, Reachability};
