//! Application layer - Use case services.
//!
//! Services orchestrate domain rules over the `ProcessRuntime` and
//! `ConnectivityVerifier` ports. They accept domain types, never talk to
//! docker or the Kubernetes API directly, and are tested with in-memory
//! fakes.

mod exposer;
mod poll;
mod proxy_manager;
mod teardown;

pub use exposer::{ExposeRequest, Exposer, Exposure};
pub use poll::{poll_until_reachable, PollPolicy};
pub use proxy_manager::ProxyManager;
pub use teardown::cleanup_local;
