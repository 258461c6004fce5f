//! Plugin layer: capability contracts, the registry, and built-in
//! audiences.

pub mod builtin;
pub mod contract;
pub mod registry;

pub use contract::{Audience, CapabilityKind, PlanSource, PluginHandle};
pub use registry::{
    DEFAULT_CALL_TIMEOUT, InvokeOutcome, PluginInfo, PluginManager, PluginState,
};
