//! File-backed stores for the engine: identities, the daily work log, and
//! locally-authored plans.
//!
//! Everything lives under a single data directory (`.tally/` by default),
//! as human-editable TOML. The stores implement the `tally-core`
//! collaborator traits, so the engine never knows it is talking to flat
//! files.

pub mod identity;
pub mod layout;
pub mod log;
pub mod plan_source;

pub use identity::FileIdentityStore;
pub use layout::{DATA_DIR_NAME, StoreError, StoreLayout};
pub use log::FileLogStore;
pub use plan_source::FilePlanSource;
