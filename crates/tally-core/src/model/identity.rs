//! The acting identity for a run.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Opaque token identifying the user/context a run acts on behalf of.
///
/// Owned by the identity store; the engine holds it by reference for the
/// duration of a run and never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub display_name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl Identity {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
            attributes: BTreeMap::new(),
        }
    }
}

/// External collaborator that maps a context string to an [`Identity`].
///
/// Consumed read-only; the engine never caches resolutions across runs.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Resolve a context (e.g. an identity name from config) to an identity.
    ///
    /// Fails with [`EngineError::IdentityNotFound`] when the context is
    /// unknown.
    async fn resolve(&self, context: &str) -> Result<Identity, EngineError>;
}
