//! Identity files: one TOML document per identity under `identities/`.
//!
//! The file stem is the context name the engine resolves by; the document
//! body is the identity itself:
//!
//! ```toml
//! id = "alex"
//! display_name = "Alex Doe"
//!
//! [attributes]
//! team = "platform"
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;

use tally_core::{EngineError, Identity, IdentityResolver};

use crate::layout::{StoreError, StoreLayout, validate_name};

/// [`IdentityResolver`] over the `identities/` directory.
#[derive(Debug, Clone)]
pub struct FileIdentityStore {
    layout: StoreLayout,
}

impl FileIdentityStore {
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.layout.identities_dir().join(format!("{name}.toml"))
    }

    /// Create a new identity file. Refuses to overwrite an existing one.
    pub fn create(&self, name: &str, identity: &Identity) -> Result<(), StoreError> {
        validate_name(name)?;
        let path = self.path_for(name);
        let text = toml::to_string_pretty(identity).map_err(|source| StoreError::Serialize {
            path: path.clone(),
            source,
        })?;

        // create_new keeps two concurrent `identity create` calls from
        // silently clobbering each other.
        use std::io::Write as _;
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|err| StoreError::io(&path, err))?;
        file.write_all(text.as_bytes())
            .map_err(|err| StoreError::io(&path, err))?;
        tracing::info!(identity = %name, "created identity");
        Ok(())
    }

    /// Names of all stored identities, sorted.
    pub fn list(&self) -> Result<Vec<String>, StoreError> {
        let dir = self.layout.identities_dir();
        let mut names = Vec::new();
        let reader = std::fs::read_dir(&dir).map_err(|err| StoreError::io(&dir, err))?;
        for dir_entry in reader {
            let path = dir_entry.map_err(|err| StoreError::io(&dir, err))?.path();
            if path.extension().is_some_and(|ext| ext == "toml") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn load(&self, name: &str) -> Result<Identity, StoreError> {
        validate_name(name)?;
        let path = self.path_for(name);
        let text = std::fs::read_to_string(&path).map_err(|err| StoreError::io(&path, err))?;
        toml::from_str(&text).map_err(|source| StoreError::Parse {
            path: path.clone(),
            source,
        })
    }
}

#[async_trait]
impl IdentityResolver for FileIdentityStore {
    async fn resolve(&self, context: &str) -> Result<Identity, EngineError> {
        match self.load(context) {
            Ok(identity) => Ok(identity),
            Err(StoreError::InvalidName(_)) => Err(EngineError::IdentityNotFound {
                context: context.to_string(),
            }),
            Err(StoreError::Io { ref source, .. })
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                Err(EngineError::IdentityNotFound {
                    context: context.to_string(),
                })
            }
            Err(err) => Err(EngineError::IdentityStore(err.into())),
        }
    }
}

/// Build an identity from CLI inputs: the context name doubles as the id.
pub fn identity_from_parts(
    name: &str,
    display_name: &str,
    attributes: BTreeMap<String, String>,
) -> Identity {
    let mut identity = Identity::new(name, display_name);
    identity.attributes = attributes;
    identity
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, FileIdentityStore) {
        let tmp = tempfile::tempdir().unwrap();
        let layout = StoreLayout::init(tmp.path().join(".tally")).unwrap();
        (tmp, FileIdentityStore::new(layout))
    }

    #[tokio::test]
    async fn create_then_resolve_round_trips() {
        let (_tmp, store) = store();
        let identity = identity_from_parts(
            "alex",
            "Alex Doe",
            BTreeMap::from([("team".to_string(), "platform".to_string())]),
        );
        store.create("alex", &identity).unwrap();

        let resolved = store.resolve("alex").await.unwrap();
        assert_eq!(resolved, identity);
    }

    #[tokio::test]
    async fn unknown_context_is_not_found() {
        let (_tmp, store) = store();
        assert!(matches!(
            store.resolve("ghost").await,
            Err(EngineError::IdentityNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn traversal_in_context_is_not_found_rather_than_read() {
        let (_tmp, store) = store();
        assert!(matches!(
            store.resolve("../../etc/passwd").await,
            Err(EngineError::IdentityNotFound { .. })
        ));
    }

    #[test]
    fn create_refuses_to_overwrite() {
        let (_tmp, store) = store();
        let identity = Identity::new("alex", "Alex Doe");
        store.create("alex", &identity).unwrap();
        assert!(matches!(
            store.create("alex", &identity),
            Err(StoreError::Io { .. })
        ));
    }

    #[test]
    fn list_is_sorted() {
        let (_tmp, store) = store();
        for name in ["zoe", "alex", "mika"] {
            store.create(name, &Identity::new(name, name)).unwrap();
        }
        assert_eq!(store.list().unwrap(), vec!["alex", "mika", "zoe"]);
    }
}
