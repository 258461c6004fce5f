//! On-disk layout of the data directory.
//!
//! ```text
//! .tally/
//!   config.toml          CLI configuration
//!   identities/<name>.toml
//!   logs/YYYY-MM-DD.toml
//!   plans/*.toml
//! ```

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Name of the data directory searched for by [`StoreLayout::discover`].
pub const DATA_DIR_NAME: &str = ".tally";

/// Errors raised by the file-backed stores.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no {DATA_DIR_NAME} directory found in {0} or any parent")]
    NotFound(PathBuf),

    #[error("failed to access {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to serialize {path}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: toml::ser::Error,
    },

    #[error("invalid entry in {path}: {reason}")]
    InvalidEntry { path: PathBuf, reason: String },

    /// Names become file names, so the character set is restricted.
    #[error("invalid name {0:?}: use letters, digits, '-', '_' and '.'")]
    InvalidName(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Resolved location of the data directory and its well-known children.
#[derive(Debug, Clone)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    /// Use `root` as the data directory without touching the filesystem.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Walk up from `start` looking for an existing [`DATA_DIR_NAME`]
    /// directory, the way version control tools find their metadata dir.
    pub fn discover(start: &Path) -> Result<Self, StoreError> {
        let mut dir = Some(start);
        while let Some(current) = dir {
            let candidate = current.join(DATA_DIR_NAME);
            if candidate.is_dir() {
                tracing::debug!(root = %candidate.display(), "found data directory");
                return Ok(Self::new(candidate));
            }
            dir = current.parent();
        }
        Err(StoreError::NotFound(start.to_path_buf()))
    }

    /// Create the data directory and its subdirectories. Idempotent.
    pub fn init(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let layout = Self::new(root);
        for dir in [
            layout.root.clone(),
            layout.identities_dir(),
            layout.logs_dir(),
            layout.plans_dir(),
        ] {
            std::fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;
        }
        Ok(layout)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.toml")
    }

    pub fn identities_dir(&self) -> PathBuf {
        self.root.join("identities")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn plans_dir(&self) -> PathBuf {
        self.root.join("plans")
    }
}

/// Reject names that could escape the data directory when used as a file
/// stem.
pub(crate) fn validate_name(name: &str) -> Result<(), StoreError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidName(name.to_string()))
    }
}
