//! Configuration for the CLI.
//!
//! The config file lives inside the data directory (`.tally/config.toml`)
//! and every setting resolves through the chain:
//! CLI flag > env var > config file > default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use tally_core::DEFAULT_CALL_TIMEOUT;
use tally_store::StoreLayout;

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub defaults: DefaultsSection,
    #[serde(default)]
    pub engine: EngineSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DefaultsSection {
    /// Identity context used when `--identity` is not given.
    pub identity: Option<String>,
    /// Audiences rendered when `--audience` is not given.
    #[serde(default)]
    pub audiences: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EngineSection {
    /// Per-plugin-call timeout in seconds.
    pub call_timeout_secs: u64,
}

impl Default for EngineSection {
    fn default() -> Self {
        Self {
            call_timeout_secs: DEFAULT_CALL_TIMEOUT.as_secs(),
        }
    }
}

// -----------------------------------------------------------------------
// Data directory resolution
// -----------------------------------------------------------------------

/// Fallback data directory when no `.tally/` is found by walking up:
/// `$XDG_DATA_HOME/tally` or `~/.local/share/tally`.
pub fn default_data_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg).join("tally");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".local")
        .join("share")
        .join("tally")
}

/// Locate the data directory: `--dir` flag, then walk-up discovery from the
/// current directory, then the XDG default (if it exists).
pub fn locate_layout(cli_dir: Option<&Path>) -> Result<StoreLayout> {
    if let Some(dir) = cli_dir {
        anyhow::ensure!(dir.is_dir(), "data directory {} does not exist", dir.display());
        return Ok(StoreLayout::new(dir));
    }

    let cwd = std::env::current_dir().context("cannot determine current directory")?;
    if let Ok(layout) = StoreLayout::discover(&cwd) {
        return Ok(layout);
    }

    let fallback = default_data_dir();
    if fallback.is_dir() {
        return Ok(StoreLayout::new(fallback));
    }
    anyhow::bail!(
        "no data directory found; run `tally init` or pass --dir (searched up from {})",
        cwd.display()
    )
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load the config file from the layout, tolerating its absence.
pub fn load_config(layout: &StoreLayout) -> Result<ConfigFile> {
    let path = layout.config_file();
    let contents = match std::fs::read_to_string(&path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(ConfigFile::default());
        }
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read config file at {}", path.display()));
        }
    };
    toml::from_str(&contents)
        .with_context(|| format!("failed to parse config file at {}", path.display()))
}

/// Serialize and write the config file.
pub fn save_config(layout: &StoreLayout, config: &ConfigFile) -> Result<()> {
    let path = layout.config_file();
    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;
    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Fully resolved run settings.
#[derive(Debug)]
pub struct TallyConfig {
    pub identity: Option<String>,
    pub audiences: Vec<String>,
    pub call_timeout: Duration,
}

impl TallyConfig {
    /// Resolve using the chain: CLI flag > env var > config file > default.
    pub fn resolve(
        layout: &StoreLayout,
        cli_identity: Option<String>,
        cli_audiences: Vec<String>,
    ) -> Result<Self> {
        let file = load_config(layout)?;

        let identity = cli_identity
            .or_else(|| std::env::var("TALLY_IDENTITY").ok())
            .or(file.defaults.identity);

        let audiences = if !cli_audiences.is_empty() {
            cli_audiences
        } else if !file.defaults.audiences.is_empty() {
            file.defaults.audiences
        } else {
            vec!["markdown".to_string()]
        };

        Ok(Self {
            identity,
            audiences,
            call_timeout: Duration::from_secs(file.engine.call_timeout_secs),
        })
    }

    /// The resolved identity context, or an actionable error.
    pub fn require_identity(&self) -> Result<&str> {
        self.identity.as_deref().context(
            "no identity configured; pass --identity, set TALLY_IDENTITY, \
             or set defaults.identity in config.toml",
        )
    }
}
