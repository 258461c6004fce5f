//! `tally init` command: create the data directory and a starter config.

use std::path::{Path, PathBuf};

use anyhow::Result;

use tally_store::{StoreLayout, DATA_DIR_NAME};

use crate::config::{self, ConfigFile, DefaultsSection, EngineSection};

/// Run the init command.
pub fn run_init(dir: Option<&Path>, identity: Option<String>, force: bool) -> Result<()> {
    let root = match dir {
        Some(dir) => dir.to_path_buf(),
        None => PathBuf::from(DATA_DIR_NAME),
    };

    let config_exists = root.join("config.toml").exists();
    if config_exists && !force {
        anyhow::bail!(
            "config file already exists at {}\nUse --force to overwrite.",
            root.join("config.toml").display()
        );
    }

    let layout = StoreLayout::init(&root)?;
    let cfg = ConfigFile {
        defaults: DefaultsSection {
            identity: identity.clone(),
            audiences: vec!["markdown".to_string()],
        },
        engine: EngineSection::default(),
    };
    config::save_config(&layout, &cfg)?;

    println!("Data directory ready at {}", layout.root().display());
    println!("  logs/        daily work log (tally log add ...)");
    println!("  plans/       hand-written plan files for the `local` source");
    println!("  identities/  identity files (tally identity create ...)");
    match identity {
        Some(name) => println!("  default identity: {name}"),
        None => println!("Next: run `tally identity create <name> --display-name \"...\"`."),
    }
    Ok(())
}
