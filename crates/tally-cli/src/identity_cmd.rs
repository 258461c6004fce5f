//! `tally identity` commands: create and list identity files.

use std::collections::BTreeMap;

use anyhow::{Context, Result};

use tally_store::identity::identity_from_parts;
use tally_store::FileIdentityStore;

use crate::IdentityCommands;

/// Run an identity subcommand.
pub fn run_identity_command(command: IdentityCommands, store: &FileIdentityStore) -> Result<()> {
    match command {
        IdentityCommands::Create {
            name,
            display_name,
            attr,
        } => {
            let attributes = parse_attributes(&attr)?;
            let identity = identity_from_parts(&name, &display_name, attributes);
            store.create(&name, &identity)?;
            println!("Created identity {name} ({display_name}).");
        }
        IdentityCommands::List => {
            let names = store.list()?;
            if names.is_empty() {
                println!("No identities. Create one with `tally identity create`.");
                return Ok(());
            }
            for name in names {
                println!("{name}");
            }
        }
    }
    Ok(())
}

/// Parse repeated `--attr key=value` flags.
fn parse_attributes(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    let mut attributes = BTreeMap::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .with_context(|| format!("invalid attribute {pair:?}: expected key=value"))?;
        attributes.insert(key.to_string(), value.to_string());
    }
    Ok(attributes)
}
