//! `tally sources` command: list registered plugins and their state.

use anyhow::Result;

use tally_core::{PluginManager, PluginState};

/// Run the sources command.
pub fn run_sources(plugins: &PluginManager) -> Result<()> {
    let infos = plugins.plugins();
    if infos.is_empty() {
        println!("No plugins registered.");
        return Ok(());
    }

    println!("{:<16} {:<12} {:<10} {:<8}", "NAME", "KIND", "VERSION", "STATE");
    println!("{}", "-".repeat(48));
    for info in infos {
        let state = match info.state {
            PluginState::Ready => "ready",
            PluginState::Degraded => "degraded",
        };
        println!(
            "{:<16} {:<12} {:<10} {:<8}",
            info.name,
            info.kind.to_string(),
            info.version,
            state,
        );
    }
    Ok(())
}
