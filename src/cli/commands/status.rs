//! Status command
//!
//! Probes every tool the hook table can use and reports what this
//! environment would actually run, before anything is committed.

use crate::cli::Output;
use crate::config::GatehouseConfig;
use crate::engine::resolver::{Resolution, ToolResolver};
use crate::hooks;
use anyhow::Result;

pub async fn execute(custom_config: Option<&str>, output: &Output) -> Result<()> {
    let config = GatehouseConfig::load_with_custom_config(custom_config)?;
    let resolver = ToolResolver::new();

    output.header("Tool availability");

    for hook in hooks::builtin_hooks() {
        let enabled = config.is_enabled(&hook.id);
        let state = if enabled { "enabled" } else { "disabled" };
        output.list_item(&format!("{} ({state})", hook.id));

        for check in &hook.checks {
            for tier in &check.tiers {
                let availability = resolver.resolve(&tier.tool).await?;
                if availability.found {
                    let via = match &availability.resolution {
                        Some(Resolution::Direct(path)) => path.display().to_string(),
                        Some(Resolution::Runner(runner)) => {
                            format!("via {}", runner.command())
                        }
                        None => String::new(),
                    };
                    let version = availability.version.as_deref().unwrap_or("unknown version");
                    output.indent(&format!(
                        "✓ {} [{}] {version} ({via})",
                        tier.tool.bin,
                        tier.capability.label(),
                    ));
                } else {
                    output.indent(&format!(
                        "✗ {} [{}] not found, {}",
                        tier.tool.bin,
                        tier.capability.label(),
                        tier.tool.install_hint,
                    ));
                }
            }
        }
        output.blank_line();
    }

    Ok(())
}
