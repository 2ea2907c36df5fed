//! List command

use crate::cli::Output;
use crate::hooks;
use anyhow::Result;

/// Print the hook table: id, description, and each check's fallback chain
pub async fn execute(output: &Output) -> Result<()> {
    output.header("Registered hooks");

    for hook in hooks::builtin_hooks() {
        let marker = if hook.optional { " (optional)" } else { "" };
        output.list_item(&format!("{}{marker}", hook.id));
        output.indent(&hook.description);

        for check in &hook.checks {
            let chain = check
                .tiers
                .iter()
                .map(|tier| format!("{} [{}]", tier.tool.bin, tier.capability.label()))
                .collect::<Vec<_>>()
                .join(" -> ");
            let advisory = if check.advisory { " (advisory)" } else { "" };
            output.indent(&format!("{}{advisory}: {chain}", check.name));
        }
        output.blank_line();
    }

    Ok(())
}
