//! Fallback chain resolution
//!
//! A hook prefers its strongest tool but accepts weaker tiers when the
//! environment lacks it: a full linter degrades to a vet-only check, which
//! degrades to plain syntax validation. The first tier whose tool resolves
//! wins; diagnostics always name the tier actually used.

use crate::engine::resolver::{ToolAvailability, ToolResolver};
use crate::engine::spec::{Capability, ToolTier};
use anyhow::Result;
use tracing::warn;

/// Outcome of walking one fallback chain
#[derive(Debug, Clone)]
pub enum ChainResolution {
    /// A tier resolved; `degraded` is true when it was not the first tier
    Selected {
        tier_index: usize,
        tier: ToolTier,
        availability: ToolAvailability,
        degraded: bool,
    },
    /// No tier resolved; carries install hints for every tier tried
    NoneAvailable { install_hints: Vec<String> },
}

/// Walk the tiers in declared order and select the first resolvable one
pub async fn resolve_chain(tiers: &[ToolTier], resolver: &ToolResolver) -> Result<ChainResolution> {
    let mut install_hints = Vec::with_capacity(tiers.len());

    for (index, tier) in tiers.iter().enumerate() {
        let availability = resolver.resolve(&tier.tool).await?;
        if availability.found {
            if index > 0 {
                warn!(
                    tool = %tier.tool.bin,
                    capability = tier.capability.label(),
                    "preferred tool unavailable, running degraded tier"
                );
            }
            return Ok(ChainResolution::Selected {
                tier_index: index,
                tier: tier.clone(),
                availability,
                degraded: index > 0,
            });
        }
        install_hints.push(format!("{}: {}", tier.tool.bin, tier.tool.install_hint));
    }

    Ok(ChainResolution::NoneAvailable { install_hints })
}

/// One-line description of the selected tier for diagnostics
pub fn describe_selection(tier: &ToolTier, availability: &ToolAvailability, degraded: bool) -> String {
    let version = availability.version.as_deref().unwrap_or("unknown version");
    let mut line = format!(
        "{} ({}, {})",
        tier.tool.bin,
        tier.capability.label(),
        version
    );
    if degraded {
        line.push_str(" [degraded]");
    }
    line
}
