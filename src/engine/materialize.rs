//! Default configuration materialization
//!
//! Tools are happiest with a config file in the project root. When none of
//! the names a tool recognizes exists, the engine can write a default
//! template. The write is atomic (temp file in the same directory, then a
//! no-clobber rename) so a crash never leaves a partial config and parallel
//! hook runs racing on the same file resolve to "first writer wins".
//!
//! Writing into the working tree as a side effect of a check is not always
//! wanted (CI, read-only checkouts), so the behavior is a policy knob.

use crate::engine::spec::ConfigDescriptor;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

/// What to do when a tool has no configuration in the project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MaterializePolicy {
    /// Write the default template (original behavior)
    #[default]
    Auto,
    /// Fail instead of mutating the working tree
    Require,
    /// Neither write nor fail; let the tool use its own defaults
    Off,
}

/// What the materializer found or did, read-only after creation
#[derive(Debug, Clone)]
pub struct ConfigState {
    pub path: PathBuf,
    pub existed_before: bool,
    pub written_by_engine: bool,
}

/// Ensure a config file exists per the descriptor and policy.
///
/// Existing user configuration is never inspected or modified; the engine
/// only acts when none of the candidate names is present.
pub fn ensure_config(
    project_root: &Path,
    descriptor: &ConfigDescriptor,
    policy: MaterializePolicy,
) -> Result<ConfigState> {
    for candidate in &descriptor.candidates {
        let path = project_root.join(candidate);
        if path.exists() {
            return Ok(ConfigState {
                path,
                existed_before: true,
                written_by_engine: false,
            });
        }
    }

    let target = project_root.join(&descriptor.write_name);
    match policy {
        MaterializePolicy::Off => Ok(ConfigState {
            path: target,
            existed_before: false,
            written_by_engine: false,
        }),
        MaterializePolicy::Require => bail!(
            "no configuration found for this tool (looked for {}) and materialize policy is 'require'",
            descriptor.candidates.join(", ")
        ),
        MaterializePolicy::Auto => write_atomically(project_root, &target, &descriptor.template),
    }
}

fn write_atomically(dir: &Path, target: &Path, template: &str) -> Result<ConfigState> {
    let mut temp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("failed to create temp file in {}", dir.display()))?;
    temp.write_all(template.as_bytes())
        .with_context(|| format!("failed to write config template for {}", target.display()))?;
    temp.flush()?;

    match temp.persist_noclobber(target) {
        Ok(_) => {
            debug!(path = %target.display(), "materialized default config");
            Ok(ConfigState {
                path: target.to_path_buf(),
                existed_before: false,
                written_by_engine: true,
            })
        }
        Err(err) if err.error.kind() == std::io::ErrorKind::AlreadyExists => {
            // A parallel run won the race; their file stands, ours is dropped.
            Ok(ConfigState {
                path: target.to_path_buf(),
                existed_before: true,
                written_by_engine: false,
            })
        }
        Err(err) => Err(err.error).with_context(|| {
            format!("failed to persist config template to {}", target.display())
        }),
    }
}
