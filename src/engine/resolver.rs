//! Tool discovery
//!
//! Probes the environment for the executables hooks want to run. A probe
//! tries the tool's package runner first (run-without-install), then a
//! direct PATH lookup. Absence is a normal result, never an error, and
//! every probe is cached for the lifetime of the run so a tool shared by
//! several hooks is only checked once.

use crate::engine::spec::{Runner, ToolProbe};
use anyhow::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// How long a version probe may take before we treat the tool as unusable
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// How a resolved tool will be invoked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Binary found on PATH
    Direct(PathBuf),
    /// Dispatched through a package runner (e.g. `pipx run <tool>`)
    Runner(Runner),
}

/// Result of probing for one tool, cached per run
#[derive(Debug, Clone)]
pub struct ToolAvailability {
    pub tool_id: String,
    pub found: bool,
    pub version: Option<String>,
    pub resolution: Option<Resolution>,
}

impl ToolAvailability {
    fn missing(tool_id: &str) -> Self {
        Self {
            tool_id: tool_id.to_string(),
            found: false,
            version: None,
            resolution: None,
        }
    }

    /// Command and leading arguments for invoking the resolved tool
    pub fn command_prefix(&self) -> Option<(String, Vec<String>)> {
        match self.resolution.as_ref()? {
            Resolution::Direct(path) => Some((path.to_string_lossy().into_owned(), Vec::new())),
            Resolution::Runner(runner) => {
                let mut args: Vec<String> =
                    runner.dispatch_args().iter().map(|s| s.to_string()).collect();
                args.push(self.tool_id.clone());
                Some((runner.command().to_string(), args))
            }
        }
    }
}

/// Probes for executables and caches the answers
pub struct ToolResolver {
    cache: Mutex<HashMap<String, ToolAvailability>>,
}

impl Default for ToolResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolResolver {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a tool, consulting the per-run cache first
    pub async fn resolve(&self, probe: &ToolProbe) -> Result<ToolAvailability> {
        {
            let cache = self.cache.lock().await;
            if let Some(hit) = cache.get(&probe.bin) {
                return Ok(hit.clone());
            }
        }

        let availability = self.probe_environment(probe).await;
        debug!(
            tool = %probe.bin,
            found = availability.found,
            "tool probe completed"
        );

        let mut cache = self.cache.lock().await;
        cache.insert(probe.bin.clone(), availability.clone());
        Ok(availability)
    }

    async fn probe_environment(&self, probe: &ToolProbe) -> ToolAvailability {
        // Package runner first: it can fetch and run the tool even when
        // nothing is installed globally.
        if let Some(runner) = probe.runner {
            if which::which(runner.command()).is_ok() {
                let mut args: Vec<String> =
                    runner.dispatch_args().iter().map(|s| s.to_string()).collect();
                args.push(probe.bin.clone());
                args.extend(probe.version_args.iter().cloned());

                if let Some(version) = run_version_probe(runner.command(), &args).await {
                    return ToolAvailability {
                        tool_id: probe.bin.clone(),
                        found: true,
                        version: Some(version),
                        resolution: Some(Resolution::Runner(runner)),
                    };
                }
            }
        }

        // Direct on-PATH binary. The version probe gates this path too:
        // a binary that cannot answer it is treated as absent so the
        // chain degrades instead of selecting something broken.
        if let Ok(path) = which::which(&probe.bin) {
            if let Some(version) =
                run_version_probe(&path.to_string_lossy(), &probe.version_args).await
            {
                return ToolAvailability {
                    tool_id: probe.bin.clone(),
                    found: true,
                    version: Some(version),
                    resolution: Some(Resolution::Direct(path)),
                };
            }
        }

        ToolAvailability::missing(&probe.bin)
    }
}

/// Run `<command> <args>` and return the first output line if it exits zero
/// with some output inside the probe timeout. Some tools report their
/// version on stderr (xmllint), so either stream counts as output.
async fn run_version_probe(command: &str, args: &[String]) -> Option<String> {
    let child = tokio::process::Command::new(command)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output();

    let output = tokio::time::timeout(PROBE_TIMEOUT, child).await.ok()?.ok()?;
    if !output.status.success() {
        return None;
    }

    let stream = if output.stdout.is_empty() {
        &output.stderr
    } else {
        &output.stdout
    };
    if stream.is_empty() {
        return None;
    }

    let text = String::from_utf8_lossy(stream);
    text.lines().next().map(|line| line.trim().to_string())
}
