//! The hook runner engine
//!
//! One generic pipeline replaces the per-tool scripts this crate grew out
//! of. Each hook invocation walks the same stages:
//!
//! select targets -> resolve tool (fallback chain) -> materialize config ->
//! execute -> aggregate
//!
//! with two terminal shortcuts: an empty selection is `Skipped`, and an
//! unresolvable chain is `ToolMissing` (or `Skipped` for optional hooks).
//! Hooks are independent; the batch runner executes them on a bounded
//! worker pool and reports in declaration order.

pub mod chain;
pub mod executor;
pub mod materialize;
pub mod outcome;
pub mod resolver;
pub mod selector;
pub mod spec;

use crate::config::GatehouseConfig;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use chain::ChainResolution;
use executor::ExecRequest;
use outcome::{ExecutionResult, HookReport, aggregate};
use resolver::ToolResolver;
use spec::{CheckSpec, HookSpec};

pub struct HookRunner {
    config: GatehouseConfig,
    resolver: ToolResolver,
    project_root: PathBuf,
}

impl HookRunner {
    pub fn new(config: GatehouseConfig, project_root: PathBuf) -> Self {
        Self {
            config,
            resolver: ToolResolver::new(),
            project_root,
        }
    }

    pub fn resolver(&self) -> &ToolResolver {
        &self.resolver
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Run one hook against the caller-supplied file list
    pub async fn run_hook(
        &self,
        hook: &HookSpec,
        files: &[PathBuf],
        cancel: &CancellationToken,
    ) -> Result<HookReport> {
        if !self.config.is_enabled(&hook.id) {
            return Ok(HookReport::skipped(&hook.id, "disabled by configuration"));
        }

        // SelectingTargets: an empty selection short-circuits to Skipped
        // before any tool is probed or launched.
        let targets = selector::select(
            files,
            &hook.selection,
            &self.config.selection.exclude_prefixes,
            &self.project_root,
        )?;
        if targets.is_empty() {
            debug!(hook = %hook.id, "no relevant files, skipping");
            return Ok(HookReport::skipped(&hook.id, "no relevant files"));
        }

        let mut results = Vec::with_capacity(hook.checks.len());
        for check in &hook.checks {
            let result = self.run_check(hook, check, &targets, cancel).await?;
            let cancelled = result.outcome == outcome::Outcome::Cancelled;
            results.push(result);
            if cancelled {
                break;
            }
        }

        Ok(aggregate(&hook.id, hook.optional, results))
    }

    /// One sub-check: resolve its chain, materialize its config, execute
    async fn run_check(
        &self,
        hook: &HookSpec,
        check: &CheckSpec,
        targets: &[PathBuf],
        cancel: &CancellationToken,
    ) -> Result<ExecutionResult> {
        // ResolvingTool
        let (tier, availability, degraded) =
            match chain::resolve_chain(&check.tiers, &self.resolver).await? {
                ChainResolution::Selected {
                    tier,
                    availability,
                    degraded,
                    ..
                } => (tier, availability, degraded),
                ChainResolution::NoneAvailable { install_hints } => {
                    if check.advisory {
                        warn!(
                            hook = %hook.id,
                            check = %check.name,
                            "advisory check skipped, no tool available"
                        );
                        return Ok(ExecutionResult::skipped(
                            &hook.id,
                            &check.name,
                            "advisory check skipped: no tool available",
                        ));
                    }
                    return Ok(ExecutionResult::tool_missing(
                        &hook.id,
                        &check.name,
                        install_hints,
                    ));
                }
            };

        // MaterializingConfig: an I/O failure here is fatal, never silent
        let mut notes = Vec::new();
        if degraded {
            notes.push(format!(
                "degraded: running {}",
                chain::describe_selection(&tier, &availability, degraded)
            ));
        }
        if let Some(descriptor) = &check.config {
            let state = materialize::ensure_config(
                &self.project_root,
                descriptor,
                self.config.engine.materialize,
            )
            .with_context(|| format!("config materialization failed for hook {}", hook.id))?;
            if state.written_by_engine {
                notes.push(format!("wrote default config {}", state.path.display()));
            }
        }

        // Executing
        let (program, prefix_args) = availability
            .command_prefix()
            .context("resolved tool has no invocation")?;
        let request = ExecRequest {
            program,
            prefix_args,
            template: with_extra_args(&tier.args, self.config.extra_args_for(&hook.id)),
            targets: targets.to_vec(),
            scope: tier.scope,
            cwd: self.project_root.clone(),
            timeout: self.config.timeout_for(&hook.id),
            capture_limit: self.config.engine.capture_limit_bytes,
        };
        let output = executor::run(&request, cancel).await?;

        let mut result = ExecutionResult::from_process(
            &hook.id,
            &check.name,
            &tier.tool.bin,
            tier.capability,
            degraded,
            output,
        );
        result.notes = notes;
        Ok(result)
    }

    /// Run many hooks on a bounded worker pool; reports come back in the
    /// order the hooks were declared, regardless of completion order.
    pub async fn run_batch(
        self: &Arc<Self>,
        hooks: &[HookSpec],
        files: &[PathBuf],
        cancel: &CancellationToken,
    ) -> Result<Vec<HookReport>> {
        let permits = Arc::new(Semaphore::new(self.config.max_parallel()));
        let mut handles = Vec::with_capacity(hooks.len());

        for hook in hooks {
            let runner = Arc::clone(self);
            let permits = Arc::clone(&permits);
            let hook = hook.clone();
            let files = files.to_vec();
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permits.acquire_owned().await?;
                runner.run_hook(&hook, &files, &cancel).await
            }));
        }

        let mut reports = Vec::with_capacity(handles.len());
        for handle in handles {
            reports.push(handle.await??);
        }
        Ok(reports)
    }
}

/// Insert per-hook extra arguments ahead of the `{files}` token so tools
/// that treat trailing arguments as paths still see flags as flags.
fn with_extra_args(template: &[String], extra: Vec<String>) -> Vec<String> {
    if extra.is_empty() {
        return template.to_vec();
    }
    let mut args = Vec::with_capacity(template.len() + extra.len());
    let mut inserted = false;
    for part in template {
        if part == "{files}" && !inserted {
            args.extend(extra.iter().cloned());
            inserted = true;
        }
        args.push(part.clone());
    }
    if !inserted {
        args.extend(extra);
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HookOverride;
    use outcome::Outcome;
    use spec::{Capability, CheckSpec, SelectionSpec, ToolProbe, ToolTier};
    use tempfile::TempDir;

    fn shell_tier(script: &str, capability: Capability) -> ToolTier {
        let probe = ToolProbe::new("sh", None, "part of every POSIX system")
            .with_version_args(&["-c", "echo sh"]);
        ToolTier::new(probe, capability, &["-c", script])
    }

    fn missing_tier(bin: &str) -> ToolTier {
        ToolTier::new(
            ToolProbe::new(bin, None, &format!("install {bin} from example.com")),
            Capability::Full,
            &["{files}"],
        )
    }

    fn runner() -> (HookRunner, TempDir) {
        let dir = TempDir::new().unwrap();
        let config = GatehouseConfig::load_with_custom_config(Some("does-not-exist.toml")).unwrap();
        (HookRunner::new(config, dir.path().to_path_buf()), dir)
    }

    fn hook(id: &str, include: &[&str], checks: Vec<CheckSpec>) -> HookSpec {
        HookSpec::new(id, "test hook", SelectionSpec::new(include), checks)
    }

    #[tokio::test]
    async fn test_empty_selection_skips_regardless_of_tools() {
        let (runner, _dir) = runner();
        // The tool does not even exist; selection must short-circuit first
        let spec = hook(
            "demo",
            &["**/*.nothing"],
            vec![CheckSpec::new("lint", vec![missing_tier("no-such-tool")])],
        );
        let report = runner
            .run_hook(&spec, &[PathBuf::from("main.rs")], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.outcome, Outcome::Skipped);
        assert_eq!(report.exit_code(), 0);
    }

    #[tokio::test]
    async fn test_tool_missing_is_fatal_and_lists_install_options() {
        let (runner, _dir) = runner();
        let spec = hook(
            "demo",
            &["**/*.rs"],
            vec![CheckSpec::new("lint", vec![missing_tier("imaginary-linter")])],
        );
        let report = runner
            .run_hook(&spec, &[PathBuf::from("main.rs")], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.outcome, Outcome::ToolMissing);
        assert_eq!(report.exit_code(), 1);
        assert!(report.checks[0]
            .notes
            .iter()
            .any(|n| n.contains("install imaginary-linter")));
    }

    #[tokio::test]
    async fn test_optional_hook_degrades_to_skipped() {
        let (runner, _dir) = runner();
        let spec = hook(
            "demo",
            &["**/*.rs"],
            vec![CheckSpec::new("lint", vec![missing_tier("imaginary-linter")])],
        )
        .optional();
        let report = runner
            .run_hook(&spec, &[PathBuf::from("main.rs")], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.outcome, Outcome::Skipped);
        assert_eq!(report.exit_code(), 0);
    }

    #[tokio::test]
    async fn test_degraded_tier_runs_and_is_named() {
        let (runner, _dir) = runner();
        let spec = hook(
            "demo",
            &["**/*.rs"],
            vec![CheckSpec::new(
                "lint",
                vec![
                    missing_tier("imaginary-linter"),
                    shell_tier("exit 0", Capability::SyntaxOnly),
                ],
            )],
        );
        let report = runner
            .run_hook(&spec, &[PathBuf::from("main.rs")], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.outcome, Outcome::Passed);
        let check = &report.checks[0];
        assert!(check.degraded);
        assert_eq!(check.capability, Some(Capability::SyntaxOnly));
        assert!(check.headline().contains("degraded"));
        assert!(check.notes.iter().any(|n| n.contains("degraded")));
    }

    #[tokio::test]
    async fn test_config_materialized_then_tool_runs() {
        let (runner, dir) = runner();
        let descriptor = spec::ConfigDescriptor::new(&[".demo-lint"], ".demo-lint", "rules: {}\n");
        let spec = hook(
            "demo",
            &["**/*.rs"],
            vec![
                CheckSpec::new("lint", vec![shell_tier("test -f .demo-lint", Capability::Full)])
                    .with_config(descriptor),
            ],
        );
        let report = runner
            .run_hook(&spec, &[PathBuf::from("main.rs")], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.outcome, Outcome::Passed);
        assert!(dir.path().join(".demo-lint").exists());
        assert!(report.checks[0]
            .notes
            .iter()
            .any(|n| n.contains("wrote default config")));
    }

    #[tokio::test]
    async fn test_advisory_companion_absence_never_fails_hook() {
        let (runner, _dir) = runner();
        let spec = hook(
            "demo",
            &["**/*.rs"],
            vec![
                CheckSpec::new("primary", vec![shell_tier("exit 0", Capability::Full)]),
                CheckSpec::new("companion", vec![missing_tier("nice-to-have")]).advisory(),
            ],
        );
        let report = runner
            .run_hook(&spec, &[PathBuf::from("main.rs")], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.outcome, Outcome::Passed);
        assert_eq!(report.checks.len(), 2);
        assert_eq!(report.checks[1].outcome, Outcome::Skipped);
    }

    #[tokio::test]
    async fn test_partial_failure_keeps_both_statuses() {
        let (runner, _dir) = runner();
        let spec = hook(
            "demo",
            &["**/*.rs"],
            vec![
                CheckSpec::new("syntax", vec![shell_tier("exit 0", Capability::SyntaxOnly)]),
                CheckSpec::new("lint", vec![shell_tier("echo bad >&2; exit 2", Capability::Full)]),
            ],
        );
        let report = runner
            .run_hook(&spec, &[PathBuf::from("main.rs")], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.outcome, Outcome::Failed);
        assert_eq!(report.checks[0].outcome, Outcome::Passed);
        assert_eq!(report.checks[1].outcome, Outcome::Failed);
        assert!(report.checks[1].stderr.contains("bad"));
    }

    #[tokio::test]
    async fn test_timeout_surfaces_as_timed_out() {
        let (mut cfg_runner, _dir) = runner();
        cfg_runner.config.hooks.insert(
            "demo".to_string(),
            HookOverride {
                enabled: true,
                timeout_secs: Some(1),
                ..Default::default()
            },
        );
        let spec = hook(
            "demo",
            &["**/*.rs"],
            vec![CheckSpec::new("lint", vec![shell_tier("sleep 30", Capability::Full)])],
        );
        let report = cfg_runner
            .run_hook(&spec, &[PathBuf::from("main.rs")], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.outcome, Outcome::TimedOut);
        assert_eq!(report.exit_code(), 1);
    }

    #[tokio::test]
    async fn test_disabled_hook_is_skipped() {
        let (mut cfg_runner, _dir) = runner();
        cfg_runner.config.hooks.insert(
            "demo".to_string(),
            HookOverride {
                enabled: false,
                ..Default::default()
            },
        );
        let spec = hook(
            "demo",
            &["**/*.rs"],
            vec![CheckSpec::new("lint", vec![shell_tier("exit 1", Capability::Full)])],
        );
        let report = cfg_runner
            .run_hook(&spec, &[PathBuf::from("main.rs")], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(report.outcome, Outcome::Skipped);
    }

    #[tokio::test]
    async fn test_batch_reports_in_declaration_order() {
        let (runner, _dir) = runner();
        let runner = Arc::new(runner);
        let hooks = vec![
            hook(
                "slow",
                &["**/*.rs"],
                vec![CheckSpec::new("a", vec![shell_tier("sleep 1; exit 0", Capability::Full)])],
            ),
            hook(
                "fast",
                &["**/*.rs"],
                vec![CheckSpec::new("b", vec![shell_tier("exit 0", Capability::Full)])],
            ),
        ];
        let reports = runner
            .run_batch(&hooks, &[PathBuf::from("main.rs")], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(reports[0].hook_id, "slow");
        assert_eq!(reports[1].hook_id, "fast");
    }

    #[test]
    fn test_extra_args_inserted_before_files_token() {
        let template = vec!["lint".to_string(), "{files}".to_string()];
        let merged = with_extra_args(&template, vec!["--severity".into(), "high".into()]);
        assert_eq!(merged, vec!["lint", "--severity", "high", "{files}"]);
    }
}
