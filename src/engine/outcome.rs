//! Outcome normalization and aggregation
//!
//! Every tool invocation collapses into one [`ExecutionResult`]; a hook's
//! sub-check results aggregate into one [`HookReport`]. Aggregation keeps
//! per-sub-check identity (which check ran, with which tool, at which
//! capability) so a multi-cause failure is never collapsed into a single
//! undifferentiated message.

use crate::engine::executor::ProcessOutput;
use crate::engine::spec::Capability;
use std::time::Duration;

/// Terminal state of one sub-check or of a whole hook
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Passed,
    Failed,
    Skipped,
    ToolMissing,
    TimedOut,
    Cancelled,
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Passed => "passed",
            Outcome::Failed => "failed",
            Outcome::Skipped => "skipped",
            Outcome::ToolMissing => "tool-missing",
            Outcome::TimedOut => "timed-out",
            Outcome::Cancelled => "cancelled",
        }
    }

    /// Exit code convention: 0 = Passed or Skipped, nonzero otherwise
    pub fn exit_code(&self) -> i32 {
        match self {
            Outcome::Passed | Outcome::Skipped => 0,
            _ => 1,
        }
    }

    pub fn is_gate_failure(&self) -> bool {
        self.exit_code() != 0
    }
}

/// Immutable record of one sub-check invocation
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub hook_id: String,
    pub check: String,
    /// Tool that actually ran (None when no tier resolved)
    pub tool_id: Option<String>,
    pub capability: Option<Capability>,
    pub degraded: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    pub outcome: Outcome,
    /// Extra diagnostics: install hints, materialized configs, advisories
    pub notes: Vec<String>,
}

impl ExecutionResult {
    pub fn skipped(hook_id: &str, check: &str, note: &str) -> Self {
        Self {
            hook_id: hook_id.to_string(),
            check: check.to_string(),
            tool_id: None,
            capability: None,
            degraded: false,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            duration: Duration::ZERO,
            outcome: Outcome::Skipped,
            notes: vec![note.to_string()],
        }
    }

    pub fn tool_missing(hook_id: &str, check: &str, install_hints: Vec<String>) -> Self {
        Self {
            hook_id: hook_id.to_string(),
            check: check.to_string(),
            tool_id: None,
            capability: None,
            degraded: false,
            exit_code: None,
            stdout: String::new(),
            stderr: String::new(),
            duration: Duration::ZERO,
            outcome: Outcome::ToolMissing,
            notes: install_hints,
        }
    }

    pub fn from_process(
        hook_id: &str,
        check: &str,
        tool_id: &str,
        capability: Capability,
        degraded: bool,
        output: ProcessOutput,
    ) -> Self {
        let outcome = if output.cancelled {
            Outcome::Cancelled
        } else if output.timed_out {
            Outcome::TimedOut
        } else if output.exit_code == 0 {
            Outcome::Passed
        } else {
            Outcome::Failed
        };

        Self {
            hook_id: hook_id.to_string(),
            check: check.to_string(),
            tool_id: Some(tool_id.to_string()),
            capability: Some(capability),
            degraded,
            exit_code: Some(output.exit_code),
            stdout: output.stdout,
            stderr: output.stderr,
            duration: output.duration,
            outcome,
            notes: Vec::new(),
        }
    }

    /// One-line identity for diagnostics: check name, tool, capability tier
    pub fn headline(&self) -> String {
        match (&self.tool_id, self.capability) {
            (Some(tool), Some(capability)) => {
                let degraded = if self.degraded { ", degraded" } else { "" };
                format!(
                    "{}: {} via {} ({}{})",
                    self.check,
                    self.outcome.label(),
                    tool,
                    capability.label(),
                    degraded
                )
            }
            _ => format!("{}: {}", self.check, self.outcome.label()),
        }
    }
}

/// Aggregated outcome of one hook invocation
#[derive(Debug, Clone)]
pub struct HookReport {
    pub hook_id: String,
    pub outcome: Outcome,
    /// Sub-check results in declaration order, never completion order
    pub checks: Vec<ExecutionResult>,
    pub duration: Duration,
}

impl HookReport {
    pub fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }

    pub fn skipped(hook_id: &str, note: &str) -> Self {
        Self {
            hook_id: hook_id.to_string(),
            outcome: Outcome::Skipped,
            checks: vec![ExecutionResult::skipped(hook_id, "selection", note)],
            duration: Duration::ZERO,
        }
    }
}

/// Collapse sub-check results into the hook outcome.
///
/// Rules: any cancellation wins; then any timeout; then any failure; a
/// missing tool on a required check is `ToolMissing` unless the hook is
/// optional (then the hook degrades to `Skipped`); all-skipped is `Skipped`.
pub fn aggregate(hook_id: &str, optional: bool, results: Vec<ExecutionResult>) -> HookReport {
    let duration = results.iter().map(|r| r.duration).sum();

    let outcome = if results.iter().any(|r| r.outcome == Outcome::Cancelled) {
        Outcome::Cancelled
    } else if results.iter().any(|r| r.outcome == Outcome::TimedOut) {
        Outcome::TimedOut
    } else if results.iter().any(|r| r.outcome == Outcome::Failed) {
        Outcome::Failed
    } else if results.iter().any(|r| r.outcome == Outcome::ToolMissing) {
        if optional {
            Outcome::Skipped
        } else {
            Outcome::ToolMissing
        }
    } else if results.iter().all(|r| r.outcome == Outcome::Skipped) {
        Outcome::Skipped
    } else {
        Outcome::Passed
    };

    HookReport {
        hook_id: hook_id.to_string(),
        outcome,
        checks: results,
        duration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(check: &str, outcome: Outcome) -> ExecutionResult {
        ExecutionResult {
            hook_id: "demo".to_string(),
            check: check.to_string(),
            tool_id: Some("tool".to_string()),
            capability: Some(Capability::Full),
            degraded: false,
            exit_code: Some(if outcome == Outcome::Passed { 0 } else { 1 }),
            stdout: String::new(),
            stderr: String::new(),
            duration: Duration::from_millis(10),
            outcome,
            notes: Vec::new(),
        }
    }

    #[test]
    fn test_exit_code_convention() {
        assert_eq!(Outcome::Passed.exit_code(), 0);
        assert_eq!(Outcome::Skipped.exit_code(), 0);
        assert_eq!(Outcome::Failed.exit_code(), 1);
        assert_eq!(Outcome::ToolMissing.exit_code(), 1);
        assert_eq!(Outcome::TimedOut.exit_code(), 1);
        assert_eq!(Outcome::Cancelled.exit_code(), 1);
    }

    #[test]
    fn test_any_failure_fails_hook_but_identities_survive() {
        let report = aggregate(
            "demo",
            false,
            vec![result("syntax", Outcome::Passed), result("lint", Outcome::Failed)],
        );
        assert_eq!(report.outcome, Outcome::Failed);
        // Partial failure keeps each sub-check's own status
        assert_eq!(report.checks[0].outcome, Outcome::Passed);
        assert_eq!(report.checks[1].outcome, Outcome::Failed);
        assert!(report.checks[1].headline().contains("lint"));
    }

    #[test]
    fn test_timeout_outranks_failure() {
        let report = aggregate(
            "demo",
            false,
            vec![result("a", Outcome::Failed), result("b", Outcome::TimedOut)],
        );
        assert_eq!(report.outcome, Outcome::TimedOut);
    }

    #[test]
    fn test_cancellation_outranks_everything() {
        let report = aggregate(
            "demo",
            false,
            vec![result("a", Outcome::Cancelled), result("b", Outcome::Failed)],
        );
        assert_eq!(report.outcome, Outcome::Cancelled);
    }

    #[test]
    fn test_tool_missing_required_vs_optional_hook() {
        let required = aggregate("demo", false, vec![result("a", Outcome::ToolMissing)]);
        assert_eq!(required.outcome, Outcome::ToolMissing);
        assert_eq!(required.exit_code(), 1);

        let optional = aggregate("demo", true, vec![result("a", Outcome::ToolMissing)]);
        assert_eq!(optional.outcome, Outcome::Skipped);
        assert_eq!(optional.exit_code(), 0);
    }

    #[test]
    fn test_all_skipped_is_skipped() {
        let report = aggregate(
            "demo",
            false,
            vec![
                ExecutionResult::skipped("demo", "a", "no targets"),
                ExecutionResult::skipped("demo", "b", "no targets"),
            ],
        );
        assert_eq!(report.outcome, Outcome::Skipped);
    }

    #[test]
    fn test_degraded_headline_names_tier() {
        let mut r = result("lint", Outcome::Passed);
        r.capability = Some(Capability::Standard);
        r.degraded = true;
        let line = r.headline();
        assert!(line.contains("standard"));
        assert!(line.contains("degraded"));
    }
}
