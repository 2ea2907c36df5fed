//! Run command
//!
//! Executes one hook (or the whole table) against the changed files. The
//! process exit code is authoritative for commit gating: 0 for passed or
//! skipped, nonzero for anything that should block.

use crate::cli::Output;
use crate::config::GatehouseConfig;
use crate::engine::HookRunner;
use crate::engine::outcome::HookReport;
use crate::git::GitOperations;
use crate::hooks;
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Args)]
pub struct RunArgs {
    /// Hook id to run (see `gatehouse list`); omit together with --all
    pub hook: Option<String>,

    /// Changed files to check; when empty, the staged files from the git
    /// index are used
    pub files: Vec<PathBuf>,

    /// Run every registered hook
    #[arg(long)]
    pub all: bool,
}

pub async fn execute(args: RunArgs, custom_config: Option<&str>, output: &Output) -> Result<()> {
    let config = GatehouseConfig::load_with_custom_config(custom_config)?;
    if !config.report.color {
        console::set_colors_enabled(false);
    }

    let selected = if args.all {
        hooks::builtin_hooks()
    } else {
        match args.hook.as_deref() {
            Some(id) => match hooks::find(id) {
                Some(hook) => vec![hook],
                None => {
                    output.error(&format!("unknown hook: {id}"));
                    output.info("run `gatehouse list` to see the registered hooks");
                    std::process::exit(2);
                }
            },
            None => {
                output.error("specify a hook id or pass --all");
                std::process::exit(2);
            }
        }
    };

    // The hook manager supplies the file list; direct invocations fall
    // back to whatever is staged right now.
    let (project_root, files) = if args.files.is_empty() {
        let git = GitOperations::discover()?;
        (git.workdir()?, git.staged_files()?)
    } else {
        (std::env::current_dir()?, args.files)
    };

    if files.is_empty() {
        output.info("no files to check");
        return Ok(());
    }
    output.verbose(&format!("checking {} files", files.len()));

    // A user interrupt must reach the running tools, not just this process
    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let runner = Arc::new(HookRunner::new(config, project_root));
    let reports = runner.run_batch(&selected, &files, &cancel).await?;

    let mut worst = 0;
    for report in &reports {
        render_report(report, output);
        worst = worst.max(report.exit_code());
    }

    output.blank_line();
    let failed = reports.iter().filter(|r| r.exit_code() != 0).count();
    if worst == 0 {
        output.success(&format!("{} hooks passed or skipped", reports.len()));
    } else {
        output.error(&format!("{failed} of {} hooks did not pass", reports.len()));
        std::process::exit(worst);
    }

    Ok(())
}

fn render_report(report: &HookReport, output: &Output) {
    let ok = report.exit_code() == 0;
    output.status_indicator(
        report.outcome.label(),
        &format!("{} ({}ms)", report.hook_id, report.duration.as_millis()),
        ok,
    );

    // One line per sub-check so multi-cause failures stay differentiated
    for check in &report.checks {
        if check.degraded {
            output.warning(&check.headline());
        } else {
            output.indent(&check.headline());
        }
        for note in &check.notes {
            output.indent(&format!("  {note}"));
        }
        if check.outcome.is_gate_failure() {
            for line in check.stderr.lines().chain(check.stdout.lines()).take(20) {
                output.indent(&format!("  {line}"));
            }
        }
    }
}
