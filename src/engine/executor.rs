//! Subprocess execution
//!
//! Runs a resolved tool against selected targets with bounded output
//! capture, a wall-clock timeout, and cancellation. Tools that must be
//! invoked per directory (hierarchical validators) get an iteration mode
//! that runs every scope and merges the results; a failing scope never
//! short-circuits the remaining ones, so one pass reports all failures.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::engine::spec::ScopeMode;

/// Synthetic exit code reported when the engine kills a timed-out tool
pub const TIMEOUT_EXIT_CODE: i32 = 124;
/// Synthetic exit code reported when the caller cancels the run
pub const CANCEL_EXIT_CODE: i32 = 130;

/// Everything needed to launch one tool invocation
#[derive(Debug, Clone)]
pub struct ExecRequest {
    /// Program to spawn (binary path or package runner)
    pub program: String,
    /// Arguments injected by the resolution (runner dispatch + tool name)
    pub prefix_args: Vec<String>,
    /// Invocation template with `{files}` / `{dir}` placeholders
    pub template: Vec<String>,
    pub targets: Vec<PathBuf>,
    pub scope: ScopeMode,
    pub cwd: PathBuf,
    pub timeout: Duration,
    /// Upper bound on captured stdout/stderr, each
    pub capture_limit: usize,
}

/// Captured outcome of one (possibly multi-scope) invocation
#[derive(Debug, Clone)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
    pub timed_out: bool,
    pub cancelled: bool,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0 && !self.timed_out && !self.cancelled
    }
}

/// Run the request, iterating over per-directory scopes when asked to
pub async fn run(request: &ExecRequest, cancel: &CancellationToken) -> Result<ProcessOutput> {
    match request.scope {
        ScopeMode::FileList => {
            let args = expand_template(&request.template, &request.targets, None);
            run_once(request, args, cancel).await
        }
        ScopeMode::PerDirectory => run_scoped(request, cancel).await,
    }
}

/// One invocation per directory that contains relevant files. All scopes
/// run even after a failure; outputs are merged in scope order.
async fn run_scoped(request: &ExecRequest, cancel: &CancellationToken) -> Result<ProcessOutput> {
    let scopes = group_by_directory(&request.targets);
    let mut merged = ProcessOutput {
        exit_code: 0,
        stdout: String::new(),
        stderr: String::new(),
        duration: Duration::ZERO,
        timed_out: false,
        cancelled: false,
    };

    for (dir, files) in scopes {
        if cancel.is_cancelled() {
            merged.cancelled = true;
            merged.exit_code = CANCEL_EXIT_CODE;
            break;
        }

        let args = expand_template(&request.template, &files, Some(&dir));
        let output = run_once(request, args, cancel).await?;

        if !output.stdout.is_empty() {
            merged.stdout.push_str(&format!("[{}]\n", dir.display()));
            merged.stdout.push_str(&output.stdout);
        }
        if !output.stderr.is_empty() {
            merged.stderr.push_str(&format!("[{}]\n", dir.display()));
            merged.stderr.push_str(&output.stderr);
        }
        merged.duration += output.duration;
        merged.timed_out |= output.timed_out;
        merged.cancelled |= output.cancelled;
        if output.exit_code != 0 && merged.exit_code == 0 {
            merged.exit_code = output.exit_code;
        }
    }

    Ok(merged)
}

async fn run_once(
    request: &ExecRequest,
    args: Vec<String>,
    cancel: &CancellationToken,
) -> Result<ProcessOutput> {
    let start = Instant::now();

    let mut cmd = tokio::process::Command::new(&request.program);
    cmd.args(&request.prefix_args)
        .args(&args)
        .current_dir(&request.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    // Give the tool its own process group so a timeout kill reaches any
    // children it spawned, not just the immediate process.
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("failed to spawn {}", request.program))?;

    let stdout_pipe = child.stdout.take().context("child stdout not captured")?;
    let stderr_pipe = child.stderr.take().context("child stderr not captured")?;
    let limit = request.capture_limit;
    let stdout_task = tokio::spawn(read_capped(stdout_pipe, limit));
    let stderr_task = tokio::spawn(read_capped(stderr_pipe, limit));

    let mut timed_out = false;
    let mut cancelled = false;
    let status = tokio::select! {
        status = child.wait() => Some(status?),
        _ = tokio::time::sleep(request.timeout) => {
            timed_out = true;
            None
        }
        _ = cancel.cancelled() => {
            cancelled = true;
            None
        }
    };

    let status = match status {
        Some(status) => status,
        None => {
            if let Some(pid) = child.id() {
                kill_process_tree(pid);
            }
            let _ = child.start_kill();
            child.wait().await.context("failed to reap killed child")?
        }
    };

    let stdout = stdout_task.await?;
    let stderr = stderr_task.await?;
    let duration = start.elapsed();

    let exit_code = if timed_out {
        TIMEOUT_EXIT_CODE
    } else if cancelled {
        CANCEL_EXIT_CODE
    } else {
        status.code().unwrap_or(-1)
    };

    debug!(
        program = %request.program,
        exit_code,
        timed_out,
        elapsed_ms = duration.as_millis() as u64,
        "tool invocation finished"
    );

    Ok(ProcessOutput {
        exit_code,
        stdout,
        stderr,
        duration,
        timed_out,
        cancelled,
    })
}

/// Expand `{files}` (exact token, splices the list) and `{dir}` (in-place
/// substitution) in the invocation template.
fn expand_template(template: &[String], files: &[PathBuf], dir: Option<&Path>) -> Vec<String> {
    let mut args = Vec::with_capacity(template.len() + files.len());
    for part in template {
        if part == "{files}" {
            args.extend(files.iter().map(|f| f.to_string_lossy().into_owned()));
        } else if let Some(dir) = dir {
            args.push(part.replace("{dir}", &dir.to_string_lossy()));
        } else {
            args.push(part.clone());
        }
    }
    args
}

/// Group targets by parent directory, ordered by path for determinism
fn group_by_directory(targets: &[PathBuf]) -> BTreeMap<PathBuf, Vec<PathBuf>> {
    let mut scopes: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    for target in targets {
        let dir = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        scopes.entry(dir).or_default().push(target.clone());
    }
    scopes
}

/// Read a pipe to completion but keep at most `limit` bytes, so pathological
/// tool output cannot grow memory without bound.
async fn read_capped<R: tokio::io::AsyncRead + Unpin>(mut pipe: R, limit: usize) -> String {
    let mut kept: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 8192];
    let mut truncated = false;

    loop {
        match pipe.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                if kept.len() < limit {
                    let take = n.min(limit - kept.len());
                    kept.extend_from_slice(&chunk[..take]);
                    if take < n {
                        truncated = true;
                    }
                } else {
                    truncated = true;
                }
            }
        }
    }

    let mut text = String::from_utf8_lossy(&kept).into_owned();
    if truncated {
        text.push_str("\n[output truncated]");
    }
    text
}

#[cfg(unix)]
fn kill_process_tree(pid: u32) {
    // The child was launched in its own group; the negative pid addresses
    // every process in it.
    let _ = std::process::Command::new("kill")
        .arg("-KILL")
        .arg(format!("-{pid}"))
        .status();
}

#[cfg(not(unix))]
fn kill_process_tree(_pid: u32) {}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell_request(script: &str) -> ExecRequest {
        ExecRequest {
            program: "sh".to_string(),
            prefix_args: Vec::new(),
            template: vec!["-c".to_string(), script.to_string()],
            targets: Vec::new(),
            scope: ScopeMode::FileList,
            cwd: std::env::temp_dir(),
            timeout: Duration::from_secs(10),
            capture_limit: 64 * 1024,
        }
    }

    #[tokio::test]
    async fn test_successful_run_captures_stdout() {
        let output = run(&shell_request("echo hello"), &CancellationToken::new())
            .await
            .unwrap();
        assert!(output.success());
        assert_eq!(output.exit_code, 0);
        assert!(output.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_reported_not_raised() {
        let output = run(&shell_request("echo broken >&2; exit 3"), &CancellationToken::new())
            .await
            .unwrap();
        assert!(!output.success());
        assert_eq!(output.exit_code, 3);
        assert!(output.stderr.contains("broken"));
    }

    #[tokio::test]
    async fn test_output_capture_is_bounded() {
        let mut request = shell_request("i=0; while [ $i -lt 5000 ]; do echo aaaaaaaaaaaaaaaa; i=$((i+1)); done");
        request.capture_limit = 1024;
        let output = run(&request, &CancellationToken::new()).await.unwrap();
        assert!(output.stdout.len() < 2048);
        assert!(output.stdout.contains("[output truncated]"));
    }

    #[tokio::test]
    async fn test_timeout_kills_and_flags() {
        let mut request = shell_request("sleep 30");
        request.timeout = Duration::from_millis(200);
        let start = Instant::now();
        let output = run(&request, &CancellationToken::new()).await.unwrap();
        assert!(output.timed_out);
        assert!(!output.cancelled);
        assert_eq!(output.exit_code, TIMEOUT_EXIT_CODE);
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_cancellation_is_distinct_from_timeout() {
        let cancel = CancellationToken::new();
        let mut request = shell_request("sleep 30");
        request.timeout = Duration::from_secs(60);

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            canceller.cancel();
        });

        let output = run(&request, &cancel).await.unwrap();
        assert!(output.cancelled);
        assert!(!output.timed_out);
        assert_eq!(output.exit_code, CANCEL_EXIT_CODE);
    }

    #[tokio::test]
    async fn test_per_directory_scopes_all_run_despite_failure() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("a")).unwrap();
        std::fs::create_dir_all(dir.path().join("b")).unwrap();
        std::fs::write(dir.path().join("a/x.yml"), "x").unwrap();
        std::fs::write(dir.path().join("b/y.yml"), "y").unwrap();

        let request = ExecRequest {
            program: "sh".to_string(),
            prefix_args: Vec::new(),
            template: vec!["-c".to_string(), "echo ran {dir}; exit 1".to_string()],
            targets: vec![PathBuf::from("a/x.yml"), PathBuf::from("b/y.yml")],
            scope: ScopeMode::PerDirectory,
            cwd: dir.path().to_path_buf(),
            timeout: Duration::from_secs(10),
            capture_limit: 64 * 1024,
        };

        let output = run(&request, &CancellationToken::new()).await.unwrap();
        // Both scopes ran even though the first one failed
        assert!(output.stdout.contains("ran a"));
        assert!(output.stdout.contains("ran b"));
        assert_eq!(output.exit_code, 1);
    }

    #[test]
    fn test_expand_template_splices_files() {
        let template = vec!["lint".to_string(), "{files}".to_string(), "--strict".to_string()];
        let files = vec![PathBuf::from("a.yml"), PathBuf::from("b.yml")];
        let args = expand_template(&template, &files, None);
        assert_eq!(args, vec!["lint", "a.yml", "b.yml", "--strict"]);
    }

    #[test]
    fn test_group_by_directory() {
        let targets = vec![
            PathBuf::from("roles/web/tasks/main.yml"),
            PathBuf::from("roles/web/tasks/extra.yml"),
            PathBuf::from("site.yml"),
        ];
        let scopes = group_by_directory(&targets);
        assert_eq!(scopes.len(), 2);
        assert_eq!(scopes[&PathBuf::from("roles/web/tasks")].len(), 2);
        assert_eq!(scopes[&PathBuf::from(".")].len(), 1);
    }
}
