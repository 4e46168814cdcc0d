//! Single external command execution with stdin payload, timeout and guaranteed reaping.

use crate::error::ToolError;
use crate::task::{TaskResult, TaskSpec};
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tokio::time::timeout_at;
use tracing::{debug, warn};

const MAX_STDERR_CHARS: usize = 512;

/// Run one task to completion. Ordinary tool failure is reported in the result, never raised.
pub async fn run(spec: TaskSpec) -> TaskResult {
    if let Err(e) = spec.validate() {
        return TaskResult::failed(&spec.name, e);
    }
    let started = Instant::now();
    debug!(task = %spec.name, cmd = %spec.display(), "spawning");

    let mut cmd = Command::new(&spec.program);
    cmd.args(&spec.args)
        .envs(&spec.env)
        .stdin(if spec.stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    // Own process group, so descendants of wrapper scripts can be signalled together.
    #[cfg(unix)]
    cmd.process_group(0);
    if let Some(dir) = &spec.cwd {
        cmd.current_dir(dir);
    }
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            warn!(task = %spec.name, error = %e, "failed to start");
            return TaskResult::failed(&spec.name, ToolError::Unavailable { tool: spec.name.clone(), reason: e.to_string() });
        }
    };

    let writer = match (child.stdin.take(), spec.stdin.clone()) {
        (Some(mut pipe), Some(payload)) => Some(tokio::spawn(async move {
            // The tool may exit before consuming all of its input.
            let _ = pipe.write_all(payload.as_bytes()).await;
            let _ = pipe.shutdown().await;
        })),
        _ => None,
    };
    let group = child.id();
    let mut out_task = drain(child.stdout.take());
    let mut err_task = drain(child.stderr.take());

    let deadline = tokio::time::Instant::now() + spec.timeout;
    let finished = timeout_at(deadline, async {
        let status = child.wait().await;
        // Leftover background processes would hold the pipes open past the tool's own exit.
        kill_group(group);
        let out = (&mut out_task).await.unwrap_or_default();
        let err = (&mut err_task).await.unwrap_or_default();
        (status, out, err)
    })
    .await;
    if let Some(w) = writer {
        w.abort();
    }

    let (status, out, err) = match finished {
        Ok(v) => v,
        Err(_) => {
            kill_group(group);
            // kill() waits on the child, so it is reaped before we return
            let _ = child.kill().await;
            out_task.abort();
            err_task.abort();
            let millis = spec.timeout.as_millis() as u64;
            warn!(task = %spec.name, timeout_ms = millis, "timed out");
            let mut r = TaskResult::failed(&spec.name, ToolError::Timeout { tool: spec.name.clone(), millis });
            r.duration_ms = started.elapsed().as_millis();
            return r;
        }
    };
    let status = match status {
        Ok(s) => s,
        Err(e) => {
            warn!(task = %spec.name, error = %e, "wait failed");
            return TaskResult::failed(&spec.name, ToolError::Aborted { tool: spec.name.clone() });
        }
    };

    let lines: Vec<String> = String::from_utf8_lossy(&out).lines().map(str::to_string).collect();
    let stderr = String::from_utf8_lossy(&err).trim().to_string();
    let error = if status.success() {
        None
    } else {
        Some(ToolError::NonZeroExit { tool: spec.name.clone(), code: status.code(), stderr: clip(&stderr) })
    };
    let duration_ms = started.elapsed().as_millis();
    debug!(task = %spec.name, lines = lines.len(), status = ?status.code(), duration_ms, "finished");
    TaskResult { name: spec.name, lines, stderr, status: status.code(), error, duration_ms }
}

/// SIGKILL every process in the group led by `leader`. A group that is already gone is fine.
#[cfg(unix)]
fn kill_group(leader: Option<u32>) {
    if let Some(pid) = leader {
        // SAFETY: killpg only sends a signal; no memory is shared with the callee.
        unsafe {
            libc::killpg(pid as libc::pid_t, libc::SIGKILL);
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_leader: Option<u32>) {}

fn drain<R>(pipe: Option<R>) -> JoinHandle<Vec<u8>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut buf = Vec::new();
        if let Some(mut p) = pipe {
            let _ = p.read_to_end(&mut buf).await;
        }
        buf
    })
}

fn clip(s: &str) -> String {
    match s.char_indices().nth(MAX_STDERR_CHARS) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sh(script: &str) -> TaskSpec {
        TaskSpec::new("sh").args(["-c", script])
    }

    #[tokio::test]
    async fn captures_stdout_lines() {
        let r = run(sh("printf 'a\\nb\\n'")).await;
        assert!(r.is_ok());
        assert_eq!(r.lines, vec!["a", "b"]);
        assert_eq!(r.status, Some(0));
    }

    #[tokio::test]
    async fn feeds_stdin_then_closes_it() {
        let r = run(TaskSpec::new("cat").stdin("x\ny\n")).await;
        assert_eq!(r.into_lines().unwrap(), vec!["x", "y"]);
    }

    #[tokio::test]
    async fn nonzero_exit_keeps_stdout_and_flags_error() {
        let r = run(sh("echo partial; echo oops >&2; exit 3")).await;
        assert_eq!(r.lines, vec!["partial"]);
        assert_eq!(r.status, Some(3));
        assert_eq!(r.stderr, "oops");
        match r.error {
            Some(ToolError::NonZeroExit { code, stderr, .. }) => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "oops");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_binary_is_unavailable() {
        let r = run(TaskSpec::new("recon-no-such-tool-4f1c")).await;
        assert!(matches!(r.error, Some(ToolError::Unavailable { .. })));
        assert!(r.lines.is_empty());
    }

    #[tokio::test]
    async fn timeout_kills_the_process() {
        let started = Instant::now();
        let r = run(sh("exec sleep 10").timeout(Duration::from_millis(200))).await;
        assert!(matches!(r.error, Some(ToolError::Timeout { .. })));
        assert!(r.duration_ms >= 200);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[cfg(target_os = "linux")]
    fn is_running(pid: i32) -> bool {
        match std::fs::read_to_string(format!("/proc/{}/stat", pid)) {
            Ok(stat) => !matches!(stat.rsplit(')').next().map(str::trim_start), Some(s) if s.starts_with('Z')),
            Err(_) => false,
        }
    }

    #[tokio::test]
    #[cfg(target_os = "linux")]
    async fn timeout_takes_down_background_children() {
        let pid_file = std::env::temp_dir().join(format!("recon-runner-{}-bg.pid", std::process::id()));
        let script = format!("sleep 30 & echo $! > '{}'; wait", pid_file.display());
        let r = run(sh(&script).timeout(Duration::from_millis(300))).await;
        assert!(matches!(r.error, Some(ToolError::Timeout { .. })));
        let pid: i32 = std::fs::read_to_string(&pid_file).unwrap().trim().parse().unwrap();
        let _ = std::fs::remove_file(&pid_file);
        let gone_by = Instant::now() + Duration::from_secs(2);
        while is_running(pid) && Instant::now() < gone_by {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(!is_running(pid), "sleep {} outlived its timed-out parent", pid);
    }

    #[tokio::test]
    async fn background_child_does_not_hold_output_hostage() {
        let started = Instant::now();
        let r = run(sh("sleep 5 & echo hi").timeout(Duration::from_secs(3))).await;
        assert!(r.is_ok(), "{:?}", r.error);
        assert_eq!(r.lines, vec!["hi"]);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn sub_second_timeout_is_reported_in_millis() {
        let r = run(sh("exec sleep 10").timeout(Duration::from_millis(250))).await;
        let err = r.error.unwrap();
        assert_eq!(err, ToolError::Timeout { tool: "sh".into(), millis: 250 });
        assert_eq!(err.to_string(), "sh timed out after 250ms and was killed");
    }

    #[tokio::test]
    async fn env_and_cwd_are_applied() {
        let r = run(sh("echo $RECON_PROBE_VAR; pwd").env("RECON_PROBE_VAR", "on").cwd("/")).await;
        assert_eq!(r.lines, vec!["on", "/"]);
    }

    #[tokio::test]
    async fn invalid_spec_never_spawns() {
        let r = run(TaskSpec::new("")).await;
        assert!(matches!(r.error, Some(ToolError::InvalidTask { .. })));
    }

    #[test]
    fn clip_is_char_safe() {
        let long = "é".repeat(MAX_STDERR_CHARS + 5);
        let c = clip(&long);
        assert!(c.ends_with("..."));
        assert_eq!(c.chars().count(), MAX_STDERR_CHARS + 3);
    }
}
