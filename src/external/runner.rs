//! Cancellable subprocess execution.
//!
//! External tools run in their own process group; stdout is streamed
//! line-by-line into the caller's channel, stderr goes to debug logs.
//! Cancelling the token kills the whole group and the call returns only
//! after the child is reaped, so nothing is orphaned.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use which::which;

/// Applied when a caller configures 0.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    /// The binary is not on PATH. Callers emit a `meta:` diagnostic and keep
    /// the run going.
    #[error("binary `{0}` not found in PATH")]
    MissingBinary(String),
    #[error("command cancelled")]
    Cancelled,
    #[error("`{name}` exited with {status}")]
    Exit {
        name: String,
        status: std::process::ExitStatus,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Derive a token that cancels itself after `secs` (0 means the 120 s
/// default). Cancelling the parent propagates immediately.
pub fn scoped_timeout(parent: &CancellationToken, secs: u64) -> CancellationToken {
    let secs = if secs == 0 { DEFAULT_TIMEOUT_SECS } else { secs };
    let token = parent.child_token();
    let armed = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = armed.cancelled() => {}
            _ = tokio::time::sleep(Duration::from_secs(secs)) => {
                tracing::info!(secs, "run deadline reached, cancelling");
                armed.cancel();
            }
        }
    });
    token
}

/// Launch `name` with `args` and stream its stdout lines into `out`.
///
/// `input`, when given, is written to the child's stdin followed by a
/// newline (how httpx/dnsx take their target). The send into `out` is
/// awaited per line, so channel backpressure reaches the child through the
/// OS pipe.
pub async fn run_command(
    cancel: &CancellationToken,
    name: &str,
    args: &[&str],
    input: Option<&str>,
    out: Sender<String>,
) -> Result<(), RunError> {
    which(name).map_err(|_| RunError::MissingBinary(name.to_string()))?;

    let mut cmd = Command::new(name);
    cmd.args(args)
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = cmd.spawn()?;
    tracing::debug!(tool = name, pid = child.id(), "spawned");

    if let Some(text) = input {
        if let Some(mut stdin) = child.stdin.take() {
            let text = format!("{text}\n");
            tokio::spawn(async move {
                let _ = stdin.write_all(text.as_bytes()).await;
            });
        }
    }

    if let Some(stderr) = child.stderr.take() {
        let tool = name.to_string();
        tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                tracing::debug!(tool = %tool, "stderr: {}", line);
            }
        });
    }

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "child stdout unavailable"))?;
    let mut lines = BufReader::new(stdout).lines();

    let mut cancelled = false;
    let mut read_err: Option<std::io::Error> = None;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                kill_group(&mut child);
                cancelled = true;
                break;
            }
            next = lines.next_line() => match next {
                Ok(Some(line)) => {
                    if out.send(line).await.is_err() {
                        // receiver gone, nothing left to stream to
                        kill_group(&mut child);
                        cancelled = true;
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    kill_group(&mut child);
                    read_err = Some(e);
                    break;
                }
            }
        }
    }

    // Reap before returning so no orphan outlives the call.
    let status = child.wait().await?;
    if cancelled {
        return Err(RunError::Cancelled);
    }
    if let Some(e) = read_err {
        return Err(e.into());
    }
    if !status.success() {
        return Err(RunError::Exit {
            name: name.to_string(),
            status,
        });
    }
    tracing::debug!(tool = name, "finished");
    Ok(())
}

#[cfg(unix)]
fn kill_group(child: &mut Child) {
    match child.id() {
        // negative pid signals the whole process group
        Some(pid) => unsafe {
            libc::kill(-(pid as i32), libc::SIGKILL);
        },
        None => {
            let _ = child.start_kill();
        }
    }
}

#[cfg(not(unix))]
fn kill_group(child: &mut Child) {
    let _ = child.start_kill();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn missing_binary_is_a_sentinel() {
        let (tx, _rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let err = run_command(&cancel, "definitely-not-a-real-binary-4242", &[], None, tx)
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::MissingBinary(_)));
    }

    #[tokio::test]
    async fn stdout_lines_are_streamed() {
        let (tx, mut rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        run_command(&cancel, "printf", &["one\ntwo\n"], None, tx)
            .await
            .unwrap();
        assert_eq!(rx.recv().await.as_deref(), Some("one"));
        assert_eq!(rx.recv().await.as_deref(), Some("two"));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn nonzero_exit_is_reported() {
        let (tx, _rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let err = run_command(&cancel, "false", &[], None, tx).await.unwrap_err();
        assert!(matches!(err, RunError::Exit { .. }));
    }

    #[tokio::test]
    async fn cancellation_kills_the_child_promptly() {
        let (tx, _rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let killer = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            killer.cancel();
        });
        let started = std::time::Instant::now();
        let err = run_command(&cancel, "sleep", &["30"], None, tx).await.unwrap_err();
        assert!(matches!(err, RunError::Cancelled));
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
