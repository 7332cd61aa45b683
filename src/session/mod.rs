//! Front-end process session
//!
//! Owns one spawned debugger front-end and its duplex text stream. This
//! layer knows nothing about the protocol: it writes lines in and hands
//! raw output chunks out. A dedicated reader task forwards stdout over a
//! channel; the channel closing is the observable signal that the child
//! exited, so waits higher up can fail instead of blocking forever.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;

use crate::common::{Error, Result};

/// Size of one stdout read
const READ_CHUNK: usize = 4096;

/// One spawned front-end process and its text stream.
///
/// Exactly one live child per session; the session is terminated at
/// scenario end or on fatal error and never reused.
#[derive(Debug)]
pub struct Session {
    child: Child,
    stdin: ChildStdin,
    output: mpsc::UnboundedReceiver<String>,
    terminated: bool,
}

impl Session {
    /// Spawn the front-end attached to piped stdio.
    ///
    /// Fails with [`Error::SpawnFailure`] if the executable cannot start.
    pub fn spawn(program: &Path, args: &[String], env: &[(String, String)]) -> Result<Self> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        for (key, value) in env {
            cmd.env(key, value);
        }

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::spawn_failure(&program.display().to_string(), e))?;

        let stdin = child.stdin.take().ok_or_else(|| {
            Error::spawn_failure(&program.display().to_string(), "no stdin handle")
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            Error::spawn_failure(&program.display().to_string(), "no stdout handle")
        })?;

        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut stdout = stdout;
            let mut buf = [0u8; READ_CHUNK];
            loop {
                match stdout.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        let chunk = String::from_utf8_lossy(&buf[..n]).into_owned();
                        if tx.send(chunk).is_err() {
                            break;
                        }
                    }
                }
            }
            // sender drops here; receivers see the closed stream
        });

        tracing::debug!(program = %program.display(), ?args, "Spawned front-end");

        Ok(Self {
            child,
            stdin,
            output: rx,
            terminated: false,
        })
    }

    /// Write `line` plus a line terminator to the child's input and flush.
    pub async fn send(&mut self, line: &str) -> Result<()> {
        tracing::debug!(command = line, "send");
        self.stdin
            .write_all(line.as_bytes())
            .await
            .map_err(Error::SendFailed)?;
        self.stdin.write_all(b"\n").await.map_err(Error::SendFailed)?;
        self.stdin.flush().await.map_err(Error::SendFailed)?;
        Ok(())
    }

    /// Await the next output chunk. `None` means the stream closed.
    pub async fn recv_output(&mut self) -> Option<String> {
        self.output.recv().await
    }

    /// Non-blocking poll for already-buffered output; `None` when no new
    /// data is available right now.
    pub fn try_recv_output(&mut self) -> Option<String> {
        self.output.try_recv().ok()
    }

    /// Best-effort graceful then forceful teardown.
    ///
    /// Idempotent and always safe to call, even after the child exited.
    pub async fn terminate(&mut self, grace: Duration) {
        if self.terminated {
            return;
        }
        self.terminated = true;

        #[cfg(unix)]
        if let Some(pid) = self.child.id() {
            // SAFETY: plain kill(2) on a pid we own
            unsafe {
                libc::kill(pid as i32, libc::SIGTERM);
            }
            if tokio::time::timeout(grace, self.child.wait()).await.is_ok() {
                tracing::debug!("Front-end exited after SIGTERM");
                return;
            }
        }
        #[cfg(not(unix))]
        let _ = grace;

        let _ = self.child.kill().await;
        tracing::debug!("Front-end killed");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Best-effort since we cannot await in drop
        let _ = self.child.start_kill();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sh() -> PathBuf {
        PathBuf::from("/bin/sh")
    }

    #[tokio::test]
    async fn spawn_failure_for_missing_executable() {
        let err = Session::spawn(Path::new("/no/such/frontend"), &[], &[]).unwrap_err();
        assert!(matches!(err, Error::SpawnFailure { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn output_arrives_and_stream_closes_on_exit() {
        let args = vec!["-c".to_string(), "printf 'one\\ntwo\\n'".to_string()];
        let mut session = Session::spawn(&sh(), &args, &[]).unwrap();

        let mut collected = String::new();
        while let Some(chunk) = session.recv_output().await {
            collected.push_str(&chunk);
        }
        assert!(collected.contains("one"));
        assert!(collected.contains("two"));

        // stream is closed for good
        assert!(session.recv_output().await.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn send_reaches_child_stdin() {
        let args = vec!["-c".to_string(), "read line; echo \"got:$line\"".to_string()];
        let mut session = Session::spawn(&sh(), &args, &[]).unwrap();
        session.send("ping").await.unwrap();

        let mut collected = String::new();
        while let Some(chunk) = session.recv_output().await {
            collected.push_str(&chunk);
        }
        assert!(collected.contains("got:ping"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn terminate_is_idempotent() {
        let args = vec!["-c".to_string(), "sleep 30".to_string()];
        let mut session = Session::spawn(&sh(), &args, &[]).unwrap();
        session.terminate(Duration::from_millis(100)).await;
        session.terminate(Duration::from_millis(100)).await;
        // terminating an already-exited child is also fine
        let args = vec!["-c".to_string(), "true".to_string()];
        let mut session = Session::spawn(&sh(), &args, &[]).unwrap();
        while session.recv_output().await.is_some() {}
        session.terminate(Duration::from_millis(100)).await;
    }
}
