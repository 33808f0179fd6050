//! Line-oriented transports a [`crate::adapter::BackendAdapter`] speaks
//! over. `StdioTransport` owns a child process; `ChannelTransport` wraps a
//! socket the gateway already accepted (the inverted-socket handoff) so
//! `ab-adapters` never has to depend on `axum`.

use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{mpsc, Mutex};

use ab_domain::error::{Error, Result};

#[async_trait]
pub trait BackendTransport: Send + Sync {
    async fn send_line(&self, line: &str) -> Result<()>;
    /// Read the next complete line, or `None` when the transport is closed.
    async fn recv_line(&self) -> Result<Option<String>>;
    fn is_alive(&self) -> bool;
    async fn shutdown(&self);
}

/// A transport backed by a spawned child process's stdin/stdout, speaking
/// newline-delimited frames. Tolerates non-JSON noise on stdout up to
/// `max_skip_lines` before treating the backend as broken — grounded on
/// the MCP stdio client's read-loop discipline.
pub struct StdioTransport {
    child: Mutex<Child>,
    stdin: Mutex<tokio::process::ChildStdin>,
    stdout: Mutex<BufReader<tokio::process::ChildStdout>>,
    alive: AtomicBool,
    max_skip_lines: u32,
}

impl StdioTransport {
    pub fn spawn(program: &str, args: &[String], max_skip_lines: u32) -> Result<Self> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::Process(format!("failed to spawn {program}: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Process("child has no stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Process("child has no stdout".into()))?;

        Ok(Self {
            child: Mutex::new(child),
            stdin: Mutex::new(stdin),
            stdout: Mutex::new(BufReader::new(stdout)),
            alive: AtomicBool::new(true),
            max_skip_lines,
        })
    }
}

#[async_trait]
impl BackendTransport for StdioTransport {
    async fn send_line(&self, line: &str) -> Result<()> {
        if !self.is_alive() {
            return Err(Error::Process("backend process exited".into()));
        }
        let mut stdin = self.stdin.lock().await;
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(Error::Io)?;
        if !line.ends_with('\n') {
            stdin.write_all(b"\n").await.map_err(Error::Io)?;
        }
        stdin.flush().await.map_err(Error::Io)
    }

    async fn recv_line(&self) -> Result<Option<String>> {
        let mut stdout = self.stdout.lock().await;
        let mut skipped = 0u32;
        loop {
            let mut buf = String::new();
            let n = stdout.read_line(&mut buf).await.map_err(Error::Io)?;
            if n == 0 {
                self.alive.store(false, Ordering::Release);
                return Ok(None);
            }
            let trimmed = buf.trim_end();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with('{') {
                return Ok(Some(trimmed.to_string()));
            }
            skipped += 1;
            if skipped > self.max_skip_lines {
                self.alive.store(false, Ordering::Release);
                return Err(Error::Protocol(
                    "backend stdout produced too many non-JSON lines".into(),
                ));
            }
        }
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    async fn shutdown(&self) {
        self.alive.store(false, Ordering::Release);
        {
            let mut stdin = self.stdin.lock().await;
            let _ = stdin.shutdown().await;
        }
        let mut child = self.child.lock().await;
        let waited = tokio::time::timeout(std::time::Duration::from_secs(5), child.wait()).await;
        if waited.is_err() {
            let _ = child.kill().await;
        }
    }
}

/// A transport fed by channels the gateway owns — used for the
/// inverted-socket Claude SDK-URL adapter, where the CLI dials back into
/// the daemon and the already-accepted socket is handed to the adapter.
pub struct ChannelTransport {
    outbound: mpsc::Sender<String>,
    inbound: Mutex<mpsc::Receiver<String>>,
    alive: AtomicBool,
}

impl ChannelTransport {
    pub fn new(outbound: mpsc::Sender<String>, inbound: mpsc::Receiver<String>) -> Self {
        Self {
            outbound,
            inbound: Mutex::new(inbound),
            alive: AtomicBool::new(true),
        }
    }

    pub fn wrap(outbound: mpsc::Sender<String>, inbound: mpsc::Receiver<String>) -> Arc<Self> {
        Arc::new(Self::new(outbound, inbound))
    }
}

#[async_trait]
impl BackendTransport for ChannelTransport {
    async fn send_line(&self, line: &str) -> Result<()> {
        self.outbound
            .send(line.to_string())
            .await
            .map_err(|_| Error::Process("socket transport closed".into()))
    }

    async fn recv_line(&self) -> Result<Option<String>> {
        let mut rx = self.inbound.lock().await;
        match rx.recv().await {
            Some(line) => Ok(Some(line)),
            None => {
                self.alive.store(false, Ordering::Release);
                Ok(None)
            }
        }
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    async fn shutdown(&self) {
        self.alive.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_transport_round_trips_a_line() {
        let (out_tx, mut out_rx) = mpsc::channel(4);
        let (in_tx, in_rx) = mpsc::channel(4);
        let transport = ChannelTransport::new(out_tx, in_rx);

        transport.send_line(r#"{"hello":1}"#).await.unwrap();
        assert_eq!(out_rx.recv().await.unwrap(), r#"{"hello":1}"#);

        in_tx.send(r#"{"world":2}"#.to_string()).await.unwrap();
        let line = transport.recv_line().await.unwrap();
        assert_eq!(line, Some(r#"{"world":2}"#.to_string()));
    }

    #[tokio::test]
    async fn channel_transport_marks_dead_when_sender_dropped() {
        let (out_tx, _out_rx) = mpsc::channel(4);
        let (in_tx, in_rx) = mpsc::channel::<String>(4);
        let transport = ChannelTransport::new(out_tx, in_rx);
        assert!(transport.is_alive());
        drop(in_tx);
        let line = transport.recv_line().await.unwrap();
        assert!(line.is_none());
        assert!(!transport.is_alive());
    }
}
