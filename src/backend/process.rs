use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::{oneshot, Mutex as AsyncMutex};

use super::{Backend, BackendError, BackendResult};

struct PendingRequest {
    command: String,
    sender: oneshot::Sender<BackendResult<Value>>,
}

type PendingMap = Arc<AsyncMutex<HashMap<u64, PendingRequest>>>;

/// Backend reached over the stdio of a child process.
///
/// One JSON object per line in each direction:
/// `{"id":1,"command":"get_worktrees","args":{...}}` out, and
/// `{"id":1,"result":...}` or `{"id":1,"error":"..."}` back. Responses may
/// arrive in any order.
pub struct ProcessBackend {
    stdin: AsyncMutex<ChildStdin>,
    child: AsyncMutex<Child>,
    pending: PendingMap,
    next_request_id: AtomicU64,
    timeout: Duration,
}

impl ProcessBackend {
    /// Launch the backend program. Must be called from inside a tokio runtime.
    pub fn spawn(program: &str, args: &[String], timeout: Duration) -> BackendResult<Self> {
        let mut command = Command::new(program);
        command.args(args);
        command.stdin(Stdio::piped());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::null());
        command.kill_on_drop(true);

        let mut child = command.spawn().map_err(|e| {
            BackendError::Transport(format!("failed to launch backend '{}': {}", program, e))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| BackendError::Transport("backend stdin unavailable".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BackendError::Transport("backend stdout unavailable".to_string()))?;

        let pending: PendingMap = Arc::new(AsyncMutex::new(HashMap::new()));
        tokio::spawn(run_reader_loop(stdout, Arc::clone(&pending)));

        tracing::info!(program, "backend process started");

        Ok(Self {
            stdin: AsyncMutex::new(stdin),
            child: AsyncMutex::new(child),
            pending,
            next_request_id: AtomicU64::new(1),
            timeout,
        })
    }

    /// Stop the backend process. Pending requests fail once the reader sees EOF.
    pub async fn shutdown(&self) {
        let mut child = self.child.lock().await;
        let _ = child.kill().await;
        let _ = child.wait().await;
    }

    async fn send_line(&self, payload: &Value) -> BackendResult<()> {
        let encoded = serde_json::to_string(payload)
            .map_err(|e| BackendError::Protocol(format!("failed to encode request: {}", e)))?;
        let mut stdin = self.stdin.lock().await;
        stdin
            .write_all(encoded.as_bytes())
            .await
            .map_err(|e| BackendError::Transport(format!("failed to write request: {}", e)))?;
        stdin
            .write_all(b"\n")
            .await
            .map_err(|e| BackendError::Transport(format!("failed to delimit request: {}", e)))?;
        stdin
            .flush()
            .await
            .map_err(|e| BackendError::Transport(format!("failed to flush request: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl Backend for ProcessBackend {
    async fn invoke(&self, command: &str, args: Value) -> BackendResult<Value> {
        let id = self.next_request_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(
            id,
            PendingRequest {
                command: command.to_string(),
                sender: tx,
            },
        );

        tracing::debug!(id, command, "backend request");
        let message = json!({ "id": id, "command": command, "args": args });
        if let Err(e) = self.send_line(&message).await {
            self.pending.lock().await.remove(&id);
            return Err(e);
        }

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(BackendError::Transport(format!(
                "backend dropped request: {}",
                command
            ))),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(BackendError::Timeout {
                    command: command.to_string(),
                    secs: self.timeout.as_secs(),
                })
            }
        }
    }
}

async fn run_reader_loop(stdout: ChildStdout, pending: PendingMap) {
    let mut reader = BufReader::new(stdout).lines();
    let reason = loop {
        let line = match reader.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break "backend process ended".to_string(),
            Err(e) => break format!("failed to read backend output: {}", e),
        };
        if line.trim().is_empty() {
            continue;
        }

        let Some((id, outcome)) = decode_response(&line) else {
            tracing::warn!(line = %line, "ignoring unrecognised backend output");
            continue;
        };

        if let Some(request) = pending.lock().await.remove(&id) {
            let result = outcome.map_err(|message| BackendError::Command {
                command: request.command.clone(),
                message,
            });
            let _ = request.sender.send(result);
        }
    };

    tracing::warn!(reason = %reason, "backend reader stopped");
    let waiters: Vec<PendingRequest> = {
        let mut guard = pending.lock().await;
        guard.drain().map(|(_, request)| request).collect()
    };
    for waiter in waiters {
        let _ = waiter.sender.send(Err(BackendError::Transport(reason.clone())));
    }
}

/// Split one response line into its request id and outcome.
/// The error side carries the backend's message.
fn decode_response(line: &str) -> Option<(u64, Result<Value, String>)> {
    let message: Value = serde_json::from_str(line).ok()?;
    let id = message.get("id")?.as_u64()?;
    if let Some(error) = message.get("error") {
        let text = match error {
            Value::String(s) => s.clone(),
            Value::Object(map) => map
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string()),
            other => other.to_string(),
        };
        return Some((id, Err(text)));
    }
    let result = message.get("result").cloned().unwrap_or(Value::Null);
    Some((id, Ok(result)))
}
