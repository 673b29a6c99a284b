//! Worker processes. The executor only sees the [`Worker`] trait, so tests
//! substitute an in-process fake.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio_util::sync::CancellationToken;

use foreman_core::config::WorkerConfig;
use foreman_core::TaskId;

use crate::error::WorkerError;
use crate::tier::Invocation;

/// One worker invocation.
#[derive(Debug, Clone)]
pub struct WorkerRequest {
    pub task_id: TaskId,
    pub prompt: String,
    pub working_dir: PathBuf,
    pub max_turns: u32,
    pub invocation: Invocation,
}

/// What the worker left behind. `exit_code` is `None` when killed by a signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerOutput {
    pub exit_code: Option<i32>,
    pub output: String,
}

impl WorkerOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[async_trait]
pub trait Worker: Send + Sync {
    /// Run to completion, or until `cancel` fires.
    async fn execute(
        &self,
        request: &WorkerRequest,
        cancel: CancellationToken,
    ) -> Result<WorkerOutput, WorkerError>;
}

/// Spawns the configured program with the prompt on stdin.
#[derive(Debug, Clone)]
pub struct ProcessWorker {
    program: String,
    args: Vec<String>,
}

impl ProcessWorker {
    pub fn new(config: &WorkerConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
        }
    }

    fn command(&self, request: &WorkerRequest) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--max-turns")
            .arg(request.max_turns.to_string())
            .args(&request.invocation.args)
            .envs(request.invocation.env.iter().map(|(k, v)| (k, v)))
            .current_dir(&request.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

#[async_trait]
impl Worker for ProcessWorker {
    async fn execute(
        &self,
        request: &WorkerRequest,
        cancel: CancellationToken,
    ) -> Result<WorkerOutput, WorkerError> {
        let mut child = self
            .command(request)
            .spawn()
            .map_err(|source| WorkerError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        tracing::debug!(task_id = %request.task_id, pid = ?child.id(), "worker started");

        let finished = {
            let run = drive(&mut child, &request.prompt);
            tokio::select! {
                result = run => Some(result),
                _ = cancel.cancelled() => None,
            }
        };

        match finished {
            Some(result) => result,
            None => {
                if let Err(e) = child.kill().await {
                    tracing::warn!(task_id = %request.task_id, error = %e, "failed to kill cancelled worker");
                }
                Err(WorkerError::Cancelled)
            }
        }
    }
}

/// Feed the prompt, drain both output pipes and wait, all concurrently so a
/// chatty child never deadlocks on a full pipe.
async fn drive(child: &mut Child, prompt: &str) -> Result<WorkerOutput, WorkerError> {
    let stdin = child.stdin.take();
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    let (written, out, err) = tokio::join!(
        feed(stdin, prompt),
        drain(stdout, "reading stdout"),
        drain(stderr, "reading stderr"),
    );
    written?;
    let mut output = out?;
    output.push_str(&err?);

    let status = child.wait().await.map_err(|source| WorkerError::Io {
        context: "waiting for worker",
        source,
    })?;
    Ok(WorkerOutput {
        exit_code: status.code(),
        output,
    })
}

async fn feed(stdin: Option<ChildStdin>, prompt: &str) -> Result<(), WorkerError> {
    let Some(mut stdin) = stdin else {
        return Ok(());
    };
    match stdin.write_all(prompt.as_bytes()).await {
        Ok(()) => {}
        // The worker may exit without reading its input.
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => return Ok(()),
        Err(source) => {
            return Err(WorkerError::Io {
                context: "writing prompt",
                source,
            })
        }
    }
    // Dropping stdin closes it so the worker sees EOF.
    drop(stdin);
    Ok(())
}

async fn drain<R: AsyncRead + Unpin>(
    pipe: Option<R>,
    context: &'static str,
) -> Result<String, WorkerError> {
    let Some(mut pipe) = pipe else {
        return Ok(String::new());
    };
    let mut buf = Vec::new();
    pipe.read_to_end(&mut buf)
        .await
        .map_err(|source| WorkerError::Io { context, source })?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn request(dir: &TempDir) -> WorkerRequest {
        WorkerRequest {
            task_id: TaskId::from("p/t"),
            prompt: "hello worker\n".into(),
            working_dir: dir.path().to_path_buf(),
            max_turns: 7,
            invocation: Invocation {
                args: vec![],
                env: vec![("FOREMAN_TEST_VAR".into(), "tier-env".into())],
            },
        }
    }

    fn sh(script: &str) -> ProcessWorker {
        // `sh -c <script> <argv0> --max-turns N ...`
        ProcessWorker::new(&WorkerConfig {
            program: "sh".into(),
            args: vec!["-c".into(), script.into(), "worker".into()],
        })
    }

    #[tokio::test]
    async fn prompt_arrives_on_stdin_and_output_is_captured() {
        let dir = TempDir::new().unwrap();
        let worker = sh("cat; echo \"$1 $2\"; echo \"$FOREMAN_TEST_VAR\" >&2");
        let out = worker
            .execute(&request(&dir), CancellationToken::new())
            .await
            .unwrap();
        assert!(out.success());
        assert!(out.output.contains("hello worker"));
        assert!(out.output.contains("--max-turns 7"));
        assert!(out.output.contains("tier-env"));
    }

    #[tokio::test]
    async fn non_zero_exit_is_reported() {
        let dir = TempDir::new().unwrap();
        let out = sh("echo broken; exit 3")
            .execute(&request(&dir), CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out.exit_code, Some(3));
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let dir = TempDir::new().unwrap();
        let worker = ProcessWorker::new(&WorkerConfig {
            program: "/nonexistent/foreman-worker".into(),
            args: vec![],
        });
        let err = worker
            .execute(&request(&dir), CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::Spawn { .. }));
    }

    #[tokio::test]
    async fn cancellation_kills_the_child() {
        let dir = TempDir::new().unwrap();
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });
        let err = sh("sleep 30")
            .execute(&request(&dir), cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::Cancelled));
    }
}
