//! Child process execution with live log forwarding.

use std::path::PathBuf;
use std::process::Stdio;

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::watch;
use tracing::{info, warn};

use skylift_core::{BuildJob, ProjectId};
use skylift_logs::LogBroker;

/// Terminal outcome of a build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildStatus {
    Succeeded,
    /// Nonzero exit. `code` is `None` when the child died to a signal.
    Failed { code: Option<i32> },
}

/// Errors preventing a build from reaching a process exit.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("source directory {0} does not exist or is not a directory")]
    SourceDir(PathBuf),

    #[error("failed to spawn build command {command:?}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("i/o error while running build: {0}")]
    Io(#[from] std::io::Error),

    #[error("build was cancelled")]
    Cancelled,
}

/// Runs build commands and streams their output to the log broker.
#[derive(Clone)]
pub struct BuildRunner {
    broker: LogBroker,
}

impl BuildRunner {
    pub fn new(broker: LogBroker) -> Self {
        Self { broker }
    }

    /// Execute the job's build command to completion.
    ///
    /// Every stdout line is forwarded verbatim to the project's log
    /// channel; stderr lines are forwarded prefixed `error: ` so
    /// subscribers can distinguish severity. No retries — a `Failed`
    /// status or an error is final until the caller re-triggers.
    pub async fn run(&self, job: &BuildJob) -> Result<BuildStatus, BuildError> {
        let (never_tx, never_rx) = watch::channel(false);
        let status = self.run_with_cancel(job, never_rx).await;
        drop(never_tx);
        status
    }

    /// Like [`run`](Self::run), but terminates the child when `cancel`
    /// flips to `true`.
    pub async fn run_with_cancel(
        &self,
        job: &BuildJob,
        mut cancel: watch::Receiver<bool>,
    ) -> Result<BuildStatus, BuildError> {
        if !job.source_dir.is_dir() {
            return Err(BuildError::SourceDir(job.source_dir.clone()));
        }

        info!(
            project = %job.project_id,
            command = %job.build_command,
            dir = %job.source_dir.display(),
            "starting build"
        );

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&job.build_command)
            .current_dir(&job.source_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BuildError::Spawn {
                command: job.build_command.clone(),
                source,
            })?;

        // Pipes are always present with Stdio::piped.
        let stdout = child.stdout.take().ok_or_else(|| {
            BuildError::Io(std::io::Error::other("child stdout not captured"))
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            BuildError::Io(std::io::Error::other("child stderr not captured"))
        })?;

        let out_task = forward_lines(self.broker.clone(), job.project_id.clone(), stdout, "");
        let err_task = forward_lines(self.broker.clone(), job.project_id.clone(), stderr, "error: ");

        let exit = tokio::select! {
            exit = child.wait() => exit?,
            changed = cancel.changed() => {
                // A closed sender means the caller never intends to
                // cancel; keep waiting on the child alone.
                if changed.is_ok() && *cancel.borrow() {
                    child.kill().await?;
                    self.broker.publish(&job.project_id, "Build Cancelled");
                    warn!(project = %job.project_id, "build cancelled");
                    return Err(BuildError::Cancelled);
                }
                child.wait().await?
            }
        };

        // Drain both pipes before emitting the completion event so the
        // last build output always precedes it.
        let _ = out_task.await;
        let _ = err_task.await;

        if exit.success() {
            self.broker.publish(&job.project_id, "Build Complete");
            info!(project = %job.project_id, "build complete");
            Ok(BuildStatus::Succeeded)
        } else {
            let code = exit.code();
            let message = match code {
                Some(code) => format!("error: Build Failed (exit code {code})"),
                None => "error: Build Failed (terminated by signal)".to_string(),
            };
            self.broker.publish(&job.project_id, &message);
            warn!(project = %job.project_id, ?code, "build failed");
            Ok(BuildStatus::Failed { code })
        }
    }
}

/// Forward each line from `pipe` to the project's log channel.
fn forward_lines<R>(
    broker: LogBroker,
    project_id: ProjectId,
    pipe: R,
    prefix: &'static str,
) -> tokio::task::JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(pipe).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    broker.publish(&project_id, &format!("{prefix}{line}"));
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(project = %project_id, error = %e, "build output pipe error");
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(project: &str, dir: &std::path::Path, command: &str) -> BuildJob {
        BuildJob::new(ProjectId::parse(project).unwrap(), dir, command)
    }

    fn workdir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("skylift-runner-{tag}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    async fn drain(rx: &mut tokio::sync::broadcast::Receiver<String>) -> Vec<String> {
        let mut events = Vec::new();
        while let Ok(payload) = rx.try_recv() {
            events.push(payload);
        }
        events
    }

    #[tokio::test]
    async fn zero_exit_is_succeeded_with_output_streamed() {
        let dir = workdir("ok");
        let broker = LogBroker::new();
        let project = ProjectId::parse("p1").unwrap();
        let mut rx = broker.subscribe(&project);

        let runner = BuildRunner::new(broker);
        let status = runner
            .run(&job("p1", &dir, "echo hello; echo world"))
            .await
            .unwrap();

        assert_eq!(status, BuildStatus::Succeeded);
        let events = drain(&mut rx).await;
        assert!(events.contains(&r#"{"log":"hello"}"#.to_string()));
        assert!(events.contains(&r#"{"log":"world"}"#.to_string()));
        // Completion event comes after the drained output.
        assert_eq!(events.last().unwrap(), r#"{"log":"Build Complete"}"#);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn nonzero_exit_is_failed_with_code_in_event() {
        let dir = workdir("fail");
        let broker = LogBroker::new();
        let project = ProjectId::parse("p1").unwrap();
        let mut rx = broker.subscribe(&project);

        let runner = BuildRunner::new(broker);
        let status = runner.run(&job("p1", &dir, "exit 3")).await.unwrap();

        assert_eq!(status, BuildStatus::Failed { code: Some(3) });
        let events = drain(&mut rx).await;
        assert!(events.iter().any(|e| e.contains("exit code 3")));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn stderr_lines_are_prefixed() {
        let dir = workdir("stderr");
        let broker = LogBroker::new();
        let project = ProjectId::parse("p1").unwrap();
        let mut rx = broker.subscribe(&project);

        let runner = BuildRunner::new(broker);
        runner
            .run(&job("p1", &dir, "echo oops >&2"))
            .await
            .unwrap();

        let events = drain(&mut rx).await;
        assert!(events.contains(&r#"{"log":"error: oops"}"#.to_string()));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn missing_source_dir_is_an_immediate_error() {
        let runner = BuildRunner::new(LogBroker::new());
        let missing = std::env::temp_dir().join("skylift-runner-never-created");
        let err = runner
            .run(&job("p1", &missing, "echo unreachable"))
            .await
            .unwrap_err();

        assert!(matches!(err, BuildError::SourceDir(_)));
    }

    #[tokio::test]
    async fn cancel_kills_the_child() {
        let dir = workdir("cancel");
        let runner = BuildRunner::new(LogBroker::new());
        let (tx, rx) = watch::channel(false);

        let j = job("p1", &dir, "sleep 30");
        let run = runner.run_with_cancel(&j, rx);
        tokio::pin!(run);

        // Let the child spawn, then cancel.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        tx.send(true).unwrap();

        let err = run.await.unwrap_err();
        assert!(matches!(err, BuildError::Cancelled));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
