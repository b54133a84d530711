use std::process::ExitStatus;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::process::Child;
use tokio::task::JoinHandle;

use super::types::ExitOutcome;

/// Owns a spawned child and its pump task until the child is reaped.
///
/// Cleanup runs at most once: whichever of [`finish`](Self::finish),
/// [`terminate`](Self::terminate) or `Drop` gets there first takes the child,
/// later calls just report the recorded outcome.
pub(crate) struct ChildGuard {
    child: Option<Child>,
    pid: Option<u32>,
    pump: Option<JoinHandle<u64>>,
    outcome: Arc<OnceLock<ExitOutcome>>,
    kill_grace: Duration,
}

impl ChildGuard {
    pub(crate) fn new(
        child: Child,
        pump: Option<JoinHandle<u64>>,
        outcome: Arc<OnceLock<ExitOutcome>>,
        kill_grace: Duration,
    ) -> Self {
        let pid = child.id();
        Self {
            child: Some(child),
            pid,
            pump,
            outcome,
            kill_grace,
        }
    }

    pub(crate) fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub(crate) fn outcome(&self) -> Option<ExitOutcome> {
        self.outcome.get().copied()
    }

    /// Resolves once the child has exited, without reaping it for good:
    /// the status stays available to a later `finish`. Pending forever once
    /// cleanup has taken the child.
    pub(crate) async fn wait_exit(&mut self) {
        let Some(child) = self.child.as_mut() else {
            return std::future::pending().await;
        };
        if let Err(e) = child.wait().await {
            tracing::warn!(pid = ?self.pid, error = %e, "waiting for child failed");
        }
    }

    /// Output ended: give the child `exit_wait` to exit by itself, then kill it.
    pub(crate) async fn finish(&mut self, exit_wait: Duration) -> Option<ExitOutcome> {
        self.shutdown(Some(exit_wait)).await
    }

    /// Kill the child now (if still running) and wait for it.
    pub(crate) async fn terminate(&mut self) -> Option<ExitOutcome> {
        self.shutdown(None).await
    }

    async fn shutdown(&mut self, exit_wait: Option<Duration>) -> Option<ExitOutcome> {
        let Some(mut child) = self.child.take() else {
            return self.outcome();
        };
        if let Some(task) = self.pump.take() {
            task.abort();
        }

        let pid = self.pid;
        let mut status = match child.try_wait() {
            Ok(status) => status,
            Err(e) => {
                tracing::warn!(pid = ?pid, error = %e, "try_wait on child failed");
                None
            }
        };

        if status.is_none() {
            if let Some(wait) = exit_wait {
                status = wait_bounded(&mut child, wait, pid).await;
            }
        }

        let mut killed = false;
        if status.is_none() {
            killed = true;
            tracing::info!(pid = ?pid, "killing child process");
            if let Err(e) = child.start_kill() {
                tracing::warn!(pid = ?pid, error = %e, "failed to signal child process");
            }
            status = wait_bounded(&mut child, self.kill_grace, pid).await;
            if status.is_none() {
                tracing::warn!(
                    pid = ?pid,
                    grace_ms = self.kill_grace.as_millis() as u64,
                    "child did not exit after kill; leaving it to the runtime reaper"
                );
            }
        }

        status.map(|s| record(&self.outcome, s, killed, pid))
    }
}

async fn wait_bounded(child: &mut Child, limit: Duration, pid: Option<u32>) -> Option<ExitStatus> {
    match tokio::time::timeout(limit, child.wait()).await {
        Ok(Ok(status)) => Some(status),
        Ok(Err(e)) => {
            tracing::warn!(pid = ?pid, error = %e, "waiting for child failed");
            None
        }
        Err(_) => None,
    }
}

fn record(
    cell: &OnceLock<ExitOutcome>,
    status: ExitStatus,
    killed: bool,
    pid: Option<u32>,
) -> ExitOutcome {
    let outcome = ExitOutcome {
        code: status.code(),
        killed,
    };
    let _ = cell.set(outcome);
    tracing::info!(
        pid = ?pid,
        exit_code = ?outcome.code,
        killed = outcome.killed,
        "child process exited"
    );
    outcome
}

impl Drop for ChildGuard {
    fn drop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        if let Some(task) = self.pump.take() {
            task.abort();
        }

        let pid = self.pid;
        if let Ok(Some(status)) = child.try_wait() {
            record(&self.outcome, status, false, pid);
            return;
        }

        tracing::debug!(pid = ?pid, "output dropped before child exit, killing");
        let _ = child.start_kill();

        // Reap in the background when a runtime is around; otherwise
        // kill_on_drop plus tokio's orphan reaper take care of it.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let outcome = self.outcome.clone();
            let grace = self.kill_grace;
            handle.spawn(async move {
                if let Some(status) = wait_bounded(&mut child, grace, pid).await {
                    record(&outcome, status, true, pid);
                }
            });
        }
    }
}
