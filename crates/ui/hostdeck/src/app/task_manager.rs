//! TaskManager: background operations started by dialogs.
//!
//! - Single async loop receiving `TaskCommand`s over an MPSC channel.
//! - Every operation runs under three tokens: its own (for `Cancel`), the
//!   dialog's liveness token and the manager's root token (shutdown).
//! - The result reaches the UI as `Action::TaskFinished`, and only while none
//!   of those tokens has fired. A dialog that was closed in the meantime
//!   therefore never sees a late completion.
use std::collections::HashMap;
use std::future::Future;

use futures::{FutureExt, future::BoxFuture};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::action::Action;

pub type TaskId = u64;

pub type TaskFuture = BoxFuture<'static, Result<String, String>>;

/// Commands sent to the `TaskManager` control loop.
pub enum TaskCommand {
    Spawn {
        id: TaskId,
        label: String,
        liveness: CancellationToken,
        work: TaskFuture,
    },
    /// Abort a running task; it reports nothing.
    Cancel { id: TaskId },
    /// Sent by a task when it is done, to drop its bookkeeping.
    Finished { id: TaskId },
    /// Abort everything and stop the loop.
    Shutdown,
}

/// Cloneable handle to send commands to the `TaskManager`.
#[derive(Clone)]
pub struct TaskManagerHandle {
    tx: mpsc::UnboundedSender<TaskCommand>,
}

impl TaskManagerHandle {
    pub fn spawn<F>(
        &self,
        id: TaskId,
        label: impl Into<String>,
        liveness: CancellationToken,
        work: F,
    ) -> Result<(), mpsc::error::SendError<TaskCommand>>
    where
        F: Future<Output = Result<String, String>> + Send + 'static,
    {
        self.tx.send(TaskCommand::Spawn {
            id,
            label: label.into(),
            liveness,
            work: work.boxed(),
        })
    }

    pub fn cancel(&self, id: TaskId) -> Result<(), mpsc::error::SendError<TaskCommand>> {
        self.tx.send(TaskCommand::Cancel { id })
    }

    pub fn shutdown(&self) -> Result<(), mpsc::error::SendError<TaskCommand>> {
        self.tx.send(TaskCommand::Shutdown)
    }

    /// Handle with no manager behind it; commands pile up in the receiver.
    #[cfg(test)]
    pub(crate) fn detached() -> (Self, mpsc::UnboundedReceiver<TaskCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

struct ActiveTask {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
    label: String,
}

pub struct TaskManager {
    action_tx: mpsc::UnboundedSender<Action>,
    cmd_tx: mpsc::UnboundedSender<TaskCommand>,
    cmd_rx: mpsc::UnboundedReceiver<TaskCommand>,
    root: CancellationToken,
    active: HashMap<TaskId, ActiveTask>,
}

impl TaskManager {
    /// Spawn the manager loop. `root` cancels every task when it fires.
    pub fn new(
        action_tx: mpsc::UnboundedSender<Action>,
        root: CancellationToken,
    ) -> (TaskManagerHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut mgr = TaskManager {
            action_tx,
            cmd_tx: tx.clone(),
            cmd_rx: rx,
            root,
            active: HashMap::new(),
        };
        let join = tokio::spawn(async move { mgr.run().await });
        (TaskManagerHandle { tx }, join)
    }

    async fn run(&mut self) {
        info!("TaskManager loop started");
        loop {
            let cmd = tokio::select! {
                _ = self.root.cancelled() => TaskCommand::Shutdown,
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(cmd) => cmd,
                    None => break,
                },
            };
            match cmd {
                TaskCommand::Spawn {
                    id,
                    label,
                    liveness,
                    work,
                } => self.spawn(id, label, liveness, work),
                TaskCommand::Cancel { id } => self.cancel(id),
                TaskCommand::Finished { id } => {
                    if let Some(task) = self.active.remove(&id) {
                        debug!(id, label = %task.label, "task finished");
                    }
                }
                TaskCommand::Shutdown => {
                    warn!(active = self.active.len(), "TaskManager shutdown requested");
                    self.root.cancel();
                    let ids: Vec<_> = self.active.keys().copied().collect();
                    for id in ids {
                        self.cancel(id);
                    }
                    break;
                }
            }
        }
        info!("TaskManager loop terminating");
    }

    fn spawn(&mut self, id: TaskId, label: String, liveness: CancellationToken, work: TaskFuture) {
        debug!(id, %label, "spawn task");
        if let Some(previous) = self.active.remove(&id) {
            warn!(id, label = %previous.label, "task id reused; aborting previous task");
            previous.cancel.cancel();
            previous.handle.abort();
        }

        let cancel = CancellationToken::new();
        let root = self.root.clone();
        let action_tx = self.action_tx.clone();
        let cmd_tx = self.cmd_tx.clone();
        let guard = cancel.clone();
        let task_label = label.clone();

        let handle = tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = guard.cancelled() => None,
                _ = liveness.cancelled() => None,
                _ = root.cancelled() => None,
                result = work => Some(result),
            };
            let live =
                !guard.is_cancelled() && !liveness.is_cancelled() && !root.is_cancelled();
            match outcome {
                Some(result) if live => {
                    if let Err(err) = &result {
                        warn!(id, label = %task_label, %err, "task failed");
                    }
                    let _ = action_tx.send(Action::TaskFinished { id, result });
                }
                _ => debug!(id, label = %task_label, "task abandoned"),
            }
            let _ = cmd_tx.send(TaskCommand::Finished { id });
        });

        self.active.insert(
            id,
            ActiveTask {
                handle,
                cancel,
                label,
            },
        );
    }

    fn cancel(&mut self, id: TaskId) {
        if let Some(task) = self.active.remove(&id) {
            warn!(id, label = %task.label, "cancelling task");
            task.cancel.cancel();
            task.handle.abort();
        } else {
            debug!(id, "cancel requested for unknown task");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::{sleep, timeout};

    fn manager() -> (
        TaskManagerHandle,
        JoinHandle<()>,
        mpsc::UnboundedReceiver<Action>,
        CancellationToken,
    ) {
        let (action_tx, action_rx) = mpsc::unbounded_channel();
        let root = CancellationToken::new();
        let (handle, join) = TaskManager::new(action_tx, root.clone());
        (handle, join, action_rx, root)
    }

    /// No action within the window. A channel closed by the manager counts
    /// as nothing arriving.
    async fn nothing_arrives(rx: &mut mpsc::UnboundedReceiver<Action>) -> bool {
        !matches!(
            timeout(Duration::from_millis(150), rx.recv()).await,
            Ok(Some(_))
        )
    }

    #[tokio::test]
    async fn completion_is_delivered() {
        let (tasks, _join, mut rx, _root) = manager();
        tasks
            .spawn(1, "connect", CancellationToken::new(), async {
                Ok("work".to_string())
            })
            .unwrap();
        let action = timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
        assert_eq!(
            action,
            Some(Action::TaskFinished {
                id: 1,
                result: Ok("work".into())
            })
        );
    }

    #[tokio::test]
    async fn failure_is_delivered() {
        let (tasks, _join, mut rx, _root) = manager();
        tasks
            .spawn(2, "connect", CancellationToken::new(), async {
                Err("tmux not found".to_string())
            })
            .unwrap();
        let action = timeout(Duration::from_secs(2), rx.recv()).await.unwrap();
        assert_eq!(
            action,
            Some(Action::TaskFinished {
                id: 2,
                result: Err("tmux not found".into())
            })
        );
    }

    #[tokio::test]
    async fn closed_dialog_never_sees_completion() {
        let (tasks, _join, mut rx, _root) = manager();
        let liveness = CancellationToken::new();
        tasks
            .spawn(3, "connect", liveness.clone(), async {
                sleep(Duration::from_millis(50)).await;
                Ok("late".to_string())
            })
            .unwrap();
        liveness.cancel();
        assert!(nothing_arrives(&mut rx).await);
    }

    #[tokio::test]
    async fn cancel_by_id() {
        let (tasks, _join, mut rx, _root) = manager();
        tasks
            .spawn(4, "connect", CancellationToken::new(), async {
                sleep(Duration::from_millis(50)).await;
                Ok("late".to_string())
            })
            .unwrap();
        tasks.cancel(4).unwrap();
        assert!(nothing_arrives(&mut rx).await);
    }

    #[tokio::test]
    async fn shutdown_stops_loop_and_tasks() {
        let (tasks, join, mut rx, root) = manager();
        tasks
            .spawn(5, "connect", CancellationToken::new(), async {
                sleep(Duration::from_secs(5)).await;
                Ok("never".to_string())
            })
            .unwrap();
        tasks.shutdown().unwrap();
        timeout(Duration::from_secs(2), join).await.unwrap().unwrap();
        assert!(root.is_cancelled());
        assert!(nothing_arrives(&mut rx).await);
        // the aborted task took its sender with it
        assert_eq!(timeout(Duration::from_secs(2), rx.recv()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn root_cancellation_ends_loop() {
        let (_tasks, join, _rx, root) = manager();
        root.cancel();
        timeout(Duration::from_secs(2), join).await.unwrap().unwrap();
    }
}
