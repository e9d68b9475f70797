use std::collections::HashMap;
use tokio::task::JoinHandle;

/// Background task slots owned by a channel client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Reader,
    Writer,
    Heartbeat,
    Reconnect,
}

/// Manages background tasks with at most one live task per kind
pub struct TaskManager {
    handles: HashMap<TaskKind, JoinHandle<()>>,
}

impl TaskManager {
    /// Create a new empty task manager
    pub fn new() -> Self {
        Self {
            handles: HashMap::new(),
        }
    }

    /// Spawn a task, aborting the previous task of the same kind
    pub fn spawn<F>(&mut self, kind: TaskKind, future: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(future);
        if let Some(previous) = self.handles.insert(kind, handle) {
            previous.abort();
        }
    }

    /// Abort the task of the given kind, if any
    pub fn abort(&mut self, kind: TaskKind) {
        if let Some(handle) = self.handles.remove(&kind) {
            handle.abort();
        }
    }

    /// Forget a task without aborting it. A task calls this on its own slot
    /// before doing work that may respawn the same kind.
    pub fn detach(&mut self, kind: TaskKind) {
        self.handles.remove(&kind);
    }

    /// Whether a task of the given kind is tracked and still running
    pub fn is_running(&self, kind: TaskKind) -> bool {
        self.handles
            .get(&kind)
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Abort all tasks without waiting
    pub fn abort_all(&mut self) {
        for (_, handle) in self.handles.drain() {
            handle.abort();
        }
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TaskManager {
    fn drop(&mut self) {
        self.abort_all();
    }
}
