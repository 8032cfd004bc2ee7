#![forbid(unsafe_code)]

//! Client-side view of long-running server tasks, fed by progress pushes.

use std::collections::BTreeMap;

use crate::wire::Push;

#[derive(Debug, Clone, PartialEq)]
pub enum TaskStatus {
    Running,
    Failed(String),
    Finished,
    Aborted,
}

impl TaskStatus {
    pub fn is_done(&self) -> bool {
        !matches!(self, TaskStatus::Running)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaskState {
    pub pid: u32,
    pub label: String,
    /// Percent, 0 to 100.
    pub progress: f64,
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    tasks: BTreeMap<u32, TaskState>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, pid: u32, label: impl Into<String>) {
        self.tasks.insert(
            pid,
            TaskState {
                pid,
                label: label.into(),
                progress: 0.0,
                status: TaskStatus::Running,
            },
        );
    }

    /// Applies a progress push. Returns `false` for pushes that are not about tasks.
    pub fn apply(&mut self, push: &Push) -> bool {
        let pid = match push {
            Push::Progress(update) => update.pid,
            Push::ProgressError(failure) => failure.pid,
            Push::ProgressEnd(task) | Push::ProgressAbort(task) => task.pid,
            Push::DirUpdate(_) | Push::WatchError(_) => return false,
        };

        let task = self.tasks.entry(pid).or_insert_with(|| {
            tracing::debug!(pid, "progress for a task started elsewhere");
            TaskState {
                pid,
                label: format!("task {pid}"),
                progress: 0.0,
                status: TaskStatus::Running,
            }
        });
        match push {
            Push::Progress(update) => task.progress = update.progress.clamp(0.0, 100.0),
            Push::ProgressError(failure) => task.status = TaskStatus::Failed(failure.msg.clone()),
            Push::ProgressEnd(_) => {
                task.progress = 100.0;
                task.status = TaskStatus::Finished;
            }
            Push::ProgressAbort(_) => task.status = TaskStatus::Aborted,
            Push::DirUpdate(_) | Push::WatchError(_) => {}
        }
        true
    }

    /// Highest pid still running, i.e. the most recently started one.
    pub fn latest_running(&self) -> Option<u32> {
        self.tasks
            .values()
            .rev()
            .find(|task| !task.status.is_done())
            .map(|task| task.pid)
    }

    pub fn get(&self, pid: u32) -> Option<&TaskState> {
        self.tasks.get(&pid)
    }

    pub fn list(&self) -> Vec<TaskState> {
        self.tasks.values().cloned().collect()
    }

    pub fn evict_finished(&mut self) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|_, task| !task.status.is_done());
        before - self.tasks.len()
    }
}
