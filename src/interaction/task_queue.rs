//! FIFO queue of deferred tasks.

use std::collections::VecDeque;
use std::fmt;

/// Identity of an enqueued task, used for cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

/// A named unit of deferred work.
pub struct Task {
    name: String,
    run: Box<dyn FnOnce()>,
}

impl Task {
    pub fn new(name: impl Into<String>, run: impl FnOnce() + 'static) -> Self {
        Self {
            name: name.into(),
            run: Box::new(run),
        }
    }

    /// A task without a meaningful name.
    pub fn from_fn(run: impl FnOnce() + 'static) -> Self {
        Self::new("?", run)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("name", &self.name).finish()
    }
}

#[derive(Debug, Default)]
pub(crate) struct TaskQueue {
    queue: VecDeque<(TaskId, Task)>,
    next_id: u64,
}

impl TaskQueue {
    pub fn enqueue(&mut self, task: Task) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.queue.push_back((id, task));
        id
    }

    /// Drop queued tasks by identity. Tasks that already ran are ignored.
    pub fn cancel(&mut self, ids: &[TaskId]) {
        self.queue.retain(|(id, _)| !ids.contains(id));
    }

    pub fn has_tasks_to_process(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Run the oldest task.
    pub fn process_next(&mut self) {
        if let Some((_, task)) = self.queue.pop_front() {
            log::debug!("running task {}", task.name);
            (task.run)();
        }
    }
}
