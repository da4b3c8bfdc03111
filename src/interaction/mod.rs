//! Deferring work until user interactions settle.
//!
//! Interactions (gestures, running animations) register a handle while they
//! are in progress. Tasks scheduled with
//! [`InteractionManager::run_after_interactions`] run once no handle is
//! active. Handle changes are batched: the manager only records that an
//! update pass is needed and the host runs [`InteractionManager::process_update`]
//! from its idle callback (or from a timer when a deadline is configured).

mod task_queue;

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::num::NonZeroU32;
use std::rc::Rc;

pub use task_queue::{Task, TaskId};
use task_queue::TaskQueue;

/// Millisecond time source.
pub trait Clock {
    fn now_ms(&self) -> f64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> f64 {
        crate::util::now_ms()
    }
}

/// How the host should schedule the pending update pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    /// Run when the event loop is idle.
    Idle,
    /// Run from a zero-delay timer; used when a deadline is set.
    Timeout,
}

/// An in-progress interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InteractionHandle(NonZeroU32);

impl InteractionHandle {
    pub fn get(self) -> u32 {
        self.0.get()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InteractionEvent {
    /// The active set went from empty to non-empty.
    Start,
    /// The active set became empty.
    Complete,
}

/// Returned by [`InteractionManager::add_listener`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subscription(u64);

#[derive(Default)]
struct Completion {
    done: Cell<bool>,
    continuations: RefCell<Vec<Box<dyn FnOnce()>>>,
}

/// Handle to work scheduled with [`InteractionManager::run_after_interactions`].
#[derive(Clone)]
pub struct TaskHandle {
    ids: Vec<TaskId>,
    completion: Rc<Completion>,
}

impl TaskHandle {
    /// Remove the task from the queue if it has not run yet.
    pub fn cancel<C: Clock>(&self, manager: &mut InteractionManager<C>) {
        manager.queue.cancel(&self.ids);
    }

    /// Run `f` once the task has completed; immediately if it already has.
    pub fn then(&self, f: impl FnOnce() + 'static) {
        if self.completion.done.get() {
            f();
        } else {
            self.completion.continuations.borrow_mut().push(Box::new(f));
        }
    }

    pub fn is_done(&self) -> bool {
        self.completion.done.get()
    }
}

/// Tracks active interactions and runs deferred tasks when none remain.
pub struct InteractionManager<C: Clock = SystemClock> {
    clock: C,
    active: HashSet<InteractionHandle>,
    pending_add: HashSet<InteractionHandle>,
    pending_delete: HashSet<InteractionHandle>,
    queue: TaskQueue,
    scheduled: Option<PassKind>,
    counter: u32,
    deadline: Option<f64>,
    listeners: Vec<(Subscription, InteractionEvent, Rc<dyn Fn()>)>,
    next_subscription: u64,
}

impl Default for InteractionManager<SystemClock> {
    fn default() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl InteractionManager<SystemClock> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<C: Clock> InteractionManager<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            clock,
            active: HashSet::new(),
            pending_add: HashSet::new(),
            pending_delete: HashSet::new(),
            queue: TaskQueue::default(),
            scheduled: None,
            counter: 0,
            deadline: None,
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    /// Schedule `task` to run after all current interactions complete.
    pub fn run_after_interactions(&mut self, task: Option<Task>) -> TaskHandle {
        self.schedule_update();

        let completion = Rc::new(Completion::default());
        let resolver_name = format!("resolve {}", task.as_ref().map_or("?", Task::name));
        let mut ids = Vec::with_capacity(2);
        if let Some(task) = task {
            ids.push(self.queue.enqueue(task));
        }
        let state = Rc::clone(&completion);
        ids.push(self.queue.enqueue(Task::new(resolver_name, move || {
            state.done.set(true);
            let continuations = state.continuations.take();
            for continuation in continuations {
                continuation();
            }
        })));

        TaskHandle { ids, completion }
    }

    /// Mark the start of an interaction.
    pub fn create_interaction_handle(&mut self) -> InteractionHandle {
        self.schedule_update();
        self.counter = self.counter.wrapping_add(1).max(1);
        let handle = InteractionHandle(NonZeroU32::new(self.counter).unwrap_or(NonZeroU32::MIN));
        self.pending_add.insert(handle);
        handle
    }

    /// Mark the end of an interaction.
    pub fn clear_interaction_handle(&mut self, handle: InteractionHandle) {
        self.schedule_update();
        self.pending_add.remove(&handle);
        self.pending_delete.insert(handle);
    }

    pub fn add_listener(
        &mut self,
        event: InteractionEvent,
        callback: impl Fn() + 'static,
    ) -> Subscription {
        let subscription = Subscription(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((subscription, event, Rc::new(callback)));
        subscription
    }

    pub fn remove_listener(&mut self, subscription: Subscription) {
        self.listeners.retain(|(s, _, _)| *s != subscription);
    }

    /// Bound the time one update pass may spend running tasks. The remaining
    /// tasks move to a follow-up pass. Zero or less disables the deadline.
    pub fn set_deadline(&mut self, deadline_ms: f64) {
        self.deadline = (deadline_ms > 0.0).then_some(deadline_ms);
    }

    /// The update pass the host owes the manager, if any.
    pub fn scheduled_pass(&self) -> Option<PassKind> {
        self.scheduled
    }

    pub fn active_interactions(&self) -> usize {
        self.active.len()
    }

    pub fn pending_tasks(&self) -> usize {
        self.queue.len()
    }

    fn schedule_update(&mut self) {
        if self.scheduled.is_none() {
            let kind = if self.deadline.is_some() {
                PassKind::Timeout
            } else {
                PassKind::Idle
            };
            log::trace!("scheduling {kind:?} interaction pass");
            self.scheduled = Some(kind);
        }
    }

    fn emit(&self, event: InteractionEvent) {
        let callbacks: Vec<Rc<dyn Fn()>> = self
            .listeners
            .iter()
            .filter(|(_, e, _)| *e == event)
            .map(|(_, _, callback)| Rc::clone(callback))
            .collect();
        for callback in callbacks {
            callback();
        }
    }

    /// Reconcile handle changes, notify listeners and, when no interaction
    /// is active, run queued tasks.
    pub fn process_update(&mut self) {
        self.scheduled = None;

        let before = self.active.len();
        self.active.extend(self.pending_add.drain());
        for handle in self.pending_delete.drain() {
            self.active.remove(&handle);
        }
        let after = self.active.len();

        if before != 0 && after == 0 {
            self.emit(InteractionEvent::Complete);
        } else if before == 0 && after != 0 {
            self.emit(InteractionEvent::Start);
        }

        if after == 0 {
            let begin = self.clock.now_ms();
            while self.queue.has_tasks_to_process() {
                self.queue.process_next();
                if let Some(deadline) = self.deadline
                    && self.clock.now_ms() - begin >= deadline
                {
                    self.schedule_update();
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Default)]
    struct ManualClock(Rc<Cell<f64>>);

    impl Clock for ManualClock {
        fn now_ms(&self) -> f64 {
            self.0.get()
        }
    }

    fn counter(manager: &mut InteractionManager<ManualClock>, event: InteractionEvent) -> Rc<Cell<u32>> {
        let count = Rc::new(Cell::new(0));
        let sink = Rc::clone(&count);
        manager.add_listener(event, move || sink.set(sink.get() + 1));
        count
    }

    #[test]
    fn test_handles_coalesce_into_one_pass() {
        let mut manager = InteractionManager::with_clock(ManualClock::default());
        let started = counter(&mut manager, InteractionEvent::Start);
        let completed = counter(&mut manager, InteractionEvent::Complete);

        let a = manager.create_interaction_handle();
        let b = manager.create_interaction_handle();
        let c = manager.create_interaction_handle();
        manager.clear_interaction_handle(a);
        manager.clear_interaction_handle(b);
        assert_eq!(manager.scheduled_pass(), Some(PassKind::Idle));

        manager.process_update();
        assert_eq!(manager.scheduled_pass(), None);
        assert_eq!(manager.active_interactions(), 1);
        assert_eq!(started.get(), 1);
        assert_eq!(completed.get(), 0);

        manager.clear_interaction_handle(c);
        manager.process_update();
        assert_eq!(completed.get(), 1);
        assert_eq!(started.get(), 1);
    }

    #[test]
    fn test_tasks_wait_for_interactions() {
        let mut manager = InteractionManager::with_clock(ManualClock::default());
        let handle = manager.create_interaction_handle();
        let ran = Rc::new(Cell::new(false));
        let flag = Rc::clone(&ran);
        let task = manager.run_after_interactions(Some(Task::new("load", move || flag.set(true))));

        manager.process_update();
        assert!(!ran.get());
        assert!(!task.is_done());

        manager.clear_interaction_handle(handle);
        manager.process_update();
        assert!(ran.get());
        assert!(task.is_done());
    }

    #[test]
    fn test_then_and_cancel() {
        let mut manager = InteractionManager::with_clock(ManualClock::default());
        let order = Rc::new(RefCell::new(Vec::new()));

        let sink = Rc::clone(&order);
        let kept = manager.run_after_interactions(Some(Task::from_fn(move || {
            sink.borrow_mut().push("kept")
        })));
        let sink = Rc::clone(&order);
        kept.then(move || sink.borrow_mut().push("then"));

        let sink = Rc::clone(&order);
        let dropped = manager.run_after_interactions(Some(Task::from_fn(move || {
            sink.borrow_mut().push("dropped")
        })));
        dropped.cancel(&mut manager);

        manager.process_update();
        assert_eq!(*order.borrow(), vec!["kept", "then"]);
        assert!(!dropped.is_done());

        let sink = Rc::clone(&order);
        kept.then(move || sink.borrow_mut().push("late"));
        assert_eq!(order.borrow().last(), Some(&"late"));
    }

    #[test]
    fn test_deadline_splits_passes() {
        let clock = ManualClock::default();
        let mut manager = InteractionManager::with_clock(clock.clone());
        manager.set_deadline(10.0);

        for _ in 0..3 {
            let time = clock.clone();
            manager.run_after_interactions(Some(Task::from_fn(move || {
                time.0.set(time.0.get() + 6.0)
            })));
        }
        assert_eq!(manager.scheduled_pass(), Some(PassKind::Timeout));

        manager.process_update();
        assert_eq!(manager.scheduled_pass(), Some(PassKind::Timeout));
        assert!(manager.pending_tasks() > 0);

        while manager.scheduled_pass().is_some() {
            manager.process_update();
        }
        assert_eq!(manager.pending_tasks(), 0);
    }

    #[test]
    fn test_removed_listener_is_silent() {
        let mut manager = InteractionManager::with_clock(ManualClock::default());
        let count = Rc::new(Cell::new(0));
        let sink = Rc::clone(&count);
        let sub = manager.add_listener(InteractionEvent::Start, move || sink.set(sink.get() + 1));
        manager.remove_listener(sub);
        manager.create_interaction_handle();
        manager.process_update();
        assert_eq!(count.get(), 0);
    }
}
