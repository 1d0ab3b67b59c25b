//! Cooperative task queue
//!
//! Models a single-threaded host event loop with two queues:
//!
//! - **Tasks** (`defer`): zero-delay deferred work that runs on a later turn
//! - **Microtasks** (`queue_microtask`): work drained at the end of the
//!   current turn, before the next task starts
//!
//! Nothing here blocks. The host (or a test) drives the loop explicitly with
//! [`TaskQueue::run_next`] or [`TaskQueue::run_until_idle`].

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

/// A unit of deferred work
pub type Task = Box<dyn FnOnce()>;

#[derive(Default)]
struct Queues {
    tasks: VecDeque<Task>,
    microtasks: VecDeque<Task>,
    turns: u64,
}

/// Handle to a shared cooperative task queue
///
/// Clones share the same queues. The queue borrow is released before any
/// task runs, so tasks may freely enqueue more work.
#[derive(Clone, Default)]
pub struct TaskQueue {
    queues: Rc<RefCell<Queues>>,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a task for a later turn
    pub fn defer<F: FnOnce() + 'static>(&self, task: F) {
        self.queues.borrow_mut().tasks.push_back(Box::new(task));
    }

    /// Enqueue a microtask for the end of the current turn
    pub fn queue_microtask<F: FnOnce() + 'static>(&self, task: F) {
        self.queues.borrow_mut().microtasks.push_back(Box::new(task));
    }

    /// Drain the microtask queue, including microtasks queued while draining
    pub fn run_microtasks(&self) -> usize {
        let mut ran = 0;
        loop {
            let next = self.queues.borrow_mut().microtasks.pop_front();
            let Some(task) = next else {
                return ran;
            };
            task();
            ran += 1;
        }
    }

    /// Run a single task followed by a microtask checkpoint
    ///
    /// Returns false when there was no task to run. Pending microtasks are
    /// still drained in that case.
    pub fn run_next(&self) -> bool {
        let next = self.queues.borrow_mut().tasks.pop_front();
        let Some(task) = next else {
            self.run_microtasks();
            return false;
        };
        task();
        self.run_microtasks();
        self.queues.borrow_mut().turns += 1;
        true
    }

    /// Run until both queues are empty, returning the number of tasks run
    pub fn run_until_idle(&self) -> usize {
        self.run_microtasks();
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        tracing::trace!(tasks = ran, "task queue idle");
        ran
    }

    pub fn pending_tasks(&self) -> usize {
        self.queues.borrow().tasks.len()
    }

    pub fn pending_microtasks(&self) -> usize {
        self.queues.borrow().microtasks.len()
    }

    pub fn is_idle(&self) -> bool {
        let queues = self.queues.borrow();
        queues.tasks.is_empty() && queues.microtasks.is_empty()
    }

    /// Number of tasks completed so far
    pub fn turns(&self) -> u64 {
        self.queues.borrow().turns
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let queues = self.queues.borrow();
        f.debug_struct("TaskQueue")
            .field("tasks", &queues.tasks.len())
            .field("microtasks", &queues.microtasks.len())
            .field("turns", &queues.turns)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<&'static str>>>, TaskQueue) {
        (Rc::new(RefCell::new(Vec::new())), TaskQueue::new())
    }

    #[test]
    fn test_tasks_run_in_fifo_order() {
        let (log, queue) = recorder();
        for name in ["a", "b", "c"] {
            let log = log.clone();
            queue.defer(move || log.borrow_mut().push(name));
        }
        assert!(log.borrow().is_empty());
        assert_eq!(queue.run_until_idle(), 3);
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
        assert_eq!(queue.turns(), 3);
    }

    #[test]
    fn test_microtasks_drain_before_next_task() {
        let (log, queue) = recorder();

        let l = log.clone();
        let q = queue.clone();
        queue.defer(move || {
            l.borrow_mut().push("task-1");
            let l2 = l.clone();
            q.queue_microtask(move || l2.borrow_mut().push("micro"));
        });
        let l = log.clone();
        queue.defer(move || l.borrow_mut().push("task-2"));

        queue.run_until_idle();
        assert_eq!(*log.borrow(), vec!["task-1", "micro", "task-2"]);
    }

    #[test]
    fn test_task_deferred_from_task_runs_on_later_turn() {
        let (log, queue) = recorder();

        let l = log.clone();
        let q = queue.clone();
        queue.defer(move || {
            l.borrow_mut().push("outer");
            let l2 = l.clone();
            q.defer(move || l2.borrow_mut().push("inner"));
        });

        assert!(queue.run_next());
        assert_eq!(*log.borrow(), vec!["outer"]);
        assert_eq!(queue.pending_tasks(), 1);

        assert!(queue.run_next());
        assert!(!queue.run_next());
        assert_eq!(*log.borrow(), vec!["outer", "inner"]);
        assert!(queue.is_idle());
    }
}
