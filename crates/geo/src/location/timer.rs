//! Delayed task scheduling for retry backoff.

use super::lock;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A boxed task run once when its delay elapses.
pub type Task = Box<dyn FnOnce() + Send>;

/// Schedules tasks after a delay.
///
/// Implementations must never run `task` before `schedule` returns.
pub trait Timer: Send + Sync + 'static {
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle;
}

/// A pending task. Cancelled on [`cancel`](Self::cancel) or drop.
#[must_use = "dropping a TimerHandle cancels the task"]
pub struct TimerHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl TimerHandle {
    /// Wraps a cancellation callback.
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Cancels the task if it has not run yet.
    pub fn cancel(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("pending", &self.cancel.is_some())
            .finish()
    }
}

struct ScheduledTask {
    id: u64,
    due: Duration,
    task: Task,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_id: u64,
    tasks: Vec<ScheduledTask>,
}

/// A timer driven by explicit [`advance`](Self::advance) calls.
///
/// Suits hosts with their own event loop and deterministic tests. Clones
/// share the same clock.
#[derive(Clone, Default)]
pub struct ManualTimer {
    state: Arc<Mutex<ManualState>>,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Time elapsed since creation.
    pub fn now(&self) -> Duration {
        lock(&self.state).now
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        lock(&self.state).tasks.len()
    }

    /// Moves the clock forward, running every task that falls due in
    /// deadline order. Tasks scheduled while advancing run too if their
    /// deadline is within the window.
    pub fn advance(&self, by: Duration) {
        let target = lock(&self.state).now + by;

        loop {
            let next = {
                let mut state = lock(&self.state);
                let due = state
                    .tasks
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.due <= target)
                    .min_by_key(|(_, t)| (t.due, t.id))
                    .map(|(index, _)| index);

                match due {
                    Some(index) => {
                        let task = state.tasks.remove(index);
                        state.now = task.due;
                        Some(task.task)
                    }
                    None => {
                        state.now = target;
                        None
                    }
                }
            };

            match next {
                Some(task) => task(),
                None => break,
            }
        }
    }
}

impl Timer for ManualTimer {
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle {
        let id = {
            let mut state = lock(&self.state);
            let id = state.next_id;
            state.next_id += 1;
            let due = state.now + delay;
            state.tasks.push(ScheduledTask { id, due, task });
            id
        };

        let state = Arc::clone(&self.state);
        TimerHandle::new(move || {
            lock(&state).tasks.retain(|t| t.id != id);
        })
    }
}

/// A timer backed by the tokio runtime.
#[cfg(feature = "tokio")]
#[derive(Clone, Debug)]
pub struct TokioTimer {
    handle: tokio::runtime::Handle,
}

#[cfg(feature = "tokio")]
impl TokioTimer {
    /// Spawns onto the given runtime.
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Spawns onto the runtime of the calling context, if there is one.
    pub fn try_current() -> Option<Self> {
        tokio::runtime::Handle::try_current().ok().map(Self::new)
    }
}

#[cfg(feature = "tokio")]
impl Timer for TokioTimer {
    fn schedule(&self, delay: Duration, task: Task) -> TimerHandle {
        let join = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });
        TimerHandle::new(move || join.abort())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Arc<Mutex<Vec<&'static str>>>, impl Fn(&'static str) -> Task) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&log);
        let make = move |label: &'static str| -> Task {
            let sink = Arc::clone(&sink);
            Box::new(move || lock(&sink).push(label))
        };
        (log, make)
    }

    #[test]
    fn test_runs_in_deadline_order() {
        let timer = ManualTimer::new();
        let (log, task) = recorder();

        let _late = timer.schedule(Duration::from_secs(3), task("late"));
        let _early = timer.schedule(Duration::from_secs(1), task("early"));

        timer.advance(Duration::from_secs(2));
        assert_eq!(*lock(&log), vec!["early"]);
        assert_eq!(timer.now(), Duration::from_secs(2));

        timer.advance(Duration::from_secs(1));
        assert_eq!(*lock(&log), vec!["early", "late"]);
        assert_eq!(timer.pending(), 0);
    }

    #[test]
    fn test_cancelled_task_never_runs() {
        let timer = ManualTimer::new();
        let (log, task) = recorder();

        let handle = timer.schedule(Duration::from_secs(1), task("cancelled"));
        handle.cancel();
        drop(timer.schedule(Duration::from_secs(1), task("dropped")));

        timer.advance(Duration::from_secs(5));
        assert!(lock(&log).is_empty());
    }

    #[test]
    fn test_zero_delay_waits_for_advance() {
        let timer = ManualTimer::new();
        let (log, task) = recorder();

        let _handle = timer.schedule(Duration::ZERO, task("now"));
        assert!(lock(&log).is_empty());

        timer.advance(Duration::ZERO);
        assert_eq!(*lock(&log), vec!["now"]);
    }
}
