//! Deferred task execution.
//!
//! The new-bubble notification runs as a pair of actions: a show action posted right away and a
//! hide action posted with a delay. Both are plain [`Task`] ids, so the owner can cancel them
//! and the animator can tell a stale task from a live one.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use calloop::timer::{TimeoutAction, Timer};
use calloop::{LoopHandle, RegistrationToken};

use crate::animation::Clock;

/// A deferred action of the notification animator.
///
/// `id` identifies the notification that scheduled the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    ShowNotification { id: u64 },
    HideNotification { id: u64 },
}

pub trait Scheduler {
    /// Runs `task` as soon as possible.
    fn post(&mut self, task: Task);
    /// Runs `task` after `delay`.
    ///
    /// Posting a task that is already pending replaces the pending one.
    fn post_delayed(&mut self, delay: Duration, task: Task);
    /// Prevents a pending `task` from running. Does nothing if it is not pending.
    fn cancel(&mut self, task: Task);
}

/// Scheduler driven by a [`Clock`], for tests and simulations.
///
/// Nothing runs on its own: the owner pops due tasks with [`ManualScheduler::pop_due`] and feeds
/// them back in.
#[derive(Debug)]
pub struct ManualScheduler {
    clock: Clock,
    pending: Vec<Pending>,
    next_seq: u64,
}

#[derive(Debug, Clone, Copy)]
struct Pending {
    deadline: Duration,
    seq: u64,
    task: Task,
}

impl ManualScheduler {
    pub fn new(clock: Clock) -> Self {
        Self {
            clock,
            pending: Vec::new(),
            next_seq: 0,
        }
    }

    /// Removes and returns the earliest task whose deadline has passed.
    ///
    /// Tasks with equal deadlines come out in the order they were posted.
    pub fn pop_due(&mut self) -> Option<Task> {
        let now = self.clock.now();

        let idx = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.deadline <= now)
            .min_by_key(|(_, p)| (p.deadline, p.seq))
            .map(|(idx, _)| idx)?;

        let pending = self.pending.remove(idx);
        trace!("running {:?}", pending.task);
        Some(pending.task)
    }

    /// Deadline of the earliest pending task.
    pub fn next_deadline(&self) -> Option<Duration> {
        self.pending.iter().map(|p| p.deadline).min()
    }

    pub fn is_pending(&self, task: Task) -> bool {
        self.pending.iter().any(|p| p.task == task)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Scheduler for ManualScheduler {
    fn post(&mut self, task: Task) {
        self.post_delayed(Duration::ZERO, task);
    }

    fn post_delayed(&mut self, delay: Duration, task: Task) {
        self.cancel(task);

        let deadline = self.clock.now().saturating_add(delay);
        let seq = self.next_seq;
        self.next_seq += 1;

        trace!("scheduling {task:?} in {delay:?}");
        self.pending.push(Pending {
            deadline,
            seq,
            task,
        });
    }

    fn cancel(&mut self, task: Task) {
        self.pending.retain(|p| p.task != task);
    }
}

/// Scheduler backed by timers on a calloop event loop.
///
/// When a task fires, `dispatch` is called with the loop data.
pub struct CalloopScheduler<D: 'static> {
    handle: LoopHandle<'static, D>,
    dispatch: fn(&mut D, Task),
    tokens: Rc<RefCell<HashMap<Task, RegistrationToken>>>,
}

impl<D: 'static> CalloopScheduler<D> {
    pub fn new(handle: LoopHandle<'static, D>, dispatch: fn(&mut D, Task)) -> Self {
        Self {
            handle,
            dispatch,
            tokens: Rc::new(RefCell::new(HashMap::new())),
        }
    }

    pub fn is_pending(&self, task: Task) -> bool {
        self.tokens.borrow().contains_key(&task)
    }
}

impl<D: 'static> Scheduler for CalloopScheduler<D> {
    fn post(&mut self, task: Task) {
        self.post_delayed(Duration::ZERO, task);
    }

    fn post_delayed(&mut self, delay: Duration, task: Task) {
        self.cancel(task);

        let tokens = self.tokens.clone();
        let dispatch = self.dispatch;
        let timer = Timer::from_duration(delay);
        let res = self.handle.insert_source(timer, move |_, _, data| {
            tokens.borrow_mut().remove(&task);
            trace!("running {task:?}");
            dispatch(data, task);
            TimeoutAction::Drop
        });

        match res {
            Ok(token) => {
                trace!("scheduling {task:?} in {delay:?}");
                self.tokens.borrow_mut().insert(task, token);
            }
            Err(err) => warn!("error scheduling {task:?}: {}", err.error),
        }
    }

    fn cancel(&mut self, task: Task) {
        let token = self.tokens.borrow_mut().remove(&task);
        if let Some(token) = token {
            self.handle.remove(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use calloop::EventLoop;

    use super::*;

    const SHOW: Task = Task::ShowNotification { id: 1 };
    const HIDE: Task = Task::HideNotification { id: 1 };

    #[test]
    fn manual_runs_in_deadline_order() {
        let mut clock = Clock::with_time(Duration::ZERO);
        let mut scheduler = ManualScheduler::new(clock.clone());

        scheduler.post_delayed(Duration::from_millis(100), HIDE);
        scheduler.post(SHOW);
        assert_eq!(scheduler.next_deadline(), Some(Duration::ZERO));

        assert_eq!(scheduler.pop_due(), Some(SHOW));
        assert_eq!(scheduler.pop_due(), None);

        clock.set_unadjusted(Duration::from_millis(100));
        assert_eq!(scheduler.pop_due(), Some(HIDE));
        assert!(scheduler.is_empty());
    }

    #[test]
    fn manual_equal_deadlines_are_fifo() {
        let clock = Clock::with_time(Duration::ZERO);
        let mut scheduler = ManualScheduler::new(clock);

        let other = Task::ShowNotification { id: 2 };
        scheduler.post(other);
        scheduler.post(SHOW);
        assert_eq!(scheduler.pop_due(), Some(other));
        assert_eq!(scheduler.pop_due(), Some(SHOW));
    }

    #[test]
    fn manual_cancel_is_idempotent() {
        let mut clock = Clock::with_time(Duration::ZERO);
        let mut scheduler = ManualScheduler::new(clock.clone());

        scheduler.post_delayed(Duration::from_millis(10), HIDE);
        scheduler.cancel(HIDE);
        scheduler.cancel(HIDE);
        assert!(!scheduler.is_pending(HIDE));

        clock.set_unadjusted(Duration::from_secs(1));
        assert_eq!(scheduler.pop_due(), None);
    }

    #[test]
    fn manual_repost_replaces() {
        let mut clock = Clock::with_time(Duration::ZERO);
        let mut scheduler = ManualScheduler::new(clock.clone());

        scheduler.post_delayed(Duration::from_millis(10), HIDE);
        scheduler.post_delayed(Duration::from_millis(50), HIDE);

        clock.set_unadjusted(Duration::from_millis(20));
        assert_eq!(scheduler.pop_due(), None);
        clock.set_unadjusted(Duration::from_millis(50));
        assert_eq!(scheduler.pop_due(), Some(HIDE));
        assert_eq!(scheduler.pop_due(), None);
    }

    #[derive(Default)]
    struct Data {
        ran: Vec<Task>,
    }

    #[test]
    fn calloop_dispatches_and_cancels() {
        let mut event_loop: EventLoop<'static, Data> = EventLoop::try_new().unwrap();
        let mut scheduler = CalloopScheduler::new(event_loop.handle(), |data: &mut Data, task| {
            data.ran.push(task)
        });

        scheduler.post(SHOW);
        scheduler.post_delayed(Duration::from_millis(1), HIDE);
        assert!(scheduler.is_pending(HIDE));
        scheduler.cancel(HIDE);
        assert!(!scheduler.is_pending(HIDE));

        let mut data = Data::default();
        for _ in 0..20 {
            event_loop
                .dispatch(Some(Duration::from_millis(5)), &mut data)
                .unwrap();
        }

        assert_eq!(data.ran, vec![SHOW]);
        assert!(!scheduler.is_pending(SHOW));
    }
}
