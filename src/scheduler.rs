//! Deferred task scheduling behind a trait, so timer-driven logic can run on
//! browser timeouts in the app and on a virtual clock in tests.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use leptos::prelude::{TimeoutHandle, set_timeout_with_handle};
use log::warn;

/// Identifies a scheduled task so it can be cancelled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

/// A one-shot task run on the event loop.
pub type Task = Box<dyn FnOnce()>;

/// Runs tasks after a delay on the current thread.
pub trait Scheduler {
	/// Run `task` once `delay` has elapsed.
	fn schedule(&self, delay: Duration, task: Task) -> TaskId;

	/// Drop a pending task. Unknown or already-run ids are ignored.
	fn cancel(&self, id: TaskId);
}

#[derive(Default)]
struct BrowserTimers {
	next_id: u64,
	handles: HashMap<TaskId, TimeoutHandle>,
}

/// [`Scheduler`] backed by `window.setTimeout`.
#[derive(Clone, Default)]
pub struct BrowserScheduler {
	timers: Rc<RefCell<BrowserTimers>>,
}

impl BrowserScheduler {
	/// Create a scheduler with no pending timers.
	pub fn new() -> Self {
		Self::default()
	}
}

impl Scheduler for BrowserScheduler {
	fn schedule(&self, delay: Duration, task: Task) -> TaskId {
		let id = {
			let mut timers = self.timers.borrow_mut();
			timers.next_id += 1;
			TaskId(timers.next_id)
		};
		let timers = Rc::clone(&self.timers);
		let fire = move || {
			timers.borrow_mut().handles.remove(&id);
			task();
		};
		match set_timeout_with_handle(fire, delay) {
			Ok(handle) => {
				self.timers.borrow_mut().handles.insert(id, handle);
			}
			Err(err) => warn!("failed to schedule timer: {err:?}"),
		}
		id
	}

	fn cancel(&self, id: TaskId) {
		let handle = self.timers.borrow_mut().handles.remove(&id);
		if let Some(handle) = handle {
			handle.clear();
		}
	}
}

/// [`Scheduler`] on a virtual clock that only moves when told to.
#[derive(Default)]
pub struct ManualScheduler {
	now: Cell<Duration>,
	next_id: Cell<u64>,
	queue: RefCell<Vec<(Duration, TaskId, Task)>>,
}

impl ManualScheduler {
	/// Create a scheduler at time zero.
	pub fn new() -> Self {
		Self::default()
	}

	/// Current virtual time.
	pub fn now(&self) -> Duration {
		self.now.get()
	}

	/// Number of tasks waiting to run.
	pub fn pending(&self) -> usize {
		self.queue.borrow().len()
	}

	/// Delays of the pending tasks relative to now, soonest first.
	pub fn pending_delays(&self) -> Vec<Duration> {
		let now = self.now.get();
		let mut delays: Vec<Duration> = self.queue.borrow().iter().map(|(due, ..)| *due - now).collect();
		delays.sort();
		delays
	}

	/// Move the clock forward, running every task that falls due in order.
	/// Tasks scheduled while advancing run too if they fall inside the window.
	pub fn advance(&self, by: Duration) {
		let until = self.now.get() + by;
		loop {
			let next = {
				let mut queue = self.queue.borrow_mut();
				let earliest = queue
					.iter()
					.enumerate()
					.filter(|(_, (due, ..))| *due <= until)
					.min_by_key(|(_, (due, id, _))| (*due, *id))
					.map(|(i, _)| i);
				earliest.map(|i| queue.remove(i))
			};
			let Some((due, _, task)) = next else {
				break;
			};
			self.now.set(due);
			task();
		}
		self.now.set(until);
	}
}

impl Scheduler for ManualScheduler {
	fn schedule(&self, delay: Duration, task: Task) -> TaskId {
		let id = TaskId(self.next_id.get() + 1);
		self.next_id.set(id.0);
		self.queue.borrow_mut().push((self.now.get() + delay, id, task));
		id
	}

	fn cancel(&self, id: TaskId) {
		self.queue.borrow_mut().retain(|(_, queued, _)| *queued != id);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn ms(n: u64) -> Duration {
		Duration::from_millis(n)
	}

	#[test]
	fn runs_due_tasks_in_order() {
		let log = Rc::new(RefCell::new(Vec::new()));
		let s = ManualScheduler::new();
		for (delay, tag) in [(30, "c"), (10, "a"), (20, "b")] {
			let log = Rc::clone(&log);
			s.schedule(ms(delay), Box::new(move || log.borrow_mut().push(tag)));
		}
		s.advance(ms(25));
		assert_eq!(*log.borrow(), ["a", "b"]);
		assert_eq!(s.pending(), 1);
		s.advance(ms(5));
		assert_eq!(*log.borrow(), ["a", "b", "c"]);
		assert_eq!(s.now(), ms(30));
	}

	#[test]
	fn cancelled_tasks_never_run() {
		let hits = Rc::new(Cell::new(0));
		let s = ManualScheduler::new();
		let h = Rc::clone(&hits);
		let id = s.schedule(ms(10), Box::new(move || h.set(h.get() + 1)));
		s.cancel(id);
		s.cancel(id);
		s.advance(ms(100));
		assert_eq!(hits.get(), 0);
	}

	#[test]
	fn tasks_may_schedule_follow_ups() {
		let hits = Rc::new(Cell::new(0));
		let s = Rc::new(ManualScheduler::new());
		let (inner, h) = (Rc::clone(&s), Rc::clone(&hits));
		s.schedule(
			ms(10),
			Box::new(move || {
				h.set(h.get() + 1);
				let h = Rc::clone(&h);
				inner.schedule(ms(10), Box::new(move || h.set(h.get() + 10)));
			}),
		);
		s.advance(ms(20));
		assert_eq!(hits.get(), 11);
		assert_eq!(s.pending(), 0);
	}
}
