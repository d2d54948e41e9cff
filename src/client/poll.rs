use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use log::debug;

use crate::scheduler::{Scheduler, TaskId};

#[derive(Default)]
struct PollState {
	generation: u64,
	running: bool,
	task: Option<TaskId>,
}

/// Calls a tick function right away and then every `interval` until
/// stopped. Restarting supersedes the previous loop.
pub struct Poller<C> {
	scheduler: Rc<C>,
	interval: Duration,
	state: Rc<RefCell<PollState>>,
}

impl<C: Scheduler + 'static> Poller<C> {
	pub fn new(scheduler: Rc<C>, interval: Duration) -> Self {
		Self {
			scheduler,
			interval,
			state: Rc::default(),
		}
	}

	pub fn is_running(&self) -> bool {
		self.state.borrow().running
	}

	pub fn start(&self, on_tick: impl Fn() + 'static) {
		self.stop();
		let generation = {
			let mut state = self.state.borrow_mut();
			state.running = true;
			state.generation
		};
		debug!("polling every {:?}", self.interval);
		run_tick(
			Rc::clone(&self.scheduler),
			Rc::clone(&self.state),
			self.interval,
			generation,
			Rc::new(on_tick),
		);
	}

	/// Safe to call when idle or already stopped.
	pub fn stop(&self) {
		let task = {
			let mut state = self.state.borrow_mut();
			if state.running {
				debug!("polling stopped");
			}
			state.running = false;
			state.generation += 1;
			state.task.take()
		};
		if let Some(task) = task {
			self.scheduler.cancel(task);
		}
	}
}

fn is_current(state: &RefCell<PollState>, generation: u64) -> bool {
	let state = state.borrow();
	state.running && state.generation == generation
}

fn run_tick<C: Scheduler + 'static>(
	scheduler: Rc<C>,
	state: Rc<RefCell<PollState>>,
	interval: Duration,
	generation: u64,
	on_tick: Rc<dyn Fn()>,
) {
	if !is_current(&state, generation) {
		return;
	}
	on_tick();
	// The tick may have stopped or restarted the poller.
	if !is_current(&state, generation) {
		return;
	}
	let (next_scheduler, next_state) = (Rc::clone(&scheduler), Rc::clone(&state));
	let task = scheduler.schedule(
		interval,
		Box::new(move || run_tick(next_scheduler, next_state, interval, generation, on_tick)),
	);
	state.borrow_mut().task = Some(task);
}

/// Ticket handed out when a request is issued.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct PollTicket(u64);

/// Orders overlapping requests so a slow response never overwrites a newer
/// one that already landed.
#[derive(Debug, Default)]
pub struct PollSequence {
	issued: Cell<u64>,
	applied: Cell<u64>,
}

impl PollSequence {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn issue(&self) -> PollTicket {
		let next = self.issued.get() + 1;
		self.issued.set(next);
		PollTicket(next)
	}

	/// Whether the response for `ticket` should be applied. Accepting moves
	/// the watermark, so older tickets are rejected from then on.
	pub fn accept(&self, ticket: PollTicket) -> bool {
		if ticket.0 <= self.applied.get() {
			debug!("dropping stale response #{}", ticket.0);
			return false;
		}
		self.applied.set(ticket.0);
		true
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::scheduler::ManualScheduler;

	fn ms(n: u64) -> Duration {
		Duration::from_millis(n)
	}

	fn counting(poller: &Poller<ManualScheduler>) -> Rc<Cell<u32>> {
		let ticks = Rc::new(Cell::new(0));
		let t = Rc::clone(&ticks);
		poller.start(move || t.set(t.get() + 1));
		ticks
	}

	#[test]
	fn ticks_immediately_then_every_interval() {
		let sched = Rc::new(ManualScheduler::new());
		let poller = Poller::new(Rc::clone(&sched), ms(3000));
		let ticks = counting(&poller);
		assert_eq!(ticks.get(), 1);
		sched.advance(ms(2999));
		assert_eq!(ticks.get(), 1);
		sched.advance(ms(1));
		assert_eq!(ticks.get(), 2);
		sched.advance(ms(6000));
		assert_eq!(ticks.get(), 4);
	}

	#[test]
	fn stop_is_idempotent() {
		let sched = Rc::new(ManualScheduler::new());
		let poller = Poller::new(Rc::clone(&sched), ms(3000));
		poller.stop();
		let ticks = counting(&poller);
		poller.stop();
		poller.stop();
		assert!(!poller.is_running());
		assert_eq!(sched.pending(), 0);
		sched.advance(ms(10_000));
		assert_eq!(ticks.get(), 1);
	}

	#[test]
	fn restart_supersedes_previous_loop() {
		let sched = Rc::new(ManualScheduler::new());
		let poller = Poller::new(Rc::clone(&sched), ms(1000));
		let first = counting(&poller);
		sched.advance(ms(500));
		let second = counting(&poller);
		sched.advance(ms(2000));
		assert_eq!(first.get(), 1);
		assert_eq!(second.get(), 3);
		assert_eq!(sched.pending(), 1);
	}

	#[test]
	fn tick_may_stop_its_own_poller() {
		let sched = Rc::new(ManualScheduler::new());
		let poller = Rc::new(Poller::new(Rc::clone(&sched), ms(1000)));
		let ticks = Rc::new(Cell::new(0));
		let (t, p) = (Rc::clone(&ticks), Rc::downgrade(&poller));
		poller.start(move || {
			t.set(t.get() + 1);
			if t.get() == 2 {
				if let Some(p) = p.upgrade() {
					p.stop();
				}
			}
		});
		sched.advance(ms(5000));
		assert_eq!(ticks.get(), 2);
		assert_eq!(sched.pending(), 0);
	}

	#[test]
	fn stale_tickets_are_rejected() {
		let seq = PollSequence::new();
		let (a, b, c) = (seq.issue(), seq.issue(), seq.issue());
		assert!(seq.accept(b));
		assert!(!seq.accept(a));
		assert!(!seq.accept(b));
		assert!(seq.accept(c));
	}
}
