use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use log::{info, warn};

use crate::scheduler::Scheduler;

use super::error::GraphViewError;
use super::state::{GraphView, NodeClickHandler};
use super::surface::RenderSurface;
use super::types::GraphSnapshot;

/// Lifecycle of binding a view to its surface.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitState {
	Uninitialized,
	/// Waiting for, or running, the given 1-based attempt.
	Retrying { attempt: u32 },
	Ready,
	Failed { attempts: u32 },
}

/// Delay before each attempt; its length caps the number of attempts.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
	pub delays: Vec<Duration>,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			delays: [100, 500, 1000].map(Duration::from_millis).to_vec(),
		}
	}
}

/// What the driver should do after an attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InitStep {
	Retry(Duration),
	Ready,
	GiveUp,
}

/// Settings that outlive a missing view. Replayed in field order on attach,
/// so the snapshot is drawn with the latest toggle and trajectory.
#[derive(Default)]
struct Pending {
	show_pruned: Option<bool>,
	/// `Some(vec![])` clears the trajectory.
	trajectory: Option<Vec<String>>,
	handler: Option<NodeClickHandler>,
	snapshot: Option<GraphSnapshot>,
}

/// Holds the view once it exists. Until then view operations are no-ops,
/// except `update`, the pruned toggle, the trajectory and the click handler,
/// which are kept and replayed on attach.
pub struct ViewSlot<S> {
	state: InitState,
	policy: RetryPolicy,
	view: Option<GraphView<S>>,
	pending: Pending,
}

impl<S: RenderSurface> ViewSlot<S> {
	pub fn new(policy: RetryPolicy) -> Self {
		Self {
			state: InitState::Uninitialized,
			policy,
			view: None,
			pending: Pending::default(),
		}
	}

	pub fn state(&self) -> InitState {
		self.state
	}

	/// Leave `Uninitialized`. Returns the delay before the first attempt, or
	/// `None` if attempts already started or the policy allows none.
	pub fn begin(&mut self) -> Option<Duration> {
		if self.state != InitState::Uninitialized {
			return None;
		}
		match self.policy.delays.first() {
			Some(&delay) => {
				self.state = InitState::Retrying { attempt: 1 };
				Some(delay)
			}
			None => {
				self.state = InitState::Failed { attempts: 0 };
				None
			}
		}
	}

	/// Record the outcome of the current attempt.
	pub fn record(&mut self, outcome: Result<GraphView<S>, GraphViewError>) -> InitStep {
		let InitState::Retrying { attempt } = self.state else {
			return match self.state {
				InitState::Ready => InitStep::Ready,
				_ => InitStep::GiveUp,
			};
		};
		match outcome {
			Ok(mut view) => {
				info!("graph view ready after {attempt} attempt(s)");
				let pending = std::mem::take(&mut self.pending);
				if let Some(show) = pending.show_pruned {
					view.set_show_pruned(show);
				}
				if let Some(ids) = pending.trajectory {
					view.highlight_trajectory(ids);
				}
				if let Some(handler) = pending.handler {
					view.set_node_click_handler(handler);
				}
				if let Some(snapshot) = pending.snapshot {
					view.update(snapshot);
				}
				self.view = Some(view);
				self.state = InitState::Ready;
				InitStep::Ready
			}
			Err(err) => match self.policy.delays.get(attempt as usize) {
				Some(&delay) => {
					warn!("graph view attempt {attempt} failed: {err}; retrying in {delay:?}");
					self.state = InitState::Retrying { attempt: attempt + 1 };
					InitStep::Retry(delay)
				}
				None => {
					warn!("graph view attempt {attempt} failed: {err}; giving up");
					self.state = InitState::Failed { attempts: attempt };
					InitStep::GiveUp
				}
			},
		}
	}

	pub fn view(&self) -> Option<&GraphView<S>> {
		self.view.as_ref()
	}

	pub fn with_view<R>(&mut self, f: impl FnOnce(&mut GraphView<S>) -> R) -> Option<R> {
		self.view.as_mut().map(f)
	}

	pub fn update(&mut self, snapshot: GraphSnapshot) {
		match self.view.as_mut() {
			Some(view) => view.update(snapshot),
			None => self.pending.snapshot = Some(snapshot),
		}
	}

	pub fn set_show_pruned(&mut self, show: bool) {
		match self.view.as_mut() {
			Some(view) => view.set_show_pruned(show),
			None => self.pending.show_pruned = Some(show),
		}
	}

	pub fn highlight_trajectory(&mut self, ids: Vec<String>) {
		match self.view.as_mut() {
			Some(view) => view.highlight_trajectory(ids),
			None => self.pending.trajectory = Some(ids),
		}
	}

	pub fn clear_trajectory_highlight(&mut self) {
		match self.view.as_mut() {
			Some(view) => view.clear_trajectory_highlight(),
			None => self.pending.trajectory = Some(Vec::new()),
		}
	}

	pub fn set_node_click_handler(&mut self, handler: NodeClickHandler) {
		match self.view.as_mut() {
			Some(view) => view.set_node_click_handler(handler),
			None => self.pending.handler = Some(handler),
		}
	}
}

/// Run attach attempts through `scheduler` until the slot is ready or the
/// policy is exhausted. `on_ready` runs once after a successful attach.
pub fn drive<S, C>(
	slot: Rc<RefCell<ViewSlot<S>>>,
	scheduler: Rc<C>,
	attach: Rc<dyn Fn() -> Result<GraphView<S>, GraphViewError>>,
	on_ready: Rc<dyn Fn()>,
) where
	S: RenderSurface + 'static,
	C: Scheduler + 'static,
{
	let first = slot.borrow_mut().begin();
	if let Some(delay) = first {
		schedule_attempt(slot, scheduler, attach, on_ready, delay);
	}
}

fn schedule_attempt<S, C>(
	slot: Rc<RefCell<ViewSlot<S>>>,
	scheduler: Rc<C>,
	attach: Rc<dyn Fn() -> Result<GraphView<S>, GraphViewError>>,
	on_ready: Rc<dyn Fn()>,
	delay: Duration,
) where
	S: RenderSurface + 'static,
	C: Scheduler + 'static,
{
	let next = Rc::clone(&scheduler);
	scheduler.schedule(
		delay,
		Box::new(move || {
			let outcome = attach();
			let step = slot.borrow_mut().record(outcome);
			match step {
				InitStep::Retry(delay) => schedule_attempt(slot, next, attach, on_ready, delay),
				InitStep::Ready => on_ready(),
				InitStep::GiveUp => {}
			}
		}),
	);
}
