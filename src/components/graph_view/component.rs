use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use leptos::prelude::*;
use log::warn;
use wasm_bindgen::prelude::*;
use web_sys::{HtmlCanvasElement, MouseEvent, WheelEvent};

use super::config::ViewConfig;
use super::error::GraphViewError;
use super::init::{self, InitState, RetryPolicy, ViewSlot};
use super::render::{CanvasSurface, DocumentHost};
use super::state::{GraphView, NodeClickHandler};
use super::surface::RenderSurface;
use super::types::{GraphNode, GraphSnapshot};
use crate::scheduler::BrowserScheduler;

/// Longest step fed to the view after the tab was in the background.
const MAX_FRAME: Duration = Duration::from_millis(100);

/// Shared, cloneable access to a view that may not be attached yet.
///
/// Every call is a no-op until the view is ready, except [`Self::update`],
/// [`Self::set_show_pruned`], the trajectory calls and
/// [`Self::set_node_click_handler`], which are replayed on attach.
///
/// Clicks are queued while the view is borrowed and handed to the handler
/// afterwards, so the handler may call back into the handle.
pub struct GraphViewHandle<S = CanvasSurface> {
	slot: Rc<RefCell<ViewSlot<S>>>,
	clicks: Rc<RefCell<VecDeque<GraphNode>>>,
	on_click: Rc<RefCell<Option<NodeClickHandler>>>,
}

impl<S> Clone for GraphViewHandle<S> {
	fn clone(&self) -> Self {
		Self {
			slot: Rc::clone(&self.slot),
			clicks: Rc::clone(&self.clicks),
			on_click: Rc::clone(&self.on_click),
		}
	}
}

impl<S: RenderSurface> Default for GraphViewHandle<S> {
	fn default() -> Self {
		Self::new(RetryPolicy::default())
	}
}

impl<S: RenderSurface> GraphViewHandle<S> {
	pub fn new(policy: RetryPolicy) -> Self {
		Self {
			slot: Rc::new(RefCell::new(ViewSlot::new(policy))),
			clicks: Rc::default(),
			on_click: Rc::default(),
		}
	}

	pub fn slot(&self) -> Rc<RefCell<ViewSlot<S>>> {
		Rc::clone(&self.slot)
	}

	pub fn state(&self) -> InitState {
		self.slot.borrow().state()
	}

	pub fn is_ready(&self) -> bool {
		self.state() == InitState::Ready
	}

	fn with<R>(&self, f: impl FnOnce(&mut GraphView<S>) -> R) -> Option<R> {
		let out = self.slot.borrow_mut().with_view(f);
		self.dispatch_clicks();
		out
	}

	fn dispatch_clicks(&self) {
		loop {
			let Some(node) = self.clicks.borrow_mut().pop_front() else {
				return;
			};
			// Taken out for the call so the handler may replace itself.
			let Some(mut handler) = self.on_click.borrow_mut().take() else {
				continue;
			};
			handler(&node);
			let mut slot = self.on_click.borrow_mut();
			if slot.is_none() {
				*slot = Some(handler);
			}
		}
	}

	pub fn update(&self, snapshot: GraphSnapshot) {
		self.slot.borrow_mut().update(snapshot);
	}

	pub fn set_show_pruned(&self, show: bool) {
		self.slot.borrow_mut().set_show_pruned(show);
	}

	pub fn highlight_trajectory(&self, ids: Vec<String>) {
		self.slot.borrow_mut().highlight_trajectory(ids);
	}

	pub fn clear_trajectory_highlight(&self) {
		self.slot.borrow_mut().clear_trajectory_highlight();
	}

	pub fn highlight_node(&self, id: &str) {
		self.with(|v| v.highlight_node(id));
	}

	pub fn unhighlight_node(&self, id: &str) {
		self.with(|v| v.unhighlight_node(id));
	}

	pub fn focus_on_node(&self, id: &str) {
		self.with(|v| v.focus_on_node(id));
	}

	pub fn reset_zoom(&self) {
		self.with(|v| v.reset_zoom());
	}

	pub fn set_node_click_handler(&self, handler: impl FnMut(&GraphNode) + 'static) {
		*self.on_click.borrow_mut() = Some(Box::new(handler));
		let clicks = Rc::clone(&self.clicks);
		self.slot.borrow_mut().set_node_click_handler(Box::new(move |node: &GraphNode| {
			clicks.borrow_mut().push_back(node.clone());
		}));
	}

	pub fn best_score(&self) -> Option<f64> {
		self.slot.borrow().view().and_then(|v| v.best_score())
	}

	pub fn frame(&self, dt: Duration) {
		self.with(|v| v.frame(dt));
	}

	pub fn pointer_down(&self, x: f64, y: f64) {
		self.with(|v| v.pointer_down(x, y));
	}

	pub fn pointer_move(&self, x: f64, y: f64) {
		self.with(|v| v.pointer_move(x, y));
	}

	pub fn pointer_up(&self) {
		self.with(|v| v.pointer_up());
	}

	pub fn pointer_leave(&self) {
		self.with(|v| v.pointer_leave());
	}

	pub fn wheel(&self, x: f64, y: f64, delta_y: f64) {
		self.with(|v| v.wheel(x, y, delta_y));
	}
}

fn local_point(canvas: &HtmlCanvasElement, ev: &MouseEvent) -> (f64, f64) {
	let rect = canvas.get_bounding_client_rect();
	(
		ev.client_x() as f64 - rect.left(),
		ev.client_y() as f64 - rect.top(),
	)
}

/// Canvas bound to `handle`. Attaches with retries once mounted and then
/// draws on every animation frame.
#[component]
pub fn GraphViewCanvas(
	handle: GraphViewHandle,
	#[prop(default = "graph-canvas")] id: &'static str,
	#[prop(default = None)] width: Option<f64>,
	#[prop(default = None)] height: Option<f64>,
	#[prop(optional)] config: ViewConfig,
) -> impl IntoView {
	let canvas_ref = NodeRef::<leptos::html::Canvas>::new();
	let animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>> = Rc::new(RefCell::new(None));
	let handle_init = handle.clone();

	Effect::new(move |_| {
		let Some(canvas) = canvas_ref.get() else {
			return;
		};
		let canvas: HtmlCanvasElement = canvas.into();
		let parent = canvas.parent_element();
		let w = width.unwrap_or_else(|| parent.as_ref().map_or(800.0, |p| p.client_width() as f64));
		let h = height.unwrap_or_else(|| parent.as_ref().map_or(600.0, |p| p.client_height() as f64));
		canvas.set_width(w as u32);
		canvas.set_height(h as u32);

		let config = config.clone();
		let attach: Rc<dyn Fn() -> Result<GraphView<CanvasSurface>, GraphViewError>> =
			Rc::new(move || GraphView::attach(&DocumentHost, id, config.clone()));

		let (handle_anim, animate_init) = (handle_init.clone(), animate.clone());
		let on_ready: Rc<dyn Fn()> = Rc::new(move || {
			start_animation(handle_anim.clone(), animate_init.clone());
		});

		init::drive(
			handle_init.slot(),
			Rc::new(BrowserScheduler::new()),
			attach,
			on_ready,
		);
	});

	let canvas_el = move || canvas_ref.get().map(HtmlCanvasElement::from);

	let handle_md = handle.clone();
	let on_mousedown = move |ev: MouseEvent| {
		let Some(canvas) = canvas_el() else {
			return;
		};
		let (x, y) = local_point(&canvas, &ev);
		handle_md.pointer_down(x, y);
	};

	let handle_mm = handle.clone();
	let on_mousemove = move |ev: MouseEvent| {
		let Some(canvas) = canvas_el() else {
			return;
		};
		let (x, y) = local_point(&canvas, &ev);
		handle_mm.pointer_move(x, y);
	};

	let handle_mu = handle.clone();
	let on_mouseup = move |_: MouseEvent| handle_mu.pointer_up();

	let handle_ml = handle.clone();
	let on_mouseleave = move |_: MouseEvent| handle_ml.pointer_leave();

	let handle_wh = handle;
	let on_wheel = move |ev: WheelEvent| {
		ev.prevent_default();
		let Some(canvas) = canvas_el() else {
			return;
		};
		let (x, y) = local_point(&canvas, &ev);
		handle_wh.wheel(x, y, ev.delta_y());
	};

	view! {
		<canvas
			node_ref=canvas_ref
			id=id
			class="graph-view-canvas"
			on:mousedown=on_mousedown
			on:mousemove=on_mousemove
			on:mouseup=on_mouseup
			on:mouseleave=on_mouseleave
			on:wheel=on_wheel
			style="display: block; cursor: grab;"
		/>
	}
}

fn start_animation(handle: GraphViewHandle, animate: Rc<RefCell<Option<Closure<dyn FnMut()>>>>) {
	let Some(window) = web_sys::window() else {
		warn!("no window; animation loop not started");
		return;
	};
	let mut last = js_sys::Date::now();
	let animate_inner = animate.clone();
	*animate.borrow_mut() = Some(Closure::new(move || {
		let now = js_sys::Date::now();
		let elapsed = (now - last).max(0.0);
		last = now;
		handle.frame(Duration::from_secs_f64(elapsed / 1000.0).min(MAX_FRAME));

		if let (Some(win), Some(cb)) = (web_sys::window(), animate_inner.borrow().as_ref()) {
			let _ = win.request_animation_frame(cb.as_ref().unchecked_ref());
		}
	}));
	if let Some(ref cb) = *animate.borrow() {
		let _ = window.request_animation_frame(cb.as_ref().unchecked_ref());
	}
}
