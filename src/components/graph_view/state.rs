use std::mem;
use std::time::Duration;

use log::{debug, info};

use super::config::ViewConfig;
use super::error::GraphViewError;
use super::join;
use super::scene::{Emphasis, Scene};
use super::simulation::Simulation;
use super::surface::{RenderSurface, SurfaceHost};
use super::types::{GraphNode, GraphSnapshot};
use super::viewport::{ViewTransform, Viewport};

/// Callback invoked with the full node data when a node is clicked.
pub type NodeClickHandler = Box<dyn FnMut(&GraphNode)>;

#[derive(Clone, Debug, Default)]
pub struct DragState {
	pub node: Option<String>,
	pub start_x: f64,
	pub start_y: f64,
	pub node_start_x: f64,
	pub node_start_y: f64,
	pub moved: bool,
}

#[derive(Clone, Debug, PartialEq)]
enum DeferredAction {
	ClearFocusHighlight { token: u64, id: String },
}

#[derive(Clone, Debug)]
struct Deferred {
	due: Duration,
	action: DeferredAction,
}

/// Force-directed view kept in sync with the latest graph snapshot.
///
/// Time only moves through [`GraphView::frame`], which ticks the layout,
/// advances viewport animations, fires deferred actions and draws.
pub struct GraphView<S> {
	surface: S,
	config: ViewConfig,
	simulation: Simulation,
	scene: Scene,
	viewport: Viewport,
	emphasis: Emphasis,
	trajectory: Vec<String>,
	snapshot: Option<GraphSnapshot>,
	show_pruned: bool,
	best_score: Option<f64>,
	drag: DragState,
	click_handler: Option<NodeClickHandler>,
	clock: Duration,
	focus_token: u64,
	deferred: Vec<Deferred>,
}

impl<S: RenderSurface> GraphView<S> {
	/// Bind to the surface registered under `surface_id`.
	pub fn attach<H>(host: &H, surface_id: &str, config: ViewConfig) -> Result<Self, GraphViewError>
	where
		H: SurfaceHost<Surface = S>,
	{
		let surface = host
			.find_surface(surface_id)
			.ok_or_else(|| GraphViewError::SurfaceNotFound(surface_id.to_owned()))?;
		Ok(Self::new(surface, config))
	}

	pub fn new(surface: S, config: ViewConfig) -> Self {
		let (width, height) = surface.size();
		info!("graph view attached to {width}x{height} surface");
		Self {
			simulation: Simulation::new(config.forces.clone(), (width / 2.0, height / 2.0)),
			viewport: Viewport::new(width, height, config.min_scale, config.max_scale),
			surface,
			config,
			scene: Scene::default(),
			emphasis: Emphasis::default(),
			trajectory: Vec::new(),
			snapshot: None,
			show_pruned: true,
			best_score: None,
			drag: DragState::default(),
			click_handler: None,
			clock: Duration::ZERO,
			focus_token: 0,
			deferred: Vec::new(),
		}
	}

	/// Replace the working set with `snapshot` and resync scene and layout.
	pub fn update(&mut self, snapshot: GraphSnapshot) {
		self.best_score = snapshot.best_score();
		self.snapshot = Some(snapshot);
		self.rebuild();
	}

	/// Show or hide pruned nodes, re-deriving from the last snapshot.
	pub fn set_show_pruned(&mut self, show: bool) {
		if self.show_pruned == show {
			return;
		}
		self.show_pruned = show;
		self.rebuild();
	}

	fn rebuild(&mut self) {
		let Some(snapshot) = self.snapshot.as_ref() else {
			return;
		};
		let visible = snapshot.visible(self.show_pruned);
		let link_keys: Vec<String> = visible.links.iter().map(|l| l.key()).collect();

		let node_diff = join::diff(self.scene.node_keys(), visible.nodes.iter().map(|n| n.id.as_str()));
		let label_diff =
			join::diff(self.scene.label_keys(), visible.nodes.iter().map(|n| n.id.as_str()));
		let link_diff = join::diff(self.scene.link_keys(), link_keys.iter().map(String::as_str));

		let nodes = self.scene.reconcile_nodes(&visible.nodes, &node_diff);
		let links = self.scene.reconcile_links(&visible.links, &link_diff);
		self.scene.reconcile_labels(&visible.nodes, &label_diff);
		self.scene.apply_emphasis(&self.emphasis);

		self.simulation
			.set_nodes(visible.nodes.iter().map(|n| n.id.as_str()));
		self.simulation.set_links(
			visible
				.links
				.iter()
				.map(|l| (l.source.as_str(), l.target.as_str())),
		);
		self.simulation.reheat(self.config.restart_alpha);
		self.scene.sync_positions(&self.simulation);

		if let Some(id) = self.drag.node.as_deref() {
			if self.simulation.body(id).is_none() {
				debug!("dragged node {id} left the view");
				self.drag = DragState::default();
			}
		}

		debug!(
			"graph update: nodes +{} ~{} -{}, links +{} ~{} -{}",
			nodes.created, nodes.updated, nodes.removed, links.created, links.updated, links.removed
		);
	}

	pub fn set_node_click_handler(&mut self, handler: impl FnMut(&GraphNode) + 'static) {
		self.click_handler = Some(Box::new(handler));
	}

	/// Mark the nodes of `ids` and every link joining two of them. Replaces
	/// any previous trajectory.
	pub fn highlight_trajectory<I, T>(&mut self, ids: I)
	where
		I: IntoIterator<Item = T>,
		T: Into<String>,
	{
		self.trajectory = ids.into_iter().map(Into::into).collect();
		self.emphasis.trajectory = self.trajectory.iter().cloned().collect();
		self.scene.apply_emphasis(&self.emphasis);
	}

	pub fn clear_trajectory_highlight(&mut self) {
		self.trajectory.clear();
		self.emphasis.trajectory.clear();
		self.scene.apply_emphasis(&self.emphasis);
	}

	pub fn highlight_node(&mut self, id: &str) {
		if self.scene.node(id).is_none() {
			return;
		}
		self.emphasis.highlighted = Some(id.to_owned());
		self.scene.apply_emphasis(&self.emphasis);
	}

	pub fn unhighlight_node(&mut self, id: &str) {
		if self.emphasis.highlighted.as_deref() != Some(id) {
			return;
		}
		self.emphasis.highlighted = None;
		self.scene.apply_emphasis(&self.emphasis);
	}

	/// Select `id`, deselecting whatever was selected before.
	pub fn select_node(&mut self, id: &str) {
		if self.scene.node(id).is_none() {
			return;
		}
		self.emphasis.selected = Some(id.to_owned());
		self.scene.apply_emphasis(&self.emphasis);
	}

	/// Select the node and hand its data to the click handler.
	pub fn click_node(&mut self, id: &str) {
		let Some(node) = self.scene.node(id).map(|el| el.node.clone()) else {
			return;
		};
		self.select_node(id);
		if let Some(handler) = self.click_handler.as_mut() {
			handler(&node);
		}
	}

	/// Center the viewport on the node's current layout position and
	/// highlight it for a while. No-op until the node has been laid out.
	pub fn focus_on_node(&mut self, id: &str) {
		let Some((x, y)) = self.simulation.position(id) else {
			debug!("focus on {id} skipped: no layout position yet");
			return;
		};
		let target = ViewTransform::centered_on(
			x,
			y,
			self.viewport.width,
			self.viewport.height,
			self.config.focus_scale,
		);
		self.viewport.animate_to(target, self.config.transition());
		self.highlight_node(id);

		self.focus_token += 1;
		self.deferred.push(Deferred {
			due: self.clock + self.config.focus_highlight(),
			action: DeferredAction::ClearFocusHighlight {
				token: self.focus_token,
				id: id.to_owned(),
			},
		});
	}

	pub fn reset_zoom(&mut self) {
		self.viewport
			.animate_to(ViewTransform::IDENTITY, self.config.transition());
	}

	pub fn resize(&mut self, width: f64, height: f64) {
		self.viewport.width = width;
		self.viewport.height = height;
		self.simulation.set_center(width / 2.0, height / 2.0);
	}

	/// Node under the screen-space point, if any.
	pub fn node_at(&self, sx: f64, sy: f64) -> Option<&GraphNode> {
		let (gx, gy) = self.viewport.screen_to_graph(sx, sy);
		self.scene.node_at(gx, gy).map(|el| &el.node)
	}

	/// Press on a node pins it and keeps the layout warm; press elsewhere pans.
	pub fn pointer_down(&mut self, sx: f64, sy: f64) {
		let hit = self.node_at(sx, sy).map(|n| n.id.clone());
		let Some(id) = hit else {
			self.viewport.begin_pan(sx, sy);
			return;
		};
		let Some((x, y)) = self.simulation.body(&id).map(|b| (b.x, b.y)) else {
			return;
		};
		self.simulation.pin(&id, x, y);
		self.simulation.set_alpha_target(self.config.drag_alpha_target);
		self.simulation.restart();
		self.drag = DragState {
			node: Some(id),
			start_x: sx,
			start_y: sy,
			node_start_x: x,
			node_start_y: y,
			moved: false,
		};
	}

	pub fn pointer_move(&mut self, sx: f64, sy: f64) {
		if let Some(id) = self.drag.node.clone() {
			let k = self.viewport.transform().k;
			let (dx, dy) = (sx - self.drag.start_x, sy - self.drag.start_y);
			if (dx * dx + dy * dy).sqrt() > self.config.click_tolerance {
				self.drag.moved = true;
			}
			let (nx, ny) = (self.drag.node_start_x + dx / k, self.drag.node_start_y + dy / k);
			if !self.simulation.pin(&id, nx, ny) {
				self.drag = DragState::default();
			}
			return;
		}

		let hovered = self.node_at(sx, sy).map(|n| n.id.clone());
		self.set_hover(hovered);
		self.viewport.pan_to(sx, sy);
	}

	/// Release unpins the dragged node; a release without movement is a click.
	pub fn pointer_up(&mut self) {
		self.viewport.end_pan();
		let drag = mem::take(&mut self.drag);
		let Some(id) = drag.node else {
			return;
		};
		self.release(&id);
		if !drag.moved {
			self.click_node(&id);
		}
	}

	pub fn pointer_leave(&mut self) {
		self.viewport.end_pan();
		if let Some(id) = mem::take(&mut self.drag).node {
			self.release(&id);
		}
		self.set_hover(None);
	}

	pub fn wheel(&mut self, sx: f64, sy: f64, delta_y: f64) {
		let step = self.config.wheel_zoom_step;
		let factor = if delta_y > 0.0 { 1.0 / step } else { step };
		self.viewport.zoom_at(sx, sy, factor);
	}

	fn release(&mut self, id: &str) {
		self.simulation.set_alpha_target(0.0);
		self.simulation.unpin(id);
	}

	fn set_hover(&mut self, id: Option<String>) {
		if self.emphasis.hovered == id {
			return;
		}
		self.emphasis.hovered = id;
		self.scene.apply_emphasis(&self.emphasis);
	}

	/// Advance the view by `dt` and draw it.
	pub fn frame(&mut self, dt: Duration) {
		self.clock += dt;
		self.run_deferred();
		self.viewport.advance(dt);
		if self.simulation.step() {
			self.scene.sync_positions(&self.simulation);
		}
		self.surface.draw(&self.scene, &self.viewport.transform());
	}

	fn run_deferred(&mut self) {
		let now = self.clock;
		let (due, pending): (Vec<_>, Vec<_>) =
			mem::take(&mut self.deferred).into_iter().partition(|d| d.due <= now);
		self.deferred = pending;
		for task in due {
			match task.action {
				DeferredAction::ClearFocusHighlight { token, id } => {
					if token == self.focus_token {
						self.unhighlight_node(&id);
					} else {
						debug!("dropping stale focus clear for {id}");
					}
				}
			}
		}
	}
}

impl<S> GraphView<S> {
	pub fn scene(&self) -> &Scene {
		&self.scene
	}

	pub fn simulation(&self) -> &Simulation {
		&self.simulation
	}

	pub fn transform(&self) -> ViewTransform {
		self.viewport.transform()
	}

	/// Transform the viewport is heading to, equal to [`Self::transform`]
	/// when idle.
	pub fn target_transform(&self) -> ViewTransform {
		self.viewport.target()
	}

	pub fn snapshot(&self) -> Option<&GraphSnapshot> {
		self.snapshot.as_ref()
	}

	pub fn best_score(&self) -> Option<f64> {
		self.best_score
	}

	pub fn show_pruned(&self) -> bool {
		self.show_pruned
	}

	pub fn selected(&self) -> Option<&str> {
		self.emphasis.selected.as_deref()
	}

	pub fn highlighted(&self) -> Option<&str> {
		self.emphasis.highlighted.as_deref()
	}

	pub fn trajectory(&self) -> &[String] {
		&self.trajectory
	}

	pub fn is_dragging(&self) -> bool {
		self.drag.node.is_some()
	}

	pub fn config(&self) -> &ViewConfig {
		&self.config
	}

	pub fn surface(&self) -> &S {
		&self.surface
	}
}
