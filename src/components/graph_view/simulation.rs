use std::collections::{HashMap, HashSet};
use std::f64::consts::PI;

use force_graph::{DefaultNodeIdx, EdgeData, ForceGraph, NodeData, SimulationParameters};
use log::debug;

use super::config::ForceConfig;

const INITIAL_RADIUS: f64 = 10.0;

/// Layout state of one node. Kept across snapshots while its id persists.
#[derive(Clone, Debug, PartialEq)]
pub struct Body {
	pub id: String,
	pub x: f64,
	pub y: f64,
	/// Pinned coordinates, set only while the node is dragged.
	pub fx: Option<f64>,
	pub fy: Option<f64>,
	node: DefaultNodeIdx,
	settled: bool,
}

impl Body {
	/// Whether the body has been moved by at least one tick.
	pub fn is_settled(&self) -> bool {
		self.settled
	}
}

/// Phyllotaxis spiral so fresh nodes never start stacked.
fn fresh_position(slot: usize, center: (f64, f64)) -> (f32, f32) {
	let golden_angle = PI * (3.0 - 5f64.sqrt());
	let radius = INITIAL_RADIUS * (0.5 + slot as f64).sqrt();
	let angle = slot as f64 * golden_angle;
	(
		(center.0 + radius * angle.cos()) as f32,
		(center.1 + radius * angle.sin()) as f32,
	)
}

/// Springs are undirected, so `a→b` and `b→a` share one.
fn spring_key(source: &str, target: &str) -> (String, String) {
	if source <= target {
		(source.to_owned(), target.to_owned())
	} else {
		(target.to_owned(), source.to_owned())
	}
}

/// Id-keyed layout over a [`ForceGraph`].
///
/// The solver keeps each surviving node, velocity included, across
/// snapshots. Energy follows an alpha schedule that scales the solver step,
/// and after every step the free bodies are recentred and pushed out of each
/// other's collision radius.
pub struct Simulation {
	params: ForceConfig,
	graph: ForceGraph<String, ()>,
	bodies: Vec<Body>,
	index: HashMap<String, usize>,
	springs: HashSet<(String, String)>,
	center: (f64, f64),
	alpha: f64,
	alpha_target: f64,
	running: bool,
}

impl Simulation {
	pub fn new(params: ForceConfig, center: (f64, f64)) -> Self {
		Self {
			graph: ForceGraph::new(solver_parameters(&params)),
			params,
			bodies: Vec::new(),
			index: HashMap::new(),
			springs: HashSet::new(),
			center,
			alpha: 1.0,
			alpha_target: 0.0,
			running: false,
		}
	}

	pub fn set_center(&mut self, x: f64, y: f64) {
		self.center = (x, y);
	}

	/// Replace the node set. Bodies whose id survives keep their solver node,
	/// new ids get a fresh position, missing ids are dropped with their
	/// springs.
	pub fn set_nodes<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
		let mut previous: HashMap<String, Body> = self
			.bodies
			.drain(..)
			.map(|body| (body.id.clone(), body))
			.collect();
		let mut wanted = Vec::new();
		let mut seen = HashSet::new();
		for id in ids {
			if seen.insert(id) {
				wanted.push(id);
			}
		}
		for body in previous.values().filter(|b| !seen.contains(b.id.as_str())) {
			self.graph.remove_node(body.node);
		}

		self.index.clear();
		for id in wanted {
			let slot = self.bodies.len();
			let body = match previous.remove(id) {
				Some(body) => body,
				None => {
					let (x, y) = fresh_position(slot, self.center);
					let node = self.graph.add_node(NodeData {
						x,
						y,
						mass: self.params.node_mass as f32,
						is_anchor: false,
						user_data: id.to_owned(),
					});
					Body {
						id: id.to_owned(),
						x: x as f64,
						y: y as f64,
						fx: None,
						fy: None,
						node,
						settled: false,
					}
				}
			};
			self.index.insert(id.to_owned(), slot);
			self.bodies.push(body);
		}
		self.springs
			.retain(|(s, t)| self.index.contains_key(s) && self.index.contains_key(t));
	}

	/// Replace the springs. Links naming an unknown body, self-links and
	/// repeats of the same pair are ignored.
	pub fn set_links<'a>(&mut self, links: impl IntoIterator<Item = (&'a str, &'a str)>) {
		let wanted: HashSet<(String, String)> = links
			.into_iter()
			.filter(|(s, t)| s != t && self.index.contains_key(*s) && self.index.contains_key(*t))
			.map(|(s, t)| spring_key(s, t))
			.collect();

		if self.springs.iter().any(|key| !wanted.contains(key)) {
			// The solver cannot drop a single edge, so start over from the
			// current positions.
			debug!("rebuilding layout solver for {} springs", wanted.len());
			self.rebuild_solver();
		}
		for key in wanted {
			if self.springs.contains(&key) {
				continue;
			}
			let (s, t) = (self.bodies[self.index[&key.0]].node, self.bodies[self.index[&key.1]].node);
			self.graph.add_edge(s, t, EdgeData::default());
			self.springs.insert(key);
		}
	}

	fn rebuild_solver(&mut self) {
		let mut graph = ForceGraph::new(solver_parameters(&self.params));
		for body in &mut self.bodies {
			body.node = graph.add_node(NodeData {
				x: body.x as f32,
				y: body.y as f32,
				mass: self.params.node_mass as f32,
				is_anchor: body.fx.is_some(),
				user_data: body.id.clone(),
			});
		}
		self.graph = graph;
		self.springs.clear();
	}

	pub fn bodies(&self) -> &[Body] {
		&self.bodies
	}

	pub fn body(&self, id: &str) -> Option<&Body> {
		self.index.get(id).map(|&i| &self.bodies[i])
	}

	/// Number of distinct springs currently in the solver.
	pub fn spring_count(&self) -> usize {
		self.springs.len()
	}

	/// Current coordinates, or `None` until the body has been ticked.
	pub fn position(&self, id: &str) -> Option<(f64, f64)> {
		self.body(id).filter(|b| b.settled).map(|b| (b.x, b.y))
	}

	pub fn pin(&mut self, id: &str, x: f64, y: f64) -> bool {
		let Some(&i) = self.index.get(id) else {
			return false;
		};
		let body = &mut self.bodies[i];
		body.fx = Some(x);
		body.fy = Some(y);
		body.x = x;
		body.y = y;
		let node = body.node;
		self.graph.visit_nodes_mut(|n| {
			if n.index() == node {
				n.data.x = x as f32;
				n.data.y = y as f32;
				n.data.is_anchor = true;
			}
		});
		true
	}

	pub fn unpin(&mut self, id: &str) {
		let Some(&i) = self.index.get(id) else {
			return;
		};
		let body = &mut self.bodies[i];
		body.fx = None;
		body.fy = None;
		let node = body.node;
		self.graph.visit_nodes_mut(|n| {
			if n.index() == node {
				n.data.is_anchor = false;
			}
		});
	}

	pub fn alpha(&self) -> f64 {
		self.alpha
	}

	pub fn alpha_target(&self) -> f64 {
		self.alpha_target
	}

	pub fn set_alpha_target(&mut self, target: f64) {
		self.alpha_target = target;
	}

	/// Wake the simulation up with the given energy.
	pub fn reheat(&mut self, alpha: f64) {
		self.alpha = alpha;
		self.running = true;
	}

	/// Wake the simulation up without touching its energy.
	pub fn restart(&mut self) {
		self.running = true;
	}

	pub fn is_running(&self) -> bool {
		self.running
	}

	/// Advance one tick. Returns `false` when already at rest.
	pub fn step(&mut self) -> bool {
		if !self.running {
			return false;
		}
		self.alpha += (self.alpha_target - self.alpha) * self.params.alpha_decay;
		self.graph.update((self.params.time_step * self.alpha) as f32);

		self.read_positions();
		self.recenter();
		self.separate();
		self.write_positions();

		if self.alpha < self.params.alpha_min {
			self.running = false;
		}
		true
	}

	fn read_positions(&mut self) {
		let (index, bodies) = (&self.index, &mut self.bodies);
		self.graph.visit_nodes(|node| {
			let Some(&i) = index.get(&node.data.user_data) else {
				return;
			};
			let body = &mut bodies[i];
			(body.x, body.y) = match (body.fx, body.fy) {
				(Some(fx), Some(fy)) => (fx, fy),
				_ => (node.x() as f64, node.y() as f64),
			};
			body.settled = true;
		});
	}

	fn write_positions(&mut self) {
		let (index, bodies) = (&self.index, &self.bodies);
		self.graph.visit_nodes_mut(|node| {
			let Some(body) = index.get(&node.data.user_data).map(|&i| &bodies[i]) else {
				return;
			};
			if body.fx.is_none() {
				node.data.x = body.x as f32;
				node.data.y = body.y as f32;
			}
		});
	}

	/// Shift free bodies so the centroid of all bodies sits on the center.
	fn recenter(&mut self) {
		if self.bodies.is_empty() {
			return;
		}
		let n = self.bodies.len() as f64;
		let (sx, sy) = self
			.bodies
			.iter()
			.fold((0.0, 0.0), |(sx, sy), b| (sx + b.x, sy + b.y));
		let (dx, dy) = (sx / n - self.center.0, sy / n - self.center.1);
		for body in self.bodies.iter_mut().filter(|b| b.fx.is_none()) {
			body.x -= dx;
			body.y -= dy;
		}
	}

	/// Push overlapping bodies apart until they are two collision radii
	/// apart. Pinned bodies never move.
	fn separate(&mut self) {
		let reach = 2.0 * self.params.collision_radius;
		let strength = self.params.collision_strength;
		for i in 0..self.bodies.len() {
			for j in (i + 1)..self.bodies.len() {
				let (a, b) = (&self.bodies[i], &self.bodies[j]);
				let (dx, dy) = (b.x - a.x, b.y - a.y);
				let len = (dx * dx + dy * dy).sqrt();
				if len == 0.0 || len >= reach {
					continue;
				}
				let push = (reach - len) / len * strength;
				let share = match (a.fx.is_none(), b.fx.is_none()) {
					(true, true) => (0.5, 0.5),
					(true, false) => (1.0, 0.0),
					(false, true) => (0.0, 1.0),
					(false, false) => continue,
				};
				let (px, py) = (dx * push, dy * push);
				self.bodies[i].x -= px * share.0;
				self.bodies[i].y -= py * share.0;
				self.bodies[j].x += px * share.1;
				self.bodies[j].y += py * share.1;
			}
		}
	}
}

fn solver_parameters(params: &ForceConfig) -> SimulationParameters {
	SimulationParameters {
		force_charge: params.charge() as f32,
		force_spring: params.spring_strength as f32,
		force_max: params.max_force as f32,
		node_speed: params.max_speed as f32,
		damping_factor: params.damping as f32,
	}
}
