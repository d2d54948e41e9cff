use std::collections::{HashMap, HashSet};

use super::join::KeyedDiff;
use super::simulation::Simulation;
use super::types::{GraphLink, GraphNode};

pub const PRUNED_FILL: &str = "#888";
pub const HIGH_FILL: &str = "#4CAF50";
pub const MEDIUM_FILL: &str = "#FFC107";
pub const LOW_FILL: &str = "#F44336";

/// Label baseline offset below the node centre.
const LABEL_OFFSET: f64 = 4.0;

pub fn rest_radius(score: f64) -> f64 {
	(10.0 + score * 10.0).clamp(8.0, 20.0)
}

pub fn hover_radius(score: f64) -> f64 {
	(12.0 + score * 12.0).clamp(10.0, 25.0)
}

pub fn highlight_radius(score: f64) -> f64 {
	((10.0 + score * 10.0) * 1.3).clamp(10.0, 25.0)
}

pub fn node_fill(node: &GraphNode) -> &'static str {
	if node.is_pruned {
		PRUNED_FILL
	} else if node.score >= 0.7 {
		HIGH_FILL
	} else if node.score >= 0.4 {
		MEDIUM_FILL
	} else {
		LOW_FILL
	}
}

pub fn label_font_size(score: f64) -> f64 {
	(8.0 + score * 4.0).clamp(8.0, 12.0)
}

// A zero weight is treated like a missing one.
fn link_stroke_width(value: f64) -> f64 {
	let v = if value == 0.0 { 1.0 } else { value };
	v.sqrt() * 2.0
}

fn link_stroke_opacity(value: f64) -> f64 {
	let v = if value == 0.0 { 0.5 } else { value };
	v * 0.6
}

/// Independent emphasis channels. Trajectory and transient highlight never
/// touch each other.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Emphasis {
	pub trajectory: HashSet<String>,
	pub selected: Option<String>,
	pub highlighted: Option<String>,
	pub hovered: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NodeMarks {
	pub pruned: bool,
	pub selected: bool,
	pub trajectory: bool,
	pub highlighted: bool,
	pub hovered: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NodeElement {
	pub node: GraphNode,
	pub cx: f64,
	pub cy: f64,
	pub radius: f64,
	pub fill: &'static str,
	pub marks: NodeMarks,
}

impl NodeElement {
	fn new(node: &GraphNode) -> Self {
		let mut el = Self {
			node: node.clone(),
			cx: 0.0,
			cy: 0.0,
			radius: rest_radius(node.score),
			fill: PRUNED_FILL,
			marks: NodeMarks::default(),
		};
		el.restyle();
		el
	}

	pub fn id(&self) -> &str {
		&self.node.id
	}

	/// Recompute everything derived from data and marks. Radius is never
	/// adjusted incrementally, so emphasis cannot accumulate.
	fn restyle(&mut self) {
		let score = self.node.score;
		self.fill = node_fill(&self.node);
		self.marks.pruned = self.node.is_pruned;
		let mut radius = rest_radius(score);
		if self.marks.hovered {
			radius = radius.max(hover_radius(score));
		}
		if self.marks.highlighted {
			radius = radius.max(highlight_radius(score));
		}
		self.radius = radius;
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct LinkElement {
	pub key: String,
	pub source: String,
	pub target: String,
	pub x1: f64,
	pub y1: f64,
	pub x2: f64,
	pub y2: f64,
	pub stroke_width: f64,
	pub stroke_opacity: f64,
	pub trajectory: bool,
}

impl LinkElement {
	fn new(link: &GraphLink) -> Self {
		let mut el = Self {
			key: link.key(),
			source: link.source.clone(),
			target: link.target.clone(),
			x1: 0.0,
			y1: 0.0,
			x2: 0.0,
			y2: 0.0,
			stroke_width: link_stroke_width(link.value),
			stroke_opacity: 0.0,
			trajectory: false,
		};
		el.restyle(link);
		el
	}

	fn restyle(&mut self, link: &GraphLink) {
		self.stroke_opacity = link_stroke_opacity(link.value);
	}
}

#[derive(Clone, Debug, PartialEq)]
pub struct LabelElement {
	pub id: String,
	pub x: f64,
	pub y: f64,
	pub text: String,
	pub font_size: f64,
	pub highlighted: bool,
}

impl LabelElement {
	fn new(node: &GraphNode) -> Self {
		let mut el = Self {
			id: node.id.clone(),
			x: 0.0,
			y: 0.0,
			text: String::new(),
			font_size: 0.0,
			highlighted: false,
		};
		el.restyle(node);
		el
	}

	fn restyle(&mut self, node: &GraphNode) {
		self.text = format!("{:.2}", node.score);
		self.font_size = label_font_size(node.score);
	}
}

/// Counts of what one reconcile pass did, for logging.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileStats {
	pub created: usize,
	pub updated: usize,
	pub removed: usize,
}

/// Join `next` against `elements`, reusing retained elements in place.
fn reconcile<E, T>(
	elements: &mut Vec<E>,
	next: &[&T],
	diff: &KeyedDiff,
	key_of_element: impl Fn(&E) -> String,
	key_of_item: impl Fn(&T) -> String,
	create: impl Fn(&T) -> E,
	update: impl Fn(&mut E, &T),
) -> ReconcileStats {
	let mut existing: HashMap<String, E> = elements
		.drain(..)
		.map(|el| (key_of_element(&el), el))
		.collect();
	let mut stats = ReconcileStats::default();
	for key in &diff.removed {
		if existing.remove(key).is_some() {
			stats.removed += 1;
		}
	}

	let mut placed = HashSet::new();
	for item in next {
		let key = key_of_item(*item);
		if !placed.insert(key.clone()) {
			continue;
		}
		let el = match existing.remove(&key) {
			Some(mut el) => {
				update(&mut el, *item);
				stats.updated += 1;
				el
			}
			None => {
				stats.created += 1;
				create(*item)
			}
		};
		elements.push(el);
	}
	stats.removed += existing.len();
	stats
}

/// Retained rendered elements, one per visible node, link and label.
#[derive(Clone, Debug, Default)]
pub struct Scene {
	nodes: Vec<NodeElement>,
	links: Vec<LinkElement>,
	labels: Vec<LabelElement>,
}

impl Scene {
	pub fn nodes(&self) -> &[NodeElement] {
		&self.nodes
	}

	pub fn links(&self) -> &[LinkElement] {
		&self.links
	}

	pub fn labels(&self) -> &[LabelElement] {
		&self.labels
	}

	pub fn node(&self, id: &str) -> Option<&NodeElement> {
		self.nodes.iter().find(|n| n.id() == id)
	}

	pub fn link(&self, key: &str) -> Option<&LinkElement> {
		self.links.iter().find(|l| l.key == key)
	}

	pub fn label(&self, id: &str) -> Option<&LabelElement> {
		self.labels.iter().find(|l| l.id == id)
	}

	pub fn node_keys(&self) -> impl Iterator<Item = &str> {
		self.nodes.iter().map(NodeElement::id)
	}

	pub fn link_keys(&self) -> impl Iterator<Item = &str> {
		self.links.iter().map(|l| l.key.as_str())
	}

	pub fn label_keys(&self) -> impl Iterator<Item = &str> {
		self.labels.iter().map(|l| l.id.as_str())
	}

	pub fn reconcile_nodes(&mut self, next: &[&GraphNode], diff: &KeyedDiff) -> ReconcileStats {
		reconcile(
			&mut self.nodes,
			next,
			diff,
			|el| el.node.id.clone(),
			|n| n.id.clone(),
			NodeElement::new,
			|el, n| {
				el.node = n.clone();
				el.restyle();
			},
		)
	}

	pub fn reconcile_links(&mut self, next: &[&GraphLink], diff: &KeyedDiff) -> ReconcileStats {
		reconcile(
			&mut self.links,
			next,
			diff,
			|el| el.key.clone(),
			GraphLink::key,
			LinkElement::new,
			LinkElement::restyle,
		)
	}

	pub fn reconcile_labels(&mut self, next: &[&GraphNode], diff: &KeyedDiff) -> ReconcileStats {
		reconcile(
			&mut self.labels,
			next,
			diff,
			|el| el.id.clone(),
			|n| n.id.clone(),
			LabelElement::new,
			LabelElement::restyle,
		)
	}

	/// Re-derive every mark from the emphasis channels.
	pub fn apply_emphasis(&mut self, emphasis: &Emphasis) {
		let is = |slot: &Option<String>, id: &str| slot.as_deref() == Some(id);
		for el in &mut self.nodes {
			let id = el.node.id.as_str();
			el.marks.selected = is(&emphasis.selected, id);
			el.marks.trajectory = emphasis.trajectory.contains(id);
			el.marks.highlighted = is(&emphasis.highlighted, id);
			el.marks.hovered = is(&emphasis.hovered, id);
			el.restyle();
		}
		for el in &mut self.labels {
			el.highlighted = is(&emphasis.highlighted, &el.id);
		}
		for el in &mut self.links {
			el.trajectory = emphasis.trajectory.contains(&el.source)
				&& emphasis.trajectory.contains(&el.target);
		}
	}

	/// Copy settled body positions into the elements.
	pub fn sync_positions(&mut self, simulation: &Simulation) {
		for el in &mut self.nodes {
			if let Some((x, y)) = simulation.position(&el.node.id) {
				el.cx = x;
				el.cy = y;
			}
		}
		for el in &mut self.labels {
			if let Some((x, y)) = simulation.position(&el.id) {
				el.x = x;
				el.y = y + LABEL_OFFSET;
			}
		}
		for el in &mut self.links {
			if let Some((x, y)) = simulation.position(&el.source) {
				el.x1 = x;
				el.y1 = y;
			}
			if let Some((x, y)) = simulation.position(&el.target) {
				el.x2 = x;
				el.y2 = y;
			}
		}
	}

	/// Topmost node whose circle contains the graph-space point.
	pub fn node_at(&self, gx: f64, gy: f64) -> Option<&NodeElement> {
		self.nodes.iter().rev().find(|el| {
			let (dx, dy) = (el.cx - gx, el.cy - gy);
			dx * dx + dy * dy <= el.radius * el.radius
		})
	}
}

#[cfg(test)]
mod tests {
	use super::super::join::diff;
	use super::*;

	fn node(id: &str, score: f64, pruned: bool) -> GraphNode {
		GraphNode {
			id: id.into(),
			score,
			is_pruned: pruned,
			..Default::default()
		}
	}

	#[test]
	fn visual_encoding_thresholds() {
		assert_eq!(rest_radius(0.0), 10.0);
		assert_eq!(rest_radius(5.0), 20.0);
		assert_eq!(rest_radius(-1.0), 8.0);
		assert_eq!(node_fill(&node("a", 0.7, false)), HIGH_FILL);
		assert_eq!(node_fill(&node("a", 0.4, false)), MEDIUM_FILL);
		assert_eq!(node_fill(&node("a", 0.39, false)), LOW_FILL);
		assert_eq!(node_fill(&node("a", 0.95, true)), PRUNED_FILL);
		assert_eq!(label_font_size(0.5), 10.0);
		assert_eq!(label_font_size(3.0), 12.0);
		assert!(hover_radius(0.5) > rest_radius(0.5));
		assert!(highlight_radius(0.5) > rest_radius(0.5));
	}

	#[test]
	fn zero_link_value_falls_back() {
		let mut link = GraphLink::new("a", "b");
		link.value = 0.0;
		let el = LinkElement::new(&link);
		assert_eq!(el.stroke_width, 2.0);
		assert!((el.stroke_opacity - 0.3).abs() < 1e-12);
	}

	#[test]
	fn reconcile_updates_in_place_and_detaches_removed() {
		let mut scene = Scene::default();
		let a = node("a", 0.2, false);
		let b = node("b", 0.5, false);
		let d = diff(scene.node_keys().collect::<Vec<_>>(), ["a", "b"]);
		let stats = scene.reconcile_nodes(&[&a, &b], &d);
		assert_eq!(stats, ReconcileStats { created: 2, updated: 0, removed: 0 });

		let a2 = node("a", 0.9, false);
		let c = node("c", 0.1, false);
		let keys: Vec<String> = scene.node_keys().map(str::to_owned).collect();
		let d = diff(keys.iter().map(String::as_str), ["c", "a"]);
		let stats = scene.reconcile_nodes(&[&c, &a2], &d);
		assert_eq!(stats, ReconcileStats { created: 1, updated: 1, removed: 1 });
		assert_eq!(scene.nodes().len(), 2);
		assert!(scene.node("b").is_none());
		assert_eq!(scene.node("a").unwrap().fill, HIGH_FILL);
	}

	#[test]
	fn emphasis_channels_are_independent() {
		let mut scene = Scene::default();
		let (a, b) = (node("a", 0.5, false), node("b", 0.5, false));
		let d = diff(Vec::<&str>::new(), ["a", "b"]);
		scene.reconcile_nodes(&[&a, &b], &d);
		scene.reconcile_labels(&[&a, &b], &d);
		let link = GraphLink::new("a", "b");
		scene.reconcile_links(&[&link], &diff(Vec::<&str>::new(), ["a-b"]));

		let mut emphasis = Emphasis {
			trajectory: ["a".to_owned(), "b".to_owned()].into(),
			highlighted: Some("a".into()),
			..Default::default()
		};
		scene.apply_emphasis(&emphasis);
		let el = scene.node("a").unwrap();
		assert!(el.marks.trajectory && el.marks.highlighted);
		assert_eq!(el.radius, highlight_radius(0.5));
		assert!(scene.link("a-b").unwrap().trajectory);
		assert!(scene.label("a").unwrap().highlighted);

		emphasis.highlighted = None;
		scene.apply_emphasis(&emphasis);
		let el = scene.node("a").unwrap();
		assert!(el.marks.trajectory && !el.marks.highlighted);
		assert_eq!(el.radius, rest_radius(0.5));
	}
}
