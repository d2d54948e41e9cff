use std::cell::Cell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;
use std::time::Duration;

use proptest::prelude::*;
use reasoning_graph_view::components::graph_view::init::{self, InitState};
use reasoning_graph_view::components::graph_view::scene::rest_radius;
use reasoning_graph_view::components::graph_view::{
	GraphLink, GraphNode, GraphSnapshot, GraphView, GraphViewHandle, HeadlessHost, HeadlessSurface,
	ViewConfig, ViewTransform,
};
use reasoning_graph_view::scheduler::ManualScheduler;

const FRAME: Duration = Duration::from_millis(16);

fn view() -> GraphView<HeadlessSurface> {
	let host = HeadlessHost::default().with_surface("graph", 800.0, 600.0);
	GraphView::attach(&host, "graph", ViewConfig::default()).unwrap()
}

fn run(view: &mut GraphView<HeadlessSurface>, frames: usize) {
	for _ in 0..frames {
		view.frame(FRAME);
	}
}

/// Nodes `n{i}` for every index, pruned when divisible by three, linked as a
/// chain in index order.
fn snapshot(ids: &BTreeSet<u8>) -> GraphSnapshot {
	let ids: Vec<String> = ids.iter().map(|i| format!("n{i}")).collect();
	GraphSnapshot {
		nodes: ids
			.iter()
			.enumerate()
			.map(|(i, id)| GraphNode {
				id: id.clone(),
				score: (i % 10) as f64 / 10.0,
				cumulative_score: i as f64,
				is_pruned: id[1..].parse::<u8>().is_ok_and(|n| n % 3 == 0),
				..Default::default()
			})
			.collect(),
		links: ids.windows(2).map(|w| GraphLink::new(&w[0], &w[1])).collect(),
	}
}

fn positions(view: &GraphView<HeadlessSurface>) -> HashMap<String, (f64, f64)> {
	view.simulation()
		.bodies()
		.iter()
		.map(|b| (b.id.clone(), (b.x, b.y)))
		.collect()
}

fn id_sets() -> impl Strategy<Value = BTreeSet<u8>> {
	prop::collection::btree_set(0u8..24, 0..16)
}

proptest! {
	#[test]
	fn retained_nodes_keep_their_position(first in id_sets(), second in id_sets(), frames in 1usize..20) {
		let mut v = view();
		v.update(snapshot(&first));
		run(&mut v, frames);
		let before = positions(&v);

		v.update(snapshot(&second));
		let after = positions(&v);
		for id in first.intersection(&second).map(|i| format!("n{i}")) {
			prop_assert_eq!(before.get(&id), after.get(&id));
			let el = v.scene().node(&id).unwrap();
			prop_assert_eq!(Some(&(el.cx, el.cy)), after.get(&id));
		}
	}

	#[test]
	fn rendered_counts_match_visible_set(ids in id_sets(), show_pruned in any::<bool>()) {
		let mut v = view();
		let data = snapshot(&ids);
		v.set_show_pruned(show_pruned);
		v.update(data.clone());
		run(&mut v, 2);

		let visible = data.visible(show_pruned);
		prop_assert_eq!(v.scene().nodes().len(), visible.nodes.len());
		prop_assert_eq!(v.scene().labels().len(), visible.nodes.len());
		prop_assert_eq!(v.scene().links().len(), visible.links.len());
		prop_assert_eq!(v.simulation().bodies().len(), visible.nodes.len());
	}
}

#[test]
fn pruned_nodes_hidden_with_their_links() {
	let mut v = view();
	let data = GraphSnapshot::from_json(
		r#"{
			"nodes": [
				{ "id": "1", "score": 0.8, "is_pruned": false },
				{ "id": "2", "score": 0.3, "is_pruned": true }
			],
			"links": [{ "source": "1", "target": "2", "value": 1 }]
		}"#,
	)
	.unwrap();
	v.set_show_pruned(false);
	v.update(data);

	let ids: Vec<&str> = v.scene().nodes().iter().map(|n| n.id()).collect();
	assert_eq!(ids, ["1"]);
	assert!(v.scene().links().is_empty());

	v.set_show_pruned(true);
	assert_eq!(v.scene().nodes().len(), 2);
	assert_eq!(v.scene().links().len(), 1);
	assert_eq!(v.scene().node("2").unwrap().fill, "#888");
}

#[test]
fn second_rapid_update_wins() {
	let mut v = view();
	v.update(snapshot(&[1, 2, 3].into()));
	v.update(snapshot(&[3, 4].into()));
	run(&mut v, 1);

	let mut ids: Vec<&str> = v.scene().nodes().iter().map(|n| n.id()).collect();
	ids.sort();
	assert_eq!(ids, ["n3", "n4"]);
	assert_eq!(v.scene().links().len(), 1);
	assert!(v.scene().link("n3-n4").is_some());
}

#[test]
fn highlight_is_idempotent_and_reversible() {
	let mut v = view();
	v.update(snapshot(&[1, 2].into()));
	let rest = v.scene().node("n1").unwrap().clone();
	assert_eq!(rest.radius, rest_radius(rest.node.score));

	v.highlight_node("n1");
	let once = v.scene().node("n1").unwrap().clone();
	v.highlight_node("n1");
	assert_eq!(v.scene().node("n1").unwrap(), &once);
	assert!(once.radius > rest.radius);
	assert!(v.scene().label("n1").unwrap().highlighted);

	v.unhighlight_node("n2");
	assert_eq!(v.highlighted(), Some("n1"));
	v.unhighlight_node("n1");
	assert_eq!(v.scene().node("n1").unwrap(), &rest);

	v.highlight_node("missing");
	assert_eq!(v.highlighted(), None);
}

#[test]
fn trajectory_replaces_previous_one() {
	let mut v = view();
	v.update(snapshot(&[1, 2, 4, 5].into()));
	v.highlight_trajectory(["n1", "n2"]);
	v.highlight_trajectory(["n4", "n5"]);

	let marked: Vec<&str> = v
		.scene()
		.nodes()
		.iter()
		.filter(|n| n.marks.trajectory)
		.map(|n| n.id())
		.collect();
	assert_eq!(marked, ["n4", "n5"]);
	assert!(v.scene().link("n4-n5").unwrap().trajectory);
	assert!(!v.scene().link("n1-n2").unwrap().trajectory);
	assert!(!v.scene().link("n2-n4").unwrap().trajectory);

	v.clear_trajectory_highlight();
	assert!(v.scene().nodes().iter().all(|n| !n.marks.trajectory));
	assert!(v.scene().links().iter().all(|l| !l.trajectory));
}

#[test]
fn trajectory_and_highlight_are_independent() {
	let mut v = view();
	v.update(snapshot(&[1, 2].into()));
	v.highlight_trajectory(["n1", "n2"]);
	v.highlight_node("n1");
	v.unhighlight_node("n1");
	assert!(v.scene().node("n1").unwrap().marks.trajectory);

	v.highlight_node("n2");
	v.clear_trajectory_highlight();
	assert_eq!(v.highlighted(), Some("n2"));
}

#[test]
fn marks_survive_updates() {
	let mut v = view();
	v.update(snapshot(&[1, 2].into()));
	v.highlight_trajectory(["n1", "n2", "n4"]);
	v.select_node("n2");
	v.update(snapshot(&[1, 2, 4].into()));

	assert!(v.scene().node("n4").unwrap().marks.trajectory);
	assert!(v.scene().link("n2-n4").unwrap().trajectory);
	assert!(v.scene().node("n2").unwrap().marks.selected);
}

#[test]
fn reset_zoom_returns_to_identity() {
	let mut v = view();
	v.update(snapshot(&[1, 2].into()));
	run(&mut v, 5);
	v.wheel(100.0, 100.0, -1.0);
	v.pointer_down(700.0, 10.0);
	v.pointer_move(650.0, 60.0);
	v.pointer_up();
	assert_ne!(v.transform(), ViewTransform::IDENTITY);

	v.reset_zoom();
	assert_eq!(v.target_transform(), ViewTransform::IDENTITY);
	run(&mut v, 10);
	assert_ne!(v.transform(), ViewTransform::IDENTITY);
	run(&mut v, 40);
	assert_eq!(v.transform(), ViewTransform::IDENTITY);
}

#[test]
fn handle_replays_work_queued_before_attach() {
	let handle: GraphViewHandle<HeadlessSurface> = GraphViewHandle::default();
	let clicks = Rc::new(Cell::new(0));
	let sink = Rc::clone(&clicks);
	handle.set_node_click_handler(move |_| sink.set(sink.get() + 1));
	handle.update(snapshot(&[1, 2].into()));
	handle.reset_zoom();
	handle.focus_on_node("n1");
	assert_eq!(handle.best_score(), None);
	assert_eq!(handle.state(), InitState::Uninitialized);

	let sched = Rc::new(ManualScheduler::new());
	init::drive(
		handle.slot(),
		Rc::clone(&sched),
		Rc::new(|| {
			let host = HeadlessHost::default().with_surface("graph", 800.0, 600.0);
			GraphView::attach(&host, "graph", ViewConfig::default())
		}),
		Rc::new(|| {}),
	);
	sched.advance(Duration::from_millis(100));
	assert!(handle.is_ready());
	assert_eq!(handle.best_score(), Some(1.0));

	for _ in 0..5 {
		handle.frame(FRAME);
	}
	let (sx, sy) = screen_position(&handle, "n2");
	handle.pointer_down(sx, sy);
	handle.pointer_up();
	assert_eq!(clicks.get(), 1);
}

fn attached_handle() -> (GraphViewHandle<HeadlessSurface>, Rc<ManualScheduler>) {
	let handle: GraphViewHandle<HeadlessSurface> = GraphViewHandle::default();
	let sched = Rc::new(ManualScheduler::new());
	init::drive(
		handle.slot(),
		Rc::clone(&sched),
		Rc::new(|| {
			let host = HeadlessHost::default().with_surface("graph", 800.0, 600.0);
			GraphView::attach(&host, "graph", ViewConfig::default())
		}),
		Rc::new(|| {}),
	);
	(handle, sched)
}

fn screen_position(handle: &GraphViewHandle<HeadlessSurface>, id: &str) -> (f64, f64) {
	let slot = handle.slot();
	let slot = slot.borrow();
	let view = slot.view().unwrap();
	let el = view.scene().node(id).unwrap();
	view.transform().graph_to_screen(el.cx, el.cy)
}

#[test]
fn pruned_toggle_before_attach_hides_pruned_nodes() {
	let (handle, sched) = attached_handle();
	handle.set_show_pruned(false);
	handle.update(
		GraphSnapshot::from_json(
			r#"{
				"nodes": [
					{ "id": "1", "score": 0.8, "is_pruned": false },
					{ "id": "2", "score": 0.3, "is_pruned": true }
				],
				"links": [{ "source": "1", "target": "2" }]
			}"#,
		)
		.unwrap(),
	);
	handle.highlight_trajectory(vec!["1".into()]);
	sched.advance(Duration::from_millis(100));
	assert!(handle.is_ready());

	let slot = handle.slot();
	let slot = slot.borrow();
	let view = slot.view().unwrap();
	assert_eq!(view.scene().nodes().len(), 1);
	assert!(view.scene().links().is_empty());
	assert!(view.scene().node("1").unwrap().marks.trajectory);
}

#[test]
fn click_handler_may_call_back_into_the_handle() {
	let (handle, sched) = attached_handle();
	sched.advance(Duration::from_millis(100));
	handle.update(snapshot(&[1, 2].into()));
	for _ in 0..5 {
		handle.frame(FRAME);
	}

	let seen = Rc::new(Cell::new(0));
	let (inner, sink) = (handle.clone(), Rc::clone(&seen));
	handle.set_node_click_handler(move |node| {
		sink.set(sink.get() + 1);
		inner.highlight_node(&node.id);
		inner.focus_on_node(&node.id);
		inner.set_show_pruned(false);
	});

	let (sx, sy) = screen_position(&handle, "n2");
	handle.pointer_down(sx, sy);
	handle.pointer_up();
	assert_eq!(seen.get(), 1);
	let slot = handle.slot();
	let slot = slot.borrow();
	let view = slot.view().unwrap();
	assert_eq!(view.highlighted(), Some("n2"));
	assert_eq!(view.selected(), Some("n2"));
	assert!(!view.show_pruned());
}

#[test]
fn click_handler_may_replace_itself() {
	let (handle, sched) = attached_handle();
	sched.advance(Duration::from_millis(100));
	handle.update(snapshot(&[1, 2].into()));
	for _ in 0..5 {
		handle.frame(FRAME);
	}

	let second = Rc::new(Cell::new(0));
	let (inner, sink) = (handle.clone(), Rc::clone(&second));
	handle.set_node_click_handler(move |_| {
		let sink = Rc::clone(&sink);
		inner.set_node_click_handler(move |_| sink.set(sink.get() + 1));
	});

	for _ in 0..2 {
		let (sx, sy) = screen_position(&handle, "n1");
		handle.pointer_down(sx, sy);
		handle.pointer_up();
	}
	assert_eq!(second.get(), 1);
}
