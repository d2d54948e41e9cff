//! Panels shared by the dashboard and the archive viewer.

use leptos::prelude::*;

use crate::client::AnalysisReport;
use crate::components::graph_view::{GraphNode, GraphViewHandle};

/// Graph handle that can be captured by view closures.
pub type SharedGraph = StoredValue<GraphViewHandle, LocalStorage>;

fn truncate(text: &str, max_chars: usize) -> String {
	match text.char_indices().nth(max_chars) {
		Some((cut, _)) => format!("{}...", &text[..cut]),
		None => text.to_owned(),
	}
}

/// Fields of a clicked node.
#[component]
pub fn NodeDetails(node: GraphNode) -> impl IntoView {
	let status = if node.is_pruned { "Pruned" } else { "Active" };
	view! {
		<div class="node-detail-item">
			<span class="node-detail-label">"ID:"</span>
			<span class="node-detail-value">{truncate(&node.id, 8)}</span>
		</div>
		<div class="node-detail-item">
			<span class="node-detail-label">"Score:"</span>
			<span class="node-detail-value">{format!("{:.3}", node.score)}</span>
		</div>
		<div class="node-detail-item">
			<span class="node-detail-label">"Cumulative Score:"</span>
			<span class="node-detail-value">{format!("{:.3}", node.cumulative_score)}</span>
		</div>
		<div class="node-detail-item">
			<span class="node-detail-label">"Depth:"</span>
			<span class="node-detail-value">{node.depth}</span>
		</div>
		<div class="node-detail-item">
			<span class="node-detail-label">"Status:"</span>
			<span class="node-detail-value">{status}</span>
		</div>
		<div class="node-detail-item">
			<span class="node-detail-label">"Content:"</span>
			<div class="node-detail-value node-detail-text">{truncate(&node.text, 200)}</div>
		</div>
	}
}

/// Report stats plus the best path. Hovering a step highlights its node and
/// clicking focuses it.
#[component]
pub fn AnalysisSummary(report: AnalysisReport, graph: SharedGraph) -> impl IntoView {
	let best = report.best_trajectory;
	let steps = best
		.path
		.into_iter()
		.enumerate()
		.map(|(index, step)| {
			let (enter_id, leave_id, click_id) = (step.id.clone(), step.id.clone(), step.id);
			let hovered = RwSignal::new(false);
			view! {
				<div
					class="path-step"
					class:highlighted=move || hovered.get()
					on:mouseenter=move |_| {
						hovered.set(true);
						graph.with_value(|g| g.highlight_node(&enter_id));
					}
					on:mouseleave=move |_| {
						hovered.set(false);
						graph.with_value(|g| g.unhighlight_node(&leave_id));
					}
					on:click=move |_| graph.with_value(|g| g.focus_on_node(&click_id))
				>
					<span class="step-number">{format!("{}.", index + 1)}</span>
					<span class="step-text">{step.text}</span>
					<span class="step-score">{format!("({:.2})", step.score)}</span>
				</div>
			}
		})
		.collect_view();

	view! {
		<div class="analysis-summary">
			<h4>"Analysis Summary"</h4>
			<div class="analysis-stats">
				<div class="stat-item">
					<span class="stat-label">"Total Nodes:"</span>
					<span class="stat-value">{report.total_nodes}</span>
				</div>
				<div class="stat-item">
					<span class="stat-label">"Average Score:"</span>
					<span class="stat-value">{format!("{:.3}", report.average_score)}</span>
				</div>
				<div class="stat-item">
					<span class="stat-label">"Pruned Nodes:"</span>
					<span class="stat-value">{report.pruned_nodes}</span>
				</div>
			</div>
		</div>
		<div class="best-trajectory">
			<h4>"Best Reasoning Path"</h4>
			<div class="trajectory-stats">
				<p>
					<strong>"Cumulative Score: "</strong>
					{format!("{:.3}", best.cumulative_score)}
				</p>
				<p>
					<strong>"Path Length: "</strong>
					{format!("{} steps", best.path_length)}
				</p>
			</div>
			<div class="final-insight">
				<h5>"Final Insight:"</h5>
				<p>{best.final_insight}</p>
			</div>
			<div class="reasoning-path">
				<h5>"Reasoning Path:"</h5>
				{steps}
			</div>
		</div>
	}
}
