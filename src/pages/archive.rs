use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_router::hooks::use_query_map;
use log::{info, warn};

use super::widgets::{AnalysisSummary, NodeDetails, SharedGraph};
use crate::client::{AnalysisResponse, ApiClient, ArchiveMetadata, ClientConfig};
use crate::components::graph_view::{GraphNode, GraphViewCanvas, GraphViewHandle};

#[derive(Clone, Debug, PartialEq)]
enum Loading {
	Pending,
	Loaded(ArchiveMetadata),
	Failed(String),
}

#[derive(Clone, Copy)]
struct ViewerSignals {
	run: RwSignal<Loading>,
	analysis: RwSignal<Option<AnalysisResponse>>,
	selected: RwSignal<Option<GraphNode>>,
	show_pruned: RwSignal<bool>,
}

/// Fetch the run, feed its graph to the view, then highlight the stored
/// best trajectory if the archive has one.
fn load_archive(client: ApiClient, graph: SharedGraph, sig: ViewerSignals, name: String) {
	spawn_local(async move {
		match client.archive(&name).await {
			Ok(run) => {
				info!("archive {name}: {} nodes", run.graph.nodes.len());
				graph.with_value(|g| g.update(run.graph));
				sig.run.set(Loading::Loaded(run.metadata));
			}
			Err(err) => {
				warn!("loading archive {name} failed: {err}");
				sig.run
					.set(Loading::Failed(format!("Failed to load archive: {err}")));
				return;
			}
		}
		match client.archive_analysis(&name).await {
			Ok(resp) => {
				if let AnalysisResponse::Report(report) = &resp {
					graph.with_value(|g| g.highlight_trajectory(report.best_trajectory.node_ids()));
				}
				sig.analysis.set(Some(resp));
			}
			Err(err) => warn!("archive {name} has no analysis: {err}"),
		}
	});
}

/// Read-only view of an archived run, addressed as `/archive?archive=<name>`.
#[component]
pub fn ArchiveViewer() -> impl IntoView {
	let name = use_query_map()
		.with_untracked(|query| query.get("archive"))
		.unwrap_or_default();
	let graph = GraphViewHandle::default();
	let shared_graph: SharedGraph = StoredValue::new_local(graph.clone());
	let sig = ViewerSignals {
		run: RwSignal::new(Loading::Pending),
		analysis: RwSignal::new(None),
		selected: RwSignal::new(None),
		show_pruned: RwSignal::new(true),
	};

	graph.set_node_click_handler(move |node| sig.selected.set(Some(node.clone())));
	if name.is_empty() {
		sig.run.set(Loading::Failed("No archive selected".into()));
	} else {
		let client = ApiClient::from_config(&ClientConfig::default());
		load_archive(client, shared_graph, sig, name);
	}

	let on_toggle_pruned = move |ev: leptos::ev::Event| {
		let show = event_target_checked(&ev);
		sig.show_pruned.set(show);
		shared_graph.with_value(|g| g.set_show_pruned(show));
	};

	view! {
		<div class="app archive-viewer">
			<header class="header">
				<h1>
					{move || match sig.run.get() {
						Loading::Loaded(meta) => meta.run_name,
						Loading::Pending => "Loading archive...".to_owned(),
						Loading::Failed(_) => "Archive".to_owned(),
					}}
				</h1>
				<a class="back-link" href="/">
					"Back to dashboard"
				</a>
			</header>

			{move || match sig.run.get() {
				Loading::Loaded(meta) => {
					view! {
						<div class="archive-meta">
							<p>
								<strong>"Hypothesis: "</strong>
								{meta.hypothesis}
							</p>
							<p>
								<strong>"Archived: "</strong>
								{meta.archived_at}
							</p>
						</div>
					}
						.into_any()
				}
				Loading::Failed(message) => {
					view! { <div class="notice notice-error">{message}</div> }.into_any()
				}
				Loading::Pending => view! { <p class="placeholder">"Loading..."</p> }.into_any(),
			}}

			<main class="graph-panel">
				<div class="graph-toolbar">
					<label>
						<input
							type="checkbox"
							prop:checked=move || sig.show_pruned.get()
							on:change=on_toggle_pruned
						/>
						" Show pruned"
					</label>
					<button on:click=move |_| shared_graph.with_value(|g| g.reset_zoom())>
						"Reset zoom"
					</button>
				</div>
				<div class="graph-container">
					<GraphViewCanvas handle=graph id="archive-canvas" />
				</div>
			</main>

			<aside class="details">
				<section>
					<h3>"Node Details"</h3>
					{move || match sig.selected.get() {
						Some(node) => view! { <NodeDetails node=node /> }.into_any(),
						None => {
							view! { <p class="placeholder">"Click a node to see details"</p> }
								.into_any()
						}
					}}
				</section>
				<section>
					<h3>"Analysis"</h3>
					{move || match sig.analysis.get() {
						Some(AnalysisResponse::Report(report)) => {
							view! { <AnalysisSummary report=report graph=shared_graph /> }.into_any()
						}
						Some(AnalysisResponse::Empty { message }) => {
							view! { <p class="placeholder">{message}</p> }.into_any()
						}
						None => {
							view! { <p class="placeholder">"No stored analysis"</p> }.into_any()
						}
					}}
				</section>
			</aside>
		</div>
	}
}
