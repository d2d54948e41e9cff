use std::rc::Rc;

use leptos::prelude::*;
use leptos::task::spawn_local;
use log::{error, info, warn};
use web_sys::KeyboardEvent;

use super::widgets::{AnalysisSummary, NodeDetails, SharedGraph};
use crate::client::{
	AnalysisResponse, ApiClient, ArchiveSummary, ClientConfig, PollSequence, Poller, StartRequest,
	StopRequest,
};
use crate::components::graph_view::{GraphNode, GraphViewCanvas, GraphViewHandle};
use crate::scheduler::BrowserScheduler;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum RunPhase {
	Ready,
	Starting,
	Running,
	Stopping,
}

impl RunPhase {
	fn label(self) -> &'static str {
		match self {
			Self::Ready => "Ready",
			Self::Starting => "Starting...",
			Self::Running => "Running",
			Self::Stopping => "Stopping & Archiving...",
		}
	}

	fn class(self) -> &'static str {
		match self {
			Self::Ready => "value status-ready",
			Self::Running => "value status-running",
			Self::Starting | Self::Stopping => "value loading",
		}
	}
}

#[derive(Clone, Debug, PartialEq)]
enum Notice {
	Success(String),
	Error(String),
}

/// Reactive page state. All fields are signals, so the struct is `Copy`.
#[derive(Clone, Copy)]
struct PageSignals {
	phase: RwSignal<RunPhase>,
	node_count: RwSignal<usize>,
	best_score: RwSignal<Option<f64>>,
	analysis: RwSignal<Option<AnalysisResponse>>,
	selected: RwSignal<Option<GraphNode>>,
	notice: RwSignal<Option<Notice>>,
	hypothesis: RwSignal<String>,
	run_name: RwSignal<String>,
	max_depth: RwSignal<String>,
	max_nodes: RwSignal<String>,
	show_pruned: RwSignal<bool>,
	archives: RwSignal<Vec<ArchiveSummary>>,
}

impl PageSignals {
	fn new() -> Self {
		Self {
			phase: RwSignal::new(RunPhase::Ready),
			node_count: RwSignal::new(0),
			best_score: RwSignal::new(None),
			analysis: RwSignal::new(None),
			selected: RwSignal::new(None),
			notice: RwSignal::new(None),
			hypothesis: RwSignal::new(String::new()),
			run_name: RwSignal::new(String::new()),
			max_depth: RwSignal::new("3".into()),
			max_nodes: RwSignal::new("50".into()),
			show_pruned: RwSignal::new(true),
			archives: RwSignal::new(Vec::new()),
		}
	}

	fn clear_inputs(&self) {
		self.run_name.set(String::new());
		self.hypothesis.set(String::new());
	}
}

/// Browser-only collaborators of the page.
#[derive(Clone)]
struct Controller {
	graph: GraphViewHandle,
	client: ApiClient,
	poller: Rc<Poller<BrowserScheduler>>,
	sequence: Rc<PollSequence>,
}

type SharedController = StoredValue<Controller, LocalStorage>;

impl Controller {
	fn new(graph: GraphViewHandle, config: &ClientConfig) -> Self {
		Self {
			graph,
			client: ApiClient::from_config(config),
			poller: Rc::new(Poller::new(
				Rc::new(BrowserScheduler::new()),
				config.poll_interval(),
			)),
			sequence: Rc::new(PollSequence::new()),
		}
	}
}

fn refresh_graph(ctl: SharedController, sig: PageSignals) {
	let ctl = ctl.get_value();
	let ticket = ctl.sequence.issue();
	spawn_local(async move {
		match ctl.client.graph_data().await {
			Ok(snapshot) if ctl.sequence.accept(ticket) => {
				sig.best_score.set(snapshot.best_score());
				ctl.graph.update(snapshot);
			}
			Ok(_) => {}
			Err(err) => warn!("graph refresh failed: {err}"),
		}
	});
}

fn refresh_status(ctl: SharedController, sig: PageSignals) {
	let client = ctl.with_value(|c| c.client.clone());
	spawn_local(async move {
		let status = match client.status().await {
			Ok(status) => status,
			Err(err) => {
				warn!("status refresh failed: {err}");
				return;
			}
		};
		sig.node_count.set(status.total_nodes);
		let running = sig.phase.get_untracked() == RunPhase::Running;
		if status.is_running == running {
			return;
		}
		if status.is_running {
			sig.phase.set(RunPhase::Running);
			start_polling(ctl, sig);
		} else {
			sig.phase.set(RunPhase::Ready);
			ctl.with_value(|c| c.poller.stop());
		}
	});
}

fn start_polling(ctl: SharedController, sig: PageSignals) {
	let poller = ctl.with_value(|c| Rc::clone(&c.poller));
	poller.start(move || {
		refresh_status(ctl, sig);
		refresh_graph(ctl, sig);
	});
}

fn parse_or(text: &str, default: u32) -> u32 {
	text.trim().parse().ok().filter(|&n| n > 0).unwrap_or(default)
}

fn start_analysis(ctl: SharedController, sig: PageSignals) {
	let hypothesis = sig.hypothesis.get_untracked().trim().to_owned();
	if hypothesis.is_empty() {
		sig.notice
			.set(Some(Notice::Error("Please enter a hypothesis to analyze".into())));
		return;
	}
	let request = StartRequest {
		max_depth: parse_or(&sig.max_depth.get_untracked(), 3),
		max_nodes: parse_or(&sig.max_nodes.get_untracked(), 50),
		..StartRequest::new(hypothesis)
	};
	sig.phase.set(RunPhase::Starting);
	let client = ctl.with_value(|c| c.client.clone());
	spawn_local(async move {
		match client.start(&request).await {
			Ok(resp) => {
				info!("analysis started: {}", resp.message);
				sig.phase.set(RunPhase::Running);
				start_polling(ctl, sig);
			}
			Err(err) => {
				error!("start failed: {err}");
				sig.notice
					.set(Some(Notice::Error(format!("Failed to start analysis: {err}"))));
				sig.phase.set(RunPhase::Ready);
			}
		}
	});
}

fn stop_analysis(ctl: SharedController, sig: PageSignals) {
	let request = StopRequest {
		run_name: sig.run_name.get_untracked().trim().to_owned(),
	};
	sig.phase.set(RunPhase::Stopping);
	let client = ctl.with_value(|c| c.client.clone());
	spawn_local(async move {
		match client.stop(&request).await {
			Ok(resp) => {
				let text = match (&resp.archive_name, resp.nodes_archived) {
					(Some(_), Some(count)) if !request.run_name.is_empty() => format!(
						"Analysis archived as \"{}\". {count} nodes saved.",
						request.run_name
					),
					_ => "Analysis stopped. Data cleared for fresh start.".to_owned(),
				};
				sig.notice.set(Some(Notice::Success(text)));
				ctl.with_value(|c| c.poller.stop());
				sig.phase.set(RunPhase::Ready);
				sig.clear_inputs();
				refresh_graph(ctl, sig);
				load_archives(ctl, sig);
			}
			Err(err) => {
				error!("stop failed: {err}");
				sig.notice
					.set(Some(Notice::Error(format!("Failed to stop analysis: {err}"))));
				sig.phase.set(RunPhase::Ready);
			}
		}
	});
}

fn clear_data(ctl: SharedController, sig: PageSignals) {
	let client = ctl.with_value(|c| c.client.clone());
	spawn_local(async move {
		match client.clear().await {
			Ok(resp) => {
				sig.notice.set(Some(Notice::Success(resp.message)));
				sig.clear_inputs();
				sig.analysis.set(None);
				sig.selected.set(None);
				refresh_status(ctl, sig);
				refresh_graph(ctl, sig);
			}
			Err(err) => {
				sig.notice
					.set(Some(Notice::Error(format!("Failed to clear data: {err}"))));
			}
		}
	});
}

fn load_analysis(ctl: SharedController, sig: PageSignals) {
	let ctl = ctl.get_value();
	spawn_local(async move {
		match ctl.client.analysis().await {
			Ok(resp) => {
				if let AnalysisResponse::Report(report) = &resp {
					info!(
						"highlighting trajectory with {} nodes",
						report.best_trajectory.path.len()
					);
					ctl.graph
						.highlight_trajectory(report.best_trajectory.node_ids());
				}
				sig.analysis.set(Some(resp));
			}
			Err(err) => {
				sig.notice
					.set(Some(Notice::Error(format!("Failed to get analysis: {err}"))));
			}
		}
	});
}

fn load_archives(ctl: SharedController, sig: PageSignals) {
	let client = ctl.with_value(|c| c.client.clone());
	spawn_local(async move {
		match client.archives().await {
			Ok(archives) => {
				info!("{} archived runs", archives.len());
				sig.archives.set(archives);
			}
			Err(err) => {
				sig.notice
					.set(Some(Notice::Error(format!("Failed to load archives: {err}"))));
			}
		}
	});
}

fn delete_archive(ctl: SharedController, sig: PageSignals, name: String) {
	let client = ctl.with_value(|c| c.client.clone());
	spawn_local(async move {
		match client.delete_archive(&name).await {
			Ok(resp) => {
				sig.notice.set(Some(Notice::Success(resp.message)));
				load_archives(ctl, sig);
			}
			Err(err) => {
				error!("deleting archive {name} failed: {err}");
				sig.notice
					.set(Some(Notice::Error(format!("Failed to delete archive: {err}"))));
			}
		}
	});
}

/// Viewer link for an archived run.
fn archive_href(name: &str) -> String {
	format!("/archive?archive={}", String::from(js_sys::encode_uri_component(name)))
}

#[component]
fn ArchiveList(ctl: SharedController, sig: PageSignals) -> impl IntoView {
	move || {
		let archives = sig.archives.get();
		if archives.is_empty() {
			return view! { <p class="placeholder">"No archived runs yet"</p> }.into_any();
		}
		archives
			.into_iter()
			.map(|archive| {
				let href = archive_href(&archive.archive_name);
				let name = archive.archive_name;
				let date = if archive.archived_at.is_empty() {
					archive.timestamp
				} else {
					archive.archived_at
				};
				view! {
					<div class="archive-item">
						<a class="archive-content" href=href target="_blank">
							<div class="archive-title">{archive.run_name}</div>
							<div class="archive-date">{date}</div>
						</a>
						<button
							class="archive-delete-btn"
							title="Delete archive"
							on:click=move |_| delete_archive(ctl, sig, name.clone())
						>
							"×"
						</button>
					</div>
				}
			})
			.collect_view()
			.into_any()
	}
}

/// Analysis dashboard: run controls, live graph and the best trajectory.
#[component]
pub fn Home() -> impl IntoView {
	let config = ClientConfig::default();
	let graph = GraphViewHandle::default();
	let sig = PageSignals::new();
	let ctl: SharedController = StoredValue::new_local(Controller::new(graph.clone(), &config));
	let shared_graph: SharedGraph = StoredValue::new_local(graph.clone());

	graph.set_node_click_handler(move |node| sig.selected.set(Some(node.clone())));
	refresh_status(ctl, sig);
	refresh_graph(ctl, sig);
	load_archives(ctl, sig);

	let on_hypothesis_key = move |ev: KeyboardEvent| {
		if ev.ctrl_key() && ev.key() == "Enter" {
			start_analysis(ctl, sig);
		}
	};

	let on_toggle_pruned = move |ev: leptos::ev::Event| {
		let show = event_target_checked(&ev);
		sig.show_pruned.set(show);
		ctl.with_value(|c| c.graph.set_show_pruned(show));
	};

	view! {
		<div class="app">
			<header class="header">
				<h1>"Reasoning Graph"</h1>
				<div class="stats">
					<span class="label">"Status: "</span>
					<span id="status" class=move || sig.phase.get().class()>
						{move || sig.phase.get().label()}
					</span>
					<span class="label">"Nodes: "</span>
					<span id="node-count" class="value">{move || sig.node_count.get()}</span>
					<span class="label">"Best Score: "</span>
					<span id="best-score" class="value">
						{move || {
							sig.best_score.get().map_or_else(|| "-".to_owned(), |s| format!("{s:.2}"))
						}}
					</span>
				</div>
			</header>

			{move || {
				sig.notice
					.get()
					.map(|notice| {
						let (class, text) = match notice {
							Notice::Success(text) => ("notice notice-success", text),
							Notice::Error(text) => ("notice notice-error", text),
						};
						view! {
							<div class=class on:click=move |_| sig.notice.set(None)>
								{text}
							</div>
						}
					})
			}}

			<aside class="controls">
				<input
					id="run-name-input"
					type="text"
					placeholder="Run name (used when archiving)"
					bind:value=sig.run_name
				/>
				<textarea
					id="hypothesis-input"
					placeholder="Enter a hypothesis to analyze"
					bind:value=sig.hypothesis
					on:keydown=on_hypothesis_key
				/>
				<div class="advanced">
					<label>
						"Max depth "
						<input id="max-depth-input" type="number" min="1" bind:value=sig.max_depth />
					</label>
					<label>
						"Max nodes "
						<input id="max-nodes-input" type="number" min="1" bind:value=sig.max_nodes />
					</label>
				</div>
				<div class="buttons">
					<button
						id="start-btn"
						disabled=move || sig.phase.get() != RunPhase::Ready
						on:click=move |_| start_analysis(ctl, sig)
					>
						"Start"
					</button>
					<button
						id="stop-btn"
						disabled=move || sig.phase.get() != RunPhase::Running
						on:click=move |_| stop_analysis(ctl, sig)
					>
						"Stop"
					</button>
					<button id="clear-btn" on:click=move |_| clear_data(ctl, sig)>
						"Clear"
					</button>
				</div>
			</aside>

			<main class="graph-panel">
				<div class="graph-toolbar">
					<label>
						<input
							id="show-pruned"
							type="checkbox"
							prop:checked=move || sig.show_pruned.get()
							on:change=on_toggle_pruned
						/>
						" Show pruned"
					</label>
					<button
						id="reset-zoom"
						on:click=move |_| ctl.with_value(|c| c.graph.reset_zoom())
					>
						"Reset zoom"
					</button>
				</div>
				<div id="graph-container" class="graph-container">
					<GraphViewCanvas handle=graph id="graph-canvas" />
				</div>
			</main>

			<aside class="details">
				<section>
					<h3>"Node Details"</h3>
					<div id="node-details">
						{move || match sig.selected.get() {
							Some(node) => view! { <NodeDetails node=node /> }.into_any(),
							None => {
								view! { <p class="placeholder">"Click a node to see details"</p> }
									.into_any()
							}
						}}
					</div>
				</section>
				<section>
					<h3>"Analysis"</h3>
					<button id="get-analysis" on:click=move |_| load_analysis(ctl, sig)>
						"Get analysis"
					</button>
					<div id="analysis-results">
						{move || match sig.analysis.get() {
							Some(AnalysisResponse::Report(report)) => {
								view! { <AnalysisSummary report=report graph=shared_graph /> }.into_any()
							}
							Some(AnalysisResponse::Empty { message }) => {
								view! { <p class="placeholder">{message}</p> }.into_any()
							}
							None => {
								view! { <p class="placeholder">"No analysis loaded"</p> }
									.into_any()
							}
						}}
					</div>
				</section>
				<section>
					<h3>"Archived Runs"</h3>
					<button id="refresh-archives" on:click=move |_| load_archives(ctl, sig)>
						"Refresh"
					</button>
					<div id="archive-list">
						<ArchiveList ctl=ctl sig=sig />
					</div>
				</section>
			</aside>
		</div>
	}
}
