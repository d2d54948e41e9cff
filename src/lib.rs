//! Live force-directed view of a reasoning graph, fed by the analysis
//! backend's REST API.

use leptos::prelude::*;
use leptos_meta::*;
use leptos_router::components::*;
use leptos_router::path;
use log::{Level, info};

// Modules
pub mod client;
pub mod components;
mod pages;
pub mod scheduler;

// Top-Level pages
use crate::pages::archive::ArchiveViewer;
use crate::pages::home::Home;
use crate::pages::not_found::NotFound;

pub use components::graph_view::{
	GraphLink, GraphNode, GraphSnapshot, GraphView, GraphViewError, GraphViewHandle, ViewConfig,
};

/// Initialize logging and panic hooks for the WASM target.
pub fn init_logging() {
	let _ = console_log::init_with_level(Level::Debug);
	console_error_panic_hook::set_once();
	info!("Logging initialized");
}

/// Router with the analysis dashboard at `/`, the archive viewer at
/// `/archive` and a 404 fallback.
#[component]
pub fn App() -> impl IntoView {
	provide_meta_context();

	view! {
		<Html attr:lang="en" attr:dir="ltr" attr:data-theme="light" />

		<Title text="Reasoning Graph" />

		<Meta charset="UTF-8" />
		<Meta name="viewport" content="width=device-width, initial-scale=1.0" />

		<Router>
			<Routes fallback=|| view! { <NotFound /> }>
				<Route path=path!("/") view=Home />
				<Route path=path!("/archive") view=ArchiveViewer />
			</Routes>
		</Router>
	}
}
