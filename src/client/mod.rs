//! Talking to the analysis backend: REST calls and the refresh loop.

mod api;
mod poll;

use std::time::Duration;

use serde::Deserialize;

pub use api::{
	AnalysisReport, AnalysisResponse, ApiClient, ApiError, ArchiveMetadata, ArchiveSummary,
	ArchivedRun, BestTrajectory, MessageResponse, StartRequest, StatusResponse, StopRequest,
	StopResponse, TrajectoryStep,
};
pub use poll::{PollSequence, PollTicket, Poller};

/// Where the backend lives and how often to refresh while a run is active.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
	/// Prefix for every `/api/...` path. Empty means same origin.
	pub base_url: String,
	pub poll_interval_ms: u64,
}

impl Default for ClientConfig {
	fn default() -> Self {
		Self {
			base_url: String::new(),
			poll_interval_ms: 3000,
		}
	}
}

impl ClientConfig {
	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms)
	}
}
