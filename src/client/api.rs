use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response};

use super::ClientConfig;
use crate::components::graph_view::GraphSnapshot;

#[derive(Debug, Error)]
pub enum ApiError {
	#[error("network error: {0}")]
	Network(String),
	#[error("server responded with status {0}")]
	Status(u16),
	#[error("malformed response: {0}")]
	Decode(#[from] serde_json::Error),
	#[error("no browser window available")]
	NoWindow,
}

impl ApiError {
	fn network(err: JsValue) -> Self {
		Self::Network(format!("{err:?}"))
	}
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StatusResponse {
	pub is_running: bool,
	pub total_nodes: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TrajectoryStep {
	pub id: String,
	pub text: String,
	pub score: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct BestTrajectory {
	pub cumulative_score: f64,
	pub path_length: usize,
	pub final_insight: String,
	pub path: Vec<TrajectoryStep>,
}

impl BestTrajectory {
	/// Node ids along the path, root first.
	pub fn node_ids(&self) -> Vec<String> {
		self.path.iter().map(|step| step.id.clone()).collect()
	}
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct AnalysisReport {
	pub total_nodes: usize,
	pub average_score: f64,
	pub pruned_nodes: usize,
	pub best_trajectory: BestTrajectory,
}

/// `/api/analysis` answers with either a report or a bare message when
/// there is nothing to analyse yet.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum AnalysisResponse {
	Report(AnalysisReport),
	Empty { message: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StartRequest {
	pub hypothesis: String,
	pub max_depth: u32,
	pub max_nodes: u32,
}

impl StartRequest {
	pub fn new(hypothesis: impl Into<String>) -> Self {
		Self {
			hypothesis: hypothesis.into(),
			max_depth: 3,
			max_nodes: 50,
		}
	}
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct StopRequest {
	/// Empty stops without archiving.
	pub run_name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct StopResponse {
	pub message: String,
	pub archive_name: Option<String>,
	pub nodes_archived: Option<usize>,
	pub error: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct MessageResponse {
	pub message: String,
}

/// One entry of `/api/archives`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ArchiveSummary {
	/// Directory name; the key for every other archive call.
	pub archive_name: String,
	pub run_name: String,
	pub hypothesis: String,
	pub timestamp: String,
	pub archived_at: String,
	pub size_bytes: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ArchiveList {
	archives: Vec<ArchiveSummary>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ArchiveMetadata {
	pub run_name: String,
	pub hypothesis: String,
	pub timestamp: String,
	pub archived_at: String,
}

/// A stored run as served by `/api/archive/{name}`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ArchivedRun {
	pub metadata: ArchiveMetadata,
	pub graph: GraphSnapshot,
}

impl ArchivedRun {
	/// The graph goes through the same lenient decode as live snapshots.
	pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
		#[derive(Deserialize)]
		struct Raw {
			#[serde(default)]
			metadata: ArchiveMetadata,
			#[serde(default)]
			graph_data: Value,
		}

		let raw: Raw = serde_json::from_value(value)?;
		Ok(Self {
			metadata: raw.metadata,
			graph: GraphSnapshot::from_value(raw.graph_data),
		})
	}
}

/// Thin fetch wrapper over the backend's JSON endpoints.
#[derive(Clone, Debug, Default)]
pub struct ApiClient {
	base_url: String,
}

impl ApiClient {
	pub fn new(base_url: impl Into<String>) -> Self {
		Self {
			base_url: base_url.into().trim_end_matches('/').to_owned(),
		}
	}

	pub fn from_config(config: &ClientConfig) -> Self {
		Self::new(config.base_url.as_str())
	}

	pub fn url(&self, path: &str) -> String {
		format!("{}{path}", self.base_url)
	}

	pub async fn status(&self) -> Result<StatusResponse, ApiError> {
		self.get_json("/api/status").await
	}

	/// Current graph. Malformed entries are skipped rather than failing the
	/// whole snapshot.
	pub async fn graph_data(&self) -> Result<GraphSnapshot, ApiError> {
		let text = self.send("GET", "/api/graph_data", None).await?;
		let value: Value = serde_json::from_str(&text)?;
		Ok(GraphSnapshot::from_value(value))
	}

	pub async fn analysis(&self) -> Result<AnalysisResponse, ApiError> {
		self.get_json("/api/analysis").await
	}

	pub async fn start(&self, request: &StartRequest) -> Result<MessageResponse, ApiError> {
		self.post_json("/api/start", Some(serde_json::to_string(request)?))
			.await
	}

	pub async fn stop(&self, request: &StopRequest) -> Result<StopResponse, ApiError> {
		self.post_json("/api/stop", Some(serde_json::to_string(request)?))
			.await
	}

	pub async fn clear(&self) -> Result<MessageResponse, ApiError> {
		self.post_json("/api/clear", None).await
	}

	pub async fn archives(&self) -> Result<Vec<ArchiveSummary>, ApiError> {
		let list: ArchiveList = self.get_json("/api/archives").await?;
		Ok(list.archives)
	}

	pub async fn archive(&self, name: &str) -> Result<ArchivedRun, ApiError> {
		let text = self.send("GET", &archive_path(name, ""), None).await?;
		Ok(ArchivedRun::from_value(serde_json::from_str(&text)?)?)
	}

	/// Analysis stored with the run. Same shape as [`Self::analysis`].
	pub async fn archive_analysis(&self, name: &str) -> Result<AnalysisResponse, ApiError> {
		self.get_json(&archive_path(name, "/analysis")).await
	}

	pub async fn delete_archive(&self, name: &str) -> Result<MessageResponse, ApiError> {
		let text = self.send("DELETE", &archive_path(name, ""), None).await?;
		Ok(serde_json::from_str(&text)?)
	}

	async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
		let text = self.send("GET", path, None).await?;
		Ok(serde_json::from_str(&text)?)
	}

	async fn post_json<T: DeserializeOwned>(
		&self,
		path: &str,
		body: Option<String>,
	) -> Result<T, ApiError> {
		let text = self.send("POST", path, body).await?;
		Ok(serde_json::from_str(&text)?)
	}

	async fn send(&self, method: &str, path: &str, body: Option<String>) -> Result<String, ApiError> {
		let opts = RequestInit::new();
		opts.set_method(method);
		opts.set_mode(RequestMode::Cors);
		let has_body = body.is_some();
		if let Some(body) = body {
			opts.set_body(&JsValue::from_str(&body));
		}

		let request =
			Request::new_with_str_and_init(&self.url(path), &opts).map_err(ApiError::network)?;
		if has_body {
			request
				.headers()
				.set("Content-Type", "application/json")
				.map_err(ApiError::network)?;
		}

		let window = web_sys::window().ok_or(ApiError::NoWindow)?;
		let response: Response = JsFuture::from(window.fetch_with_request(&request))
			.await
			.map_err(ApiError::network)?
			.dyn_into()
			.map_err(ApiError::network)?;
		if !response.ok() {
			return Err(ApiError::Status(response.status()));
		}

		let text = JsFuture::from(response.text().map_err(ApiError::network)?)
			.await
			.map_err(ApiError::network)?;
		text.as_string()
			.ok_or_else(|| ApiError::Network("response body is not text".into()))
	}
}

fn archive_path(name: &str, suffix: &str) -> String {
	let name = String::from(js_sys::encode_uri_component(name));
	format!("/api/archive/{name}{suffix}")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn analysis_report_or_message() {
		let report: AnalysisResponse = serde_json::from_str(
			r#"{
				"total_nodes": 3,
				"average_score": 0.61,
				"pruned_nodes": 1,
				"best_trajectory": {
					"cumulative_score": 1.4,
					"path_length": 2,
					"final_insight": "insight",
					"path": [
						{ "id": "root", "text": "hypothesis", "score": 0.5 },
						{ "id": "n2", "text": "insight", "score": 0.9 }
					]
				}
			}"#,
		)
		.unwrap();
		let AnalysisResponse::Report(report) = report else {
			panic!("expected a report");
		};
		assert_eq!(report.best_trajectory.node_ids(), ["root", "n2"]);

		let empty: AnalysisResponse =
			serde_json::from_str(r#"{ "message": "No analysis data available" }"#).unwrap();
		assert_eq!(
			empty,
			AnalysisResponse::Empty {
				message: "No analysis data available".into()
			}
		);
	}

	#[test]
	fn stop_response_without_archive() {
		let resp: StopResponse =
			serde_json::from_str(r#"{ "message": "Analysis stopped." }"#).unwrap();
		assert_eq!(resp.archive_name, None);
		assert_eq!(resp.nodes_archived, None);
	}

	#[test]
	fn start_request_wire_shape() {
		let body = serde_json::to_value(StartRequest::new("h")).unwrap();
		assert_eq!(
			body,
			serde_json::json!({ "hypothesis": "h", "max_depth": 3, "max_nodes": 50 })
		);
	}

	#[test]
	fn archive_list_payload() {
		let list: ArchiveList = serde_json::from_str(
			r#"{
				"archives": [
					{
						"archive_name": "run_one_20240101_120000",
						"run_name": "run one",
						"hypothesis": "h",
						"timestamp": "20240101_120000",
						"archived_at": "2024-01-01T12:00:05",
						"size_bytes": 2048,
						"path": "/data/archives/run_one_20240101_120000"
					},
					{ "archive_name": "bare" }
				]
			}"#,
		)
		.unwrap();
		assert_eq!(list.archives.len(), 2);
		assert_eq!(list.archives[0].run_name, "run one");
		assert_eq!(list.archives[0].size_bytes, 2048);
		assert_eq!(list.archives[1].run_name, "");

		let empty: ArchiveList = serde_json::from_str("{}").unwrap();
		assert!(empty.archives.is_empty());
	}

	#[test]
	fn archived_run_decodes_graph_leniently() {
		let run = ArchivedRun::from_value(serde_json::json!({
			"success": true,
			"metadata": {
				"run_name": "run one",
				"hypothesis": "h",
				"timestamp": "20240101_120000",
				"archived_at": "2024-01-01T12:00:05",
				"archive_format_version": "1.0"
			},
			"nodes": [],
			"graph_data": {
				"nodes": [
					{ "id": "root", "text": "h", "score": 0.5, "is_pruned": false, "x": null, "y": null },
					{ "text": "no id" }
				],
				"links": [{ "source": "root", "target": "child" }]
			},
			"summary": {}
		}))
		.unwrap();
		assert_eq!(run.metadata.run_name, "run one");
		assert_eq!(run.graph.nodes.len(), 1);
		assert_eq!(run.graph.nodes[0].id, "root");
		assert_eq!(run.graph.links.len(), 1);

		let bare = ArchivedRun::from_value(serde_json::json!({ "success": true })).unwrap();
		assert_eq!(bare, ArchivedRun::default());
	}

	#[test]
	fn delete_reply_carries_message() {
		let resp: MessageResponse =
			serde_json::from_str(r#"{ "message": "Archive 'x' deleted successfully" }"#).unwrap();
		assert_eq!(resp.message, "Archive 'x' deleted successfully");
	}

	#[test]
	fn base_url_is_normalized() {
		let client = ApiClient::new("http://localhost:8000/");
		assert_eq!(client.url("/api/status"), "http://localhost:8000/api/status");
		assert_eq!(ApiClient::default().url("/api/clear"), "/api/clear");
	}
}
