use std::collections::HashSet;

use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One reasoning step as delivered by the backend.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
	pub id: String,
	#[serde(default)]
	pub score: f64,
	#[serde(default)]
	pub cumulative_score: f64,
	#[serde(default)]
	pub depth: u32,
	#[serde(default)]
	pub is_pruned: bool,
	#[serde(default)]
	pub text: String,
	#[serde(default)]
	pub parent_id: Option<String>,
	#[serde(default)]
	pub trajectory_id: Option<String>,
	#[serde(default)]
	pub is_fully_explored: bool,
}

/// Directed edge between two node ids.
///
/// Endpoints accept either a bare id or an already resolved node object,
/// so payloads echoed back from a layout engine still decode.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphLink {
	#[serde(deserialize_with = "endpoint_id")]
	pub source: String,
	#[serde(deserialize_with = "endpoint_id")]
	pub target: String,
	#[serde(default = "default_link_value", deserialize_with = "link_value")]
	pub value: f64,
}

impl GraphLink {
	pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
		Self {
			source: source.into(),
			target: target.into(),
			value: default_link_value(),
		}
	}

	/// Identity used when joining links against rendered elements.
	pub fn key(&self) -> String {
		format!("{}-{}", self.source, self.target)
	}
}

fn default_link_value() -> f64 {
	1.0
}

fn link_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
	Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or_else(default_link_value))
}

fn endpoint_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Endpoint {
		Id(String),
		Resolved { id: String },
	}

	Ok(match Endpoint::deserialize(deserializer)? {
		Endpoint::Id(id) | Endpoint::Resolved { id } => id,
	})
}

/// Full node/link dataset; every poll replaces the previous one wholesale.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GraphSnapshot {
	pub nodes: Vec<GraphNode>,
	pub links: Vec<GraphLink>,
}

impl GraphSnapshot {
	/// Lenient decode: a missing or non-array `nodes`/`links` field becomes an
	/// empty list and entries that fail to decode are skipped.
	pub fn from_value(value: Value) -> Self {
		let Value::Object(mut fields) = value else {
			warn!("graph snapshot is not an object; treating as empty");
			return Self::default();
		};
		Self {
			nodes: decode_entries(fields.remove("nodes"), "node"),
			links: decode_entries(fields.remove("links"), "link"),
		}
	}

	pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
		Ok(Self::from_value(serde_json::from_str(text)?))
	}

	/// Highest `cumulative_score` across all nodes, pruned ones included.
	pub fn best_score(&self) -> Option<f64> {
		self.nodes
			.iter()
			.map(|n| n.cumulative_score)
			.fold(None, |best, s| Some(best.map_or(s, |b: f64| b.max(s))))
	}

	/// Derive the subset fed to the layout and the scene.
	///
	/// Duplicate node ids keep their first occurrence. Links survive only when
	/// both endpoints are visible.
	pub fn visible(&self, show_pruned: bool) -> VisibleSet<'_> {
		let mut seen = HashSet::new();
		let nodes: Vec<&GraphNode> = self
			.nodes
			.iter()
			.filter(|n| show_pruned || !n.is_pruned)
			.filter(|n| {
				let fresh = seen.insert(n.id.as_str());
				if !fresh {
					warn!("duplicate node id {} in snapshot", n.id);
				}
				fresh
			})
			.collect();
		let links = self
			.links
			.iter()
			.filter(|l| seen.contains(l.source.as_str()) && seen.contains(l.target.as_str()))
			.collect();
		VisibleSet { nodes, links }
	}
}

impl<'de> Deserialize<'de> for GraphSnapshot {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		Ok(Self::from_value(Value::deserialize(deserializer)?))
	}
}

fn decode_entries<T: for<'de> Deserialize<'de>>(field: Option<Value>, kind: &str) -> Vec<T> {
	match field {
		Some(Value::Array(items)) => items
			.into_iter()
			.filter_map(|item| match serde_json::from_value(item) {
				Ok(entry) => Some(entry),
				Err(err) => {
					warn!("skipping malformed {kind}: {err}");
					None
				}
			})
			.collect(),
		Some(Value::Null) | None => Vec::new(),
		Some(other) => {
			warn!("expected an array of {kind}s, got {other}");
			Vec::new()
		}
	}
}

/// Borrowed view of the nodes and links that should be on screen.
#[derive(Debug)]
pub struct VisibleSet<'a> {
	pub nodes: Vec<&'a GraphNode>,
	pub links: Vec<&'a GraphLink>,
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn hides_pruned_nodes_and_their_links() {
		let snapshot: GraphSnapshot = serde_json::from_value(json!({
			"nodes": [
				{ "id": "1", "score": 0.8, "is_pruned": false },
				{ "id": "2", "score": 0.3, "is_pruned": true }
			],
			"links": [{ "source": "1", "target": "2", "value": 1 }]
		}))
		.unwrap();

		let hidden = snapshot.visible(false);
		let ids: Vec<&str> = hidden.nodes.iter().map(|n| n.id.as_str()).collect();
		assert_eq!(ids, ["1"]);
		assert!(hidden.links.is_empty());

		let shown = snapshot.visible(true);
		assert_eq!(shown.nodes.len(), 2);
		assert_eq!(shown.links.len(), 1);
	}

	#[test]
	fn missing_collections_decode_as_empty() {
		let snapshot = GraphSnapshot::from_json(r#"{"message": "nothing yet"}"#).unwrap();
		assert_eq!(snapshot, GraphSnapshot::default());

		let snapshot = GraphSnapshot::from_json("null").unwrap();
		assert!(snapshot.nodes.is_empty());
	}

	#[test]
	fn malformed_entries_are_skipped() {
		let snapshot = GraphSnapshot::from_value(json!({
			"nodes": [{ "score": 0.5 }, { "id": "a" }],
			"links": [{ "source": "a" }, { "source": { "id": "a" }, "target": "a", "value": null }]
		}));
		assert_eq!(snapshot.nodes.len(), 1);
		assert_eq!(snapshot.links.len(), 1);
		assert_eq!(snapshot.links[0].source, "a");
		assert_eq!(snapshot.links[0].value, 1.0);
	}

	#[test]
	fn best_score_spans_all_nodes() {
		let mut snapshot = GraphSnapshot::default();
		assert_eq!(snapshot.best_score(), None);
		for (id, cumulative, pruned) in [("a", 0.4, false), ("b", 1.7, true), ("c", 0.9, false)] {
			snapshot.nodes.push(GraphNode {
				id: id.into(),
				cumulative_score: cumulative,
				is_pruned: pruned,
				..Default::default()
			});
		}
		assert_eq!(snapshot.best_score(), Some(1.7));
	}

	#[test]
	fn duplicate_ids_keep_first() {
		let snapshot = GraphSnapshot {
			nodes: vec![
				GraphNode { id: "x".into(), score: 0.1, ..Default::default() },
				GraphNode { id: "x".into(), score: 0.9, ..Default::default() },
			],
			links: vec![],
		};
		let visible = snapshot.visible(true);
		assert_eq!(visible.nodes.len(), 1);
		assert_eq!(visible.nodes[0].score, 0.1);
	}
}
