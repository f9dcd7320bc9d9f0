use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use crate::error::GraphError;
use crate::model::graph::TransitionGraph;

/// Upper bound on the sum of all counts of a portable form.
///
/// Loading replays one insertion per counted occurrence, so the total
/// bounds the work done by `TransitionGraph::from_portable_form`.
pub const MAX_PORTABLE_OCCURRENCES: i64 = 10_000_000;

/// Preallocation cap for decoded maps; the encoded length is untrusted.
const MAX_PREALLOCATED_ENTRIES: usize = 4096;

/// Occurrence counts of one source token, in insertion order.
pub type SuccessorCounts = Vec<(String, i64)>;

/// Lossless, count-only form of a `TransitionGraph`.
///
/// A nested ordered map: source token -> (successor token -> occurrence count).
/// Probabilities are never stored; they are rederived after loading.
///
/// Encoded as a JSON object (human readable) or as a `postcard` byte buffer
/// (compact). Both encodings keep the insertion order of sources and
/// successors, which decides the default start token and sampling order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PortableForm {
	entries: Vec<(String, SuccessorCounts)>,
}

impl PortableForm {
	pub fn from_entries(entries: Vec<(String, SuccessorCounts)>) -> Self {
		Self { entries }
	}

	pub fn entries(&self) -> &[(String, SuccessorCounts)] {
		&self.entries
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Checks the structure before anything is rebuilt from it.
	///
	/// # Errors
	/// - a source token appears twice
	/// - a source has no successor, or a successor appears twice under it
	/// - a count is zero or negative
	/// - the counts add up to more than `MAX_PORTABLE_OCCURRENCES`
	pub(crate) fn validate(&self) -> Result<(), GraphError> {
		let mut sources = HashSet::new();
		let mut total: i64 = 0;
		for (source, successors) in &self.entries {
			if !sources.insert(source.as_str()) {
				return Err(malformed(format!("duplicate source token {source:?}")));
			}
			if successors.is_empty() {
				return Err(malformed(format!("source token {source:?} has no successor")));
			}

			let mut seen = HashSet::new();
			for (successor, count) in successors {
				if !seen.insert(successor.as_str()) {
					return Err(malformed(format!("duplicate successor {successor:?} under {source:?}")));
				}
				if *count <= 0 {
					return Err(malformed(format!("count of {source:?} -> {successor:?} must be positive, got {count}")));
				}
				total = total.saturating_add(*count);
				if total > MAX_PORTABLE_OCCURRENCES {
					return Err(malformed(format!("more than {MAX_PORTABLE_OCCURRENCES} occurrences in total")));
				}
			}
		}
		Ok(())
	}
}

fn malformed(reason: String) -> GraphError {
	warn!(%reason, "rejected portable form");
	GraphError::MalformedPortableForm(reason)
}

/// Borrowed view serialized as a map.
struct CountsMap<'a>(&'a [(String, i64)]);

impl Serialize for CountsMap<'_> {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut map = serializer.serialize_map(Some(self.0.len()))?;
		for (successor, count) in self.0 {
			map.serialize_entry(successor, count)?;
		}
		map.end()
	}
}

impl Serialize for PortableForm {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut map = serializer.serialize_map(Some(self.entries.len()))?;
		for (source, successors) in &self.entries {
			map.serialize_entry(source, &CountsMap(successors))?;
		}
		map.end()
	}
}

/// Map deserialized as a list of pairs, keeping the encoded order.
struct OrderedMap<V>(Vec<(String, V)>);

struct OrderedMapVisitor<V>(PhantomData<V>);

impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedMapVisitor<V> {
	type Value = OrderedMap<V>;

	fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
		formatter.write_str("a map of token keys")
	}

	fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
		let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0).min(MAX_PREALLOCATED_ENTRIES));
		while let Some((key, value)) = access.next_entry::<String, V>()? {
			entries.push((key, value));
		}
		Ok(OrderedMap(entries))
	}
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		deserializer.deserialize_map(OrderedMapVisitor(PhantomData))
	}
}

impl<'de> Deserialize<'de> for PortableForm {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
		let OrderedMap(sources) = OrderedMap::<OrderedMap<i64>>::deserialize(deserializer)?;
		Ok(Self {
			entries: sources.into_iter().map(|(source, OrderedMap(successors))| (source, successors)).collect(),
		})
	}
}

impl TransitionGraph {
	/// Encodes the graph as JSON text.
	///
	/// # Errors
	/// Returns `GraphError::Encoding` if serialization fails.
	pub fn to_portable_string(&self) -> Result<String, GraphError> {
		serde_json::to_string(&self.to_portable_form()).map_err(|e| GraphError::Encoding(e.to_string()))
	}

	/// Same as [`TransitionGraph::to_portable_string`], indented.
	pub fn to_portable_string_pretty(&self) -> Result<String, GraphError> {
		serde_json::to_string_pretty(&self.to_portable_form()).map_err(|e| GraphError::Encoding(e.to_string()))
	}

	/// Rebuilds a graph from JSON text.
	///
	/// `"{}"` is a valid empty graph; anything that is not a nested object
	/// of positive integer counts is rejected as a whole.
	///
	/// # Errors
	/// Returns `GraphError::MalformedPortableForm` on invalid input.
	pub fn from_portable_str(data: &str) -> Result<Self, GraphError> {
		let form: PortableForm = serde_json::from_str(data).map_err(|e| malformed(e.to_string()))?;
		Self::from_portable_form(&form)
	}

	/// Encodes the graph as a compact `postcard` buffer.
	///
	/// # Errors
	/// Returns `GraphError::Encoding` if serialization fails.
	pub fn to_portable_bytes(&self) -> Result<Vec<u8>, GraphError> {
		postcard::to_stdvec(&self.to_portable_form()).map_err(|e| GraphError::Encoding(e.to_string()))
	}

	/// Rebuilds a graph from a `postcard` buffer.
	///
	/// # Errors
	/// Returns `GraphError::MalformedPortableForm` on invalid input.
	pub fn from_portable_bytes(bytes: &[u8]) -> Result<Self, GraphError> {
		let form: PortableForm = postcard::from_bytes(bytes).map_err(|e| malformed(e.to_string()))?;
		Self::from_portable_form(&form)
	}
}
