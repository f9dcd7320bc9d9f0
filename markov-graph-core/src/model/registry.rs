use std::collections::HashMap;

use tracing::{debug, info};

use super::generation_input::GenerationInput;
use super::graph::TransitionGraph;
use crate::error::{GraphError, Outcome, Warning};
use crate::tokenizer::tokenize;

/// Collection of named transition graphs.
///
/// # Responsibilities
/// - Train named graphs from raw text, creating them on first use
/// - Combine several graphs into a new named one
/// - Generate text from a named graph
/// - Export and import graphs through the portable form
///
/// Every graph stored here has been recalculated after its last mutation,
/// so generation never runs against stale probabilities.
#[derive(Debug, Default)]
pub struct GraphRegistry {
	graphs: HashMap<String, TransitionGraph>,
}

impl GraphRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the registered names, sorted.
	pub fn names(&self) -> Vec<String> {
		let mut names: Vec<String> = self.graphs.keys().cloned().collect();
		names.sort();
		names
	}

	pub fn get(&self, name: &str) -> Option<&TransitionGraph> {
		self.graphs.get(name)
	}

	fn graph(&self, name: &str) -> Result<&TransitionGraph, GraphError> {
		self.graphs.get(name).ok_or_else(|| GraphError::UnknownGraph(name.to_owned()))
	}

	/// Registers a graph under a new name, recalculating it first.
	///
	/// # Errors
	/// Returns an error if the name is already taken.
	pub fn insert(&mut self, name: &str, mut graph: TransitionGraph) -> Result<(), GraphError> {
		if self.graphs.contains_key(name) {
			return Err(GraphError::DuplicateGraph(name.to_owned()));
		}
		graph.recalculate_all();
		self.graphs.insert(name.to_owned(), graph);
		Ok(())
	}

	/// Tokenizes `text` and trains the named graph on it.
	///
	/// Returns the number of tokens trained on.
	///
	/// # Errors
	/// Returns `Warning::EmptyInput` if the text holds no token. A graph
	/// is never created from empty text.
	pub fn train(&mut self, name: &str, text: &str) -> Result<usize, Warning> {
		let tokens = tokenize(text);
		if tokens.is_empty() {
			return Err(Warning::EmptyInput);
		}

		let graph = self.graphs.entry(name.to_owned()).or_default();
		graph.train(&tokens)?;
		graph.recalculate_all();

		debug!(name, tokens = tokens.len(), nodes = graph.len(), "trained named graph");
		Ok(tokens.len())
	}

	/// Combines the named graphs, in order, into a new graph called `into`.
	///
	/// # Errors
	/// - `names` is empty
	/// - a name is not registered
	/// - `into` is already taken
	pub fn combine(&mut self, names: &[&str], into: &str) -> Result<&TransitionGraph, GraphError> {
		if names.is_empty() {
			return Err(GraphError::InvalidInput("nothing to combine".to_owned()));
		}
		if self.graphs.contains_key(into) {
			return Err(GraphError::DuplicateGraph(into.to_owned()));
		}

		let mut combined = TransitionGraph::new();
		for name in names {
			combined = combined.combine(self.graph(name)?);
		}
		combined.recalculate_all();

		info!(sources = ?names, into, nodes = combined.len(), "combined graphs");
		Ok(self.graphs.entry(into.to_owned()).or_insert(combined))
	}

	/// Generates text from the named graph.
	///
	/// # Errors
	/// Returns an error if the name is not registered.
	pub fn generate(&self, name: &str, input: &GenerationInput) -> Result<Outcome<String>, GraphError> {
		Ok(self.graph(name)?.generate(input))
	}

	/// Portable JSON text of the named graph.
	pub fn export(&self, name: &str) -> Result<String, GraphError> {
		self.graph(name)?.to_portable_string()
	}

	/// Loads a graph from portable JSON text, replacing any graph of the same name.
	///
	/// # Errors
	/// Returns `GraphError::MalformedPortableForm` on invalid input; the
	/// registry is left unchanged in that case.
	pub fn import(&mut self, name: &str, data: &str) -> Result<&TransitionGraph, GraphError> {
		let mut graph = TransitionGraph::from_portable_str(data)?;
		graph.recalculate_all();

		info!(name, nodes = graph.len(), "imported graph");
		self.graphs.insert(name.to_owned(), graph);
		self.graph(name)
	}

	/// Removes and returns the named graph.
	pub fn remove(&mut self, name: &str) -> Result<TransitionGraph, GraphError> {
		self.graphs.remove(name).ok_or_else(|| GraphError::UnknownGraph(name.to_owned()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn train_creates_then_extends() {
		let mut registry = GraphRegistry::new();
		assert_eq!(registry.train("poems", "Roses are red."), Ok(4));
		assert_eq!(registry.train("poems", "Violets are blue."), Ok(4));

		let graph = registry.get("poems").unwrap();
		assert!(!graph.is_dirty());
		assert_eq!(graph.node("are").unwrap().total_occurrences(), 2);
		assert_eq!(graph.tokens_seen(), 8);
	}

	#[test]
	fn empty_text_creates_nothing() {
		let mut registry = GraphRegistry::new();
		assert_eq!(registry.train("void", "  \"\" "), Err(Warning::EmptyInput));
		assert!(registry.names().is_empty());
	}

	#[test]
	fn combine_into_new_name() {
		let mut registry = GraphRegistry::new();
		registry.train("a", "one two").unwrap();
		registry.train("b", "one three").unwrap();

		let combined = registry.combine(&["a", "b"], "ab").unwrap();
		assert_eq!(combined.node("one").unwrap().total_occurrences(), 2);
		assert!(!combined.is_dirty());
		assert_eq!(registry.names(), vec!["a", "ab", "b"]);
	}

	#[test]
	fn combine_errors() {
		let mut registry = GraphRegistry::new();
		registry.train("a", "one two").unwrap();

		assert!(matches!(registry.combine(&[], "x"), Err(GraphError::InvalidInput(_))));
		assert_eq!(registry.combine(&["a", "zz"], "x").unwrap_err(), GraphError::UnknownGraph("zz".to_owned()));
		assert_eq!(registry.combine(&["a"], "a").unwrap_err(), GraphError::DuplicateGraph("a".to_owned()));
		assert!(registry.get("x").is_none());
	}

	#[test]
	fn export_then_import() {
		let mut registry = GraphRegistry::new();
		registry.train("src", "the end.").unwrap();

		let data = registry.export("src").unwrap();
		registry.import("copy", &data).unwrap();
		assert_eq!(registry.get("copy").unwrap().to_portable_form(), registry.get("src").unwrap().to_portable_form());

		assert!(matches!(registry.import("bad", "oops"), Err(GraphError::MalformedPortableForm(_))));
		assert!(registry.get("bad").is_none());
	}

	#[test]
	fn generate_and_remove() {
		let mut registry = GraphRegistry::new();
		registry.train("g", "ping pong").unwrap();

		let input = GenerationInput::new(3).unwrap();
		let outcome = registry.generate("g", &input).unwrap();
		assert_eq!(outcome.value, "Ping pong ping pong");
		assert!(outcome.is_clean());

		assert!(registry.remove("g").is_ok());
		assert_eq!(registry.generate("g", &input).unwrap_err(), GraphError::UnknownGraph("g".to_owned()));
	}
}
