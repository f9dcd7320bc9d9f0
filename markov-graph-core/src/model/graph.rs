use std::collections::HashMap;

use rand::Rng;
use tracing::{debug, warn};

use super::generation_input::{GenerationInput, StartSeed};
use super::node::TransitionNode;
use crate::error::{GraphError, Outcome, Warning};
use crate::portable::PortableForm;
use crate::tokenizer::{PHRASE_END, SENTENCE_END, capitalize};

/// Weighted, directed graph of token-to-token transitions.
///
/// The `TransitionGraph` stores one `TransitionNode` per source token and
/// generates text with a random walk over the learned transitions.
///
/// # Responsibilities
/// - Build the graph from token sequences (cyclic: the last token links back to the first)
/// - Keep cached probabilities in sync through `recalculate_all`
/// - Generate text from a start token
/// - Combine two graphs into a new one
/// - Convert from and to the portable form
///
/// # Invariants
/// - Nodes are kept in first-observation order; the first one is the default start token
/// - A successor token without a node of its own is a valid dead end
#[derive(Clone, Debug)]
pub struct TransitionGraph {
	/// Nodes in insertion order.
	nodes: Vec<TransitionNode>,
	/// Position of each source token in `nodes`.
	index: HashMap<String, usize>,
	dirty: bool,
	/// Number of transitions observed, informational only.
	tokens_seen: u64,
}

impl Default for TransitionGraph {
	fn default() -> Self {
		Self::new()
	}
}

impl TransitionGraph {
	/// Creates an empty graph.
	///
	/// A new graph is dirty until its first `recalculate_all`.
	pub fn new() -> Self {
		Self { nodes: Vec::new(), index: HashMap::new(), dirty: true, tokens_seen: 0 }
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// True if any node changed since the last `recalculate_all`.
	pub fn is_dirty(&self) -> bool {
		self.dirty
	}

	pub fn tokens_seen(&self) -> u64 {
		self.tokens_seen
	}

	/// Number of distinct (source, successor) pairs.
	pub fn edge_count(&self) -> usize {
		self.nodes.iter().map(TransitionNode::len).sum()
	}

	pub fn node(&self, source_token: &str) -> Option<&TransitionNode> {
		self.index.get(source_token).map(|&position| &self.nodes[position])
	}

	/// Iterates nodes in insertion order.
	pub fn nodes(&self) -> impl Iterator<Item = &TransitionNode> {
		self.nodes.iter()
	}

	/// Source tokens in insertion order.
	pub fn source_tokens(&self) -> impl Iterator<Item = &str> {
		self.nodes.iter().map(TransitionNode::source_token)
	}

	/// Records one observation of `source_token -> successor`.
	///
	/// Creates the node for `source_token` on first sight.
	pub fn add_transition(&mut self, source_token: &str, successor: &str) {
		self.tokens_seen += 1;

		match self.index.get(source_token) {
			Some(&position) => self.nodes[position].add_successor(successor),
			None => {
				self.index.insert(source_token.to_owned(), self.nodes.len());
				self.nodes.push(TransitionNode::new(source_token, successor));
			}
		}

		self.dirty = true;
	}

	/// Trains the graph on an ordered token sequence.
	///
	/// Every adjacent pair is recorded, plus a wrap-around pair from the
	/// last token back to the first. A single token therefore yields a
	/// self-loop.
	///
	/// # Errors
	/// Returns `Warning::EmptyInput` if `tokens` is empty; the graph is left untouched.
	pub fn train<S: AsRef<str>>(&mut self, tokens: &[S]) -> Result<(), Warning> {
		let (Some(first), Some(last)) = (tokens.first(), tokens.last()) else {
			warn!("cannot train on an empty token sequence");
			return Err(Warning::EmptyInput);
		};

		for pair in tokens.windows(2) {
			self.add_transition(pair[0].as_ref(), pair[1].as_ref());
		}
		self.add_transition(last.as_ref(), first.as_ref());

		debug!(tokens = tokens.len(), nodes = self.len(), "trained graph");
		Ok(())
	}

	/// Recalculates the probabilities of every node.
	///
	/// Does nothing when the graph is clean. Must run after training or
	/// merging and before sampling.
	pub fn recalculate_all(&mut self) {
		if !self.dirty {
			return;
		}

		for node in &mut self.nodes {
			node.recalculate();
		}

		self.dirty = false;
	}

	/// Combines this graph with `other` into a new graph.
	///
	/// Every edge of `self`, then every edge of `other`, is replayed once per
	/// recorded occurrence. The result has the statistics of a single graph
	/// trained on both token streams. Neither input is modified; the result
	/// starts dirty.
	pub fn combine(&self, other: &Self) -> Self {
		let mut combined = Self::new();
		combined.replay(self);
		combined.replay(other);

		debug!(nodes = combined.len(), edges = combined.edge_count(), "combined graphs");
		combined
	}

	fn replay(&mut self, other: &Self) {
		for node in &other.nodes {
			for (successor, count) in node.export_counts() {
				for _ in 0..count {
					self.add_transition(node.source_token(), &successor);
				}
			}
		}
	}

	/// Generates text using the thread-local random generator.
	///
	/// See [`TransitionGraph::generate_with_rng`].
	pub fn generate(&self, input: &GenerationInput) -> Outcome<String> {
		self.generate_with_rng(input, &mut rand::rng())
	}

	/// Generates text with a random walk starting at the seed token.
	///
	/// # Behavior
	/// - The start token is always emitted, capitalized, and does not
	///   consume the `max_tokens` budget.
	/// - Each step samples a successor of the current token. The walk stops
	///   at a dead end (no node), on a failed draw, or once `max_tokens`
	///   successors were appended.
	/// - Successors are separated by a space, except the `.` and `,` markers.
	/// - A token following `.` is capitalized.
	///
	/// Stale probabilities and exhausted draws are reported in the outcome
	/// warnings; generation never fails.
	pub fn generate_with_rng<R: Rng + ?Sized>(&self, input: &GenerationInput, rng: &mut R) -> Outcome<String> {
		let mut outcome = Outcome::clean(String::new());
		if self.dirty {
			warn!("generating text before probabilities were recalculated");
			outcome.push(Warning::StaleProbabilities);
		}

		let start = self.start_token(&input.start_seed, rng);
		let mut text = capitalize(&start);
		let mut current: &str = &start;

		for _ in 0..input.max_tokens() {
			let Some(node) = self.node(current) else {
				break;
			};

			let next = match node.sample_successor_with_rng(rng) {
				Ok(sampled) => {
					for warning in sampled.warnings {
						outcome.push(warning);
					}
					sampled.value
				}
				Err(warning) => {
					outcome.push(warning);
					break;
				}
			};

			if next != SENTENCE_END && next != PHRASE_END {
				text.push(' ');
			}
			if current == SENTENCE_END {
				text.push_str(&capitalize(next));
			} else {
				text.push_str(next);
			}

			current = next;
		}

		outcome.value = text;
		outcome
	}

	/// Resolves the start token; an empty graph yields the empty string
	/// unless a custom seed is given.
	fn start_token<R: Rng + ?Sized>(&self, start_seed: &StartSeed, rng: &mut R) -> String {
		match start_seed {
			StartSeed::Custom(token) => token.clone(),
			StartSeed::First => self.source_tokens().next().unwrap_or_default().to_owned(),
			StartSeed::Random => {
				if self.nodes.is_empty() {
					return String::new();
				}
				let position = rng.random_range(0..self.nodes.len());
				self.nodes[position].source_token().to_owned()
			}
		}
	}

	/// Exports the raw occurrence counts, source by source, in insertion order.
	pub fn to_portable_form(&self) -> PortableForm {
		PortableForm::from_entries(
			self.nodes
				.iter()
				.map(|node| (node.source_token().to_owned(), node.export_counts()))
				.collect(),
		)
	}

	/// Rebuilds a graph by replaying every recorded occurrence.
	///
	/// The result is dirty and must be recalculated before use.
	///
	/// # Errors
	/// Returns `GraphError::MalformedPortableForm` if a source has no
	/// successor or a count is not strictly positive. No partial graph is
	/// returned.
	pub fn from_portable_form(form: &PortableForm) -> Result<Self, GraphError> {
		form.validate()?;

		let mut graph = Self::new();
		for (source, successors) in form.entries() {
			for (successor, count) in successors {
				for _ in 0..*count {
					graph.add_transition(source, successor);
				}
			}
		}

		debug!(nodes = graph.len(), tokens_seen = graph.tokens_seen(), "loaded graph from portable form");
		Ok(graph)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::model::node::tests::FixedRng;

	fn trained(tokens: &[&str]) -> TransitionGraph {
		let mut graph = TransitionGraph::new();
		graph.train(tokens).unwrap();
		graph.recalculate_all();
		graph
	}

	fn counts(graph: &TransitionGraph, source: &str) -> Vec<(String, i64)> {
		graph.node(source).map(TransitionNode::export_counts).unwrap_or_default()
	}

	#[test]
	fn train_records_pairs_and_wrap_around() {
		let graph = trained(&["a", "b", "a", "c"]);

		assert_eq!(graph.source_tokens().collect::<Vec<_>>(), vec!["a", "b", "c"]);
		assert_eq!(counts(&graph, "a"), vec![("b".to_owned(), 1), ("c".to_owned(), 1)]);
		assert_eq!(counts(&graph, "c"), vec![("a".to_owned(), 1)]);
		assert_eq!(graph.tokens_seen(), 4);
		assert_eq!(graph.edge_count(), 4);
	}

	#[test]
	fn single_token_makes_a_self_loop() {
		let graph = trained(&["a"]);
		assert_eq!(counts(&graph, "a"), vec![("a".to_owned(), 1)]);
	}

	#[test]
	fn empty_input_is_rejected_without_mutation() {
		let mut graph = trained(&["a", "b"]);
		let empty: [&str; 0] = [];

		assert_eq!(graph.train(&empty), Err(Warning::EmptyInput));
		assert!(!graph.is_dirty());
		assert_eq!(graph.tokens_seen(), 2);
	}

	#[test]
	fn recalculate_all_clears_dirty() {
		let mut graph = TransitionGraph::new();
		assert!(graph.is_dirty());
		graph.train(&["x", "y"]).unwrap();
		graph.recalculate_all();
		assert!(!graph.is_dirty());
		assert!(graph.nodes().all(|node| !node.is_dirty()));

		graph.train(&["y", "z"]).unwrap();
		assert!(graph.is_dirty());
	}

	#[test]
	fn combine_sums_counts_and_leaves_inputs_alone() {
		let left = trained(&["a", "b", "a", "c"]);
		let right = trained(&["a", "b", "d"]);

		let mut combined = left.combine(&right);
		assert!(combined.is_dirty());
		combined.recalculate_all();

		assert_eq!(combined.node("a").unwrap().total_occurrences(), 3);
		assert_eq!(counts(&combined, "a"), vec![("b".to_owned(), 2), ("c".to_owned(), 1)]);
		assert_eq!(counts(&combined, "d"), vec![("a".to_owned(), 1)]);
		assert_eq!(combined.tokens_seen(), left.tokens_seen() + right.tokens_seen());

		assert_eq!(counts(&left, "a"), vec![("b".to_owned(), 1), ("c".to_owned(), 1)]);
		assert!(right.node("c").is_none());
	}

	#[test]
	fn generation_is_deterministic_with_fixed_draw() {
		let graph = trained(&["the", "cat", ".", "a", "dog", ","]);
		let input = GenerationInput::new(6).unwrap();

		let outcome = graph.generate_with_rng(&input, &mut FixedRng(0));
		assert!(outcome.is_clean());
		assert_eq!(outcome.value, "The cat. A dog, the");
	}

	#[test]
	fn zero_budget_returns_only_the_start_token() {
		let graph = trained(&["hello", "world"]);
		let input = GenerationInput::new(0).unwrap();
		assert_eq!(graph.generate_with_rng(&input, &mut FixedRng(0)).value, "Hello");
	}

	#[test]
	fn unknown_seed_stops_immediately() {
		let graph = trained(&["hello", "world"]);
		let input = GenerationInput::new(10).unwrap().with_seed(StartSeed::Custom("moon".to_owned()));
		assert_eq!(graph.generate_with_rng(&input, &mut FixedRng(0)).value, "Moon");
	}

	#[test]
	fn walk_stops_at_the_budget() {
		let graph = trained(&["on", "and"]);
		let input = GenerationInput::new(3).unwrap();
		assert_eq!(graph.generate_with_rng(&input, &mut FixedRng(0)).value, "On and on and");
	}

	#[test]
	fn empty_graph_generates_empty_text() {
		let mut graph = TransitionGraph::new();
		graph.recalculate_all();
		let outcome = graph.generate_with_rng(&GenerationInput::default(), &mut FixedRng(0));
		assert_eq!(outcome.value, "");
		assert!(outcome.is_clean());
	}

	#[test]
	fn stale_graph_still_generates_with_a_warning() {
		let mut graph = TransitionGraph::new();
		graph.train(&["a", "b"]).unwrap();

		let outcome = graph.generate_with_rng(&GenerationInput::default(), &mut FixedRng(0));
		assert_eq!(outcome.value, "A");
		assert_eq!(
			outcome.warnings,
			vec![Warning::StaleProbabilities, Warning::SamplingExhausted { source_token: "a".to_owned() }]
		);
	}

	#[test]
	fn random_seed_picks_a_source_token() {
		let graph = trained(&["a", "b", "c"]);
		let input = GenerationInput::new(0).unwrap().with_seed(StartSeed::Random);

		let last = graph.generate_with_rng(&input, &mut FixedRng::from_unit(0.99));
		assert_eq!(last.value, "C");
	}
}
