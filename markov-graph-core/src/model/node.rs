use std::collections::HashMap;

use rand::Rng;
use tracing::warn;

use super::successor::SuccessorRecord;
use crate::error::{Outcome, Warning};

/// Represents a source token in the transition graph.
///
/// A `TransitionNode` owns every observed transition from `source_token`
/// to a following token. Conceptually, this is a node in a Markov chain
/// whose outgoing edges are weighted by their number of observations.
///
/// ## Responsibilities:
/// - Accumulate transition occurrences during training
/// - Derive per-successor probabilities from its own total
/// - Sample the next token with a weighted draw
///
/// ## Invariants
/// - `total_occurrences` equals the sum of every successor occurrence count
/// - Successors are kept in first-observation order
/// - After `recalculate`, successor probabilities sum to 1.0
#[derive(Clone, Debug)]
pub struct TransitionNode {
	source_token: String,
	total_occurrences: i64,
	/// Successors in insertion order.
	successors: Vec<SuccessorRecord>,
	/// Position of each successor in `successors`.
	index: HashMap<String, usize>,
	dirty: bool,
}

impl TransitionNode {
	/// Creates a node from its first observed transition `source_token -> first_successor`.
	///
	/// The construction counts as an observation, so the node starts dirty.
	pub fn new(source_token: &str, first_successor: &str) -> Self {
		let mut index = HashMap::new();
		index.insert(first_successor.to_owned(), 0);
		Self {
			source_token: source_token.to_owned(),
			total_occurrences: 1,
			successors: vec![SuccessorRecord::new(first_successor)],
			index,
			dirty: true,
		}
	}

	pub fn source_token(&self) -> &str {
		&self.source_token
	}

	pub fn total_occurrences(&self) -> i64 {
		self.total_occurrences
	}

	/// True if successors changed since the last `recalculate`.
	pub fn is_dirty(&self) -> bool {
		self.dirty
	}

	/// Iterates successors in insertion order.
	pub fn successors(&self) -> impl Iterator<Item = &SuccessorRecord> {
		self.successors.iter()
	}

	pub fn successor(&self, token: &str) -> Option<&SuccessorRecord> {
		self.index.get(token).map(|&position| &self.successors[position])
	}

	pub fn len(&self) -> usize {
		self.successors.len()
	}

	pub fn is_empty(&self) -> bool {
		self.successors.is_empty()
	}

	/// Records an occurrence of a transition toward `token`.
	///
	/// - If the transition already exists, its occurrence count is increased.
	/// - Otherwise, a new successor is appended with an initial count of 1.
	pub fn add_successor(&mut self, token: &str) {
		self.total_occurrences += 1;

		match self.index.get(token) {
			Some(&position) => self.successors[position].increment(),
			None => {
				self.index.insert(token.to_owned(), self.successors.len());
				self.successors.push(SuccessorRecord::new(token));
			}
		}

		self.dirty = true;
	}

	/// Recomputes every successor probability from `total_occurrences`.
	///
	/// Does nothing when the node is clean, so redundant calls are cheap.
	pub fn recalculate(&mut self) {
		if !self.dirty {
			return;
		}

		for successor in &mut self.successors {
			// Already logged by the record; the clamped value is kept.
			let _ = successor.recompute_probability(self.total_occurrences);
		}

		self.dirty = false;
	}

	/// Samples a successor using the thread-local random generator.
	///
	/// See [`TransitionNode::sample_successor_with_rng`].
	pub fn sample_successor(&self) -> Result<Outcome<&str>, Warning> {
		self.sample_successor_with_rng(&mut rand::rng())
	}

	/// Samples a successor with a weighted draw over the cached probabilities.
	///
	/// A uniform value `r` in `[0, 1)` is drawn, then successors are scanned
	/// in insertion order: the first one whose probability exceeds the
	/// remaining `r` is selected, otherwise its probability is subtracted
	/// from `r`. With a fixed draw the result is deterministic.
	///
	/// Sampling a dirty node still proceeds against the stale probabilities;
	/// the returned outcome then carries `Warning::StaleProbabilities`.
	///
	/// # Errors
	/// Returns `Warning::SamplingExhausted` if no successor was selected
	/// (probabilities summing below the draw, e.g. never recalculated).
	pub fn sample_successor_with_rng<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Outcome<&str>, Warning> {
		let mut outcome = Outcome::clean(());
		if self.dirty {
			warn!(source = %self.source_token, "sampling before probabilities were recalculated");
			outcome.push(Warning::StaleProbabilities);
		}

		let mut r: f64 = rng.random();
		for successor in &self.successors {
			let probability = successor.probability();
			if probability > r {
				return Ok(Outcome { value: successor.token(), warnings: outcome.warnings });
			}
			r -= probability;
		}

		warn!(source = %self.source_token, "unable to select a successor");
		Err(Warning::SamplingExhausted { source_token: self.source_token.clone() })
	}

	/// Raw occurrence counts in insertion order.
	///
	/// This is the only per-node information that survives serialization;
	/// probabilities are always rederived.
	pub fn export_counts(&self) -> Vec<(String, i64)> {
		self.successors
			.iter()
			.map(|successor| (successor.token().to_owned(), successor.occurrence_count()))
			.collect()
	}
}
