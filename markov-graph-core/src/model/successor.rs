use tracing::warn;

use crate::error::Warning;

/// One candidate next token of a `TransitionNode`.
///
/// Stores how many times the transition was observed and the probability
/// derived from it. The probability is only meaningful right after the
/// owning node recalculated; any later mutation of the node makes it stale.
///
/// ## Invariants
/// - `token` never changes after creation
/// - `occurrence_count` starts at 1 and only `decrement` can lower it
#[derive(Clone, Debug, PartialEq)]
pub struct SuccessorRecord {
	token: String,
	occurrence_count: i64,
	probability: f64,
}

impl SuccessorRecord {
	/// Creates a record for the first observation of `token`.
	pub fn new(token: &str) -> Self {
		Self {
			token: token.to_owned(),
			occurrence_count: 1,
			probability: 0.0,
		}
	}

	pub fn token(&self) -> &str {
		&self.token
	}

	pub fn occurrence_count(&self) -> i64 {
		self.occurrence_count
	}

	/// Probability computed by the last `recompute_probability` call.
	pub fn probability(&self) -> f64 {
		self.probability
	}

	/// Records one more observation.
	pub fn increment(&mut self) {
		self.occurrence_count += 1;
	}

	/// Removes one observation.
	///
	/// Not guarded: the count may reach zero or go negative. No training or
	/// merging path calls this.
	pub fn decrement(&mut self) {
		self.occurrence_count -= 1;
	}

	/// Sets `probability = occurrence_count / total_occurrences`.
	///
	/// # Errors
	/// Returns `Warning::ZeroOccurrences` when `total_occurrences` is zero.
	/// The probability is clamped to 0 in that case, so the record stays usable.
	pub fn recompute_probability(&mut self, total_occurrences: i64) -> Result<(), Warning> {
		if total_occurrences == 0 {
			warn!(token = %self.token, "total occurrence count is zero, probability clamped to 0");
			self.probability = 0.0;
			return Err(Warning::ZeroOccurrences { token: self.token.clone() });
		}

		self.probability = self.occurrence_count as f64 / total_occurrences as f64;
		Ok(())
	}
}
