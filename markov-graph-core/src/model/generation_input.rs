use crate::error::GraphError;

/// Upper bound accepted by [`GenerationInput::set_max_tokens`].
pub const MAX_TOKENS_LIMIT: usize = 100_000;

/// Default number of tokens appended after the start token.
pub const DEFAULT_MAX_TOKENS: usize = 50;

/// Strategy used to select the start token of a generation walk.
///
/// # Variants
/// - `First`: start at the first source token inserted into the graph.
/// - `Custom(String)`: start at the given token, used as-is even when the
///   graph has no node for it.
/// - `Random`: start at a uniformly chosen source token.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum StartSeed {
	#[default]
	First,
	Custom(String),
	Random,
}

/// Parameters of a generation walk.
///
/// # Invariants
/// - `max_tokens` never exceeds `MAX_TOKENS_LIMIT`
///
/// The start token does not consume the budget: a walk emits at most
/// `max_tokens + 1` tokens.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationInput {
	max_tokens: usize,

	/// Start token selection.
	pub start_seed: StartSeed,
}

impl Default for GenerationInput {
	fn default() -> Self {
		Self { max_tokens: DEFAULT_MAX_TOKENS, start_seed: StartSeed::First }
	}
}

impl GenerationInput {
	/// Creates an input with the given budget, starting at the first node.
	///
	/// # Errors
	/// Returns an error if `max_tokens` exceeds `MAX_TOKENS_LIMIT`.
	pub fn new(max_tokens: usize) -> Result<Self, GraphError> {
		let mut input = Self::default();
		input.set_max_tokens(max_tokens)?;
		Ok(input)
	}

	/// Builder-style variant of `start_seed` assignment.
	pub fn with_seed(mut self, start_seed: StartSeed) -> Self {
		self.start_seed = start_seed;
		self
	}

	/// Returns the current token budget.
	pub fn max_tokens(&self) -> usize {
		self.max_tokens
	}

	/// Sets the token budget.
	///
	/// # Errors
	/// Returns an error if the value exceeds `MAX_TOKENS_LIMIT`.
	pub fn set_max_tokens(&mut self, max_tokens: usize) -> Result<(), GraphError> {
		if max_tokens > MAX_TOKENS_LIMIT {
			return Err(GraphError::InvalidInput(format!(
				"max_tokens must be at most {MAX_TOKENS_LIMIT}, got {max_tokens}"
			)));
		}
		self.max_tokens = max_tokens;
		Ok(())
	}
}
