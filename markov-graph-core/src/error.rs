use thiserror::Error;

/// Non-fatal conditions raised by the graph engine.
///
/// A `Warning` never leaves the graph in an inconsistent state: the
/// operation that produced it either did nothing (`EmptyInput`), degraded
/// to a defined fallback (`ZeroOccurrences`, `StaleProbabilities`), or
/// stopped early (`SamplingExhausted`).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Warning {
	/// Training was requested on an empty token sequence.
	#[error("cannot train on an empty token sequence")]
	EmptyInput,

	/// Sampling or generation ran before the probabilities were recalculated.
	#[error("probabilities are stale, recalculate before sampling")]
	StaleProbabilities,

	/// The weighted draw walked past every successor without selecting one.
	#[error("unable to select a successor of {source_token:?}")]
	SamplingExhausted { source_token: String },

	/// A probability was computed against a total of zero and clamped to 0.
	#[error("total occurrence count is zero for successor {token:?}")]
	ZeroOccurrences { token: String },
}

/// Hard failures: the requested result cannot be produced.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GraphError {
	#[error("malformed portable form: {0}")]
	MalformedPortableForm(String),

	#[error("graph {0:?} not found")]
	UnknownGraph(String),

	#[error("graph {0:?} already exists")]
	DuplicateGraph(String),

	#[error("invalid input: {0}")]
	InvalidInput(String),

	#[error("unable to encode portable form: {0}")]
	Encoding(String),
}

/// A value paired with the non-fatal issues met while producing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
	pub value: T,
	pub warnings: Vec<Warning>,
}

impl<T> Outcome<T> {
	/// Wraps a value produced without any warning.
	pub fn clean(value: T) -> Self {
		Self { value, warnings: Vec::new() }
	}

	/// True when no warning was recorded.
	pub fn is_clean(&self) -> bool {
		self.warnings.is_empty()
	}

	/// Records a warning, skipping exact duplicates.
	pub(crate) fn push(&mut self, warning: Warning) {
		if !self.warnings.contains(&warning) {
			self.warnings.push(warning);
		}
	}
}
