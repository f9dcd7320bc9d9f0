//! Token transition graph for probabilistic text generation.
//!
//! This crate provides a first-order Markov text generator including:
//! - A weighted, directed graph of token-to-token transitions
//! - Probability caching with explicit recalculation
//! - Random-walk text generation with an injectable random source
//! - Merging of independently trained graphs
//! - A lossless, count-only portable form (JSON text or compact bytes)
//! - A reference tokenizer and a registry of named graphs

/// Error and warning types shared by every module.
pub mod error;

/// Transition graph, its nodes and successor records, generation input and registry.
pub mod model;

/// Portable form of a graph and its text/binary codecs.
pub mod portable;

/// Raw text to token stream.
pub mod tokenizer;

pub use error::{GraphError, Outcome, Warning};
pub use model::generation_input::{GenerationInput, StartSeed};
pub use model::graph::TransitionGraph;
pub use model::registry::GraphRegistry;
pub use portable::PortableForm;
