//! Top-level module for the transition graph.
//!
//! Components, leaf first:
//! - Successor records (`SuccessorRecord`)
//! - Per-token transition nodes (`TransitionNode`)
//! - The graph itself (`TransitionGraph`)
//! - Generation parameters (`GenerationInput`)
//! - Named graph collection (`GraphRegistry`)

/// One candidate next token with its count and derived probability.
pub mod successor;

/// All successors of one source token; weighted sampling.
pub mod node;

/// Training, recalculation, combination, generation and portable conversion.
pub mod graph;

/// Generation parameters: token budget and start seed.
pub mod generation_input;

/// Named graphs trained from raw text.
pub mod registry;
