// src/refine/mod.rs — Iterative refinement with a critic gate

pub mod engine;
pub mod parser;
pub mod types;

pub use engine::{Critic, RefinementLoop, Reviser};
pub use parser::{parse_critique, render_suggestions, APPROVAL_TOKEN};
pub use types::{
    Critique, LoopState, RefineError, RefineEvent, RefineOutcome, Stage, TerminationReason,
};
