// src/lib.rs — agentlab library root

pub mod agent;
pub mod cli;
pub mod infra;
pub mod pipeline;
pub mod provider;
pub mod refine;
pub mod util;
