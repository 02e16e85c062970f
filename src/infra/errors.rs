// src/infra/errors.rs — Error types for agentlab

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentLabError {
    // Provider errors (retriable when transient)
    #[error("Provider '{provider}' error: {message}")]
    Provider {
        provider: String,
        message: String,
        /// HTTP status, when the failure came back from the server.
        status: Option<u16>,
        retriable: bool,
    },

    #[error("Rate limited by '{provider}', retry after {retry_after_ms}ms")]
    RateLimited {
        provider: String,
        retry_after_ms: u64,
    },

    // User errors
    #[error("No provider configured. Set GOOGLE_API_KEY (or GEMINI_API_KEY) or add it to .env.")]
    NoProvider,

    #[error("Unknown pipeline '{name}'. Run `agentlab pipelines` to list the catalog.")]
    UnknownPipeline { name: String },

    #[error("Agent '{agent}' is invalid: {message}")]
    InvalidAgent { agent: String, message: String },

    #[error("Template error in agent '{agent}': {source}")]
    Template {
        agent: String,
        #[source]
        source: minijinja::Error,
    },

    // Infra
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AgentLabError {
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            AgentLabError::Provider {
                retriable: true,
                ..
            } | AgentLabError::RateLimited { .. }
        )
    }

    pub fn invalid_agent(agent: impl Into<String>, message: impl Into<String>) -> Self {
        AgentLabError::InvalidAgent {
            agent: agent.into(),
            message: message.into(),
        }
    }
}
