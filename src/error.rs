//! Error handling for the Frapper evaluation engine
//!
//! Schema and binding problems are logged and swallowed where they happen.
//! The variants here cover everything a caller can observe as a `Result`:
//! structural graph hazards, unknown identities and configuration IO.

use crate::engine::id::{ConnectionId, NodeId, ParameterId};
use thiserror::Error;

/// Main error type for engine operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// A propagation pass reached a parameter that is already on its own stack
    #[error("Cyclic dependency: {}", .path.join(" -> "))]
    CyclicDependency { path: Vec<String> },

    /// A propagation pass went deeper than the configured limit
    #[error("Propagation depth of {limit} exceeded at \"{parameter}\"")]
    PropagationDepthExceeded { limit: usize, parameter: String },

    /// A connection request failed validation
    #[error("Invalid connection: {0}")]
    InvalidConnection(String),

    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    #[error("Unknown parameter id {0}")]
    UnknownParameterId(ParameterId),

    #[error("Unknown node id {0}")]
    UnknownNode(NodeId),

    #[error("Unknown connection {0}")]
    UnknownConnection(ConnectionId),

    /// Errors related to parameter schemas
    #[error("Schema error: {0}")]
    Schema(String),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The shared network lock was poisoned by a panicking holder
    #[error("Network lock poisoned")]
    LockPoisoned,

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<EngineError>,
    },
}

impl EngineError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        EngineError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// True if this error (or the error it wraps) reports a dependency cycle.
    pub fn is_cycle(&self) -> bool {
        match self {
            EngineError::CyclicDependency { .. } => true,
            EngineError::WithContext { source, .. } => source.is_cycle(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}

impl From<toml::ser::Error> for EngineError {
    fn from(err: toml::ser::Error) -> Self {
        EngineError::Serialization(err.to_string())
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> EngineResult<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> EngineResult<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for EngineResult<T> {
    fn context(self, context: impl Into<String>) -> EngineResult<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> EngineResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
