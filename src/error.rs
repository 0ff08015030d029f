//! Error taxonomy shared by the transport, the collectors and the query loader.
//!
//! Per-cycle failures ([`ExporterError::Transport`], [`ExporterError::Parse`])
//! never cross a collector boundary: the stats collector degrades to `up = 0`
//! and a query collector degrades to its fallback value. Configuration
//! failures ([`ExporterError::Config`]) are fatal at startup.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExporterError {
    /// The request to the RavenDB server failed or returned a non-success status.
    #[error("request to {path} failed: {message}")]
    Transport { path: String, message: String },

    /// The response was not valid JSON or a required field was missing.
    #[error("invalid response: {0}")]
    Parse(String),

    /// Invalid or missing configuration (query definitions, URL, metric names).
    #[error("configuration error: {0}")]
    Config(String),
}

impl ExporterError {
    pub fn transport(path: &str, message: impl Into<String>) -> Self {
        Self::Transport {
            path: path.to_string(),
            message: message.into(),
        }
    }

    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
