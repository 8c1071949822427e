//! Error types for session operations, exports, settings and the template engine.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or validating [`crate::settings::Settings`].
#[derive(Error, Debug)]
pub enum SettingsError {
    /// The settings file could not be read
    #[error("cannot read settings file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The settings file is not valid JSON for the settings schema
    #[error("invalid settings file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A field holds a value the application cannot use
    #[error("invalid setting '{field}': {message}")]
    Invalid { field: String, message: String },
}

/// Errors raised while writing polygon coordinates to a file.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("no coordinates to export")]
    Empty,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the external template engine or its binding.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A configured file or directory does not exist
    #[error("{what} not found: {path:?}")]
    Missing { what: &'static str, path: PathBuf },

    /// The engine could not be started or talked to
    #[error("cannot run template engine {program:?}: {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The engine answered the capability query with something unreadable
    #[error("template engine returned malformed capabilities: {0}")]
    Capabilities(#[from] serde_json::Error),

    /// The engine does not offer an operation this application needs
    #[error("template engine '{engine}' does not support '{operation}' (offers: {offered})")]
    Unsupported {
        engine: String,
        operation: &'static str,
        offered: String,
    },

    /// The engine ran and reported failure
    #[error("template generation failed: {0}")]
    Failed(String),
}

/// Errors surfaced to the user from session and application actions.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("no image loaded")]
    NoImage,

    #[error("at least 3 points are needed to form a polygon (got {count})")]
    TooFewPoints { count: usize },

    #[error("draw and complete a polygon first")]
    NoPolygon,

    #[error("a template is already being generated")]
    Busy,

    #[error("the template worker stopped unexpectedly")]
    WorkerLost,

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
