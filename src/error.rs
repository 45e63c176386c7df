//! Error types for module graph operations.
//!
//! This module defines [`ModGraphError`], the primary error type used
//! throughout the crate, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Use `ModGraphError` for domain-specific errors that need distinct handling
//! - Use `anyhow::Error` (via `ModGraphError::Other`) for unexpected errors
//! - A manifest that is readable but does not describe a module is not an
//!   error at the public surface; installs report it as `Ok(None)`

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for module graph operations.
#[derive(Debug, Error)]
pub enum ModGraphError {
    /// Reading or parsing a module manifest failed.
    #[error("Error reading manifest for {location}: {message}")]
    ManifestRead { location: PathBuf, message: String },

    /// Manifest was read but lacks the identity headers of a module.
    #[error("Not a module at {location}: {message}")]
    ManifestInvalid { location: PathBuf, message: String },

    /// A version string could not be parsed.
    #[error("Invalid version '{input}': {message}")]
    InvalidVersion { input: String, message: String },

    /// A requirement filter could not be parsed.
    #[error("Invalid filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },

    /// A manifest header value could not be parsed.
    #[error("Invalid header '{header}': {message}")]
    InvalidHeader { header: String, message: String },

    /// The resolver primitive failed; the graph is left untouched.
    #[error("Resolution failed: {message}")]
    ResolverFailed { message: String },

    /// Configuration file not found at expected location.
    #[error("Configuration not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Failed to parse configuration file.
    #[error("Failed to parse config at {path}: {message}")]
    ConfigParseError { path: PathBuf, message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for module graph operations.
pub type Result<T> = std::result::Result<T, ModGraphError>;
