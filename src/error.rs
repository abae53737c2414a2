//! # Error Handling
//!
//! This module defines the centralized error type for `ents-config`. It uses
//! the `thiserror` library to build one `Error` enum covering every failure
//! mode of configuration composition and object reconciliation.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. The variants fall into three families:
//!   - settings errors (`ConfigParse`, `ConfigMerge`), raised while turning
//!     raw input into a canonical document or layering documents together;
//!   - `CredentialResolution`, raised when an association is configured but
//!     its backing credentials cannot be read;
//!   - `Store`, raised by an object store on get/create/update.
//!
//! - **`StoreErrorKind`**: Classifies store failures so callers can tell a
//!   conflict from a missing object without matching on messages.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`.
//!
//! None of these errors are retried inside the library. They propagate
//! unchanged to the caller, which owns any retry schedule.

use std::fmt;

use thiserror::Error;

/// Classification of object store failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    /// The object does not exist (only raised by `update`).
    NotFound,
    /// An object with the same identity already exists (raised by `create`).
    AlreadyExists,
    /// The submitted object carries a stale resource version.
    Conflict,
    /// The backend could not serve the request.
    Backend,
}

impl fmt::Display for StoreErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StoreErrorKind::NotFound => "not found",
            StoreErrorKind::AlreadyExists => "already exists",
            StoreErrorKind::Conflict => "conflict",
            StoreErrorKind::Backend => "backend failure",
        };
        f.write_str(s)
    }
}

/// Main error type for ents-config operations
#[derive(Error, Debug)]
pub enum Error {
    /// Raw settings input could not be turned into a canonical document.
    ///
    /// `path` is the dotted key path of the offending entry (empty for the
    /// document root).
    #[error("Configuration parsing error at '{path}': {message}")]
    ConfigParse { path: String, message: String },

    /// Two documents disagree on the shape of the same key path.
    #[error("Configuration merge error at '{path}': {message}")]
    ConfigMerge { path: String, message: String },

    /// Association credentials could not be resolved.
    #[error("Credential resolution error for secret '{secret}': {message}")]
    CredentialResolution { secret: String, message: String },

    /// A get, create or update against the object store failed.
    #[error("Store {operation} failed for {key} ({kind}): {message}")]
    Store {
        operation: String,
        key: String,
        kind: StoreErrorKind,
        message: String,
    },

    /// An error occurred during serialization.
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// An error indicating that a mutex or other lock has been poisoned.
    #[error("Lock poisoned: {context}")]
    LockPoisoned { context: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A JSON error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the store error kind if this is a store error.
    pub fn store_kind(&self) -> Option<StoreErrorKind> {
        match self {
            Error::Store { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
