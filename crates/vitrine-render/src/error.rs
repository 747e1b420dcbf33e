//! Error types for partial, template and layout rendering.
//!
//! This module provides [`RenderError`], the primary error type for all rendering
//! operations. It abstracts over the underlying template engine's errors, providing
//! a stable public API.
//!
//! Conditions that are part of normal control flow (a cache miss, an empty
//! collection, an absent layout) are never reported through this type.

use std::path::PathBuf;

use thiserror::Error;

/// Which identifier failed the local-variable grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    /// A partial name (explicit or derived from an object's partial path).
    PartialName,
    /// The explicit `as` override.
    AsOption,
}

/// Error type for rendering operations.
#[derive(Debug, Error)]
pub enum RenderError {
    /// No template matched after exhausting search prefixes and formats.
    #[error(
        "missing {} {path} with formats {formats:?}, searched in: {prefixes:?}",
        lookup_kind(.partial)
    )]
    MissingTemplate {
        path: String,
        prefixes: Vec<String>,
        partial: bool,
        formats: Vec<String>,
    },

    /// A partial name or `as` value is not a valid local variable name.
    #[error("{}", invalid_identifier_message(.name, .kind))]
    InvalidIdentifier { name: String, kind: IdentifierKind },

    /// Fragment caching was requested for a collection that resolves to more
    /// than one partial.
    #[error("render caching requires a single template identity; specify a partial when rendering")]
    UnsupportedCaching,

    /// Zero or several template sources were supplied to a template render.
    #[error(
        "a template render needs exactly one of body, plain, html, file, inline, template or path; got {}",
        found_sources(.found)
    )]
    AmbiguousTemplateSource { found: Vec<&'static str> },

    /// The object has no partial path and none was given explicitly.
    #[error("'{value}' is not a renderable object; it must provide a partial path")]
    NotRenderable { value: String },

    /// A layout specification could not be used.
    #[error("invalid layout: {0}")]
    InvalidLayout(String),

    /// A `file` source does not point at an existing file.
    #[error("file sources must be given an existing path; '{}' was given", .0.display())]
    MissingFile(PathBuf),

    /// Template syntax error or failure inside the template engine.
    #[error("template error: {0}")]
    Template(String),

    /// Data serialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error (e.g., reading a template from disk).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    /// The transport closed while a stream was still being produced.
    #[error("stream aborted by the transport")]
    StreamAborted,

    /// A streaming task failed or could not be scheduled.
    #[error("stream error: {0}")]
    Stream(String),
}

fn lookup_kind(partial: &bool) -> &'static str {
    if *partial {
        "partial"
    } else {
        "template"
    }
}

fn found_sources(found: &[&'static str]) -> String {
    if found.is_empty() {
        "none".to_string()
    } else {
        found.join(", ")
    }
}

fn invalid_identifier_message(name: &str, kind: &IdentifierKind) -> String {
    match kind {
        IdentifierKind::PartialName => format!(
            "the partial name ({}) is not a valid identifier; make sure it starts with a \
             lowercase letter or underscore, and is followed by any combination of letters, \
             numbers and underscores",
            name
        ),
        IdentifierKind::AsOption => format!(
            "the value ({}) of the option `as` is not a valid identifier; make sure it starts \
             with a lowercase letter or underscore, and is followed by any combination of \
             letters, numbers and underscores",
            name
        ),
    }
}

impl From<serde_json::Error> for RenderError {
    fn from(err: serde_json::Error) -> Self {
        RenderError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for RenderError {
    fn from(err: serde_yaml::Error) -> Self {
        RenderError::Config(err.to_string())
    }
}

impl From<minijinja::Error> for RenderError {
    fn from(err: minijinja::Error) -> Self {
        use minijinja::ErrorKind;

        match err.kind() {
            ErrorKind::TemplateNotFound => RenderError::MissingTemplate {
                path: err.name().unwrap_or_default().to_string(),
                prefixes: Vec::new(),
                partial: false,
                formats: Vec::new(),
            },
            ErrorKind::BadSerialization => RenderError::Serialization(err.to_string()),
            _ => RenderError::Template(err.to_string()),
        }
    }
}

/// Converts a [`RenderError`] raised inside a template callback back into the
/// engine's error type so it aborts the template render.
pub(crate) fn to_engine_error(err: RenderError) -> minijinja::Error {
    minijinja::Error::new(minijinja::ErrorKind::InvalidOperation, err.to_string())
}
