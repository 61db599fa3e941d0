/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Error types for view resolution and rendering.

use thiserror::Error;

/// Boxed cause carried by [`TemplateError`] variants.
pub type BoxedCause = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while setting up or rendering a view.
#[derive(Debug, Error)]
pub enum TemplateError {
    /// Failed to set up template loading (unreadable root, bad delimiters).
    #[error("Template initialization failed: {message}")]
    Init {
        message: String,
        #[source]
        source: BoxedCause,
    },

    /// View name with a malformed `template#fragment` specification.
    #[error("Malformed view name: {view}")]
    Resolution { view: String },

    /// The template, or the named fragment inside it, does not exist.
    #[error("{}", missing_message(.name, .fragment.as_deref()))]
    Missing {
        name: String,
        fragment: Option<String>,
    },

    /// The engine failed while binding variables or producing output.
    #[error("Failed to render {name}: {source}")]
    Render {
        name: String,
        #[source]
        source: BoxedCause,
    },
}

/// Coarse classification of a [`TemplateError`].
///
/// Hosts use this to pick a response status without matching on variant
/// payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateErrorKind {
    Init,
    Resolution,
    Missing,
    Render,
}

impl TemplateError {
    pub fn kind(&self) -> TemplateErrorKind {
        match self {
            TemplateError::Init { .. } => TemplateErrorKind::Init,
            TemplateError::Resolution { .. } => TemplateErrorKind::Resolution,
            TemplateError::Missing { .. } => TemplateErrorKind::Missing,
            TemplateError::Render { .. } => TemplateErrorKind::Render,
        }
    }

    pub(crate) fn init(message: impl Into<String>, source: impl Into<BoxedCause>) -> Self {
        TemplateError::Init {
            message: message.into(),
            source: source.into(),
        }
    }

    pub(crate) fn render(name: impl Into<String>, source: impl Into<BoxedCause>) -> Self {
        TemplateError::Render {
            name: name.into(),
            source: source.into(),
        }
    }
}

fn missing_message(name: &str, fragment: Option<&str>) -> String {
    match fragment {
        Some(fragment) => format!("Fragment '{fragment}' not found in template: {name}"),
        None => format!("Template not found: {name}"),
    }
}

/// Result type for template operations.
pub type TemplateResult<T> = Result<T, TemplateError>;
