/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! View rendering for web hosts on top of the `minijinja` template engine.
//!
//! This crate is the glue between a host's "render this view" call and the
//! template engine. It:
//!
//! - Resolves view names to templates: `users` → `users.html`
//! - Renders a single named block for partial updates: `users#table`
//! - Short-circuits redirects: `redirect:/login`
//! - Merges the model, request attributes, session attributes and the request
//!   itself into the template scope
//! - Exposes request and session fields to templates as virtual attributes
//!   (`${ request.uri }`, `${ user_session.created.year }`)
//!
//! Delimiters default to `${ ... }` for expressions and `@` line statements,
//! and can be changed through [`EngineConfig`].
//!
//! # Example
//!
//! ```ignore
//! use view_template::{
//!     BufferedResponse, EngineConfig, ModelAndView, RequestContext, ViewRenderer, WebContext,
//! };
//!
//! let renderer = ViewRenderer::from_config(&EngineConfig::default())?;
//!
//! let mut response = BufferedResponse::new();
//! let mut cx = WebContext::new(RequestContext::new("GET", "/"), &mut response);
//! let mav = ModelAndView::new("index").with("name", "World");
//!
//! let mut out = Vec::new();
//! renderer.render(&mav, &mut cx, &mut out)?;
//! ```

pub mod attrs;
pub mod config;
pub mod error;
pub mod group;
pub mod model;
pub mod renderer;
pub mod source;
pub mod web;

// Re-export main types at crate root
pub use attrs::{VirtualAttributes, request_value, session_value, timestamp_value};
pub use config::{ConfigLookup, EngineConfig, Layered, ProcessEnv};
pub use error::{TemplateError, TemplateErrorKind, TemplateResult};
pub use group::{TemplateGroup, TemplateHandle};
pub use model::{Model, ModelAndView, VariableScope, ViewTarget};
pub use renderer::{Sink, ViewRenderer};
pub use source::{FileSystemSource, MemorySource, TemplateSource};
pub use web::{Attributes, BufferedResponse, RequestContext, Response, SessionContext, WebContext};

pub use minijinja::Value;
