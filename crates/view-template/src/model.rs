/*
 * model.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Model-and-view values, view-name parsing and the per-render variable scope.

use std::collections::BTreeMap;
use std::sync::Arc;

use minijinja::Value;
use serde::Serialize;

use crate::attrs::request_value;
use crate::error::{TemplateError, TemplateResult};
use crate::web::RequestContext;

/// Prefix that turns a view name into a redirect.
pub const REDIRECT_PREFIX: &str = "redirect:";

/// Separates a template name from a fragment name.
pub const FRAGMENT_SEPARATOR: char = '#';

/// Scope key bound to the session attributes.
pub const SESSION_KEY: &str = "session";

/// Scope key bound to the current request.
pub const REQUEST_KEY: &str = "request";

/// Variables supplied by application code.
pub type Model = BTreeMap<String, Value>;

/// A view name plus the variables to render it with.
#[derive(Debug, Clone, Default)]
pub struct ModelAndView {
    view: String,
    model: Model,
}

impl ModelAndView {
    pub fn new(view: impl Into<String>) -> Self {
        Self {
            view: view.into(),
            model: Model::new(),
        }
    }

    pub fn with_model(view: impl Into<String>, model: Model) -> Self {
        Self {
            view: view.into(),
            model,
        }
    }

    /// Add a model variable from any serializable value.
    pub fn add<T: Serialize + ?Sized>(&mut self, name: impl Into<String>, value: &T) -> &mut Self {
        self.model.insert(name.into(), Value::from_serialize(value));
        self
    }

    /// Builder form of [`add`](Self::add).
    pub fn with<T: Serialize + ?Sized>(mut self, name: impl Into<String>, value: &T) -> Self {
        self.add(name, value);
        self
    }

    pub fn view(&self) -> &str {
        &self.view
    }

    pub fn set_view(&mut self, view: impl Into<String>) {
        self.view = view.into();
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }
}

/// What a view name asks the renderer to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewTarget<'a> {
    /// `redirect:<location>`
    Redirect(&'a str),
    /// A whole template, named without its suffix.
    Template(&'a str),
    /// One named block of a template: `<template>#<fragment>`.
    Fragment { template: &'a str, fragment: &'a str },
}

impl<'a> ViewTarget<'a> {
    /// Parse a view name.
    ///
    /// The redirect prefix is checked first, so `redirect:/a#b` redirects to
    /// `/a#b`. A fragment view needs exactly one separator with a name on
    /// each side.
    pub fn parse(view: &'a str) -> TemplateResult<Self> {
        if let Some(location) = view.strip_prefix(REDIRECT_PREFIX) {
            return Ok(ViewTarget::Redirect(location));
        }
        let Some((template, fragment)) = view.split_once(FRAGMENT_SEPARATOR) else {
            return Ok(ViewTarget::Template(view));
        };
        if template.is_empty() || fragment.is_empty() || fragment.contains(FRAGMENT_SEPARATOR) {
            return Err(TemplateError::Resolution {
                view: view.to_string(),
            });
        }
        Ok(ViewTarget::Fragment { template, fragment })
    }
}

/// The flat set of variables visible to one render call.
///
/// Built in a fixed order, later entries replacing earlier ones:
/// model, request attributes, `session`, `request`.
#[derive(Debug, Clone, Default)]
pub struct VariableScope {
    vars: BTreeMap<String, Value>,
}

impl VariableScope {
    pub fn build(model: &Model, request: &Arc<RequestContext>) -> Self {
        let mut vars = model.clone();
        vars.extend(
            request
                .attributes()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        if let Some(session) = request.session() {
            let attributes = session
                .attributes()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()));
            vars.insert(SESSION_KEY.to_string(), Value::from_iter(attributes));
        }
        vars.insert(REQUEST_KEY.to_string(), request_value(request));
        Self { vars }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.vars.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The scope as a single engine map value.
    pub fn to_value(&self) -> Value {
        Value::from_iter(self.vars.iter().map(|(k, v)| (k.clone(), v.clone())))
    }
}
