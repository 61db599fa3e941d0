/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Engine configuration and key-value lookup.
//!
//! The host owns its configuration store; this module only needs to read a
//! handful of string keys from it. [`ConfigLookup`] is the seam, and
//! [`EngineConfig::from_lookup`] fills in defaults for anything unset.

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::path::PathBuf;

pub const PLACEHOLDER_START_KEY: &str = "template.placeholder.start";
pub const PLACEHOLDER_END_KEY: &str = "template.placeholder.end";
pub const STATEMENT_START_KEY: &str = "template.statement.start";
pub const STATEMENT_END_KEY: &str = "template.statement.end";
pub const SUFFIX_KEY: &str = "template.suffix";
pub const TEMPLATE_ROOT_KEY: &str = "template.root";
pub const HTML_ESCAPE_KEY: &str = "template.html.escape";

pub const DEFAULT_PLACEHOLDER_START: &str = "${";
pub const DEFAULT_PLACEHOLDER_END: &str = "}";
pub const DEFAULT_STATEMENT_START: &str = "@";
pub const DEFAULT_STATEMENT_END: &str = "";
pub const DEFAULT_SUFFIX: &str = ".html";
pub const DEFAULT_TEMPLATE_ROOT: &str = "templates";

/// Read access to a host configuration store.
pub trait ConfigLookup {
    /// Look up a configuration value by key.
    fn get(&self, key: &str) -> Option<String>;

    /// Look up a value, falling back to `default` when the key is unset.
    fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }
}

impl<S: BuildHasher> ConfigLookup for HashMap<String, String, S> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

impl ConfigLookup for BTreeMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        BTreeMap::get(self, key).cloned()
    }
}

impl<L: ConfigLookup + ?Sized> ConfigLookup for &L {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }
}

/// Lookup backed by process environment variables.
///
/// Keys are upper-cased with `.` and `-` replaced by `_`, so
/// `template.placeholder.start` reads `TEMPLATE_PLACEHOLDER_START`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl ProcessEnv {
    pub fn variable_name(key: &str) -> String {
        key.chars()
            .map(|c| match c {
                '.' | '-' => '_',
                c => c.to_ascii_uppercase(),
            })
            .collect()
    }
}

impl ConfigLookup for ProcessEnv {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(Self::variable_name(key)).ok()
    }
}

/// Stack of lookups where the first layer holding a key wins.
#[derive(Default)]
pub struct Layered<'a> {
    layers: Vec<&'a dyn ConfigLookup>,
}

impl<'a> Layered<'a> {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Add a layer below the existing ones.
    pub fn push(&mut self, layer: &'a dyn ConfigLookup) -> &mut Self {
        self.layers.push(layer);
        self
    }
}

impl ConfigLookup for Layered<'_> {
    fn get(&self, key: &str) -> Option<String> {
        self.layers.iter().find_map(|layer| layer.get(key))
    }
}

/// Settings used to build a [`TemplateGroup`](crate::TemplateGroup) and a
/// [`ViewRenderer`](crate::ViewRenderer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Opens an expression region.
    pub placeholder_start: String,
    /// Closes an expression region.
    pub placeholder_end: String,
    /// Opens a statement region.
    pub statement_start: String,
    /// Closes a statement region. Empty means the statement ends at the
    /// end of the line.
    pub statement_end: String,
    /// Appended to bare view names to form template names.
    pub suffix: String,
    /// Directory template names are resolved against.
    pub template_root: PathBuf,
    /// HTML-escape expression output in `.html`/`.htm`/`.xml` templates.
    pub html_escape: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            placeholder_start: DEFAULT_PLACEHOLDER_START.to_string(),
            placeholder_end: DEFAULT_PLACEHOLDER_END.to_string(),
            statement_start: DEFAULT_STATEMENT_START.to_string(),
            statement_end: DEFAULT_STATEMENT_END.to_string(),
            suffix: DEFAULT_SUFFIX.to_string(),
            template_root: PathBuf::from(DEFAULT_TEMPLATE_ROOT),
            html_escape: false,
        }
    }
}

impl EngineConfig {
    /// Build a configuration from a host lookup, using defaults for
    /// unset keys.
    pub fn from_lookup<L: ConfigLookup + ?Sized>(lookup: &L) -> Self {
        Self {
            placeholder_start: lookup.get_or(PLACEHOLDER_START_KEY, DEFAULT_PLACEHOLDER_START),
            placeholder_end: lookup.get_or(PLACEHOLDER_END_KEY, DEFAULT_PLACEHOLDER_END),
            statement_start: lookup.get_or(STATEMENT_START_KEY, DEFAULT_STATEMENT_START),
            statement_end: lookup.get_or(STATEMENT_END_KEY, DEFAULT_STATEMENT_END),
            suffix: lookup.get_or(SUFFIX_KEY, DEFAULT_SUFFIX),
            template_root: PathBuf::from(lookup.get_or(TEMPLATE_ROOT_KEY, DEFAULT_TEMPLATE_ROOT)),
            html_escape: lookup.get(HTML_ESCAPE_KEY).is_some_and(|v| parse_flag(&v)),
        }
    }

    pub fn with_template_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.template_root = root.into();
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    pub fn with_html_escape(mut self, enabled: bool) -> Self {
        self.html_escape = enabled;
        self
    }

    /// True when statements run to the end of the line.
    pub fn uses_line_statements(&self) -> bool {
        self.statement_end.is_empty()
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "yes" | "on" | "1"
    )
}
