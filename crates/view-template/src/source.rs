/*
 * source.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Template source loading.
//!
//! This module provides the trait and implementations the engine uses to turn
//! a template name into source text (filesystem directory, memory, etc.).

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::{TemplateError, TemplateResult};

/// Trait for loading template source text by name.
///
/// Implementations must be shareable across threads: the engine calls them
/// lazily the first time a template is requested.
pub trait TemplateSource: Send + Sync {
    /// Load a template by name (e.g., "index.html", "user/profile.html").
    ///
    /// # Returns
    /// The template source, `Ok(None)` if there is no such template, or an
    /// error if the template exists but can't be read.
    fn load(&self, name: &str) -> io::Result<Option<String>>;
}

/// Source that reads UTF-8 templates from a directory.
///
/// Names are resolved relative to the root. Names that would escape the root
/// (parent components, absolute paths) are treated as missing.
#[derive(Debug, Clone)]
pub struct FileSystemSource {
    root: PathBuf,
}

impl FileSystemSource {
    /// Create a source rooted at `root`.
    ///
    /// Fails if the root is not a readable directory.
    pub fn new(root: impl Into<PathBuf>) -> TemplateResult<Self> {
        let root = root.into();
        std::fs::read_dir(&root).map_err(|e| {
            TemplateError::init(
                format!("template root {} is not readable", root.display()),
                e,
            )
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl TemplateSource for FileSystemSource {
    fn load(&self, name: &str) -> io::Result<Option<String>> {
        let Some(path) = resolve_template_path(&self.root, name) else {
            return Ok(None);
        };
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

/// Source that serves templates from an in-memory map.
///
/// Useful for testing and for templates bundled into the application.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    templates: HashMap<String, String>,
}

impl MemorySource {
    /// Create a new empty memory source.
    pub fn new() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    /// Add a template to the source.
    pub fn add(&mut self, name: impl Into<String>, content: impl Into<String>) -> &mut Self {
        self.templates.insert(name.into(), content.into());
        self
    }

    /// Create a source with the given templates.
    pub fn with_templates(
        templates: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        let mut source = Self::new();
        for (name, content) in templates {
            source.add(name, content);
        }
        source
    }
}

impl TemplateSource for MemorySource {
    fn load(&self, name: &str) -> io::Result<Option<String>> {
        Ok(self.templates.get(name).cloned())
    }
}

/// Join a template name onto the root, refusing names that leave it.
///
/// Both `/` and `\` separate segments; empty and `.` segments are skipped.
pub fn resolve_template_path(root: &Path, name: &str) -> Option<PathBuf> {
    let mut path = root.to_path_buf();
    for segment in name.split(['/', '\\']) {
        if segment.is_empty() || segment == "." {
            continue;
        }
        let mut components = Path::new(segment).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) => path.push(part),
            _ => return None,
        }
    }
    Some(path)
}
