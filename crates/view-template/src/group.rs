/*
 * group.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The configured engine and the template handles it hands out.
//!
//! A [`TemplateGroup`] owns one `minijinja` environment: delimiter syntax,
//! source loading and the compiled-template cache all live there. It is built
//! once and only read afterwards, so a group can be shared across threads.

use std::io::Write;

use minijinja::syntax::SyntaxConfig;
use minijinja::{AutoEscape, Environment, ErrorKind, Template, default_auto_escape_callback};
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{TemplateError, TemplateResult};
use crate::model::VariableScope;
use crate::source::{FileSystemSource, TemplateSource};

/// A configured template engine.
#[derive(Debug)]
pub struct TemplateGroup {
    env: Environment<'static>,
}

impl TemplateGroup {
    /// Build a group loading templates from `config.template_root`.
    pub fn new(config: &EngineConfig) -> TemplateResult<Self> {
        let source = FileSystemSource::new(&config.template_root)?;
        debug!(root = %source.root().display(), "Loading templates from directory");
        Self::with_source(config, source)
    }

    /// Build a group loading templates from an arbitrary source.
    pub fn with_source<S: TemplateSource + 'static>(
        config: &EngineConfig,
        source: S,
    ) -> TemplateResult<Self> {
        let syntax = syntax_config(config)?;

        let mut env = Environment::new();
        env.set_syntax(syntax);
        if config.html_escape {
            env.set_auto_escape_callback(default_auto_escape_callback);
        } else {
            env.set_auto_escape_callback(|_| AutoEscape::None);
        }
        env.set_loader(move |name| {
            source.load(name).map_err(|e| {
                minijinja::Error::new(
                    ErrorKind::InvalidOperation,
                    format!("could not read template {name}"),
                )
                .with_source(e)
            })
        });
        Ok(Self { env })
    }

    /// Wrap an environment the host has already configured.
    pub fn from_environment(env: Environment<'static>) -> Self {
        Self { env }
    }

    pub fn environment(&self) -> &Environment<'static> {
        &self.env
    }

    /// Look up a whole template by name.
    pub fn get_template(&self, name: &str) -> TemplateResult<TemplateHandle<'_>> {
        let template = self.env.get_template(name).map_err(|e| match e.kind() {
            ErrorKind::TemplateNotFound => TemplateError::Missing {
                name: name.to_string(),
                fragment: None,
            },
            _ => TemplateError::render(name, e),
        })?;
        Ok(TemplateHandle {
            template,
            fragment: None,
        })
    }

    /// Look up one named block of a template.
    ///
    /// The block itself is checked when the handle is rendered.
    pub fn get_fragment(&self, name: &str, fragment: &str) -> TemplateResult<TemplateHandle<'_>> {
        let mut handle = self.get_template(name)?;
        handle.fragment = Some(fragment.to_string());
        Ok(handle)
    }
}

/// Map delimiter settings onto the engine syntax.
///
/// An empty statement end means statements are line-based, so the start
/// marker becomes a line-statement prefix.
fn syntax_config(config: &EngineConfig) -> TemplateResult<SyntaxConfig> {
    let required = [
        ("placeholder start", &config.placeholder_start),
        ("placeholder end", &config.placeholder_end),
        ("statement start", &config.statement_start),
    ];
    if let Some((label, _)) = required.iter().find(|(_, value)| value.is_empty()) {
        return Err(TemplateError::init(
            "invalid delimiter configuration",
            format!("{label} must not be empty"),
        ));
    }

    let mut builder = SyntaxConfig::builder();
    builder.variable_delimiters(
        config.placeholder_start.clone(),
        config.placeholder_end.clone(),
    );
    if config.uses_line_statements() {
        builder.line_statement_prefix(config.statement_start.clone());
    } else {
        builder.block_delimiters(config.statement_start.clone(), config.statement_end.clone());
    }
    builder
        .build()
        .map_err(|e| TemplateError::init("invalid delimiter configuration", e))
}

/// A template resolved for a single render call.
#[derive(Debug)]
pub struct TemplateHandle<'env> {
    template: Template<'env, 'env>,
    fragment: Option<String>,
}

impl TemplateHandle<'_> {
    pub fn name(&self) -> &str {
        self.template.name()
    }

    /// The block this handle renders, or `None` for the whole template.
    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// Bind `scope` and write the output to `out`.
    ///
    /// A fragment is rendered after the whole template has been evaluated
    /// with its output discarded, so an error anywhere in the template fails
    /// the fragment too.
    pub fn render_to<W: Write + ?Sized>(
        &self,
        scope: &VariableScope,
        out: &mut W,
    ) -> TemplateResult<()> {
        let ctx = scope.to_value();
        let Some(fragment) = &self.fragment else {
            self.template
                .render_captured_to(ctx, &mut *out)
                .map_err(|e| TemplateError::render(self.name(), e))?;
            return Ok(());
        };

        let mut captured = self
            .template
            .render_captured(ctx)
            .map_err(|e| TemplateError::render(self.name(), e))?;
        let output = captured
            .with_state_mut(|state| state.render_block(fragment))
            .map_err(|e| match e.kind() {
                ErrorKind::UnknownBlock => TemplateError::Missing {
                    name: self.name().to_string(),
                    fragment: Some(fragment.clone()),
                },
                _ => TemplateError::render(self.name(), e),
            })?;
        out.write_all(output.as_bytes())
            .map_err(|e| TemplateError::render(self.name(), e))
    }
}
