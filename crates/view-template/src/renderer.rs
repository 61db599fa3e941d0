/*
 * renderer.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! The view renderer: view name in, bytes out.

use std::fs::File;
use std::io::{self, BufWriter, Stdout, Write};

use tracing::debug;

use crate::config::{DEFAULT_SUFFIX, EngineConfig};
use crate::error::TemplateResult;
use crate::group::TemplateGroup;
use crate::model::{ModelAndView, VariableScope, ViewTarget};
use crate::web::WebContext;

/// An output destination that can be released after rendering.
///
/// `close` defaults to a flush; implementations holding an OS resource
/// should release it there.
pub trait Sink: Write {
    fn close(&mut self) -> io::Result<()> {
        self.flush()
    }
}

impl Sink for Vec<u8> {}
impl Sink for Stdout {}
impl<W: Write> Sink for BufWriter<W> {}

impl Sink for File {
    fn close(&mut self) -> io::Result<()> {
        self.flush()?;
        self.sync_all()
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

/// Close a sink, discarding any error.
///
/// Rendering has already produced its output by the time this runs, so a
/// failed close must not turn a finished render into an error.
fn close_quietly<S: Sink + ?Sized>(sink: &mut S) {
    if let Err(err) = sink.close() {
        debug!(error = %err, "Ignoring error while closing output sink");
    }
}

/// Renders views from a [`TemplateGroup`].
///
/// A renderer is immutable during rendering and can be shared between
/// concurrent requests.
#[derive(Debug)]
pub struct ViewRenderer {
    group: TemplateGroup,
    suffix: String,
}

impl ViewRenderer {
    /// Create a renderer over an already configured group.
    pub fn new(group: TemplateGroup) -> Self {
        Self {
            group,
            suffix: DEFAULT_SUFFIX.to_string(),
        }
    }

    /// Build the group from configuration and apply the configured suffix.
    pub fn from_config(config: &EngineConfig) -> TemplateResult<Self> {
        let mut renderer = Self::new(TemplateGroup::new(config)?);
        renderer.set_suffix(config.suffix.clone());
        Ok(renderer)
    }

    pub fn group(&self) -> &TemplateGroup {
        &self.group
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn set_suffix(&mut self, suffix: impl Into<String>) {
        self.suffix = suffix.into();
    }

    /// Full template name for a bare view name.
    pub fn template_name(&self, view: &str) -> String {
        format!("{view}{}", self.suffix)
    }

    /// Render `model_and_view` into `sink`.
    ///
    /// A `redirect:` view only redirects the response; the sink is left
    /// untouched. Otherwise the sink is closed once rendering has been
    /// attempted, whether or not it succeeded.
    pub fn render<S: Sink>(
        &self,
        model_and_view: &ModelAndView,
        cx: &mut WebContext<'_>,
        mut sink: S,
    ) -> TemplateResult<()> {
        let view = model_and_view.view();
        let handle = match ViewTarget::parse(view)? {
            ViewTarget::Redirect(location) => {
                debug!(location, "Redirecting");
                cx.response().redirect(location);
                return Ok(());
            }
            ViewTarget::Template(name) => self.group.get_template(&self.template_name(name))?,
            ViewTarget::Fragment { template, fragment } => self
                .group
                .get_fragment(&self.template_name(template), fragment)?,
        };
        debug!(
            view,
            template = handle.name(),
            fragment = handle.fragment(),
            "Rendering view"
        );

        let scope = VariableScope::build(model_and_view.model(), cx.request());
        let result = handle.render_to(&scope, &mut sink);
        close_quietly(&mut sink);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use crate::web::{BufferedResponse, RequestContext};
    use crate::{TemplateError, TemplateErrorKind};

    /// Sink that counts closes and can be told to fail them.
    #[derive(Default)]
    struct RecordingSink {
        data: Vec<u8>,
        closes: usize,
        fail_close: bool,
        fail_write: bool,
    }

    impl Write for RecordingSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.fail_write {
                return Err(io::Error::other("write refused"));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Sink for RecordingSink {
        fn close(&mut self) -> io::Result<()> {
            self.closes += 1;
            if self.fail_close {
                Err(io::Error::other("close failed"))
            } else {
                Ok(())
            }
        }
    }

    fn renderer() -> ViewRenderer {
        let source = MemorySource::with_templates([
            ("index.html", "Hello, ${ name }!"),
            ("index.htm", "short suffix"),
        ]);
        ViewRenderer::new(TemplateGroup::with_source(&EngineConfig::default(), source).unwrap())
    }

    fn render(
        renderer: &ViewRenderer,
        mav: &ModelAndView,
        sink: &mut RecordingSink,
    ) -> (TemplateResult<()>, BufferedResponse) {
        let mut response = BufferedResponse::new();
        let result = {
            let mut cx = WebContext::new(RequestContext::new("GET", "/"), &mut response);
            renderer.render(mav, &mut cx, sink)
        };
        (result, response)
    }

    #[test]
    fn test_template_name_appends_suffix() {
        let mut renderer = renderer();
        assert_eq!(renderer.suffix(), ".html");
        assert_eq!(renderer.template_name("users/list"), "users/list.html");
        renderer.set_suffix(".htm");
        assert_eq!(renderer.template_name("index"), "index.htm");
    }

    #[test]
    fn test_render_closes_once() {
        let mut sink = RecordingSink::default();
        let mav = ModelAndView::new("index").with("name", "Ana");
        let (result, response) = render(&renderer(), &mav, &mut sink);
        result.unwrap();
        assert_eq!(String::from_utf8(sink.data).unwrap(), "Hello, Ana!");
        assert_eq!(sink.closes, 1);
        assert_eq!(response.location(), None);
    }

    #[test]
    fn test_close_failure_is_swallowed() {
        let mut sink = RecordingSink {
            fail_close: true,
            ..RecordingSink::default()
        };
        let mav = ModelAndView::new("index").with("name", "Ana");
        let (result, _) = render(&renderer(), &mav, &mut sink);
        assert!(result.is_ok());
        assert_eq!(sink.closes, 1);
    }

    #[test]
    fn test_write_failure_still_closes() {
        let mut sink = RecordingSink {
            fail_write: true,
            ..RecordingSink::default()
        };
        let mav = ModelAndView::new("index").with("name", "Ana");
        let (result, _) = render(&renderer(), &mav, &mut sink);
        assert_eq!(result.unwrap_err().kind(), TemplateErrorKind::Render);
        assert_eq!(sink.closes, 1);
    }

    #[test]
    fn test_redirect_leaves_sink_alone() {
        let mut sink = RecordingSink::default();
        let (result, response) = render(&renderer(), &ModelAndView::new("redirect:/login"), &mut sink);
        result.unwrap();
        assert_eq!(response.location(), Some("/login"));
        assert!(sink.data.is_empty());
        assert_eq!(sink.closes, 0);
    }

    #[test]
    fn test_malformed_view_leaves_sink_alone() {
        let mut sink = RecordingSink::default();
        let (result, response) = render(&renderer(), &ModelAndView::new("a#b#c"), &mut sink);
        assert!(matches!(result, Err(TemplateError::Resolution { ref view }) if view == "a#b#c"));
        assert!(sink.data.is_empty());
        assert_eq!(sink.closes, 0);
        assert_eq!(response.location(), None);
    }

    #[test]
    fn test_missing_template_leaves_sink_alone() {
        let mut sink = RecordingSink::default();
        let (result, _) = render(&renderer(), &ModelAndView::new("nope"), &mut sink);
        match result {
            Err(TemplateError::Missing { name, .. }) => assert_eq!(name, "nope.html"),
            other => panic!("expected missing template, got {other:?}"),
        }
        assert_eq!(sink.closes, 0);
    }

    #[test]
    fn test_suffix_change_applies_to_lookup() {
        let mut renderer = renderer();
        renderer.set_suffix(".htm");
        let mut sink = RecordingSink::default();
        let (result, _) = render(&renderer, &ModelAndView::new("index"), &mut sink);
        result.unwrap();
        assert_eq!(String::from_utf8(sink.data).unwrap(), "short suffix");
    }

    #[test]
    fn test_renderer_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<ViewRenderer>();
    }
}
