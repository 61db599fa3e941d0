/*
 * web.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Host request, session and response types seen by the renderer.
//!
//! The host framework builds these per request. The renderer only reads the
//! request and session; the response is touched only for redirects.

use std::collections::BTreeMap;
use std::sync::Arc;

use minijinja::Value;

/// Named values attached to a request or session.
pub type Attributes = BTreeMap<String, Value>;

/// Read-only view of the request being served.
#[derive(Debug, Clone)]
pub struct RequestContext {
    uri: String,
    url: String,
    remote_address: String,
    protocol: String,
    method: String,
    keep_alive: bool,
    query_string: Option<String>,
    attributes: Attributes,
    session: Option<Arc<SessionContext>>,
}

impl RequestContext {
    /// Create a request for `method` and `uri`.
    ///
    /// The URL defaults to the URI and the protocol to `HTTP/1.1`.
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        let uri = uri.into();
        Self {
            url: uri.clone(),
            uri,
            remote_address: String::new(),
            protocol: "HTTP/1.1".to_string(),
            method: method.into(),
            keep_alive: false,
            query_string: None,
            attributes: Attributes::new(),
            session: None,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_remote_address(mut self, address: impl Into<String>) -> Self {
        self.remote_address = address.into();
        self
    }

    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    pub fn with_keep_alive(mut self, keep_alive: bool) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    pub fn with_query_string(mut self, query: impl Into<String>) -> Self {
        self.query_string = Some(query.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn with_session(mut self, session: impl Into<Arc<SessionContext>>) -> Self {
        self.session = Some(session.into());
        self
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn remote_address(&self) -> &str {
        &self.remote_address
    }

    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    pub fn query_string(&self) -> Option<&str> {
        self.query_string.as_deref()
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    pub fn session(&self) -> Option<&Arc<SessionContext>> {
        self.session.as_ref()
    }
}

/// Read-only view of the session bound to a request.
#[derive(Debug, Clone)]
pub struct SessionContext {
    id: String,
    ip: String,
    /// Epoch milliseconds.
    created: i64,
    /// Epoch milliseconds.
    expired: i64,
    attributes: Attributes,
}

impl SessionContext {
    pub fn new(id: impl Into<String>, ip: impl Into<String>, created: i64, expired: i64) -> Self {
        Self {
            id: id.into(),
            ip: ip.into(),
            created,
            expired,
            attributes: Attributes::new(),
        }
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn created(&self) -> i64 {
        self.created
    }

    pub fn expired(&self) -> i64 {
        self.expired
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }
}

/// The part of the host response the renderer can drive.
pub trait Response {
    /// Send the client to `location`.
    fn redirect(&mut self, location: &str);
}

/// Response that records a redirect instead of writing headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BufferedResponse {
    status: Option<u16>,
    location: Option<String>,
}

impl BufferedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// The `Location` of the last redirect, if any.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}

impl Response for BufferedResponse {
    fn redirect(&mut self, location: &str) {
        self.status = Some(302);
        self.location = Some(location.to_string());
    }
}

/// Per-request state threaded through a render call.
pub struct WebContext<'a> {
    request: Arc<RequestContext>,
    response: &'a mut dyn Response,
}

impl<'a> WebContext<'a> {
    pub fn new(request: impl Into<Arc<RequestContext>>, response: &'a mut dyn Response) -> Self {
        Self {
            request: request.into(),
            response,
        }
    }

    pub fn request(&self) -> &Arc<RequestContext> {
        &self.request
    }

    pub fn response(&mut self) -> &mut dyn Response {
        &mut *self.response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults() {
        let request = RequestContext::new("GET", "/users");
        assert_eq!(request.uri(), "/users");
        assert_eq!(request.url(), "/users");
        assert_eq!(request.protocol(), "HTTP/1.1");
        assert_eq!(request.method(), "GET");
        assert!(!request.keep_alive());
        assert_eq!(request.query_string(), None);
        assert!(request.attributes().is_empty());
        assert!(request.session().is_none());
    }

    #[test]
    fn test_request_builder() {
        let session = SessionContext::new("s1", "10.0.0.1", 0, 1_000).with_attribute("user", "ana");
        let request = RequestContext::new("POST", "/login")
            .with_url("http://example.com/login")
            .with_remote_address("10.0.0.1:5123")
            .with_keep_alive(true)
            .with_query_string("next=%2F")
            .with_attribute("csrf", "abc")
            .with_session(session);

        assert_eq!(request.url(), "http://example.com/login");
        assert_eq!(request.remote_address(), "10.0.0.1:5123");
        assert!(request.keep_alive());
        assert_eq!(request.query_string(), Some("next=%2F"));
        assert_eq!(request.attributes().get("csrf"), Some(&Value::from("abc")));
        let session = request.session().unwrap();
        assert_eq!(session.id(), "s1");
        assert_eq!(session.attributes().get("user"), Some(&Value::from("ana")));
    }

    #[test]
    fn test_buffered_response_redirect() {
        let mut response = BufferedResponse::new();
        assert_eq!(response.location(), None);
        response.redirect("/login");
        assert_eq!(response.status(), Some(302));
        assert_eq!(response.location(), Some("/login"));
    }

    #[test]
    fn test_web_context_forwards_redirect() {
        let mut response = BufferedResponse::new();
        {
            let mut cx = WebContext::new(RequestContext::new("GET", "/"), &mut response);
            assert_eq!(cx.request().uri(), "/");
            cx.response().redirect("/home");
        }
        assert_eq!(response.location(), Some("/home"));
    }
}
