/*
 * attrs.rs
 * Copyright (c) 2025 Posit, PBC
 */

//! Virtual attributes: template-visible fields backed by host accessors.
//!
//! The engine cannot see into host types, so each host type publishes a
//! closed table of field names mapped to accessors. Anything outside the
//! table resolves to undefined, never to an error.
//!
//! | type | fields |
//! |------|--------|
//! | [`RequestContext`] | `uri`, `url`, `remoteAddress`, `protocol`, `method`, `keepAlive`, `queryString` |
//! | [`SessionContext`] | `id`, `ip`, `created`, `expired` |
//!
//! Session timestamps are exposed as date/time values that render as
//! RFC 3339 and carry their own fields (`year`, `month`, ...).

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Datelike, SecondsFormat, Timelike, Utc};
use minijinja::Value;
use minijinja::value::{Enumerator, Object, ObjectRepr};

use crate::web::{RequestContext, SessionContext};

/// A host type that exposes a fixed set of fields to templates.
pub trait VirtualAttributes: fmt::Debug + Send + Sync + 'static {
    /// Every field name [`attribute`](Self::attribute) answers for.
    const FIELDS: &'static [&'static str];

    /// Project a field, or `None` if `name` is not one of [`FIELDS`](Self::FIELDS).
    fn attribute(&self, name: &str) -> Option<Value>;
}

impl VirtualAttributes for RequestContext {
    const FIELDS: &'static [&'static str] = &[
        "uri",
        "url",
        "remoteAddress",
        "protocol",
        "method",
        "keepAlive",
        "queryString",
    ];

    fn attribute(&self, name: &str) -> Option<Value> {
        let value = match name {
            "uri" => Value::from(self.uri()),
            "url" => Value::from(self.url()),
            "remoteAddress" => Value::from(self.remote_address()),
            "protocol" => Value::from(self.protocol()),
            "method" => Value::from(self.method()),
            "keepAlive" => Value::from(self.keep_alive()),
            "queryString" => self.query_string().map_or(Value::UNDEFINED, Value::from),
            _ => return None,
        };
        Some(value)
    }
}

impl VirtualAttributes for SessionContext {
    const FIELDS: &'static [&'static str] = &["id", "ip", "created", "expired"];

    fn attribute(&self, name: &str) -> Option<Value> {
        let value = match name {
            "id" => Value::from(self.id()),
            "ip" => Value::from(self.ip()),
            "created" => timestamp_value(self.created()),
            "expired" => timestamp_value(self.expired()),
            _ => return None,
        };
        Some(value)
    }
}

/// Engine object wrapping a shared host value.
#[derive(Debug)]
struct Projected<T>(Arc<T>);

impl<T: VirtualAttributes> Object for Projected<T> {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Map
    }

    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        self.0.attribute(key.as_str()?)
    }

    fn enumerate(self: &Arc<Self>) -> Enumerator {
        Enumerator::Str(T::FIELDS)
    }
}

/// Expose a request to templates through its virtual attributes.
pub fn request_value(request: &Arc<RequestContext>) -> Value {
    Value::from_object(Projected(Arc::clone(request)))
}

/// Expose a session to templates through its virtual attributes.
pub fn session_value(session: &Arc<SessionContext>) -> Value {
    Value::from_object(Projected(Arc::clone(session)))
}

/// Convert epoch milliseconds into a template date/time value.
///
/// Out-of-range timestamps are undefined, so they render as nothing.
pub fn timestamp_value(millis: i64) -> Value {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map_or(Value::UNDEFINED, |dt| Value::from_object(Timestamp(dt)))
}

#[derive(Debug)]
struct Timestamp(DateTime<Utc>);

impl Object for Timestamp {
    fn repr(self: &Arc<Self>) -> ObjectRepr {
        ObjectRepr::Plain
    }

    fn get_value(self: &Arc<Self>, key: &Value) -> Option<Value> {
        let dt = &self.0;
        let value = match key.as_str()? {
            "year" => Value::from(dt.year()),
            "month" => Value::from(dt.month()),
            "day" => Value::from(dt.day()),
            "hour" => Value::from(dt.hour()),
            "minute" => Value::from(dt.minute()),
            "second" => Value::from(dt.second()),
            "millis" => Value::from(dt.timestamp_subsec_millis()),
            "timestamp" => Value::from(dt.timestamp_millis()),
            _ => return None,
        };
        Some(value)
    }

    fn render(self: &Arc<Self>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}
