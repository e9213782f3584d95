//! Outgoing response type, the exit marker and the [`IntoResponse`] conversion trait.
//!
//! Like [`Request`](crate::Request), a [`Response`] is a value: every `with_*`
//! call returns a new one. An [`ExitResponse`] is a response that also carries
//! a control signal. Returned from frontware or middleware, it skips every
//! deeper layer and jumps the request straight to the back stage.

use std::borrow::Cow;
use std::ops::Deref;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::Full;
use tracing::warn;

// ── Response ─────────────────────────────────────────────────────────────────

/// An immutable response flowing up the pipeline.
///
/// ```rust
/// use strata::Response;
/// use http::StatusCode;
///
/// let res = Response::new(StatusCode::CREATED, "")
///     .with_header("location", "/users/42")
///     .with_body(r#"{"id":42}"#);
///
/// assert_eq!(res.reason(), "Created");
/// assert_eq!(res.header("Location"), Some("/users/42"));
/// ```
#[derive(Clone, Debug)]
pub struct Response {
    status: StatusCode,
    reason: Cow<'static, str>,
    headers: Vec<(String, String)>,
    body: Bytes,
    exit: bool,
}

impl Response {
    /// An empty response. A blank `reason` falls back to the canonical phrase.
    pub fn new(status: StatusCode, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let reason = if reason.is_empty() {
            Cow::Borrowed(status.canonical_reason().unwrap_or(""))
        } else {
            Cow::Owned(reason)
        };
        Self { status, reason, headers: Vec::new(), body: Bytes::new(), exit: false }
    }

    /// `200 OK` with a `text/plain` body.
    pub fn text(body: impl Into<String>) -> Self {
        Self::new(StatusCode::OK, "")
            .with_header("content-type", "text/plain; charset=utf-8")
            .with_body(body.into())
    }

    pub fn status(&self) -> StatusCode { self.status }
    pub fn reason(&self) -> &str { &self.reason }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &Bytes { &self.body }

    /// The body as UTF-8, with invalid sequences replaced.
    pub fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// True when this response started life as an [`ExitResponse`].
    pub fn is_exit(&self) -> bool { self.exit }

    /// Case-insensitive header lookup. Returns the first value.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Every value recorded under `name`, in insertion order.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers.iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// A copy with `name` set to exactly `value`, replacing earlier values.
    #[must_use]
    pub fn with_header(&self, name: &str, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        next.headers.push((name.to_owned(), value.into()));
        next
    }

    /// A copy with `value` appended to whatever `name` already holds.
    #[must_use]
    pub fn with_added_header(&self, name: &str, value: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.headers.push((name.to_owned(), value.into()));
        next
    }

    /// A copy carrying `body`.
    #[must_use]
    pub fn with_body(&self, body: impl Into<Bytes>) -> Self {
        Self { body: body.into(), ..self.clone() }
    }

    /// A copy with a new status. The reason phrase follows the new status.
    #[must_use]
    pub fn with_status(&self, status: StatusCode) -> Self {
        Self {
            status,
            reason: Cow::Borrowed(status.canonical_reason().unwrap_or("")),
            ..self.clone()
        }
    }

    /// Converts into the `http` type hyper writes to the wire.
    ///
    /// Header names or values that are not valid HTTP tokens are dropped with
    /// a warning; everything else is passed through untouched.
    pub(crate) fn into_http(self) -> http::Response<Full<Bytes>> {
        let mut out = http::Response::new(Full::new(self.body));
        *out.status_mut() = self.status;

        let headers = out.headers_mut();
        for (name, value) in self.headers {
            match (
                http::HeaderName::from_bytes(name.as_bytes()),
                http::HeaderValue::from_str(&value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.append(name, value);
                }
                _ => warn!(header = %name, "dropping header that is not valid on the wire"),
            }
        }
        out
    }
}

impl Default for Response {
    /// `200 OK`, no headers, empty body. Seeds every pipeline run.
    fn default() -> Self {
        Self::new(StatusCode::OK, "")
    }
}

// ── ExitResponse ─────────────────────────────────────────────────────────────

/// A terminal response: "stop here, go straight to the back stage".
///
/// Obtain one from [`Dispatcher::create_exit_response`](crate::Dispatcher::create_exit_response)
/// or [`ExitResponse::new`]. Converting it into a plain [`Response`] keeps the
/// marker, visible through [`Response::is_exit`].
#[derive(Clone, Debug)]
pub struct ExitResponse(Response);

impl ExitResponse {
    pub fn new(status: StatusCode, reason: impl Into<String>) -> Self {
        Self(Response { exit: true, ..Response::new(status, reason) })
    }

    #[must_use]
    pub fn with_header(&self, name: &str, value: impl Into<String>) -> Self {
        Self(self.0.with_header(name, value))
    }

    #[must_use]
    pub fn with_added_header(&self, name: &str, value: impl Into<String>) -> Self {
        Self(self.0.with_added_header(name, value))
    }

    #[must_use]
    pub fn with_body(&self, body: impl Into<Bytes>) -> Self {
        Self(self.0.with_body(body))
    }

    pub fn into_response(self) -> Response {
        self.0
    }
}

impl Deref for ExitResponse {
    type Target = Response;

    fn deref(&self) -> &Response { &self.0 }
}

impl From<ExitResponse> for Response {
    fn from(exit: ExitResponse) -> Self { exit.into_response() }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into a [`Response`].
///
/// Core handlers return any `IntoResponse`. Implement it on your own types
/// to return them directly.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for ExitResponse {
    fn into_response(self) -> Response { ExitResponse::into_response(self) }
}

impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::new(self, "") }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}
