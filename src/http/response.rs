//! Response handling.
//!
//! # Responsibilities
//! - Accumulate status, headers and body written during dispatch
//! - Offer a plain and a compression-capable output stream
//! - Convert the finished response into an axum `Response`
//!
//! # Design Decisions
//! - Cheap to clone: clones share one underlying response, so the
//!   request-scoped context can hand out the same response
//! - The compressed stream gzips only when the client accepts it
//! - A declared `Content-Length` that disagrees with the body is dropped

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::body::Body;
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use flate2::write::GzEncoder;
use flate2::Compression;

#[derive(Debug)]
struct ResponseState {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    committed: bool,
}

impl Default for ResponseState {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
            committed: false,
        }
    }
}

/// Response under construction for one request.
#[derive(Debug, Clone, Default)]
pub struct StaplerResponse {
    inner: Arc<Mutex<ResponseState>>,
}

impl StaplerResponse {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, ResponseState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn status(&self) -> StatusCode {
        self.state().status
    }

    pub fn set_status(&self, status: StatusCode) {
        let mut state = self.state();
        state.status = status;
        state.committed = true;
    }

    /// Whether a status, body or error has been written.
    pub fn is_committed(&self) -> bool {
        self.state().committed
    }

    /// Set a header, replacing previous values. Invalid values are logged and dropped.
    pub fn set_header(&self, name: HeaderName, value: impl AsRef<str>) {
        match HeaderValue::from_str(value.as_ref()) {
            Ok(value) => {
                self.state().headers.insert(name, value);
            }
            Err(_) => {
                tracing::warn!(
                    header = %name,
                    value = value.as_ref(),
                    "Dropping invalid header value"
                );
            }
        }
    }

    pub fn header(&self, name: &HeaderName) -> Option<String> {
        self.state()
            .headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    pub fn set_content_type(&self, content_type: &str) {
        self.set_header(header::CONTENT_TYPE, content_type);
    }

    pub fn set_content_length(&self, length: u64) {
        self.set_header(header::CONTENT_LENGTH, length.to_string());
    }

    /// Respond with `status` and its canonical reason as a text body.
    pub fn send_error(&self, status: StatusCode) {
        let mut state = self.state();
        state.status = status;
        state.headers.remove(header::CONTENT_LENGTH);
        state.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        state.body = status.canonical_reason().unwrap_or("").as_bytes().to_vec();
        state.committed = true;
    }

    /// Redirect with `302 Found` to `location`.
    pub fn send_redirect(&self, location: &str) {
        self.set_header(header::LOCATION, location);
        let mut state = self.state();
        state.status = StatusCode::FOUND;
        state.body.clear();
        state.committed = true;
    }

    /// Write a complete text body with the given content type.
    pub fn send_text(&self, content_type: &str, text: &str) {
        self.set_content_type(content_type);
        let mut state = self.state();
        state.body = text.as_bytes().to_vec();
        state.committed = true;
    }

    /// Uncompressed output stream.
    pub fn output_stream(&self) -> BodyWriter {
        self.state().committed = true;
        BodyWriter::Plain(PlainWriter {
            response: self.clone(),
        })
    }

    /// Output stream that gzips when `request_headers` accept it.
    ///
    /// No `Content-Length` should be declared for this stream.
    pub fn compressed_output_stream(&self, request_headers: &HeaderMap) -> BodyWriter {
        if !accepts_gzip(request_headers) {
            return self.output_stream();
        }
        {
            let mut state = self.state();
            state.headers.remove(header::CONTENT_LENGTH);
            state
                .headers
                .insert(header::CONTENT_ENCODING, HeaderValue::from_static("gzip"));
            state
                .headers
                .append(header::VARY, HeaderValue::from_static("Accept-Encoding"));
        }
        let plain = PlainWriter {
            response: self.clone(),
        };
        BodyWriter::Gzip(GzEncoder::new(plain, Compression::default()))
    }

    /// Copy of the body written so far.
    pub fn body(&self) -> Vec<u8> {
        self.state().body.clone()
    }

    fn take(&self) -> ResponseState {
        std::mem::take(&mut *self.state())
    }
}

impl IntoResponse for StaplerResponse {
    fn into_response(self) -> Response {
        let mut state = self.take();
        let declared = state
            .headers
            .get(header::CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok());
        if declared.is_some_and(|len| len != state.body.len()) {
            tracing::debug!(
                declared = ?declared,
                actual = state.body.len(),
                "Content-Length does not match body, dropping it"
            );
            state.headers.remove(header::CONTENT_LENGTH);
        }

        let mut response = Response::new(Body::from(state.body));
        *response.status_mut() = state.status;
        *response.headers_mut() = state.headers;
        response
    }
}

/// Whether `Accept-Encoding` admits gzip.
pub fn accepts_gzip(headers: &HeaderMap) -> bool {
    headers
        .get_all(header::ACCEPT_ENCODING)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .any(|coding| {
            let mut params = coding.split(';');
            let name = params.next().unwrap_or("").trim();
            let rejected = params
                .filter_map(|p| p.trim().strip_prefix("q="))
                .any(|q| q.trim().parse::<f32>().map(|q| q <= 0.0).unwrap_or(false));
            (name.eq_ignore_ascii_case("gzip") || name == "*") && !rejected
        })
}

/// Appends to the response body.
#[derive(Debug)]
pub struct PlainWriter {
    response: StaplerResponse,
}

impl Write for PlainWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.response.state().body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Destination stream for a response body.
pub enum BodyWriter {
    Plain(PlainWriter),
    Gzip(GzEncoder<PlainWriter>),
}

impl BodyWriter {
    /// Flush everything, writing the gzip trailer if compressing.
    pub fn close(self) -> io::Result<()> {
        match self {
            BodyWriter::Plain(mut w) => w.flush(),
            BodyWriter::Gzip(encoder) => encoder.finish().map(drop),
        }
    }
}

impl Write for BodyWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            BodyWriter::Plain(w) => w.write(buf),
            BodyWriter::Gzip(w) => w.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            BodyWriter::Plain(w) => w.flush(),
            BodyWriter::Gzip(w) => w.flush(),
        }
    }
}
