//! Static resource serving.
//!
//! # Responsibilities
//! - Answer conditional GETs (`If-Modified-Since`) with `304 Not Modified`
//! - Emit `Last-Modified` and `Expires` caching headers
//! - Pick the content type and transfer strategy (compressed or length-declared)
//! - Stream the bytes of an already-open resource
//!
//! # Design Decisions
//! - `If-Modified-Since` has second precision, so a resource up to 1000 ms
//!   newer than the header still counts as unmodified
//! - Unparseable conditional headers are ignored
//! - Text-like resources go through the compressed stream without a
//!   `Content-Length`; binary ones declare their length when known
//! - The resource stream is closed when the handle drops, on every path

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::time::{Duration, SystemTime};

use axum::http::header::{self, HeaderMap};
use axum::http::StatusCode;

use crate::http::response::StaplerResponse;
use crate::observability::metrics;
use crate::resources::store::OpenResource;

/// Extensions streamed through the compressed path regardless of MIME type.
pub const TEXT_FILES: &[&str] = &[
    "css", "js", "html", "txt", "java", "htm", "c", "cpp", "h", "rb", "pl", "py", "xml",
];

const COPY_BUFFER: usize = 1024;

/// Slack absorbing the second precision of HTTP dates.
const MODIFIED_SLACK: Duration = Duration::from_millis(1000);

const DEFAULT_MIME: &str = "application/octet-stream";

/// Streams located resources to the client with HTTP caching semantics.
#[derive(Debug, Clone, Default)]
pub struct StaticServer {
    default_encodings: HashMap<String, String>,
}

impl StaticServer {
    /// Create a server appending `charset` parameters per MIME type.
    pub fn new(default_encodings: HashMap<String, String>) -> Self {
        Self { default_encodings }
    }

    pub fn default_encodings(&self) -> &HashMap<String, String> {
        &self.default_encodings
    }

    /// Serve `resource`; returns `Ok(false)` when there is nothing to serve.
    ///
    /// `expiration_ms` is how long clients may cache the resource without
    /// revalidating; `<= 0` marks it as already expired.
    pub fn serve(
        &self,
        request_headers: &HeaderMap,
        rsp: &StaplerResponse,
        resource: Option<OpenResource>,
        expiration_ms: i64,
    ) -> io::Result<bool> {
        let Some(mut resource) = resource else {
            return Ok(false);
        };

        if let Some(last_modified) = resource.connection().last_modified {
            if not_modified_since(request_headers, last_modified) {
                tracing::debug!(url = %resource.url(), "Resource not modified");
                rsp.set_status(StatusCode::NOT_MODIFIED);
                metrics::record_static("not_modified");
                return Ok(true);
            }

            let last_modified_str = httpdate::fmt_http_date(last_modified);
            rsp.set_header(header::LAST_MODIFIED, &last_modified_str);
            if expiration_ms <= 0 {
                rsp.set_header(header::EXPIRES, &last_modified_str);
            } else {
                let lifetime = Duration::from_millis(expiration_ms.unsigned_abs());
                let expires = SystemTime::now() + lifetime;
                rsp.set_header(header::EXPIRES, httpdate::fmt_http_date(expires));
            }
        }

        let file_name = file_name(resource.url().path()).to_string();
        let mut mime_type = mime_guess::from_path(&file_name)
            .first_raw()
            .map(str::to_string)
            .or_else(|| resource.connection().content_type.clone())
            .unwrap_or_else(|| DEFAULT_MIME.to_string());
        if let Some(charset) = self.default_encodings.get(&mime_type) {
            mime_type = format!("{mime_type};charset={charset}");
        }
        rsp.set_content_type(&mime_type);

        let ext = file_name.rsplit('.').next().unwrap_or("");
        let mut out = if mime_type.starts_with("text/") || TEXT_FILES.contains(&ext) {
            rsp.compressed_output_stream(request_headers)
        } else {
            if let Some(length) = resource.connection().content_length {
                rsp.set_content_length(length);
            }
            rsp.output_stream()
        };

        let mut buf = [0u8; COPY_BUFFER];
        let stream = resource.stream();
        loop {
            let len = match stream.read(&mut buf) {
                Ok(0) => break,
                Ok(len) => len,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            out.write_all(&buf[..len])?;
        }
        out.close()?;

        tracing::debug!(url = %resource.url(), content_type = %mime_type, "Served static resource");
        metrics::record_static("served");
        Ok(true)
    }
}

/// Whether `If-Modified-Since` covers a resource modified at `last_modified`.
fn not_modified_since(request_headers: &HeaderMap, last_modified: SystemTime) -> bool {
    let Some(since) = request_headers
        .get(header::IF_MODIFIED_SINCE)
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    match httpdate::parse_http_date(since) {
        Ok(ims) => last_modified < ims + MODIFIED_SLACK,
        Err(_) => {
            tracing::trace!(since, "Ignoring unparseable If-Modified-Since");
            false
        }
    }
}

/// Last segment of `path`, accepting both `/` and `\` as separators.
fn file_name(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.rsplit('\\').next().unwrap_or(name)
}
