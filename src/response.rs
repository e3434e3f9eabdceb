//! HTTP-shaped responses and conditional-request handling.
//!
//! The dispenser has no HTTP server of its own; it hands the embedding layer
//! a status code, body bytes, and a header list. Revalidation follows the
//! usual pair of validators: an entity tag (content hash of the cache file)
//! and a second-granularity last-modified timestamp.

use chrono::{DateTime, Utc};

/// Marker header set on lenient-fallback passthrough responses.
pub const FALLBACK_HEADER: &str = "X-Guided-Image-Fallback";

/// Status, body, and headers for the embedding HTTP layer to emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageResponse {
    pub status: u16,
    pub body: Vec<u8>,
    pub headers: Vec<(String, String)>,
}

impl ImageResponse {
    pub fn not_found() -> Self {
        Self {
            status: 404,
            body: Vec::new(),
            headers: Vec::new(),
        }
    }

    pub fn not_modified(etag: &str) -> Self {
        Self {
            status: 304,
            body: Vec::new(),
            headers: vec![("ETag".to_string(), etag.to_string())],
        }
    }

    /// First header value matching `name`, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Revalidation headers from the incoming request, raw.
#[derive(Debug, Clone, Default)]
pub struct Validators {
    pub if_none_match: Option<String>,
    pub if_modified_since: Option<String>,
}

impl Validators {
    pub fn none() -> Self {
        Self::default()
    }
}

/// Operator-configured response shaping.
#[derive(Debug, Clone)]
pub struct ResponsePolicy {
    /// Client-side cache lifetime in days, emitted as `max-age` seconds.
    pub cache_days: u32,
    pub additional_headers: Vec<(String, String)>,
}

/// What the cache entry looks like right now, read back from the store.
#[derive(Debug, Clone)]
pub struct EntryFacts<'a> {
    /// Basename for `Content-Disposition`.
    pub filename: &'a str,
    pub media_type: &'a str,
    /// Content hash of the file on disk.
    pub etag: &'a str,
    pub last_modified: DateTime<Utc>,
}

/// IMF-fixdate formatting (`Tue, 15 Nov 1994 08:12:31 GMT`).
pub fn format_http_date(t: DateTime<Utc>) -> String {
    t.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Parse an HTTP date header. RFC 2822 parsing covers the fixdate form,
/// including the literal `GMT` zone.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

/// Decide between `304 Not Modified` and a full `200` for a cache entry.
///
/// A request revalidates when its `If-None-Match` equals the entry's hash,
/// or its `If-Modified-Since` equals the entry's mtime at second
/// granularity. Either match short-circuits to a bodyless 304; only the
/// entity tag is echoed back.
pub fn conditional_response(
    facts: &EntryFacts,
    body: Vec<u8>,
    validators: &Validators,
    policy: &ResponsePolicy,
) -> ImageResponse {
    let hash_match = validators.if_none_match.as_deref() == Some(facts.etag);
    let time_match = validators
        .if_modified_since
        .as_deref()
        .and_then(parse_http_date)
        .is_some_and(|since| since.timestamp() == facts.last_modified.timestamp());

    if hash_match || time_match {
        return ImageResponse::not_modified(facts.etag);
    }

    let max_age = u64::from(policy.cache_days) * 86_400;
    let mut headers = vec![
        ("Content-Type".to_string(), facts.media_type.to_string()),
        (
            "Content-Disposition".to_string(),
            format!("inline; filename={}", facts.filename),
        ),
        (
            "Last-Modified".to_string(),
            format_http_date(facts.last_modified),
        ),
        ("ETag".to_string(), facts.etag.to_string()),
        (
            "Cache-Control".to_string(),
            format!("public, max-age={max_age}"),
        ),
    ];
    headers.extend(policy.additional_headers.iter().cloned());

    ImageResponse {
        status: 200,
        body,
        headers,
    }
}
