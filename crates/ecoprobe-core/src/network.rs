//! Classification of network records and the per-run network summary.

use crate::har::{Entry, Response};
use chrono::{DateTime, FixedOffset, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;
use url::Url;

lazy_static! {
    static ref UNCACHEABLE_DIRECTIVE: Regex =
        Regex::new(r"(?i)(no-cache|no-store|max-age\s*=\s*0+(\s|,|$))").unwrap();
}

/// Content-type fragments of long-lived resources
const STATIC_CONTENT_TYPES: &[&str] = &[
    "image/",
    "font/",
    "video/",
    "audio/",
    "javascript",
    "ecmascript",
    "css",
    "woff",
    "truetype",
    "opentype",
];

const STATIC_EXTENSIONS: &[&str] = &[
    "js", "mjs", "css", "png", "jpg", "jpeg", "gif", "webp", "avif", "svg", "ico", "bmp", "woff",
    "woff2", "ttf", "otf", "eot", "mp4", "webm", "mp3", "ogg",
];

/// Content-type fragments that benefit from transport compression
const COMPRESSIBLE_CONTENT_TYPES: &[&str] = &[
    "javascript",
    "ecmascript",
    "json",
    "xml",
    "svg",
    "x-font-ttf",
    "font/ttf",
    "font/otf",
    "vnd.ms-fontobject",
];

const COMPRESSION_ENCODINGS: &[&str] = &["gzip", "br", "deflate", "compress", "zstd"];

/// An encoded body below this share of the decoded size counts as compressed
const COMPRESSED_SIZE_RATIO: f64 = 0.9;

/// How a single record is counted
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceClass {
    pub is_static: bool,
    pub has_cache_headers: bool,
    pub has_etag: bool,
    pub is_compressible: bool,
    pub is_compressed: bool,
}

impl ResourceClass {
    pub fn of(entry: &Entry) -> Self {
        let response = &entry.response;
        let is_static = is_static_resource(entry);
        let is_compressible = is_compressible_resource(response);

        Self {
            is_static,
            has_cache_headers: is_static && has_valid_cache_headers(response),
            has_etag: is_static && response.header("etag").is_some(),
            is_compressible,
            is_compressed: is_compressible && is_compressed(response),
        }
    }
}

/// Aggregate of one network snapshot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NetworkSummary {
    pub request_count: u64,
    pub responses_size: u64,
    pub responses_size_uncompressed: u64,
    pub domains: BTreeSet<String>,
    pub static_resources: u64,
    pub static_with_cache_headers: u64,
    pub static_with_etags: u64,
    pub compressible_resources: u64,
    pub compressible_compressed: u64,
}

impl NetworkSummary {
    pub fn from_entries(entries: &[Entry]) -> Self {
        let mut summary = Self {
            request_count: entries.len() as u64,
            ..Default::default()
        };

        for entry in entries {
            let url = entry.request.url.as_str();
            summary.responses_size = summary
                .responses_size
                .saturating_add(entry.response.transferred_size());
            summary.responses_size_uncompressed = summary
                .responses_size_uncompressed
                .saturating_add(entry.response.uncompressed_size());

            let class = ResourceClass::of(entry);
            if class.is_static {
                summary.static_resources += 1;
                if class.has_cache_headers {
                    summary.static_with_cache_headers += 1;
                }
                if class.has_etag {
                    summary.static_with_etags += 1;
                }
                tracing::debug!(
                    "{} is static (cached: {}, etag: {})",
                    url,
                    class.has_cache_headers,
                    class.has_etag
                );
            }
            if class.is_compressible {
                summary.compressible_resources += 1;
                if class.is_compressed {
                    summary.compressible_compressed += 1;
                }
                tracing::debug!("{} is compressible (compressed: {})", url, class.is_compressed);
            }

            match domain_of(url) {
                Some(domain) => {
                    if summary.domains.insert(domain) {
                        tracing::debug!("New domain from {}", url);
                    }
                }
                None => tracing::debug!("No host in {}", url),
            }
        }

        summary
    }
}

/// Host part of a URL, lowercased
pub fn domain_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(str::to_lowercase))
}

pub fn is_static_resource(entry: &Entry) -> bool {
    let status = entry.response.status;
    if !(200..300).contains(&status) && status != 304 {
        return false;
    }

    if let Some(content_type) = entry.response.content_type() {
        let content_type = content_type.to_lowercase();
        if STATIC_CONTENT_TYPES.iter().any(|ct| content_type.contains(ct)) {
            return true;
        }
    }

    url_extension(&entry.request.url)
        .is_some_and(|ext| STATIC_EXTENSIONS.contains(&ext.as_str()))
}

fn url_extension(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let last_segment = parsed.path_segments()?.next_back()?;
    let (_, ext) = last_segment.rsplit_once('.')?;
    Some(ext.to_lowercase())
}

/// `Cache-Control` allowing reuse, or an `Expires` in the future of the response date
pub fn has_valid_cache_headers(response: &Response) -> bool {
    if let Some(cache_control) = response.header("cache-control")
        && !UNCACHEABLE_DIRECTIVE.is_match(cache_control)
    {
        return true;
    }

    let Some(expires) = response.header("expires").and_then(parse_http_date) else {
        return false;
    };
    let reference = response
        .header("date")
        .and_then(parse_http_date)
        .map(|date| date.with_timezone(&Utc))
        .unwrap_or_else(Utc::now);

    expires.with_timezone(&Utc) > reference
}

fn parse_http_date(value: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc2822(value.trim()).ok()
}

pub fn is_compressible_resource(response: &Response) -> bool {
    let Some(content_type) = response.content_type() else {
        return false;
    };

    match content_type.parse::<mime::Mime>() {
        Ok(parsed) if parsed.type_() == mime::TEXT => true,
        Ok(parsed) => {
            let essence = parsed.essence_str().to_lowercase();
            COMPRESSIBLE_CONTENT_TYPES
                .iter()
                .any(|ct| essence.contains(ct))
        }
        Err(_) => {
            let content_type = content_type.to_lowercase();
            content_type.starts_with("text/")
                || COMPRESSIBLE_CONTENT_TYPES
                    .iter()
                    .any(|ct| content_type.contains(ct))
        }
    }
}

/// Explicit `Content-Encoding`, or an encoded body clearly smaller than the content.
/// A response that transferred no body (`304`, cache hit) is never compressed by size.
pub fn is_compressed(response: &Response) -> bool {
    if let Some(encoding) = response.header("content-encoding") {
        let encoding = encoding.to_lowercase();
        if COMPRESSION_ENCODINGS
            .iter()
            .any(|known| encoding.split(',').any(|part| part.trim() == *known))
        {
            return true;
        }
    }

    if response.status == 304 {
        return false;
    }

    let decoded = response.uncompressed_size();
    match response.encoded_body_size() {
        Some(encoded) if encoded > 0 && decoded > 0 => {
            (encoded as f64) < decoded as f64 * COMPRESSED_SIZE_RATIO
        }
        _ => false,
    }
}
