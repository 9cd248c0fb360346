use serde::{Deserialize, Serialize};

/// Top-level HAR object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Har {
    pub log: Log,
}

/// Main HAR log object
///
/// Only the parts the measurement engine reads are modelled; unknown fields
/// (pages, cookies, timings...) are ignored on input.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Log {
    pub version: String,
    #[serde(default)]
    pub creator: Creator,
    pub entries: Vec<Entry>,
}

/// Creator information
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Creator {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
}

/// One request/response record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    #[serde(rename = "startedDateTime", default)]
    pub started_date_time: String,
    pub request: Request,
    pub response: Response,
}

/// HTTP request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: Vec<Header>,
}

/// HTTP response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub status: i64,
    #[serde(default)]
    pub headers: Vec<Header>,
    #[serde(default)]
    pub content: Content,
    #[serde(rename = "headersSize", default = "unknown_size")]
    pub headers_size: i64,
    #[serde(rename = "bodySize", default = "unknown_size")]
    pub body_size: i64,
    /// Chrome extension: bytes on the wire, headers included
    #[serde(
        rename = "_transferSize",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub transfer_size: Option<i64>,
}

/// HTTP header
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// Response content
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Content {
    /// Decoded body size
    #[serde(default)]
    pub size: i64,
    #[serde(rename = "mimeType", default)]
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
}

fn unknown_size() -> i64 {
    -1
}

impl Response {
    /// First header value with the given name (case-insensitive)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// Content type from the `Content-Type` header, falling back to the HAR mime type
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
            .or(Some(self.content.mime_type.as_str()))
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
    }

    /// Bytes transferred for this response
    ///
    /// Uses `_transferSize` when the browser recorded it, otherwise the sum of
    /// the known header and body sizes.
    pub fn transferred_size(&self) -> u64 {
        match self.transfer_size {
            Some(size) if size >= 0 => size as u64,
            _ => (self.headers_size.max(0) as u64).saturating_add(self.body_size.max(0) as u64),
        }
    }

    /// Size of the encoded body, if it can be determined
    pub fn encoded_body_size(&self) -> Option<u64> {
        if self.body_size >= 0 {
            return Some(self.body_size as u64);
        }
        self.transfer_size
            .filter(|size| *size >= 0)
            .map(|size| (size - self.headers_size.max(0)).max(0) as u64)
    }

    /// Decoded body size
    pub fn uncompressed_size(&self) -> u64 {
        self.content.size.max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(headers: &[(&str, &str)]) -> Response {
        Response {
            status: 200,
            headers: headers
                .iter()
                .map(|(n, v)| Header {
                    name: n.to_string(),
                    value: v.to_string(),
                })
                .collect(),
            content: Content {
                size: 1000,
                mime_type: "text/html".to_string(),
                text: None,
                encoding: None,
            },
            headers_size: 200,
            body_size: 400,
            transfer_size: None,
        }
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let resp = response(&[("ETag", "\"abc\"")]);
        assert_eq!(resp.header("etag"), Some("\"abc\""));
        assert_eq!(resp.header("expires"), None);
    }

    #[test]
    fn test_content_type_falls_back_to_mime_type() {
        let resp = response(&[]);
        assert_eq!(resp.content_type(), Some("text/html"));

        let resp = response(&[("Content-Type", "text/css; charset=utf-8")]);
        assert_eq!(resp.content_type(), Some("text/css; charset=utf-8"));
    }

    #[test]
    fn test_transferred_size_prefers_transfer_size() {
        let mut resp = response(&[]);
        assert_eq!(resp.transferred_size(), 600);

        resp.transfer_size = Some(750);
        assert_eq!(resp.transferred_size(), 750);
    }

    #[test]
    fn test_encoded_body_size_from_transfer_size() {
        let mut resp = response(&[]);
        resp.body_size = -1;
        resp.transfer_size = Some(700);
        assert_eq!(resp.encoded_body_size(), Some(500));

        resp.transfer_size = None;
        assert_eq!(resp.encoded_body_size(), None);
    }

    #[test]
    fn test_minimal_entry_deserializes() {
        let json = r#"{
            "request": {"url": "https://example.com/app.js"},
            "response": {"content": {"size": 10, "mimeType": "application/javascript"}}
        }"#;

        let entry: Entry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.request.url, "https://example.com/app.js");
        assert_eq!(entry.response.headers_size, -1);
        assert_eq!(entry.response.uncompressed_size(), 10);
    }
}
