//! Transport-neutral request and response types.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// An incoming request, already parsed by the HTTP listener.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpRequest {
    /// Request method, upper case.
    pub method: String,
    /// Path without the query string, still percent-encoded.
    pub path: String,
    /// Query string without the leading `?`.
    pub query: String,
    /// Headers keyed by lower-case name.
    pub headers: BTreeMap<String, String>,
}

impl HttpRequest {
    /// Creates a GET request from a path that may carry a query string.
    pub fn get(url: &str) -> Self {
        let (path, query) = url.split_once('?').unwrap_or((url, ""));
        Self {
            method: "GET".into(),
            path: path.to_string(),
            query: query.to_string(),
            headers: BTreeMap::new(),
        }
    }

    /// Adds a header.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Looks up a header, ignoring the case of its name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// Body of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseBody {
    /// Encoded JSON.
    Json(Vec<u8>),
    /// Plain text, used for error messages.
    Text(String),
    /// A file the listener should stream from disk.
    File {
        /// Absolute path of the file.
        path: PathBuf,
        /// File length, sent as `Content-Length`.
        len: u64,
    },
}

/// A response ready to be written by the HTTP listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code.
    pub status: u16,
    /// `Content-Type` header value.
    pub content_type: String,
    /// Response body.
    pub body: ResponseBody,
}

impl HttpResponse {
    /// A 200 response with a JSON body.
    pub fn json(bytes: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: "application/json".into(),
            body: ResponseBody::Json(bytes),
        }
    }

    /// A 200 response streaming a file.
    pub fn file(path: PathBuf, len: u64, content_type: &str) -> Self {
        Self {
            status: 200,
            content_type: content_type.into(),
            body: ResponseBody::File { path, len },
        }
    }

    /// An error response with a plain-text message.
    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain".into(),
            body: ResponseBody::Text(message.into()),
        }
    }

    /// Returns true for 2xx responses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Value of the `Content-Length` header.
    pub fn content_length(&self) -> u64 {
        match &self.body {
            ResponseBody::Json(bytes) => bytes.len() as u64,
            ResponseBody::Text(text) => text.len() as u64,
            ResponseBody::File { len, .. } => *len,
        }
    }
}

/// Picks a `Content-Type` from a file extension. Unknown types are `text/plain`.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "json" | "jsonc" => "application/json",
        "dll" | "exe" | "bin" | "bundle" => "application/octet-stream",
        "zip" => "application/zip",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" => "text/javascript",
        "svg" => "image/svg+xml",
        _ => "text/plain",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_parsing() {
        let req = HttpRequest::get("/modsync/hashes?path=a&path=b").with_header("ModSync-Version", "0.9.0");
        assert_eq!(req.method, "GET");
        assert_eq!(req.path, "/modsync/hashes");
        assert_eq!(req.query, "path=a&path=b");
        assert_eq!(req.header("modsync-version"), Some("0.9.0"));
        assert_eq!(req.header("MODSYNC-VERSION"), Some("0.9.0"));
        assert_eq!(req.header("other"), None);
    }

    #[test]
    fn content_types() {
        assert_eq!(content_type_for(Path::new("a/SAIN.DLL")), "application/octet-stream");
        assert_eq!(content_type_for(Path::new("config.json")), "application/json");
        assert_eq!(content_type_for(Path::new("README")), "text/plain");
    }

    #[test]
    fn response_lengths() {
        assert_eq!(HttpResponse::json(b"[]".to_vec()).content_length(), 2);
        let err = HttpResponse::error(404, "nope");
        assert!(!err.is_success());
        assert_eq!(err.content_length(), 4);
        let file = HttpResponse::file(PathBuf::from("/x"), 1234, "text/plain");
        assert!(file.is_success());
        assert_eq!(file.content_length(), 1234);
    }
}
