use std::future::Future;

use encoding_rs::{Encoding, UTF_8};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_CHARSET, ACCEPT_ENCODING, CONTENT_TYPE};
use reqwest::Client;
use tracing::debug;

use crate::error::{AppError, Result};

/// Some feed servers refuse requests from agents they don't recognize.
const USER_AGENT_STRING: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/102.0.5005.61 Safari/537.36";

const DEFAULT_CHARSET: &str = "UTF-8";

/// A fetched HTTP response body together with the headers the pipeline needs.
#[derive(Debug, Clone)]
pub struct Document {
    pub url: String,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl Document {
    pub fn new(url: impl Into<String>, content_type: Option<&str>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            content_type: content_type.map(str::to_string),
            body: body.into(),
        }
    }

    /// Whether the server labelled this as an HTML page rather than a feed.
    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .map(|ct| {
                let ct = ct.trim_start().to_ascii_lowercase();
                ct.starts_with("text/html") || ct.starts_with("application/xhtml+xml")
            })
            .unwrap_or(false)
    }

    /// The `charset=` parameter of the content type, UTF-8 when absent.
    pub fn charset(&self) -> &str {
        self.content_type
            .as_deref()
            .and_then(charset_from_content_type)
            .unwrap_or(DEFAULT_CHARSET)
    }

    /// The body decoded with [`Document::charset`]; unknown labels fall back to UTF-8.
    pub fn text(&self) -> String {
        let encoding = Encoding::for_label(self.charset().as_bytes()).unwrap_or(UTF_8);
        let (text, _, had_errors) = encoding.decode(&self.body);
        if had_errors {
            debug!("{}: malformed {} sequences replaced", self.url, encoding.name());
        }
        text.into_owned()
    }
}

fn charset_from_content_type(content_type: &str) -> Option<&str> {
    content_type.split(';').map(str::trim).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        if name.trim().eq_ignore_ascii_case("charset") {
            let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
            (!value.is_empty()).then_some(value)
        } else {
            None
        }
    })
}

/// Opens a URL and returns its body.
///
/// Implemented over HTTP by [`FeedFetcher`]; tests substitute canned documents.
pub trait Transport: Send + Sync {
    fn open(&self, url: &str) -> impl Future<Output = Result<Document>> + Send;
}

pub struct FeedFetcher {
    client: Client,
}

impl FeedFetcher {
    pub fn new() -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip,deflate"));
        headers.insert(ACCEPT_CHARSET, HeaderValue::from_static("utf-8,*"));

        // No explicit timeouts: the connection defaults apply.
        let client = Client::builder()
            .user_agent(USER_AGENT_STRING)
            .default_headers(headers)
            .gzip(true)
            .deflate(true)
            .build()
            .map_err(|e| AppError::Network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl Transport for FeedFetcher {
    async fn open(&self, url: &str) -> Result<Document> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(AppError::Network(format!(
                "failed to fetch {}: HTTP {}",
                url,
                response.status()
            )));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response.bytes().await?;
        debug!("fetched {} bytes from {}", bytes.len(), url);

        Ok(Document {
            url: url.to_string(),
            content_type,
            body: bytes.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_charset_from_content_type() {
        assert_eq!(
            charset_from_content_type("text/xml; charset=ISO-8859-1"),
            Some("ISO-8859-1")
        );
        assert_eq!(
            charset_from_content_type("text/html;CHARSET=\"windows-1251\""),
            Some("windows-1251")
        );
        assert_eq!(charset_from_content_type("application/rss+xml"), None);
        assert_eq!(charset_from_content_type("text/html; charset="), None);
    }

    #[test]
    fn test_charset_defaults_to_utf8() {
        let doc = Document::new("http://example.com", None, Vec::new());
        assert_eq!(doc.charset(), "UTF-8");
        let doc = Document::new("http://example.com", Some("text/xml"), Vec::new());
        assert_eq!(doc.charset(), "UTF-8");
    }

    #[test]
    fn test_is_html() {
        let html = Document::new("u", Some("text/html; charset=utf-8"), Vec::new());
        assert!(html.is_html());
        let upper = Document::new("u", Some("TEXT/HTML"), Vec::new());
        assert!(upper.is_html());
        let rss = Document::new("u", Some("application/rss+xml"), Vec::new());
        assert!(!rss.is_html());
        let unknown = Document::new("u", None, Vec::new());
        assert!(!unknown.is_html());
    }

    #[test]
    fn test_text_decodes_declared_charset() {
        let doc = Document::new("u", Some("text/plain; charset=ISO-8859-1"), vec![0x63, 0x61, 0x66, 0xe9]);
        assert_eq!(doc.text(), "café");

        let doc = Document::new("u", Some("text/plain; charset=bogus"), "café".as_bytes());
        assert_eq!(doc.text(), "café");
    }
}
