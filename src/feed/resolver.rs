//! Turns a configured URL into a fetchable feed document.
//!
//! When the configured URL serves an HTML page, the page is scanned line by
//! line for a feed link: first a `<link rel="alternate">` in the head, then an
//! `<a class="rss">` in the body. This is a best-effort scan, not an HTML
//! parser; tag and attribute names match in any case and attribute values may
//! use either quote style.

use tracing::{debug, info};

use crate::cancel::CancelToken;
use crate::error::{AppError, Result};

use super::fetcher::{Document, Transport};
use super::parser::feed_title;

const FEED_TYPES: [&str; 2] = ["application/rss+xml", "application/atom+xml"];

/// A feed offered by a page, as listed by [`FeedResolver::discover`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedCandidate {
    pub url: String,
    pub title: Option<String>,
    /// Declared type, e.g. `application/rss+xml`; unknown for direct feeds.
    pub media_type: Option<String>,
}

/// Outcome of resolving a feed URL.
#[derive(Debug)]
pub struct Resolution {
    /// The document to hand to the parser.
    pub document: Document,
    /// Set when the feed lives at a different URL than the one configured.
    pub corrected_url: Option<String>,
}

pub struct FeedResolver<'a, T> {
    transport: &'a T,
}

impl<'a, T: Transport> FeedResolver<'a, T> {
    pub fn new(transport: &'a T) -> Self {
        Self { transport }
    }

    /// Fetch `url`, following at most one discovered feed link.
    ///
    /// If the URL serves HTML with no usable feed link, the page itself is
    /// returned and the parser decides.
    pub async fn resolve(&self, url: &str, cancel: &CancelToken) -> Result<Resolution> {
        cancel.check()?;
        let document = self.transport.open(url).await?;
        cancel.check()?;

        if !document.is_html() {
            return Ok(Resolution {
                document,
                corrected_url: None,
            });
        }

        match discover_feed_link(&document.text(), url) {
            Some(link) => {
                info!("{} is an HTML page, following feed link {}", url, link);
                let document = self.transport.open(&link).await?;
                cancel.check()?;
                Ok(Resolution {
                    document,
                    corrected_url: Some(link),
                })
            }
            None => {
                debug!("no feed link found in {}", url);
                // Hand over the page already fetched; `url` is not opened again.
                Ok(Resolution {
                    document,
                    corrected_url: None,
                })
            }
        }
    }

    /// List the feeds available at `url`.
    ///
    /// An HTML page yields its alternate RSS/Atom links. A URL serving a feed
    /// yields itself. Anything else is a resolution error.
    pub async fn discover(&self, url: &str) -> Result<Vec<FeedCandidate>> {
        let document = self.transport.open(url).await?;

        if document.is_html() {
            let candidates = feed_candidates(&document.text(), url);
            if !candidates.is_empty() {
                return Ok(candidates);
            }
        }

        match feed_title(&document) {
            Ok(title) => Ok(vec![FeedCandidate {
                url: url.to_string(),
                title,
                media_type: None,
            }]),
            Err(e) => {
                debug!("{} is not a feed: {}", url, e);
                Err(AppError::Resolution(format!("no feed found at {}", url)))
            }
        }
    }
}

/// Scan an HTML page for a feed URL, resolved against `base_url`.
///
/// Links resolving to `base_url` itself are skipped so a page pointing at
/// itself never causes a refetch loop.
pub fn discover_feed_link(html: &str, base_url: &str) -> Option<String> {
    let mut lines = html.lines();
    let mut body_start = None;

    for line in lines.by_ref() {
        let lower = line.to_ascii_lowercase();
        let head = match lower.find("<body") {
            Some(pos) => {
                body_start = Some(&line[pos..]);
                &line[..pos]
            }
            None => line,
        };

        let found = tags(head, "link")
            .filter(|tag| attr_value(tag, "rel").is_some_and(|rel| rel.eq_ignore_ascii_case("alternate")))
            .find_map(|tag| candidate(tag, base_url));
        if found.is_some() {
            return found;
        }

        if body_start.is_some() {
            break;
        }
    }

    let body_start = body_start?;
    std::iter::once(body_start)
        .chain(lines)
        .flat_map(|line| tags(line, "a"))
        .filter(|tag| {
            attr_value(tag, "class").is_some_and(|class| {
                class
                    .split_ascii_whitespace()
                    .any(|c| c.eq_ignore_ascii_case("rss"))
            })
        })
        .find_map(|tag| candidate(tag, base_url))
}

/// Every alternate RSS/Atom `<link>` in the head of an HTML page.
pub fn feed_candidates(html: &str, base_url: &str) -> Vec<FeedCandidate> {
    let mut found = Vec::new();

    for line in html.lines() {
        let head = match line.to_ascii_lowercase().find("<body") {
            Some(pos) => &line[..pos],
            None => line,
        };

        for tag in tags(head, "link") {
            if !attr_value(tag, "rel").is_some_and(|rel| rel.eq_ignore_ascii_case("alternate")) {
                continue;
            }
            let Some(media_type) = attr_value(tag, "type")
                .filter(|t| FEED_TYPES.iter().any(|f| t.eq_ignore_ascii_case(f)))
            else {
                continue;
            };
            let Some(href) = attr_value(tag, "href").filter(|h| !h.is_empty()) else {
                continue;
            };

            let url = resolve_href(&html_escape::decode_html_entities(href), base_url);
            if found.iter().any(|c: &FeedCandidate| c.url == url) {
                continue;
            }
            found.push(FeedCandidate {
                url,
                title: attr_value(tag, "title")
                    .map(|t| html_escape::decode_html_entities(t.trim()).into_owned())
                    .filter(|t| !t.is_empty()),
                media_type: Some(media_type.to_ascii_lowercase()),
            });
        }

        if head.len() < line.len() {
            break;
        }
    }

    found
}

fn candidate(tag: &str, base_url: &str) -> Option<String> {
    let href = attr_value(tag, "href")?;
    if href.is_empty() {
        return None;
    }
    let link = resolve_href(&href.replace("&amp;", "&"), base_url);
    (link != base_url).then_some(link)
}

/// Resolve an href the way the scan expects.
///
/// Absolute URLs pass through, root-relative paths are prefixed with the
/// origin of `base_url`, and anything else is appended to `base_url`.
pub fn resolve_href(href: &str, base_url: &str) -> String {
    let lower = href.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return href.to_string();
    }

    let base = url::Url::parse(base_url).ok();

    if let Some(rest) = href.strip_prefix("//") {
        let scheme = base.as_ref().map(|u| u.scheme()).unwrap_or("http");
        return format!("{}://{}", scheme, rest);
    }

    if href.starts_with('/') {
        let origin = base
            .map(|u| u.origin())
            .filter(|o| o.is_tuple())
            .map(|o| o.ascii_serialization())
            .unwrap_or_else(|| base_url.trim_end_matches('/').to_string());
        return format!("{}{}", origin, href);
    }

    format!("{}/{}", base_url.trim_end_matches('/'), href)
}

/// Iterate over the `<name ...>` tags in `line`, each sliced up to its `>`
/// (or the end of the line).
fn tags<'a>(line: &'a str, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    let lower = line.to_ascii_lowercase();
    let open = format!("<{}", name);
    let mut from = 0;

    std::iter::from_fn(move || loop {
        let pos = from + lower[from..].find(&open)?;
        let after = pos + open.len();
        from = after;

        // `<link` must not match `<linkage`, `<a` must not match `<abbr`
        if !lower[after..].starts_with(|c: char| c.is_ascii_whitespace()) {
            continue;
        }

        let end = lower[after..].find('>').map(|i| after + i).unwrap_or(line.len());
        return Some(&line[pos..end]);
    })
}

/// Value of attribute `name` inside `tag`, quoted with `"` or `'`, or bare.
fn attr_value<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let lower = tag.to_ascii_lowercase();
    let needle = format!("{}=", name);
    let mut from = 0;

    while let Some(offset) = lower[from..].find(&needle) {
        let pos = from + offset;
        from = pos + needle.len();

        let preceded_by_space = lower[..pos].ends_with(|c: char| c.is_ascii_whitespace());
        if !preceded_by_space {
            continue;
        }

        let value = &tag[from..];
        return match value.chars().next() {
            Some(quote @ ('"' | '\'')) => {
                let inner = &value[1..];
                inner.find(quote).map(|end| &inner[..end])
            }
            Some(_) => {
                let end = value
                    .find(|c: char| c.is_ascii_whitespace() || c == '>')
                    .unwrap_or(value.len());
                Some(value[..end].trim_end_matches('/'))
            }
            None => None,
        };
    }

    None
}
