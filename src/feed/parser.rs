use std::borrow::Cow;
use std::sync::LazyLock;

use feed_rs::model::{Entry, Feed};
use feed_rs::parser::{self, Parser};
use regex::Regex;

use crate::error::Result;

use super::fetcher::Document;

/// A link attached to a syndication entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawLink {
    pub href: String,
    /// Link type (`type` attribute), e.g. `text/html` or `guid`.
    pub media_type: Option<String>,
}

impl RawLink {
    pub fn new(href: &str, media_type: Option<&str>) -> Self {
        Self {
            href: href.to_string(),
            media_type: media_type.map(str::to_string),
        }
    }
}

/// One entry as delivered by the syndication parser, before reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawEntry {
    /// Unique resource identifier, when the feed supplied one.
    pub uri: Option<String>,
    pub title: Option<String>,
    pub author: Option<String>,
    /// Milliseconds since the epoch.
    pub published_at: Option<i64>,
    pub links: Vec<RawLink>,
    /// Raw HTML content blocks in document order.
    pub contents: Vec<String>,
}

/// The `encoding` pseudo-attribute of a leading XML declaration.
static XML_DECL_ENCODING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^(\s*<\?xml\b[^>]*?\bencoding\s*=\s*)["'][^"']*["']"#).expect("valid regex")
});

/// Parse a fetched document into its entries.
///
/// Bodies in a non-UTF-8 charset are transcoded with the charset the server
/// declared, and the XML declaration is rewritten to match so the parser
/// does not decode them a second time.
pub fn parse_document(document: &Document) -> Result<Vec<RawEntry>> {
    let feed = parse_feed(document)?;
    Ok(feed.entries.into_iter().map(raw_entry).collect())
}

/// Title of the feed in `document`, when it has one.
pub fn feed_title(document: &Document) -> Result<Option<String>> {
    let feed = parse_feed(document)?;
    Ok(feed
        .title
        .map(|t| t.content.trim().to_string())
        .filter(|t| !t.is_empty()))
}

fn parse_feed(document: &Document) -> Result<Feed> {
    let parser = feed_parser();
    let feed = if document.charset().eq_ignore_ascii_case("utf-8") {
        parser.parse(&document.body[..])?
    } else {
        let text = document.text();
        let text = declare_utf8(&text);
        parser.parse(text.as_bytes())?
    };
    Ok(feed)
}

/// feed-rs invents an id for entries without one; keep those empty so the
/// reconciler falls back to the entry's links.
fn feed_parser() -> Parser {
    parser::Builder::new()
        .id_generator(|_links, _title, _uri| String::new())
        .build()
}

fn declare_utf8(text: &str) -> Cow<'_, str> {
    XML_DECL_ENCODING.replace(text, r#"${1}"UTF-8""#)
}

fn raw_entry(entry: Entry) -> RawEntry {
    let uri = Some(entry.id).filter(|id| !id.trim().is_empty());

    let mut contents = Vec::new();
    if let Some(body) = entry.content.and_then(|c| c.body) {
        contents.push(body);
    } else if let Some(summary) = entry.summary {
        contents.push(summary.content);
    }

    RawEntry {
        uri,
        title: entry.title.map(|t| t.content),
        author: entry.authors.into_iter().next().map(|a| a.name),
        published_at: entry
            .published
            .or(entry.updated)
            .map(|dt| dt.timestamp_millis()),
        links: entry
            .links
            .into_iter()
            .map(|l| RawLink {
                href: l.href,
                media_type: l.media_type,
            })
            .collect(),
        contents,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(body: &str) -> Document {
        Document::new("https://example.com/feed", Some("application/rss+xml"), body)
    }

    #[test]
    fn test_parse_rss() {
        let rss = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test Feed</title>
    <link>https://example.com</link>
    <item>
      <title>First &amp; Best</title>
      <link>https://example.com/1</link>
      <guid>guid-1</guid>
      <author>jane@example.com (Jane)</author>
      <pubDate>Mon, 06 Jan 2025 10:00:00 GMT</pubDate>
      <description>&lt;p&gt;Hello&lt;/p&gt;</description>
    </item>
  </channel>
</rss>"#;

        let entries = parse_document(&doc(rss)).unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.uri.as_deref(), Some("guid-1"));
        assert_eq!(entry.links[0].href, "https://example.com/1");
        assert_eq!(entry.contents, vec!["<p>Hello</p>".to_string()]);
        assert_eq!(entry.published_at, Some(1_736_157_600_000));
        assert!(entry.title.as_deref().unwrap().contains("Best"));
    }

    #[test]
    fn test_parse_atom_prefers_content() {
        let atom = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Atom Feed</title>
  <entry>
    <id>urn:uuid:1</id>
    <title>Atom Entry</title>
    <link href="https://example.com/entry"/>
    <summary>Short</summary>
    <content type="html">&lt;p&gt;Long&lt;/p&gt;</content>
    <author><name>Author Name</name></author>
    <updated>2025-01-01T00:00:00Z</updated>
  </entry>
</feed>"#;

        let entries = parse_document(&doc(atom)).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].uri.as_deref(), Some("urn:uuid:1"));
        assert_eq!(entries[0].author.as_deref(), Some("Author Name"));
        assert_eq!(entries[0].contents, vec!["<p>Long</p>".to_string()]);
        assert_eq!(entries[0].published_at, Some(1_735_689_600_000));
    }

    #[test]
    fn test_entry_without_guid_has_no_uri() {
        let rss = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
  <channel>
    <title>Test Feed</title>
    <item>
      <title>Headline</title>
      <link>https://example.com/post-1</link>
    </item>
  </channel>
</rss>"#;

        let entries = parse_document(&doc(rss)).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].uri, None);
        assert_eq!(entries[0].links[0].href, "https://example.com/post-1");

        // A retitled entry keeps the id derived from its link
        let retitled = rss.replace("Headline", "Headline (updated)");
        let again = parse_document(&doc(&retitled)).unwrap();
        assert_eq!(
            crate::ingest::derive_article_id(&entries[0]),
            "https://example.com/post-1"
        );
        assert_eq!(
            crate::ingest::derive_article_id(&again[0]),
            crate::ingest::derive_article_id(&entries[0])
        );
    }

    #[test]
    fn test_parse_latin1_feed() {
        let mut body = br#"<?xml version="1.0" encoding="ISO-8859-1"?>
<rss version="2.0">
  <channel>
    <title>Caf"#
            .to_vec();
        body.push(0xe9);
        body.extend_from_slice(
            br#"</title>
    <item>
      <guid>g1</guid>
      <title>caf"#,
        );
        body.push(0xe9);
        body.extend_from_slice(b"</title>\n    </item>\n  </channel>\n</rss>");

        let document = Document::new(
            "https://example.com/feed",
            Some("text/xml; charset=ISO-8859-1"),
            body,
        );
        let entries = parse_document(&document).unwrap();
        assert_eq!(entries[0].title.as_deref(), Some("café"));
    }

    #[test]
    fn test_declare_utf8_rewrites_only_the_declaration() {
        assert_eq!(
            declare_utf8("<?xml version='1.0' encoding='windows-1251'?><rss/>"),
            r#"<?xml version='1.0' encoding="UTF-8"?><rss/>"#
        );
        assert_eq!(declare_utf8("<rss encoding=\"x\"/>"), "<rss encoding=\"x\"/>");
        assert_eq!(declare_utf8("<?xml version=\"1.0\"?><rss/>"), "<?xml version=\"1.0\"?><rss/>");
    }

    #[test]
    fn test_feed_title() {
        let rss = r#"<?xml version="1.0"?><rss version="2.0"><channel><title> Daily </title></channel></rss>"#;
        assert_eq!(feed_title(&doc(rss)).unwrap().as_deref(), Some("Daily"));
        assert!(feed_title(&doc("<html><body>x</body></html>")).is_err());
    }

    #[test]
    fn test_parse_rejects_html() {
        let html = "<html><head><title>x</title></head><body>nope</body></html>";
        assert!(parse_document(&doc(html)).is_err());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_document(&doc("This is not XML")).is_err());
    }
}
