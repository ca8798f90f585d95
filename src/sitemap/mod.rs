//! Sitemap XML parsing (§6 wire protocol): the sitemap index form
//! (`<sitemapindex>` of `<sitemap><loc>` entries) and the URL-set form
//! (`<urlset>` of `<url><loc/><lastmod/><changefreq/><priority/></url>`).
//! A streaming `quick-xml` reader matches the extractor's token-level
//! approach rather than building a DOM for what can be a very large file.

use chrono::{DateTime, NaiveDate, Utc};
use quick_xml::events::Event;
use quick_xml::reader::Reader;

#[derive(Debug, Clone, PartialEq)]
pub enum ChangeFreq {
    Always,
    Hourly,
    Daily,
    Weekly,
    Monthly,
    Yearly,
    Never,
}

impl ChangeFreq {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "always" => Some(Self::Always),
            "hourly" => Some(Self::Hourly),
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            "monthly" => Some(Self::Monthly),
            "yearly" => Some(Self::Yearly),
            "never" => Some(Self::Never),
            _ => None,
        }
    }
}

/// One `<url>` entry from a sitemap URL set.
#[derive(Debug, Clone, Default)]
pub struct SitemapUrlEntry {
    pub loc: String,
    /// `lastmod` as given; `None` when absent or it couldn't be parsed
    /// as RFC 3339 or `YYYY-MM-DD` (an `invalid-lastmod` issue source).
    pub lastmod: Option<DateTime<Utc>>,
    pub lastmod_raw: Option<String>,
    pub lastmod_invalid: bool,
    pub changefreq: Option<ChangeFreq>,
    pub priority: Option<f64>,
}

/// A parsed sitemap: either a leaf URL set, or an index of further
/// sitemap locations to fetch.
#[derive(Debug, Clone, Default)]
pub struct ParsedSitemap {
    pub urls: Vec<SitemapUrlEntry>,
    pub sitemap_index: Vec<String>,
}

fn parse_lastmod(raw: &str) -> (Option<DateTime<Utc>>, bool) {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return (Some(dt.with_timezone(&Utc)), false);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return (
            Some(DateTime::from_naive_utc_and_offset(date.and_hms_opt(0, 0, 0).unwrap(), Utc)),
            false,
        );
    }
    (None, true)
}

/// Parses either sitemap form from raw XML bytes. Malformed XML yields
/// an empty result rather than an error — sitemap parsing is advisory,
/// not a hard dependency of the crawl.
pub fn parse_sitemap(xml: &str) -> ParsedSitemap {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut out = ParsedSitemap::default();
    let mut buf = Vec::new();

    #[derive(PartialEq)]
    enum Tag {
        None,
        Loc,
        Lastmod,
        Changefreq,
        Priority,
    }
    let mut current_tag = Tag::None;
    let mut in_sitemap_entry = false;
    let mut entry = SitemapUrlEntry::default();
    let mut index_loc = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                match e.name().as_ref() {
                    b"url" => {
                        in_sitemap_entry = true;
                        entry = SitemapUrlEntry::default();
                    }
                    b"sitemap" => in_sitemap_entry = false,
                    b"loc" => current_tag = Tag::Loc,
                    b"lastmod" => current_tag = Tag::Lastmod,
                    b"changefreq" => current_tag = Tag::Changefreq,
                    b"priority" => current_tag = Tag::Priority,
                    _ => {}
                }
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().unwrap_or_default().to_string();
                match current_tag {
                    Tag::Loc if in_sitemap_entry => entry.loc = text,
                    Tag::Loc => index_loc = text,
                    Tag::Lastmod => {
                        let (parsed, invalid) = parse_lastmod(text.trim());
                        entry.lastmod = parsed;
                        entry.lastmod_invalid = invalid;
                        entry.lastmod_raw = Some(text);
                    }
                    Tag::Changefreq => entry.changefreq = ChangeFreq::parse(text.trim()),
                    Tag::Priority => entry.priority = text.trim().parse().ok(),
                    Tag::None => {}
                }
            }
            Ok(Event::End(e)) => {
                match e.name().as_ref() {
                    b"url" => {
                        if !entry.loc.is_empty() {
                            out.urls.push(entry.clone());
                        }
                        in_sitemap_entry = false;
                    }
                    b"sitemap" => {
                        if !index_loc.is_empty() {
                            out.sitemap_index.push(index_loc.clone());
                            index_loc.clear();
                        }
                    }
                    b"loc" | b"lastmod" | b"changefreq" | b"priority" => current_tag = Tag::None,
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_urlset() {
        let xml = r#"<?xml version="1.0"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url>
    <loc>https://example.com/a</loc>
    <lastmod>2024-01-15</lastmod>
    <changefreq>weekly</changefreq>
    <priority>0.8</priority>
  </url>
  <url>
    <loc>https://example.com/b</loc>
    <lastmod>2024-02-01T10:00:00Z</lastmod>
  </url>
</urlset>"#;
        let parsed = parse_sitemap(xml);
        assert_eq!(parsed.urls.len(), 2);
        assert_eq!(parsed.urls[0].loc, "https://example.com/a");
        assert_eq!(parsed.urls[0].changefreq, Some(ChangeFreq::Weekly));
        assert_eq!(parsed.urls[0].priority, Some(0.8));
        assert!(parsed.urls[0].lastmod.is_some());
        assert!(!parsed.urls[0].lastmod_invalid);
        assert!(parsed.urls[1].lastmod.is_some());
    }

    #[test]
    fn test_parse_sitemap_index() {
        let xml = r#"<sitemapindex>
  <sitemap><loc>https://example.com/sitemap1.xml</loc></sitemap>
  <sitemap><loc>https://example.com/sitemap2.xml</loc></sitemap>
</sitemapindex>"#;
        let parsed = parse_sitemap(xml);
        assert_eq!(
            parsed.sitemap_index,
            vec![
                "https://example.com/sitemap1.xml".to_string(),
                "https://example.com/sitemap2.xml".to_string(),
            ]
        );
        assert!(parsed.urls.is_empty());
    }

    #[test]
    fn test_invalid_lastmod_flagged() {
        let xml = r#"<urlset><url><loc>https://example.com/a</loc><lastmod>not-a-date</lastmod></url></urlset>"#;
        let parsed = parse_sitemap(xml);
        assert!(parsed.urls[0].lastmod.is_none());
        assert!(parsed.urls[0].lastmod_invalid);
    }

    #[test]
    fn test_malformed_xml_returns_empty() {
        let parsed = parse_sitemap("not xml at all {{{");
        assert!(parsed.urls.is_empty());
        assert!(parsed.sitemap_index.is_empty());
    }

    #[test]
    fn test_entry_without_loc_skipped() {
        let xml = r#"<urlset><url><lastmod>2024-01-01</lastmod></url></urlset>"#;
        let parsed = parse_sitemap(xml);
        assert!(parsed.urls.is_empty());
    }
}
