//! The restricted selector grammar used by `CustomSearch` and
//! `CustomExtraction` rules (§9 design note). Deliberately narrow: CSS-ish
//! `#id`, `.class`, `tag`, `tag[attr]`, and a handful of XPath-shaped
//! accessors (`//tag`, `//tag/@attr`, `//tag/text()`), plus `regex:` and
//! `substring:` escape hatches. Anything else is rejected at config
//! validation time rather than silently mis-matched during a crawl.

use regex::Regex;
use scraper::{Html, Selector as CssSelector};

#[derive(Debug, Clone)]
pub enum Selector {
    Regex(Regex),
    Substring(String),
    Id(String),
    Class(String),
    Tag(String),
    TagAttr(String, String),
    XPathTag(String),
    XPathAttr(String, String),
    XPathText(String),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,
    #[error("invalid regex in selector '{0}': {1}")]
    InvalidRegex(String, String),
    #[error("unrecognised selector syntax: '{0}' (allowed: regex:, substring:, #id, .class, tag, tag[attr], //tag, //tag/@attr, //tag/text())")]
    Unrecognised(String),
}

/// Parses and validates one selector string against the restricted
/// grammar. Called both at config-validation time (reject early) and
/// at analysis time (apply).
pub fn parse_selector(raw: &str) -> Result<Selector, SelectorError> {
    let s = raw.trim();
    if s.is_empty() {
        return Err(SelectorError::Empty);
    }

    if let Some(pattern) = s.strip_prefix("regex:") {
        return Regex::new(pattern)
            .map(Selector::Regex)
            .map_err(|e| SelectorError::InvalidRegex(pattern.to_string(), e.to_string()));
    }
    if let Some(text) = s.strip_prefix("substring:") {
        return Ok(Selector::Substring(text.to_string()));
    }

    if let Some(rest) = s.strip_prefix("//") {
        if let Some(tag) = rest.strip_suffix("/text()") {
            if is_tag_name(tag) {
                return Ok(Selector::XPathText(tag.to_string()));
            }
        } else if let Some(attr_part) = rest.split_once("/@") {
            let (tag, attr) = attr_part;
            if is_tag_name(tag) && is_tag_name(attr) {
                return Ok(Selector::XPathAttr(tag.to_string(), attr.to_string()));
            }
        } else if is_tag_name(rest) {
            return Ok(Selector::XPathTag(rest.to_string()));
        }
        return Err(SelectorError::Unrecognised(raw.to_string()));
    }

    if let Some(id) = s.strip_prefix('#') {
        if is_tag_name(id) {
            return Ok(Selector::Id(id.to_string()));
        }
        return Err(SelectorError::Unrecognised(raw.to_string()));
    }
    if let Some(class) = s.strip_prefix('.') {
        if is_tag_name(class) {
            return Ok(Selector::Class(class.to_string()));
        }
        return Err(SelectorError::Unrecognised(raw.to_string()));
    }

    if let Some(open) = s.find('[') {
        if let Some(close) = s.strip_suffix(']') {
            let tag = &s[..open];
            let attr = &close[open + 1..];
            if is_tag_name(tag) && is_tag_name(attr) {
                return Ok(Selector::TagAttr(tag.to_string(), attr.to_string()));
            }
        }
        return Err(SelectorError::Unrecognised(raw.to_string()));
    }

    if is_tag_name(s) {
        return Ok(Selector::Tag(s.to_string()));
    }

    Err(SelectorError::Unrecognised(raw.to_string()))
}

fn is_tag_name(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// Validates selector syntax without caring about the match result;
/// used by config validation so bad rules fail fast, before any crawl.
pub fn validate_selector_syntax(raw: &str) -> Result<(), SelectorError> {
    parse_selector(raw).map(|_| ())
}

/// Runs a selector against one page: the raw body (for regex/substring),
/// and a parsed DOM (for the CSS-ish/XPath-ish forms). Returns the
/// matched strings (attribute values or text content, in document
/// order).
pub fn apply_selector(selector: &Selector, body: &str) -> Vec<String> {
    match selector {
        Selector::Regex(re) => re
            .find_iter(body)
            .map(|m| m.as_str().to_string())
            .collect(),
        Selector::Substring(needle) => {
            if body.contains(needle.as_str()) {
                vec![needle.clone()]
            } else {
                Vec::new()
            }
        }
        Selector::Id(id) => query_css(body, &format!("#{id}")),
        Selector::Class(class) => query_css(body, &format!(".{class}")),
        Selector::Tag(tag) => query_css(body, tag),
        Selector::TagAttr(tag, attr) => {
            let document = Html::parse_document(body);
            match CssSelector::parse(tag) {
                Ok(sel) => document
                    .select(&sel)
                    .filter_map(|el| el.value().attr(attr).map(str::to_string))
                    .collect(),
                Err(_) => Vec::new(),
            }
        }
        Selector::XPathTag(tag) => query_css(body, tag),
        Selector::XPathAttr(tag, attr) => {
            let document = Html::parse_document(body);
            match CssSelector::parse(tag) {
                Ok(sel) => document
                    .select(&sel)
                    .filter_map(|el| el.value().attr(attr).map(str::to_string))
                    .collect(),
                Err(_) => Vec::new(),
            }
        }
        Selector::XPathText(tag) => {
            let document = Html::parse_document(body);
            match CssSelector::parse(tag) {
                Ok(sel) => document
                    .select(&sel)
                    .map(|el| el.text().collect::<Vec<_>>().join(""))
                    .collect(),
                Err(_) => Vec::new(),
            }
        }
    }
}

fn query_css(body: &str, css: &str) -> Vec<String> {
    let document = Html::parse_document(body);
    match CssSelector::parse(css) {
        Ok(sel) => document
            .select(&sel)
            .map(|el| el.text().collect::<Vec<_>>().join(""))
            .collect(),
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_selector() {
        assert!(matches!(parse_selector("#main"), Ok(Selector::Id(ref s)) if s == "main"));
    }

    #[test]
    fn test_class_selector() {
        assert!(matches!(parse_selector(".price"), Ok(Selector::Class(ref s)) if s == "price"));
    }

    #[test]
    fn test_tag_selector() {
        assert!(matches!(parse_selector("h1"), Ok(Selector::Tag(ref s)) if s == "h1"));
    }

    #[test]
    fn test_tag_attr_selector() {
        assert!(matches!(
            parse_selector("meta[content]"),
            Ok(Selector::TagAttr(ref t, ref a)) if t == "meta" && a == "content"
        ));
    }

    #[test]
    fn test_xpath_tag() {
        assert!(matches!(parse_selector("//div"), Ok(Selector::XPathTag(ref s)) if s == "div"));
    }

    #[test]
    fn test_xpath_attr() {
        assert!(matches!(
            parse_selector("//img/@src"),
            Ok(Selector::XPathAttr(ref t, ref a)) if t == "img" && a == "src"
        ));
    }

    #[test]
    fn test_xpath_text() {
        assert!(matches!(parse_selector("//p/text()"), Ok(Selector::XPathText(ref s)) if s == "p"));
    }

    #[test]
    fn test_regex_selector() {
        assert!(matches!(parse_selector("regex:\\d+"), Ok(Selector::Regex(_))));
    }

    #[test]
    fn test_invalid_regex_rejected() {
        assert!(parse_selector("regex:(").is_err());
    }

    #[test]
    fn test_unsupported_css_rejected() {
        assert!(parse_selector("div > p").is_err());
        assert!(parse_selector("div:hover").is_err());
    }

    #[test]
    fn test_apply_tag_selector_extracts_text() {
        let sel = parse_selector("h1").unwrap();
        let matches = apply_selector(&sel, "<html><body><h1>Hello</h1></body></html>");
        assert_eq!(matches, vec!["Hello".to_string()]);
    }

    #[test]
    fn test_apply_substring_selector() {
        let sel = parse_selector("substring:copyright").unwrap();
        assert_eq!(apply_selector(&sel, "all rights, copyright 2024"), vec!["copyright"]);
        assert!(apply_selector(&sel, "nothing here").is_empty());
    }
}
