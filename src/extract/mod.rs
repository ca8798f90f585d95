//! Streaming HTML extraction (§4.6).
//!
//! Walks the response body with a token-level rewriter rather than
//! building a DOM, so per-page memory is bounded by the output caps
//! below rather than by page size. `lol_html` drives element and text
//! handlers; we never touch the rewritten output stream itself, only
//! the side-channel state accumulated while it passes through.

use crate::links::RawLink;
use lol_html::{element, text, HtmlRewriter, Settings};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use url::Url;

#[derive(Debug, Clone)]
pub struct ImageFact {
    pub src: Option<String>,
    pub alt: Option<String>,
    pub width: Option<String>,
    pub height: Option<String>,
    pub lazy: bool,
}

#[derive(Debug, Clone)]
pub struct ScriptFact {
    pub src: Option<String>,
    pub is_async: bool,
    pub defer: bool,
    pub script_type: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Heading {
    pub level: u8,
    pub text: String,
}

/// Output caps applied during extraction. Overflow never errors; it
/// sets `truncated` and silently stops collecting more of that kind.
#[derive(Debug, Clone)]
pub struct ExtractionCaps {
    pub max_title: usize,
    pub max_meta: usize,
    pub max_anchor_text: usize,
    pub max_links: usize,
    pub max_images: usize,
    pub max_headings: usize,
}

impl Default for ExtractionCaps {
    fn default() -> Self {
        Self {
            max_title: 512,
            max_meta: 1024,
            max_anchor_text: 256,
            max_links: 10_000,
            max_images: 2_000,
            max_headings: 500,
        }
    }
}

/// Everything derived from one page's HTML.
#[derive(Debug, Clone, Default)]
pub struct PageFacts {
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_keywords: Option<String>,
    pub meta_robots: Option<String>,
    pub content_type_meta: Option<String>,
    pub refresh: Option<String>,
    pub og: HashMap<String, String>,
    pub twitter: HashMap<String, String>,
    pub other_meta: HashMap<String, String>,
    pub canonical: Option<String>,
    pub hreflangs: Vec<(String, String)>,
    pub stylesheets: Vec<String>,
    pub links: Vec<RawLink>,
    pub images: Vec<ImageFact>,
    pub scripts: Vec<ScriptFact>,
    pub headings: Vec<Heading>,
    pub json_ld_blocks: Vec<String>,
    pub word_count: usize,
    pub content_hash: String,
    pub truncated: bool,
}

struct State {
    caps: ExtractionCaps,
    base: Url,
    facts: PageFacts,
    title_elements_seen: u32,
    title_done: bool,
    current_link: Option<RawLink>,
    current_heading: Option<Heading>,
    current_json_ld: Option<String>,
    suppress_depth: i32,
    visible_text: String,
}

fn resolve(base: &Url, href: &str) -> Option<String> {
    base.join(href).ok().map(|u| u.to_string())
}

/// Extracts [`PageFacts`] from `html`, resolving relative URLs against
/// `base_url` (updated in place if the document carries a `<base
/// href>`).
pub fn extract_page_facts(html: &str, base_url: &Url, caps: &ExtractionCaps) -> PageFacts {
    let state = Rc::new(RefCell::new(State {
        caps: caps.clone(),
        base: base_url.clone(),
        facts: PageFacts::default(),
        title_elements_seen: 0,
        title_done: false,
        current_link: None,
        current_heading: None,
        current_json_ld: None,
        suppress_depth: 0,
        visible_text: String::new(),
    }));

    {
        let s1 = state.clone();
        let s2 = state.clone();
        let s3 = state.clone();
        let s4 = state.clone();
        let s5 = state.clone();
        let s6 = state.clone();
        let s7 = state.clone();
        let s8 = state.clone();
        let s9 = state.clone();
        let s_script_el = state.clone();
        let s_script_end_src = state.clone();
        let s_script_text = state.clone();
        let s_style_el = state.clone();
        let s_generic_text = state.clone();

        let heading_handlers: Vec<_> = (1..=6u8)
            .flat_map(|level| {
                let selector = format!("h{level}");
                let s_open = state.clone();
                let s_text = state.clone();
                vec![
                    element!(selector, move |_el| {
                        let mut st = s_open.borrow_mut();
                        if st.facts.headings.len() < st.caps.max_headings {
                            st.current_heading = Some(Heading { level, text: String::new() });
                        } else {
                            st.facts.truncated = true;
                        }
                        Ok(())
                    }),
                    text!(selector, move |t| {
                        let mut st = s_text.borrow_mut();
                        if let Some(h) = st.current_heading.as_mut() {
                            h.text.push_str(t.as_str());
                        }
                        if t.last_in_text_node() {
                            if let Some(h) = st.current_heading.take() {
                                st.facts.headings.push(h);
                            }
                        }
                        Ok(())
                    }),
                ]
            })
            .collect();

        let mut handlers = vec![
            element!("title", move |_el| {
                let mut st = s1.borrow_mut();
                st.title_elements_seen += 1;
                Ok(())
            }),
            text!("title", move |t| {
                let mut st = s2.borrow_mut();
                if st.title_elements_seen == 1 && !st.title_done {
                    let cap = st.caps.max_title;
                    let chunk = t.as_str().to_string();
                    let mut title = st.facts.title.take().unwrap_or_default();
                    title.push_str(&chunk);
                    if title.len() > cap {
                        title.truncate(cap);
                        st.facts.truncated = true;
                        st.title_done = true;
                    }
                    st.facts.title = Some(title);
                }
                if t.last_in_text_node() {
                    if let Some(title) = st.facts.title.as_mut() {
                        *title = title.trim().to_string();
                    }
                }
                Ok(())
            }),
            element!("meta", move |el| {
                let mut st = s3.borrow_mut();
                let cap = st.caps.max_meta;
                let content = el.get_attribute("content").map(|c| {
                    if c.len() > cap {
                        st.facts.truncated = true;
                        c[..cap].to_string()
                    } else {
                        c
                    }
                });
                if let Some(name) = el.get_attribute("name") {
                    let name_lower = name.to_ascii_lowercase();
                    match name_lower.as_str() {
                        "description" => st.facts.meta_description = content,
                        "keywords" => st.facts.meta_keywords = content,
                        "robots" => st.facts.meta_robots = content,
                        _ if name_lower.starts_with("twitter:") => {
                            if let Some(c) = content {
                                st.facts.twitter.insert(name_lower, c);
                            }
                        }
                        _ => {
                            if let Some(c) = content {
                                st.facts.other_meta.insert(name_lower, c);
                            }
                        }
                    }
                } else if let Some(property) = el.get_attribute("property") {
                    let property_lower = property.to_ascii_lowercase();
                    if property_lower.starts_with("og:") {
                        if let Some(c) = content {
                            st.facts.og.insert(property_lower, c);
                        }
                    } else if let Some(c) = content {
                        st.facts.other_meta.insert(property_lower, c);
                    }
                } else if let Some(http_equiv) = el.get_attribute("http-equiv") {
                    let he_lower = http_equiv.to_ascii_lowercase();
                    match he_lower.as_str() {
                        "content-type" => st.facts.content_type_meta = content,
                        "refresh" => st.facts.refresh = content,
                        _ => {}
                    }
                }
                Ok(())
            }),
            element!("link", move |el| {
                let mut st = s4.borrow_mut();
                let rel = el.get_attribute("rel").unwrap_or_default().to_ascii_lowercase();
                let href = el.get_attribute("href");
                match rel.as_str() {
                    "canonical" => {
                        if let Some(href) = href {
                            st.facts.canonical = resolve(&st.base.clone(), &href);
                        }
                    }
                    "alternate" => {
                        if let (Some(hreflang), Some(href)) =
                            (el.get_attribute("hreflang"), href)
                        {
                            if let Some(resolved) = resolve(&st.base.clone(), &href) {
                                st.facts.hreflangs.push((hreflang.to_ascii_lowercase(), resolved));
                            }
                        }
                    }
                    "stylesheet" => {
                        if let Some(href) = href {
                            if let Some(resolved) = resolve(&st.base.clone(), &href) {
                                st.facts.stylesheets.push(resolved);
                            }
                        }
                    }
                    _ => {}
                }
                Ok(())
            }),
            element!("base", move |el| {
                let mut st = s5.borrow_mut();
                if let Some(href) = el.get_attribute("href") {
                    if let Ok(resolved) = st.base.join(&href) {
                        st.base = resolved;
                    }
                }
                Ok(())
            }),
            element!("a[href]", move |el| {
                let mut st = s6.borrow_mut();
                if st.facts.links.len() >= st.caps.max_links {
                    st.facts.truncated = true;
                    return Ok(());
                }
                let href = el.get_attribute("href").unwrap_or_default();
                let rel = el.get_attribute("rel");
                st.current_link = Some(RawLink { href, rel, anchor_text: String::new() });

                let s_end = s7.clone();
                el.on_end_tag(move |_end| {
                    let mut st = s_end.borrow_mut();
                    if let Some(mut link) = st.current_link.take() {
                        let cap = st.caps.max_anchor_text;
                        if link.anchor_text.len() > cap {
                            link.anchor_text.truncate(cap);
                            st.facts.truncated = true;
                        }
                        link.anchor_text = link.anchor_text.trim().to_string();
                        st.facts.links.push(link);
                    }
                    Ok(())
                })?;
                Ok(())
            }),
            text!("a", move |t| {
                let mut st = s8.borrow_mut();
                if let Some(link) = st.current_link.as_mut() {
                    link.anchor_text.push_str(t.as_str());
                }
                Ok(())
            }),
            element!("img", move |el| {
                let mut st = s9.borrow_mut();
                if st.facts.images.len() >= st.caps.max_images {
                    st.facts.truncated = true;
                    return Ok(());
                }
                let src = el
                    .get_attribute("data-src")
                    .or_else(|| el.get_attribute("src"));
                st.facts.images.push(ImageFact {
                    src,
                    alt: el.get_attribute("alt"),
                    width: el.get_attribute("width"),
                    height: el.get_attribute("height"),
                    lazy: el.get_attribute("loading").as_deref() == Some("lazy"),
                });
                Ok(())
            }),
            element!("script", move |el| {
                let mut st = s_script_el.borrow_mut();
                let script_type = el.get_attribute("type");
                let is_ld_json = script_type.as_deref() == Some("application/ld+json");

                if let Some(src) = el.get_attribute("src") {
                    st.facts.scripts.push(ScriptFact {
                        src: Some(src),
                        is_async: el.has_attribute("async"),
                        defer: el.has_attribute("defer"),
                        script_type,
                    });
                } else if !is_ld_json {
                    st.facts.scripts.push(ScriptFact {
                        src: None,
                        is_async: el.has_attribute("async"),
                        defer: el.has_attribute("defer"),
                        script_type,
                    });
                }

                st.suppress_depth += 1;
                if is_ld_json {
                    st.current_json_ld = Some(String::new());
                }
                let s_end = s_script_end_src.clone();
                el.on_end_tag(move |_end| {
                    let mut st = s_end.borrow_mut();
                    st.suppress_depth -= 1;
                    if let Some(block) = st.current_json_ld.take() {
                        st.facts.json_ld_blocks.push(block);
                    }
                    Ok(())
                })?;
                Ok(())
            }),
            text!("script", move |t| {
                let mut st = s_script_text.borrow_mut();
                if let Some(block) = st.current_json_ld.as_mut() {
                    block.push_str(t.as_str());
                }
                Ok(())
            }),
            element!("style", move |el| {
                let mut st = s_style_el.borrow_mut();
                st.suppress_depth += 1;
                let s_end = s_style_el.clone();
                el.on_end_tag(move |_end| {
                    s_end.borrow_mut().suppress_depth -= 1;
                    Ok(())
                })?;
                Ok(())
            }),
            text!("*", move |t| {
                let mut st = s_generic_text.borrow_mut();
                if st.suppress_depth == 0 {
                    st.visible_text.push_str(t.as_str());
                    st.visible_text.push(' ');
                }
                Ok(())
            }),
        ];
        handlers.extend(heading_handlers);

        let mut output = Vec::new();
        let mut rewriter = HtmlRewriter::new(
            Settings {
                element_content_handlers: handlers,
                ..Settings::default()
            },
            |c: &[u8]| output.extend_from_slice(c),
        );
        let _ = rewriter.write(html.as_bytes());
        let _ = rewriter.end();
    }

    let mut inner = Rc::try_unwrap(state)
        .unwrap_or_else(|rc| {
            // Should not happen: every clone is dropped with the rewriter.
            RefCell::new(State {
                caps: caps.clone(),
                base: base_url.clone(),
                facts: rc.borrow().facts.clone(),
                title_elements_seen: 0,
                title_done: false,
                current_link: None,
                current_heading: None,
                current_json_ld: None,
                suppress_depth: 0,
                visible_text: String::new(),
            })
        })
        .into_inner();

    let normalized = normalize_visible_text(&inner.visible_text);
    inner.facts.word_count = normalized.split_whitespace().count();
    inner.facts.content_hash = format!("{:x}", md5::compute(normalized.as_bytes()));
    inner.facts
}

fn normalize_visible_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
