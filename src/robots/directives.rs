//! `<meta name="robots">` and `X-Robots-Tag` directive parsing (§4.4).

/// Per-page indexing/following directives, merged from meta robots tags
/// and/or the `X-Robots-Tag` response header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RobotsDirectives {
    pub noindex: bool,
    pub nofollow: bool,
    pub noarchive: bool,
    pub nosnippet: bool,
    pub noimageindex: bool,
    pub notranslate: bool,
    pub max_snippet: Option<i64>,
    pub max_image_preview: Option<String>,
    pub max_video_preview: Option<i64>,
    pub unavailable_after: Option<String>,
}

impl RobotsDirectives {
    /// Indexability per property #10: not noindexed by any source.
    pub fn is_indexable(&self) -> bool {
        !self.noindex
    }

    /// Merges another set of directives in, OR-ing every boolean flag and
    /// preferring the other's value-bearing fields when present. Used to
    /// combine meta-robots with X-Robots-Tag, both of which can restrict
    /// independently.
    pub fn merge(&mut self, other: &RobotsDirectives) {
        self.noindex |= other.noindex;
        self.nofollow |= other.nofollow;
        self.noarchive |= other.noarchive;
        self.nosnippet |= other.nosnippet;
        self.noimageindex |= other.noimageindex;
        self.notranslate |= other.notranslate;
        if other.max_snippet.is_some() {
            self.max_snippet = other.max_snippet;
        }
        if other.max_image_preview.is_some() {
            self.max_image_preview = other.max_image_preview.clone();
        }
        if other.max_video_preview.is_some() {
            self.max_video_preview = other.max_video_preview;
        }
        if other.unavailable_after.is_some() {
            self.unavailable_after = other.unavailable_after.clone();
        }
    }
}

const VALUE_DIRECTIVES: &[&str] = &[
    "max-snippet",
    "max-image-preview",
    "max-video-preview",
    "unavailable_after",
];

/// Parses the content attribute of `<meta name="robots" content="...">`.
pub fn parse_meta_robots(content: &str) -> RobotsDirectives {
    let mut out = RobotsDirectives::default();
    for token in content.split(',') {
        apply_directive_token(&mut out, token);
    }
    out
}

/// Parses an `X-Robots-Tag` header value. Tokens are comma-separated;
/// a token may carry an `agent: ` prefix, in which case it only applies
/// when `agent` matches (case-insensitive substring).
pub fn parse_x_robots_tag(header: &str, agent: &str) -> RobotsDirectives {
    let mut out = RobotsDirectives::default();
    let agent_lower = agent.to_ascii_lowercase();

    for segment in header.split(',') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        match segment.find(':') {
            None => apply_directive_token(&mut out, segment),
            Some(idx) => {
                let prefix = segment[..idx].trim().to_ascii_lowercase();
                if VALUE_DIRECTIVES.contains(&prefix.as_str()) {
                    apply_directive_token(&mut out, segment);
                } else {
                    // agent-prefixed directive, e.g. "googlebot: noindex"
                    let rest = segment[idx + 1..].trim();
                    if prefix == "*" || agent_lower.contains(&prefix) {
                        apply_directive_token(&mut out, rest);
                    }
                }
            }
        }
    }
    out
}

fn apply_directive_token(out: &mut RobotsDirectives, token: &str) {
    let token = token.trim();
    if token.is_empty() {
        return;
    }
    let lower = token.to_ascii_lowercase();

    if let Some(idx) = lower.find(':') {
        let name = &lower[..idx];
        let value = token[idx + 1..].trim();
        match name {
            "max-snippet" => out.max_snippet = value.parse().ok(),
            "max-image-preview" => out.max_image_preview = Some(value.to_lowercase()),
            "max-video-preview" => out.max_video_preview = value.parse().ok(),
            "unavailable_after" => out.unavailable_after = Some(value.to_string()),
            _ => {}
        }
        return;
    }

    match lower.as_str() {
        "none" => {
            out.noindex = true;
            out.nofollow = true;
        }
        "noindex" => out.noindex = true,
        "nofollow" => out.nofollow = true,
        "noarchive" => out.noarchive = true,
        "nosnippet" => out.nosnippet = true,
        "noimageindex" => out.noimageindex = true,
        "notranslate" => out.notranslate = true,
        _ => {}
    }
}
