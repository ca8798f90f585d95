//! Robots.txt parser implementation
//!
//! Parses robots.txt content directly: groups of `User-agent` lines
//! followed by `Allow`/`Disallow`/`Crawl-delay` rules, matched by
//! longest-pattern-wins with `*` wildcards and `$` end-anchors.

use regex::Regex;

/// One `User-agent` rule group: the agent tokens it applies to, its
/// allow/disallow patterns in declaration order, and an optional
/// crawl delay.
#[derive(Debug, Clone)]
struct RuleGroup {
    user_agents: Vec<String>,
    allow: Vec<String>,
    disallow: Vec<String>,
    crawl_delay: Option<f64>,
}

impl RuleGroup {
    fn new(user_agents: Vec<String>) -> Self {
        Self {
            user_agents,
            allow: Vec::new(),
            disallow: Vec::new(),
            crawl_delay: None,
        }
    }

    /// Longest matching pattern wins; ties go to Allow; no match means
    /// allowed.
    fn is_allowed(&self, path: &str) -> bool {
        let best_allow = self
            .allow
            .iter()
            .filter(|p| pattern_matches(p, path))
            .map(|p| p.len())
            .max();
        let best_disallow = self
            .disallow
            .iter()
            .filter(|p| pattern_matches(p, path))
            .map(|p| p.len())
            .max();

        match (best_allow, best_disallow) {
            (None, None) => true,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (Some(a), Some(d)) => a >= d,
        }
    }
}

/// Parsed robots.txt data
///
/// Holds the rule groups and declared sitemaps for one host. Empty
/// content or an explicit [`allow_all`](Self::allow_all) always permits
/// every path.
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    groups: Vec<RuleGroup>,
    sitemaps: Vec<String>,
    allow_all: bool,
}

impl ParsedRobots {
    /// Creates a new ParsedRobots from raw robots.txt content.
    ///
    /// Recognises `User-agent`, `Allow`, `Disallow`, `Crawl-delay` and
    /// `Sitemap` directives (case-insensitively); everything else,
    /// including `Host`, is ignored. Comments start with `#`.
    /// Consecutive `User-agent` lines share the rule block that follows
    /// them.
    pub fn from_content(content: &str) -> Self {
        let mut groups: Vec<RuleGroup> = Vec::new();
        let mut pending_agents: Vec<String> = Vec::new();
        let mut current: Option<RuleGroup> = None;
        let mut sitemaps = Vec::new();

        for raw_line in content.lines() {
            let line = strip_comment(raw_line).trim();
            if line.is_empty() {
                continue;
            }
            let Some((directive, value)) = split_directive(line) else {
                continue;
            };
            let directive = directive.trim().to_ascii_lowercase();
            let value = value.trim();

            match directive.as_str() {
                "user-agent" => {
                    if let Some(group) = current.take() {
                        groups.push(group);
                        pending_agents.clear();
                    }
                    pending_agents.push(value.to_string());
                }
                "allow" => {
                    let group =
                        current.get_or_insert_with(|| RuleGroup::new(pending_agents.clone()));
                    if !value.is_empty() {
                        group.allow.push(value.to_string());
                    }
                }
                "disallow" => {
                    let group =
                        current.get_or_insert_with(|| RuleGroup::new(pending_agents.clone()));
                    if !value.is_empty() {
                        group.disallow.push(value.to_string());
                    }
                }
                "crawl-delay" => {
                    let group =
                        current.get_or_insert_with(|| RuleGroup::new(pending_agents.clone()));
                    group.crawl_delay = value.parse().ok();
                }
                "sitemap" => sitemaps.push(value.to_string()),
                _ => {}
            }
        }
        if let Some(group) = current.take() {
            groups.push(group);
        }

        Self {
            groups,
            sitemaps,
            allow_all: false,
        }
    }

    /// Creates a permissive ParsedRobots that allows everything.
    ///
    /// This is used as the default when robots.txt cannot be fetched.
    pub fn allow_all() -> Self {
        Self {
            groups: Vec::new(),
            sitemaps: Vec::new(),
            allow_all: true,
        }
    }

    fn select_group(&self, agent: &str) -> Option<&RuleGroup> {
        let agent_lower = agent.to_ascii_lowercase();

        if let Some(g) = self
            .groups
            .iter()
            .find(|g| g.user_agents.iter().any(|ua| ua.eq_ignore_ascii_case(agent)))
        {
            return Some(g);
        }
        if let Some(g) = self.groups.iter().find(|g| {
            g.user_agents.iter().any(|ua| {
                ua != "*" && !ua.is_empty() && agent_lower.contains(&ua.to_ascii_lowercase())
            })
        }) {
            return Some(g);
        }
        self.groups
            .iter()
            .find(|g| g.user_agents.iter().any(|ua| ua == "*"))
    }

    /// Checks if a URL path is allowed for the given user agent.
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.allow_all {
            return true;
        }
        match self.select_group(user_agent) {
            Some(group) => group.is_allowed(url),
            None => true,
        }
    }

    /// Gets the crawl delay declared for the group matching `user_agent`.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        self.select_group(user_agent).and_then(|g| g.crawl_delay)
    }

    /// Sitemap URLs declared in the file, in declaration order.
    pub fn sitemaps(&self) -> &[String] {
        &self.sitemaps
    }
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn split_directive(line: &str) -> Option<(&str, &str)> {
    let idx = line.find(':')?;
    Some((&line[..idx], &line[idx + 1..]))
}

/// Translates a robots.txt path pattern into a prefix-anchored regex and
/// checks it against `path`. An empty pattern never matches; `*` is a
/// wildcard; a trailing `$` anchors to end-of-path.
fn pattern_matches(pattern: &str, path: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }
    match compile_pattern(pattern) {
        Some(re) => re.is_match(path),
        None => false,
    }
}

fn compile_pattern(pattern: &str) -> Option<Regex> {
    let has_end_anchor = pattern.ends_with('$');
    let core = if has_end_anchor {
        &pattern[..pattern.len() - 1]
    } else {
        pattern
    };

    let mut regex_str = String::from("^");
    for ch in core.chars() {
        if ch == '*' {
            regex_str.push_str(".*");
        } else {
            regex_str.push_str(&regex::escape(&ch.to_string()));
        }
    }
    if has_end_anchor {
        regex_str.push('$');
    }
    Regex::new(&regex_str).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allow_all() {
        let robots = ParsedRobots::allow_all();
        assert!(robots.is_allowed("/any/path", "TestBot"));
        assert!(robots.is_allowed("/admin", "TestBot"));
    }

    #[test]
    fn test_parse_disallow_all() {
        let content = "User-agent: *\nDisallow: /";
        let robots = ParsedRobots::from_content(content);
        assert!(!robots.is_allowed("/", "TestBot"));
        assert!(!robots.is_allowed("/page", "TestBot"));
    }

    #[test]
    fn test_parse_disallow_specific() {
        let content = "User-agent: *\nDisallow: /admin";
        let robots = ParsedRobots::from_content(content);
        assert!(robots.is_allowed("/", "TestBot"));
        assert!(robots.is_allowed("/page", "TestBot"));
        assert!(!robots.is_allowed("/admin", "TestBot"));
        assert!(!robots.is_allowed("/admin/users", "TestBot"));
    }

    #[test]
    fn test_parse_allow_and_disallow() {
        let content = "User-agent: *\nDisallow: /private\nAllow: /private/public";
        let robots = ParsedRobots::from_content(content);
        assert!(robots.is_allowed("/", "TestBot"));
        assert!(!robots.is_allowed("/private", "TestBot"));
        assert!(robots.is_allowed("/private/public", "TestBot"));
        assert!(robots.is_allowed("/private/public/deep", "TestBot"));
    }

    #[test]
    fn test_tie_goes_to_allow() {
        let content = "User-agent: *\nDisallow: /a\nAllow: /a";
        let robots = ParsedRobots::from_content(content);
        assert!(robots.is_allowed("/a", "TestBot"));
    }

    #[test]
    fn test_wildcard_pattern() {
        let content = "User-agent: *\nDisallow: /*.pdf$";
        let robots = ParsedRobots::from_content(content);
        assert!(!robots.is_allowed("/file.pdf", "TestBot"));
        assert!(robots.is_allowed("/file.pdf.html", "TestBot"));
        assert!(robots.is_allowed("/other", "TestBot"));
    }

    #[test]
    fn test_parse_specific_user_agent() {
        let content = "User-agent: BadBot\nDisallow: /\n\nUser-agent: *\nAllow: /";
        let robots = ParsedRobots::from_content(content);
        assert!(robots.is_allowed("/page", "GoodBot"));
        assert!(!robots.is_allowed("/page", "BadBot"));
    }

    #[test]
    fn test_shared_group_for_successive_user_agents() {
        let content = "User-agent: A\nUser-agent: B\nDisallow: /x";
        let robots = ParsedRobots::from_content(content);
        assert!(!robots.is_allowed("/x", "A"));
        assert!(!robots.is_allowed("/x", "B"));
    }

    #[test]
    fn test_comment_lines_ignored() {
        let content = "# comment\nUser-agent: *\n# another comment\nDisallow: /secret # trailing";
        let robots = ParsedRobots::from_content(content);
        assert!(!robots.is_allowed("/secret", "TestBot"));
        assert!(robots.is_allowed("/public", "TestBot"));
    }

    #[test]
    fn test_unknown_directives_ignored() {
        let content = "User-agent: *\nHost: example.com\nDisallow: /admin";
        let robots = ParsedRobots::from_content(content);
        assert!(!robots.is_allowed("/admin", "TestBot"));
        assert!(robots.is_allowed("/other", "TestBot"));
    }

    #[test]
    fn test_crawl_delay_per_agent() {
        let content = "User-agent: TestBot\nCrawl-delay: 10\n\nUser-agent: *\nCrawl-delay: 2";
        let robots = ParsedRobots::from_content(content);
        assert_eq!(robots.crawl_delay("TestBot"), Some(10.0));
        assert_eq!(robots.crawl_delay("OtherBot"), Some(2.0));
    }

    #[test]
    fn test_sitemap_collected() {
        let content = "User-agent: *\nDisallow:\nSitemap: https://example.com/sitemap.xml";
        let robots = ParsedRobots::from_content(content);
        assert_eq!(
            robots.sitemaps(),
            &["https://example.com/sitemap.xml".to_string()]
        );
    }

    #[test]
    fn test_invalid_robots_txt() {
        let content = "This is not valid robots.txt {{{";
        let robots = ParsedRobots::from_content(content);
        assert!(robots.is_allowed("/any/path", "TestBot"));
    }

    #[test]
    fn test_empty_robots_txt() {
        let content = "";
        let robots = ParsedRobots::from_content(content);
        assert!(robots.is_allowed("/any/path", "TestBot"));
    }

    /// Robots-disallow end-to-end scenario: a private section blocked,
    /// the rest of the site open.
    #[test]
    fn test_private_section_disallow_scenario() {
        let content = "User-agent: *\nDisallow: /private/";
        let robots = ParsedRobots::from_content(content);
        assert!(!robots.is_allowed("/private/secret", "SumiRipple"));
        assert!(robots.is_allowed("/", "SumiRipple"));
    }
}
