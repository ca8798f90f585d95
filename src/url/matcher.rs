/// Checks if a domain matches a wildcard pattern
///
/// This function supports two types of patterns:
/// 1. Exact match: "example.com" matches only "example.com"
/// 2. Wildcard match: "*.example.com" matches:
///    - "example.com" (the bare domain)
///    - "blog.example.com" (single subdomain)
///    - "api.v2.example.com" (nested subdomains)
///
/// # Arguments
///
/// * `pattern` - The domain pattern, optionally starting with "*."
/// * `candidate` - The domain to check against the pattern
///
/// # Returns
///
/// * `true` - If the candidate matches the pattern
/// * `false` - Otherwise
///
/// # Examples
///
/// ```
/// use seo_crawl_core::url::matches_wildcard;
///
/// // Exact match
/// assert!(matches_wildcard("example.com", "example.com"));
/// assert!(!matches_wildcard("example.com", "other.com"));
///
/// // Wildcard match
/// assert!(matches_wildcard("*.example.com", "example.com"));
/// assert!(matches_wildcard("*.example.com", "blog.example.com"));
/// assert!(matches_wildcard("*.example.com", "api.v2.example.com"));
/// assert!(!matches_wildcard("*.example.com", "example.org"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    if let Some(base) = pattern.strip_prefix("*.") {
        // Wildcard pattern: matches the base domain itself or any subdomain
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        // Exact match only
        candidate == pattern
    }
}
