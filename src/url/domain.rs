use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
/// If the URL has no host (which shouldn't happen for valid HTTP(S) URLs), it returns None.
///
/// # Arguments
///
/// * `url` - The URL to extract the domain from
///
/// # Returns
///
/// * `Some(String)` - The lowercase domain/host
/// * `None` - If the URL has no host
///
/// # Examples
///
/// ```
/// use url::Url;
/// use seo_crawl_core::url::extract_domain;
///
/// let url = Url::parse("https://example.com/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("https://sub.example.com/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("sub.example.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the last two dot-labels of a host, e.g. `blog.example.co.uk` ->
/// `co.uk`.
///
/// This is the "sufficient for common two-level TLDs" approximation the
/// spec calls out; a publicsuffix-aware refinement is an acceptable
/// substitution but is not required here.
pub fn registrable_domain(host: &str) -> String {
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() <= 2 {
        host.to_lowercase()
    } else {
        labels[labels.len() - 2..].join(".").to_lowercase()
    }
}

/// True if both URLs share the same lowercased host.
pub fn same_host(a: &Url, b: &Url) -> bool {
    match (a.host_str(), b.host_str()) {
        (Some(ha), Some(hb)) => ha.eq_ignore_ascii_case(hb),
        _ => false,
    }
}

/// True if both URLs share the same registrable domain (last two labels).
pub fn same_domain(a: &Url, b: &Url) -> bool {
    match (a.host_str(), b.host_str()) {
        (Some(ha), Some(hb)) => registrable_domain(ha) == registrable_domain(hb),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_simple_domain() {
        let url = Url::parse("https://example.com/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_subdomain() {
        let url = Url::parse("https://blog.example.com/post").unwrap();
        assert_eq!(extract_domain(&url), Some("blog.example.com".to_string()));
    }

    #[test]
    fn test_extract_nested_subdomain() {
        let url = Url::parse("https://api.v2.example.com/endpoint").unwrap();
        assert_eq!(extract_domain(&url), Some("api.v2.example.com".to_string()));
    }

    #[test]
    fn test_extract_with_port() {
        let url = Url::parse("https://example.com:8080/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_uppercase_converted_to_lowercase() {
        let url = Url::parse("https://EXAMPLE.COM/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_mixed_case() {
        let url = Url::parse("https://Example.COM/").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_with_path_and_query() {
        let url = Url::parse("https://example.com/path/to/page?query=value").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_extract_with_fragment() {
        let url = Url::parse("https://example.com/page#section").unwrap();
        assert_eq!(extract_domain(&url), Some("example.com".to_string()));
    }

    #[test]
    fn test_registrable_domain_two_labels() {
        assert_eq!(registrable_domain("example.com"), "example.com");
    }

    #[test]
    fn test_registrable_domain_subdomain() {
        assert_eq!(registrable_domain("blog.example.com"), "example.com");
        assert_eq!(
            registrable_domain("api.v2.blog.example.co.uk"),
            "co.uk"
        );
    }

    #[test]
    fn test_same_host() {
        let a = Url::parse("https://example.com/a").unwrap();
        let b = Url::parse("https://EXAMPLE.com/b").unwrap();
        let c = Url::parse("https://blog.example.com/c").unwrap();
        assert!(same_host(&a, &b));
        assert!(!same_host(&a, &c));
    }

    #[test]
    fn test_same_domain_across_subdomains() {
        let a = Url::parse("https://example.com/a").unwrap();
        let c = Url::parse("https://blog.example.com/c").unwrap();
        let d = Url::parse("https://other.com/d").unwrap();
        assert!(same_domain(&a, &c));
        assert!(!same_domain(&a, &d));
    }
}
