use crate::UrlError;
use std::collections::HashSet;
use url::Url;

/// Query parameter names ignored by normalization unless overridden by config.
///
/// `utm_*` is matched by prefix; the rest are exact, case-insensitive matches.
const DEFAULT_IGNORE_PARAMS: &[&str] = &["gclid", "fbclid", "msclkid", "ref", "source"];

/// Options controlling how [`normalize_with`] canonicalises a URL.
///
/// The defaults match the distilled spec: the `www.` prefix is kept and
/// casing outside the scheme/host is preserved.
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    /// Extra query parameter names to drop, beyond the built-in set.
    /// Matched case-insensitively; entries ending in `*` match by prefix.
    pub ignore_params: HashSet<String>,
    /// Strip a leading `www.` label from the host.
    pub strip_www: bool,
    /// Lowercase the entire URL, not just scheme and host.
    pub lowercase_all: bool,
    /// Sort the surviving query parameters by key then value.
    pub sort_query_params: bool,
    /// Drop a trailing slash from the path, except when the path is `/`.
    pub remove_trailing_slash: bool,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            ignore_params: HashSet::new(),
            strip_www: false,
            lowercase_all: false,
            sort_query_params: true,
            remove_trailing_slash: true,
        }
    }
}

impl NormalizeOptions {
    fn is_ignored(&self, key: &str) -> bool {
        let key = key.to_ascii_lowercase();
        if key.starts_with("utm_") {
            return true;
        }
        if DEFAULT_IGNORE_PARAMS.contains(&key.as_str()) {
            return true;
        }
        self.ignore_params.iter().any(|p| {
            let p = p.to_ascii_lowercase();
            match p.strip_suffix('*') {
                Some(prefix) => key.starts_with(prefix),
                None => key == p,
            }
        })
    }
}

/// Canonicalises a raw URL into its deduplication key using default options.
///
/// See [`normalize_with`] for the full rule set.
///
/// # Examples
///
/// ```
/// use seo_crawl_core::url::normalize_url;
///
/// let url = normalize_url("HTTP://Example.com:80/a/../b/?z=1&a=2&utm_source=x").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/b?a=2&z=1");
/// ```
pub fn normalize_url(url_str: &str) -> Result<Url, UrlError> {
    normalize_with(url_str, &NormalizeOptions::default())
}

/// Canonicalises a raw URL according to the configured options.
///
/// Applied in order: parse and reject non-absolute / non-http(s) inputs;
/// lowercase scheme and host; strip the default port for the scheme; drop
/// the fragment; collapse repeated slashes and resolve `.`/`..` segments;
/// drop a trailing slash unless the path is `/`; drop ignored query
/// parameters; sort the remainder by key then value; the `url` crate's
/// RFC 3986 serialisation supplies the canonical percent-encoding.
pub fn normalize_with(url_str: &str, opts: &NormalizeOptions) -> Result<Url, UrlError> {
    let mut url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "only http and https schemes are supported, got: {}",
            url.scheme()
        )));
    }
    if !url.has_host() {
        return Err(UrlError::MissingDomain);
    }

    let host = url
        .host_str()
        .ok_or(UrlError::MissingDomain)?
        .to_lowercase();
    let host = if opts.strip_www {
        host.strip_prefix("www.").unwrap_or(&host).to_string()
    } else {
        host
    };
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Malformed(format!("failed to set host: {}", e)))?;

    let default_port = match url.scheme() {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    };
    if url.port() == default_port {
        let _ = url.set_port(None);
    }

    url.set_fragment(None);

    let normalized_path = normalize_path(url.path(), opts.remove_trailing_slash);
    url.set_path(&normalized_path);

    if url.query().is_some() {
        let mut params: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| !opts.is_ignored(k))
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        if opts.sort_query_params {
            params.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        }

        if params.is_empty() {
            url.set_query(None);
        } else {
            let query_string = params
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            url.set_query(Some(&query_string));
        }
    }

    if opts.lowercase_all {
        let lowered = url.as_str().to_lowercase();
        url = Url::parse(&lowered).map_err(|e| UrlError::Parse(e.to_string()))?;
    }

    Ok(url)
}

/// Resolves `.`/`..` segments and collapses repeated slashes, then
/// optionally strips a trailing slash (unless the result is the root path).
fn normalize_path(path: &str, remove_trailing_slash: bool) -> String {
    if path.is_empty() {
        return "/".to_string();
    }

    let had_trailing_slash = path.len() > 1 && path.ends_with('/');

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    let joined = format!("/{}", segments.join("/"));
    if !remove_trailing_slash && had_trailing_slash {
        format!("{}/", joined)
    } else {
        joined
    }
}

/// Returns true if normalizing an already-normalized URL again reproduces
/// the same string (idempotence, tested property #4).
pub fn is_idempotent(url_str: &str) -> bool {
    match normalize_url(url_str) {
        Ok(once) => match normalize_url(once.as_str()) {
            Ok(twice) => once == twice,
            Err(_) => false,
        },
        Err(_) => true,
    }
}
