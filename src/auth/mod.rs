//! Authenticator lifecycle (§4.5, §9). `SessionProvider` is the explicit
//! collaborator the redesign notes call for: `apply_to` attaches whatever
//! credential state the configured `AuthType` needs to an outgoing
//! request, and `refresh_if_needed` re-runs a form login after its
//! 30-minute window, so tests can inject a stub instead of timer logic
//! wired straight into the fetcher.

use crate::config::{AuthConfig, AuthType};
use crate::SumiError;
use reqwest::{Client, RequestBuilder};
use std::sync::Mutex;
use std::time::{Duration, Instant};

const FORM_SESSION_TTL: Duration = Duration::from_secs(30 * 60);

/// Parses a Netscape-format cookie file (7 tab-separated fields: domain,
/// flag, path, secure, expiration, name, value) into `(name, value)`
/// pairs, per §6's wire protocol section.
pub fn parse_netscape_cookie_file(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() < 7 {
                return None;
            }
            Some((fields[5].to_string(), fields[6].to_string()))
        })
        .collect()
}

/// Serialises cookies back into the Netscape format for export.
pub fn to_netscape_cookie_file(domain: &str, cookies: &[(String, String)]) -> String {
    let mut out = String::from("# Netscape HTTP Cookie File\n");
    for (name, value) in cookies {
        out.push_str(&format!(
            "{domain}\tTRUE\t/\tFALSE\t0\t{name}\t{value}\n"
        ));
    }
    out
}

struct FormSession {
    cookies: Vec<(String, String)>,
    established_at: Instant,
}

/// Applies authentication state to outgoing requests and, for form
/// logins, knows when the session needs refreshing.
pub struct SessionProvider {
    config: AuthConfig,
    form_session: Mutex<Option<FormSession>>,
    cookie_jar: Vec<(String, String)>,
}

impl SessionProvider {
    pub fn new(config: AuthConfig) -> Self {
        let mut cookie_jar = Vec::new();
        for path in &config.cookie_files {
            if let Ok(content) = std::fs::read_to_string(path) {
                cookie_jar.extend(parse_netscape_cookie_file(&content));
            }
        }
        Self {
            config,
            form_session: Mutex::new(None),
            cookie_jar,
        }
    }

    fn cookie_header(&self) -> Option<String> {
        let mut pairs: Vec<String> = self
            .cookie_jar
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        if let Some(session) = self.form_session.lock().unwrap().as_ref() {
            pairs.extend(session.cookies.iter().map(|(k, v)| format!("{k}={v}")));
        }
        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }

    /// Attaches the configured auth scheme's credentials to `req`.
    pub fn apply_to(&self, req: RequestBuilder) -> RequestBuilder {
        let req = match self.config.auth_type {
            AuthType::Basic => req.basic_auth(
                self.config.username.clone().unwrap_or_default(),
                self.config.password.clone(),
            ),
            AuthType::Bearer => req.bearer_auth(self.config.token.clone().unwrap_or_default()),
            AuthType::Cookie | AuthType::Form => match self.cookie_header() {
                Some(header) => req.header(reqwest::header::COOKIE, header),
                None => req,
            },
            AuthType::None => req,
        };
        let mut req = req;
        for (name, value) in &self.config.custom_headers {
            req = req.header(name, value);
        }
        req
    }

    /// True when a form session exists and is older than the 30-minute
    /// window, or no session has been established yet.
    pub fn needs_refresh(&self) -> bool {
        if self.config.auth_type != AuthType::Form {
            return false;
        }
        match self.form_session.lock().unwrap().as_ref() {
            None => true,
            Some(session) => session.established_at.elapsed() >= FORM_SESSION_TTL,
        }
    }

    /// Performs (or re-performs) the configured form login, recording the
    /// resulting session cookies. `AuthFailure` (§7) is fatal for the
    /// session: the caller should abort the crawl on error.
    pub async fn refresh_if_needed(&self, client: &Client) -> Result<(), SumiError> {
        if !self.needs_refresh() {
            return Ok(());
        }
        let login_url = self
            .config
            .login_url
            .clone()
            .ok_or_else(|| SumiError::AuthFailure("no login-url configured".to_string()))?;

        let response = client
            .post(&login_url)
            .form(&self.config.form_fields)
            .send()
            .await
            .map_err(|e| SumiError::AuthFailure(format!("login request failed: {e}")))?;

        let final_url = response.url().to_string();
        let cookies: Vec<(String, String)> = response
            .cookies()
            .map(|c| (c.name().to_string(), c.value().to_string()))
            .collect();
        let body = response
            .text()
            .await
            .map_err(|e| SumiError::AuthFailure(format!("login response unreadable: {e}")))?;

        let succeeded = self
            .config
            .success_url
            .as_ref()
            .map(|expected| final_url.starts_with(expected.as_str()))
            .unwrap_or(false)
            || self
                .config
                .success_text
                .as_ref()
                .map(|text| body.contains(text.as_str()))
                .unwrap_or(false);

        if !succeeded {
            return Err(SumiError::AuthFailure(
                "form login did not reach success URL or contain success text".to_string(),
            ));
        }

        *self.form_session.lock().unwrap() = Some(FormSession {
            cookies,
            established_at: Instant::now(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with_type(auth_type: AuthType) -> AuthConfig {
        AuthConfig {
            auth_type,
            ..Default::default()
        }
    }

    #[test]
    fn test_netscape_cookie_parse_roundtrip() {
        let content = "example.com\tTRUE\t/\tFALSE\t0\tsession\tabc123\n";
        let cookies = parse_netscape_cookie_file(content);
        assert_eq!(cookies, vec![("session".to_string(), "abc123".to_string())]);
    }

    #[test]
    fn test_netscape_cookie_ignores_comments_and_blanks() {
        let content = "# comment\n\nexample.com\tTRUE\t/\tFALSE\t0\ta\tb\n";
        assert_eq!(parse_netscape_cookie_file(content).len(), 1);
    }

    #[test]
    fn test_to_netscape_roundtrips() {
        let cookies = vec![("a".to_string(), "b".to_string())];
        let out = to_netscape_cookie_file("example.com", &cookies);
        let parsed = parse_netscape_cookie_file(&out);
        assert_eq!(parsed, cookies);
    }

    #[test]
    fn test_needs_refresh_true_without_session() {
        let provider = SessionProvider::new(config_with_type(AuthType::Form));
        assert!(provider.needs_refresh());
    }

    #[test]
    fn test_needs_refresh_false_for_non_form_auth() {
        let provider = SessionProvider::new(config_with_type(AuthType::Basic));
        assert!(!provider.needs_refresh());
    }

    #[test]
    fn test_needs_refresh_false_within_ttl() {
        let provider = SessionProvider::new(config_with_type(AuthType::Form));
        *provider.form_session.lock().unwrap() = Some(FormSession {
            cookies: Vec::new(),
            established_at: Instant::now(),
        });
        assert!(!provider.needs_refresh());
    }

    #[test]
    fn test_needs_refresh_true_after_ttl() {
        let provider = SessionProvider::new(config_with_type(AuthType::Form));
        *provider.form_session.lock().unwrap() = Some(FormSession {
            cookies: Vec::new(),
            established_at: Instant::now() - FORM_SESSION_TTL - Duration::from_secs(1),
        });
        assert!(provider.needs_refresh());
    }

    #[test]
    fn test_cookie_header_combines_jar_and_session() {
        let mut config = config_with_type(AuthType::Cookie);
        config.cookie_files = Vec::new();
        let provider = SessionProvider::new(config);
        assert_eq!(provider.cookie_header(), None);
    }

    #[test]
    fn test_custom_headers_applied() {
        let mut config = config_with_type(AuthType::None);
        let mut headers = HashMap::new();
        headers.insert("X-Api-Key".to_string(), "secret".to_string());
        config.custom_headers = headers;
        let provider = SessionProvider::new(config);
        let client = Client::new();
        let req = provider.apply_to(client.get("https://example.com/"));
        let built = req.build().unwrap();
        assert_eq!(
            built.headers().get("X-Api-Key").map(|v| v.to_str().unwrap()),
            Some("secret")
        );
    }
}
