//! Stored cookie representation and `Set-Cookie` parsing.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// A cookie as held by the jar and written to the persistor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    /// Domain without a leading dot.
    pub domain: String,
    pub path: String,
    /// `None` for session cookies.
    pub expires_at: Option<DateTime<Utc>>,
    pub secure: bool,
    pub http_only: bool,
    /// Set when the cookie had no `Domain` attribute.
    pub host_only: bool,
}

/// Identity of a cookie: two cookies with the same key replace each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CookieKey {
    pub name: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub host_only: bool,
}

impl Cookie {
    /// Parse a `Set-Cookie` header value received from `url`.
    ///
    /// Returns `None` for malformed headers and for cookies whose `Domain`
    /// does not cover the responding host.
    pub fn parse_set_cookie(header: &str, url: &Url) -> Option<Cookie> {
        let parsed = cookie::Cookie::parse(header.to_string()).ok()?;
        let host = url.host_str()?.to_ascii_lowercase();

        let (domain, host_only) = match parsed.domain() {
            Some(d) if !d.trim_start_matches('.').is_empty() => {
                let d = d.trim_start_matches('.').to_ascii_lowercase();
                if !domain_matches(&host, &d) {
                    return None;
                }
                (d, false)
            }
            _ => (host, true),
        };

        let path = match parsed.path() {
            Some(p) if p.starts_with('/') => p.to_string(),
            _ => default_path(url),
        };

        let expires_at = if let Some(max_age) = parsed.max_age() {
            let secs = max_age.whole_seconds();
            if secs <= 0 {
                Utc.timestamp_opt(0, 0).single()
            } else {
                Some(Utc::now() + chrono::Duration::seconds(secs))
            }
        } else {
            parsed
                .expires_datetime()
                .and_then(|at| Utc.timestamp_opt(at.unix_timestamp(), 0).single())
        };

        Some(Cookie {
            name: parsed.name().to_string(),
            value: parsed.value().to_string(),
            domain,
            path,
            expires_at,
            secure: parsed.secure().unwrap_or(false),
            http_only: parsed.http_only().unwrap_or(false),
            host_only,
        })
    }

    pub fn key(&self) -> CookieKey {
        CookieKey {
            name: self.name.clone(),
            domain: self.domain.clone(),
            path: self.path.clone(),
            secure: self.secure,
            host_only: self.host_only,
        }
    }

    /// Persistent cookies carry an expiry; session cookies live in memory only.
    pub fn is_persistent(&self) -> bool {
        self.expires_at.is_some()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// Whether this cookie should be sent with a request to `url`.
    pub fn matches(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();

        let domain_ok = if self.host_only {
            host == self.domain
        } else {
            domain_matches(&host, &self.domain)
        };
        if !domain_ok {
            return false;
        }
        if self.secure && url.scheme() != "https" {
            return false;
        }
        path_matches(url.path(), &self.path)
    }

    /// `name=value` as sent in a `Cookie` header.
    pub fn pair(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain
        || (host.len() > domain.len()
            && host.ends_with(domain)
            && host.as_bytes()[host.len() - domain.len() - 1] == b'.')
}

fn path_matches(request_path: &str, cookie_path: &str) -> bool {
    if request_path == cookie_path {
        return true;
    }
    request_path.starts_with(cookie_path)
        && (cookie_path.ends_with('/')
            || request_path.as_bytes().get(cookie_path.len()) == Some(&b'/'))
}

/// Directory of the request path, as used when `Path` is absent.
fn default_path(url: &Url) -> String {
    let path = url.path();
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}
