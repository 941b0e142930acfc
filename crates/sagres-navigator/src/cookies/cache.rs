//! In-memory cookie set keyed by cookie identity.

use std::collections::HashMap;

use super::cookie::{Cookie, CookieKey};

/// Live cookies of a session. Adding a cookie with an existing identity
/// replaces the stored one.
#[derive(Debug, Default, Clone)]
pub struct CookieCache {
    cookies: HashMap<CookieKey, Cookie>,
}

impl CookieCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_all<I>(&mut self, cookies: I)
    where
        I: IntoIterator<Item = Cookie>,
    {
        for cookie in cookies {
            self.cookies.insert(cookie.key(), cookie);
        }
    }

    /// Remove and return every cookie matching `predicate`.
    pub fn drain_where<F>(&mut self, mut predicate: F) -> Vec<Cookie>
    where
        F: FnMut(&Cookie) -> bool,
    {
        let keys: Vec<CookieKey> = self
            .cookies
            .iter()
            .filter(|(_, c)| predicate(c))
            .map(|(k, _)| k.clone())
            .collect();
        keys.into_iter()
            .filter_map(|k| self.cookies.remove(&k))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cookie> {
        self.cookies.values()
    }

    /// First cookie with the given name, regardless of domain or path.
    pub fn find(&self, name: &str) -> Option<&Cookie> {
        self.cookies.values().find(|c| c.name == name)
    }

    pub fn clear(&mut self) {
        self.cookies.clear();
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    #[test]
    fn test_same_identity_replaces() {
        let u = Url::parse("http://h.test/").unwrap();
        let mut cache = CookieCache::new();
        cache.add_all(Cookie::parse_set_cookie("s=1", &u));
        cache.add_all(Cookie::parse_set_cookie("s=2", &u));
        cache.add_all(Cookie::parse_set_cookie("t=1", &u));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.find("s").unwrap().value, "2");
    }

    #[test]
    fn test_drain_where() {
        let u = Url::parse("http://h.test/").unwrap();
        let mut cache = CookieCache::new();
        cache.add_all(Cookie::parse_set_cookie("a=1", &u));
        cache.add_all(Cookie::parse_set_cookie("b=1", &u));
        let drained = cache.drain_where(|c| c.name == "a");
        assert_eq!(drained.len(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.find("a").is_none());
    }
}
