//! Thread-safe cookie jar wired into reqwest.
//!
//! The jar keeps the live cookie set behind a read-write lock and mirrors
//! persistent cookies into an optional [`CookiePersistor`]. Persistor calls
//! happen after the lock is released and are best effort: failures are
//! logged and never reach the request that triggered them. On a
//! multi-threaded runtime they run through `block_in_place`, since reqwest
//! calls the jar from its worker threads.

use std::sync::{Arc, RwLock};

use chrono::Utc;
use reqwest::header::HeaderValue;
use tokio::runtime::{Handle, RuntimeFlavor};
use url::Url;

use super::cache::CookieCache;
use super::cookie::Cookie;
use super::persistor::CookiePersistor;
use crate::error::SagresResult;

pub struct PersistentCookieJar {
    cache: RwLock<CookieCache>,
    persistor: Option<Arc<dyn CookiePersistor>>,
}

impl std::fmt::Debug for PersistentCookieJar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentCookieJar")
            .field("cookies", &self.len())
            .field("persistent", &self.persistor.is_some())
            .finish()
    }
}

impl PersistentCookieJar {
    /// Jar that never touches disk.
    pub fn in_memory() -> Self {
        Self {
            cache: RwLock::new(CookieCache::new()),
            persistor: None,
        }
    }

    /// Jar seeded from `persistor`.
    pub fn with_persistor(persistor: Arc<dyn CookiePersistor>) -> Self {
        let jar = Self {
            cache: RwLock::new(CookieCache::new()),
            persistor: Some(persistor),
        };
        jar.reload();
        jar
    }

    /// Record cookies set by a response from `url`.
    pub fn save_from_response(&self, url: &Url, cookies: Vec<Cookie>) {
        if cookies.is_empty() {
            return;
        }
        let persistent: Vec<Cookie> = cookies.iter().filter(|c| c.is_persistent()).cloned().collect();
        {
            let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
            cache.add_all(cookies);
        }
        tracing::trace!("Stored cookies from {url}");

        if !persistent.is_empty() {
            self.persist("persist cookies", |p| p.save_all(&persistent));
        }
    }

    /// Cookies to send to `url`. Expired cookies are purged from memory and
    /// from the persistor on the way.
    pub fn load_for_request(&self, url: &Url) -> Vec<Cookie> {
        let now = Utc::now();
        let (expired, valid) = {
            let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
            let expired = cache.drain_where(|c| c.is_expired(now));
            let valid: Vec<Cookie> = cache.iter().filter(|c| c.matches(url)).cloned().collect();
            (expired, valid)
        };

        if !expired.is_empty() {
            tracing::debug!("Purged {} expired cookies", expired.len());
            self.persist("remove expired cookies", |p| p.remove_all(&expired));
        }
        valid
    }

    /// Drop the live cookie set and reload it from the persistor.
    pub fn clear_session(&self) {
        self.cache
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        self.reload();
    }

    /// Wipe both the live set and the persistor.
    pub fn clear(&self) {
        self.cache
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        self.persist("clear persisted cookies", |p| p.clear());
    }

    /// Value of the first live cookie called `name`.
    pub fn value_of(&self, name: &str) -> Option<String> {
        self.cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .find(name)
            .map(|c| c.value.clone())
    }

    pub fn len(&self) -> usize {
        self.cache.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn reload(&self) {
        let Some(persistor) = &self.persistor else {
            return;
        };
        match off_worker(|| persistor.load_all()) {
            Ok(cookies) => {
                let count = cookies.len();
                self.cache
                    .write()
                    .unwrap_or_else(|e| e.into_inner())
                    .add_all(cookies);
                tracing::debug!("Loaded {count} persisted cookies");
            }
            Err(e) => tracing::warn!("Failed to load persisted cookies: {e}"),
        }
    }

    fn persist<F>(&self, action: &str, work: F)
    where
        F: FnOnce(&dyn CookiePersistor) -> SagresResult<()>,
    {
        let Some(persistor) = &self.persistor else {
            return;
        };
        if let Err(e) = off_worker(|| work(persistor.as_ref())) {
            tracing::warn!("Failed to {action}: {e}");
        }
    }
}

/// Run blocking persistor I/O without stalling a multi-threaded runtime worker.
fn off_worker<T>(work: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(work)
        }
        _ => work(),
    }
}

impl reqwest::cookie::CookieStore for PersistentCookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let cookies: Vec<Cookie> = cookie_headers
            .filter_map(|h| h.to_str().ok())
            .filter_map(|h| Cookie::parse_set_cookie(h, url))
            .collect();
        self.save_from_response(url, cookies);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        let header = self
            .load_for_request(url)
            .iter()
            .map(Cookie::pair)
            .collect::<Vec<_>>()
            .join("; ");
        if header.is_empty() {
            return None;
        }
        HeaderValue::from_str(&header).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cookies::persistor::{JsonFileCookiePersistor, MemoryCookiePersistor};
    use reqwest::cookie::CookieStore;

    fn url() -> Url {
        Url::parse("http://portal.test/Portal/Acesso.aspx").unwrap()
    }

    fn parse(header: &str) -> Cookie {
        Cookie::parse_set_cookie(header, &url()).unwrap()
    }

    #[test]
    fn test_only_persistent_cookies_reach_persistor() {
        let persistor = Arc::new(MemoryCookiePersistor::new());
        let jar = PersistentCookieJar::with_persistor(persistor.clone());
        jar.save_from_response(&url(), vec![parse("s=1"), parse("p=1; Max-Age=600")]);

        assert_eq!(jar.len(), 2);
        let stored = persistor.load_all().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].name, "p");
    }

    #[test]
    fn test_expired_cookies_are_purged_everywhere() {
        let persistor = Arc::new(MemoryCookiePersistor::new());
        let mut stale = parse("old=1; Max-Age=600");
        stale.expires_at = Some(Utc::now() - chrono::Duration::hours(1));
        persistor.save_all(&[stale]).unwrap();

        let jar = PersistentCookieJar::with_persistor(persistor.clone());
        jar.save_from_response(&url(), vec![parse("fresh=1")]);
        assert_eq!(jar.len(), 2);

        let sent = jar.load_for_request(&url());
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].name, "fresh");
        assert_eq!(jar.len(), 1);
        assert!(persistor.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_clear_session_reloads_persisted() {
        let persistor = Arc::new(MemoryCookiePersistor::new());
        let jar = PersistentCookieJar::with_persistor(persistor.clone());
        jar.save_from_response(&url(), vec![parse("s=1"), parse("p=1; Max-Age=600")]);

        jar.clear_session();
        assert_eq!(jar.len(), 1);
        assert_eq!(jar.value_of("p").as_deref(), Some("1"));

        jar.clear();
        assert!(jar.is_empty());
        assert!(persistor.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_same_identity_keeps_latest_value() {
        let persistor = Arc::new(MemoryCookiePersistor::new());
        let jar = PersistentCookieJar::with_persistor(persistor.clone());
        jar.save_from_response(&url(), vec![parse("p=old; Max-Age=600")]);
        jar.save_from_response(&url(), vec![parse("p=new; Max-Age=600"), parse("s=1")]);
        jar.save_from_response(&url(), vec![parse("s=2")]);

        assert_eq!(jar.len(), 2);
        assert_eq!(jar.value_of("p").as_deref(), Some("new"));
        assert_eq!(jar.value_of("s").as_deref(), Some("2"));
        let stored = persistor.load_all().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].value, "new");

        // a different path is a different identity
        let other = Cookie::parse_set_cookie("s=3; Path=/Portal/Modules", &url()).unwrap();
        jar.save_from_response(&url(), vec![other]);
        assert_eq!(jar.len(), 3);
    }

    #[test]
    fn test_concurrent_saves_keep_one_cookie_per_identity() {
        let jar = Arc::new(PersistentCookieJar::with_persistor(Arc::new(
            MemoryCookiePersistor::new(),
        )));
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let jar = jar.clone();
                std::thread::spawn(move || {
                    for round in 0..50 {
                        jar.save_from_response(
                            &url(),
                            vec![
                                parse(&format!("shared={worker}-{round}; Max-Age=600")),
                                parse(&format!("own{worker}={round}")),
                            ],
                        );
                        let sent = jar.load_for_request(&url());
                        assert_eq!(sent.iter().filter(|c| c.name == "shared").count(), 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(jar.len(), 9);
        let sent = jar.load_for_request(&url());
        let mut keys: Vec<_> = sent.iter().map(Cookie::key).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), sent.len());
        assert_eq!(jar.value_of("own3").as_deref(), Some("49"));
        assert!(jar.value_of("shared").unwrap().ends_with("-49"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_file_persistence_from_runtime_worker() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.json");
        let jar = PersistentCookieJar::with_persistor(Arc::new(JsonFileCookiePersistor::new(&path)));
        let header = HeaderValue::from_static("SagresLembrar=maria; Max-Age=600");
        jar.set_cookies(&mut std::iter::once(&header), &url());

        let reloaded = PersistentCookieJar::with_persistor(Arc::new(JsonFileCookiePersistor::new(&path)));
        assert_eq!(reloaded.value_of("SagresLembrar").as_deref(), Some("maria"));
    }

    #[test]
    fn test_cookie_store_header() {
        let jar = PersistentCookieJar::in_memory();
        let header = HeaderValue::from_static("ASP.NET_SessionId=abc; path=/");
        jar.set_cookies(&mut std::iter::once(&header), &url());

        let sent = jar.cookies(&url()).unwrap();
        assert_eq!(sent.to_str().unwrap(), "ASP.NET_SessionId=abc");
        assert!(jar
            .cookies(&Url::parse("http://other.test/").unwrap())
            .is_none());
    }
}
