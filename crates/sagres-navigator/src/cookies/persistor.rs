//! Durable storage for persistent cookies.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::cookie::{Cookie, CookieKey};
use crate::error::SagresResult;

/// Storage backend for cookies that outlive the process.
///
/// Implementations are called outside the jar's lock and must be safe to
/// call from any thread.
pub trait CookiePersistor: Send + Sync {
    fn load_all(&self) -> SagresResult<Vec<Cookie>>;
    /// Upsert by cookie identity.
    fn save_all(&self, cookies: &[Cookie]) -> SagresResult<()>;
    fn remove_all(&self, cookies: &[Cookie]) -> SagresResult<()>;
    fn clear(&self) -> SagresResult<()>;
}

/// Persistor that keeps cookies for the lifetime of the value.
#[derive(Debug, Default)]
pub struct MemoryCookiePersistor {
    cookies: Mutex<HashMap<CookieKey, Cookie>>,
}

impl MemoryCookiePersistor {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CookiePersistor for MemoryCookiePersistor {
    fn load_all(&self) -> SagresResult<Vec<Cookie>> {
        let guard = self.cookies.lock().unwrap_or_else(|e| e.into_inner());
        Ok(guard.values().cloned().collect())
    }

    fn save_all(&self, cookies: &[Cookie]) -> SagresResult<()> {
        let mut guard = self.cookies.lock().unwrap_or_else(|e| e.into_inner());
        for cookie in cookies {
            guard.insert(cookie.key(), cookie.clone());
        }
        Ok(())
    }

    fn remove_all(&self, cookies: &[Cookie]) -> SagresResult<()> {
        let mut guard = self.cookies.lock().unwrap_or_else(|e| e.into_inner());
        for cookie in cookies {
            guard.remove(&cookie.key());
        }
        Ok(())
    }

    fn clear(&self) -> SagresResult<()> {
        self.cookies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        Ok(())
    }
}

/// Persistor backed by a JSON file, rewritten atomically on every change.
#[derive(Debug)]
pub struct JsonFileCookiePersistor {
    path: PathBuf,
    /// Serializes read-modify-write cycles on the file.
    io: Mutex<()>,
}

impl JsonFileCookiePersistor {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> SagresResult<HashMap<CookieKey, Cookie>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(HashMap::new());
        }
        let cookies: Vec<Cookie> = serde_json::from_str(&content)?;
        Ok(cookies.into_iter().map(|c| (c.key(), c)).collect())
    }

    fn write(&self, cookies: &HashMap<CookieKey, Cookie>) -> SagresResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut sorted: Vec<&Cookie> = cookies.values().collect();
        sorted.sort_by(|a, b| a.key().cmp(&b.key()));
        let json = serde_json::to_string_pretty(&sorted)?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl CookiePersistor for JsonFileCookiePersistor {
    fn load_all(&self) -> SagresResult<Vec<Cookie>> {
        let _io = self.io.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.read()?.into_values().collect())
    }

    fn save_all(&self, cookies: &[Cookie]) -> SagresResult<()> {
        if cookies.is_empty() {
            return Ok(());
        }
        let _io = self.io.lock().unwrap_or_else(|e| e.into_inner());
        let mut stored = self.read()?;
        for cookie in cookies {
            stored.insert(cookie.key(), cookie.clone());
        }
        self.write(&stored)
    }

    fn remove_all(&self, cookies: &[Cookie]) -> SagresResult<()> {
        if cookies.is_empty() {
            return Ok(());
        }
        let _io = self.io.lock().unwrap_or_else(|e| e.into_inner());
        let mut stored = self.read()?;
        let before = stored.len();
        for cookie in cookies {
            stored.remove(&cookie.key());
        }
        if stored.len() == before {
            return Ok(());
        }
        self.write(&stored)
    }

    fn clear(&self) -> SagresResult<()> {
        let _io = self.io.lock().unwrap_or_else(|e| e.into_inner());
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use url::Url;

    fn cookie(header: &str) -> Cookie {
        Cookie::parse_set_cookie(header, &Url::parse("http://h.test/").unwrap()).unwrap()
    }

    #[test]
    fn test_json_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let persistor = JsonFileCookiePersistor::new(dir.path().join("nested").join("c.json"));

        assert!(persistor.load_all().unwrap().is_empty());
        persistor
            .save_all(&[cookie("a=1; Max-Age=600"), cookie("b=1; Max-Age=600")])
            .unwrap();
        persistor.save_all(&[cookie("a=2; Max-Age=600")]).unwrap();

        let reopened = JsonFileCookiePersistor::new(persistor.path());
        let mut loaded = reopened.load_all().unwrap();
        loaded.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].value, "2");

        reopened.remove_all(&[cookie("b=x")]).unwrap();
        assert_eq!(reopened.load_all().unwrap().len(), 1);

        reopened.clear().unwrap();
        assert!(!persistor.path().exists());
    }

    #[test]
    fn test_memory_persistor() {
        let persistor = MemoryCookiePersistor::new();
        persistor.save_all(&[cookie("a=1")]).unwrap();
        persistor.save_all(&[cookie("a=2")]).unwrap();
        assert_eq!(persistor.load_all().unwrap()[0].value, "2");
        persistor.remove_all(&[cookie("a=9")]).unwrap();
        assert!(persistor.load_all().unwrap().is_empty());
    }
}
