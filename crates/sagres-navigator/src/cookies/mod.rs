//! Cookie jar with optional durable persistence.

pub mod cache;
pub mod cookie;
pub mod jar;
pub mod persistor;

pub use cache::CookieCache;
pub use cookie::{Cookie, CookieKey};
pub use jar::PersistentCookieJar;
pub use persistor::{CookiePersistor, JsonFileCookiePersistor, MemoryCookiePersistor};
