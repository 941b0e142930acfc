//! Navigator configuration and environment resolution.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{SagresError, SagresResult};

/// Default user agent sent with every request.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) \
                                      AppleWebKit/537.36 (KHTML, like Gecko) \
                                      Chrome/131.0.0.0 Safari/537.36";

/// Default institution when nothing else is configured.
pub const DEFAULT_INSTITUTION: &str = "UEFS";

/// Runtime settings for a [`Navigator`](crate::navigator::Navigator).
#[derive(Debug, Clone)]
pub struct NavigatorConfig {
    /// Selected institution id.
    pub institution: String,
    /// Where cookies are persisted. `None` keeps them in memory only.
    pub cookie_file: Option<PathBuf>,
    /// Connect, read and write timeout.
    pub timeout: Duration,
    /// Maximum redirects followed per request.
    pub max_redirects: usize,
    pub user_agent: String,
    /// Permits of the network pool.
    pub network_threads: usize,
    /// Permits of the disk pool.
    pub disk_threads: usize,
    /// Extra institutions to merge into the built-in registry.
    pub institutions_file: Option<PathBuf>,
}

impl Default for NavigatorConfig {
    fn default() -> Self {
        Self {
            institution: DEFAULT_INSTITUTION.to_string(),
            cookie_file: Some(default_cookie_file()),
            timeout: Duration::from_secs(60),
            max_redirects: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            network_threads: 8,
            disk_threads: 2,
            institutions_file: None,
        }
    }
}

impl NavigatorConfig {
    /// Defaults overridden by `SAGRES_*` environment variables.
    pub fn from_env() -> SagresResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reading from an arbitrary source.
    pub fn from_lookup<F>(lookup: F) -> SagresResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(institution) = lookup("SAGRES_INSTITUTION") {
            config.institution = institution;
        }
        if let Some(path) = lookup("SAGRES_COOKIE_FILE") {
            config.cookie_file = if path.is_empty() || path == "memory" {
                None
            } else {
                Some(PathBuf::from(path))
            };
        }
        if let Some(secs) = lookup("SAGRES_TIMEOUT_SECS") {
            config.timeout = Duration::from_secs(parse_number("SAGRES_TIMEOUT_SECS", &secs)?);
        }
        if let Some(n) = lookup("SAGRES_NETWORK_THREADS") {
            config.network_threads = parse_number("SAGRES_NETWORK_THREADS", &n)?.max(1) as usize;
        }
        if let Some(n) = lookup("SAGRES_DISK_THREADS") {
            config.disk_threads = parse_number("SAGRES_DISK_THREADS", &n)?.max(1) as usize;
        }
        if let Some(path) = lookup("SAGRES_INSTITUTIONS_FILE") {
            config.institutions_file = Some(PathBuf::from(path));
        }

        Ok(config)
    }

    pub fn with_institution(mut self, institution: &str) -> Self {
        self.institution = institution.to_string();
        self
    }

    pub fn with_cookie_file(mut self, path: Option<&Path>) -> Self {
        self.cookie_file = path.map(Path::to_path_buf);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

fn parse_number(key: &str, value: &str) -> SagresResult<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|_| SagresError::Config(format!("{key} must be a number, got '{value}'")))
}

/// `~/.sagres/cookies.json`, falling back to the working directory.
pub fn default_cookie_file() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".sagres")
        .join("cookies.json")
}
