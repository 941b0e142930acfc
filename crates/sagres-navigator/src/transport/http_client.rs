//! Async HTTP client wrapping reqwest.
//!
//! Every request is registered under an optional tag so callers can abort
//! whole groups of requests, shares the session cookie jar, and carries a
//! Basic-Auth header whenever credentials have been cached.

use std::path::Path;
use std::sync::{Arc, RwLock};

use reqwest::header::{ACCEPT, AUTHORIZATION, CACHE_CONTROL};
use reqwest::RequestBuilder;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;

use super::page::Page;
use super::registry::RequestRegistry;
use crate::config::NavigatorConfig;
use crate::cookies::PersistentCookieJar;
use crate::error::{SagresError, SagresResult};

/// Username and password cached after a successful login.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Per-request knobs.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Cancellation group of the request.
    pub tag: Option<String>,
    /// Mark the request as an AJAX postback.
    pub ajax: bool,
    /// Explicit `Authorization` header. Suppresses the cached Basic-Auth.
    pub authorization: Option<String>,
}

impl RequestOptions {
    pub fn tagged(tag: &str) -> Self {
        Self {
            tag: Some(tag.to_string()),
            ..Self::default()
        }
    }

    pub fn ajax(mut self) -> Self {
        self.ajax = true;
        self
    }
}

/// HTTP client shared by every operation of a session.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    registry: Arc<RequestRegistry>,
    credential: Arc<RwLock<Option<Credential>>>,
}

impl HttpClient {
    /// Build a client that stores cookies in `jar`.
    pub fn new(config: &NavigatorConfig, jar: Arc<PersistentCookieJar>) -> SagresResult<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .user_agent(&config.user_agent)
            .cookie_provider(jar)
            .build()?;

        Ok(Self {
            client,
            registry: Arc::new(RequestRegistry::new()),
            credential: Arc::new(RwLock::new(None)),
        })
    }

    pub fn registry(&self) -> &RequestRegistry {
        &self.registry
    }

    /// Cache (or forget, with `None`) the Basic-Auth credential.
    pub fn put_credentials(&self, credential: Option<Credential>) {
        *self.credential.write().unwrap_or_else(|e| e.into_inner()) = credential;
    }

    pub fn credential(&self) -> Option<Credential> {
        self.credential
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Abort in-flight requests with any of `tags`; all of them when empty.
    pub fn cancel(&self, tags: &[&str]) -> usize {
        self.registry.cancel(tags)
    }

    pub async fn get(&self, url: &str, options: &RequestOptions) -> SagresResult<Page> {
        tracing::debug!("GET {url}");
        let builder = self.client.get(url);
        self.execute(builder, options).await
    }

    /// POST an `application/x-www-form-urlencoded` body.
    pub async fn post_form(
        &self,
        url: &str,
        form_fields: &[(String, String)],
        options: &RequestOptions,
    ) -> SagresResult<Page> {
        tracing::debug!("POST {url} ({} fields)", form_fields.len());
        let builder = self.client.post(url).form(form_fields);
        self.execute(builder, options).await
    }

    /// Stream the body of `url` into a temporary file beside `dest`.
    ///
    /// Nothing at `dest` is touched until the returned download is
    /// committed. A failed or cancelled transfer drops the temporary file.
    pub async fn download(
        &self,
        url: &str,
        dest: &Path,
        options: &RequestOptions,
    ) -> SagresResult<PendingDownload> {
        tracing::debug!("DOWNLOAD {url} -> {}", dest.display());
        let builder = self.prepare(self.client.get(url), options);
        let guard = self.registry.register(options.tag.as_deref());
        let token = guard.token().clone();

        tokio::select! {
            biased;
            _ = token.cancelled() => Err(SagresError::Cancelled),
            pending = Self::stream_to_temp(builder, dest) => pending,
        }
    }

    async fn execute(&self, builder: RequestBuilder, options: &RequestOptions) -> SagresResult<Page> {
        let builder = self.prepare(builder, options);
        let guard = self.registry.register(options.tag.as_deref());
        let token = guard.token().clone();

        tokio::select! {
            biased;
            _ = token.cancelled() => Err(SagresError::Cancelled),
            page = Self::read_page(builder) => page,
        }
    }

    fn prepare(&self, builder: RequestBuilder, options: &RequestOptions) -> RequestBuilder {
        let mut builder = builder.header(CACHE_CONTROL, "no-cache");
        if options.ajax {
            builder = builder.header("x-requested-with", "XMLHttpRequest");
        }
        if let Some(auth) = &options.authorization {
            builder.header(AUTHORIZATION, auth)
        } else if let Some(credential) = self.credential() {
            builder
                .basic_auth(&credential.username, Some(&credential.password))
                .header(ACCEPT, "application/json")
        } else {
            builder
        }
    }

    async fn read_page(builder: RequestBuilder) -> SagresResult<Page> {
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let url = response.url().to_string();
        let body = response.text().await?;
        Ok(Page { url, status, body })
    }

    async fn stream_to_temp(builder: RequestBuilder, dest: &Path) -> SagresResult<PendingDownload> {
        let mut response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SagresError::Status {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        let dir = match dest.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let temp = tempfile::Builder::new()
            .prefix(".sagres-")
            .suffix(".part")
            .tempfile_in(dir)?;
        let mut file = tokio::fs::File::from_std(temp.as_file().try_clone()?);
        let mut bytes = 0u64;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            bytes += chunk.len() as u64;
        }
        file.flush().await?;
        Ok(PendingDownload { file: temp, bytes })
    }
}

/// A fully received download waiting to replace its destination.
#[derive(Debug)]
pub struct PendingDownload {
    file: NamedTempFile,
    pub bytes: u64,
}

impl PendingDownload {
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Sync to disk and rename over `dest`. Blocking.
    pub fn commit(self, dest: &Path) -> SagresResult<u64> {
        self.file.as_file().sync_all()?;
        self.file.persist(dest).map_err(|e| e.error)?;
        Ok(self.bytes)
    }
}
