//! A live connection to one Sagres deployment.
//!
//! The session owns the cookie jar, the HTTP client and the linked-entity
//! caches. It is cheap to clone; clones share all state, so independent
//! operations can run concurrently over the same login.

use std::sync::Arc;

use crate::config::NavigatorConfig;
use crate::cookies::PersistentCookieJar;
use crate::error::SagresResult;
use crate::form::FormSnapshot;
use crate::institution::{Endpoint, Institution};
use crate::linked::LinkedEntities;
use crate::transport::{HttpClient, Page, RequestOptions};

#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    institution: Institution,
    http: HttpClient,
    jar: Arc<PersistentCookieJar>,
    linked: LinkedEntities,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("institution", &self.inner.institution.id)
            .field("cookies", &self.inner.jar.len())
            .finish()
    }
}

impl Session {
    pub fn new(
        institution: Institution,
        config: &NavigatorConfig,
        jar: Arc<PersistentCookieJar>,
    ) -> SagresResult<Self> {
        let http = HttpClient::new(config, jar.clone())?;
        Ok(Self {
            inner: Arc::new(SessionInner {
                institution,
                http,
                jar,
                linked: LinkedEntities::default(),
            }),
        })
    }

    pub fn institution(&self) -> &Institution {
        &self.inner.institution
    }

    pub fn http(&self) -> &HttpClient {
        &self.inner.http
    }

    pub fn jar(&self) -> &PersistentCookieJar {
        &self.inner.jar
    }

    pub fn linked(&self) -> &LinkedEntities {
        &self.inner.linked
    }

    /// Absolute URL of `endpoint` on the selected deployment.
    pub fn url(&self, endpoint: Endpoint) -> String {
        self.inner.institution.url(endpoint)
    }

    pub async fn fetch(&self, endpoint: Endpoint, options: &RequestOptions) -> SagresResult<Page> {
        self.get(&self.url(endpoint), options).await
    }

    pub async fn get(&self, url: &str, options: &RequestOptions) -> SagresResult<Page> {
        self.inner.http.get(url, options).await
    }

    /// Submit `form` as a postback to `url`.
    pub async fn post(
        &self,
        url: &str,
        form: &FormSnapshot,
        options: &RequestOptions,
    ) -> SagresResult<Page> {
        self.inner.http.post_form(url, form.fields(), options).await
    }
}
