//! Login state machine.
//!
//! One credential postback, an optional device-approval postback, and
//! exactly one terminal result.

use async_trait::async_trait;
use scraper::{Html, Selector};

use crate::form::{fields, FormSnapshot};
use crate::institution::Endpoint;
use crate::operation::{codes, Operation, OperationResult, Status};
use crate::session::Session;
use crate::transport::{Credential, Page, RequestOptions};

pub const LOGIN_TAG: &str = "login";

const LOGIN_BUTTON_VALUE: &str = "Entrar";
const APPROVAL_BUTTON_VALUE: &str = "Acessar o SAGRES Portal";

/// Where a submitted login landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectedState {
    Connected,
    Invalid,
    SessionTimeout,
    Unknown,
}

/// Selectors that identify each login outcome on a response page.
#[derive(Debug, Clone)]
pub struct LoginMarkers {
    pub connected: Vec<String>,
    pub invalid: Vec<String>,
    pub timeout: Vec<String>,
    pub approval: Vec<String>,
}

impl Default for LoginMarkers {
    fn default() -> Self {
        let owned = |list: &[&str]| list.iter().map(|s| s.to_string()).collect();
        Self {
            connected: owned(&[
                r#"span[class="usuario-nome"]"#,
                r#"a[href*="Logout"]"#,
                r#"[id$="lnkSair"]"#,
            ]),
            invalid: owned(&[
                r#"span[id$="FailureText"]"#,
                ".validation-summary-errors",
            ]),
            timeout: owned(&[r#"[id$="SessaoExpirada"]"#]),
            approval: owned(&[r#"input[name="ctl00$btnLogin"]"#]),
        }
    }
}

impl LoginMarkers {
    /// Invalid wins over timeout, which wins over connected.
    pub fn classify(&self, document: &Html) -> ConnectedState {
        if any_match(document, &self.invalid) {
            ConnectedState::Invalid
        } else if any_match(document, &self.timeout) {
            ConnectedState::SessionTimeout
        } else if any_match(document, &self.connected) || self.needs_approval(document) {
            ConnectedState::Connected
        } else {
            ConnectedState::Unknown
        }
    }

    pub fn needs_approval(&self, document: &Html) -> bool {
        any_match(document, &self.approval)
    }
}

fn any_match(document: &Html, selectors: &[String]) -> bool {
    selectors.iter().any(|css| match Selector::parse(css) {
        Ok(selector) => document.select(&selector).next().is_some(),
        Err(_) => {
            tracing::warn!("Ignoring invalid login marker {css:?}");
            false
        }
    })
}

pub struct LoginOperation {
    session: Session,
    username: String,
    password: String,
    captcha_response: Option<String>,
    markers: LoginMarkers,
}

impl LoginOperation {
    pub fn new(session: Session, username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            session,
            username: username.into(),
            password: password.into(),
            captcha_response: None,
            markers: LoginMarkers::default(),
        }
    }

    pub fn with_captcha(mut self, response: Option<String>) -> Self {
        self.captcha_response = response;
        self
    }

    pub fn with_markers(mut self, markers: LoginMarkers) -> Self {
        self.markers = markers;
        self
    }

    /// First postback, built from the deployment's static tokens.
    pub fn credentials_form(&self) -> FormSnapshot {
        let institution = self.session.institution();
        let mut form: FormSnapshot = [
            (fields::EVENT_TARGET, ""),
            (fields::EVENT_ARGUMENT, ""),
            (fields::VIEW_STATE, institution.view_state.as_str()),
            (
                fields::VIEW_STATE_GENERATOR,
                institution.view_state_generator.as_str(),
            ),
            (fields::EVENT_VALIDATION, institution.event_validation.as_str()),
            (fields::LOGIN_USERNAME, self.username.as_str()),
            (fields::LOGIN_PASSWORD, self.password.as_str()),
            (fields::LOGIN_BUTTON, LOGIN_BUTTON_VALUE),
        ]
        .into_iter()
        .collect();
        if institution.captcha.is_some() {
            if let Some(token) = &self.captcha_response {
                form.set(fields::LOGIN_CAPTCHA, token.as_str());
            }
        }
        form
    }

    async fn approve(&self, approval: Page) -> OperationResult<Page> {
        let form = FormSnapshot::from_page(&approval).with(fields::APPROVAL_BUTTON, APPROVAL_BUTTON_VALUE);
        let options = RequestOptions::tagged(LOGIN_TAG).ajax();
        match self.session.post(&approval.url, &form, &options).await {
            Ok(page) if page.is_success() => self.succeed(page),
            Ok(page) => {
                tracing::debug!("Approval postback answered {}", page.status);
                OperationResult::failure(Status::ApprovalError)
                    .with_code(page.status)
                    .with_message("Device approval was rejected")
            }
            Err(e) => OperationResult::network_error(e),
        }
    }

    fn succeed(&self, page: Page) -> OperationResult<Page> {
        self.session
            .http()
            .put_credentials(Some(Credential::new(&self.username, &self.password)));
        OperationResult::success(page.clone())
            .with_code(codes::LOGIN_SUCCESS)
            .with_document(page)
    }
}

fn invalid(code: u16, page: Page) -> OperationResult<Page> {
    OperationResult::failure(Status::InvalidLogin)
        .with_code(code)
        .with_document(page)
}

#[async_trait]
impl Operation for LoginOperation {
    type Output = Page;

    async fn execute(&self) -> OperationResult<Page> {
        let url = self.session.url(Endpoint::Login);
        let form = self.credentials_form();
        let page = match self
            .session
            .post(&url, &form, &RequestOptions::tagged(LOGIN_TAG))
            .await
        {
            Ok(page) => page,
            Err(e) => return OperationResult::network_error(e),
        };
        if !page.is_success() {
            return OperationResult::response_failed(page);
        }

        let (state, approval) = {
            let document = page.document();
            (
                self.markers.classify(&document),
                self.markers.needs_approval(&document),
            )
        };
        tracing::debug!("Login landed in {state:?}");
        match state {
            ConnectedState::Connected if approval => self.approve(page).await,
            ConnectedState::Connected => self.succeed(page),
            ConnectedState::Invalid => invalid(codes::INVALID_LOGIN, page),
            ConnectedState::SessionTimeout => invalid(codes::SESSION_TIMEOUT, page),
            ConnectedState::Unknown => invalid(codes::UNKNOWN_LOGIN_STATE, page),
        }
    }
}
