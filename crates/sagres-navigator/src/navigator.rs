//! Caller-owned entry point.
//!
//! A [`Navigator`] bundles the selected institution, a session (cookie jar,
//! HTTP client, linked-entity caches) and the task executor, and exposes one
//! async method per portal task. Every method resolves to exactly one
//! [`OperationResult`].

use std::path::Path;
use std::sync::Arc;

use scraper::Html;
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::NavigatorConfig;
use crate::cookies::{JsonFileCookiePersistor, PersistentCookieJar};
use crate::error::SagresResult;
use crate::executor::TaskExecutor;
use crate::institution::{Endpoint, Institution, InstitutionRegistry};
use crate::model::{
    ClassSection, DemandOffer, GradesReport, Message, Person, RequestedService, SectionsReport,
    StartPage,
};
use crate::operation::{Operation, OperationResult};
use crate::operations::documents::DOCUMENTS_TAG;
use crate::operations::{
    CreateDemandOperation, DisciplinePipeline, DocumentOperation, DownloadedDocument,
    GradesOperation, ListingSource, LoadDemandOffersOperation, LoginOperation, MeOperation,
    MessagesOperation, PageOperation, SectionFilter,
};
use crate::parsers::section::ClassSectionParser;
use crate::parsers::services::extract_requested_services;
use crate::parsers::start_page::extract_start_page;
use crate::parsers::PageParser;
use crate::session::Session;
use crate::transport::{Credential, Page};

fn start_page(document: &Html) -> Option<StartPage> {
    Some(extract_start_page(document))
}

fn requested_services(document: &Html) -> Option<Vec<RequestedService>> {
    Some(extract_requested_services(document))
}

fn report<T>(task: &str, result: OperationResult<T>) -> OperationResult<T> {
    match result.message() {
        Some(message) => info!("{task}: {} ({message})", result.status()),
        None => info!("{task}: {}", result.status()),
    }
    result
}

pub struct Navigator {
    config: NavigatorConfig,
    session: Session,
    executor: TaskExecutor,
}

impl Navigator {
    /// Build from `config`, resolving the institution in the built-in
    /// registry (plus `config.institutions_file`, if set).
    pub fn new(config: NavigatorConfig) -> SagresResult<Self> {
        let mut registry = InstitutionRegistry::builtin();
        if let Some(path) = &config.institutions_file {
            registry.load_json(path)?;
        }
        let institution = registry.get(&config.institution)?.clone();
        let jar = match &config.cookie_file {
            Some(path) => {
                PersistentCookieJar::with_persistor(Arc::new(JsonFileCookiePersistor::new(path)))
            }
            None => PersistentCookieJar::in_memory(),
        };
        Self::with_parts(config, institution, Arc::new(jar))
    }

    /// Build around an explicit institution and cookie jar.
    pub fn with_parts(
        config: NavigatorConfig,
        institution: Institution,
        jar: Arc<PersistentCookieJar>,
    ) -> SagresResult<Self> {
        info!("Navigator for {} at {}", institution.id, institution.base_url);
        let session = Session::new(institution, &config, jar)?;
        let executor = TaskExecutor::new(config.network_threads, config.disk_threads);
        Ok(Self {
            config,
            session,
            executor,
        })
    }

    pub fn config(&self) -> &NavigatorConfig {
        &self.config
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn executor(&self) -> &TaskExecutor {
        &self.executor
    }

    pub fn selected_institution(&self) -> &Institution {
        self.session.institution()
    }

    /// Run `operation` on the network pool instead of the caller's task.
    pub fn submit<O>(&self, operation: O) -> JoinHandle<SagresResult<OperationResult<O::Output>>>
    where
        O: Operation + 'static,
        O::Output: 'static,
    {
        self.executor
            .spawn_network(async move { operation.execute().await })
    }

    // ── Session ─────────────────────────────────────────────────────────

    pub async fn login(&self, username: &str, password: &str) -> OperationResult<Page> {
        self.login_with_captcha(username, password, None).await
    }

    pub async fn login_with_captcha(
        &self,
        username: &str,
        password: &str,
        captcha_response: Option<String>,
    ) -> OperationResult<Page> {
        info!("Logging in as {username}");
        let operation = LoginOperation::new(self.session.clone(), username, password)
            .with_captcha(captcha_response);
        report("login", operation.execute().await)
    }

    pub fn put_credentials(&self, credential: Option<Credential>) {
        self.session.http().put_credentials(credential);
    }

    /// Drop session cookies, keeping the persisted ones.
    pub fn clear_session(&self) {
        self.session.jar().clear_session();
    }

    /// Abort every request and forget cookies, credentials and cached entities.
    pub fn logout(&self) {
        let cancelled = self.session.http().cancel(&[]);
        self.session.jar().clear();
        self.session.linked().clear();
        self.put_credentials(None);
        info!("Logged out, {cancelled} requests cancelled");
    }

    /// Abort in-flight requests carrying any of `tags`.
    pub fn stop_tags(&self, tags: &[&str]) -> usize {
        self.session.http().cancel(tags)
    }

    // ── Pages ───────────────────────────────────────────────────────────

    pub async fn start_page(&self) -> OperationResult<StartPage> {
        let operation = PageOperation::new(self.session.clone(), Endpoint::Diary, start_page);
        report("start page", operation.execute().await)
    }

    /// Messages printed on the start page.
    pub async fn messages_html(&self) -> OperationResult<Vec<Message>> {
        self.start_page().await.map(|page| page.messages)
    }

    /// Schedule from the start page, extracted by `parser`.
    pub async fn schedule<P>(&self, parser: P) -> OperationResult<P::Output>
    where
        P: PageParser + 'static,
    {
        let operation =
            PageOperation::new(self.session.clone(), Endpoint::Diary, parser).tagged("schedule");
        report("schedule", operation.execute().await)
    }

    pub async fn requested_services(&self) -> OperationResult<Vec<RequestedService>> {
        let operation = PageOperation::new(
            self.session.clone(),
            Endpoint::RequestedServices,
            requested_services,
        )
        .tagged("services");
        report("requested services", operation.execute().await)
    }

    // ── API ─────────────────────────────────────────────────────────────

    pub async fn me(&self) -> OperationResult<Person> {
        report("me", MeOperation::new(self.session.clone()).execute().await)
    }

    pub async fn messages(&self, person_id: i64, fetch_all: bool) -> OperationResult<Vec<Message>> {
        let operation = MessagesOperation::new(self.session.clone(), person_id, fetch_all);
        report("messages", operation.execute().await)
    }

    // ── Grades ──────────────────────────────────────────────────────────

    pub async fn current_grades(&self) -> OperationResult<GradesReport> {
        let operation = GradesOperation::new(self.session.clone(), None);
        report("grades", operation.execute().await)
    }

    pub async fn grades_for_semester(&self, semester_id: i64) -> OperationResult<GradesReport> {
        let operation = GradesOperation::new(self.session.clone(), Some(semester_id));
        report("grades", operation.execute().await)
    }

    // ── Class sections ──────────────────────────────────────────────────

    /// Sections reachable from the start page.
    pub async fn discipline_details(
        &self,
        filter: SectionFilter,
        partial_load: bool,
    ) -> OperationResult<SectionsReport<ClassSection>> {
        let pipeline = DisciplinePipeline::new(
            self.session.clone(),
            ListingSource::StartPage,
            ClassSectionParser,
        )
        .with_filter(filter)
        .partial_load(partial_load);
        report("discipline details", pipeline.execute().await)
    }

    /// Sections of the class selection listing, defaulting to the newest
    /// term when `discover` is set and no term is given.
    pub async fn disciplines(
        &self,
        filter: SectionFilter,
        partial_load: bool,
        discover: bool,
    ) -> OperationResult<SectionsReport<ClassSection>> {
        let pipeline = DisciplinePipeline::new(
            self.session.clone(),
            ListingSource::AllClasses,
            ClassSectionParser,
        )
        .with_filter(filter)
        .partial_load(partial_load)
        .discover(discover);
        report("disciplines", pipeline.execute().await)
    }

    // ── Documents ───────────────────────────────────────────────────────

    pub async fn download_history(&self, destination: &Path) -> OperationResult<DownloadedDocument> {
        self.download(Endpoint::History, destination).await
    }

    pub async fn download_enrollment(
        &self,
        destination: &Path,
    ) -> OperationResult<DownloadedDocument> {
        self.download(Endpoint::EnrollmentCertificate, destination)
            .await
    }

    pub async fn download_flowchart(
        &self,
        destination: &Path,
    ) -> OperationResult<DownloadedDocument> {
        self.download(Endpoint::Flowchart, destination).await
    }

    async fn download(
        &self,
        endpoint: Endpoint,
        destination: &Path,
    ) -> OperationResult<DownloadedDocument> {
        let operation = DocumentOperation::new(self.session.clone(), endpoint, destination)
            .with_executor(self.executor.clone());
        report(DOCUMENTS_TAG, operation.execute().await)
    }

    // ── Demand ──────────────────────────────────────────────────────────

    pub async fn load_demand_offers(&self) -> OperationResult<Vec<DemandOffer>> {
        let operation = LoadDemandOffersOperation::new(self.session.clone());
        report("demand offers", operation.execute().await)
    }

    /// Save the `selected` flag of each offer in `revised`, matched by code.
    pub async fn create_demand_offer(&self, revised: Vec<DemandOffer>) -> OperationResult<String> {
        let operation = CreateDemandOperation::new(self.session.clone(), revised);
        report("demand update", operation.execute().await)
    }
}
