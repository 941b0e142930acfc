//! Multi-hop scrape of every class section on a listing page.
//!
//! listing page → one postback per matching section → (second hop to the
//! class page) → parse → one popup postback per lecture with materials.
//! A section that fails at any hop is counted and skipped; only a failing
//! listing aborts the whole run.

use async_trait::async_trait;
use base64::Engine;
use serde_json::json;

use crate::error::SagresResult;
use crate::form::{fields, FormSnapshot};
use crate::institution::Endpoint;
use crate::model::{ClassSection, Material, SectionsReport, SemesterCode};
use crate::operation::{Operation, OperationResult};
use crate::parsers::listing::{all_classes_entries, listing_semesters, start_page_entries, ListingEntry};
use crate::parsers::materials::extract_materials;
use crate::parsers::PageParser;
use crate::session::Session;
use crate::transport::{Page, RequestOptions};

pub const DISCIPLINES_TAG: &str = "disciplines";

const SUBMIT_VALUE: &str = "Exibir";
const ALL_ROWS: &str = "0";

/// Extra popup state the material postback expects alongside the hidden fields.
const MATERIAL_POPUP_STATE: [(&str, &str); 8] = [
    (
        "_ajax_ctl00_MasterPlaceHolder_dwForm_context",
        "(objctl00_MasterPlaceHolder_dwForm 0)(21890 )((currentrow 0)(sortString '?'))",
    ),
    ("_ajax_ctl00_MasterPlaceHolder_dwForm_client", "(scrollbar 0 0)"),
    (
        "_ajax_ctl00_MasterPlaceHolder_ucPopupConsultaMaterialApoio_dwForm_context",
        "(objctl00_MasterPlaceHolder_ucPopupConsultaMaterialApoio_dwForm 0)(22022 )((sortString 'anx_ds_anexo A'))",
    ),
    (
        "_ajax_ctl00_MasterPlaceHolder_ucPopupConsultaMaterialApoio_dwForm_client",
        "(scrollbar 0 0)",
    ),
    (
        "__ctl00_MasterPlaceHolder_pvMaterialApoio_ClientStateInput",
        "eyJfcmVhbFR5cGUiOnRydWUsInNob3ckX2luc2VydE5ld1JvdyI6ZmFsc2V9",
    ),
    (
        "__ctl00_MasterPlaceHolder_ucPopupConsultaMaterialApoio_ClientStateInput",
        "eyJfcmVhbFR5cGUiOnRydWV9",
    ),
    (
        "__ctl00_MasterPlaceHolder_ucPopupConsultaPlanoAula_PopupView1_ClientStateInput",
        "eyJfcmVhbFR5cGUiOnRydWV9",
    ),
    (
        "ctl00$HeaderPlaceHolder$ucCabecalhoClasse$PainelRetratil1_ClientState",
        "true",
    ),
];

/// Which listing the sections are discovered on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingSource {
    /// Cards of the student start page.
    StartPage,
    /// The class selection table, which also lists past terms.
    AllClasses,
}

/// Optional term / code / group predicate over listing entries.
#[derive(Debug, Clone, Default)]
pub struct SectionFilter {
    pub semester: Option<String>,
    pub code: Option<String>,
    pub group: Option<String>,
}

impl SectionFilter {
    pub fn matches(&self, entry: &ListingEntry) -> bool {
        let same = |wanted: &Option<String>, actual: &str| {
            wanted
                .as_deref()
                .map_or(true, |w| w.trim().eq_ignore_ascii_case(actual.trim()))
        };
        same(&self.semester, &entry.semester)
            && same(&self.code, &entry.code)
            && (self.group.is_none() || same(&self.group, entry.group.as_deref().unwrap_or("")))
    }
}

/// Parsed resources that reference sub-resources fetched by extra postbacks.
pub trait Attachments {
    /// `(index, link)` of every item that still needs its attachments.
    fn pending_attachments(&self) -> Vec<(usize, String)>;

    fn attach(&mut self, index: usize, materials: Vec<Material>);
}

impl Attachments for ClassSection {
    fn pending_attachments(&self) -> Vec<(usize, String)> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.material_count > 0)
            .filter_map(|(index, item)| item.material_link.clone().map(|link| (index, link)))
            .collect()
    }

    fn attach(&mut self, index: usize, materials: Vec<Material>) {
        if let Some(item) = self.items.get_mut(index) {
            item.materials = materials;
        }
    }
}

/// Client-state payload that opens the material popup for `link`.
pub fn material_client_state(link: &str) -> String {
    let state = json!({
        "_realType": true,
        "showForm": true,
        "popupLinkColumn": "cpt_material_apoio",
        "retrieveArguments": link,
    });
    base64::engine::general_purpose::STANDARD.encode(state.to_string())
}

/// Listing page plus what was discovered on it.
struct Listing {
    url: String,
    form: FormSnapshot,
    entries: Vec<ListingEntry>,
    semesters: Vec<SemesterCode>,
}

pub struct DisciplinePipeline<P> {
    session: Session,
    source: ListingSource,
    filter: SectionFilter,
    partial_load: bool,
    discover: bool,
    parser: P,
}

impl<P> DisciplinePipeline<P>
where
    P: PageParser,
    P::Output: Attachments,
{
    pub fn new(session: Session, source: ListingSource, parser: P) -> Self {
        Self {
            session,
            source,
            filter: SectionFilter::default(),
            partial_load: false,
            discover: false,
            parser,
        }
    }

    pub fn with_filter(mut self, filter: SectionFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Parse the first postback response directly, skipping the second hop
    /// and the attachments.
    pub fn partial_load(mut self, partial: bool) -> Self {
        self.partial_load = partial;
        self
    }

    /// Restrict to the newest term on the listing when no term is given.
    pub fn discover(mut self, discover: bool) -> Self {
        self.discover = discover;
        self
    }

    fn options() -> RequestOptions {
        RequestOptions::tagged(DISCIPLINES_TAG)
    }

    async fn listing(&self) -> Result<Listing, OperationResult<SectionsReport<P::Output>>> {
        let (url, page) = match self.source {
            ListingSource::StartPage => {
                let url = self.session.url(Endpoint::Diary);
                let page = self.fetch_ok(self.session.get(&url, &Self::options()).await)?;
                (url, page)
            }
            ListingSource::AllClasses => {
                let url = self.session.url(Endpoint::AllDisciplines);
                let first = self.fetch_ok(self.session.get(&url, &Self::options()).await)?;
                let form = FormSnapshot::from_page(&first).mutate(&[
                    (fields::ALL_CLASSES_ROWS, ALL_ROWS),
                    (fields::ALL_CLASSES_SUBMIT, SUBMIT_VALUE),
                    (fields::ALL_CLASSES_PERIOD, ""),
                    (fields::ALL_CLASSES_NAME, ""),
                ]);
                let page = self.fetch_ok(self.session.post(&url, &form, &Self::options()).await)?;
                (url, page)
            }
        };

        let document = page.document();
        let entries = match self.source {
            ListingSource::StartPage => start_page_entries(&document),
            ListingSource::AllClasses => all_classes_entries(&document),
        };
        Ok(Listing {
            url,
            form: FormSnapshot::harvest(&document),
            semesters: listing_semesters(&entries),
            entries,
        })
    }

    fn fetch_ok(
        &self,
        fetched: SagresResult<Page>,
    ) -> Result<Page, OperationResult<SectionsReport<P::Output>>> {
        match fetched {
            Ok(page) if page.is_success() => Ok(page),
            Ok(page) => Err(OperationResult::response_failed(page)),
            Err(e) => Err(OperationResult::from_error(e)),
        }
    }

    /// Entries to submit, after the term discovery and the filter.
    fn selected<'a>(&self, listing: &'a Listing) -> Vec<&'a ListingEntry> {
        let mut filter = self.filter.clone();
        if filter.semester.is_none() && self.discover {
            filter.semester = listing.semesters.first().map(|s| s.label.clone());
            tracing::debug!("Discovered term {:?}", filter.semester);
        }
        listing.entries.iter().filter(|e| filter.matches(e)).collect()
    }

    fn section_form(&self, listing: &Listing, entry: &ListingEntry) -> FormSnapshot {
        let form = listing.form.postback(&entry.event_target, &entry.event_argument);
        match self.source {
            ListingSource::StartPage => form,
            ListingSource::AllClasses => form.mutate(&[
                (fields::ALL_CLASSES_NAME, ""),
                (fields::ALL_CLASSES_ROWS, ALL_ROWS),
            ]),
        }
    }

    /// Every hop of one section. `None` counts as a failure.
    async fn scrape(&self, listing: &Listing, entry: &ListingEntry) -> Option<P::Output> {
        let options = Self::options();
        let form = self.section_form(listing, entry);
        let first = self.hop(&listing.url, &form, &options, entry).await?;

        let class_page = if self.partial_load {
            first
        } else {
            let params = FormSnapshot::from_page(&first).with(fields::ROWS_PER_PAGE, ALL_ROWS);
            let url = self.session.url(Endpoint::ClassPage);
            self.hop(&url, &params, &options, entry).await?
        };

        let parsed = {
            let document = class_page.document();
            self.parser.parse(&document)
        };
        let Some(mut resource) = parsed else {
            tracing::warn!("Section {} {:?} could not be parsed", entry.code, entry.group);
            return None;
        };
        if !self.partial_load {
            self.fetch_attachments(&class_page, &mut resource).await;
        }
        Some(resource)
    }

    async fn hop(
        &self,
        url: &str,
        form: &FormSnapshot,
        options: &RequestOptions,
        entry: &ListingEntry,
    ) -> Option<Page> {
        match self.session.post(url, form, options).await {
            Ok(page) if page.is_success() => Some(page),
            Ok(page) => {
                tracing::warn!("Section {} answered {} at {url}", entry.code, page.status);
                None
            }
            Err(e) => {
                tracing::warn!("Section {} failed at {url}: {e}", entry.code);
                None
            }
        }
    }

    async fn fetch_attachments(&self, class_page: &Page, resource: &mut P::Output) {
        let url = self.session.url(Endpoint::ClassPage);
        let base = FormSnapshot::from_page(class_page);
        for (index, link) in resource.pending_attachments() {
            let mut form = base
                .mutate(&[(fields::ROWS_PER_PAGE, ALL_ROWS)])
                .mutate(&MATERIAL_POPUP_STATE);
            form.set(fields::CLIENT_STATE, material_client_state(&link));
            form.set(
                fields::SCRIPT_MANAGER,
                format!("{}|{}", fields::MATERIALS_PANEL, fields::MATERIALS_VIEW),
            );
            form.set(fields::EVENT_TARGET, fields::MATERIALS_VIEW);
            form.set(fields::EVENT_ARGUMENT, "true");
            form.set(fields::ASYNC_POST, "false");

            match self.session.post(&url, &form, &Self::options()).await {
                Ok(page) if page.is_success() => {
                    let materials = extract_materials(&page.document());
                    resource.attach(index, materials);
                }
                Ok(page) => tracing::warn!("Material popup answered {}", page.status),
                Err(e) => tracing::warn!("Material popup failed: {e}"),
            }
        }
    }
}

#[async_trait]
impl<P> Operation for DisciplinePipeline<P>
where
    P: PageParser + 'static,
    P::Output: Attachments + 'static,
{
    type Output = SectionsReport<P::Output>;

    async fn execute(&self) -> OperationResult<Self::Output> {
        let listing = match self.listing().await {
            Ok(listing) => listing,
            Err(failed) => return failed,
        };
        let selected = self.selected(&listing);
        tracing::debug!(
            "{} of {} listed sections selected",
            selected.len(),
            listing.entries.len()
        );

        let mut sections = Vec::new();
        let mut failure_count = 0;
        for entry in selected {
            match self.scrape(&listing, entry).await {
                Some(section) => sections.push(section),
                None => failure_count += 1,
            }
        }
        if failure_count > 0 {
            tracing::warn!("{failure_count} sections failed to load");
        }

        OperationResult::completed(SectionsReport {
            sections,
            failure_count,
            semesters: listing.semesters,
        })
    }
}
