//! Enrollment demand: listing offers and saving a selection.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;

use crate::error::SagresError;
use crate::form::{fields, FormSnapshot};
use crate::institution::Endpoint;
use crate::model::DemandOffer;
use crate::operation::{Operation, OperationResult, Status};
use crate::parsers::demand::{extract_offers, success_banner, UPDATED_MESSAGE};
use crate::session::Session;
use crate::transport::{Page, RequestOptions};

pub const DEMAND_TAG: &str = "demand";

/// Placeholder the portal expects in empty client-state inputs.
const EMPTY_CLIENT_STATE: &str = "eyJfcmVhbFR5cGUiOnRydWV9";
const SAVE_VALUE: &str = "Salvar";

/// Offers on the demand page together with the page they came from.
#[derive(Debug, Clone)]
pub struct DemandPage {
    pub offers: Vec<DemandOffer>,
    pub page: Page,
}

pub struct LoadDemandOffersOperation {
    session: Session,
}

impl LoadDemandOffersOperation {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    async fn load(&self) -> OperationResult<DemandPage> {
        let options = RequestOptions::tagged(DEMAND_TAG);
        let page = match self.session.fetch(Endpoint::DemandOffers, &options).await {
            Ok(page) if page.is_success() => page,
            Ok(page) => return OperationResult::response_failed(page),
            Err(e) => return OperationResult::network_error(e),
        };
        let offers = extract_offers(&page.document());
        match offers {
            Some(offers) if !offers.is_empty() => {
                tracing::debug!("Demand page lists {} offers", offers.len());
                OperationResult::success(DemandPage {
                    offers,
                    page: page.clone(),
                })
                .with_document(page)
            }
            _ => OperationResult::approval_error("No demand offers on the page").with_document(page),
        }
    }
}

#[async_trait]
impl Operation for LoadDemandOffersOperation {
    type Output = Vec<DemandOffer>;

    async fn execute(&self) -> OperationResult<Vec<DemandOffer>> {
        self.load().await.map(|loaded| loaded.offers)
    }
}

/// Apply the `selected` flag of every `revised` offer, matched by code.
pub fn apply_selection(
    offers: &[DemandOffer],
    revised: &[DemandOffer],
) -> Result<Vec<DemandOffer>, SagresError> {
    let mut by_code: HashMap<&str, Vec<usize>> = HashMap::new();
    for (index, offer) in offers.iter().enumerate() {
        by_code.entry(offer.code.as_str()).or_default().push(index);
    }

    let mut updated = offers.to_vec();
    for wanted in revised {
        match by_code.get(wanted.code.as_str()).map(Vec::as_slice) {
            None | Some([]) => {
                return Err(SagresError::OfferNotFound {
                    code: wanted.code.clone(),
                })
            }
            Some([index]) => updated[*index].selected = wanted.selected,
            Some(many) => {
                return Err(SagresError::OfferAmbiguous {
                    code: wanted.code.clone(),
                    count: many.len(),
                })
            }
        }
    }
    Ok(updated)
}

/// Body of the save postback: one checkbox per offer code (the first offer
/// listed with it) plus the page state.
pub fn demand_form(offers: &[DemandOffer], page: &Page) -> FormSnapshot {
    let mut seen = HashSet::new();
    let mut form: FormSnapshot = offers
        .iter()
        .filter(|offer| seen.insert(offer.code.as_str()))
        .map(|offer| (offer.id.clone(), offer.selected.to_string()))
        .collect();

    let keep_empty = [fields::EVENT_TARGET, fields::EVENT_ARGUMENT, fields::VIEW_STATE];
    for (name, value) in FormSnapshot::from_page(page).iter() {
        if name.ends_with("hfChecked") {
            continue;
        }
        let value = if value.trim().is_empty() && !keep_empty.iter().any(|k| k.eq_ignore_ascii_case(name)) {
            EMPTY_CLIENT_STATE
        } else {
            value
        };
        form.set(name, value);
    }

    form.with(
        fields::SCRIPT_MANAGER,
        format!("{}|{}", fields::MATERIALS_PANEL, fields::DEMAND_SAVE),
    )
    .with(fields::ASYNC_POST, "false")
    .with(fields::DEMAND_SAVE, SAVE_VALUE)
}

pub struct CreateDemandOperation {
    session: Session,
    revised: Vec<DemandOffer>,
}

impl CreateDemandOperation {
    pub fn new(session: Session, revised: Vec<DemandOffer>) -> Self {
        Self { session, revised }
    }
}

#[async_trait]
impl Operation for CreateDemandOperation {
    type Output = String;

    async fn execute(&self) -> OperationResult<String> {
        let loaded = LoadDemandOffersOperation::new(self.session.clone()).load().await;
        if !loaded.is_success() {
            return loaded.propagate();
        }
        let Some(DemandPage { offers, page }) = loaded.into_payload() else {
            return OperationResult::unknown_failure("Load demand had a null response");
        };

        let updated = match apply_selection(&offers, &self.revised) {
            Ok(updated) => updated,
            Err(e) => {
                tracing::warn!("Demand selection rejected: {e}");
                return OperationResult::approval_error(e.to_string()).with_cause(e);
            }
        };

        let form = demand_form(&updated, &page);
        let url = self.session.url(Endpoint::DemandOffers);
        let response = match self
            .session
            .post(&url, &form, &RequestOptions::tagged(DEMAND_TAG))
            .await
        {
            Ok(response) if response.is_success() => response,
            Ok(response) => return OperationResult::response_failed(response),
            Err(e) => return OperationResult::network_error(e),
        };

        let banner = success_banner(&response.document());
        match banner {
            Some(text) if text.to_lowercase().contains(&UPDATED_MESSAGE.to_lowercase()) => {
                OperationResult::success(text.clone()).with_message(text)
            }
            Some(text) => OperationResult::completed(text.clone()).with_message(text),
            None => OperationResult::failure(Status::UnknownFailure)
                .with_message("Success message not found. It's possible it failed")
                .with_document(response),
        }
    }
}
