//! Requested services page (`SolicitacaoServico.aspx`).

use scraper::Html;

use super::{child_elements, selector, text_of};
use crate::model::RequestedService;

/// Rows of the requests table: type, date, status and an optional note.
pub fn extract_requested_services(document: &Html) -> Vec<RequestedService> {
    document
        .select(&selector(r#"table[id$="gvSolicitacoes"] tr"#))
        .filter_map(|row| {
            let cells = child_elements(row);
            if cells.len() < 3 || cells[0].value().name() != "td" {
                return None;
            }
            Some(RequestedService {
                kind: text_of(cells[0]),
                date: text_of(cells[1]),
                status: text_of(cells[2]),
                observation: cells.get(3).map(|c| text_of(*c)).filter(|o| !o.is_empty()),
            })
        })
        .collect()
}
