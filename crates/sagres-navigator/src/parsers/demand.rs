//! Enrollment demand page (`Demanda.aspx`).

use scraper::Html;

use super::listing::split_title;
use super::{child_elements, digits, first, first_in, selector, text_of};
use crate::model::DemandOffer;

const OFFERS_TABLE: &str = r#"table[id$="gvDemanda"]"#;
const SUCCESS_BANNER: &str = r#"span[class="msg-sucesso anim-fadeIn"]"#;

/// Text that marks a fully applied demand update.
pub const UPDATED_MESSAGE: &str = "O registro foi atualizado com sucesso";

/// Offers listed on the page. `None` when the page has no offers table,
/// which the portal renders outside the demand window.
pub fn extract_offers(document: &Html) -> Option<Vec<DemandOffer>> {
    let table = first_in(document, OFFERS_TABLE)?;
    let mut offers = Vec::new();
    for row in table.select(&selector("tr")) {
        let cells = child_elements(row);
        if cells.len() < 3 {
            continue;
        }
        let Some(checkbox) = first(cells[0], r#"input[type="checkbox"][name]"#) else {
            continue;
        };
        let Some(id) = checkbox.attr("name") else {
            continue;
        };
        let (code, name) = split_title(&text_of(cells[1]));
        let (code, name) = if name.is_empty() {
            (code, text_of(cells[2]))
        } else {
            (code, name)
        };
        offers.push(DemandOffer {
            id: id.to_string(),
            code,
            name,
            hours: cells.get(3).and_then(|c| digits(&text_of(*c))),
            selected: checkbox.attr("checked").is_some(),
        });
    }
    Some(offers)
}

/// Text of the confirmation banner shown after saving, if any.
pub fn success_banner(document: &Html) -> Option<String> {
    first_in(document, SUCCESS_BANNER).map(text_of)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offers_table() {
        let doc = Html::parse_document(
            r#"<table id="ctl00_MasterPlaceHolder_gvDemanda">
                 <tr><th></th><th>Código</th><th>Nome</th><th>CH</th></tr>
                 <tr><td><input type="checkbox" name="ctl00$gvDemanda$ctl02$chk" checked="checked"></td>
                     <td>EXA801</td><td>Cálculo I</td><td>60</td></tr>
                 <tr><td><input type="checkbox" name="ctl00$gvDemanda$ctl03$chk"></td>
                     <td>LET101 - Leitura</td><td></td><td>30h</td></tr>
               </table>"#,
        );
        let offers = extract_offers(&doc).unwrap();
        assert_eq!(offers.len(), 2);
        assert!(offers[0].selected);
        assert_eq!(offers[0].name, "Cálculo I");
        assert_eq!(offers[1].code, "LET101");
        assert_eq!(offers[1].name, "Leitura");
        assert_eq!(offers[1].hours, Some(30));
        assert!(!offers[1].selected);
    }

    #[test]
    fn test_missing_table_and_banner() {
        let doc = Html::parse_document(r#"<span class="msg-sucesso anim-fadeIn"> O registro foi atualizado com sucesso. </span>"#);
        assert!(extract_offers(&doc).is_none());
        assert!(success_banner(&doc).unwrap().contains(UPDATED_MESSAGE));
    }
}
