//! Student start page (`Default.aspx`).

use scraper::Html;

use super::listing::{listing_semesters, start_page_entries};
use super::messages::extract_messages;
use super::{first_in, text_of, title_case};
use crate::model::StartPage;

pub fn extract_start_page(document: &Html) -> StartPage {
    let entries = start_page_entries(document);
    StartPage {
        student_name: first_in(document, r#"span[class="usuario-nome"]"#)
            .map(|span| title_case(&text_of(span)))
            .filter(|name| !name.is_empty()),
        semesters: listing_semesters(&entries),
        messages: extract_messages(document),
        demand_open: first_in(document, r#"a[href*="Matricula/Demanda.aspx"]"#).is_some(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_page_summary() {
        let doc = Html::parse_document(
            r#"<span class="usuario-nome">ANA LIMA</span>
               <a href="/Portal/Modules/Diario/Aluno/Matricula/Demanda.aspx">Demanda</a>
               <section class="webpart-aluno-item">
                 <span class="webpart-aluno-periodo">2019.1</span>
                 <a class="webpart-aluno-nome cor-destaque" href="javascript:__doPostBack('a','')">EXA801 - Cálculo I</a>
               </section>
               <article><p class="recado-texto">Bem-vindos</p></article>"#,
        );
        let page = extract_start_page(&doc);
        assert_eq!(page.student_name.as_deref(), Some("Ana Lima"));
        assert!(page.demand_open);
        assert_eq!(page.semesters.len(), 1);
        assert_eq!(page.messages.len(), 1);
    }
}
