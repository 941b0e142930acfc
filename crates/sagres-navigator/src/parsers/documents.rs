//! Report pages that embed a downloadable document.

use scraper::Html;
use url::Url;

use super::first_in;

const CANDIDATES: [(&str, &str); 4] = [
    ("iframe[src]", "src"),
    ("embed[src]", "src"),
    (r#"a[href$=".pdf"]"#, "href"),
    (r#"a[href*="ReportViewer"]"#, "href"),
];

/// Absolute URL of the document a report page points to.
pub fn find_document_link(document: &Html, page_url: &str) -> Option<String> {
    let raw = CANDIDATES.iter().find_map(|(css, attr)| {
        first_in(document, css)
            .and_then(|el| el.attr(attr))
            .map(str::trim)
            .filter(|link| !link.is_empty() && !link.starts_with("javascript:"))
    })?;
    let base = Url::parse(page_url).ok()?;
    base.join(raw).ok().map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "http://portal.test/Portal/Modules/Diario/Aluno/Relatorio/HistoricoEscolar.aspx";

    #[test]
    fn test_relative_iframe() {
        let doc = Html::parse_document(r#"<iframe src="../../../../Reports/Historico.pdf?id=9"></iframe>"#);
        assert_eq!(
            find_document_link(&doc, URL).as_deref(),
            Some("http://portal.test/Portal/Reports/Historico.pdf?id=9")
        );
    }

    #[test]
    fn test_anchor_fallback_and_absence() {
        let doc = Html::parse_document(r#"<a href="/files/fluxograma.pdf">baixar</a>"#);
        assert_eq!(
            find_document_link(&doc, URL).as_deref(),
            Some("http://portal.test/files/fluxograma.pdf")
        );
        assert!(find_document_link(&Html::parse_document("<p>nada</p>"), URL).is_none());
    }
}
