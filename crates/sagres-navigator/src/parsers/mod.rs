//! Page parsers.
//!
//! Parsers are synchronous functions over a parsed [`Html`] document. They
//! never fail hard: missing structure yields `None` or an empty list, and the
//! calling operation decides which status that maps to.

pub mod demand;
pub mod documents;
pub mod grades;
pub mod listing;
pub mod materials;
pub mod messages;
pub mod missed_classes;
pub mod section;
pub mod services;
pub mod start_page;

use scraper::{ElementRef, Html, Selector};

/// Extracts one entity from a fetched page.
pub trait PageParser: Send + Sync {
    type Output: Send;

    fn parse(&self, document: &Html) -> Option<Self::Output>;
}

impl<F, T> PageParser for F
where
    F: Fn(&Html) -> Option<T> + Send + Sync,
    T: Send,
{
    type Output = T;

    fn parse(&self, document: &Html) -> Option<T> {
        self(document)
    }
}

/// Compile a selector known to be valid at build time.
pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector is valid")
}

/// Text content with runs of whitespace collapsed, trimmed.
pub(crate) fn text_of(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Element children, skipping text and comment nodes.
pub(crate) fn child_elements(element: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    element.children().filter_map(ElementRef::wrap).collect()
}

/// First match of `css` under `element`.
pub(crate) fn first<'a>(element: ElementRef<'a>, css: &str) -> Option<ElementRef<'a>> {
    element.select(&selector(css)).next()
}

/// First match of `css` in `document`.
pub(crate) fn first_in<'a>(document: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    document.select(&selector(css)).next()
}

/// Digits of `raw` read as a number.
pub(crate) fn digits(raw: &str) -> Option<u32> {
    let only: String = raw.chars().filter(char::is_ascii_digit).collect();
    only.parse().ok()
}

/// `"JOÃO DA SILVA"` → `"João Da Silva"`.
pub(crate) fn title_case(raw: &str) -> String {
    raw.split_whitespace()
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(c) => c.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_helpers() {
        let html = Html::parse_fragment("<p>  Nota \n  final <b>8,5</b> </p>");
        let p = first_in(&html, "p").unwrap();
        assert_eq!(text_of(p), "Nota final 8,5");
        assert_eq!(child_elements(p).len(), 1);
        assert_eq!(digits("60 horas"), Some(60));
        assert_eq!(digits("-"), None);
        assert_eq!(title_case("JOÃO  da SILVA"), "João Da Silva");
    }

    #[test]
    fn test_closures_are_parsers() {
        let parser = |doc: &Html| first_in(doc, "h1").map(text_of);
        let doc = Html::parse_document("<h1>Horário</h1>");
        assert_eq!(parser.parse(&doc).as_deref(), Some("Horário"));
    }
}
