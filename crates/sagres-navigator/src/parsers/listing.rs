//! Class-section listings: the start page cards and the "all classes" table.
//!
//! Each selectable section on a listing is a `__doPostBack` link. Discovery
//! returns one [`ListingEntry`] per link, carrying the postback pair that the
//! pipeline merges into the page's hidden fields.

use scraper::{ElementRef, Html};

use super::{child_elements, first, selector, text_of};
use crate::form::parse_do_postback;
use crate::model::SemesterCode;

/// One postback-reachable class section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub semester: String,
    pub code: String,
    pub name: String,
    /// Class group (`"T01"`), when the listing names one.
    pub group: Option<String>,
    pub event_target: String,
    pub event_argument: String,
}

/// Cards of the start page (`Default.aspx`).
pub fn start_page_entries(document: &Html) -> Vec<ListingEntry> {
    let mut entries = Vec::new();
    for card in document.select(&selector(r#"section[class="webpart-aluno-item"]"#)) {
        let semester = first(card, r#"span[class="webpart-aluno-periodo"]"#)
            .map(text_of)
            .unwrap_or_default();
        let Some(title) = first(card, r#"a[class="webpart-aluno-nome cor-destaque"]"#) else {
            continue;
        };
        let (code, name) = split_title(&text_of(title));

        let groups: Vec<ElementRef<'_>> = card.select(&selector("ul li a[href]")).collect();
        if groups.is_empty() {
            if let Some(entry) = entry(title, &semester, &code, &name, None) {
                entries.push(entry);
            }
            continue;
        }
        for link in groups {
            let group = group_label(&text_of(link));
            if let Some(entry) = entry(link, &semester, &code, &name, Some(group)) {
                entries.push(entry);
            }
        }
    }
    entries
}

/// Rows of the class selection table (`SelecaoClasse.aspx`): period,
/// `CODE - Name`, group, and a select link in the last cell.
pub fn all_classes_entries(document: &Html) -> Vec<ListingEntry> {
    let mut entries = Vec::new();
    for row in document.select(&selector(r#"table[id$="gvClasses"] tr"#)) {
        let cells = child_elements(row);
        if cells.len() < 4 {
            continue;
        }
        let Some(link) = first(cells[cells.len() - 1], r#"a[href*="__doPostBack"]"#) else {
            continue;
        };
        let (code, name) = split_title(&text_of(cells[1]));
        let group = text_of(cells[2]);
        let group = (!group.is_empty()).then_some(group);
        if let Some(entry) = entry(link, &text_of(cells[0]), &code, &name, group) {
            entries.push(entry);
        }
    }
    entries
}

/// Distinct terms of a listing, newest first.
pub fn listing_semesters(entries: &[ListingEntry]) -> Vec<SemesterCode> {
    let mut codes: Vec<SemesterCode> = Vec::new();
    for entry in entries {
        if let Some(code) = SemesterCode::from_label(&entry.semester) {
            if !codes.contains(&code) {
                codes.push(code);
            }
        }
    }
    crate::model::sort_newest_first(&mut codes);
    codes
}

fn entry(
    link: ElementRef<'_>,
    semester: &str,
    code: &str,
    name: &str,
    group: Option<String>,
) -> Option<ListingEntry> {
    let (event_target, event_argument) = parse_do_postback(link.attr("href")?)?;
    Some(ListingEntry {
        semester: semester.to_string(),
        code: code.to_string(),
        name: name.to_string(),
        group,
        event_target,
        event_argument,
    })
}

/// `"EXA801 - Cálculo I"` → `("EXA801", "Cálculo I")`.
pub(crate) fn split_title(title: &str) -> (String, String) {
    match title.split_once('-') {
        Some((code, name)) => (code.trim().to_string(), name.trim().to_string()),
        None => (title.trim().to_string(), String::new()),
    }
}

/// `"T01 - Teórica (30h)"` → `"T01"`.
fn group_label(text: &str) -> String {
    let without_hours = match text.rfind('(') {
        Some(pos) => &text[..pos],
        None => text,
    };
    without_hours
        .split('-')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}
