//! Absences listed under each report card.

use scraper::{ElementRef, Html};

use super::grades::{CONTAINER, TITLE};
use super::{child_elements, first, selector, text_of};
use crate::model::MissedClass;

/// Group used when the table does not name its class groups.
const UNNAMED_GROUP: &str = "inv";

pub fn extract_missed_classes(document: &Html, semester_id: i64) -> Vec<MissedClass> {
    let mut values = Vec::new();
    for container in document.select(&selector(CONTAINER)) {
        let Some(title) = first(container, TITLE) else {
            continue;
        };
        let title = text_of(title);
        let code = title
            .split_once('-')
            .map(|(code, _)| code.trim().to_string())
            .unwrap_or_default();
        let Some(table) = first(container, r#"div[class="boletim-frequencia"] table"#) else {
            continue;
        };

        let grouped = grouped_rows(table, &code, semester_id);
        values.extend(grouped.unwrap_or_else(|| ungrouped_rows(table, &code, semester_id)));
    }
    values
}

/// Tables alternate a heading naming the group with the body listing its
/// absences. `None` when the table does not follow that shape.
fn grouped_rows(table: ElementRef<'_>, code: &str, semester_id: i64) -> Option<Vec<MissedClass>> {
    let parts: Vec<ElementRef<'_>> = child_elements(table).into_iter().skip(1).collect();
    if parts.len() % 2 != 0 {
        return None;
    }
    let mut result = Vec::new();
    for pair in parts.chunks(2) {
        let (head, body) = (pair[0], pair[1]);
        let group = first(head, "span")
            .map(text_of)
            .unwrap_or_default()
            .split('-')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        for row in body.select(&selector("tr")) {
            result.push(absence(row, code, semester_id, &group)?);
        }
    }
    Some(result)
}

fn ungrouped_rows(table: ElementRef<'_>, code: &str, semester_id: i64) -> Vec<MissedClass> {
    table
        .select(&selector("tbody tr"))
        .filter_map(|row| absence(row, code, semester_id, UNNAMED_GROUP))
        .collect()
}

fn absence(row: ElementRef<'_>, code: &str, semester_id: i64, group: &str) -> Option<MissedClass> {
    let cell = *child_elements(row).first()?;
    let wrapper = *child_elements(cell).first()?;
    let information = child_elements(wrapper);
    if information.len() < 2 {
        return None;
    }
    Some(MissedClass {
        semester_id,
        discipline_code: code.to_string(),
        group: group.to_string(),
        date: text_of(information[0]),
        description: text_of(information[1]),
    })
}
