//! Support-material popup of a lecture.

use scraper::Html;

use super::{child_elements, first, selector, text_of};
use crate::model::Material;

/// Files listed in the material popup. Rows without a link are skipped.
pub fn extract_materials(document: &Html) -> Vec<Material> {
    let mut materials = Vec::new();
    for row in document.select(&selector(r#"[id*="MaterialApoio"] tr"#)) {
        let Some(link) = first(row, "a[href]") else {
            continue;
        };
        let href = link.attr("href").unwrap_or_default().trim().to_string();
        if href.is_empty() || href.starts_with('#') {
            continue;
        }
        let cells = child_elements(row);
        let name = cells
            .first()
            .map(|cell| text_of(*cell))
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| text_of(link));
        materials.push(Material { name, link: href });
    }
    materials
}
