//! Report card page (`Boletim.aspx`).

use scraper::{ElementRef, Html};

use super::{child_elements, first, first_in, selector, text_of};
use crate::model::{CourseVariant, Grade, GradeInfo, SemesterCode};

const SEMESTER_SELECT: &str = r#"select[id="ctl00_MasterPlaceHolder_ddPeriodosLetivos_ddPeriodosLetivos"]"#;
const VARIANT_SELECT: &str = r#"select[id="ctl00_MasterPlaceHolder_ddRegistroCurso"]"#;
const SELECTED_OPTION: &str = r#"option[selected]"#;

pub(crate) const CONTAINER: &str = r#"div[id="divBoletins"] div[class="boletim-container"]"#;
pub(crate) const TITLE: &str =
    r#"div[class="boletim-item-info"] span[class="boletim-item-titulo cor-destaque"]"#;

const DEFAULT_GROUPING_NAME: &str = "Notas";

/// Terms offered by the period selector, in page order.
pub fn semester_codes(document: &Html) -> Vec<SemesterCode> {
    let Some(select) = first_in(document, SEMESTER_SELECT) else {
        return Vec::new();
    };
    select
        .select(&selector("option"))
        .filter_map(|option| {
            let id = option.attr("value")?.trim().parse::<i64>().ok()?;
            Some(SemesterCode::new(id, text_of(option)))
        })
        .collect()
}

/// Currently selected term. A lone selected option anywhere on the page
/// wins; otherwise the period selector's own selection is used.
pub fn selected_semester(document: &Html) -> Option<i64> {
    let selected: Vec<ElementRef<'_>> = document.select(&selector(SELECTED_OPTION)).collect();
    let option = if selected.len() == 1 {
        selected[0]
    } else {
        let select = first_in(document, SEMESTER_SELECT)?;
        first(select, SELECTED_OPTION)?
    };
    option.attr("value")?.trim().parse().ok()
}

/// Enrollment records offered when the student has more than one.
pub fn course_variants(document: &Html) -> Vec<CourseVariant> {
    let Some(select) = first_in(document, VARIANT_SELECT) else {
        return Vec::new();
    };
    child_elements(select)
        .into_iter()
        .filter_map(|option| {
            let id = option.attr("value")?.trim().parse::<i64>().ok()?;
            Some(CourseVariant {
                id,
                label: text_of(option),
            })
        })
        .collect()
}

/// Whether the page renders report cards directly.
pub fn can_extract_grades(document: &Html) -> bool {
    first_in(document, CONTAINER).is_some()
}

pub fn extract_grades(document: &Html, semester_id: i64) -> Vec<Grade> {
    document
        .select(&selector(CONTAINER))
        .filter_map(|container| extract_grade(container, semester_id))
        .collect()
}

fn extract_grade(container: ElementRef<'_>, semester_id: i64) -> Option<Grade> {
    let discipline = text_of(first(container, TITLE)?);
    let notes = first(container, r#"div[class="boletim-notas"]"#)?;
    let table = first(notes, "table")?;
    let body = first(table, "tbody")?;

    let mut grade = Grade {
        semester_id,
        discipline,
        partial_mean: None,
        final_score: None,
        values: Vec::new(),
    };

    let mut grouping = 1;
    let mut grouping_name = DEFAULT_GROUPING_NAME.to_string();
    for row in body.select(&selector("tr")) {
        let cells = child_elements(row);
        match cells.len() {
            4 if child_elements(cells[0]).is_empty() => {
                grade.partial_mean = Some(text_of(cells[2]));
            }
            4 => {
                let weight = text_of(cells[3]).parse::<f64>().unwrap_or(1.0);
                grade.values.push(GradeInfo {
                    name: text_of(cells[1]),
                    score: text_of(cells[2]),
                    date: text_of(cells[0]),
                    weight,
                    grouping,
                    grouping_name: grouping_name.clone(),
                });
            }
            3 if has_class(row, "boletim-linha-destaque") => grouping += 1,
            2 => {
                let heading = cells[1];
                let children = child_elements(heading);
                if heading.value().name() == "th"
                    && children.len() == 1
                    && children[0].value().name() == "span"
                {
                    grouping_name = text_of(children[0]);
                }
            }
            _ => {}
        }
    }

    if let Some(row) = first(table, "tfoot tr") {
        let cells = child_elements(row);
        if cells.len() == 4 {
            let score = text_of(cells[2]);
            grade.final_score = Some(if score == "-" { "0.0".to_string() } else { score });
        }
    }
    Some(grade)
}

fn has_class(element: ElementRef<'_>, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}
