//! Class section details (`ConsultaAulas.aspx`).

use scraper::{ElementRef, Html};

use super::{child_elements, digits, first, first_in, selector, text_of, title_case, PageParser};
use crate::model::{ClassItem, ClassSection, ClassTime};

const NO_SUBJECT: &str = "Não cadastrada";

/// Parses a class page into a [`ClassSection`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassSectionParser;

impl PageParser for ClassSectionParser {
    type Output = ClassSection;

    fn parse(&self, document: &Html) -> Option<ClassSection> {
        extract_class_section(document)
    }
}

pub fn extract_class_section(document: &Html) -> Option<ClassSection> {
    let heading = text_of(first_in(document, r#"h2[class="cabecalho-titulo"]"#)?);
    let code_end = heading.find('-')?;
    let group_start = heading.rfind('(').filter(|pos| *pos > code_end)?;

    let code = heading[..code_end].trim().to_string();
    let name = heading[code_end + 1..group_start].trim().to_string();
    let group_part = heading[group_start..]
        .trim_start_matches('(')
        .trim_end_matches(')');
    let group = match group_part.rfind('-') {
        Some(pos) => group_part[pos + 1..].trim().to_string(),
        None => group_part.trim().to_string(),
    };

    let mut section = ClassSection {
        code,
        name,
        group,
        ..ClassSection::default()
    };

    section.teacher = first_in(document, r#"div[class="cabecalho-dado nome-capitalizars"] span"#)
        .map(|span| title_case(&text_of(span)))
        .filter(|t| !t.is_empty());

    for field in document.select(&selector(r#"div[class="cabecalho-dado"]"#)) {
        let children = child_elements(field);
        let Some(label) = children.first().map(|c| text_of(*c)) else {
            continue;
        };
        let value = children.get(1).map(|c| text_of(*c)).unwrap_or_default();
        match label.to_lowercase().as_str() {
            "período:" => section.semester = value,
            "carga horária:" if section.credits.is_none() => section.credits = digits(&value),
            "limite de faltas:" => section.miss_limit = digits(&value),
            "período de aulas:" => section.period = first(field, "span").map(text_of),
            "departamento:" => section.department = Some(title_case(&value)),
            "horário:" => section.schedule = class_times(field),
            _ => {}
        }
    }

    section.items = extract_class_items(document);
    Some(section)
}

fn class_times(field: ElementRef<'_>) -> Vec<ClassTime> {
    field
        .select(&selector(r#"div[class="cabecalho-horario"]"#))
        .filter_map(|time| {
            let parts = child_elements(time);
            if parts.len() < 4 {
                return None;
            }
            Some(ClassTime {
                day: text_of(parts[0]),
                start: text_of(parts[1]),
                end: text_of(parts[3]),
            })
        })
        .collect()
}

/// Lecture rows: every classed `<tr>` that is not a header and has at
/// least six cells (number, situation, date, subject, ..., materials).
pub fn extract_class_items(document: &Html) -> Vec<ClassItem> {
    document
        .select(&selector("tr[class]"))
        .filter(|row| !row.attr("id").unwrap_or_default().contains("header"))
        .filter_map(class_item)
        .collect()
}

fn class_item(row: ElementRef<'_>) -> Option<ClassItem> {
    let cells = child_elements(row);
    if cells.len() < 6 || cells[0].value().name() != "td" {
        return None;
    }
    let subject = text_of(cells[3]);
    let material_link = first(cells[5], "a")
        .and_then(|a| a.attr("href"))
        .map(|href| href.strip_prefix("link?").unwrap_or(href).to_string())
        .filter(|href| !href.is_empty());

    Some(ClassItem {
        number: digits(&text_of(cells[0])).unwrap_or(0),
        situation: text_of(cells[1]),
        date: text_of(cells[2]),
        subject: if subject.is_empty() {
            NO_SUBJECT.to_string()
        } else {
            subject
        },
        material_count: digits(&text_of(cells[5])).unwrap_or(0),
        material_link,
        materials: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
      <h2 class="cabecalho-titulo">EXA801 - Cálculo Diferencial I (Teórica - T01)</h2>
      <div class="cabecalho-dado nome-capitalizars"><span>MARIA DAS DORES</span></div>
      <div class="cabecalho-dado"><b>Período:</b><span>2019.1</span></div>
      <div class="cabecalho-dado"><b>Carga horária:</b><span>60 horas</span></div>
      <div class="cabecalho-dado"><b>Limite de Faltas:</b><span>15</span></div>
      <div class="cabecalho-dado"><b>Departamento:</b><span>CIÊNCIAS EXATAS</span></div>
      <div class="cabecalho-dado"><b>Horário:</b>
        <div class="cabecalho-horario"><span>SEG</span><span>07:30</span><span>-</span><span>09:30</span></div>
      </div>
      <table>
        <tr class="cabecalho" id="row_header"><th>Nº</th><th>Situação</th><th>Data</th><th>Assunto</th><th></th><th>Material</th></tr>
        <tr class="linha"><td>1</td><td>Realizada</td><td>04/03/2019</td><td>Limites</td><td></td><td><a href="link?javascript:__doPostBack('ctl00$mat','0')">2</a></td></tr>
        <tr class="linha"><td>2</td><td>Prevista</td><td>06/03/2019</td><td></td><td></td><td>0</td></tr>
      </table>"#;

    #[test]
    fn test_header_fields() {
        let section = ClassSectionParser.parse(&Html::parse_document(PAGE)).unwrap();
        assert_eq!(section.code, "EXA801");
        assert_eq!(section.name, "Cálculo Diferencial I");
        assert_eq!(section.group, "T01");
        assert_eq!(section.teacher.as_deref(), Some("Maria Das Dores"));
        assert_eq!(section.semester, "2019.1");
        assert_eq!(section.credits, Some(60));
        assert_eq!(section.miss_limit, Some(15));
        assert_eq!(section.department.as_deref(), Some("Ciências Exatas"));
        assert_eq!(section.schedule[0].end, "09:30");
    }

    #[test]
    fn test_class_items() {
        let section = ClassSectionParser.parse(&Html::parse_document(PAGE)).unwrap();
        assert_eq!(section.items.len(), 2);
        assert_eq!(section.items[0].material_count, 2);
        assert_eq!(
            section.items[0].material_link.as_deref(),
            Some("javascript:__doPostBack('ctl00$mat','0')")
        );
        assert_eq!(section.items[1].subject, NO_SUBJECT);
        assert_eq!(section.items[1].material_link, None);
    }

    #[test]
    fn test_missing_heading() {
        assert!(ClassSectionParser
            .parse(&Html::parse_document("<p>Sessão expirada</p>"))
            .is_none());
    }
}
