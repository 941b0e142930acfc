//! Domain types produced by operations and parsers.

use std::cmp::Ordering;

use chrono::TimeZone;
use serde::{Deserialize, Serialize};

// ── Semesters and variants ──────────────────────────────────────────────────

/// A term as exposed by the portal, e.g. `(20191, "2019.1")`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SemesterCode {
    pub id: i64,
    pub label: String,
}

impl SemesterCode {
    pub fn new(id: i64, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
        }
    }

    /// Derive the numeric id from a label such as `"2019.1"` or `"2019.1F"`:
    /// the first five digits, read as a number.
    pub fn from_label(label: &str) -> Option<Self> {
        let digits: String = label.chars().filter(char::is_ascii_digit).take(5).collect();
        let id = digits.parse::<i64>().ok()?;
        Some(Self::new(id, label.trim()))
    }

    /// Newest first by id; on a tie the longer label comes first.
    pub fn newest_first(a: &SemesterCode, b: &SemesterCode) -> Ordering {
        b.id.cmp(&a.id)
            .then_with(|| b.label.len().cmp(&a.label.len()))
    }
}

pub fn sort_newest_first(codes: &mut [SemesterCode]) {
    codes.sort_by(SemesterCode::newest_first);
}

/// An alternate concurrent enrollment record of the same student.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CourseVariant {
    pub id: i64,
    pub label: String,
}

// ── Grades ──────────────────────────────────────────────────────────────────

/// One evaluation line of a discipline's grade table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeInfo {
    pub name: String,
    pub score: String,
    pub date: String,
    pub weight: f64,
    /// Index of the evaluation group, starting at 1.
    pub grouping: u32,
    pub grouping_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Grade {
    pub semester_id: i64,
    /// Discipline title as shown on the report card (`"CODE - Name"`).
    pub discipline: String,
    pub partial_mean: Option<String>,
    pub final_score: Option<String>,
    pub values: Vec<GradeInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissedClass {
    pub semester_id: i64,
    pub discipline_code: String,
    pub group: String,
    pub date: String,
    pub description: String,
}

/// Everything extracted from the grade page of one term.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GradesReport {
    pub semester_id: Option<i64>,
    pub semesters: Vec<SemesterCode>,
    pub variants: Vec<CourseVariant>,
    pub grades: Vec<Grade>,
    pub missed_classes: Vec<MissedClass>,
}

// ── Class sections ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    pub name: String,
    pub link: String,
}

/// One lecture of a class section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassItem {
    pub number: u32,
    pub situation: String,
    pub subject: String,
    pub date: String,
    pub material_count: u32,
    /// Postback link that opens the support-material popup.
    pub material_link: Option<String>,
    pub materials: Vec<Material>,
}

/// Weekly meeting of a class section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassTime {
    pub day: String,
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSection {
    pub code: String,
    pub name: String,
    pub group: String,
    pub semester: String,
    pub teacher: Option<String>,
    pub department: Option<String>,
    pub credits: Option<u32>,
    pub miss_limit: Option<u32>,
    pub period: Option<String>,
    pub schedule: Vec<ClassTime>,
    pub items: Vec<ClassItem>,
}

/// Terminal payload of a scrape pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionsReport<T> {
    pub sections: Vec<T>,
    pub failure_count: usize,
    pub semesters: Vec<SemesterCode>,
}

// ── Linked entities ─────────────────────────────────────────────────────────

/// `{"href": "..."}` reference embedded in API payloads.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Linker {
    #[serde(default)]
    pub href: Option<String>,
}

impl Linker {
    pub fn link(&self) -> Option<&str> {
        self.href.as_deref().filter(|h| !h.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Person {
    pub id: i64,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "nomeExibicao")]
    pub display_name: Option<String>,
    pub cpf: Option<String>,
    pub email: Option<String>,
    #[serde(skip_deserializing)]
    pub link: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisciplineSummary {
    pub id: i64,
    #[serde(rename = "codigo")]
    pub code: String,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "nomeResumido")]
    pub short_name: Option<String>,
    #[serde(rename = "ementa")]
    pub objective: Option<String>,
    #[serde(rename = "departamento")]
    pub department: Option<Linker>,
    #[serde(skip_deserializing)]
    pub link: Option<String>,
}

/// A class as referenced from a message scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassRef {
    pub id: i64,
    #[serde(rename = "descricao")]
    pub description: Option<String>,
    #[serde(rename = "disciplina")]
    pub discipline: Option<Linker>,
    #[serde(skip_deserializing)]
    pub link: Option<String>,
}

/// Audience of a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageScope {
    pub id: i64,
    #[serde(rename = "tipo")]
    pub kind: i32,
    #[serde(rename = "turma")]
    pub class: Option<Linker>,
    #[serde(skip_deserializing)]
    pub link: Option<String>,
}

/// Message sender profiles.
pub mod profiles {
    pub const TEACHER: i32 = 2;
    pub const INSTITUTION: i32 = 3;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Message {
    pub id: i64,
    /// ISO-8601 timestamp as sent by the API.
    #[serde(rename = "dataHora")]
    pub timestamp: Option<String>,
    #[serde(rename = "remetente")]
    pub sender: Option<Linker>,
    #[serde(rename = "perfilRemetente")]
    pub sender_profile: i32,
    #[serde(rename = "descricao")]
    pub content: String,
    #[serde(rename = "escopos")]
    pub scopes: Option<Linker>,
    #[serde(rename = "arquivoAnexo")]
    pub attachment_link: Option<String>,
    #[serde(rename = "nomeArquivoAnexo")]
    pub attachment_name: Option<String>,
    #[serde(skip_deserializing)]
    pub sender_name: Option<String>,
    #[serde(skip_deserializing)]
    pub discipline: Option<String>,
    #[serde(skip_deserializing)]
    pub discipline_code: Option<String>,
    #[serde(skip_deserializing)]
    pub objective: Option<String>,
    /// Set for messages scraped from the start page.
    #[serde(skip_deserializing)]
    pub from_html: bool,
    /// Date as printed on the start page.
    #[serde(skip_deserializing)]
    pub date_string: Option<String>,
}

impl Message {
    /// Milliseconds since the epoch, `-1` when the timestamp is missing or malformed.
    pub fn timestamp_millis(&self) -> i64 {
        let Some(raw) = self.timestamp.as_deref() else {
            return -1;
        };
        if let Ok(at) = chrono::DateTime::parse_from_rfc3339(raw) {
            return at.timestamp_millis();
        }
        chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
            .or_else(|_| chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
            .map(|at| chrono::Utc.from_utc_datetime(&at).timestamp_millis())
            .unwrap_or(-1)
    }
}

/// One page of the messages API.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MessagesPage {
    #[serde(rename = "maisAntigos")]
    pub older: Option<Linker>,
    #[serde(rename = "maisRecentes")]
    pub newer: Option<Linker>,
    #[serde(rename = "itens")]
    pub items: Vec<Message>,
}

// ── Start page, demand and services ─────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartPage {
    pub student_name: Option<String>,
    pub semesters: Vec<SemesterCode>,
    pub messages: Vec<Message>,
    /// Whether the enrollment demand page is reachable from the menu.
    pub demand_open: bool,
}

/// An offer on the enrollment demand page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemandOffer {
    /// Name of the checkbox that toggles this offer.
    pub id: String,
    pub code: String,
    pub name: String,
    pub hours: Option<u32>,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedService {
    pub kind: String,
    pub date: String,
    pub status: String,
    pub observation: Option<String>,
}
