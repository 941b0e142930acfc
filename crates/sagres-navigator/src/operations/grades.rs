//! Report card of one term, including the course-variant fan-out.

use async_trait::async_trait;

use crate::form::{fields, FormSnapshot};
use crate::institution::Endpoint;
use crate::model::{CourseVariant, Grade, GradesReport, MissedClass, SemesterCode};
use crate::operation::{Operation, OperationResult};
use crate::parsers::grades::{
    can_extract_grades, course_variants, extract_grades, selected_semester, semester_codes,
};
use crate::parsers::missed_classes::extract_missed_classes;
use crate::session::Session;
use crate::transport::{Page, RequestOptions};

pub const GRADES_TAG: &str = "grades";

const SUBMIT_VALUE: &str = "Exibir";

/// What the first grade page offers.
enum GradePage {
    Grades {
        semester_id: i64,
        semesters: Vec<SemesterCode>,
        grades: Vec<Grade>,
        missed: Vec<MissedClass>,
    },
    Variants {
        semester_id: i64,
        semesters: Vec<SemesterCode>,
        variants: Vec<CourseVariant>,
    },
    NoSemester,
    Unrecognized,
}

fn inspect(page: &Page) -> GradePage {
    let document = page.document();
    let Some(semester_id) = selected_semester(&document) else {
        return GradePage::NoSemester;
    };
    let semesters = semester_codes(&document);
    if can_extract_grades(&document) {
        return GradePage::Grades {
            semester_id,
            semesters,
            grades: extract_grades(&document, semester_id),
            missed: extract_missed_classes(&document, semester_id),
        };
    }
    let variants = course_variants(&document);
    if variants.is_empty() {
        GradePage::Unrecognized
    } else {
        GradePage::Variants {
            semester_id,
            semesters,
            variants,
        }
    }
}

/// Grades of the current term, or of `semester` when given.
pub struct GradesOperation {
    session: Session,
    semester: Option<i64>,
}

impl GradesOperation {
    pub fn new(session: Session, semester: Option<i64>) -> Self {
        Self { session, semester }
    }

    fn options() -> RequestOptions {
        RequestOptions::tagged(GRADES_TAG)
    }

    fn semester_form(base: &Page, semester: i64, variant: Option<i64>) -> FormSnapshot {
        let semester = semester.to_string();
        let mut form = FormSnapshot::from_page(base).with(fields::SEMESTER_SELECT, semester);
        if let Some(variant) = variant {
            form.set(fields::COURSE_VARIANT_SELECT, variant.to_string());
        }
        form.with(fields::GRADES_SUBMIT, SUBMIT_VALUE)
    }

    async fn first_page(&self) -> Result<Page, OperationResult<GradesReport>> {
        let current = self
            .session
            .fetch(Endpoint::Grades, &Self::options())
            .await
            .map_err(OperationResult::network_error)?;
        let Some(semester) = self.semester else {
            return Ok(current);
        };
        if !current.is_success() {
            return Ok(current);
        }
        let form = Self::semester_form(&current, semester, None);
        self.session
            .post(
                &self.session.url(Endpoint::GradesAny),
                &form,
                &Self::options().ajax(),
            )
            .await
            .map_err(OperationResult::network_error)
    }

    /// One chained postback per variant. A variant that fails contributes
    /// nothing; the next one reuses the last good page's hidden fields.
    async fn fan_out(
        &self,
        first: &Page,
        semester_id: i64,
        variants: &[CourseVariant],
    ) -> (Vec<Grade>, Vec<MissedClass>) {
        let url = self.session.url(Endpoint::GradesAny);
        let mut grades = Vec::new();
        let mut missed = Vec::new();
        let mut previous = first.clone();

        for variant in variants {
            let form = Self::semester_form(&previous, semester_id, Some(variant.id));
            match self.session.post(&url, &form, &Self::options().ajax()).await {
                Ok(page) if page.is_success() => {
                    {
                        let document = page.document();
                        if can_extract_grades(&document) {
                            grades.extend(extract_grades(&document, semester_id));
                            missed.extend(extract_missed_classes(&document, semester_id));
                        } else {
                            tracing::warn!("Variant {} page has no grades", variant.label);
                        }
                    }
                    previous = page;
                }
                Ok(page) => {
                    tracing::warn!("Variant {} answered {}", variant.label, page.status);
                }
                Err(e) => {
                    tracing::warn!("Variant {} failed: {e}", variant.label);
                }
            }
        }
        (grades, missed)
    }
}

#[async_trait]
impl Operation for GradesOperation {
    type Output = GradesReport;

    async fn execute(&self) -> OperationResult<GradesReport> {
        let page = match self.first_page().await {
            Ok(page) => page,
            Err(failed) => return failed,
        };
        if !page.is_success() {
            return OperationResult::response_failed(page);
        }

        match inspect(&page) {
            GradePage::Grades {
                semester_id,
                semesters,
                grades,
                missed,
            } => {
                tracing::debug!("Extracted {} grades for {semester_id}", grades.len());
                let report = GradesReport {
                    semester_id: Some(semester_id),
                    semesters,
                    variants: Vec::new(),
                    grades,
                    missed_classes: missed,
                };
                OperationResult::success(report).with_document(page)
            }
            GradePage::Variants {
                semester_id,
                semesters,
                variants,
            } => {
                tracing::debug!("Fanning out over {} course variants", variants.len());
                let (grades, missed) = self.fan_out(&page, semester_id, &variants).await;
                let report = GradesReport {
                    semester_id: Some(semester_id),
                    semesters,
                    variants,
                    grades,
                    missed_classes: missed,
                };
                OperationResult::success(report).with_document(page)
            }
            GradePage::NoSemester => OperationResult::approval_error(
                "Can't find semester on situation. Nothing is selected",
            )
            .with_document(page),
            GradePage::Unrecognized => OperationResult::approval_error(
                "Can't extract grades and there's no variant",
            )
            .with_document(page),
        }
    }
}
