//! Report documents (history, enrollment certificate, flowchart).

use std::path::PathBuf;

use async_trait::async_trait;
use serde::Serialize;

use crate::executor::TaskExecutor;
use crate::institution::Endpoint;
use crate::operation::{codes, Operation, OperationResult, Status};
use crate::parsers::documents::find_document_link;
use crate::session::Session;
use crate::transport::RequestOptions;

pub const DOCUMENTS_TAG: &str = "documents";

/// A document written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadedDocument {
    pub path: PathBuf,
    pub bytes: u64,
}

pub struct DocumentOperation {
    session: Session,
    endpoint: Endpoint,
    destination: PathBuf,
    executor: TaskExecutor,
}

impl DocumentOperation {
    pub fn new(session: Session, endpoint: Endpoint, destination: impl Into<PathBuf>) -> Self {
        Self {
            session,
            endpoint,
            destination: destination.into(),
            executor: TaskExecutor::default(),
        }
    }

    /// Commit the file on the disk pool of `executor`.
    pub fn with_executor(mut self, executor: TaskExecutor) -> Self {
        self.executor = executor;
        self
    }
}

#[async_trait]
impl Operation for DocumentOperation {
    type Output = DownloadedDocument;

    async fn execute(&self) -> OperationResult<DownloadedDocument> {
        let options = RequestOptions::tagged(DOCUMENTS_TAG);
        let page = match self.session.fetch(self.endpoint, &options).await {
            Ok(page) if page.is_success() => page,
            Ok(page) => return OperationResult::response_failed(page),
            Err(e) => return OperationResult::network_error(e),
        };

        let link = find_document_link(&page.document(), &page.url);
        let Some(link) = link else {
            return OperationResult::failure(Status::ResponseFailed)
                .with_code(codes::DOCUMENT_LINK_NOT_FOUND)
                .with_message("Link not found")
                .with_document(page);
        };
        tracing::debug!("Document link {link}");

        let pending = match self
            .session
            .http()
            .download(&link, &self.destination, &options)
            .await
        {
            Ok(pending) => pending,
            Err(e) => return OperationResult::from_error(e),
        };

        let destination = self.destination.clone();
        let committed = self
            .executor
            .run_disk(move || pending.commit(&destination))
            .await
            .and_then(|written| written);
        match committed {
            Ok(bytes) => OperationResult::success(DownloadedDocument {
                path: self.destination.clone(),
                bytes,
            })
            .with_code(200),
            Err(e) => {
                tracing::warn!("Could not replace {}: {e}", self.destination.display());
                OperationResult::from_error(e)
            }
        }
    }
}
