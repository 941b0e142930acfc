//! Single-page operations: fetch one endpoint and run a parser over it.

use async_trait::async_trait;

use crate::institution::Endpoint;
use crate::operation::{Operation, OperationResult};
use crate::parsers::PageParser;
use crate::session::Session;
use crate::transport::RequestOptions;

/// Fetches `endpoint` and parses it. A parser that finds nothing yields
/// `UnknownFailure` with the page attached.
pub struct PageOperation<P> {
    session: Session,
    endpoint: Endpoint,
    parser: P,
    tag: &'static str,
}

impl<P: PageParser> PageOperation<P> {
    pub fn new(session: Session, endpoint: Endpoint, parser: P) -> Self {
        Self {
            session,
            endpoint,
            parser,
            tag: "page",
        }
    }

    pub fn tagged(mut self, tag: &'static str) -> Self {
        self.tag = tag;
        self
    }
}

#[async_trait]
impl<P> Operation for PageOperation<P>
where
    P: PageParser + 'static,
{
    type Output = P::Output;

    async fn execute(&self) -> OperationResult<P::Output> {
        let options = RequestOptions::tagged(self.tag);
        let page = match self.session.fetch(self.endpoint, &options).await {
            Ok(page) if page.is_success() => page,
            Ok(page) => return OperationResult::response_failed(page),
            Err(e) => return OperationResult::network_error(e),
        };
        let parsed = self.parser.parse(&page.document());
        match parsed {
            Some(output) => OperationResult::success(output).with_document(page),
            None => OperationResult::unknown_failure(format!("Nothing to extract at {}", page.url))
                .with_document(page),
        }
    }
}
