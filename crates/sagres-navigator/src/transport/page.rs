//! Fetched documents.

use scraper::Html;

/// A fetched page. The body is kept as text so the page can cross task
/// boundaries; call [`Page::document`] to parse it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// Final URL after redirects.
    pub url: String,
    pub status: u16,
    pub body: String,
}

impl Page {
    pub fn new(url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as an HTML document.
    pub fn document(&self) -> Html {
        Html::parse_document(&self.body)
    }
}
