//! Following "older items" links until the server stops sending one.

use std::collections::HashSet;
use std::future::Future;

use crate::error::SagresError;

/// One fetched page: its items and the link to the next one, if any.
#[derive(Debug, Clone)]
pub struct PageChunk<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
}

/// Everything gathered by a walk. `error` is the failure that stopped it,
/// if one did; `items` still holds what came before.
#[derive(Debug)]
pub struct Walk<T> {
    pub items: Vec<T>,
    pub pages: usize,
    pub error: Option<SagresError>,
}

/// Walk from `first_next`, calling `fetch` for every link. A link that was
/// already visited ends the walk.
pub async fn walk<T, F, Fut>(first_next: Option<String>, mut fetch: F) -> Walk<T>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<PageChunk<T>, SagresError>>,
{
    let mut items = Vec::new();
    let mut pages = 0;
    let mut visited = HashSet::new();
    let mut next = first_next;

    while let Some(link) = next.take() {
        if !visited.insert(link.clone()) {
            tracing::debug!("Pagination loop at {link}, stopping");
            break;
        }
        match fetch(link).await {
            Ok(chunk) => {
                pages += 1;
                items.extend(chunk.items);
                next = chunk.next.filter(|n| !n.is_empty());
            }
            Err(e) => {
                tracing::warn!("Pagination stopped after {pages} pages: {e}");
                return Walk {
                    items,
                    pages,
                    error: Some(e),
                };
            }
        }
    }

    Walk {
        items,
        pages,
        error: None,
    }
}
