//! Registry of in-flight requests, cancellable by tag.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio_util::sync::CancellationToken;

#[derive(Debug)]
struct InFlight {
    tag: Option<String>,
    token: CancellationToken,
}

#[derive(Debug, Default)]
pub struct RequestRegistry {
    next_id: AtomicU64,
    inflight: Mutex<HashMap<u64, InFlight>>,
}

/// Keeps a request registered until dropped.
#[derive(Debug)]
pub struct RequestGuard<'a> {
    registry: &'a RequestRegistry,
    id: u64,
    token: CancellationToken,
}

impl RequestGuard<'_> {
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl Drop for RequestGuard<'_> {
    fn drop(&mut self) {
        self.registry
            .inflight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.id);
    }
}

impl RequestRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, tag: Option<&str>) -> RequestGuard<'_> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let token = CancellationToken::new();
        self.inflight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(
                id,
                InFlight {
                    tag: tag.map(str::to_string),
                    token: token.clone(),
                },
            );
        RequestGuard {
            registry: self,
            id,
            token,
        }
    }

    /// Cancel requests carrying any of `tags`. An empty slice cancels every
    /// in-flight request. Returns how many were cancelled.
    pub fn cancel(&self, tags: &[&str]) -> usize {
        let inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
        let mut cancelled = 0;
        for request in inflight.values() {
            let hit = tags.is_empty()
                || request
                    .tag
                    .as_deref()
                    .is_some_and(|tag| tags.contains(&tag));
            if hit {
                request.token.cancel();
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            tracing::debug!("Cancelled {cancelled} in-flight requests");
        }
        cancelled
    }

    pub fn in_flight(&self) -> usize {
        self.inflight.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_by_tag() {
        let registry = RequestRegistry::new();
        let grades = registry.register(Some("grades"));
        let login = registry.register(Some("login"));
        let untagged = registry.register(None);
        assert_eq!(registry.in_flight(), 3);

        assert_eq!(registry.cancel(&["grades"]), 1);
        assert!(grades.token().is_cancelled());
        assert!(!login.token().is_cancelled());
        assert!(!untagged.token().is_cancelled());

        assert_eq!(registry.cancel(&[]), 3);
        assert!(untagged.token().is_cancelled());
    }

    #[test]
    fn test_guard_unregisters_on_drop() {
        let registry = RequestRegistry::new();
        {
            let _guard = registry.register(Some("x"));
            assert_eq!(registry.in_flight(), 1);
        }
        assert_eq!(registry.in_flight(), 0);
        assert_eq!(registry.cancel(&["x"]), 0);
    }
}
