//! Memoized entities reachable only through links in API payloads.
//!
//! An entity is usually discovered by link before its id is known. A miss
//! by link fetches and decodes the entity once, then indexes it by both the
//! link and its own id. Entries live until the session logs out.

use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{SagresError, SagresResult};
use crate::model::{ClassRef, DisciplineSummary, MessageScope, Person};
use crate::session::Session;
use crate::transport::RequestOptions;

/// Request tag used for linked-entity fetches.
pub const LINKED_TAG: &str = "linked";

/// Two-key cache of one entity type.
#[derive(Debug)]
pub struct LinkedCache<T> {
    by_id: DashMap<i64, T>,
    by_link: DashMap<String, i64>,
}

impl<T> Default for LinkedCache<T> {
    fn default() -> Self {
        Self {
            by_id: DashMap::new(),
            by_link: DashMap::new(),
        }
    }
}

impl<T: Clone> LinkedCache<T> {
    pub fn retrieve(&self, id: i64) -> Option<T> {
        self.by_id.get(&id).map(|entry| entry.value().clone())
    }

    pub fn by_link(&self, link: &str) -> Option<T> {
        let id = *self.by_link.get(link)?.value();
        self.retrieve(id)
    }

    pub fn insert(&self, id: i64, link: Option<&str>, entity: T) {
        if let Some(link) = link {
            self.by_link.insert(link.to_string(), id);
        }
        self.by_id.insert(id, entity);
    }

    pub fn clear(&self) {
        self.by_link.clear();
        self.by_id.clear();
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Caches for every linked entity type, shared by all clones of a session.
#[derive(Debug, Default)]
pub struct LinkedEntities {
    pub persons: LinkedCache<Person>,
    pub scopes: LinkedCache<MessageScope>,
    pub classes: LinkedCache<ClassRef>,
    pub disciplines: LinkedCache<DisciplineSummary>,
}

impl LinkedEntities {
    /// Forget every cached entity.
    pub fn clear(&self) {
        self.persons.clear();
        self.scopes.clear();
        self.classes.clear();
        self.disciplines.clear();
    }
}

/// An API entity that can be dereferenced from a link.
pub trait LinkedEntity: DeserializeOwned + Clone + Send + Sync + 'static {
    fn entity_id(&self) -> i64;

    fn set_link(&mut self, link: String);

    fn cache(linked: &LinkedEntities) -> &LinkedCache<Self>;

    fn decode(body: &str) -> SagresResult<Self> {
        Ok(serde_json::from_str(body)?)
    }
}

impl LinkedEntity for Person {
    fn entity_id(&self) -> i64 {
        self.id
    }

    fn set_link(&mut self, link: String) {
        self.link = Some(link);
    }

    fn cache(linked: &LinkedEntities) -> &LinkedCache<Self> {
        &linked.persons
    }
}

impl LinkedEntity for ClassRef {
    fn entity_id(&self) -> i64 {
        self.id
    }

    fn set_link(&mut self, link: String) {
        self.link = Some(link);
    }

    fn cache(linked: &LinkedEntities) -> &LinkedCache<Self> {
        &linked.classes
    }
}

impl LinkedEntity for DisciplineSummary {
    fn entity_id(&self) -> i64 {
        self.id
    }

    fn set_link(&mut self, link: String) {
        self.link = Some(link);
    }

    fn cache(linked: &LinkedEntities) -> &LinkedCache<Self> {
        &linked.disciplines
    }
}

#[derive(Deserialize)]
struct ScopeList {
    #[serde(default, rename = "itens")]
    items: Vec<MessageScope>,
}

impl LinkedEntity for MessageScope {
    fn entity_id(&self) -> i64 {
        self.id
    }

    fn set_link(&mut self, link: String) {
        self.link = Some(link);
    }

    fn cache(linked: &LinkedEntities) -> &LinkedCache<Self> {
        &linked.scopes
    }

    /// Scope links answer with a list; the message audience is its first entry.
    fn decode(body: &str) -> SagresResult<Self> {
        let list: ScopeList = serde_json::from_str(body)?;
        list.items
            .into_iter()
            .next()
            .ok_or_else(|| SagresError::Parse("empty scope list".into()))
    }
}

impl Session {
    /// Cached entity with `id`, if it has been dereferenced before.
    pub fn retrieve<T: LinkedEntity>(&self, id: i64) -> Option<T> {
        T::cache(self.linked()).retrieve(id)
    }

    /// Dereference `link`, hitting the network only on a cache miss.
    pub async fn retrieve_from_link<T: LinkedEntity>(&self, link: &str) -> SagresResult<T> {
        let cache = T::cache(self.linked());
        if let Some(hit) = cache.by_link(link) {
            return Ok(hit);
        }

        let url = self.institution().api_link(link)?;
        let page = self.get(&url, &RequestOptions::tagged(LINKED_TAG)).await?;
        if !page.is_success() {
            return Err(SagresError::Status {
                status: page.status,
                url: page.url,
            });
        }
        let mut entity = T::decode(&page.body)?;
        entity.set_link(link.to_string());
        tracing::debug!("Linked entity {} cached from {link}", entity.entity_id());
        cache.insert(entity.entity_id(), Some(link), entity.clone());
        Ok(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_indexes_by_link_and_id() {
        let cache = LinkedCache::<Person>::default();
        let person = Person {
            id: 4,
            name: "Ana".into(),
            ..Person::default()
        };
        cache.insert(4, Some("/pessoas/4"), person.clone());
        assert_eq!(cache.retrieve(4), Some(person.clone()));
        assert_eq!(cache.by_link("/pessoas/4"), Some(person));
        assert!(cache.by_link("/pessoas/5").is_none());
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert!(cache.by_link("/pessoas/4").is_none());
    }

    #[test]
    fn test_scope_decodes_first_item() {
        let scope = MessageScope::decode(r#"{"itens":[{"id":3,"tipo":1,"turma":{"href":"/turmas/3"}}]}"#)
            .unwrap();
        assert_eq!(scope.id, 3);
        assert_eq!(scope.class.unwrap().link(), Some("/turmas/3"));
        assert!(MessageScope::decode(r#"{"itens":[]}"#).is_err());
    }
}
