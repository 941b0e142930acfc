//! Messages from the JSON API, enriched through the linked-entity caches.

use async_trait::async_trait;

use crate::error::{SagresError, SagresResult};
use crate::model::{profiles, ClassRef, DisciplineSummary, Message, MessageScope, MessagesPage, Person};
use crate::operation::{Operation, OperationResult};
use crate::pagination::{walk, PageChunk};
use crate::session::Session;
use crate::transport::RequestOptions;

pub const MESSAGES_TAG: &str = "messages";

/// API path of a person's message feed.
pub fn messages_path(person_id: i64) -> String {
    format!("diario/recados?idPessoa={person_id}")
}

/// API path of the logged-in person.
pub const ME_PATH: &str = "eu";

async fn fetch_json<T: serde::de::DeserializeOwned>(session: &Session, link: &str) -> SagresResult<T> {
    let url = session.institution().api_link(link)?;
    let page = session.get(&url, &RequestOptions::tagged(MESSAGES_TAG)).await?;
    if !page.is_success() {
        return Err(SagresError::Status {
            status: page.status,
            url: page.url,
        });
    }
    Ok(serde_json::from_str(&page.body)?)
}

/// Who is logged in, as seen by the API.
pub struct MeOperation {
    session: Session,
}

impl MeOperation {
    pub fn new(session: Session) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Operation for MeOperation {
    type Output = Person;

    async fn execute(&self) -> OperationResult<Person> {
        // "eu" names whoever holds the session, so it is never answered from cache.
        match fetch_json::<Person>(&self.session, ME_PATH).await {
            Ok(person) => {
                self.session
                    .linked()
                    .persons
                    .insert(person.id, person.link.as_deref(), person.clone());
                OperationResult::success(person)
            }
            Err(e) => OperationResult::from_error(e),
        }
    }
}

pub struct MessagesOperation {
    session: Session,
    person_id: i64,
    fetch_all: bool,
}

impl MessagesOperation {
    pub fn new(session: Session, person_id: i64, fetch_all: bool) -> Self {
        Self {
            session,
            person_id,
            fetch_all,
        }
    }

    async fn older(&self, first: &MessagesPage) -> Vec<Message> {
        let start = first
            .older
            .as_ref()
            .and_then(|l| l.link())
            .map(str::to_string);
        let session = self.session.clone();
        let walked = walk(start, move |link| {
            let session = session.clone();
            async move {
                let page: MessagesPage = fetch_json(&session, &link).await?;
                Ok::<_, SagresError>(PageChunk {
                    items: page.items,
                    next: page.older.and_then(|l| l.href),
                })
            }
        })
        .await;
        tracing::debug!("Fetched {} older message pages", walked.pages);
        walked.items
    }

    /// Fill sender and discipline names. Lookups that fail leave the fields empty.
    async fn enrich(&self, message: &mut Message) {
        let Some(sender) = message.sender.as_ref().and_then(|s| s.link()).map(str::to_string) else {
            return;
        };
        match self.session.retrieve_from_link::<Person>(&sender).await {
            Ok(person) => message.sender_name = Some(person.name),
            Err(e) => {
                tracing::debug!("Sender of message {} unavailable: {e}", message.id);
                if message.sender_profile == profiles::INSTITUTION {
                    message.sender_name = Some(format!(".{}.", self.session.institution().id));
                }
            }
        }

        if message.sender_profile != profiles::TEACHER {
            return;
        }
        let Some(scopes) = message.scopes.as_ref().and_then(|s| s.link()).map(str::to_string) else {
            return;
        };
        match self.discipline_of(&scopes).await {
            Ok(Some(discipline)) => {
                message.discipline = Some(discipline.name);
                message.discipline_code = Some(discipline.code);
                message.objective = discipline.objective;
            }
            Ok(None) => {}
            Err(e) => tracing::debug!("Discipline of message {} unavailable: {e}", message.id),
        }
    }

    /// scope → class → discipline.
    async fn discipline_of(&self, scopes: &str) -> SagresResult<Option<DisciplineSummary>> {
        let scope: MessageScope = self.session.retrieve_from_link(scopes).await?;
        let Some(class_link) = scope.class.as_ref().and_then(|c| c.link()) else {
            return Ok(None);
        };
        let class: ClassRef = self.session.retrieve_from_link(class_link).await?;
        let Some(discipline_link) = class.discipline.as_ref().and_then(|d| d.link()) else {
            return Ok(None);
        };
        Ok(Some(self.session.retrieve_from_link(discipline_link).await?))
    }
}

#[async_trait]
impl Operation for MessagesOperation {
    type Output = Vec<Message>;

    async fn execute(&self) -> OperationResult<Vec<Message>> {
        let url = match self.session.institution().api_link(&messages_path(self.person_id)) {
            Ok(url) => url,
            Err(e) => return OperationResult::from_error(e),
        };
        let page = match self
            .session
            .get(&url, &RequestOptions::tagged(MESSAGES_TAG))
            .await
        {
            Ok(page) if page.is_success() => page,
            Ok(page) => return OperationResult::response_failed(page),
            Err(e) => return OperationResult::network_error(e),
        };
        let first: MessagesPage = match serde_json::from_str(&page.body) {
            Ok(first) => first,
            Err(e) => return OperationResult::from_error(e.into()),
        };

        let mut messages = first.items.clone();
        if self.fetch_all {
            messages.extend(self.older(&first).await);
        }
        messages.sort_by_key(Message::timestamp_millis);
        for message in &mut messages {
            self.enrich(message).await;
        }
        tracing::debug!("Loaded {} messages", messages.len());
        OperationResult::success(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        assert_eq!(messages_path(42), "diario/recados?idPessoa=42");
    }
}
