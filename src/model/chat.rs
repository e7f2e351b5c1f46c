use std::collections::HashSet;

use derive_new::new;
use serde::{Deserialize, Serialize};

use super::*;

crate::define_id!(MessageId);

/// A pre-written chat line that "arrives" once the broadcast reaches its offset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct ChatMessage {
    #[new(value = "MessageId::random()")]
    pub id: MessageId,
    pub username: String,
    pub text: String,
    #[serde(rename = "scheduled_offset_seconds")]
    pub offset: Offset,
}

/// A webinar's chat messages, ordered by offset with ties kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ChatMessage>", into = "Vec<ChatMessage>")]
pub struct ChatLog {
    messages: Vec<ChatMessage>,
}

impl ChatLog {
    pub fn new(mut messages: Vec<ChatMessage>) -> Result<Self, ModelError> {
        if let Some(id) = first_duplicate(messages.iter().map(|message| &message.id)) {
            return DuplicateMessageSnafu { id }.fail();
        }

        // stable, so equal offsets keep the order they were written in
        messages.sort_by_key(|message| message.offset);

        Ok(Self { messages })
    }

    /// Inserts after every message scheduled at or before the new one.
    pub fn push(&mut self, message: ChatMessage) -> Result<(), ModelError> {
        if self.messages.iter().any(|existing| existing.id == message.id) {
            return DuplicateMessageSnafu { id: message.id }.fail();
        }

        let index = self
            .messages
            .partition_point(|existing| existing.offset <= message.offset);
        self.messages.insert(index, message);
        Ok(())
    }

    /// Messages whose offset is at or before `elapsed`.
    ///
    /// Always a prefix of the log, so a message that has arrived stays arrived for every later `elapsed`.
    pub fn arrived(&self, elapsed: Offset) -> &[ChatMessage] {
        let end = self
            .messages
            .partition_point(|message| message.offset <= elapsed);
        &self.messages[..end]
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

pub(crate) fn first_duplicate<'a, T>(ids: impl IntoIterator<Item = &'a T>) -> Option<T>
where
    T: std::hash::Hash + Eq + Clone + 'a,
{
    let mut seen = HashSet::new();
    ids.into_iter().find(|id| !seen.insert(*id)).cloned()
}

impl TryFrom<Vec<ChatMessage>> for ChatLog {
    type Error = ModelError;

    fn try_from(value: Vec<ChatMessage>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ChatLog> for Vec<ChatMessage> {
    fn from(value: ChatLog) -> Self {
        value.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: &str, offset: u64) -> ChatMessage {
        ChatMessage {
            id: id.into(),
            username: "Ana".to_string(),
            text: format!("message {id}"),
            offset: Offset::from_secs(offset),
        }
    }

    fn ids(messages: &[ChatMessage]) -> Vec<&str> {
        messages.iter().map(|message| message.id.as_str()).collect()
    }

    #[test]
    fn orders_by_offset_and_keeps_ties_in_insertion_order() {
        let log = ChatLog::new(vec![
            message("c", 30),
            message("a", 10),
            message("b1", 20),
            message("b2", 20),
        ])
        .unwrap();

        assert_eq!(ids(log.arrived(Offset::from_secs(60))), vec!["a", "b1", "b2", "c"]);
    }

    #[test]
    fn push_lands_after_equal_offsets() {
        let mut log = ChatLog::new(vec![message("a", 10), message("b", 20)]).unwrap();
        log.push(message("a2", 10)).unwrap();
        log.push(message("first", 0)).unwrap();

        assert_eq!(ids(log.arrived(Offset::from_secs(60))), vec!["first", "a", "a2", "b"]);
    }

    #[test]
    fn rejects_duplicate_ids() {
        let result = ChatLog::new(vec![message("a", 10), message("a", 20)]);
        assert!(matches!(result, Err(ModelError::DuplicateMessage { .. })));

        let mut log = ChatLog::new(vec![message("a", 10)]).unwrap();
        assert!(log.push(message("a", 5)).is_err());
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn arrival_includes_the_exact_offset() {
        let log = ChatLog::new(vec![message("a", 10), message("b", 20)]).unwrap();

        assert!(log.arrived(Offset::from_millis(9_999)).is_empty());
        assert_eq!(ids(log.arrived(Offset::from_secs(10))), vec!["a"]);
        assert_eq!(ids(log.arrived(Offset::from_secs(25))), vec!["a", "b"]);
    }

    #[test]
    fn arrival_never_shrinks() {
        let log = ChatLog::new((0..50).map(|i| message(&i.to_string(), (i * 7) % 40)).collect())
            .unwrap();

        let mut previous = 0;
        for second in 0..60 {
            let arrived = log.arrived(Offset::from_secs(second)).len();
            assert!(arrived >= previous, "arrivals shrank at {second}s");
            previous = arrived;
        }
        assert_eq!(previous, 50);
    }

    #[test]
    fn deserializing_sorts_and_validates() {
        let json = r#"[
            {"id":"late","username":"Bia","text":"hi","scheduled_offset_seconds":30},
            {"id":"early","username":"Caio","text":"hello","scheduled_offset_seconds":5.5}
        ]"#;
        let log: ChatLog = serde_json::from_str(json).unwrap();
        assert_eq!(ids(log.arrived(Offset::from_secs(60))), vec!["early", "late"]);

        let negative = r#"[{"id":"x","username":"Bia","text":"hi","scheduled_offset_seconds":-1}]"#;
        assert!(serde_json::from_str::<ChatLog>(negative).is_err());
    }
}
