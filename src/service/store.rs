use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use snafu::{Location, OptionExt as _, Snafu};

use crate::Located;

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum StoreError {
    #[snafu(display("no record `{id}` in `{table}` at {location}"))]
    NotFound {
        table: &'static str,
        id: String,
        #[snafu(implicit)]
        location: Location,
    },
}

impl Located for StoreError {
    fn location(&self) -> Location {
        match self {
            StoreError::NotFound { location, .. } => *location,
        }
    }
}

/// Something that can be kept in a [Store], see [define_record](crate::define_record).
pub trait Record: Clone + std::fmt::Debug + Send + Sync + 'static {
    type Id: Clone + Eq + std::hash::Hash + std::fmt::Debug + std::fmt::Display + Send + Sync + 'static;

    /// Returns the id of the record.
    fn id(&self) -> &Self::Id;

    /// Returns the name of the table the record is kept in.
    fn table() -> &'static str;
}

/// Persistence for one kind of record.
///
/// No ordering or transactional guarantees beyond last-write-wins on `put`.
pub trait Store<T: Record>: Send + Sync + 'static {
    fn get(&self, id: &T::Id) -> impl Future<Output = Result<T>> + Send;

    /// Inserts or replaces the record with the same id.
    fn put(&self, record: T) -> impl Future<Output = Result<()>> + Send;

    /// Removes the record, returning it if it existed.
    fn delete(&self, id: &T::Id) -> impl Future<Output = Result<Option<T>>> + Send;

    /// Every record matching `filter`, in the order they were first stored.
    fn list<F>(&self, filter: F) -> impl Future<Output = Result<Vec<T>>> + Send
    where
        F: Fn(&T) -> bool + Send;
}

/// Keeps records in memory, shared between clones.
#[derive(Debug)]
pub struct MemoryStore<T: Record> {
    records: Arc<DashMap<T::Id, (u64, T)>>,
    sequence: Arc<AtomicU64>,
}

impl<T: Record> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            records: Arc::new(DashMap::new()),
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// A store pre-filled with `records`, later duplicates winning.
    pub fn seeded(records: impl IntoIterator<Item = T>) -> Self {
        let store = Self::new();
        for record in records {
            store.insert(record);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn insert(&self, record: T) {
        match self.records.entry(record.id().clone()) {
            Entry::Occupied(mut entry) => entry.get_mut().1 = record,
            Entry::Vacant(entry) => {
                let sequence = self.sequence.fetch_add(1, Ordering::Relaxed);
                entry.insert((sequence, record));
            }
        }
    }
}

impl<T: Record> Clone for MemoryStore<T> {
    fn clone(&self) -> Self {
        Self {
            records: Arc::clone(&self.records),
            sequence: Arc::clone(&self.sequence),
        }
    }
}

impl<T: Record> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Record> Store<T> for MemoryStore<T> {
    async fn get(&self, id: &T::Id) -> Result<T> {
        let entry = self.records.get(id).context(NotFoundSnafu {
            table: T::table(),
            id: id.to_string(),
        })?;

        Ok(entry.1.clone())
    }

    async fn put(&self, record: T) -> Result<()> {
        tracing::debug!(table = T::table(), id = %record.id(), "put record");
        self.insert(record);
        Ok(())
    }

    async fn delete(&self, id: &T::Id) -> Result<Option<T>> {
        tracing::debug!(table = T::table(), id = %id, "delete record");
        Ok(self.records.remove(id).map(|(_, (_, record))| record))
    }

    async fn list<F>(&self, filter: F) -> Result<Vec<T>>
    where
        F: Fn(&T) -> bool + Send,
    {
        let mut records: Vec<(u64, T)> = self
            .records
            .iter()
            .filter(|entry| filter(&entry.1))
            .map(|entry| entry.value().clone())
            .collect();

        records.sort_by_key(|(sequence, _)| *sequence);
        Ok(records.into_iter().map(|(_, record)| record).collect())
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    crate::define_id!(NoteId);

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Note {
        id: NoteId,
        text: String,
    }

    crate::define_record!("notes" : Note = id as NoteId);

    fn note(id: &str, text: &str) -> Note {
        Note {
            id: id.into(),
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let store = MemoryStore::<Note>::new();
        let result = store.get(&"nope".into()).await;

        assert!(matches!(result, Err(StoreError::NotFound { table: "notes", .. })));
    }

    #[tokio::test]
    async fn put_is_last_write_wins() {
        let store = MemoryStore::new();
        store.put(note("a", "first")).await.unwrap();
        store.put(note("a", "second")).await.unwrap();

        assert_eq!(store.get(&"a".into()).await.unwrap().text, "second");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn list_keeps_first_insertion_order() {
        let store = MemoryStore::new();
        for id in ["c", "a", "b"] {
            store.put(note(id, "x")).await.unwrap();
        }
        store.put(note("c", "updated")).await.unwrap();

        let ids: Vec<_> = store
            .list(|_| true)
            .await
            .unwrap()
            .into_iter()
            .map(|note| note.id.to_string())
            .collect();
        assert_eq!(ids, vec!["c", "a", "b"]);

        let filtered = store.list(|note| note.text == "updated").await.unwrap();
        assert_eq!(filtered, vec![note("c", "updated")]);
    }

    #[tokio::test]
    async fn delete_returns_the_removed_record() {
        let store = MemoryStore::seeded([note("a", "x")]);

        assert_eq!(store.delete(&"a".into()).await.unwrap(), Some(note("a", "x")));
        assert_eq!(store.delete(&"a".into()).await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn clones_share_records() {
        let store = MemoryStore::new();
        let clone = store.clone();
        clone.put(note("a", "x")).await.unwrap();

        assert!(store.get(&"a".into()).await.is_ok());
    }
}
