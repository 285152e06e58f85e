use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;

use crate::{Error, FileId, ObjectStore};

#[derive(Default)]
struct State {
    files: Vec<Entry>,
    next_id: u64,
    fail_reads: bool,
    fail_writes: bool,
}

struct Entry {
    id: FileId,
    name: String,
    content: Bytes,
}

/// An in-process store, mainly useful in tests.
///
/// Besides the [`ObjectStore`] operations it exposes a few hooks for
/// simulating remote failures: files can be removed behind the session's
/// back, and reads or writes can be made to fail with a transport error.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes a file, as if it was deleted by someone else.
    pub fn remove(&self, id: &FileId) -> bool {
        let mut state = self.lock();
        let before = state.files.len();
        state.files.retain(|e| &e.id != id);
        before != state.files.len()
    }

    /// Makes every subsequent read fail (or succeed again).
    #[inline]
    pub fn set_fail_reads(&self, fail: bool) {
        self.lock().fail_reads = fail;
    }

    /// Makes every subsequent create and update fail (or succeed again).
    ///
    /// Updates of a missing file still report not-found.
    #[inline]
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Returns the content of the first file with the given name as text.
    pub fn text_of(&self, name: &str) -> Option<String> {
        let state = self.lock();
        let entry = state.files.iter().find(|e| e.name == name)?;
        Some(String::from_utf8_lossy(&entry.content).into_owned())
    }

    /// Returns the number of files in the store.
    #[inline]
    pub fn file_count(&self) -> usize {
        self.lock().files.len()
    }

    /// Inserts a file directly, bypassing failure hooks.
    pub fn insert<S: Into<String>>(&self, name: S, content: Bytes) -> FileId {
        let mut state = self.lock();
        state.next_id += 1;
        let id = FileId::new(format!("mem-{}", state.next_id));
        state.files.push(Entry {
            id: id.clone(),
            name: name.into(),
            content,
        });
        id
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn find_by_name(&self, name: &str) -> Result<Option<FileId>, Error> {
        let state = self.lock();
        Ok(state
            .files
            .iter()
            .find(|e| e.name == name)
            .map(|e| e.id.clone()))
    }

    async fn read_content(&self, id: &FileId) -> Result<Bytes, Error> {
        let state = self.lock();
        if state.fail_reads {
            return Err(Error::transport().with_reason("reads disabled"));
        }
        state
            .files
            .iter()
            .find(|e| &e.id == id)
            .map(|e| e.content.clone())
            .ok_or_else(Error::not_found)
    }

    async fn create_file(
        &self,
        name: &str,
        content: Bytes,
    ) -> Result<FileId, Error> {
        if self.lock().fail_writes {
            return Err(Error::transport().with_reason("writes disabled"));
        }
        Ok(self.insert(name, content))
    }

    async fn update_file(
        &self,
        id: &FileId,
        content: Bytes,
    ) -> Result<(), Error> {
        let mut state = self.lock();
        let fail_writes = state.fail_writes;
        let entry = state
            .files
            .iter_mut()
            .find(|e| &e.id == id)
            .ok_or_else(Error::not_found)?;
        if fail_writes {
            return Err(Error::transport().with_reason("writes disabled"));
        }
        entry.content = content;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_find_update() {
        let store = MemoryStore::new();
        assert_eq!(store.find_by_name("a.txt").await.unwrap(), None);

        let id = store
            .create_file("a.txt", Bytes::from_static(b"one"))
            .await
            .unwrap();
        assert_eq!(store.find_by_name("a.txt").await.unwrap(), Some(id.clone()));

        store
            .update_file(&id, Bytes::from_static(b"two"))
            .await
            .unwrap();
        assert_eq!(&store.read_content(&id).await.unwrap()[..], b"two");
        assert_eq!(store.text_of("a.txt").as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn test_removed_file() {
        let store = MemoryStore::new();
        let id = store.insert("a.txt", Bytes::from_static(b"one"));
        assert!(store.remove(&id));

        let err = store.read_content(&id).await.unwrap_err();
        assert!(err.is_not_found());
        let err = store
            .update_file(&id, Bytes::from_static(b"two"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(store.file_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_hooks() {
        let store = MemoryStore::new();
        let id = store.insert("a.txt", Bytes::from_static(b"one"));

        store.set_fail_reads(true);
        let err = store.read_content(&id).await.unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Transport);

        store.set_fail_writes(true);
        assert!(store.create_file("b.txt", Bytes::new()).await.is_err());
        assert!(store.update_file(&id, Bytes::new()).await.is_err());
        assert_eq!(store.file_count(), 1);
    }
}
