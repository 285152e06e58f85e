use bytes::Bytes;
use diary_store::{Error as StoreError, FileId, ObjectStore};

/// Reads a whole blob as text.
pub(crate) async fn read_text(
    store: &dyn ObjectStore,
    file_id: &FileId,
) -> Result<String, StoreError> {
    let content = store.read_content(file_id).await?;
    match String::from_utf8(content.to_vec()) {
        Ok(text) => Ok(text),
        Err(err) => {
            warn!("{file_id} is not valid UTF-8, decoding lossily");
            Ok(String::from_utf8_lossy(err.as_bytes()).into_owned())
        }
    }
}

/// Overwrites a blob, creating it if needed.
///
/// With a known identifier the file is updated in place. If the update
/// reports not-found, the identifier is dropped and the file is created
/// again, exactly once: any failure of the create itself is returned.
///
/// On return `file_id` holds the identifier the next write should target,
/// which is `None` when the cached one turned out to be stale and the
/// re-create failed.
pub(crate) async fn write_blob(
    store: &dyn ObjectStore,
    file_id: &mut Option<FileId>,
    file_name: &str,
    content: String,
) -> Result<FileId, StoreError> {
    let content = Bytes::from(content);

    if let Some(id) = file_id.as_ref() {
        match store.update_file(id, content.clone()).await {
            Ok(()) => {
                trace!("updated {file_name} ({id})");
                return Ok(id.clone());
            }
            Err(err) if err.is_not_found() => {
                warn!("{file_name} ({id}) is gone, creating it again");
                *file_id = None;
            }
            Err(err) => return Err(err),
        }
    }

    let id = store.create_file(file_name, content).await?;
    info!("created {file_name} ({id})");
    *file_id = Some(id.clone());
    Ok(id)
}

#[cfg(test)]
mod tests {
    use diary_store::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_create_then_update() {
        let store = MemoryStore::new();
        let mut file_id = None;

        let id = write_blob(&store, &mut file_id, "a.txt", "one".to_owned())
            .await
            .unwrap();
        assert_eq!(file_id.as_ref(), Some(&id));

        let same = write_blob(&store, &mut file_id, "a.txt", "two".to_owned())
            .await
            .unwrap();
        assert_eq!(same, id);
        assert_eq!(store.file_count(), 1);
        assert_eq!(store.text_of("a.txt").as_deref(), Some("two"));
    }

    #[tokio::test]
    async fn test_recreate_once() {
        let store = MemoryStore::new();
        let stale = store.insert("a.txt", Bytes::from_static(b"old"));
        store.remove(&stale);

        let mut file_id = Some(stale.clone());
        let id = write_blob(&store, &mut file_id, "a.txt", "new".to_owned())
            .await
            .unwrap();
        assert_ne!(id, stale);
        assert_eq!(file_id, Some(id));
        assert_eq!(store.text_of("a.txt").as_deref(), Some("new"));
    }

    #[tokio::test]
    async fn test_failed_recreate_clears_id() {
        let store = MemoryStore::new();
        let stale = store.insert("a.txt", Bytes::from_static(b"old"));
        store.remove(&stale);
        store.set_fail_writes(true);

        let mut file_id = Some(stale);
        let err = write_blob(&store, &mut file_id, "a.txt", "new".to_owned())
            .await
            .unwrap_err();
        assert!(!err.is_not_found());
        assert_eq!(file_id, None);
    }

    #[tokio::test]
    async fn test_other_update_errors_keep_id() {
        let store = MemoryStore::new();
        let id = store.insert("a.txt", Bytes::from_static(b"old"));
        store.set_fail_writes(true);

        let mut file_id = Some(id.clone());
        assert!(
            write_blob(&store, &mut file_id, "a.txt", "new".to_owned())
                .await
                .is_err()
        );
        assert_eq!(file_id, Some(id));
        assert_eq!(store.file_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_lossy() {
        let store = MemoryStore::new();
        let id = store.insert("a.txt", Bytes::from_static(b"ok \xff"));
        let text = read_text(&store, &id).await.unwrap();
        assert!(text.starts_with("ok "));
    }
}
