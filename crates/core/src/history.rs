//! Loading and saving the conversation transcript.

use diary_store::{Error as StoreError, FileId, ObjectStore};

use crate::conversation::Conversation;
use crate::persist::{read_text, write_blob};
use crate::transcript;

/// The history found in the store when a session starts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadedHistory {
    /// Identifier of the history file, `None` if there is none yet.
    pub file_id: Option<FileId>,
    /// The decoded conversation.
    pub conversation: Conversation,
    /// Number of malformed records dropped while decoding.
    pub skipped: usize,
}

/// Looks up the history file by name and decodes it.
///
/// An absent file gives an empty conversation. If the file exists but its
/// content cannot be fetched, the conversation is empty as well and the
/// identifier is kept, so the next save overwrites the file. Only a
/// failing lookup is returned as an error.
pub async fn load_history(
    store: &dyn ObjectStore,
    file_name: &str,
) -> Result<LoadedHistory, StoreError> {
    let Some(file_id) = store.find_by_name(file_name).await? else {
        info!("no history in {file_name} yet");
        return Ok(LoadedHistory::default());
    };

    let blob = match read_text(store, &file_id).await {
        Ok(blob) => blob,
        Err(err) => {
            warn!("cannot read {file_name} ({file_id}), starting empty: {err}");
            return Ok(LoadedHistory {
                file_id: Some(file_id),
                ..Default::default()
            });
        }
    };

    let decoded = transcript::decode(&blob);
    if decoded.skipped > 0 {
        warn!(
            "dropped {} malformed record(s) from {file_name}",
            decoded.skipped
        );
    }
    let skipped = decoded.skipped;
    let conversation = decoded.into_conversation();
    info!("loaded {} turn(s) from {file_name}", conversation.len());
    Ok(LoadedHistory {
        file_id: Some(file_id),
        conversation,
        skipped,
    })
}

/// Writes the whole conversation, replacing what was stored before.
///
/// See [`LoadedHistory::file_id`] for the identifier to start with. If the
/// file behind `file_id` has vanished, it is created again once. On return
/// `file_id` holds the identifier the next save should target.
pub async fn save_history(
    store: &dyn ObjectStore,
    file_id: &mut Option<FileId>,
    file_name: &str,
    conversation: &Conversation,
) -> Result<FileId, StoreError> {
    let blob = transcript::encode(conversation);
    write_blob(store, file_id, file_name, blob).await
}
