//! The notes archive: date-tagged entries appended on request.

use chrono::NaiveDate;
use diary_store::{Error as StoreError, FileId, ObjectStore};

use crate::persist::{read_text, write_blob};

/// Words that turn an input into a note instead of a question.
pub const DEFAULT_NOTE_KEYWORDS: [&str; 4] =
    ["zapisz", "zanotuj", "notatka", "pamiętaj"];

/// The reply given once a note is stored.
pub const NOTE_SAVED_ACK: &str = "Notatka została zapisana w Twoim archiwum.";

/// Returns `true` if `input` contains any of `keywords`, ignoring case.
pub fn is_note_request<S: AsRef<str>>(input: &str, keywords: &[S]) -> bool {
    let input = input.to_lowercase();
    keywords.iter().any(|keyword| {
        let keyword = keyword.as_ref().to_lowercase();
        !keyword.is_empty() && input.contains(&keyword)
    })
}

/// Formats one archive entry.
pub fn format_note(date: NaiveDate, text: &str) -> String {
    format!("[DATA: {}]\n{}\n---", date.format("%Y-%m-%d"), text)
}

/// Reads the whole archive. Any failure reads as an empty archive.
pub async fn read_notes(store: &dyn ObjectStore, file_id: &FileId) -> String {
    match read_text(store, file_id).await {
        Ok(notes) => notes,
        Err(err) => {
            warn!("cannot read notes ({file_id}): {err}");
            String::new()
        }
    }
}

/// Appends `entry` to the archive, creating it if needed.
///
/// The existing content is fetched, trimmed, and written back with the new
/// entry after a blank line. On return `file_id` holds the identifier the
/// next append should target.
///
/// A vanished archive starts over empty. Any other read failure is
/// returned and nothing is written, so earlier entries are never lost.
pub async fn append_note(
    store: &dyn ObjectStore,
    file_id: &mut Option<FileId>,
    file_name: &str,
    entry: &str,
) -> Result<FileId, StoreError> {
    let existing = match file_id.as_ref() {
        Some(id) => match read_text(store, id).await {
            Ok(existing) => existing,
            Err(err) if err.is_not_found() => {
                warn!("notes file {id} vanished, starting over");
                String::new()
            }
            Err(err) => return Err(err),
        },
        None => String::new(),
    };
    let existing = existing.trim();
    let content = if existing.is_empty() {
        entry.to_owned()
    } else {
        format!("{existing}\n\n{entry}")
    };
    write_blob(store, file_id, file_name, content).await
}

#[cfg(test)]
mod tests {
    use diary_store::MemoryStore;

    use super::*;

    const FILE_NAME: &str = "notes_git_data.txt";

    #[test]
    fn test_is_note_request() {
        let keywords = DEFAULT_NOTE_KEYWORDS;
        assert!(is_note_request("zapisz: kupić mleko", &keywords));
        assert!(is_note_request("ZANOTUJ to proszę", &keywords));
        assert!(is_note_request("Pamiętaj o urodzinach mamy", &keywords));
        assert!(is_note_request("nowa Notatka", &keywords));
        assert!(!is_note_request("Co robiłem wczoraj?", &keywords));
        assert!(!is_note_request("cokolwiek", &[""]));
    }

    #[test]
    fn test_format_note() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        assert_eq!(
            format_note(date, "zapisz: kupić mleko"),
            "[DATA: 2024-03-07]\nzapisz: kupić mleko\n---"
        );
    }

    #[tokio::test]
    async fn test_append_note() {
        let store = MemoryStore::new();
        let mut file_id = None;
        append_note(&store, &mut file_id, FILE_NAME, "[DATA: 1]\na\n---")
            .await
            .unwrap();
        append_note(&store, &mut file_id, FILE_NAME, "[DATA: 2]\nb\n---")
            .await
            .unwrap();
        assert_eq!(
            store.text_of(FILE_NAME).as_deref(),
            Some("[DATA: 1]\na\n---\n\n[DATA: 2]\nb\n---")
        );
        assert_eq!(store.file_count(), 1);
    }

    #[tokio::test]
    async fn test_append_to_vanished_archive() {
        let store = MemoryStore::new();
        let mut file_id = None;
        let first = append_note(&store, &mut file_id, FILE_NAME, "a")
            .await
            .unwrap();
        store.remove(&first);

        append_note(&store, &mut file_id, FILE_NAME, "b")
            .await
            .unwrap();
        assert_eq!(store.text_of(FILE_NAME).as_deref(), Some("b"));
    }

    #[tokio::test]
    async fn test_unreadable_archive_is_kept() {
        let store = MemoryStore::new();
        let archive =
            "[DATA: 2024-01-01]\na\n---\n\n[DATA: 2024-01-02]\nb\n---";
        let mut file_id = Some(store.insert(FILE_NAME, archive.into()));
        store.set_fail_reads(true);

        let err = append_note(
            &store,
            &mut file_id,
            FILE_NAME,
            "[DATA: 2024-01-03]\nc\n---",
        )
        .await
        .unwrap_err();
        assert!(!err.is_not_found());
        assert!(file_id.is_some());
        assert_eq!(store.text_of(FILE_NAME).as_deref(), Some(archive));
    }
}
