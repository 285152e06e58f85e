use std::sync::Arc;

use bytes::Bytes;
use chrono::NaiveDate;
use diary_model::{AudioPayload, ErrorKind as ModelErrorKind, ModelMessage};
use diary_store::{FileId, MemoryStore, ObjectStore};
use diary_test_model::{PresetFailure, PresetResponse, TestModelProvider};

use super::*;
use crate::config::SessionConfigBuilder;
use crate::notes::NOTE_SAVED_ACK;
use crate::transcript;

const HISTORY: &str = "historia.txt";
const NOTES: &str = "notatki.txt";

fn config() -> SessionConfigBuilder {
    SessionConfigBuilder::new()
        .with_history_file_name(HISTORY)
        .with_notes_file_name(NOTES)
}

fn fixed_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 17).unwrap()
}

async fn start(
    provider: &TestModelProvider,
    store: &Arc<MemoryStore>,
    config: SessionConfigBuilder,
) -> SessionController {
    let store: Arc<dyn ObjectStore> = store.clone();
    SessionController::start(
        AgentClient::new(provider.clone()),
        store,
        config.build(),
    )
    .await
    .unwrap()
    .with_date_source(fixed_date)
}

#[tokio::test]
async fn test_first_turn_creates_history() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::text("Hi there"));
    let store = Arc::new(MemoryStore::new());
    let mut controller = start(&provider, &store, config()).await;
    assert!(controller.context().history_file_id().is_none());

    let reply = controller.handle_input("Hello".into()).await.unwrap();
    assert_eq!(reply.text, "Hi there");
    assert_eq!(reply.kind, ReplyKind::Assistant);
    assert_eq!(reply.save_error, None);
    assert_eq!(controller.state(), ControllerState::AwaitingInput);

    assert!(controller.context().history_file_id().is_some());
    assert_eq!(
        store.text_of(HISTORY).as_deref(),
        Some("Ty: Hello\n\nGemini: Hi there\n\n\n")
    );
}

#[tokio::test]
async fn test_history_is_resumed_and_sent() {
    let store = Arc::new(MemoryStore::new());
    store.insert(HISTORY, Bytes::from_static(b"Ty: a\n\nGemini: b\n\n\n"));

    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::text("d"));
    let mut controller = start(&provider, &store, config()).await;
    assert_eq!(controller.context().conversation().len(), 1);

    controller.handle_input("c".into()).await.unwrap();
    assert_eq!(controller.context().conversation().len(), 2);
    assert_eq!(
        provider.requests()[0].messages,
        vec![
            ModelMessage::user_text("a"),
            ModelMessage::Assistant("b".to_owned()),
            ModelMessage::user_text("c"),
        ]
    );
    // Still one file, overwritten with the full history.
    assert_eq!(store.file_count(), 1);
    assert_eq!(
        store.text_of(HISTORY).as_deref(),
        Some("Ty: a\n\nGemini: b\n\n\nTy: c\n\nGemini: d\n\n\n")
    );
}

#[tokio::test]
async fn test_agent_failure_changes_nothing() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::text("Hi there"));
    provider.add_response(PresetResponse::failing(PresetFailure::Request));
    let store = Arc::new(MemoryStore::new());
    let mut controller = start(&provider, &store, config()).await;

    controller.handle_input("Hello".into()).await.unwrap();
    let before = controller.context().clone();
    let stored_before = store.text_of(HISTORY);

    let err = controller.handle_input("Again".into()).await.unwrap_err();
    assert!(matches!(err, Error::Agent(_)));
    assert_eq!(controller.context(), &before);
    assert_eq!(store.text_of(HISTORY), stored_before);
    assert_eq!(controller.state(), ControllerState::AwaitingInput);
}

#[tokio::test]
async fn test_note_keyword_skips_agent() {
    let provider = TestModelProvider::default();
    let store = Arc::new(MemoryStore::new());
    let mut controller = start(&provider, &store, config()).await;

    let reply = controller
        .handle_input("zapisz: kupić mleko".into())
        .await
        .unwrap();
    assert_eq!(reply.text, NOTE_SAVED_ACK);
    assert_eq!(reply.kind, ReplyKind::NoteSaved);
    assert_eq!(provider.request_count(), 0);
    assert!(controller.context().conversation().is_empty());
    assert_eq!(
        store.text_of(NOTES).as_deref(),
        Some("[DATA: 2024-05-17]\nzapisz: kupić mleko\n---")
    );
    assert_eq!(store.text_of(HISTORY), None);

    controller
        .handle_input("Pamiętaj: dentysta w piątek".into())
        .await
        .unwrap();
    assert_eq!(
        store.text_of(NOTES).as_deref(),
        Some(
            "[DATA: 2024-05-17]\nzapisz: kupić mleko\n---\n\n\
             [DATA: 2024-05-17]\nPamiętaj: dentysta w piątek\n---"
        )
    );
}

#[tokio::test]
async fn test_existing_notes_file_is_reused() {
    let store = Arc::new(MemoryStore::new());
    let notes_id = store.insert(NOTES, Bytes::from_static(b"stare\n\n"));
    let provider = TestModelProvider::default();
    let mut controller = start(&provider, &store, config()).await;
    assert_eq!(controller.context().notes_file_id(), Some(&notes_id));

    controller.handle_input("notatka: nowa".into()).await.unwrap();
    assert_eq!(store.file_count(), 1);
    assert_eq!(
        store.text_of(NOTES).as_deref(),
        Some("stare\n\n[DATA: 2024-05-17]\nnotatka: nowa\n---")
    );
}

#[tokio::test]
async fn test_vanished_history_is_recreated() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::text("1"));
    provider.add_response(PresetResponse::text("2"));
    let store = Arc::new(MemoryStore::new());
    let mut controller = start(&provider, &store, config()).await;

    controller.handle_input("a".into()).await.unwrap();
    let first_id = controller.context().history_file_id().cloned().unwrap();
    store.remove(&first_id);

    let reply = controller.handle_input("b".into()).await.unwrap();
    assert_eq!(reply.save_error, None);
    let second_id = controller.context().history_file_id().cloned().unwrap();
    assert_ne!(first_id, second_id);
    assert_eq!(
        store.text_of(HISTORY),
        Some(transcript::encode(controller.context().conversation()))
    );
}

#[tokio::test]
async fn test_save_failure_keeps_turn() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::text("Hi"));
    let store = Arc::new(MemoryStore::new());
    let mut controller = start(&provider, &store, config()).await;
    store.set_fail_writes(true);

    let reply = controller.handle_input("Hello".into()).await.unwrap();
    assert!(reply.save_error.is_some());
    assert_eq!(controller.context().conversation().len(), 1);
    assert_eq!(store.file_count(), 0);
}

#[tokio::test]
async fn test_note_failure_is_reported() {
    let provider = TestModelProvider::default();
    let store = Arc::new(MemoryStore::new());
    let mut controller = start(&provider, &store, config()).await;
    store.set_fail_writes(true);

    let err = controller.handle_input("zapisz to".into()).await.unwrap_err();
    assert!(matches!(err, Error::Notes(_)));
}

#[tokio::test]
async fn test_unreadable_notes_are_not_overwritten() {
    let store = Arc::new(MemoryStore::new());
    store.insert(NOTES, Bytes::from_static(b"[DATA: 2024-05-01]\nrower\n---"));
    let provider = TestModelProvider::default();
    let mut controller = start(&provider, &store, config()).await;
    store.set_fail_reads(true);

    let err = controller.handle_input("zapisz to".into()).await.unwrap_err();
    assert!(matches!(err, Error::Notes(_)));
    assert_eq!(
        store.text_of(NOTES).as_deref(),
        Some("[DATA: 2024-05-01]\nrower\n---")
    );
}

#[tokio::test]
async fn test_audio_input_is_transcribed() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::text("Jak minął dzień?"));
    provider.add_response(PresetResponse::text("Cieszę się."));
    let store = Arc::new(MemoryStore::new());
    let mut controller = start(&provider, &store, config()).await;

    let reply = controller
        .handle_input(AudioPayload::wav(vec![0u8; 16]).into())
        .await
        .unwrap();
    assert_eq!(reply.input, "Jak minął dzień?");
    assert_eq!(reply.text, "Cieszę się.");
    assert_eq!(provider.request_count(), 2);
    assert_eq!(
        controller.context().conversation().turns()[0].user().text(),
        "Jak minął dzień?"
    );
}

#[tokio::test]
async fn test_spoken_note() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::text("Zanotuj spacer z psem"));
    let store = Arc::new(MemoryStore::new());
    let mut controller = start(&provider, &store, config()).await;

    let reply = controller
        .handle_input(AudioPayload::wav(vec![0u8; 16]).into())
        .await
        .unwrap();
    assert_eq!(reply.kind, ReplyKind::NoteSaved);
    // Only the transcription reached the model.
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test]
async fn test_failed_transcription() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::failing(PresetFailure::Moderated));
    let store = Arc::new(MemoryStore::new());
    let mut controller = start(&provider, &store, config()).await;

    let err = controller
        .handle_input(AudioPayload::wav(vec![0u8; 16]).into())
        .await
        .unwrap_err();
    match err {
        Error::Agent(err) => assert_eq!(err.kind(), ModelErrorKind::Moderated),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_blank_input() {
    let provider = TestModelProvider::default();
    let store = Arc::new(MemoryStore::new());
    let mut controller = start(&provider, &store, config()).await;
    let err = controller.handle_input("  \n".into()).await.unwrap_err();
    assert_eq!(err, Error::EmptyInput);
    assert_eq!(provider.request_count(), 0);
}

#[tokio::test]
async fn test_grounding_in_notes() {
    let store = Arc::new(MemoryStore::new());
    store.insert(NOTES, Bytes::from("[DATA: 2024-05-01]\nrower\n---"));
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::text("Jeździłeś na rowerze."));
    let mut controller = start(
        &provider,
        &store,
        config()
            .with_system_prompt("Odpowiadaj z notatek.")
            .ground_in_notes(true),
    )
    .await;

    controller.handle_input("Co robiłem?".into()).await.unwrap();
    let requests = provider.requests();
    let ModelMessage::System(system) = &requests[0].messages[0] else {
        panic!("missing system instruction");
    };
    assert!(system.starts_with("Odpowiadaj z notatek."));
    assert!(system.contains("rower"));
}

#[tokio::test]
async fn test_grounding_without_notes() {
    let provider = TestModelProvider::default();
    let store = Arc::new(MemoryStore::new());
    let mut controller =
        start(&provider, &store, config().ground_in_notes(true)).await;

    let reply = controller.handle_input("Co robiłem?".into()).await.unwrap();
    assert_eq!(reply.kind, ReplyKind::EmptyArchive);
    assert_eq!(
        reply.text,
        "Twoje archiwum jest jeszcze puste. Zapisz pierwszą notatkę!"
    );
    assert_eq!(provider.request_count(), 0);
    assert!(controller.context().conversation().is_empty());
    assert_eq!(store.text_of(HISTORY), None);

    // Once a note exists, questions reach the model.
    provider.add_response(PresetResponse::text("Kupowałeś mleko."));
    controller.handle_input("zapisz: mleko".into()).await.unwrap();
    let reply = controller.handle_input("Co robiłem?".into()).await.unwrap();
    assert_eq!(reply.kind, ReplyKind::Assistant);
    assert_eq!(provider.request_count(), 1);
}

#[tokio::test]
async fn test_startup_failure() {
    struct Offline;

    #[async_trait::async_trait]
    impl ObjectStore for Offline {
        async fn find_by_name(
            &self,
            _name: &str,
        ) -> Result<Option<FileId>, StoreError> {
            Err(StoreError::permission_denied())
        }

        async fn read_content(
            &self,
            _id: &FileId,
        ) -> Result<Bytes, StoreError> {
            unreachable!()
        }

        async fn create_file(
            &self,
            _name: &str,
            _content: Bytes,
        ) -> Result<FileId, StoreError> {
            unreachable!()
        }

        async fn update_file(
            &self,
            _id: &FileId,
            _content: Bytes,
        ) -> Result<(), StoreError> {
            unreachable!()
        }
    }

    let result = SessionController::start(
        AgentClient::new(TestModelProvider::default()),
        Arc::new(Offline),
        SessionConfig::default(),
    )
    .await;
    assert!(matches!(result, Err(Error::Startup(_))));
}
