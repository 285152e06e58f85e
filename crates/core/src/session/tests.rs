use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use diary_store::{MemoryStore, ObjectStore};
use diary_test_model::{PresetEvent, PresetResponse, TestModelProvider};
use tokio::sync::watch;
use tokio::time::timeout;

use crate::{
    AgentClient, Error, Reply, ReplyKind, SessionBuilder, SessionConfig,
    SessionController, SpeechError, SpeechSynthesizer,
};

struct FakeVoice;

#[async_trait]
impl SpeechSynthesizer for FakeVoice {
    async fn synthesize(
        &self,
        text: &str,
        language_code: &str,
    ) -> Result<Bytes, SpeechError> {
        if text.is_empty() {
            return Err(SpeechError::new("nothing to say"));
        }
        Ok(Bytes::from(format!("{language_code}:{text}")))
    }
}

struct BrokenVoice;

#[async_trait]
impl SpeechSynthesizer for BrokenVoice {
    async fn synthesize(
        &self,
        _text: &str,
        _language_code: &str,
    ) -> Result<Bytes, SpeechError> {
        Err(SpeechError::new("service unavailable"))
    }
}

async fn controller(provider: &TestModelProvider) -> SessionController {
    let store: Arc<dyn ObjectStore> = Arc::new(MemoryStore::new());
    SessionController::start(
        AgentClient::new(provider.clone()),
        store,
        SessionConfig::default(),
    )
    .await
    .unwrap()
}

#[tokio::test]
async fn test_simple_message() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::with_events(vec![
        PresetEvent::MessageDelta("Hi, ".to_owned()),
        PresetEvent::MessageDelta("how was your day?".to_owned()),
    ]));

    let (idle_tx, mut idle_rx) = watch::channel::<bool>(false);
    let replies = Arc::new(Mutex::new(vec![]));
    let deltas = Arc::new(Mutex::new(String::new()));

    let session = SessionBuilder::with_controller(controller(&provider).await)
        .on_reply({
            let replies = Arc::clone(&replies);
            move |reply: &Reply| replies.lock().unwrap().push(reply.clone())
        })
        .on_delta({
            let deltas = Arc::clone(&deltas);
            move |delta: &str| deltas.lock().unwrap().push_str(delta)
        })
        .on_idle(move || {
            idle_tx.send(true).unwrap();
        })
        .build();
    session.send_input("Hello").unwrap();

    timeout(Duration::from_millis(500), idle_rx.wait_for(|v| *v))
        .await
        .unwrap()
        .unwrap();

    let replies = replies.lock().unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0].text, "Hi, how was your day?");
    assert_eq!(replies[0].kind, ReplyKind::Assistant);
    assert_eq!(*deltas.lock().unwrap(), "Hi, how was your day?");
}

#[tokio::test]
async fn test_inputs_are_handled_in_order() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::text("one"));
    provider.add_response(PresetResponse::text("two"));

    let session = SessionBuilder::with_controller(controller(&provider).await)
        .build();
    session.send_input("first").unwrap();
    session.send_input("zapisz drugie").unwrap();
    session.send_input("third").unwrap();

    let controller = timeout(Duration::from_millis(500), session.close())
        .await
        .unwrap()
        .unwrap();
    let turns = controller.context().conversation().turns();
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].user().text(), "first");
    assert_eq!(turns[0].assistant().text(), "one");
    assert_eq!(turns[1].user().text(), "third");
    assert_eq!(turns[1].assistant().text(), "two");
    assert!(controller.context().notes_file_id().is_some());
}

#[tokio::test]
async fn test_errors_are_reported() {
    // Nothing scripted, so the model call fails.
    let provider = TestModelProvider::default();
    let errors = Arc::new(Mutex::new(vec![]));

    let session = SessionBuilder::with_controller(controller(&provider).await)
        .on_error({
            let errors = Arc::clone(&errors);
            move |err: &Error| errors.lock().unwrap().push(err.clone())
        })
        .build();
    session.send_input("Hello").unwrap();
    session.send_input("   ").unwrap();

    let controller = timeout(Duration::from_millis(500), session.close())
        .await
        .unwrap()
        .unwrap();
    assert!(controller.context().conversation().is_empty());

    let errors = errors.lock().unwrap();
    assert_eq!(errors.len(), 2);
    assert!(matches!(errors[0], Error::Agent(_)));
    assert_eq!(errors[1], Error::EmptyInput);
}

#[tokio::test]
async fn test_replies_are_voiced() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::text("Dobranoc"));
    let audio = Arc::new(Mutex::new(vec![]));

    let session = SessionBuilder::with_controller(controller(&provider).await)
        .with_speech(FakeVoice, "pl")
        .on_audio({
            let audio = Arc::clone(&audio);
            move |clip: Bytes| audio.lock().unwrap().push(clip)
        })
        .build();
    session.send_input("Idę spać").unwrap();
    session.send_input("pamiętaj o kluczach").unwrap();
    timeout(Duration::from_millis(500), session.close())
        .await
        .unwrap()
        .unwrap();

    let audio = audio.lock().unwrap();
    assert_eq!(audio.len(), 2);
    assert_eq!(audio[0], Bytes::from("pl:Dobranoc"));
    assert!(audio[1].starts_with(b"pl:Notatka"));
}

#[tokio::test]
async fn test_failed_voicing_keeps_reply() {
    let provider = TestModelProvider::default();
    provider.add_response(PresetResponse::text("Dobranoc"));
    let replies = Arc::new(Mutex::new(vec![]));
    let audio = Arc::new(Mutex::new(vec![]));

    let session = SessionBuilder::with_controller(controller(&provider).await)
        .with_speech(BrokenVoice, "pl")
        .on_reply({
            let replies = Arc::clone(&replies);
            move |reply: &Reply| {
                replies.lock().unwrap().push(reply.text.clone());
            }
        })
        .on_audio({
            let audio = Arc::clone(&audio);
            move |clip: Bytes| audio.lock().unwrap().push(clip)
        })
        .build();
    session.send_input("Idę spać").unwrap();
    let controller = timeout(Duration::from_millis(500), session.close())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(*replies.lock().unwrap(), vec!["Dobranoc".to_owned()]);
    assert!(audio.lock().unwrap().is_empty());
    assert_eq!(controller.context().conversation().len(), 1);
}
