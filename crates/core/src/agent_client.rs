use std::future::poll_fn;
use std::pin::{Pin, pin};
use std::sync::Arc;

use diary_model::{
    AudioPayload, ErrorKind as ModelErrorKind, ModelFinishReason,
    ModelMessage, ModelProvider, ModelRequest, ModelResponse,
    ModelResponseEvent, UserContent,
};
use tracing::Instrument;

use crate::conversation::Conversation;
use crate::error::AgentError;

type SendRequestResult = Result<String, AgentError>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
type DeltaFn = Box<dyn Fn(&str) + Send + 'static>;
#[rustfmt::skip]
type HandlerFn = Arc<
    dyn Fn(ModelRequest, DeltaFn) -> BoxedSendRequestFuture + Send + Sync
>;

/// A wrapper around a model provider that turns a streamed response into
/// a complete reply and provides a type-erased interface for the
/// controller.
#[derive(Clone)]
pub struct AgentClient {
    handler_fn: HandlerFn,
}

impl AgentClient {
    /// Wraps a model provider.
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `AgentClient` doesn't have a
        // generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req, on_delta| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    let resp_or_err = fut.await;
                    handle_response::<P>(resp_or_err, on_delta).await
                }
                .instrument(trace_span!("agent client req")),
            )
        });
        Self { handler_fn }
    }

    /// Asks the model to reply to `input`, given the earlier turns.
    ///
    /// `on_delta` is invoked with every piece of the reply as it streams in.
    /// A blank reply is reported as an error.
    pub async fn converse(
        &self,
        system: Option<&str>,
        prior: &Conversation,
        input: &str,
        on_delta: impl Fn(&str) + Send + 'static,
    ) -> Result<String, AgentError> {
        let req = build_request(system, prior, input.into());
        let reply = (self.handler_fn)(req, Box::new(on_delta)).await?;
        non_blank(reply, "the model returned an empty reply")
    }

    /// Converts a recorded clip to text.
    pub async fn transcribe(
        &self,
        prompt: &str,
        audio: AudioPayload,
    ) -> Result<String, AgentError> {
        let req = ModelRequest {
            messages: vec![
                ModelMessage::user_text(prompt),
                ModelMessage::User(UserContent::Audio(audio)),
            ],
        };
        let text = (self.handler_fn)(req, Box::new(|_: &str| {})).await?;
        non_blank(text, "no speech was recognized")
    }
}

fn non_blank(text: String, message: &str) -> Result<String, AgentError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AgentError::new(ModelErrorKind::Other, message));
    }
    Ok(trimmed.to_owned())
}

/// Builds the request for one exchange: the system instruction, every
/// earlier turn as a user/assistant pair, then the new input.
pub(crate) fn build_request(
    system: Option<&str>,
    prior: &Conversation,
    input: UserContent,
) -> ModelRequest {
    let mut messages = Vec::with_capacity(prior.len() * 2 + 2);
    if let Some(system) = system {
        messages.push(ModelMessage::System(system.to_owned()));
    }
    for turn in prior {
        messages.push(ModelMessage::user_text(turn.user().text()));
        messages
            .push(ModelMessage::Assistant(turn.assistant().text().to_owned()));
    }
    messages.push(ModelMessage::User(input));
    ModelRequest { messages }
}

async fn handle_response<P: ModelProvider + 'static>(
    resp_or_err: Result<P::Response, P::Error>,
    on_delta: DeltaFn,
) -> SendRequestResult {
    let resp = match resp_or_err {
        Ok(resp) => resp,
        Err(err) => {
            error!("got an error: {err:?}");
            return Err(AgentError::from_provider(&err));
        }
    };

    let mut transcript = String::new();
    let mut finish_reason = None;

    trace!("start receiving events");

    let mut pinned_resp = pin!(resp);
    loop {
        let event_or_err =
            poll_fn(|cx| pinned_resp.as_mut().poll_next_event(cx)).await;
        let event = match event_or_err {
            Ok(Some(event)) => event,
            Ok(None) => break,
            Err(err) => {
                error!("got an error: {err:?}");
                return Err(AgentError::from_provider(&err));
            }
        };
        trace!("got an event: {event:?}");

        match event {
            ModelResponseEvent::MessageDelta(msg) => {
                transcript.push_str(&msg);
                on_delta(&msg);
            }
            ModelResponseEvent::Completed(reason) => {
                finish_reason = Some(reason);
            }
        }
    }

    if finish_reason == Some(ModelFinishReason::MaxTokens) {
        warn!("reply was truncated at the token limit");
    }
    trace!("finished a request");

    Ok(transcript)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use diary_test_model::{
        PresetEvent, PresetFailure, PresetResponse, TestModelProvider,
    };

    use super::*;
    use crate::conversation::Turn;

    #[tokio::test]
    async fn test_converse() {
        let model_provider = TestModelProvider::default();
        model_provider.add_response(PresetResponse::with_events([
            PresetEvent::MessageDelta("Jak ".to_owned()),
            PresetEvent::MessageDelta("się ".to_owned()),
            PresetEvent::MessageDelta("masz?".to_owned()),
        ]));

        let client = AgentClient::new(model_provider.clone());
        let prior = Conversation::from(vec![Turn::new("Hello", "Hi there")]);
        let deltas = Arc::new(AtomicUsize::new(0));
        let reply = client
            .converse(Some("Bądź miły."), &prior, "Hej", {
                let deltas = Arc::clone(&deltas);
                move |_| {
                    deltas.fetch_add(1, Ordering::Relaxed);
                }
            })
            .await
            .unwrap();
        assert_eq!(reply, "Jak się masz?");
        assert_eq!(deltas.load(Ordering::Relaxed), 3);

        let requests = model_provider.requests();
        assert_eq!(
            requests[0].messages,
            vec![
                ModelMessage::System("Bądź miły.".to_owned()),
                ModelMessage::user_text("Hello"),
                ModelMessage::Assistant("Hi there".to_owned()),
                ModelMessage::user_text("Hej"),
            ]
        );
    }

    #[tokio::test]
    async fn test_error_handling() {
        let model_provider = TestModelProvider::default();
        model_provider.add_response(PresetResponse::failing(
            PresetFailure::Moderated,
        ));
        model_provider.add_response(PresetResponse::failing(
            PresetFailure::Stream,
        ));
        model_provider.add_response(PresetResponse::text("   "));

        let client = AgentClient::new(model_provider);
        let empty = Conversation::new();

        let err = client.converse(None, &empty, "Hi", |_| {}).await.unwrap_err();
        assert_eq!(err.kind(), ModelErrorKind::Moderated);
        let err = client.converse(None, &empty, "Hi", |_| {}).await.unwrap_err();
        assert_eq!(err.kind(), ModelErrorKind::Other);
        let err = client.converse(None, &empty, "Hi", |_| {}).await.unwrap_err();
        assert_eq!(err.message(), "the model returned an empty reply");
    }

    #[tokio::test]
    async fn test_transcribe() {
        let model_provider = TestModelProvider::default();
        model_provider.add_response(PresetResponse::text(" zapisz: spacer \n"));

        let client = AgentClient::new(model_provider.clone());
        let text = client
            .transcribe("Zamień tę mowę na tekst: ", AudioPayload::wav(vec![1u8]))
            .await
            .unwrap();
        assert_eq!(text, "zapisz: spacer");

        let request = &model_provider.requests()[0];
        assert!(matches!(
            request.last_user_content(),
            Some(UserContent::Audio(_))
        ));
    }
}
