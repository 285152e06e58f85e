use std::pin::Pin;
use std::task::{self, Poll};

use serde::{Deserialize, Serialize};

use crate::provider::ModelProviderError;

/// A streamed reply from a model provider.
///
/// The reply arrives as a sequence of [`ModelResponseEvent`]s: any number
/// of text deltas followed by a single [`ModelResponseEvent::Completed`].
pub trait ModelResponse: Sized + Send + 'static {
    /// The error type that may be returned by the provider.
    type Error: ModelProviderError;

    /// Polls for the next event of the reply.
    ///
    /// Returns `Poll::Pending` while the next event has not arrived yet, in
    /// which case the task is woken once it may have. `Ok(Some(_))` carries
    /// an event, `Ok(None)` marks the end of the reply and keeps being
    /// returned afterwards. An `Err` means the reply broke off; whatever was
    /// delivered before it is incomplete.
    fn poll_next_event(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<ModelResponseEvent>, Self::Error>>;
}

/// Why the model stopped generating.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelFinishReason {
    /// The reply is complete.
    Stop,
    /// The reply was cut at the output token limit.
    MaxTokens,
}

/// An event of a streamed reply.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelResponseEvent {
    /// The reply has ended.
    Completed(ModelFinishReason),
    /// The next piece of reply text.
    MessageDelta(String),
}
