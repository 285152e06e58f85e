mod builder;
#[cfg(test)]
mod tests;

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::controller::{Reply, SessionController, UserInput};
use crate::error::Error;
use crate::speech::SpeechSynthesizer;
pub use builder::SessionBuilder;

pub(crate) type ReplyFn = Box<dyn Fn(&Reply) + Send + Sync>;
pub(crate) type ErrorFn = Box<dyn Fn(&Error) + Send + Sync>;
pub(crate) type DeltaFn = Arc<dyn Fn(&str) + Send + Sync>;
pub(crate) type AudioFn = Box<dyn Fn(Bytes) + Send + Sync>;
pub(crate) type IdleFn = Box<dyn Fn() + Send + Sync>;

pub(crate) struct Voice {
    pub(crate) synthesizer: Arc<dyn SpeechSynthesizer>,
    pub(crate) language_code: String,
}

/// A running session.
///
/// A session owns its [`SessionController`] on a background task and
/// handles the inputs sent to it one at a time, in order. Inputs sent while
/// another one is being handled are queued. Results are reported through
/// the callbacks registered on the [`SessionBuilder`].
pub struct Session {
    input_tx: mpsc::UnboundedSender<UserInput>,
    task: JoinHandle<SessionController>,
}

impl Session {
    /// Queues an input for handling.
    #[inline]
    pub fn send_input<I: Into<UserInput>>(
        &self,
        input: I,
    ) -> Result<(), SessionClosed> {
        self.input_tx.send(input.into()).map_err(|_| SessionClosed)
    }

    /// Stops accepting inputs, waits for the queued ones to be handled and
    /// returns the controller.
    pub async fn close(self) -> Result<SessionController, SessionClosed> {
        let Self { input_tx, task } = self;
        drop(input_tx);
        task.await.map_err(|err| {
            error!("session task failed: {err}");
            SessionClosed
        })
    }

    fn spawn(state: SessionState) -> Self {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(
            run_session(state, input_rx).instrument(trace_span!("session")),
        );
        Self { input_tx, task }
    }
}

/// The error returned when a session is no longer running.
pub struct SessionClosed;

impl fmt::Debug for SessionClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionClosed").finish()
    }
}

impl fmt::Display for SessionClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        "the session has closed".fmt(f)
    }
}

impl StdError for SessionClosed {}

pub(crate) struct SessionState {
    pub(crate) controller: SessionController,
    pub(crate) on_reply: Option<ReplyFn>,
    pub(crate) on_error: Option<ErrorFn>,
    pub(crate) on_delta: Option<DeltaFn>,
    pub(crate) on_audio: Option<AudioFn>,
    pub(crate) on_idle: Option<IdleFn>,
    pub(crate) voice: Option<Voice>,
}

impl SessionState {
    async fn process(&mut self, input: UserInput) {
        let on_delta = self.on_delta.clone();
        let result = self
            .controller
            .handle_input_streaming(input, move |delta: &str| {
                if let Some(on_delta) = &on_delta {
                    on_delta(delta);
                }
            })
            .await;

        let reply = match result {
            Ok(reply) => reply,
            Err(err) => {
                match &self.on_error {
                    Some(on_error) => on_error(&err),
                    None => warn!("input failed: {err}"),
                }
                return;
            }
        };
        if let Some(on_reply) = &self.on_reply {
            on_reply(&reply);
        }
        self.speak(&reply.text).await;
    }

    async fn speak(&self, text: &str) {
        let Some(voice) = &self.voice else {
            return;
        };
        match voice
            .synthesizer
            .synthesize(text, &voice.language_code)
            .await
        {
            Ok(audio) => {
                if let Some(on_audio) = &self.on_audio {
                    on_audio(audio);
                }
            }
            // Voicing is optional, the reply was already delivered.
            Err(err) => warn!("{err}"),
        }
    }
}

async fn run_session(
    mut state: SessionState,
    mut input_rx: mpsc::UnboundedReceiver<UserInput>,
) -> SessionController {
    debug!("started");
    while let Some(input) = input_rx.recv().await {
        trace!("received input: {}", input_kind(&input));
        state.process(input).instrument(trace_span!("proc input")).await;

        if input_rx.is_empty() {
            if let Some(on_idle) = &state.on_idle {
                on_idle();
            }
        }
    }
    debug!("will terminate");
    state.controller
}

#[inline]
fn input_kind(input: &UserInput) -> &'static str {
    match input {
        UserInput::Text(_) => "text",
        UserInput::Audio(_) => "audio",
    }
}
