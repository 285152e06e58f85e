use std::sync::Arc;

use bytes::Bytes;

use super::{Session, SessionState, Voice};
use crate::controller::{Reply, SessionController};
use crate::error::Error;
use crate::speech::SpeechSynthesizer;

/// [`Session`] builder.
pub struct SessionBuilder {
    state: SessionState,
}

impl SessionBuilder {
    /// Creates a new builder around a started controller.
    #[inline]
    pub fn with_controller(controller: SessionController) -> Self {
        Self {
            state: SessionState {
                controller,
                on_reply: None,
                on_error: None,
                on_delta: None,
                on_audio: None,
                on_idle: None,
                voice: None,
            },
        }
    }

    /// Attaches a callback to be invoked with every reply.
    #[inline]
    pub fn on_reply(
        mut self,
        on_reply: impl Fn(&Reply) + Send + Sync + 'static,
    ) -> Self {
        self.state.on_reply = Some(Box::new(on_reply));
        self
    }

    /// Attaches a callback to be invoked when an input fails.
    #[inline]
    pub fn on_error(
        mut self,
        on_error: impl Fn(&Error) + Send + Sync + 'static,
    ) -> Self {
        self.state.on_error = Some(Box::new(on_error));
        self
    }

    /// Attaches a callback to be invoked with every piece of a model reply
    /// as it streams in.
    #[inline]
    pub fn on_delta(
        mut self,
        on_delta: impl Fn(&str) + Send + Sync + 'static,
    ) -> Self {
        self.state.on_delta = Some(Arc::new(on_delta));
        self
    }

    /// Attaches a callback to be invoked with the voiced reply.
    #[inline]
    pub fn on_audio(
        mut self,
        on_audio: impl Fn(Bytes) + Send + Sync + 'static,
    ) -> Self {
        self.state.on_audio = Some(Box::new(on_audio));
        self
    }

    /// Attaches a callback to be invoked when the session is idle.
    #[inline]
    pub fn on_idle(
        mut self,
        on_idle: impl Fn() + Send + Sync + 'static,
    ) -> Self {
        self.state.on_idle = Some(Box::new(on_idle));
        self
    }

    /// Voices every reply in the given language.
    #[inline]
    pub fn with_speech<T, S>(mut self, synthesizer: T, language_code: S) -> Self
    where
        T: SpeechSynthesizer + 'static,
        S: Into<String>,
    {
        self.state.voice = Some(Voice {
            synthesizer: Arc::new(synthesizer),
            language_code: language_code.into(),
        });
        self
    }

    /// Spawns the session. Must be called within a tokio runtime.
    #[inline]
    pub fn build(self) -> Session {
        Session::spawn(self.state)
    }
}
