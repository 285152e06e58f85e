//! Speech synthesis of replies.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

/// A service that voices a reply.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesizes `text` in the language given by a BCP-47 code (e.g.
    /// `pl`) and returns the encoded audio.
    async fn synthesize(
        &self,
        text: &str,
        language_code: &str,
    ) -> Result<Bytes, SpeechError>;
}

#[async_trait]
impl<T: SpeechSynthesizer + ?Sized> SpeechSynthesizer for Arc<T> {
    #[inline]
    async fn synthesize(
        &self,
        text: &str,
        language_code: &str,
    ) -> Result<Bytes, SpeechError> {
        (**self).synthesize(text, language_code).await
    }
}

/// The error type of [`SpeechSynthesizer`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpeechError {
    reason: Cow<'static, str>,
}

impl SpeechError {
    /// Creates an error with the given reason.
    #[inline]
    pub fn new<S: Into<Cow<'static, str>>>(reason: S) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Returns why synthesis failed.
    #[inline]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

impl Display for SpeechError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "speech synthesis failed: {}", self.reason)
    }
}

impl StdError for SpeechError {}
