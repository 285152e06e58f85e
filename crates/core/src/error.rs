use std::error::Error as StdError;
use std::fmt::{self, Display};

use diary_model::{ErrorKind as ModelErrorKind, ModelProviderError};
use diary_store::Error as StoreError;

/// A failed call to the conversational model.
///
/// The message is whatever the provider reported, and is meant to be shown
/// to the user verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AgentError {
    kind: ModelErrorKind,
    message: String,
}

impl AgentError {
    pub(crate) fn new<S: Into<String>>(kind: ModelErrorKind, message: S) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn from_provider(err: &dyn ModelProviderError) -> Self {
        Self::new(err.kind(), format!("{err}"))
    }

    /// Returns the kind reported by the provider.
    #[inline]
    pub fn kind(&self) -> ModelErrorKind {
        self.kind
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for AgentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl StdError for AgentError {}

/// Errors surfaced by the session controller.
///
/// None of them end the session: the controller is back to awaiting input
/// after returning any of these, except for [`Error::Startup`] which is
/// only returned before a session exists.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// The history file could not be looked up when starting.
    Startup(StoreError),
    /// The model call (or the transcription of a clip) failed. The
    /// conversation did not advance.
    Agent(AgentError),
    /// A note could not be written.
    Notes(StoreError),
    /// The input was blank.
    EmptyInput,
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Startup(err) => write!(f, "cannot open the archive: {err}"),
            Error::Agent(err) => write!(f, "{err}"),
            Error::Notes(err) => write!(f, "cannot save the note: {err}"),
            Error::EmptyInput => write!(f, "the input is empty"),
        }
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            Error::Startup(err) | Error::Notes(err) => Some(err),
            Error::Agent(err) => Some(err),
            Error::EmptyInput => None,
        }
    }
}
