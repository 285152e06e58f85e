//! Core logic of the diary assistant: the transcript format, persistence
//! of the conversation and the notes archive, and the session loop.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod agent_client;
mod config;
mod controller;
pub mod conversation;
mod error;
pub mod history;
pub mod notes;
mod persist;
mod session;
pub mod speech;
pub mod transcript;

pub use agent_client::AgentClient;
pub use config::{SessionConfig, SessionConfigBuilder};
pub use controller::{
    ControllerState, Reply, ReplyKind, SessionContext, SessionController,
    UserInput,
};
pub use error::{AgentError, Error};
pub use session::{Session, SessionBuilder, SessionClosed};
pub use speech::{SpeechError, SpeechSynthesizer};
