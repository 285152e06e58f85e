//! A diary assistant for the terminal.
//!
//! The crate wires [`diary_core`] to a Gemini model, a Google Drive (or
//! local directory) archive and a speech service. The CLI reads its
//! settings from the environment, see [`Settings`].

#![deny(missing_docs)]

#[macro_use]
extern crate tracing;

mod settings;
mod tts;

pub use settings::{Settings, SettingsError, Storage};
pub use tts::GoogleTts;

/// Re-exports of [`diary_core`] crate.
pub mod core {
    pub use diary_core::*;
}
