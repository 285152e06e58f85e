//! An abstraction layer for the conversational models behind the diary.
//!
//! This crate establishes an unified protocol for the session controller
//! to talk to a hosted generative model, so that the diary can switch
//! between providers (or a scripted fake in tests) without touching the
//! core codebase.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
