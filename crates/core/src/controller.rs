#[cfg(test)]
mod tests;

use std::sync::Arc;

use chrono::{Local, NaiveDate};
use diary_model::AudioPayload;
use diary_store::{Error as StoreError, FileId, ObjectStore};

use crate::agent_client::AgentClient;
use crate::config::SessionConfig;
use crate::conversation::{Conversation, Turn};
use crate::error::Error;
use crate::{history, notes};

/// An input from the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UserInput {
    /// Typed text.
    Text(String),
    /// A recorded clip, transcribed before it is handled.
    Audio(AudioPayload),
}

impl From<String> for UserInput {
    #[inline]
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for UserInput {
    #[inline]
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<AudioPayload> for UserInput {
    #[inline]
    fn from(value: AudioPayload) -> Self {
        Self::Audio(value)
    }
}

/// What kind of reply the controller produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReplyKind {
    /// A reply generated by the model.
    Assistant,
    /// The fixed acknowledgement of a stored note.
    NoteSaved,
    /// The fixed reply to a question while the notes archive, which the
    /// model is meant to answer from, is still empty.
    EmptyArchive,
}

/// The outcome of handling one input.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    /// The text of the input as it was handled (transcribed for clips).
    pub input: String,
    /// The reply to show.
    pub text: String,
    /// What produced the reply.
    pub kind: ReplyKind,
    /// Set if the exchange could not be persisted. The in-memory
    /// conversation still holds the turn.
    pub save_error: Option<StoreError>,
}

/// Where the controller is in its input loop.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ControllerState {
    /// Ready for the next input.
    #[default]
    AwaitingInput,
    /// An input is being handled.
    Processing,
}

/// The state of one session, owned by its controller.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionContext {
    conversation: Conversation,
    history_file_id: Option<FileId>,
    notes_file_id: Option<FileId>,
}

impl SessionContext {
    /// Returns the conversation so far.
    #[inline]
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Returns the cached identifier of the history file.
    #[inline]
    pub fn history_file_id(&self) -> Option<&FileId> {
        self.history_file_id.as_ref()
    }

    /// Returns the cached identifier of the notes file.
    #[inline]
    pub fn notes_file_id(&self) -> Option<&FileId> {
        self.notes_file_id.as_ref()
    }
}

/// Drives the turn loop of a session: one input at a time, each one
/// answered by the model (or stored as a note) and then persisted.
pub struct SessionController {
    agent: AgentClient,
    store: Arc<dyn ObjectStore>,
    config: SessionConfig,
    context: SessionContext,
    state: ControllerState,
    today: fn() -> NaiveDate,
}

impl SessionController {
    /// Loads the history and the notes file identifier and returns a
    /// controller awaiting input.
    ///
    /// Fails only if the store cannot be queried at all, which usually
    /// means the credentials are wrong.
    pub async fn start(
        agent: AgentClient,
        store: Arc<dyn ObjectStore>,
        config: SessionConfig,
    ) -> Result<Self, Error> {
        let loaded = history::load_history(&*store, &config.history_file_name)
            .await
            .map_err(Error::Startup)?;
        let notes_file_id = store
            .find_by_name(&config.notes_file_name)
            .await
            .map_err(Error::Startup)?;

        let context = SessionContext {
            conversation: loaded.conversation,
            history_file_id: loaded.file_id,
            notes_file_id,
        };
        Ok(Self {
            agent,
            store,
            config,
            context,
            state: ControllerState::AwaitingInput,
            today: local_today,
        })
    }

    /// Overrides where note dates come from.
    #[inline]
    pub fn with_date_source(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Returns the session state.
    #[inline]
    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    /// Returns where the controller is in its loop.
    #[inline]
    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Handles one input. See [`Self::handle_input_streaming`].
    #[inline]
    pub async fn handle_input(
        &mut self,
        input: UserInput,
    ) -> Result<Reply, Error> {
        self.handle_input_streaming(input, |_| {}).await
    }

    /// Handles one input, reporting the reply as it streams in.
    ///
    /// Clips are transcribed first. Inputs containing a note keyword are
    /// appended to the notes archive without asking the model. Everything
    /// else goes to the model together with the earlier turns; on success
    /// the turn is appended and the whole history is saved.
    ///
    /// If the model fails, nothing changes and the error is returned. If
    /// only the save fails, the turn is kept in memory and the failure is
    /// reported in [`Reply::save_error`].
    pub async fn handle_input_streaming(
        &mut self,
        input: UserInput,
        on_delta: impl Fn(&str) + Send + 'static,
    ) -> Result<Reply, Error> {
        self.state = ControllerState::Processing;
        let result = self.process(input, on_delta).await;
        self.state = ControllerState::AwaitingInput;
        result
    }

    async fn process(
        &mut self,
        input: UserInput,
        on_delta: impl Fn(&str) + Send + 'static,
    ) -> Result<Reply, Error> {
        let text = match input {
            UserInput::Text(text) => text,
            UserInput::Audio(audio) => {
                debug!("transcribing {} byte(s) of audio", audio.data.len());
                self.agent
                    .transcribe(&self.config.transcription_prompt, audio)
                    .await
                    .map_err(Error::Agent)?
            }
        };
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::EmptyInput);
        }

        if notes::is_note_request(text, &self.config.note_keywords) {
            return self.save_note(text).await;
        }

        let system = if self.config.ground_in_notes {
            let notes = self.read_notes().await;
            if notes.trim().is_empty() {
                debug!("the notes archive is empty, not asking the model");
                return Ok(Reply {
                    input: text.to_owned(),
                    text: self.config.empty_archive_reply.clone(),
                    kind: ReplyKind::EmptyArchive,
                    save_error: None,
                });
            }
            self.config.system_instruction(Some(&notes))
        } else {
            self.config.system_instruction(None)
        };
        let reply = self
            .agent
            .converse(
                system.as_deref(),
                &self.context.conversation,
                text,
                on_delta,
            )
            .await
            .map_err(|err| {
                warn!("model call failed: {err}");
                Error::Agent(err)
            })?;

        self.context.conversation.push(Turn::new(text, reply.as_str()));
        let save_error = match history::save_history(
            &*self.store,
            &mut self.context.history_file_id,
            &self.config.history_file_name,
            &self.context.conversation,
        )
        .await
        {
            Ok(_) => None,
            Err(err) => {
                error!("cannot save the conversation: {err}");
                Some(err)
            }
        };

        Ok(Reply {
            input: text.to_owned(),
            text: reply,
            kind: ReplyKind::Assistant,
            save_error,
        })
    }

    async fn save_note(&mut self, text: &str) -> Result<Reply, Error> {
        let entry = notes::format_note((self.today)(), text);
        notes::append_note(
            &*self.store,
            &mut self.context.notes_file_id,
            &self.config.notes_file_name,
            &entry,
        )
        .await
        .map_err(Error::Notes)?;
        info!("stored a note");

        Ok(Reply {
            input: text.to_owned(),
            text: self.config.note_ack.clone(),
            kind: ReplyKind::NoteSaved,
            save_error: None,
        })
    }

    async fn read_notes(&self) -> String {
        match &self.context.notes_file_id {
            Some(id) => notes::read_notes(&*self.store, id).await,
            None => String::new(),
        }
    }
}

#[inline]
fn local_today() -> NaiveDate {
    Local::now().date_naive()
}
