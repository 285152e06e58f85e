use crate::notes::{DEFAULT_NOTE_KEYWORDS, NOTE_SAVED_ACK};

const DEFAULT_HISTORY_FILE: &str = "historia_rozmowy.txt";
const DEFAULT_NOTES_FILE: &str = "notes_git_data.txt";
const DEFAULT_TRANSCRIPTION_PROMPT: &str = "Zamień tę mowę na tekst: ";
const NOTES_HEADER: &str = "Oto notatki z pamiętnika użytkownika:";
const DEFAULT_EMPTY_ARCHIVE_REPLY: &str =
    "Twoje archiwum jest jeszcze puste. Zapisz pierwszą notatkę!";

/// Builder for [`SessionConfig`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionConfigBuilder {
    history_file_name: Option<String>,
    notes_file_name: Option<String>,
    system_prompt: Option<String>,
    note_keywords: Option<Vec<String>>,
    note_ack: Option<String>,
    transcription_prompt: Option<String>,
    empty_archive_reply: Option<String>,
    ground_in_notes: bool,
}

impl SessionConfigBuilder {
    /// Creates a builder with every option at its default.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the name of the remote file holding the conversation.
    #[inline]
    pub fn with_history_file_name<S: Into<String>>(mut self, name: S) -> Self {
        self.history_file_name = Some(name.into());
        self
    }

    /// Sets the name of the remote file holding the notes archive.
    #[inline]
    pub fn with_notes_file_name<S: Into<String>>(mut self, name: S) -> Self {
        self.notes_file_name = Some(name.into());
        self
    }

    /// Sets the system instruction sent with every exchange.
    #[inline]
    pub fn with_system_prompt<S: Into<String>>(mut self, prompt: S) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    /// Replaces the words that route an input to the notes archive.
    #[inline]
    pub fn with_note_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.note_keywords =
            Some(keywords.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the reply given after a note is stored.
    #[inline]
    pub fn with_note_ack<S: Into<String>>(mut self, ack: S) -> Self {
        self.note_ack = Some(ack.into());
        self
    }

    /// Sets the instruction used to turn a clip into text.
    #[inline]
    pub fn with_transcription_prompt<S: Into<String>>(
        mut self,
        prompt: S,
    ) -> Self {
        self.transcription_prompt = Some(prompt.into());
        self
    }

    /// Sets the reply given instead of asking the model while the notes
    /// archive is still empty. Only used with [`Self::ground_in_notes`].
    #[inline]
    pub fn with_empty_archive_reply<S: Into<String>>(
        mut self,
        reply: S,
    ) -> Self {
        self.empty_archive_reply = Some(reply.into());
        self
    }

    /// Makes the model see the notes archive in its system instruction.
    ///
    /// While the archive is empty, questions are answered with a fixed
    /// reply instead.
    #[inline]
    pub fn ground_in_notes(mut self, enabled: bool) -> Self {
        self.ground_in_notes = enabled;
        self
    }

    /// Builds the configuration.
    pub fn build(self) -> SessionConfig {
        SessionConfig {
            history_file_name: self
                .history_file_name
                .unwrap_or_else(|| DEFAULT_HISTORY_FILE.to_owned()),
            notes_file_name: self
                .notes_file_name
                .unwrap_or_else(|| DEFAULT_NOTES_FILE.to_owned()),
            system_prompt: self.system_prompt,
            note_keywords: self.note_keywords.unwrap_or_else(|| {
                DEFAULT_NOTE_KEYWORDS.iter().map(|s| s.to_string()).collect()
            }),
            note_ack: self
                .note_ack
                .unwrap_or_else(|| NOTE_SAVED_ACK.to_owned()),
            transcription_prompt: self
                .transcription_prompt
                .unwrap_or_else(|| DEFAULT_TRANSCRIPTION_PROMPT.to_owned()),
            empty_archive_reply: self
                .empty_archive_reply
                .unwrap_or_else(|| DEFAULT_EMPTY_ARCHIVE_REPLY.to_owned()),
            ground_in_notes: self.ground_in_notes,
        }
    }
}

/// Configuration of a diary session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    pub(crate) history_file_name: String,
    pub(crate) notes_file_name: String,
    pub(crate) system_prompt: Option<String>,
    pub(crate) note_keywords: Vec<String>,
    pub(crate) note_ack: String,
    pub(crate) transcription_prompt: String,
    pub(crate) empty_archive_reply: String,
    pub(crate) ground_in_notes: bool,
}

impl Default for SessionConfig {
    #[inline]
    fn default() -> Self {
        SessionConfigBuilder::new().build()
    }
}

impl SessionConfig {
    /// Returns the name of the history file.
    #[inline]
    pub fn history_file_name(&self) -> &str {
        &self.history_file_name
    }

    /// Returns the name of the notes file.
    #[inline]
    pub fn notes_file_name(&self) -> &str {
        &self.notes_file_name
    }

    /// Assembles the system instruction, optionally with the notes.
    pub(crate) fn system_instruction(
        &self,
        notes: Option<&str>,
    ) -> Option<String> {
        let notes = notes.map(str::trim).filter(|n| !n.is_empty());
        match (self.system_prompt.as_deref(), notes) {
            (None, None) => None,
            (Some(prompt), None) => Some(prompt.to_owned()),
            (None, Some(notes)) => Some(format!("{NOTES_HEADER}\n{notes}")),
            (Some(prompt), Some(notes)) => {
                Some(format!("{prompt}\n\n{NOTES_HEADER}\n{notes}"))
            }
        }
    }
}
