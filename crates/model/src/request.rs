use bytes::Bytes;
use mime::Mime;

/// A request to be sent to the model provider.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ModelRequest {
    /// The input messages, in chronological order.
    pub messages: Vec<ModelMessage>,
}

impl ModelRequest {
    /// Returns the last user message of this request, if any.
    pub fn last_user_content(&self) -> Option<&UserContent> {
        self.messages.iter().rev().find_map(|msg| match msg {
            ModelMessage::User(content) => Some(content),
            _ => None,
        })
    }
}

/// A complete message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ModelMessage {
    /// The system instructions.
    System(String),
    /// A user input, either text or a recorded clip.
    User(UserContent),
    /// An assistant text.
    Assistant(String),
}

impl ModelMessage {
    /// Creates a text-only user message.
    #[inline]
    pub fn user_text<S: Into<String>>(text: S) -> Self {
        Self::User(UserContent::Text(text.into()))
    }
}

/// The content of a user message.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum UserContent {
    /// Plain text.
    Text(String),
    /// A tagged audio payload.
    Audio(AudioPayload),
}

impl From<String> for UserContent {
    #[inline]
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for UserContent {
    #[inline]
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<AudioPayload> for UserContent {
    #[inline]
    fn from(value: AudioPayload) -> Self {
        Self::Audio(value)
    }
}

/// Raw audio bytes together with their mime type.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AudioPayload {
    /// The mime type of `data`, e.g. `audio/wav`.
    pub mime_type: Mime,
    /// The encoded audio.
    pub data: Bytes,
}

impl AudioPayload {
    /// Creates a new payload.
    #[inline]
    pub fn new(mime_type: Mime, data: impl Into<Bytes>) -> Self {
        Self {
            mime_type,
            data: data.into(),
        }
    }

    /// Creates a `audio/wav` payload, which is what most recorders emit.
    #[inline]
    pub fn wav(data: impl Into<Bytes>) -> Self {
        // `audio/wav` is not one of the `mime` crate's constants.
        let mime_type = "audio/wav"
            .parse()
            .unwrap_or(mime::APPLICATION_OCTET_STREAM);
        Self::new(mime_type, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_user_content() {
        let req = ModelRequest {
            messages: vec![
                ModelMessage::System("Be brief.".to_owned()),
                ModelMessage::user_text("Hello"),
                ModelMessage::Assistant("Hi".to_owned()),
                ModelMessage::user_text("Bye"),
            ],
        };
        assert_eq!(req.last_user_content(), Some(&UserContent::from("Bye")));
        assert_eq!(ModelRequest::default().last_user_content(), None);
    }

    #[test]
    fn test_wav_payload() {
        let payload = AudioPayload::wav(vec![0u8, 1, 2]);
        assert_eq!(payload.mime_type.essence_str(), "audio/wav");
        assert_eq!(payload.data.len(), 3);
    }
}
