//! The flat text format the conversation is persisted in.
//!
//! Each turn is written as
//!
//! ```text
//! Ty: <user text>
//!
//! Gemini: <assistant text>
//!
//!
//! ```
//!
//! i.e. the user tag and text, a blank line, the assistant tag and text,
//! and a separator of three line feeds. The blob is always the whole
//! history, never a delta.
//!
//! # Limitations
//!
//! Texts that contain the separator or one of the tags cannot be told
//! apart from the framing. Such turns are split or dropped on decode; the
//! format makes no attempt at escaping.

use crate::conversation::{Conversation, Turn};

/// Marks the start of the user text in a record.
pub const USER_TAG: &str = "Ty: ";
/// Marks the start of the assistant text in a record.
pub const ASSISTANT_TAG: &str = "Gemini: ";
/// Terminates every record.
pub const TURN_SEPARATOR: &str = "\n\n\n";

/// Serializes the whole conversation into a transcript blob.
pub fn encode(conversation: &Conversation) -> String {
    let mut blob = String::new();
    for turn in conversation {
        encode_turn(turn, &mut blob);
    }
    blob
}

/// Appends the record of one turn to `out`.
///
/// Texts are trimmed, as decoding would do anyway; a trailing line feed
/// would otherwise run into the framing and form a separator.
pub fn encode_turn(turn: &Turn, out: &mut String) {
    out.push_str(USER_TAG);
    out.push_str(turn.user().text().trim());
    out.push_str("\n\n");
    out.push_str(ASSISTANT_TAG);
    out.push_str(turn.assistant().text().trim());
    out.push_str(TURN_SEPARATOR);
}

/// The result of decoding a transcript blob.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Decoded {
    /// Well-formed turns, in blob order.
    pub turns: Vec<Turn>,
    /// Number of non-blank records that were dropped as malformed.
    pub skipped: usize,
}

impl Decoded {
    /// Converts the decoded turns into a conversation.
    #[inline]
    pub fn into_conversation(self) -> Conversation {
        Conversation::from(self.turns)
    }
}

/// Parses a transcript blob. Never fails.
///
/// A record is accepted only if it holds the user tag followed (later on)
/// by the assistant tag. Blank fragments, like the empty tail after the
/// last separator, are ignored. Other malformed records are dropped and
/// counted in [`Decoded::skipped`].
pub fn decode(blob: &str) -> Decoded {
    let mut decoded = Decoded::default();
    for record in blob.split(TURN_SEPARATOR) {
        if record.trim().is_empty() {
            continue;
        }
        match decode_record(record) {
            Some(turn) => decoded.turns.push(turn),
            None => {
                trace!("dropping malformed record: {record:?}");
                decoded.skipped += 1;
            }
        }
    }
    decoded
}

fn decode_record(record: &str) -> Option<Turn> {
    let user_start = record.find(USER_TAG)? + USER_TAG.len();
    let rest = &record[user_start..];
    let assistant_idx = rest.find(ASSISTANT_TAG)?;
    let user = rest[..assistant_idx].trim();
    let assistant = rest[assistant_idx + ASSISTANT_TAG.len()..].trim();
    Some(Turn::new(user, assistant))
}
