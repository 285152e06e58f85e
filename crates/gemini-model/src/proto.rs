use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use diary_model::{ModelMessage, ModelRequest, UserContent};
use serde::{Deserialize, Serialize};

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentChunk {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    pub prompt_feedback: Option<PromptFeedback>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub content: Option<CandidateContent>,
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<CandidatePart>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct CandidatePart {
    pub text: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    pub block_reason: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ErrorBody {
    pub message: Option<String>,
    pub status: Option<String>,
}

impl Candidate {
    /// Concatenated text of all parts in this candidate.
    pub fn text(&self) -> Option<String> {
        let content = self.content.as_ref()?;
        let mut text = String::new();
        for part in &content.parts {
            if let Some(t) = &part.text {
                text.push_str(t);
            }
        }
        (!text.is_empty()).then_some(text)
    }
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

// -----------
// Conversions
// -----------

const ROLE_USER: &str = "user";
const ROLE_MODEL: &str = "model";

pub fn create_request(req: &ModelRequest) -> GenerateContentRequest {
    let mut system_parts = Vec::new();
    let mut contents: Vec<Content> = Vec::new();

    for msg in &req.messages {
        let (role, part) = match msg {
            ModelMessage::System(text) => {
                system_parts.push(Part::Text { text: text.clone() });
                continue;
            }
            ModelMessage::User(content) => (ROLE_USER, create_part(content)),
            ModelMessage::Assistant(text) => {
                (ROLE_MODEL, Part::Text { text: text.clone() })
            }
        };
        // Gemini expects alternating roles, so consecutive messages of the
        // same role are folded into one content with several parts.
        match contents.last_mut() {
            Some(last) if last.role == role => last.parts.push(part),
            _ => contents.push(Content {
                role,
                parts: vec![part],
            }),
        }
    }

    GenerateContentRequest {
        contents,
        system_instruction: (!system_parts.is_empty()).then_some(
            SystemInstruction {
                parts: system_parts,
            },
        ),
    }
}

#[inline]
fn create_part(content: &UserContent) -> Part {
    match content {
        UserContent::Text(text) => Part::Text { text: text.clone() },
        UserContent::Audio(audio) => Part::InlineData {
            inline_data: InlineData {
                mime_type: audio.mime_type.essence_str().to_owned(),
                data: BASE64_STANDARD.encode(&audio.data),
            },
        },
    }
}
