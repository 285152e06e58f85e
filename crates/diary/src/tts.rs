use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use diary_core::{SpeechError, SpeechSynthesizer};
use reqwest::{Client, Url};

const DEFAULT_ENDPOINT: &str = "https://translate.google.com/translate_tts";

/// The longest piece of text the endpoint voices in one request.
const MAX_CHUNK_CHARS: usize = 100;

/// Speech synthesis through the Google Translate voice endpoint.
///
/// The endpoint only accepts short texts, so replies are split on word
/// boundaries and the returned MP3 streams are concatenated.
#[derive(Clone, Debug)]
pub struct GoogleTts {
    client: Client,
    endpoint: String,
}

impl GoogleTts {
    /// Creates a synthesizer using the public endpoint.
    #[inline]
    pub fn new() -> Self {
        Self::with_endpoint(DEFAULT_ENDPOINT)
    }

    /// Creates a synthesizer using another endpoint.
    #[inline]
    pub fn with_endpoint<S: Into<String>>(endpoint: S) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
        }
    }

    fn chunk_url(
        &self,
        chunk: &str,
        idx: usize,
        total: usize,
        language_code: &str,
    ) -> Result<Url, SpeechError> {
        let idx = idx.to_string();
        let total = total.to_string();
        let textlen = chunk.chars().count().to_string();
        Url::parse_with_params(
            &self.endpoint,
            [
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", language_code),
                ("q", chunk),
                ("idx", idx.as_str()),
                ("total", total.as_str()),
                ("textlen", textlen.as_str()),
            ],
        )
        .map_err(|err| SpeechError::new(format!("invalid endpoint: {err}")))
    }
}

impl Default for GoogleTts {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTts {
    async fn synthesize(
        &self,
        text: &str,
        language_code: &str,
    ) -> Result<Bytes, SpeechError> {
        let chunks = split_text(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(SpeechError::new("nothing to voice"));
        }

        let mut audio = BytesMut::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            let url = self.chunk_url(chunk, idx, chunks.len(), language_code)?;
            trace!("voicing chunk {}/{}", idx + 1, chunks.len());
            let resp = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|err| SpeechError::new(err.to_string()))?;
            let status = resp.status();
            if !status.is_success() {
                return Err(SpeechError::new(format!(
                    "unexpected status: {status}"
                )));
            }
            let bytes = resp
                .bytes()
                .await
                .map_err(|err| SpeechError::new(err.to_string()))?;
            audio.extend_from_slice(&bytes);
        }
        Ok(audio.freeze())
    }
}

/// Splits `text` into pieces of at most `max_chars` characters, breaking
/// between words. Words longer than that are broken inside.
fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = vec![];
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word = word;
        let mut word_len = word.chars().count();
        if current_len > 0 && current_len + 1 + word_len > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        while word_len > max_chars {
            let split_at = word
                .char_indices()
                .nth(max_chars)
                .map_or(word.len(), |(idx, _)| idx);
            chunks.push(word[..split_at].to_owned());
            word = &word[split_at..];
            word_len -= max_chars;
        }
        if word.is_empty() {
            continue;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}
