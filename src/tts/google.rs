//! Google Translate text-to-speech.
//!
//! The public `translate_tts` endpoint needs no key but only accepts short
//! inputs, so longer replies are split into chunks of at most
//! [`MAX_CHUNK_CHARS`] characters and the MP3 responses are concatenated
//! (MP3 frames are self-delimiting, so the result plays as one stream).

use async_trait::async_trait;

use crate::config::TtsConfig;
use crate::tts::gateway::{SpeechSynthesizer, SynthesisError};

/// Longest input the endpoint accepts per request, in characters.
pub const MAX_CHUNK_CHARS: usize = 100;

const ENDPOINT: &str = "https://translate.google.com/translate_tts";

/// Speech from Google Translate's TTS endpoint.
pub struct GoogleTranslateTts {
    client: reqwest::Client,
    endpoint: String,
    language: String,
}

impl GoogleTranslateTts {
    pub fn from_config(config: &TtsConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            endpoint: ENDPOINT.into(),
            language: config.language.clone(),
        }
    }

    /// Point at a different endpoint (tests, proxies).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    async fn fetch_chunk(
        &self,
        chunk: &str,
        idx: usize,
        total: usize,
    ) -> Result<Vec<u8>, SynthesisError> {
        let total_s = total.to_string();
        let idx_s = idx.to_string();
        let len_s = chunk.chars().count().to_string();

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("ie", "UTF-8"),
                ("q", chunk),
                ("tl", self.language.as_str()),
                ("client", "tw-ob"),
                ("total", total_s.as_str()),
                ("idx", idx_s.as_str()),
                ("textlen", len_s.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::warn!("tts: google returned {status} for chunk {idx}/{total}");
            return Err(SynthesisError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTranslateTts {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SynthesisError> {
        let chunks = split_text(text, MAX_CHUNK_CHARS);
        if chunks.is_empty() {
            return Err(SynthesisError::EmptyText);
        }

        let mut audio = Vec::new();
        for (idx, chunk) in chunks.iter().enumerate() {
            audio.extend(self.fetch_chunk(chunk, idx, chunks.len()).await?);
        }
        Ok(audio)
    }
}

/// Split `text` into whitespace-joined chunks of at most `max_chars`
/// characters.
///
/// Words are never broken unless a single word is longer than `max_chars`.
/// A chunk also ends after a word closing a sentence (`.`, `!`, `?`, `。`)
/// once it is at least half full, so pauses land on sentence boundaries.
pub fn split_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    let mut flush = |current: &mut String, current_len: &mut usize| {
        if !current.is_empty() {
            chunks.push(std::mem::take(current));
        }
        *current_len = 0;
    };

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            flush(&mut current, &mut current_len);
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                let piece: String = piece.iter().collect();
                if piece.chars().count() == max_chars {
                    current = piece;
                    flush(&mut current, &mut current_len);
                } else {
                    current_len = piece.chars().count();
                    current = piece;
                }
            }
            continue;
        }

        let needed = if current.is_empty() {
            word_len
        } else {
            current_len + 1 + word_len
        };
        if needed > max_chars {
            flush(&mut current, &mut current_len);
        }

        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;

        let ends_sentence = word.ends_with(&['.', '!', '?', '。'][..]);
        if ends_sentence && current_len * 2 >= max_chars {
            flush(&mut current, &mut current_len);
        }
    }
    flush(&mut current, &mut current_len);

    chunks
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
