//! OpenAI `/v1/audio/speech` synthesis.

use async_trait::async_trait;
use serde::Serialize;

use crate::config::TtsConfig;
use crate::credential::Credential;
use crate::tts::gateway::{SpeechSynthesizer, SynthesisError};

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
}

/// Speech from an OpenAI-compatible `/v1/audio/speech` endpoint, as MP3.
pub struct OpenAiTts {
    client: reqwest::Client,
    base_url: String,
    model: String,
    voice: String,
    credential: Credential,
}

impl OpenAiTts {
    pub fn from_config(config: &TtsConfig, credential: Credential) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            voice: config.voice.clone(),
            credential,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/audio/speech", self.base_url)
    }

    fn request<'a>(&'a self, text: &'a str) -> SpeechRequest<'a> {
        SpeechRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            response_format: "mp3",
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAiTts {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>, SynthesisError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(SynthesisError::EmptyText);
        }

        log::debug!("tts: requesting {} chars from {}", text.chars().count(), self.model);

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(self.credential.expose())
            .json(&self.request(text))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::warn!("tts: openai returned {status}");
            return Err(SynthesisError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn make_tts(base_url: &str) -> OpenAiTts {
        let config = TtsConfig {
            base_url: base_url.into(),
            timeout_secs: 5,
            ..TtsConfig::default()
        };
        OpenAiTts::from_config(&config, Credential::parse("sk-test").unwrap())
    }

    #[test]
    fn endpoint_path() {
        assert_eq!(
            make_tts("https://api.openai.com/").endpoint(),
            "https://api.openai.com/v1/audio/speech"
        );
    }

    #[test]
    fn request_body_asks_for_mp3() {
        let tts = make_tts("http://localhost");
        let body = serde_json::to_value(tts.request("안녕하세요")).unwrap();
        assert_eq!(
            body,
            json!({
                "model": "tts-1",
                "input": "안녕하세요",
                "voice": "alloy",
                "response_format": "mp3"
            })
        );
    }

    #[tokio::test]
    async fn blank_text_never_hits_the_network() {
        let tts = make_tts("http://127.0.0.1:9");
        assert!(matches!(
            tts.synthesize("   ").await,
            Err(SynthesisError::EmptyText)
        ));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_request_error() {
        let tts = make_tts("http://127.0.0.1:9");
        let err = tts.synthesize("reply").await.unwrap_err();
        assert!(matches!(err, SynthesisError::Request(_) | SynthesisError::Timeout));
    }
}
