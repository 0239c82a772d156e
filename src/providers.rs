use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{error, info};

use crate::errors::ApiError;
use crate::llm_service::LlmService;
use crate::models::{ConversationTurn, Difficulty, QuizQuestion, Subject};
use crate::quiz_session::QuizGateway;
use crate::voice_session::TutorGateway;

/// Chat-completion model served by Groq.
pub const GROQ_MODEL: &str = "llama-3.1-8b-instant";

const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
const DEEPGRAM_BASE_URL: &str = "https://api.deepgram.com";
const MURF_BASE_URL: &str = "https://api.murf.ai";

/// Synthesis requests can take a while for long answers.
const SYNTHESIS_TIMEOUT: Duration = Duration::from_secs(30);

/// Common message structure for chat-completion requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl From<&ConversationTurn> for ChatMessage {
    fn from(turn: &ConversationTurn) -> Self {
        let role = match turn.role {
            crate::models::Role::User => "user",
            crate::models::Role::Assistant => "assistant",
        };
        ChatMessage {
            role: role.to_string(),
            content: turn.content.clone(),
        }
    }
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        ChatMessage {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Build an `Upstream` error from a non-success provider response, keeping
/// the provider's own diagnostic body as structured detail when possible.
async fn upstream_failure(
    provider: &'static str,
    message: &str,
    response: reqwest::Response,
) -> ApiError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    error!(
        provider = provider,
        status = %status,
        body = %body,
        "Provider API request failed"
    );
    let details = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .or_else(|| (!body.is_empty()).then(|| serde_json::Value::String(body)));
    ApiError::upstream(format!("{message} ({status})"), details)
}

fn transport_failure(provider: &'static str, message: &str, err: &reqwest::Error) -> ApiError {
    error!(provider = provider, error = %err, "Provider request could not be sent");
    ApiError::upstream(format!("{message}: {err}"), None)
}

/// Client for the Groq OpenAI-compatible chat-completions API.
#[derive(Debug, Clone)]
pub struct GroqClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: &'static str,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatMessage,
}

impl GroqClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: GROQ_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Run one chat completion and return the assistant's text.
    pub async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        max_tokens: u32,
        temperature: f32,
        top_p: Option<f32>,
    ) -> Result<String, ApiError> {
        let request_body = ChatCompletionRequest {
            model: GROQ_MODEL,
            messages,
            max_tokens,
            temperature,
            top_p,
        };

        info!(
            provider = "groq",
            model = GROQ_MODEL,
            message_count = request_body.messages.len(),
            "Making chat completion request"
        );

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| transport_failure("groq", "Chat completion request failed", &e))?;

        if !response.status().is_success() {
            return Err(upstream_failure("groq", "Chat completion failed", response).await);
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| transport_failure("groq", "Chat completion response unreadable", &e))?;

        let content = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| ApiError::upstream("No choices in chat completion response", None))?;

        info!(
            provider = "groq",
            response_length = content.len(),
            "Chat completion succeeded"
        );

        Ok(content)
    }
}

/// Client for the Deepgram transcription API.
#[derive(Debug, Clone)]
pub struct DeepgramClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct DeepgramResponse {
    results: DeepgramResults,
}

#[derive(Debug, Deserialize)]
struct DeepgramResults {
    channels: Vec<DeepgramChannel>,
}

#[derive(Debug, Deserialize)]
struct DeepgramChannel {
    alternatives: Vec<DeepgramAlternative>,
}

#[derive(Debug, Deserialize)]
struct DeepgramAlternative {
    transcript: String,
}

impl DeepgramClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: DEEPGRAM_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Transcribe a base64-encoded audio payload.
    ///
    /// An empty transcript means the provider understood no speech and is
    /// returned as `Ok("")`, not as an error.
    pub async fn transcribe_base64(&self, audio_b64: &str) -> Result<String, ApiError> {
        let audio = BASE64
            .decode(audio_b64.trim())
            .map_err(|e| ApiError::validation(format!("Audio data is not valid base64: {e}")))?;
        self.transcribe(audio).await
    }

    /// Transcribe raw audio bytes.
    pub async fn transcribe(&self, audio: Vec<u8>) -> Result<String, ApiError> {
        let url = format!(
            "{}/v1/listen?model=nova-2&smart_format=true&punctuate=true&diarize=false",
            self.base_url
        );

        info!(
            provider = "deepgram",
            audio_bytes = audio.len(),
            "Making transcription request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Token {}", self.api_key))
            .header("Content-Type", "audio/wav")
            .body(audio)
            .send()
            .await
            .map_err(|e| transport_failure("deepgram", "Transcription failed", &e))?;

        if !response.status().is_success() {
            return Err(upstream_failure("deepgram", "Transcription failed", response).await);
        }

        let parsed: DeepgramResponse = response.json().await.map_err(|e| {
            transport_failure("deepgram", "Transcription response unreadable", &e)
        })?;

        let transcript = parsed
            .results
            .channels
            .first()
            .and_then(|channel| channel.alternatives.first())
            .map(|alternative| alternative.transcript.clone())
            .ok_or_else(|| {
                ApiError::upstream("Transcription response carried no transcript field", None)
            })?;

        info!(
            provider = "deepgram",
            transcript_length = transcript.len(),
            "Transcription succeeded"
        );

        Ok(transcript)
    }
}

/// Client for the Murf speech-synthesis API.
#[derive(Debug, Clone)]
pub struct MurfClient {
    client: Client,
    api_key: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesisRequest<'a> {
    text: &'a str,
    voice_id: &'a str,
    format: &'static str,
    sample_rate: u32,
    encode_as_base64: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesisResponse {
    encoded_audio: Option<String>,
}

impl MurfClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::builder()
                .timeout(SYNTHESIS_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key,
            base_url: MURF_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Synthesize speech, returning base64-encoded MP3 audio.
    pub async fn synthesize(&self, text: &str, voice_id: &str) -> Result<String, ApiError> {
        let request_body = SynthesisRequest {
            text,
            voice_id,
            format: "MP3",
            sample_rate: 24000,
            encode_as_base64: true,
        };

        info!(
            provider = "murf",
            voice_id = voice_id,
            text_length = text.len(),
            "Making speech synthesis request"
        );

        let response = self
            .client
            .post(format!("{}/v1/speech/generate-with-key", self.base_url))
            .header("api-key", &self.api_key)
            .header("Accept", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| transport_failure("murf", "Text-to-speech failed", &e))?;

        if !response.status().is_success() {
            return Err(upstream_failure("murf", "Text-to-speech failed", response).await);
        }

        let parsed: SynthesisResponse = response
            .json()
            .await
            .map_err(|e| transport_failure("murf", "Synthesis response unreadable", &e))?;

        let audio = parsed.encoded_audio.ok_or_else(|| {
            ApiError::upstream("Synthesis response carried no audio data", None)
        })?;

        info!(
            provider = "murf",
            audio_length = audio.len(),
            "Speech synthesis succeeded"
        );

        Ok(audio)
    }

    /// Fetch the provider's voice catalog, passed through verbatim.
    pub async fn voices(&self) -> Result<serde_json::Value, ApiError> {
        info!(provider = "murf", "Fetching voice catalog");

        let response = self
            .client
            .get(format!("{}/v1/speech/voices", self.base_url))
            .header("api-key", &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| transport_failure("murf", "Failed to fetch voices", &e))?;

        if !response.status().is_success() {
            return Err(upstream_failure("murf", "Failed to fetch voices", response).await);
        }

        response
            .json()
            .await
            .map_err(|e| transport_failure("murf", "Voice catalog unreadable", &e))
    }
}

/// The full provider stack, shared by the HTTP handlers and implementing
/// the gateway traits the interactive sessions are written against.
#[derive(Debug, Clone)]
pub struct Providers {
    pub speech: DeepgramClient,
    pub llm: LlmService,
    pub voice: MurfClient,
}

impl Providers {
    pub fn new(speech: DeepgramClient, llm: LlmService, voice: MurfClient) -> Self {
        Self { speech, llm, voice }
    }
}

#[async_trait::async_trait]
impl TutorGateway for Providers {
    async fn transcribe(&self, audio_b64: &str) -> Result<String, ApiError> {
        self.speech.transcribe_base64(audio_b64).await
    }

    async fn chat(
        &self,
        message: &str,
        subject: Subject,
        history: &[ConversationTurn],
    ) -> Result<String, ApiError> {
        self.llm.chat(message, subject, history).await
    }

    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<String, ApiError> {
        self.voice.synthesize(text, voice_id).await
    }
}

#[async_trait::async_trait]
impl QuizGateway for Providers {
    async fn generate_quiz(
        &self,
        topic: &str,
        subject: Subject,
        difficulty: Difficulty,
        count: u8,
    ) -> Result<Vec<QuizQuestion>, ApiError> {
        self.llm.generate_quiz(topic, subject, difficulty, count).await
    }

    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<String, ApiError> {
        self.voice.synthesize(text, voice_id).await
    }
}
