//! Voice tutoring session: transcribe a question, answer it, speak the
//! answer.

use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::models::{ConversationTurn, Statistics, Subject};
use crate::playback::{PlaybackError, SpeechSink};

/// Maximum turns retained in conversation history (6 exchanges). Oldest
/// turns are dropped silently.
pub const HISTORY_CAP: usize = 12;

/// Provider operations the tutoring pipeline needs.
#[async_trait]
pub trait TutorGateway: Send + Sync {
    async fn transcribe(&self, audio_b64: &str) -> Result<String, ApiError>;

    async fn chat(
        &self,
        message: &str,
        subject: Subject,
        history: &[ConversationTurn],
    ) -> Result<String, ApiError>;

    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<String, ApiError>;
}

/// What became of one recorded utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UtteranceOutcome {
    /// The transcript came back empty: nothing was asked, nothing was
    /// recorded, and the caller should prompt the student to retry.
    NothingHeard,

    /// The question was answered and spoken.
    Answered {
        transcript: String,
        response: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Provider(#[from] ApiError),

    #[error("Audio playback failed: {0}")]
    Playback(#[from] PlaybackError),
}

/// One student's tutoring session.
pub struct VoiceSession<G, S> {
    id: Uuid,
    gateway: G,
    sink: S,
    subject: Subject,
    voice_id: String,
    history: Vec<ConversationTurn>,
    stats: Statistics,
}

impl<G: TutorGateway, S: SpeechSink> VoiceSession<G, S> {
    pub fn new(gateway: G, sink: S, subject: Subject, voice_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            gateway,
            sink,
            subject,
            voice_id: voice_id.into(),
            history: Vec::new(),
            stats: Statistics::default(),
        }
    }

    pub fn subject(&self) -> Subject {
        self.subject
    }

    pub fn set_subject(&mut self, subject: Subject) {
        self.subject = subject;
    }

    pub fn set_voice(&mut self, voice_id: impl Into<String>) {
        self.voice_id = voice_id.into();
    }

    pub fn history(&self) -> &[ConversationTurn] {
        &self.history
    }

    pub fn stats(&self) -> &Statistics {
        &self.stats
    }

    /// Run one utterance through the full pipeline:
    /// transcribe -> chat -> record the exchange -> synthesize -> play.
    ///
    /// Failures before the tutor has answered leave the history untouched.
    /// Once the chat step succeeds the exchange is recorded, whether or not
    /// the spoken rendition works out.
    pub async fn handle_utterance(
        &mut self,
        audio_b64: &str,
    ) -> Result<UtteranceOutcome, SessionError> {
        let transcript = self.gateway.transcribe(audio_b64).await?;

        if transcript.trim().is_empty() {
            info!(session_id = %self.id, "No speech recognized in utterance");
            return Ok(UtteranceOutcome::NothingHeard);
        }

        let response = self
            .gateway
            .chat(&transcript, self.subject, &self.history)
            .await?;

        self.history.push(ConversationTurn::user(transcript.clone()));
        self.history.push(ConversationTurn::assistant(response.clone()));
        if self.history.len() > HISTORY_CAP {
            let excess = self.history.len() - HISTORY_CAP;
            self.history.drain(..excess);
        }
        self.stats.record_question(self.subject);

        info!(
            session_id = %self.id,
            subject = self.subject.as_str(),
            questions_asked = self.stats.questions_asked(),
            history_len = self.history.len(),
            "Tutor exchange recorded"
        );

        let audio = self.gateway.synthesize(&response, &self.voice_id).await?;
        self.sink.play(&audio).await?;

        Ok(UtteranceOutcome::Answered {
            transcript,
            response,
        })
    }

    /// Forget the conversation. Statistics survive until the session itself
    /// is torn down.
    pub fn clear(&mut self) {
        self.history.clear();
        info!(session_id = %self.id, "Conversation history cleared");
    }
}
