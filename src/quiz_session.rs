//! Interactive quiz session lifecycle.
//!
//! A session moves through `Setup -> Loading -> Active -> Results`. While a
//! question's spoken feedback is pending, further submissions for that
//! question are ignored; after a fixed delay the session advances to the
//! next question or to the results summary.

use async_trait::async_trait;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};
use uuid::Uuid;

use crate::answer_checker::{self, Verdict};
use crate::errors::ApiError;
use crate::models::{Difficulty, QuizQuestion, Subject};
use crate::playback::SpeechSink;

/// Delay between spoken feedback and the next question. Advancement is
/// deliberately not tied to playback completion, so a slow or failed
/// playback cannot stall the quiz.
pub const FEEDBACK_DELAY: Duration = Duration::from_secs(3);

pub const MIN_QUESTIONS: u8 = 3;
pub const MAX_QUESTIONS: u8 = 10;

/// Provider operations the quiz needs.
#[async_trait]
pub trait QuizGateway: Send + Sync {
    async fn generate_quiz(
        &self,
        topic: &str,
        subject: Subject,
        difficulty: Difficulty,
        count: u8,
    ) -> Result<Vec<QuizQuestion>, ApiError>;

    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<String, ApiError>;
}

/// Named state of a quiz session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuizPhase {
    Setup,
    Loading,
    Active,
    Results,
}

/// Parameters for starting a quiz.
#[derive(Debug, Clone)]
pub struct QuizParams {
    pub topic: String,
    pub subject: Subject,
    pub difficulty: Difficulty,
    pub count: u8,
}

#[derive(Debug, thiserror::Error)]
pub enum QuizError {
    #[error("Quiz topic must not be empty")]
    EmptyTopic,

    #[error("Question count must be between 3 and 10, got {0}")]
    InvalidCount(u8),

    #[error("No quiz is active")]
    NotActive,

    #[error("Quiz generation failed: {0}")]
    Generation(#[source] ApiError),
}

/// One interactive quiz, owned by a single caller.
pub struct QuizSession<G, S> {
    id: Uuid,
    gateway: G,
    sink: S,
    voice_id: String,
    phase: QuizPhase,
    topic: String,
    questions: Vec<QuizQuestion>,
    current_index: usize,
    answers: Vec<String>,
    score: usize,
    feedback: Option<String>,
}

impl<G: QuizGateway, S: SpeechSink> QuizSession<G, S> {
    pub fn new(gateway: G, sink: S, voice_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            gateway,
            sink,
            voice_id: voice_id.into(),
            phase: QuizPhase::Setup,
            topic: String::new(),
            questions: Vec::new(),
            current_index: 0,
            answers: Vec::new(),
            score: 0,
            feedback: None,
        }
    }

    pub fn phase(&self) -> QuizPhase {
        self.phase
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn questions(&self) -> &[QuizQuestion] {
        &self.questions
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> Option<&QuizQuestion> {
        self.questions.get(self.current_index)
    }

    pub fn answers(&self) -> &[String] {
        &self.answers
    }

    pub fn score(&self) -> usize {
        self.score
    }

    /// Feedback for the current question, if a submission is pending.
    pub fn pending_feedback(&self) -> Option<&str> {
        self.feedback.as_deref()
    }

    /// Generate questions and enter the active phase, speaking the first
    /// prompt. On generation failure the session returns to `Setup` with
    /// nothing retained.
    pub async fn start(&mut self, params: QuizParams) -> Result<(), QuizError> {
        if params.topic.trim().is_empty() {
            return Err(QuizError::EmptyTopic);
        }
        if !(MIN_QUESTIONS..=MAX_QUESTIONS).contains(&params.count) {
            return Err(QuizError::InvalidCount(params.count));
        }

        self.phase = QuizPhase::Loading;
        info!(
            session_id = %self.id,
            topic = %params.topic,
            subject = params.subject.as_str(),
            difficulty = ?params.difficulty,
            count = params.count,
            "Generating quiz"
        );

        match self
            .gateway
            .generate_quiz(&params.topic, params.subject, params.difficulty, params.count)
            .await
        {
            Ok(questions) => {
                // Use exactly what the provider returned, even when the
                // length differs from the requested count.
                self.topic = params.topic;
                self.questions = questions;
                self.current_index = 0;
                self.answers.clear();
                self.score = 0;
                self.feedback = None;
                self.phase = QuizPhase::Active;

                info!(
                    session_id = %self.id,
                    question_count = self.questions.len(),
                    "Quiz active"
                );

                if let Some(question) = self.questions.first() {
                    let prompt = question.question.clone();
                    self.speak(&prompt).await;
                }
                Ok(())
            }
            Err(e) => {
                self.clear_fields();
                self.phase = QuizPhase::Setup;
                Err(QuizError::Generation(e))
            }
        }
    }

    /// Grade a submitted option label, record it, and speak the feedback.
    ///
    /// Returns `Ok(None)` without touching any state when feedback for the
    /// current question is already pending: at most one submission counts
    /// per question.
    pub async fn submit_answer(&mut self, label: &str) -> Result<Option<Verdict>, QuizError> {
        if self.phase != QuizPhase::Active {
            return Err(QuizError::NotActive);
        }
        if self.feedback.is_some() {
            return Ok(None);
        }
        let Some(question) = self.questions.get(self.current_index) else {
            return Err(QuizError::NotActive);
        };

        let verdict = answer_checker::check(&question.correct, label, &question.explanation);
        self.answers.push(label.to_string());
        if verdict.is_correct {
            self.score += 1;
        }
        self.feedback = Some(verdict.message.clone());

        info!(
            session_id = %self.id,
            question_index = self.current_index,
            is_correct = verdict.is_correct,
            score = self.score,
            "Answer submitted"
        );

        let message = verdict.message.clone();
        self.speak(&message).await;

        Ok(Some(verdict))
    }

    /// Wait out the feedback window, then move to the next question or to
    /// the results summary.
    ///
    /// The timer lives inside this future: dropping it before completion
    /// cancels the pending advance without mutating the session, so tearing
    /// a session down mid-window is safe.
    pub async fn advance(&mut self) -> QuizPhase {
        if self.phase != QuizPhase::Active || self.feedback.is_none() {
            return self.phase;
        }

        sleep(FEEDBACK_DELAY).await;

        self.feedback = None;
        if self.current_index + 1 < self.questions.len() {
            self.current_index += 1;
            let prompt = self.questions[self.current_index].question.clone();
            self.speak(&prompt).await;
        } else {
            self.phase = QuizPhase::Results;
            let summary = format!(
                "Quiz complete! You scored {} out of {}.",
                self.score,
                self.questions.len()
            );
            info!(
                session_id = %self.id,
                score = self.score,
                total = self.questions.len(),
                "Quiz finished"
            );
            self.speak(&summary).await;
        }

        self.phase
    }

    /// Clear all quiz state and return to `Setup`. Idempotent.
    pub fn restart(&mut self) {
        self.clear_fields();
        self.phase = QuizPhase::Setup;
        info!(session_id = %self.id, "Quiz session reset");
    }

    fn clear_fields(&mut self) {
        self.topic.clear();
        self.questions.clear();
        self.current_index = 0;
        self.answers.clear();
        self.score = 0;
        self.feedback = None;
    }

    // Speech failures are logged and swallowed: the quiz keeps working
    // silently when synthesis or playback is unavailable.
    async fn speak(&mut self, text: &str) {
        match self.gateway.synthesize(text, &self.voice_id).await {
            Ok(audio) => {
                if let Err(e) = self.sink.play(&audio).await {
                    warn!(session_id = %self.id, error = %e, "Quiz playback failed");
                }
            }
            Err(e) => {
                warn!(session_id = %self.id, error = %e, "Quiz speech synthesis failed");
            }
        }
    }
}
