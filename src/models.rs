use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::info;

/// Voice used when the client does not pick one.
pub const DEFAULT_VOICE_ID: &str = "en-US-ken";

/// Subjects the tutor knows how to teach. Each maps to a distinct system
/// instruction for the language model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    General,
    Science,
    Mathematics,
    English,
    History,
    Geography,
}

impl Default for Subject {
    fn default() -> Self {
        Subject::General
    }
}

impl Subject {
    /// Parse a subject tag from a request. Unknown tags fall back to
    /// `General` rather than failing the request.
    pub fn parse_or_general(tag: Option<&str>) -> Self {
        match tag.unwrap_or("").trim().to_lowercase().as_str() {
            "" | "general" => Subject::General,
            "science" => Subject::Science,
            "mathematics" | "math" => Subject::Mathematics,
            "english" => Subject::English,
            "history" => Subject::History,
            "geography" => Subject::Geography,
            other => {
                info!(subject = %other, "Unknown subject tag, defaulting to general");
                Subject::General
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::General => "general",
            Subject::Science => "science",
            Subject::Mathematics => "mathematics",
            Subject::English => "english",
            Subject::History => "history",
            Subject::Geography => "geography",
        }
    }
}

/// Quiz difficulty levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Medium
    }
}

impl Difficulty {
    /// Parse a difficulty tag from a request, defaulting to `Medium` on
    /// unknown input.
    pub fn parse_or_medium(tag: Option<&str>) -> Self {
        match tag.unwrap_or("").trim().to_lowercase().as_str() {
            "easy" => Difficulty::Easy,
            "" | "medium" => Difficulty::Medium,
            "hard" => Difficulty::Hard,
            other => {
                info!(difficulty = %other, "Unknown difficulty tag, defaulting to medium");
                Difficulty::Medium
            }
        }
    }
}

/// A single multiple-choice question as produced by the language model.
///
/// Options carry their labels inline ("A) ...", "B) ...") and `correct`
/// names the label of the right option.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct: String,
    pub explanation: String,
}

impl QuizQuestion {
    /// Whether `correct` names exactly one of this question's options.
    ///
    /// An option's label is its first non-whitespace character; comparison
    /// is case-insensitive.
    pub fn has_matching_correct_label(&self) -> bool {
        let Some(correct) = self.correct.trim().chars().next() else {
            return false;
        };
        let correct = correct.to_ascii_uppercase();
        self.options
            .iter()
            .filter_map(|option| option.trim().chars().next())
            .filter(|label| label.to_ascii_uppercase() == correct)
            .count()
            == 1
    }
}

/// Speaker of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in the tutoring conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Usage counters for one tutoring session. Reset only when the session is
/// torn down.
#[derive(Debug, Clone, Default)]
pub struct Statistics {
    questions_asked: u64,
    subjects_explored: HashSet<Subject>,
}

impl Statistics {
    pub fn record_question(&mut self, subject: Subject) {
        self.questions_asked += 1;
        self.subjects_explored.insert(subject);
    }

    pub fn questions_asked(&self) -> u64 {
        self.questions_asked
    }

    /// Number of distinct subjects touched so far.
    pub fn topics_learned(&self) -> usize {
        self.subjects_explored.len()
    }
}

// Request and response bodies for the HTTP surface. Required fields are
// optional here so handlers can reject missing input with a 400 instead of
// a deserialization failure.

#[derive(Debug, Clone, Deserialize)]
pub struct TranscribeRequest {
    pub audio: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranscribeResponse {
    pub transcript: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub message: Option<String>,
    pub subject: Option<String>,
    #[serde(default)]
    pub conversation_history: Vec<ConversationTurn>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateQuestionsRequest {
    pub topic: Option<String>,
    pub subject: Option<String>,
    pub count: Option<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateQuestionsResponse {
    pub questions: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateQuizRequest {
    pub topic: Option<String>,
    pub subject: Option<String>,
    pub difficulty: Option<String>,
    pub count: Option<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateQuizResponse {
    pub quiz: Vec<QuizQuestion>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckAnswerRequest {
    pub question: Option<String>,
    pub user_answer: Option<String>,
    pub correct_answer: Option<String>,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckAnswerResponse {
    pub is_correct: bool,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizeRequest {
    pub text: Option<String>,
    pub voice_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SynthesizeResponse {
    pub audio_data: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub features: Vec<&'static str>,
}
