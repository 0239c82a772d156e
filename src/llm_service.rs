use tracing::{debug, error, info};

use crate::errors::ApiError;
use crate::models::{ConversationTurn, Difficulty, QuizQuestion, Subject};
use crate::providers::{ChatMessage, GroqClient};

/// Number of prior turns included in a chat completion.
pub const CHAT_HISTORY_WINDOW: usize = 8;

/// Subject-aware prompt construction and response parsing over the
/// chat-completion client.
#[derive(Debug, Clone)]
pub struct LlmService {
    groq: GroqClient,
}

impl LlmService {
    pub fn new(groq: GroqClient) -> Self {
        Self { groq }
    }

    fn subject_instruction(subject: Subject) -> &'static str {
        match subject {
            Subject::Science => {
                "You are an expert Science tutor. Explain scientific concepts clearly using \
                 simple language, examples, and analogies suitable for students. Break down \
                 complex topics into easy-to-understand parts."
            }
            Subject::Mathematics => {
                "You are a patient Mathematics tutor. Solve problems step-by-step, explain the \
                 logic behind each step, and provide clear explanations. Use simple language \
                 and verify calculations."
            }
            Subject::English => {
                "You are an English language tutor. Help with grammar, vocabulary, writing, and \
                 literature. Provide clear explanations, examples, and corrections in a friendly \
                 manner."
            }
            Subject::History => {
                "You are a History tutor who makes the past come alive. Explain historical \
                 events, their context, causes, and effects in an engaging and \
                 easy-to-understand way."
            }
            Subject::Geography => {
                "You are a Geography tutor. Explain geographical concepts, locations, climates, \
                 and cultures clearly. Use examples and help students visualize concepts."
            }
            Subject::General => {
                "You are EduVoice, a helpful educational tutor for students. Explain topics \
                 clearly, answer questions patiently, help with homework, generate practice \
                 questions, and make learning engaging. Keep responses concise (2-4 sentences) \
                 for voice output."
            }
        }
    }

    fn difficulty_phrase(difficulty: Difficulty) -> &'static str {
        match difficulty {
            Difficulty::Easy => "easy questions suitable for beginners",
            Difficulty::Medium => "intermediate level questions",
            Difficulty::Hard => "challenging questions for advanced students",
        }
    }

    /// Answer one student question, subject-aware, with the most recent
    /// history turns as context.
    pub async fn chat(
        &self,
        message: &str,
        subject: Subject,
        history: &[ConversationTurn],
    ) -> Result<String, ApiError> {
        let system = format!(
            "{} Always respond in a way that is easy to understand when spoken aloud. Keep \
             answers under 150 words unless explaining complex topics.",
            Self::subject_instruction(subject)
        );

        let recent = &history[history.len().saturating_sub(CHAT_HISTORY_WINDOW)..];

        let mut messages = Vec::with_capacity(recent.len() + 2);
        messages.push(ChatMessage::system(system));
        messages.extend(recent.iter().map(ChatMessage::from));
        messages.push(ChatMessage::user(message));

        info!(
            subject = subject.as_str(),
            history_turns = recent.len(),
            message_length = message.len(),
            "Requesting tutor response"
        );

        self.groq.chat_completion(messages, 500, 0.7, Some(0.9)).await
    }

    /// Generate informal practice questions as a numbered-list text blob.
    pub async fn generate_questions(
        &self,
        topic: &str,
        subject: Subject,
        count: u8,
    ) -> Result<String, ApiError> {
        let prompt = format!(
            "Generate exactly {count} practice questions about \"{topic}\" for students \
             studying {subject}. Make them clear, educational, and appropriate for exam \
             practice. Format: Just list the questions numbered 1-{count}, nothing else.",
            subject = subject.as_str(),
        );

        let messages = vec![
            ChatMessage::system(
                "You are an expert educational content creator who generates high-quality \
                 practice questions for students.",
            ),
            ChatMessage::user(prompt),
        ];

        info!(
            topic = topic,
            subject = subject.as_str(),
            count = count,
            "Requesting practice questions"
        );

        self.groq.chat_completion(messages, 400, 0.8, None).await
    }

    /// Generate a structured multiple-choice quiz.
    ///
    /// The model is instructed to answer with a bare JSON array; incidental
    /// markdown fences are stripped before parsing and a response that still
    /// does not parse, or whose answer labels do not line up with the
    /// options, is a `MalformedResponse` error.
    pub async fn generate_quiz(
        &self,
        topic: &str,
        subject: Subject,
        difficulty: Difficulty,
        count: u8,
    ) -> Result<Vec<QuizQuestion>, ApiError> {
        let prompt = format!(
            "Create a quiz about \"{topic}\" in the subject of {subject}. Generate exactly \
             {count} multiple choice questions with {level}.\n\n\
             Format STRICTLY as JSON array:\n\
             [\n\
               {{\n\
                 \"question\": \"Question text here?\",\n\
                 \"options\": [\"A) First option\", \"B) Second option\", \"C) Third option\", \"D) Fourth option\"],\n\
                 \"correct\": \"A\",\n\
                 \"explanation\": \"Brief explanation why this is correct\"\n\
               }}\n\
             ]\n\n\
             Make questions educational, clear, and engaging. Only return the JSON array, \
             nothing else.",
            subject = subject.as_str(),
            level = Self::difficulty_phrase(difficulty),
        );

        let messages = vec![
            ChatMessage::system(
                "You are an expert quiz creator. Always respond with valid JSON only.",
            ),
            ChatMessage::user(prompt),
        ];

        info!(
            topic = topic,
            subject = subject.as_str(),
            difficulty = ?difficulty,
            count = count,
            "Requesting quiz generation"
        );

        let raw = self.groq.chat_completion(messages, 800, 0.8, None).await?;

        debug!(response_length = raw.len(), "Raw quiz generation response");

        let quiz = parse_quiz_payload(&raw)?;

        info!(question_count = quiz.len(), "Quiz generated successfully");
        Ok(quiz)
    }
}

/// Strip incidental markdown code fences the model sometimes wraps its JSON
/// in, then trim to the outermost JSON array if one is present.
pub fn extract_json_payload(content: &str) -> String {
    let stripped = content.replace("```json", "").replace("```", "");
    let stripped = stripped.trim();

    if let (Some(start), Some(end)) = (stripped.find('['), stripped.rfind(']')) {
        if end > start {
            return stripped[start..=end].to_string();
        }
    }

    stripped.to_string()
}

/// Parse the cleaned model output into quiz questions, validating that each
/// question's answer label resolves to exactly one option.
pub fn parse_quiz_payload(content: &str) -> Result<Vec<QuizQuestion>, ApiError> {
    let cleaned = extract_json_payload(content);

    let questions: Vec<QuizQuestion> = serde_json::from_str(&cleaned).map_err(|e| {
        error!(error = %e, "Failed to parse quiz generation response");
        ApiError::malformed("Failed to generate valid quiz format")
    })?;

    if questions.is_empty() {
        return Err(ApiError::malformed("Quiz response contained no questions"));
    }

    for (index, question) in questions.iter().enumerate() {
        if !question.has_matching_correct_label() {
            error!(
                question_index = index,
                correct = %question.correct,
                "Quiz question answer label does not match its options"
            );
            return Err(ApiError::malformed(
                "Quiz response contained a question whose answer matches no option",
            ));
        }
    }

    Ok(questions)
}
