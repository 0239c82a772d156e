use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use chrono::Utc;
use tracing::info;

use crate::{
    answer_checker,
    errors::{ApiError, ErrorBody, ErrorContext},
    llm_service::LlmService,
    models::*,
    providers::{DeepgramClient, MurfClient, Providers},
};

// Import logging macros
use crate::{log_api_error, log_api_start, log_api_success};

/// Feature tags reported by the health endpoint.
const FEATURES: [&str; 5] = ["asr", "tts", "llm", "quiz", "multi-voice"];

const DEFAULT_QUESTION_COUNT: u8 = 5;

#[derive(Clone)]
pub struct AppState {
    pub providers: Providers,
}

impl AppState {
    pub fn new(speech: DeepgramClient, llm: LlmService, voice: MurfClient) -> Self {
        Self {
            providers: Providers::new(speech, llm, voice),
        }
    }

    fn speech(&self) -> &DeepgramClient {
        &self.providers.speech
    }

    fn llm(&self) -> &LlmService {
        &self.providers.llm
    }

    fn voice(&self) -> &MurfClient {
        &self.providers.voice
    }
}

type HandlerError = (StatusCode, Json<ErrorBody>);

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "EduVoice server is running".to_string(),
        timestamp: Utc::now(),
        features: FEATURES.to_vec(),
    })
}

pub async fn transcribe(
    State(state): State<AppState>,
    Json(request): Json<TranscribeRequest>,
) -> Result<Json<TranscribeResponse>, HandlerError> {
    log_api_start!("transcribe", provider = "deepgram");

    let Some(audio) = request.audio.filter(|audio| !audio.is_empty()) else {
        let error = ApiError::validation("Audio data is required");
        return Err(error.to_response_with_context(ErrorContext::new("transcribe")));
    };

    match state.speech().transcribe_base64(&audio).await {
        Ok(transcript) => {
            log_api_success!("transcribe", provider = "deepgram", "audio transcribed");
            Ok(Json(TranscribeResponse { transcript }))
        }
        Err(e) => {
            log_api_error!(
                "transcribe",
                provider = "deepgram",
                error = e,
                "transcription failed"
            );
            Err(e.to_response_with_context(
                ErrorContext::new("transcribe").with_provider("deepgram"),
            ))
        }
    }
}

pub async fn chat(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, HandlerError> {
    log_api_start!("chat", provider = "groq");

    let Some(message) = request.message.filter(|message| !message.trim().is_empty()) else {
        let error = ApiError::validation("Message is required");
        return Err(error.to_response_with_context(ErrorContext::new("chat")));
    };

    let subject = Subject::parse_or_general(request.subject.as_deref());

    match state
        .llm()
        .chat(&message, subject, &request.conversation_history)
        .await
    {
        Ok(response) => {
            log_api_success!("chat", provider = "groq", "tutor response generated");
            Ok(Json(ChatResponse { response }))
        }
        Err(e) => {
            log_api_error!("chat", provider = "groq", error = e, "tutor response failed");
            Err(e.to_response_with_context(ErrorContext::new("chat").with_provider("groq")))
        }
    }
}

pub async fn generate_questions(
    State(state): State<AppState>,
    Json(request): Json<GenerateQuestionsRequest>,
) -> Result<Json<GenerateQuestionsResponse>, HandlerError> {
    log_api_start!("generate_questions", provider = "groq");

    let Some(topic) = request.topic.filter(|topic| !topic.trim().is_empty()) else {
        let error = ApiError::validation("Topic is required");
        return Err(error.to_response_with_context(ErrorContext::new("generate_questions")));
    };

    let subject = Subject::parse_or_general(request.subject.as_deref());
    let count = request.count.unwrap_or(DEFAULT_QUESTION_COUNT);

    match state.llm().generate_questions(&topic, subject, count).await {
        Ok(questions) => {
            log_api_success!(
                "generate_questions",
                provider = "groq",
                "practice questions generated"
            );
            Ok(Json(GenerateQuestionsResponse { questions }))
        }
        Err(e) => {
            log_api_error!(
                "generate_questions",
                provider = "groq",
                error = e,
                "question generation failed"
            );
            Err(e.to_response_with_context(
                ErrorContext::new("generate_questions").with_provider("groq"),
            ))
        }
    }
}

pub async fn generate_quiz(
    State(state): State<AppState>,
    Json(request): Json<GenerateQuizRequest>,
) -> Result<Json<GenerateQuizResponse>, HandlerError> {
    log_api_start!("generate_quiz", provider = "groq");

    let Some(topic) = request.topic.filter(|topic| !topic.trim().is_empty()) else {
        let error = ApiError::validation("Topic is required");
        return Err(error.to_response_with_context(ErrorContext::new("generate_quiz")));
    };

    let count = request.count.unwrap_or(DEFAULT_QUESTION_COUNT);
    if !(crate::quiz_session::MIN_QUESTIONS..=crate::quiz_session::MAX_QUESTIONS).contains(&count)
    {
        let error = ApiError::validation(format!(
            "Question count must be between {} and {}",
            crate::quiz_session::MIN_QUESTIONS,
            crate::quiz_session::MAX_QUESTIONS
        ));
        return Err(error.to_response_with_context(ErrorContext::new("generate_quiz")));
    }

    let subject = Subject::parse_or_general(request.subject.as_deref());
    let difficulty = Difficulty::parse_or_medium(request.difficulty.as_deref());

    match state
        .llm()
        .generate_quiz(&topic, subject, difficulty, count)
        .await
    {
        Ok(quiz) => {
            info!(
                topic = %topic,
                question_count = quiz.len(),
                "Quiz generated"
            );
            Ok(Json(GenerateQuizResponse { quiz }))
        }
        Err(e) => {
            log_api_error!(
                "generate_quiz",
                provider = "groq",
                error = e,
                "quiz generation failed"
            );
            Err(e.to_response_with_context(
                ErrorContext::new("generate_quiz").with_provider("groq"),
            ))
        }
    }
}

pub async fn check_answer(
    Json(request): Json<CheckAnswerRequest>,
) -> Result<Json<CheckAnswerResponse>, HandlerError> {
    log_api_start!("check_answer");

    let (Some(user_answer), Some(correct_answer)) =
        (request.user_answer, request.correct_answer)
    else {
        let error = ApiError::validation("userAnswer and correctAnswer are required");
        return Err(error.to_response_with_context(ErrorContext::new("check_answer")));
    };

    // Local grading: no provider call involved.
    let explanation = request.explanation.unwrap_or_default();
    let verdict = answer_checker::check(&correct_answer, &user_answer, &explanation);

    log_api_success!("check_answer", "answer graded locally");
    Ok(Json(CheckAnswerResponse {
        is_correct: verdict.is_correct,
        message: verdict.message,
    }))
}

pub async fn synthesize(
    State(state): State<AppState>,
    Json(request): Json<SynthesizeRequest>,
) -> Result<Json<SynthesizeResponse>, HandlerError> {
    log_api_start!("synthesize", provider = "murf");

    let Some(text) = request.text.filter(|text| !text.trim().is_empty()) else {
        let error = ApiError::validation("Text is required");
        return Err(error.to_response_with_context(ErrorContext::new("synthesize")));
    };

    let voice_id = request
        .voice_id
        .unwrap_or_else(|| DEFAULT_VOICE_ID.to_string());

    match state.voice().synthesize(&text, &voice_id).await {
        Ok(audio_data) => {
            log_api_success!("synthesize", provider = "murf", "speech synthesized");
            Ok(Json(SynthesizeResponse { audio_data }))
        }
        Err(e) => {
            log_api_error!(
                "synthesize",
                provider = "murf",
                error = e,
                "speech synthesis failed"
            );
            Err(e.to_response_with_context(
                ErrorContext::new("synthesize").with_provider("murf"),
            ))
        }
    }
}

pub async fn voices(
    State(state): State<AppState>,
) -> Result<Json<serde_json::Value>, HandlerError> {
    log_api_start!("voices", provider = "murf");

    match state.voice().voices().await {
        Ok(catalog) => {
            log_api_success!("voices", provider = "murf", "voice catalog fetched");
            Ok(Json(catalog))
        }
        Err(e) => {
            log_api_error!(
                "voices",
                provider = "murf",
                error = e,
                "voice catalog fetch failed"
            );
            Err(e.to_response_with_context(ErrorContext::new("voices").with_provider("murf")))
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/transcribe", post(transcribe))
        .route("/chat", post(chat))
        .route("/generate-questions", post(generate_questions))
        .route("/generate-quiz", post(generate_quiz))
        .route("/check-answer", post(check_answer))
        .route("/synthesize", post(synthesize))
        .route("/voices", get(voices))
        .with_state(state)
}
