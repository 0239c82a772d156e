pub mod answer_checker;
pub mod api;
pub mod config;
pub mod errors;
pub mod llm_service;
pub mod logging;
pub mod models;
pub mod playback;
pub mod providers;
pub mod quiz_session;
pub mod voice_session;

#[cfg(test)]
mod tests {
    mod quiz_session_test;
    mod voice_session_test;
}

pub use answer_checker::{Verdict, check};
pub use config::Config;
pub use errors::{ApiError, ErrorContext};
pub use llm_service::LlmService;
pub use models::*;
pub use playback::{LocalPlayer, PlaybackError, SpeechSink};
pub use providers::{DeepgramClient, GroqClient, MurfClient, Providers};
pub use quiz_session::{QuizGateway, QuizParams, QuizPhase, QuizSession};
pub use voice_session::{TutorGateway, UtteranceOutcome, VoiceSession};
