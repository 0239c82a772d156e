use async_trait::async_trait;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use crate::errors::ApiError;
use crate::models::{ConversationTurn, Role, Subject};
use crate::playback::{PlaybackError, SpeechSink};
use crate::voice_session::{HISTORY_CAP, TutorGateway, UtteranceOutcome, VoiceSession};

#[derive(Clone, Copy, PartialEq)]
enum FailAt {
    Nowhere,
    Transcribe,
    Chat,
    Synthesize,
}

/// Gateway stub returning a numbered transcript/response per call so
/// history ordering can be asserted.
struct StubGateway {
    transcript: Option<String>,
    fail_at: FailAt,
    utterances: Arc<AtomicUsize>,
    chat_calls: Arc<AtomicUsize>,
    history_len_seen: Arc<Mutex<Vec<usize>>>,
}

impl StubGateway {
    fn new() -> Self {
        Self {
            transcript: None,
            fail_at: FailAt::Nowhere,
            utterances: Arc::new(AtomicUsize::new(0)),
            chat_calls: Arc::new(AtomicUsize::new(0)),
            history_len_seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn with_transcript(transcript: &str) -> Self {
        Self {
            transcript: Some(transcript.to_string()),
            ..Self::new()
        }
    }

    fn failing_at(fail_at: FailAt) -> Self {
        Self {
            fail_at,
            ..Self::new()
        }
    }
}

#[async_trait]
impl TutorGateway for StubGateway {
    async fn transcribe(&self, _audio_b64: &str) -> Result<String, ApiError> {
        if self.fail_at == FailAt::Transcribe {
            return Err(ApiError::upstream("Transcription failed", None));
        }
        let n = self.utterances.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(self
            .transcript
            .clone()
            .unwrap_or_else(|| format!("question {n}")))
    }

    async fn chat(
        &self,
        message: &str,
        _subject: Subject,
        history: &[ConversationTurn],
    ) -> Result<String, ApiError> {
        self.chat_calls.fetch_add(1, Ordering::SeqCst);
        self.history_len_seen.lock().unwrap().push(history.len());
        if self.fail_at == FailAt::Chat {
            return Err(ApiError::upstream("Tutoring response failed", None));
        }
        Ok(format!("answer to {message}"))
    }

    async fn synthesize(&self, _text: &str, _voice_id: &str) -> Result<String, ApiError> {
        if self.fail_at == FailAt::Synthesize {
            return Err(ApiError::upstream("Text-to-speech failed", None));
        }
        Ok("c3R1Yi1hdWRpbw==".to_string())
    }
}

struct RecordingSink {
    played: Arc<AtomicUsize>,
    fail: bool,
}

impl RecordingSink {
    fn new() -> Self {
        Self {
            played: Arc::new(AtomicUsize::new(0)),
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            played: Arc::new(AtomicUsize::new(0)),
            fail: true,
        }
    }
}

#[async_trait]
impl SpeechSink for RecordingSink {
    async fn play(&mut self, _audio_b64: &str) -> Result<(), PlaybackError> {
        self.played.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(PlaybackError::Player("stub playback failure".to_string()));
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_successful_utterance_records_exchange() {
    let gateway = StubGateway::new();
    let sink = RecordingSink::new();
    let played = Arc::clone(&sink.played);
    let mut session = VoiceSession::new(gateway, sink, Subject::Science, "en-US-ken");

    let outcome = session.handle_utterance("YXVkaW8=").await.unwrap();

    assert_eq!(
        outcome,
        UtteranceOutcome::Answered {
            transcript: "question 1".to_string(),
            response: "answer to question 1".to_string(),
        }
    );
    assert_eq!(session.history().len(), 2);
    assert_eq!(session.history()[0].role, Role::User);
    assert_eq!(session.history()[0].content, "question 1");
    assert_eq!(session.history()[1].role, Role::Assistant);
    assert_eq!(session.stats().questions_asked(), 1);
    assert_eq!(session.stats().topics_learned(), 1);
    assert_eq!(played.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_empty_transcript_aborts_before_chat() {
    let gateway = StubGateway::with_transcript("   ");
    let chat_calls = Arc::clone(&gateway.chat_calls);
    let mut session =
        VoiceSession::new(gateway, RecordingSink::new(), Subject::General, "en-US-ken");

    let outcome = session.handle_utterance("YXVkaW8=").await.unwrap();

    assert_eq!(outcome, UtteranceOutcome::NothingHeard);
    assert_eq!(chat_calls.load(Ordering::SeqCst), 0);
    assert!(session.history().is_empty());
    assert_eq!(session.stats().questions_asked(), 0);
}

#[tokio::test]
async fn test_transcription_failure_leaves_history_unchanged() {
    let gateway = StubGateway::failing_at(FailAt::Transcribe);
    let mut session =
        VoiceSession::new(gateway, RecordingSink::new(), Subject::General, "en-US-ken");

    assert!(session.handle_utterance("YXVkaW8=").await.is_err());
    assert!(session.history().is_empty());
    assert_eq!(session.stats().questions_asked(), 0);
}

#[tokio::test]
async fn test_chat_failure_leaves_history_unchanged() {
    let gateway = StubGateway::failing_at(FailAt::Chat);
    let mut session =
        VoiceSession::new(gateway, RecordingSink::new(), Subject::General, "en-US-ken");

    assert!(session.handle_utterance("YXVkaW8=").await.is_err());
    assert!(session.history().is_empty());
    assert_eq!(session.stats().questions_asked(), 0);
}

#[tokio::test]
async fn test_synthesis_failure_still_records_the_turn() {
    let gateway = StubGateway::failing_at(FailAt::Synthesize);
    let mut session =
        VoiceSession::new(gateway, RecordingSink::new(), Subject::General, "en-US-ken");

    assert!(session.handle_utterance("YXVkaW8=").await.is_err());
    assert_eq!(session.history().len(), 2);
    assert_eq!(session.stats().questions_asked(), 1);
}

#[tokio::test]
async fn test_playback_failure_still_records_the_turn() {
    let gateway = StubGateway::new();
    let mut session =
        VoiceSession::new(gateway, RecordingSink::failing(), Subject::General, "en-US-ken");

    assert!(session.handle_utterance("YXVkaW8=").await.is_err());
    assert_eq!(session.history().len(), 2);
}

#[tokio::test]
async fn test_history_is_capped_at_twelve_turns_oldest_first_dropped() {
    let gateway = StubGateway::new();
    let history_len_seen = Arc::clone(&gateway.history_len_seen);
    let mut session =
        VoiceSession::new(gateway, RecordingSink::new(), Subject::General, "en-US-ken");

    for _ in 0..8 {
        session.handle_utterance("YXVkaW8=").await.unwrap();
    }

    // chat always sees the capped history of the previous exchanges
    assert_eq!(
        history_len_seen.lock().unwrap().as_slice(),
        [0, 2, 4, 6, 8, 10, 12, 12]
    );

    assert_eq!(session.history().len(), HISTORY_CAP);
    // 8 exchanges = 16 turns; the oldest two exchanges fell off
    assert_eq!(session.history()[0].content, "question 3");
    assert_eq!(session.history()[1].content, "answer to question 3");
    assert_eq!(
        session.history().last().unwrap().content,
        "answer to question 8"
    );
}

#[tokio::test]
async fn test_clear_resets_history_but_not_statistics() {
    let gateway = StubGateway::new();
    let mut session =
        VoiceSession::new(gateway, RecordingSink::new(), Subject::Science, "en-US-ken");

    session.handle_utterance("YXVkaW8=").await.unwrap();
    session.set_subject(Subject::History);
    session.handle_utterance("YXVkaW8=").await.unwrap();

    session.clear();

    assert!(session.history().is_empty());
    assert_eq!(session.stats().questions_asked(), 2);
    assert_eq!(session.stats().topics_learned(), 2);
}
