use async_trait::async_trait;
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use crate::errors::ApiError;
use crate::models::{Difficulty, QuizQuestion, Subject};
use crate::playback::{PlaybackError, SpeechSink};
use crate::quiz_session::{QuizGateway, QuizParams, QuizPhase, QuizSession};

fn make_questions(count: usize) -> Vec<QuizQuestion> {
    (0..count)
        .map(|i| QuizQuestion {
            question: format!("Question {}?", i + 1),
            options: vec![
                "A) Alpha".to_string(),
                "B) Beta".to_string(),
                "C) Gamma".to_string(),
                "D) Delta".to_string(),
            ],
            correct: "A".to_string(),
            explanation: format!("Explanation {}", i + 1),
        })
        .collect()
}

fn params(topic: &str, count: u8) -> QuizParams {
    QuizParams {
        topic: topic.to_string(),
        subject: Subject::Science,
        difficulty: Difficulty::Medium,
        count,
    }
}

/// Gateway stub that serves canned questions and records everything it is
/// asked to say.
struct StubGateway {
    questions: Vec<QuizQuestion>,
    fail_generation: bool,
    generate_calls: Arc<AtomicUsize>,
    spoken: Arc<Mutex<Vec<String>>>,
}

impl StubGateway {
    fn serving(questions: Vec<QuizQuestion>) -> Self {
        Self {
            questions,
            fail_generation: false,
            generate_calls: Arc::new(AtomicUsize::new(0)),
            spoken: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn failing() -> Self {
        Self {
            fail_generation: true,
            ..Self::serving(Vec::new())
        }
    }
}

#[async_trait]
impl QuizGateway for StubGateway {
    async fn generate_quiz(
        &self,
        _topic: &str,
        _subject: Subject,
        _difficulty: Difficulty,
        _count: u8,
    ) -> Result<Vec<QuizQuestion>, ApiError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_generation {
            return Err(ApiError::malformed("Failed to generate valid quiz format"));
        }
        Ok(self.questions.clone())
    }

    async fn synthesize(&self, text: &str, _voice_id: &str) -> Result<String, ApiError> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok("c3R1Yi1hdWRpbw==".to_string())
    }
}

struct NullSink {
    fail: bool,
}

impl NullSink {
    fn new() -> Self {
        Self { fail: false }
    }

    fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl SpeechSink for NullSink {
    async fn play(&mut self, _audio_b64: &str) -> Result<(), PlaybackError> {
        if self.fail {
            return Err(PlaybackError::Player("stub playback failure".to_string()));
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_empty_topic_is_rejected_without_provider_call() {
    let gateway = StubGateway::serving(make_questions(5));
    let calls = Arc::clone(&gateway.generate_calls);
    let mut session = QuizSession::new(gateway, NullSink::new(), "en-US-ken");

    let result = session.start(params("   ", 5)).await;
    assert!(result.is_err());
    assert_eq!(session.phase(), QuizPhase::Setup);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_out_of_range_count_is_rejected_without_provider_call() {
    let gateway = StubGateway::serving(make_questions(5));
    let calls = Arc::clone(&gateway.generate_calls);
    let mut session = QuizSession::new(gateway, NullSink::new(), "en-US-ken");

    assert!(session.start(params("Photosynthesis", 2)).await.is_err());
    assert!(session.start(params("Photosynthesis", 11)).await.is_err());
    assert_eq!(session.phase(), QuizPhase::Setup);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_successful_start_enters_active_and_speaks_first_prompt() {
    let gateway = StubGateway::serving(make_questions(5));
    let spoken = Arc::clone(&gateway.spoken);
    let mut session = QuizSession::new(gateway, NullSink::new(), "en-US-ken");

    session.start(params("Photosynthesis", 5)).await.unwrap();

    assert_eq!(session.phase(), QuizPhase::Active);
    assert_eq!(session.current_index(), 0);
    assert_eq!(session.score(), 0);
    assert!(session.answers().is_empty());
    assert_eq!(session.questions().len(), 5);
    assert_eq!(spoken.lock().unwrap().as_slice(), ["Question 1?"]);
}

#[tokio::test(start_paused = true)]
async fn test_scoring_and_timed_advance() {
    let gateway = StubGateway::serving(make_questions(5));
    let spoken = Arc::clone(&gateway.spoken);
    let mut session = QuizSession::new(gateway, NullSink::new(), "en-US-ken");

    session.start(params("Photosynthesis", 5)).await.unwrap();

    // answers grows one per answered question
    assert_eq!(session.answers().len(), session.current_index());

    let verdict = session.submit_answer("A").await.unwrap().unwrap();
    assert!(verdict.is_correct);
    assert_eq!(session.score(), 1);
    assert_eq!(session.answers(), ["A"]);
    assert_eq!(session.answers().len(), session.current_index() + 1);
    assert!(session.pending_feedback().is_some());

    // spoken feedback includes the explanation
    assert_eq!(
        spoken.lock().unwrap().last().unwrap(),
        "Correct! Explanation 1"
    );

    let phase = session.advance().await;
    assert_eq!(phase, QuizPhase::Active);
    assert_eq!(session.current_index(), 1);
    assert!(session.pending_feedback().is_none());
    assert_eq!(spoken.lock().unwrap().last().unwrap(), "Question 2?");
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_submission_is_ignored_while_feedback_pending() {
    let gateway = StubGateway::serving(make_questions(3));
    let mut session = QuizSession::new(gateway, NullSink::new(), "en-US-ken");
    session.start(params("Photosynthesis", 3)).await.unwrap();

    assert!(session.submit_answer("B").await.unwrap().is_some());
    assert_eq!(session.answers().len(), 1);
    assert_eq!(session.score(), 0);

    // a second submission for the same question is a no-op
    assert!(session.submit_answer("A").await.unwrap().is_none());
    assert_eq!(session.answers().len(), 1);
    assert_eq!(session.score(), 0);

    session.advance().await;
    assert!(session.submit_answer("A").await.unwrap().is_some());
    assert_eq!(session.answers().len(), 2);
    assert_eq!(session.score(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_quiz_runs_to_results_with_spoken_summary() {
    let gateway = StubGateway::serving(make_questions(3));
    let spoken = Arc::clone(&gateway.spoken);
    let mut session = QuizSession::new(gateway, NullSink::new(), "en-US-ken");
    session.start(params("Photosynthesis", 3)).await.unwrap();

    for expected_phase in [QuizPhase::Active, QuizPhase::Active, QuizPhase::Results] {
        assert!(session.current_index() < session.questions().len());
        session.submit_answer("a").await.unwrap();
        assert_eq!(session.advance().await, expected_phase);
    }

    assert_eq!(session.phase(), QuizPhase::Results);
    assert_eq!(session.score(), 3);
    assert_eq!(
        spoken.lock().unwrap().last().unwrap(),
        "Quiz complete! You scored 3 out of 3."
    );
}

#[tokio::test]
async fn test_generation_failure_returns_to_setup_with_nothing_retained() {
    let gateway = StubGateway::failing();
    let mut session = QuizSession::new(gateway, NullSink::new(), "en-US-ken");

    let result = session.start(params("Photosynthesis", 5)).await;
    assert!(result.is_err());
    assert_eq!(session.phase(), QuizPhase::Setup);
    assert!(session.questions().is_empty());
    assert!(session.answers().is_empty());
    assert_eq!(session.topic(), "");
    assert_eq!(session.score(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_restart_is_idempotent() {
    let gateway = StubGateway::serving(make_questions(3));
    let mut session = QuizSession::new(gateway, NullSink::new(), "en-US-ken");
    session.start(params("Photosynthesis", 3)).await.unwrap();
    for _ in 0..3 {
        session.submit_answer("A").await.unwrap();
        session.advance().await;
    }
    assert_eq!(session.phase(), QuizPhase::Results);

    session.restart();
    let after_first = (
        session.phase(),
        session.topic().to_string(),
        session.questions().len(),
        session.current_index(),
        session.answers().to_vec(),
        session.score(),
    );

    session.restart();
    let after_second = (
        session.phase(),
        session.topic().to_string(),
        session.questions().len(),
        session.current_index(),
        session.answers().to_vec(),
        session.score(),
    );

    assert_eq!(after_first, after_second);
    assert_eq!(after_first.0, QuizPhase::Setup);
    assert!(after_first.1.is_empty());
    assert_eq!(after_first.2, 0);
}

#[tokio::test(start_paused = true)]
async fn test_session_uses_exactly_what_the_provider_returned() {
    // provider returns 3 questions although 5 were requested
    let gateway = StubGateway::serving(make_questions(3));
    let mut session = QuizSession::new(gateway, NullSink::new(), "en-US-ken");
    session.start(params("Photosynthesis", 5)).await.unwrap();

    assert_eq!(session.questions().len(), 3);

    for _ in 0..3 {
        session.submit_answer("A").await.unwrap();
        session.advance().await;
    }
    assert_eq!(session.phase(), QuizPhase::Results);
    assert_eq!(session.answers().len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_playback_failure_does_not_stall_the_quiz() {
    let gateway = StubGateway::serving(make_questions(3));
    let mut session = QuizSession::new(gateway, NullSink::failing(), "en-US-ken");

    session.start(params("Photosynthesis", 3)).await.unwrap();
    assert_eq!(session.phase(), QuizPhase::Active);

    session.submit_answer("A").await.unwrap();
    assert_eq!(session.advance().await, QuizPhase::Active);
    assert_eq!(session.current_index(), 1);
}

#[tokio::test]
async fn test_submit_outside_active_phase_is_an_error() {
    let gateway = StubGateway::serving(make_questions(3));
    let mut session = QuizSession::new(gateway, NullSink::new(), "en-US-ken");

    assert!(session.submit_answer("A").await.is_err());
}

#[tokio::test]
async fn test_advance_without_pending_feedback_is_a_noop() {
    let gateway = StubGateway::serving(make_questions(3));
    let mut session = QuizSession::new(gateway, NullSink::new(), "en-US-ken");
    session.start(params("Photosynthesis", 3)).await.unwrap();

    assert_eq!(session.advance().await, QuizPhase::Active);
    assert_eq!(session.current_index(), 0);
}
