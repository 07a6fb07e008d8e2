//! End-to-end flows through the submission controller with a client whose
//! answer is held back until the test releases it.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use lexi_chat::{
    ChatError, ChatState, IgnoreReason, InputAction, KeyInput, MockQueryClient, QueryClient,
    SubmissionController, SubmitOutcome, TranscriptRenderer,
};
use lexi_core::events::ConversationEvent;
use lexi_core::types::{AnswerPayload, Citation, Exchange, ExchangeKind};

// =============================================================================
// Helpers
// =============================================================================

/// Client that signals when it is called and answers only when released.
struct GatedClient {
    entered: Arc<Notify>,
    release: Arc<Notify>,
    calls: AtomicUsize,
    payload: AnswerPayload,
}

impl GatedClient {
    fn new(payload: AnswerPayload) -> Self {
        Self {
            entered: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
            calls: AtomicUsize::new(0),
            payload,
        }
    }
}

impl QueryClient for GatedClient {
    async fn ask(&self, _question: &str) -> Result<AnswerPayload, ChatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        self.release.notified().await;
        Ok(self.payload.clone())
    }
}

fn gated(payload: AnswerPayload) -> Arc<SubmissionController<GatedClient>> {
    Arc::new(SubmissionController::new(GatedClient::new(payload)))
}

fn spawn_submit(
    ctrl: &Arc<SubmissionController<GatedClient>>,
) -> tokio::task::JoinHandle<Result<SubmitOutcome, ChatError>> {
    let ctrl = Arc::clone(ctrl);
    tokio::spawn(async move { ctrl.submit().await })
}

// =============================================================================
// Scenarios
// =============================================================================

#[tokio::test]
async fn test_question_then_answer_scenario() {
    let ctrl = gated(AnswerPayload::new("..."));
    ctrl.set_input("What is quantum entanglement?").unwrap();

    let handle = spawn_submit(&ctrl);
    ctrl.client().entered.notified().await;

    // The question is in the transcript while the client is still working.
    let conv = ctrl.conversation_snapshot().unwrap();
    assert_eq!(conv.len(), 1);
    assert_eq!(
        conv[0].kind,
        ExchangeKind::User {
            text: "What is quantum entanglement?".to_string()
        }
    );
    assert_eq!(ctrl.state(), ChatState::AwaitingResponse);
    assert!(ctrl.is_loading());
    assert!(ctrl.input().unwrap().text().is_empty());

    ctrl.client().release.notify_one();
    let outcome = handle.await.unwrap().unwrap();
    assert_eq!(outcome, SubmitOutcome::Answered);

    let conv = ctrl.conversation_snapshot().unwrap();
    assert_eq!(conv.len(), 2);
    assert_eq!(
        conv[1].kind,
        ExchangeKind::Assistant {
            answer: "...".to_string(),
            citations: vec![]
        }
    );
    assert_eq!(ctrl.state(), ChatState::Idle);
}

#[tokio::test]
async fn test_whitespace_only_scenario() {
    let ctrl = gated(AnswerPayload::new("unused"));
    ctrl.set_input("   ").unwrap();

    let outcome = ctrl.submit().await.unwrap();
    assert_eq!(outcome, SubmitOutcome::Ignored(IgnoreReason::Blank));
    assert!(ctrl.conversation_snapshot().unwrap().is_empty());
    assert_eq!(ctrl.state(), ChatState::Idle);
    assert_eq!(ctrl.client().calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_submit_while_awaiting_is_rejected() {
    let ctrl = gated(AnswerPayload::new("answer"));
    ctrl.set_input("first").unwrap();
    let handle = spawn_submit(&ctrl);
    ctrl.client().entered.notified().await;

    ctrl.set_input("second").unwrap();
    let outcome = ctrl.submit().await.unwrap();
    assert_eq!(outcome, SubmitOutcome::Ignored(IgnoreReason::Busy));
    assert_eq!(ctrl.conversation_len().unwrap(), 1);
    assert_eq!(ctrl.client().calls.load(Ordering::SeqCst), 1);

    // Typing is disabled while loading.
    assert_eq!(
        ctrl.handle_key(KeyInput::Char('x')).unwrap(),
        InputAction::Ignored
    );

    ctrl.client().release.notify_one();
    handle.await.unwrap().unwrap();

    let conv = ctrl.conversation_snapshot().unwrap();
    assert_eq!(conv.len(), 2);
    assert!(conv[0].is_user());
    assert!(conv[1].is_assistant());
}

#[tokio::test]
async fn test_cancel_in_flight_request() {
    let ctrl = gated(AnswerPayload::new("never delivered"));
    let mut events = ctrl.subscribe();
    ctrl.set_input("q").unwrap();
    let handle = spawn_submit(&ctrl);
    ctrl.client().entered.notified().await;

    assert!(ctrl.cancel().unwrap());
    let outcome = handle.await.unwrap().unwrap();
    assert_eq!(outcome, SubmitOutcome::Cancelled);

    let conv = ctrl.conversation_snapshot().unwrap();
    assert_eq!(conv.len(), 2);
    assert_eq!(
        conv[1].kind,
        ExchangeKind::Failure {
            message: "Request cancelled.".to_string()
        }
    );
    assert_eq!(ctrl.state(), ChatState::Idle);
    assert!(!ctrl.cancel().unwrap());

    let names: Vec<&str> = std::iter::from_fn(|| events.try_recv().ok())
        .map(|e| e.event_name())
        .collect();
    assert!(names.contains(&"request_cancelled"));
}

#[tokio::test]
async fn test_aborted_submission_returns_to_idle() {
    let ctrl = gated(AnswerPayload::new("a"));
    ctrl.set_input("q").unwrap();
    let handle = spawn_submit(&ctrl);
    ctrl.client().entered.notified().await;

    handle.abort();
    assert!(handle.await.unwrap_err().is_cancelled());

    assert_eq!(ctrl.state(), ChatState::Idle);
    assert_eq!(ctrl.conversation_len().unwrap(), 1);
}

#[tokio::test]
async fn test_aborted_submission_clears_loading_indicator() {
    let ctrl = gated(AnswerPayload::new("a"));
    let mut rx = ctrl.subscribe();
    ctrl.set_input("q").unwrap();
    let handle = spawn_submit(&ctrl);
    ctrl.client().entered.notified().await;

    handle.abort();
    let _ = handle.await;

    let mut loading = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let ConversationEvent::LoadingChanged { loading: flag, .. } = event {
            loading.push(flag);
        }
    }
    assert_eq!(loading, vec![true, false]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_submissions_admit_one() {
    let ctrl = gated(AnswerPayload::new("a"));
    ctrl.set_input("only once").unwrap();

    let handles: Vec<_> = (0..6).map(|_| spawn_submit(&ctrl)).collect();
    ctrl.client().entered.notified().await;
    ctrl.client().release.notify_one();

    let mut answered = 0;
    for handle in handles {
        match handle.await.unwrap().unwrap() {
            SubmitOutcome::Answered => answered += 1,
            SubmitOutcome::Ignored(_) => {}
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
    assert_eq!(answered, 1);
    assert_eq!(ctrl.client().calls.load(Ordering::SeqCst), 1);

    let conv = ctrl.conversation_snapshot().unwrap();
    assert_eq!(conv.iter().filter(|e| e.is_user()).count(), 1);
    assert_eq!(conv.len(), 2);
}

#[tokio::test]
async fn test_retry_after_failure() {
    let ctrl = SubmissionController::new(MockQueryClient::failing("offline", Duration::ZERO));
    ctrl.set_input("q1").unwrap();
    assert!(matches!(
        ctrl.submit().await.unwrap(),
        SubmitOutcome::Failed(_)
    ));

    ctrl.set_input("q2").unwrap();
    assert!(matches!(
        ctrl.submit().await.unwrap(),
        SubmitOutcome::Failed(_)
    ));

    let conv = ctrl.conversation_snapshot().unwrap();
    assert_eq!(conv.len(), 4);
    assert_eq!(conv[2].kind, Exchange::user("q2").kind);
    assert_eq!(ctrl.client().call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_canned_answer_renders_one_citation_card() {
    let ctrl = SubmissionController::new(MockQueryClient::new());
    ctrl.set_input("Is the claimant entitled to future prospects?")
        .unwrap();
    ctrl.submit().await.unwrap();

    let conv = ctrl.conversation_snapshot().unwrap();
    let renderer = TranscriptRenderer::new("Lexi", "Ask", false);
    let cards = renderer.citation_cards(&conv[1]);
    assert_eq!(cards.len(), conv[1].citations().len());
    assert_eq!(cards.len(), 1);
    assert!(cards[0].contains("Dani_Devi_v_Pritam_Singh.pdf"));
}

#[tokio::test]
async fn test_rendered_cards_match_payload_citations() {
    let citations: Vec<Citation> = (1..=4)
        .map(|i| {
            Citation::new(
                &format!("excerpt {i}"),
                &format!("doc{i}.pdf"),
                &format!("https://example.org/doc{i}.pdf"),
            )
            .unwrap()
        })
        .collect();
    let ctrl = SubmissionController::new(MockQueryClient::with_payload(
        AnswerPayload::new("answer").with_citations(citations.clone()),
        Duration::ZERO,
    ));
    ctrl.set_input("q").unwrap();
    ctrl.submit().await.unwrap();

    let conv = ctrl.conversation_snapshot().unwrap();
    let cards = TranscriptRenderer::new("Lexi", "Ask", false).citation_cards(&conv[1]);
    assert_eq!(cards.len(), citations.len());
    for (card, citation) in cards.iter().zip(&citations) {
        assert!(card.contains(&citation.excerpt_text));
        assert!(card.contains(&citation.source_label));
    }
}
