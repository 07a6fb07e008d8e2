//! Query service client seam.
//!
//! Provides the `QueryClient` trait the controller talks to, a
//! `MockQueryClient` that answers with a canned legal response after a
//! fixed delay, and a `FixtureQueryClient` that replays a recorded backend
//! response from disk.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use lexi_core::types::AnswerPayload;

use crate::error::ChatError;

/// Response used by `MockQueryClient::new`, in backend wire format.
pub const CANNED_RESPONSE: &str = r#"{
  "answer": "Yes, under Section 166 of the Motor Vehicles Act, 1988, the claimants are entitled to an addition for future prospects even when the deceased was self-employed and aged 54–55 years at the time of the accident. In Dani Devi v. Pritam Singh, the Court held that 10% of the deceased’s annual income should be added as future prospects.",
  "citations": [
    {
      "text": "as the age of the deceased at the time of accident was held to be about 54-55 years by the learned Tribunal, being self-employed, as such, 10% of annual income should have been awarded on account of future prospects.” (Para 7 of the document)",
      "source": "Dani_Devi_v_Pritam_Singh.pdf",
      "link": "https://lexisingapore-my.sharepoint.com/:b:/g/personal/harshit_lexi_sg/EdOegeiR_gdBvQxdyW4xE6oBCDgj5E4Bo5wjvhPHpqgIuQ?e=TEu4vz"
    }
  ]
}"#;

/// Default simulated latency.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(1500);

/// A question-answering backend.
///
/// Implementations may be mocked or backed by a real retrieval service;
/// the controller only relies on eventual resolution or rejection.
pub trait QueryClient: Send + Sync {
    /// Ask a question and wait for the answer.
    fn ask(
        &self,
        question: &str,
    ) -> impl std::future::Future<Output = Result<AnswerPayload, ChatError>> + Send;
}

#[derive(Debug, Clone)]
enum Reply {
    Canned,
    Payload(AnswerPayload),
    Fail(String),
}

/// Simulated backend.
///
/// Ignores the question and resolves after a fixed delay.
#[derive(Debug)]
pub struct MockQueryClient {
    delay: Duration,
    reply: Reply,
    calls: AtomicUsize,
}

impl MockQueryClient {
    /// Mock that returns the canned legal answer after the default delay.
    pub fn new() -> Self {
        Self::with_delay(DEFAULT_DELAY)
    }

    /// Mock that returns the canned legal answer after `delay`.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            reply: Reply::Canned,
            calls: AtomicUsize::new(0),
        }
    }

    /// Mock that returns `payload` after `delay`.
    pub fn with_payload(payload: AnswerPayload, delay: Duration) -> Self {
        Self {
            delay,
            reply: Reply::Payload(payload),
            calls: AtomicUsize::new(0),
        }
    }

    /// Mock that fails with a transport error after `delay`.
    pub fn failing(message: &str, delay: Duration) -> Self {
        Self {
            delay,
            reply: Reply::Fail(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of times `ask` has been called.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockQueryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryClient for MockQueryClient {
    async fn ask(&self, question: &str) -> Result<AnswerPayload, ChatError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(
            question_len = question.len(),
            delay_ms = self.delay.as_millis() as u64,
            "Mock query client answering"
        );
        tokio::time::sleep(self.delay).await;

        match &self.reply {
            Reply::Canned => Ok(AnswerPayload::from_json(CANNED_RESPONSE)?),
            Reply::Payload(payload) => Ok(payload.clone()),
            Reply::Fail(msg) => Err(ChatError::Transport(msg.clone())),
        }
    }
}

/// Replays a recorded backend response stored as JSON on disk.
///
/// The file is read on every call, so it can be edited while the app runs.
#[derive(Debug, Clone)]
pub struct FixtureQueryClient {
    path: PathBuf,
    delay: Duration,
}

impl FixtureQueryClient {
    pub fn new(path: impl Into<PathBuf>, delay: Duration) -> Self {
        Self {
            path: path.into(),
            delay,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl QueryClient for FixtureQueryClient {
    async fn ask(&self, _question: &str) -> Result<AnswerPayload, ChatError> {
        tokio::time::sleep(self.delay).await;

        let raw = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            ChatError::Transport(format!("reading {}: {}", self.path.display(), e))
        })?;

        AnswerPayload::from_json(&raw).map_err(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "Backend payload rejected");
            ChatError::from(e)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn fixture(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_canned_response_decodes() {
        let payload = AnswerPayload::from_json(CANNED_RESPONSE).unwrap();
        assert!(payload.answer.contains("Section 166"));
        assert_eq!(payload.citations.len(), 1);
        assert_eq!(
            payload.citations[0].source_label,
            "Dani_Devi_v_Pritam_Singh.pdf"
        );
        assert_eq!(payload.citations[0].source_link.scheme(), "https");
    }

    #[tokio::test(start_paused = true)]
    async fn test_mock_waits_for_delay() {
        let client = MockQueryClient::new();
        let started = tokio::time::Instant::now();
        let payload = client.ask("anything").await.unwrap();
        assert!(started.elapsed() >= DEFAULT_DELAY);
        assert!(payload.answer.starts_with("Yes"));
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_custom_payload_ignores_question() {
        let client =
            MockQueryClient::with_payload(AnswerPayload::new("fixed"), Duration::ZERO);
        let a = client.ask("one").await.unwrap();
        let b = client.ask("two").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.answer, "fixed");
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_failing() {
        let client = MockQueryClient::failing("connection refused", Duration::ZERO);
        let err = client.ask("q").await.unwrap_err();
        assert!(matches!(err, ChatError::Transport(_)));
        assert!(err.to_string().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_fixture_valid_payload() {
        let file = fixture(
            r#"{"answer":"Line one\nLine two","citations":[{"text":"t","source":"s.pdf","link":"https://example.org/s.pdf"}]}"#,
        );
        let client = FixtureQueryClient::new(file.path(), Duration::ZERO);
        let payload = client.ask("q").await.unwrap();
        assert_eq!(payload.answer, "Line one\nLine two");
        assert_eq!(payload.citations.len(), 1);
    }

    #[tokio::test]
    async fn test_fixture_missing_answer_is_malformed() {
        let file = fixture(r#"{"citations":[]}"#);
        let client = FixtureQueryClient::new(file.path(), Duration::ZERO);
        let err = client.ask("q").await.unwrap_err();
        assert!(matches!(err, ChatError::MalformedPayload(_)));
    }

    #[tokio::test]
    async fn test_fixture_missing_file_is_transport_error() {
        let client = FixtureQueryClient::new("/nonexistent/answer.json", Duration::ZERO);
        let err = client.ask("q").await.unwrap_err();
        assert!(matches!(err, ChatError::Transport(_)));
        assert!(err.to_string().contains("/nonexistent/answer.json"));
    }

    #[tokio::test]
    async fn test_fixture_empty_citations_is_valid() {
        let file = fixture(r#"{"answer":"No authority found.","citations":[]}"#);
        let client = FixtureQueryClient::new(file.path(), Duration::ZERO);
        let payload = client.ask("q").await.unwrap();
        assert!(payload.citations.is_empty());
    }
}
