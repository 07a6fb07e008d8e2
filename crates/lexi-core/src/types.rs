use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use url::Url;
use uuid::Uuid;

use crate::error::{LexiError, Result};

// =============================================================================
// Citation
// =============================================================================

/// A quoted passage from a source document, attached to an answer.
///
/// Wire field names follow the answering backend: `text`, `source`, `link`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    /// The quoted excerpt.
    #[serde(rename = "text")]
    pub excerpt_text: String,
    /// Human-readable label for the source document (usually a file name).
    #[serde(rename = "source")]
    pub source_label: String,
    /// Absolute, dereferenceable link to the source document.
    #[serde(rename = "link")]
    pub source_link: Url,
}

impl Citation {
    /// Build a citation, parsing `link` as an absolute URL.
    pub fn new(excerpt_text: &str, source_label: &str, link: &str) -> Result<Self> {
        Ok(Self {
            excerpt_text: excerpt_text.to_string(),
            source_label: source_label.to_string(),
            source_link: parse_absolute_url(link)?,
        })
    }
}

/// Parse a link that must be absolute.
pub fn parse_absolute_url(link: &str) -> Result<Url> {
    Url::parse(link).map_err(|e| LexiError::InvalidUrl {
        url: link.to_string(),
        reason: e.to_string(),
    })
}

// =============================================================================
// AnswerPayload
// =============================================================================

/// The response contract of the question-answering backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerPayload {
    /// Plain-text answer. May contain embedded newlines.
    pub answer: String,
    /// Supporting citations in backend order. Absent or `null` means none.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub citations: Vec<Citation>,
}

impl AnswerPayload {
    /// An answer with no citations.
    pub fn new(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            citations: Vec::new(),
        }
    }

    /// Builder-style helper to attach citations.
    pub fn with_citations(mut self, citations: Vec<Citation>) -> Self {
        self.citations = citations;
        self
    }

    /// Decode a raw JSON payload.
    ///
    /// A missing `answer`, invalid JSON, or a citation link that is not an
    /// absolute URL all surface as `LexiError::Serialization`.
    pub fn from_json(raw: &str) -> Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<Vec<Citation>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Citation>>::deserialize(deserializer)?.unwrap_or_default())
}

// =============================================================================
// Exchange
// =============================================================================

/// What one turn of the conversation holds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExchangeKind {
    /// A question typed by the user.
    User { text: String },
    /// An answer from the backend.
    Assistant {
        answer: String,
        citations: Vec<Citation>,
    },
    /// A failed request, shown on the assistant side of the transcript.
    Failure { message: String },
}

/// One turn in the conversation. Immutable once created.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: ExchangeKind,
}

impl Exchange {
    fn from_kind(kind: ExchangeKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            kind,
        }
    }

    /// A user question.
    pub fn user(text: impl Into<String>) -> Self {
        Self::from_kind(ExchangeKind::User { text: text.into() })
    }

    /// An assistant answer built from a backend payload.
    pub fn assistant(payload: AnswerPayload) -> Self {
        Self::from_kind(ExchangeKind::Assistant {
            answer: payload.answer,
            citations: payload.citations,
        })
    }

    /// An assistant-side failure notice.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::from_kind(ExchangeKind::Failure {
            message: message.into(),
        })
    }

    pub fn is_user(&self) -> bool {
        matches!(self.kind, ExchangeKind::User { .. })
    }

    pub fn is_assistant(&self) -> bool {
        matches!(self.kind, ExchangeKind::Assistant { .. })
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.kind, ExchangeKind::Failure { .. })
    }

    /// Citations of an assistant exchange; empty for every other kind.
    pub fn citations(&self) -> &[Citation] {
        match &self.kind {
            ExchangeKind::Assistant { citations, .. } => citations,
            _ => &[],
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const LINK: &str = "https://example.org/judgments/dani_devi.pdf";

    #[test]
    fn test_citation_new_accepts_absolute_url() {
        let c = Citation::new("quoted", "Dani_Devi_v_Pritam_Singh.pdf", LINK).unwrap();
        assert_eq!(c.source_link.as_str(), LINK);
        assert_eq!(c.source_label, "Dani_Devi_v_Pritam_Singh.pdf");
    }

    #[test]
    fn test_citation_new_rejects_relative_url() {
        let err = Citation::new("quoted", "a.pdf", "docs/a.pdf").unwrap_err();
        assert!(matches!(err, LexiError::InvalidUrl { .. }));
    }

    #[test]
    fn test_citation_wire_field_names() {
        let c = Citation::new("excerpt", "a.pdf", LINK).unwrap();
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["text"], "excerpt");
        assert_eq!(json["source"], "a.pdf");
        assert_eq!(json["link"], LINK);
    }

    #[test]
    fn test_payload_from_json_full() {
        let raw = format!(
            r#"{{"answer":"Yes.\nTen percent.","citations":[{{"text":"t","source":"s.pdf","link":"{LINK}"}}]}}"#
        );
        let payload = AnswerPayload::from_json(&raw).unwrap();
        assert_eq!(payload.answer, "Yes.\nTen percent.");
        assert_eq!(payload.citations.len(), 1);
        assert_eq!(payload.citations[0].source_label, "s.pdf");
    }

    #[test]
    fn test_payload_missing_citations_is_empty() {
        let payload = AnswerPayload::from_json(r#"{"answer":"ok"}"#).unwrap();
        assert!(payload.citations.is_empty());
    }

    #[test]
    fn test_payload_null_citations_is_empty() {
        let payload = AnswerPayload::from_json(r#"{"answer":"ok","citations":null}"#).unwrap();
        assert!(payload.citations.is_empty());
    }

    #[test]
    fn test_payload_missing_answer_is_error() {
        let err = AnswerPayload::from_json(r#"{"citations":[]}"#).unwrap_err();
        assert!(matches!(err, LexiError::Serialization(_)));
        assert!(err.to_string().contains("answer"));
    }

    #[test]
    fn test_payload_relative_link_is_error() {
        let raw = r#"{"answer":"a","citations":[{"text":"t","source":"s","link":"s.pdf"}]}"#;
        assert!(AnswerPayload::from_json(raw).is_err());
    }

    #[test]
    fn test_exchange_constructors() {
        let user = Exchange::user("What is quantum entanglement?");
        assert!(user.is_user());
        assert!(user.citations().is_empty());

        let citation = Citation::new("t", "s.pdf", LINK).unwrap();
        let bot = Exchange::assistant(AnswerPayload::new("...").with_citations(vec![citation]));
        assert!(bot.is_assistant());
        assert_eq!(bot.citations().len(), 1);

        let failure = Exchange::failure("Request timed out.");
        assert!(failure.is_failure());
        assert_ne!(user.id, bot.id);
    }

    #[test]
    fn test_exchange_serializes_with_type_tag() {
        let user = Exchange::user("hi");
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["type"], "user");
        assert_eq!(json["text"], "hi");

        let back: Exchange = serde_json::from_value(json).unwrap();
        assert_eq!(back, user);
    }
}
