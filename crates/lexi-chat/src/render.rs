//! Plain-text transcript rendering for terminals.
//!
//! Answers and questions are printed verbatim so embedded newlines and
//! spacing survive. Other control characters are escaped, so backend text
//! cannot move the cursor or open terminal sequences. Citations are printed
//! as cards under their answer.

use lexi_core::config::LexiConfig;
use lexi_core::types::{Citation, Exchange, ExchangeKind};

use crate::input::InputBuffer;

/// Shown while a question is awaiting its answer.
pub const LOADING_TEXT: &str = "Generating answer...";

const USER_LABEL: &str = "You";
const ASSISTANT_LABEL: &str = "Lexi";
const PROMPT: &str = "> ";

/// Make text safe to print: keeps newlines and tabs, escapes every other
/// control character (ESC, CR, BEL, C1 codes) as `\u{..}`.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_control() && c != '\n' && c != '\t' {
            out.extend(c.escape_unicode());
        } else {
            out.push(c);
        }
    }
    out
}

/// Renders exchanges, citation cards, and the input area.
#[derive(Debug, Clone)]
pub struct TranscriptRenderer {
    title: String,
    placeholder: String,
    hyperlinks: bool,
}

impl TranscriptRenderer {
    pub fn new(title: &str, placeholder: &str, hyperlinks: bool) -> Self {
        Self {
            title: title.to_string(),
            placeholder: placeholder.to_string(),
            hyperlinks,
        }
    }

    pub fn from_config(config: &LexiConfig) -> Self {
        Self::new(
            &config.general.title,
            &config.chat.placeholder,
            config.chat.hyperlinks,
        )
    }

    /// Title with an underline of matching width.
    pub fn header(&self) -> String {
        let width = self.title.chars().count();
        format!("{}\n{}\n", self.title, "=".repeat(width))
    }

    /// Render a single exchange, terminated by a blank line.
    pub fn exchange(&self, exchange: &Exchange) -> String {
        match &exchange.kind {
            ExchangeKind::User { text } => {
                format!("{}:\n{}\n\n", USER_LABEL, sanitize(text))
            }
            ExchangeKind::Assistant { answer, .. } => {
                let mut out = format!("{}:\n{}\n", ASSISTANT_LABEL, sanitize(answer));
                let cards = self.citation_cards(exchange);
                if !cards.is_empty() {
                    out.push_str("\n  Citations:\n");
                    for card in cards {
                        out.push_str(&card);
                    }
                }
                out.push('\n');
                out
            }
            ExchangeKind::Failure { message } => {
                format!("{}:\n[error] {}\n\n", ASSISTANT_LABEL, sanitize(message))
            }
        }
    }

    /// One card per citation, in payload order. Empty for non-answers.
    pub fn citation_cards(&self, exchange: &Exchange) -> Vec<String> {
        exchange
            .citations()
            .iter()
            .enumerate()
            .map(|(i, c)| self.citation_card(i + 1, c))
            .collect()
    }

    fn citation_card(&self, number: usize, citation: &Citation) -> String {
        format!(
            "  [{}] \"{}\"\n      {}\n",
            number,
            sanitize(&citation.excerpt_text),
            self.source_link(citation)
        )
    }

    fn source_link(&self, citation: &Citation) -> String {
        // `Url` percent-encodes control characters, so only the label needs escaping.
        let label = sanitize(&citation.source_label);
        if self.hyperlinks {
            // OSC 8: terminals open the target in the browser on click.
            format!(
                "\x1b]8;;{}\x1b\\{}\x1b]8;;\x1b\\",
                citation.source_link, label
            )
        } else {
            format!("{} <{}>", label, citation.source_link)
        }
    }

    pub fn loading(&self) -> String {
        format!("{}:\n{}\n\n", ASSISTANT_LABEL, LOADING_TEXT)
    }

    /// Full transcript, optionally followed by the loading indicator.
    pub fn transcript(&self, exchanges: &[Exchange], loading: bool) -> String {
        let mut out = self.header();
        out.push('\n');
        for exchange in exchanges {
            out.push_str(&self.exchange(exchange));
        }
        if loading {
            out.push_str(&self.loading());
        }
        out
    }

    /// The input area for a terminal `width` columns wide: the draft, or
    /// the placeholder when the draft is empty.
    ///
    /// The draft soft-wraps after the prompt and only the last
    /// `rows(width)` rows are shown, so a tall draft scrolls.
    pub fn input_area(&self, input: &InputBuffer, width: usize) -> String {
        if input.text().is_empty() {
            return format!("{}{}\n", PROMPT, self.placeholder);
        }
        let content_width = width.saturating_sub(PROMPT.len()).max(1);
        let lines = input.wrapped_lines(content_width);
        let skip = lines.len() - input.rows(content_width);
        lines[skip..]
            .iter()
            .map(|line| format!("{}{}\n", PROMPT, sanitize(line)))
            .collect()
    }
}

impl Default for TranscriptRenderer {
    fn default() -> Self {
        Self::from_config(&LexiConfig::default())
    }
}
