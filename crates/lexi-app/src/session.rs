//! Interactive terminal session.
//!
//! Reads lines from stdin and turns them into key presses for the
//! controller. A line ending in `\` continues the draft on a new line
//! (the terminal stand-in for Shift+Enter); any other line confirms it.

use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::{JoinError, JoinSet};

use lexi_chat::{
    ChatError, IgnoreReason, InputAction, KeyInput, QueryClient, SubmissionController,
    SubmitOutcome, TranscriptRenderer,
};
use lexi_core::events::ConversationEvent;

const HELP: &str = "Enter sends the question. End a line with \\ to keep typing on a new line.\n\
Commands: :cancel stops the pending request, :help shows this text, :quit exits.";

/// Used when the terminal size cannot be queried (e.g. stdout is a pipe).
const FALLBACK_WIDTH: usize = 80;

/// One line of terminal input, interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineCommand {
    Quit,
    Cancel,
    Help,
    /// Draft text. `continued` means the user asked for a newline instead of sending.
    Text { body: String, continued: bool },
}

pub fn parse_line(line: &str) -> LineCommand {
    match line.trim() {
        ":q" | ":quit" | ":exit" => return LineCommand::Quit,
        ":cancel" => return LineCommand::Cancel,
        ":help" | ":h" => return LineCommand::Help,
        _ => {}
    }
    match line.strip_suffix('\\') {
        Some(body) => LineCommand::Text {
            body: body.to_string(),
            continued: true,
        },
        None => LineCommand::Text {
            body: line.to_string(),
            continued: false,
        },
    }
}

/// Key presses equivalent to typing `body` and then ending the line.
pub fn keys_for(body: &str, continued: bool) -> Vec<KeyInput> {
    let mut keys: Vec<KeyInput> = body.chars().map(KeyInput::Char).collect();
    keys.push(if continued {
        KeyInput::ShiftEnter
    } else {
        KeyInput::Enter
    });
    keys
}

/// What the loop should do after a typed line reached the draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEffect {
    /// The draft was confirmed and can be sent.
    Submit,
    /// The draft changed; redraw the input area.
    Redraw,
    /// The line was not applied or the draft cannot be sent.
    Ignored(IgnoreReason),
}

/// Apply one typed line to the controller's draft.
///
/// `prefilled` is true while the draft still holds the sample question; the
/// first non-empty line replaces it. Lines typed while a question is in
/// flight are dropped.
pub fn apply_text<C: QueryClient>(
    ctrl: &SubmissionController<C>,
    prefilled: &mut bool,
    body: &str,
    continued: bool,
) -> Result<LineEffect, ChatError> {
    if ctrl.is_loading() {
        return Ok(LineEffect::Ignored(IgnoreReason::Busy));
    }
    if *prefilled && !body.is_empty() {
        ctrl.set_input("")?;
    }
    *prefilled = false;

    let mut confirmed = false;
    for key in keys_for(body, continued) {
        if ctrl.handle_key(key)? == InputAction::Submit {
            confirmed = true;
        }
    }

    if !confirmed {
        return Ok(LineEffect::Redraw);
    }
    if ctrl.input()?.can_submit() {
        Ok(LineEffect::Submit)
    } else {
        Ok(LineEffect::Ignored(IgnoreReason::Blank))
    }
}

/// Log a finished submission task and return a notice for the user when
/// the transcript does not already explain what happened.
pub fn submission_notice(
    result: Result<Result<SubmitOutcome, ChatError>, JoinError>,
) -> Option<String> {
    match result {
        Ok(Ok(outcome)) => {
            tracing::debug!(?outcome, "Submission finished");
            None
        }
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "Submission failed");
            Some(format!("(submission failed: {})", e.user_message()))
        }
        Err(e) if e.is_cancelled() => {
            tracing::debug!("Submission task aborted");
            None
        }
        Err(e) => {
            tracing::error!(error = %e, "Submission task panicked");
            Some("(submission stopped unexpectedly)".to_string())
        }
    }
}

fn flush() {
    let _ = std::io::stdout().flush();
}

fn terminal_width() -> usize {
    crossterm::terminal::size()
        .map(|(cols, _)| usize::from(cols))
        .ok()
        .filter(|&cols| cols > 0)
        .unwrap_or(FALLBACK_WIDTH)
}

fn print_input_area<C: QueryClient>(
    ctrl: &SubmissionController<C>,
    renderer: &TranscriptRenderer,
) -> Result<(), ChatError> {
    print!("{}", renderer.input_area(&ctrl.input()?, terminal_width()));
    flush();
    Ok(())
}

/// Print transcript updates as the controller publishes them.
async fn print_events<C: QueryClient>(
    mut rx: broadcast::Receiver<ConversationEvent>,
    ctrl: Arc<SubmissionController<C>>,
    renderer: TranscriptRenderer,
) {
    loop {
        match rx.recv().await {
            Ok(ConversationEvent::ExchangeAppended { index, .. }) => {
                let exchange = ctrl
                    .conversation_snapshot()
                    .ok()
                    .and_then(|conv| conv.get(index).cloned());
                if let Some(exchange) = exchange {
                    print!("\n{}", renderer.exchange(&exchange));
                    flush();
                }
            }
            Ok(ConversationEvent::LoadingChanged { loading: true, .. }) => {
                print!("{}", renderer.loading());
                flush();
            }
            Ok(ConversationEvent::LoadingChanged { loading: false, .. }) => {
                if let Err(e) = print_input_area(&ctrl, &renderer) {
                    tracing::warn!(error = %e, "Could not draw input area");
                }
            }
            Ok(ConversationEvent::SubmissionIgnored { reason, .. }) => {
                println!("(not sent: {})", reason);
            }
            Ok(event) => {
                tracing::debug!(event = event.event_name(), "View event");
            }
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "View fell behind conversation events");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

/// Run the read-submit-print loop until `:quit`, end of input, or Ctrl-C while idle.
pub async fn run<C>(
    ctrl: Arc<SubmissionController<C>>,
    renderer: TranscriptRenderer,
) -> Result<(), Box<dyn std::error::Error>>
where
    C: QueryClient + 'static,
{
    print!("{}\n{}\n\n", renderer.header(), HELP);
    print_input_area(&ctrl, &renderer)?;

    let printer = tokio::spawn(print_events(
        ctrl.subscribe(),
        Arc::clone(&ctrl),
        renderer.clone(),
    ));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut submissions: JoinSet<Result<SubmitOutcome, ChatError>> = JoinSet::new();
    let mut prefilled = !ctrl.input()?.text().is_empty();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_line(&line) {
                    LineCommand::Quit => break,
                    LineCommand::Help => println!("{}", HELP),
                    LineCommand::Cancel => {
                        if !ctrl.cancel()? {
                            println!("Nothing to cancel.");
                        }
                    }
                    LineCommand::Text { body, continued } => {
                        match apply_text(&ctrl, &mut prefilled, &body, continued)? {
                            LineEffect::Submit => {
                                let ctrl = Arc::clone(&ctrl);
                                submissions.spawn(async move { ctrl.submit().await });
                            }
                            LineEffect::Redraw => print_input_area(&ctrl, &renderer)?,
                            LineEffect::Ignored(reason) => println!("(not sent: {})", reason),
                        }
                    }
                }
            }
            Some(result) = submissions.join_next() => {
                if let Some(notice) = submission_notice(result) {
                    println!("{}", notice);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                if !ctrl.cancel()? {
                    break;
                }
            }
        }
    }

    if ctrl.is_loading() {
        ctrl.cancel()?;
    }
    while let Some(result) = submissions.join_next().await {
        if let Some(notice) = submission_notice(result) {
            println!("{}", notice);
        }
    }
    printer.abort();
    Ok(())
}
