//! The chat turn state machine.
//!
//! `Idle -> Awaiting -> Streaming -> Idle` on success and
//! `Idle -> Awaiting -> Idle` when the dispatch fails. Only one turn can be
//! in flight: every entry point checks the status first, so a second reveal
//! can never start writing while another one owns the tail.

use std::time::Duration;

use tokio::time::{interval_at, Instant};
use tracing::{debug, info, warn};

use crate::core::conversation::MessageStore;
use crate::core::dispatcher::{AnswerSource, DispatchResult, NetworkError};
use crate::core::message::Message;
use crate::core::reveal::{RevealCycle, RevealStep};

pub const ERROR_PREFIX: &str = "⚠ Error: ";

pub fn format_error_message(err: &NetworkError) -> String {
    format!("{ERROR_PREFIX}{err}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Awaiting,
    Streaming,
}

/// A question accepted for dispatch, tagged with the turn it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchRequest {
    pub question: String,
    pub cycle: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No reveal is running.
    Idle,
    Revealed,
    /// The last unit was revealed and the session is idle again.
    Finished,
    /// The tail was taken over by something else; the reveal was dropped.
    Abandoned,
}

pub struct SessionController {
    store: MessageStore,
    status: SessionStatus,
    input: String,
    cycle: u64,
    reveal: Option<RevealCycle>,
    last_error: Option<NetworkError>,
}

impl SessionController {
    pub fn new(store: MessageStore) -> Self {
        Self {
            store,
            status: SessionStatus::Idle,
            input: String::new(),
            cycle: 0,
            reveal: None,
            last_error: None,
        }
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_idle(&self) -> bool {
        self.status == SessionStatus::Idle
    }

    pub fn is_streaming(&self) -> bool {
        self.status == SessionStatus::Streaming
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    pub fn messages(&self) -> &[Message] {
        self.store.messages()
    }

    pub fn current_cycle(&self) -> u64 {
        self.cycle
    }

    /// Why the most recent turn failed, if it did. Cleared by the next send.
    pub fn last_error(&self) -> Option<&NetworkError> {
        self.last_error.as_ref()
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut String {
        &mut self.input
    }

    /// Sends the input buffer; the buffer is kept when the send is rejected.
    pub fn submit_input(&mut self) -> Option<DispatchRequest> {
        let text = std::mem::take(&mut self.input);
        let request = self.send_message(&text);
        if request.is_none() {
            self.input = text;
        }
        request
    }

    /// Starts a turn. Returns `None`, changing nothing, when a turn is
    /// already running or `text` is blank.
    pub fn send_message(&mut self, text: &str) -> Option<DispatchRequest> {
        if self.status != SessionStatus::Idle {
            debug!(status = ?self.status, "Ignoring send while a turn is in flight");
            return None;
        }
        let question = text.trim();
        if question.is_empty() {
            return None;
        }

        self.store.append(Message::user(question));
        self.input.clear();
        self.last_error = None;
        self.cycle += 1;
        self.status = SessionStatus::Awaiting;
        info!(cycle = self.cycle, "Question submitted");

        Some(DispatchRequest {
            question: question.to_string(),
            cycle: self.cycle,
        })
    }

    /// Feeds a dispatch outcome back in. Results for any turn other than the
    /// one currently awaiting are dropped and `false` is returned.
    ///
    /// An answer always enters `Streaming`; an empty one has nothing to
    /// reveal and returns to `Idle` before this call does.
    pub fn complete_dispatch(&mut self, cycle: u64, result: DispatchResult) -> bool {
        if self.status != SessionStatus::Awaiting || cycle != self.cycle {
            warn!(
                cycle,
                current = self.cycle,
                status = ?self.status,
                "Dropping dispatch result for an inactive turn"
            );
            return false;
        }

        match result {
            Ok(answer) => {
                debug!(cycle, chars = answer.chars().count(), "Answer received");
                let reveal = RevealCycle::start(&mut self.store, answer);
                let empty = reveal.is_complete();
                self.reveal = Some(reveal);
                self.status = SessionStatus::Streaming;
                if empty {
                    self.finish_reveal();
                    debug!(cycle, "Empty answer, nothing to reveal");
                }
            }
            Err(err) => {
                info!(cycle, error = %err, "Dispatch failed");
                self.store.append(Message::bot(format_error_message(&err)));
                self.last_error = Some(err);
                self.status = SessionStatus::Idle;
            }
        }
        true
    }

    /// Reveals the next unit of the running answer.
    pub fn tick(&mut self) -> TickOutcome {
        let Some(reveal) = self.reveal.as_mut() else {
            return TickOutcome::Idle;
        };

        match reveal.advance(&mut self.store) {
            RevealStep::Advanced => TickOutcome::Revealed,
            RevealStep::Done => {
                self.finish_reveal();
                debug!(cycle = self.cycle, "Reveal complete");
                TickOutcome::Finished
            }
            RevealStep::Stale => {
                self.finish_reveal();
                warn!(cycle = self.cycle, "Reveal target is no longer the tail");
                TickOutcome::Abandoned
            }
        }
    }

    fn finish_reveal(&mut self) {
        if let Some(reveal) = self.reveal.take() {
            reveal.finish(&mut self.store);
        }
        self.status = SessionStatus::Idle;
    }

    /// Starts over with an empty conversation, erasing the stored copy.
    /// Only allowed between turns.
    pub fn reset(&mut self) -> bool {
        if !self.is_idle() {
            return false;
        }
        self.store.clear();
        self.input.clear();
        info!("Conversation reset");
        true
    }

    /// Writes whatever the store still holds back. A reveal in progress is
    /// persisted as far as it got.
    pub fn shutdown(&mut self) {
        self.store.flush();
    }
}

/// Drives one whole turn: send, await the answer, then reveal it on a
/// `tick` cadence. `on_change` runs after every visible change.
///
/// Returns `false` when the send was rejected.
pub async fn run_exchange<F>(
    session: &mut SessionController,
    source: &dyn AnswerSource,
    tick: Duration,
    text: &str,
    mut on_change: F,
) -> bool
where
    F: FnMut(&SessionController),
{
    let Some(request) = session.send_message(text) else {
        return false;
    };
    on_change(session);

    let result = source.ask(&request.question).await;
    session.complete_dispatch(request.cycle, result);
    on_change(session);

    if tick.is_zero() {
        while session.tick() == TickOutcome::Revealed {}
        on_change(session);
        return true;
    }

    let mut interval = interval_at(Instant::now() + tick, tick);
    while session.is_streaming() {
        interval.tick().await;
        session.tick();
        on_change(session);
    }
    true
}
