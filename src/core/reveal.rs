//! Simulated typing: exposes an already complete answer one grapheme per tick.
//!
//! A [`RevealCycle`] is a plain state object; whoever owns the clock calls
//! [`RevealCycle::advance`] once per tick. Nothing in here sleeps.

use std::time::Duration;

use unicode_segmentation::UnicodeSegmentation;

use crate::core::conversation::{MessageStore, StreamHandle};

pub const DEFAULT_TICK: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealStep {
    /// One more unit is visible; more remain.
    Advanced,
    /// The full text is visible (or there was nothing to reveal).
    Done,
    /// The tail no longer belongs to this cycle; nothing was written.
    Stale,
}

#[derive(Debug)]
pub struct RevealCycle {
    target: String,
    cursor: usize,
    handle: StreamHandle,
}

impl RevealCycle {
    /// Appends the empty bot message this cycle will grow.
    pub fn start(store: &mut MessageStore, full_text: impl Into<String>) -> Self {
        let handle = store.begin_stream();
        Self {
            target: full_text.into(),
            cursor: 0,
            handle,
        }
    }

    pub fn handle(&self) -> StreamHandle {
        self.handle
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    /// Byte offset of the revealed prefix.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_complete(&self) -> bool {
        self.cursor >= self.target.len()
    }

    pub fn remaining_ticks(&self) -> usize {
        self.target[self.cursor..].graphemes(true).count()
    }

    pub fn advance(&mut self, store: &mut MessageStore) -> RevealStep {
        let Some(unit) = self.target[self.cursor..].graphemes(true).next() else {
            return RevealStep::Done;
        };

        if !store.mutate_last(self.handle, |content| content.push_str(unit)) {
            return RevealStep::Stale;
        }

        self.cursor += unit.len();
        if self.is_complete() {
            RevealStep::Done
        } else {
            RevealStep::Advanced
        }
    }

    /// Retires the stream handle, writing the final tail to storage.
    pub fn finish(self, store: &mut MessageStore) {
        store.end_stream(self.handle);
    }
}
