use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::api::FALLBACK_ANSWER;
use crate::core::dispatcher::{AnswerSource, DispatchResult};
use crate::core::theme::{PresentationSink, ThemeMode};

/// Answers questions from a fixed script, recording what it was asked.
pub struct ScriptedSource {
    replies: Mutex<VecDeque<DispatchResult>>,
    questions: Mutex<Vec<String>>,
    delay: Option<Duration>,
}

impl ScriptedSource {
    pub fn new(replies: Vec<DispatchResult>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            questions: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().expect("questions lock").clone()
    }
}

#[async_trait]
impl AnswerSource for ScriptedSource {
    async fn ask(&self, question: &str) -> DispatchResult {
        self.questions
            .lock()
            .expect("questions lock")
            .push(question.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or_else(|| Ok(FALLBACK_ANSWER.to_string()))
    }
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    pub applied: Vec<ThemeMode>,
}

impl PresentationSink for RecordingSink {
    fn apply_theme(&mut self, mode: ThemeMode) {
        self.applied.push(mode);
    }
}
