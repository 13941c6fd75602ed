//! Scripted [`CredentialsPrompter`] for tests.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;

use crate::platform::{CredentialPrompt, CredentialsPrompter};

/// Prompter answering from preloaded queues; empty queues mean the prompt
/// was abandoned.
#[derive(Default)]
pub struct ScriptedPrompter {
    answers: parking_lot::Mutex<HashMap<CredentialPrompt, VecDeque<String>>>,
    asked: parking_lot::Mutex<Vec<CredentialPrompt>>,
}

impl ScriptedPrompter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_answer(self, kind: CredentialPrompt, value: impl Into<String>) -> Self {
        self.answers
            .lock()
            .entry(kind)
            .or_default()
            .push_back(value.into());
        self
    }

    /// Which prompts were asked, in order.
    #[must_use]
    pub fn asked(&self) -> Vec<CredentialPrompt> {
        self.asked.lock().clone()
    }
}

#[async_trait]
impl CredentialsPrompter for ScriptedPrompter {
    async fn prompt(&self, _bot_name: &str, kind: CredentialPrompt) -> Option<String> {
        self.asked.lock().push(kind);
        self.answers.lock().get_mut(&kind)?.pop_front()
    }
}
