use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use parking_lot::Mutex;
use serde_json::Value;

use crate::api;
use crate::reaction::{RawMessage, RawReaction};

pub trait ReactionService: Send + Sync {
    fn reaction(&self, id: &str) -> Result<Option<RawReaction>>;
    fn submit_for_manual_review(&self, id: &str) -> Result<()>;
}

pub trait MessageService: Send + Sync {
    fn message(&self, id: &str) -> Result<Option<RawMessage>>;
}

pub struct ApiReactionService {
    client: Arc<api::Client>,
}

impl ApiReactionService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl ReactionService for ApiReactionService {
    fn reaction(&self, id: &str) -> Result<Option<RawReaction>> {
        self.client.reaction(id).context("fetch reaction")
    }

    fn submit_for_manual_review(&self, id: &str) -> Result<()> {
        self.client
            .submit_for_manual_review(id)
            .context("submit reaction for manual review")
    }
}

pub struct ApiMessageService {
    client: Arc<api::Client>,
}

impl ApiMessageService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl MessageService for ApiMessageService {
    fn message(&self, id: &str) -> Result<Option<RawMessage>> {
        self.client.message(id).context("fetch parent message")
    }
}

#[derive(Default)]
pub struct MockReactionService {
    reactions: HashMap<String, Value>,
    failing: Vec<String>,
    reject_reviews: bool,
    submitted: Mutex<Vec<String>>,
}

impl MockReactionService {
    pub fn with_reaction(mut self, id: &str, payload: Value) -> Self {
        self.reactions.insert(id.to_string(), payload);
        self
    }

    pub fn fail_on(mut self, id: &str) -> Self {
        self.failing.push(id.to_string());
        self
    }

    pub fn rejecting_reviews(mut self) -> Self {
        self.reject_reviews = true;
        self
    }

    pub fn submitted(&self) -> Vec<String> {
        self.submitted.lock().clone()
    }
}

impl ReactionService for MockReactionService {
    fn reaction(&self, id: &str) -> Result<Option<RawReaction>> {
        if self.failing.iter().any(|failing| failing == id) {
            return Err(anyhow!("mock: reaction {id} unavailable"));
        }
        Ok(self.reactions.get(id).cloned().map(RawReaction))
    }

    fn submit_for_manual_review(&self, id: &str) -> Result<()> {
        if self.reject_reviews {
            return Err(anyhow!("mock: review submission refused"));
        }
        self.submitted.lock().push(id.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct MockMessageService {
    messages: HashMap<String, Value>,
    failing: Vec<String>,
}

impl MockMessageService {
    pub fn with_message(mut self, id: &str, payload: Value) -> Self {
        self.messages.insert(id.to_string(), payload);
        self
    }

    pub fn fail_on(mut self, id: &str) -> Self {
        self.failing.push(id.to_string());
        self
    }
}

impl MessageService for MockMessageService {
    fn message(&self, id: &str) -> Result<Option<RawMessage>> {
        if self.failing.iter().any(|failing| failing == id) {
            return Err(anyhow!("mock: message {id} unavailable"));
        }
        Ok(self.messages.get(id).cloned().map(RawMessage))
    }
}
