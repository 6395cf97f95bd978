use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::data::{MessageService, ReactionService};
use crate::reaction::{self, ParentMessage, Reaction};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrichmentPolicy {
    #[default]
    Strict,
    Degrade,
}

impl EnrichmentPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(EnrichmentPolicy::Strict),
            "degrade" => Some(EnrichmentPolicy::Degrade),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("Failed to load reaction")]
    Failed(#[source] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedReaction {
    pub reaction: Reaction,
    pub parent: Option<ParentMessage>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Found(Box<LoadedReaction>),
    NotFound,
}

pub struct Orchestrator {
    reactions: Arc<dyn ReactionService>,
    messages: Arc<dyn MessageService>,
    policy: EnrichmentPolicy,
}

impl Orchestrator {
    pub fn new(
        reactions: Arc<dyn ReactionService>,
        messages: Arc<dyn MessageService>,
        policy: EnrichmentPolicy,
    ) -> Self {
        Self {
            reactions,
            messages,
            policy,
        }
    }

    pub fn load(&self, reaction_id: &str) -> Result<LoadOutcome, RetrievalError> {
        debug!(reaction_id, "loading reaction");
        let raw = self
            .reactions
            .reaction(reaction_id)
            .map_err(RetrievalError::Failed)?;
        let Some(raw) = raw else {
            debug!(reaction_id, "reaction not found");
            return Ok(LoadOutcome::NotFound);
        };

        let mut reaction = reaction::normalize(&raw);
        let Some(message_id) = reaction.message_id.clone() else {
            return Ok(found(reaction, None));
        };

        let parent = match self
            .messages
            .message(&message_id)
            .with_context(|| format!("enrich reaction {reaction_id} from message {message_id}"))
        {
            Ok(Some(raw_message)) => reaction::normalize_message(&raw_message),
            Ok(None) => {
                debug!(reaction_id, message_id = %message_id, "parent message missing");
                return Ok(found(reaction, None));
            }
            Err(err) => match self.policy {
                EnrichmentPolicy::Strict => return Err(RetrievalError::Failed(err)),
                EnrichmentPolicy::Degrade => {
                    let detail = format!("{err:#}");
                    warn!(reaction_id, error = %detail, "showing reaction without replies");
                    return Ok(found(reaction, None));
                }
            },
        };

        if merge_replies(&mut reaction, &parent, reaction_id) {
            debug!(
                reaction_id,
                replies = reaction.replies.as_ref().map_or(0, Vec::len),
                "merged replies"
            );
        }
        Ok(found(reaction, Some(parent)))
    }

    pub fn submit_for_manual_review(&self, reaction_id: &str) -> anyhow::Result<()> {
        self.reactions.submit_for_manual_review(reaction_id)
    }
}

fn found(reaction: Reaction, parent: Option<ParentMessage>) -> LoadOutcome {
    LoadOutcome::Found(Box::new(LoadedReaction { reaction, parent }))
}

// Matches on the reaction's own id, else on `requested_id`.
pub fn merge_replies(reaction: &mut Reaction, parent: &ParentMessage, requested_id: &str) -> bool {
    let target = reaction.id.as_deref().unwrap_or(requested_id);
    let replies = parent
        .reactions
        .iter()
        .find(|entry| entry.id.as_deref() == Some(target))
        .and_then(|entry| entry.replies.as_ref())
        .filter(|replies| !replies.is_empty());
    match replies {
        Some(replies) => {
            reaction.replies = Some(replies.clone());
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{MockMessageService, MockReactionService};
    use serde_json::json;

    fn orchestrator(
        reactions: MockReactionService,
        messages: MockMessageService,
        policy: EnrichmentPolicy,
    ) -> Orchestrator {
        Orchestrator::new(Arc::new(reactions), Arc::new(messages), policy)
    }

    fn loaded(outcome: LoadOutcome) -> LoadedReaction {
        match outcome {
            LoadOutcome::Found(loaded) => *loaded,
            LoadOutcome::NotFound => panic!("expected a reaction"),
        }
    }

    #[test]
    fn merges_replies_in_server_order() {
        let reactions = MockReactionService::default()
            .with_reaction("r1", json!({"id": "r1", "messageId": "m1"}));
        let messages = MockMessageService::default().with_message(
            "m1",
            json!({
                "id": "m1",
                "content": "Hello world",
                "reactions": [
                    {"id": "r0", "replies": [{"id": "z", "text": "other"}]},
                    {"id": "r1", "replies": [{"id": "a", "text": "hi"}, {"id": "b", "text": "yo"}]},
                ],
            }),
        );
        let result = loaded(
            orchestrator(reactions, messages, EnrichmentPolicy::Strict)
                .load("r1")
                .unwrap(),
        );
        let replies = result.reaction.replies.unwrap();
        let pairs: Vec<_> = replies
            .iter()
            .map(|reply| (reply.id.as_str(), reply.text.as_str()))
            .collect();
        assert_eq!(pairs, vec![("a", "hi"), ("b", "yo")]);
        assert_eq!(result.parent.unwrap().content.as_deref(), Some("Hello world"));
    }

    #[test]
    fn empty_payload_is_not_found() {
        let outcome = orchestrator(
            MockReactionService::default(),
            MockMessageService::default(),
            EnrichmentPolicy::Strict,
        )
        .load("nope")
        .unwrap();
        assert_eq!(outcome, LoadOutcome::NotFound);
    }

    #[test]
    fn falls_back_to_requested_id_when_payload_has_none() {
        let reactions =
            MockReactionService::default().with_reaction("r9", json!({"message_id": "m1"}));
        let messages = MockMessageService::default().with_message(
            "m1",
            json!({"reactions": [{"id": "r9", "replies": [{"id": "a", "text": "hi"}]}]}),
        );
        let result = loaded(
            orchestrator(reactions, messages, EnrichmentPolicy::Strict)
                .load("r9")
                .unwrap(),
        );
        assert_eq!(result.reaction.replies.unwrap().len(), 1);
    }

    #[test]
    fn empty_parent_replies_leave_reaction_untouched() {
        let reactions = MockReactionService::default().with_reaction(
            "r1",
            json!({"id": "r1", "messageId": "m1", "replies": [{"id": "own", "text": "kept"}]}),
        );
        let messages = MockMessageService::default()
            .with_message("m1", json!({"reactions": [{"id": "r1", "replies": []}]}));
        let result = loaded(
            orchestrator(reactions, messages, EnrichmentPolicy::Strict)
                .load("r1")
                .unwrap(),
        );
        assert_eq!(result.reaction.replies.unwrap()[0].id, "own");
    }

    #[test]
    fn reaction_without_message_skips_enrichment() {
        let reactions = MockReactionService::default().with_reaction("r1", json!({"id": "r1"}));
        let messages = MockMessageService::default().fail_on("m1");
        let result = loaded(
            orchestrator(reactions, messages, EnrichmentPolicy::Strict)
                .load("r1")
                .unwrap(),
        );
        assert!(result.parent.is_none());
        assert!(result.reaction.replies.is_none());
    }

    #[test]
    fn reaction_fetch_failure_aborts() {
        let reactions = MockReactionService::default().fail_on("r1");
        let err = orchestrator(reactions, MockMessageService::default(), EnrichmentPolicy::Degrade)
            .load("r1")
            .unwrap_err();
        assert_eq!(err.to_string(), "Failed to load reaction");
    }

    #[test]
    fn strict_policy_discards_reaction_on_enrichment_failure() {
        let reactions = MockReactionService::default()
            .with_reaction("r1", json!({"id": "r1", "messageId": "m1"}));
        let messages = MockMessageService::default().fail_on("m1");
        assert!(orchestrator(reactions, messages, EnrichmentPolicy::Strict)
            .load("r1")
            .is_err());
    }

    #[test]
    fn degrade_policy_keeps_reaction_without_replies() {
        let reactions = MockReactionService::default()
            .with_reaction("r1", json!({"id": "r1", "messageId": "m1", "name": "Jane"}));
        let messages = MockMessageService::default().fail_on("m1");
        let result = loaded(
            orchestrator(reactions, messages, EnrichmentPolicy::Degrade)
                .load("r1")
                .unwrap(),
        );
        assert_eq!(result.reaction.name.as_deref(), Some("Jane"));
        assert!(result.reaction.replies.is_none());
        assert!(result.parent.is_none());
    }

    #[test]
    fn policy_parses_config_values() {
        assert_eq!(EnrichmentPolicy::parse("Degrade"), Some(EnrichmentPolicy::Degrade));
        assert_eq!(EnrichmentPolicy::parse("strict"), Some(EnrichmentPolicy::Strict));
        assert_eq!(EnrichmentPolicy::parse("lenient"), None);
    }
}
