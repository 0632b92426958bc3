//! Per-message marker, acknowledgement, and phrase decisions.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::chat_source::{ChatSource, SourceError, HISTORY_PAGE_LIMIT};
use crate::delivery_phrase::DeliveryPhraseMatcher;
use crate::scan_config::ScanConfig;
use crate::scan_model::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
/// Outcome of classifying one message.
pub enum MatchDecision {
    SkipNotMarked,
    SkipAlreadyAcked,
    SkipAutomatedAuthor,
    SkipPhraseMismatch,
    Accept,
}

impl MatchDecision {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SkipNotMarked => "skip_not_marked",
            Self::SkipAlreadyAcked => "skip_already_acked",
            Self::SkipAutomatedAuthor => "skip_automated_author",
            Self::SkipPhraseMismatch => "skip_phrase_mismatch",
            Self::Accept => "accept",
        }
    }

    pub fn is_accept(self) -> bool {
        self == Self::Accept
    }
}

#[derive(Debug, Clone)]
/// Classifier bound to one run's configuration.
pub struct MessageClassifier {
    config: Arc<ScanConfig>,
    phrase: Option<DeliveryPhraseMatcher>,
}

impl MessageClassifier {
    pub fn new(config: Arc<ScanConfig>) -> Self {
        let phrase = if config.delivery_phrase_strict {
            DeliveryPhraseMatcher::for_marker(&config.marker)
        } else {
            None
        };
        Self { config, phrase }
    }

    /// Checks run cheapest first; reacting users are only fetched for
    /// messages that already passed every local check.
    pub async fn classify<S: ChatSource + ?Sized>(
        &self,
        source: &S,
        message: &Message,
        now: DateTime<Utc>,
    ) -> Result<MatchDecision, SourceError> {
        if message.author.automated && !self.config.include_automated_authors {
            return Ok(MatchDecision::SkipAutomatedAuthor);
        }
        if !self.contains_marker(message) {
            return Ok(MatchDecision::SkipNotMarked);
        }
        if self.config.delivery_phrase_strict && !self.phrase_matches(message, now) {
            return Ok(MatchDecision::SkipPhraseMismatch);
        }
        if self.is_acknowledged(source, message).await? {
            return Ok(MatchDecision::SkipAlreadyAcked);
        }
        Ok(MatchDecision::Accept)
    }

    pub fn contains_marker(&self, message: &Message) -> bool {
        let marker = &self.config.marker;
        message
            .text_fragments()
            .any(|text| marker.literal_in(text) || marker.custom_reference_in(text))
    }

    pub fn phrase_matches(&self, message: &Message, now: DateTime<Utc>) -> bool {
        let Some(phrase) = &self.phrase else {
            return false;
        };
        message
            .text_fragments()
            .any(|text| phrase.matches_at(text, now))
    }

    /// True once any configured acknowledger appears among the reacting users.
    pub async fn is_acknowledged<S: ChatSource + ?Sized>(
        &self,
        source: &S,
        message: &Message,
    ) -> Result<bool, SourceError> {
        let Some(reaction) = message
            .reactions
            .iter()
            .find(|reaction| reaction.symbol == self.config.ack_symbol)
        else {
            return Ok(false);
        };
        let mut after = None;
        loop {
            let users = source
                .reaction_users_page(
                    message.container_id,
                    message.id,
                    reaction.symbol.as_str(),
                    after,
                    HISTORY_PAGE_LIMIT,
                )
                .await?;
            if users
                .iter()
                .any(|user_id| self.config.is_acknowledger(*user_id))
            {
                return Ok(true);
            }
            if users.len() < HISTORY_PAGE_LIMIT {
                return Ok(false);
            }
            after = users.last().copied();
        }
    }
}
