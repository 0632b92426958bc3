//! Normalized container, message, and match types consumed by the scan engine.
//!
//! Platform adapters convert provider payloads into these types before any
//! filtering or classification runs, so the engine never probes raw shapes.

use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use serde::Serialize;

pub const PREVIEW_MAX_CHARS: usize = 140;
pub const EMPTY_PREVIEW_PLACEHOLDER: &str = "(no text)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
/// Enumerates the scannable container shapes.
pub enum ContainerKind {
    Channel,
    ActiveThread,
    ArchivedPublicThread,
    ArchivedPrivateThread,
    ForumThread,
}

impl ContainerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Channel => "channel",
            Self::ActiveThread => "active_thread",
            Self::ArchivedPublicThread => "archived_public_thread",
            Self::ArchivedPrivateThread => "archived_private_thread",
            Self::ForumThread => "forum_thread",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// One scannable message stream.
pub struct Container {
    pub id: u64,
    pub name: String,
    pub kind: ContainerKind,
    pub parent_id: Option<u64>,
    pub category_id: Option<u64>,
}

impl Container {
    /// Display label used in match records (`#name`, falling back to the id).
    pub fn label(&self) -> String {
        let name = self.name.trim();
        if name.is_empty() {
            format!("#{}", self.id)
        } else {
            format!("#{name}")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
/// Standing guild channel types relevant to enumeration.
pub enum GuildChannelKind {
    Text,
    Forum,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Standing channel as reported by the platform.
pub struct GuildChannel {
    pub id: u64,
    pub name: String,
    pub kind: GuildChannelKind,
    pub category_id: Option<u64>,
    pub position: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Thread as reported by active or archived thread listings.
pub struct ThreadChannel {
    pub id: u64,
    pub name: String,
    pub parent_id: u64,
    pub archive_timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Archived-thread listing visibility.
pub enum ArchiveVisibility {
    Public,
    Private,
}

impl ArchiveVisibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// One page of an archived-thread listing.
pub struct ArchivedThreadPage {
    pub threads: Vec<ThreadChannel>,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageAuthor {
    pub id: u64,
    pub automated: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageEmbed {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Reaction summary attached to a message; reacting users are paged separately.
pub struct MessageReaction {
    /// Unicode reactions use the literal symbol; custom reactions use `name:id`.
    pub symbol: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Read-only message snapshot.
pub struct Message {
    pub id: u64,
    pub container_id: u64,
    pub author: MessageAuthor,
    pub content: String,
    pub embeds: Vec<MessageEmbed>,
    pub created_at: DateTime<Utc>,
    pub reactions: Vec<MessageReaction>,
    pub permalink: String,
}

impl Message {
    /// Content followed by every embed title and description, in check order.
    pub fn text_fragments(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.content.as_str()).chain(self.embeds.iter().flat_map(|embed| {
            embed
                .title
                .as_deref()
                .into_iter()
                .chain(embed.description.as_deref())
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Immutable summary of one qualifying, unacknowledged message.
pub struct MatchRecord {
    pub container_label: String,
    pub container_id: u64,
    pub message_id: u64,
    pub created_at_utc: DateTime<Utc>,
    pub permalink: String,
    pub preview: String,
}

impl MatchRecord {
    pub fn from_message(container: &Container, message: &Message) -> Self {
        let created_at_utc = message
            .created_at
            .duration_trunc(TimeDelta::minutes(1))
            .unwrap_or(message.created_at);
        Self {
            container_label: container.label(),
            container_id: container.id,
            message_id: message.id,
            created_at_utc,
            permalink: message.permalink.clone(),
            preview: build_preview(&message.content),
        }
    }
}

/// Collapses newlines, trims, and caps the preview at [`PREVIEW_MAX_CHARS`].
pub fn build_preview(content: &str) -> String {
    let collapsed = content.replace("\r\n", " ").replace(['\n', '\r'], " ");
    let preview: String = collapsed.trim().chars().take(PREVIEW_MAX_CHARS).collect();
    if preview.is_empty() {
        EMPTY_PREVIEW_PLACEHOLDER.to_string()
    } else {
        preview
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use proptest::prelude::*;

    use super::*;

    fn sample_message(content: &str) -> Message {
        Message {
            id: 9,
            container_id: 1,
            author: MessageAuthor {
                id: 5,
                automated: false,
            },
            content: content.to_string(),
            embeds: vec![MessageEmbed {
                title: Some("title".to_string()),
                description: None,
            }],
            created_at: Utc.with_ymd_and_hms(2025, 6, 5, 13, 7, 42).unwrap(),
            reactions: Vec::new(),
            permalink: "https://discord.com/channels/1/1/9".to_string(),
        }
    }

    #[test]
    fn unit_build_preview_collapses_newlines_and_trims() {
        assert_eq!(build_preview("  a\nb\r\nc  "), "a b c");
    }

    #[test]
    fn unit_build_preview_uses_placeholder_for_blank_content() {
        assert_eq!(build_preview(""), EMPTY_PREVIEW_PLACEHOLDER);
        assert_eq!(build_preview(" \n "), EMPTY_PREVIEW_PLACEHOLDER);
    }

    #[test]
    fn unit_match_record_truncates_timestamp_to_minute() {
        let container = Container {
            id: 1,
            name: "orders".to_string(),
            kind: ContainerKind::Channel,
            parent_id: None,
            category_id: None,
        };
        let record = MatchRecord::from_message(&container, &sample_message("📜 hi"));
        assert_eq!(record.container_label, "#orders");
        assert_eq!(
            record.created_at_utc,
            Utc.with_ymd_and_hms(2025, 6, 5, 13, 7, 0).unwrap()
        );
    }

    #[test]
    fn unit_text_fragments_lists_content_before_embeds() {
        let message = sample_message("body");
        let fragments: Vec<&str> = message.text_fragments().collect();
        assert_eq!(fragments, vec!["body", "title"]);
    }

    proptest! {
        #[test]
        fn property_preview_is_bounded_and_non_empty(content in any::<String>()) {
            let preview = build_preview(&content);
            prop_assert!(preview.chars().count() <= PREVIEW_MAX_CHARS);
            prop_assert!(!preview.is_empty());
            if content.trim().is_empty() {
                prop_assert_eq!(preview, EMPTY_PREVIEW_PLACEHOLDER);
            }
        }
    }
}
