//! Discord REST payload shapes and their conversion into the scan model.

use chrono::{DateTime, Utc};
use scrollwatch_core::{
    GuildChannel, GuildChannelKind, Message, MessageAuthor, MessageEmbed, MessageReaction,
    SourceError, ThreadChannel,
};
use serde::Deserialize;

pub const CHANNEL_TYPE_GUILD_TEXT: u8 = 0;
pub const CHANNEL_TYPE_GUILD_ANNOUNCEMENT: u8 = 5;
pub const CHANNEL_TYPE_ANNOUNCEMENT_THREAD: u8 = 10;
pub const CHANNEL_TYPE_PUBLIC_THREAD: u8 = 11;
pub const CHANNEL_TYPE_PRIVATE_THREAD: u8 = 12;
pub const CHANNEL_TYPE_GUILD_FORUM: u8 = 15;
pub const CHANNEL_TYPE_GUILD_MEDIA: u8 = 16;

pub fn permalink(guild_id: u64, channel_id: u64, message_id: u64) -> String {
    format!("https://discord.com/channels/{guild_id}/{channel_id}/{message_id}")
}

pub fn parse_snowflake(raw: &str, field: &str) -> Result<u64, SourceError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| SourceError::Decode(format!("invalid snowflake for {field}: '{raw}'")))
}

fn parse_timestamp(raw: &str, field: &str) -> Result<DateTime<Utc>, SourceError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|value| value.with_timezone(&Utc))
        .map_err(|error| SourceError::Decode(format!("invalid timestamp for {field}: {error}")))
}

/// Text, announcement, and thread channels can receive the report.
pub fn is_reportable_channel_type(kind: u8) -> bool {
    matches!(
        kind,
        CHANNEL_TYPE_GUILD_TEXT
            | CHANNEL_TYPE_GUILD_ANNOUNCEMENT
            | CHANNEL_TYPE_ANNOUNCEMENT_THREAD
            | CHANNEL_TYPE_PUBLIC_THREAD
            | CHANNEL_TYPE_PRIVATE_THREAD
    )
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordUser {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub bot: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordGuild {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscordThreadMetadata {
    #[serde(default)]
    pub archive_timestamp: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordChannel {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub guild_id: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub position: Option<i64>,
    #[serde(default)]
    pub thread_metadata: Option<DiscordThreadMetadata>,
}

impl DiscordChannel {
    pub fn guild_channel_kind(&self) -> GuildChannelKind {
        match self.kind {
            CHANNEL_TYPE_GUILD_TEXT | CHANNEL_TYPE_GUILD_ANNOUNCEMENT => GuildChannelKind::Text,
            CHANNEL_TYPE_GUILD_FORUM | CHANNEL_TYPE_GUILD_MEDIA => GuildChannelKind::Forum,
            _ => GuildChannelKind::Other,
        }
    }

    pub fn is_thread(&self) -> bool {
        matches!(
            self.kind,
            CHANNEL_TYPE_ANNOUNCEMENT_THREAD
                | CHANNEL_TYPE_PUBLIC_THREAD
                | CHANNEL_TYPE_PRIVATE_THREAD
        )
    }

    /// Guild channels carry their category in `parent_id`.
    pub fn into_guild_channel(self) -> Result<GuildChannel, SourceError> {
        let kind = self.guild_channel_kind();
        Ok(GuildChannel {
            id: parse_snowflake(&self.id, "channel.id")?,
            name: self.name.unwrap_or_default(),
            kind,
            category_id: self
                .parent_id
                .as_deref()
                .map(|raw| parse_snowflake(raw, "channel.parent_id"))
                .transpose()?,
            position: self.position.unwrap_or_default(),
        })
    }

    /// Threads carry their parent channel in `parent_id`.
    pub fn into_thread_channel(self) -> Result<ThreadChannel, SourceError> {
        let parent_raw = self.parent_id.as_deref().ok_or_else(|| {
            SourceError::Decode(format!("thread {} is missing parent_id", self.id))
        })?;
        let archive_timestamp = self
            .thread_metadata
            .as_ref()
            .and_then(|metadata| metadata.archive_timestamp.as_deref())
            .map(|raw| parse_timestamp(raw, "thread_metadata.archive_timestamp"))
            .transpose()?;
        Ok(ThreadChannel {
            id: parse_snowflake(&self.id, "thread.id")?,
            name: self.name.clone().unwrap_or_default(),
            parent_id: parse_snowflake(parent_raw, "thread.parent_id")?,
            archive_timestamp,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordThreadList {
    #[serde(default)]
    pub threads: Vec<DiscordChannel>,
    #[serde(default)]
    pub has_more: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordEmbed {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordEmoji {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

impl DiscordEmoji {
    /// Unicode emoji keep their literal; custom emoji become `name:id`.
    pub fn symbol(&self) -> String {
        let name = self.name.clone().unwrap_or_default();
        match &self.id {
            Some(id) => format!("{name}:{id}"),
            None => name,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordReaction {
    #[serde(default)]
    pub count: u64,
    pub emoji: DiscordEmoji,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscordMessage {
    pub id: String,
    pub author: DiscordUser,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub embeds: Vec<DiscordEmbed>,
    pub timestamp: String,
    #[serde(default)]
    pub reactions: Vec<DiscordReaction>,
}

impl DiscordMessage {
    pub fn into_message(self, guild_id: u64, container_id: u64) -> Result<Message, SourceError> {
        let id = parse_snowflake(&self.id, "message.id")?;
        Ok(Message {
            id,
            container_id,
            author: MessageAuthor {
                id: parse_snowflake(&self.author.id, "message.author.id")?,
                automated: self.author.bot.unwrap_or(false),
            },
            content: self.content,
            embeds: self
                .embeds
                .into_iter()
                .map(|embed| MessageEmbed {
                    title: embed.title,
                    description: embed.description,
                })
                .collect(),
            created_at: parse_timestamp(&self.timestamp, "message.timestamp")?,
            reactions: self
                .reactions
                .into_iter()
                .map(|reaction| MessageReaction {
                    symbol: reaction.emoji.symbol(),
                    count: reaction.count,
                })
                .collect(),
            permalink: permalink(guild_id, container_id, id),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn unit_message_payload_normalizes_into_model() {
        let raw: DiscordMessage = serde_json::from_value(json!({
            "id": "300",
            "channel_id": "20",
            "author": { "id": "7", "username": "courier", "bot": true },
            "content": "📜 pickup",
            "embeds": [{ "title": "Order", "description": "📜 ready" }],
            "timestamp": "2025-06-05T13:04:59.120000+00:00",
            "reactions": [
                { "count": 2, "emoji": { "id": null, "name": "✅" } },
                { "count": 1, "emoji": { "id": "777", "name": "scroll" } }
            ]
        }))
        .expect("decode");

        let message = raw.into_message(9, 20).expect("message");
        assert_eq!(message.id, 300);
        assert!(message.author.automated);
        assert_eq!(message.embeds[0].description.as_deref(), Some("📜 ready"));
        assert_eq!(
            message.created_at,
            Utc.with_ymd_and_hms(2025, 6, 5, 13, 4, 59).unwrap()
                + chrono::TimeDelta::milliseconds(120)
        );
        assert_eq!(message.reactions[0].symbol, "✅");
        assert_eq!(message.reactions[1].symbol, "scroll:777");
        assert_eq!(message.permalink, "https://discord.com/channels/9/20/300");
    }

    #[test]
    fn unit_channel_types_map_to_scannable_kinds() {
        let channel = |kind: u8| DiscordChannel {
            id: "1".to_string(),
            kind,
            name: Some("orders".to_string()),
            guild_id: None,
            parent_id: Some("50".to_string()),
            position: Some(3),
            thread_metadata: None,
        };
        assert_eq!(channel(0).guild_channel_kind(), GuildChannelKind::Text);
        assert_eq!(channel(5).guild_channel_kind(), GuildChannelKind::Text);
        assert_eq!(channel(15).guild_channel_kind(), GuildChannelKind::Forum);
        assert_eq!(channel(2).guild_channel_kind(), GuildChannelKind::Other);
        assert!(channel(11).is_thread());
        let guild_channel = channel(0).into_guild_channel().expect("channel");
        assert_eq!(guild_channel.category_id, Some(50));
        assert_eq!(guild_channel.position, 3);
    }

    #[test]
    fn unit_thread_payload_carries_archive_timestamp() {
        let raw: DiscordChannel = serde_json::from_value(json!({
            "id": "41",
            "type": 11,
            "name": "june orders",
            "parent_id": "20",
            "thread_metadata": {
                "archived": true,
                "archive_timestamp": "2025-06-04T10:00:00+00:00"
            }
        }))
        .expect("decode");
        let thread = raw.into_thread_channel().expect("thread");
        assert_eq!(thread.parent_id, 20);
        assert_eq!(
            thread.archive_timestamp,
            Some(Utc.with_ymd_and_hms(2025, 6, 4, 10, 0, 0).unwrap())
        );
    }

    #[test]
    fn regression_non_numeric_snowflake_is_decode_error() {
        let error = parse_snowflake("abc", "channel.id").expect_err("invalid");
        assert_eq!(error.reason_code(), "decode_error");
    }

    #[test]
    fn unit_reportable_channel_types() {
        assert!(is_reportable_channel_type(0));
        assert!(is_reportable_channel_type(11));
        assert!(!is_reportable_channel_type(15));
        assert!(!is_reportable_channel_type(2));
    }
}
