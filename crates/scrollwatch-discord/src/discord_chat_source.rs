//! `ChatSource` backed by the Discord REST API for one guild.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use scrollwatch_core::{
    ArchiveVisibility, ArchivedThreadPage, ChatSource, GuildChannel, Message, SourceError,
    ThreadChannel,
};

use crate::discord_api_client::{percent_encode_path_segment, DiscordApiClient};
use crate::discord_wire::{
    parse_snowflake, DiscordChannel, DiscordMessage, DiscordThreadList, DiscordUser,
};

#[derive(Clone)]
pub struct DiscordChatSource {
    client: DiscordApiClient,
    guild_id: u64,
}

impl DiscordChatSource {
    pub fn new(client: DiscordApiClient, guild_id: u64) -> Self {
        Self { client, guild_id }
    }
}

/// `limit` plus an optional cursor, in the order Discord documents them.
fn page_query(
    cursor_key: &'static str,
    cursor: Option<String>,
    limit: usize,
) -> Vec<(&'static str, String)> {
    let mut query = Vec::with_capacity(2);
    if let Some(cursor) = cursor {
        query.push((cursor_key, cursor));
    }
    query.push(("limit", limit.to_string()));
    query
}

/// Archive timestamps carry microseconds; a coarser cursor would skip
/// threads archived earlier within the same second.
fn archive_cursor(before: DateTime<Utc>) -> String {
    before.to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[async_trait]
impl ChatSource for DiscordChatSource {
    async fn list_guild_channels(&self) -> Result<Vec<GuildChannel>, SourceError> {
        let channels: Vec<DiscordChannel> = self
            .client
            .get_json(
                "guild channels",
                &format!("guilds/{}/channels", self.guild_id),
                &[],
            )
            .await?;
        channels
            .into_iter()
            .filter(|channel| !channel.is_thread())
            .map(DiscordChannel::into_guild_channel)
            .collect()
    }

    async fn list_active_threads(&self) -> Result<Vec<ThreadChannel>, SourceError> {
        let listing: DiscordThreadList = self
            .client
            .get_json(
                "active threads",
                &format!("guilds/{}/threads/active", self.guild_id),
                &[],
            )
            .await?;
        listing
            .threads
            .into_iter()
            .map(DiscordChannel::into_thread_channel)
            .collect()
    }

    async fn list_archived_threads(
        &self,
        parent_id: u64,
        visibility: ArchiveVisibility,
        before: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<ArchivedThreadPage, SourceError> {
        let path = format!(
            "channels/{parent_id}/threads/archived/{}",
            visibility.as_str()
        );
        let query = page_query("before", before.map(archive_cursor), limit);
        let listing: DiscordThreadList = self
            .client
            .get_json(
                &format!("archived {} threads", visibility.as_str()),
                &path,
                &query,
            )
            .await?;
        let threads = listing
            .threads
            .into_iter()
            .map(DiscordChannel::into_thread_channel)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ArchivedThreadPage {
            threads,
            has_more: listing.has_more,
        })
    }

    async fn message_history_page(
        &self,
        container_id: u64,
        before: Option<u64>,
        limit: usize,
    ) -> Result<Vec<Message>, SourceError> {
        let path = format!("channels/{container_id}/messages");
        let query = page_query("before", before.map(|value| value.to_string()), limit);
        let messages: Vec<DiscordMessage> = self
            .client
            .get_json("message history", &path, &query)
            .await?;
        messages
            .into_iter()
            .map(|message| message.into_message(self.guild_id, container_id))
            .collect()
    }

    async fn reaction_users_page(
        &self,
        container_id: u64,
        message_id: u64,
        symbol: &str,
        after: Option<u64>,
        limit: usize,
    ) -> Result<Vec<u64>, SourceError> {
        let path = format!(
            "channels/{container_id}/messages/{message_id}/reactions/{}",
            percent_encode_path_segment(symbol)
        );
        let query = page_query("after", after.map(|value| value.to_string()), limit);
        let users: Vec<DiscordUser> = self
            .client
            .get_json("reaction users", &path, &query)
            .await?;
        users
            .iter()
            .map(|user| parse_snowflake(&user.id, "user.id"))
            .collect()
    }
}
