//! Pre-scan checks: bot identity, target guild, and report channel.

use scrollwatch_core::SourceError;
use thiserror::Error;
use tracing::debug;

use crate::discord_api_client::DiscordApiClient;
use crate::discord_wire::{
    is_reportable_channel_type, parse_snowflake, DiscordChannel, DiscordGuild, DiscordUser,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Failed to authenticate bot: {0}")]
    Authentication(SourceError),
    #[error("Guild not found or bot not in guild.")]
    GuildUnavailable,
    #[error("Report channel not found or wrong type.")]
    ReportChannelUnavailable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTargets {
    pub bot_user_id: u64,
    pub guild_id: u64,
    pub guild_name: String,
    pub report_channel_id: u64,
}

pub async fn resolve_bot_user(client: &DiscordApiClient) -> Result<u64, ResolutionError> {
    let user: DiscordUser = client
        .get_json("users.me", "users/@me", &[])
        .await
        .map_err(ResolutionError::Authentication)?;
    parse_snowflake(&user.id, "user.id").map_err(ResolutionError::Authentication)
}

pub async fn resolve_guild(
    client: &DiscordApiClient,
    guild_id: u64,
) -> Result<DiscordGuild, ResolutionError> {
    match client
        .get_json::<DiscordGuild>("guild", &format!("guilds/{guild_id}"), &[])
        .await
    {
        Ok(guild) => Ok(guild),
        Err(error) => {
            debug!(guild_id, reason = error.reason_code(), "guild resolution failed");
            Err(ResolutionError::GuildUnavailable)
        }
    }
}

/// The report channel must exist, belong to the guild, and accept messages.
pub async fn resolve_report_channel(
    client: &DiscordApiClient,
    guild_id: u64,
    channel_id: u64,
) -> Result<u64, ResolutionError> {
    let channel = client
        .get_json::<DiscordChannel>(
            "report channel",
            &format!("channels/{channel_id}"),
            &[],
        )
        .await
        .map_err(|error| {
            debug!(channel_id, reason = error.reason_code(), "report channel lookup failed");
            ResolutionError::ReportChannelUnavailable
        })?;
    let in_guild = channel
        .guild_id
        .as_deref()
        .map_or(true, |raw| parse_snowflake(raw, "channel.guild_id") == Ok(guild_id));
    if !in_guild || !is_reportable_channel_type(channel.kind) {
        return Err(ResolutionError::ReportChannelUnavailable);
    }
    Ok(channel_id)
}

/// Authenticates, then resolves the guild and report channel in order.
pub async fn resolve_targets(
    client: &DiscordApiClient,
    guild_id: u64,
    report_channel_id: u64,
) -> Result<ResolvedTargets, ResolutionError> {
    let bot_user_id = resolve_bot_user(client).await?;
    let guild = resolve_guild(client, guild_id).await?;
    let report_channel_id = resolve_report_channel(client, guild_id, report_channel_id).await?;
    Ok(ResolvedTargets {
        bot_user_id,
        guild_id,
        guild_name: guild.name.unwrap_or_default(),
        report_channel_id,
    })
}
