use clap::{ArgAction, Parser};

/// De-duplicated acknowledger ids in first-seen order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AckUserIds(pub Vec<u64>);

pub(crate) fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

pub(crate) fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

pub(crate) fn parse_snowflake_id(value: &str) -> Result<u64, String> {
    let trimmed = value.trim();
    trimmed
        .parse::<u64>()
        .map_err(|_| format!("id list contains a non-integer entry: '{trimmed}'"))
}

/// Comma list; blank entries are skipped, duplicates dropped, order kept.
pub(crate) fn parse_ack_user_ids(value: &str) -> Result<AckUserIds, String> {
    let mut ids = Vec::new();
    for part in value.split(',').map(str::trim).filter(|part| !part.is_empty()) {
        let id = part.parse::<u64>().map_err(|_| {
            format!("DISCORD_ACK_USER_IDS contains a non-integer entry: '{part}'")
        })?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    if ids.is_empty() {
        return Err("DISCORD_ACK_USER_IDS is empty; provide at least one user ID".to_string());
    }
    Ok(AckUserIds(ids))
}

#[derive(Debug, Parser)]
#[command(
    name = "scrollwatch",
    about = "Report unacknowledged scroll-marked messages in a Discord guild",
    version
)]
pub struct Cli {
    #[arg(long, env = "DISCORD_TOKEN", hide_env_values = true, help = "Discord bot token")]
    pub discord_token: String,

    #[arg(
        long,
        env = "DISCORD_GUILD_ID",
        value_parser = parse_snowflake_id,
        help = "Guild to scan"
    )]
    pub guild_id: u64,

    #[arg(
        long,
        env = "REPORT_CHANNEL_ID",
        value_parser = parse_snowflake_id,
        help = "Channel or thread that receives the report"
    )]
    pub report_channel_id: u64,

    #[arg(
        long,
        env = "DISCORD_ACK_USER_IDS",
        value_parser = parse_ack_user_ids,
        help = "Comma-separated user ids whose checkmark acknowledges a message"
    )]
    pub ack_user_ids: AckUserIds,

    #[arg(
        long,
        env = "WINDOW_HOURS",
        default_value_t = 24,
        value_parser = parse_positive_u64,
        help = "Scan window in hours"
    )]
    pub window_hours: u64,

    #[arg(
        long,
        env = "CONCURRENCY",
        default_value_t = 10,
        value_parser = parse_positive_usize,
        help = "Maximum containers scanned at once"
    )]
    pub concurrency: usize,

    #[arg(
        long,
        env = "MAX_RESULTS",
        default_value_t = 500,
        value_parser = parse_positive_usize,
        help = "Global cap on reported messages"
    )]
    pub max_results: usize,

    #[arg(
        long = "per-container-max",
        env = "PER_CONTAINER_MAX_RESULTS",
        value_parser = parse_positive_usize,
        help = "Cap on reported messages per channel or thread (defaults to the global cap)"
    )]
    pub per_container_max: Option<usize>,

    #[arg(long, env = "SCROLL_EMOJI", default_value = "📜", help = "Marker symbol")]
    pub scroll_emoji: String,

    #[arg(
        long,
        env = "SCROLL_CUSTOM_EMOJI_ID",
        value_parser = parse_snowflake_id,
        help = "Custom emoji id also accepted as the marker"
    )]
    pub scroll_custom_emoji_id: Option<u64>,

    #[arg(long, env = "CHECK_EMOJI", default_value = "✅", help = "Acknowledgement reaction")]
    pub check_emoji: String,

    #[arg(
        long,
        env = "ALLOW_CHANNEL_IDS",
        value_delimiter = ',',
        value_parser = parse_snowflake_id,
        help = "Only scan these channel ids (threads match through their parent)"
    )]
    pub allow_channel_ids: Vec<u64>,

    #[arg(
        long,
        env = "ALLOW_CATEGORY_IDS",
        value_delimiter = ',',
        value_parser = parse_snowflake_id,
        help = "Only scan channels under these category ids"
    )]
    pub allow_category_ids: Vec<u64>,

    #[arg(
        long,
        env = "ALLOW_CHANNEL_NAMES",
        value_delimiter = ',',
        help = "Only scan channels or threads with these names"
    )]
    pub allow_channel_names: Vec<String>,

    #[arg(
        long,
        env = "EXCLUDE_CHANNEL_NAMES",
        value_delimiter = ',',
        help = "Never scan channels or threads with these names"
    )]
    pub exclude_channel_names: Vec<String>,

    #[arg(
        long,
        env = "INCLUDE_BOTS",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help = "Treat messages from bots and webhooks as eligible"
    )]
    pub include_bots: bool,

    #[arg(
        long,
        env = "DELIVERY_PHRASE_STRICT",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help = "Require a '📜 delivery <mon> <day> <morning|evening>' phrase for today's slot"
    )]
    pub delivery_phrase_strict: bool,

    #[arg(
        long,
        env = "DRY_RUN",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help = "Print the report instead of posting it"
    )]
    pub dry_run: bool,

    #[arg(
        long,
        env = "DEBUG",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        help = "Enable verbose diagnostics"
    )]
    pub debug: bool,

    #[arg(
        long,
        env = "DISCORD_API_BASE",
        default_value = "https://discord.com/api/v10",
        help = "Discord REST API base URL"
    )]
    pub discord_api_base: String,

    #[arg(
        long,
        env = "REQUEST_TIMEOUT_MS",
        default_value_t = 10_000,
        value_parser = parse_positive_u64,
        help = "Per-request HTTP timeout in milliseconds"
    )]
    pub request_timeout_ms: u64,

    #[arg(
        long,
        env = "RETRY_MAX_ATTEMPTS",
        default_value_t = 3,
        value_parser = parse_positive_usize,
        help = "Attempts per request including the first"
    )]
    pub retry_max_attempts: usize,

    #[arg(
        long,
        env = "RETRY_BASE_DELAY_MS",
        default_value_t = 500,
        value_parser = parse_positive_u64,
        help = "Base delay for exponential retry backoff"
    )]
    pub retry_base_delay_ms: u64,
}
