//! Conversion of parsed arguments into the engine and adapter settings.

use std::collections::BTreeSet;

use chrono::TimeDelta;
use scrollwatch_core::{ConfigError, MarkerSpec, ScanConfig};
use scrollwatch_discord::{DiscordClientConfig, ReportDeliveryMode};

use crate::cli_args::Cli;

fn name_set(names: &[String]) -> BTreeSet<String> {
    names
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

impl Cli {
    /// Builds the immutable scan configuration, validated once.
    pub fn scan_config(&self) -> Result<ScanConfig, ConfigError> {
        let window_hours =
            i64::try_from(self.window_hours).map_err(|_| ConfigError::NonPositiveWindow)?;
        let window = TimeDelta::try_hours(window_hours).ok_or(ConfigError::NonPositiveWindow)?;
        ScanConfig {
            window,
            concurrency: self.concurrency,
            marker: MarkerSpec::new(Some(&self.scroll_emoji), self.scroll_custom_emoji_id)?,
            ack_symbol: self.check_emoji.trim().to_string(),
            acknowledgers: self.ack_user_ids.0.iter().copied().collect(),
            allow_channel_ids: self.allow_channel_ids.iter().copied().collect(),
            allow_category_ids: self.allow_category_ids.iter().copied().collect(),
            allow_channel_names: name_set(&self.allow_channel_names),
            exclude_channel_names: name_set(&self.exclude_channel_names),
            max_results: self.max_results,
            per_container_max_results: self.per_container_max,
            include_automated_authors: self.include_bots,
            delivery_phrase_strict: self.delivery_phrase_strict,
        }
        .validate()
    }

    pub fn discord_client_config(&self) -> DiscordClientConfig {
        DiscordClientConfig {
            api_base: self.discord_api_base.clone(),
            bot_token: self.discord_token.clone(),
            request_timeout_ms: self.request_timeout_ms,
            retry_max_attempts: self.retry_max_attempts,
            retry_base_delay_ms: self.retry_base_delay_ms,
        }
    }

    pub fn delivery_mode(&self) -> ReportDeliveryMode {
        if self.dry_run {
            ReportDeliveryMode::DryRun
        } else {
            ReportDeliveryMode::Provider
        }
    }
}
