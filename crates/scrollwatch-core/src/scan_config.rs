//! Immutable scan configuration shared by every engine component.

use std::collections::BTreeSet;

use chrono::TimeDelta;
use regex::Regex;
use thiserror::Error;

pub const DEFAULT_MARKER_SYMBOL: &str = "📜";
pub const DEFAULT_ACK_SYMBOL: &str = "✅";

#[derive(Debug, Error, PartialEq, Eq)]
/// Configuration problems that abort startup before any scan.
pub enum ConfigError {
    #[error("acknowledger set is empty; provide at least one user id")]
    EmptyAcknowledgers,
    #[error("concurrency limit must be greater than 0")]
    ZeroConcurrency,
    #[error("global result cap must be greater than 0")]
    ZeroResultCap,
    #[error("per-container result cap must be greater than 0")]
    ZeroPerContainerCap,
    #[error("time window must be positive")]
    NonPositiveWindow,
    #[error("marker definition needs a literal symbol or a custom emoji id")]
    EmptyMarker,
    #[error("acknowledgement symbol must not be empty")]
    EmptyAckSymbol,
    #[error("custom emoji id '{0}' must be numeric")]
    InvalidCustomEmojiId(String),
}

#[derive(Debug, Clone)]
/// Marker symbol definition: a literal string and/or a custom emoji id.
pub struct MarkerSpec {
    literal: Option<String>,
    custom_emoji_id: Option<u64>,
    custom_pattern: Option<Regex>,
}

impl MarkerSpec {
    pub fn new(literal: Option<&str>, custom_emoji_id: Option<u64>) -> Result<Self, ConfigError> {
        let literal = literal
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        if literal.is_none() && custom_emoji_id.is_none() {
            return Err(ConfigError::EmptyMarker);
        }
        let custom_pattern = match custom_emoji_id {
            Some(id) => Some(
                Regex::new(&format!(r"<a?:[A-Za-z0-9_~]+:{id}>"))
                    .map_err(|_| ConfigError::InvalidCustomEmojiId(id.to_string()))?,
            ),
            None => None,
        };
        Ok(Self {
            literal,
            custom_emoji_id,
            custom_pattern,
        })
    }

    pub fn literal(&self) -> Option<&str> {
        self.literal.as_deref()
    }

    pub fn custom_emoji_id(&self) -> Option<u64> {
        self.custom_emoji_id
    }

    /// Literal marker presence.
    pub fn literal_in(&self, text: &str) -> bool {
        match self.literal.as_deref() {
            Some(literal) => !text.is_empty() && text.contains(literal),
            None => false,
        }
    }

    /// Custom emoji reference (`<:name:id>` or `<a:name:id>`) presence.
    pub fn custom_reference_in(&self, text: &str) -> bool {
        self.custom_pattern
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(text))
    }
}

impl Default for MarkerSpec {
    fn default() -> Self {
        Self {
            literal: Some(DEFAULT_MARKER_SYMBOL.to_string()),
            custom_emoji_id: None,
            custom_pattern: None,
        }
    }
}

#[derive(Debug, Clone)]
/// Process-wide scan settings, validated once and then passed by reference.
pub struct ScanConfig {
    pub window: TimeDelta,
    pub concurrency: usize,
    pub marker: MarkerSpec,
    pub ack_symbol: String,
    pub acknowledgers: BTreeSet<u64>,
    pub allow_channel_ids: BTreeSet<u64>,
    pub allow_category_ids: BTreeSet<u64>,
    pub allow_channel_names: BTreeSet<String>,
    pub exclude_channel_names: BTreeSet<String>,
    pub max_results: usize,
    pub per_container_max_results: Option<usize>,
    pub include_automated_authors: bool,
    pub delivery_phrase_strict: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            window: TimeDelta::hours(24),
            concurrency: 10,
            marker: MarkerSpec::default(),
            ack_symbol: DEFAULT_ACK_SYMBOL.to_string(),
            acknowledgers: BTreeSet::new(),
            allow_channel_ids: BTreeSet::new(),
            allow_category_ids: BTreeSet::new(),
            allow_channel_names: BTreeSet::new(),
            exclude_channel_names: BTreeSet::new(),
            max_results: 500,
            per_container_max_results: None,
            include_automated_authors: false,
            delivery_phrase_strict: false,
        }
    }
}

impl ScanConfig {
    /// Fails fast on settings the engine cannot honor.
    pub fn validate(self) -> Result<Self, ConfigError> {
        if self.acknowledgers.is_empty() {
            return Err(ConfigError::EmptyAcknowledgers);
        }
        if self.concurrency == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        if self.max_results == 0 {
            return Err(ConfigError::ZeroResultCap);
        }
        if self.per_container_max_results == Some(0) {
            return Err(ConfigError::ZeroPerContainerCap);
        }
        if self.window <= TimeDelta::zero() {
            return Err(ConfigError::NonPositiveWindow);
        }
        if self.ack_symbol.trim().is_empty() {
            return Err(ConfigError::EmptyAckSymbol);
        }
        Ok(self)
    }

    pub fn has_allow_rules(&self) -> bool {
        !self.allow_channel_ids.is_empty()
            || !self.allow_category_ids.is_empty()
            || !self.allow_channel_names.is_empty()
    }

    /// Per-container ceiling; never exceeds the global cap.
    pub fn per_container_cap(&self) -> usize {
        self.per_container_max_results
            .unwrap_or(self.max_results)
            .min(self.max_results)
    }

    pub fn window_hours(&self) -> i64 {
        self.window.num_hours()
    }

    pub fn is_acknowledger(&self, user_id: u64) -> bool {
        self.acknowledgers.contains(&user_id)
    }
}
