//! Discord REST adapter for the scrollwatch scan engine.
//!
//! Provides the retrying API client, wire payload normalization, the
//! `ChatSource` implementation, pre-scan target resolution, and report
//! delivery.

pub mod discord_api_client;
pub mod discord_chat_source;
pub mod discord_resolution;
pub mod discord_wire;
pub mod report_delivery;

pub use discord_api_client::{DiscordApiClient, DiscordClientConfig, DEFAULT_DISCORD_API_BASE};
pub use discord_chat_source::DiscordChatSource;
pub use discord_resolution::{resolve_targets, ResolutionError, ResolvedTargets};
pub use report_delivery::{ReportDeliveryMode, ReportDeliveryReceipt, ReportPublisher};
