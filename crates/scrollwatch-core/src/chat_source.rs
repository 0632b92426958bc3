//! Platform seam used by the enumerator, classifier, and orchestrator.

use async_trait::async_trait;
use thiserror::Error;

use crate::scan_model::{
    ArchiveVisibility, ArchivedThreadPage, GuildChannel, Message, ThreadChannel,
};

/// Page size requested for message history and reaction-user listings.
pub const HISTORY_PAGE_LIMIT: usize = 100;
pub const ARCHIVED_THREAD_PAGE_LIMIT: usize = 100;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
/// Failures surfaced by a chat platform source.
pub enum SourceError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("api request failed with status {status}: {detail}")]
    Api { status: u16, detail: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl SourceError {
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::PermissionDenied(_) => "permission_denied",
            Self::NotFound(_) => "not_found",
            Self::RateLimited(_) => "rate_limited",
            Self::Transport(_) => "transport_error",
            Self::Api { .. } => "api_error",
            Self::Decode(_) => "decode_error",
        }
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied(_))
    }
}

/// Read access to one guild's containers, history, and reactions.
///
/// Message pages are newest-first; `before` is an exclusive message-id
/// cursor. Reaction-user pages are ascending by user id; `after` is an
/// exclusive user-id cursor.
#[async_trait]
pub trait ChatSource: Send + Sync {
    async fn list_guild_channels(&self) -> Result<Vec<GuildChannel>, SourceError>;

    async fn list_active_threads(&self) -> Result<Vec<ThreadChannel>, SourceError>;

    async fn list_archived_threads(
        &self,
        parent_id: u64,
        visibility: ArchiveVisibility,
        before: Option<chrono::DateTime<chrono::Utc>>,
        limit: usize,
    ) -> Result<ArchivedThreadPage, SourceError>;

    async fn message_history_page(
        &self,
        container_id: u64,
        before: Option<u64>,
        limit: usize,
    ) -> Result<Vec<Message>, SourceError>;

    async fn reaction_users_page(
        &self,
        container_id: u64,
        message_id: u64,
        symbol: &str,
        after: Option<u64>,
        limit: usize,
    ) -> Result<Vec<u64>, SourceError>;
}
