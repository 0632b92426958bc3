//! Deterministic in-memory `ChatSource` used by tests and dry fixtures.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::chat_source::{ChatSource, SourceError};
use crate::scan_model::{
    ArchiveVisibility, ArchivedThreadPage, GuildChannel, GuildChannelKind, Message,
    ThreadChannel,
};

#[derive(Debug, Clone)]
struct HistoryFailure {
    pages_before_failure: usize,
    error: SourceError,
}

#[derive(Debug, Default)]
/// Fixture source; populate it before sharing it behind an `Arc`.
pub struct InMemoryChatSource {
    channels: Vec<GuildChannel>,
    active_threads: Vec<ThreadChannel>,
    archived_threads: Vec<(ThreadChannel, ArchiveVisibility)>,
    archived_failures: HashMap<(u64, ArchiveVisibility), SourceError>,
    channel_listing_failure: Option<SourceError>,
    messages: BTreeMap<u64, Vec<Message>>,
    reaction_users: HashMap<(u64, String), Vec<u64>>,
    history_failures: HashMap<u64, HistoryFailure>,
    archived_page_limit: Option<usize>,
    history_page_limit: Option<usize>,
    history_delay: Option<Duration>,
    container_history_delays: HashMap<u64, Duration>,
    history_calls: AtomicUsize,
    history_calls_by_container: std::sync::Mutex<HashMap<u64, usize>>,
    reaction_calls: AtomicUsize,
    in_flight_history: AtomicUsize,
    max_in_flight_history: AtomicUsize,
}

impl InMemoryChatSource {
    pub fn with_archived_page_limit(mut self, limit: usize) -> Self {
        self.archived_page_limit = Some(limit.max(1));
        self
    }

    pub fn with_history_page_limit(mut self, limit: usize) -> Self {
        self.history_page_limit = Some(limit.max(1));
        self
    }

    /// Delays every history fetch so concurrent scans overlap.
    pub fn with_history_delay(mut self, delay: Duration) -> Self {
        self.history_delay = Some(delay);
        self
    }

    /// Delays history fetches for one container only; overrides the shared delay.
    pub fn with_container_history_delay(mut self, container_id: u64, delay: Duration) -> Self {
        self.container_history_delays.insert(container_id, delay);
        self
    }

    pub fn add_channel(
        &mut self,
        id: u64,
        name: &str,
        kind: GuildChannelKind,
        category_id: Option<u64>,
        position: i64,
    ) {
        self.channels.push(GuildChannel {
            id,
            name: name.to_string(),
            kind,
            category_id,
            position,
        });
    }

    pub fn add_active_thread(&mut self, id: u64, name: &str, parent_id: u64) {
        self.active_threads.push(ThreadChannel {
            id,
            name: name.to_string(),
            parent_id,
            archive_timestamp: None,
        });
    }

    pub fn add_archived_thread(
        &mut self,
        id: u64,
        name: &str,
        parent_id: u64,
        visibility: ArchiveVisibility,
        archived_at: DateTime<Utc>,
    ) {
        self.archived_threads.push((
            ThreadChannel {
                id,
                name: name.to_string(),
                parent_id,
                archive_timestamp: Some(archived_at),
            },
            visibility,
        ));
    }

    pub fn fail_channel_listing(&mut self, error: SourceError) {
        self.channel_listing_failure = Some(error);
    }

    pub fn fail_archived_listing(
        &mut self,
        parent_id: u64,
        visibility: ArchiveVisibility,
        error: SourceError,
    ) {
        self.archived_failures.insert((parent_id, visibility), error);
    }

    /// Serves `pages_before_failure` history pages for the container, then fails.
    pub fn fail_history_after(
        &mut self,
        container_id: u64,
        pages_before_failure: usize,
        error: SourceError,
    ) {
        self.history_failures.insert(
            container_id,
            HistoryFailure {
                pages_before_failure,
                error,
            },
        );
    }

    pub fn add_message(&mut self, message: Message) {
        self.messages
            .entry(message.container_id)
            .or_default()
            .push(message);
    }

    pub fn set_reaction_users(&mut self, message_id: u64, symbol: &str, users: Vec<u64>) {
        self.reaction_users
            .insert((message_id, symbol.to_string()), users);
    }

    pub fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    pub fn history_calls_for(&self, container_id: u64) -> usize {
        self.history_calls_by_container
            .lock()
            .map(|calls| calls.get(&container_id).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn reaction_calls(&self) -> usize {
        self.reaction_calls.load(Ordering::SeqCst)
    }

    /// Highest number of history fetches observed in flight at once.
    pub fn max_in_flight_history(&self) -> usize {
        self.max_in_flight_history.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatSource for InMemoryChatSource {
    async fn list_guild_channels(&self) -> Result<Vec<GuildChannel>, SourceError> {
        if let Some(error) = &self.channel_listing_failure {
            return Err(error.clone());
        }
        Ok(self.channels.clone())
    }

    async fn list_active_threads(&self) -> Result<Vec<ThreadChannel>, SourceError> {
        Ok(self.active_threads.clone())
    }

    async fn list_archived_threads(
        &self,
        parent_id: u64,
        visibility: ArchiveVisibility,
        before: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<ArchivedThreadPage, SourceError> {
        if let Some(error) = self.archived_failures.get(&(parent_id, visibility)) {
            return Err(error.clone());
        }
        let mut threads: Vec<ThreadChannel> = self
            .archived_threads
            .iter()
            .filter(|(thread, thread_visibility)| {
                thread.parent_id == parent_id && *thread_visibility == visibility
            })
            .map(|(thread, _)| thread.clone())
            .filter(|thread| match (before, thread.archive_timestamp) {
                (Some(before), Some(archived_at)) => archived_at < before,
                _ => true,
            })
            .collect();
        threads.sort_by(|left, right| right.archive_timestamp.cmp(&left.archive_timestamp));
        let limit = self.archived_page_limit.map_or(limit, |cap| cap.min(limit));
        let has_more = threads.len() > limit;
        threads.truncate(limit);
        Ok(ArchivedThreadPage { threads, has_more })
    }

    async fn message_history_page(
        &self,
        container_id: u64,
        before: Option<u64>,
        limit: usize,
    ) -> Result<Vec<Message>, SourceError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        let served_pages = {
            let mut calls = self
                .history_calls_by_container
                .lock()
                .map_err(|_| SourceError::Transport("fixture lock poisoned".to_string()))?;
            let entry = calls.entry(container_id).or_insert(0);
            *entry += 1;
            *entry - 1
        };
        let in_flight = self.in_flight_history.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight_history
            .fetch_max(in_flight, Ordering::SeqCst);
        let delay = self
            .container_history_delays
            .get(&container_id)
            .copied()
            .or(self.history_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight_history.fetch_sub(1, Ordering::SeqCst);

        if let Some(failure) = self.history_failures.get(&container_id) {
            if served_pages >= failure.pages_before_failure {
                return Err(failure.error.clone());
            }
        }
        let mut page: Vec<Message> = self
            .messages
            .get(&container_id)
            .into_iter()
            .flatten()
            .filter(|message| before.map_or(true, |before| message.id < before))
            .cloned()
            .collect();
        page.sort_by(|left, right| right.id.cmp(&left.id));
        let limit = self.history_page_limit.map_or(limit, |cap| cap.min(limit));
        page.truncate(limit);
        Ok(page)
    }

    async fn reaction_users_page(
        &self,
        _container_id: u64,
        message_id: u64,
        symbol: &str,
        after: Option<u64>,
        limit: usize,
    ) -> Result<Vec<u64>, SourceError> {
        self.reaction_calls.fetch_add(1, Ordering::SeqCst);
        let mut users: Vec<u64> = self
            .reaction_users
            .get(&(message_id, symbol.to_string()))
            .into_iter()
            .flatten()
            .copied()
            .filter(|user_id| after.map_or(true, |after| *user_id > after))
            .collect();
        users.sort_unstable();
        users.truncate(limit);
        Ok(users)
    }
}
