//! Lazy, deterministic enumeration of the containers a run scans.
//!
//! Standing channels and active threads are listed up front (one call each).
//! Archived-thread listings are fetched page by page only when the consumer
//! pulls past the containers already queued, so callers that stop early never
//! pay for listings they do not need.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::chat_source::{ChatSource, SourceError, ARCHIVED_THREAD_PAGE_LIMIT};
use crate::container_filter::container_passes;
use crate::scan_config::ScanConfig;
use crate::scan_model::{
    ArchiveVisibility, Container, ContainerKind, GuildChannel, GuildChannelKind, ThreadChannel,
};

#[derive(Debug, Clone, Copy)]
struct ParentContext {
    id: u64,
    category_id: Option<u64>,
    forum: bool,
}

#[derive(Debug, Clone)]
enum EnumerationStep {
    Emit(Container),
    ArchivedPage {
        parent: ParentContext,
        visibility: ArchiveVisibility,
        before: Option<DateTime<Utc>>,
    },
}

/// Pull-based container sequence for one run; not restartable.
pub struct ContainerEnumerator<S: ChatSource + ?Sized> {
    source: Arc<S>,
    config: Arc<ScanConfig>,
    window_start: DateTime<Utc>,
    pending: VecDeque<EnumerationStep>,
    seen: HashSet<u64>,
}

impl<S: ChatSource + ?Sized> ContainerEnumerator<S> {
    /// Lists standing channels and active threads and queues the traversal.
    ///
    /// A channel-listing failure is fatal; an active-thread listing failure
    /// is logged and the run continues with archived threads only.
    pub async fn start(
        source: Arc<S>,
        config: Arc<ScanConfig>,
        window_start: DateTime<Utc>,
    ) -> Result<Self, SourceError> {
        let mut channels = source.list_guild_channels().await?;
        channels.sort_by_key(|channel| (channel.position, channel.id));

        let active_threads = match source.list_active_threads().await {
            Ok(threads) => threads,
            Err(error) => {
                tracing::warn!(
                    reason_code = error.reason_code(),
                    error = %error,
                    "active thread listing failed; continuing without active threads"
                );
                Vec::new()
            }
        };
        let mut threads_by_parent: BTreeMap<u64, Vec<ThreadChannel>> = BTreeMap::new();
        for thread in active_threads {
            threads_by_parent
                .entry(thread.parent_id)
                .or_default()
                .push(thread);
        }
        for threads in threads_by_parent.values_mut() {
            threads.sort_by_key(|thread| thread.id);
        }

        let mut pending = VecDeque::new();
        for forum in [false, true] {
            let wanted = if forum {
                GuildChannelKind::Forum
            } else {
                GuildChannelKind::Text
            };
            for channel in channels.iter().filter(|channel| channel.kind == wanted) {
                queue_channel_steps(&mut pending, channel, &threads_by_parent, forum);
            }
        }
        tracing::debug!(
            channels = channels.len(),
            queued_steps = pending.len(),
            "container enumeration planned"
        );

        Ok(Self {
            source,
            config,
            window_start,
            pending,
            seen: HashSet::new(),
        })
    }

    /// Returns the next container that passes the filter, or `None` when done.
    pub async fn next_container(&mut self) -> Option<Container> {
        while let Some(step) = self.pending.pop_front() {
            match step {
                EnumerationStep::Emit(container) => {
                    if !self.seen.insert(container.id) {
                        continue;
                    }
                    if container_passes(&container, &self.config) {
                        return Some(container);
                    }
                    tracing::debug!(
                        container_id = container.id,
                        container_name = %container.name,
                        kind = container.kind.as_str(),
                        "container skipped by filter"
                    );
                }
                EnumerationStep::ArchivedPage {
                    parent,
                    visibility,
                    before,
                } => self.expand_archived_page(parent, visibility, before).await,
            }
        }
        None
    }

    async fn expand_archived_page(
        &mut self,
        parent: ParentContext,
        visibility: ArchiveVisibility,
        before: Option<DateTime<Utc>>,
    ) {
        let page = match self
            .source
            .list_archived_threads(parent.id, visibility, before, ARCHIVED_THREAD_PAGE_LIMIT)
            .await
        {
            Ok(page) => page,
            Err(error) => {
                if visibility == ArchiveVisibility::Private && error.is_permission_denied() {
                    tracing::debug!(
                        parent_id = parent.id,
                        "private archived threads not readable; skipping"
                    );
                } else {
                    tracing::warn!(
                        parent_id = parent.id,
                        visibility = visibility.as_str(),
                        reason_code = error.reason_code(),
                        error = %error,
                        "archived thread listing failed; skipping"
                    );
                }
                return;
            }
        };

        let kind = if parent.forum {
            ContainerKind::ForumThread
        } else if visibility == ArchiveVisibility::Private {
            ContainerKind::ArchivedPrivateThread
        } else {
            ContainerKind::ArchivedPublicThread
        };
        let mut steps = Vec::with_capacity(page.threads.len() + 1);
        let mut oldest_archive: Option<DateTime<Utc>> = None;
        let mut reached_window_start = false;
        for thread in page.threads {
            if let Some(archived_at) = thread.archive_timestamp {
                oldest_archive =
                    Some(oldest_archive.map_or(archived_at, |oldest| oldest.min(archived_at)));
                // Posting unarchives a thread; one archived before the window holds nothing newer.
                if archived_at < self.window_start {
                    reached_window_start = true;
                    continue;
                }
            }
            steps.push(EnumerationStep::Emit(thread_container(
                &thread,
                kind,
                parent.category_id,
            )));
        }
        if page.has_more && !reached_window_start {
            if let Some(cursor) = oldest_archive {
                steps.push(EnumerationStep::ArchivedPage {
                    parent,
                    visibility,
                    before: Some(cursor),
                });
            }
        }
        for step in steps.into_iter().rev() {
            self.pending.push_front(step);
        }
    }
}

fn queue_channel_steps(
    pending: &mut VecDeque<EnumerationStep>,
    channel: &GuildChannel,
    threads_by_parent: &BTreeMap<u64, Vec<ThreadChannel>>,
    forum: bool,
) {
    if !forum {
        pending.push_back(EnumerationStep::Emit(Container {
            id: channel.id,
            name: channel.name.clone(),
            kind: ContainerKind::Channel,
            parent_id: None,
            category_id: channel.category_id,
        }));
    }
    let active_kind = if forum {
        ContainerKind::ForumThread
    } else {
        ContainerKind::ActiveThread
    };
    for thread in threads_by_parent.get(&channel.id).into_iter().flatten() {
        pending.push_back(EnumerationStep::Emit(thread_container(
            thread,
            active_kind,
            channel.category_id,
        )));
    }
    let parent = ParentContext {
        id: channel.id,
        category_id: channel.category_id,
        forum,
    };
    for visibility in [ArchiveVisibility::Public, ArchiveVisibility::Private] {
        pending.push_back(EnumerationStep::ArchivedPage {
            parent,
            visibility,
            before: None,
        });
    }
}

fn thread_container(
    thread: &ThreadChannel,
    kind: ContainerKind,
    parent_category_id: Option<u64>,
) -> Container {
    Container {
        id: thread.id,
        name: thread.name.clone(),
        kind,
        parent_id: Some(thread.parent_id),
        category_id: parent_category_id,
    }
}
