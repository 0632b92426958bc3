//! Bounded-concurrency scan over enumerated containers.
//!
//! Each container scan holds one semaphore permit from its first history
//! fetch until it finishes, walks history newest-first inside the window up
//! to its own cap, and hands back its outcome through the join set. Outcomes
//! are flattened in enumeration order and truncated to the global cap, so the
//! result set does not depend on which scan finishes first.
//!
//! Once a single container reaches the global cap by itself, nothing
//! enumerated after it can survive truncation, and no further scans start.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::chat_source::{ChatSource, SourceError, HISTORY_PAGE_LIMIT};
use crate::container_enumerator::ContainerEnumerator;
use crate::message_classifier::MessageClassifier;
use crate::scan_config::ScanConfig;
use crate::scan_model::{Container, MatchRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
/// How one container scan ended.
pub enum ContainerScanStatus {
    Complete,
    CapReached,
    Failed(SourceError),
}

impl ContainerScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::CapReached => "cap_reached",
            Self::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone)]
/// Partial or complete contribution of one container.
pub struct ContainerScanOutcome {
    pub container: Container,
    pub matches: Vec<MatchRecord>,
    pub messages_visited: usize,
    pub status: ContainerScanStatus,
}

#[derive(Debug, Clone, Default, Serialize)]
/// Aggregated result of one run.
pub struct ScanReport {
    pub records: Vec<MatchRecord>,
    pub containers_scanned: usize,
    pub containers_failed: usize,
    pub messages_visited: usize,
    pub matches_found: usize,
    pub cap_reached: bool,
}

/// Drives container scans for one run.
pub struct ScanOrchestrator<S: ChatSource + ?Sized + 'static> {
    source: Arc<S>,
    config: Arc<ScanConfig>,
    classifier: Arc<MessageClassifier>,
}

impl<S: ChatSource + ?Sized + 'static> ScanOrchestrator<S> {
    pub fn new(source: Arc<S>, config: Arc<ScanConfig>) -> Self {
        let classifier = Arc::new(MessageClassifier::new(config.clone()));
        Self {
            source,
            config,
            classifier,
        }
    }

    /// Enumerates the guild and scans it; only channel listing is fatal.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<ScanReport, SourceError> {
        let window_start = now - self.config.window;
        let enumerator =
            ContainerEnumerator::start(self.source.clone(), self.config.clone(), window_start)
                .await?;
        Ok(self.scan(enumerator, now).await)
    }

    /// Scans every container the enumerator yields, up to the global cap.
    pub async fn scan(
        &self,
        mut enumerator: ContainerEnumerator<S>,
        now: DateTime<Utc>,
    ) -> ScanReport {
        let since = now - self.config.window;
        let cap = self.config.max_results;
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency));
        let global_cap_hit = Arc::new(AtomicBool::new(false));
        let mut scans = JoinSet::new();
        let mut launched = 0_usize;

        loop {
            let Ok(permit) = semaphore.clone().acquire_owned().await else {
                break;
            };
            if global_cap_hit.load(Ordering::SeqCst) {
                tracing::debug!(launched, "global cap reached; no further container scans");
                break;
            }
            let Some(container) = enumerator.next_container().await else {
                break;
            };
            let index = launched;
            launched += 1;
            let source = self.source.clone();
            let config = self.config.clone();
            let classifier = self.classifier.clone();
            let global_cap_hit = global_cap_hit.clone();
            scans.spawn(async move {
                let outcome = scan_container(
                    source.as_ref(),
                    &config,
                    &classifier,
                    container,
                    since,
                    now,
                )
                .await;
                if outcome.matches.len() >= config.max_results {
                    global_cap_hit.store(true, Ordering::SeqCst);
                }
                drop(permit);
                (index, outcome)
            });
        }

        let mut outcomes = BTreeMap::new();
        let mut report = ScanReport::default();
        while let Some(joined) = scans.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    outcomes.insert(index, outcome);
                }
                Err(error) => {
                    report.containers_failed += 1;
                    tracing::warn!(error = %error, "container scan task aborted");
                }
            }
        }

        let mut seen_messages = HashSet::new();
        for outcome in outcomes.into_values() {
            report.containers_scanned += 1;
            report.messages_visited += outcome.messages_visited;
            if let ContainerScanStatus::Failed(error) = &outcome.status {
                report.containers_failed += 1;
                tracing::debug!(
                    container_id = outcome.container.id,
                    container_name = %outcome.container.name,
                    reason_code = error.reason_code(),
                    error = %error,
                    kept_matches = outcome.matches.len(),
                    "container scan failed; keeping partial results"
                );
            }
            for record in outcome.matches {
                if seen_messages.insert(record.message_id) {
                    report.records.push(record);
                }
            }
        }
        report.matches_found = report.records.len();
        report.cap_reached = report.matches_found >= cap;
        report.records.truncate(cap);
        tracing::debug!(
            containers_scanned = report.containers_scanned,
            containers_failed = report.containers_failed,
            messages_visited = report.messages_visited,
            matches_found = report.matches_found,
            returned = report.records.len(),
            "scan complete"
        );
        report
    }
}

async fn scan_container<S: ChatSource + ?Sized>(
    source: &S,
    config: &ScanConfig,
    classifier: &MessageClassifier,
    container: Container,
    since: DateTime<Utc>,
    now: DateTime<Utc>,
) -> ContainerScanOutcome {
    let per_container_cap = config.per_container_cap();
    let mut matches = Vec::new();
    let mut messages_visited = 0_usize;
    let mut before = None;
    tracing::debug!(
        container_id = container.id,
        container_name = %container.name,
        kind = container.kind.as_str(),
        "container scan started"
    );

    let status = 'walk: loop {
        let page = match source
            .message_history_page(container.id, before, HISTORY_PAGE_LIMIT)
            .await
        {
            Ok(page) => page,
            Err(error) => break 'walk ContainerScanStatus::Failed(error),
        };
        if page.is_empty() {
            break 'walk ContainerScanStatus::Complete;
        }
        for message in &page {
            if message.created_at <= since {
                break 'walk ContainerScanStatus::Complete;
            }
            messages_visited += 1;
            let decision = match classifier.classify(source, message, now).await {
                Ok(decision) => decision,
                Err(error) => break 'walk ContainerScanStatus::Failed(error),
            };
            tracing::debug!(
                container_id = container.id,
                message_id = message.id,
                decision = decision.as_str(),
                "message classified"
            );
            if decision.is_accept() {
                matches.push(MatchRecord::from_message(&container, message));
                if matches.len() >= per_container_cap {
                    break 'walk ContainerScanStatus::CapReached;
                }
            }
        }
        before = page.last().map(|message| message.id);
    };

    tracing::debug!(
        container_id = container.id,
        status = status.as_str(),
        messages_visited,
        matches = matches.len(),
        "container scan finished"
    );
    ContainerScanOutcome {
        container,
        matches,
        messages_visited,
        status,
    }
}
