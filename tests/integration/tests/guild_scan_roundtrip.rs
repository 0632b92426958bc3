use std::{
    collections::BTreeSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use httpmock::prelude::*;
use scrollwatch_core::{
    ArchiveVisibility, ArchivedThreadPage, ChatSource, GuildChannel,
    GuildChannelKind, InMemoryChatSource, MarkerSpec, Message, MessageAuthor, MessageReaction,
    ScanConfig, ScanOrchestrator, SourceError, ThreadChannel,
};
use scrollwatch_discord::{
    DiscordApiClient, DiscordChatSource, DiscordClientConfig, ReportDeliveryMode, ReportPublisher,
};
use serde_json::{json, Value};

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 5, 15, 0, 0).unwrap()
}

fn client(server: &MockServer) -> DiscordApiClient {
    DiscordApiClient::new(&DiscordClientConfig {
        api_base: server.base_url(),
        bot_token: "token".to_string(),
        retry_max_attempts: 1,
        retry_base_delay_ms: 1,
        ..DiscordClientConfig::default()
    })
    .expect("client")
}

fn wire_message(id: &str, content: &str, timestamp: &str) -> Value {
    json!({
        "id": id,
        "author": { "id": "7" },
        "content": content,
        "timestamp": timestamp,
    })
}

const OLD: &str = "2025-06-03T09:00:00+00:00";

fn mock_history(server: &MockServer, channel_id: u64, messages: Vec<Value>) {
    server.mock(|when, then| {
        when.method(GET)
            .path(format!("/channels/{channel_id}/messages"));
        then.status(200).json_body(Value::Array(messages));
    });
}

fn mock_empty_archives(server: &MockServer, channel_id: u64, visibilities: &[&str]) {
    for visibility in visibilities {
        server.mock(|when, then| {
            when.method(GET)
                .path(format!("/channels/{channel_id}/threads/archived/{visibility}"));
            then.status(200)
                .json_body(json!({ "threads": [], "has_more": false }));
        });
    }
}

#[tokio::test]
async fn integration_guild_scan_over_discord_api_posts_report() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/guilds/9/channels");
        then.status(200).json_body(json!([
            { "id": "50", "type": 4, "name": "Orders", "position": 0 },
            { "id": "20", "type": 0, "name": "orders", "parent_id": "50", "position": 1 },
            { "id": "21", "type": 0, "name": "staff", "position": 2 },
            { "id": "30", "type": 15, "name": "requests", "position": 3 },
            { "id": "22", "type": 0, "name": "private-ops", "position": 4 }
        ]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/guilds/9/threads/active");
        then.status(200).json_body(json!({
            "threads": [
                { "id": "40", "type": 11, "name": "order-40", "parent_id": "20" },
                { "id": "45", "type": 11, "name": "cake-request", "parent_id": "30" }
            ]
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/channels/20/threads/archived/public");
        then.status(200).json_body(json!({
            "threads": [{
                "id": "41",
                "type": 11,
                "name": "june-archive",
                "parent_id": "20",
                "thread_metadata": {
                    "archived": true,
                    "archive_timestamp": "2025-06-05T10:00:00+00:00"
                }
            }],
            "has_more": false
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/channels/20/threads/archived/private");
        then.status(403).json_body(json!({ "message": "Missing Access" }));
    });
    mock_empty_archives(&server, 21, &["public", "private"]);
    mock_empty_archives(&server, 22, &["public", "private"]);
    mock_empty_archives(&server, 30, &["public", "private"]);

    mock_history(
        &server,
        20,
        vec![
            wire_message("2001", "📜 two dozen bagels", "2025-06-05T13:04:10+00:00"),
            json!({
                "id": "1999",
                "author": { "id": "8", "bot": true },
                "content": "📜 automated reminder",
                "timestamp": "2025-06-05T12:00:00+00:00"
            }),
            wire_message("1990", "📜 stale", OLD),
        ],
    );
    mock_history(
        &server,
        40,
        vec![
            wire_message("4001", "no marker here", "2025-06-05T12:30:00+00:00"),
            wire_message("4000", "📜 thread order", "2025-06-05T11:00:00+00:00"),
            wire_message("3999", "📜 stale", OLD),
        ],
    );
    mock_history(
        &server,
        41,
        vec![
            wire_message("4101", "📜 archived order", "2025-06-05T09:30:00+00:00"),
            wire_message("4100", "📜 stale", OLD),
        ],
    );
    mock_history(
        &server,
        45,
        vec![
            wire_message("4501", "<:scroll:777> custom cake", "2025-06-05T08:00:00+00:00"),
            wire_message("4500", "📜 stale", OLD),
        ],
    );
    let excluded = server.mock(|when, then| {
        when.method(GET).path("/channels/21/messages");
        then.status(200).json_body(json!([wire_message(
            "2101",
            "📜 staff only",
            "2025-06-05T13:00:00+00:00"
        )]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/channels/22/messages");
        then.status(403).json_body(json!({ "message": "Missing Access" }));
    });

    let config = ScanConfig {
        acknowledgers: BTreeSet::from([111]),
        exclude_channel_names: BTreeSet::from(["staff".to_string()]),
        marker: MarkerSpec::new(Some("📜"), Some(777)).expect("marker"),
        concurrency: 3,
        ..ScanConfig::default()
    }
    .validate()
    .expect("config");

    let source = Arc::new(DiscordChatSource::new(client(&server), 9));
    let report = ScanOrchestrator::new(source, Arc::new(config))
        .run(now())
        .await
        .expect("scan");

    excluded.assert_hits(0);
    let ids: Vec<u64> = report.records.iter().map(|record| record.message_id).collect();
    assert_eq!(ids, vec![2001, 4000, 4101, 4501]);
    let labels: Vec<&str> = report
        .records
        .iter()
        .map(|record| record.container_label.as_str())
        .collect();
    assert_eq!(
        labels,
        vec!["#orders", "#order-40", "#june-archive", "#cake-request"]
    );
    assert_eq!(
        report.records[0].created_at_utc,
        Utc.with_ymd_and_hms(2025, 6, 5, 13, 4, 0).unwrap()
    );
    assert_eq!(report.containers_failed, 1);
    assert!(!report.cap_reached);

    let intro = server.mock(|when, then| {
        when.method(POST)
            .path("/channels/70/messages")
            .body_includes("Total: 4");
        then.status(200).json_body(json!({ "id": "900" }));
    });
    let buttons = server.mock(|when, then| {
        when.method(POST)
            .path("/channels/70/messages")
            .body_includes("https://discord.com/channels/9/45/4501");
        then.status(200).json_body(json!({ "id": "901" }));
    });
    let receipt = ReportPublisher::new(client(&server), 70, ReportDeliveryMode::Provider)
        .publish(&report.records, 24)
        .await
        .expect("publish");
    intro.assert_hits(1);
    buttons.assert_hits(1);
    assert_eq!(receipt.message_ids, vec!["900".to_string(), "901".to_string()]);
}

/// Delegates to an in-memory guild but rate-limits reaction lookups for one
/// message, as a throttled platform would.
struct ThrottledReactions {
    inner: InMemoryChatSource,
    throttled_message_id: u64,
    reaction_lookups: AtomicUsize,
}

#[async_trait]
impl ChatSource for ThrottledReactions {
    async fn list_guild_channels(&self) -> Result<Vec<GuildChannel>, SourceError> {
        self.inner.list_guild_channels().await
    }

    async fn list_active_threads(&self) -> Result<Vec<ThreadChannel>, SourceError> {
        self.inner.list_active_threads().await
    }

    async fn list_archived_threads(
        &self,
        parent_id: u64,
        visibility: ArchiveVisibility,
        before: Option<DateTime<Utc>>,
        limit: usize,
    ) -> Result<ArchivedThreadPage, SourceError> {
        self.inner
            .list_archived_threads(parent_id, visibility, before, limit)
            .await
    }

    async fn message_history_page(
        &self,
        container_id: u64,
        before: Option<u64>,
        limit: usize,
    ) -> Result<Vec<Message>, SourceError> {
        self.inner
            .message_history_page(container_id, before, limit)
            .await
    }

    async fn reaction_users_page(
        &self,
        container_id: u64,
        message_id: u64,
        symbol: &str,
        after: Option<u64>,
        limit: usize,
    ) -> Result<Vec<u64>, SourceError> {
        self.reaction_lookups.fetch_add(1, Ordering::SeqCst);
        if message_id == self.throttled_message_id {
            return Err(SourceError::RateLimited("reaction users".to_string()));
        }
        self.inner
            .reaction_users_page(container_id, message_id, symbol, after, limit)
            .await
    }
}

fn marked(container_id: u64, id: u64, hours_ago: i64, check: bool) -> Message {
    Message {
        id,
        container_id,
        author: MessageAuthor {
            id: 7,
            automated: false,
        },
        content: format!("📜 order {id}"),
        embeds: Vec::new(),
        created_at: now() - TimeDelta::hours(hours_ago),
        reactions: if check {
            vec![MessageReaction {
                symbol: "✅".to_string(),
                count: 1,
            }]
        } else {
            Vec::new()
        },
        permalink: format!("https://discord.com/channels/9/{container_id}/{id}"),
    }
}

#[tokio::test]
async fn integration_throttled_reaction_lookup_keeps_partial_container_results() {
    let mut guild = InMemoryChatSource::default();
    guild.add_channel(1, "orders", GuildChannelKind::Text, None, 0);
    guild.add_channel(2, "pickups", GuildChannelKind::Text, None, 1);
    guild.add_message(marked(1, 103, 1, false));
    guild.add_message(marked(1, 102, 2, true));
    guild.add_message(marked(1, 101, 3, false));
    guild.add_message(marked(2, 203, 1, true));
    guild.add_message(marked(2, 202, 2, false));
    guild.set_reaction_users(203, "✅", vec![111]);

    let source = Arc::new(ThrottledReactions {
        inner: guild,
        throttled_message_id: 102,
        reaction_lookups: AtomicUsize::new(0),
    });
    let config = ScanConfig {
        acknowledgers: BTreeSet::from([111]),
        ..ScanConfig::default()
    };
    let report = ScanOrchestrator::new(source.clone(), Arc::new(config))
        .run(now())
        .await
        .expect("scan");

    let ids: Vec<u64> = report.records.iter().map(|record| record.message_id).collect();
    assert_eq!(ids, vec![103, 202]);
    assert_eq!(report.containers_scanned, 2);
    assert_eq!(report.containers_failed, 1);
    assert_eq!(source.reaction_lookups.load(Ordering::SeqCst), 2);
    assert_eq!(report.records[1].container_label, "#pickups");
}
