use assert_cmd::Command;
use chrono::{SecondsFormat, TimeDelta, Utc};
use httpmock::prelude::*;
use predicates::prelude::*;
use serde_json::json;

fn binary_command() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("scrollwatch"));
    cmd.env_clear();
    cmd
}

fn required_args(server: &MockServer) -> Vec<String> {
    vec![
        "--discord-token".to_string(),
        "token".to_string(),
        "--guild-id".to_string(),
        "9".to_string(),
        "--report-channel-id".to_string(),
        "70".to_string(),
        "--ack-user-ids".to_string(),
        "111".to_string(),
        "--discord-api-base".to_string(),
        server.base_url(),
        "--retry-max-attempts".to_string(),
        "1".to_string(),
    ]
}

fn hours_ago(hours: i64) -> String {
    (Utc::now() - TimeDelta::hours(hours)).to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn mock_targets(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET).path("/users/@me");
        then.status(200).json_body(json!({ "id": "1000", "bot": true }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/guilds/9");
        then.status(200).json_body(json!({ "id": "9", "name": "Bakery" }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/channels/70");
        then.status(200)
            .json_body(json!({ "id": "70", "type": 0, "guild_id": "9" }));
    });
}

#[test]
fn help_hides_token_value() {
    let mut cmd = binary_command();
    cmd.arg("--help")
        .env("DISCORD_TOKEN", "SUPER_SECRET_DISCORD_TOKEN_123");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("DISCORD_TOKEN"))
        .stdout(predicate::str::contains("SUPER_SECRET_DISCORD_TOKEN_123").not());
}

#[test]
fn regression_non_integer_ack_user_id_fails_fast() {
    let mut cmd = binary_command();
    cmd.args([
        "--discord-token",
        "token",
        "--guild-id",
        "9",
        "--report-channel-id",
        "70",
    ])
    .env("DISCORD_ACK_USER_IDS", "111,abc");

    cmd.assert().failure().stderr(predicate::str::contains(
        "DISCORD_ACK_USER_IDS contains a non-integer entry: 'abc'",
    ));
}

#[test]
fn regression_missing_ack_user_ids_fails_fast() {
    let mut cmd = binary_command();
    cmd.args([
        "--discord-token",
        "token",
        "--guild-id",
        "9",
        "--report-channel-id",
        "70",
    ]);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("--ack-user-ids"));
}

#[test]
fn functional_unknown_guild_prints_message_and_exits_cleanly() {
    let server = MockServer::start();
    server.mock(|when, then| {
        when.method(GET).path("/users/@me");
        then.status(200).json_body(json!({ "id": "1000" }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/guilds/9");
        then.status(403).json_body(json!({ "message": "Missing Access" }));
    });
    let channels = server.mock(|when, then| {
        when.method(GET).path("/guilds/9/channels");
        then.status(200).json_body(json!([]));
    });

    let mut cmd = binary_command();
    cmd.args(required_args(&server));
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Guild not found or bot not in guild."));
    channels.assert_hits(0);
}

#[test]
fn integration_dry_run_prints_unacknowledged_scrolls() {
    let server = MockServer::start();
    mock_targets(&server);
    server.mock(|when, then| {
        when.method(GET).path("/guilds/9/channels");
        then.status(200).json_body(json!([
            { "id": "20", "type": 0, "name": "orders", "position": 0 }
        ]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/guilds/9/threads/active");
        then.status(200).json_body(json!({ "threads": [] }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/channels/20/threads/archived/public");
        then.status(200).json_body(json!({ "threads": [], "has_more": false }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/channels/20/threads/archived/private");
        then.status(200).json_body(json!({ "threads": [], "has_more": false }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/channels/20/messages");
        then.status(200).json_body(json!([
            {
                "id": "302",
                "author": { "id": "7" },
                "content": "📜 cake for table four",
                "timestamp": hours_ago(1)
            },
            {
                "id": "301",
                "author": { "id": "7" },
                "content": "📜 already handled",
                "timestamp": hours_ago(2),
                "reactions": [{ "count": 1, "emoji": { "id": null, "name": "ack" } }]
            },
            {
                "id": "300",
                "author": { "id": "7" },
                "content": "📜 too old",
                "timestamp": hours_ago(30)
            }
        ]));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/channels/20/messages/301/reactions/ack");
        then.status(200).json_body(json!([{ "id": "111" }]));
    });
    let post = server.mock(|when, then| {
        when.method(POST).path("/channels/70/messages");
        then.status(200).json_body(json!({ "id": "900" }));
    });

    let mut cmd = binary_command();
    cmd.args(required_args(&server))
        .args(["--check-emoji", "ack", "--dry-run"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Unacknowledged scrolls"))
        .stdout(predicate::str::contains("Total: 1"))
        .stdout(predicate::str::contains("https://discord.com/channels/9/20/302"))
        .stdout(predicate::str::contains("/301").not())
        .stdout(predicate::str::contains("too old").not());
    post.assert_hits(0);
}
