//! Posts the scan report as an intro embed followed by pages of link buttons.

use anyhow::{Context, Result};
use scrollwatch_core::{
    paginate, render_intro, render_text_summary, MatchRecord, ReportIntro, ReportPage,
};
use serde_json::{json, Value};
use tracing::debug;

use crate::discord_api_client::DiscordApiClient;

pub const BUTTONS_PER_ROW: usize = 5;

const COMPONENT_TYPE_ACTION_ROW: u8 = 1;
const COMPONENT_TYPE_BUTTON: u8 = 2;
const BUTTON_STYLE_LINK: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportDeliveryMode {
    DryRun,
    Provider,
}

impl ReportDeliveryMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DryRun => "dry_run",
            Self::Provider => "provider",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportDeliveryReceipt {
    pub mode: ReportDeliveryMode,
    pub messages_posted: usize,
    pub message_ids: Vec<String>,
    /// Text rendering, present in dry-run mode.
    pub rendered: Option<String>,
}

pub fn build_intro_payload(intro: &ReportIntro) -> Value {
    let mut embed = json!({
        "title": intro.title,
        "description": intro.description,
    });
    if let Some(footer) = &intro.footer {
        embed["footer"] = json!({ "text": footer });
    }
    json!({
        "embeds": [embed],
        "allowed_mentions": { "parse": [] },
    })
}

/// Link buttons arranged in rows of [`BUTTONS_PER_ROW`].
pub fn build_page_payload(page: &ReportPage) -> Value {
    let rows: Vec<Value> = page
        .links
        .chunks(BUTTONS_PER_ROW)
        .map(|row| {
            json!({
                "type": COMPONENT_TYPE_ACTION_ROW,
                "components": row
                    .iter()
                    .map(|link| json!({
                        "type": COMPONENT_TYPE_BUTTON,
                        "style": BUTTON_STYLE_LINK,
                        "label": link.label,
                        "url": link.url,
                    }))
                    .collect::<Vec<_>>(),
            })
        })
        .collect();
    json!({ "components": rows })
}

#[derive(Clone)]
pub struct ReportPublisher {
    client: DiscordApiClient,
    channel_id: u64,
    mode: ReportDeliveryMode,
}

impl ReportPublisher {
    pub fn new(client: DiscordApiClient, channel_id: u64, mode: ReportDeliveryMode) -> Self {
        Self {
            client,
            channel_id,
            mode,
        }
    }

    pub async fn publish(
        &self,
        records: &[MatchRecord],
        window_hours: i64,
    ) -> Result<ReportDeliveryReceipt> {
        if self.mode == ReportDeliveryMode::DryRun {
            return Ok(ReportDeliveryReceipt {
                mode: self.mode,
                messages_posted: 0,
                message_ids: Vec::new(),
                rendered: Some(render_text_summary(records, window_hours)),
            });
        }

        let mut payloads = vec![build_intro_payload(&render_intro(
            records.len(),
            window_hours,
        ))];
        payloads.extend(paginate(records).iter().map(build_page_payload));

        let path = format!("channels/{}/messages", self.channel_id);
        let mut message_ids = Vec::with_capacity(payloads.len());
        for (index, payload) in payloads.iter().enumerate() {
            let response: Value = self
                .client
                .post_json("report message", &path, payload)
                .await
                .with_context(|| {
                    format!(
                        "failed to post report message {} of {} to channel {}",
                        index + 1,
                        payloads.len(),
                        self.channel_id
                    )
                })?;
            let message_id = response
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            debug!(
                channel_id = self.channel_id,
                message_id = %message_id,
                page = index,
                "report message posted"
            );
            message_ids.push(message_id);
        }

        Ok(ReportDeliveryReceipt {
            mode: self.mode,
            messages_posted: message_ids.len(),
            message_ids,
            rendered: None,
        })
    }
}
