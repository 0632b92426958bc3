//! One-shot run: resolve targets, scan, then post or print the report.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use scrollwatch_cli::Cli;
use scrollwatch_core::{ScanOrchestrator, ScanReport};
use scrollwatch_discord::{
    resolve_targets, DiscordApiClient, DiscordChatSource, ReportDeliveryReceipt, ReportPublisher,
    ResolutionError,
};
use tracing::{debug, info};

#[derive(Debug)]
pub(crate) enum RunOutcome {
    /// Guild or report channel could not be resolved; nothing was scanned.
    Aborted(ResolutionError),
    Completed {
        report: ScanReport,
        receipt: ReportDeliveryReceipt,
    },
}

pub(crate) async fn run_once(cli: &Cli, now: DateTime<Utc>) -> Result<RunOutcome> {
    let config = cli.scan_config().context("invalid scan configuration")?;
    let window_hours = config.window_hours();
    let client = DiscordApiClient::new(&cli.discord_client_config())?;

    let targets = match resolve_targets(&client, cli.guild_id, cli.report_channel_id).await {
        Ok(targets) => targets,
        Err(error @ ResolutionError::Authentication(_)) => {
            return Err(error).context("discord readiness check failed");
        }
        Err(error) => return Ok(RunOutcome::Aborted(error)),
    };
    debug!(
        bot_user_id = targets.bot_user_id,
        guild_id = targets.guild_id,
        guild = %targets.guild_name,
        report_channel_id = targets.report_channel_id,
        "targets resolved"
    );

    let source = Arc::new(DiscordChatSource::new(client.clone(), targets.guild_id));
    let report = ScanOrchestrator::new(source, Arc::new(config))
        .run(now)
        .await
        .context("failed to enumerate guild channels")?;
    info!(
        containers_scanned = report.containers_scanned,
        containers_failed = report.containers_failed,
        messages_visited = report.messages_visited,
        matches_found = report.matches_found,
        reported = report.records.len(),
        cap_reached = report.cap_reached,
        "scan finished"
    );

    let receipt = ReportPublisher::new(client, targets.report_channel_id, cli.delivery_mode())
        .publish(&report.records, window_hours)
        .await?;
    Ok(RunOutcome::Completed { report, receipt })
}

/// Console output for an outcome; empty when the report was posted.
pub(crate) fn render_outcome(outcome: &RunOutcome) -> Option<String> {
    match outcome {
        RunOutcome::Aborted(error) => Some(error.to_string()),
        RunOutcome::Completed { receipt, .. } => receipt.rendered.clone(),
    }
}
