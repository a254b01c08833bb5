//! One fetch-format-send cycle. Strictly sequential; each external call is
//! attempted exactly once.

use crate::briefing;
use crate::config::Config;
use crate::slack::{SlackMessage, SlackNotifier};
use crate::zoom::{MeetingFetch, ZoomClient};
use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};

/// Runs the notification pipeline. Token acquisition and webhook delivery
/// failures are returned to the caller; a failed meeting fetch is degraded
/// to an empty day after logging, so recipients see the same text either way.
pub async fn run(config: &Config) -> Result<()> {
    info!("Looking up today's Zoom meetings");
    let zoom = ZoomClient::new(config);
    let token = zoom
        .acquire_token()
        .await
        .context("Could not authenticate with Zoom")?;

    let today = Utc::now().date_naive();
    let meetings = match zoom.todays_meetings(&token, today).await {
        MeetingFetch::Meetings(meetings) => meetings,
        MeetingFetch::FetchFailed(err) => {
            warn!("Meeting list fetch failed, reporting an empty day: {err}");
            Vec::new()
        }
    };

    let message = SlackMessage {
        channel: config.slack_channel.clone(),
        text: briefing::render(&meetings, today, config.utc_offset_hours),
    };

    info!("Sending the briefing to Slack");
    SlackNotifier::new(&config.slack_webhook_url)
        .send(&message)
        .await
        .context("Could not deliver the briefing to Slack")?;

    info!("Briefing delivered ({} meeting(s) today)", meetings.len());
    Ok(())
}
