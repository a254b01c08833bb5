//! Zoom API client: Server-to-Server OAuth token exchange and retrieval of
//! the day's scheduled meetings.

use crate::config::Config;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{NaiveDate, NaiveDateTime};
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Zoom reports meeting start times in this fixed format, seconds precision,
/// always UTC. Lexicographic order on the raw string matches chronological
/// order.
pub const START_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(Debug, Error)]
pub enum ZoomError {
    #[error("Zoom token request failed: {0}")]
    TokenRequest(#[source] reqwest::Error),
    #[error("Zoom meeting list request failed: {0}")]
    MeetingList(#[source] reqwest::Error),
}

/// Bearer token for one run. Acquired once, never refreshed.
pub struct AccessToken(String);

impl AccessToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The subset of a Zoom meeting the briefing needs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MeetingRecord {
    pub topic: String,
    /// Raw provider timestamp. Recurring meeting templates come back without
    /// one; those deserialize to an empty string and are filtered out.
    #[serde(default)]
    pub start_time: String,
    /// Duration in minutes.
    #[serde(default)]
    pub duration: i64,
    #[serde(default)]
    pub join_url: String,
}

/// Outcome of the meeting-list call. A failed fetch is kept distinct from a
/// legitimately empty day; the caller chooses whether to degrade it.
#[derive(Debug)]
pub enum MeetingFetch {
    Meetings(Vec<MeetingRecord>),
    FetchFailed(ZoomError),
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct MeetingListResponse {
    #[serde(default)]
    meetings: Vec<MeetingRecord>,
}

pub struct ZoomClient {
    client: Client,
    oauth_base_url: String,
    api_base_url: String,
    client_id: String,
    client_secret: String,
    account_id: String,
    page_size: u32,
}

impl ZoomClient {
    pub fn new(config: &Config) -> Self {
        Self {
            client: Client::new(),
            oauth_base_url: config.zoom_oauth_base_url.clone(),
            api_base_url: config.zoom_api_base_url.clone(),
            client_id: config.zoom_client_id.clone(),
            client_secret: config.zoom_client_secret.clone(),
            account_id: config.zoom_account_id.clone(),
            page_size: config.page_size,
        }
    }

    /// `Basic base64("<client_id>:<client_secret>")` per the Server-to-Server
    /// OAuth flow.
    pub fn basic_auth_header(client_id: &str, client_secret: &str) -> String {
        format!(
            "Basic {}",
            BASE64.encode(format!("{client_id}:{client_secret}"))
        )
    }

    /// Exchanges the account credentials for a bearer token. One attempt;
    /// any transport error or non-2xx status is fatal to the run.
    pub async fn acquire_token(&self) -> Result<AccessToken, ZoomError> {
        let url = format!("{}/oauth/token", self.oauth_base_url);
        debug!("Requesting Zoom access token from {url}");
        let response = self
            .client
            .post(&url)
            .header(
                reqwest::header::AUTHORIZATION,
                Self::basic_auth_header(&self.client_id, &self.client_secret),
            )
            .form(&[
                ("grant_type", "account_credentials"),
                ("account_id", self.account_id.as_str()),
            ])
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(ZoomError::TokenRequest)?;
        let token: TokenResponse = response.json().await.map_err(ZoomError::TokenRequest)?;
        Ok(AccessToken(token.access_token))
    }

    /// Fetches one page of scheduled meetings and narrows it to the given
    /// UTC date, sorted by start time.
    pub async fn todays_meetings(&self, token: &AccessToken, today: NaiveDate) -> MeetingFetch {
        match self.list_scheduled(token).await {
            Ok(meetings) => MeetingFetch::Meetings(filter_today(meetings, today)),
            Err(err) => MeetingFetch::FetchFailed(err),
        }
    }

    async fn list_scheduled(&self, token: &AccessToken) -> Result<Vec<MeetingRecord>, ZoomError> {
        let url = format!("{}/v2/users/me/meetings", self.api_base_url);
        debug!("Listing scheduled meetings (page_size={})", self.page_size);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token.as_str())
            .query(&[
                ("type", "scheduled".to_string()),
                ("page_size", self.page_size.to_string()),
            ])
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(ZoomError::MeetingList)?;
        let body: MeetingListResponse = response.json().await.map_err(ZoomError::MeetingList)?;
        Ok(body.meetings)
    }
}

pub fn parse_start_time(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, START_TIME_FORMAT).ok()
}

/// Keeps meetings whose UTC start date equals `today`, ascending by start
/// time. Unparseable timestamps are dropped.
pub fn filter_today(meetings: Vec<MeetingRecord>, today: NaiveDate) -> Vec<MeetingRecord> {
    let mut todays: Vec<MeetingRecord> = meetings
        .into_iter()
        .filter(|meeting| match parse_start_time(&meeting.start_time) {
            Some(start) => start.date() == today,
            None => {
                debug!(
                    "Skipping meeting with unusable start_time: {:?}",
                    meeting.start_time
                );
                false
            }
        })
        .collect();
    todays.sort_by(|a, b| a.start_time.cmp(&b.start_time));
    todays
}
