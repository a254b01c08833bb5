//! Renders the daily briefing text. Pure string building; given the same
//! meetings, date, and offset the output is byte-identical.

use crate::zoom::{parse_start_time, MeetingRecord};
use chrono::{Duration, NaiveDate};
use std::fmt::Write;

/// Builds the message body posted to Slack. Start times are shifted from UTC
/// by the configured fixed offset; end times are start plus duration. The
/// offset is a deliberate policy, not a timezone lookup, so the same run
/// renders identically regardless of the host's locale.
pub fn render(meetings: &[MeetingRecord], date: NaiveDate, utc_offset_hours: i64) -> String {
    let date_str = date.format("%Y-%m-%d");
    if meetings.is_empty() {
        return format!("📅 오늘의 줌 회의 ({date_str})\n\n오늘 예정된 회의가 없습니다. 😊");
    }

    let mut text = format!("📅 오늘의 줌 회의 ({date_str})\n");
    for meeting in meetings {
        // The fetcher only hands over parseable timestamps.
        let Some(start) = parse_start_time(&meeting.start_time) else {
            continue;
        };
        let local_start = start + Duration::hours(utc_offset_hours);
        let local_end = local_start + Duration::minutes(meeting.duration);
        let _ = write!(
            text,
            "\n🔹 {}\n   ⏰ {} - {}\n   🔗 {}",
            meeting.topic,
            local_start.format("%H:%M"),
            local_end.format("%H:%M"),
            meeting.join_url
        );
    }
    let _ = write!(
        text,
        "\n\n총 {}개의 회의가 예정되어 있습니다.",
        meetings.len()
    );
    text
}
