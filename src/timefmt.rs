//! Relative timestamps for the commit detail pane
//!
//! Months are 30 days and years are 12 such months. The approximation is
//! intentional; output strings are matched literally elsewhere.

use chrono::{DateTime, Utc};

/// Format the distance between two instants as "N unit(s) ago"
pub fn relative_time(from: DateTime<Utc>, to: DateTime<Utc>) -> String {
    let seconds = (to - from).num_seconds().unsigned_abs();
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;
    let months = days / 30;
    let years = months / 12;

    let (value, unit) = if years > 0 {
        (years, "year")
    } else if months > 0 {
        (months, "month")
    } else if days > 0 {
        (days, "day")
    } else if hours > 0 {
        (hours, "hour")
    } else if minutes > 0 {
        (minutes, "minute")
    } else {
        (seconds, "second")
    };

    let plural = if value > 1 { "s" } else { "" };
    format!("{} {}{} ago", value, unit, plural)
}

/// `relative_time` against the current instant
pub fn time_ago(from: DateTime<Utc>) -> String {
    relative_time(from, Utc::now())
}
