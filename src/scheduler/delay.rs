use crate::error::{OrchestrationError, Result};
use chrono::TimeDelta;

const MAX_DAYS: i64 = 100_000;

/// Parse `[-][D.]HH:MM:SS[.fff]` into a signed delay.
///
/// Negative values parse successfully; rejecting them is the scheduler's job.
pub fn parse_delay(text: &str) -> Result<TimeDelta> {
    let invalid = || {
        OrchestrationError::InvalidArgument(format!(
            "delay '{text}' must be formatted as [D.]HH:MM:SS"
        ))
    };

    let trimmed = text.trim();
    let (negative, body) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };

    let parts: Vec<&str> = body.split(':').collect();
    let [head, minutes, seconds] = parts.as_slice() else {
        return Err(invalid());
    };

    let (days, hours) = match head.split_once('.') {
        Some((days, hours)) => (parse_component(days, Some(MAX_DAYS)).map_err(|_| invalid())?, hours),
        None => (0, *head),
    };
    let hours = parse_component(hours, Some(24)).map_err(|_| invalid())?;
    let minutes = parse_component(minutes, Some(60)).map_err(|_| invalid())?;

    let (whole_seconds, millis) = match seconds.split_once('.') {
        Some((whole, fraction)) => (whole, parse_fraction_millis(fraction).ok_or_else(invalid)?),
        None => (*seconds, 0),
    };
    let whole_seconds = parse_component(whole_seconds, Some(60)).map_err(|_| invalid())?;

    let total_millis = (((days * 24 + hours) * 60 + minutes) * 60 + whole_seconds) * 1000 + millis;
    let delta = TimeDelta::try_milliseconds(total_millis).ok_or_else(invalid)?;
    Ok(if negative { -delta } else { delta })
}

/// Render a delay as `[D.]HH:MM:SS`.
pub fn format_delay(delay: std::time::Duration) -> String {
    let total = delay.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    if days > 0 {
        format!("{days}.{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    }
}

fn parse_component(value: &str, upper: Option<i64>) -> Result<i64> {
    let invalid = || OrchestrationError::InvalidArgument(format!("invalid delay component '{value}'"));
    if value.is_empty() || !value.chars().all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    let parsed: i64 = value.parse().map_err(|_| invalid())?;
    match upper {
        Some(limit) if parsed >= limit => Err(invalid()),
        _ => Ok(parsed),
    }
}

fn parse_fraction_millis(fraction: &str) -> Option<i64> {
    if fraction.is_empty() || !fraction.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let padded: String = fraction.chars().chain("000".chars()).take(3).collect();
    padded.parse().ok()
}
