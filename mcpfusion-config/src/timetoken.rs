//! Time-token substitution. Strings containing `#DAYS±N`,
//! `#HOURS±N`, or `#MINS±N` are rewritten to RFC-3339 UTC timestamps before
//! being dispatched. Substitution happens once, after parameter defaulting.

use chrono::{DateTime, Datelike, TimeZone, Utc};
use mcpfusion_core::CoreError;
use once_cell::sync::Lazy;
use regex::Regex;

static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"#(DAYS|HOURS|MINS)([+-]\d+)").unwrap());

const MAX_DAYS: i64 = 365;
const MAX_HOURS: i64 = 8760;
const MAX_MINS: i64 = 525_600;

/// Rewrites every time token in `input`, anchored at `now`. Returns the
/// original string unchanged if it contains no tokens.
pub fn substitute(input: &str, now: DateTime<Utc>) -> Result<String, CoreError> {
    if !TOKEN.is_match(input) {
        return Ok(input.to_string());
    }

    let mut error = None;
    let replaced = TOKEN.replace_all(input, |caps: &regex::Captures| {
        let unit = &caps[1];
        let n: i64 = caps[2].parse().unwrap_or(0);
        match resolve(unit, n, now) {
            Ok(ts) => ts.to_rfc3339(),
            Err(e) => {
                error = Some(e);
                String::new()
            }
        }
    });

    if let Some(e) = error {
        return Err(e);
    }
    Ok(replaced.into_owned())
}

fn resolve(unit: &str, n: i64, now: DateTime<Utc>) -> Result<DateTime<Utc>, CoreError> {
    match unit {
        "DAYS" => {
            if n.abs() > MAX_DAYS {
                return Err(CoreError::Validation(format!(
                    "#DAYS{n:+} exceeds the {MAX_DAYS}-day range"
                )));
            }
            let shifted = now + chrono::Duration::days(n);
            Ok(Utc
                .with_ymd_and_hms(shifted.year(), shifted.month(), shifted.day(), 0, 0, 0)
                .single()
                .unwrap_or(shifted))
        }
        "HOURS" => {
            if n.abs() > MAX_HOURS {
                return Err(CoreError::Validation(format!(
                    "#HOURS{n:+} exceeds the {MAX_HOURS}-hour range"
                )));
            }
            Ok(now + chrono::Duration::hours(n))
        }
        "MINS" => {
            if n.abs() > MAX_MINS {
                return Err(CoreError::Validation(format!(
                    "#MINS{n:+} exceeds the {MAX_MINS}-minute range"
                )));
            }
            Ok(now + chrono::Duration::minutes(n))
        }
        other => Err(CoreError::Validation(format!("unknown time token unit '{other}'"))),
    }
}
