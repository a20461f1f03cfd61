use crate::waiter::WaiterConfig;
use aws_sdk_cloudformation::config::Region;
use aws_sdk_cloudformation::Client;
use chrono::prelude::*;
use eyre::{eyre, Result, WrapErr};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Settings shared by every command.
#[derive(Debug, Clone, Default)]
pub(crate) struct Settings {
    pub(crate) region: Option<String>,
    pub(crate) profile: Option<String>,
    pub(crate) waiter: WaiterConfig,
}

impl Settings {
    /// Build a CloudFormation client from the default credential chain, with
    /// any region or profile override applied.
    pub(crate) async fn cloudformation_client(&self) -> Client {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = &self.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &self.profile {
            loader = loader.profile_name(profile);
        }
        let config = loader.load().await;
        tracing::debug!(region = ?config.region(), "chosen region");
        Client::new(&config)
    }
}

// Custom parser for parsing the datetime as either a timestamp, or as a handy string.
pub(crate) fn parse_since_argument(src: &str) -> Result<DateTime<Utc>> {
    // Try to parse as datetime
    if let Ok(dt) = DateTime::<FixedOffset>::parse_from_rfc3339(src) {
        return Ok(dt.with_timezone(&Utc));
    }

    // Try to parse as naive datetime (and assume UTC)
    if let Ok(dt) = NaiveDateTime::from_str(src) {
        return Ok(dt.and_utc());
    }

    // Try to parse as timestamp
    if let Some(dt) = src.parse::<i64>().ok().and_then(|i| Utc.timestamp_opt(i, 0).single()) {
        return Ok(dt);
    }

    // Try to parse as a relative duration, e.g. "10m" for ten minutes ago
    let ago = humantime::parse_duration(src).wrap_err("error parsing since argument")?;
    let ago = chrono::Duration::from_std(ago).wrap_err("since argument out of range")?;
    Ok(Utc::now() - ago)
}

/// Parse a `KEY=VALUE` pair as given to `--param` and `--tag`.
pub(crate) fn parse_key_value(src: &str) -> Result<(String, String)> {
    match src.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(eyre!("expected KEY=VALUE, got {:?}", src)),
    }
}

pub(crate) fn key_value_map(pairs: &[(String, String)]) -> BTreeMap<String, String> {
    pairs.iter().cloned().collect()
}
