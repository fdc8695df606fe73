use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use anyhow::Result;
use chrono::TimeDelta;

use crate::listing::pricing::PricePolicy;

const DEFAULT_LINK_HOST: &str = "t.me";

#[derive(Debug, Clone)]
pub struct Config {
  pub bot_token: String,
  pub database_url: String,
  pub channel_id: i64,
  pub notify_chat_id: Option<i64>,
  pub admins: Vec<i64>,
  pub link_host: String,
  pub price_policy: PricePolicy,
  pub maintenance_interval: Duration,
  pub auto_repost_after: Option<TimeDelta>,
}

impl Config {
  pub fn from_env() -> Result<Self> {
    Self::from_lookup(|key| env::var(key).ok())
  }

  fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
    let bot_token = lookup("BOT_TOKEN")
      .or_else(|| lookup("TELOXIDE_TOKEN"))
      .context("BOT_TOKEN or TELOXIDE_TOKEN must be set")?;
    let database_url = lookup("DATABASE_URL").context("DATABASE_URL must be set")?;
    let channel_id = parse_var::<i64>("CHANNEL_ID", lookup("CHANNEL_ID"))?.context("CHANNEL_ID must be set")?;
    let notify_chat_id = parse_var::<i64>("NOTIFY_CHAT_ID", lookup("NOTIFY_CHAT_ID"))?;
    let admins = parse_admins(&lookup("ADMIN_IDS").unwrap_or_default());
    let link_host = lookup("LINK_HOST")
      .map(|host| host.trim().to_string())
      .filter(|host| !host.is_empty())
      .unwrap_or_else(|| DEFAULT_LINK_HOST.to_string());

    let defaults = PricePolicy::default();
    let price_policy = PricePolicy {
      hot_window: parse_var::<i64>("HOT_BADGE_WEEKS", lookup("HOT_BADGE_WEEKS"))?
        .map_or(defaults.hot_window, TimeDelta::weeks),
      hot_repost_cooldown: parse_var::<i64>("HOT_REPOST_COOLDOWN_HOURS", lookup("HOT_REPOST_COOLDOWN_HOURS"))?
        .map_or(defaults.hot_repost_cooldown, TimeDelta::hours),
      repost_cooldown: parse_var::<i64>("REPOST_COOLDOWN_HOURS", lookup("REPOST_COOLDOWN_HOURS"))?
        .map_or(defaults.repost_cooldown, TimeDelta::hours),
    };
    let maintenance_minutes = parse_var::<u64>(
      "MAINTENANCE_INTERVAL_MINUTES",
      lookup("MAINTENANCE_INTERVAL_MINUTES"),
    )?
    .unwrap_or(60)
    .max(1);
    let auto_repost_after = parse_var::<i64>("AUTO_REPOST_DAYS", lookup("AUTO_REPOST_DAYS"))?.map(TimeDelta::days);

    Ok(Self {
      bot_token,
      database_url,
      channel_id,
      notify_chat_id,
      admins,
      link_host,
      price_policy,
      maintenance_interval: Duration::from_secs(maintenance_minutes * 60),
      auto_repost_after,
    })
  }
}

/// Unset or blank is `None`; anything else must parse.
fn parse_var<T>(name: &str, raw: Option<String>) -> Result<Option<T>>
where
  T: FromStr,
  T::Err: std::error::Error + Send + Sync + 'static,
{
  match raw.as_deref().map(str::trim) {
    None | Some("") => Ok(None),
    Some(value) => value
      .parse::<T>()
      .map(Some)
      .with_context(|| format!("{name} has an invalid value: {value}")),
  }
}

fn parse_admins(raw: &str) -> Vec<i64> {
  raw
    .split(',')
    .filter_map(|id| {
      let trimmed = id.trim();
      if trimmed.is_empty() {
        return None;
      }
      match trimmed.parse::<i64>() {
        Ok(value) => Some(value),
        Err(err) => {
          tracing::warn!(value = trimmed, error = %err, "invalid ADMIN_IDS entry");
          None
        },
      }
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use std::collections::HashMap;
  use std::time::Duration;

  use chrono::TimeDelta;

  use super::Config;
  use super::parse_admins;

  fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
      .iter()
      .map(|(key, value)| (key.to_string(), value.to_string()))
      .collect();
    move |key| vars.get(key).cloned()
  }

  #[test]
  fn parses_valid_admins() {
    let admins = parse_admins("1, 2 ,3");
    assert_eq!(admins, vec![1, 2, 3]);
  }

  #[test]
  fn skips_invalid_entries() {
    let admins = parse_admins("42,abc,  7");
    assert_eq!(admins, vec![42, 7]);
  }

  #[test]
  fn minimal_environment_uses_defaults() {
    let config = Config::from_lookup(lookup(&[
      ("TELOXIDE_TOKEN", "token"),
      ("DATABASE_URL", "postgres://localhost/realty"),
      ("CHANNEL_ID", "-100123"),
    ]))
    .unwrap();
    assert_eq!(config.bot_token, "token");
    assert_eq!(config.channel_id, -100123);
    assert_eq!(config.notify_chat_id, None);
    assert_eq!(config.link_host, "t.me");
    assert_eq!(config.price_policy.hot_window, TimeDelta::weeks(5));
    assert_eq!(config.price_policy.hot_repost_cooldown, TimeDelta::days(1));
    assert_eq!(config.price_policy.repost_cooldown, TimeDelta::days(3));
    assert_eq!(config.maintenance_interval, Duration::from_secs(3600));
    assert_eq!(config.auto_repost_after, None);
  }

  #[test]
  fn overrides_business_constants() {
    let config = Config::from_lookup(lookup(&[
      ("BOT_TOKEN", "token"),
      ("DATABASE_URL", "postgres://localhost/realty"),
      ("CHANNEL_ID", "-100123"),
      ("NOTIFY_CHAT_ID", "-200"),
      ("HOT_BADGE_WEEKS", "3"),
      ("REPOST_COOLDOWN_HOURS", "48"),
      ("AUTO_REPOST_DAYS", "7"),
      ("LINK_HOST", "telegram.me"),
    ]))
    .unwrap();
    assert_eq!(config.notify_chat_id, Some(-200));
    assert_eq!(config.price_policy.hot_window, TimeDelta::weeks(3));
    assert_eq!(config.price_policy.repost_cooldown, TimeDelta::hours(48));
    assert_eq!(config.auto_repost_after, Some(TimeDelta::days(7)));
    assert_eq!(config.link_host, "telegram.me");
  }

  #[test]
  fn invalid_numbers_and_missing_channel_fail() {
    let err = Config::from_lookup(lookup(&[
      ("BOT_TOKEN", "token"),
      ("DATABASE_URL", "postgres://localhost/realty"),
      ("CHANNEL_ID", "-100123"),
      ("HOT_BADGE_WEEKS", "five"),
    ]))
    .unwrap_err();
    assert!(err.to_string().contains("HOT_BADGE_WEEKS"));

    let err = Config::from_lookup(lookup(&[
      ("BOT_TOKEN", "token"),
      ("DATABASE_URL", "postgres://localhost/realty"),
    ]))
    .unwrap_err();
    assert!(err.to_string().contains("CHANNEL_ID"));
  }
}
