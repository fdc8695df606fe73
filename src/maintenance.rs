use std::time::Duration;

use chrono::TimeDelta;
use chrono::Utc;
use tokio::time::MissedTickBehavior;
use tokio::time::interval;
use tracing::error;
use tracing::info;

use crate::service::ListingService;

/// Periodic badge expiry sweep plus the optional auto-repost.
pub fn spawn(listings: ListingService, period: Duration, auto_repost_after: Option<TimeDelta>) {
  info!(
    period_secs = period.as_secs(),
    auto_repost_days = auto_repost_after.map(|age| age.num_days()),
    "maintenance tick started"
  );
  tokio::spawn(async move {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
      ticker.tick().await;
      run_once(&listings, auto_repost_after).await;
    }
  });
}

async fn run_once(listings: &ListingService, auto_repost_after: Option<TimeDelta>) {
  let now = Utc::now();
  match listings.expire_badges(now).await {
    Ok(0) => {},
    Ok(expired) => info!(expired, "expired price badges"),
    Err(err) => error!(error = %err, "badge expiry sweep failed"),
  }

  let Some(max_age) = auto_repost_after else {
    return;
  };
  match listings.auto_repost(max_age, now).await {
    Ok(0) => {},
    Ok(reposted) => info!(reposted, "auto-reposted listings"),
    Err(err) => error!(error = %err, "auto repost failed"),
  }
}
