//! Price history transitions and the "🔥 price dropped" badge window.
//!
//! The badge itself is never stored. A passive repost recomputes it from the
//! baseline (`old_price`) and the age of the last price mutation; an explicit
//! reprice asserts it directly.

use chrono::DateTime;
use chrono::TimeDelta;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PricePolicy {
  pub hot_window: TimeDelta,
  pub hot_repost_cooldown: TimeDelta,
  pub repost_cooldown: TimeDelta,
}

impl Default for PricePolicy {
  fn default() -> Self {
    Self {
      hot_window: TimeDelta::weeks(5),
      hot_repost_cooldown: TimeDelta::days(1),
      repost_cooldown: TimeDelta::days(3),
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceState {
  pub price: String,
  pub old_price: Option<String>,
  pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PriceOperation {
  /// Republish without touching the price.
  Repost,
  /// Publish with a new canonical price string.
  Reprice(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepriceIntent {
  Decrease,
  Increase,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
  pub state: PriceState,
  pub hot: bool,
  /// The badge window elapsed during a passive repost and the baseline was dropped.
  pub badge_expired: bool,
}

/// Digit-only numeric value of a price string. Absent or digitless input is 0.
pub fn price_value(price: Option<&str>) -> u64 {
  let digits: String = price
    .unwrap_or("0")
    .chars()
    .filter(char::is_ascii_digit)
    .collect();
  if digits.is_empty() {
    return 0;
  }
  digits.parse().unwrap_or(u64::MAX)
}

impl PricePolicy {
  fn within_window(&self, state: &PriceState, now: DateTime<Utc>) -> Option<bool> {
    state.old_price.as_ref()?;
    let updated_at = state.updated_at?;
    Some(now - updated_at <= self.hot_window)
  }

  /// Badge decision for a record that is shown without a price change.
  pub fn is_hot(&self, state: &PriceState, now: DateTime<Utc>) -> bool {
    self.within_window(state, now) == Some(true)
      && price_value(state.old_price.as_deref()) > price_value(Some(&state.price))
  }

  /// Whether a stored baseline has outlived the badge window.
  pub fn badge_expired(&self, state: &PriceState, now: DateTime<Utc>) -> bool {
    self.within_window(state, now) == Some(false)
  }

  pub fn apply(&self, state: &PriceState, operation: &PriceOperation, now: DateTime<Utc>) -> Transition {
    match operation {
      PriceOperation::Repost => self.passive(state, now),
      PriceOperation::Reprice(new_price) => reprice(state, new_price, now),
    }
  }

  fn passive(&self, state: &PriceState, now: DateTime<Utc>) -> Transition {
    if self.badge_expired(state, now) {
      return Transition {
        state: PriceState {
          old_price: None,
          ..state.clone()
        },
        hot: false,
        badge_expired: true,
      };
    }
    Transition {
      state: state.clone(),
      hot: self.is_hot(state, now),
      badge_expired: false,
    }
  }

  /// Remaining wait before a plain repost is allowed, if any.
  pub fn repost_wait(&self, last_repost: Option<DateTime<Utc>>, hot: bool, now: DateTime<Utc>) -> Option<TimeDelta> {
    let last_repost = last_repost?;
    let cooldown = if hot {
      self.hot_repost_cooldown
    } else {
      self.repost_cooldown
    };
    let elapsed = now - last_repost;
    (elapsed < cooldown).then(|| cooldown - elapsed)
  }
}

fn reprice(state: &PriceState, new_price: &str, now: DateTime<Utc>) -> Transition {
  let current = price_value(Some(&state.price));
  let proposed = price_value(Some(new_price));

  if proposed < current {
    return Transition {
      state: PriceState {
        price: new_price.to_string(),
        old_price: Some(state.price.clone()),
        updated_at: Some(now),
      },
      hot: true,
      badge_expired: false,
    };
  }

  let still_discounted = state
    .old_price
    .as_deref()
    .is_some_and(|baseline| proposed < price_value(Some(baseline)));
  Transition {
    state: PriceState {
      price: new_price.to_string(),
      old_price: if still_discounted { state.old_price.clone() } else { None },
      updated_at: Some(now),
    },
    hot: still_discounted,
    badge_expired: false,
  }
}

/// Enforces the direction the realtor asked for from the management menu.
pub fn check_intent(intent: RepriceIntent, current: &str, proposed: &str) -> Result<(), ValidationError> {
  let current = price_value(Some(current));
  let proposed = price_value(Some(proposed));
  match intent {
    RepriceIntent::Decrease if proposed >= current => Err(ValidationError::PriceNotLower),
    RepriceIntent::Increase if proposed <= current => Err(ValidationError::PriceNotHigher),
    _ => Ok(()),
  }
}

/// "2 д 5 ч" rendering of a cooldown remainder.
pub fn format_wait(wait: TimeDelta) -> String {
  let hours = wait.num_hours().max(0);
  format!("{} д {} ч", hours / 24, hours % 24)
}
