use std::sync::Arc;

use chrono::DateTime;
use chrono::TimeDelta;
use chrono::Utc;
use tracing::error;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use crate::error::ListingError;
use crate::listing::CaptionContext;
use crate::listing::ListingDraft;
use crate::listing::ListingRecord;
use crate::listing::caption::compose;
use crate::listing::format::format_price;
use crate::listing::pricing::PriceOperation;
use crate::listing::pricing::PricePolicy;
use crate::listing::pricing::PriceState;
use crate::listing::pricing::RepriceIntent;
use crate::listing::pricing::Transition;
use crate::listing::pricing::check_intent;
use crate::service::ports::ListingStore;
use crate::service::ports::Messaging;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepostOutcome {
  Published(ListingRecord),
  CoolingDown(TimeDelta),
}

/// Publish / reprice / repost / delete coordination over the store and the channel.
///
/// Every republish posts the fresh album first, persists it, and only then
/// removes the previous post, so a failure at any step leaves exactly one
/// consistent post behind.
#[derive(Clone)]
pub struct ListingService {
  store: Arc<dyn ListingStore>,
  channel: Arc<dyn Messaging>,
  captions: CaptionContext,
  policy: PricePolicy,
}

impl ListingService {
  pub fn new(
    store: Arc<dyn ListingStore>,
    channel: Arc<dyn Messaging>,
    captions: CaptionContext,
    policy: PricePolicy,
  ) -> Self {
    Self {
      store,
      channel,
      captions,
      policy,
    }
  }

  pub fn captions(&self) -> &CaptionContext {
    &self.captions
  }

  /// Reserves the next object code, refusing one that is still active.
  #[instrument(skip(self))]
  pub async fn allocate_code(&self) -> Result<String, ListingError> {
    let code = self.store.next_free_code().await?;
    if self.store.get_active_record(&code).await?.is_some() {
      warn!(object_code = %code, "allocated object code is already active");
      return Err(ListingError::DuplicateCode(code));
    }
    Ok(code)
  }

  #[instrument(skip(self, draft), fields(realtor = %draft.realtor_code))]
  pub async fn publish(&self, draft: &ListingDraft, now: DateTime<Utc>) -> Result<ListingRecord, ListingError> {
    let mut record = draft.to_record(now)?;
    if self.store.get_active_record(&record.object_code).await?.is_some() {
      return Err(ListingError::DuplicateCode(record.object_code));
    }

    let caption = compose(&record.view(false), &self.captions);
    record.message_ids = self
      .channel
      .publish(&record.media, &caption)
      .await
      .map_err(ListingError::Transport)?;

    if let Err(err) = self.store.insert_record(&record).await {
      error!(
        object_code = %record.object_code,
        message_ids = ?record.message_ids,
        error = %err,
        "listing published but not persisted"
      );
      self.discard_post(&record.message_ids).await;
      return Err(err.into());
    }

    info!(
      object_code = %record.object_code,
      realtor = %record.realtor_code,
      media = record.media.len(),
      "listing published"
    );
    Ok(record)
  }

  #[instrument(skip(self))]
  pub async fn list_by_owner(&self, realtor_code: &str) -> Result<Vec<ListingRecord>, ListingError> {
    let mut records = self.store.list_active_by_owner(realtor_code).await?;
    records.sort_by_key(|record| record.object_code.parse::<u64>().unwrap_or(u64::MAX));
    Ok(records)
  }

  /// Active record owned by `realtor_code`; anything else reads as not found.
  pub async fn owned(&self, realtor_code: &str, object_code: &str) -> Result<ListingRecord, ListingError> {
    match self.store.get_active_record(object_code).await? {
      Some(record) if record.realtor_code == realtor_code => Ok(record),
      _ => Err(ListingError::NotFound(object_code.to_string())),
    }
  }

  /// Badge decision for showing a stored record as it is.
  pub fn is_hot(&self, record: &ListingRecord, now: DateTime<Utc>) -> bool {
    self.policy.is_hot(&price_state(record), now)
  }

  #[instrument(skip(self))]
  pub async fn repost(
    &self,
    realtor_code: &str,
    object_code: &str,
    now: DateTime<Utc>,
  ) -> Result<RepostOutcome, ListingError> {
    let record = self.owned(realtor_code, object_code).await?;
    self.passive_repost(record, now).await
  }

  #[instrument(skip(self, raw_price))]
  pub async fn reprice(
    &self,
    realtor_code: &str,
    object_code: &str,
    intent: RepriceIntent,
    raw_price: &str,
    now: DateTime<Utc>,
  ) -> Result<ListingRecord, ListingError> {
    let record = self.owned(realtor_code, object_code).await?;
    let new_price = format_price(raw_price, Some(record.deal))?;
    check_intent(intent, &record.price, &new_price)?;

    let transition = self
      .policy
      .apply(&price_state(&record), &PriceOperation::Reprice(new_price), now);
    info!(
      object_code,
      ?intent,
      old_price = ?transition.state.old_price,
      price = %transition.state.price,
      hot = transition.hot,
      "repricing listing"
    );
    self.republish(record, transition, true, now).await
  }

  #[instrument(skip(self))]
  pub async fn delete(&self, realtor_code: &str, object_code: &str) -> Result<(), ListingError> {
    let record = self.owned(realtor_code, object_code).await?;
    if let Err(err) = self.channel.delete_messages(&record.message_ids).await {
      warn!(object_code, error = %err, "failed to delete channel post");
    }
    self.store.mark_inactive(object_code).await?;
    info!(object_code, realtor = realtor_code, "listing deactivated");
    Ok(())
  }

  /// Drops elapsed badges and edits the channel captions in place.
  #[instrument(skip(self))]
  pub async fn expire_badges(&self, now: DateTime<Utc>) -> Result<usize, ListingError> {
    let mut expired = 0;
    for record in self.store.list_active().await? {
      if !self.policy.badge_expired(&price_state(&record), now) {
        continue;
      }
      self.store.clear_old_price(&record.object_code).await?;
      expired += 1;

      let caption = compose(&record.view(false), &self.captions);
      if let Some(first) = record.message_ids.first()
        && let Err(err) = self.channel.edit_caption(*first, &caption).await
      {
        warn!(object_code = %record.object_code, error = %err, "failed to refresh expired caption");
      }
      info!(object_code = %record.object_code, "price badge expired");
    }
    Ok(expired)
  }

  /// Passively reposts every active listing not reposted within `max_age`.
  #[instrument(skip(self))]
  pub async fn auto_repost(&self, max_age: TimeDelta, now: DateTime<Utc>) -> Result<usize, ListingError> {
    let mut reposted = 0;
    for record in self.store.list_active().await? {
      let due = record.repost_date.is_none_or(|last| now - last >= max_age);
      if !due {
        continue;
      }
      let object_code = record.object_code.clone();
      match self.passive_repost(record, now).await {
        Ok(RepostOutcome::Published(_)) => reposted += 1,
        Ok(RepostOutcome::CoolingDown(_)) => {},
        Err(err) => warn!(object_code = %object_code, error = %err, "auto repost failed"),
      }
    }
    Ok(reposted)
  }

  async fn passive_repost(&self, record: ListingRecord, now: DateTime<Utc>) -> Result<RepostOutcome, ListingError> {
    let transition = self.policy.apply(&price_state(&record), &PriceOperation::Repost, now);
    if let Some(wait) = self.policy.repost_wait(record.repost_date, transition.hot, now) {
      info!(object_code = %record.object_code, wait_minutes = wait.num_minutes(), "repost on cooldown");
      return Ok(RepostOutcome::CoolingDown(wait));
    }
    let republished = self.republish(record, transition, false, now).await?;
    Ok(RepostOutcome::Published(republished))
  }

  async fn republish(
    &self,
    record: ListingRecord,
    transition: Transition,
    price_changed: bool,
    now: DateTime<Utc>,
  ) -> Result<ListingRecord, ListingError> {
    let previous_ids = record.message_ids.clone();
    let mut next = ListingRecord {
      price: transition.state.price,
      old_price: transition.state.old_price,
      updated_at: transition.state.updated_at,
      ..record
    };

    let caption = compose(&next.view(transition.hot), &self.captions);
    next.message_ids = self
      .channel
      .publish(&next.media, &caption)
      .await
      .map_err(ListingError::Transport)?;
    next.repost_date = Some(now);

    if let Err(err) = self.persist(&next, price_changed, transition.badge_expired, now).await {
      error!(
        object_code = %next.object_code,
        message_ids = ?next.message_ids,
        error = %err,
        "repost published but not persisted"
      );
      self.discard_post(&next.message_ids).await;
      return Err(err);
    }

    if let Err(err) = self.channel.delete_messages(&previous_ids).await {
      warn!(object_code = %next.object_code, error = %err, "failed to delete previous channel post");
    }
    info!(
      object_code = %next.object_code,
      hot = transition.hot,
      message_ids = ?next.message_ids,
      "listing reposted"
    );
    Ok(next)
  }

  async fn persist(
    &self,
    record: &ListingRecord,
    price_changed: bool,
    badge_expired: bool,
    now: DateTime<Utc>,
  ) -> Result<(), ListingError> {
    // An expired badge clears `old_price` in the same write as the new refs.
    if price_changed || badge_expired {
      self.store.upsert_record(record).await?;
      return Ok(());
    }
    self
      .store
      .set_message_refs(&record.object_code, &record.message_ids, now)
      .await?;
    Ok(())
  }

  async fn discard_post(&self, message_ids: &[i32]) {
    if let Err(err) = self.channel.delete_messages(message_ids).await {
      warn!(message_ids = ?message_ids, error = %err, "failed to discard unpersisted post");
    }
  }
}

fn price_state(record: &ListingRecord) -> PriceState {
  PriceState {
    price: record.price.clone(),
    old_price: record.old_price.clone(),
    updated_at: record.updated_at,
  }
}
