use std::collections::HashSet;
use std::sync::Arc;

use teloxide::types::ChatId;

use crate::error::StoreError;
use crate::service::InquiryService;
use crate::service::ListingService;
use crate::service::ports::AccessStore;

#[derive(Clone)]
pub struct AppContext {
  listings: ListingService,
  inquiries: InquiryService,
  access: Arc<dyn AccessStore>,
  admins: HashSet<i64>,
  notify_chat: Option<ChatId>,
}

impl AppContext {
  pub fn new(
    listings: ListingService,
    inquiries: InquiryService,
    access: Arc<dyn AccessStore>,
    admins: Vec<i64>,
    notify_chat: Option<ChatId>,
  ) -> Self {
    Self {
      listings,
      inquiries,
      access,
      admins: admins.into_iter().collect(),
      notify_chat,
    }
  }

  pub fn listings(&self) -> &ListingService {
    &self.listings
  }

  pub fn inquiries(&self) -> &InquiryService {
    &self.inquiries
  }

  pub fn access(&self) -> &dyn AccessStore {
    self.access.as_ref()
  }

  pub fn notify_chat(&self) -> Option<ChatId> {
    self.notify_chat
  }

  pub fn is_admin(&self, tg_id: i64) -> bool {
    self.admins.contains(&tg_id)
  }

  /// Admins always pass; everyone else needs an allow-list entry.
  pub async fn can_post(&self, tg_id: i64) -> Result<bool, StoreError> {
    if self.is_admin(tg_id) {
      return Ok(true);
    }
    self.access.is_allowed(tg_id).await
  }
}

#[cfg(test)]
mod tests {
  use std::sync::Arc;

  use super::AppContext;
  use crate::listing::CaptionContext;
  use crate::listing::pricing::PricePolicy;
  use crate::service::InquiryService;
  use crate::service::ListingService;
  use crate::service::memory::MemoryStore;
  use crate::service::memory::RecordingChannel;
  use crate::service::ports::AccessStore;

  fn context(store: Arc<MemoryStore>) -> AppContext {
    let listings = ListingService::new(
      store.clone(),
      Arc::new(RecordingChannel::default()),
      CaptionContext {
        bot_username: "realty_bot".into(),
        link_host: "t.me".into(),
      },
      PricePolicy::default(),
    );
    let inquiries = InquiryService::new(store.clone(), store.clone());
    AppContext::new(listings, inquiries, store, vec![1], None)
  }

  #[tokio::test]
  async fn admins_and_granted_employees_can_post() {
    let store = Arc::new(MemoryStore::default());
    let ctx = context(store.clone());
    assert!(ctx.can_post(1).await.unwrap());
    assert!(!ctx.can_post(2).await.unwrap());

    store.grant(2, "Дилноза").await.unwrap();
    assert!(ctx.can_post(2).await.unwrap());

    store.revoke(2).await.unwrap();
    assert!(!ctx.can_post(2).await.unwrap());
  }
}
