//! Collaborator interfaces consumed by the orchestration layer.

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::error::StoreError;
use crate::listing::ListingRecord;
use crate::listing::MediaRef;
use crate::models::ClientInquiry;
use crate::models::ClientProfile;
use crate::models::Employee;

#[async_trait]
pub trait ListingStore: Send + Sync {
  async fn get_active_record(&self, object_code: &str) -> Result<Option<ListingRecord>, StoreError>;

  /// Inserts a new active record; an active record with the same code yields `DuplicateCode`.
  async fn insert_record(&self, record: &ListingRecord) -> Result<(), StoreError>;

  /// Overwrites the active record with the same code, inserting when there is none.
  async fn upsert_record(&self, record: &ListingRecord) -> Result<(), StoreError>;

  async fn mark_inactive(&self, object_code: &str) -> Result<(), StoreError>;

  async fn set_message_refs(
    &self,
    object_code: &str,
    message_ids: &[i32],
    reposted_at: DateTime<Utc>,
  ) -> Result<(), StoreError>;

  async fn clear_old_price(&self, object_code: &str) -> Result<(), StoreError>;

  /// Smallest code above every code ever issued, active or not.
  async fn next_free_code(&self) -> Result<String, StoreError>;

  async fn list_active_by_owner(&self, realtor_code: &str) -> Result<Vec<ListingRecord>, StoreError>;

  async fn list_active(&self) -> Result<Vec<ListingRecord>, StoreError>;
}

#[async_trait]
pub trait InquiryStore: Send + Sync {
  async fn has_inquiry(&self, user_id: i64, object_code: &str) -> Result<bool, StoreError>;

  async fn last_inquiry(&self, user_id: i64) -> Result<Option<ClientInquiry>, StoreError>;

  /// Unique per (user, object code); a repeat yields `DuplicateInquiry`.
  async fn insert_inquiry(&self, inquiry: &ClientInquiry) -> Result<(), StoreError>;

  async fn client_profile(&self, user_id: i64) -> Result<Option<ClientProfile>, StoreError>;

  async fn upsert_client(&self, profile: &ClientProfile) -> Result<(), StoreError>;
}

#[async_trait]
pub trait AccessStore: Send + Sync {
  async fn is_allowed(&self, tg_id: i64) -> Result<bool, StoreError>;

  async fn grant(&self, tg_id: i64, display_name: &str) -> Result<(), StoreError>;

  async fn revoke(&self, tg_id: i64) -> Result<(), StoreError>;

  async fn list_employees(&self) -> Result<Vec<Employee>, StoreError>;
}

/// Channel side of the messaging platform. Message references are the
/// platform's message ids.
#[async_trait]
pub trait Messaging: Send + Sync {
  /// Posts an album (at most ten items, caption on the first) and returns its message ids.
  async fn publish(&self, media: &[MediaRef], caption: &str) -> anyhow::Result<Vec<i32>>;

  async fn delete_messages(&self, message_ids: &[i32]) -> anyhow::Result<()>;

  async fn edit_caption(&self, message_id: i32, caption: &str) -> anyhow::Result<()>;
}
