//! In-memory collaborators for orchestrator tests.

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::error::StoreError;
use crate::listing::ListingRecord;
use crate::listing::MediaRef;
use crate::listing::model::ListingStatus;
use crate::models::ClientInquiry;
use crate::models::ClientProfile;
use crate::models::Employee;
use crate::service::ports::AccessStore;
use crate::service::ports::InquiryStore;
use crate::service::ports::ListingStore;
use crate::service::ports::Messaging;

#[derive(Default)]
struct Tables {
  listings: Vec<ListingRecord>,
  inquiries: Vec<ClientInquiry>,
  clients: BTreeMap<i64, ClientProfile>,
  employees: BTreeMap<i64, String>,
  fail_writes: bool,
  writes_left: Option<usize>,
  client_upserts: usize,
}

#[derive(Default)]
pub struct MemoryStore {
  tables: Mutex<Tables>,
}

impl MemoryStore {
  pub fn fail_writes(&self, fail: bool) {
    self.tables.lock().unwrap().fail_writes = fail;
  }

  /// Lets the next `writes` writes through and fails every one after them.
  pub fn fail_after_writes(&self, writes: usize) {
    self.tables.lock().unwrap().writes_left = Some(writes);
  }

  pub fn status_of(&self, object_code: &str) -> Option<String> {
    let tables = self.tables.lock().unwrap();
    tables
      .listings
      .iter()
      .rev()
      .find(|record| record.object_code == object_code)
      .map(|record| record.status.as_str().to_string())
  }

  pub fn inquiry_count(&self) -> usize {
    self.tables.lock().unwrap().inquiries.len()
  }

  pub fn client_upserts(&self) -> usize {
    self.tables.lock().unwrap().client_upserts
  }

  pub fn put_client(&self, profile: ClientProfile) {
    self.tables.lock().unwrap().clients.insert(profile.user_id, profile);
  }

  fn write(&self) -> Result<std::sync::MutexGuard<'_, Tables>, StoreError> {
    let mut tables = self.tables.lock().unwrap();
    if tables.fail_writes || tables.writes_left == Some(0) {
      return Err(StoreError::Backend(sqlx::Error::PoolClosed));
    }
    if let Some(left) = tables.writes_left.as_mut() {
      *left -= 1;
    }
    Ok(tables)
  }
}

fn active_mut<'a>(tables: &'a mut Tables, object_code: &str) -> Option<&'a mut ListingRecord> {
  tables
    .listings
    .iter_mut()
    .find(|record| record.object_code == object_code && record.is_active())
}

#[async_trait]
impl ListingStore for MemoryStore {
  async fn get_active_record(&self, object_code: &str) -> Result<Option<ListingRecord>, StoreError> {
    let tables = self.tables.lock().unwrap();
    Ok(
      tables
        .listings
        .iter()
        .find(|record| record.object_code == object_code && record.is_active())
        .cloned(),
    )
  }

  async fn insert_record(&self, record: &ListingRecord) -> Result<(), StoreError> {
    let mut tables = self.write()?;
    if active_mut(&mut tables, &record.object_code).is_some() {
      return Err(StoreError::DuplicateCode(record.object_code.clone()));
    }
    tables.listings.push(record.clone());
    Ok(())
  }

  async fn upsert_record(&self, record: &ListingRecord) -> Result<(), StoreError> {
    let mut tables = self.write()?;
    let position = tables
      .listings
      .iter()
      .position(|existing| existing.object_code == record.object_code && existing.is_active());
    match position {
      Some(index) => tables.listings[index] = record.clone(),
      None => tables.listings.push(record.clone()),
    }
    Ok(())
  }

  async fn mark_inactive(&self, object_code: &str) -> Result<(), StoreError> {
    let mut tables = self.write()?;
    if let Some(existing) = active_mut(&mut tables, object_code) {
      existing.status = ListingStatus::Inactive;
    }
    Ok(())
  }

  async fn set_message_refs(
    &self,
    object_code: &str,
    message_ids: &[i32],
    reposted_at: DateTime<Utc>,
  ) -> Result<(), StoreError> {
    let mut tables = self.write()?;
    if let Some(existing) = active_mut(&mut tables, object_code) {
      existing.message_ids = message_ids.to_vec();
      existing.repost_date = Some(reposted_at);
    }
    Ok(())
  }

  async fn clear_old_price(&self, object_code: &str) -> Result<(), StoreError> {
    let mut tables = self.write()?;
    if let Some(existing) = active_mut(&mut tables, object_code) {
      existing.old_price = None;
    }
    Ok(())
  }

  async fn next_free_code(&self) -> Result<String, StoreError> {
    let tables = self.tables.lock().unwrap();
    let highest = tables
      .listings
      .iter()
      .filter_map(|record| record.object_code.parse::<u64>().ok())
      .max()
      .unwrap_or(0);
    Ok((highest + 1).to_string())
  }

  async fn list_active_by_owner(&self, realtor_code: &str) -> Result<Vec<ListingRecord>, StoreError> {
    let tables = self.tables.lock().unwrap();
    Ok(
      tables
        .listings
        .iter()
        .filter(|record| record.is_active() && record.realtor_code == realtor_code)
        .cloned()
        .collect(),
    )
  }

  async fn list_active(&self) -> Result<Vec<ListingRecord>, StoreError> {
    let tables = self.tables.lock().unwrap();
    Ok(tables.listings.iter().filter(|record| record.is_active()).cloned().collect())
  }
}

#[async_trait]
impl InquiryStore for MemoryStore {
  async fn has_inquiry(&self, user_id: i64, object_code: &str) -> Result<bool, StoreError> {
    let tables = self.tables.lock().unwrap();
    Ok(
      tables
        .inquiries
        .iter()
        .any(|inquiry| inquiry.user_id == user_id && inquiry.object_code == object_code),
    )
  }

  async fn last_inquiry(&self, user_id: i64) -> Result<Option<ClientInquiry>, StoreError> {
    let tables = self.tables.lock().unwrap();
    Ok(tables.inquiries.iter().rev().find(|inquiry| inquiry.user_id == user_id).cloned())
  }

  async fn insert_inquiry(&self, inquiry: &ClientInquiry) -> Result<(), StoreError> {
    let mut tables = self.write()?;
    let duplicate = tables
      .inquiries
      .iter()
      .any(|existing| existing.user_id == inquiry.user_id && existing.object_code == inquiry.object_code);
    if duplicate {
      return Err(StoreError::DuplicateInquiry {
        user_id: inquiry.user_id,
        object_code: inquiry.object_code.clone(),
      });
    }
    tables.inquiries.push(inquiry.clone());
    Ok(())
  }

  async fn client_profile(&self, user_id: i64) -> Result<Option<ClientProfile>, StoreError> {
    Ok(self.tables.lock().unwrap().clients.get(&user_id).cloned())
  }

  async fn upsert_client(&self, profile: &ClientProfile) -> Result<(), StoreError> {
    let mut tables = self.write()?;
    tables.client_upserts += 1;
    tables.clients.insert(profile.user_id, profile.clone());
    Ok(())
  }
}

#[async_trait]
impl AccessStore for MemoryStore {
  async fn is_allowed(&self, tg_id: i64) -> Result<bool, StoreError> {
    Ok(self.tables.lock().unwrap().employees.contains_key(&tg_id))
  }

  async fn grant(&self, tg_id: i64, display_name: &str) -> Result<(), StoreError> {
    self.write()?.employees.insert(tg_id, display_name.to_string());
    Ok(())
  }

  async fn revoke(&self, tg_id: i64) -> Result<(), StoreError> {
    self.write()?.employees.remove(&tg_id);
    Ok(())
  }

  async fn list_employees(&self) -> Result<Vec<Employee>, StoreError> {
    let tables = self.tables.lock().unwrap();
    Ok(
      tables
        .employees
        .iter()
        .map(|(tg_id, display_name)| Employee {
          tg_id: *tg_id,
          display_name: display_name.clone(),
        })
        .collect(),
    )
  }
}

#[derive(Default)]
struct ChannelLog {
  next_id: i32,
  captions: Vec<String>,
  deleted: Vec<i32>,
  edits: Vec<(i32, String)>,
  fail_publish: bool,
}

/// Channel fake handing out sequential message ids, one per album item.
#[derive(Default)]
pub struct RecordingChannel {
  log: Mutex<ChannelLog>,
}

impl RecordingChannel {
  pub fn fail_publish(&self, fail: bool) {
    self.log.lock().unwrap().fail_publish = fail;
  }

  pub fn last_caption(&self) -> Option<String> {
    self.log.lock().unwrap().captions.last().cloned()
  }

  pub fn published_count(&self) -> usize {
    self.log.lock().unwrap().captions.len()
  }

  pub fn deleted(&self) -> Vec<i32> {
    self.log.lock().unwrap().deleted.clone()
  }

  pub fn last_edit(&self) -> Option<(i32, String)> {
    self.log.lock().unwrap().edits.last().cloned()
  }
}

#[async_trait]
impl Messaging for RecordingChannel {
  async fn publish(&self, media: &[MediaRef], caption: &str) -> anyhow::Result<Vec<i32>> {
    let mut log = self.log.lock().unwrap();
    if log.fail_publish {
      anyhow::bail!("channel unavailable");
    }
    let ids = media
      .iter()
      .map(|_| {
        log.next_id += 1;
        log.next_id
      })
      .collect();
    log.captions.push(caption.to_string());
    Ok(ids)
  }

  async fn delete_messages(&self, message_ids: &[i32]) -> anyhow::Result<()> {
    self.log.lock().unwrap().deleted.extend_from_slice(message_ids);
    Ok(())
  }

  async fn edit_caption(&self, message_id: i32, caption: &str) -> anyhow::Result<()> {
    self.log.lock().unwrap().edits.push((message_id, caption.to_string()));
    Ok(())
  }
}
