use std::sync::Arc;

use chrono::DateTime;
use chrono::TimeDelta;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use tracing::info;
use tracing::instrument;

use crate::error::InquiryError;
use crate::error::StoreError;
use crate::listing::ListingRecord;
use crate::listing::deeplink::parse_start_payload;
use crate::models::ClientInquiry;
use crate::models::ClientProfile;
use crate::service::ports::InquiryStore;
use crate::service::ports::ListingStore;

/// How long a stored phone number is reused without asking again.
pub const PHONE_REUSE_WINDOW: TimeDelta = TimeDelta::days(30);

/// An inquiry that passed the link, listing and duplicate checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InquiryTicket {
  pub object_code: String,
  pub realtor_code: String,
  /// Name and phone from the client's previous inquiry, if any.
  pub returning: Option<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientContact {
  pub user_id: i64,
  pub username: Option<String>,
  pub telegram_name: String,
  pub client_name: String,
  pub phone: String,
}

#[derive(Clone)]
pub struct InquiryService {
  listings: Arc<dyn ListingStore>,
  inquiries: Arc<dyn InquiryStore>,
}

impl InquiryService {
  pub fn new(listings: Arc<dyn ListingStore>, inquiries: Arc<dyn InquiryStore>) -> Self {
    Self { listings, inquiries }
  }

  #[instrument(skip(self))]
  pub async fn open(&self, user_id: i64, payload: &str) -> Result<InquiryTicket, InquiryError> {
    let link = parse_start_payload(payload).ok_or(InquiryError::InvalidLink)?;
    if self.listings.get_active_record(&link.object_code).await?.is_none() {
      return Err(InquiryError::Closed(link.object_code));
    }
    if self.inquiries.has_inquiry(user_id, &link.object_code).await? {
      return Err(InquiryError::AlreadySubmitted(link.object_code));
    }
    let returning = self
      .inquiries
      .last_inquiry(user_id)
      .await?
      .map(|previous| (previous.client_name, previous.phone));
    Ok(InquiryTicket {
      object_code: link.object_code,
      realtor_code: link.realtor_code,
      returning,
    })
  }

  /// Phone of a client profile refreshed within the reuse window.
  pub async fn recent_phone(&self, user_id: i64, now: DateTime<Utc>) -> Result<Option<String>, InquiryError> {
    let profile = self.inquiries.client_profile(user_id).await?;
    Ok(
      profile
        .filter(|profile| now - profile.updated_at < PHONE_REUSE_WINDOW)
        .map(|profile| profile.phone),
    )
  }

  /// Stores the inquiry and refreshes the client profile.
  ///
  /// The duplicate check runs again here because the conversation may have
  /// been idle between `open` and `submit`.
  #[instrument(skip(self, contact), fields(user_id = contact.user_id))]
  pub async fn submit(
    &self,
    ticket: &InquiryTicket,
    contact: ClientContact,
    now: DateTime<Utc>,
  ) -> Result<ClientInquiry, InquiryError> {
    if self.inquiries.has_inquiry(contact.user_id, &ticket.object_code).await? {
      return Err(InquiryError::AlreadySubmitted(ticket.object_code.clone()));
    }

    let inquiry = ClientInquiry {
      user_id: contact.user_id,
      username: contact.username.clone(),
      telegram_name: contact.telegram_name.clone(),
      client_name: contact.client_name.clone(),
      phone: contact.phone.clone(),
      object_code: ticket.object_code.clone(),
      realtor_code: ticket.realtor_code.clone(),
      created_at: now,
    };
    match self.inquiries.insert_inquiry(&inquiry).await {
      Ok(()) => {},
      Err(StoreError::DuplicateInquiry { object_code, .. }) => return Err(InquiryError::AlreadySubmitted(object_code)),
      Err(err) => return Err(err.into()),
    }

    self
      .inquiries
      .upsert_client(&ClientProfile {
        user_id: contact.user_id,
        username: contact.username,
        telegram_name: contact.telegram_name,
        client_name: contact.client_name,
        phone: contact.phone,
        updated_at: now,
      })
      .await?;

    info!(
      user_id = inquiry.user_id,
      object_code = %inquiry.object_code,
      realtor = %inquiry.realtor_code,
      "inquiry stored"
    );
    Ok(inquiry)
  }

  pub async fn listing(&self, object_code: &str) -> Result<Option<ListingRecord>, InquiryError> {
    Ok(self.listings.get_active_record(object_code).await?)
  }
}

/// "+998 90 123-45-67" → "+998901234567".
pub fn normalize_phone(raw: &str) -> String {
  let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
  format!("+{digits}")
}

pub fn notification_text(inquiry: &ClientInquiry, realtor_display: &str) -> String {
  format!(
    "Новая заявка\nДата: {}\nКлиент: {}\nТелефон: {}\nОбъект: {}\nРиелтор: {}",
    inquiry.created_at.format("%Y-%m-%d %H:%M:%S"),
    inquiry.client_name,
    inquiry.phone,
    inquiry.object_code,
    realtor_display,
  )
}
