use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// One "leave a request" submission for a listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientInquiry {
  pub user_id: i64, // tg id
  pub username: Option<String>,
  pub telegram_name: String,
  pub client_name: String,
  pub phone: String,
  pub object_code: String,
  pub realtor_code: String,
  pub created_at: DateTime<Utc>,
}

/// Last known contact details of a client, refreshed on every inquiry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientProfile {
  pub user_id: i64,
  pub username: Option<String>,
  pub telegram_name: String,
  pub client_name: String,
  pub phone: String,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Employee {
  pub tg_id: i64,
  pub display_name: String,
}
