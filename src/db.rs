use anyhow::Result;
use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::Pool;
use sqlx::Postgres;
use sqlx::Row;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use tracing::instrument;

use crate::error::StoreError;
use crate::listing::DealType;
use crate::listing::ListingRecord;
use crate::listing::MediaRef;
use crate::listing::PropertyType;
use crate::listing::model::ListingFields;
use crate::listing::model::ListingStatus;
use crate::models::ClientInquiry;
use crate::models::ClientProfile;
use crate::models::Employee;
use crate::service::ports::AccessStore;
use crate::service::ports::InquiryStore;
use crate::service::ports::ListingStore;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const LISTING_COLUMNS: &str = r#"
  object_code,
  realtor_code,
  property_type,
  deal,
  fields,
  price,
  old_price,
  initial_price,
  status,
  media,
  message_ids,
  repost_date,
  updated_at
"#;

#[derive(Clone)]
pub struct Db {
  pool: Pool<Postgres>,
}

impl Db {
  pub async fn connect(database_url: &str) -> Result<Self> {
    let pool = PgPoolOptions::new().max_connections(10).connect(database_url).await?;
    MIGRATOR.run(&pool).await?;
    Ok(Self { pool })
  }
}

fn listing_from_row(row: &PgRow) -> Result<ListingRecord, StoreError> {
  let property_type: String = row.try_get("property_type")?;
  let deal: String = row.try_get("deal")?;
  let status: String = row.try_get("status")?;
  let Json(fields): Json<ListingFields> = row.try_get("fields")?;
  let Json(media): Json<Vec<MediaRef>> = row.try_get("media")?;
  Ok(ListingRecord {
    object_code: row.try_get("object_code")?,
    realtor_code: row.try_get("realtor_code")?,
    property_type: PropertyType::from_key(&property_type).unwrap_or_default(),
    deal: DealType::from_key(&deal).unwrap_or(DealType::Sale),
    fields,
    price: row.try_get("price")?,
    old_price: row.try_get("old_price")?,
    initial_price: row.try_get("initial_price")?,
    status: ListingStatus::parse(&status).unwrap_or(ListingStatus::Inactive),
    media,
    message_ids: row.try_get("message_ids")?,
    repost_date: row.try_get("repost_date")?,
    updated_at: row.try_get("updated_at")?,
  })
}

fn inquiry_from_row(row: &PgRow) -> Result<ClientInquiry, StoreError> {
  Ok(ClientInquiry {
    user_id: row.try_get("user_id")?,
    username: row.try_get("username")?,
    telegram_name: row.try_get("telegram_name")?,
    client_name: row.try_get("client_name")?,
    phone: row.try_get("phone")?,
    object_code: row.try_get("object_code")?,
    realtor_code: row.try_get("realtor_code")?,
    created_at: row.try_get("created_at")?,
  })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
  err
    .as_database_error()
    .is_some_and(|db_err| db_err.is_unique_violation())
}

#[async_trait]
impl ListingStore for Db {
  #[instrument(skip(self))]
  async fn get_active_record(&self, object_code: &str) -> Result<Option<ListingRecord>, StoreError> {
    let sql = format!("SELECT {LISTING_COLUMNS} FROM listings WHERE object_code = $1 AND status = 'active' LIMIT 1");
    let row = sqlx::query(&sql)
      .bind(object_code)
      .fetch_optional(&self.pool)
      .await?;
    row.as_ref().map(listing_from_row).transpose()
  }

  #[instrument(skip(self, record), fields(object_code = %record.object_code))]
  async fn insert_record(&self, record: &ListingRecord) -> Result<(), StoreError> {
    let result = sqlx::query(
      r#"
      INSERT INTO listings (
        object_code, realtor_code, property_type, deal, fields, price, old_price,
        initial_price, status, media, message_ids, repost_date, updated_at
      )
      VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
      "#,
    )
    .bind(&record.object_code)
    .bind(&record.realtor_code)
    .bind(record.property_type.key())
    .bind(record.deal.key())
    .bind(Json(&record.fields))
    .bind(&record.price)
    .bind(&record.old_price)
    .bind(&record.initial_price)
    .bind(record.status.as_str())
    .bind(Json(&record.media))
    .bind(&record.message_ids)
    .bind(record.repost_date)
    .bind(record.updated_at)
    .execute(&self.pool)
    .await;

    match result {
      Ok(_) => Ok(()),
      Err(err) if is_unique_violation(&err) => Err(StoreError::DuplicateCode(record.object_code.clone())),
      Err(err) => Err(err.into()),
    }
  }

  #[instrument(skip(self, record), fields(object_code = %record.object_code))]
  async fn upsert_record(&self, record: &ListingRecord) -> Result<(), StoreError> {
    sqlx::query(
      r#"
      INSERT INTO listings (
        object_code, realtor_code, property_type, deal, fields, price, old_price,
        initial_price, status, media, message_ids, repost_date, updated_at
      )
      VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
      ON CONFLICT (object_code) WHERE status = 'active' DO UPDATE SET
        realtor_code = EXCLUDED.realtor_code,
        property_type = EXCLUDED.property_type,
        deal = EXCLUDED.deal,
        fields = EXCLUDED.fields,
        price = EXCLUDED.price,
        old_price = EXCLUDED.old_price,
        initial_price = EXCLUDED.initial_price,
        status = EXCLUDED.status,
        media = EXCLUDED.media,
        message_ids = EXCLUDED.message_ids,
        repost_date = EXCLUDED.repost_date,
        updated_at = EXCLUDED.updated_at
      "#,
    )
    .bind(&record.object_code)
    .bind(&record.realtor_code)
    .bind(record.property_type.key())
    .bind(record.deal.key())
    .bind(Json(&record.fields))
    .bind(&record.price)
    .bind(&record.old_price)
    .bind(&record.initial_price)
    .bind(record.status.as_str())
    .bind(Json(&record.media))
    .bind(&record.message_ids)
    .bind(record.repost_date)
    .bind(record.updated_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  #[instrument(skip(self))]
  async fn mark_inactive(&self, object_code: &str) -> Result<(), StoreError> {
    sqlx::query(r#"UPDATE listings SET status = 'inactive' WHERE object_code = $1 AND status = 'active'"#)
      .bind(object_code)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  #[instrument(skip(self))]
  async fn set_message_refs(
    &self,
    object_code: &str,
    message_ids: &[i32],
    reposted_at: DateTime<Utc>,
  ) -> Result<(), StoreError> {
    sqlx::query(
      r#"
      UPDATE listings
      SET message_ids = $2, repost_date = $3
      WHERE object_code = $1 AND status = 'active'
      "#,
    )
    .bind(object_code)
    .bind(message_ids)
    .bind(reposted_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  #[instrument(skip(self))]
  async fn clear_old_price(&self, object_code: &str) -> Result<(), StoreError> {
    sqlx::query(r#"UPDATE listings SET old_price = NULL WHERE object_code = $1 AND status = 'active'"#)
      .bind(object_code)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  #[instrument(skip(self))]
  async fn next_free_code(&self) -> Result<String, StoreError> {
    let next: i64 = sqlx::query_scalar(
      r#"
      SELECT COALESCE(MAX(object_code::BIGINT), 0) + 1
      FROM listings
      WHERE object_code ~ '^[0-9]+$'
      "#,
    )
    .fetch_one(&self.pool)
    .await?;
    Ok(next.to_string())
  }

  #[instrument(skip(self))]
  async fn list_active_by_owner(&self, realtor_code: &str) -> Result<Vec<ListingRecord>, StoreError> {
    let sql = format!(
      "SELECT {LISTING_COLUMNS} FROM listings WHERE realtor_code = $1 AND status = 'active' ORDER BY created_at"
    );
    let rows = sqlx::query(&sql).bind(realtor_code).fetch_all(&self.pool).await?;
    rows.iter().map(listing_from_row).collect()
  }

  #[instrument(skip(self))]
  async fn list_active(&self) -> Result<Vec<ListingRecord>, StoreError> {
    let sql = format!("SELECT {LISTING_COLUMNS} FROM listings WHERE status = 'active' ORDER BY created_at");
    let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
    rows.iter().map(listing_from_row).collect()
  }
}

#[async_trait]
impl InquiryStore for Db {
  #[instrument(skip(self))]
  async fn has_inquiry(&self, user_id: i64, object_code: &str) -> Result<bool, StoreError> {
    let exists: bool = sqlx::query_scalar(
      r#"SELECT EXISTS (SELECT 1 FROM inquiries WHERE user_id = $1 AND object_code = $2)"#,
    )
    .bind(user_id)
    .bind(object_code)
    .fetch_one(&self.pool)
    .await?;
    Ok(exists)
  }

  #[instrument(skip(self))]
  async fn last_inquiry(&self, user_id: i64) -> Result<Option<ClientInquiry>, StoreError> {
    let row = sqlx::query(
      r#"
      SELECT user_id, username, telegram_name, client_name, phone, object_code, realtor_code, created_at
      FROM inquiries
      WHERE user_id = $1
      ORDER BY created_at DESC
      LIMIT 1
      "#,
    )
    .bind(user_id)
    .fetch_optional(&self.pool)
    .await?;
    row.as_ref().map(inquiry_from_row).transpose()
  }

  #[instrument(skip(self, inquiry), fields(user_id = inquiry.user_id, object_code = %inquiry.object_code))]
  async fn insert_inquiry(&self, inquiry: &ClientInquiry) -> Result<(), StoreError> {
    let result = sqlx::query(
      r#"
      INSERT INTO inquiries (
        user_id, username, telegram_name, client_name, phone, object_code, realtor_code, created_at
      )
      VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
      "#,
    )
    .bind(inquiry.user_id)
    .bind(&inquiry.username)
    .bind(&inquiry.telegram_name)
    .bind(&inquiry.client_name)
    .bind(&inquiry.phone)
    .bind(&inquiry.object_code)
    .bind(&inquiry.realtor_code)
    .bind(inquiry.created_at)
    .execute(&self.pool)
    .await;

    match result {
      Ok(_) => Ok(()),
      Err(err) if is_unique_violation(&err) => Err(StoreError::DuplicateInquiry {
        user_id: inquiry.user_id,
        object_code: inquiry.object_code.clone(),
      }),
      Err(err) => Err(err.into()),
    }
  }

  #[instrument(skip(self))]
  async fn client_profile(&self, user_id: i64) -> Result<Option<ClientProfile>, StoreError> {
    let row = sqlx::query(
      r#"
      SELECT user_id, username, telegram_name, client_name, phone, updated_at
      FROM clients
      WHERE user_id = $1
      "#,
    )
    .bind(user_id)
    .fetch_optional(&self.pool)
    .await?;
    let Some(row) = row else {
      return Ok(None);
    };
    Ok(Some(ClientProfile {
      user_id: row.try_get("user_id")?,
      username: row.try_get("username")?,
      telegram_name: row.try_get("telegram_name")?,
      client_name: row.try_get("client_name")?,
      phone: row.try_get("phone")?,
      updated_at: row.try_get("updated_at")?,
    }))
  }

  #[instrument(skip(self, profile), fields(user_id = profile.user_id))]
  async fn upsert_client(&self, profile: &ClientProfile) -> Result<(), StoreError> {
    sqlx::query(
      r#"
      INSERT INTO clients (user_id, username, telegram_name, client_name, phone, updated_at)
      VALUES ($1, $2, $3, $4, $5, $6)
      ON CONFLICT (user_id) DO UPDATE SET
        username = EXCLUDED.username,
        telegram_name = EXCLUDED.telegram_name,
        client_name = EXCLUDED.client_name,
        phone = EXCLUDED.phone,
        updated_at = EXCLUDED.updated_at
      "#,
    )
    .bind(profile.user_id)
    .bind(&profile.username)
    .bind(&profile.telegram_name)
    .bind(&profile.client_name)
    .bind(&profile.phone)
    .bind(profile.updated_at)
    .execute(&self.pool)
    .await?;
    Ok(())
  }
}

#[async_trait]
impl AccessStore for Db {
  #[instrument(skip(self))]
  async fn is_allowed(&self, tg_id: i64) -> Result<bool, StoreError> {
    let exists: bool = sqlx::query_scalar(r#"SELECT EXISTS (SELECT 1 FROM employees WHERE tg_id = $1)"#)
      .bind(tg_id)
      .fetch_one(&self.pool)
      .await?;
    Ok(exists)
  }

  #[instrument(skip(self))]
  async fn grant(&self, tg_id: i64, display_name: &str) -> Result<(), StoreError> {
    sqlx::query(
      r#"
      INSERT INTO employees (tg_id, display_name)
      VALUES ($1, $2)
      ON CONFLICT (tg_id) DO UPDATE SET display_name = EXCLUDED.display_name
      "#,
    )
    .bind(tg_id)
    .bind(display_name)
    .execute(&self.pool)
    .await?;
    Ok(())
  }

  #[instrument(skip(self))]
  async fn revoke(&self, tg_id: i64) -> Result<(), StoreError> {
    sqlx::query(r#"DELETE FROM employees WHERE tg_id = $1"#)
      .bind(tg_id)
      .execute(&self.pool)
      .await?;
    Ok(())
  }

  #[instrument(skip(self))]
  async fn list_employees(&self) -> Result<Vec<Employee>, StoreError> {
    let rows = sqlx::query(r#"SELECT tg_id, display_name FROM employees ORDER BY display_name COLLATE "C""#)
      .fetch_all(&self.pool)
      .await?;
    rows
      .iter()
      .map(|row| {
        Ok(Employee {
          tg_id: row.try_get("tg_id")?,
          display_name: row.try_get("display_name")?,
        })
      })
      .collect()
  }
}
