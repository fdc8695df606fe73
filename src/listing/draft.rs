use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ValidationError;
use crate::listing::format::format_input;
use crate::listing::format::format_plot_size;
use crate::listing::format::format_price;
use crate::listing::format::parse_integer;
use crate::listing::model::DealType;
use crate::listing::model::Field;
use crate::listing::model::FieldValue;
use crate::listing::model::ListingFields;
use crate::listing::model::ListingRecord;
use crate::listing::model::ListingStatus;
use crate::listing::model::ListingView;
use crate::listing::model::MediaRef;
use crate::listing::model::PropertyType;
use crate::listing::schema::FieldSchema;
use crate::listing::schema::MAX_PURPOSES;
use crate::listing::schema::schema;

pub const MAX_MEDIA: usize = 10;

/// Free-text value the wizard is currently waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum PendingInput {
  Field { field: Field },
  PlotLength,
  PlotWidth { length: u32 },
}

impl PendingInput {
  pub fn prompt(&self) -> String {
    match self {
      Self::Field { field } => format!("Введите «{}»:", field.label()),
      Self::PlotLength => "Введите длину фасада (м):".to_string(),
      Self::PlotWidth { .. } => "Введите глубину (м):".to_string(),
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputOutcome {
  Stored(Field),
  AwaitingWidth,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PurposeSelection {
  pub chosen: usize,
  pub complete: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingDraft {
  pub realtor_code: String,
  pub object_code: Option<String>,
  pub property_type: PropertyType,
  pub deal: Option<DealType>,
  pub fields: ListingFields,
  pub price: Option<String>,
  pub media: Vec<MediaRef>,
  /// Bumped on every accepted album item, duplicates included.
  #[serde(default)]
  pub media_generation: u32,
  pub pending: Option<PendingInput>,
}

impl ListingDraft {
  pub fn new(realtor_code: impl Into<String>) -> Self {
    Self {
      realtor_code: realtor_code.into(),
      object_code: None,
      property_type: PropertyType::default(),
      deal: None,
      fields: ListingFields::new(),
      price: None,
      media: Vec::new(),
      media_generation: 0,
      pending: None,
    }
  }

  pub fn schema(&self) -> &'static FieldSchema {
    schema(Some(self.property_type), self.deal)
  }

  /// Appends media in arrival order; returns false once the album is full.
  pub fn push_media(&mut self, media: MediaRef) -> bool {
    if self.media.len() >= MAX_MEDIA {
      return false;
    }
    if !self.media.contains(&media) {
      self.media.push(media);
    }
    self.media_generation = self.media_generation.wrapping_add(1);
    true
  }

  /// Switching type drops everything type-specific; code, owner and media stay.
  pub fn set_property_type(&mut self, property_type: PropertyType) -> bool {
    if property_type == self.property_type {
      return false;
    }
    self.property_type = property_type;
    self.deal = None;
    self.price = None;
    self.fields.clear();
    self.pending = None;
    true
  }

  pub fn set_deal(&mut self, deal: DealType) {
    self.deal = Some(deal);
  }

  /// Stores the `index`-th menu choice for `field`.
  pub fn select(&mut self, field: Field, index: usize) -> bool {
    let Some(choice) = self.schema().choices(field).and_then(|choices| choices.get(index)) else {
      return false;
    };
    self.fields.set_text(field, *choice);
    true
  }

  pub fn toggle_purpose(&mut self, index: usize) -> Result<PurposeSelection, ValidationError> {
    let Some(choice) = self
      .schema()
      .choices(Field::Purpose)
      .and_then(|choices| choices.get(index))
    else {
      return Ok(self.purpose_selection());
    };

    let mut chosen = self.fields.list(Field::Purpose);
    if let Some(position) = chosen.iter().position(|existing| existing == choice) {
      chosen.remove(position);
    } else {
      if chosen.len() >= MAX_PURPOSES {
        return Err(ValidationError::TooManyPurposes);
      }
      chosen.push((*choice).to_string());
    }
    self.fields.set(Field::Purpose, FieldValue::List(chosen));
    Ok(self.purpose_selection())
  }

  fn purpose_selection(&self) -> PurposeSelection {
    let chosen = self.fields.list(Field::Purpose).len();
    PurposeSelection {
      chosen,
      complete: chosen >= MAX_PURPOSES,
    }
  }

  /// Opens a free-text prompt; `None` when the schema has no such manual field.
  pub fn begin_input(&mut self, field: Field) -> Option<PendingInput> {
    if !self.schema().is_manual(field) {
      return None;
    }
    let pending = if field == Field::PlotSize {
      PendingInput::PlotLength
    } else {
      PendingInput::Field { field }
    };
    self.pending = Some(pending);
    Some(pending)
  }

  /// Feeds free text into the pending field.
  ///
  /// On a validation error the pending state is left untouched so the
  /// caller can simply re-prompt.
  pub fn accept_input(&mut self, raw: &str) -> Result<Option<InputOutcome>, ValidationError> {
    let Some(pending) = self.pending else {
      return Ok(None);
    };
    match pending {
      PendingInput::PlotLength => {
        let length = parse_integer(raw).map_err(|_| ValidationError::PlotLength)?;
        self.pending = Some(PendingInput::PlotWidth { length });
        Ok(Some(InputOutcome::AwaitingWidth))
      },
      PendingInput::PlotWidth { length } => {
        let width = parse_integer(raw).map_err(|_| ValidationError::PlotWidth)?;
        self
          .fields
          .set_text(Field::PlotSize, format_plot_size(length, width));
        self.pending = None;
        Ok(Some(InputOutcome::Stored(Field::PlotSize)))
      },
      PendingInput::Field { field } => {
        let value = format_input(field, raw, self.deal)?;
        if field == Field::Price {
          self.price = Some(value.display());
        } else {
          self.fields.set(field, value);
        }
        self.pending = None;
        Ok(Some(InputOutcome::Stored(field)))
      },
    }
  }

  pub fn value_of(&self, field: Field) -> Option<String> {
    match field {
      Field::Deal => self.deal.map(|deal| deal.tag().to_string()),
      Field::Price => self.price.clone(),
      other => self.fields.text(other),
    }
  }

  pub fn missing_fields(&self) -> Vec<Field> {
    self
      .schema()
      .required
      .iter()
      .copied()
      .filter(|field| self.value_of(*field).is_none())
      .collect()
  }

  pub fn view(&self) -> ListingView<'_> {
    ListingView {
      object_code: self.object_code.as_deref().unwrap_or_default(),
      realtor_code: &self.realtor_code,
      property_type: Some(self.property_type),
      deal: self.deal,
      fields: &self.fields,
      price: self.price.as_deref(),
      old_price: None,
    }
  }

  /// Fresh active record; the price baseline starts empty.
  pub fn to_record(&self, now: DateTime<Utc>) -> Result<ListingRecord, ValidationError> {
    let missing = self.missing_fields();
    if !missing.is_empty() {
      return Err(ValidationError::MissingFields(
        missing.iter().map(|field| field.label()).collect(),
      ));
    }
    let (Some(object_code), Some(deal), Some(price)) = (&self.object_code, self.deal, &self.price) else {
      return Err(ValidationError::MissingFields(vec![Field::Price.label()]));
    };
    // The deal may have changed after the price was entered.
    let price = format_price(price, Some(deal))?;

    let schema = self.schema();
    let mut fields = ListingFields::new();
    for (field, value) in self.fields.iter() {
      if schema.declares(field) {
        fields.set(field, value.clone());
      }
    }

    Ok(ListingRecord {
      object_code: object_code.clone(),
      realtor_code: self.realtor_code.clone(),
      property_type: self.property_type,
      deal,
      fields,
      price: price.clone(),
      old_price: None,
      initial_price: price,
      status: ListingStatus::Active,
      media: self.media.clone(),
      message_ids: Vec::new(),
      repost_date: Some(now),
      updated_at: None,
    })
  }
}
