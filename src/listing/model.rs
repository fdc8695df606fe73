use std::collections::BTreeMap;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
  #[default]
  OldStock,
  NewStock,
  Land,
  Commercial,
}

impl PropertyType {
  pub const ALL: [PropertyType; 4] = [Self::OldStock, Self::NewStock, Self::Land, Self::Commercial];

  /// Hashtag used in the caption header and on the wizard buttons.
  pub fn tag(self) -> &'static str {
    match self {
      Self::OldStock => "Старыйфонд",
      Self::NewStock => "Новыйфонд",
      Self::Land => "Участок",
      Self::Commercial => "Коммерция",
    }
  }

  pub fn key(self) -> &'static str {
    match self {
      Self::OldStock => "old",
      Self::NewStock => "new",
      Self::Land => "land",
      Self::Commercial => "commercial",
    }
  }

  pub fn from_key(key: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|kind| kind.key() == key)
  }

  pub fn is_apartment(self) -> bool {
    matches!(self, Self::OldStock | Self::NewStock)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DealType {
  Sale,
  Rent,
}

impl DealType {
  pub const ALL: [DealType; 2] = [Self::Sale, Self::Rent];

  pub fn tag(self) -> &'static str {
    match self {
      Self::Sale => "Продажа",
      Self::Rent => "Аренда",
    }
  }

  pub fn key(self) -> &'static str {
    match self {
      Self::Sale => "sale",
      Self::Rent => "rent",
    }
  }

  pub fn from_key(key: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|deal| deal.key() == key)
  }
}

/// Canonical identifier of every attribute a listing can carry.
///
/// The identifier is what gets stored and routed through callback data; the
/// Russian label is presentation only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
  Deal,
  District,
  Rooms,
  Area,
  Floor,
  FloorCount,
  Condition,
  Material,
  Bathrooms,
  Landmark,
  Price,
  Extra,
  Complex,
  YearBuilt,
  EstateKind,
  PlotSize,
  PlotArea,
  HouseArea,
  DriveIn,
  Purpose,
  Position,
  PremisesArea,
  Vat,
  Owner,
}

impl Field {
  pub const ALL: [Field; 24] = [
    Self::Deal,
    Self::District,
    Self::Rooms,
    Self::Area,
    Self::Floor,
    Self::FloorCount,
    Self::Condition,
    Self::Material,
    Self::Bathrooms,
    Self::Landmark,
    Self::Price,
    Self::Extra,
    Self::Complex,
    Self::YearBuilt,
    Self::EstateKind,
    Self::PlotSize,
    Self::PlotArea,
    Self::HouseArea,
    Self::DriveIn,
    Self::Purpose,
    Self::Position,
    Self::PremisesArea,
    Self::Vat,
    Self::Owner,
  ];

  pub fn label(self) -> &'static str {
    match self {
      Self::Deal => "Тип заявки",
      Self::District => "Район",
      Self::Rooms => "Комнаты",
      Self::Area => "Площадь",
      Self::Floor => "Этаж",
      Self::FloorCount => "Этажность",
      Self::Condition => "Состояние",
      Self::Material => "Материал строения",
      Self::Bathrooms => "Санузлы",
      Self::Landmark => "Ориентир",
      Self::Price => "Цена",
      Self::Extra => "Дополнительно",
      Self::Complex => "ЖК",
      Self::YearBuilt => "Год постройки",
      Self::EstateKind => "Тип недвижимости",
      Self::PlotSize => "Размер участка",
      Self::PlotArea => "Площадь участка",
      Self::HouseArea => "Площадь дома",
      Self::DriveIn => "Заезд авто",
      Self::Purpose => "Целевое назначение",
      Self::Position => "Расположение",
      Self::PremisesArea => "Площадь помещения",
      Self::Vat => "Учёт НДС",
      Self::Owner => "Собственник",
    }
  }

  pub fn key(self) -> &'static str {
    match self {
      Self::Deal => "deal",
      Self::District => "district",
      Self::Rooms => "rooms",
      Self::Area => "area",
      Self::Floor => "floor",
      Self::FloorCount => "floor_count",
      Self::Condition => "condition",
      Self::Material => "material",
      Self::Bathrooms => "bathrooms",
      Self::Landmark => "landmark",
      Self::Price => "price",
      Self::Extra => "extra",
      Self::Complex => "complex",
      Self::YearBuilt => "year_built",
      Self::EstateKind => "estate_kind",
      Self::PlotSize => "plot_size",
      Self::PlotArea => "plot_area",
      Self::HouseArea => "house_area",
      Self::DriveIn => "drive_in",
      Self::Purpose => "purpose",
      Self::Position => "position",
      Self::PremisesArea => "premises_area",
      Self::Vat => "vat",
      Self::Owner => "owner",
    }
  }

  pub fn from_key(key: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|field| field.key() == key)
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
  Number(u32),
  Text(String),
  List(Vec<String>),
}

impl FieldValue {
  pub fn is_empty(&self) -> bool {
    match self {
      Self::Number(_) => false,
      Self::Text(text) => text.trim().is_empty(),
      Self::List(items) => items.is_empty(),
    }
  }

  /// Display form; lists are comma-joined.
  pub fn display(&self) -> String {
    match self {
      Self::Number(value) => value.to_string(),
      Self::Text(text) => text.clone(),
      Self::List(items) => items.join(", "),
    }
  }
}

/// Attribute values keyed by canonical field. Empty values count as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingFields(BTreeMap<Field, FieldValue>);

impl ListingFields {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn get(&self, field: Field) -> Option<&FieldValue> {
    self.0.get(&field).filter(|value| !value.is_empty())
  }

  pub fn text(&self, field: Field) -> Option<String> {
    self.get(field).map(FieldValue::display)
  }

  pub fn list(&self, field: Field) -> Vec<String> {
    match self.get(field) {
      Some(FieldValue::List(items)) => items.clone(),
      Some(other) => vec![other.display()],
      None => Vec::new(),
    }
  }

  pub fn contains(&self, field: Field) -> bool {
    self.get(field).is_some()
  }

  pub fn set(&mut self, field: Field, value: FieldValue) {
    if value.is_empty() {
      self.0.remove(&field);
    } else {
      self.0.insert(field, value);
    }
  }

  pub fn set_text(&mut self, field: Field, value: impl Into<String>) {
    self.set(field, FieldValue::Text(value.into()));
  }

  pub fn remove(&mut self, field: Field) -> Option<FieldValue> {
    self.0.remove(&field)
  }

  pub fn clear(&mut self) {
    self.0.clear();
  }

  pub fn iter(&self) -> impl Iterator<Item = (Field, &FieldValue)> {
    self.0.iter().map(|(field, value)| (*field, value))
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "file_id")]
pub enum MediaRef {
  Photo(String),
  Video(String),
}

impl MediaRef {
  pub fn file_id(&self) -> &str {
    match self {
      Self::Photo(id) | Self::Video(id) => id,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
  Active,
  Inactive,
}

impl ListingStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Active => "active",
      Self::Inactive => "inactive",
    }
  }

  pub fn parse(raw: &str) -> Option<Self> {
    match raw {
      "active" => Some(Self::Active),
      "inactive" => Some(Self::Inactive),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRecord {
  pub object_code: String,
  pub realtor_code: String,
  pub property_type: PropertyType,
  pub deal: DealType,
  pub fields: ListingFields,
  pub price: String,
  pub old_price: Option<String>,
  pub initial_price: String,
  pub status: ListingStatus,
  pub media: Vec<MediaRef>,
  pub message_ids: Vec<i32>,
  pub repost_date: Option<DateTime<Utc>>,
  pub updated_at: Option<DateTime<Utc>>,
}

impl ListingRecord {
  pub fn is_active(&self) -> bool {
    self.status == ListingStatus::Active
  }

  /// Render-ready projection with an explicit badge decision.
  pub fn view(&self, hot: bool) -> ListingView<'_> {
    ListingView {
      object_code: &self.object_code,
      realtor_code: &self.realtor_code,
      property_type: Some(self.property_type),
      deal: Some(self.deal),
      fields: &self.fields,
      price: Some(self.price.as_str()),
      old_price: if hot { self.old_price.as_deref() } else { None },
    }
  }
}

/// Borrowed input of the caption composer. Drafts and stored records both
/// project into it, so a half-filled draft renders the same way a record does.
#[derive(Debug, Clone, Copy)]
pub struct ListingView<'a> {
  pub object_code: &'a str,
  pub realtor_code: &'a str,
  pub property_type: Option<PropertyType>,
  pub deal: Option<DealType>,
  pub fields: &'a ListingFields,
  pub price: Option<&'a str>,
  /// Present only when the hot badge is active.
  pub old_price: Option<&'a str>,
}

#[cfg(test)]
mod tests {
  use super::DealType;
  use super::Field;
  use super::FieldValue;
  use super::ListingFields;
  use super::MediaRef;
  use super::PropertyType;

  #[test]
  fn keys_round_trip_for_every_field() {
    for field in Field::ALL {
      assert_eq!(Field::from_key(field.key()), Some(field));
    }
    assert_eq!(PropertyType::from_key("land"), Some(PropertyType::Land));
    assert_eq!(DealType::from_key("rent"), Some(DealType::Rent));
    assert_eq!(DealType::from_key("lease"), None);
  }

  #[test]
  fn empty_values_are_treated_as_absent() {
    let mut fields = ListingFields::new();
    fields.set_text(Field::Landmark, "  ");
    assert!(!fields.contains(Field::Landmark));

    fields.set(Field::Purpose, FieldValue::List(vec!["Офис".into(), "Склад".into()]));
    assert_eq!(fields.text(Field::Purpose).as_deref(), Some("Офис, Склад"));
  }

  #[test]
  fn fields_serialize_with_canonical_keys() {
    let mut fields = ListingFields::new();
    fields.set(Field::Rooms, FieldValue::Number(3));
    fields.set_text(Field::District, "Юнусабадский");
    let json = serde_json::to_string(&fields).unwrap();
    assert!(json.contains("\"rooms\":3"));
    let back: ListingFields = serde_json::from_str(&json).unwrap();
    assert_eq!(back, fields);

    let media = MediaRef::Video("abc".into());
    assert_eq!(media.file_id(), "abc");
  }
}
