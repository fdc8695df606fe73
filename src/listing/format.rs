//! Normalisation of raw wizard input into canonical display values.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ValidationError;
use crate::listing::model::DealType;
use crate::listing::model::Field;
use crate::listing::model::FieldValue;

static AREA_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+(\.\d{1,2})?$").expect("valid regex"));
static PICTOGRAPHS: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"[\x{1F300}-\x{1FAFF}\x{2600}-\x{27BF}\x{FE0F}]+").expect("valid regex"));
static COMPLEX_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9\s\-]+$").expect("valid regex"));

pub const MIN_PRICE_DIGITS: usize = 5;
pub const MAX_EXTRA_CHARS: usize = 100;
pub const CURRENCY_SUFFIX: &str = " у.е.";

/// Picks the Russian noun form agreeing with `number`.
pub fn decline_ru<'a>(number: u64, one: &'a str, two: &'a str, five: &'a str) -> &'a str {
  let last = number % 10;
  let last_two = number % 100;
  if last == 1 && last_two != 11 {
    one
  } else if (2 ..= 4).contains(&last) && !(12 ..= 14).contains(&last_two) {
    two
  } else {
    five
  }
}

pub fn format_floors(count: u64) -> String {
  format!("{count} {}", decline_ru(count, "этаж", "этажа", "этажей"))
}

/// Numeric bathroom counts are declined; menu strings pass through.
pub fn format_bathrooms(value: &str) -> String {
  let trimmed = value.trim();
  match parse_digits(trimmed) {
    Some(count) => format!("{count} {}", decline_ru(count, "санузел", "санузла", "санузлов")),
    None => trimmed.to_string(),
  }
}

pub fn format_area(raw: &str, plot: bool) -> Result<String, ValidationError> {
  let normalized = raw.trim().replace(',', ".");
  if !AREA_PATTERN.is_match(&normalized) {
    return Err(if plot { ValidationError::PlotArea } else { ValidationError::Area });
  }
  let suffix = if plot { " сот" } else { " м²" };
  Ok(format!("{}{suffix}", normalized.replace('.', ",")))
}

pub fn parse_integer(raw: &str) -> Result<u32, ValidationError> {
  parse_digits(raw.trim())
    .and_then(|value| u32::try_from(value).ok())
    .ok_or(ValidationError::Integer)
}

pub fn parse_year(raw: &str) -> Result<u32, ValidationError> {
  let trimmed = raw.trim();
  if trimmed.len() != 4 {
    return Err(ValidationError::Year);
  }
  parse_integer(trimmed).map_err(|_| ValidationError::Year)
}

/// Keeps only the digits and renders them as "123 000 у.е.".
pub fn format_price(raw: &str, deal: Option<DealType>) -> Result<String, ValidationError> {
  let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
  if digits.len() < MIN_PRICE_DIGITS && deal != Some(DealType::Rent) {
    return Err(ValidationError::PriceTooShort);
  }
  if digits.is_empty() {
    return Err(ValidationError::PriceMissing);
  }
  Ok(format!("{}{CURRENCY_SUFFIX}", group_thousands(&digits)))
}

pub fn clean_extra(raw: &str) -> Result<String, ValidationError> {
  let cleaned = PICTOGRAPHS.replace_all(raw, "").trim().to_string();
  if cleaned.chars().count() > MAX_EXTRA_CHARS {
    return Err(ValidationError::ExtraTooLong);
  }
  Ok(cleaned)
}

pub fn validate_complex(raw: &str) -> Result<String, ValidationError> {
  let trimmed = raw.trim();
  if !COMPLEX_NAME.is_match(trimmed) {
    return Err(ValidationError::ComplexName);
  }
  Ok(trimmed.to_string())
}

pub fn format_plot_size(length: u32, width: u32) -> String {
  format!("{length} × {width}")
}

/// Validates free-text input for `field`.
///
/// `Field::PlotSize` is captured in two steps by the wizard and never reaches
/// this function; everything else maps to exactly one formatter.
pub fn format_input(field: Field, raw: &str, deal: Option<DealType>) -> Result<FieldValue, ValidationError> {
  match field {
    Field::PlotArea => format_area(raw, true).map(FieldValue::Text),
    Field::Area | Field::HouseArea | Field::PremisesArea => format_area(raw, false).map(FieldValue::Text),
    Field::Price => format_price(raw, deal).map(FieldValue::Text),
    Field::YearBuilt => parse_year(raw).map(FieldValue::Number),
    Field::Rooms | Field::Floor | Field::FloorCount | Field::Bathrooms => parse_integer(raw).map(FieldValue::Number),
    Field::Extra => clean_extra(raw).map(FieldValue::Text),
    Field::Complex => validate_complex(raw).map(FieldValue::Text),
    _ => {
      let trimmed = raw.trim();
      if trimmed.is_empty() {
        return Err(ValidationError::EmptyText);
      }
      Ok(FieldValue::Text(trimmed.to_string()))
    },
  }
}

fn parse_digits(raw: &str) -> Option<u64> {
  if raw.is_empty() || !raw.chars().all(|ch| ch.is_ascii_digit()) {
    return None;
  }
  raw.parse().ok()
}

fn group_thousands(digits: &str) -> String {
  let significant = digits.trim_start_matches('0');
  let significant = if significant.is_empty() { "0" } else { significant };
  let len = significant.len();
  let mut out = String::with_capacity(len + len / 3);
  for (index, ch) in significant.chars().enumerate() {
    if index > 0 && (len - index) % 3 == 0 {
      out.push(' ');
    }
    out.push(ch);
  }
  out
}

#[cfg(test)]
mod tests {
  use super::clean_extra;
  use super::decline_ru;
  use super::format_area;
  use super::format_bathrooms;
  use super::format_floors;
  use super::format_input;
  use super::format_plot_size;
  use super::format_price;
  use super::parse_integer;
  use super::parse_year;
  use super::validate_complex;
  use crate::error::ValidationError;
  use crate::listing::model::DealType;
  use crate::listing::model::Field;
  use crate::listing::model::FieldValue;

  #[test]
  fn area_accepts_comma_and_dot() {
    assert_eq!(format_area("12.5", false).unwrap(), "12,5 м²");
    assert_eq!(format_area("12,5", false).unwrap(), "12,5 м²");
    assert_eq!(format_area("6", true).unwrap(), "6 сот");
    assert_eq!(format_area("12.555", false), Err(ValidationError::Area));
    assert_eq!(format_area("abc", true), Err(ValidationError::PlotArea));
  }

  #[test]
  fn bathrooms_follow_plural_rules() {
    assert_eq!(format_bathrooms("1"), "1 санузел");
    assert_eq!(format_bathrooms("2"), "2 санузла");
    assert_eq!(format_bathrooms("4"), "4 санузла");
    assert_eq!(format_bathrooms("5"), "5 санузлов");
    assert_eq!(format_bathrooms("11"), "11 санузлов");
    assert_eq!(format_bathrooms("раздельный санузел"), "раздельный санузел");
  }

  #[test]
  fn floors_decline_with_teens_exception() {
    let cases = [(1, "этаж"), (2, "этажа"), (5, "этажей"), (11, "этажей"), (21, "этаж"), (22, "этажа")];
    for (count, word) in cases {
      assert_eq!(decline_ru(count, "этаж", "этажа", "этажей"), word, "count {count}");
    }
    assert_eq!(decline_ru(12, "этаж", "этажа", "этажей"), "этажей");
    assert_eq!(decline_ru(114, "этаж", "этажа", "этажей"), "этажей");
    assert_eq!(format_floors(3), "3 этажа");
  }

  #[test]
  fn price_requires_five_digits_except_rent() {
    assert_eq!(format_price("123000", Some(DealType::Sale)).unwrap(), "123 000 у.е.");
    assert_eq!(format_price("$ 1,250,000", None).unwrap(), "1 250 000 у.е.");
    assert_eq!(format_price("9000", Some(DealType::Sale)), Err(ValidationError::PriceTooShort));
    assert_eq!(format_price("900", Some(DealType::Rent)).unwrap(), "900 у.е.");
    assert_eq!(format_price("договорная", Some(DealType::Rent)), Err(ValidationError::PriceMissing));
  }

  #[test]
  fn integers_and_years() {
    assert_eq!(parse_integer("3"), Ok(3));
    assert_eq!(parse_integer("3.5"), Err(ValidationError::Integer));
    assert_eq!(parse_integer(""), Err(ValidationError::Integer));
    assert_eq!(parse_year("2024"), Ok(2024));
    assert_eq!(parse_year("24"), Err(ValidationError::Year));
    assert_eq!(parse_year("20a4"), Err(ValidationError::Year));
  }

  #[test]
  fn extra_info_strips_pictographs_and_caps_length() {
    assert_eq!(clean_extra("Тихий двор 🌳☀️").unwrap(), "Тихий двор");
    let long = "а".repeat(101);
    assert_eq!(clean_extra(&long), Err(ValidationError::ExtraTooLong));
    assert!(clean_extra(&"б".repeat(100)).is_ok());
  }

  #[test]
  fn complex_name_must_be_latin() {
    assert_eq!(validate_complex(" Sky City-2 ").unwrap(), "Sky City-2");
    assert_eq!(validate_complex("Небо"), Err(ValidationError::ComplexName));
  }

  #[test]
  fn dispatches_by_field() {
    assert_eq!(
      format_input(Field::Rooms, "2", None),
      Ok(FieldValue::Number(2))
    );
    assert_eq!(
      format_input(Field::PremisesArea, "120", None),
      Ok(FieldValue::Text("120 м²".into()))
    );
    assert_eq!(
      format_input(Field::Landmark, "  ", None),
      Err(ValidationError::EmptyText)
    );
    assert_eq!(format_plot_size(20, 30), "20 × 30");
  }
}
