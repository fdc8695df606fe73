//! HTML caption rendering for channel posts and owner previews.

use teloxide::utils::html::escape;

use crate::listing::deeplink::inquiry_url;
use crate::listing::format::format_bathrooms;
use crate::listing::format::format_floors;
use crate::listing::model::DealType;
use crate::listing::model::Field;
use crate::listing::model::FieldValue;
use crate::listing::model::ListingView;
use crate::listing::model::PropertyType;

pub const CAPTION_LIMIT: usize = 1024;
pub const CAPTION_CUT: usize = 1000;
pub const ELLIPSIS: &str = "…";

const HOT_BADGE: &str = "🔥Цена снижена";
const LIST_JOIN: &str = " l ";
const MAX_ENTITY_LEN: usize = 8;

#[derive(Debug, Clone)]
pub struct CaptionContext {
  pub bot_username: String,
  pub link_host: String,
}

/// Full channel caption, capped to the platform limit.
pub fn compose(view: &ListingView<'_>, ctx: &CaptionContext) -> String {
  truncate(&render(view, ctx))
}

/// Owner-facing variant without hyperlinks.
pub fn compose_compact(view: &ListingView<'_>, ctx: &CaptionContext) -> String {
  let full = render(view, ctx);
  let kept = full.lines().filter(|line| !line.contains("<a href"));
  let compact = collapse_blank_lines(kept.map(str::to_string).collect());
  truncate(compact.trim_end())
}

/// Cuts an over-long caption at `CAPTION_CUT` characters.
///
/// Tags and entities are never split, and tags still open at the cut are
/// closed after the ellipsis so the result stays valid HTML.
pub fn truncate(caption: &str) -> String {
  if caption.chars().count() <= CAPTION_LIMIT {
    return caption.to_string();
  }

  let mut head = String::with_capacity(caption.len());
  let mut open: Vec<&str> = Vec::new();
  let mut used = 0;
  let mut rest = caption;
  while let Some(first) = rest.chars().next() {
    let token = &rest[.. token_len(rest, first)];
    let width = token.chars().count();
    if used + width > CAPTION_CUT {
      break;
    }
    if first == '<' {
      track_tag(&mut open, token);
    }
    head.push_str(token);
    used += width;
    rest = &rest[token.len() ..];
  }

  let mut cut = format!("{}{ELLIPSIS}", head.trim_end());
  for name in open.iter().rev() {
    cut.push_str(&format!("</{name}>"));
  }
  cut
}

/// Byte length of the markup unit starting at `rest`.
fn token_len(rest: &str, first: char) -> usize {
  match first {
    '<' => rest.find('>').map_or(rest.len(), |end| end + 1),
    '&' => rest
      .find(';')
      .filter(|&end| end <= MAX_ENTITY_LEN && rest[1 .. end].chars().all(is_entity_char))
      .map_or(1, |end| end + 1),
    _ => first.len_utf8(),
  }
}

fn is_entity_char(c: char) -> bool {
  c.is_ascii_alphanumeric() || c == '#'
}

fn track_tag<'a>(open: &mut Vec<&'a str>, tag: &'a str) {
  let inner = tag.trim_start_matches('<').trim_end_matches('>');
  if let Some(name) = inner.strip_prefix('/') {
    if open.last() == Some(&name.trim()) {
      open.pop();
    }
  } else if let Some(name) = inner.split_whitespace().next() {
    open.push(name);
  }
}

struct Values<'a> {
  view: &'a ListingView<'a>,
}

impl Values<'_> {
  fn text(&self, field: Field) -> Option<String> {
    self.view.fields.text(field).map(|value| escape(&value))
  }

  fn number(&self, field: Field) -> Option<u64> {
    match self.view.fields.get(field)? {
      FieldValue::Number(value) => Some(u64::from(*value)),
      FieldValue::Text(text) => text.trim().parse().ok(),
      FieldValue::List(_) => None,
    }
  }
}

fn render(view: &ListingView<'_>, ctx: &CaptionContext) -> String {
  let property_type = view.property_type.unwrap_or_default();
  let values = Values { view };
  let hot_old_price = view.old_price.filter(|old| !old.trim().is_empty());

  let mut title = format!("#{}", property_type.tag());
  if let Some(deal) = view.deal {
    title.push_str(&format!(" #{}", deal.tag()));
  }
  let mut lines = vec![title];
  if hot_old_price.is_some() {
    lines.push(HOT_BADGE.to_string());
  }
  lines.push(String::new());

  let body = match property_type {
    PropertyType::OldStock | PropertyType::NewStock => apartment_lines(property_type, &values),
    PropertyType::Land => land_lines(&values),
    PropertyType::Commercial => commercial_lines(&values),
  };
  lines.extend(body.into_iter().flatten());

  let vat = (property_type == PropertyType::Commercial && view.deal == Some(DealType::Rent))
    .then(|| values.text(Field::Vat))
    .flatten();
  if let Some(price_line) = price_line(view.price, hot_old_price, vat.as_deref()) {
    lines.push(price_line);
  }

  if let Some(extra) = values.text(Field::Extra) {
    lines.push(String::new());
    lines.push("Дополнительно:".to_string());
    lines.push(extra);
  }

  let url = inquiry_url(&ctx.link_host, &ctx.bot_username, view.object_code, view.realtor_code);
  lines.push(String::new());
  lines.push(format!("Код объекта: {}", escape(view.object_code)));
  lines.push(String::new());
  lines.push(format!("<a href=\"{}\">Оставить заявку</a>", escape(&url)));

  let stripped = lines.into_iter().map(|line| strip_join_artifacts(&line)).collect();
  collapse_blank_lines(stripped)
}

fn apartment_lines(property_type: PropertyType, values: &Values<'_>) -> Vec<Option<String>> {
  let icon = if property_type == PropertyType::NewStock {
    "🏢"
  } else {
    "🏠"
  };
  let kind = match values.text(Field::Rooms) {
    Some(rooms) => format!("{rooms} - комнатная квартира"),
    None => "квартира".to_string(),
  };
  let summary = format!("{icon} {}", join_l([Some(kind), values.text(Field::Area)]));

  let key_line = if property_type == PropertyType::NewStock {
    key_line(values.text(Field::Complex), values.text(Field::YearBuilt))
  } else {
    None
  };

  let bathrooms = values.text(Field::Bathrooms).map(|value| format_bathrooms(&value));
  let condition = join_l([values.text(Field::Condition), bathrooms]);

  vec![
    Some(summary),
    location_line(values),
    key_line,
    floor_line(values),
    prefixed("🔧", condition),
  ]
}

fn land_lines(values: &Values<'_>) -> Vec<Option<String>> {
  let kind = values
    .text(Field::EstateKind)
    .unwrap_or_else(|| "Земельный участок".to_string());
  let summary = match values.text(Field::PlotArea) {
    Some(area) => format!("🏡 {kind} | {area}"),
    None => format!("🏡 {kind}"),
  };

  let house = join_l([
    values.text(Field::Material).map(|material| capitalize(&material)),
    values.text(Field::HouseArea).map(|area| format!("Площадь дома: {area}")),
  ]);
  let condition = join_l([
    values.text(Field::Condition),
    values.number(Field::FloorCount).map(format_floors),
  ]);

  let drive_in = values.text(Field::DriveIn);
  let plot_size = values.text(Field::PlotSize).map(|size| {
    if drive_in.is_some() {
      format!("размер участка: {size}")
    } else {
      format!("Размер участка: {size}")
    }
  });
  let drive_in = drive_in.map(|value| {
    if value == "Есть" {
      "Заезд авто".to_string()
    } else {
      "Заезд авто отсутствует".to_string()
    }
  });

  vec![
    Some(summary),
    location_line(values),
    prefixed("🏗", house),
    prefixed("🔧", condition),
    prefixed("🚗", join_l([drive_in, plot_size])),
  ]
}

fn commercial_lines(values: &Values<'_>) -> Vec<Option<String>> {
  let purposes = values.text(Field::Purpose);
  let position = values.text(Field::Position);
  let floors = match (values.text(Field::Floor), values.text(Field::FloorCount)) {
    (Some(floor), Some(count)) => Some(format!("этаж {floor} из {count}")),
    (Some(floor), None) => Some(format!("этаж {floor}")),
    _ => None,
  };
  let floors = if position.is_none() {
    floors.map(|text| capitalize(&text))
  } else {
    floors
  };

  let space = join_l([
    values.text(Field::PremisesArea).map(|area| format!("Помещение: {area}")),
    values.text(Field::PlotArea).map(|area| format!("участок: {area}")),
  ]);
  let owner = (values.view.deal == Some(DealType::Rent))
    .then(|| values.text(Field::Owner))
    .flatten()
    .map(|owner| format!("👨‍💼 Собственник: {owner}"));

  vec![
    purposes.map(|purposes| format!("🏬 {purposes}")),
    location_line(values),
    prefixed("📪", join_l([position, floors])),
    prefixed("🏗", space),
    owner,
  ]
}

fn location_line(values: &Values<'_>) -> Option<String> {
  let district = values.text(Field::District).map(|district| format!("{district} район"));
  let parts: Vec<String> = [district, values.text(Field::Landmark)].into_iter().flatten().collect();
  (!parts.is_empty()).then(|| format!("📍 {}", parts.join(", ")))
}

fn key_line(complex: Option<String>, year: Option<String>) -> Option<String> {
  match (complex, year) {
    (Some(complex), Some(year)) => Some(format!("🔑 {complex}{LIST_JOIN}год постройки: {year}")),
    (Some(complex), None) => Some(format!("🔑 {complex}")),
    (None, Some(year)) => Some(format!("🔑 Год постройки: {year}")),
    (None, None) => None,
  }
}

fn floor_line(values: &Values<'_>) -> Option<String> {
  let material = values.text(Field::Material).map(|material| capitalize(&material));
  let word = if material.is_some() { "этаж" } else { "Этаж" };
  let floors = match (values.text(Field::Floor), values.text(Field::FloorCount)) {
    (Some(floor), Some(count)) => Some(format!("{word} {floor} из {count}")),
    (Some(floor), None) => Some(format!("{word} {floor}")),
    _ => None,
  };
  let joined = match (material, floors) {
    (Some(material), Some(floors)) => Some(format!("{material}, {floors}")),
    (material, floors) => material.or(floors),
  };
  joined.map(|text| format!("🏗 {text}"))
}

fn price_line(price: Option<&str>, old_price: Option<&str>, vat: Option<&str>) -> Option<String> {
  let price = price.filter(|price| !price.trim().is_empty())?;
  let mut line = String::from("💵 ");
  if let Some(old_price) = old_price {
    line.push_str(&format!("<s>{}</s> ", escape(old_price)));
  }
  line.push_str(&format!("<b>{}</b>", escape(price)));
  if let Some(vat) = vat {
    line.push_str(&format!(" <b>{vat}</b>"));
  }
  Some(line)
}

fn join_l<const N: usize>(parts: [Option<String>; N]) -> String {
  parts
    .into_iter()
    .flatten()
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(LIST_JOIN)
}

fn prefixed(icon: &str, text: String) -> Option<String> {
  (!text.is_empty()).then(|| format!("{icon} {text}"))
}

fn capitalize(text: &str) -> String {
  let mut chars = text.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}

fn strip_join_artifacts(line: &str) -> String {
  let mut trimmed = line.trim_end_matches(' ');
  while let Some(rest) = trimmed.strip_suffix(" l") {
    trimmed = rest.trim_end_matches(' ');
  }
  trimmed.to_string()
}

/// Drops leading blanks and every blank line that follows another blank.
fn collapse_blank_lines(lines: Vec<String>) -> String {
  let mut kept: Vec<String> = Vec::with_capacity(lines.len());
  for line in lines {
    let previous_filled = kept.last().is_some_and(|last| !last.is_empty());
    if !line.is_empty() || previous_filled {
      kept.push(line);
    }
  }
  kept.join("\n")
}

#[cfg(test)]
mod tests {
  use super::CAPTION_LIMIT;
  use super::CaptionContext;
  use super::ELLIPSIS;
  use super::compose;
  use super::compose_compact;
  use super::strip_join_artifacts;
  use super::truncate;
  use crate::listing::model::DealType;
  use crate::listing::model::Field;
  use crate::listing::model::FieldValue;
  use crate::listing::model::ListingFields;
  use crate::listing::model::ListingView;
  use crate::listing::model::PropertyType;

  fn ctx() -> CaptionContext {
    CaptionContext {
      bot_username: "realty_bot".into(),
      link_host: "t.me".into(),
    }
  }

  fn view<'a>(
    property_type: PropertyType,
    deal: DealType,
    fields: &'a ListingFields,
    old_price: Option<&'a str>,
  ) -> ListingView<'a> {
    ListingView {
      object_code: "57",
      realtor_code: "1001",
      property_type: Some(property_type),
      deal: Some(deal),
      fields,
      price: Some("85 000 у.е."),
      old_price,
    }
  }

  fn apartment() -> ListingFields {
    let mut fields = ListingFields::new();
    fields.set(Field::Rooms, FieldValue::Number(3));
    fields.set_text(Field::Area, "78,5 м²");
    fields.set_text(Field::District, "Юнусабадский");
    fields.set_text(Field::Landmark, "Мега Планет");
    fields.set_text(Field::Material, "кирпич");
    fields.set(Field::Floor, FieldValue::Number(4));
    fields.set(Field::FloorCount, FieldValue::Number(9));
    fields.set_text(Field::Condition, "Новый ремонт");
    fields.set(Field::Bathrooms, FieldValue::Number(2));
    fields
  }

  #[test]
  fn renders_old_stock_sale() {
    let fields = apartment();
    let caption = compose(&view(PropertyType::OldStock, DealType::Sale, &fields, None), &ctx());
    let expected = "#Старыйфонд #Продажа\n\
      \n\
      🏠 3 - комнатная квартира l 78,5 м²\n\
      📍 Юнусабадский район, Мега Планет\n\
      🏗 Кирпич, этаж 4 из 9\n\
      🔧 Новый ремонт l 2 санузла\n\
      💵 <b>85 000 у.е.</b>\n\
      \n\
      Код объекта: 57\n\
      \n\
      <a href=\"https://t.me/realty_bot?start=object=57_realtor=1001\">Оставить заявку</a>";
    assert_eq!(caption, expected);
  }

  #[test]
  fn hot_badge_strikes_old_price() {
    let fields = apartment();
    let caption = compose(
      &view(PropertyType::OldStock, DealType::Sale, &fields, Some("100 000 у.е.")),
      &ctx(),
    );
    assert!(caption.starts_with("#Старыйфонд #Продажа\n🔥Цена снижена\n\n"));
    assert!(caption.contains("💵 <s>100 000 у.е.</s> <b>85 000 у.е.</b>"));
  }

  #[test]
  fn new_stock_key_line_variants() {
    let mut fields = apartment();
    fields.set(Field::YearBuilt, FieldValue::Number(2024));
    let caption = compose(&view(PropertyType::NewStock, DealType::Sale, &fields, None), &ctx());
    assert!(caption.contains("🏢 3 - комнатная квартира"));
    assert!(caption.contains("🔑 Год постройки: 2024"));

    fields.set_text(Field::Complex, "Sky City");
    let caption = compose(&view(PropertyType::NewStock, DealType::Sale, &fields, None), &ctx());
    assert!(caption.contains("🔑 Sky City l год постройки: 2024"));
  }

  #[test]
  fn missing_optional_fields_drop_whole_lines() {
    let mut fields = ListingFields::new();
    fields.set_text(Field::District, "Чиланзарский");
    let caption = compose(&view(PropertyType::OldStock, DealType::Rent, &fields, None), &ctx());
    assert!(!caption.contains("Дополнительно:"));
    assert!(!caption.contains("🏗"));
    assert!(!caption.contains("🔧"));
    assert!(caption.contains("🏠 квартира\n📍 Чиланзарский район\n"));
    assert!(!caption.contains("\n\n\n"));
  }

  #[test]
  fn land_layout() {
    let mut fields = ListingFields::new();
    fields.set_text(Field::EstateKind, "Дом");
    fields.set_text(Field::PlotArea, "6 сот");
    fields.set_text(Field::Material, "газоблок");
    fields.set_text(Field::HouseArea, "180 м²");
    fields.set_text(Field::Condition, "Коробка");
    fields.set(Field::FloorCount, FieldValue::Number(2));
    fields.set_text(Field::PlotSize, "20 × 30");
    let caption = compose(&view(PropertyType::Land, DealType::Sale, &fields, None), &ctx());
    assert!(caption.contains("🏡 Дом | 6 сот"));
    assert!(caption.contains("🏗 Газоблок l Площадь дома: 180 м²"));
    assert!(caption.contains("🔧 Коробка l 2 этажа"));
    assert!(caption.contains("🚗 Размер участка: 20 × 30"));

    fields.set_text(Field::DriveIn, "Есть");
    let caption = compose(&view(PropertyType::Land, DealType::Sale, &fields, None), &ctx());
    assert!(caption.contains("🚗 Заезд авто l размер участка: 20 × 30"));
  }

  #[test]
  fn commercial_rent_shows_purposes_vat_and_owner() {
    let mut fields = ListingFields::new();
    fields.set(Field::Purpose, FieldValue::List(vec!["Офис".into(), "Склад".into()]));
    fields.set_text(Field::Vat, "с учетом НДС");
    fields.set_text(Field::Owner, "юр. лицо");
    fields.set(Field::Floor, FieldValue::Number(2));
    fields.set_text(Field::PremisesArea, "120 м²");
    let caption = compose(&view(PropertyType::Commercial, DealType::Rent, &fields, None), &ctx());
    assert!(caption.contains("🏬 Офис, Склад"));
    assert!(caption.contains("📪 Этаж 2"));
    assert!(caption.contains("🏗 Помещение: 120 м²"));
    assert!(caption.contains("👨‍💼 Собственник: юр. лицо"));
    assert!(caption.contains("💵 <b>85 000 у.е.</b> <b>с учетом НДС</b>"));

    let sale = compose(&view(PropertyType::Commercial, DealType::Sale, &fields, None), &ctx());
    assert!(!sale.contains("НДС"));
    assert!(!sale.contains("Собственник"));
  }

  #[test]
  fn extra_info_block_and_escaping() {
    let mut fields = apartment();
    fields.set_text(Field::Extra, "Рядом <школа> & парк");
    let caption = compose(&view(PropertyType::OldStock, DealType::Sale, &fields, None), &ctx());
    assert!(caption.contains("\n\nДополнительно:\nРядом &lt;школа&gt; &amp; парк\n\nКод объекта: 57"));
  }

  #[test]
  fn compact_caption_has_no_links() {
    let fields = apartment();
    let compact = compose_compact(&view(PropertyType::OldStock, DealType::Sale, &fields, None), &ctx());
    assert!(!compact.contains("<a href"));
    assert!(compact.ends_with("Код объекта: 57"));
  }

  #[test]
  fn long_captions_are_cut() {
    let mut fields = apartment();
    fields.set_text(Field::Landmark, "ориентир ".repeat(200));
    let caption = compose(&view(PropertyType::OldStock, DealType::Sale, &fields, None), &ctx());
    assert!(caption.chars().count() <= CAPTION_LIMIT);
    assert!(caption.ends_with(ELLIPSIS));

    let short = compose(&view(PropertyType::OldStock, DealType::Sale, &apartment(), None), &ctx());
    assert!(!short.ends_with(ELLIPSIS));
  }

  /// Every `&` starts a known entity and every tag is closed in order.
  fn assert_valid_html(caption: &str) {
    let mut open: Vec<&str> = Vec::new();
    let mut rest = caption;
    while let Some(index) = rest.find(['<', '&']) {
      rest = &rest[index ..];
      if rest.starts_with('&') {
        let entity = ["&amp;", "&lt;", "&gt;", "&quot;"]
          .into_iter()
          .find(|entity| rest.starts_with(entity))
          .unwrap_or_else(|| panic!("dangling entity at {:?} in {caption:?}", &rest[.. rest.len().min(12)]));
        rest = &rest[entity.len() ..];
      } else {
        let end = rest.find('>').unwrap_or_else(|| panic!("unterminated tag in {caption:?}"));
        let tag = &rest[1 .. end];
        match tag.strip_prefix('/') {
          Some(name) => assert_eq!(open.pop(), Some(name), "mismatched close in {caption:?}"),
          None => open.push(tag.split_whitespace().next().unwrap()),
        }
        rest = &rest[end + 1 ..];
      }
    }
    assert!(open.is_empty(), "unclosed {open:?} in {caption:?}");
  }

  #[test]
  fn cut_never_splits_entities() {
    for prefix in 1 .. 12 {
      let mut fields = apartment();
      fields.set_text(Field::Landmark, format!("{}{}", "x".repeat(prefix), "&".repeat(250)));
      let caption = compose(&view(PropertyType::OldStock, DealType::Sale, &fields, None), &ctx());
      assert!(caption.ends_with(ELLIPSIS));
      assert!(caption.chars().count() <= CAPTION_LIMIT);
      assert_valid_html(&caption);
    }
  }

  #[test]
  fn cut_never_splits_or_leaves_open_tags() {
    for filler in 850 .. 1000 {
      let mut fields = apartment();
      fields.set_text(Field::Landmark, "y".repeat(filler));
      let caption = compose(
        &view(PropertyType::OldStock, DealType::Sale, &fields, Some("100 000 у.е.")),
        &ctx(),
      );
      assert!(caption.chars().count() <= CAPTION_LIMIT);
      assert_valid_html(&caption);
    }
  }

  #[test]
  fn open_tags_are_closed_after_the_ellipsis() {
    let caption = format!("<b>{}</b>", "z".repeat(1100));
    let cut = truncate(&caption);
    assert!(cut.ends_with("…</b>"));
    assert_valid_html(&cut);
  }

  #[test]
  fn strips_trailing_join_marker_only() {
    assert_eq!(strip_join_artifacts("🔧 Коробка l "), "🔧 Коробка");
    assert_eq!(strip_join_artifacts("🔑 Sky Hill"), "🔑 Sky Hill");
  }
}
