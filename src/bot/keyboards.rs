use teloxide::types::ButtonRequest;
use teloxide::types::InlineKeyboardButton;
use teloxide::types::InlineKeyboardMarkup;
use teloxide::types::KeyboardButton;
use teloxide::types::KeyboardMarkup;

use crate::listing::DealType;
use crate::listing::Field;
use crate::listing::ListingDraft;
use crate::listing::PropertyType;
use crate::models::Employee;
use crate::util::truncate_button_text;

const BUTTON_TEXT_LIMIT: usize = 40;
const NAV_BUTTONS_PER_ROW: usize = 8;

pub fn property_type_label(kind: PropertyType) -> &'static str {
  match kind {
    PropertyType::OldStock => "Старый фонд",
    PropertyType::NewStock => "Новый фонд",
    PropertyType::Land => "Участок",
    PropertyType::Commercial => "Коммерция",
  }
}

fn field_button_label(draft: &ListingDraft, field: Field) -> String {
  let marker = if draft.schema().is_required(field) { "*" } else { "" };
  let label = match draft.value_of(field) {
    Some(value) => format!("{}{marker}: {value}", field.label()),
    None => format!("{}{marker}", field.label()),
  };
  truncate_button_text(&label, BUTTON_TEXT_LIMIT)
}

/// Main wizard view.
pub fn edit_keyboard(draft: &ListingDraft) -> InlineKeyboardMarkup {
  let schema = draft.schema();
  let mut rows = Vec::new();

  rows.push(
    PropertyType::ALL
      .iter()
      .map(|kind| {
        let label = property_type_label(*kind);
        let text = if *kind == draft.property_type {
          format!("• {label}")
        } else {
          label.to_string()
        };
        InlineKeyboardButton::callback(text, format!("ad:type:{}", kind.key()))
      })
      .collect::<Vec<_>>(),
  );

  rows.push(vec![InlineKeyboardButton::callback(
    field_button_label(draft, Field::Deal),
    "ad:menu:deal".to_string(),
  )]);

  for (field, _) in schema.menu {
    rows.push(vec![InlineKeyboardButton::callback(
      field_button_label(draft, *field),
      format!("ad:menu:{}", field.key()),
    )]);
  }

  for chunk in schema.manual.chunks(2) {
    rows.push(
      chunk
        .iter()
        .map(|field| InlineKeyboardButton::callback(field_button_label(draft, *field), format!("ad:input:{}", field.key())))
        .collect::<Vec<_>>(),
    );
  }

  rows.push(vec![
    InlineKeyboardButton::callback("✅ Опубликовать", "ad:publish".to_string()),
    InlineKeyboardButton::callback("❌ Отмена", "ad:cancel".to_string()),
  ]);

  InlineKeyboardMarkup::new(rows)
}

pub fn deal_keyboard(current: Option<DealType>) -> InlineKeyboardMarkup {
  let mut rows: Vec<Vec<InlineKeyboardButton>> = DealType::ALL
    .iter()
    .map(|deal| {
      let text = if Some(*deal) == current {
        format!("• {}", deal.tag())
      } else {
        deal.tag().to_string()
      };
      vec![InlineKeyboardButton::callback(text, format!("ad:deal:{}", deal.key()))]
    })
    .collect();
  rows.push(back_row());
  InlineKeyboardMarkup::new(rows)
}

/// Single-choice menu for `field`; picking returns to the main view.
pub fn choice_keyboard(field: Field, choices: &[&str], current: Option<&str>) -> InlineKeyboardMarkup {
  let mut rows: Vec<Vec<InlineKeyboardButton>> = choices
    .iter()
    .enumerate()
    .map(|(index, choice)| {
      let text = if Some(*choice) == current {
        format!("• {choice}")
      } else {
        (*choice).to_string()
      };
      vec![InlineKeyboardButton::callback(
        truncate_button_text(&text, BUTTON_TEXT_LIMIT),
        format!("ad:pick:{}:{index}", field.key()),
      )]
    })
    .collect();
  rows.push(back_row());
  InlineKeyboardMarkup::new(rows)
}

/// Multi-select menu for the commercial purpose field.
pub fn purpose_keyboard(choices: &[&str], chosen: &[String]) -> InlineKeyboardMarkup {
  let mut rows: Vec<Vec<InlineKeyboardButton>> = choices
    .iter()
    .enumerate()
    .map(|(index, choice)| {
      let text = if chosen.iter().any(|selected| selected == choice) {
        format!("✅ {choice}")
      } else {
        (*choice).to_string()
      };
      vec![InlineKeyboardButton::callback(text, format!("ad:purpose:{index}"))]
    })
    .collect();
  rows.push(vec![InlineKeyboardButton::callback("Готово", "ad:back".to_string())]);
  InlineKeyboardMarkup::new(rows)
}

fn back_row() -> Vec<InlineKeyboardButton> {
  vec![InlineKeyboardButton::callback("⬅️ Назад", "ad:back".to_string())]
}

/// Controls under one owner preview, with page navigation on the last one.
pub fn listing_controls(object_code: &str, nav: Option<(usize, usize)>) -> InlineKeyboardMarkup {
  let mut rows = vec![
    vec![
      InlineKeyboardButton::callback("🗑 Удалить", format!("my:del:{object_code}")),
      InlineKeyboardButton::callback("🔁 Репост", format!("my:repost:{object_code}")),
    ],
    vec![InlineKeyboardButton::callback(
      "📉 Снизить цену + репост",
      format!("my:down:{object_code}"),
    )],
    vec![InlineKeyboardButton::callback("📈 Поднять цену", format!("my:up:{object_code}"))],
  ];
  if let Some((page, pages)) = nav {
    rows.extend(page_rows(page, pages));
  }
  InlineKeyboardMarkup::new(rows)
}

fn page_rows(page: usize, pages: usize) -> Vec<Vec<InlineKeyboardButton>> {
  if pages <= 1 {
    return Vec::new();
  }
  let buttons: Vec<InlineKeyboardButton> = (0 .. pages)
    .map(|index| {
      let text = if index == page {
        format!("· {} ·", index + 1)
      } else {
        (index + 1).to_string()
      };
      InlineKeyboardButton::callback(text, format!("my:page:{index}"))
    })
    .collect();
  buttons
    .chunks(NAV_BUTTONS_PER_ROW)
    .map(|chunk| chunk.to_vec())
    .collect()
}

pub fn employees_keyboard(employees: &[Employee]) -> InlineKeyboardMarkup {
  let mut rows: Vec<Vec<InlineKeyboardButton>> = employees
    .iter()
    .map(|employee| {
      vec![InlineKeyboardButton::callback(
        truncate_button_text(&format!("❌ {}", employee.display_name), BUTTON_TEXT_LIMIT),
        format!("acc:revoke:{}", employee.tg_id),
      )]
    })
    .collect();
  rows.push(vec![InlineKeyboardButton::callback("Готово", "acc:done".to_string())]);
  InlineKeyboardMarkup::new(rows)
}

pub fn contact_request_keyboard() -> KeyboardMarkup {
  KeyboardMarkup::new(vec![vec![
    KeyboardButton::new("📱 Отправить номер").request(ButtonRequest::Contact),
  ]])
  .resize_keyboard()
  .one_time_keyboard()
}

#[cfg(test)]
mod tests {
  use teloxide::types::InlineKeyboardButtonKind;
  use teloxide::types::InlineKeyboardMarkup;

  use super::choice_keyboard;
  use super::edit_keyboard;
  use super::listing_controls;
  use super::purpose_keyboard;
  use crate::listing::Field;
  use crate::listing::ListingDraft;
  use crate::listing::PropertyType;

  fn texts(markup: &InlineKeyboardMarkup) -> Vec<String> {
    markup
      .inline_keyboard
      .iter()
      .flatten()
      .map(|button| button.text.clone())
      .collect()
  }

  fn data(markup: &InlineKeyboardMarkup) -> Vec<String> {
    markup
      .inline_keyboard
      .iter()
      .flatten()
      .filter_map(|button| match &button.kind {
        InlineKeyboardButtonKind::CallbackData(data) => Some(data.clone()),
        _ => None,
      })
      .collect()
  }

  #[test]
  fn edit_view_marks_current_type_and_required_fields() {
    let mut draft = ListingDraft::new("1001");
    draft.fields.set_text(Field::District, "Чиланзар");
    let markup = edit_keyboard(&draft);
    let texts = texts(&markup);
    assert!(texts.contains(&"• Старый фонд".to_string()));
    assert!(texts.contains(&"Район*: Чиланзар".to_string()));
    assert!(texts.iter().any(|text| text.starts_with("Цена*")));
    assert_eq!(texts.last().map(String::as_str), Some("❌ Отмена"));

    let data = data(&markup);
    assert!(data.contains(&"ad:type:land".to_string()));
    assert!(data.contains(&"ad:input:price".to_string()));
    assert!(data.iter().all(|entry| entry.len() <= 64));
  }

  #[test]
  fn manual_fields_are_laid_out_two_per_row() {
    let mut draft = ListingDraft::new("1001");
    draft.set_property_type(PropertyType::Land);
    let markup = edit_keyboard(&draft);
    let manual_rows = markup
      .inline_keyboard
      .iter()
      .filter(|row| {
        row.iter().any(|button| {
          matches!(&button.kind, InlineKeyboardButtonKind::CallbackData(data) if data.starts_with("ad:input:"))
        })
      })
      .collect::<Vec<_>>();
    assert!(!manual_rows.is_empty());
    assert!(manual_rows.iter().all(|row| row.len() <= 2));
  }

  #[test]
  fn choice_and_purpose_menus_mark_selection() {
    let markup = choice_keyboard(Field::Condition, &["Евроремонт", "Средний"], Some("Средний"));
    assert_eq!(texts(&markup), vec!["Евроремонт", "• Средний", "⬅️ Назад"]);
    assert_eq!(data(&markup)[1], "ad:pick:condition:1");

    let markup = purpose_keyboard(&["Офис", "Склад"], &["Склад".to_string()]);
    assert_eq!(texts(&markup), vec!["Офис", "✅ Склад", "Готово"]);
  }

  #[test]
  fn navigation_rows_hold_at_most_eight_pages() {
    let markup = listing_controls("42", Some((9, 12)));
    let nav_rows: Vec<_> = markup
      .inline_keyboard
      .iter()
      .filter(|row| {
        row.iter().all(|button| {
          matches!(&button.kind, InlineKeyboardButtonKind::CallbackData(data) if data.starts_with("my:page:"))
        })
      })
      .collect();
    assert_eq!(nav_rows.len(), 2);
    assert_eq!(nav_rows[0].len(), 8);
    assert_eq!(nav_rows[1].len(), 4);
    assert_eq!(nav_rows[1][1].text, "· 10 ·");

    let single = listing_controls("42", Some((0, 1)));
    assert_eq!(single.inline_keyboard.len(), 3);
  }
}
