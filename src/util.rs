use teloxide::types::Message;
use teloxide::types::User;

pub fn truncate_button_text(text: &str, max_chars: usize) -> String {
  if text.chars().count() <= max_chars {
    return text.to_string();
  }

  let guarded = max_chars.saturating_sub(1);
  if guarded == 0 {
    return "…".to_string();
  }

  let truncated: String = text.chars().take(guarded).collect();
  format!("{}…", truncated.trim_end())
}

/// Trimmed, non-empty text or caption of a message.
pub fn message_text(msg: &Message) -> Option<&str> {
  msg.text().or_else(|| msg.caption()).map(str::trim).filter(|text| !text.is_empty())
}

/// "@username" when there is one, otherwise the full name.
pub fn user_handle(user: &User) -> String {
  match user.username.as_deref() {
    Some(username) => format!("@{username}"),
    None => user.full_name(),
  }
}

#[cfg(test)]
mod tests {
  use super::truncate_button_text;

  #[test]
  fn short_labels_pass_through() {
    assert_eq!(truncate_button_text("Район: Чиланзар", 40), "Район: Чиланзар");
  }

  #[test]
  fn long_labels_are_cut_by_characters() {
    let label = truncate_button_text("Ориентир: напротив торгового центра Самарканд Дарвоза", 20);
    assert_eq!(label, "Ориентир: напротив…");
    assert!(label.chars().count() <= 20);
  }

  #[test]
  fn zero_budget_yields_ellipsis() {
    assert_eq!(truncate_button_text("abc", 1), "…");
  }
}
