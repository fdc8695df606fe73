use serde::Deserialize;
use serde::Serialize;

use crate::listing::Field;
use crate::listing::ListingDraft;
use crate::listing::pricing::RepriceIntent;
use crate::service::inquiries::InquiryTicket;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case", tag = "kind", content = "data")]
pub enum ConversationState {
  #[default]
  Idle,
  CollectingMedia(ListingDraft),
  Editing(WizardSession),
  InquiryName {
    ticket: InquiryTicket,
  },
  InquiryPhone {
    ticket: InquiryTicket,
    client_name: String,
  },
  RepriceInput {
    object_code: String,
    intent: RepriceIntent,
  },
  AccessGrant {
    admin_tg_id: i64,
  },
}

/// Listing wizard after the media album has been collected.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WizardSession {
  pub draft: ListingDraft,
  /// Preview album in the realtor's chat; the first one carries the caption.
  pub preview_ids: Vec<i32>,
  /// The preview went out as a plain text message instead of an album.
  pub text_preview: bool,
  /// The "Описание:" message holding the edit keyboard.
  pub panel_id: Option<i32>,
  /// Choice menu currently shown on the panel instead of the main view.
  pub open_menu: Option<Field>,
}

impl WizardSession {
  pub fn new(draft: ListingDraft) -> Self {
    Self {
      draft,
      preview_ids: Vec::new(),
      text_preview: false,
      panel_id: None,
      open_menu: None,
    }
  }

  /// Leaves any sub-menu or pending prompt and shows the main edit view.
  pub fn back_to_main(&mut self) {
    self.open_menu = None;
    self.draft.pending = None;
  }
}

#[cfg(test)]
mod tests {
  use super::ConversationState;
  use super::WizardSession;
  use crate::listing::Field;
  use crate::listing::ListingDraft;

  #[test]
  fn back_to_main_clears_every_sub_view() {
    let mut session = WizardSession::new(ListingDraft::new("1001"));
    session.open_menu = Some(Field::District);
    session.draft.begin_input(Field::Landmark);
    session.back_to_main();
    assert_eq!(session.open_menu, None);
    assert_eq!(session.draft.pending, None);
  }

  #[test]
  fn default_state_is_idle() {
    assert_eq!(ConversationState::default(), ConversationState::Idle);
  }
}
