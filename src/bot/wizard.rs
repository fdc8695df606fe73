//! `/ad`: album collection, the edit panel and publishing.

use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use teloxide::ApiError;
use teloxide::RequestError;
use teloxide::prelude::*;
use teloxide::types::ChatId;
use teloxide::types::InlineKeyboardMarkup;
use teloxide::types::Message;
use teloxide::types::MessageId;
use teloxide::types::ParseMode;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use crate::bot::BotDialogue;
use crate::bot::HandlerResult;
use crate::bot::SharedContext;
use crate::bot::channel::send_album;
use crate::bot::keyboards::choice_keyboard;
use crate::bot::keyboards::deal_keyboard;
use crate::bot::keyboards::edit_keyboard;
use crate::bot::keyboards::purpose_keyboard;
use crate::bot::state::ConversationState;
use crate::bot::state::WizardSession;
use crate::error::ListingError;
use crate::listing::DealType;
use crate::listing::Field;
use crate::listing::ListingDraft;
use crate::listing::MediaRef;
use crate::listing::PropertyType;
use crate::listing::caption::compose;
use crate::listing::draft::InputOutcome;
use crate::listing::draft::MAX_MEDIA;
use crate::util::message_text;

/// Quiet period after the last album item before the wizard moves on.
const MEDIA_QUIET_PERIOD: Duration = Duration::from_millis(700);
const PANEL_TEXT: &str = "Описание:";

#[instrument(skip(bot, dialogue, ctx, msg))]
pub async fn start(bot: Bot, dialogue: BotDialogue, ctx: SharedContext, msg: Message) -> HandlerResult {
  let user = msg.from.as_ref().context("message missing sender")?;
  let user_id = user.id.0 as i64;
  if !ctx.can_post(user_id).await? {
    info!(user_id, "listing wizard refused without access");
    bot.send_message(msg.chat.id, "Нет доступа.").await?;
    return Ok(());
  }

  dialogue
    .update(ConversationState::CollectingMedia(ListingDraft::new(user_id.to_string())))
    .await?;
  info!(user_id, chat_id = %msg.chat.id, "listing wizard started");
  bot
    .send_message(
      msg.chat.id,
      format!("📷 Отправьте фото или видео объекта одним альбомом (до {MAX_MEDIA})."),
    )
    .await?;
  Ok(())
}

fn media_of(msg: &Message) -> Option<MediaRef> {
  if let Some(photo) = msg.photo().and_then(|sizes| sizes.last()) {
    return Some(MediaRef::Photo(photo.file.id.0.clone()));
  }
  msg.video().map(|video| MediaRef::Video(video.file.id.0.clone()))
}

#[instrument(skip(bot, dialogue, ctx, msg, draft))]
pub async fn handle_media(
  bot: Bot,
  dialogue: BotDialogue,
  ctx: SharedContext,
  msg: Message,
  mut draft: ListingDraft,
) -> HandlerResult {
  let chat_id = msg.chat.id;
  let Some(media) = media_of(&msg) else {
    bot
      .send_message(chat_id, "📷 Нужны фото или видео объекта. /cancel — отменить.")
      .await?;
    return Ok(());
  };

  if !draft.push_media(media) {
    bot
      .send_message(chat_id, format!("Можно прикрепить не более {MAX_MEDIA} файлов."))
      .await?;
    return Ok(());
  }
  let generation = draft.media_generation;
  info!(chat_id = %chat_id, media = draft.media.len(), generation, "collected listing media");
  dialogue.update(ConversationState::CollectingMedia(draft)).await?;

  tokio::spawn(async move {
    tokio::time::sleep(MEDIA_QUIET_PERIOD).await;
    if let Err(err) = finish_collecting(&bot, &dialogue, &ctx, chat_id, generation).await {
      warn!(error = %err, chat_id = %chat_id, "failed to open listing editor");
    }
  });
  Ok(())
}

/// Draft still collecting media whose last item is the one numbered `generation`.
async fn current_draft(dialogue: &BotDialogue, generation: u32) -> anyhow::Result<Option<ListingDraft>> {
  Ok(match dialogue.get().await? {
    Some(ConversationState::CollectingMedia(draft)) if draft.media_generation == generation => Some(draft),
    _ => None,
  })
}

/// Moves to the editor once no further album items arrived after `generation`.
async fn finish_collecting(
  bot: &Bot,
  dialogue: &BotDialogue,
  ctx: &SharedContext,
  chat: ChatId,
  generation: u32,
) -> HandlerResult {
  if current_draft(dialogue, generation).await?.is_none() {
    return Ok(());
  }

  let code = match ctx.listings().allocate_code().await {
    Ok(code) => code,
    Err(err) => {
      warn!(error = %err, chat_id = %chat, "could not allocate object code");
      dialogue.exit().await?;
      bot.send_message(chat, err.user_message()).await?;
      return Ok(());
    },
  };
  // Items that arrived during allocation belong to a newer timer.
  let Some(mut draft) = current_draft(dialogue, generation).await? else {
    return Ok(());
  };
  draft.object_code = Some(code);

  let mut session = WizardSession::new(draft);
  send_preview(bot, ctx, chat, &mut session).await;
  let panel = bot
    .send_message(chat, PANEL_TEXT)
    .reply_markup(edit_keyboard(&session.draft))
    .await?;
  session.panel_id = Some(panel.id.0);
  if let Some(ConversationState::CollectingMedia(latest)) = dialogue.get().await?
    && latest.media_generation != generation
  {
    warn!(chat_id = %chat, media = latest.media.len(), "album items arrived while the editor opened");
    session.draft.media = latest.media;
    session.draft.media_generation = latest.media_generation;
  }
  info!(
    chat_id = %chat,
    object_code = ?session.draft.object_code,
    media = session.draft.media.len(),
    "listing editor opened"
  );
  dialogue.update(ConversationState::Editing(session)).await?;
  Ok(())
}

fn preview_caption(ctx: &SharedContext, draft: &ListingDraft) -> String {
  compose(&draft.view(), ctx.listings().captions())
}

async fn send_preview(bot: &Bot, ctx: &SharedContext, chat: ChatId, session: &mut WizardSession) {
  let caption = preview_caption(ctx, &session.draft);
  match send_album(bot, chat, &session.draft.media, &caption).await {
    Ok(ids) => {
      session.text_preview = session.draft.media.is_empty();
      session.preview_ids = ids;
      return;
    },
    Err(err) => warn!(error = %err, chat_id = %chat, "album preview failed, falling back to text"),
  }
  match bot.send_message(chat, caption).parse_mode(ParseMode::Html).await {
    Ok(message) => {
      session.text_preview = true;
      session.preview_ids = vec![message.id.0];
    },
    Err(err) => warn!(error = %err, chat_id = %chat, "text preview failed"),
  }
}

fn panel_markup(session: &WizardSession) -> InlineKeyboardMarkup {
  let draft = &session.draft;
  match session.open_menu {
    Some(Field::Deal) => deal_keyboard(draft.deal),
    Some(Field::Purpose) => purpose_keyboard(
      draft.schema().choices(Field::Purpose).unwrap_or_default(),
      &draft.fields.list(Field::Purpose),
    ),
    Some(field) => choice_keyboard(
      field,
      draft.schema().choices(field).unwrap_or_default(),
      draft.fields.text(field).as_deref(),
    ),
    None => edit_keyboard(draft),
  }
}

/// Re-renders the preview caption and the panel. Failures are only logged.
async fn refresh(bot: &Bot, ctx: &SharedContext, chat: ChatId, session: &WizardSession, caption_changed: bool) {
  if caption_changed && let Some(first) = session.preview_ids.first() {
    let caption = preview_caption(ctx, &session.draft);
    let result = if session.text_preview {
      bot
        .edit_message_text(chat, MessageId(*first), caption)
        .parse_mode(ParseMode::Html)
        .await
        .map(|_| ())
    } else {
      bot
        .edit_message_caption(chat, MessageId(*first))
        .caption(caption)
        .parse_mode(ParseMode::Html)
        .await
        .map(|_| ())
    };
    match result {
      Ok(()) | Err(RequestError::Api(ApiError::MessageNotModified)) => {},
      Err(err) => warn!(error = %err, chat_id = %chat, "failed to refresh listing preview"),
    }
  }

  if let Some(panel) = session.panel_id {
    let request = bot
      .edit_message_reply_markup(chat, MessageId(panel))
      .reply_markup(panel_markup(session));
    match request.await {
      Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => {},
      Err(err) => warn!(error = %err, chat_id = %chat, "failed to refresh listing panel"),
    }
  }
}

#[instrument(skip(bot, dialogue, ctx, msg, session))]
pub async fn handle_input(
  bot: Bot,
  dialogue: BotDialogue,
  ctx: SharedContext,
  msg: Message,
  mut session: WizardSession,
) -> HandlerResult {
  let chat_id = msg.chat.id;
  let Some(pending) = session.draft.pending else {
    bot
      .send_message(chat_id, "Выберите поле на клавиатуре под описанием.")
      .await?;
    return Ok(());
  };
  let Some(text) = message_text(&msg) else {
    bot.send_message(chat_id, pending.prompt()).await?;
    return Ok(());
  };

  match session.draft.accept_input(text) {
    Err(err) => {
      info!(chat_id = %chat_id, ?pending, error = %err, "rejected wizard input");
      bot
        .send_message(chat_id, format!("{}\n{}", err.user_message(), pending.prompt()))
        .await?;
    },
    Ok(Some(InputOutcome::AwaitingWidth)) => {
      if let Some(next) = session.draft.pending {
        bot.send_message(chat_id, next.prompt()).await?;
      }
      dialogue.update(ConversationState::Editing(session)).await?;
    },
    Ok(Some(InputOutcome::Stored(field))) => {
      info!(chat_id = %chat_id, field = field.key(), "stored wizard field");
      session.back_to_main();
      refresh(&bot, &ctx, chat_id, &session, true).await;
      dialogue.update(ConversationState::Editing(session)).await?;
      bot
        .send_message(chat_id, format!("✅ «{}» сохранено.", field.label()))
        .await?;
    },
    Ok(None) => {},
  }
  Ok(())
}

/// Handles `ad:*` callbacks; returns the callback answer text.
#[instrument(skip(bot, dialogue, ctx))]
pub async fn handle_callback(
  bot: &Bot,
  dialogue: &BotDialogue,
  ctx: &SharedContext,
  chat: ChatId,
  value: &str,
) -> anyhow::Result<Option<String>> {
  let Some(ConversationState::Editing(mut session)) = dialogue.get().await? else {
    return Ok(Some("Сессия устарела. Начните заново: /ad".to_string()));
  };

  let (action, argument) = value.split_once(':').unwrap_or((value, ""));
  let mut answer = None;
  let mut caption_changed = false;

  match action {
    "type" => {
      let Some(kind) = PropertyType::from_key(argument) else {
        return Ok(None);
      };
      caption_changed = session.draft.set_property_type(kind);
      session.back_to_main();
    },
    "menu" => {
      let Some(field) = Field::from_key(argument) else {
        return Ok(None);
      };
      if field != Field::Deal && session.draft.schema().choices(field).is_none() {
        return Ok(None);
      }
      session.draft.pending = None;
      session.open_menu = Some(field);
    },
    "deal" => {
      let Some(deal) = DealType::from_key(argument) else {
        return Ok(None);
      };
      session.draft.set_deal(deal);
      session.back_to_main();
      caption_changed = true;
    },
    "pick" => {
      let Some((field, index)) = argument
        .split_once(':')
        .and_then(|(field, index)| Some((Field::from_key(field)?, index.parse::<usize>().ok()?)))
      else {
        return Ok(None);
      };
      caption_changed = session.draft.select(field, index);
      session.back_to_main();
    },
    "purpose" => {
      let Ok(index) = argument.parse::<usize>() else {
        return Ok(None);
      };
      match session.draft.toggle_purpose(index) {
        Ok(selection) => {
          caption_changed = true;
          if selection.complete {
            session.back_to_main();
          }
        },
        Err(err) => answer = Some(err.user_message()),
      }
    },
    "input" => {
      let Some(field) = Field::from_key(argument) else {
        return Ok(None);
      };
      let Some(pending) = session.draft.begin_input(field) else {
        warn!(chat_id = %chat, field = field.key(), "input requested for undeclared field");
        return Ok(None);
      };
      session.open_menu = None;
      bot.send_message(chat, pending.prompt()).await?;
    },
    "back" => session.back_to_main(),
    "publish" => return publish(bot, dialogue, ctx, chat, session).await,
    "cancel" => {
      dialogue.exit().await?;
      info!(chat_id = %chat, object_code = ?session.draft.object_code, "listing wizard cancelled");
      bot.send_message(chat, "❌ Подача объявления отменена.").await?;
      return Ok(None);
    },
    _ => return Ok(None),
  }

  refresh(bot, ctx, chat, &session, caption_changed).await;
  dialogue.update(ConversationState::Editing(session)).await?;
  Ok(answer)
}

async fn publish(
  bot: &Bot,
  dialogue: &BotDialogue,
  ctx: &SharedContext,
  chat: ChatId,
  session: WizardSession,
) -> anyhow::Result<Option<String>> {
  match ctx.listings().publish(&session.draft, Utc::now()).await {
    Ok(record) => {
      dialogue.exit().await?;
      bot
        .send_message(chat, format!("✅ Объект {} опубликован.", record.object_code))
        .await?;
      Ok(None)
    },
    Err(ListingError::Validation(err)) => {
      bot.send_message(chat, err.user_message()).await?;
      Ok(None)
    },
    Err(err @ ListingError::DuplicateCode(_)) => {
      dialogue.exit().await?;
      bot.send_message(chat, err.user_message()).await?;
      Ok(None)
    },
    Err(err) => {
      warn!(error = %err, chat_id = %chat, "listing publish failed");
      bot.send_message(chat, err.user_message()).await?;
      Ok(None)
    },
  }
}
