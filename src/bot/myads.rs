use anyhow::Context;
use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::ChatId;
use teloxide::types::FileId;
use teloxide::types::InputFile;
use teloxide::types::Message;
use teloxide::types::ParseMode;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use crate::bot::BotDialogue;
use crate::bot::HandlerResult;
use crate::bot::SharedContext;
use crate::bot::keyboards::listing_controls;
use crate::bot::state::ConversationState;
use crate::error::ListingError;
use crate::listing::ListingRecord;
use crate::listing::MediaRef;
use crate::listing::caption::compose_compact;
use crate::listing::pricing::RepriceIntent;
use crate::listing::pricing::format_wait;
use crate::service::RepostOutcome;
use crate::util::message_text;

const PAGE_SIZE: usize = 3;

#[instrument(skip(bot, dialogue, ctx, msg))]
pub async fn show(bot: Bot, dialogue: BotDialogue, ctx: SharedContext, msg: Message) -> HandlerResult {
  if !msg.chat.is_private() {
    return Ok(());
  }
  let user = msg.from.as_ref().context("message missing sender")?;
  dialogue.reset().await?;
  send_page(&bot, &ctx, msg.chat.id, &user.id.0.to_string(), 0).await
}

fn page_count(total: usize) -> usize {
  total.div_ceil(PAGE_SIZE)
}

/// First photo, else first video.
fn preview_media(media: &[MediaRef]) -> Option<&MediaRef> {
  media
    .iter()
    .find(|item| matches!(item, MediaRef::Photo(_)))
    .or_else(|| media.iter().find(|item| matches!(item, MediaRef::Video(_))))
}

#[instrument(skip(bot, ctx))]
async fn send_page(bot: &Bot, ctx: &SharedContext, chat: ChatId, realtor: &str, page: usize) -> HandlerResult {
  let records = ctx.listings().list_by_owner(realtor).await?;
  if records.is_empty() {
    bot.send_message(chat, "У вас нет активных объявлений.").await?;
    return Ok(());
  }

  let pages = page_count(records.len());
  let page = page.min(pages - 1);
  info!(chat_id = %chat, realtor, page, pages, total = records.len(), "sending owner listings page");
  bot
    .send_message(
      chat,
      format!("Ваши объявления: {} (стр. {}/{pages})", records.len(), page + 1),
    )
    .await?;

  let shown: Vec<&ListingRecord> = records.iter().skip(page * PAGE_SIZE).take(PAGE_SIZE).collect();
  for (index, record) in shown.iter().enumerate() {
    send_owner_preview(bot, ctx, chat, record).await;
    let nav = (index + 1 == shown.len()).then_some((page, pages));
    bot
      .send_message(chat, format!("Объект {}", record.object_code))
      .reply_markup(listing_controls(&record.object_code, nav))
      .await?;
  }
  Ok(())
}

async fn send_owner_preview(bot: &Bot, ctx: &SharedContext, chat: ChatId, record: &ListingRecord) {
  let hot = ctx.listings().is_hot(record, Utc::now());
  let caption = compose_compact(&record.view(hot), ctx.listings().captions());
  let result = match preview_media(&record.media) {
    Some(MediaRef::Photo(id)) => bot
      .send_photo(chat, InputFile::file_id(FileId(id.clone())))
      .caption(caption.clone())
      .parse_mode(ParseMode::Html)
      .await
      .map(|_| ()),
    Some(MediaRef::Video(id)) => bot
      .send_video(chat, InputFile::file_id(FileId(id.clone())))
      .caption(caption.clone())
      .parse_mode(ParseMode::Html)
      .await
      .map(|_| ()),
    None => Ok(()),
  };
  if let Err(err) = &result {
    warn!(error = %err, object_code = %record.object_code, "media preview failed, sending text");
  }
  if (result.is_err() || record.media.is_empty())
    && let Err(err) = bot.send_message(chat, caption).parse_mode(ParseMode::Html).await
  {
    warn!(error = %err, object_code = %record.object_code, "text preview failed");
  }
}

/// Handles `my:*` callbacks; returns the callback answer text.
#[instrument(skip(bot, dialogue, ctx))]
pub async fn handle_callback(
  bot: &Bot,
  dialogue: &BotDialogue,
  ctx: &SharedContext,
  user_id: i64,
  chat: ChatId,
  value: &str,
) -> anyhow::Result<Option<String>> {
  let realtor = user_id.to_string();
  let (action, argument) = value.split_once(':').unwrap_or((value, ""));

  match action {
    "page" => {
      let page = argument.parse::<usize>().unwrap_or_default();
      send_page(bot, ctx, chat, &realtor, page).await?;
      Ok(None)
    },
    "del" => match ctx.listings().delete(&realtor, argument).await {
      Ok(()) => {
        bot
          .send_message(chat, format!("🗑 Объект {argument} снят с публикации."))
          .await?;
        Ok(Some("Удалено.".to_string()))
      },
      Err(err) => Ok(Some(failure_text(&err, argument))),
    },
    "repost" => match ctx.listings().repost(&realtor, argument, Utc::now()).await {
      Ok(RepostOutcome::Published(record)) => {
        bot
          .send_message(chat, format!("🔁 Объект {} опубликован заново.", record.object_code))
          .await?;
        Ok(None)
      },
      Ok(RepostOutcome::CoolingDown(wait)) => Ok(Some(format!(
        "⏳ Объект {argument} можно репостнуть через {}",
        format_wait(wait)
      ))),
      Err(err) => Ok(Some(failure_text(&err, argument))),
    },
    "down" | "up" => {
      let intent = if action == "down" {
        RepriceIntent::Decrease
      } else {
        RepriceIntent::Increase
      };
      let record = match ctx.listings().owned(&realtor, argument).await {
        Ok(record) => record,
        Err(err) => return Ok(Some(failure_text(&err, argument))),
      };
      dialogue
        .update(ConversationState::RepriceInput {
          object_code: record.object_code.clone(),
          intent,
        })
        .await?;
      bot.send_message(chat, price_prompt(&record.price, intent)).await?;
      Ok(None)
    },
    _ => Ok(None),
  }
}

fn price_prompt(current: &str, intent: RepriceIntent) -> String {
  let direction = match intent {
    RepriceIntent::Decrease => "ниже",
    RepriceIntent::Increase => "выше",
  };
  format!("Текущая цена: {current}\nВведите новую цену ({direction} текущей) цифрами:")
}

fn failure_text(err: &ListingError, object_code: &str) -> String {
  if let ListingError::Transport(inner) = err {
    warn!(error = %inner, object_code, "listing action failed");
  }
  err.user_message()
}

#[instrument(skip(bot, dialogue, ctx, msg))]
pub async fn handle_price_input(
  bot: Bot,
  dialogue: BotDialogue,
  ctx: SharedContext,
  msg: Message,
  (object_code, intent): (String, RepriceIntent),
) -> HandlerResult {
  let user = msg.from.as_ref().context("message missing sender")?;
  let realtor = user.id.0.to_string();
  let chat_id = msg.chat.id;
  let Some(text) = message_text(&msg) else {
    bot.send_message(chat_id, "Введите цену цифрами.").await?;
    return Ok(());
  };

  match ctx
    .listings()
    .reprice(&realtor, &object_code, intent, text, Utc::now())
    .await
  {
    Ok(record) => {
      dialogue.exit().await?;
      bot
        .send_message(
          chat_id,
          format!(
            "✅ Новая цена объекта {}: {}. Объявление опубликовано заново.",
            record.object_code, record.price
          ),
        )
        .await?;
    },
    Err(ListingError::Validation(err)) => {
      bot.send_message(chat_id, err.user_message()).await?;
    },
    Err(err) => {
      dialogue.exit().await?;
      bot.send_message(chat_id, failure_text(&err, &object_code)).await?;
    },
  }
  Ok(())
}
