use anyhow::Context;
use chrono::Utc;
use teloxide::prelude::*;
use teloxide::types::ChatId;
use teloxide::types::KeyboardRemove;
use teloxide::types::Message;
use teloxide::types::User;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use crate::bot::BotDialogue;
use crate::bot::HandlerResult;
use crate::bot::SharedContext;
use crate::bot::channel::send_album;
use crate::bot::keyboards::contact_request_keyboard;
use crate::bot::state::ConversationState;
use crate::error::InquiryError;
use crate::listing::caption::compose_compact;
use crate::models::ClientInquiry;
use crate::service::inquiries::ClientContact;
use crate::service::inquiries::InquiryTicket;
use crate::service::inquiries::normalize_phone;
use crate::service::inquiries::notification_text;
use crate::util::message_text;

const GREETING: &str = "Здравствуйте! Выберите объект в нашем канале и нажмите «Оставить заявку» под публикацией.";
const STAFF_HINT: &str = "\n\n/ad — подать объявление\n/myads — мои объявления";
const MIN_PHONE_DIGITS: usize = 7;

/// `/start` with or without a deep-link payload.
#[instrument(skip(bot, dialogue, ctx, msg))]
pub async fn start(bot: Bot, dialogue: BotDialogue, ctx: SharedContext, msg: Message, payload: String) -> HandlerResult {
  dialogue.reset().await?;
  let user = msg.from.as_ref().context("message missing sender")?;
  let user_id = user.id.0 as i64;
  let chat_id = msg.chat.id;
  info!(user_id, chat_id = %chat_id, payload = %payload, "received /start command");

  if payload.trim().is_empty() {
    let mut text = GREETING.to_string();
    if ctx.can_post(user_id).await? {
      text.push_str(STAFF_HINT);
    }
    bot.send_message(chat_id, text).await?;
    return Ok(());
  }

  let ticket = match ctx.inquiries().open(user_id, &payload).await {
    Ok(ticket) => ticket,
    Err(err) => {
      if let InquiryError::Store(inner) = &err {
        warn!(error = %inner, user_id, "inquiry lookup failed");
      }
      bot.send_message(chat_id, err.user_message()).await?;
      return Ok(());
    },
  };

  if let Some((client_name, phone)) = ticket.returning.clone() {
    return complete(&bot, &dialogue, &ctx, chat_id, user, &ticket, client_name, phone).await;
  }

  dialogue.update(ConversationState::InquiryName { ticket }).await?;
  bot
    .send_message(chat_id, "Как к вам обращаться? Введите ваше имя:")
    .await?;
  Ok(())
}

#[instrument(skip(bot, dialogue, ctx, msg))]
pub async fn handle_name(
  bot: Bot,
  dialogue: BotDialogue,
  ctx: SharedContext,
  msg: Message,
  ticket: InquiryTicket,
) -> HandlerResult {
  let user = msg.from.as_ref().context("message missing sender")?;
  let chat_id = msg.chat.id;
  let Some(client_name) = message_text(&msg).map(str::to_string) else {
    bot.send_message(chat_id, "Введите ваше имя текстом:").await?;
    return Ok(());
  };

  let known_phone = ctx.inquiries().recent_phone(user.id.0 as i64, Utc::now()).await?;
  if let Some(phone) = known_phone {
    return complete(&bot, &dialogue, &ctx, chat_id, user, &ticket, client_name, phone).await;
  }

  dialogue
    .update(ConversationState::InquiryPhone { ticket, client_name })
    .await?;
  bot
    .send_message(
      chat_id,
      "Отправьте номер телефона кнопкой ниже или введите его вручную:",
    )
    .reply_markup(contact_request_keyboard())
    .await?;
  Ok(())
}

#[instrument(skip(bot, dialogue, ctx, msg))]
pub async fn handle_phone(
  bot: Bot,
  dialogue: BotDialogue,
  ctx: SharedContext,
  msg: Message,
  (ticket, client_name): (InquiryTicket, String),
) -> HandlerResult {
  let user = msg.from.as_ref().context("message missing sender")?;
  let chat_id = msg.chat.id;
  let raw = msg
    .contact()
    .map(|contact| contact.phone_number.clone())
    .or_else(|| message_text(&msg).map(str::to_string));
  let phone = raw.map(|raw| normalize_phone(&raw));

  match phone {
    Some(phone) if phone.len() > MIN_PHONE_DIGITS => {
      complete(&bot, &dialogue, &ctx, chat_id, user, &ticket, client_name, phone).await
    },
    _ => {
      bot
        .send_message(chat_id, "Неверный номер. Отправьте контакт кнопкой ниже или введите номер цифрами:")
        .reply_markup(contact_request_keyboard())
        .await?;
      Ok(())
    },
  }
}

#[allow(clippy::too_many_arguments)]
async fn complete(
  bot: &Bot,
  dialogue: &BotDialogue,
  ctx: &SharedContext,
  chat: ChatId,
  user: &User,
  ticket: &InquiryTicket,
  client_name: String,
  phone: String,
) -> HandlerResult {
  dialogue.exit().await?;
  let contact = ClientContact {
    user_id: user.id.0 as i64,
    username: user.username.clone(),
    telegram_name: user.full_name(),
    client_name,
    phone,
  };

  let inquiry = match ctx.inquiries().submit(ticket, contact, Utc::now()).await {
    Ok(inquiry) => inquiry,
    Err(err) => {
      if let InquiryError::Store(inner) = &err {
        warn!(error = %inner, object_code = %ticket.object_code, "failed to store inquiry");
      }
      bot
        .send_message(chat, err.user_message())
        .reply_markup(KeyboardRemove::new())
        .await?;
      return Ok(());
    },
  };

  forward_listing(bot, ctx, chat, &inquiry.object_code).await;
  bot
    .send_message(
      chat,
      "Спасибо! Ваша заявка принята, риелтор свяжется с вами в ближайшее время.",
    )
    .reply_markup(KeyboardRemove::new())
    .await?;
  notify_staff(bot, ctx, &inquiry).await;
  Ok(())
}

async fn forward_listing(bot: &Bot, ctx: &SharedContext, chat: ChatId, object_code: &str) {
  let record = match ctx.inquiries().listing(object_code).await {
    Ok(Some(record)) => record,
    Ok(None) => return,
    Err(err) => {
      warn!(error = %err, object_code, "failed to load listing for client");
      return;
    },
  };
  let hot = ctx.listings().is_hot(&record, Utc::now());
  let caption = compose_compact(&record.view(hot), ctx.listings().captions());
  if let Err(err) = send_album(bot, chat, &record.media, &caption).await {
    warn!(error = %err, object_code, "failed to send listing to client");
  }
}

async fn notify_staff(bot: &Bot, ctx: &SharedContext, inquiry: &ClientInquiry) {
  let Some(notify_chat) = ctx.notify_chat() else {
    return;
  };
  let realtor = realtor_display(ctx, &inquiry.realtor_code).await;
  if let Err(err) = bot.send_message(notify_chat, notification_text(inquiry, &realtor)).await {
    warn!(error = %err, object_code = %inquiry.object_code, "failed to send inquiry notification");
  }
}

async fn realtor_display(ctx: &SharedContext, realtor_code: &str) -> String {
  let employees = match ctx.access().list_employees().await {
    Ok(employees) => employees,
    Err(err) => {
      warn!(error = %err, "failed to load employees for notification");
      Vec::new()
    },
  };
  employees
    .into_iter()
    .find(|employee| employee.tg_id.to_string() == realtor_code)
    .map(|employee| format!("{} ({realtor_code})", employee.display_name))
    .unwrap_or_else(|| realtor_code.to_string())
}
