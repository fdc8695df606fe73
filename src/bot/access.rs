use anyhow::Context;
use teloxide::ApiError;
use teloxide::RequestError;
use teloxide::prelude::*;
use teloxide::types::ChatId;
use teloxide::types::Contact;
use teloxide::types::Message;
use teloxide::types::MessageId;
use tracing::info;
use tracing::instrument;

use crate::bot::BotDialogue;
use crate::bot::HandlerResult;
use crate::bot::SharedContext;
use crate::bot::keyboards::employees_keyboard;
use crate::bot::state::ConversationState;
use crate::models::Employee;
use crate::util::user_handle;

const GRANT_PROMPT: &str = "Отправьте контакт сотрудника или перешлите любое его сообщение. /cancel — отменить.";

#[instrument(skip(bot, dialogue, ctx, msg))]
pub async fn open(bot: Bot, dialogue: BotDialogue, ctx: SharedContext, msg: Message) -> HandlerResult {
  let user = msg.from.as_ref().context("message missing sender")?;
  let admin_tg_id = user.id.0 as i64;
  if !ctx.is_admin(admin_tg_id) {
    bot.send_message(msg.chat.id, "Нет доступа.").await?;
    return Ok(());
  }
  dialogue.update(ConversationState::AccessGrant { admin_tg_id }).await?;
  bot.send_message(msg.chat.id, GRANT_PROMPT).await?;
  Ok(())
}

fn contact_name(contact: &Contact) -> String {
  match contact.last_name.as_deref() {
    Some(last) if !last.is_empty() => format!("{} {last}", contact.first_name),
    _ => contact.first_name.clone(),
  }
}

/// Employee identified by a shared contact or a forwarded message.
fn employee_from(msg: &Message) -> Option<Employee> {
  if let Some(contact) = msg.contact() {
    let user_id = contact.user_id?;
    return Some(Employee {
      tg_id: user_id.0 as i64,
      display_name: contact_name(contact),
    });
  }
  msg.forward_from_user().map(|user| Employee {
    tg_id: user.id.0 as i64,
    display_name: user_handle(user),
  })
}

#[instrument(skip(bot, dialogue, ctx, msg))]
pub async fn handle_grant(
  bot: Bot,
  dialogue: BotDialogue,
  ctx: SharedContext,
  msg: Message,
  admin_tg_id: i64,
) -> HandlerResult {
  let user = msg.from.as_ref().context("message missing sender")?;
  if user.id.0 as i64 != admin_tg_id {
    bot
      .send_message(msg.chat.id, "Ответить может только администратор, начавший это действие.")
      .await?;
    return Ok(());
  }

  let Some(employee) = employee_from(&msg) else {
    bot
      .send_message(
        msg.chat.id,
        format!("Не удалось определить пользователя.\n{GRANT_PROMPT}"),
      )
      .await?;
    return Ok(());
  };

  ctx.access().grant(employee.tg_id, &employee.display_name).await?;
  dialogue.exit().await?;
  info!(admin_tg_id, employee = employee.tg_id, "granted posting access");
  bot
    .send_message(msg.chat.id, format!("✅ Доступ выдан: {}", employee.display_name))
    .await?;
  Ok(())
}

async fn revocable(ctx: &SharedContext) -> anyhow::Result<Vec<Employee>> {
  let employees = ctx.access().list_employees().await?;
  Ok(
    employees
      .into_iter()
      .filter(|employee| !ctx.is_admin(employee.tg_id))
      .collect(),
  )
}

#[instrument(skip(bot, ctx, msg))]
pub async fn close(bot: Bot, ctx: SharedContext, msg: Message) -> HandlerResult {
  let user = msg.from.as_ref().context("message missing sender")?;
  if !ctx.is_admin(user.id.0 as i64) {
    bot.send_message(msg.chat.id, "Нет доступа.").await?;
    return Ok(());
  }
  let employees = revocable(&ctx).await?;
  if employees.is_empty() {
    bot.send_message(msg.chat.id, "Список сотрудников пуст.").await?;
    return Ok(());
  }
  bot
    .send_message(msg.chat.id, "Выберите сотрудника, чтобы закрыть доступ:")
    .reply_markup(employees_keyboard(&employees))
    .await?;
  Ok(())
}

/// Handles `acc:*` callbacks; returns the callback answer text.
#[instrument(skip(bot, ctx))]
pub async fn handle_callback(
  bot: &Bot,
  ctx: &SharedContext,
  user_id: i64,
  chat: ChatId,
  message_id: MessageId,
  value: &str,
) -> anyhow::Result<Option<String>> {
  if !ctx.is_admin(user_id) {
    return Ok(Some("Нет доступа.".to_string()));
  }

  match value.split_once(':') {
    Some(("revoke", raw_id)) => {
      let Ok(tg_id) = raw_id.parse::<i64>() else {
        return Ok(None);
      };
      ctx.access().revoke(tg_id).await?;
      info!(admin_tg_id = user_id, employee = tg_id, "revoked posting access");
      let employees = revocable(ctx).await?;
      let request = bot
        .edit_message_reply_markup(chat, message_id)
        .reply_markup(employees_keyboard(&employees));
      match request.await {
        Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => {},
        Err(err) => return Err(err.into()),
      }
      Ok(Some("Доступ закрыт.".to_string()))
    },
    _ if value == "done" => {
      bot.edit_message_text(chat, message_id, "Готово.").await?;
      Ok(None)
    },
    _ => Ok(None),
  }
}
