use teloxide::dispatching::UpdateHandler;
use teloxide::dptree;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use teloxide::types::KeyboardRemove;
use teloxide::types::Message;
use teloxide::utils::command::BotCommands;
use tracing::info;
use tracing::instrument;

use crate::bot::BotDialogue;
use crate::bot::Command;
use crate::bot::DialogueStorage;
use crate::bot::HandlerResult;
use crate::bot::SharedContext;
use crate::bot::access;
use crate::bot::inquiry;
use crate::bot::myads;
use crate::bot::state::ConversationState;
use crate::bot::wizard;

pub fn build_schema() -> UpdateHandler<anyhow::Error> {
  let message_handler = Update::filter_message()
    .enter_dialogue::<Message, DialogueStorage, ConversationState>()
    .branch(command_branch())
    .branch(dptree::case![ConversationState::CollectingMedia(draft)].endpoint(wizard::handle_media))
    .branch(dptree::case![ConversationState::Editing(session)].endpoint(wizard::handle_input))
    .branch(dptree::case![ConversationState::InquiryName { ticket }].endpoint(inquiry::handle_name))
    .branch(dptree::case![ConversationState::InquiryPhone { ticket, client_name }].endpoint(inquiry::handle_phone))
    .branch(dptree::case![ConversationState::RepriceInput { object_code, intent }].endpoint(myads::handle_price_input))
    .branch(dptree::case![ConversationState::AccessGrant { admin_tg_id }].endpoint(access::handle_grant))
    .branch(dptree::endpoint(handle_idle_text));

  let callback_handler = Update::filter_callback_query()
    .enter_dialogue::<CallbackQuery, DialogueStorage, ConversationState>()
    .endpoint(handle_callback_query);

  dptree::entry().branch(message_handler).branch(callback_handler)
}

fn command_branch() -> UpdateHandler<anyhow::Error> {
  dptree::entry()
    .filter_command::<Command>()
    .branch(dptree::case![Command::Start(payload)].endpoint(inquiry::start))
    .branch(dptree::case![Command::Help].endpoint(handle_help))
    .branch(dptree::case![Command::Ad].endpoint(wizard::start))
    .branch(dptree::case![Command::Myads].endpoint(myads::show))
    .branch(dptree::case![Command::Cancel].endpoint(handle_cancel))
    .branch(dptree::case![Command::AccessOpen].endpoint(access::open))
    .branch(dptree::case![Command::AccessClose].endpoint(access::close))
}

#[instrument(skip(bot, msg))]
async fn handle_help(bot: Bot, msg: Message) -> HandlerResult {
  info!(chat_id = %msg.chat.id, "received /help command");
  let mut text = Command::descriptions().to_string();
  text.push_str("\n\nЧтобы оставить заявку, нажмите «Оставить заявку» под объявлением в канале.");
  bot.send_message(msg.chat.id, text).await?;
  Ok(())
}

#[instrument(skip(bot, dialogue, msg))]
async fn handle_cancel(bot: Bot, dialogue: BotDialogue, msg: Message) -> HandlerResult {
  let active = dialogue
    .get()
    .await?
    .is_some_and(|state| state != ConversationState::Idle);
  dialogue.exit().await?;
  info!(chat_id = %msg.chat.id, active, "conversation cancelled");
  let text = if active { "❌ Действие отменено." } else { "Нечего отменять." };
  bot
    .send_message(msg.chat.id, text)
    .reply_markup(KeyboardRemove::new())
    .await?;
  Ok(())
}

#[instrument(skip(bot, msg))]
async fn handle_idle_text(bot: Bot, msg: Message, state: ConversationState) -> HandlerResult {
  if matches!(state, ConversationState::Idle)
    && msg.chat.is_private()
    && let Some(text) = msg.text()
    && !text.starts_with('/')
  {
    info!(chat_id = %msg.chat.id, "idle state received unrecognized message");
    bot
      .send_message(msg.chat.id, "Не понял сообщение. Воспользуйтесь /help.")
      .await?;
  }
  Ok(())
}

#[instrument(skip(bot, ctx, dialogue, query))]
async fn handle_callback_query(
  bot: Bot,
  ctx: SharedContext,
  query: CallbackQuery,
  dialogue: BotDialogue,
) -> HandlerResult {
  let user_id = query.from.id.0 as i64;
  let message_ctx = query.message.as_ref().map(|message| (message.chat().id, message.id()));
  let callback_data = query.data.as_deref().unwrap_or("<empty>");
  info!(user_id, callback = callback_data, "handling callback query");

  let mut callback_text: Option<String> = None;
  if let Some(data) = query.data.as_deref()
    && let Some((prefix, value)) = data.split_once(':')
    && let Some((chat_id, message_id)) = message_ctx
  {
    callback_text = match prefix {
      "ad" => wizard::handle_callback(&bot, &dialogue, &ctx, chat_id, value).await?,
      "my" => myads::handle_callback(&bot, &dialogue, &ctx, user_id, chat_id, value).await?,
      "acc" => access::handle_callback(&bot, &ctx, user_id, chat_id, message_id, value).await?,
      _ => None,
    };
  }

  if let Some(text) = callback_text {
    bot.answer_callback_query(query.id).text(text).await?;
  } else {
    bot.answer_callback_query(query.id).await?;
  }
  Ok(())
}
