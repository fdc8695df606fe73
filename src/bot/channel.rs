use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use teloxide::ApiError;
use teloxide::RequestError;
use teloxide::prelude::*;
use teloxide::types::ChatId;
use teloxide::types::FileId;
use teloxide::types::InputFile;
use teloxide::types::InputMedia;
use teloxide::types::InputMediaPhoto;
use teloxide::types::InputMediaVideo;
use teloxide::types::MessageId;
use teloxide::types::ParseMode;
use tracing::info;
use tracing::instrument;

use crate::listing::MediaRef;
use crate::listing::draft::MAX_MEDIA;
use crate::service::ports::Messaging;

/// Album items for `media`, capped at one media group, with an HTML caption
/// on the first item.
pub fn album(media: &[MediaRef], caption: &str) -> Vec<InputMedia> {
  media
    .iter()
    .take(MAX_MEDIA)
    .enumerate()
    .map(|(index, item)| {
      let file = InputFile::file_id(FileId(item.file_id().to_string()));
      match item {
        MediaRef::Photo(_) => {
          let mut photo = InputMediaPhoto::new(file);
          if index == 0 {
            photo = photo.caption(caption.to_string()).parse_mode(ParseMode::Html);
          }
          InputMedia::Photo(photo)
        },
        MediaRef::Video(_) => {
          let mut video = InputMediaVideo::new(file);
          if index == 0 {
            video = video.caption(caption.to_string()).parse_mode(ParseMode::Html);
          }
          InputMedia::Video(video)
        },
      }
    })
    .collect()
}

/// Sends `media` as one album to `chat` and returns the message ids.
pub async fn send_album(bot: &Bot, chat: ChatId, media: &[MediaRef], caption: &str) -> Result<Vec<i32>> {
  if media.is_empty() {
    let message = bot.send_message(chat, caption).parse_mode(ParseMode::Html).await?;
    return Ok(vec![message.id.0]);
  }
  let messages = bot.send_media_group(chat, album(media, caption)).await?;
  Ok(messages.iter().map(|message| message.id.0).collect())
}

/// The public listings channel.
#[derive(Clone)]
pub struct TelegramChannel {
  bot: Bot,
  chat: ChatId,
}

impl TelegramChannel {
  pub fn new(bot: Bot, chat: ChatId) -> Self {
    Self { bot, chat }
  }
}

#[async_trait]
impl Messaging for TelegramChannel {
  #[instrument(skip(self, media, caption), fields(chat_id = %self.chat, media = media.len()))]
  async fn publish(&self, media: &[MediaRef], caption: &str) -> Result<Vec<i32>> {
    let ids = send_album(&self.bot, self.chat, media, caption).await?;
    info!(chat_id = %self.chat, message_ids = ?ids, "posted album to channel");
    Ok(ids)
  }

  #[instrument(skip(self))]
  async fn delete_messages(&self, message_ids: &[i32]) -> Result<()> {
    let results = join_all(
      message_ids
        .iter()
        .map(|id| self.bot.delete_message(self.chat, MessageId(*id)).into_future()),
    )
    .await;
    let failed = results.iter().filter(|result| result.is_err()).count();
    if failed > 0 {
      anyhow::bail!("{failed} of {} channel messages could not be deleted", message_ids.len());
    }
    Ok(())
  }

  #[instrument(skip(self, caption))]
  async fn edit_caption(&self, message_id: i32, caption: &str) -> Result<()> {
    let request = self
      .bot
      .edit_message_caption(self.chat, MessageId(message_id))
      .caption(caption.to_string())
      .parse_mode(ParseMode::Html);
    match request.await {
      Ok(_) | Err(RequestError::Api(ApiError::MessageNotModified)) => Ok(()),
      Err(err) => Err(err.into()),
    }
  }
}

#[cfg(test)]
mod tests {
  use teloxide::types::InputMedia;

  use super::album;
  use crate::listing::MediaRef;

  #[test]
  fn caption_goes_on_the_first_item_only() {
    let media = vec![
      MediaRef::Video("v1".into()),
      MediaRef::Photo("p1".into()),
      MediaRef::Photo("p2".into()),
    ];
    let items = album(&media, "<b>caption</b>");
    assert_eq!(items.len(), 3);
    match &items[0] {
      InputMedia::Video(video) => assert_eq!(video.caption.as_deref(), Some("<b>caption</b>")),
      other => panic!("unexpected first item: {other:?}"),
    }
    match &items[1] {
      InputMedia::Photo(photo) => assert_eq!(photo.caption, None),
      other => panic!("unexpected second item: {other:?}"),
    }
  }

  #[test]
  fn album_is_capped_to_one_media_group() {
    let media: Vec<MediaRef> = (0 .. 12).map(|index| MediaRef::Photo(format!("p{index}"))).collect();
    assert_eq!(album(&media, "").len(), 10);
  }
}
