use std::sync::Arc;

use teloxide::dispatching::UpdateHandler;
use teloxide::dispatching::dialogue::InMemStorage;
use teloxide::dptree;
use teloxide::prelude::*;
use teloxide::types::ChatId;
use teloxide::types::Me;
use tracing::info;

use crate::bot;
use crate::bot::AppContext;
use crate::bot::DialogueStorage;
use crate::bot::TelegramChannel;
use crate::config::Config;
use crate::db::Db;
use crate::listing::CaptionContext;
use crate::maintenance;
use crate::service::InquiryService;
use crate::service::ListingService;

pub struct App {
  bot: Bot,
  me: Me,
  context: Arc<AppContext>,
  handler: UpdateHandler<anyhow::Error>,
}

impl App {
  pub async fn new(bot: Bot, db: Db, config: Config) -> anyhow::Result<Self> {
    let me = bot.get_me().await?;
    let store = Arc::new(db);
    let channel = Arc::new(TelegramChannel::new(bot.clone(), ChatId(config.channel_id)));
    let captions = CaptionContext {
      bot_username: me.username().to_string(),
      link_host: config.link_host.clone(),
    };
    let listings = ListingService::new(store.clone(), channel, captions, config.price_policy);
    let inquiries = InquiryService::new(store.clone(), store.clone());

    maintenance::spawn(listings.clone(), config.maintenance_interval, config.auto_repost_after);

    let context = Arc::new(AppContext::new(
      listings,
      inquiries,
      store,
      config.admins,
      config.notify_chat_id.map(ChatId),
    ));
    info!(bot = me.username(), channel_id = config.channel_id, "application wired");
    let handler = bot::build_schema();
    Ok(Self {
      bot,
      me,
      context,
      handler,
    })
  }

  pub async fn run(self) -> anyhow::Result<()> {
    let storage: Arc<DialogueStorage> = InMemStorage::new();

    Dispatcher::builder(self.bot.clone(), self.handler)
      .dependencies(dptree::deps![self.context.clone(), storage.clone(), self.me])
      .enable_ctrlc_handler()
      .build()
      .dispatch()
      .await;

    Ok(())
  }
}
