use std::sync::Arc;

use teloxide::dispatching::dialogue::Dialogue;
use teloxide::dispatching::dialogue::InMemStorage;

pub mod access;
pub mod channel;
pub mod commands;
pub mod context;
pub mod handlers;
pub mod inquiry;
pub mod keyboards;
pub mod myads;
pub mod state;
pub mod wizard;

pub type HandlerResult = anyhow::Result<()>;
pub type DialogueStorage = InMemStorage<state::ConversationState>;
pub type BotDialogue = Dialogue<state::ConversationState, DialogueStorage>;
pub type SharedContext = Arc<AppContext>;

pub use channel::TelegramChannel;
pub use commands::Command;
pub use context::AppContext;
pub use handlers::build_schema;
