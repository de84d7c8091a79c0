pub mod callbacks;
pub mod commands;
pub mod handlers;
pub mod util;

use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::types::{Update, UpdateKind};

use crate::config::Config;
use crate::flow::FlowState;
use crate::imagehost::ImageHost;
use crate::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<tokio::sync::Mutex<Store>>,
    pub flow: Arc<tokio::sync::Mutex<FlowState>>,
    pub image_host: Arc<ImageHost>,
    pub bot: Bot,
    pub bot_username: String,
}

impl AppState {
    pub fn new(config: Config, bot: Bot, bot_username: String) -> Self {
        let store = Store::new(config.data_dir.clone());
        let image_host = ImageHost::new(
            config.image_host_primary.clone(),
            config.image_host_fallback.clone(),
        );
        Self {
            config: Arc::new(config),
            store: Arc::new(tokio::sync::Mutex::new(store)),
            flow: Arc::new(tokio::sync::Mutex::new(FlowState::new())),
            image_host: Arc::new(image_host),
            bot,
            bot_username,
        }
    }
}

/// Routes one decoded update. Everything that is neither a message nor a
/// callback query is dropped without comment.
pub async fn dispatch_update(bot: Bot, update: Update, state: AppState) -> anyhow::Result<()> {
    match update.kind {
        UpdateKind::Message(msg) => handlers::handle_message(bot, msg, state).await,
        UpdateKind::CallbackQuery(q) => callbacks::handle_callback(bot, q, state).await,
        _ => Ok(()),
    }
}
