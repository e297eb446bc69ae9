//! Message dispatcher setup.
//!
//! Builds the dispatcher with all command and callback handlers.

use teloxide::adaptors::Throttle;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;

use crate::game::Game;
use crate::plugins;

/// Bot type with Throttle adaptor for automatic rate limiting.
pub type ThrottledBot = Throttle<Bot>;

/// Dispatcher type used by both runners.
pub type BotDispatcher = Dispatcher<ThrottledBot, anyhow::Error, teloxide::dispatching::DefaultKey>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Game services and their state.
    pub game: Game,

    /// Bot username (without @) for links.
    pub bot_username: String,
}

impl AppState {
    pub fn new(game: Game, bot_username: String) -> Self {
        Self { game, bot_username }
    }
}

/// Build the dispatcher with all handlers.
pub fn build_dispatcher(bot: ThrottledBot, state: AppState) -> BotDispatcher {
    Dispatcher::builder(bot, schema())
        .dependencies(dptree::deps![state])
        .enable_ctrlc_handler()
        .build()
}

/// Build the handler schema.
fn schema() -> UpdateHandler<anyhow::Error> {
    use teloxide::dispatching::UpdateFilterExt;

    let message_handler = Update::filter_message().branch(plugins::command_handler());

    dptree::entry()
        .branch(message_handler)
        .branch(plugins::callback_handler())
}
