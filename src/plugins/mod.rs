//! Plugin system for command handlers.
//!
//! Add new plugins by:
//! 1. Creating a new file in this directory
//! 2. Adding `pub mod your_plugin;` below
//! 3. Adding the handler to `command_handler()`

pub mod actions;
pub mod admin;
pub mod claim;
pub mod collection;
pub mod economy;
pub mod ping;
pub mod render;
pub mod start;

use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::game::confirm::CALLBACK_PREFIX;

/// All bot commands.
#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "Start the bot")]
    Start,

    #[command(description = "Show this help")]
    Help,

    #[command(description = "Check bot latency")]
    Ping,

    #[command(description = "Your coins and collection summary")]
    Balance,

    #[command(description = "Pay coins (reply): /pay <amount>")]
    Pay(String),

    #[command(description = "Look around for coins")]
    Explore,

    #[command(description = "Claim your daily character")]
    Claim,

    #[command(hide)]
    Hclaim,

    #[command(description = "Gift a character (reply): /gift <character id>")]
    Gift(String),

    #[command(description = "Set your favorite: /fav <character id>")]
    Fav(String),

    #[command(description = "List your characters")]
    Collection,

    #[command(hide)]
    Transfer(String),

    #[command(hide)]
    Kill(String),
}

/// Build the combined command handler.
pub fn command_handler() -> UpdateHandler<anyhow::Error> {
    use dptree::case;

    teloxide::filter_command::<Command, _>()
        .branch(case![Command::Start].endpoint(start::start_handler))
        .branch(case![Command::Help].endpoint(start::help_handler))
        .branch(case![Command::Ping].endpoint(ping::ping_command))
        // Coins
        .branch(case![Command::Balance].endpoint(economy::balance_command))
        .branch(case![Command::Pay(args)].endpoint(economy::pay_command))
        .branch(case![Command::Explore].endpoint(economy::explore_command))
        // Characters
        .branch(case![Command::Claim].endpoint(claim::claim_command))
        .branch(case![Command::Hclaim].endpoint(claim::claim_command))
        .branch(case![Command::Gift(args)].endpoint(actions::gift_command))
        .branch(case![Command::Fav(args)].endpoint(actions::fav_command))
        .branch(case![Command::Collection].endpoint(collection::collection_command))
        // Owner
        .branch(case![Command::Transfer(args)].endpoint(actions::transfer_command))
        .branch(case![Command::Kill(args)].endpoint(admin::kill_command))
}

/// Build the callback query handler.
pub fn callback_handler() -> UpdateHandler<anyhow::Error> {
    Update::filter_callback_query().branch(
        dptree::filter(|q: CallbackQuery| {
            q.data
                .as_ref()
                .map(|d| d.starts_with(CALLBACK_PREFIX))
                .unwrap_or(false)
        })
        .endpoint(actions::pending_callback_handler),
    )
}
