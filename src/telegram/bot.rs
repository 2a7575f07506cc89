//! Bot instance creation and the command surface.

use reqwest::ClientBuilder;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::config;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "start the bot")]
    Start,
    #[command(description = "usage guide")]
    Help,
    #[command(description = "change language")]
    Lang,
    #[command(description = "cancel the current operation")]
    Cancel,
}

/// Creates a Bot instance reading the token from TELOXIDE_TOKEN.
///
/// The HTTP client gets a generous timeout because file uploads ride on
/// the same client as ordinary API calls.
pub fn create_bot() -> anyhow::Result<Bot> {
    let client = ClientBuilder::new().timeout(config::network::timeout()).build()?;
    Ok(Bot::from_env_with_client(client))
}

/// Registers the command list in the Telegram UI.
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(Command::bot_commands()).await?;
    Ok(())
}
