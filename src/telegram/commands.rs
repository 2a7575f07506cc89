//! Slash command handlers.

use fluent_templates::fluent_bundle::FluentValue;
use teloxide::prelude::*;

use crate::config;
use crate::core::error::AppResult;
use crate::i18n::{t, t_args, Lang};
use crate::telegram::bot::Command;
use crate::telegram::handlers::HandlerDeps;
use crate::telegram::keyboard;

pub async fn handle_command(bot: &Bot, msg: &Message, cmd: Command, deps: &HandlerDeps) -> AppResult<()> {
    let chat_id = msg.chat.id;

    // First contact seeds the session with Telegram's client language
    let client_lang = msg
        .from
        .as_ref()
        .and_then(|u| u.language_code.as_deref())
        .and_then(Lang::from_code);
    deps.sessions.init_user(chat_id, client_lang);
    let lang = deps.sessions.lang(chat_id);

    match cmd {
        Command::Start => {
            log::info!("User {chat_id} started the bot");
            bot.send_message(chat_id, t(lang, "welcome")).await?;
        }
        Command::Help => {
            let text = t_args(
                lang,
                "help",
                &[("max", FluentValue::from(*config::limits::MAX_FILE_SIZE_MB))],
            );
            bot.send_message(chat_id, text).await?;
        }
        Command::Lang => {
            bot.send_message(chat_id, t(lang, "choose-language"))
                .reply_markup(keyboard::language_choice())
                .await?;
        }
        Command::Cancel => {
            deps.controller.cancel(chat_id);
            bot.send_message(chat_id, t(lang, "cancelled")).await?;
        }
    }

    Ok(())
}
