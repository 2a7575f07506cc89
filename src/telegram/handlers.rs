//! Dispatcher schema and the message/callback handler chain.
//!
//! Handlers render typed workflow results into messages; every decision
//! about admission, state and sizes lives in the workflow controller.
//! The conversation is driven through a single status message that gets
//! edited in place as the workflow advances.

use std::sync::Arc;

use fluent_templates::fluent_bundle::FluentValue;
use teloxide::dispatching::{UpdateFilterExt, UpdateHandler};
use teloxide::prelude::*;
use teloxide::types::{InputFile, InputMedia, InputMediaVideo, MessageId};

use crate::core::error::{AppError, AppResult};
use crate::core::format::{format_duration, format_file_size, format_upload_date, format_views};
use crate::core::session::{DownloadKind, SessionStore};
use crate::core::validation::detect_platform;
use crate::download::provider::MediaProvider;
use crate::download::ytdlp::YtDlpProvider;
use crate::i18n::{error_message, t, t_args, Lang};
use crate::telegram::bot::Command;
use crate::telegram::commands::handle_command;
use crate::telegram::keyboard;
use crate::workflow::{Delivery, DownloadTicket, Downloaded, Fetched, MetadataSummary, WorkflowController};

/// Error type for handlers
pub type HandlerError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Dependencies required by handlers
#[derive(Clone)]
pub struct HandlerDeps {
    pub sessions: Arc<SessionStore>,
    pub controller: Arc<WorkflowController<YtDlpProvider>>,
    pub provider: Arc<YtDlpProvider>,
}

/// Creates the main dispatcher schema for the bot.
///
/// The same schema is used in production and in integration tests.
pub fn schema(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    let deps_commands = deps.clone();
    let deps_messages = deps.clone();
    let deps_callbacks = deps;

    dptree::entry()
        .branch(command_handler(deps_commands))
        .branch(message_handler(deps_messages))
        .branch(callback_handler(deps_callbacks))
}

fn command_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter_command::<Command>()
        .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
            let deps = deps.clone();
            async move {
                if let Err(e) = handle_command(&bot, &msg, cmd, &deps).await {
                    log::error!("Command handler failed for {}: {e}", msg.chat.id);
                }
                Ok(())
            }
        })
}

fn message_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_message()
        .filter(|msg: Message| msg.text().is_some())
        .endpoint(move |bot: Bot, msg: Message| {
            let deps = deps.clone();
            async move {
                if let Err(e) = handle_message(&bot, &msg, &deps).await {
                    log::error!("Message handler failed for {}: {e}", msg.chat.id);
                }
                Ok(())
            }
        })
}

fn callback_handler(deps: HandlerDeps) -> UpdateHandler<HandlerError> {
    Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
        let deps = deps.clone();
        async move {
            if let Err(e) = handle_callback(&bot, &q, &deps).await {
                log::error!("Callback handler failed: {e}");
            }
            Ok(())
        }
    })
}

/// Entry point for plain text messages: admits the URL, probes metadata
/// and shows the info card with the type menu.
async fn handle_message(bot: &Bot, msg: &Message, deps: &HandlerDeps) -> AppResult<()> {
    let chat_id = msg.chat.id;
    let text = msg.text().unwrap_or_default();

    let client_lang = msg
        .from
        .as_ref()
        .and_then(|u| u.language_code.as_deref())
        .and_then(Lang::from_code);
    deps.sessions.init_user(chat_id, client_lang);
    let lang = deps.sessions.lang(chat_id);

    let ticket = match deps.controller.admit_url(chat_id, text).await {
        Ok(ticket) => ticket,
        Err(e) => {
            log::info!("URL rejected for {chat_id}: {e}");
            bot.send_message(chat_id, error_message(lang, &e)).await?;
            return Ok(());
        }
    };

    let status = bot.send_message(chat_id, t(lang, "fetching-info")).await?;

    match deps.controller.fetch_and_store(chat_id, &ticket).await {
        Ok(Fetched::Stored(summary)) => {
            let text = format!("{}\n\n{}", info_card(lang, &summary), t(lang, "choose-type"));
            bot.edit_message_text(chat_id, status.id, text)
                .reply_markup(keyboard::type_choice(lang))
                .await?;
        }
        Ok(Fetched::Superseded) => {
            // The user moved on while we were probing; drop the stale card
            let _ = bot.delete_message(chat_id, status.id).await;
        }
        Err(e) => {
            log::warn!("Metadata probe failed for {chat_id}: {e}");
            bot.edit_message_text(chat_id, status.id, error_message(lang, &e)).await?;
        }
    }

    Ok(())
}

/// Routes inline keyboard presses by their callback data prefix.
async fn handle_callback(bot: &Bot, q: &CallbackQuery, deps: &HandlerDeps) -> AppResult<()> {
    bot.answer_callback_query(q.id.clone()).await?;

    let (Some(data), Some(message)) = (q.data.as_deref(), q.message.as_ref()) else {
        return Ok(());
    };
    let chat_id = message.chat().id;
    let message_id = message.id();
    let lang = deps.sessions.lang(chat_id);

    match data.split_once(':') {
        Some(("lang", code)) => handle_lang_choice(bot, chat_id, message_id, code, deps).await,
        Some(("type", kind)) => {
            let kind = match kind {
                "video" => DownloadKind::Video,
                _ => DownloadKind::Audio,
            };
            handle_type_choice(bot, chat_id, message_id, lang, kind, deps).await
        }
        Some(("quality", index)) => {
            handle_quality_choice(bot, chat_id, message_id, lang, index, deps).await
        }
        Some(("audio", index)) => {
            handle_quality_choice(bot, chat_id, message_id, lang, index, deps).await
        }
        Some(("action", "back")) => handle_back(bot, chat_id, message_id, lang, deps).await,
        Some(("action", "cancel")) => {
            deps.controller.cancel(chat_id);
            bot.edit_message_text(chat_id, message_id, t(lang, "cancelled")).await?;
            Ok(())
        }
        _ => {
            log::warn!("Unrecognized callback data from {chat_id}: {data}");
            Ok(())
        }
    }
}

async fn handle_lang_choice(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    code: &str,
    deps: &HandlerDeps,
) -> AppResult<()> {
    let Some(lang) = Lang::from_code(code) else {
        return Ok(());
    };
    deps.sessions.set_lang(chat_id, lang);
    bot.edit_message_text(chat_id, message_id, t(lang, "language-changed"))
        .await?;
    Ok(())
}

async fn handle_type_choice(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    lang: Lang,
    kind: DownloadKind,
    deps: &HandlerDeps,
) -> AppResult<()> {
    let options = match deps.controller.choose_type(chat_id, kind) {
        Ok(options) => options,
        Err(e) => {
            bot.edit_message_text(chat_id, message_id, error_message(lang, &e)).await?;
            return Ok(());
        }
    };

    let prompt = match kind {
        DownloadKind::Video => t(lang, "choose-quality"),
        DownloadKind::Audio => t(lang, "choose-audio-quality"),
    };
    bot.edit_message_text(chat_id, message_id, prompt)
        .reply_markup(keyboard::quality_choice(lang, kind, &options))
        .await?;
    Ok(())
}

async fn handle_quality_choice(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    lang: Lang,
    index: &str,
    deps: &HandlerDeps,
) -> AppResult<()> {
    let index: usize = match index.parse() {
        Ok(index) => index,
        Err(_) => {
            log::warn!("Malformed quality index from {chat_id}: {index}");
            return Ok(());
        }
    };

    let ticket = match deps.controller.begin_download(chat_id, index) {
        Ok(ticket) => ticket,
        Err(e) => {
            bot.edit_message_text(chat_id, message_id, error_message(lang, &e)).await?;
            return Ok(());
        }
    };

    bot.edit_message_text(chat_id, message_id, t(lang, "downloading")).await?;

    run_download_flow(bot, chat_id, message_id, lang, &ticket, deps).await
}

async fn handle_back(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    lang: Lang,
    deps: &HandlerDeps,
) -> AppResult<()> {
    match deps.controller.go_back(chat_id) {
        Ok(summary) => {
            let text = format!("{}\n\n{}", info_card(lang, &summary), t(lang, "choose-type"));
            bot.edit_message_text(chat_id, message_id, text)
                .reply_markup(keyboard::type_choice(lang))
                .await?;
        }
        Err(e) => {
            bot.edit_message_text(chat_id, message_id, error_message(lang, &e)).await?;
        }
    }
    Ok(())
}

/// Runs the download a ticket describes and delivers the result,
/// narrating progress through the status message.
async fn run_download_flow(
    bot: &Bot,
    chat_id: ChatId,
    message_id: MessageId,
    lang: Lang,
    ticket: &DownloadTicket,
    deps: &HandlerDeps,
) -> AppResult<()> {
    let delivery = match deps.controller.run_download(chat_id, ticket).await {
        Ok(Downloaded::Delivered(delivery)) => delivery,
        Ok(Downloaded::Superseded) => {
            let _ = bot.delete_message(chat_id, message_id).await;
            return Ok(());
        }
        Err(e) => {
            log::warn!("Download failed for {chat_id}: {e}");
            bot.edit_message_text(chat_id, message_id, error_message(lang, &e)).await?;
            return Ok(());
        }
    };

    bot.edit_message_text(chat_id, message_id, t(lang, "uploading")).await?;

    let sent = send_delivery(bot, chat_id, lang, &delivery).await;
    deps.provider.cleanup(&delivery.files).await;

    match sent {
        Ok(()) => {
            bot.edit_message_text(chat_id, message_id, t(lang, "done")).await?;
        }
        Err(e) => {
            log::error!("Upload failed for {chat_id}: {e}");
            bot.edit_message_text(chat_id, message_id, error_message(lang, &AppError::from(e)))
                .await?;
        }
    }

    Ok(())
}

/// Uploads the downloaded files. Multi-file video results (carousels,
/// galleries) go out as one media group with the caption on the first
/// item; everything else is a single send.
async fn send_delivery(bot: &Bot, chat_id: ChatId, lang: Lang, delivery: &Delivery) -> Result<(), teloxide::RequestError> {
    let caption = caption(lang, delivery);

    match delivery.kind {
        DownloadKind::Video if delivery.files.len() > 1 => {
            bot.send_media_group(chat_id, video_media_group(&caption, &delivery.files))
                .await?;
        }
        DownloadKind::Video => {
            if let Some(file) = delivery.files.first() {
                bot.send_video(chat_id, InputFile::file(file.clone()))
                    .caption(caption)
                    .await?;
            }
        }
        DownloadKind::Audio => {
            for (i, file) in delivery.files.iter().enumerate() {
                let mut request = bot.send_audio(chat_id, InputFile::file(file.clone()));
                if i == 0 {
                    request = request.caption(caption.clone());
                }
                request.await?;
            }
        }
    }

    Ok(())
}

/// Builds the album for a multi-file video result. The caption rides on
/// the first item only; Telegram shows it under the whole group.
fn video_media_group(caption: &str, files: &[std::path::PathBuf]) -> Vec<InputMedia> {
    files
        .iter()
        .enumerate()
        .map(|(i, file)| {
            let mut video = InputMediaVideo::new(InputFile::file(file.clone()));
            if i == 0 {
                video = video.caption(caption.to_string());
            }
            InputMedia::Video(video)
        })
        .collect()
}

/// Renders the info card shown after a successful metadata probe.
fn info_card(lang: Lang, summary: &MetadataSummary) -> String {
    let unknown = t(lang, "size-unknown");
    t_args(
        lang,
        "video-info",
        &[
            ("title", FluentValue::from(summary.title.clone())),
            ("duration", FluentValue::from(format_duration(summary.duration_secs))),
            (
                "views",
                FluentValue::from(summary.views.map(format_views).unwrap_or_else(|| unknown.clone())),
            ),
            (
                "date",
                FluentValue::from(
                    summary
                        .upload_date
                        .as_deref()
                        .map(format_upload_date)
                        .unwrap_or(unknown),
                ),
            ),
            ("platform", FluentValue::from(detect_platform(&summary.url))),
        ],
    )
}

fn caption(lang: Lang, delivery: &Delivery) -> String {
    let key = match delivery.kind {
        DownloadKind::Video => "caption-video",
        DownloadKind::Audio => "caption-audio",
    };
    let size = format_file_size(delivery.total_size).unwrap_or_else(|| t(lang, "size-unknown"));
    t_args(
        lang,
        key,
        &[
            ("title", FluentValue::from(delivery.title.clone())),
            ("quality", FluentValue::from(delivery.quality_label.clone())),
            ("size", FluentValue::from(size)),
            ("duration", FluentValue::from(format_duration(delivery.duration_secs))),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn multi_file_video_becomes_one_album_with_a_single_caption() {
        let files = vec![PathBuf::from("/tmp/a.mp4"), PathBuf::from("/tmp/b.mp4"), PathBuf::from("/tmp/c.mp4")];

        let group = video_media_group("My Clip", &files);

        assert_eq!(group.len(), 3);
        for (i, item) in group.iter().enumerate() {
            let InputMedia::Video(video) = item else {
                panic!("expected a video item at index {i}");
            };
            if i == 0 {
                assert_eq!(video.caption.as_deref(), Some("My Clip"));
            } else {
                assert_eq!(video.caption, None);
            }
        }
    }
}
