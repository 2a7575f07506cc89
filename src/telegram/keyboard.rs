//! Inline keyboards for the download conversation.
//!
//! Callback data formats:
//! - `type:video` / `type:audio`  — download type menu
//! - `quality:<i>` / `audio:<i>`  — index into the quality menu
//! - `action:back` / `action:cancel`
//! - `lang:<code>`                — language menu

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

use crate::core::format::format_file_size;
use crate::core::session::DownloadKind;
use crate::i18n::{t, Lang};
use crate::workflow::QualityOption;

/// Video/audio choice shown under the info card.
pub fn type_choice(lang: Lang) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            InlineKeyboardButton::callback(t(lang, "btn-video"), "type:video"),
            InlineKeyboardButton::callback(t(lang, "btn-audio"), "type:audio"),
        ],
        vec![InlineKeyboardButton::callback(t(lang, "btn-cancel"), "action:cancel")],
    ])
}

/// Quality menu for the chosen download type, two options per row,
/// with back/cancel underneath. Oversized estimates stay selectable but
/// get a warning marker.
pub fn quality_choice(lang: Lang, kind: DownloadKind, options: &[QualityOption]) -> InlineKeyboardMarkup {
    let prefix = match kind {
        DownloadKind::Video => "quality",
        DownloadKind::Audio => "audio",
    };

    let buttons: Vec<InlineKeyboardButton> = options
        .iter()
        .enumerate()
        .map(|(i, opt)| InlineKeyboardButton::callback(quality_label(opt), format!("{prefix}:{i}")))
        .collect();

    let mut rows: Vec<Vec<InlineKeyboardButton>> = buttons.chunks(2).map(|chunk| chunk.to_vec()).collect();
    rows.push(vec![
        InlineKeyboardButton::callback(t(lang, "btn-back"), "action:back"),
        InlineKeyboardButton::callback(t(lang, "btn-cancel"), "action:cancel"),
    ]);

    InlineKeyboardMarkup::new(rows)
}

fn quality_label(opt: &QualityOption) -> String {
    let mut label = match format_file_size(opt.filesize) {
        Some(size) => format!("{} ({})", opt.label, size),
        None => opt.label.clone(),
    };
    if opt.oversized {
        label = format!("⚠️ {label}");
    }
    label
}

/// Language menu for /lang.
pub fn language_choice() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback(Lang::Ar.name(), format!("lang:{}", Lang::Ar.code())),
        InlineKeyboardButton::callback(Lang::En.name(), format!("lang:{}", Lang::En.code())),
    ]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use teloxide::types::InlineKeyboardButtonKind;

    fn callback_data(btn: &InlineKeyboardButton) -> &str {
        match &btn.kind {
            InlineKeyboardButtonKind::CallbackData(data) => data,
            other => panic!("unexpected button kind: {other:?}"),
        }
    }

    #[test]
    fn type_menu_has_video_audio_and_cancel() {
        let markup = type_choice(Lang::En);
        assert_eq!(callback_data(&markup.inline_keyboard[0][0]), "type:video");
        assert_eq!(callback_data(&markup.inline_keyboard[0][1]), "type:audio");
        assert_eq!(callback_data(&markup.inline_keyboard[1][0]), "action:cancel");
    }

    #[test]
    fn quality_menu_indexes_options_in_order() {
        let options = vec![
            QualityOption {
                label: "360p".into(),
                filesize: 5_000_000,
                oversized: false,
            },
            QualityOption {
                label: "720p".into(),
                filesize: 80 * 1024 * 1024,
                oversized: true,
            },
            QualityOption {
                label: "best".into(),
                filesize: 0,
                oversized: false,
            },
        ];

        let markup = quality_choice(Lang::En, DownloadKind::Video, &options);
        let flat: Vec<&InlineKeyboardButton> = markup.inline_keyboard.iter().flatten().collect();

        assert_eq!(callback_data(flat[0]), "quality:0");
        assert_eq!(callback_data(flat[1]), "quality:1");
        assert_eq!(callback_data(flat[2]), "quality:2");
        // Last row is back + cancel
        assert_eq!(callback_data(flat[3]), "action:back");
        assert_eq!(callback_data(flat[4]), "action:cancel");

        assert!(flat[0].text.contains("4.8 MB"));
        assert!(flat[1].text.starts_with("⚠️"));
        // Unknown size: bare label
        assert_eq!(flat[2].text, "best");
    }

    #[test]
    fn audio_menu_uses_audio_prefix() {
        let options = vec![QualityOption {
            label: "128kbps".into(),
            filesize: 0,
            oversized: false,
        }];
        let markup = quality_choice(Lang::Ar, DownloadKind::Audio, &options);
        assert_eq!(callback_data(&markup.inline_keyboard[0][0]), "audio:0");
    }

    #[test]
    fn language_menu_covers_both_languages() {
        let markup = language_choice();
        assert_eq!(callback_data(&markup.inline_keyboard[0][0]), "lang:ar");
        assert_eq!(callback_data(&markup.inline_keyboard[0][1]), "lang:en");
    }
}
