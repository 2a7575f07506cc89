use dashmap::DashMap;
use teloxide::types::ChatId;

use crate::download::metadata::MediaMetadata;
use crate::i18n::{self, Lang};

/// What the user asked to download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadKind {
    Video,
    Audio,
}

/// Step of the guided quality-selection conversation a user is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkflowState {
    #[default]
    Idle,
    AwaitingTypeChoice,
    AwaitingQualityChoice(DownloadKind),
    Downloading,
}

/// Ephemeral per-user state. Not persisted; a restart sends everyone
/// back to `Idle`.
#[derive(Debug, Clone)]
pub struct UserSession {
    pub lang: Lang,
    pub state: WorkflowState,
    pub pending_url: Option<String>,
    pub metadata: Option<MediaMetadata>,
    /// Bumped on every `clear_session`. In-flight operations capture it
    /// when they start and discard their result if it moved on, so a
    /// completion can never act on a session that was cancelled under it.
    pub generation: u64,
}

impl Default for UserSession {
    fn default() -> Self {
        Self {
            lang: i18n::default_lang(),
            state: WorkflowState::Idle,
            pending_url: None,
            metadata: None,
            generation: 0,
        }
    }
}

/// In-memory store of user sessions, keyed by chat id.
///
/// The map gives per-key locking; every accessor touches a single entry,
/// so per-user mutations are atomic with respect to reads of the same
/// user's record. Reads on absent users return defaults without creating
/// a record.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<ChatId, UserSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a record for the user if absent. Never overwrites an
    /// existing record (in particular, never resets a chosen language).
    pub fn init_user(&self, chat_id: ChatId, lang: Option<Lang>) {
        self.sessions.entry(chat_id).or_insert_with(|| UserSession {
            lang: lang.unwrap_or_else(i18n::default_lang),
            ..UserSession::default()
        });
    }

    pub fn lang(&self, chat_id: ChatId) -> Lang {
        self.sessions
            .get(&chat_id)
            .map(|s| s.lang)
            .unwrap_or_else(i18n::default_lang)
    }

    pub fn set_lang(&self, chat_id: ChatId, lang: Lang) {
        self.sessions.entry(chat_id).or_default().lang = lang;
        log::info!("User {} language set to: {}", chat_id, lang.code());
    }

    pub fn state(&self, chat_id: ChatId) -> WorkflowState {
        self.sessions.get(&chat_id).map(|s| s.state).unwrap_or_default()
    }

    pub fn set_state(&self, chat_id: ChatId, state: WorkflowState) {
        self.sessions.entry(chat_id).or_default().state = state;
    }

    pub fn url(&self, chat_id: ChatId) -> Option<String> {
        self.sessions.get(&chat_id).and_then(|s| s.pending_url.clone())
    }

    pub fn set_url(&self, chat_id: ChatId, url: String) {
        self.sessions.entry(chat_id).or_default().pending_url = Some(url);
    }

    pub fn metadata(&self, chat_id: ChatId) -> Option<MediaMetadata> {
        self.sessions.get(&chat_id).and_then(|s| s.metadata.clone())
    }

    pub fn set_metadata(&self, chat_id: ChatId, metadata: MediaMetadata) {
        self.sessions.entry(chat_id).or_default().metadata = Some(metadata);
    }

    /// Current generation token for the user (0 when no record exists).
    pub fn generation(&self, chat_id: ChatId) -> u64 {
        self.sessions.get(&chat_id).map(|s| s.generation).unwrap_or(0)
    }

    /// Resets workflow state, pending URL and metadata; keeps the
    /// language; bumps the generation so stale completions notice.
    pub fn clear_session(&self, chat_id: ChatId) {
        let mut entry = self.sessions.entry(chat_id).or_default();
        entry.state = WorkflowState::Idle;
        entry.pending_url = None;
        entry.metadata = None;
        entry.generation += 1;
    }
}
