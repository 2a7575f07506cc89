//! Transport-agnostic download workflow.
//!
//! A `WorkflowController` owns the full URL-to-delivery conversation for
//! every user: rate limiting, URL admission, the metadata probe, type and
//! quality selection, the download itself and the post-download size
//! check. The Telegram layer only renders the typed results; nothing in
//! here knows about messages or keyboards.
//!
//! Cancellation is generation-based. `admit_url` and `begin_download`
//! capture the session's generation token in their tickets; `/cancel` (or
//! a newer URL) bumps the token, so when the in-flight operation finishes
//! it notices the mismatch, discards its result and stays silent.

use std::path::PathBuf;
use std::sync::Arc;

use teloxide::types::ChatId;

use crate::config;
use crate::core::error::{AppError, AppResult};
use crate::core::rate_limiter::RateLimiter;
use crate::core::session::{DownloadKind, SessionStore, WorkflowState};
use crate::core::validation;
use crate::download::metadata::MediaMetadata;
use crate::download::provider::{MediaProvider, RenditionChoice};

/// Proof that a URL passed admission; carries the generation its
/// follow-up work must still match.
#[derive(Debug, Clone)]
pub struct UrlTicket {
    pub url: String,
    generation: u64,
}

/// Outcome of a metadata probe.
#[derive(Debug)]
pub enum Fetched {
    /// Metadata stored; show the info card and the type menu.
    Stored(MetadataSummary),
    /// The session moved on while probing; say nothing.
    Superseded,
}

/// What the info card needs to show about a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataSummary {
    pub title: String,
    pub duration_secs: u64,
    pub url: String,
    pub views: Option<u64>,
    pub upload_date: Option<String>,
}

/// One row of the quality menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityOption {
    pub label: String,
    /// Estimated size in bytes; 0 when unknown.
    pub filesize: u64,
    /// Estimate exceeds the upload limit; selectable but flagged.
    pub oversized: bool,
}

/// Everything a download task needs, captured before it starts so the
/// session can change underneath without racing it.
#[derive(Debug, Clone)]
pub struct DownloadTicket {
    pub url: String,
    pub choice: RenditionChoice,
    pub kind: DownloadKind,
    pub title: String,
    pub duration_secs: u64,
    generation: u64,
}

/// Outcome of a download.
#[derive(Debug)]
pub enum Downloaded {
    Delivered(Delivery),
    /// Cancelled mid-download; files already removed, say nothing.
    Superseded,
}

/// Files ready to send, plus everything the caption needs.
#[derive(Debug)]
pub struct Delivery {
    pub kind: DownloadKind,
    pub files: Vec<PathBuf>,
    pub title: String,
    pub quality_label: String,
    pub total_size: u64,
    pub duration_secs: u64,
}

pub struct WorkflowController<P: MediaProvider> {
    sessions: Arc<SessionStore>,
    limiter: Arc<RateLimiter>,
    provider: Arc<P>,
}

impl<P: MediaProvider> WorkflowController<P> {
    pub fn new(sessions: Arc<SessionStore>, limiter: Arc<RateLimiter>, provider: Arc<P>) -> Self {
        Self {
            sessions,
            limiter,
            provider,
        }
    }

    /// Admits a message that should contain a URL. On success the session
    /// is reset to track the new URL (cancelling any workflow in
    /// progress) and a ticket for the metadata probe is returned.
    pub async fn admit_url(&self, chat_id: ChatId, text: &str) -> AppResult<UrlTicket> {
        let decision = self.limiter.check_and_record(chat_id).await;
        if !decision.allowed {
            return Err(AppError::RateLimited {
                wait_secs: decision.wait_secs,
            });
        }

        let raw = validation::extract_url(text).ok_or(AppError::InvalidUrl)?;
        let parsed = validation::validate_url(raw)?;
        validation::check_supported_platform(&parsed)?;
        let url = validation::clean_url(parsed.as_str());

        // A new URL supersedes whatever the user was doing
        self.sessions.clear_session(chat_id);
        self.sessions.set_url(chat_id, url.clone());

        Ok(UrlTicket {
            url,
            generation: self.sessions.generation(chat_id),
        })
    }

    /// Probes the source and stores its metadata. Returns `Superseded`
    /// without storing anything if the session was cancelled or replaced
    /// while the probe ran.
    pub async fn fetch_and_store(&self, chat_id: ChatId, ticket: &UrlTicket) -> AppResult<Fetched> {
        let metadata = match self.provider.fetch_metadata(&ticket.url).await {
            Ok(metadata) => metadata,
            Err(e) => {
                if self.sessions.generation(chat_id) != ticket.generation {
                    return Ok(Fetched::Superseded);
                }
                self.sessions.clear_session(chat_id);
                return Err(e);
            }
        };

        if self.sessions.generation(chat_id) != ticket.generation {
            return Ok(Fetched::Superseded);
        }

        let summary = MetadataSummary {
            title: metadata.title.clone(),
            duration_secs: metadata.duration_secs,
            url: ticket.url.clone(),
            views: metadata.views,
            upload_date: metadata.upload_date.clone(),
        };

        self.sessions.set_metadata(chat_id, metadata);
        self.sessions.set_state(chat_id, WorkflowState::AwaitingTypeChoice);

        Ok(Fetched::Stored(summary))
    }

    /// Records the video/audio choice and returns the quality menu.
    ///
    /// A video choice with no video renditions fails with `Unavailable`
    /// and leaves the state untouched, so the user can still pick audio.
    pub fn choose_type(&self, chat_id: ChatId, kind: DownloadKind) -> AppResult<Vec<QualityOption>> {
        let Some(metadata) = self.sessions.metadata(chat_id) else {
            return Err(AppError::General("no media selected".to_string()));
        };

        let options = quality_menu(&metadata, kind);
        if options.is_empty() {
            return Err(AppError::Unavailable);
        }

        self.sessions.set_state(chat_id, WorkflowState::AwaitingQualityChoice(kind));
        Ok(options)
    }

    /// Steps back from the quality menu to the type menu.
    pub fn go_back(&self, chat_id: ChatId) -> AppResult<MetadataSummary> {
        let summary = self.summary(chat_id).ok_or_else(|| {
            AppError::General("no media selected".to_string())
        })?;
        self.sessions.set_state(chat_id, WorkflowState::AwaitingTypeChoice);
        Ok(summary)
    }

    /// Info card data for the currently tracked source, if any.
    pub fn summary(&self, chat_id: ChatId) -> Option<MetadataSummary> {
        let metadata = self.sessions.metadata(chat_id)?;
        let url = self.sessions.url(chat_id)?;
        Some(MetadataSummary {
            title: metadata.title,
            duration_secs: metadata.duration_secs,
            url,
            views: metadata.views,
            upload_date: metadata.upload_date,
        })
    }

    /// Resolves a quality-menu index into a download ticket and moves the
    /// session to `Downloading`.
    ///
    /// Oversized video estimates are rejected here, before any bytes
    /// move. Audio estimates are unreliable (transcoding changes the
    /// size), so audio is only checked after the fact.
    pub fn begin_download(&self, chat_id: ChatId, index: usize) -> AppResult<DownloadTicket> {
        let kind = match self.sessions.state(chat_id) {
            WorkflowState::AwaitingQualityChoice(kind) => kind,
            // A repeat tap must not cancel the download it started
            WorkflowState::Downloading => {
                return Err(AppError::General("download already in progress".to_string()));
            }
            _ => {
                self.sessions.clear_session(chat_id);
                return Err(AppError::General("session expired".to_string()));
            }
        };

        let (Some(metadata), Some(url)) = (self.sessions.metadata(chat_id), self.sessions.url(chat_id)) else {
            self.sessions.clear_session(chat_id);
            return Err(AppError::General("session expired".to_string()));
        };

        let choice = match kind {
            DownloadKind::Video => {
                let Some(rendition) = metadata.video.get(index) else {
                    self.sessions.clear_session(chat_id);
                    return Err(AppError::General("stale quality selection".to_string()));
                };
                let limit = config::limits::max_file_size_bytes();
                if rendition.filesize > limit {
                    self.sessions.clear_session(chat_id);
                    return Err(AppError::TooLarge {
                        limit_mb: *config::limits::MAX_FILE_SIZE_MB,
                    });
                }
                RenditionChoice::Video {
                    height: rendition.height,
                    format_id: rendition.format_id.clone(),
                }
            }
            DownloadKind::Audio => {
                let Some(rendition) = metadata.audio.get(index) else {
                    self.sessions.clear_session(chat_id);
                    return Err(AppError::General("stale quality selection".to_string()));
                };
                RenditionChoice::Audio {
                    bitrate: rendition.bitrate,
                }
            }
        };

        self.sessions.set_state(chat_id, WorkflowState::Downloading);

        Ok(DownloadTicket {
            url,
            choice,
            kind,
            title: metadata.title,
            duration_secs: metadata.duration_secs,
            generation: self.sessions.generation(chat_id),
        })
    }

    /// Runs the download a ticket describes and finishes the session.
    ///
    /// Any outcome ends the workflow: success, failure and supersession
    /// all leave the user back in `Idle` (supersession already cleared
    /// the session when the cancel happened).
    pub async fn run_download(&self, chat_id: ChatId, ticket: &DownloadTicket) -> AppResult<Downloaded> {
        let files = match self.provider.download(&ticket.url, &ticket.choice).await {
            Ok(files) => files,
            Err(e) => {
                if self.sessions.generation(chat_id) != ticket.generation {
                    return Ok(Downloaded::Superseded);
                }
                self.sessions.clear_session(chat_id);
                return Err(e);
            }
        };

        if self.sessions.generation(chat_id) != ticket.generation {
            self.provider.cleanup(&files).await;
            return Ok(Downloaded::Superseded);
        }

        let total_size = total_file_size(&files);

        // Albums and galleries come back as several files; the estimate
        // the user saw covered one item, so the limit only binds for a
        // single output file.
        if files.len() == 1 && total_size > config::limits::max_file_size_bytes() {
            self.provider.cleanup(&files).await;
            self.sessions.clear_session(chat_id);
            return Err(AppError::TooLarge {
                limit_mb: *config::limits::MAX_FILE_SIZE_MB,
            });
        }

        self.sessions.clear_session(chat_id);

        Ok(Downloaded::Delivered(Delivery {
            kind: ticket.kind,
            files,
            title: ticket.title.clone(),
            quality_label: ticket.choice.label(),
            total_size,
            duration_secs: ticket.duration_secs,
        }))
    }

    /// Aborts whatever the user is doing. In-flight work notices via the
    /// generation bump and discards its result.
    pub fn cancel(&self, chat_id: ChatId) {
        self.sessions.clear_session(chat_id);
        log::info!("User {chat_id} cancelled their session");
    }
}

fn quality_menu(metadata: &MediaMetadata, kind: DownloadKind) -> Vec<QualityOption> {
    let limit = config::limits::max_file_size_bytes();
    match kind {
        DownloadKind::Video => metadata
            .video
            .iter()
            .map(|r| QualityOption {
                label: r.label(),
                filesize: r.filesize,
                oversized: r.filesize > limit,
            })
            .collect(),
        DownloadKind::Audio => metadata
            .audio
            .iter()
            .map(|r| QualityOption {
                label: r.label(),
                filesize: r.filesize,
                oversized: r.filesize > limit,
            })
            .collect(),
    }
}

fn total_file_size(files: &[PathBuf]) -> u64 {
    files
        .iter()
        .filter_map(|f| std::fs::metadata(f).ok())
        .map(|m| m.len())
        .sum()
}
