//! Clipfetch - Telegram bot for downloading video and audio from popular platforms
//!
//! This library provides the building blocks of the bot:
//!
//! - `core`: errors, rate limiting, per-user sessions, validation, formatting
//! - `download`: the media provider abstraction and its yt-dlp implementation
//! - `workflow`: the quality-selection state machine driving a download
//! - `telegram`: teloxide dispatcher schema, keyboards and handlers

pub mod config;
pub mod core;
pub mod download;
pub mod i18n;
pub mod telegram;
pub mod workflow;

// Re-export commonly used types for convenience
pub use core::error::{AppError, AppResult};
pub use core::rate_limiter::RateLimiter;
pub use core::session::SessionStore;
pub use download::ytdlp::YtDlpProvider;
pub use telegram::handlers::{schema, HandlerDeps};
pub use workflow::controller::WorkflowController;
