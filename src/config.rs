use once_cell::sync::Lazy;
use std::env;
use std::time::Duration;

/// Configuration constants for the bot.
///
/// Everything here is read once at startup (or on first use) and never
/// re-read at runtime. Override via environment variables where noted.

/// Cached yt-dlp binary path.
/// Read once from the YTDL_BIN environment variable, defaults to "yt-dlp".
pub static YTDL_BIN: Lazy<String> = Lazy::new(|| env::var("YTDL_BIN").unwrap_or_else(|_| "yt-dlp".to_string()));

/// Folder that per-download temp directories are created under.
/// Read from DOWNLOAD_FOLDER, defaults to ./downloads.
pub static DOWNLOAD_FOLDER: Lazy<String> =
    Lazy::new(|| env::var("DOWNLOAD_FOLDER").unwrap_or_else(|_| "./downloads".to_string()));

/// Default language code for new users.
/// Read from DEFAULT_LANGUAGE, defaults to "ar".
pub static DEFAULT_LANGUAGE: Lazy<String> =
    Lazy::new(|| env::var("DEFAULT_LANGUAGE").unwrap_or_else(|_| "ar".to_string()));

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

/// File size limits
pub mod limits {
    use super::{env_u64, Lazy};

    /// Maximum accepted file size in megabytes.
    /// Read from MAX_FILE_SIZE_MB, defaults to 50 (the Bot API upload cap).
    pub static MAX_FILE_SIZE_MB: Lazy<u64> = Lazy::new(|| env_u64("MAX_FILE_SIZE_MB", 50));

    /// Maximum accepted file size in bytes.
    pub fn max_file_size_bytes() -> u64 {
        *MAX_FILE_SIZE_MB * 1024 * 1024
    }
}

/// Rate limiting configuration
pub mod rate_limit {
    use super::{env_u64, Duration, Lazy};

    /// Number of requests allowed within the window.
    /// Read from RATE_LIMIT_REQUESTS, defaults to 3.
    pub static MAX_REQUESTS: Lazy<u64> = Lazy::new(|| env_u64("RATE_LIMIT_REQUESTS", 3));

    /// Length of the sliding window in seconds.
    /// Read from RATE_LIMIT_WINDOW, defaults to 60.
    pub static WINDOW_SECONDS: Lazy<u64> = Lazy::new(|| env_u64("RATE_LIMIT_WINDOW", 60));

    /// Penalty period after exceeding the limit, in seconds.
    /// Read from COOLDOWN_SECONDS, defaults to 30.
    pub static COOLDOWN_SECONDS: Lazy<u64> = Lazy::new(|| env_u64("COOLDOWN_SECONDS", 30));

    /// Sliding window duration.
    pub fn window() -> Duration {
        Duration::from_secs(*WINDOW_SECONDS)
    }

    /// Cooldown duration.
    pub fn cooldown() -> Duration {
        Duration::from_secs(*COOLDOWN_SECONDS)
    }
}

/// Download configuration
pub mod download {
    use super::Duration;

    /// Socket timeout passed to yt-dlp (in seconds)
    pub const SOCKET_TIMEOUT_SECS: u64 = 30;

    /// Timeout for a metadata probe (in seconds)
    pub const METADATA_TIMEOUT_SECS: u64 = 60;

    /// Timeout for a full download (in seconds)
    pub const DOWNLOAD_TIMEOUT_SECS: u64 = 600;

    /// Number of retries passed to yt-dlp
    pub const YTDLP_RETRIES: u32 = 3;

    /// Metadata probe timeout duration
    pub fn metadata_timeout() -> Duration {
        Duration::from_secs(METADATA_TIMEOUT_SECS)
    }

    /// Full download timeout duration
    pub fn download_timeout() -> Duration {
        Duration::from_secs(DOWNLOAD_TIMEOUT_SECS)
    }
}

/// Network configuration
pub mod network {
    use super::Duration;

    /// Request timeout for the Telegram HTTP client (in seconds).
    /// Generous because file uploads ride on the same client.
    pub const REQUEST_TIMEOUT_SECS: u64 = 300;

    /// Request timeout duration
    pub fn timeout() -> Duration {
        Duration::from_secs(REQUEST_TIMEOUT_SECS)
    }
}

/// Recognized source platforms
pub mod platforms {
    /// Domains the bot accepts URLs from. Subdomains are accepted too.
    pub const SUPPORTED: &[&str] = &[
        "youtube.com",
        "youtu.be",
        "tiktok.com",
        "facebook.com",
        "fb.watch",
        "instagram.com",
        "twitter.com",
        "x.com",
        "dailymotion.com",
        "vimeo.com",
        "twitch.tv",
        "reddit.com",
        "soundcloud.com",
    ];
}

/// Validation configuration
pub mod validation {
    /// Maximum URL length (RFC 7230 recommends 8000, but we use 2048 for safety)
    pub const MAX_URL_LENGTH: usize = 2048;

    /// Titles longer than this are truncated before display
    pub const MAX_TITLE_LENGTH: usize = 60;
}
