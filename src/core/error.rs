use thiserror::Error;

/// Centralized error types for the application.
///
/// Every failure that can reach a user maps to exactly one variant, and
/// every variant maps to exactly one localized message key. Infrastructure
/// errors (IO, JSON, Telegram) render as the general message; their detail
/// only goes to the logs.
#[derive(Error, Debug)]
pub enum AppError {
    /// The text did not contain a well-formed http(s) URL
    #[error("invalid URL")]
    InvalidUrl,

    /// URL is well-formed but not from a recognized platform
    #[error("unsupported platform: {0}")]
    UnsupportedPlatform(String),

    /// Media is deleted, private, geo-blocked or requires login
    #[error("media unavailable")]
    Unavailable,

    /// Estimated or actual size exceeds the configured maximum
    #[error("file exceeds the {limit_mb} MB limit")]
    TooLarge { limit_mb: u64 },

    /// Metadata probe or download did not finish in time
    #[error("operation timed out")]
    Timeout,

    /// Generic provider failure
    #[error("download failed: {0}")]
    DownloadFailed(String),

    /// Sliding-window limit exceeded or cooldown active
    #[error("rate limited, retry in {wait_secs}s")]
    RateLimited { wait_secs: u64 },

    /// Internal/unexpected errors
    #[error("internal error: {0}")]
    General(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// yt-dlp JSON output errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Telegram API errors
    #[error("Telegram error: {0}")]
    Telegram(#[from] teloxide::RequestError),
}

/// Type alias for Result with AppError
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Localization key of the single user-visible message for this error.
    pub fn message_key(&self) -> &'static str {
        match self {
            AppError::InvalidUrl => "err-invalid-url",
            AppError::UnsupportedPlatform(_) => "err-unsupported-platform",
            AppError::Unavailable => "err-unavailable",
            AppError::TooLarge { .. } => "err-too-large",
            AppError::Timeout => "err-timeout",
            AppError::DownloadFailed(_) => "err-download-failed",
            AppError::RateLimited { .. } => "err-rate-limited",
            AppError::General(_) | AppError::Io(_) | AppError::Json(_) | AppError::Telegram(_) => "err-general",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_has_a_message_key() {
        let errors = [
            AppError::InvalidUrl,
            AppError::UnsupportedPlatform("example.com".into()),
            AppError::Unavailable,
            AppError::TooLarge { limit_mb: 50 },
            AppError::Timeout,
            AppError::DownloadFailed("boom".into()),
            AppError::RateLimited { wait_secs: 30 },
            AppError::General("oops".into()),
        ];

        for err in &errors {
            assert!(err.message_key().starts_with("err-"), "{:?}", err);
        }
    }

    #[test]
    fn infrastructure_errors_render_as_general() {
        let io = AppError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk"));
        assert_eq!(io.message_key(), "err-general");
    }
}
