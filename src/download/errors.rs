//! Classification of yt-dlp stderr output into application errors.
//!
//! yt-dlp reports failures as free-form text on stderr; substring
//! matching on the lowered output is the only stable way to tell a
//! removed video from a flaky network.

use crate::core::error::AppError;

/// Maps a yt-dlp failure (exit status non-zero) to an `AppError` based
/// on its stderr output.
pub fn classify_ytdlp_error(stderr: &str) -> AppError {
    let lowered = stderr.to_lowercase();

    if lowered.contains("private video")
        || lowered.contains("video unavailable")
        || lowered.contains("this video is not available")
        || lowered.contains("video is private")
        || lowered.contains("video has been removed")
        || lowered.contains("this video does not exist")
        || lowered.contains("account terminated")
        || lowered.contains("unsupported url")
        || lowered.contains("no video formats found")
        || lowered.contains("requested content is not available")
        || lowered.contains("age-restricted")
        || lowered.contains("sign in to confirm")
        || lowered.contains("http error 404")
        || lowered.contains("http error 403")
    {
        return AppError::Unavailable;
    }

    if lowered.contains("timed out")
        || lowered.contains("timeout")
        || lowered.contains("connection reset")
        || lowered.contains("failed to connect")
        || lowered.contains("network is unreachable")
        || lowered.contains("temporary failure in name resolution")
    {
        return AppError::Timeout;
    }

    if lowered.contains("file is larger than max-filesize") {
        return AppError::TooLarge {
            limit_mb: *crate::config::limits::MAX_FILE_SIZE_MB,
        };
    }

    let detail = stderr
        .lines()
        .rev()
        .find(|l| l.contains("ERROR"))
        .unwrap_or("yt-dlp failed")
        .trim()
        .to_string();
    AppError::DownloadFailed(detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_unavailable_videos() {
        for stderr in [
            "ERROR: [youtube] abc: Private video. Sign in if you've been granted access",
            "ERROR: [youtube] abc: Video unavailable",
            "ERROR: Unsupported URL: https://example.com/page",
            "ERROR: [instagram] abc: Requested content is not available",
        ] {
            assert!(matches!(classify_ytdlp_error(stderr), AppError::Unavailable), "{stderr}");
        }
    }

    #[test]
    fn classifies_network_failures_as_timeouts() {
        for stderr in [
            "ERROR: unable to download video data: <urlopen error timed out>",
            "ERROR: Connection reset by peer",
            "ERROR: unable to download webpage: failed to connect",
        ] {
            assert!(matches!(classify_ytdlp_error(stderr), AppError::Timeout), "{stderr}");
        }
    }

    #[test]
    fn falls_back_to_download_failed_with_last_error_line() {
        let stderr = "WARNING: something minor\nERROR: fragment 3 not found\n";
        match classify_ytdlp_error(stderr) {
            AppError::DownloadFailed(detail) => assert_eq!(detail, "ERROR: fragment 3 not found"),
            other => panic!("unexpected classification: {other:?}"),
        }
    }

    #[test]
    fn empty_stderr_is_a_generic_download_failure() {
        assert!(matches!(classify_ytdlp_error(""), AppError::DownloadFailed(_)));
    }
}
