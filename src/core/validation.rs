//! URL extraction, validation and platform detection for user input.
//!
//! Whitelist-based: only http(s) URLs whose host belongs to one of the
//! recognized platforms (or a subdomain of one) are accepted.

use lazy_regex::regex;
use url::Url;

use crate::config;
use crate::core::error::AppError;

/// Extracts the first http(s) URL from free-form message text.
pub fn extract_url(text: &str) -> Option<&str> {
    regex!(r#"https?://[^\s<>"{}|\\^`\[\]]+"#)
        .find(text)
        .map(|m| m.as_str())
}

/// Validates that a string is a well-formed http(s) URL with a host.
pub fn validate_url(url: &str) -> Result<Url, AppError> {
    if url.len() > config::validation::MAX_URL_LENGTH {
        return Err(AppError::InvalidUrl);
    }

    let parsed = Url::parse(url.trim()).map_err(|_| AppError::InvalidUrl)?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(AppError::InvalidUrl);
    }
    if parsed.host_str().is_none() {
        return Err(AppError::InvalidUrl);
    }

    Ok(parsed)
}

/// Checks that the URL's host is one of the recognized platforms.
pub fn check_supported_platform(parsed: &Url) -> Result<(), AppError> {
    let host = parsed.host_str().unwrap_or_default().to_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    let supported = config::platforms::SUPPORTED
        .iter()
        .any(|p| host == *p || host.ends_with(&format!(".{p}")));

    if supported {
        Ok(())
    } else {
        Err(AppError::UnsupportedPlatform(host.to_string()))
    }
}

/// Human-readable platform name for display in the video info card.
pub fn detect_platform(url: &str) -> &'static str {
    let url_lower = url.to_lowercase();
    let map: &[(&str, &str)] = &[
        ("youtube.com", "YouTube"),
        ("youtu.be", "YouTube"),
        ("tiktok.com", "TikTok"),
        ("facebook.com", "Facebook"),
        ("fb.watch", "Facebook"),
        ("instagram.com/stories", "Instagram Story"),
        ("instagram.com/reel", "Instagram Reel"),
        ("instagram.com", "Instagram"),
        ("twitter.com", "Twitter/X"),
        ("x.com", "Twitter/X"),
        ("dailymotion.com", "Dailymotion"),
        ("vimeo.com", "Vimeo"),
        ("twitch.tv", "Twitch"),
        ("reddit.com", "Reddit"),
        ("soundcloud.com", "SoundCloud"),
    ];

    for (needle, name) in map {
        if url_lower.contains(needle) {
            return name;
        }
    }
    "Unknown"
}

/// Strips tracking parameters where they are known to be irrelevant.
/// youtu.be short links carry the video id in the path, so the query
/// can be dropped wholesale.
pub fn clean_url(url: &str) -> String {
    let url = url.trim();
    if url.contains("youtu.be/") {
        return url.split('?').next().unwrap_or(url).to_string();
    }
    url.to_string()
}
