//! Transport-agnostic interface to the media backend.
//!
//! The workflow layer talks to a `MediaProvider` rather than to yt-dlp
//! directly, so the state machine can be exercised in tests without
//! spawning processes.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::core::error::AppResult;
use crate::download::metadata::{MediaMetadata, BEST_HEIGHT};

/// The concrete rendition the user picked from the quality menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenditionChoice {
    Video { height: u32, format_id: String },
    Audio { bitrate: u32 },
}

impl RenditionChoice {
    /// Quality label shown in captions ("720p", "best", "192kbps").
    pub fn label(&self) -> String {
        match self {
            Self::Video { height, .. } if *height == BEST_HEIGHT => "best".to_string(),
            Self::Video { height, .. } => format!("{height}p"),
            Self::Audio { bitrate } => format!("{bitrate}kbps"),
        }
    }
}

/// Backend capable of inspecting and downloading remote media.
#[async_trait]
pub trait MediaProvider: Send + Sync {
    /// Probes the source without downloading anything.
    async fn fetch_metadata(&self, url: &str) -> AppResult<MediaMetadata>;

    /// Downloads the chosen rendition. Returns the resulting files
    /// (more than one when the source is an album or gallery).
    async fn download(&self, url: &str, choice: &RenditionChoice) -> AppResult<Vec<PathBuf>>;

    /// Removes downloaded files and their scratch directory. Failures
    /// are logged, not surfaced.
    async fn cleanup(&self, files: &[PathBuf]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choice_labels() {
        let best = RenditionChoice::Video {
            height: BEST_HEIGHT,
            format_id: "bestvideo+bestaudio/best".into(),
        };
        assert_eq!(best.label(), "best");

        let v = RenditionChoice::Video {
            height: 480,
            format_id: "135".into(),
        };
        assert_eq!(v.label(), "480p");

        assert_eq!(RenditionChoice::Audio { bitrate: 128 }.label(), "128kbps");
    }
}
