//! Metadata snapshot of a media source and rendition extraction from
//! yt-dlp's `-J` JSON output.
//!
//! Sizes are pre-flight estimates only: yt-dlp reports exact sizes where
//! the source exposes them and we fall back to bitrate × duration
//! otherwise. Zero means unknown.

use std::collections::HashSet;

use serde::Deserialize;

use crate::core::error::AppResult;
use crate::core::format::truncate_title;

/// Sentinel height of the synthetic "best available" video entry.
pub const BEST_HEIGHT: u32 = 9999;

/// One downloadable video variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRendition {
    pub height: u32,
    /// Opaque yt-dlp format selector token.
    pub format_id: String,
    /// Estimated size in bytes; 0 when unknown.
    pub filesize: u64,
    pub ext: String,
}

impl VideoRendition {
    pub fn label(&self) -> String {
        if self.height == BEST_HEIGHT {
            "best".to_string()
        } else {
            format!("{}p", self.height)
        }
    }
}

/// One downloadable audio variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioRendition {
    /// Average bitrate in kbps, rounded to the nearest 32.
    pub bitrate: u32,
    pub format_id: String,
    /// Estimated size in bytes; 0 when unknown.
    pub filesize: u64,
    pub ext: String,
}

impl AudioRendition {
    pub fn label(&self) -> String {
        format!("{}kbps", self.bitrate)
    }
}

/// Snapshot of everything the workflow needs to know about a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaMetadata {
    pub title: String,
    pub duration_secs: u64,
    pub views: Option<u64>,
    /// Upload date as reported by the extractor (YYYYMMDD).
    pub upload_date: Option<String>,
    /// Video renditions, ascending by height, "best" entry last.
    pub video: Vec<VideoRendition>,
    /// Audio renditions, ascending by bitrate. Never empty: a default
    /// 128/192/320 kbps set is substituted when the source exposes none.
    pub audio: Vec<AudioRendition>,
}

#[derive(Debug, Deserialize)]
struct RawInfo {
    title: Option<String>,
    duration: Option<f64>,
    view_count: Option<u64>,
    upload_date: Option<String>,
    #[serde(default)]
    formats: Vec<RawFormat>,
}

#[derive(Debug, Deserialize)]
struct RawFormat {
    format_id: Option<String>,
    height: Option<u32>,
    vcodec: Option<String>,
    acodec: Option<String>,
    abr: Option<f64>,
    tbr: Option<f64>,
    filesize: Option<u64>,
    filesize_approx: Option<f64>,
    ext: Option<String>,
}

impl RawFormat {
    fn estimated_size(&self, duration_secs: f64, bitrate: Option<f64>) -> u64 {
        if let Some(size) = self.filesize {
            return size;
        }
        if let Some(approx) = self.filesize_approx {
            return approx as u64;
        }
        match bitrate {
            // size [bytes] = kbps * 1000 * secs / 8
            Some(kbps) if kbps > 0.0 && duration_secs > 0.0 => (kbps * 1000.0 * duration_secs / 8.0) as u64,
            _ => 0,
        }
    }
}

impl MediaMetadata {
    /// Parses yt-dlp `-J` output into a metadata snapshot.
    pub fn parse(json: &str) -> AppResult<Self> {
        let raw: RawInfo = serde_json::from_str(json)?;
        let duration = raw.duration.unwrap_or(0.0).max(0.0);

        Ok(Self {
            title: truncate_title(raw.title.as_deref().unwrap_or("Untitled")),
            duration_secs: duration as u64,
            views: raw.view_count,
            upload_date: raw.upload_date,
            video: video_renditions(&raw.formats, duration),
            audio: audio_renditions(&raw.formats, duration),
        })
    }
}

fn video_renditions(formats: &[RawFormat], duration_secs: f64) -> Vec<VideoRendition> {
    let mut seen_heights = HashSet::new();
    let mut renditions = Vec::new();

    for fmt in formats {
        // Skip audio-only formats
        if fmt.vcodec.as_deref() == Some("none") {
            continue;
        }
        let Some(height) = fmt.height.filter(|h| *h > 0) else {
            continue;
        };
        if !seen_heights.insert(height) {
            continue;
        }

        renditions.push(VideoRendition {
            height,
            format_id: fmt.format_id.clone().unwrap_or_default(),
            filesize: fmt.estimated_size(duration_secs, fmt.tbr),
            ext: fmt.ext.clone().unwrap_or_else(|| "mp4".to_string()),
        });
    }

    renditions.sort_by_key(|r| r.height);

    // Offer "best available" on top of the concrete heights
    if let Some(top) = renditions.last().cloned() {
        renditions.push(VideoRendition {
            height: BEST_HEIGHT,
            format_id: "bestvideo+bestaudio/best".to_string(),
            filesize: top.filesize,
            ext: "mp4".to_string(),
        });
    }

    renditions
}

fn audio_renditions(formats: &[RawFormat], duration_secs: f64) -> Vec<AudioRendition> {
    let mut seen_bitrates = HashSet::new();
    let mut renditions = Vec::new();

    for fmt in formats {
        // Skip video-only formats
        if fmt.vcodec.as_deref() != Some("none") && fmt.acodec.as_deref() == Some("none") {
            continue;
        }
        let abr = fmt.abr.unwrap_or(0.0);
        if abr <= 0.0 {
            continue;
        }
        let rounded = ((abr / 32.0).round() as u32) * 32;
        if rounded == 0 || !seen_bitrates.insert(rounded) {
            continue;
        }

        renditions.push(AudioRendition {
            bitrate: rounded,
            format_id: fmt.format_id.clone().unwrap_or_default(),
            filesize: fmt.estimated_size(duration_secs, Some(abr)),
            ext: fmt.ext.clone().unwrap_or_else(|| "m4a".to_string()),
        });
    }

    renditions.sort_by_key(|r| r.bitrate);

    if renditions.is_empty() {
        // Sources like Instagram expose no audio formats up front; offer
        // the standard MP3 ladder and let yt-dlp pick the source stream.
        renditions = default_audio_set();
    }

    renditions
}

/// Standard MP3 bitrate ladder used when the source exposes no audio
/// formats of its own.
pub fn default_audio_set() -> Vec<AudioRendition> {
    [128, 192, 320]
        .into_iter()
        .map(|bitrate| AudioRendition {
            bitrate,
            format_id: "bestaudio/best".to_string(),
            filesize: 0,
            ext: "mp3".to_string(),
        })
        .collect()
}
