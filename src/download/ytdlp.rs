//! `MediaProvider` backed by the yt-dlp command line tool.
//!
//! Each download gets its own scratch directory under the configured
//! download folder, named by a fresh UUID, so concurrent downloads never
//! collide and cleanup is a single directory removal.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use uuid::Uuid;

use crate::config;
use crate::core::error::{AppError, AppResult};
use crate::download::errors::classify_ytdlp_error;
use crate::download::metadata::{MediaMetadata, BEST_HEIGHT};
use crate::download::provider::{MediaProvider, RenditionChoice};

pub struct YtDlpProvider {
    bin: String,
    download_dir: PathBuf,
}

impl YtDlpProvider {
    pub fn from_config() -> Self {
        Self {
            bin: config::YTDL_BIN.clone(),
            download_dir: PathBuf::from(&*config::DOWNLOAD_FOLDER),
        }
    }

    #[cfg(test)]
    fn with_paths(bin: impl Into<String>, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            bin: bin.into(),
            download_dir: download_dir.into(),
        }
    }

    fn base_args(&self) -> Vec<String> {
        vec![
            "--no-playlist".to_string(),
            "--no-warnings".to_string(),
            "--socket-timeout".to_string(),
            config::download::SOCKET_TIMEOUT_SECS.to_string(),
            "--retries".to_string(),
            config::download::YTDLP_RETRIES.to_string(),
        ]
    }

    fn download_args(&self, scratch: &Path, choice: &RenditionChoice, url: &str) -> Vec<String> {
        let mut args = self.base_args();
        args.extend(choice_args(choice));
        args.push("--max-filesize".to_string());
        args.push(config::limits::max_file_size_bytes().to_string());
        args.push("-o".to_string());
        args.push(scratch.join(output_template(choice)).to_string_lossy().into_owned());
        args.push(url.to_string());
        args
    }

    async fn run_ytdlp(&self, args: &[String], limit: std::time::Duration) -> AppResult<std::process::Output> {
        log::debug!("Running {} {}", self.bin, args.join(" "));

        let output = timeout(limit, Command::new(&self.bin).args(args).kill_on_drop(true).output())
            .await
            .map_err(|_| AppError::Timeout)?
            .map_err(|e| AppError::DownloadFailed(format!("failed to spawn {}: {e}", self.bin)))?;

        Ok(output)
    }
}

#[async_trait]
impl MediaProvider for YtDlpProvider {
    async fn fetch_metadata(&self, url: &str) -> AppResult<MediaMetadata> {
        let mut args = self.base_args();
        args.push("-J".to_string());
        args.push(url.to_string());

        let output = self.run_ytdlp(&args, config::download::metadata_timeout()).await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::warn!("yt-dlp metadata probe failed for {url}: {}", stderr.trim());
            return Err(classify_ytdlp_error(&stderr));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        MediaMetadata::parse(&stdout)
    }

    async fn download(&self, url: &str, choice: &RenditionChoice) -> AppResult<Vec<PathBuf>> {
        let scratch = self.download_dir.join(Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&scratch).await?;

        let args = self.download_args(&scratch, choice, url);

        let result = self.run_ytdlp(&args, config::download::download_timeout()).await;

        let output = match result {
            Ok(output) => output,
            Err(e) => {
                remove_scratch_dir(&scratch).await;
                return Err(e);
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::warn!("yt-dlp download failed for {url}: {}", stderr.trim());
            remove_scratch_dir(&scratch).await;
            return Err(classify_ytdlp_error(&stderr));
        }

        let files = collect_downloaded_files(&scratch)?;
        if files.is_empty() {
            remove_scratch_dir(&scratch).await;
            // yt-dlp treats a file over --max-filesize as a skip, not a
            // failure: exit 0, nothing written, a note in the output
            let combined = format!(
                "{}{}",
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
            if combined.to_lowercase().contains("larger than max-filesize") {
                return Err(AppError::TooLarge {
                    limit_mb: *config::limits::MAX_FILE_SIZE_MB,
                });
            }
            return Err(AppError::DownloadFailed("yt-dlp produced no output files".to_string()));
        }

        log::info!("Downloaded {} file(s) for {url}", files.len());
        Ok(files)
    }

    async fn cleanup(&self, files: &[PathBuf]) {
        for file in files {
            if let Err(e) = tokio::fs::remove_file(file).await {
                log::warn!("Failed to remove {}: {e}", file.display());
            }
        }
        // The scratch directory is the files' common parent
        if let Some(dir) = files.first().and_then(|f| f.parent()) {
            if dir.starts_with(&self.download_dir) {
                remove_scratch_dir(dir).await;
            }
        }
    }
}

/// yt-dlp format arguments for a rendition choice.
///
/// Video merges the capped best video stream with best audio; audio is
/// extracted and transcoded to MP3 at the chosen bitrate.
fn choice_args(choice: &RenditionChoice) -> Vec<String> {
    match choice {
        RenditionChoice::Video { height, format_id } => vec![
            "-f".to_string(),
            video_format_selector(*height, format_id),
            "--merge-output-format".to_string(),
            "mp4".to_string(),
        ],
        RenditionChoice::Audio { bitrate } => vec![
            "-f".to_string(),
            "bestaudio/best".to_string(),
            "-x".to_string(),
            "--audio-format".to_string(),
            "mp3".to_string(),
            "--audio-quality".to_string(),
            format!("{bitrate}k"),
            "--embed-thumbnail".to_string(),
            "--embed-metadata".to_string(),
        ],
    }
}

/// Prefers the concrete format id the user saw in the menu, falling back
/// through height-capped selectors when it is unavailable on this run.
fn video_format_selector(height: u32, format_id: &str) -> String {
    if !format_id.is_empty() && format_id != "bestvideo+bestaudio/best" {
        return format!(
            "{format_id}+bestaudio/bestvideo[height<={height}]+bestaudio/best[height<={height}]/best"
        );
    }
    if height == BEST_HEIGHT {
        "bestvideo+bestaudio/best".to_string()
    } else {
        format!("bestvideo[height<={height}]+bestaudio/best[height<={height}]/best[height<={height}]/best")
    }
}

/// Output template inside the scratch directory. Video carries the
/// playlist index so carousel items with identical titles cannot collide;
/// audio is always a single extracted file.
fn output_template(choice: &RenditionChoice) -> &'static str {
    match choice {
        RenditionChoice::Video { .. } => "%(playlist_index)s_%(title).200B.%(ext)s",
        RenditionChoice::Audio { .. } => "%(title).200B.%(ext)s",
    }
}

/// Lists the finished files in a scratch directory, oldest first.
/// Skips partial downloads and empty files.
fn collect_downloaded_files(dir: &Path) -> AppResult<Vec<PathBuf>> {
    let mut files: Vec<(PathBuf, SystemTime)> = Vec::new();

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.extension().is_some_and(|ext| ext == "part" || ext == "ytdl") {
            continue;
        }
        let meta = entry.metadata()?;
        if meta.len() == 0 {
            continue;
        }
        let mtime = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
        files.push((path, mtime));
    }

    files.sort_by_key(|(_, mtime)| *mtime);
    Ok(files.into_iter().map(|(path, _)| path).collect())
}

async fn remove_scratch_dir(dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        log::warn!("Failed to remove scratch dir {}: {e}", dir.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn video_selector_prefers_the_concrete_format_id() {
        assert_eq!(
            video_format_selector(720, "136"),
            "136+bestaudio/bestvideo[height<=720]+bestaudio/best[height<=720]/best"
        );
    }

    #[test]
    fn video_selector_falls_back_to_height_cap() {
        assert_eq!(
            video_format_selector(720, ""),
            "bestvideo[height<=720]+bestaudio/best[height<=720]/best[height<=720]/best"
        );
        assert_eq!(
            video_format_selector(BEST_HEIGHT, "bestvideo+bestaudio/best"),
            "bestvideo+bestaudio/best"
        );
    }

    #[test]
    fn audio_choice_extracts_tagged_mp3_at_requested_bitrate() {
        let args = choice_args(&RenditionChoice::Audio { bitrate: 192 });
        assert!(args.contains(&"-x".to_string()));
        assert!(args.contains(&"mp3".to_string()));
        assert!(args.contains(&"192k".to_string()));
        assert!(args.contains(&"--embed-thumbnail".to_string()));
        assert!(args.contains(&"--embed-metadata".to_string()));
    }

    #[test]
    fn download_args_cap_the_file_size() {
        let provider = YtDlpProvider::with_paths("yt-dlp", "/tmp/dl");
        let args = provider.download_args(
            Path::new("/tmp/dl/scratch"),
            &RenditionChoice::Audio { bitrate: 128 },
            "https://youtu.be/abc",
        );

        let pos = args
            .iter()
            .position(|a| a == "--max-filesize")
            .expect("--max-filesize missing");
        assert_eq!(args[pos + 1], config::limits::max_file_size_bytes().to_string());
        assert_eq!(args.last().map(String::as_str), Some("https://youtu.be/abc"));
    }

    #[test]
    fn video_output_template_carries_the_playlist_index() {
        let template = output_template(&RenditionChoice::Video {
            height: 720,
            format_id: "136".into(),
        });
        assert!(template.starts_with("%(playlist_index)s_"));

        // Audio extraction yields one file; no index needed
        assert_eq!(
            output_template(&RenditionChoice::Audio { bitrate: 128 }),
            "%(title).200B.%(ext)s"
        );
    }

    #[test]
    fn collect_skips_partial_and_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("clip.mp4"), b"data").unwrap();
        std::fs::write(dir.path().join("clip.mp4.part"), b"partial").unwrap();
        std::fs::write(dir.path().join("empty.mp4"), b"").unwrap();

        let files = collect_downloaded_files(dir.path()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("clip.mp4"));
    }

    #[test]
    fn collect_on_empty_dir_returns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(collect_downloaded_files(dir.path()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn download_with_missing_binary_fails_and_leaves_no_scratch() {
        let dir = tempfile::tempdir().unwrap();
        let provider = YtDlpProvider::with_paths("/nonexistent/yt-dlp", dir.path());

        let result = provider
            .download(
                "https://youtu.be/abc",
                &RenditionChoice::Audio { bitrate: 128 },
            )
            .await;

        assert!(result.is_err());
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }
}
