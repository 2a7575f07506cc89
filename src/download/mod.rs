//! Media provider abstraction and its yt-dlp implementation

pub mod errors;
pub mod metadata;
pub mod provider;
pub mod ytdlp;

pub use metadata::{AudioRendition, MediaMetadata, VideoRendition};
pub use provider::{MediaProvider, RenditionChoice};
pub use ytdlp::YtDlpProvider;
