// Media processing on top of the ffmpeg tool family
//
// - Commands: command builders and execution
// - Processor: duration probing, narration merge, availability checks

pub mod commands;

use async_trait::async_trait;
use std::path::Path;
use tracing::info;

pub use commands::*;

use crate::config::MediaConfig;
use crate::error::Result;

/// Main trait for media processing operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaProcessorTrait: Send + Sync {
    /// Length of a video's timeline in seconds
    async fn probe_duration(&self, video_path: &Path) -> Result<f64>;

    /// Mux narration audio into a rendered video
    async fn merge_audio(
        &self,
        video_path: &Path,
        audio_path: &Path,
        output_path: &Path,
    ) -> Result<()>;

    /// Check that the media tools can be executed
    async fn check_availability(&self) -> Result<()>;
}

/// ffmpeg/ffprobe-backed media processor
pub struct MediaProcessorImpl {
    command_builder: MediaCommandBuilder,
}

impl MediaProcessorImpl {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            command_builder: MediaCommandBuilder::new(&config.ffmpeg_path, &config.ffprobe_path),
        }
    }
}

#[async_trait]
impl MediaProcessorTrait for MediaProcessorImpl {
    async fn probe_duration(&self, video_path: &Path) -> Result<f64> {
        let stdout = self.command_builder
            .probe_duration(video_path)
            .execute_with_output()
            .await?;
        parse_duration(&stdout)
    }

    async fn merge_audio(
        &self,
        video_path: &Path,
        audio_path: &Path,
        output_path: &Path,
    ) -> Result<()> {
        info!("Merging narration {} into {} -> {}",
              audio_path.display(), video_path.display(), output_path.display());

        self.command_builder
            .merge_audio(video_path, audio_path, output_path)
            .execute()
            .await?;

        info!("Narration merge completed");
        Ok(())
    }

    async fn check_availability(&self) -> Result<()> {
        self.command_builder.ffmpeg_version().execute().await?;
        self.command_builder.ffprobe_version().execute().await?;
        info!("ffmpeg and ffprobe are available");
        Ok(())
    }
}

/// Factory for creating media processor instances
pub struct MediaProcessorFactory;

impl MediaProcessorFactory {
    /// Create the default media processor implementation (FFmpeg-based)
    pub fn create_processor(config: &MediaConfig) -> Box<dyn MediaProcessorTrait> {
        Box::new(MediaProcessorImpl::new(config))
    }
}
