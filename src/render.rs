use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::artifacts::ArtifactPaths;
use crate::config::RenderConfig;
use crate::error::{Result, ExplainerError};
use crate::media::MediaProcessorTrait;
use crate::scene::SourceFile;

/// Rendered scene video and its timeline length
#[derive(Debug, Clone)]
pub struct RenderedVideo {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
    /// Seconds, never negative
    pub duration: f64,
}

/// Rendering engine capability
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SceneRenderer: Send + Sync {
    /// Render the scene source; the video lands at `paths.rendered_video()`
    async fn render(&self, source: &SourceFile, paths: &ArtifactPaths) -> Result<()>;

    /// Check that the renderer can be executed
    async fn check_availability(&self) -> Result<()>;
}

/// Runs the manim command line
pub struct ManimRenderer {
    config: RenderConfig,
}

impl ManimRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    /// Arguments after the binary, relative to the work directory
    pub fn render_args(&self, paths: &ArtifactPaths) -> Vec<String> {
        vec![
            paths.source_file_name(),
            paths.scene_name().to_string(),
            "--format=mp4".to_string(),
            "--media_dir".to_string(),
            ".".to_string(),
            "--custom_folders".to_string(),
            "video_dir".to_string(),
        ]
    }
}

#[async_trait]
impl SceneRenderer for ManimRenderer {
    async fn render(&self, source: &SourceFile, paths: &ArtifactPaths) -> Result<()> {
        let args = self.render_args(paths);
        info!("Rendering {} with {}", source.path.display(), self.config.binary_path);
        debug!("Executing render command: {} {:?} (cwd {})",
               self.config.binary_path, args, paths.work_dir().display());

        let output = Command::new(&self.config.binary_path)
            .args(&args)
            .current_dir(paths.work_dir())
            .output()
            .await
            .map_err(|e| ExplainerError::Render(format!("Failed to execute renderer: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExplainerError::Render(format!(
                "Renderer exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(())
    }

    async fn check_availability(&self) -> Result<()> {
        let output = Command::new(&self.config.binary_path)
            .arg("--version")
            .output()
            .await
            .map_err(|e| ExplainerError::Render(format!("Renderer not found: {}", e)))?;

        if output.status.success() {
            info!("Renderer is available");
            Ok(())
        } else {
            Err(ExplainerError::Render("Renderer version check failed".to_string()))
        }
    }
}

/// Render the scene, then read back the video and its duration.
///
/// A non-zero exit means the generated code was not valid renderer input; no retry.
pub async fn render_video(
    renderer: &dyn SceneRenderer,
    media: &dyn MediaProcessorTrait,
    source: &SourceFile,
    paths: &ArtifactPaths,
) -> Result<RenderedVideo> {
    renderer.render(source, paths).await?;

    let path = paths.rendered_video();
    if !path.exists() {
        warn!("Renderer succeeded but {} is missing", path.display());
        return Err(ExplainerError::ArtifactMissing(path.display().to_string()));
    }

    let bytes = fs::read(&path).await?;
    let duration = media.probe_duration(&path).await?;
    info!("Rendered video: {} ({:.2}s, {} bytes)", path.display(), duration, bytes.len());

    Ok(RenderedVideo { path, bytes, duration })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::media::MockMediaProcessorTrait;

    fn source_for(paths: &ArtifactPaths) -> SourceFile {
        SourceFile { path: paths.source_file(), contents: String::new() }
    }

    #[test]
    fn render_args_match_fixed_template() {
        let renderer = ManimRenderer::new(Config::default().render);
        let paths = ArtifactPaths::new("/work", "GenScene");
        assert_eq!(
            renderer.render_args(&paths).join(" "),
            "GenScene.py GenScene --format=mp4 --media_dir . --custom_folders video_dir"
        );
    }

    #[tokio::test]
    async fn reads_video_and_duration_after_render() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::new(dir.path(), "GenScene");
        let video = paths.rendered_video();

        let mut renderer = MockSceneRenderer::new();
        renderer.expect_render().times(1).returning(move |_, _| {
            std::fs::write(&video, b"mp4-bytes").unwrap();
            Ok(())
        });
        let mut media = MockMediaProcessorTrait::new();
        media.expect_probe_duration().returning(|_| Ok(6.5));

        let rendered = render_video(&renderer, &media, &source_for(&paths), &paths)
            .await
            .unwrap();

        assert_eq!(rendered.bytes, b"mp4-bytes");
        assert_eq!(rendered.duration, 6.5);
    }

    #[tokio::test]
    async fn zero_exit_without_video_is_artifact_missing() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::new(dir.path(), "GenScene");

        let mut renderer = MockSceneRenderer::new();
        renderer.expect_render().returning(|_, _| Ok(()));
        let mut media = MockMediaProcessorTrait::new();
        media.expect_probe_duration().never();

        let result = render_video(&renderer, &media, &source_for(&paths), &paths).await;
        assert!(matches!(result, Err(ExplainerError::ArtifactMissing(_))));
    }

    #[tokio::test]
    async fn renderer_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::new(dir.path(), "GenScene");

        let mut renderer = MockSceneRenderer::new();
        renderer
            .expect_render()
            .returning(|_, _| Err(ExplainerError::Render("exit status: 1".to_string())));
        let media = MockMediaProcessorTrait::new();

        let result = render_video(&renderer, &media, &source_for(&paths), &paths).await;
        assert!(matches!(result, Err(ExplainerError::Render(_))));
    }
}
