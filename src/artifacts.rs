use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

use crate::error::Result;

const AUDIO_FILE: &str = "output_audio.wav";
const SIGN_LANGUAGE_FILE: &str = "ASL.mp4";
const MERGED_FILE: &str = "MergedVideo.mp4";

/// Locations of every file a pipeline run reads or writes.
///
/// One value per run; two runs sharing a work directory overwrite each other's files.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    work_dir: PathBuf,
    scene_name: String,
}

impl ArtifactPaths {
    pub fn new<P: AsRef<Path>, S: Into<String>>(work_dir: P, scene_name: S) -> Self {
        Self {
            work_dir: work_dir.as_ref().to_path_buf(),
            scene_name: scene_name.into(),
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn scene_name(&self) -> &str {
        &self.scene_name
    }

    /// File name of the generated scene source, relative to the work dir
    pub fn source_file_name(&self) -> String {
        format!("{}.py", self.scene_name)
    }

    pub fn source_file(&self) -> PathBuf {
        self.work_dir.join(self.source_file_name())
    }

    /// Where the renderer leaves its video given `--media_dir . --custom_folders`
    pub fn rendered_video(&self) -> PathBuf {
        self.work_dir.join(format!("{}.mp4", self.scene_name))
    }

    pub fn audio_file(&self) -> PathBuf {
        self.work_dir.join(AUDIO_FILE)
    }

    pub fn sign_language_video(&self) -> PathBuf {
        self.work_dir.join(SIGN_LANGUAGE_FILE)
    }

    pub fn merged_video(&self) -> PathBuf {
        self.work_dir.join(MERGED_FILE)
    }

    /// Remove the previous run's scene source and rendered video so they can never be
    /// mistaken for this run's output.
    pub async fn clear_stale(&self) -> Result<()> {
        for path in [self.source_file(), self.rendered_video()] {
            match fs::remove_file(&path).await {
                Ok(()) => debug!("Removed stale artifact: {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_follow_scene_name() {
        let paths = ArtifactPaths::new("/tmp/run", "GenScene");
        assert_eq!(paths.source_file(), PathBuf::from("/tmp/run/GenScene.py"));
        assert_eq!(paths.rendered_video(), PathBuf::from("/tmp/run/GenScene.mp4"));
        assert_eq!(paths.sign_language_video(), PathBuf::from("/tmp/run/ASL.mp4"));
        assert_eq!(paths.audio_file(), PathBuf::from("/tmp/run/output_audio.wav"));
    }

    #[tokio::test]
    async fn clear_stale_removes_source_and_video_only() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::new(dir.path(), "GenScene");
        std::fs::write(paths.source_file(), "old").unwrap();
        std::fs::write(paths.rendered_video(), "old").unwrap();
        std::fs::write(paths.audio_file(), "old").unwrap();

        paths.clear_stale().await.unwrap();

        assert!(!paths.source_file().exists());
        assert!(!paths.rendered_video().exists());
        assert!(paths.audio_file().exists());

        // Nothing left to remove is fine.
        paths.clear_stale().await.unwrap();
    }
}
