use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, ExplainerError};

/// Abstract media processing command representation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    /// Create a new media processing command
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Add output file
    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    /// Set video codec
    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    /// Set audio codec
    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    /// Disable audio
    pub fn no_audio(self) -> Self {
        self.arg("-an")
    }

    /// Add video filter
    pub fn video_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-vf").arg(filter)
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary_path);
        cmd.args(&self.args);
        cmd
    }

    fn failure(&self, stderr: &[u8]) -> ExplainerError {
        ExplainerError::Media(format!(
            "{} failed: {}",
            self.description,
            String::from_utf8_lossy(stderr).trim()
        ))
    }

    /// Execute the command
    pub async fn execute(&self) -> Result<()> {
        self.execute_with_output().await.map(|_| ())
    }

    /// Execute the command and return its standard output
    pub async fn execute_with_output(&self) -> Result<String> {
        debug!("Executing media processing command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let output = self.command().output().await
            .map_err(|e| ExplainerError::Media(format!("Failed to execute {}: {}", self.binary_path, e)))?;

        if !output.status.success() {
            return Err(self.failure(&output.stderr));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Execute the command, writing each chunk to its standard input in turn
    pub async fn execute_with_frames<'a, I>(&self, frames: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a [u8]>,
        I::IntoIter: Send,
    {
        debug!("Executing media processing command with piped input: {} {:?}", self.binary_path, self.args);

        let mut child = self.command()
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExplainerError::Media(format!("Failed to spawn {}: {}", self.binary_path, e)))?;

        let mut stdin = child.stdin.take()
            .ok_or_else(|| ExplainerError::Media(format!("Failed to open {} stdin", self.binary_path)))?;
        let mut written = Ok(());
        for frame in frames {
            if let Err(e) = stdin.write_all(frame).await {
                written = Err(e);
                break;
            }
        }
        drop(stdin);

        let output = child.wait_with_output().await
            .map_err(|e| ExplainerError::Media(format!("Failed to wait for {}: {}", self.binary_path, e)))?;

        if !output.status.success() {
            return Err(self.failure(&output.stderr));
        }
        written.map_err(|e| ExplainerError::Media(format!("Failed to write to {} stdin: {}", self.binary_path, e)))?;

        Ok(())
    }
}

/// Builder for the ffmpeg/ffprobe invocations the pipeline needs
pub struct MediaCommandBuilder {
    ffmpeg_path: String,
    ffprobe_path: String,
}

impl MediaCommandBuilder {
    /// Create a new command builder
    pub fn new<S1: Into<String>, S2: Into<String>>(ffmpeg_path: S1, ffprobe_path: S2) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            ffprobe_path: ffprobe_path.into(),
        }
    }

    /// Build container duration probe; prints seconds as a bare number
    pub fn probe_duration<P: AsRef<Path>>(&self, video_path: P) -> MediaCommand {
        MediaCommand::new(&self.ffprobe_path, "Duration probe")
            .args(["-v", "error", "-show_entries", "format=duration", "-of", "default=noprint_wrappers=1:nokey=1"])
            .output(video_path)
    }

    /// Build narration merge: video stream re-encoded, audio as AAC, cut to the shorter input
    pub fn merge_audio<P: AsRef<Path>>(
        &self,
        video_path: P,
        audio_path: P,
        output_path: P,
    ) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "Narration merge")
            .overwrite()
            .input(video_path)
            .input(audio_path)
            .video_codec("libx264")
            .audio_codec("aac")
            .args(["-strict", "experimental", "-shortest"])
            .output(output_path)
    }

    /// Build still-frame encoding from raw RGBA frames on stdin
    pub fn encode_rgba_frames<P: AsRef<Path>>(
        &self,
        width: u32,
        height: u32,
        fps: u32,
        output_path: P,
    ) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "Sign-language encoding")
            .overwrite()
            .args(["-loglevel", "error", "-f", "rawvideo", "-pix_fmt", "rgba"])
            .arg("-s").arg(format!("{}x{}", width, height))
            .arg("-r").arg(fps.to_string())
            .arg("-i").arg("pipe:0")
            .no_audio()
            .video_filter("scale=trunc(iw/2)*2:trunc(ih/2)*2")
            .video_codec("libx264")
            .args(["-pix_fmt", "yuv420p", "-movflags", "+faststart"])
            .output(output_path)
    }

    /// Build version check command for ffmpeg
    pub fn ffmpeg_version(&self) -> MediaCommand {
        MediaCommand::new(&self.ffmpeg_path, "ffmpeg version check")
            .arg("-version")
    }

    /// Build version check command for ffprobe
    pub fn ffprobe_version(&self) -> MediaCommand {
        MediaCommand::new(&self.ffprobe_path, "ffprobe version check")
            .arg("-version")
    }
}

/// Parse the bare-number duration printed by the probe command.
pub fn parse_duration(stdout: &str) -> Result<f64> {
    let text = stdout.trim();
    let seconds: f64 = text.parse()
        .map_err(|_| ExplainerError::Media(format!("Unexpected duration output: '{}'", text)))?;

    if !seconds.is_finite() || seconds < 0.0 {
        return Err(ExplainerError::Media(format!("Invalid duration: {}", seconds)));
    }
    Ok(seconds)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_command_matches_expected_flags() {
        let builder = MediaCommandBuilder::new("ffmpeg", "ffprobe");
        let cmd = builder.merge_audio("GenScene.mp4", "output_audio.wav", "MergedVideo.mp4");
        assert_eq!(cmd.binary_path, "ffmpeg");
        assert_eq!(
            cmd.args,
            vec![
                "-y", "-i", "GenScene.mp4", "-i", "output_audio.wav", "-c:v", "libx264",
                "-c:a", "aac", "-strict", "experimental", "-shortest", "MergedVideo.mp4",
            ]
        );
    }

    #[test]
    fn frame_encoding_uses_requested_rate() {
        let builder = MediaCommandBuilder::new("ffmpeg", "ffprobe");
        let cmd = builder.encode_rgba_frames(200, 150, 3, "ASL.mp4");
        let joined = cmd.args.join(" ");
        assert!(joined.contains("-s 200x150 -r 3 -i pipe:0"));
        assert_eq!(cmd.args.last().map(String::as_str), Some("ASL.mp4"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn frames_are_written_to_stdin_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("frames.raw");
        let cmd = MediaCommand::new("sh", "Frame capture")
            .arg("-c")
            .arg(format!("cat > '{}'", out.display()));

        let frames: Vec<Vec<u8>> = vec![vec![1, 2], vec![3], vec![4, 5, 6]];
        cmd.execute_with_frames(frames.iter().map(Vec::as_slice)).await.unwrap();

        assert_eq!(std::fs::read(&out).unwrap(), vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn parses_probe_output() {
        assert_eq!(parse_duration("7.466667\n").unwrap(), 7.466667);
        assert_eq!(parse_duration("0").unwrap(), 0.0);
        assert!(parse_duration("N/A").is_err());
        assert!(parse_duration("-1").is_err());
    }
}
