// Sign-language track
//
// Narration text is spelled out one still image per character (A-Z plus a blank
// frame for spaces) and encoded at a low frame rate. Images are loaded once at
// startup and shared read-only afterwards.

use async_trait::async_trait;
use image::RgbaImage;
use image::imageops::{self, FilterType};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::{MediaConfig, SignLanguageConfig};
use crate::error::{Result, ExplainerError};
use crate::media::MediaCommandBuilder;

/// Every character with a still image.
pub fn supported_chars() -> impl Iterator<Item = char> {
    ('A'..='Z').chain(std::iter::once(' '))
}

/// File name of the still image for `c`.
pub fn image_file_name(c: char) -> String {
    if c == ' ' {
        "space_test.jpg".to_string()
    } else {
        format!("{}_test.jpg", c)
    }
}

/// Still images keyed by character, all of one size.
#[derive(Debug, Clone)]
pub struct StaticImageSet {
    images: HashMap<char, Arc<RgbaImage>>,
    width: u32,
    height: u32,
}

impl StaticImageSet {
    /// Load all 27 images from `dir`; any missing file is an error.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        let mut images = HashMap::new();

        for c in supported_chars() {
            let path = dir.join(image_file_name(c));
            if !path.exists() {
                return Err(ExplainerError::FileNotFound(path.display().to_string()));
            }
            images.insert(c, image::open(&path)?.to_rgba8());
        }

        info!("Loaded {} sign-language images from {}", images.len(), dir.display());
        Self::from_images(images)
    }

    /// Build a set from decoded images, resizing each to the size of the first
    /// character present (in A-Z, space order).
    pub fn from_images(mut images: HashMap<char, RgbaImage>) -> Result<Self> {
        let reference = supported_chars()
            .find_map(|c| images.get(&c))
            .ok_or_else(|| ExplainerError::SignLanguage("no sign-language images supplied".to_string()))?;
        let (width, height) = reference.dimensions();
        if width == 0 || height == 0 {
            return Err(ExplainerError::SignLanguage("sign-language images must not be empty".to_string()));
        }

        images.retain(|c, _| *c == ' ' || c.is_ascii_uppercase());
        let images = images
            .into_iter()
            .map(|(c, image)| {
                let image = if image.dimensions() == (width, height) {
                    image
                } else {
                    imageops::resize(&image, width, height, FilterType::Triangle)
                };
                (c, Arc::new(image))
            })
            .collect();

        Ok(Self { images, width, height })
    }

    pub fn get(&self, c: char) -> Option<&RgbaImage> {
        self.images.get(&c).map(Arc::as_ref)
    }

    /// Shared handle to the image for `c`
    pub fn frame(&self, c: char) -> Option<Arc<RgbaImage>> {
        self.images.get(&c).cloned()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Characters of `text`, uppercased, that have an image; everything else is dropped.
    pub fn frame_sequence(&self, text: &str) -> Vec<char> {
        text.to_uppercase()
            .chars()
            .filter(|c| self.images.contains_key(c))
            .collect()
    }
}

/// Sign-language rendering of one narration
#[derive(Debug, Clone, PartialEq)]
pub struct SignLanguageVideo {
    /// None when the text had no supported characters and nothing was encoded
    pub path: Option<PathBuf>,
    pub frames: Vec<char>,
    pub fps: u32,
}

/// Video encoding capability for equally sized RGBA frames
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FrameEncoder: Send + Sync {
    /// Encode `frames` in order; all must share one size
    async fn encode(&self, frames: Vec<Arc<RgbaImage>>, fps: u32, output_path: &Path) -> Result<()>;
}

/// Pipes raw frames into ffmpeg
pub struct FfmpegFrameEncoder {
    command_builder: MediaCommandBuilder,
}

impl FfmpegFrameEncoder {
    pub fn new(config: &MediaConfig) -> Self {
        Self {
            command_builder: MediaCommandBuilder::new(&config.ffmpeg_path, &config.ffprobe_path),
        }
    }
}

fn raw_frame_bytes(frame: &Arc<RgbaImage>) -> &[u8] {
    frame.as_raw().as_slice()
}

#[async_trait]
impl FrameEncoder for FfmpegFrameEncoder {
    async fn encode(&self, frames: Vec<Arc<RgbaImage>>, fps: u32, output_path: &Path) -> Result<()> {
        if fps == 0 {
            return Err(ExplainerError::SignLanguage("frame rate must be non-zero".to_string()));
        }
        let (width, height) = frames
            .first()
            .map(|frame| frame.dimensions())
            .ok_or_else(|| ExplainerError::SignLanguage("no frames to encode".to_string()))?;
        if frames.iter().any(|frame| frame.dimensions() != (width, height)) {
            return Err(ExplainerError::SignLanguage("frames differ in size".to_string()));
        }

        let frame_bytes = width as usize * height as usize * 4;
        debug!("Streaming {} frames of {} bytes to ffmpeg", frames.len(), frame_bytes);

        self.command_builder
            .encode_rgba_frames(width, height, fps, output_path)
            .execute_with_frames(frames.iter().map(raw_frame_bytes))
            .await
    }
}

pub struct SignLanguageCompositor {
    images: Arc<StaticImageSet>,
    encoder: Box<dyn FrameEncoder>,
    fps: u32,
}

impl SignLanguageCompositor {
    pub fn new(images: Arc<StaticImageSet>, encoder: Box<dyn FrameEncoder>, config: &SignLanguageConfig) -> Self {
        Self { images, encoder, fps: config.fps }
    }

    /// Spell `text` out as a video at `output_path`. Same text and image set give the
    /// same frames.
    pub async fn compose(&self, text: &str, output_path: &Path) -> Result<SignLanguageVideo> {
        let frames = self.images.frame_sequence(text);
        if frames.is_empty() {
            warn!("Narration has no characters with a sign image; skipping sign-language video");
            return Ok(SignLanguageVideo { path: None, frames, fps: self.fps });
        }

        let images = frames
            .iter()
            .map(|c| {
                self.images.frame(*c)
                    .ok_or_else(|| ExplainerError::SignLanguage(format!("no image for '{}'", c)))
            })
            .collect::<Result<Vec<_>>>()?;

        self.encoder.encode(images, self.fps, output_path).await?;
        info!("Sign-language video written: {} ({} frames at {} fps)",
              output_path.display(), frames.len(), self.fps);

        Ok(SignLanguageVideo {
            path: Some(output_path.to_path_buf()),
            frames,
            fps: self.fps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// One solid-colour 2x2 image per supported character; the red channel encodes
    /// the character so frames can be told apart in the encoded buffer.
    fn solid_set() -> StaticImageSet {
        let images = supported_chars()
            .map(|c| (c, RgbaImage::from_pixel(2, 2, Rgba([c as u8, 0, 0, 255]))))
            .collect();
        StaticImageSet::from_images(images).unwrap()
    }

    fn config() -> SignLanguageConfig {
        SignLanguageConfig { images_dir: PathBuf::from("images"), fps: 3 }
    }

    #[test]
    fn image_names_cover_alphabet_and_space() {
        assert_eq!(supported_chars().count(), 27);
        assert_eq!(image_file_name('Q'), "Q_test.jpg");
        assert_eq!(image_file_name(' '), "space_test.jpg");
    }

    #[test]
    fn frame_sequence_uppercases_and_skips_unknown() {
        let set = solid_set();
        assert_eq!(set.frame_sequence("AB CZ"), vec!['A', 'B', ' ', 'C', 'Z']);
        assert_eq!(set.frame_sequence("hi, 2 u!"), vec!['H', 'I', ' ', ' ', 'U']);
        assert!(set.frame_sequence("123!?.").is_empty());
    }

    #[test]
    fn images_are_resized_to_reference_size() {
        let mut images = HashMap::new();
        images.insert('A', RgbaImage::new(4, 6));
        images.insert('B', RgbaImage::new(10, 10));
        images.insert('1', RgbaImage::new(1, 1));
        let set = StaticImageSet::from_images(images).unwrap();

        assert_eq!(set.dimensions(), (4, 6));
        assert_eq!(set.get('B').unwrap().dimensions(), (4, 6));
        assert!(set.get('1').is_none());
    }

    #[test]
    fn missing_image_file_fails_load() {
        let dir = tempfile::tempdir().unwrap();
        let result = StaticImageSet::load(dir.path());
        assert!(matches!(result, Err(ExplainerError::FileNotFound(_))));
    }

    #[test]
    fn loads_full_image_directory() {
        let dir = tempfile::tempdir().unwrap();
        for c in supported_chars() {
            image::RgbImage::from_pixel(3, 3, image::Rgb([10, 20, 30]))
                .save(dir.path().join(image_file_name(c)))
                .unwrap();
        }
        let set = StaticImageSet::load(dir.path()).unwrap();
        assert_eq!(set.dimensions(), (3, 3));
        assert!(set.get(' ').is_some());
    }

    #[tokio::test]
    async fn compose_encodes_frames_in_order_at_three_fps() {
        let mut encoder = MockFrameEncoder::new();
        encoder
            .expect_encode()
            .withf(|frames, fps, _| {
                let reds: Vec<u8> = frames.iter().map(|frame| frame.as_raw()[0]).collect();
                *fps == 3
                    && frames.iter().all(|frame| frame.dimensions() == (2, 2))
                    && reds == vec![b'A', b'B', b' ', b'C', b'Z']
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let compositor = SignLanguageCompositor::new(Arc::new(solid_set()), Box::new(encoder), &config());
        let video = compositor.compose("AB CZ", Path::new("ASL.mp4")).await.unwrap();

        assert_eq!(video.frames, vec!['A', 'B', ' ', 'C', 'Z']);
        assert_eq!(video.fps, 3);
        assert_eq!(video.path, Some(PathBuf::from("ASL.mp4")));
    }

    #[tokio::test]
    async fn repeated_letters_share_one_image() {
        let mut encoder = MockFrameEncoder::new();
        encoder
            .expect_encode()
            .withf(|frames, _, _| frames.len() == 3 && Arc::ptr_eq(&frames[0], &frames[2]))
            .times(1)
            .returning(|_, _, _| Ok(()));

        let compositor = SignLanguageCompositor::new(Arc::new(solid_set()), Box::new(encoder), &config());
        compositor.compose("aba", Path::new("ASL.mp4")).await.unwrap();
    }

    #[tokio::test]
    async fn ffmpeg_encoder_rejects_mixed_frame_sizes() {
        let encoder = FfmpegFrameEncoder::new(&crate::config::Config::default().media);
        let frames = vec![Arc::new(RgbaImage::new(2, 2)), Arc::new(RgbaImage::new(4, 4))];
        let result = encoder.encode(frames, 3, Path::new("ASL.mp4")).await;
        assert!(matches!(result, Err(ExplainerError::SignLanguage(_))));
    }

    #[tokio::test]
    async fn unsupported_text_produces_no_video() {
        let mut encoder = MockFrameEncoder::new();
        encoder.expect_encode().never();

        let compositor = SignLanguageCompositor::new(Arc::new(solid_set()), Box::new(encoder), &config());
        let video = compositor.compose("42+7=49", Path::new("ASL.mp4")).await.unwrap();
        assert!(video.frames.is_empty());
        assert!(video.path.is_none());
    }

    #[tokio::test]
    async fn encoder_failure_propagates() {
        let mut encoder = MockFrameEncoder::new();
        encoder
            .expect_encode()
            .returning(|_, _, _| Err(ExplainerError::Media("ffmpeg missing".to_string())));

        let compositor = SignLanguageCompositor::new(Arc::new(solid_set()), Box::new(encoder), &config());
        assert!(compositor.compose("ABC", Path::new("ASL.mp4")).await.is_err());
    }
}
