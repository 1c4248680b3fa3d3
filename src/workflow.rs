use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use crate::artifacts::ArtifactPaths;
use crate::config::Config;
use crate::error::Result;
use crate::generate::{Credential, ModelChoice, ScriptGenerator, TextGeneratorFactory};
use crate::media::{MediaProcessorFactory, MediaProcessorTrait};
use crate::prompt::sanitize;
use crate::render::{render_video, ManimRenderer, RenderedVideo, SceneRenderer};
use crate::scene::materialize;
use crate::sign_language::{FfmpegFrameEncoder, SignLanguageCompositor, SignLanguageVideo, StaticImageSet};
use crate::speech::{synthesize_narration, SpeechOutcome, SpeechSynthesizer, SpeechSynthesizerFactory};

/// Everything the presentation layer supplies for one run
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: ModelChoice,
    /// Caller's own API key, if any
    pub api_key: Option<String>,
    pub show_code: bool,
    /// Also mux the narration audio into the rendered video
    pub merge_audio: bool,
}

/// Everything one run hands back to the presentation layer
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub video: RenderedVideo,
    /// Construct body, only when the caller asked to see it
    pub code: Option<String>,
    pub narration: String,
    pub speech: SpeechOutcome,
    pub sign_language: SignLanguageVideo,
    pub merged_video: Option<PathBuf>,
}

pub struct Workflow {
    scripts: ScriptGenerator,
    renderer: Box<dyn SceneRenderer>,
    media: Box<dyn MediaProcessorTrait>,
    speech: Box<dyn SpeechSynthesizer>,
    sign_language: SignLanguageCompositor,
}

impl Workflow {
    /// Wire the default service clients and tools from configuration.
    pub fn new(config: Config, images: Arc<StaticImageSet>) -> Result<Self> {
        let generator = TextGeneratorFactory::create_default(&config.generation)?;
        let speech = SpeechSynthesizerFactory::create_default(&config.speech)?;
        let encoder = Box::new(FfmpegFrameEncoder::new(&config.media));

        Ok(Self::with_components(
            ScriptGenerator::new(generator, config.generation.clone()),
            Box::new(ManimRenderer::new(config.render.clone())),
            MediaProcessorFactory::create_processor(&config.media),
            speech,
            SignLanguageCompositor::new(images, encoder, &config.sign_language),
        ))
    }

    pub fn with_components(
        scripts: ScriptGenerator,
        renderer: Box<dyn SceneRenderer>,
        media: Box<dyn MediaProcessorTrait>,
        speech: Box<dyn SpeechSynthesizer>,
        sign_language: SignLanguageCompositor,
    ) -> Self {
        Self { scripts, renderer, media, speech, sign_language }
    }

    /// Run the whole pipeline once. Every stage except speech synthesis and the
    /// optional audio merge aborts the run on failure.
    pub async fn run(&self, request: &GenerationRequest, paths: &ArtifactPaths) -> Result<PipelineOutput> {
        let has_own_key = request.api_key.as_deref().is_some_and(|k| !k.trim().is_empty());

        // Step 1: Sanitize
        let prompt = sanitize(&request.prompt, has_own_key)?;
        let credential = Credential::resolve(
            request.api_key.as_deref(),
            self.scripts.config().api_key.as_deref(),
        )?;
        info!("Generating explainer for prompt ({} chars) with {}", prompt.char_len(), request.model.identifier());

        // Step 2: Generate scene code
        let generated = self.scripts.generate_code(&prompt, request.model, &credential).await?;

        // Step 3: Materialize over a clean slate
        paths.clear_stale().await?;
        let source = materialize(generated.code(), paths).await?;

        // Step 4: Render and measure
        let video = render_video(self.renderer.as_ref(), self.media.as_ref(), &source, paths).await?;

        // Step 5: Narration sized to half the video
        let narration = self.scripts
            .generate_narration(generated.code(), video.duration, request.model, &credential)
            .await?;

        // Step 6: Speech, best effort
        let speech = synthesize_narration(self.speech.as_ref(), &narration, &paths.audio_file()).await;

        // Step 7: Sign-language video
        let sign_language = self.sign_language
            .compose(&narration, &paths.sign_language_video())
            .await?;

        let merged_video = match (request.merge_audio, speech.audio_path()) {
            (true, Some(audio)) => {
                let output = paths.merged_video();
                match self.media.merge_audio(&video.path, audio, &output).await {
                    Ok(()) => Some(output),
                    Err(e) => {
                        warn!("Failed to merge narration into video: {}", e);
                        None
                    }
                }
            }
            _ => None,
        };

        info!("Explainer pipeline completed");
        Ok(PipelineOutput {
            code: request.show_code.then(|| generated.code().to_string()),
            video,
            narration,
            speech,
            sign_language,
            merged_video,
        })
    }
}
