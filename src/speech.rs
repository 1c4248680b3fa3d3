use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{ServiceAccountCredentials, SpeechConfig};
use crate::error::{Result, ExplainerError};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig<'a>,
}

#[derive(Debug, Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
    ssml_gender: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig<'a> {
    audio_encoding: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

const TOKEN_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const TOKEN_LIFETIME_SECS: u64 = 3600;
/// Refresh this long before the service says the token expires
const TOKEN_REFRESH_MARGIN_SECS: u64 = 60;

/// Claims of the signed assertion exchanged for an access token
#[derive(Debug, Serialize)]
struct TokenClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: u64,
    exp: u64,
}

impl<'a> TokenClaims<'a> {
    fn new(credentials: &'a ServiceAccountCredentials, issued_at: u64) -> Self {
        Self {
            iss: &credentials.client_email,
            scope: TOKEN_SCOPE,
            aud: &credentials.token_uri,
            iat: issued_at,
            exp: issued_at + TOKEN_LIFETIME_SECS,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// RS256-signed assertion for the service account, issued at `issued_at` (unix seconds).
fn signed_assertion(credentials: &ServiceAccountCredentials, issued_at: u64) -> Result<String> {
    let key = EncodingKey::from_rsa_pem(credentials.private_key.as_bytes())
        .map_err(|e| ExplainerError::Speech(format!("Invalid service-account private key: {}", e)))?;

    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(credentials.private_key_id.clone());

    jsonwebtoken::encode(&header, &TokenClaims::new(credentials, issued_at), &key)
        .map_err(|e| ExplainerError::Speech(format!("Failed to sign token request: {}", e)))
}

/// What the speech stage produced. A failure here never stops the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechOutcome {
    Synthesized(PathBuf),
    Unavailable { reason: String },
}

impl SpeechOutcome {
    pub fn audio_path(&self) -> Option<&Path> {
        match self {
            SpeechOutcome::Synthesized(path) => Some(path),
            SpeechOutcome::Unavailable { .. } => None,
        }
    }
}

/// Speech-synthesis capability
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Return encoded audio for `text`
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}

/// How requests to the speech service are authorized
#[derive(Debug, Clone, PartialEq, Eq)]
enum SpeechAuth {
    ApiKey(String),
    /// Access token minted from the service-account key file
    KeyFile(PathBuf),
}

/// Google Cloud Text-to-Speech REST client
pub struct GoogleSpeechClient {
    client: Client,
    config: SpeechConfig,
    auth: SpeechAuth,
    token: Mutex<Option<CachedToken>>,
}

impl GoogleSpeechClient {
    pub fn new(config: SpeechConfig) -> Result<Self> {
        let auth = match &config.api_key {
            Some(key) => SpeechAuth::ApiKey(key.clone()),
            None => SpeechAuth::KeyFile(config.key_file.clone()),
        };
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self { client, config, auth, token: Mutex::new(None) })
    }

    /// Exchange a signed assertion from the key file for an access token, reusing
    /// the previous token until shortly before it expires.
    async fn access_token(&self, key_file: &Path) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.expires_at > Instant::now()) {
            return Ok(token.value.clone());
        }

        let content = fs::read_to_string(key_file).await.map_err(|e| {
            ExplainerError::Speech(format!("Failed to read key file {}: {}", key_file.display(), e))
        })?;
        let credentials: ServiceAccountCredentials = serde_json::from_str(&content)?;

        let issued_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ExplainerError::Speech(format!("System clock before epoch: {}", e)))?
            .as_secs();
        let assertion = signed_assertion(&credentials, issued_at)?;

        debug!("Requesting access token from: {}", credentials.token_uri);
        let response = self.client
            .post(&credentials.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ExplainerError::Speech(format!(
                "Access token request failed {}: {}", status, error_text
            )));
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = token.expires_in
            .unwrap_or(TOKEN_LIFETIME_SECS)
            .saturating_sub(TOKEN_REFRESH_MARGIN_SECS);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        });

        Ok(token.access_token)
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleSpeechClient {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        let url = format!("{}/v1/text:synthesize", self.config.endpoint.trim_end_matches('/'));
        let body = SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code: &self.config.language_code,
                name: &self.config.voice_name,
                ssml_gender: &self.config.ssml_gender,
            },
            audio_config: AudioConfig {
                audio_encoding: &self.config.audio_encoding,
            },
        };

        debug!("Sending synthesis request to: {} ({} chars)", url, text.chars().count());

        let request = self.client.post(&url).json(&body);
        let request = match &self.auth {
            SpeechAuth::ApiKey(key) => request.query(&[("key", key)]),
            SpeechAuth::KeyFile(path) => request.bearer_auth(self.access_token(path).await?),
        };

        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ExplainerError::Speech(format!(
                "Speech API error {}: {}", status, error_text
            )));
        }

        let synthesized: SynthesizeResponse = response.json().await?;
        STANDARD.decode(synthesized.audio_content.as_bytes())
            .map_err(|e| ExplainerError::Speech(format!("Invalid audio content: {}", e)))
    }
}

/// Write the service-account bundle to the key file the speech client reads.
pub fn write_key_file(credentials: &ServiceAccountCredentials, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let content = serde_json::to_string_pretty(credentials)?;
    std::fs::write(path, content)?;
    info!("Speech service key file written: {}", path.display());
    Ok(())
}

/// Synthesize narration to `output_path`. Every failure is logged and reported as
/// `Unavailable`, so the caller can carry on without audio.
pub async fn synthesize_narration(
    synthesizer: &dyn SpeechSynthesizer,
    text: &str,
    output_path: &Path,
) -> SpeechOutcome {
    let audio = match synthesizer.synthesize(text).await {
        Ok(audio) => audio,
        Err(e) => {
            warn!("Error generating audio: {}", e);
            return SpeechOutcome::Unavailable { reason: e.to_string() };
        }
    };

    if let Err(e) = fs::write(output_path, &audio).await {
        warn!("Error writing audio to {}: {}", output_path.display(), e);
        return SpeechOutcome::Unavailable { reason: e.to_string() };
    }

    info!("Narration audio written: {} ({} bytes)", output_path.display(), audio.len());
    SpeechOutcome::Synthesized(output_path.to_path_buf())
}

/// Factory for speech backends
pub struct SpeechSynthesizerFactory;

impl SpeechSynthesizerFactory {
    /// Create the default backend (Google Cloud Text-to-Speech)
    pub fn create_default(config: &SpeechConfig) -> Result<Box<dyn SpeechSynthesizer>> {
        Ok(Box::new(GoogleSpeechClient::new(config.clone())?))
    }
}
