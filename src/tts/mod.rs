pub mod credential;
pub mod ssml;
pub mod voice;

use std::time::{Duration, Instant};

use axum::http::HeaderValue;
use bytes::Bytes;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::error::AppError;
use crate::retry::{retry, RetryPolicy};

pub use credential::{Credential, CredentialCache};
pub use voice::Voice;

pub const DEFAULT_VOICE: &str = "zh-CN-XiaoxiaoNeural";
pub const DEFAULT_OUTPUT_FORMAT: &str = "audio-24khz-48kbitrate-mono-mp3";

const USER_AGENT: &str = "okhttp/4.5.0";

#[derive(Debug, Clone)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice_name: String,
    pub rate: f64,
    pub pitch: f64,
    /// Passed to the speech service as-is.
    pub output_format: String,
    pub wants_download: bool,
}

impl Default for SynthesisRequest {
    fn default() -> Self {
        Self {
            text: String::new(),
            voice_name: DEFAULT_VOICE.to_string(),
            rate: 0.0,
            pitch: 0.0,
            output_format: DEFAULT_OUTPUT_FORMAT.to_string(),
            wants_download: false,
        }
    }
}

/// Audio returned by the speech service, body untouched.
#[derive(Debug)]
pub struct SynthesizedAudio {
    pub bytes: Bytes,
    pub content_type: HeaderValue,
    /// Set when the caller asked for an attachment.
    pub filename: Option<String>,
}

pub struct TtsService {
    client: reqwest::Client,
    credentials: CredentialCache,
    speech_base_url: String,
    voice_cache_ttl: Duration,
    voices: Mutex<Option<(Instant, Vec<Voice>)>>,
    retry_policy: RetryPolicy,
}

impl TtsService {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            credentials: CredentialCache::new(
                client.clone(),
                config.endpoint_url.clone(),
                config.endpoint_timeout,
            ),
            client,
            speech_base_url: config.speech_base_url.clone(),
            voice_cache_ttl: config.voice_cache_ttl,
            voices: Mutex::new(None),
            retry_policy: RetryPolicy::default(),
        })
    }

    #[cfg(test)]
    pub(crate) fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    fn speech_url(&self, credential: &Credential, path: &str) -> String {
        format!(
            "{}{}",
            self.speech_base_url.replace("{region}", &credential.region),
            path
        )
    }

    pub async fn synthesize(&self, request: SynthesisRequest) -> Result<SynthesizedAudio, AppError> {
        if request.text.is_empty() {
            return Err(AppError::Validation("Text cannot be empty".into()));
        }

        let content_type = HeaderValue::from_str(&request.output_format).map_err(|_| {
            AppError::Validation(format!("Invalid output format '{}'", request.output_format))
        })?;

        let credential = self.credentials.ensure_fresh().await?;
        let body = ssml::build_ssml(&request.text, &request.voice_name, request.rate, request.pitch);

        let response = self
            .client
            .post(self.speech_url(&credential, "/cognitiveservices/v1"))
            .header("Authorization", &credential.token)
            .header("Content-Type", "application/ssml+xml")
            .header("X-Microsoft-OutputFormat", content_type.clone())
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::UpstreamSynthesis {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        tracing::info!(
            voice = %request.voice_name,
            format = %request.output_format,
            "Synthesized {} chars into {} bytes",
            request.text.chars().count(),
            bytes.len()
        );

        let filename = request
            .wants_download
            .then(|| format!("speech_{}.mp3", chrono::Utc::now().timestamp_millis()));

        Ok(SynthesizedAudio {
            bytes,
            content_type,
            filename,
        })
    }

    /// Full voice list, served from memory while younger than the cache TTL.
    pub async fn list_voices(&self) -> Result<Vec<Voice>, AppError> {
        let mut cached = self.voices.lock().await;

        if let Some((fetched_at, voices)) = cached.as_ref() {
            if fetched_at.elapsed() < self.voice_cache_ttl {
                return Ok(voices.clone());
            }
        }

        let voices = retry(self.retry_policy, || self.fetch_voices()).await?;
        tracing::info!("Fetched {} voices", voices.len());

        *cached = Some((Instant::now(), voices.clone()));
        Ok(voices)
    }

    async fn fetch_voices(&self) -> Result<Vec<Voice>, AppError> {
        let credential = self.credentials.ensure_fresh().await?;

        let response = self
            .client
            .get(self.speech_url(&credential, "/cognitiveservices/voices/list"))
            .header("Authorization", &credential.token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::UpstreamVoices {
                status: status.as_u16(),
            });
        }

        Ok(response.json().await?)
    }
}
