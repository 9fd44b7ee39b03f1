use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use base64::Engine;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::error::AppError;

/// Credentials closer than this to expiry are treated as stale.
pub const EXPIRY_MARGIN_SECS: i64 = 60;

const USER_AGENT: &str = "okhttp/4.5.0";

/// Access token and region issued by the endpoint service.
#[derive(Debug, Clone, PartialEq)]
pub struct Credential {
    pub token: String,
    pub region: String,
    /// Unix seconds, taken from the token's `exp` claim.
    pub expires_at: i64,
    /// Client trace id sent with the request that issued this credential.
    pub trace_id: String,
}

impl Credential {
    pub fn is_fresh(&self, now: i64) -> bool {
        now < self.expires_at - EXPIRY_MARGIN_SECS
    }

    fn remaining_minutes(&self, now: i64) -> f64 {
        (self.expires_at - now) as f64 / 60.0
    }
}

#[derive(Debug, Deserialize)]
struct EndpointResponse {
    t: String,
    r: String,
}

#[derive(Debug, Deserialize)]
struct TokenClaims {
    exp: f64,
}

/// Holds at most one credential and replaces it wholesale when stale.
///
/// The slot is locked for the whole check-then-refresh sequence, so
/// concurrent callers that find it stale wait for a single refresh.
pub struct CredentialCache {
    client: reqwest::Client,
    endpoint_url: String,
    /// Bounds the endpoint request, which runs with the slot locked.
    timeout: Duration,
    slot: Mutex<Option<Credential>>,
}

impl CredentialCache {
    pub fn new(client: reqwest::Client, endpoint_url: String, timeout: Duration) -> Self {
        Self {
            client,
            endpoint_url,
            timeout,
            slot: Mutex::new(None),
        }
    }

    pub async fn ensure_fresh(&self) -> Result<Credential, AppError> {
        let mut slot = self.slot.lock().await;
        let now = chrono::Utc::now().timestamp();

        if let Some(credential) = slot.as_ref().filter(|c| c.is_fresh(now)) {
            tracing::debug!(
                "Endpoint cached, expires in {:.2} minutes",
                credential.remaining_minutes(now)
            );
            return Ok(credential.clone());
        }

        let credential = self.fetch().await?;
        if !credential.is_fresh(now) {
            return Err(AppError::UpstreamAuth(format!(
                "Issued token already near expiry ({:.2} minutes left)",
                credential.remaining_minutes(now)
            )));
        }

        tracing::info!(
            region = %credential.region,
            trace_id = %credential.trace_id,
            "Endpoint refreshed, expires in {:.2} minutes",
            credential.remaining_minutes(now)
        );
        *slot = Some(credential.clone());
        Ok(credential)
    }

    async fn fetch(&self) -> Result<Credential, AppError> {
        let trace_id = uuid::Uuid::new_v4().simple().to_string();

        let response = self
            .client
            .post(&self.endpoint_url)
            .header("Accept-Language", "zh-Hans")
            .header("X-ClientVersion", "4.0.530a 5fe1dc6c")
            .header("X-UserId", "0f04d16a175c411e")
            .header("X-HomeGeographicRegion", "zh-Hans-CN")
            .header("X-ClientTraceId", &trace_id)
            .header("User-Agent", USER_AGENT)
            .header("Content-Type", "application/json; charset=utf-8")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AppError::UpstreamAuth(format!("Endpoint request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::UpstreamAuth(format!(
                "Endpoint request returned status {}",
                status.as_u16()
            )));
        }

        let body: EndpointResponse = response
            .json()
            .await
            .map_err(|e| AppError::UpstreamAuth(format!("Malformed endpoint response: {}", e)))?;

        let expires_at = token_expiry(&body.t)?;

        Ok(Credential {
            token: body.t,
            region: body.r,
            expires_at,
            trace_id,
        })
    }
}

/// Reads the `exp` claim from the payload segment of a JWT without
/// verifying the signature.
pub fn token_expiry(token: &str) -> Result<i64, AppError> {
    let payload = token
        .split('.')
        .nth(1)
        .filter(|p| !p.is_empty())
        .ok_or_else(|| AppError::UpstreamAuth("Token has no payload segment".into()))?;
    let payload = payload.trim_end_matches('=');

    let decoded = URL_SAFE_NO_PAD
        .decode(payload)
        .or_else(|_| STANDARD_NO_PAD.decode(payload))
        .map_err(|e| AppError::UpstreamAuth(format!("Token payload is not base64: {}", e)))?;

    let claims: TokenClaims = serde_json::from_slice(&decoded)
        .map_err(|e| AppError::UpstreamAuth(format!("Token payload has no exp claim: {}", e)))?;

    if !claims.exp.is_finite() {
        return Err(AppError::UpstreamAuth("Token exp claim is not finite".into()));
    }

    Ok(claims.exp.floor() as i64)
}
