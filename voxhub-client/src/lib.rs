//! # VoxHub Client Library
//!
//! Async HTTP client for the voxhub-am daemon. Sessions use it to reserve
//! queue slots ahead of synthesis, fill them once audio exists, and block on
//! completion.
//!
//! Typical flow:
//!
//! ```no_run
//! # async fn example() -> Result<(), voxhub_client::ClientError> {
//! use voxhub_client::AudioManagerClient;
//! use voxhub_common::Priority;
//!
//! let client = AudioManagerClient::new(None);
//! let slot = client.reserve("myproj:1234", "myproj", Priority::Normal).await?;
//! // ... synthesize audio for the message ...
//! let samples: Vec<i16> = vec![0; 24_000];
//! client.fill(slot.item_id, &samples, 24_000).await?;
//! client.wait(slot.item_id, Some(60.0)).await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;
use voxhub_common::api::{
    encode_pcm16, CancelResponse, ChimeResponse, ClearRequest, ClearResponse, ErrorBody,
    FillRequest, FillResponse, HealthResponse, PauseResponse, Priority, ReserveRequest,
    ReserveResponse, SpeakRequest, SpeakResponse, StatusResponse, StopResponse, WaitResponse,
};

/// Default daemon port
pub const DEFAULT_PORT: u16 = 8881;

/// Default per-request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Extra slack on /wait requests beyond the wait deadline itself
const WAIT_SLACK: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum ClientError {
    /// Daemon not reachable; reservations held by this session should be
    /// cancelled once it comes back
    #[error("Audio manager unavailable: {0}")]
    Unavailable(String),

    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Daemon rejected the request
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Client for the voxhub-am HTTP API
pub struct AudioManagerClient {
    base_url: String,
    http: reqwest::Client,
}

impl AudioManagerClient {
    /// Connect to the daemon on `port` (`VOXHUB_PORT` env, then 8881, when
    /// `None`). No request is made until the first call.
    pub fn new(port: Option<u16>) -> Self {
        let port = port
            .or_else(|| {
                std::env::var("VOXHUB_PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
            })
            .unwrap_or(DEFAULT_PORT);

        Self::with_base_url(format!("http://127.0.0.1:{}", port))
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()
                .expect("reqwest client construction cannot fail with static options"),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// True when the daemon answers its health endpoint.
    pub async fn health_check(&self) -> bool {
        self.health().await.is_ok()
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        self.get_json("/health").await
    }

    pub async fn status(&self) -> Result<StatusResponse> {
        self.get_json("/status").await
    }

    /// Reserve a queue slot before synthesis starts, so this message keeps
    /// its place however long generation takes.
    pub async fn reserve(
        &self,
        owner_id: impl Into<String>,
        display_name: impl Into<String>,
        priority: Priority,
    ) -> Result<ReserveResponse> {
        self.post_json(
            "/reserve",
            Some(&ReserveRequest {
                owner_id: owner_id.into(),
                display_name: display_name.into(),
                priority,
            }),
        )
        .await
    }

    /// Attach synthesized audio to a previously reserved slot.
    pub async fn fill(
        &self,
        item_id: Uuid,
        samples: &[i16],
        sample_rate: u32,
    ) -> Result<FillResponse> {
        self.post_json(
            &format!("/fill/{}", item_id),
            Some(&FillRequest {
                audio_data: encode_pcm16(samples),
                sample_rate,
            }),
        )
        .await
    }

    /// Queue audio that is already synthesized (reserve + fill atomically).
    pub async fn speak(
        &self,
        owner_id: impl Into<String>,
        display_name: impl Into<String>,
        priority: Priority,
        samples: &[i16],
        sample_rate: u32,
    ) -> Result<SpeakResponse> {
        self.post_json(
            "/speak",
            Some(&SpeakRequest {
                owner_id: owner_id.into(),
                display_name: display_name.into(),
                priority,
                audio_data: encode_pcm16(samples),
                sample_rate,
            }),
        )
        .await
    }

    /// Block until the item finishes playing or `timeout_secs` elapses
    /// (daemon default when `None`). A `completed: false` result is not an
    /// error; the call may be re-issued.
    pub async fn wait(&self, item_id: Uuid, timeout_secs: Option<f64>) -> Result<WaitResponse> {
        let path = match timeout_secs {
            Some(t) => format!("/wait/{}?timeout={}", item_id, t),
            None => format!("/wait/{}", item_id),
        };
        let url = format!("{}{}", self.base_url, path);

        // The request must outlive the daemon-side wait deadline
        let request_timeout = timeout_secs
            .map(|t| Duration::from_secs_f64(t.max(0.0)) + WAIT_SLACK)
            .unwrap_or(Duration::from_secs(180));

        let response = self
            .http
            .post(&url)
            .timeout(request_timeout)
            .send()
            .await
            .map_err(classify_send_error)?;
        parse_response(response).await
    }

    /// Release a reservation that will never be filled (e.g. synthesis
    /// failed).
    pub async fn cancel(&self, item_id: Uuid) -> Result<CancelResponse> {
        self.post_json::<ClearRequest, _>(&format!("/cancel/{}", item_id), None)
            .await
    }

    pub async fn pause(&self) -> Result<PauseResponse> {
        self.post_json::<ClearRequest, _>("/pause", None).await
    }

    pub async fn resume(&self) -> Result<PauseResponse> {
        self.post_json::<ClearRequest, _>("/resume", None).await
    }

    /// Cancel pending items; `owner_id` limits the sweep to one session.
    pub async fn clear(&self, owner_id: Option<String>) -> Result<ClearResponse> {
        self.post_json("/clear", Some(&ClearRequest { owner_id }))
            .await
    }

    /// Stop whatever is on the device right now.
    pub async fn stop(&self) -> Result<StopResponse> {
        self.post_json::<ClearRequest, _>("/stop", None).await
    }

    /// Check the shared chime cooldown; an allowed answer also claims the
    /// window, so only call when about to actually play a chime.
    pub async fn chime_allowed(&self) -> Result<ChimeResponse> {
        self.post_json::<ClearRequest, _>("/chime-allowed", None)
            .await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("GET {}", url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(classify_send_error)?;
        parse_response(response).await
    }

    async fn post_json<B: serde::Serialize, T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!("POST {}", url);
        let mut request = self.http.post(&url);
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(classify_send_error)?;
        parse_response(response).await
    }
}

fn classify_send_error(err: reqwest::Error) -> ClientError {
    if err.is_connect() || err.is_timeout() {
        ClientError::Unavailable(err.to_string())
    } else {
        ClientError::Http(err)
    }
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        Ok(response.json().await?)
    } else {
        let message = response
            .json::<ErrorBody>()
            .await
            .map(|body| body.error)
            .unwrap_or_else(|_| status.to_string());
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_base_url() {
        let client = AudioManagerClient::with_base_url("http://127.0.0.1:8881");
        assert_eq!(client.base_url(), "http://127.0.0.1:8881");
    }

    #[test]
    fn test_explicit_port() {
        let client = AudioManagerClient::new(Some(9005));
        assert_eq!(client.base_url(), "http://127.0.0.1:9005");
    }

    #[tokio::test]
    async fn test_unreachable_daemon_is_unavailable() {
        // Port 1 is never a VoxHub daemon
        let client = AudioManagerClient::with_base_url("http://127.0.0.1:1");
        assert!(!client.health_check().await);

        match client.status().await {
            Err(ClientError::Unavailable(_)) => {}
            other => panic!("expected Unavailable, got {:?}", other.map(|_| ())),
        }
    }
}
