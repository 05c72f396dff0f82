//! API request/response types for the audio manager HTTP surface
//!
//! Shared between the daemon (voxhub-am) and the client library
//! (voxhub-client) so the two cannot drift apart.
//!
//! Audio payloads travel as base64-encoded 16-bit little-endian PCM with an
//! explicit sample rate.

use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Default sample rate for speech clips (Hz)
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

/// Playback priority class.
///
/// `High` is reserved for alert chimes; `Normal` carries spoken content.
/// High items are dispatched ahead of all not-yet-started normal items but
/// never interrupt a clip that is already playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Normal,
}

impl Priority {
    /// Dispatch rank; lower plays first.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Normal => 1,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::High => write!(f, "high"),
            Priority::Normal => write!(f, "normal"),
        }
    }
}

// ============================================================================
// Requests
// ============================================================================

/// POST /reserve
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveRequest {
    /// Composite identifier of the submitting session
    pub owner_id: String,
    /// Human-readable project label, used only for announcement text
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub priority: Priority,
}

/// POST /fill/:item_id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillRequest {
    /// base64-encoded 16-bit LE PCM samples
    pub audio_data: String,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

/// POST /speak — reserve and fill in one atomic call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakRequest {
    pub owner_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub priority: Priority,
    /// base64-encoded 16-bit LE PCM samples
    pub audio_data: String,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

/// POST /clear
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClearRequest {
    /// When set, only items from this owner are cleared
    #[serde(default)]
    pub owner_id: Option<String>,
}

fn default_sample_rate() -> u32 {
    DEFAULT_SAMPLE_RATE
}

// ============================================================================
// Responses
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReserveResponse {
    pub item_id: Uuid,
    /// 1-based position in dispatch order at reservation time
    pub position: usize,
    /// Whether the caller should prefix a cross-session announcement
    pub should_announce: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillResponse {
    pub filled: bool,
    pub item_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeakResponse {
    pub item_id: Uuid,
    pub position: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitResponse {
    pub completed: bool,
    pub item_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancelResponse {
    pub cancelled: bool,
    pub item_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PauseResponse {
    pub paused: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearResponse {
    pub cleared: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StopResponse {
    pub stopped: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChimeResponse {
    pub allowed: bool,
    /// Seconds until the next chime would be allowed (0 when allowed)
    pub seconds_remaining: f64,
}

/// Summary of the currently playing item, embedded in status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayingItemInfo {
    pub item_id: Uuid,
    pub owner_id: String,
    pub display_name: String,
    pub priority: Priority,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub playing: bool,
    pub paused: bool,
    pub current: Option<PlayingItemInfo>,
    pub queue_length: usize,
    pub pending_reservations: usize,
    pub total_enqueued: u64,
    pub total_played: u64,
    pub estimated_wait_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    pub uptime_seconds: u64,
}

/// JSON error body returned for any failed request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

// ============================================================================
// Payload encoding
// ============================================================================

/// Encode 16-bit PCM samples into the base64 wire format.
pub fn encode_pcm16(samples: &[i16]) -> String {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for s in samples {
        bytes.extend_from_slice(&s.to_le_bytes());
    }
    BASE64.encode(bytes)
}

/// Decode the base64 wire format into 16-bit PCM samples.
///
/// Fails on invalid base64 or an odd byte count.
pub fn decode_pcm16(data: &str) -> Result<Vec<i16>> {
    let bytes = BASE64
        .decode(data)
        .map_err(|e| Error::InvalidPayload(format!("invalid base64 audio_data: {}", e)))?;

    if bytes.len() % 2 != 0 {
        return Err(Error::InvalidPayload(format!(
            "PCM16 payload has odd byte count ({})",
            bytes.len()
        )));
    }

    Ok(bytes
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_serde() {
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"high\"");
        let p: Priority = serde_json::from_str("\"normal\"").unwrap();
        assert_eq!(p, Priority::Normal);
    }

    #[test]
    fn test_priority_rank_order() {
        assert!(Priority::High.rank() < Priority::Normal.rank());
    }

    #[test]
    fn test_pcm16_round_trip() {
        let samples: Vec<i16> = vec![0, 1, -1, i16::MAX, i16::MIN, 12345];
        let encoded = encode_pcm16(&samples);
        let decoded = decode_pcm16(&encoded).unwrap();
        assert_eq!(decoded, samples);
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        assert!(decode_pcm16("not!!base64").is_err());
    }

    #[test]
    fn test_decode_rejects_odd_byte_count() {
        let encoded = BASE64.encode([1u8, 2, 3]);
        let err = decode_pcm16(&encoded).unwrap_err();
        assert!(err.to_string().contains("odd byte count"));
    }

    #[test]
    fn test_reserve_request_defaults() {
        let req: ReserveRequest =
            serde_json::from_str(r#"{"owner_id": "proj-1:42"}"#).unwrap();
        assert_eq!(req.priority, Priority::Normal);
        assert!(req.display_name.is_empty());
    }

    #[test]
    fn test_fill_request_default_sample_rate() {
        let req: FillRequest = serde_json::from_str(r#"{"audio_data": ""}"#).unwrap();
        assert_eq!(req.sample_rate, DEFAULT_SAMPLE_RATE);
    }
}
