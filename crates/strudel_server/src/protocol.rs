use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use strudel_core::queue::CancelOutcome;
use strudel_core::{ErrorKind, Mood, Pattern, PatternAnalysis, QueuedChange};

/// Shortest accepted edit description, in characters.
pub const MIN_DESCRIPTION_CHARS: usize = 5;
/// Longest accepted edit description, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 200;

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleResponse {
    pub change_id: u64,
    pub execute_at: DateTime<Local>,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueStatusResponse {
    pub pending_changes: Vec<QueuedChange>,
    pub total_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelResponse {
    pub status: CancelOutcome,
    pub change_id: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatternQuery {
    /// Include the analysis alongside the pattern.
    #[serde(default = "default_true")]
    pub metadata: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatternResponse {
    pub pattern: Pattern,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<PatternAnalysis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_edited: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A candidate pattern: either a JSON record or dialect text as a string.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidateRequest {
    pub pattern_data: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidateResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WritePatternRequest {
    pub pattern_data: Value,
    pub edit_description: String,
    #[serde(default = "default_true")]
    pub validate_before_write: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct WritePatternResponse {
    pub status: String,
    pub edit_description: String,
    pub bpm: u32,
    pub backup: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestionQuery {
    pub mood: Mood,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SuggestionRequest {
    pub mood: Mood,
    /// Advise on this candidate instead of the stored pattern.
    #[serde(default)]
    pub current_pattern: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub agent_ready: bool,
    pub queue_size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
}
