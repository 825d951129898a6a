pub mod nats;

use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

pub use nats::NatsMinutesGenerator;

/// One follow-up item from the meeting
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ActionItem {
    pub task: String,
    pub assignee: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
}

/// Structured meeting minutes produced from the frozen transcript.
///
/// The keys are contractual for downstream export consumers; values may be
/// absent or empty. The core treats the document as opaque beyond passing
/// it through.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct MeetingMinutes {
    pub title: String,
    pub date: String,
    pub attendees: Vec<String>,
    pub agenda: Vec<String>,
    pub discussion_points: Vec<String>,
    pub decisions: Vec<String>,
    pub action_items: Vec<ActionItem>,
}

/// Summarization collaborator: transcript text in, minutes out
#[async_trait::async_trait]
pub trait MinutesGenerator: Send + Sync {
    async fn generate(&self, transcript: &str) -> Result<MeetingMinutes, GenerationError>;
}

/// Extract the JSON object from a reply that may carry surrounding prose
fn extract_json(s: &str) -> Option<&str> {
    let start = s.find('{')?;
    let end = s.rfind('}')?;
    if end > start {
        Some(&s[start..=end])
    } else {
        None
    }
}

/// Parse a generation reply leniently: model replies often wrap the JSON in
/// prose or code fences.
pub fn parse_minutes_reply(reply: &str) -> Result<MeetingMinutes, GenerationError> {
    let json = extract_json(reply)
        .ok_or_else(|| GenerationError::Parse("no JSON object in reply".to_string()))?;
    serde_json::from_str(json).map_err(|e| GenerationError::Parse(e.to_string()))
}
