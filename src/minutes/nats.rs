use std::time::Duration;

use async_nats::Client;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::GenerationError;

use super::{parse_minutes_reply, MeetingMinutes, MinutesGenerator};

/// Subject for minutes generation requests
pub const MINUTES_SUBJECT: &str = "minutes.generate";

#[derive(Debug, Serialize, Deserialize)]
pub struct MinutesRequest {
    pub transcript: String,
}

/// Minutes generation over NATS request-reply
pub struct NatsMinutesGenerator {
    client: Client,
    request_timeout: Duration,
}

impl NatsMinutesGenerator {
    pub fn new(client: Client, request_timeout: Duration) -> Self {
        Self {
            client,
            request_timeout,
        }
    }
}

#[async_trait::async_trait]
impl MinutesGenerator for NatsMinutesGenerator {
    async fn generate(&self, transcript: &str) -> Result<MeetingMinutes, GenerationError> {
        let request = MinutesRequest {
            transcript: transcript.to_string(),
        };
        let payload =
            serde_json::to_vec(&request).map_err(|e| GenerationError::Request(e.to_string()))?;

        info!(
            "Requesting minutes for {} characters of transcript",
            transcript.chars().count()
        );

        let reply = tokio::time::timeout(
            self.request_timeout,
            self.client.request(MINUTES_SUBJECT, payload.into()),
        )
        .await
        .map_err(|_| {
            GenerationError::Request(format!("no reply within {:?}", self.request_timeout))
        })?
        .map_err(|e| GenerationError::Request(e.to_string()))?;

        parse_minutes_reply(&String::from_utf8_lossy(&reply.payload))
    }
}
