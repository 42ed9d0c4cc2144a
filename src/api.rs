//! HTTP client for the tutor API.
//!
//! Status codes are mapped to [`ApiError`] here so callers never see a raw
//! `reqwest` failure: 5xx is a server error, 429 is a rate limit, anything
//! that never got a response is a network error.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Response, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::assessment::{Assessment, AssessmentSubmission, AssessmentSummary, SubmissionResult};
use crate::config::ApiConfig;
use crate::error::TutorError;
use crate::models::{Message, MessageRole, TabType, TrackProgress, TrackStatus};
use crate::reconciler::{ChatTransport, SendRequest};
use crate::store::SendReceipt;

pub const SERVER_ERROR_MESSAGE: &str = "Server error. Please try again later.";
pub const RATE_LIMIT_MESSAGE: &str =
    "Rate limit exceeded. Please wait before sending another message.";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("server error (HTTP {status})")]
    Server { status: u16 },

    #[error("rate limit exceeded")]
    RateLimited,

    #[error("API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Network(String),

    #[error("failed to parse response: {0}")]
    Decode(String),

    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            429 => ApiError::RateLimited,
            500..=599 => ApiError::Server { status },
            _ => ApiError::Status { status, body },
        }
    }

    /// Text to show the learner. Failures without a specific message fall
    /// back to `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Server { .. } => SERVER_ERROR_MESSAGE.to_string(),
            ApiError::RateLimited => RATE_LIMIT_MESSAGE.to_string(),
            _ => fallback.to_string(),
        }
    }
}

// A chat message as the API returns it
#[derive(Debug, Clone, Deserialize)]
struct ChatRecord {
    id: String,
    role: MessageRole,
    content: String,
    timestamp: DateTime<Utc>,
    #[serde(default, rename = "messageId")]
    message_id: Option<String>,
}

impl ChatRecord {
    fn into_message(self, tab: TabType) -> Message {
        Message::committed(self.id, self.role, self.content, self.timestamp, tab)
    }

    // A user record acknowledges the sent message; an assistant record is
    // the reply, optionally naming the sent message's server id.
    fn into_receipt(self, tab: TabType) -> SendReceipt {
        match self.role {
            MessageRole::User => SendReceipt {
                message_id: Some(self.id),
                timestamp: Some(self.timestamp),
                reply: None,
            },
            MessageRole::Assistant => SendReceipt {
                message_id: self.message_id.clone(),
                timestamp: None,
                reply: Some(self.into_message(tab)),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct SuccessResponse {
    success: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub total_lessons: u32,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub estimated_hours: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProgressUpdate<'a> {
    overall_progress: u8,
    completed_lessons: &'a [String],
    time_spent_ms: u64,
    status: TrackStatus,
    last_accessed: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProgressAck {
    pub success: bool,
    #[serde(default)]
    pub progress: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthStatus {
    pub status: String,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, TutorError> {
        let base_url = config
            .base_url
            .clone()
            .ok_or_else(|| TutorError::Config("api.base_url is required".to_string()))?;
        Url::parse(&base_url)
            .map_err(|e| TutorError::Config(format!("invalid api.base_url '{}': {}", base_url, e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(api_key) = &config.api_key {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", api_key))
                    .map_err(|e| TutorError::Config(format!("invalid api_key: {}", e)))?,
            );
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| TutorError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { http, base_url })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url =
            Url::parse(&self.base_url).map_err(|e| ApiError::InvalidUrl(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn read<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
        let status = response.status();
        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| ApiError::Decode(e.to_string()))
        } else {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            warn!(status = status.as_u16(), %body, "API request rejected");
            Err(ApiError::from_status(status.as_u16(), body))
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;
        debug!(%url, "GET");
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::read(response).await
    }

    pub async fn send_message(&self, request: &SendRequest) -> Result<SendReceipt, ApiError> {
        let url = self.endpoint(&["chat", "send"])?;
        debug!(%url, tab = request.tab.as_str(), "sending chat message");
        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let record: ChatRecord = Self::read(response).await?;
        Ok(record.into_receipt(request.tab))
    }

    pub async fn chat_history(&self, tab: TabType) -> Result<Vec<Message>, ApiError> {
        let records: Vec<ChatRecord> = self
            .get(&["chat", "history"], &[("tab", tab.as_str())])
            .await?;
        Ok(records.into_iter().map(|r| r.into_message(tab)).collect())
    }

    pub async fn delete_chat_history(&self, tab: TabType) -> Result<bool, ApiError> {
        let url = self.endpoint(&["chat", "history"])?;
        let response = self
            .http
            .delete(url)
            .query(&[("tab", tab.as_str())])
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        let ack: SuccessResponse = Self::read(response).await?;
        Ok(ack.success)
    }

    pub async fn learning_tracks(&self) -> Result<Vec<TrackSummary>, ApiError> {
        self.get(&["learning", "tracks"], &[]).await
    }

    pub async fn update_track_progress(&self, track: &TrackProgress) -> Result<ProgressAck, ApiError> {
        let url = self.endpoint(&["learning", "tracks", &track.track_id, "progress"])?;
        let body = ProgressUpdate {
            overall_progress: track.overall_progress,
            completed_lessons: &track.completed_lessons,
            time_spent_ms: track.time_spent_ms,
            status: track.status,
            last_accessed: track.last_accessed,
        };
        let response = self
            .http
            .put(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::read(response).await
    }

    pub async fn available_assessments(&self) -> Result<Vec<AssessmentSummary>, ApiError> {
        self.get(&["assessments", "available"], &[]).await
    }

    pub async fn assessment(&self, id: &str) -> Result<Assessment, ApiError> {
        self.get(&["assessments", id], &[]).await
    }

    pub async fn submit_assessment(
        &self,
        submission: &AssessmentSubmission,
    ) -> Result<SubmissionResult, ApiError> {
        let url = self.endpoint(&["assessments", "submit"])?;
        let response = self
            .http
            .post(url)
            .json(submission)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Self::read(response).await
    }

    pub async fn health(&self) -> Result<HealthStatus, ApiError> {
        self.get(&["health"], &[]).await
    }
}

#[async_trait(?Send)]
impl ChatTransport for ApiClient {
    async fn send(&self, request: &SendRequest) -> Result<SendReceipt, ApiError> {
        self.send_message(request).await
    }

    async fn history(&self, tab: TabType) -> Result<Vec<Message>, ApiError> {
        self.chat_history(tab).await
    }

    async fn clear_history(&self, tab: TabType) -> Result<bool, ApiError> {
        self.delete_chat_history(tab).await
    }
}
