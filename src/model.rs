use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One qualified recipient from the source CSV.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recipient {
    pub fid: u64,
    pub token: String,
}

/// Wire payload for one notification submission. A fresh `notification_id`
/// is minted for every attempt, retries included, so the endpoint sees each
/// attempt as a distinct submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub fid: u64,
    pub notification_id: Uuid,
    pub title: String,
    pub body: String,
    pub target_url: String,
    pub tokens: Vec<String>,
}

/// Classified result of a single delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Success,
    /// 200 response whose body flagged the token as rate limited.
    RateLimited,
    /// Response body was not the JSON the endpoint is supposed to speak.
    NonJsonResponse { status: u16 },
    HttpError { status: u16 },
    NetworkError { message: String },
}

impl DeliveryStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, DeliveryStatus::Success)
    }

    /// Whether another attempt could change the result. Transport faults,
    /// unparseable responses, 5xx and 429 are worth retrying; rate limiting
    /// reported inside a 200 body and the rest of the 4xx family are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            DeliveryStatus::Success | DeliveryStatus::RateLimited => false,
            DeliveryStatus::NonJsonResponse { .. } | DeliveryStatus::NetworkError { .. } => true,
            DeliveryStatus::HttpError { status } => *status >= 500 || *status == 429,
        }
    }

    /// Label recorded in the failure artifact and the error breakdown.
    /// `None` for successful deliveries.
    pub fn error_label(&self) -> Option<String> {
        match self {
            DeliveryStatus::Success => None,
            DeliveryStatus::RateLimited => Some("Rate Limited".to_string()),
            DeliveryStatus::NonJsonResponse { status } => {
                Some(format!("Non-JSON response: {}", status))
            }
            DeliveryStatus::HttpError { status } => Some(format!("HTTP {}", status)),
            DeliveryStatus::NetworkError { message } => Some(message.clone()),
        }
    }
}

/// Terminal outcome of one recipient's delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub fid: u64,
    pub status: DeliveryStatus,
}

impl DeliveryOutcome {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Row of the persisted failure artifact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailedDelivery {
    pub fid: u64,
    pub error: String,
}
