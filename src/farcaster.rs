//! Farcaster frame-notification client and response classification.
use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::model::{DeliveryOutcome, DeliveryStatus, NotificationPayload, Recipient};

pub const NOTIFICATION_URL: &str = "https://api.farcaster.xyz/v1/frame-notifications";

/// Longest response-body prefix kept for diagnostics.
const BODY_SNIPPET_LEN: usize = 200;

/// Campaign content stamped into every payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
    pub target_url: String,
}

#[derive(Clone)]
pub struct FarcasterClient {
    http: Client,
    endpoint: Url,
    content: NotificationContent,
}

impl fmt::Debug for FarcasterClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FarcasterClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// Delivery seam: one notification submission per call. Implemented by
/// [`FarcasterClient`] and by recording mocks in tests.
#[async_trait]
pub trait FarcasterService: Send + Sync {
    async fn send_notification(
        &self,
        recipient: &Recipient,
        notification_id: Uuid,
    ) -> DeliveryOutcome;
}

impl FarcasterClient {
    pub fn new(
        endpoint: Url,
        content: NotificationContent,
        user_agent: &str,
        timeout: Duration,
    ) -> Self {
        let http = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .expect("reqwest client");
        Self {
            http,
            endpoint,
            content,
        }
    }

    pub fn build_request(&self, payload: &NotificationPayload) -> Result<reqwest::Request> {
        self.http
            .post(self.endpoint.clone())
            .header("Content-Type", "application/json")
            .json(payload)
            .build()
            .context("failed to build notification request")
    }

    /// Issue one request and classify the response. Anything that keeps a
    /// classification from happening surfaces as `Err` and becomes
    /// `NetworkError` in the caller.
    async fn dispatch_once(
        &self,
        recipient: &Recipient,
        notification_id: Uuid,
    ) -> Result<DeliveryStatus> {
        let payload = build_payload(&self.content, recipient, notification_id);
        let request = self.build_request(&payload)?;
        debug!(
            fid = recipient.fid,
            notification_id = %notification_id,
            url = %request.url(),
            "sending notification"
        );

        let res = self.http.execute(request).await?;

        let status = res.status();
        let content_type = res
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = res
            .text()
            .await
            .context("failed to read notification response")?;

        let classified = classify(status, content_type.as_deref(), &body);
        match &classified {
            DeliveryStatus::Success => debug!(fid = recipient.fid, "delivered"),
            DeliveryStatus::RateLimited => warn!(fid = recipient.fid, "token rate limited"),
            DeliveryStatus::NonJsonResponse { status } => warn!(
                fid = recipient.fid,
                status,
                snippet = %truncate(&body, BODY_SNIPPET_LEN),
                "non-JSON response"
            ),
            DeliveryStatus::HttpError { status } => warn!(
                fid = recipient.fid,
                status,
                body = %truncate(&body, BODY_SNIPPET_LEN),
                "delivery rejected"
            ),
            DeliveryStatus::NetworkError { .. } => {}
        }
        Ok(classified)
    }
}

#[async_trait]
impl FarcasterService for FarcasterClient {
    async fn send_notification(
        &self,
        recipient: &Recipient,
        notification_id: Uuid,
    ) -> DeliveryOutcome {
        let status = match self.dispatch_once(recipient, notification_id).await {
            Ok(status) => status,
            Err(err) => {
                let message = format!("{:#}", err);
                warn!(fid = recipient.fid, error = %message, "network error");
                DeliveryStatus::NetworkError { message }
            }
        };
        DeliveryOutcome {
            fid: recipient.fid,
            status,
        }
    }
}

/// Build the wire payload for one attempt.
pub fn build_payload(
    content: &NotificationContent,
    recipient: &Recipient,
    notification_id: Uuid,
) -> NotificationPayload {
    NotificationPayload {
        fid: recipient.fid,
        notification_id,
        title: content.title.clone(),
        body: content.body.clone(),
        target_url: content.target_url.clone(),
        tokens: vec![recipient.token.clone()],
    }
}

/// Shape of the endpoint's 200 response body.
#[derive(Debug, Deserialize)]
struct SendResponse {
    result: Option<SendResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendResult {
    rate_limited_tokens: Option<Vec<String>>,
}

/// Map one raw response to a delivery status. Pure: the same
/// (status, content type, body) triple always yields the same variant.
pub fn classify(status: StatusCode, content_type: Option<&str>, body: &str) -> DeliveryStatus {
    let is_json = content_type.map_or(false, |ct| ct.contains("application/json"));
    if !is_json {
        return DeliveryStatus::NonJsonResponse {
            status: status.as_u16(),
        };
    }
    if status == StatusCode::OK {
        return match serde_json::from_str::<SendResponse>(body) {
            Ok(parsed) => {
                let rate_limited = parsed
                    .result
                    .and_then(|r| r.rate_limited_tokens)
                    .map_or(false, |tokens| !tokens.is_empty());
                if rate_limited {
                    DeliveryStatus::RateLimited
                } else {
                    DeliveryStatus::Success
                }
            }
            // Labeled JSON but does not decode: treated like a non-JSON body.
            Err(_) => DeliveryStatus::NonJsonResponse {
                status: status.as_u16(),
            },
        };
    }
    DeliveryStatus::HttpError {
        status: status.as_u16(),
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
