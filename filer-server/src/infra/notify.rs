//! Outbound transcoding reports to the bookkeeping service.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use filer_config::NotifyConfig;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

/// A transcoded file has been published to the destination directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscodeCompleted {
    pub original_sha1: String,
    pub sha1: String,
    pub file_name: String,
    pub size: i64,
    pub created_at: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscodeFailed {
    pub original_sha1: String,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notify request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("notify endpoint answered {status}")]
    Status { status: reqwest::StatusCode },
}

#[async_trait]
pub trait Notifier: Send + Sync + fmt::Debug {
    async fn completed(&self, event: TranscodeCompleted);
    async fn failed(&self, event: TranscodeFailed);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn completed(&self, event: TranscodeCompleted) {
        debug!(file = %event.file_name, "notifications disabled");
    }

    async fn failed(&self, event: TranscodeFailed) {
        debug!(original = %event.original_sha1, "notifications disabled");
    }
}

#[derive(Serialize)]
struct Envelope<'a, T> {
    #[serde(flatten)]
    event: &'a T,
    station: &'a str,
    user: &'a str,
}

/// POSTs every event as JSON, stamped with the configured station and user.
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    client: reqwest::Client,
    url: String,
    station: String,
    user: String,
}

impl HttpNotifier {
    pub fn new(config: &NotifyConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: config.url.clone(),
            station: config.station.clone(),
            user: config.user.clone(),
        }
    }

    async fn post<T: Serialize + Sync>(&self, event: &T) -> Result<(), NotifyError> {
        let body = Envelope {
            event,
            station: &self.station,
            user: &self.user,
        };
        let response = self.client.post(&self.url).json(&body).send().await?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(NotifyError::Status { status });
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn completed(&self, event: TranscodeCompleted) {
        if let Err(err) = self.post(&event).await {
            warn!(file = %event.file_name, error = %err, "completion notify failed");
        }
    }

    async fn failed(&self, event: TranscodeFailed) {
        if let Err(err) = self.post(&event).await {
            warn!(original = %event.original_sha1, error = %err, "failure notify failed");
        }
    }
}

/// Picks the HTTP client when a notify URL is configured.
pub fn notifier_from_config(config: &NotifyConfig) -> Arc<dyn Notifier> {
    if config.is_enabled() {
        Arc::new(HttpNotifier::new(config))
    } else {
        Arc::new(DisabledNotifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_flattens_event_fields() {
        let event = TranscodeFailed {
            original_sha1: "abc".into(),
            message: "boom".into(),
        };
        let body = serde_json::to_value(Envelope {
            event: &event,
            station: "st-1",
            user: "ops",
        })
        .unwrap();

        assert_eq!(
            body,
            serde_json::json!({
                "original_sha1": "abc",
                "message": "boom",
                "station": "st-1",
                "user": "ops",
            })
        );
    }

    #[test]
    fn empty_url_disables_notifications() {
        let config = NotifyConfig {
            url: " ".into(),
            station: String::new(),
            user: String::new(),
        };
        let notifier = notifier_from_config(&config);
        assert!(format!("{notifier:?}").contains("DisabledNotifier"));
    }
}
