//! Social share: fire-and-forget cast after a confirmed submission.
//!
//! Share failure is logged and dropped; it never blocks or reverses a
//! leaderboard write.

use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;

/// Cast text for a freshly confirmed score.
pub fn share_text(score: u32) -> String {
    format!("🐍 I scored {score} points in the Snake Game! Can you beat my score?")
}

#[derive(Debug, Error)]
pub enum ShareError {
    #[error("share transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

#[async_trait]
pub trait SocialClient: Send + Sync {
    async fn compose_cast(&self, username: &str, text: &str) -> Result<(), ShareError>;
}

/// Log-only share, used when no share endpoint is configured.
pub struct CastLogger;

#[async_trait]
impl SocialClient for CastLogger {
    async fn compose_cast(&self, username: &str, text: &str) -> Result<(), ShareError> {
        tracing::info!(%username, %text, "share (no endpoint configured, logged only)");
        Ok(())
    }
}

/// POSTs the cast to a configured webhook.
pub struct WebhookCaster {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookCaster {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl SocialClient for WebhookCaster {
    async fn compose_cast(&self, username: &str, text: &str) -> Result<(), ShareError> {
        self.client
            .post(&self.endpoint)
            .json(&json!({ "username": username, "text": text }))
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn share_text_names_the_score() {
        assert!(share_text(80).contains("80 points"));
    }
}
