//! MAX messenger adapter.
//!
//! Posts HTML messages to the MAX platform `messages` endpoint. The bot token
//! and target chat travel as query parameters.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, warn};

use tsb_core::{
    domain::{ChatId, MessageId, MessageRef},
    errors::Error,
    messaging::{port::MessagingPort, types::MessagingCapabilities},
    Result,
};

/// Per-message limit accepted by the MAX platform.
pub const MAX_MESSAGE_LEN: usize = 4000;

const SEND_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Clone)]
pub struct MaxMessenger {
    http: reqwest::Client,
    api_url: String,
    token: String,
}

impl MaxMessenger {
    pub fn new(api_url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|e| Error::External(format!("failed to build http client: {e}")))?;
        Ok(Self::with_http(http, api_url, token))
    }

    pub fn with_http(
        http: reqwest::Client,
        api_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_url: api_url.into(),
            token: token.into(),
        }
    }
}

/// `message.body.seq` when the platform reports it.
fn message_seq(body: &Value) -> Option<i64> {
    body.pointer("/message/body/seq").and_then(Value::as_i64)
}

#[async_trait]
impl MessagingPort for MaxMessenger {
    fn capabilities(&self) -> MessagingCapabilities {
        MessagingCapabilities {
            max_message_len: MAX_MESSAGE_LEN,
        }
    }

    async fn send_html(&self, chat_id: ChatId, html: &str) -> Result<MessageRef> {
        if chat_id.0 == 0 {
            return Err(Error::External("max error: chat_id is required".to_string()));
        }

        let chat = chat_id.0.to_string();
        let resp = self
            .http
            .post(&self.api_url)
            .query(&[
                ("access_token", self.token.as_str()),
                ("chat_id", chat.as_str()),
            ])
            .json(&json!({
                "text": html,
                "attachments": null,
                "link": null,
                "format": "html",
            }))
            .send()
            .await
            .map_err(|e| Error::External(format!("max error: {e}")))?;

        let status = resp.status();
        let text = resp
            .text()
            .await
            .map_err(|e| Error::External(format!("max error: {e}")))?;

        if !status.is_success() {
            let snippet: String = text.chars().take(200).collect();
            warn!(
                chat_id = chat_id.0,
                status = status.as_u16(),
                body = %snippet,
                "max send rejected"
            );
            return Err(Error::transport(status.as_u16(), snippet));
        }

        debug!(chat_id = chat_id.0, "max message sent");
        let seq = serde_json::from_str::<Value>(&text)
            .ok()
            .as_ref()
            .and_then(message_seq)
            .unwrap_or(0);

        Ok(MessageRef {
            chat_id,
            message_id: MessageId(seq),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_seq_from_platform_reply() {
        let body = json!({"message": {"body": {"mid": "mid.1", "seq": 42}}});
        assert_eq!(message_seq(&body), Some(42));
        assert_eq!(message_seq(&json!({"ok": true})), None);
    }

    #[test]
    fn capabilities_cap_chunks_at_platform_limit() {
        let m = MaxMessenger::with_http(reqwest::Client::new(), "http://localhost", "t");
        assert_eq!(m.capabilities().chunk_limit(10_000), MAX_MESSAGE_LEN);
    }
}
