use serde::Deserialize;
use tsb_core::{errors::Error, Result};

use crate::client::request_error;

/// OAuth2 client-credentials grant against the identity provider.
#[derive(Clone)]
pub struct ClientCredentials {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

impl ClientCredentials {
    /// Request a fresh access token (`scope=openid`).
    pub async fn fetch_token(&self, http: &reqwest::Client) -> Result<String> {
        let form = [
            ("grant_type", "client_credentials"),
            ("scope", "openid"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        let resp = http
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| request_error("token", e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::transport(
                status.as_u16(),
                body.chars().take(200).collect::<String>(),
            ));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| Error::Decode(format!("token response: {e}")))?;
        if token.access_token.trim().is_empty() {
            return Err(Error::Decode("token response has empty access_token".to_string()));
        }
        Ok(token.access_token)
    }
}
