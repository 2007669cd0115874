use std::time::Duration;

use bytes::Bytes;
use prost::Message;
use tracing::debug;
use tsb_core::{errors::Error, Result};

use crate::framing::{decode_frame, encode_frame, FrameMode};

pub const CONTENT_TYPE: &str = "application/grpc-web+proto";

/// Unary gRPC-Web calls over a pooled HTTP client.
///
/// Dropping the client releases the connection pool.
#[derive(Clone, Debug)]
pub struct GrpcWebClient {
    http: reqwest::Client,
    base_url: String,
    service: String,
    token: String,
    frame_mode: FrameMode,
}

impl GrpcWebClient {
    pub fn new(
        base_url: impl Into<String>,
        service: impl Into<String>,
        token: impl Into<String>,
        timeout: Duration,
        frame_mode: FrameMode,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::External(format!("http client build error: {e}")))?;
        Ok(Self::with_http(http, base_url, service, token, frame_mode))
    }

    pub fn with_http(
        http: reqwest::Client,
        base_url: impl Into<String>,
        service: impl Into<String>,
        token: impl Into<String>,
        frame_mode: FrameMode,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service: service.into(),
            token: token.into(),
            frame_mode,
        }
    }

    pub fn method_url(&self, method: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.service, method)
    }

    /// POST one framed request and return the payload of the response's data frame.
    ///
    /// Any non-2xx status becomes `Error::Transport`. No retries.
    pub async fn call(&self, method: &str, request: &[u8]) -> Result<Bytes> {
        let resp = self
            .http
            .post(self.method_url(method))
            .bearer_auth(&self.token)
            .header(reqwest::header::CONTENT_TYPE, CONTENT_TYPE)
            .header("X-Grpc-Web", "1")
            .body(encode_frame(request))
            .send()
            .await
            .map_err(|e| request_error(method, e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::transport(
                status.as_u16(),
                body.chars().take(500).collect::<String>(),
            ));
        }

        let body = resp.bytes().await.map_err(|e| request_error(method, e))?;
        debug!(method, bytes = body.len(), "grpc-web response");
        decode_frame(&body, self.frame_mode)
    }

    /// Encode `request`, call `method`, decode the reply as `Resp`.
    pub async fn unary<Req, Resp>(&self, method: &str, request: &Req) -> Result<Resp>
    where
        Req: Message,
        Resp: Message + Default,
    {
        let payload = self.call(method, &request.encode_to_vec()).await?;
        Resp::decode(payload)
            .map_err(|e| Error::Decode(format!("{method}: invalid protobuf response: {e}")))
    }
}

pub(crate) fn request_error(what: &str, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::External(format!("{what}: request timed out"))
    } else {
        Error::External(format!("{what}: request error: {e}"))
    }
}
