//! HTTP transport: REST polling plus an optional WebSocket push channel.

use super::{EventStream, Transport, TransportError};
use async_trait::async_trait;
use futures_util::StreamExt;
use serde::de::DeserializeOwned;
use std::time::Duration;
use sync_types::{
    ApiErrorBody, ApiResponse, ChangeEvent, Collection, Mutation, PendingOp, Record, Snapshot,
    SyncRequest,
};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::protocol::Message as WsMessage;

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP implementation of [`Transport`].
///
/// Talks to the REST surface (`/api/<collection>`, `/api/sync`, `/health`)
/// and detects the WebSocket push channel at `/api/events`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    http: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport against the given server base URL.
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Create a transport with an explicit per-request timeout.
    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// The `ws://` URL of the push channel.
    fn events_url(&self) -> String {
        let ws_base = if let Some(rest) = self.base_url.strip_prefix("https://") {
            format!("wss://{}", rest)
        } else if let Some(rest) = self.base_url.strip_prefix("http://") {
            format!("ws://{}", rest)
        } else {
            format!("ws://{}", self.base_url)
        };
        format!("{}/api/events", ws_base)
    }

    /// Unwrap a `{success, data}` envelope, mapping failures to the error
    /// taxonomy.
    async fn envelope<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, TransportError> {
        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ApiErrorBody>().await {
                Ok(body) => body.error,
                Err(_) => status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string(),
            };
            return Err(TransportError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| TransportError::InvalidBody(e.to_string()))?;
        Ok(envelope.data)
    }

    fn request_error(error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout
        } else {
            TransportError::Network(error.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn probe(&self) -> Result<(), TransportError> {
        let response = self
            .http
            .get(self.url("/health"))
            .send()
            .await
            .map_err(Self::request_error)?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(TransportError::Api {
                status: status.as_u16(),
                message: "health check failed".to_string(),
            })
        }
    }

    async fn fetch(&self, collection: Collection) -> Result<Vec<Record>, TransportError> {
        let response = self
            .http
            .get(self.url(&format!("/api/{}", collection)))
            .send()
            .await
            .map_err(Self::request_error)?;

        let bodies: Vec<serde_json::Value> = Self::envelope(response).await?;
        bodies
            .into_iter()
            .map(|body| {
                Record::from_value(collection, body)
                    .map_err(|e| TransportError::InvalidBody(e.to_string()))
            })
            .collect()
    }

    async fn deliver(&self, op: &PendingOp) -> Result<(), TransportError> {
        let response = match &op.mutation {
            Mutation::Create { record } => {
                let body = record
                    .wire_value()
                    .map_err(|e| TransportError::InvalidBody(e.to_string()))?;
                self.http
                    .post(self.url(&format!("/api/{}", record.collection())))
                    .json(&body)
                    .send()
                    .await
            }
            Mutation::Update { record } => {
                let body = record
                    .wire_value()
                    .map_err(|e| TransportError::InvalidBody(e.to_string()))?;
                self.http
                    .put(self.url(&format!("/api/{}/{}", record.collection(), record.id())))
                    .json(&body)
                    .send()
                    .await
            }
            Mutation::Delete { collection, id } => {
                self.http
                    .delete(self.url(&format!("/api/{}/{}", collection, id)))
                    .send()
                    .await
            }
        }
        .map_err(Self::request_error)?;

        Self::envelope::<serde_json::Value>(response).await?;
        Ok(())
    }

    async fn push_snapshot(&self, snapshot: &Snapshot) -> Result<(), TransportError> {
        let request = SyncRequest {
            data: snapshot.clone(),
        };
        let response = self
            .http
            .post(self.url("/api/sync"))
            .json(&request)
            .send()
            .await
            .map_err(Self::request_error)?;

        Self::envelope::<serde_json::Value>(response).await?;
        Ok(())
    }

    async fn subscribe(&self) -> Result<Option<EventStream>, TransportError> {
        // Capability detection: a server without the push channel just
        // leaves us polling.
        let (socket, _) = match connect_async(self.events_url()).await {
            Ok(connected) => connected,
            Err(e) => {
                tracing::debug!("push channel unavailable: {}", e);
                return Ok(None);
            }
        };

        let stream = socket
            .filter_map(|message| async move {
                match message {
                    Ok(WsMessage::Text(text)) => {
                        match serde_json::from_str::<ChangeEvent>(&text) {
                            Ok(event) => Some(event),
                            Err(e) => {
                                tracing::debug!("ignoring malformed change event: {}", e);
                                None
                            }
                        }
                    }
                    _ => None,
                }
            })
            .boxed();

        Ok(Some(stream))
    }
}
