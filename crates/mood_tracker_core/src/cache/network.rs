//! Live network access.

use super::http::{Request, Response};
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// No response could be obtained at all. HTTP error statuses are responses,
/// not network errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetworkError {
    Offline,
    InvalidRequest(String),
    Transport(String),
}

impl Display for NetworkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Offline => write!(f, "network unavailable"),
            Self::InvalidRequest(message) => write!(f, "invalid request: {message}"),
            Self::Transport(message) => write!(f, "transport error: {message}"),
        }
    }
}

impl Error for NetworkError {}

#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError>;
}

/// `reqwest`-backed network. No timeouts are set here; callers wanting one
/// configure it on the client passed to [`HttpNetwork::with_client`].
pub struct HttpNetwork {
    client: reqwest::Client,
}

impl HttpNetwork {
    pub fn new() -> Result<Self, NetworkError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|err| NetworkError::Transport(err.to_string()))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .map_err(|err| NetworkError::InvalidRequest(err.to_string()))?;
        let mut builder = self.client.request(method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(|err| {
            if err.is_builder() {
                NetworkError::InvalidRequest(err.to_string())
            } else if err.is_connect() {
                NetworkError::Offline
            } else {
                NetworkError::Transport(err.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|err| NetworkError::Transport(err.to_string()))?
            .to_vec();

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}
