//! Thin typed client over the manufacturing backend's REST API.
//!
//! Successful responses are wrapped as `{"data": ..., "message": ...}`;
//! failures as `{"error": ..., "details": ...}`.

mod auth;
mod plans;
mod resources;

use std::sync::Arc;

use reqwest::{IntoUrl, Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::ApiConfig;
use crate::errors::{AppError, AppResult};
use crate::session::SessionStore;
use crate::utils::join_url;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

/// Acknowledgement returned by mutating endpoints that carry no data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MessageResponse {
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<SessionStore>,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, session: Arc<SessionStore>) -> AppResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn url(&self, endpoint: &str) -> String {
        join_url(&self.base_url, endpoint)
    }

    /// `endpoint` with `segment` appended as one escaped path segment.
    pub(crate) fn segment_url(&self, endpoint: &str, segment: &str) -> AppResult<Url> {
        let mut url = Url::parse(&self.url(endpoint))
            .map_err(|err| AppError::configuration(format!("invalid API URL: {}", err)))?;
        url.path_segments_mut()
            .map_err(|_| AppError::configuration("API base URL cannot take path segments"))?
            .push(segment);
        Ok(url)
    }

    /// Build a request; authenticated requests fail fast without a token.
    fn request(&self, method: Method, endpoint: &str, auth: bool) -> AppResult<RequestBuilder> {
        self.request_to(method, self.url(endpoint), auth)
    }

    fn request_to(&self, method: Method, url: impl IntoUrl, auth: bool) -> AppResult<RequestBuilder> {
        let builder = self.http.request(method, url);
        if !auth {
            return Ok(builder);
        }

        let token = self.session.require_token()?;
        Ok(builder.bearer_auth(token))
    }

    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> AppResult<Envelope<T>> {
        let response = builder.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            return Err(error_from_body(status, &bytes));
        }

        let deserializer = &mut serde_json::Deserializer::from_slice(&bytes);
        serde_path_to_error::deserialize(deserializer).map_err(|err| {
            AppError::decode(format!("{} at `{}`", err.inner(), err.path()))
        })
    }

    async fn data<T: DeserializeOwned>(&self, builder: RequestBuilder) -> AppResult<T> {
        self.execute::<T>(builder)
            .await?
            .data
            .ok_or_else(|| AppError::decode("response has no `data` field"))
    }

    async fn acknowledge(&self, builder: RequestBuilder) -> AppResult<MessageResponse> {
        let envelope = self.execute::<serde::de::IgnoredAny>(builder).await?;
        Ok(MessageResponse {
            message: envelope.message,
        })
    }

    pub(crate) async fn get_data<T: DeserializeOwned>(&self, endpoint: &str) -> AppResult<T> {
        let builder = self.request(Method::GET, endpoint, true)?;
        self.data(builder).await
    }

    pub(crate) async fn get_data_at<T: DeserializeOwned>(&self, url: Url) -> AppResult<T> {
        let builder = self.request_to(Method::GET, url, true)?;
        self.data(builder).await
    }

    pub(crate) async fn get_data_with_query<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> AppResult<T> {
        let builder = self.request(Method::GET, endpoint, true)?.query(query);
        self.data(builder).await
    }

    pub(crate) async fn send_data<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        body: &B,
    ) -> AppResult<T> {
        let builder = self.request(method, endpoint, true)?.json(body);
        self.data(builder).await
    }

    pub(crate) async fn send_ack<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> AppResult<MessageResponse> {
        let mut builder = self.request(method, endpoint, true)?;
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.acknowledge(builder).await
    }

    pub(crate) async fn delete(&self, endpoint: &str) -> AppResult<MessageResponse> {
        self.send_ack::<()>(Method::DELETE, endpoint, None).await
    }
}

fn error_from_body(status: StatusCode, bytes: &[u8]) -> AppError {
    let body: ErrorBody = serde_json::from_slice(bytes).unwrap_or_default();
    let message = match (body.error, body.details) {
        (Some(error), Some(details)) => format!("{}: {}", error, details),
        (Some(error), None) => error,
        (None, _) => "Request failed".to_string(),
    };

    tracing::debug!(status = status.as_u16(), message = %message, "backend request failed");

    match status {
        StatusCode::UNAUTHORIZED => AppError::unauthenticated(message),
        StatusCode::FORBIDDEN => AppError::forbidden_role(message),
        StatusCode::NOT_FOUND => AppError::not_found(message),
        _ => AppError::backend(status.as_u16(), message),
    }
}
