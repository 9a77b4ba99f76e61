//! HTTP client for the recipe backend's shopping list endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use super::error::ApiError;
use super::{LineItemUpdate, ShoppingListService};
use crate::models::{RecordId, ShoppingListRecord};

/// Request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Responses from the backend wrap their payload in `{ "data": ... }`.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    data: Option<T>,
}

/// Shopping list service backed by the REST API.
#[derive(Debug, Clone)]
pub struct HttpShoppingListService {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpShoppingListService {
    /// Creates a client with the default timeout.
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self, ApiError> {
        Self::with_timeout(base_url, token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Http(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into(),
            token: token.filter(|t| !t.is_empty()),
            client,
        })
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds a URL for a path below the API root.
    fn build_url(&self, path: &str) -> String {
        let base_url = if !self.base_url.starts_with("http://")
            && !self.base_url.starts_with("https://")
        {
            format!("http://{}", self.base_url)
        } else {
            self.base_url.clone()
        };

        format!("{}{}", base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        self.authorize(request)
            .send()
            .await
            .map_err(|e| ApiError::Http(e.to_string()))
    }
}

/// Maps non-success responses to errors.
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status == StatusCode::UNAUTHORIZED {
        tracing::warn!("Backend rejected the access token");
        return Err(ApiError::Unauthorized);
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response)
}

#[async_trait]
impl ShoppingListService for HttpShoppingListService {
    async fn fetch_records(&self) -> Result<Vec<ShoppingListRecord>, ApiError> {
        let url = self.build_url("/shopping-list/me");
        let response = check_status(self.send(self.client.get(&url)).await?).await?;

        let envelope: Envelope<Vec<ShoppingListRecord>> = response
            .json()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))?;

        let records = envelope.data.unwrap_or_default();
        tracing::debug!("Fetched {} shopping list record(s)", records.len());
        Ok(records)
    }

    async fn update_item(&self, update: &LineItemUpdate) -> Result<(), ApiError> {
        let url = self.build_url("/shopping-items");
        check_status(self.send(self.client.patch(&url).json(update)).await?).await?;
        Ok(())
    }

    async fn delete_record(&self, id: RecordId) -> Result<(), ApiError> {
        let url = self.build_url(&format!("/shopping-list/{}", id));
        let response = self.send(self.client.delete(&url)).await?;

        if response.status() == StatusCode::NOT_FOUND {
            tracing::debug!("Record {} already deleted", id);
            return Ok(());
        }
        check_status(response).await?;
        Ok(())
    }
}
