use http::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::instrument;

use crate::api::handler::MessageResponse;
use crate::constants::MATCHES_ROUTE;
use crate::db::models::{Match, MatchPayload};

/// Thin client for the match API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn matches_url(&self) -> String {
        format!("{}{MATCHES_ROUTE}", self.base_url)
    }

    fn match_url(&self, id: i64) -> String {
        format!("{}{MATCHES_ROUTE}/{id}", self.base_url)
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> ClientResult<Vec<Match>> {
        let res = self.client.get(self.matches_url()).send().await?;
        read(res).await
    }

    #[instrument(skip(self, payload))]
    pub async fn create(&self, payload: &MatchPayload) -> ClientResult<Match> {
        let res = self
            .client
            .post(self.matches_url())
            .json(payload)
            .send()
            .await?;
        read(res).await
    }

    #[instrument(skip(self, payload))]
    pub async fn update(&self, id: i64, payload: &MatchPayload) -> ClientResult<Match> {
        let res = self
            .client
            .put(self.match_url(id))
            .json(payload)
            .send()
            .await?;
        read(res).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> ClientResult<String> {
        let res = self.client.delete(self.match_url(id)).send().await?;
        Ok(read::<MessageResponse>(res).await?.message)
    }
}

/// Decodes a success body, or turns the server's `{ "error": ... }` into [`ClientError::Api`].
async fn read<T>(res: reqwest::Response) -> ClientResult<T>
where
    T: DeserializeOwned,
{
    #[derive(Deserialize)]
    struct ErrorBody {
        error: String,
    }

    let status = res.status();
    if status.is_success() {
        return Ok(res.json::<T>().await?);
    }

    let text = res.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.error)
        .unwrap_or(text);

    tracing::debug!(code = %status, reason = %message, "api request failed");
    Err(ClientError::Api { status, message })
}

pub type ClientResult<T> = core::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),

    #[error("{message} ({status})")]
    Api { status: StatusCode, message: String },
}
