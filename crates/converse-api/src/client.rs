use crate::backend::Backend;
use async_trait::async_trait;
use converse_core::{ApiError, Character};
use std::time::Duration;
use url::Url;

/// HTTP client for the aiverse character service.
pub struct CharacterClient {
    http: reqwest::Client,
    base_url: Url,
}

impl CharacterClient {
    /// `base_url` is the service origin, e.g. `https://aiverse.exam24.xyz`.
    /// With no timeout a request waits as long as the server does; nothing
    /// is retried either way.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url).map_err(|e| ApiError::InvalidBaseUrl(e.to_string()))?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;

        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::InvalidBaseUrl(e.to_string()))
    }

    async fn ok_or_status(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl Backend for CharacterClient {
    async fn list_characters(&self) -> Result<Vec<Character>, ApiError> {
        let url = self.endpoint("/v1/characters")?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;
        Self::ok_or_status(response)
            .await?
            .json::<Vec<Character>>()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))
    }

    async fn get_character(&self, id: i64) -> Result<Character, ApiError> {
        let url = self.endpoint(&format!("/v1/characters/{}", id))?;
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;
        Self::ok_or_status(response)
            .await?
            .json::<Character>()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))
    }

    async fn create_character(&self, character: &Character) -> Result<Character, ApiError> {
        let url = self.endpoint("/v1/characters")?;
        let response = self
            .http
            .post(url)
            .json(character)
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;
        Self::ok_or_status(response)
            .await?
            .json::<Character>()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))
    }

    async fn exchange_audio(&self, id: i64, wav: Vec<u8>) -> Result<Vec<u8>, ApiError> {
        let url = self.endpoint(&format!("/v1/character/{}/upload", id))?;

        let wav_len = wav.len();
        let part = reqwest::multipart::Part::bytes(wav)
            .file_name("recording.wav")
            .mime_str("audio/wav")
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;
        let form = reqwest::multipart::Form::new().part("audio", part);

        tracing::debug!(character_id = id, bytes = wav_len, "uploading recording");

        let response = self
            .http
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;
        let bytes = Self::ok_or_status(response)
            .await?
            .bytes()
            .await
            .map_err(|e| ApiError::RequestFailed(e.to_string()))?;

        if bytes.is_empty() {
            return Err(ApiError::EmptyResponse);
        }

        tracing::debug!(character_id = id, bytes = bytes.len(), "received reply audio");
        Ok(bytes.to_vec())
    }
}
