//! Generation collaborator boundary.
//!
//! The hairstyle model is an external service. This crate only knows how to
//! hand it a portrait plus the two selected attributes and how to read the
//! [`LookCollection`] it answers with. Retries and backoff belong to the
//! service.
//!
//! [`HttpStyleGenerator`] POSTs a multipart form:
//!
//! | Field | Content |
//! |---|---|
//! | `image` | portrait bytes, with the upload's filename and media type |
//! | `face_shape` | e.g. `oval` |
//! | `hair_length` | e.g. `medium` |
//!
//! and expects `{"naturalLooks": [...], "glamorousLooks": [...]}` back.

use crate::config::{FetchConfig, GenerationConfig};
use crate::intake::GenerationRequest;
use crate::types::{CollectionError, LookCollection};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("no generation endpoint configured (set [generation] endpoint)")]
    NotConfigured,
    #[error("generation request failed: {0}")]
    Request(String),
    #[error("generation service returned HTTP {0}")]
    Status(u16),
    #[error("generation service returned an invalid collection: {0}")]
    InvalidResponse(#[from] CollectionError),
}

#[async_trait]
pub trait StyleGenerator: Send + Sync {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<LookCollection, GenerationError>;
}

pub struct HttpStyleGenerator {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpStyleGenerator {
    pub fn new(config: &GenerationConfig, fetch: &FetchConfig) -> Result<Self, GenerationError> {
        if config.endpoint.trim().is_empty() {
            return Err(GenerationError::NotConfigured);
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(fetch.timeout_secs))
            .user_agent(fetch.user_agent.clone())
            .build()
            .map_err(|e| GenerationError::Request(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim().to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl StyleGenerator for HttpStyleGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<LookCollection, GenerationError> {
        let image = Part::bytes(request.image.to_vec())
            .file_name(request.name.clone())
            .mime_str(&request.media_type)
            .map_err(|e| GenerationError::Request(e.to_string()))?;
        let form = Form::new()
            .part("image", image)
            .text("face_shape", request.face_shape.as_str())
            .text("hair_length", request.hair_length.as_str());

        info!(
            endpoint = %self.endpoint,
            face_shape = %request.face_shape,
            hair_length = %request.hair_length,
            "requesting hairstyle generation"
        );
        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "generation service rejected request");
            return Err(GenerationError::Status(status.as_u16()));
        }
        let body = response
            .text()
            .await
            .map_err(|e| GenerationError::Request(e.to_string()))?;
        let collection = LookCollection::from_json(&body)?;
        info!(
            natural = collection.natural_looks().len(),
            glamorous = collection.glamorous_looks().len(),
            "generation complete"
        );
        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_endpoint_is_not_configured() {
        let result = HttpStyleGenerator::new(&GenerationConfig::default(), &FetchConfig::default());
        assert!(matches!(result, Err(GenerationError::NotConfigured)));
    }

    #[test]
    fn endpoint_is_trimmed() {
        let config = GenerationConfig {
            endpoint: "  http://localhost:9000/generate \n".into(),
        };
        let generator = HttpStyleGenerator::new(&config, &FetchConfig::default()).unwrap();
        assert_eq!(generator.endpoint(), "http://localhost:9000/generate");
    }
}
