//! Embedding generation on top of an [`EmbeddingClient`]
//!
//! Author: hephaex@gmail.com

use crate::embedding::EmbeddingClient;
use semsearch_core::{EmbeddingVector, PipelineError, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Text used by the availability probe
const PROBE_TEXT: &str = "test";

/// Produces embeddings for single texts and batches
#[derive(Clone)]
pub struct EmbeddingGenerator {
    client: Arc<dyn EmbeddingClient>,
}

impl EmbeddingGenerator {
    /// Create a generator over an embedding backend
    pub fn new(client: Arc<dyn EmbeddingClient>) -> Self {
        Self { client }
    }

    /// Dimension of the vectors the backend produces
    pub fn dimension(&self) -> usize {
        self.client.dimension()
    }

    /// Generate the embedding for one text
    ///
    /// Returns an empty vector when the backend yields no embedding for the input.
    pub async fn generate_embedding(&self, text: &str) -> Result<EmbeddingVector> {
        let embeddings = self
            .client
            .embed_batch(&[text.to_string()])
            .await
            .map_err(|source| PipelineError::EmbeddingGeneration {
                text: text.to_string(),
                source,
            })?;

        Ok(embeddings.into_iter().next().unwrap_or_default())
    }

    /// Generate embeddings for many texts in one request, keyed by input text
    ///
    /// Results pair with inputs by position. Inputs beyond the returned results
    /// are left out of the map, and a repeated text keeps the vector of its
    /// last occurrence.
    pub async fn generate_embeddings_batch<I, S>(
        &self,
        texts: I,
    ) -> Result<HashMap<String, EmbeddingVector>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let texts: Vec<String> = texts.into_iter().map(Into::into).collect();
        let embeddings = self
            .client
            .embed_batch(&texts)
            .await
            .map_err(|source| PipelineError::BatchEmbedding { source })?;

        if embeddings.len() < texts.len() {
            tracing::warn!(
                requested = texts.len(),
                returned = embeddings.len(),
                "Embedding batch came back short, trailing inputs dropped"
            );
        }

        Ok(texts.into_iter().zip(embeddings).collect())
    }

    /// Best-effort liveness probe: true iff a throwaway request returns a result
    pub async fn check_availability(&self) -> bool {
        match self.client.embed_batch(&[PROBE_TEXT.to_string()]).await {
            Ok(embeddings) => !embeddings.is_empty(),
            Err(e) => {
                tracing::warn!("Embedding model unavailable: {}", e);
                false
            }
        }
    }
}
