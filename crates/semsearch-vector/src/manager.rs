//! Vector store manager for the product collection
//!
//! Coordinates the embedding generator with the vector index: collection
//! lifecycle, document ingestion and similarity search. There is no local
//! locking; concurrent writers race at the index.
//!
//! Author: hephaex@gmail.com

use crate::generator::EmbeddingGenerator;
use crate::VectorIndex;
use chrono::Utc;
use semsearch_core::{
    BackendResult, CollectionInfo, CollectionSpec, Document, IndexPoint, Metadata,
    PipelineError, Result, SearchParams, SearchRequest, SearchResult,
};
use std::sync::Arc;

/// Manages the product collection in the vector index
pub struct VectorStoreManager {
    index: Arc<dyn VectorIndex>,
    embeddings: EmbeddingGenerator,
    collection: CollectionSpec,
}

impl VectorStoreManager {
    /// Create a manager for the `products` collection
    pub fn new(index: Arc<dyn VectorIndex>, embeddings: EmbeddingGenerator) -> Self {
        Self {
            index,
            embeddings,
            collection: CollectionSpec::products(),
        }
    }

    /// Shape of the managed collection
    pub fn collection(&self) -> &CollectionSpec {
        &self.collection
    }

    /// Embedding generator used for documents and queries
    pub fn embeddings(&self) -> &EmbeddingGenerator {
        &self.embeddings
    }

    /// Create the collection if it does not exist yet
    #[tracing::instrument(skip(self), fields(collection = %self.collection.name))]
    pub async fn initialize_collection(&self) -> Result<()> {
        let init_error = |source| PipelineError::CollectionInit {
            collection: self.collection.name.clone(),
            source,
        };

        let collections = self.index.list_collections().await.map_err(init_error)?;
        if collections.iter().any(|name| *name == self.collection.name) {
            tracing::debug!("Collection already exists");
            return Ok(());
        }

        self.index
            .create_collection(&self.collection)
            .await
            .map_err(init_error)?;

        tracing::info!(
            dimension = self.collection.dimension,
            distance = %self.collection.distance,
            "Created collection"
        );
        Ok(())
    }

    /// Embed a document and upsert it under its id
    ///
    /// Re-adding an id replaces both its vector and payload.
    #[tracing::instrument(skip(self, text, metadata))]
    pub async fn add_document(
        &self,
        id: &str,
        text: &str,
        metadata: Option<Metadata>,
    ) -> Result<()> {
        let document = Document {
            id: id.to_string(),
            text: text.to_string(),
            metadata: metadata.unwrap_or_default(),
        };
        self.upsert_document(document)
            .await
            .map_err(|source| PipelineError::DocumentIngest {
                id: id.to_string(),
                source: Box::new(source),
            })
    }

    async fn upsert_document(&self, document: Document) -> Result<()> {
        let vector = self.embeddings.generate_embedding(&document.text).await?;
        let id = document.id.clone();
        let point = IndexPoint {
            id,
            vector,
            payload: document.into_payload(Utc::now()),
        };

        self.index
            .upsert_points(&self.collection.name, vec![point])
            .await?;

        tracing::debug!("Document upserted");
        Ok(())
    }

    /// Find documents similar to `query`, best match first
    #[tracing::instrument(
        skip(self, params),
        fields(limit = params.limit, score_threshold = params.score_threshold)
    )]
    pub async fn search_similar(
        &self,
        query: &str,
        params: SearchParams,
    ) -> Result<Vec<SearchResult>> {
        self.search_with_embedding(query, params)
            .await
            .map_err(|source| PipelineError::Search {
                query: query.to_string(),
                source: Box::new(source),
            })
    }

    async fn search_with_embedding(
        &self,
        query: &str,
        params: SearchParams,
    ) -> Result<Vec<SearchResult>> {
        let vector = self.embeddings.generate_embedding(query).await?;
        let request = SearchRequest {
            vector,
            limit: params.limit,
            score_threshold: params.score_threshold,
        };

        let results = self.index.search(&self.collection.name, request).await?;
        tracing::debug!("Search returned {} results", results.len());
        Ok(results)
    }

    /// Collection metadata, straight from the index
    pub async fn get_collection_info(&self) -> BackendResult<CollectionInfo> {
        self.index.collection_info(&self.collection.name).await
    }

    /// Drop the collection and recreate it empty
    ///
    /// Operations issued between the delete and the recreate see a missing collection.
    #[tracing::instrument(skip(self), fields(collection = %self.collection.name))]
    pub async fn clear_collection(&self) -> Result<()> {
        self.index.delete_collection(&self.collection.name).await?;
        tracing::info!("Collection deleted, recreating");
        self.initialize_collection().await
    }
}
