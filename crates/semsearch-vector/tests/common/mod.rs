//! In-memory stand-ins for the embedding model and the vector index

#![allow(dead_code)]

use async_trait::async_trait;
use semsearch_core::{
    BackendError, BackendResult, CollectionInfo, CollectionSpec, CollectionStatus, IndexPoint,
    Payload, SearchRequest, SearchResult, PRODUCT_VECTOR_DIMENSION,
};
use semsearch_vector::{EmbeddingClient, EmbeddingGenerator, VectorIndex, VectorStoreManager};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Bag-of-words embedder: every distinct token gets its own dimension
#[derive(Default)]
pub struct VocabularyEmbedder {
    vocabulary: Mutex<HashMap<String, usize>>,
}

impl VocabularyEmbedder {
    fn embed(&self, text: &str) -> Vec<f32> {
        let dimension = PRODUCT_VECTOR_DIMENSION as usize;
        let mut vector = vec![0.0; dimension];
        let mut vocabulary = self.vocabulary.lock().unwrap();

        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let next = vocabulary.len();
            let slot = *vocabulary.entry(token.to_string()).or_insert(next);
            vector[slot % dimension] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingClient for VocabularyEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> BackendResult<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed(t)).collect())
    }

    fn dimension(&self) -> usize {
        PRODUCT_VECTOR_DIMENSION as usize
    }
}

struct StoredCollection {
    spec: CollectionSpec,
    points: HashMap<String, (Vec<f32>, Payload)>,
}

/// Cosine-similarity index held in memory
#[derive(Default)]
pub struct InMemoryIndex {
    collections: Mutex<HashMap<String, StoredCollection>>,
}

impl InMemoryIndex {
    pub fn payload(&self, collection: &str, id: &str) -> Option<Payload> {
        let collections = self.collections.lock().unwrap();
        collections
            .get(collection)?
            .points
            .get(id)
            .map(|(_, payload)| payload.clone())
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorIndex for InMemoryIndex {
    async fn list_collections(&self) -> BackendResult<Vec<String>> {
        Ok(self.collections.lock().unwrap().keys().cloned().collect())
    }

    async fn create_collection(&self, spec: &CollectionSpec) -> BackendResult<()> {
        let mut collections = self.collections.lock().unwrap();
        if collections.contains_key(&spec.name) {
            return Err(BackendError::Index(format!(
                "Collection `{}` already exists",
                spec.name
            )));
        }
        collections.insert(
            spec.name.clone(),
            StoredCollection {
                spec: spec.clone(),
                points: HashMap::new(),
            },
        );
        Ok(())
    }

    async fn upsert_points(&self, collection: &str, points: Vec<IndexPoint>) -> BackendResult<()> {
        let mut collections = self.collections.lock().unwrap();
        let stored = collections
            .get_mut(collection)
            .ok_or_else(|| BackendError::CollectionNotFound(collection.to_string()))?;

        if let Some(bad) = points
            .iter()
            .find(|p| p.vector.len() as u64 != stored.spec.dimension)
        {
            return Err(BackendError::Index(format!(
                "Vector dimension error: expected dim: {}, got {}",
                stored.spec.dimension,
                bad.vector.len()
            )));
        }

        for point in points {
            stored.points.insert(point.id, (point.vector, point.payload));
        }
        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        request: SearchRequest,
    ) -> BackendResult<Vec<SearchResult>> {
        let collections = self.collections.lock().unwrap();
        let stored = collections
            .get(collection)
            .ok_or_else(|| BackendError::CollectionNotFound(collection.to_string()))?;

        let mut results: Vec<SearchResult> = stored
            .points
            .iter()
            .map(|(id, (vector, payload))| SearchResult {
                id: id.clone(),
                score: cosine(&request.vector, vector),
                payload: payload.clone(),
            })
            .filter(|r| r.score >= request.score_threshold)
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(request.limit as usize);
        Ok(results)
    }

    async fn delete_collection(&self, collection: &str) -> BackendResult<()> {
        self.collections
            .lock()
            .unwrap()
            .remove(collection)
            .map(|_| ())
            .ok_or_else(|| BackendError::CollectionNotFound(collection.to_string()))
    }

    async fn collection_info(&self, collection: &str) -> BackendResult<CollectionInfo> {
        let collections = self.collections.lock().unwrap();
        let stored = collections
            .get(collection)
            .ok_or_else(|| BackendError::CollectionNotFound(collection.to_string()))?;

        let points = stored.points.len() as u64;
        Ok(CollectionInfo {
            name: collection.to_string(),
            status: CollectionStatus::Green,
            points_count: points,
            indexed_vectors_count: points,
            segments_count: 1,
            dimension: stored.spec.dimension,
            distance: stored.spec.distance,
        })
    }
}

/// A manager wired to fresh fakes, plus a handle on the index
pub fn fake_manager() -> (VectorStoreManager, Arc<InMemoryIndex>) {
    let index = Arc::new(InMemoryIndex::default());
    let embeddings = EmbeddingGenerator::new(Arc::new(VocabularyEmbedder::default()));
    let manager = VectorStoreManager::new(index.clone(), embeddings);
    (manager, index)
}
