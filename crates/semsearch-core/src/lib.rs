//! semsearch Core - Domain models, errors and shared types
//!
//! This crate defines the abstractions shared by the search pipeline:
//! - Document and metadata models
//! - Collection shape and introspection types
//! - Search request/result types
//! - The error taxonomy of the embedding and retrieval operations
//! - Configuration management

pub mod config;

pub use config::{
    AppConfig, ConfigError, EmbeddingConfig, EmbeddingProvider, LoggingConfig, QdrantConfig,
    SearchConfig,
};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use thiserror::Error;

// ============================================================================
// Constants
// ============================================================================

/// Name of the collection holding product documents
pub const PRODUCTS_COLLECTION: &str = "products";

/// Output dimension of `nomic-embed-text`, the deployed embedding model
pub const PRODUCT_VECTOR_DIMENSION: u64 = 768;

/// Payload key holding the original document text
pub const PRODUCT_TEXT_KEY: &str = "product_text";

/// Payload key holding the ingestion timestamp
pub const INDEXED_AT_KEY: &str = "indexed_at";

// ============================================================================
// Error Types
// ============================================================================

/// Failures raised by the remote collaborators (embedding model, vector index)
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Embedding backend error: {0}")]
    Embedding(String),

    #[error("Vector index error: {0}")]
    Index(String),

    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Errors surfaced by the pipeline operations
///
/// Every operation wraps the failure of its remote calls exactly once, attaching
/// the identifiers that were being processed.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Failed to generate embeddings for text: {text}")]
    EmbeddingGeneration {
        text: String,
        #[source]
        source: BackendError,
    },

    #[error("Failed to generate batch embeddings")]
    BatchEmbedding {
        #[source]
        source: BackendError,
    },

    #[error("Failed to initialize collection: {collection}")]
    CollectionInit {
        collection: String,
        #[source]
        source: BackendError,
    },

    #[error("Failed to add document {id} to vector database")]
    DocumentIngest {
        id: String,
        #[source]
        source: Box<PipelineError>,
    },

    #[error("Failed to search with query: {query}")]
    Search {
        query: String,
        #[source]
        source: Box<PipelineError>,
    },

    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl PipelineError {
    /// Name of the operation that raised the error
    pub fn operation(&self) -> &'static str {
        match self {
            Self::EmbeddingGeneration { .. } => "generate_embedding",
            Self::BatchEmbedding { .. } => "generate_embeddings_batch",
            Self::CollectionInit { .. } => "initialize_collection",
            Self::DocumentIngest { .. } => "add_document",
            Self::Search { .. } => "search_similar",
            Self::Backend(_) => "backend",
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

// ============================================================================
// Document Models
// ============================================================================

/// Dense vector produced by the embedding model
///
/// An empty vector means the model returned no embedding for the input.
pub type EmbeddingVector = Vec<f32>;

/// A single metadata value attached to a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Timestamp(DateTime<Utc>),
    String(String),
}

impl std::str::FromStr for MetadataValue {
    type Err = Infallible;

    /// Parse leniently: bool, integer, float, RFC 3339 timestamp, then plain string
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        if let Ok(b) = s.parse::<bool>() {
            return Ok(Self::Bool(b));
        }
        if let Ok(i) = s.parse::<i64>() {
            return Ok(Self::Integer(i));
        }
        if let Ok(f) = s.parse::<f64>() {
            if f.is_finite() {
                return Ok(Self::Float(f));
            }
        }
        if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
            return Ok(Self::Timestamp(ts.with_timezone(&Utc)));
        }
        Ok(Self::String(s.to_string()))
    }
}

impl From<MetadataValue> for serde_json::Value {
    fn from(value: MetadataValue) -> Self {
        match value {
            MetadataValue::Bool(b) => serde_json::Value::Bool(b),
            MetadataValue::Integer(i) => serde_json::Value::from(i),
            MetadataValue::Float(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            MetadataValue::Timestamp(ts) => {
                serde_json::Value::String(ts.to_rfc3339_opts(SecondsFormat::Micros, true))
            }
            MetadataValue::String(s) => serde_json::Value::String(s),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for MetadataValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for MetadataValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<DateTime<Utc>> for MetadataValue {
    fn from(ts: DateTime<Utc>) -> Self {
        Self::Timestamp(ts)
    }
}

/// Caller-supplied metadata for a document
pub type Metadata = HashMap<String, MetadataValue>;

/// Payload stored alongside a vector in the index
pub type Payload = HashMap<String, serde_json::Value>;

/// A product document to be indexed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Caller-supplied unique identifier
    pub id: String,

    /// Text body that gets embedded
    pub text: String,

    /// Additional metadata
    #[serde(default)]
    pub metadata: Metadata,
}

impl Document {
    /// Create a new document without metadata
    pub fn new(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata: Metadata::new(),
        }
    }

    /// Add a metadata value
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<MetadataValue>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Build the stored payload
    ///
    /// `product_text` and `indexed_at` always overwrite caller values of the same name.
    pub fn into_payload(self, indexed_at: DateTime<Utc>) -> Payload {
        let mut payload: Payload = self
            .metadata
            .into_iter()
            .map(|(k, v)| (k, v.into()))
            .collect();
        payload.insert(
            PRODUCT_TEXT_KEY.to_string(),
            serde_json::Value::String(self.text),
        );
        payload.insert(
            INDEXED_AT_KEY.to_string(),
            serde_json::Value::String(indexed_at.to_rfc3339_opts(SecondsFormat::Micros, true)),
        );
        payload
    }
}

// ============================================================================
// Collection Models
// ============================================================================

/// Distance metric for similarity calculations
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    #[default]
    Cosine,
    Euclidean,
    Dot,
    Manhattan,
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cosine => write!(f, "cosine"),
            Self::Euclidean => write!(f, "euclidean"),
            Self::Dot => write!(f, "dot"),
            Self::Manhattan => write!(f, "manhattan"),
        }
    }
}

/// Shape of a collection, fixed at creation time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionSpec {
    pub name: String,
    pub dimension: u64,
    pub distance: DistanceMetric,
}

impl CollectionSpec {
    pub fn new(name: impl Into<String>, dimension: u64, distance: DistanceMetric) -> Self {
        Self {
            name: name.into(),
            dimension,
            distance,
        }
    }

    /// The product collection: 768 dimensions, cosine distance
    pub fn products() -> Self {
        Self::new(
            PRODUCTS_COLLECTION,
            PRODUCT_VECTOR_DIMENSION,
            DistanceMetric::Cosine,
        )
    }
}

/// Optimizer status reported by the index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollectionStatus {
    Green,
    Yellow,
    Red,
    Grey,
}

/// Collection introspection result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub name: String,
    pub status: CollectionStatus,
    pub points_count: u64,
    pub indexed_vectors_count: u64,
    pub segments_count: u64,
    pub dimension: u64,
    pub distance: DistanceMetric,
}

// ============================================================================
// Index and Search Types
// ============================================================================

/// A vector with payload, addressed by identifier
#[derive(Debug, Clone, PartialEq)]
pub struct IndexPoint {
    pub id: String,
    pub vector: EmbeddingVector,
    pub payload: Payload,
}

/// Nearest-neighbour request sent to the index
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub vector: EmbeddingVector,
    pub limit: u64,
    pub score_threshold: f32,
}

/// Search parameters for a similarity query
///
/// Values are passed through to the index unchecked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Maximum number of results
    pub limit: u64,

    /// Minimum similarity score
    pub score_threshold: f32,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            limit: 5,
            score_threshold: 0.7,
        }
    }
}

impl SearchParams {
    /// Set the result limit
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Set the minimum score
    pub fn with_score_threshold(mut self, threshold: f32) -> Self {
        self.score_threshold = threshold;
        self
    }
}

/// A scored hit returned by a similarity query
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Document identifier
    pub id: String,

    /// Similarity score (higher is better)
    pub score: f32,

    /// Stored payload
    pub payload: Payload,
}

impl SearchResult {
    /// Text of the matched product, if stored
    pub fn product_text(&self) -> Option<&str> {
        self.payload.get(PRODUCT_TEXT_KEY).and_then(|v| v.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================
