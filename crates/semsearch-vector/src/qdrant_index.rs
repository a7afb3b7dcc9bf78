//! Qdrant implementation of the vector index
//!
//! Provides connection management and collection/point operations.
//! Qdrant only accepts unsigned integers and UUIDs as point ids. Ids already
//! in canonical form are used as-is; any other document id is mapped to a
//! stable UUIDv5 and the original id travels in the payload under
//! [`EXTERNAL_ID_KEY`], which caller metadata may not use.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use qdrant_client::qdrant::{
    self, point_id::PointIdOptions, value::Kind, CreateCollectionBuilder, Distance, PointId,
    PointStruct, SearchPointsBuilder, UpsertPointsBuilder, Value as QdrantValue,
    VectorParamsBuilder,
};
use qdrant_client::{Qdrant, QdrantError};
use semsearch_core::{
    BackendError, BackendResult, CollectionInfo, CollectionSpec, CollectionStatus,
    DistanceMetric, IndexPoint, Payload, QdrantConfig, SearchRequest, SearchResult,
};
use std::collections::HashMap;
use std::time::Duration;
use uuid::Uuid;

/// Reserved payload key holding the caller-supplied document id
pub const EXTERNAL_ID_KEY: &str = "_semsearch_id";

/// Qdrant vector index
pub struct QdrantIndex {
    client: Qdrant,
}

impl QdrantIndex {
    /// Create a new Qdrant connection
    pub fn new(config: &QdrantConfig) -> BackendResult<Self> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(api_key) = &config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        let client = builder
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| BackendError::Index(format!("Qdrant connection failed: {e}")))?;

        Ok(Self { client })
    }

    /// Wrap an existing client
    pub fn from_client(client: Qdrant) -> Self {
        Self { client }
    }
}

/// Whether a rendered Qdrant error reports a missing collection
///
/// The server answers with gRPC `NotFound` and a "doesn't exist" message.
fn is_missing_collection(message: &str) -> bool {
    message.contains("status: NotFound") || message.contains("doesn't exist")
}

fn index_error(context: &str, collection: &str, err: QdrantError) -> BackendError {
    let message = err.to_string();
    if is_missing_collection(&message) {
        BackendError::CollectionNotFound(collection.to_string())
    } else {
        BackendError::Index(format!("{context}: {message}"))
    }
}

/// Map a document id onto a Qdrant point id
///
/// Only the canonical rendering of a number or UUID is used directly, so
/// distinct ids such as `42` and `042` never share a point.
fn point_id_for(id: &str) -> PointId {
    if let Ok(num) = id.parse::<u64>() {
        if num.to_string() == id {
            return PointId::from(num);
        }
    }
    if let Ok(uuid) = Uuid::parse_str(id) {
        let canonical = uuid.hyphenated().to_string();
        if canonical == id {
            return PointId::from(canonical);
        }
    }
    PointId::from(Uuid::new_v5(&Uuid::NAMESPACE_OID, id.as_bytes()).to_string())
}

fn point_id_to_string(point_id: Option<PointId>) -> Option<String> {
    match point_id?.point_id_options? {
        PointIdOptions::Num(num) => Some(num.to_string()),
        PointIdOptions::Uuid(uuid) => Some(uuid),
    }
}

fn to_qdrant_distance(metric: DistanceMetric) -> Distance {
    match metric {
        DistanceMetric::Cosine => Distance::Cosine,
        DistanceMetric::Euclidean => Distance::Euclid,
        DistanceMetric::Dot => Distance::Dot,
        DistanceMetric::Manhattan => Distance::Manhattan,
    }
}

fn from_qdrant_distance(distance: Distance) -> DistanceMetric {
    match distance {
        Distance::Euclid => DistanceMetric::Euclidean,
        Distance::Dot => DistanceMetric::Dot,
        Distance::Manhattan => DistanceMetric::Manhattan,
        _ => DistanceMetric::Cosine,
    }
}

fn payload_to_qdrant(
    id: String,
    payload: Payload,
) -> BackendResult<HashMap<String, QdrantValue>> {
    if payload.contains_key(EXTERNAL_ID_KEY) {
        return Err(BackendError::Index(format!(
            "Payload of document {id} uses reserved key `{EXTERNAL_ID_KEY}`"
        )));
    }

    let mut result: HashMap<String, QdrantValue> = payload
        .into_iter()
        .filter(|(_, v)| !v.is_null())
        .map(|(k, v)| (k, v.into()))
        .collect();
    result.insert(EXTERNAL_ID_KEY.to_string(), QdrantValue::from(id));
    Ok(result)
}

fn qdrant_value_to_json(val: QdrantValue) -> Option<serde_json::Value> {
    match val.kind? {
        Kind::NullValue(_) => Some(serde_json::Value::Null),
        Kind::BoolValue(b) => Some(serde_json::Value::Bool(b)),
        Kind::IntegerValue(i) => Some(serde_json::Value::from(i)),
        Kind::DoubleValue(f) => serde_json::Number::from_f64(f).map(serde_json::Value::Number),
        Kind::StringValue(s) => Some(serde_json::Value::String(s)),
        Kind::ListValue(list) => Some(serde_json::Value::Array(
            list.values
                .into_iter()
                .filter_map(qdrant_value_to_json)
                .collect(),
        )),
        Kind::StructValue(st) => Some(serde_json::Value::Object(
            st.fields
                .into_iter()
                .filter_map(|(k, v)| qdrant_value_to_json(v).map(|v| (k, v)))
                .collect(),
        )),
    }
}

/// Convert a scored point, recovering the caller id from the payload
fn to_search_result(point: qdrant::ScoredPoint) -> SearchResult {
    let mut payload: Payload = point
        .payload
        .into_iter()
        .filter_map(|(k, v)| qdrant_value_to_json(v).map(|v| (k, v)))
        .collect();

    let id = match payload.remove(EXTERNAL_ID_KEY) {
        Some(serde_json::Value::String(id)) => id,
        _ => point_id_to_string(point.id).unwrap_or_default(),
    };

    SearchResult {
        id,
        score: point.score,
        payload,
    }
}

fn to_collection_status(status: qdrant::CollectionStatus) -> CollectionStatus {
    match status {
        qdrant::CollectionStatus::Green => CollectionStatus::Green,
        qdrant::CollectionStatus::Yellow => CollectionStatus::Yellow,
        qdrant::CollectionStatus::Red => CollectionStatus::Red,
        _ => CollectionStatus::Grey,
    }
}

fn vector_params(config: &Option<qdrant::CollectionConfig>) -> Option<(u64, DistanceMetric)> {
    let vectors_config = config.as_ref()?.params.as_ref()?.vectors_config.as_ref()?;
    match vectors_config.config.as_ref()? {
        qdrant::vectors_config::Config::Params(p) => {
            Some((p.size, from_qdrant_distance(p.distance())))
        }
        qdrant::vectors_config::Config::ParamsMap(map) => map
            .map
            .values()
            .next()
            .map(|p| (p.size, from_qdrant_distance(p.distance()))),
    }
}

#[async_trait]
impl super::VectorIndex for QdrantIndex {
    async fn list_collections(&self) -> BackendResult<Vec<String>> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| BackendError::Index(format!("Failed to list collections: {e}")))?;

        Ok(collections
            .collections
            .into_iter()
            .map(|c| c.name)
            .collect())
    }

    async fn create_collection(&self, spec: &CollectionSpec) -> BackendResult<()> {
        self.client
            .create_collection(
                CreateCollectionBuilder::new(&spec.name).vectors_config(VectorParamsBuilder::new(
                    spec.dimension,
                    to_qdrant_distance(spec.distance),
                )),
            )
            .await
            .map_err(|e| BackendError::Index(format!("Failed to create collection: {e}")))?;

        Ok(())
    }

    async fn upsert_points(&self, collection: &str, points: Vec<IndexPoint>) -> BackendResult<()> {
        let points = points
            .into_iter()
            .map(|p| {
                let id = point_id_for(&p.id);
                let payload = payload_to_qdrant(p.id, p.payload)?;
                Ok(PointStruct::new(id, p.vector, payload))
            })
            .collect::<BackendResult<Vec<PointStruct>>>()?;

        self.client
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(|e| index_error("Failed to upsert points", collection, e))?;

        Ok(())
    }

    async fn search(
        &self,
        collection: &str,
        request: SearchRequest,
    ) -> BackendResult<Vec<SearchResult>> {
        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(collection, request.vector, request.limit)
                    .score_threshold(request.score_threshold)
                    .with_payload(true),
            )
            .await
            .map_err(|e| index_error("Vector search failed", collection, e))?;

        Ok(results.result.into_iter().map(to_search_result).collect())
    }

    async fn delete_collection(&self, collection: &str) -> BackendResult<()> {
        self.client
            .delete_collection(collection)
            .await
            .map_err(|e| index_error("Failed to delete collection", collection, e))?;

        Ok(())
    }

    async fn collection_info(&self, collection: &str) -> BackendResult<CollectionInfo> {
        let info = self
            .client
            .collection_info(collection)
            .await
            .map_err(|e| index_error("Failed to fetch collection info", collection, e))?;

        let result = info
            .result
            .ok_or_else(|| BackendError::CollectionNotFound(collection.to_string()))?;

        let (dimension, distance) = vector_params(&result.config).ok_or_else(|| {
            BackendError::Index(format!("Collection {collection} reports no vector parameters"))
        })?;

        Ok(CollectionInfo {
            name: collection.to_string(),
            status: to_collection_status(result.status()),
            points_count: result.points_count.unwrap_or(0),
            indexed_vectors_count: result.indexed_vectors_count.unwrap_or(0),
            segments_count: result.segments_count,
            dimension,
            distance,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
