//! The contract with the remote query and search service.
//!
//! A [`Gateway`] executes exactly one bounded call and returns the page the
//! server produced. Connection handling, authentication and retries on
//! transport faults all live behind this trait; the iterators only shape
//! requests and interpret responses.

mod filter;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use vdbclient_types::{Hit, Metric, Row};

pub use filter::Filter;

/// A bounded, exact, filtered query
#[derive(Clone, Debug, PartialEq)]
pub struct QueryRequest {
	pub collection: String,
	pub filter: Filter,
	pub output_fields: Vec<String>,
	/// The maximum number of rows to return
	pub limit: usize,
	pub offset: usize,
}

/// Search parameters forwarded to the vector index
///
/// When both bounds are set the server returns hits whose score lies between
/// `range_filter` (the nearer bound, inclusive) and `radius` (the farther
/// bound, exclusive).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub radius: Option<f32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub range_filter: Option<f32>,
	/// HNSW candidate list size
	#[serde(skip_serializing_if = "Option::is_none")]
	pub ef: Option<usize>,
	/// Any other index specific parameters, passed through untouched
	#[serde(flatten)]
	pub extra: BTreeMap<String, serde_json::Value>,
}

/// A bounded approximate nearest neighbour search for one query vector
#[derive(Clone, Debug, PartialEq)]
pub struct SearchRequest {
	pub collection: String,
	pub filter: Filter,
	pub vector: Vec<f32>,
	pub anns_field: String,
	pub metric: Metric,
	/// The maximum number of hits to return
	pub limit: usize,
	pub params: SearchParams,
	pub output_fields: Vec<String>,
}

/// Executes single query and search calls against the remote service
///
/// Implementations return at most `limit` entries per call, ordered by primary
/// key for queries and nearest first for searches. Any failure is returned as
/// an error and is passed to the caller of the iterator unchanged.
#[async_trait]
pub trait Gateway: Send + Sync {
	async fn query(&self, request: QueryRequest) -> anyhow::Result<Vec<Row>>;

	async fn search(&self, request: SearchRequest) -> anyhow::Result<Vec<Hit>>;
}

#[async_trait]
impl<G: Gateway + ?Sized> Gateway for Arc<G> {
	async fn query(&self, request: QueryRequest) -> anyhow::Result<Vec<Row>> {
		(**self).query(request).await
	}

	async fn search(&self, request: SearchRequest) -> anyhow::Result<Vec<Hit>> {
		(**self).search(request).await
	}
}
