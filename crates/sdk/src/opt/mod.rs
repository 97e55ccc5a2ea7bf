//! Iterator configuration.
//!
//! Options are plain structs: create one with `new`, adjust public fields with
//! struct update syntax, and hand it to the iterator constructor, which
//! validates it once.

use vdbclient_types::CollectionSchema;

use crate::cnf;
use crate::gateway::SearchParams;

/// Configuration of a [`QueryIterator`](crate::QueryIterator)
#[derive(Clone, Debug)]
pub struct QueryIteratorOptions {
	/// The collection schema; the primary field orders the scan
	pub schema: CollectionSchema,
	/// Filter expression, empty for all rows
	pub expr: String,
	/// Fields to return; the primary field is always added
	pub output_fields: Vec<String>,
	/// Rows per page
	pub batch_size: usize,
	/// Total number of rows to return over the iterator's lifetime
	pub limit: Option<usize>,
	/// Number of matching rows to skip before the first page
	pub offset: usize,
}

impl QueryIteratorOptions {
	pub fn new(schema: CollectionSchema) -> Self {
		QueryIteratorOptions {
			schema,
			expr: String::new(),
			output_fields: Vec::new(),
			batch_size: cnf::DEFAULT_BATCH_SIZE,
			limit: None,
			offset: 0,
		}
	}
}

/// Configuration of a [`SearchIterator`](crate::SearchIterator)
#[derive(Clone, Debug)]
pub struct SearchIteratorOptions {
	pub schema: CollectionSchema,
	/// Query vectors. Iteration supports exactly one.
	pub vectors: Vec<Vec<f32>>,
	/// The float vector field to search
	pub anns_field: String,
	/// Metric type name, for example `L2` or `IP`
	pub metric: String,
	/// Filter expression, empty for all rows
	pub expr: String,
	pub output_fields: Vec<String>,
	/// Hits per page
	pub batch_size: usize,
	/// Total number of hits to return over the iterator's lifetime
	pub limit: Option<usize>,
	/// Index parameters; `radius` and `range_filter` bound the whole iteration
	pub params: SearchParams,
}

impl SearchIteratorOptions {
	pub fn new(
		schema: CollectionSchema,
		anns_field: impl Into<String>,
		vector: Vec<f32>,
		metric: impl Into<String>,
	) -> Self {
		SearchIteratorOptions {
			schema,
			vectors: vec![vector],
			anns_field: anns_field.into(),
			metric: metric.into(),
			expr: String::new(),
			output_fields: Vec::new(),
			batch_size: cnf::DEFAULT_BATCH_SIZE,
			limit: None,
			params: SearchParams::default(),
		}
	}
}
