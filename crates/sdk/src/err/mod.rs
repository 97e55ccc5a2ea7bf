use thiserror::Error;
use vdbclient_types::{Metric, TypeError};

/// An error raised by a result iterator
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
	/// The batch size is zero or larger than the server accepts
	#[error("Invalid batch size {size}, expected a value between 1 and {max}")]
	InvalidBatchSize {
		size: usize,
		max: usize,
	},

	/// No metric type was given for a search iterator
	#[error("A metric type must be specified for search iteration")]
	MissingMetric,

	/// The metric type is not one the search iterator can orient
	#[error("Unsupported metric type for search iteration: {0}")]
	UnsupportedMetric(String),

	/// The radius and range filter bounds are in the wrong order for the metric
	#[error(
		"For metric {metric}, radius must be {} than range_filter, found radius {radius} and range_filter {range_filter}",
		relation(.metric)
	)]
	InvalidRange {
		metric: Metric,
		radius: f32,
		range_filter: f32,
	},

	/// The HNSW `ef` parameter cannot produce a full page
	#[error("When using an HNSW index, ef ({ef}) must be larger than or equal to the batch size ({batch_size})")]
	EfTooSmall {
		ef: usize,
		batch_size: usize,
	},

	/// Search iteration was asked to page over several query vectors at once
	#[error("Search iteration requires exactly one query vector, found {0}")]
	VectorCount(usize),

	/// The vector field is not a float vector field of the collection
	#[error("Field `{0}` is not a float vector field of the collection")]
	InvalidVectorField(String),

	/// The query vector does not have the dimension of the vector field
	#[error("Query vector has dimension {found}, but field `{field}` has dimension {expected}")]
	DimensionMismatch {
		field: String,
		expected: usize,
		found: usize,
	},

	/// Too many hits share the trailing score to exclude them from the next ring search
	#[error(
		"{count} results share the score {score}, more than the {max} that can be excluded from a ring search"
	)]
	TooManyFilteredIds {
		score: f32,
		count: usize,
		max: usize,
	},

	/// A row returned by the server carried no usable primary key
	#[error("Invalid row returned by the server: {0}")]
	InvalidRow(#[source] TypeError),

	/// The gateway failed to execute a query or search call
	#[error("Remote call failed: {0}")]
	RemoteCallFailed(#[source] anyhow::Error),
}

fn relation(metric: &Metric) -> &'static str {
	if metric.larger_is_farther() {
		"larger"
	} else {
		"smaller"
	}
}

impl Error {
	/// Whether the error was caused by the iterator configuration rather than
	/// by the remote service or the data it returned.
	pub fn is_configuration(&self) -> bool {
		!matches!(self, Error::InvalidRow(_) | Error::RemoteCallFailed(_))
	}
}
