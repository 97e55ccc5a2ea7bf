use thiserror::Error;

use crate::Kind;

/// An error raised while interpreting schema or row data
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum TypeError {
	/// The metric string does not name a metric the iterators understand
	#[error("Unsupported metric type `{0}`")]
	UnsupportedMetric(String),

	/// The collection schema declares no primary field
	#[error("Collection `{0}` has no primary field")]
	MissingPrimaryField(String),

	/// The collection schema declares more than one primary field
	#[error("Collection `{collection}` declares more than one primary field: `{first}` and `{second}`")]
	DuplicatePrimaryField {
		collection: String,
		first: String,
		second: String,
	},

	/// The primary field is declared with a type that cannot be used as a key
	#[error("Primary field `{field}` must be Int64 or VarChar, found {found}")]
	InvalidPrimaryType {
		field: String,
		found: String,
	},

	/// A value does not match the declared field type
	#[error("Expected a {expected} value for `{field}`, found {found}")]
	Mismatch {
		field: String,
		expected: String,
		found: Kind,
	},

	/// A row did not carry the named field
	#[error("Row is missing field `{0}`")]
	MissingField(String),
}
