use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::escape::QuoteStr;
use crate::{FieldType, TypeError, Value};

/// The primary key value of a row
///
/// A collection keys its rows either by a 64-bit integer or by a string, fixed
/// by the collection schema. The [`Display`](fmt::Display) implementation
/// renders the key as a filter literal: integers bare, strings double-quoted.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
pub enum PrimaryKey {
	Int(i64),
	Str(String),
}

impl PrimaryKey {
	/// Extract a primary key from a field value, checking it against the
	/// declared type of the primary field.
	pub fn from_value(field: &str, field_type: &FieldType, value: &Value) -> Result<Self, TypeError> {
		match (field_type, value) {
			(FieldType::Int64, Value::Int(v)) => Ok(PrimaryKey::Int(*v)),
			(FieldType::VarChar, Value::String(v)) => Ok(PrimaryKey::Str(v.clone())),
			(FieldType::Int64 | FieldType::VarChar, v) => Err(TypeError::Mismatch {
				field: field.to_owned(),
				expected: field_type.to_string(),
				found: v.kind(),
			}),
			(other, _) => Err(TypeError::InvalidPrimaryType {
				field: field.to_owned(),
				found: other.to_string(),
			}),
		}
	}

	pub fn into_value(self) -> Value {
		match self {
			PrimaryKey::Int(v) => Value::Int(v),
			PrimaryKey::Str(v) => Value::String(v),
		}
	}
}

impl fmt::Display for PrimaryKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PrimaryKey::Int(v) => write!(f, "{v}"),
			PrimaryKey::Str(v) => write!(f, "{}", QuoteStr(v)),
		}
	}
}

impl From<i64> for PrimaryKey {
	fn from(v: i64) -> Self {
		PrimaryKey::Int(v)
	}
}

impl From<&str> for PrimaryKey {
	fn from(v: &str) -> Self {
		PrimaryKey::Str(v.to_owned())
	}
}

impl From<String> for PrimaryKey {
	fn from(v: String) -> Self {
		PrimaryKey::Str(v)
	}
}
