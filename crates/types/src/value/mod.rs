mod row;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use row::{Hit, Row};

/// A single field value as returned by the remote service
///
/// Values are tagged with one variant per declared field type of the
/// collection schema rather than inferred at runtime.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum Value {
	#[default]
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	String(String),
	FloatVector(Vec<f32>),
	Array(Vec<Value>),
}

/// The variant of a [`Value`], used in error messages
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Kind {
	Null,
	Bool,
	Int,
	Float,
	String,
	FloatVector,
	Array,
}

impl fmt::Display for Kind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Kind::Null => f.write_str("null"),
			Kind::Bool => f.write_str("bool"),
			Kind::Int => f.write_str("int"),
			Kind::Float => f.write_str("float"),
			Kind::String => f.write_str("string"),
			Kind::FloatVector => f.write_str("float vector"),
			Kind::Array => f.write_str("array"),
		}
	}
}

impl Value {
	pub fn kind(&self) -> Kind {
		match self {
			Value::Null => Kind::Null,
			Value::Bool(_) => Kind::Bool,
			Value::Int(_) => Kind::Int,
			Value::Float(_) => Kind::Float,
			Value::String(_) => Kind::String,
			Value::FloatVector(_) => Kind::FloatVector,
			Value::Array(_) => Kind::Array,
		}
	}

	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	pub fn as_i64(&self) -> Option<i64> {
		match self {
			Value::Int(v) => Some(*v),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Value::String(v) => Some(v),
			_ => None,
		}
	}
}

impl From<bool> for Value {
	fn from(v: bool) -> Self {
		Value::Bool(v)
	}
}

impl From<i64> for Value {
	fn from(v: i64) -> Self {
		Value::Int(v)
	}
}

impl From<f64> for Value {
	fn from(v: f64) -> Self {
		Value::Float(v)
	}
}

impl From<&str> for Value {
	fn from(v: &str) -> Self {
		Value::String(v.to_owned())
	}
}

impl From<String> for Value {
	fn from(v: String) -> Self {
		Value::String(v)
	}
}

impl From<Vec<f32>> for Value {
	fn from(v: Vec<f32>) -> Self {
		Value::FloatVector(v)
	}
}

impl From<Vec<Value>> for Value {
	fn from(v: Vec<Value>) -> Self {
		Value::Array(v)
	}
}
