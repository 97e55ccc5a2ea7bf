use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::{PrimaryKey, Value};

/// A row returned by a query or a search
///
/// A row is an ordered collection of field name / value pairs. Field order is
/// the order the server returned the fields in.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Row(pub(crate) IndexMap<String, Value>);

impl Row {
	/// Create a new empty row
	pub fn new() -> Self {
		Row(IndexMap::new())
	}

	pub fn get(&self, field: &str) -> Option<&Value> {
		self.0.get(field)
	}

	/// Insert a field, returning the previous value if the field was already set
	pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
		self.0.insert(field.into(), value.into())
	}

	pub fn contains_field(&self, field: &str) -> bool {
		self.0.contains_key(field)
	}

	pub fn len(&self) -> usize {
		self.0.len()
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> indexmap::map::Iter<'_, String, Value> {
		self.0.iter()
	}

	pub fn into_inner(self) -> IndexMap<String, Value> {
		self.0
	}
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Row {
	fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
		Row(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
	}
}

impl IntoIterator for Row {
	type Item = (String, Value);
	type IntoIter = indexmap::map::IntoIter<String, Value>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.into_iter()
	}
}

impl<'a> IntoIterator for &'a Row {
	type Item = (&'a String, &'a Value);
	type IntoIter = indexmap::map::Iter<'a, String, Value>;

	fn into_iter(self) -> Self::IntoIter {
		self.0.iter()
	}
}

/// A single similarity search result
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hit {
	/// The primary key of the matched row
	pub id: PrimaryKey,
	/// The similarity score reported by the server for the configured metric
	pub score: f32,
	/// The requested output fields of the matched row
	pub row: Row,
}

impl Hit {
	pub fn new(id: impl Into<PrimaryKey>, score: f32, row: Row) -> Self {
		Hit {
			id: id.into(),
			score,
			row,
		}
	}
}
