use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{PrimaryKey, Row, TypeError};

/// The declared type of a collection field
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum FieldType {
	Bool,
	Int64,
	Float,
	VarChar,
	FloatVector {
		dim: usize,
	},
	Array,
}

impl FieldType {
	pub fn is_key_type(&self) -> bool {
		matches!(self, FieldType::Int64 | FieldType::VarChar)
	}
}

impl fmt::Display for FieldType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FieldType::Bool => f.write_str("Bool"),
			FieldType::Int64 => f.write_str("Int64"),
			FieldType::Float => f.write_str("Float"),
			FieldType::VarChar => f.write_str("VarChar"),
			FieldType::FloatVector {
				dim,
			} => write!(f, "FloatVector({dim})"),
			FieldType::Array => f.write_str("Array"),
		}
	}
}

/// A single field declaration
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FieldSchema {
	pub name: String,
	pub field_type: FieldType,
	pub is_primary: bool,
}

impl FieldSchema {
	pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
		FieldSchema {
			name: name.into(),
			field_type,
			is_primary: false,
		}
	}

	pub fn primary(name: impl Into<String>, field_type: FieldType) -> Self {
		FieldSchema {
			name: name.into(),
			field_type,
			is_primary: true,
		}
	}
}

/// The schema description of a collection
///
/// A schema always has exactly one primary field of type `Int64` or
/// `VarChar`; this is checked when the schema is created or deserialized.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SchemaDef")]
pub struct CollectionSchema {
	name: String,
	fields: Vec<FieldSchema>,
	#[serde(skip_serializing)]
	primary: usize,
}

/// The serialized form of a [`CollectionSchema`]
#[derive(Deserialize)]
struct SchemaDef {
	name: String,
	fields: Vec<FieldSchema>,
}

impl TryFrom<SchemaDef> for CollectionSchema {
	type Error = TypeError;

	fn try_from(def: SchemaDef) -> Result<Self, Self::Error> {
		CollectionSchema::new(def.name, def.fields)
	}
}

impl CollectionSchema {
	pub fn new(name: impl Into<String>, fields: Vec<FieldSchema>) -> Result<Self, TypeError> {
		let name = name.into();
		let mut primary: Option<usize> = None;
		for (i, field) in fields.iter().enumerate() {
			if !field.is_primary {
				continue;
			}
			if let Some(first) = primary {
				return Err(TypeError::DuplicatePrimaryField {
					collection: name,
					first: fields[first].name.clone(),
					second: field.name.clone(),
				});
			}
			if !field.field_type.is_key_type() {
				return Err(TypeError::InvalidPrimaryType {
					field: field.name.clone(),
					found: field.field_type.to_string(),
				});
			}
			primary = Some(i);
		}
		let Some(primary) = primary else {
			return Err(TypeError::MissingPrimaryField(name));
		};
		Ok(CollectionSchema {
			name,
			fields,
			primary,
		})
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn fields(&self) -> &[FieldSchema] {
		&self.fields
	}

	pub fn field(&self, name: &str) -> Option<&FieldSchema> {
		self.fields.iter().find(|f| f.name == name)
	}

	pub fn primary_field(&self) -> &FieldSchema {
		&self.fields[self.primary]
	}

	/// Reads the primary key of a row.
	pub fn primary_key(&self, row: &Row) -> Result<PrimaryKey, TypeError> {
		let field = self.primary_field();
		let value = row.get(&field.name).ok_or_else(|| TypeError::MissingField(field.name.clone()))?;
		PrimaryKey::from_value(&field.name, &field.field_type, value)
	}
}
