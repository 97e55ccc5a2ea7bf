use std::fmt::{self, Display, Write};

use vdbclient_types::PrimaryKey;

/// A boolean filter expression sent with a query or search call
///
/// The filter keeps the caller's expression separate from the clauses the
/// iterators add, so that keys are always rendered with the literal syntax of
/// their declared type. [`Display`] produces the expression string the server
/// parses.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
	expr: Option<String>,
	after: Option<(String, PrimaryKey)>,
	exclude: Option<(String, Vec<PrimaryKey>)>,
}

impl Filter {
	/// A filter made of the caller's expression. An empty expression matches
	/// every row.
	pub fn new(expr: impl Into<String>) -> Self {
		let expr = expr.into();
		Filter {
			expr: (!expr.trim().is_empty()).then_some(expr),
			..Default::default()
		}
	}

	/// Restricts the filter to keys strictly greater than `key`.
	pub fn after(mut self, field: impl Into<String>, key: PrimaryKey) -> Self {
		self.after = Some((field.into(), key));
		self
	}

	/// Excludes the given keys. An empty list adds no clause.
	pub fn excluding(mut self, field: impl Into<String>, keys: Vec<PrimaryKey>) -> Self {
		self.exclude = (!keys.is_empty()).then(|| (field.into(), keys));
		self
	}

	fn excluded(&self) -> &[PrimaryKey] {
		self.exclude.as_ref().map(|(_, k)| k.as_slice()).unwrap_or_default()
	}

	/// Evaluates the clauses added by the iterators against a key. The
	/// caller's own expression is opaque and is not evaluated.
	pub fn matches_key(&self, key: &PrimaryKey) -> bool {
		if let Some((_, after)) = &self.after {
			if key <= after {
				return false;
			}
		}
		!self.excluded().contains(key)
	}

	fn fmt_clauses(&self, f: &mut String) -> fmt::Result {
		if let Some((field, key)) = &self.after {
			write!(f, "{field} > {key}")?;
		}
		if let Some((field, keys)) = &self.exclude {
			if !f.is_empty() {
				f.push_str(" and ");
			}
			write!(f, "{field} not in [")?;
			for (i, key) in keys.iter().enumerate() {
				if i > 0 {
					f.push(',');
				}
				write!(f, "{key}")?;
			}
			f.push(']');
		}
		Ok(())
	}
}

impl Display for Filter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let mut clauses = String::new();
		self.fmt_clauses(&mut clauses)?;
		match (&self.expr, clauses.is_empty()) {
			(None, _) => f.write_str(&clauses),
			(Some(expr), true) => f.write_str(expr),
			(Some(expr), false) => write!(f, "({expr}) and {clauses}"),
		}
	}
}
