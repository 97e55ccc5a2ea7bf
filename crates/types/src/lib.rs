//! Data model shared by the vdbclient iterators and the gateways that serve them.
//!
//! Rows returned by the remote service are ordered field maps of typed
//! [`Value`]s. The [`CollectionSchema`] describes the declared type of every
//! field and, in particular, which field carries the [`PrimaryKey`] used by the
//! cursor iterator to resume a scan.

mod error;
mod key;
mod metric;
mod schema;
mod utils;
mod value;

pub use error::TypeError;
pub use key::PrimaryKey;
pub use metric::Metric;
pub use schema::{CollectionSchema, FieldSchema, FieldType};
pub use utils::escape::QuoteStr;
pub use value::{Hit, Kind, Row, Value};
