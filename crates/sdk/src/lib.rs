//! Result iteration for a vector database client.
//!
//! A remote vector database caps the number of rows any single query or
//! search call may return. This library turns those bounded calls into
//! resumable streams of pages:
//!
//! - [`QueryIterator`] walks the rows that match a filter in primary key
//!   order, resuming each page after the last key it returned.
//! - [`SearchIterator`] walks the hits of an approximate nearest neighbour
//!   search outwards from the query vector, one distance ring at a time.
//!
//! Both iterators talk to the server through the [`Gateway`] trait, which
//! executes one call at a time. Pages are returned by `next`, an empty page
//! marks the end of the stream, and `close` releases any cached state.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use vdbclient::{CollectionSchema, Gateway, QueryIterator, QueryIteratorOptions};
//! # async fn run(gateway: Arc<impl Gateway>, schema: CollectionSchema) -> vdbclient::Result<()> {
//! let options = QueryIteratorOptions {
//! 	expr: "age > 21".to_owned(),
//! 	batch_size: 100,
//! 	..QueryIteratorOptions::new(schema)
//! };
//! let mut iter = QueryIterator::new(gateway, options).await?;
//! loop {
//! 	let page = iter.next().await?;
//! 	if page.is_empty() {
//! 		break;
//! 	}
//! 	// process the page
//! }
//! iter.close();
//! # Ok(())
//! # }
//! ```

#[macro_use]
extern crate tracing;

#[macro_use]
mod mac;

pub mod cnf;
mod err;
pub mod gateway;
pub mod iter;
pub mod opt;

pub use err::Error;
pub use gateway::{Filter, Gateway, QueryRequest, SearchParams, SearchRequest};
pub use iter::{QueryIterator, SearchIterator};
pub use opt::{QueryIteratorOptions, SearchIteratorOptions};
pub use vdbclient_types::{
	CollectionSchema, FieldSchema, FieldType, Hit, Kind, Metric, PrimaryKey, Row, TypeError, Value,
};

/// A specialized `Result` type
pub type Result<T> = std::result::Result<T, Error>;
