use std::sync::Arc;

use vdbclient_types::{PrimaryKey, Row};

use super::cache::{CacheId, PageCache};
use super::{check_batch_size, remaining};
use crate::err::Error;
use crate::gateway::{Filter, Gateway, QueryRequest};
use crate::opt::QueryIteratorOptions;

const TARGET: &str = "vdbclient::iter::query";

/// Pages through the rows matching a filter, ordered by primary key
///
/// Every call after the first adds `pk > last` to the caller's filter, so the
/// scan never depends on server-side offsets and never returns a row twice.
pub struct QueryIterator<G> {
	gateway: Arc<G>,
	options: QueryIteratorOptions,
	cache: PageCache<Row>,
	cache_id: Option<CacheId>,
	/// Primary key of the last row handed to the caller
	last_key: Option<PrimaryKey>,
	returned: usize,
}

impl<G: Gateway> QueryIterator<G> {
	/// Creates the iterator, skipping `options.offset` matching rows with a
	/// single seek call when the offset is not zero.
	pub async fn new(gateway: Arc<G>, mut options: QueryIteratorOptions) -> Result<Self, Error> {
		check_batch_size(options.batch_size)?;
		let pk = &options.schema.primary_field().name;
		if !options.output_fields.contains(pk) {
			options.output_fields.push(pk.clone());
		}
		let mut iter = QueryIterator {
			gateway,
			options,
			cache: PageCache::new(),
			cache_id: None,
			last_key: None,
			returned: 0,
		};
		iter.seek().await?;
		Ok(iter)
	}

	async fn seek(&mut self) -> Result<(), Error> {
		let offset = self.options.offset;
		if offset == 0 {
			return Ok(());
		}
		let request = QueryRequest {
			collection: self.options.schema.name().to_owned(),
			filter: self.next_filter(),
			output_fields: vec![self.options.schema.primary_field().name.clone()],
			limit: offset,
			offset: 0,
		};
		trace!(target: TARGET, "Seeking past {offset} rows with filter `{}`", request.filter);
		let rows = self.gateway.query(request).await.map_err(Error::RemoteCallFailed)?;
		let seeked = rows.len().min(offset);
		self.update_cursor(&rows[..seeked])?;
		debug!(target: TARGET, "Skipped {seeked} of {offset} requested rows");
		Ok(())
	}

	/// Returns the next page of at most `batch_size` rows.
	///
	/// An empty page means no further rows match, or the limit was reached.
	pub async fn next(&mut self) -> Result<Vec<Row>, Error> {
		let wanted = remaining(self.options.batch_size, self.options.limit, self.returned);
		if wanted == 0 {
			return Ok(Vec::new());
		}
		let mut page = match self.take_cached() {
			Some(page) => {
				debug!(target: TARGET, "Serving {} cached rows", page.len());
				page
			}
			None => {
				self.release();
				let rows = self.fetch().await?;
				self.split_and_cache(rows)
			}
		};
		page.truncate(wanted);
		self.update_cursor(&page)?;
		self.returned += page.len();
		Ok(page)
	}

	/// Releases the cached page. Calling it again has no effect.
	pub fn close(&mut self) {
		self.release();
	}

	/// The number of rows handed to the caller so far
	pub fn returned(&self) -> usize {
		self.returned
	}

	pub fn batch_size(&self) -> usize {
		self.options.batch_size
	}

	fn release(&mut self) {
		if let Some(id) = self.cache_id.take() {
			self.cache.release(id);
		}
	}

	async fn fetch(&self) -> Result<Vec<Row>, Error> {
		let request = QueryRequest {
			collection: self.options.schema.name().to_owned(),
			filter: self.next_filter(),
			output_fields: self.options.output_fields.clone(),
			limit: self.options.batch_size,
			offset: 0,
		};
		trace!(target: TARGET, "Querying {} rows with filter `{}`", request.limit, request.filter);
		self.gateway.query(request).await.map_err(Error::RemoteCallFailed)
	}

	/// Serves a full page from the cache, putting the rest back.
	fn take_cached(&mut self) -> Option<Vec<Row>> {
		let id = self.cache_id?;
		let batch_size = self.options.batch_size;
		if self.cache.fetch(id).map_or(0, <[Row]>::len) < batch_size {
			return None;
		}
		let mut page = self.cache.take(id)?;
		let rest = page.split_off(batch_size);
		self.cache.store(Some(id), rest);
		Some(page)
	}

	fn split_and_cache(&mut self, mut rows: Vec<Row>) -> Vec<Row> {
		let batch_size = self.options.batch_size;
		if rows.len() > batch_size {
			let rest = rows.split_off(batch_size);
			self.cache_id = Some(self.cache.store(self.cache_id, rest));
		}
		rows
	}

	fn next_filter(&self) -> Filter {
		let filter = Filter::new(self.options.expr.as_str());
		match &self.last_key {
			Some(key) => filter.after(&self.options.schema.primary_field().name, key.clone()),
			None => filter,
		}
	}

	fn update_cursor(&mut self, rows: &[Row]) -> Result<(), Error> {
		if let Some(row) = rows.last() {
			let key = self.options.schema.primary_key(row).map_err(Error::InvalidRow)?;
			self.last_key = Some(key);
		}
		Ok(())
	}
}
