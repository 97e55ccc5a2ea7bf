use std::sync::Arc;

use vdbclient_types::{FieldType, Hit, Metric, PrimaryKey};

use super::cache::{CacheId, PageCache};
use super::{check_batch_size, remaining};
use crate::cnf;
use crate::err::Error;
use crate::gateway::{Filter, Gateway, SearchParams, SearchRequest};
use crate::opt::SearchIteratorOptions;

const TARGET: &str = "vdbclient::iter::search";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Status {
	/// The seed search found nothing
	Uninitialised,
	Active,
	/// A fill came back empty
	Exhausted,
}

/// The window state of a search iterator
///
/// Scores are treated as positions on a line that runs outwards from the
/// query. `tail_band` is the farthest score fetched so far and `width` the
/// estimated thickness of one page of hits.
#[derive(Clone, Debug)]
struct Ring {
	metric: Metric,
	width: f32,
	tail_band: f32,
	/// Ids of the fetched hits that share the score `filtered_score`
	filtered_ids: Vec<PrimaryKey>,
	filtered_score: Option<f32>,
}

impl Ring {
	fn new(metric: Metric) -> Self {
		Ring {
			metric,
			width: 0.0,
			tail_band: 0.0,
			filtered_ids: Vec::new(),
			filtered_score: None,
		}
	}

	/// Estimates the ring width from the nearest and farthest hits of a page.
	fn update_width(&mut self, page: &[Hit]) {
		let (Some(first), Some(last)) = (page.first(), page.last()) else {
			return;
		};
		let width = self.metric.spread(first.score, last.score).max(0.0);
		self.width = if width == 0.0 {
			cnf::WIDTH_EPSILON
		} else {
			width
		};
	}

	/// Records the hits tied with the farthest hit of `page`. Only ties at the
	/// single latest trailing score are kept; a new score starts a new set.
	fn update_filtered_ids(&mut self, page: &[Hit]) -> Result<(), Error> {
		let Some(last) = page.last() else {
			return Ok(());
		};
		if self.filtered_score != Some(last.score) {
			self.filtered_ids.clear();
		}
		self.filtered_score = Some(last.score);
		self.filtered_ids.extend(page.iter().filter(|h| h.score == last.score).map(|h| h.id.clone()));
		let max = *cnf::MAX_FILTERED_IDS_COUNT;
		if self.filtered_ids.len() > max {
			return Err(Error::TooManyFilteredIds {
				score: last.score,
				count: self.filtered_ids.len(),
				max,
			});
		}
		Ok(())
	}

	fn clear_filtered_ids(&mut self) {
		self.filtered_ids.clear();
		self.filtered_score = None;
	}

	/// The next ring window as `(radius, range_filter)`, starting at the
	/// trailing edge and reaching `width * coefficient` further out. The outer
	/// bound never passes the caller's `radius`. Returns `None` when that bound
	/// leaves no room beyond the trailing edge.
	fn window(&self, coefficient: usize, bound: Option<f32>) -> Option<Window> {
		let mut radius = self.metric.extend(self.tail_band, self.width * coefficient.max(1) as f32);
		let mut clamped = false;
		if let Some(bound) = bound {
			if !self.metric.is_farther(bound, radius) {
				radius = bound;
				clamped = true;
			}
		}
		if !self.metric.is_farther(radius, self.tail_band) {
			return None;
		}
		Some(Window {
			radius,
			range_filter: self.tail_band,
			clamped,
		})
	}
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct Window {
	radius: f32,
	range_filter: f32,
	/// Whether the caller's radius cut the window short
	clamped: bool,
}

/// Pages through an approximate nearest neighbour search
///
/// The index can only answer "the nearest `k` hits within a score range". To
/// page past the first `k`, the iterator remembers the farthest score it has
/// fetched and asks for the next ring beyond it, widening the ring when it
/// comes back empty. Hits tied at the ring boundary are excluded by id so that
/// no hit is returned twice.
pub struct SearchIterator<G> {
	gateway: Arc<G>,
	options: SearchIteratorOptions,
	vector: Vec<f32>,
	ring: Ring,
	status: Status,
	cache: PageCache<Hit>,
	cache_id: Option<CacheId>,
	returned: usize,
}

impl<G: Gateway> SearchIterator<G> {
	/// Validates the options and runs the seed search.
	///
	/// When the seed search finds nothing the iterator is still returned, and
	/// every call to [`next`](Self::next) yields an empty page.
	pub async fn new(gateway: Arc<G>, options: SearchIteratorOptions) -> Result<Self, Error> {
		check_batch_size(options.batch_size)?;
		if options.vectors.len() != 1 {
			return Err(Error::VectorCount(options.vectors.len()));
		}
		let metric = parse_metric(&options.metric)?;
		check_vector_field(&options)?;
		if let Some(ef) = options.params.ef {
			if ef < options.batch_size {
				return Err(Error::EfTooSmall {
					ef,
					batch_size: options.batch_size,
				});
			}
		}
		check_range(metric, &options.params)?;

		let mut options = options;
		let vector = options.vectors.pop().unwrap_or_default();
		let mut iter = SearchIterator {
			gateway,
			options,
			vector,
			ring: Ring::new(metric),
			status: Status::Uninitialised,
			cache: PageCache::new(),
			cache_id: None,
			returned: 0,
		};
		iter.seed().await?;
		Ok(iter)
	}

	async fn seed(&mut self) -> Result<(), Error> {
		let filter = Filter::new(self.options.expr.as_str());
		let page = self.search(filter, self.options.params.clone(), false).await?;
		let Some(last) = page.last() else {
			warn!(
				target: TARGET,
				"The seed search of collection `{}` returned no results, the iterator will be empty",
				self.options.schema.name()
			);
			return Ok(());
		};
		self.ring.tail_band = last.score;
		self.ring.update_filtered_ids(&page)?;
		self.ring.update_width(&page);
		debug!(
			target: TARGET,
			"Seeded with {} hits, tail band {} and width {}",
			page.len(),
			self.ring.tail_band,
			self.ring.width
		);
		self.cache_id = Some(self.cache.store(None, page));
		self.status = Status::Active;
		Ok(())
	}

	/// Returns the next page of at most `batch_size` hits, nearest first.
	///
	/// A short page means the retry budget ran out before a full page was
	/// found; an empty page means the stream has ended.
	pub async fn next(&mut self) -> Result<Vec<Hit>, Error> {
		if self.status != Status::Active {
			return Ok(Vec::new());
		}
		let wanted = remaining(self.options.batch_size, self.options.limit, self.returned);
		if wanted == 0 {
			return Ok(Vec::new());
		}
		if self.cached_len() >= wanted {
			let page = self.extract(wanted);
			debug!(target: TARGET, "Serving {} cached hits", page.len());
			self.returned += page.len();
			return Ok(page);
		}
		// Carry the remainder over, it lies nearer than anything a later ring can find
		let mut page = match self.cache_id.take() {
			Some(id) => self.cache.take(id).unwrap_or_default(),
			None => Vec::new(),
		};
		let filled = self.fill(&mut page, wanted).await;
		// The ring has already moved past these hits, keep them for the next call
		self.cache_id = Some(self.cache.store(None, page));
		filled?;
		let page = self.extract(wanted);
		if page.len() == self.options.batch_size {
			self.ring.update_width(&page);
		}
		self.returned += page.len();
		if page.is_empty() {
			debug!(target: TARGET, "No further hits found, the iterator is exhausted");
			self.ring.clear_filtered_ids();
			self.status = Status::Exhausted;
		}
		Ok(page)
	}

	/// Releases the cached page. Calling it again has no effect.
	pub fn close(&mut self) {
		if let Some(id) = self.cache_id.take() {
			self.cache.release(id);
		}
	}

	/// The number of hits handed to the caller so far
	pub fn returned(&self) -> usize {
		self.returned
	}

	pub fn batch_size(&self) -> usize {
		self.options.batch_size
	}

	pub fn metric(&self) -> Metric {
		self.ring.metric
	}

	/// Searches successive rings until `page` holds `wanted` hits, the caller's
	/// radius is covered, or too many rings come back empty.
	async fn fill(&mut self, page: &mut Vec<Hit>, wanted: usize) -> Result<(), Error> {
		let max_try = *cnf::MAX_TRY_TIME;
		let mut coefficient = 1;
		let mut stalls = 0;
		while page.len() < wanted {
			let Some(window) = self.ring.window(coefficient, self.options.params.radius) else {
				debug!(target: TARGET, "The search radius is fully covered");
				break;
			};
			let mut params = self.options.params.clone();
			params.radius = Some(window.radius);
			params.range_filter = Some(window.range_filter);
			let filter = Filter::new(self.options.expr.as_str()).excluding(
				&self.options.schema.primary_field().name,
				self.ring.filtered_ids.clone(),
			);
			let hits = self.search(filter, params, true).await?;
			if let Some(last) = hits.last() {
				self.ring.tail_band = last.score;
				self.ring.update_filtered_ids(&hits)?;
				page.extend(hits);
			} else if window.clamped {
				debug!(target: TARGET, "Nothing left before the search radius");
				break;
			} else {
				stalls += 1;
				if stalls >= max_try {
					warn!(
						target: TARGET,
						"Ring searches came back empty {stalls} times, returning {} of {wanted} hits",
						page.len()
					);
					break;
				}
			}
			coefficient += 1;
		}
		Ok(())
	}

	async fn search(
		&self,
		filter: Filter,
		mut params: SearchParams,
		extend: bool,
	) -> Result<Vec<Hit>, Error> {
		let limit = extend_batch_size(self.options.batch_size, &mut params, extend);
		let request = SearchRequest {
			collection: self.options.schema.name().to_owned(),
			filter,
			vector: self.vector.clone(),
			anns_field: self.options.anns_field.clone(),
			metric: self.ring.metric,
			limit,
			params,
			output_fields: self.options.output_fields.clone(),
		};
		trace!(
			target: TARGET,
			"Searching {limit} hits in [{:?}, {:?}) with filter `{}`",
			request.params.range_filter,
			request.params.radius,
			request.filter
		);
		self.gateway.search(request).await.map_err(Error::RemoteCallFailed)
	}

	fn cached_len(&self) -> usize {
		self.cache_id.and_then(|id| self.cache.fetch(id)).map_or(0, <[Hit]>::len)
	}

	/// Takes up to `count` hits from the front of the cache.
	fn extract(&mut self, count: usize) -> Vec<Hit> {
		let Some(id) = self.cache_id else {
			return Vec::new();
		};
		let mut page = self.cache.take(id).unwrap_or_default();
		let rest = page.split_off(count.min(page.len()));
		self.cache.store(Some(id), rest);
		page
	}
}

/// The number of hits to ask for in one call. Ring searches beyond the seed ask for
/// several pages at once. `ef` is lowered to match so the index does not do
/// more work than the call can return.
fn extend_batch_size(batch_size: usize, params: &mut SearchParams, extend: bool) -> usize {
	let rate = if extend {
		*cnf::SEARCH_EXTENSION_RATE
	} else {
		1
	};
	let mut limit = (*cnf::MAX_BATCH_SIZE).min(batch_size.saturating_mul(rate));
	if let Some(ef) = params.ef {
		limit = limit.min(ef);
		params.ef = Some(limit);
	}
	limit
}

fn parse_metric(name: &str) -> Result<Metric, Error> {
	if name.trim().is_empty() {
		return Err(Error::MissingMetric);
	}
	name.trim().parse().map_err(|_| Error::UnsupportedMetric(name.to_owned()))
}

fn check_vector_field(options: &SearchIteratorOptions) -> Result<(), Error> {
	let field = &options.anns_field;
	match options.schema.field(field).map(|f| f.field_type) {
		Some(FieldType::FloatVector {
			dim,
		}) => {
			let found = options.vectors.first().map_or(0, Vec::len);
			if found != dim {
				return Err(Error::DimensionMismatch {
					field: field.clone(),
					expected: dim,
					found,
				});
			}
			Ok(())
		}
		_ => Err(Error::InvalidVectorField(field.clone())),
	}
}

/// `radius` is the outer bound and `range_filter` the inner one, so radius
/// must lie farther from the query.
fn check_range(metric: Metric, params: &SearchParams) -> Result<(), Error> {
	if let (Some(radius), Some(range_filter)) = (params.radius, params.range_filter) {
		if !metric.is_farther(radius, range_filter) {
			return Err(Error::InvalidRange {
				metric,
				radius,
				range_filter,
			});
		}
	}
	Ok(())
}
