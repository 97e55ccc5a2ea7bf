use std::collections::HashMap;

/// An opaque handle to a cached page
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct CacheId(u64);

/// Pages fetched from the gateway but not yet handed to the caller
///
/// A ring search can return more entries than one page needs; the surplus is parked
/// here until the next call. Every iterator owns its own cache, so no locking
/// is needed.
#[derive(Debug)]
pub struct PageCache<T> {
	next: u64,
	pages: HashMap<CacheId, Vec<T>>,
}

impl<T> Default for PageCache<T> {
	fn default() -> Self {
		PageCache {
			next: 0,
			pages: HashMap::new(),
		}
	}
}

impl<T> PageCache<T> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Stores a page, allocating a new handle when `id` is `None` and
	/// replacing the page under `id` otherwise.
	pub fn store(&mut self, id: Option<CacheId>, page: Vec<T>) -> CacheId {
		let id = id.unwrap_or_else(|| {
			self.next += 1;
			CacheId(self.next)
		});
		self.pages.insert(id, page);
		id
	}

	pub fn fetch(&self, id: CacheId) -> Option<&[T]> {
		self.pages.get(&id).map(Vec::as_slice)
	}

	/// Removes and returns the page under `id`.
	pub fn take(&mut self, id: CacheId) -> Option<Vec<T>> {
		self.pages.remove(&id)
	}

	/// Discards the page under `id`. Releasing an unknown handle does nothing.
	pub fn release(&mut self, id: CacheId) {
		self.pages.remove(&id);
	}
}
