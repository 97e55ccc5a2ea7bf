//! Resumable iterators over bounded query and search calls.
//!
//! The server caps the size of every response. [`QueryIterator`] pages an
//! exact scan by advancing a primary key cursor, and [`SearchIterator`] pages
//! an approximate nearest neighbour search by probing successive distance
//! rings. Both serve pages of at most `batch_size` entries and signal the end
//! of the stream with an empty page.

pub mod cache;
mod query;
mod search;

#[cfg(test)]
mod tests;

pub use query::QueryIterator;
pub use search::SearchIterator;

use crate::cnf;
use crate::err::Error;

fn check_batch_size(size: usize) -> Result<(), Error> {
	let max = *cnf::MAX_BATCH_SIZE;
	if size == 0 || size > max {
		return Err(Error::InvalidBatchSize {
			size,
			max,
		});
	}
	Ok(())
}

/// The number of entries the next page may contain under a lifetime limit.
fn remaining(batch_size: usize, limit: Option<usize>, returned: usize) -> usize {
	match limit {
		Some(limit) => batch_size.min(limit.saturating_sub(returned)),
		None => batch_size,
	}
}
