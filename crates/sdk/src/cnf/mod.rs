use std::sync::LazyLock;

/// The largest number of rows or hits a single gateway call may ask for.
pub static MAX_BATCH_SIZE: LazyLock<usize> = lazy_env_parse!("VDB_MAX_BATCH_SIZE", usize, 16_384);

/// The number of consecutive empty ring searches after which a search iterator stops
/// widening its window and returns what it has collected.
pub static MAX_TRY_TIME: LazyLock<usize> =
	lazy_env_parse!("VDB_ITERATOR_MAX_TRY_TIME", usize, 20);

/// Factor applied to the batch size when a search iterator searches beyond the
/// seed page, so that one ring search usually fills more than one page.
pub static SEARCH_EXTENSION_RATE: LazyLock<usize> =
	lazy_env_parse!("VDB_SEARCH_EXTENSION_RATE", usize, 10);

/// The maximum number of ids tied at the trailing score that a search iterator
/// will exclude from its next ring search.
pub static MAX_FILTERED_IDS_COUNT: LazyLock<usize> =
	lazy_env_parse!("VDB_MAX_FILTERED_IDS_COUNT", usize, 100_000);

/// Smallest ring width used by a search iterator. A page whose hits all share
/// one score would otherwise produce a window with equal bounds.
pub const WIDTH_EPSILON: f32 = 0.05;

/// Batch size used when the caller does not choose one.
pub const DEFAULT_BATCH_SIZE: usize = 1000;
