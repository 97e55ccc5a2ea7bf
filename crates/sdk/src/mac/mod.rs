/// Declares a tunable read once from an environment variable.
///
/// Expands to a `std::sync::LazyLock` that parses the variable `$key` as `$t`
/// on first access. An unset or unparsable variable yields `$default`, which
/// may also be given as a closure when computing it is not free.
///
/// ```ignore
/// pub static MAX_TRY_TIME: LazyLock<usize> = lazy_env_parse!("VDB_ITERATOR_MAX_TRY_TIME", usize, 20);
/// ```
#[macro_export]
macro_rules! lazy_env_parse {
	($key:expr, $t:ty, || $default:expr) => {
		std::sync::LazyLock::new(|| {
			std::env::var($key).ok().and_then(|s| s.parse::<$t>().ok()).unwrap_or_else(|| $default)
		})
	};
	($key:expr, $t:ty, $default:expr) => {
		std::sync::LazyLock::new(|| {
			std::env::var($key).ok().and_then(|s| s.parse::<$t>().ok()).unwrap_or($default)
		})
	};
}
