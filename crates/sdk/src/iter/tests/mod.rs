
use std::collections::HashSet;
use std::error::Error as _;
use std::sync::Arc;

use server::{DIM, PK, ScriptedGateway, TestGateway, VECTOR, hits, int_schema, str_schema};
use vdbclient_types::{Hit, Metric, PrimaryKey, Row, Value};

use super::{QueryIterator, SearchIterator};
use crate::cnf;
use crate::err::Error;
use crate::gateway::SearchParams;
use crate::opt::{QueryIteratorOptions, SearchIteratorOptions};

fn keys(page: &[Row]) -> Vec<i64> {
	page.iter().map(|row| row.get(PK).and_then(Value::as_i64).unwrap()).collect()
}

fn ids(page: &[Hit]) -> Vec<i64> {
	page.iter()
		.map(|hit| match hit.id {
			PrimaryKey::Int(id) => id,
			PrimaryKey::Str(_) => panic!("unexpected string key"),
		})
		.collect()
}

fn query_options(batch_size: usize) -> QueryIteratorOptions {
	QueryIteratorOptions {
		batch_size,
		..QueryIteratorOptions::new(int_schema())
	}
}

fn search_options(metric: &str, batch_size: usize) -> SearchIteratorOptions {
	SearchIteratorOptions {
		batch_size,
		..SearchIteratorOptions::new(int_schema(), VECTOR, vec![0.0; DIM], metric)
	}
}

async fn drain_search<G: crate::Gateway>(iter: &mut SearchIterator<G>) -> Vec<Hit> {
	let mut all = Vec::new();
	loop {
		let page = iter.next().await.unwrap();
		assert!(page.len() <= iter.batch_size());
		if page.is_empty() {
			return all;
		}
		all.extend(page);
	}
}

/// Scores with ties: every score in `0.0..=4.0` in steps of 0.25 is shared by
/// up to three ids.
fn tied_scores(count: i64) -> Vec<(i64, f32)> {
	(0..count).map(|id| (id, (id % 17) as f32 * 0.25)).collect()
}

#[test_log::test(tokio::test)]
async fn query_pages_in_key_order() {
	let gateway = Arc::new(TestGateway::with_rows(1..=10i64));
	let mut iter = QueryIterator::new(gateway.clone(), query_options(4)).await.unwrap();
	assert_eq!(gateway.call_count(), 0);
	assert_eq!(keys(&iter.next().await.unwrap()), vec![1, 2, 3, 4]);
	assert_eq!(keys(&iter.next().await.unwrap()), vec![5, 6, 7, 8]);
	assert_eq!(keys(&iter.next().await.unwrap()), vec![9, 10]);
	assert!(iter.next().await.unwrap().is_empty());
	assert_eq!(iter.returned(), 10);

	let filters: Vec<String> = gateway.queries().iter().map(|q| q.filter.to_string()).collect();
	assert_eq!(filters, vec!["", "id > 4", "id > 8", "id > 10"]);
	assert!(gateway.queries().iter().all(|q| q.collection == "docs"));
}

#[test_log::test(tokio::test)]
async fn query_offset_seeks_once() {
	let gateway = Arc::new(TestGateway::with_rows(1..=10i64));
	let options = QueryIteratorOptions {
		offset: 3,
		..query_options(4)
	};
	let mut iter = QueryIterator::new(gateway.clone(), options).await.unwrap();
	let queries = gateway.queries();
	let seek = &queries[0];
	assert_eq!(seek.limit, 3);
	assert_eq!(seek.output_fields, vec![PK.to_owned()]);
	assert_eq!(keys(&iter.next().await.unwrap()), vec![4, 5, 6, 7]);
	assert_eq!(gateway.queries()[1].filter.to_string(), "id > 3");
}

#[test_log::test(tokio::test)]
async fn query_offset_past_the_end() {
	let gateway = Arc::new(TestGateway::with_rows(1..=3i64));
	let options = QueryIteratorOptions {
		offset: 5,
		..query_options(2)
	};
	let mut iter = QueryIterator::new(gateway.clone(), options).await.unwrap();
	assert!(iter.next().await.unwrap().is_empty());
}

#[test_log::test(tokio::test)]
async fn query_respects_limit() {
	let gateway = Arc::new(TestGateway::with_rows(1..=10i64));
	let options = QueryIteratorOptions {
		limit: Some(6),
		..query_options(4)
	};
	let mut iter = QueryIterator::new(gateway.clone(), options).await.unwrap();
	assert_eq!(keys(&iter.next().await.unwrap()), vec![1, 2, 3, 4]);
	assert_eq!(keys(&iter.next().await.unwrap()), vec![5, 6]);
	let calls = gateway.call_count();
	assert!(iter.next().await.unwrap().is_empty());
	assert!(iter.next().await.unwrap().is_empty());
	assert_eq!(gateway.call_count(), calls);
	assert_eq!(iter.returned(), 6);
}

#[test_log::test(tokio::test)]
async fn query_combines_expression_and_cursor() {
	let gateway = Arc::new(TestGateway::with_rows(1..=5i64));
	let options = QueryIteratorOptions {
		expr: "tag != \"\"".to_owned(),
		output_fields: vec!["tag".to_owned()],
		..query_options(2)
	};
	let mut iter = QueryIterator::new(gateway.clone(), options).await.unwrap();
	let page = iter.next().await.unwrap();
	assert!(page.iter().all(|row| row.contains_field(PK) && row.contains_field("tag")));
	iter.next().await.unwrap();
	let queries = gateway.queries();
	assert_eq!(queries[0].filter.to_string(), "tag != \"\"");
	assert_eq!(queries[1].filter.to_string(), "(tag != \"\") and id > 2");
	assert_eq!(queries[1].output_fields, vec!["tag".to_owned(), PK.to_owned()]);
}

#[test_log::test(tokio::test)]
async fn query_quotes_string_keys() {
	let gateway = Arc::new(TestGateway::with_rows(["a", "b", "c\"d", "e"]));
	let options = QueryIteratorOptions {
		batch_size: 2,
		..QueryIteratorOptions::new(str_schema())
	};
	let mut iter = QueryIterator::new(gateway.clone(), options).await.unwrap();
	assert_eq!(iter.next().await.unwrap().len(), 2);
	assert_eq!(iter.next().await.unwrap().len(), 2);
	assert!(iter.next().await.unwrap().is_empty());
	let queries = gateway.queries();
	assert_eq!(queries[1].filter.to_string(), "id > \"b\"");
	assert_eq!(queries[2].filter.to_string(), "id > \"e\"");
}

#[test_log::test(tokio::test)]
async fn query_close_is_idempotent() {
	let gateway = Arc::new(TestGateway::with_rows(1..=3i64));
	let mut iter = QueryIterator::new(gateway, query_options(2)).await.unwrap();
	iter.next().await.unwrap();
	iter.close();
	iter.close();
}

#[test_log::test(tokio::test)]
async fn query_rejects_bad_batch_sizes() {
	let gateway = Arc::new(TestGateway::with_rows(1..=3i64));
	let err = QueryIterator::new(gateway.clone(), query_options(0)).await.err().unwrap();
	assert!(matches!(err, Error::InvalidBatchSize { size: 0, .. }));
	let too_big = *cnf::MAX_BATCH_SIZE + 1;
	let err = QueryIterator::new(gateway.clone(), query_options(too_big)).await.err().unwrap();
	assert!(err.is_configuration());
	assert_eq!(gateway.call_count(), 0);
}

#[test_log::test(tokio::test)]
async fn query_propagates_remote_failures() {
	let gateway = Arc::new(TestGateway::with_rows(1..=10i64).failing_on(2));
	let mut iter = QueryIterator::new(gateway, query_options(4)).await.unwrap();
	iter.next().await.unwrap();
	let err = iter.next().await.unwrap_err();
	assert!(matches!(err, Error::RemoteCallFailed(_)));
	assert_eq!(err.source().unwrap().to_string(), "connection reset by peer");
}

#[test_log::test(tokio::test)]
async fn search_serves_seed_from_cache() {
	let seed: Vec<(i64, f32)> = (1..=10).map(|id| (id, id as f32 / 10.0)).collect();
	let gateway = Arc::new(ScriptedGateway::new([hits(&seed)]));
	let mut iter = SearchIterator::new(gateway.clone(), search_options("L2", 5)).await.unwrap();
	assert_eq!(gateway.call_count(), 1);
	assert_eq!(ids(&iter.next().await.unwrap()), vec![1, 2, 3, 4, 5]);
	assert_eq!(ids(&iter.next().await.unwrap()), vec![6, 7, 8, 9, 10]);
	assert_eq!(gateway.call_count(), 1);

	// The first ring search starts at the seed's tail and spans one seed width
	assert!(iter.next().await.unwrap().is_empty());
	let searches = gateway.searches();
	let ring = &searches[1];
	assert_eq!(ring.params.range_filter, Some(1.0));
	assert!((ring.params.radius.unwrap() - 1.9).abs() < 1e-5);
	assert_eq!(ring.filter.to_string(), "id not in [10]");
	assert_eq!(ring.limit, 5 * *cnf::SEARCH_EXTENSION_RATE);
}

#[test_log::test(tokio::test)]
async fn search_stops_after_empty_rings() {
	let gateway = Arc::new(ScriptedGateway::new([hits(&[(1, 0.1), (2, 0.2), (3, 0.3)])]));
	let mut iter = SearchIterator::new(gateway.clone(), search_options("L2", 5)).await.unwrap();
	// The short seed is returned once the ring searches give up
	assert_eq!(ids(&iter.next().await.unwrap()), vec![1, 2, 3]);
	assert_eq!(gateway.call_count(), 1 + *cnf::MAX_TRY_TIME);
	// Every ring search widens the window further
	let radii: Vec<f32> = gateway.searches()[1..].iter().map(|s| s.params.radius.unwrap()).collect();
	assert!(radii.windows(2).all(|w| w[1] > w[0]));

	assert!(iter.next().await.unwrap().is_empty());
	let calls = gateway.call_count();
	assert!(iter.next().await.unwrap().is_empty());
	assert!(iter.next().await.unwrap().is_empty());
	assert_eq!(gateway.call_count(), calls);
}

#[test_log::test(tokio::test)]
async fn search_with_empty_seed_is_empty() {
	let gateway = Arc::new(ScriptedGateway::new(Vec::<Vec<Hit>>::new()));
	let mut iter = SearchIterator::new(gateway.clone(), search_options("IP", 5)).await.unwrap();
	assert!(iter.next().await.unwrap().is_empty());
	assert!(iter.next().await.unwrap().is_empty());
	assert_eq!(gateway.call_count(), 1);
	assert_eq!(iter.returned(), 0);
}

#[test_log::test(tokio::test)]
async fn search_seed_failure_is_returned() {
	let gateway = Arc::new(TestGateway::with_hits(tied_scores(10)).failing_on(1));
	let err = SearchIterator::new(gateway, search_options("L2", 5)).await.err().unwrap();
	assert!(matches!(err, Error::RemoteCallFailed(_)));
}

#[test_log::test(tokio::test)]
async fn search_ring_failure_is_returned() {
	let gateway = Arc::new(TestGateway::with_hits(tied_scores(30)).failing_on(2));
	let mut iter = SearchIterator::new(gateway, search_options("L2", 5)).await.unwrap();
	iter.next().await.unwrap();
	let err = iter.next().await.unwrap_err();
	assert!(matches!(err, Error::RemoteCallFailed(_)));
}

#[test_log::test(tokio::test)]
async fn search_keeps_fetched_hits_across_failures() {
	let scores: Vec<(i64, f32)> = (1..=30).map(|id| (id, id as f32 * 0.1)).collect();
	for fail_on in 2..15 {
		let gateway = Arc::new(TestGateway::with_hits(scores.clone()).failing_on(fail_on));
		let mut iter = SearchIterator::new(gateway, search_options("L2", 4)).await.unwrap();
		let mut served = Vec::new();
		let mut failures = 0;
		loop {
			match iter.next().await {
				Ok(page) if page.is_empty() => break,
				Ok(page) => served.extend(ids(&page)),
				Err(err) => {
					assert!(matches!(err, Error::RemoteCallFailed(_)));
					failures += 1;
				}
			}
		}
		assert_eq!(failures, 1, "call {fail_on} did not fail");
		assert_eq!(served, (1..=30).collect::<Vec<_>>(), "hits lost when call {fail_on} failed");
	}
}

#[test_log::test(tokio::test)]
async fn search_returns_every_hit_once_in_order() {
	for metric in [Metric::L2, Metric::Ip, Metric::Cosine] {
		let gateway = Arc::new(TestGateway::with_hits(tied_scores(50)));
		let mut iter =
			SearchIterator::new(gateway.clone(), search_options(&metric.to_string(), 7)).await.unwrap();
		let all = drain_search(&mut iter).await;

		let unique: HashSet<i64> = ids(&all).into_iter().collect();
		assert_eq!(unique.len(), all.len(), "duplicate hits for {metric}");
		assert_eq!(all.len(), 50, "missing hits for {metric}");
		assert!(
			all.windows(2).all(|w| !metric.is_farther(w[0].score, w[1].score)),
			"hits out of order for {metric}"
		);
		assert_eq!(iter.returned(), 50);
		iter.close();
		iter.close();
	}
}

#[test_log::test(tokio::test)]
async fn search_stays_within_radius() {
	let gateway = Arc::new(TestGateway::with_hits(tied_scores(50)));
	let options = SearchIteratorOptions {
		params: SearchParams {
			radius: Some(2.0),
			range_filter: Some(0.5),
			..Default::default()
		},
		..search_options("L2", 4)
	};
	let mut iter = SearchIterator::new(gateway.clone(), options).await.unwrap();
	let all = drain_search(&mut iter).await;
	// Scores 0.5 to 1.75, three ids each
	assert_eq!(all.len(), 18);
	assert!(all.iter().all(|hit| hit.score >= 0.5 && hit.score < 2.0));
	assert!(gateway.searches().iter().all(|s| s.params.radius.unwrap() <= 2.0));
	// Probing ends at the radius without exhausting the try budget
	assert!(gateway.call_count() < *cnf::MAX_TRY_TIME);
}

#[test_log::test(tokio::test)]
async fn search_respects_limit() {
	let gateway = Arc::new(TestGateway::with_hits(tied_scores(50)));
	let options = SearchIteratorOptions {
		limit: Some(12),
		..search_options("L2", 5)
	};
	let mut iter = SearchIterator::new(gateway.clone(), options).await.unwrap();
	assert_eq!(iter.next().await.unwrap().len(), 5);
	assert_eq!(iter.next().await.unwrap().len(), 5);
	assert_eq!(iter.next().await.unwrap().len(), 2);
	let calls = gateway.call_count();
	assert!(iter.next().await.unwrap().is_empty());
	assert_eq!(gateway.call_count(), calls);
	assert_eq!(iter.returned(), 12);
}

#[test_log::test(tokio::test)]
async fn search_lowers_ef_to_the_call_limit() {
	let gateway = Arc::new(TestGateway::with_hits(tied_scores(50)));
	let options = SearchIteratorOptions {
		params: SearchParams {
			ef: Some(20),
			..Default::default()
		},
		..search_options("L2", 5)
	};
	let mut iter = SearchIterator::new(gateway.clone(), options).await.unwrap();
	drain_search(&mut iter).await;
	let searches = gateway.searches();
	assert_eq!((searches[0].limit, searches[0].params.ef), (5, Some(5)));
	assert!(searches[1..].iter().all(|s| s.limit == 20 && s.params.ef == Some(20)));
}

// Ties are only tracked at the latest trailing score. Once the tail moves on,
// earlier ties are kept out by the range bound alone.
#[test_log::test(tokio::test)]
async fn search_excludes_only_latest_ties() {
	let gateway = Arc::new(ScriptedGateway::new([
		hits(&[(1, 0.1), (2, 0.2), (3, 0.2)]),
		hits(&[(4, 0.2), (5, 0.3)]),
		hits(&[(6, 0.4)]),
	]));
	let mut iter = SearchIterator::new(gateway.clone(), search_options("L2", 3)).await.unwrap();
	assert_eq!(ids(&iter.next().await.unwrap()), vec![1, 2, 3]);
	assert_eq!(ids(&iter.next().await.unwrap()), vec![4, 5, 6]);
	let searches = gateway.searches();
	assert_eq!(searches[1].filter.to_string(), "id not in [2,3]");
	assert_eq!(searches[1].params.range_filter, Some(0.2));
	assert_eq!(searches[2].filter.to_string(), "id not in [5]");
	assert_eq!(searches[2].params.range_filter, Some(0.3));
}

#[test_log::test(tokio::test)]
async fn search_rejects_too_many_ties() {
	let count = *cnf::MAX_FILTERED_IDS_COUNT as i64 + 1;
	let seed: Vec<Hit> = (0..count).map(|id| Hit::new(id, 0.5, Row::new())).collect();
	let gateway = Arc::new(ScriptedGateway::new([seed]));
	let err = SearchIterator::new(gateway, search_options("L2", 5)).await.err().unwrap();
	assert!(matches!(err, Error::TooManyFilteredIds { count: c, .. } if c == count as usize));
}

#[test_log::test(tokio::test)]
async fn search_validates_range_for_metric() {
	let options = |metric: &str, radius, range_filter| SearchIteratorOptions {
		params: SearchParams {
			radius: Some(radius),
			range_filter: Some(range_filter),
			..Default::default()
		},
		..search_options(metric, 5)
	};
	let gateway = Arc::new(TestGateway::with_hits(tied_scores(10)));

	let err = SearchIterator::new(gateway.clone(), options("IP", 10.0, 5.0)).await.err().unwrap();
	assert!(matches!(err, Error::InvalidRange { metric: Metric::Ip, .. }));
	assert!(err.to_string().contains("radius must be smaller than range_filter"));
	let err = SearchIterator::new(gateway.clone(), options("L2", 5.0, 10.0)).await.err().unwrap();
	assert!(err.to_string().contains("radius must be larger than range_filter"));
	assert_eq!(gateway.call_count(), 0);

	assert!(SearchIterator::new(gateway.clone(), options("IP", 5.0, 10.0)).await.is_ok());
	assert!(SearchIterator::new(gateway.clone(), options("L2", 10.0, 5.0)).await.is_ok());
}

#[test_log::test(tokio::test)]
async fn search_validates_options() {
	let gateway = Arc::new(TestGateway::with_hits(tied_scores(10)));
	let check = |options: SearchIteratorOptions| {
		let gateway = gateway.clone();
		async move { SearchIterator::new(gateway, options).await.err().unwrap() }
	};

	let err = check(search_options("", 5)).await;
	assert!(matches!(err, Error::MissingMetric));
	let err = check(search_options("BM25", 5)).await;
	assert!(matches!(err, Error::UnsupportedMetric(_)));
	let err = check(search_options("L2", 0)).await;
	assert!(matches!(err, Error::InvalidBatchSize { .. }));
	let err = check(SearchIteratorOptions {
		vectors: vec![vec![0.0; DIM], vec![1.0; DIM]],
		..search_options("L2", 5)
	})
	.await;
	assert!(matches!(err, Error::VectorCount(2)));
	let err = check(SearchIteratorOptions {
		anns_field: "tag".to_owned(),
		..search_options("L2", 5)
	})
	.await;
	assert!(matches!(err, Error::InvalidVectorField(f) if f == "tag"));
	let err = check(SearchIteratorOptions {
		vectors: vec![vec![0.0; DIM + 1]],
		..search_options("L2", 5)
	})
	.await;
	assert!(matches!(err, Error::DimensionMismatch { expected: DIM, found: 3, .. }));
	let err = check(SearchIteratorOptions {
		params: SearchParams {
			ef: Some(3),
			..Default::default()
		},
		..search_options("L2", 5)
	})
	.await;
	assert!(matches!(err, Error::EfTooSmall { ef: 3, batch_size: 5 }));
	assert_eq!(gateway.call_count(), 0);
}
