#![allow(missing_docs)]

use std::sync::Arc;

use pagekit::{
    pagination::navigation, CursorPaginator, NewRecord, OffsetPaginator, PageError, RecordStore,
    SqliteStore,
};
use proptest::prelude::*;
use tokio_util::sync::CancellationToken;

fn store_with(n: usize) -> Arc<SqliteStore> {
    let store = SqliteStore::open_in_memory().expect("open store");
    let records: Vec<NewRecord> = (0..n)
        .map(|i| NewRecord::new(format!("n{i}"), format!("s{i}")))
        .collect();
    store
        .bulk_insert(&records, &CancellationToken::new())
        .expect("seed");
    Arc::new(store)
}

fn ids(page: &[pagekit::Record]) -> Vec<i64> {
    page.iter().map(|r| r.id).collect()
}

#[test]
fn cursor_scenario_from_one_hundred_records() {
    let pager = CursorPaginator::new(store_with(100));
    let page = pager
        .retrieve(10, 10, &CancellationToken::new())
        .expect("page");
    assert_eq!(ids(&page.users), vec![9, 8, 7, 6, 5, 4, 3, 2, 1]);
    assert_eq!(page.next_cursor, Some(1));
}

#[test]
fn offset_scenario_from_forty_five_records() {
    let pager = OffsetPaginator::new(store_with(45));
    let page = pager
        .retrieve(1, 10, &CancellationToken::new())
        .expect("page");
    assert_eq!(ids(&page.users), (1..=10).collect::<Vec<_>>());
    let nav = page.pagination;
    assert_eq!(nav.total_pages, 5);
    assert_eq!(nav.current_page, 1);
    assert_eq!(nav.prev_page, 1);
    assert_eq!(nav.next_page, 2);
}

#[test]
fn offset_on_empty_store() {
    let pager = OffsetPaginator::new(store_with(0));
    let page = pager
        .retrieve(1, 10, &CancellationToken::new())
        .expect("page");
    assert!(page.users.is_empty());
    assert_eq!(page.pagination.total_pages, 0);
    assert_eq!(page.pagination.next_page, 0);
    assert_eq!(page.pagination.prev_page, 1);
}

#[test]
fn cursor_past_the_oldest_record_is_exhausted() {
    let pager = CursorPaginator::new(store_with(20));
    let page = pager
        .retrieve(2, 10, &CancellationToken::new())
        .expect("page");
    assert_eq!(ids(&page.users), vec![1]);

    let empty = CursorPaginator::new(store_with(0))
        .retrieve(0, 10, &CancellationToken::new())
        .expect("page");
    assert!(empty.users.is_empty());
    assert_eq!(empty.next_cursor, None);
}

#[test]
fn both_strategies_reject_non_positive_limits() {
    let store = store_with(5);
    let cancel = CancellationToken::new();
    let cursor = CursorPaginator::new(store.clone()).retrieve(0, 0, &cancel);
    assert!(matches!(cursor, Err(PageError::InvalidLimit(0))));
    let offset = OffsetPaginator::new(store).retrieve(1, -10, &cancel);
    assert!(matches!(offset, Err(PageError::InvalidLimit(-10))));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_low_cursor_returns_newest(total in 0usize..120, limit in 1i64..40, cursor in -50i64..=1) {
        let pager = CursorPaginator::new(store_with(total));
        let page = pager.retrieve(cursor, limit, &CancellationToken::new()).unwrap();
        let expected: Vec<i64> = (1..=total as i64).rev().take(limit as usize).collect();
        prop_assert_eq!(ids(&page.users), expected);
    }

    #[test]
    fn prop_cursor_page_is_bounded_and_descending(
        total in 0usize..120,
        limit in 1i64..40,
        cursor in 2i64..200,
    ) {
        let pager = CursorPaginator::new(store_with(total));
        let page = pager.retrieve(cursor, limit, &CancellationToken::new()).unwrap();
        let got = ids(&page.users);
        prop_assert!(got.len() as i64 <= limit);
        prop_assert!(got.iter().all(|id| *id < cursor));
        prop_assert!(got.windows(2).all(|w| w[0] > w[1]));
        prop_assert_eq!(page.next_cursor, got.iter().copied().min());
    }

    #[test]
    fn prop_cursor_walk_visits_every_record_once(total in 0usize..150, limit in 1i64..25) {
        let pager = CursorPaginator::new(store_with(total));
        let cancel = CancellationToken::new();
        let mut seen = Vec::new();
        let mut cursor = 0;
        loop {
            let page = pager.retrieve(cursor, limit, &cancel).unwrap();
            seen.extend(ids(&page.users));
            match page.next_cursor {
                // A cursor of 1 would restart from the newest record.
                Some(next) if next > 1 => cursor = next,
                _ => break,
            }
        }
        let expected: Vec<i64> = (1..=total as i64).rev().collect();
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn prop_offset_page_matches_rank_window(total in 0usize..120, page in 1i64..15, limit in 1i64..30) {
        let pager = OffsetPaginator::new(store_with(total));
        let result = pager.retrieve(page, limit, &CancellationToken::new()).unwrap();
        let offset = (page - 1) * limit;
        let expected: Vec<i64> = (1..=total as i64)
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        prop_assert_eq!(ids(&result.users), expected);
        prop_assert_eq!(result.pagination, navigation(page, limit, total as u64));
    }

    #[test]
    fn prop_navigation_invariants(total in 0u64..100_000, page in -10i64..5_000, limit in 1i64..500) {
        let nav = navigation(page, limit, total);
        let expected_pages = (total + limit as u64 - 1) / limit as u64;
        prop_assert_eq!(nav.total_pages, expected_pages);
        prop_assert_eq!(nav.current_page, page.max(1) as u64);
        prop_assert!(nav.next_page <= nav.total_pages);
        prop_assert!(nav.prev_page >= 1);
        if nav.current_page < nav.total_pages {
            prop_assert_eq!(nav.next_page, nav.current_page + 1);
        } else {
            prop_assert_eq!(nav.next_page, nav.total_pages);
        }
        prop_assert_eq!(nav.prev_page, nav.current_page.saturating_sub(1).max(1));
    }

    #[test]
    fn prop_repeated_requests_are_identical(total in 0usize..80, cursor in -5i64..100, page in 0i64..10, limit in 1i64..20) {
        let store = store_with(total);
        let cancel = CancellationToken::new();
        let cursor_pager = CursorPaginator::new(store.clone());
        let offset_pager = OffsetPaginator::new(store);

        let a = serde_json::to_vec(&cursor_pager.retrieve(cursor, limit, &cancel).unwrap()).unwrap();
        let b = serde_json::to_vec(&cursor_pager.retrieve(cursor, limit, &cancel).unwrap()).unwrap();
        prop_assert_eq!(a, b);

        let a = serde_json::to_vec(&offset_pager.retrieve(page, limit, &cancel).unwrap()).unwrap();
        let b = serde_json::to_vec(&offset_pager.retrieve(page, limit, &cancel).unwrap()).unwrap();
        prop_assert_eq!(a, b);
    }
}
