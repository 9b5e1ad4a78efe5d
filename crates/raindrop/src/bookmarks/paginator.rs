//! Bounded concurrent pagination over the search endpoint
//!
//! Page 0 is fetched alone to learn the total. The remaining pages go out in
//! batches of at most `pacing.cap()` requests, gated by a semaphore, with
//! `pacing.batch_delay` between batches. Each page lands in its own slot so
//! the output is ordered by page number no matter which request finishes
//! first.

use futures::stream::{FuturesUnordered, StreamExt};
use log::{debug, info, warn};
use raindrop_core::bookmarks::SearchQuery;
use raindrop_core::error::ApiError;
use raindrop_core::pagination::{
    assemble, batches, pages_to_request, AggregatedResult, Pacing, PageResult,
};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use super::Gateway;

/// Fetch every page of `query`
///
/// Non-fatal page failures leave a gap and make the result partial. Fatal
/// errors (auth, schema, unexpected status) abort the whole aggregation.
/// Cancellation stops dispatching, drops in-flight requests and returns what
/// was collected so far with `cancelled` set.
pub async fn fetch_all(
    gateway: &dyn Gateway,
    query: &SearchQuery,
    pacing: &Pacing,
    cancel: &CancellationToken,
) -> Result<AggregatedResult, ApiError> {
    info!("fetching {}", query.describe());

    let first_page = if query.first_page_only {
        query.start_page
    } else {
        0
    };

    let first = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            let mut result = assemble(vec![None], 0, true);
            result.failed_pages = vec![first_page];
            return Ok(result);
        }
        first = fetch_page(gateway, query, first_page, pacing) => first?,
    };

    let total_reported = first.count;
    let total = if query.first_page_only {
        1
    } else {
        pages_to_request(first.count, query.page_size(), query.max_pages)
    };

    let mut slots: Vec<Option<PageResult>> = vec![None; total as usize];
    slots[0] = Some(first);

    if total == 1 {
        return Ok(assemble(slots, total_reported, false));
    }

    debug!("{total_reported} bookmarks reported, {total} page(s) to fetch");

    let cap = pacing.cap();
    let permits = Semaphore::new(cap);
    let plan = batches(total, cap);
    let mut cancelled = false;

    'batches: for (index, batch) in plan.iter().enumerate() {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }

        debug!("dispatching pages {batch:?}");

        let mut in_flight: FuturesUnordered<_> = batch
            .iter()
            .map(|&page| {
                let permits = &permits;
                async move {
                    let result = match permits.acquire().await {
                        Ok(_permit) => fetch_page(gateway, query, page, pacing).await,
                        Err(e) => Err(ApiError::Transient(format!("permit pool closed: {e}"))),
                    };
                    (page, result)
                }
            })
            .collect();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break 'batches;
                }
                next = in_flight.next() => match next {
                    None => break,
                    Some((page, Ok(result))) => slots[page as usize] = Some(result),
                    Some((page, Err(err))) if err.is_fatal() => {
                        warn!("page {page} failed, aborting: {err}");
                        return Err(err);
                    }
                    Some((page, Err(err))) => warn!("page {page} failed: {err}"),
                },
            }
        }

        if index + 1 < plan.len() && !pacing.batch_delay.is_zero() {
            debug!("waiting {:?} before the next batch", pacing.batch_delay);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
                _ = tokio::time::sleep(pacing.batch_delay) => {}
            }
        }
    }

    let result = assemble(slots, total_reported, cancelled);
    info!("{}", result.summary());
    Ok(result)
}

/// Fetch one page, retrying per the pacing policy
///
/// A 429 waits for the server hint (or the default) and is retried once.
/// Transient failures are retried `transient_retries` times.
async fn fetch_page(
    gateway: &dyn Gateway,
    query: &SearchQuery,
    page: u32,
    pacing: &Pacing,
) -> Result<PageResult, ApiError> {
    let mut rate_limited = false;
    let mut transient_attempts = 0;

    loop {
        match gateway.search_page(query, page).await {
            Ok(result) => return Ok(result),
            Err(ApiError::RateLimited { retry_after }) if !rate_limited => {
                rate_limited = true;
                let wait = retry_after.unwrap_or(pacing.rate_limit_wait);
                warn!("page {page} rate limited, retrying in {wait:?}");
                tokio::time::sleep(wait).await;
            }
            Err(ApiError::Transient(message)) if transient_attempts < pacing.transient_retries => {
                transient_attempts += 1;
                debug!(
                    "page {page} attempt {transient_attempts} failed ({message}), retrying in {:?}",
                    pacing.transient_backoff
                );
                tokio::time::sleep(pacing.transient_backoff).await;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bookmarks::fake::FakeGateway;
    use raindrop_core::pagination::FetchStatus;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::time::Instant;

    fn pacing(cap: usize) -> Pacing {
        Pacing::default().with_concurrency(cap)
    }

    fn ids(result: &AggregatedResult) -> Vec<i64> {
        result.items.iter().map(|b| b.id).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetches_exactly_total_bookmarks() {
        let gateway = FakeGateway::with_total(120);

        let result = fetch_all(
            &gateway,
            &SearchQuery::default(),
            &pacing(10),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(result.status, FetchStatus::Complete);
        assert_eq!(result.items.len(), 120);
        assert_eq!(ids(&result), (0..120).collect::<Vec<_>>());
        assert_eq!(result.pages_requested, 3);
        assert_eq!(result.total_reported, 120);
    }

    #[tokio::test(start_paused = true)]
    async fn test_preserves_page_order_under_inverted_latency() {
        let mut gateway = FakeGateway::with_total(500);
        for page in 1..10 {
            gateway = gateway.delay_page(page, Duration::from_millis(100 * (10 - page as u64)));
        }

        let result = fetch_all(
            &gateway,
            &SearchQuery::default(),
            &pacing(10),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(result.is_complete());
        assert_eq!(ids(&result), (0..500).collect::<Vec<_>>());
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_exceeds_concurrency_cap() {
        let mut gateway = FakeGateway::with_total(1000);
        for page in 0..20 {
            gateway = gateway.delay_page(page, Duration::from_millis(50));
        }

        let result = fetch_all(
            &gateway,
            &SearchQuery::default(),
            &pacing(3),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(result.is_complete());
        assert_eq!(result.items.len(), 1000);
        assert!(gateway.max_in_flight() <= 3);
        assert_eq!(gateway.max_in_flight(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_waits_between_batches() {
        let gateway = FakeGateway::with_total(250);

        fetch_all(
            &gateway,
            &SearchQuery::default(),
            &pacing(2),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        // Batches: [1, 2], [3, 4]
        let first_batch = gateway.calls_for(1)[0];
        let second_batch = gateway.calls_for(3)[0];
        assert!(second_batch - first_batch >= Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limited_page_is_retried_once_after_hint() {
        let hint = Duration::from_secs(7);
        let gateway = FakeGateway::with_total(150).fail_page(
            2,
            vec![ApiError::RateLimited {
                retry_after: Some(hint),
            }],
        );

        let result = fetch_all(
            &gateway,
            &SearchQuery::default(),
            &pacing(10),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(result.is_complete());
        assert_eq!(result.items.len(), 150);

        let calls = gateway.calls_for(2);
        assert_eq!(calls.len(), 2);
        assert!(calls[1] - calls[0] >= hint);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_without_hint_uses_default_wait() {
        let gateway = FakeGateway::with_total(100).fail_page(
            1,
            vec![
                ApiError::RateLimited { retry_after: None },
                ApiError::RateLimited { retry_after: None },
            ],
        );
        let pacing = pacing(10);

        let result = fetch_all(
            &gateway,
            &SearchQuery::default(),
            &pacing,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let calls = gateway.calls_for(1);
        assert_eq!(calls.len(), 2);
        assert!(calls[1] - calls[0] >= pacing.rate_limit_wait);
        assert_eq!(result.status, FetchStatus::Partial);
        assert_eq!(result.failed_pages, vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_transient_failure_marks_page_failed() {
        let transient = || ApiError::Transient("HTTP 503".to_string());
        let gateway =
            FakeGateway::with_total(200).fail_page(2, vec![transient(), transient(), transient()]);

        let result = fetch_all(
            &gateway,
            &SearchQuery::default(),
            &pacing(10),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(result.status, FetchStatus::Partial);
        assert_eq!(result.failed_pages, vec![2]);
        assert_eq!(gateway.calls_for(2).len(), 3);
        assert_eq!(
            ids(&result),
            (0..100).chain(150..200).collect::<Vec<_>>()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_recovers_within_retries() {
        let gateway = FakeGateway::with_total(100).fail_page(
            1,
            vec![
                ApiError::Transient("timeout".to_string()),
                ApiError::Transient("timeout".to_string()),
            ],
        );

        let result = fetch_all(
            &gateway,
            &SearchQuery::default(),
            &pacing(10),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert!(result.is_complete());
        assert_eq!(result.items.len(), 100);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auth_failure_aborts() {
        let gateway = FakeGateway::with_total(300)
            .fail_page(3, vec![ApiError::Auth("HTTP 401: bad token".to_string())]);

        let err = fetch_all(
            &gateway,
            &SearchQuery::default(),
            &pacing(10),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert_eq!(err, ApiError::Auth("HTTP 401: bad token".to_string()));
        assert_eq!(gateway.calls_for(3).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_page_failure_surfaces() {
        let gateway = FakeGateway::with_total(300).fail_page(
            0,
            vec![ApiError::Status {
                status: 404,
                message: "Collection not found".to_string(),
            }],
        );

        let err = fetch_all(
            &gateway,
            &SearchQuery::collection(42),
            &pacing(10),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ApiError::Status { status: 404, .. }));
        assert_eq!(gateway.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_page_only_issues_one_request_without_delay() {
        let gateway = FakeGateway::with_total(5000);
        let query = SearchQuery {
            first_page_only: true,
            ..SearchQuery::keyword("rust")
        };
        let started = Instant::now();

        let result = fetch_all(&gateway, &query, &pacing(10), &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.is_complete());
        assert_eq!(result.items.len(), 50);
        assert_eq!(result.total_reported, 5000);
        assert_eq!(gateway.calls().len(), 1);
        assert_eq!(Instant::now(), started);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_page_only_fetches_the_start_page() {
        let gateway = FakeGateway::with_total(120);
        let query = SearchQuery {
            first_page_only: true,
            start_page: 2,
            ..SearchQuery::keyword("rust")
        };

        let result = fetch_all(&gateway, &query, &pacing(10), &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.is_complete());
        let ids: Vec<i64> = result.items.iter().map(|b| b.id).collect();
        assert_eq!(ids, (100..120).collect::<Vec<_>>());
        assert_eq!(result.total_reported, 120);
        assert_eq!(gateway.calls().len(), 1);
        assert_eq!(gateway.calls_for(2).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_pages_limits_requests() {
        let gateway = FakeGateway::with_total(5000);
        let query = SearchQuery {
            max_pages: Some(3),
            ..SearchQuery::default()
        };

        let result = fetch_all(&gateway, &query, &pacing(10), &CancellationToken::new())
            .await
            .unwrap();

        assert!(result.is_complete());
        assert_eq!(result.pages_requested, 3);
        assert_eq!(result.items.len(), 150);
        assert_eq!(gateway.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_further_batches() {
        let gateway = Arc::new(FakeGateway::with_total(300));
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(3)).await;
            trigger.cancel();
        });

        let result = fetch_all(gateway.as_ref(), &SearchQuery::default(), &pacing(2), &cancel)
            .await
            .unwrap();

        assert!(result.cancelled);
        assert_eq!(result.status, FetchStatus::Partial);
        assert_eq!(result.failed_pages, vec![3, 4, 5]);
        assert_eq!(ids(&result), (0..150).collect::<Vec<_>>());
        assert!(gateway.calls_for(3).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_start() {
        let gateway = FakeGateway::with_total(100);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = fetch_all(&gateway, &SearchQuery::default(), &pacing(2), &cancel)
            .await
            .unwrap();

        assert!(result.cancelled);
        assert_eq!(result.failed_pages, vec![0]);
        assert!(result.items.is_empty());
    }
}
