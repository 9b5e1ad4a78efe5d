use std::time::Duration;

use crate::analytics::{HttpProber, LinkProber, PROBE_TIMEOUT};
use crate::prelude::{eprintln, *};
use raindrop_core::pagination::Pacing;
use serde::Deserialize;

use super::{parse_args, tool_output, JsonRpcError, ServerContext};

#[derive(Debug, Deserialize)]
struct CollectionArgs {
    #[serde(default)]
    collection_id: i64,
}

fn prober(timeout: Duration) -> Result<HttpProber, ErrorDescriptor> {
    HttpProber::new(timeout).map_err(|e| ErrorDescriptor::new(ErrorKind::Transient, e.to_string()))
}

pub async fn handle_tag_statistics(
    arguments: Option<serde_json::Value>,
    context: &ServerContext,
) -> Result<serde_json::Value, JsonRpcError> {
    let outcome = async {
        let args: CollectionArgs = parse_args(arguments)?;

        if context.global.verbose {
            eprintln!("Calling tag_statistics: collection_id={}", args.collection_id);
        }

        let session = context.session()?;
        Ok::<_, ErrorDescriptor>(
            crate::analytics::tag_statistics_data(session, args.collection_id).await?,
        )
    }
    .await;

    tool_output(outcome)
}

pub async fn handle_find_duplicates(
    arguments: Option<serde_json::Value>,
    context: &ServerContext,
) -> Result<serde_json::Value, JsonRpcError> {
    let outcome = async {
        let args: CollectionArgs = parse_args(arguments)?;

        if context.global.verbose {
            eprintln!("Calling find_duplicates: collection_id={}", args.collection_id);
        }

        let session = context.session()?;
        Ok::<_, ErrorDescriptor>(
            crate::analytics::duplicates_data(session, args.collection_id).await?,
        )
    }
    .await;

    tool_output(outcome)
}

pub async fn handle_find_untagged(
    arguments: Option<serde_json::Value>,
    context: &ServerContext,
) -> Result<serde_json::Value, JsonRpcError> {
    let outcome = async {
        let args: CollectionArgs = parse_args(arguments)?;

        if context.global.verbose {
            eprintln!("Calling find_untagged: collection_id={}", args.collection_id);
        }

        let session = context.session()?;
        Ok::<_, ErrorDescriptor>(
            crate::analytics::untagged_data(session, args.collection_id).await?,
        )
    }
    .await;

    tool_output(outcome)
}

#[derive(Debug, Deserialize)]
struct BrokenLinksArgs {
    #[serde(default)]
    collection_id: i64,
    /// Seconds
    #[serde(default)]
    timeout: Option<u64>,
}

pub async fn handle_find_broken_links(
    arguments: Option<serde_json::Value>,
    context: &ServerContext,
) -> Result<serde_json::Value, JsonRpcError> {
    let outcome = async {
        let args: BrokenLinksArgs = parse_args(arguments)?;
        let timeout = args
            .timeout
            .map(|secs| Duration::from_secs(secs.max(1)))
            .unwrap_or(PROBE_TIMEOUT);

        if context.global.verbose {
            eprintln!(
                "Calling find_broken_links: collection_id={}, timeout={}s",
                args.collection_id,
                timeout.as_secs()
            );
        }

        let session = context.session()?;
        let prober = prober(timeout)?;
        Ok::<_, ErrorDescriptor>(
            crate::analytics::broken_links_data(
                session,
                &prober,
                &Pacing::for_probes(),
                args.collection_id,
            )
            .await?,
        )
    }
    .await;

    tool_output(outcome)
}

#[derive(Debug, Deserialize)]
struct StatisticsArgs {
    #[serde(default)]
    collection_id: i64,
    #[serde(default)]
    check_links: bool,
}

pub async fn handle_get_statistics(
    arguments: Option<serde_json::Value>,
    context: &ServerContext,
) -> Result<serde_json::Value, JsonRpcError> {
    let outcome = async {
        let args: StatisticsArgs = parse_args(arguments)?;

        if context.global.verbose {
            eprintln!(
                "Calling get_statistics: collection_id={}, check_links={}",
                args.collection_id, args.check_links
            );
        }

        let session = context.session()?;
        let output = if args.check_links {
            let prober = prober(PROBE_TIMEOUT)?;
            let prober: &dyn LinkProber = &prober;
            let pacing = Pacing::for_probes();
            crate::analytics::statistics_data(session, Some((prober, &pacing)), args.collection_id)
                .await?
        } else {
            crate::analytics::statistics_data(session, None, args.collection_id).await?
        };

        Ok::<_, ErrorDescriptor>(output)
    }
    .await;

    tool_output(outcome)
}

#[cfg(test)]
mod tests {
    use super::super::tests::{call, context};
    use crate::bookmarks::fake::{bookmark, FakeGateway};
    use raindrop_core::error::ApiError;

    fn library() -> FakeGateway {
        FakeGateway::with_library(vec![
            bookmark(1, "https://example.com/page", &["ai", "tools"]),
            bookmark(2, "http://Example.com/page/", &["ai"]),
            bookmark(3, "https://example.com/page?utm_source=x", &["tools"]),
            bookmark(4, "https://other.example/", &[]),
        ])
    }

    #[tokio::test]
    async fn test_find_duplicates() {
        let context = context(library());

        let (payload, is_error) = call(
            &context,
            serde_json::json!({"name": "find_duplicates", "arguments": {"collection_id": 0}}),
        )
        .await;

        assert!(!is_error);
        assert_eq!(payload["status"], "complete");
        assert_eq!(payload["duplicate_urls"], 1);
        assert_eq!(payload["redundant"], 2);
        assert_eq!(payload["clusters"][0]["members"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_tag_statistics() {
        let context = context(library());

        let (payload, _) = call(&context, serde_json::json!({"name": "tag_statistics"})).await;

        let tags = payload["tags"].as_array().unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0]["tag"], "ai");
        assert_eq!(tags[0]["count"], 2);
        assert_eq!(tags[1]["tag"], "tools");
        assert_eq!(tags[1]["count"], 2);
    }

    #[tokio::test]
    async fn test_get_statistics_without_probing() {
        let context = context(library());

        let (payload, is_error) = call(&context, serde_json::json!({"name": "get_statistics"})).await;

        assert!(!is_error);
        assert_eq!(payload["statistics"]["total"], 4);
        assert_eq!(payload["statistics"]["untagged"], 1);
        assert!(payload["statistics"]["broken"].is_null());
        assert_eq!(payload["untagged_percentage"], 25);
    }

    #[tokio::test(start_paused = true)]
    async fn test_partial_scan_is_not_an_error() {
        let context = context(FakeGateway::with_total(120).fail_page(
            1,
            vec![ApiError::Transient("reset".to_string()); 3],
        ));

        let (payload, is_error) = call(&context, serde_json::json!({"name": "find_untagged"})).await;

        assert!(!is_error);
        assert_eq!(payload["status"], "partial");
        assert_eq!(payload["failed_pages"], serde_json::json!([1]));
        assert_eq!(payload["scanned"], 70);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_on_first_page_is_reported() {
        let context = context(FakeGateway::with_total(10).fail_page(
            0,
            vec![
                ApiError::RateLimited { retry_after: None },
                ApiError::RateLimited { retry_after: None },
            ],
        ));

        let (payload, is_error) =
            call(&context, serde_json::json!({"name": "find_duplicates"})).await;

        assert!(is_error);
        assert_eq!(payload["kind"], "rate_limited");
    }
}
