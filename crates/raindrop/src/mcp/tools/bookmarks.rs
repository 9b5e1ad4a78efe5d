use crate::prelude::{eprintln, *};
use raindrop_core::bookmarks::{extract_bookmark_id, SearchQuery, COLLECTION_ALL, MAX_PER_PAGE};
use serde::Deserialize;

use super::{parse_args, tool_output, JsonRpcError, ServerContext};

/// Page size of a single-page search when none is given
const DEFAULT_PER_PAGE: u32 = 25;

fn default_true() -> bool {
    true
}

fn default_min_count() -> u64 {
    1
}

#[derive(Debug, Deserialize)]
struct SearchBookmarksArgs {
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    collection_id: Option<i64>,
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    per_page: Option<u32>,
    #[serde(default)]
    sort: Option<String>,
    #[serde(default)]
    fetch_all: bool,
    #[serde(default)]
    max_pages: Option<u32>,
}

impl SearchBookmarksArgs {
    fn into_query(self) -> SearchQuery {
        let defaults = SearchQuery::default();
        let default_per_page = if self.fetch_all {
            MAX_PER_PAGE
        } else {
            DEFAULT_PER_PAGE
        };

        SearchQuery {
            keyword: self.query.filter(|q| !q.trim().is_empty()),
            tags: self.tags,
            collection_id: self.collection_id.unwrap_or(COLLECTION_ALL),
            per_page: self.per_page.unwrap_or(default_per_page),
            max_pages: self.max_pages,
            first_page_only: !self.fetch_all,
            start_page: if self.fetch_all { 0 } else { self.page.unwrap_or(0) },
            sort: self.sort.unwrap_or(defaults.sort),
        }
    }
}

pub async fn handle_search_bookmarks(
    arguments: Option<serde_json::Value>,
    context: &ServerContext,
) -> Result<serde_json::Value, JsonRpcError> {
    let outcome = async {
        let args: SearchBookmarksArgs = parse_args(arguments)?;
        let query = args.into_query();

        if context.global.verbose {
            eprintln!("Calling search_bookmarks: {}", query.describe());
        }

        let session = context.session()?;
        Ok::<_, ErrorDescriptor>(crate::bookmarks::search::search_data(session, &query).await?)
    }
    .await;

    tool_output(outcome)
}

/// Bookmark reference given either as a number or as text
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BookmarkRef {
    Id(i64),
    Text(String),
}

#[derive(Debug, Deserialize)]
struct GetBookmarkArgs {
    raindrop_id: BookmarkRef,
}

pub async fn handle_get_bookmark(
    arguments: Option<serde_json::Value>,
    context: &ServerContext,
) -> Result<serde_json::Value, JsonRpcError> {
    let outcome = async {
        let args: GetBookmarkArgs = parse_args(arguments)?;
        let id = match args.raindrop_id {
            BookmarkRef::Id(id) => id,
            BookmarkRef::Text(text) => extract_bookmark_id(&text)
                .map_err(|e| ErrorDescriptor::new(ErrorKind::InvalidArguments, e))?,
        };

        if context.global.verbose {
            eprintln!("Calling get_bookmark: id={id}");
        }

        let session = context.session()?;
        Ok::<_, ErrorDescriptor>(crate::bookmarks::get::get_bookmark_data(session, id).await?)
    }
    .await;

    tool_output(outcome)
}

#[derive(Debug, Deserialize)]
struct ListCollectionsArgs {
    #[serde(default = "default_true")]
    include_children: bool,
}

pub async fn handle_list_collections(
    arguments: Option<serde_json::Value>,
    context: &ServerContext,
) -> Result<serde_json::Value, JsonRpcError> {
    let outcome = async {
        let args: ListCollectionsArgs = parse_args(arguments)?;

        if context.global.verbose {
            eprintln!(
                "Calling list_collections: include_children={}",
                args.include_children
            );
        }

        let session = context.session()?;
        Ok::<_, ErrorDescriptor>(
            crate::bookmarks::collections::list_collections_data(session, args.include_children)
                .await?,
        )
    }
    .await;

    tool_output(outcome)
}

#[derive(Debug, Deserialize)]
struct ListTagsArgs {
    #[serde(default)]
    collection_id: i64,
    #[serde(default = "default_min_count")]
    min_count: u64,
}

pub async fn handle_list_tags(
    arguments: Option<serde_json::Value>,
    context: &ServerContext,
) -> Result<serde_json::Value, JsonRpcError> {
    let outcome = async {
        let args: ListTagsArgs = parse_args(arguments)?;

        if context.global.verbose {
            eprintln!(
                "Calling list_tags: collection_id={}, min_count={}",
                args.collection_id, args.min_count
            );
        }

        let session = context.session()?;
        Ok::<_, ErrorDescriptor>(
            crate::bookmarks::tags::list_tags_data(session, args.collection_id, args.min_count)
                .await?,
        )
    }
    .await;

    tool_output(outcome)
}

#[cfg(test)]
mod tests {
    use super::super::tests::{call, context};
    use crate::bookmarks::fake::{bookmark, FakeGateway};
    use raindrop_core::bookmarks::Collection;

    #[tokio::test]
    async fn test_search_first_page_by_default() {
        let context = context(FakeGateway::with_total(120));

        let (payload, is_error) = call(
            &context,
            serde_json::json!({"name": "search_bookmarks", "arguments": {"query": "rust"}}),
        )
        .await;

        assert!(!is_error);
        assert_eq!(payload["status"], "complete");
        assert_eq!(payload["items"].as_array().unwrap().len(), 25);
        assert_eq!(payload["total_reported"], 120);
    }

    #[tokio::test]
    async fn test_search_requested_page() {
        let context = context(FakeGateway::with_total(120));

        let (payload, is_error) = call(
            &context,
            serde_json::json!({
                "name": "search_bookmarks",
                "arguments": {"query": "rust", "page": 1}
            }),
        )
        .await;

        assert!(!is_error);
        let ids: Vec<i64> = payload["items"]
            .as_array()
            .unwrap()
            .iter()
            .map(|item| item["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, (25..50).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_search_fetch_all() {
        let context = context(FakeGateway::with_total(120));

        let (payload, _) = call(
            &context,
            serde_json::json!({
                "name": "search_bookmarks",
                "arguments": {"query": "rust", "fetch_all": true}
            }),
        )
        .await;

        assert_eq!(payload["items"].as_array().unwrap().len(), 120);
        assert_eq!(payload["items"][119]["id"], 119);
    }

    #[tokio::test]
    async fn test_get_bookmark_by_url() {
        let context = context(FakeGateway::with_library(vec![bookmark(
            123456,
            "https://example.com",
            &["rust"],
        )]));

        let (payload, is_error) = call(
            &context,
            serde_json::json!({
                "name": "get_bookmark",
                "arguments": {"raindrop_id": "https://app.raindrop.io/my/0/item/123456"}
            }),
        )
        .await;

        assert!(!is_error);
        assert_eq!(payload["id"], 123456);
        assert_eq!(payload["url"], "https://example.com");
    }

    #[tokio::test]
    async fn test_get_bookmark_by_number() {
        let context = context(FakeGateway::with_library(vec![bookmark(7, "https://seven.example", &[])]));

        let (payload, is_error) = call(
            &context,
            serde_json::json!({"name": "get_bookmark", "arguments": {"raindrop_id": 7}}),
        )
        .await;

        assert!(!is_error);
        assert_eq!(payload["id"], 7);
    }

    #[tokio::test]
    async fn test_get_bookmark_invalid_id() {
        let context = context(FakeGateway::default());

        let (payload, is_error) = call(
            &context,
            serde_json::json!({"name": "get_bookmark", "arguments": {"raindrop_id": "not-an-id"}}),
        )
        .await;

        assert!(is_error);
        assert_eq!(payload["kind"], "invalid_arguments");
    }

    #[tokio::test]
    async fn test_get_bookmark_not_found() {
        let context = context(FakeGateway::default());

        let (payload, is_error) = call(
            &context,
            serde_json::json!({"name": "get_bookmark", "arguments": {"raindrop_id": 99}}),
        )
        .await;

        assert!(is_error);
        assert_eq!(payload["kind"], "http");
    }

    #[tokio::test]
    async fn test_list_collections_includes_children_by_default() {
        let collections = vec![
            Collection {
                id: 1,
                title: "Dev".to_string(),
                count: 3,
                parent_id: None,
            },
            Collection {
                id: 2,
                title: "Rust".to_string(),
                count: 2,
                parent_id: Some(1),
            },
        ];
        let context = context(FakeGateway::default().with_collections(collections));

        let (payload, _) = call(&context, serde_json::json!({"name": "list_collections"})).await;
        assert_eq!(payload.as_array().unwrap().len(), 2);

        let (payload, _) = call(
            &context,
            serde_json::json!({"name": "list_collections", "arguments": {"include_children": false}}),
        )
        .await;
        assert_eq!(payload.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_tags_min_count() {
        let context =
            context(FakeGateway::default().with_tags(&[("rust", 5), ("go", 1), ("ai", 3)]));

        let (payload, _) = call(
            &context,
            serde_json::json!({"name": "list_tags", "arguments": {"min_count": 2}}),
        )
        .await;

        let tags = payload.as_array().unwrap();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0]["tag"], "rust");
        assert_eq!(tags[1]["tag"], "ai");
    }
}
