mod analytics;
mod bookmarks;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::prelude::{ErrorDescriptor, ErrorKind};

// Re-export types needed by tool handlers
pub use super::{JsonRpcError, ServerContext, Tool};

// MCP Protocol types for tools
#[derive(Debug, Serialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Serialize)]
pub struct ServerCapabilities {
    pub tools: Option<ToolsCapability>,
}

#[derive(Debug, Serialize)]
pub struct ToolsCapability {}

#[derive(Debug, Serialize)]
pub struct InitializeResult {
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

#[derive(Debug, Serialize)]
pub struct ToolsList {
    pub tools: Vec<Tool>,
}

#[derive(Debug, Deserialize)]
pub struct CallToolParams {
    pub name: String,
    pub arguments: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct CallToolResult {
    pub content: Vec<Content>,
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum Content {
    #[serde(rename = "text")]
    Text { text: String },
}

fn internal_error(e: impl std::fmt::Display) -> JsonRpcError {
    JsonRpcError {
        code: -32603,
        message: format!("Internal error: {e}"),
        data: None,
    }
}

pub fn handle_initialize() -> Result<serde_json::Value, JsonRpcError> {
    let result = InitializeResult {
        protocol_version: "2024-11-05".to_string(),
        capabilities: ServerCapabilities {
            tools: Some(ToolsCapability {}),
        },
        server_info: ServerInfo {
            name: "raindrop".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    };

    serde_json::to_value(result).map_err(internal_error)
}

pub fn handle_tools_list() -> Result<serde_json::Value, JsonRpcError> {
    let collection_id = serde_json::json!({
        "type": "number",
        "description": "Collection ID (0 = all bookmarks, -1 = unsorted, -99 = trash). Default: 0"
    });

    let tools = vec![
        Tool {
            name: "search_bookmarks".to_string(),
            description: "Search Raindrop.io bookmarks by keyword and tags. Returns the matching bookmarks in page order together with a status field ('complete' or 'partial') and the list of pages that could not be fetched. Only the requested page (default 0) is fetched unless fetch_all is true.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Keyword to search for (optional when tags are given)"
                    },
                    "tags": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Tags every result must carry"
                    },
                    "collection_id": collection_id.clone(),
                    "page": {
                        "type": "number",
                        "description": "Page number, 0-indexed (default: 0). Ignored when fetch_all is true"
                    },
                    "per_page": {
                        "type": "number",
                        "description": "Results per page, 1 to 50 (default: 25, or 50 when fetch_all is true)"
                    },
                    "sort": {
                        "type": "string",
                        "description": "Sort order, e.g. '-created', 'created', 'title', 'domain', 'score' (default: '-created')"
                    },
                    "fetch_all": {
                        "type": "boolean",
                        "description": "Fetch every page of results instead of only the first (default: false)"
                    },
                    "max_pages": {
                        "type": "number",
                        "description": "Upper bound on pages fetched when fetch_all is true"
                    }
                }
            }),
        },
        Tool {
            name: "get_bookmark".to_string(),
            description: "Get a single bookmark. Accepts a numeric bookmark ID (e.g. 123456) or a Raindrop.io app URL (e.g. 'https://app.raindrop.io/my/0/item/123456').".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "raindrop_id": {
                        "type": ["string", "number"],
                        "description": "Bookmark ID or Raindrop.io URL"
                    }
                },
                "required": ["raindrop_id"]
            }),
        },
        Tool {
            name: "list_collections".to_string(),
            description: "List bookmark collections as a tree. Each entry carries its depth below the root collections.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "include_children": {
                        "type": "boolean",
                        "description": "Include nested collections (default: true)"
                    }
                }
            }),
        },
        Tool {
            name: "list_tags".to_string(),
            description: "List tags with their bookmark counts, most used first.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "collection_id": collection_id.clone(),
                    "min_count": {
                        "type": "number",
                        "description": "Only return tags used at least this many times (default: 1)"
                    }
                }
            }),
        },
        Tool {
            name: "tag_statistics".to_string(),
            description: "Count tag usage over every bookmark of a collection. Fetches all pages of the collection.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": { "collection_id": collection_id.clone() }
            }),
        },
        Tool {
            name: "find_duplicates".to_string(),
            description: "Find bookmarks that point to the same page. URLs are compared by host and path, ignoring scheme, query string and trailing slash.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": { "collection_id": collection_id.clone() }
            }),
        },
        Tool {
            name: "find_untagged".to_string(),
            description: "List the bookmarks of a collection that carry no tags.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": { "collection_id": collection_id.clone() }
            }),
        },
        Tool {
            name: "find_broken_links".to_string(),
            description: "Probe every bookmark URL of a collection and report the ones that fail (HTTP 4xx/5xx, timeouts, connection errors). Can take a while on large collections.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "collection_id": collection_id.clone(),
                    "timeout": {
                        "type": "number",
                        "description": "Per-link timeout in seconds (default: 10)"
                    }
                }
            }),
        },
        Tool {
            name: "get_statistics".to_string(),
            description: "Summary statistics for a collection: totals, duplicates, untagged bookmarks and content types. Optionally probes every link.".to_string(),
            input_schema: serde_json::json!({
                "type": "object",
                "properties": {
                    "collection_id": collection_id.clone(),
                    "check_links": {
                        "type": "boolean",
                        "description": "Also count broken links (slow, default: false)"
                    }
                }
            }),
        },
    ];

    serde_json::to_value(ToolsList { tools }).map_err(internal_error)
}

pub async fn handle_tools_call(
    params: Option<serde_json::Value>,
    context: &ServerContext,
) -> Result<serde_json::Value, JsonRpcError> {
    let params: CallToolParams = serde_json::from_value(params.unwrap_or(serde_json::Value::Null))
        .map_err(|e| JsonRpcError {
            code: -32602,
            message: format!("Invalid params: {e}"),
            data: None,
        })?;

    let arguments = params.arguments;
    match params.name.as_str() {
        "search_bookmarks" => bookmarks::handle_search_bookmarks(arguments, context).await,
        "get_bookmark" => bookmarks::handle_get_bookmark(arguments, context).await,
        "list_collections" => bookmarks::handle_list_collections(arguments, context).await,
        "list_tags" => bookmarks::handle_list_tags(arguments, context).await,
        "tag_statistics" => analytics::handle_tag_statistics(arguments, context).await,
        "find_duplicates" => analytics::handle_find_duplicates(arguments, context).await,
        "find_untagged" => analytics::handle_find_untagged(arguments, context).await,
        "find_broken_links" => analytics::handle_find_broken_links(arguments, context).await,
        "get_statistics" => analytics::handle_get_statistics(arguments, context).await,
        name => Err(JsonRpcError {
            code: -32602,
            message: format!("Unknown tool: {name}"),
            data: None,
        }),
    }
}

/// Decode tool arguments, treating missing arguments as an empty object
fn parse_args<T: DeserializeOwned>(arguments: Option<serde_json::Value>) -> Result<T, ErrorDescriptor> {
    let arguments = match arguments {
        None | Some(serde_json::Value::Null) => serde_json::json!({}),
        Some(value) => value,
    };

    serde_json::from_value(arguments).map_err(|e| {
        ErrorDescriptor::new(ErrorKind::InvalidArguments, format!("Invalid arguments: {e}"))
    })
}

/// Wrap a tool outcome in an MCP result
///
/// Failures become a descriptor with `isError: true` so the caller can tell
/// an auth problem from a rate limit without parsing prose.
fn tool_output<T: Serialize>(
    outcome: Result<T, ErrorDescriptor>,
) -> Result<serde_json::Value, JsonRpcError> {
    let (text, is_error) = match outcome {
        Ok(value) => (
            serde_json::to_string_pretty(&value).map_err(internal_error)?,
            None,
        ),
        Err(descriptor) => {
            log::warn!("tool failed: {} ({})", descriptor.message, descriptor.kind);
            (
                serde_json::to_string_pretty(&descriptor).map_err(internal_error)?,
                Some(true),
            )
        }
    };

    let result = CallToolResult {
        content: vec![Content::Text { text }],
        is_error,
    };

    serde_json::to_value(result).map_err(internal_error)
}
