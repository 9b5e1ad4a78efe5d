//! Domain model and response parsing for Raindrop.io bookmarks
//!
//! The service answers with loosely shaped JSON. Everything crossing into the
//! rest of the application goes through the `parse_*` functions below, which
//! shape-check the required fields and fail with [`ApiError::Schema`] instead
//! of letting nulls leak through.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Pseudo collection containing every bookmark
pub const COLLECTION_ALL: i64 = 0;
/// Pseudo collection for bookmarks not filed anywhere
pub const COLLECTION_UNSORTED: i64 = -1;
/// Pseudo collection for deleted bookmarks
pub const COLLECTION_TRASH: i64 = -99;

/// Largest page size accepted by the search endpoint
pub const MAX_PER_PAGE: u32 = 50;

/// Reference to another object, serialized by Raindrop as `{"$id": 123}`
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct ObjectRef {
    #[serde(rename = "$id")]
    pub id: i64,
}

/// Raindrop (bookmark) as returned by the API
#[derive(Debug, Deserialize, Clone)]
pub struct RaindropItem {
    #[serde(rename = "_id")]
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    pub link: String,
    pub collection: ObjectRef,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, rename = "lastUpdate")]
    pub last_update: Option<DateTime<Utc>>,
    #[serde(default)]
    pub important: Option<bool>,
    #[serde(default)]
    pub excerpt: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default, rename = "type")]
    pub item_type: Option<String>,
}

/// Collection as returned by the API
#[derive(Debug, Deserialize, Clone)]
pub struct RaindropCollection {
    #[serde(rename = "_id")]
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub parent: Option<ObjectRef>,
}

/// Tag entry from `GET /tags/{collection}`
#[derive(Debug, Deserialize, Clone)]
pub struct RaindropTag {
    #[serde(rename = "_id")]
    pub name: String,
    #[serde(default)]
    pub count: u64,
}

/// `GET /raindrops/{collection}` response
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    pub items: Vec<RaindropItem>,
    pub count: u64,
}

/// `GET /raindrop/{id}` response
#[derive(Debug, Deserialize)]
pub struct ItemResponse {
    pub item: RaindropItem,
}

/// `GET /collections` and `GET /collections/childrens` response
#[derive(Debug, Deserialize)]
pub struct CollectionsResponse {
    pub items: Vec<RaindropCollection>,
}

/// `GET /tags/{collection}` response
#[derive(Debug, Deserialize)]
pub struct TagsResponse {
    pub items: Vec<RaindropTag>,
}

/// A saved link. Read-only snapshot of the remote record.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Bookmark {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub collection_id: i64,
    pub tags: Vec<String>,
    pub created: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub favorite: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub kind: String,
}

impl Bookmark {
    /// Title for display, falling back to "Untitled"
    pub fn display_title(&self) -> &str {
        let title = self.title.trim();
        if title.is_empty() {
            "Untitled"
        } else {
            title
        }
    }

    /// No usable tags. Blank tags are not counted, matching how tag
    /// statistics skip them.
    pub fn is_untagged(&self) -> bool {
        self.tags.iter().all(|t| t.trim().is_empty())
    }
}

impl From<RaindropItem> for Bookmark {
    fn from(item: RaindropItem) -> Self {
        Bookmark {
            id: item.id,
            title: item.title.unwrap_or_default(),
            url: item.link,
            collection_id: item.collection.id,
            tags: item.tags.unwrap_or_default(),
            created: item.created,
            updated: item.last_update,
            favorite: item.important.unwrap_or(false),
            excerpt: item.excerpt.filter(|e| !e.trim().is_empty()),
            domain: item.domain.filter(|d| !d.trim().is_empty()),
            kind: item.item_type.unwrap_or_else(|| "link".to_string()),
        }
    }
}

/// Folder-like grouping of bookmarks. Collections form a tree.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Collection {
    pub id: i64,
    pub title: String,
    pub parent_id: Option<i64>,
    pub count: u64,
}

impl From<RaindropCollection> for Collection {
    fn from(raw: RaindropCollection) -> Self {
        Collection {
            id: raw.id,
            title: raw
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| "Untitled".to_string()),
            parent_id: raw.parent.map(|p| p.id),
            count: raw.count.unwrap_or(0),
        }
    }
}

/// Collection positioned in its tree
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct CollectionNode {
    pub depth: usize,
    #[serde(flatten)]
    pub collection: Collection,
}

/// Search parameters shared by the CLI and the MCP tools
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchQuery {
    pub keyword: Option<String>,
    pub tags: Vec<String>,
    pub collection_id: i64,
    pub per_page: u32,
    /// `None` fetches every page
    pub max_pages: Option<u32>,
    pub first_page_only: bool,
    /// Zero-based page fetched in first-page-only mode
    #[serde(default)]
    pub start_page: u32,
    pub sort: String,
}

impl Default for SearchQuery {
    fn default() -> Self {
        Self {
            keyword: None,
            tags: Vec::new(),
            collection_id: COLLECTION_ALL,
            per_page: MAX_PER_PAGE,
            max_pages: None,
            first_page_only: false,
            start_page: 0,
            sort: "-created".to_string(),
        }
    }
}

impl SearchQuery {
    pub fn keyword(keyword: impl Into<String>) -> Self {
        let keyword = keyword.into();
        Self {
            keyword: (!keyword.trim().is_empty()).then_some(keyword),
            ..Self::default()
        }
    }

    /// Every bookmark of a collection
    pub fn collection(collection_id: i64) -> Self {
        Self {
            collection_id,
            ..Self::default()
        }
    }

    /// Page size actually sent to the service (1..=50)
    pub fn page_size(&self) -> u32 {
        self.per_page.clamp(1, MAX_PER_PAGE)
    }

    /// Value of the `search` query parameter
    ///
    /// Raindrop expresses tag filters inside the search string as `#tag`;
    /// tags containing whitespace are quoted as `#"two words"`.
    pub fn search_term(&self) -> Option<String> {
        let mut parts: Vec<String> = Vec::new();

        if let Some(keyword) = self.keyword.as_deref().map(str::trim) {
            if !keyword.is_empty() {
                parts.push(keyword.to_string());
            }
        }

        for tag in self.tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()) {
            if tag.chars().any(char::is_whitespace) {
                parts.push(format!("#\"{tag}\""));
            } else {
                parts.push(format!("#{tag}"));
            }
        }

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    /// Human readable description used in logs and report headers
    pub fn describe(&self) -> String {
        let mut description = match self.keyword.as_deref() {
            Some(keyword) => format!("'{keyword}'"),
            None => "all bookmarks".to_string(),
        };
        if !self.tags.is_empty() {
            description.push_str(&format!(" tagged {}", self.tags.join(", ")));
        }
        description.push_str(&format!(" in {}", collection_label(self.collection_id)));
        if self.first_page_only && self.start_page > 0 {
            description.push_str(&format!(" (page {})", self.start_page));
        }
        description
    }
}

/// Name of a reserved collection id, or `collection <id>`
pub fn collection_label(collection_id: i64) -> String {
    match collection_id {
        COLLECTION_ALL => "all collections".to_string(),
        COLLECTION_UNSORTED => "unsorted".to_string(),
        COLLECTION_TRASH => "trash".to_string(),
        id => format!("collection {id}"),
    }
}

fn decode<T: DeserializeOwned>(body: &str, what: &str) -> Result<T, ApiError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| ApiError::Schema(format!("{what}: invalid JSON: {e}")))?;

    if value.get("result").and_then(|r| r.as_bool()) == Some(false) {
        let message = value
            .get("errorMessage")
            .and_then(|m| m.as_str())
            .unwrap_or("service reported result=false");
        return Err(ApiError::Schema(format!("{what}: {message}")));
    }

    serde_json::from_value(value).map_err(|e| ApiError::Schema(format!("{what}: {e}")))
}

/// Parse one page of `GET /raindrops/{collection}`
pub fn parse_search_page(body: &str, page: u32) -> Result<crate::pagination::PageResult, ApiError> {
    let response: SearchResponse = decode(body, "search response")?;

    Ok(crate::pagination::PageResult {
        page,
        items: response.items.into_iter().map(Bookmark::from).collect(),
        count: response.count,
    })
}

/// Parse `GET /raindrop/{id}`
pub fn parse_bookmark(body: &str) -> Result<Bookmark, ApiError> {
    let response: ItemResponse = decode(body, "bookmark response")?;
    Ok(Bookmark::from(response.item))
}

/// Parse `GET /collections` or `GET /collections/childrens`
pub fn parse_collections(body: &str) -> Result<Vec<Collection>, ApiError> {
    let response: CollectionsResponse = decode(body, "collections response")?;
    Ok(response.items.into_iter().map(Collection::from).collect())
}

/// Parse `GET /tags/{collection}` into a tag → count mapping
pub fn parse_tags(body: &str) -> Result<BTreeMap<String, u64>, ApiError> {
    let response: TagsResponse = decode(body, "tags response")?;

    let mut tags = BTreeMap::new();
    for tag in response.items {
        *tags.entry(tag.name).or_insert(0) += tag.count;
    }
    Ok(tags)
}

/// Order collections depth-first, children sorted by title then id
///
/// Collections whose parent is not part of `collections` are rendered as
/// roots so nothing is dropped from the listing.
pub fn collection_tree(collections: &[Collection]) -> Vec<CollectionNode> {
    let known: HashSet<i64> = collections.iter().map(|c| c.id).collect();
    let mut children: HashMap<Option<i64>, Vec<&Collection>> = HashMap::new();

    for collection in collections {
        let parent = collection.parent_id.filter(|p| known.contains(p));
        children.entry(parent).or_default().push(collection);
    }
    for siblings in children.values_mut() {
        siblings.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
    }

    let mut output = Vec::with_capacity(collections.len());
    let mut visited = HashSet::new();
    let mut stack: Vec<(usize, &Collection)> = children
        .get(&None)
        .map(|roots| roots.iter().rev().map(|c| (0, *c)).collect())
        .unwrap_or_default();

    while let Some((depth, collection)) = stack.pop() {
        if !visited.insert(collection.id) {
            continue;
        }
        output.push(CollectionNode {
            depth,
            collection: collection.clone(),
        });
        if let Some(kids) = children.get(&Some(collection.id)) {
            stack.extend(kids.iter().rev().map(|c| (depth + 1, *c)));
        }
    }

    output
}

/// Extract a bookmark id from either a bare id or a Raindrop app URL
///
/// Accepts `123456`, `https://app.raindrop.io/my/0/item/123456/edit` and
/// `https://api.raindrop.io/rest/v1/raindrop/123456`.
pub fn extract_bookmark_id(input: &str) -> Result<i64, String> {
    let input = input.trim();

    if let Ok(id) = input.parse::<i64>() {
        return Ok(id);
    }

    let re = Regex::new(r"/(?:item|raindrop)/(\d+)").map_err(|e| e.to_string())?;
    if let Some(id_match) = re.captures(input).and_then(|caps| caps.get(1)) {
        return id_match
            .as_str()
            .parse::<i64>()
            .map_err(|_| format!("Failed to parse bookmark ID from URL: {input}"));
    }

    Err(format!("Invalid bookmark ID or URL: {input}"))
}
