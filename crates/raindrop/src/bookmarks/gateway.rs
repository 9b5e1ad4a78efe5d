//! Typed access to the Raindrop.io REST API

use std::collections::BTreeMap;

use async_trait::async_trait;
use log::debug;
use raindrop_core::bookmarks::{
    parse_bookmark, parse_collections, parse_search_page, parse_tags, Bookmark, Collection,
    SearchQuery,
};
use raindrop_core::error::{classify_status, parse_retry_after, ApiError};
use raindrop_core::pagination::PageResult;

use super::RaindropConfig;

/// Read-only operations against the bookmark service
///
/// Every call resolves to a typed value or a classified [`ApiError`].
#[async_trait]
pub trait Gateway: Send + Sync {
    /// One page (zero-based) of a search
    async fn search_page(&self, query: &SearchQuery, page: u32) -> Result<PageResult, ApiError>;

    async fn get_bookmark(&self, id: i64) -> Result<Bookmark, ApiError>;

    /// Root collections, followed by nested ones when `include_children` is set
    async fn list_collections(&self, include_children: bool)
        -> Result<Vec<Collection>, ApiError>;

    async fn list_tags(&self, collection_id: i64) -> Result<BTreeMap<String, u64>, ApiError>;
}

pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    pub fn new(config: &RaindropConfig) -> Result<Self, ApiError> {
        Ok(Self {
            client: super::create_authenticated_client(config)?,
            base_url: config.base_url.clone(),
        })
    }

    async fn get(&self, path: &str, params: &[(&str, String)]) -> Result<String, ApiError> {
        let url = format!("{}{path}", self.base_url);
        debug!("GET {url} {params:?}");

        let response = self
            .client
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status().as_u16();
        let retry_after = parse_retry_after(
            response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok()),
        );
        let body = response.text().await.map_err(transport_error)?;

        classify_status(status, retry_after, &body)?;
        Ok(body)
    }
}

fn transport_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        ApiError::Transient(format!("request timed out: {err}"))
    } else if err.is_connect() {
        ApiError::Transient(format!("connection failed: {err}"))
    } else {
        ApiError::Transient(err.to_string())
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn search_page(&self, query: &SearchQuery, page: u32) -> Result<PageResult, ApiError> {
        let mut params = vec![
            ("page", page.to_string()),
            ("perpage", query.page_size().to_string()),
            ("sort", query.sort.clone()),
        ];
        if let Some(term) = query.search_term() {
            params.push(("search", term));
        }

        let body = self
            .get(&format!("/raindrops/{}", query.collection_id), &params)
            .await?;
        parse_search_page(&body, page)
    }

    async fn get_bookmark(&self, id: i64) -> Result<Bookmark, ApiError> {
        let body = self.get(&format!("/raindrop/{id}"), &[]).await?;
        parse_bookmark(&body)
    }

    async fn list_collections(
        &self,
        include_children: bool,
    ) -> Result<Vec<Collection>, ApiError> {
        let body = self.get("/collections", &[]).await?;
        let mut collections = parse_collections(&body)?;

        if include_children {
            let body = self.get("/collections/childrens", &[]).await?;
            collections.extend(parse_collections(&body)?);
        }

        Ok(collections)
    }

    async fn list_tags(&self, collection_id: i64) -> Result<BTreeMap<String, u64>, ApiError> {
        let body = self.get(&format!("/tags/{collection_id}"), &[]).await?;
        parse_tags(&body)
    }
}
