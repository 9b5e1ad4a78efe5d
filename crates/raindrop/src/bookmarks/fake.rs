//! Scriptable in-memory gateway for tests

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use raindrop_core::bookmarks::{Bookmark, Collection, SearchQuery};
use raindrop_core::error::ApiError;
use raindrop_core::pagination::PageResult;
use tokio::time::Instant;

use super::Gateway;

pub fn bookmark(id: i64, url: &str, tags: &[&str]) -> Bookmark {
    Bookmark {
        id,
        title: format!("Bookmark {id}"),
        url: url.to_string(),
        collection_id: 0,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        created: None,
        updated: None,
        favorite: false,
        excerpt: None,
        domain: None,
        kind: "link".to_string(),
    }
}

/// Serves a fixed library split into pages of `query.page_size()`
#[derive(Default)]
pub struct FakeGateway {
    library: Vec<Bookmark>,
    /// Errors returned, in order, before a page succeeds
    failures: Mutex<HashMap<u32, VecDeque<ApiError>>>,
    latency: HashMap<u32, Duration>,
    collections: Vec<Collection>,
    tags: BTreeMap<String, u64>,
    calls: Mutex<Vec<(u32, Instant)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeGateway {
    /// Library of `total` bookmarks with ids `0..total`
    pub fn with_total(total: usize) -> Self {
        let library = (0..total as i64)
            .map(|id| bookmark(id, &format!("https://example.com/{id}"), &[]))
            .collect();
        Self::with_library(library)
    }

    pub fn with_library(library: Vec<Bookmark>) -> Self {
        Self {
            library,
            ..Self::default()
        }
    }

    pub fn fail_page(self, page: u32, errors: Vec<ApiError>) -> Self {
        self.failures
            .lock()
            .unwrap()
            .insert(page, errors.into_iter().collect());
        self
    }

    pub fn delay_page(mut self, page: u32, latency: Duration) -> Self {
        self.latency.insert(page, latency);
        self
    }

    pub fn with_collections(mut self, collections: Vec<Collection>) -> Self {
        self.collections = collections;
        self
    }

    pub fn with_tags(mut self, tags: &[(&str, u64)]) -> Self {
        self.tags = tags.iter().map(|(t, c)| (t.to_string(), *c)).collect();
        self
    }

    pub fn calls(&self) -> Vec<(u32, Instant)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, page: u32) -> Vec<Instant> {
        self.calls()
            .into_iter()
            .filter(|(p, _)| *p == page)
            .map(|(_, at)| at)
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn search_page(&self, query: &SearchQuery, page: u32) -> Result<PageResult, ApiError> {
        self.calls.lock().unwrap().push((page, Instant::now()));

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if let Some(latency) = self.latency.get(&page) {
            tokio::time::sleep(*latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let scripted = self
            .failures
            .lock()
            .unwrap()
            .get_mut(&page)
            .and_then(VecDeque::pop_front);
        if let Some(err) = scripted {
            return Err(err);
        }

        let per_page = query.page_size() as usize;
        let items = self
            .library
            .iter()
            .skip(page as usize * per_page)
            .take(per_page)
            .cloned()
            .collect();

        Ok(PageResult {
            page,
            items,
            count: self.library.len() as u64,
        })
    }

    async fn get_bookmark(&self, id: i64) -> Result<Bookmark, ApiError> {
        self.library
            .iter()
            .find(|b| b.id == id)
            .cloned()
            .ok_or_else(|| ApiError::Status {
                status: 404,
                message: "Not found".to_string(),
            })
    }

    async fn list_collections(
        &self,
        include_children: bool,
    ) -> Result<Vec<Collection>, ApiError> {
        Ok(self
            .collections
            .iter()
            .filter(|c| include_children || c.parent_id.is_none())
            .cloned()
            .collect())
    }

    async fn list_tags(&self, _collection_id: i64) -> Result<BTreeMap<String, u64>, ApiError> {
        Ok(self.tags.clone())
    }
}
