//! Core library for raindrop
//!
//! This crate implements the **Functional Core** of the raindrop application,
//! following the Functional Core - Imperative Shell architectural pattern.
//!
//! # Architecture Overview
//!
//! - **`raindrop_core`** (this crate): Pure transformation functions with zero I/O
//! - **`raindrop`**: HTTP, concurrency, files and the MCP server (the Imperative Shell)
//!
//! Nothing in here touches the network, the clock or the filesystem. Response
//! bodies come in as strings, timestamps come in as arguments, and report
//! content goes out as strings. Tests use fixture data, no mocking required.
//!
//! # Module Organization
//!
//! - [`bookmarks`]: Domain model, search parameters and response parsing
//! - [`error`]: Failure classification for API calls
//! - [`pagination`]: Page arithmetic, pacing policy and result aggregation
//! - [`analytics`]: Duplicates, tag statistics, untagged and link status
//! - [`report`]: Text, Markdown and JSON report rendering
//!
//! # Example Usage
//!
//! ```rust,ignore
//! use raindrop_core::analytics::find_duplicates;
//! use raindrop_core::bookmarks::parse_search_page;
//!
//! let page = parse_search_page(body, 0)?;
//! for cluster in find_duplicates(&page.items) {
//!     println!("{} ({} copies)", cluster.key, cluster.members.len());
//! }
//! ```

pub mod analytics;
pub mod bookmarks;
pub mod error;
pub mod pagination;
pub mod report;
