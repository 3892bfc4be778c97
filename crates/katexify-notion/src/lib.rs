//! Notion backend for katexify.
//!
//! Provides [`NotionClient`], a [`TreeStore`](katexify_core::TreeStore) that
//! reads and writes blocks through the Notion REST API, and the configuration
//! it needs.

pub mod client;
pub mod config;
pub mod error;

pub use crate::client::NotionClient;
pub use crate::config::{NotionConfig, parse_page_id};
pub use crate::error::{ConfigError, NotionError};
