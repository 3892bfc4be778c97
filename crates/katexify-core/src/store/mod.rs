//! The remote tree the rewriter works against.
//!
//! A store offers no "replace" or "insert before": content is rewritten with
//! updates in place, or by appending siblings after a known block and then
//! deleting the original.

use std::future::Future;

use serde::Deserialize;

use crate::error::StoreError;
use crate::model::{Block, BlockId, BlockUpdate, NewBlock};

pub mod dry_run;
pub mod memory;

pub use dry_run::DryRunStore;
pub use memory::{MemoryStore, StoreCall};

/// One page of a parent's children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ChildPage {
    pub results: Vec<Block>,
    /// Present while more pages follow.
    #[serde(default)]
    pub next_cursor: Option<String>,
}

pub trait TreeStore {
    fn list_children(
        &self,
        parent: &BlockId,
        cursor: Option<&str>,
    ) -> impl Future<Output = Result<ChildPage, StoreError>> + Send;

    /// Creates `block` under `parent`, directly after `after`, or as the first
    /// child when `after` is `None`.
    fn append_child(
        &self,
        parent: &BlockId,
        block: &NewBlock,
        after: Option<&BlockId>,
    ) -> impl Future<Output = Result<Block, StoreError>> + Send;

    fn update_block(
        &self,
        id: &BlockId,
        update: &BlockUpdate,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    fn delete_block(&self, id: &BlockId) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// Follows pagination until the store reports no further cursor.
pub async fn list_all_children<S: TreeStore>(
    store: &S,
    parent: &BlockId,
) -> Result<Vec<Block>, StoreError> {
    let mut blocks = Vec::new();
    let mut cursor: Option<String> = None;
    loop {
        let page = store.list_children(parent, cursor.as_deref()).await?;
        blocks.extend(page.results);
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    tracing::debug!(parent = %parent, count = blocks.len(), "fetched children");
    Ok(blocks)
}
