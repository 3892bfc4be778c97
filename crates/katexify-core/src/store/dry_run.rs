use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::info;

use crate::error::StoreError;
use crate::model::{Block, BlockId, BlockUpdate, NewBlock};

use super::{ChildPage, TreeStore};

/// Reads from the wrapped store, logs writes instead of performing them.
///
/// Appends answer with a made-up `dry-run-N` block so that a split can chain
/// its remaining payloads as it would against the real store.
pub struct DryRunStore<S> {
    inner: S,
    created: AtomicUsize,
}

impl<S> DryRunStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            created: AtomicUsize::new(0),
        }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: TreeStore + Sync> TreeStore for DryRunStore<S> {
    async fn list_children(
        &self,
        parent: &BlockId,
        cursor: Option<&str>,
    ) -> Result<ChildPage, StoreError> {
        self.inner.list_children(parent, cursor).await
    }

    async fn append_child(
        &self,
        parent: &BlockId,
        block: &NewBlock,
        after: Option<&BlockId>,
    ) -> Result<Block, StoreError> {
        let n = self.created.fetch_add(1, Ordering::Relaxed) + 1;
        let id = BlockId::new(format!("dry-run-{n}"));
        info!(
            %parent,
            after = after.map(BlockId::as_str),
            kind = block.type_name(),
            %id,
            "dry run: would append block"
        );
        Ok(Block {
            id,
            has_children: false,
            content: block.clone().into_content(),
        })
    }

    async fn update_block(&self, id: &BlockId, update: &BlockUpdate) -> Result<(), StoreError> {
        info!(%id, kind = update.type_name(), "dry run: would update block");
        Ok(())
    }

    async fn delete_block(&self, id: &BlockId) -> Result<(), StoreError> {
        info!(%id, "dry run: would delete block");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{BlockContent, RichText, RichTextBlock, TextKind};
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn writes_never_reach_the_inner_store() {
        let memory = MemoryStore::new();
        let root = BlockId::new("root");
        let original = memory.insert(
            &root,
            BlockContent::Text(
                TextKind::Paragraph,
                RichTextBlock {
                    rich_text: vec![RichText::text("a $$x$$")],
                    checked: None,
                },
            ),
        );

        let store = DryRunStore::new(memory);
        let page = store.list_children(&root, None).await.unwrap();
        assert_eq!(page.results.len(), 1);

        let first = store
            .append_child(&root, &NewBlock::Equation("x".into()), Some(&original))
            .await
            .unwrap();
        let second = store
            .append_child(&root, &NewBlock::Equation("y".into()), Some(&first.id))
            .await
            .unwrap();
        store.delete_block(&original).await.unwrap();

        assert_eq!(first.id.as_str(), "dry-run-1");
        assert_eq!(second.id.as_str(), "dry-run-2");

        let memory = store.into_inner();
        assert!(memory.mutations().is_empty());
        assert_eq!(memory.children(&root).len(), 1);
    }
}
