//! In-process [`TreeStore`] with call recording and fault injection.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{Operation, StoreError};
use crate::model::{Block, BlockContent, BlockId, BlockUpdate, NewBlock};

use super::{ChildPage, TreeStore};

/// Every call a [`MemoryStore`] received, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    ListChildren {
        parent: BlockId,
        cursor: Option<String>,
    },
    AppendChild {
        parent: BlockId,
        after: Option<BlockId>,
        block: NewBlock,
    },
    UpdateBlock {
        id: BlockId,
        update: BlockUpdate,
    },
    DeleteBlock {
        id: BlockId,
    },
}

impl StoreCall {
    pub fn is_mutation(&self) -> bool {
        !matches!(self, StoreCall::ListChildren { .. })
    }
}

#[derive(Default)]
struct Faults {
    list: HashSet<BlockId>,
    /// 1-based index of the append call that fails.
    append_call: Option<usize>,
    update: HashSet<BlockId>,
    delete: HashSet<BlockId>,
}

#[derive(Default)]
struct Tree {
    contents: HashMap<BlockId, BlockContent>,
    children: HashMap<BlockId, Vec<BlockId>>,
    parents: HashMap<BlockId, BlockId>,
    calls: Vec<StoreCall>,
    appends: usize,
    next_id: usize,
    faults: Faults,
}

impl Tree {
    fn fresh_id(&mut self) -> BlockId {
        self.next_id += 1;
        BlockId::new(format!("block-{}", self.next_id))
    }

    fn block(&self, id: &BlockId) -> Option<Block> {
        let content = self.contents.get(id)?.clone();
        Some(Block {
            id: id.clone(),
            has_children: self.children.get(id).is_some_and(|c| !c.is_empty()),
            content,
        })
    }

    fn place(&mut self, parent: &BlockId, id: BlockId, content: BlockContent, index: usize) {
        self.contents.insert(id.clone(), content);
        self.parents.insert(id.clone(), parent.clone());
        self.children.entry(parent.clone()).or_default().insert(index, id);
    }

    fn remove_subtree(&mut self, id: &BlockId) {
        self.contents.remove(id);
        self.parents.remove(id);
        for child in self.children.remove(id).unwrap_or_default() {
            self.remove_subtree(&child);
        }
    }
}

/// A block tree held in memory.
///
/// Ids handed out are `block-1`, `block-2`, ... in creation order.
pub struct MemoryStore {
    tree: Mutex<Tree>,
    page_size: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tree: Mutex::new(Tree::default()),
            page_size: 100,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn tree(&self) -> MutexGuard<'_, Tree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds `content` as the last child of `parent` without recording a call.
    pub fn insert(&self, parent: &BlockId, content: BlockContent) -> BlockId {
        let mut tree = self.tree();
        let id = tree.fresh_id();
        let index = tree.children.get(parent).map_or(0, Vec::len);
        tree.place(parent, id.clone(), content, index);
        id
    }

    pub fn children(&self, parent: &BlockId) -> Vec<Block> {
        let tree = self.tree();
        tree.children
            .get(parent)
            .into_iter()
            .flatten()
            .filter_map(|id| tree.block(id))
            .collect()
    }

    pub fn get(&self, id: &BlockId) -> Option<Block> {
        self.tree().block(id)
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.tree().calls.clone()
    }

    pub fn mutations(&self) -> Vec<StoreCall> {
        self.tree()
            .calls
            .iter()
            .filter(|c| c.is_mutation())
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.tree().calls.clear();
    }

    pub fn fail_list(&self, parent: &BlockId) {
        self.tree().faults.list.insert(parent.clone());
    }

    /// Makes the `n`-th append call (counting from 1) fail.
    pub fn fail_append_call(&self, n: usize) {
        self.tree().faults.append_call = Some(n);
    }

    pub fn fail_update(&self, id: &BlockId) {
        self.tree().faults.update.insert(id.clone());
    }

    pub fn fail_delete(&self, id: &BlockId) {
        self.tree().faults.delete.insert(id.clone());
    }
}

impl TreeStore for MemoryStore {
    async fn list_children(
        &self,
        parent: &BlockId,
        cursor: Option<&str>,
    ) -> Result<ChildPage, StoreError> {
        let mut tree = self.tree();
        tree.calls.push(StoreCall::ListChildren {
            parent: parent.clone(),
            cursor: cursor.map(str::to_string),
        });
        if tree.faults.list.contains(parent) {
            return Err(StoreError::read(parent, "injected failure"));
        }

        let start = match cursor {
            Some(cursor) => cursor
                .parse::<usize>()
                .map_err(|_| StoreError::read(parent, format!("invalid cursor {cursor:?}")))?,
            None => 0,
        };
        let ids = tree.children.get(parent).cloned().unwrap_or_default();
        let end = (start + self.page_size).min(ids.len());
        let results = ids
            .get(start..end)
            .unwrap_or_default()
            .iter()
            .filter_map(|id| tree.block(id))
            .collect();
        let next_cursor = (end < ids.len()).then(|| end.to_string());

        Ok(ChildPage {
            results,
            next_cursor,
        })
    }

    async fn append_child(
        &self,
        parent: &BlockId,
        block: &NewBlock,
        after: Option<&BlockId>,
    ) -> Result<Block, StoreError> {
        let mut tree = self.tree();
        tree.calls.push(StoreCall::AppendChild {
            parent: parent.clone(),
            after: after.cloned(),
            block: block.clone(),
        });
        tree.appends += 1;
        if tree.faults.append_call == Some(tree.appends) {
            return Err(StoreError::write(Operation::Append, parent, "injected failure"));
        }

        let index = match after {
            Some(after) => {
                let siblings = tree.children.get(parent).map(Vec::as_slice).unwrap_or_default();
                let position = siblings.iter().position(|id| id == after).ok_or_else(|| {
                    StoreError::write(
                        Operation::Append,
                        parent,
                        format!("{after} is not a child of {parent}"),
                    )
                })?;
                position + 1
            }
            None => 0,
        };

        let id = tree.fresh_id();
        tree.place(parent, id.clone(), block.clone().into_content(), index);
        tree.block(&id)
            .ok_or_else(|| StoreError::write(Operation::Append, parent, "created block vanished"))
    }

    async fn update_block(&self, id: &BlockId, update: &BlockUpdate) -> Result<(), StoreError> {
        let mut tree = self.tree();
        tree.calls.push(StoreCall::UpdateBlock {
            id: id.clone(),
            update: update.clone(),
        });
        if tree.faults.update.contains(id) {
            return Err(StoreError::write(Operation::Update, id, "injected failure"));
        }

        let content = tree
            .contents
            .get_mut(id)
            .ok_or_else(|| StoreError::write(Operation::Update, id, "no such block"))?;
        match (content, update) {
            (
                BlockContent::Text(kind, body),
                BlockUpdate::RichText {
                    kind: new_kind,
                    rich_text,
                    checked,
                },
            ) if *kind == *new_kind => {
                body.rich_text = rich_text.clone();
                if checked.is_some() {
                    body.checked = *checked;
                }
                Ok(())
            }
            (BlockContent::TableRow(row), BlockUpdate::TableRow { cells })
                if row.cells.len() == cells.len() =>
            {
                row.cells = cells.clone();
                Ok(())
            }
            (content, update) => Err(StoreError::write(
                Operation::Update,
                id,
                format!(
                    "cannot apply {} update to {} block",
                    update.type_name(),
                    content.type_name()
                ),
            )),
        }
    }

    async fn delete_block(&self, id: &BlockId) -> Result<(), StoreError> {
        let mut tree = self.tree();
        tree.calls.push(StoreCall::DeleteBlock { id: id.clone() });
        if tree.faults.delete.contains(id) {
            return Err(StoreError::write(Operation::Delete, id, "injected failure"));
        }

        let parent = tree
            .parents
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::write(Operation::Delete, id, "no such block"))?;
        if let Some(siblings) = tree.children.get_mut(&parent) {
            siblings.retain(|sibling| sibling != id);
        }
        tree.remove_subtree(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{RichText, RichTextBlock, TableRow, TextKind};

    fn paragraph(text: &str) -> BlockContent {
        BlockContent::Text(
            TextKind::Paragraph,
            RichTextBlock {
                rich_text: vec![RichText::text(text)],
                checked: None,
            },
        )
    }

    fn ids(blocks: &[Block]) -> Vec<&str> {
        blocks.iter().map(|b| b.id.as_str()).collect()
    }

    #[tokio::test]
    async fn append_places_after_anchor_or_at_head() {
        let store = MemoryStore::new();
        let root = BlockId::new("root");
        let a = store.insert(&root, paragraph("a"));
        store.insert(&root, paragraph("b"));

        let after_a = store
            .append_child(&root, &NewBlock::Equation("x".into()), Some(&a))
            .await
            .unwrap();
        let head = store
            .append_child(&root, &NewBlock::Equation("y".into()), None)
            .await
            .unwrap();

        assert_eq!(after_a.id.as_str(), "block-3");
        assert_eq!(head.id.as_str(), "block-4");
        assert_eq!(
            ids(&store.children(&root)),
            vec!["block-4", "block-1", "block-3", "block-2"]
        );
    }

    #[tokio::test]
    async fn delete_removes_the_subtree() {
        let store = MemoryStore::new();
        let root = BlockId::new("root");
        let parent = store.insert(&root, paragraph("parent"));
        let child = store.insert(&parent, paragraph("child"));
        assert!(store.get(&parent).unwrap().has_children);

        store.delete_block(&parent).await.unwrap();
        assert!(store.children(&root).is_empty());
        assert!(store.get(&child).is_none());
    }

    #[tokio::test]
    async fn row_updates_must_keep_the_cell_count() {
        let store = MemoryStore::new();
        let table = BlockId::new("table");
        let row = store.insert(
            &table,
            BlockContent::TableRow(TableRow {
                cells: vec![vec![RichText::text("a")], vec![RichText::text("b")]],
            }),
        );

        let narrower = BlockUpdate::TableRow {
            cells: vec![vec![RichText::equation("a")]],
        };
        assert!(store.update_block(&row, &narrower).await.is_err());
    }

    #[tokio::test]
    async fn injected_faults_are_recorded_calls() {
        let store = MemoryStore::new();
        let root = BlockId::new("root");
        store.fail_list(&root);
        store.fail_append_call(1);

        assert!(store.list_children(&root, None).await.is_err());
        assert!(
            store
                .append_child(&root, &NewBlock::Equation("x".into()), None)
                .await
                .is_err()
        );
        assert_eq!(store.calls().len(), 2);
        assert_eq!(store.mutations().len(), 1);
    }
}
