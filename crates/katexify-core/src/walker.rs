//! Depth-first rewrite of a block tree.
//!
//! Levels are kept on an explicit stack. Each level holds its fully listed
//! children and an insertion cursor: the last block physically placed at that
//! level, which is where the next replacement block gets appended.

use std::collections::VecDeque;

use tracing::{Instrument, Span, debug, error, info, info_span, warn};

use crate::builder::{ReplacementPlan, build};
use crate::error::{Operation, StoreError};
use crate::flatten::plain_text;
use crate::model::{Block, BlockContent, BlockId, NewBlock, RichTextBlock, TextKind};
use crate::report::{Failure, RunReport};
use crate::segment::segment;
use crate::store::{TreeStore, list_all_children};
use crate::table::rewrite_table;

struct Level {
    parent: BlockId,
    depth: usize,
    pending: VecDeque<Block>,
    cursor: Option<BlockId>,
    span: Span,
}

impl Level {
    fn new(parent: BlockId, depth: usize, children: Vec<Block>) -> Self {
        let span = info_span!("level", parent = %parent, depth);
        Self {
            parent,
            depth,
            pending: children.into(),
            cursor: None,
            span,
        }
    }
}

/// Result of visiting one block.
struct Outcome {
    cursor: BlockId,
    descend: bool,
}

enum Split {
    Replaced { last: BlockId },
    /// The original is still in the tree; `last_placed` is the lowest block at
    /// this level that the split touched.
    Kept { last_placed: BlockId },
}

impl Split {
    /// Without a cursor the chain hangs below the original, otherwise above it.
    fn kept(block: &Block, cursor: Option<&BlockId>, mut appended: Vec<BlockId>) -> Self {
        let last_placed = match (cursor, appended.pop()) {
            (None, Some(last)) => last,
            _ => block.id.clone(),
        };
        Split::Kept { last_placed }
    }
}

pub struct Walker<'a, S> {
    store: &'a S,
}

impl<'a, S: TreeStore + Sync> Walker<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Rewrites every block below `root`.
    ///
    /// Only a failure to list `root` itself is returned as an error. Anything
    /// else ends up in [`RunReport::failures`] and the walk moves on.
    pub async fn run(&self, root: &BlockId) -> Result<RunReport, StoreError> {
        let mut report = RunReport::default();
        let children = list_all_children(self.store, root).await?;
        info!(root = %root, count = children.len(), "walking page");

        let mut stack = vec![Level::new(root.clone(), 0, children)];
        while let Some(level) = stack.last_mut() {
            let Some(block) = level.pending.pop_front() else {
                stack.pop();
                continue;
            };
            let depth = level.depth;
            let outcome = self
                .visit(&level.parent, &block, level.cursor.clone(), &mut report)
                .instrument(level.span.clone())
                .await;
            level.cursor = Some(outcome.cursor);

            if outcome.descend {
                match list_all_children(self.store, &block.id).await {
                    Ok(children) => stack.push(Level::new(block.id, depth + 1, children)),
                    Err(err) => {
                        warn!(block_id = %block.id, depth, error = %err, "skipping subtree");
                        report.record(Failure::new(&block.id, &err));
                    }
                }
            }
        }

        Ok(report)
    }

    async fn visit(
        &self,
        parent: &BlockId,
        block: &Block,
        cursor: Option<BlockId>,
        report: &mut RunReport,
    ) -> Outcome {
        report.visited += 1;
        let keep = |descend: bool| Outcome {
            cursor: block.id.clone(),
            descend,
        };

        match &block.content {
            BlockContent::Table => {
                rewrite_table(self.store, &block.id, report).await;
                keep(false)
            }
            BlockContent::Container(_) => keep(block.has_children),
            BlockContent::Text(kind, body) => {
                self.rewrite_text(parent, block, *kind, body, cursor, report)
                    .await
            }
            BlockContent::TableRow(_) | BlockContent::Equation(_) | BlockContent::Unsupported(_) => {
                keep(false)
            }
        }
    }

    async fn rewrite_text(
        &self,
        parent: &BlockId,
        block: &Block,
        kind: TextKind,
        body: &RichTextBlock,
        cursor: Option<BlockId>,
        report: &mut RunReport,
    ) -> Outcome {
        let descend = block.has_children && kind.nests_content();
        let text = plain_text(&body.rich_text);

        match build(&segment(&text), &block.content) {
            ReplacementPlan::Unchanged => Outcome {
                cursor: block.id.clone(),
                descend,
            },
            ReplacementPlan::InPlaceUpdate(update) => {
                match self.store.update_block(&block.id, &update).await {
                    Ok(()) => {
                        debug!(block_id = %block.id, kind = kind.as_str(), "rewrote block in place");
                        report.updated += 1;
                    }
                    Err(err) => {
                        error!(block_id = %block.id, operation = %Operation::Update, error = %err, "update failed");
                        report.record(Failure::new(&block.id, &err));
                    }
                }
                Outcome {
                    cursor: block.id.clone(),
                    descend,
                }
            }
            ReplacementPlan::SplitIntoNodes(payloads) => {
                match self.split(parent, block, &payloads, cursor, report).await {
                    Split::Replaced { last } => Outcome {
                        cursor: last,
                        descend: false,
                    },
                    Split::Kept { last_placed } => Outcome {
                        cursor: last_placed,
                        descend,
                    },
                }
            }
        }
    }

    /// Appends `payloads` in order, then deletes `block`.
    async fn split(
        &self,
        parent: &BlockId,
        block: &Block,
        payloads: &[NewBlock],
        cursor: Option<BlockId>,
        report: &mut RunReport,
    ) -> Split {
        if block.has_children {
            warn!(
                block_id = %block.id,
                "splitting a block with children, they are removed along with it"
            );
        }

        let mut appended: Vec<BlockId> = Vec::with_capacity(payloads.len());
        for payload in payloads {
            let after = appended.last().or(cursor.as_ref()).unwrap_or(&block.id);
            match self.store.append_child(parent, payload, Some(after)).await {
                Ok(created) => {
                    report.created += 1;
                    appended.push(created.id);
                }
                Err(err) => {
                    error!(
                        block_id = %block.id,
                        operation = %Operation::Append,
                        appended = appended.len(),
                        error = %err,
                        "split aborted, original kept"
                    );
                    report.record(Failure::new(&block.id, &err).with_appended(&appended));
                    return Split::kept(block, cursor.as_ref(), appended);
                }
            }
        }

        if let Err(err) = self.store.delete_block(&block.id).await {
            error!(
                block_id = %block.id,
                operation = %Operation::Delete,
                appended = appended.len(),
                error = %err,
                "original left next to its replacement"
            );
            report.record(Failure::new(&block.id, &err).with_appended(&appended));
            return Split::kept(block, cursor.as_ref(), appended);
        }

        debug!(block_id = %block.id, created = appended.len(), "split block");
        report.split += 1;
        report.deleted += 1;
        match appended.pop() {
            Some(last) => Split::Replaced { last },
            None => Split::Kept {
                last_placed: block.id.clone(),
            },
        }
    }
}
