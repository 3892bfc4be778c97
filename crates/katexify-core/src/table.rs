//! Inline math inside table cells.
//!
//! Rows have a fixed number of cells, so cells are only ever rewritten in
//! place with inline equations. Display math in a cell is left as text.

use tracing::{debug, warn};

use crate::builder::{has_meaningful_content, runs_from_segments};
use crate::flatten::plain_text;
use crate::model::{BlockContent, BlockId, BlockUpdate, RichText, TableRow};
use crate::report::{Failure, RunReport};
use crate::segment::{Segment, segment_inline};
use crate::store::{TreeStore, list_all_children};

/// New runs for a cell, or `None` when it should be left as it is.
pub fn rewrite_cell(cell: &[RichText]) -> Option<Vec<RichText>> {
    let text = plain_text(cell);
    if !text.contains('$') || text.trim_start().starts_with("$$") {
        return None;
    }

    let segments = segment_inline(&text);
    if !segments.iter().any(Segment::is_equation) {
        return None;
    }
    let runs = runs_from_segments(&segments);
    has_meaningful_content(&runs).then_some(runs)
}

/// The row with its math cells rewritten, if any cell changed.
pub fn rewrite_row(row: &TableRow) -> Option<TableRow> {
    let mut changed = false;
    let cells = row
        .cells
        .iter()
        .map(|cell| match rewrite_cell(cell) {
            Some(runs) => {
                changed = true;
                runs
            }
            None => cell.clone(),
        })
        .collect();
    changed.then_some(TableRow { cells })
}

/// Rewrites every row of `table` that has math in it, one update per row.
pub async fn rewrite_table<S: TreeStore + Sync>(store: &S, table: &BlockId, report: &mut RunReport) {
    let rows = match list_all_children(store, table).await {
        Ok(rows) => rows,
        Err(err) => {
            warn!(block_id = %table, error = %err, "skipping table, rows could not be listed");
            report.record(Failure::new(table, &err));
            return;
        }
    };

    for row in rows {
        report.visited += 1;
        let BlockContent::TableRow(cells) = &row.content else {
            continue;
        };
        let Some(rewritten) = rewrite_row(cells) else {
            continue;
        };

        let update = BlockUpdate::TableRow {
            cells: rewritten.cells,
        };
        match store.update_block(&row.id, &update).await {
            Ok(()) => {
                debug!(block_id = %row.id, "table row rewritten");
                report.rows_updated += 1;
            }
            Err(err) => {
                warn!(block_id = %row.id, operation = %err.operation(), error = %err, "table row update failed");
                report.record(Failure::new(&row.id, &err));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cell(text: &str) -> Vec<RichText> {
        vec![RichText::text(text)]
    }

    #[test]
    fn math_cell_becomes_an_equation_run() {
        let row = TableRow {
            cells: vec![cell("$x$"), cell("plain")],
        };
        let rewritten = rewrite_row(&row).unwrap();
        assert_eq!(rewritten.cells.len(), 2);
        assert_eq!(rewritten.cells[0], vec![RichText::equation("x")]);
        assert_eq!(rewritten.cells[1], row.cells[1]);
    }

    #[test]
    fn rows_without_math_are_not_rewritten() {
        let row = TableRow {
            cells: vec![cell("a"), cell("costs $3"), vec![]],
        };
        assert_eq!(rewrite_row(&row), None);
    }

    #[test]
    fn display_math_cells_are_left_alone() {
        assert_eq!(rewrite_cell(&cell("  $$x^2$$")), None);
        assert_eq!(rewrite_cell(&cell("$ $")), None);
    }

    #[test]
    fn mixed_cells_keep_their_text() {
        assert_eq!(
            rewrite_cell(&cell("n = $2^k$ rows")),
            Some(vec![
                RichText::text("n = "),
                RichText::equation("2^k"),
                RichText::text(" rows"),
            ])
        );
    }
}
