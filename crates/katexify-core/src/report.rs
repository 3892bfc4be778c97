use std::fmt;

use crate::error::{Operation, StoreError};
use crate::model::BlockId;

/// A store call that failed during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub block_id: BlockId,
    pub operation: Operation,
    pub message: String,
    /// Blocks created for a split that could not be completed. Non-empty
    /// means the original and (part of) its replacement now coexist.
    pub appended: Vec<BlockId>,
}

impl Failure {
    pub fn new(block_id: &BlockId, error: &StoreError) -> Self {
        Self {
            block_id: block_id.clone(),
            operation: error.operation(),
            message: error.message().to_string(),
            appended: Vec::new(),
        }
    }

    pub fn with_appended(mut self, appended: &[BlockId]) -> Self {
        self.appended = appended.to_vec();
        self
    }

    pub fn left_duplicates(&self) -> bool {
        !self.appended.is_empty()
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} failed: {}", self.operation, self.block_id, self.message)?;
        if self.left_duplicates() {
            let ids: Vec<&str> = self.appended.iter().map(BlockId::as_str).collect();
            write!(f, " (original kept next to new blocks {})", ids.join(", "))?;
        }
        Ok(())
    }
}

/// What a walk did to the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    pub visited: usize,
    /// Blocks rewritten in place.
    pub updated: usize,
    /// Blocks fully replaced by a split.
    pub split: usize,
    pub created: usize,
    pub deleted: usize,
    pub rows_updated: usize,
    pub failures: Vec<Failure>,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Successful mutating calls.
    pub fn mutations(&self) -> usize {
        self.updated + self.created + self.deleted + self.rows_updated
    }

    pub fn record(&mut self, failure: Failure) {
        self.failures.push(failure);
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "visited {} blocks: {} updated in place, {} split ({} created, {} deleted), {} table rows updated, {} failures",
            self.visited,
            self.updated,
            self.split,
            self.created,
            self.deleted,
            self.rows_updated,
            self.failures.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_line() {
        let report = RunReport {
            visited: 12,
            updated: 3,
            split: 1,
            created: 3,
            deleted: 1,
            rows_updated: 2,
            failures: Vec::new(),
        };
        assert!(report.is_clean());
        assert_eq!(report.mutations(), 9);
        insta::assert_snapshot!(
            report.to_string(),
            @"visited 12 blocks: 3 updated in place, 1 split (3 created, 1 deleted), 2 table rows updated, 0 failures"
        );
    }

    #[test]
    fn failures_name_leftover_blocks() {
        let error = StoreError::write(Operation::Delete, &BlockId::new("orig"), "rate limited");
        let failure =
            Failure::new(&BlockId::new("orig"), &error).with_appended(&[BlockId::new("n1"), BlockId::new("n2")]);
        assert!(failure.left_duplicates());
        insta::assert_snapshot!(
            failure.to_string(),
            @"delete of orig failed: rate limited (original kept next to new blocks n1, n2)"
        );
    }
}
