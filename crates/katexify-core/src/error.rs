use std::fmt;

use miette::Diagnostic;
use thiserror::Error;

use crate::model::BlockId;

/// A call against the tree store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    ListChildren,
    Append,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operation::ListChildren => "list children",
            Operation::Append => "append",
            Operation::Update => "update",
            Operation::Delete => "delete",
        })
    }
}

/// Failure of a single remote call. Nothing is retried.
#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("failed to list children of {block_id}: {message}")]
    #[diagnostic(
        code(katexify::store::read),
        help("check that the integration has access to block {block_id}")
    )]
    Read { block_id: BlockId, message: String },

    #[error("{operation} failed for {block_id}: {message}")]
    #[diagnostic(code(katexify::store::write))]
    Write {
        operation: Operation,
        block_id: BlockId,
        message: String,
    },
}

impl StoreError {
    pub fn read(block_id: &BlockId, message: impl Into<String>) -> Self {
        StoreError::Read {
            block_id: block_id.clone(),
            message: message.into(),
        }
    }

    pub fn write(operation: Operation, block_id: &BlockId, message: impl Into<String>) -> Self {
        StoreError::Write {
            operation,
            block_id: block_id.clone(),
            message: message.into(),
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            StoreError::Read { .. } => Operation::ListChildren,
            StoreError::Write { operation, .. } => *operation,
        }
    }

    pub fn block_id(&self) -> &BlockId {
        match self {
            StoreError::Read { block_id, .. } | StoreError::Write { block_id, .. } => block_id,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            StoreError::Read { message, .. } | StoreError::Write { message, .. } => message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_errors_name_operation_and_block() {
        let err = StoreError::write(Operation::Delete, &BlockId::new("abc"), "404 object_not_found");
        assert_eq!(err.to_string(), "delete failed for abc: 404 object_not_found");
        assert_eq!(err.operation(), Operation::Delete);
        assert_eq!(err.block_id().as_str(), "abc");
    }

    #[test]
    fn read_errors_are_list_operations() {
        let err = StoreError::read(&BlockId::new("page"), "timeout");
        assert_eq!(err.operation(), Operation::ListChildren);
        assert_eq!(err.message(), "timeout");
    }
}
