use std::path::PathBuf;

use thiserror::Error;

/// Failure importing a single document. Never aborts the rest of an import run.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no <body> element found")]
    MissingBody,
    #[error("cannot derive a slug from {0:?}")]
    InvalidFileName(PathBuf),
}

/// Failure applying a batch of block/field edits. The whole batch is rejected.
#[derive(Debug, Error)]
pub enum EditError {
    #[error("unknown block id {0}")]
    UnknownBlock(i64),
    #[error("block {block_id} has no field named {field_name:?}")]
    UnknownField { block_id: i64, field_name: String },
    #[error("block orders must be a permutation of 1..={expected}")]
    InvalidOrder { expected: usize },
    #[error("block {block_id} ({block_type}) cannot leave its position")]
    FixedBlockMoved { block_id: i64, block_type: String },
    #[error("block {block_id} cannot move {direction}")]
    CannotMove { block_id: i64, direction: &'static str },
    #[error("failed to update block {block_id}: {source}")]
    Storage {
        block_id: i64,
        #[source]
        source: rusqlite::Error,
    },
}
