//! Katexify core
//!
//! Finds `$inline$` and `$$display$$` math in the text of a block tree and
//! rewrites it into native equations, either in place or by splitting a block
//! into paragraphs and equation blocks.
//!

pub mod builder;
pub mod error;
pub mod flatten;
pub mod model;
pub mod report;
pub mod segment;
pub mod store;
pub mod table;
pub mod throttle;
pub mod walker;

pub use crate::builder::{ReplacementPlan, build};
pub use crate::error::{Operation, StoreError};
pub use crate::model::{Block, BlockContent, BlockId, BlockUpdate, NewBlock, RichText, TextKind};
pub use crate::report::{Failure, RunReport};
pub use crate::segment::{Segment, Segmentation, segment};
pub use crate::store::{DryRunStore, MemoryStore, TreeStore};
pub use crate::throttle::{DEFAULT_WRITE_INTERVAL, PacedStore};
pub use crate::walker::Walker;
