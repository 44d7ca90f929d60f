//! Change detection between live and desired config trees.
//!
//! This module provides:
//! - The typed change model
//! - The tree differ producing flat change lists
//! - Grouping of change lists per entity

mod change;
mod differ;
mod result;

pub use change::{
    AffectedObject, Change, ChangeKind, ChangePath, EntityKind, EntryChangeKind, MapEntryChange,
    PathSegment,
};
pub use differ::TreeDiffer;
pub use result::{DiffResult, DiffSummary};
