//! Classification of an entity's change list.
//!
//! Shared by the application and service planners: decides whether a change
//! list describes a creation, a deletion or an in-place update before any
//! remote call is planned.

use crate::diff::{AffectedObject, Change, EntityKind};
use crate::error::{CfConvergeError, PlanError, Result};

/// The state transition a change list describes.
#[derive(Debug, Clone, Copy)]
pub enum Classification<'c> {
    /// The entity only exists in desired state; carries the desired record.
    Create(&'c AffectedObject),
    /// The entity only exists in live state; carries the live record.
    Delete(&'c AffectedObject),
    /// The entity exists on both sides; carries the field-level changes.
    Update(&'c [Change]),
}

/// Classifies the change list of one entity.
///
/// # Errors
///
/// Returns a precondition violation for an empty entity name, and an
/// invariant violation for a change outside the entity or any list mixing
/// whole-record additions or removals with other changes.
pub fn classify<'c>(
    kind: EntityKind,
    entity: &str,
    changes: &'c [Change],
) -> Result<Classification<'c>> {
    if entity.is_empty() {
        return Err(CfConvergeError::Plan(PlanError::precondition(format!(
            "{kind} name must not be empty"
        ))));
    }

    if let Some(foreign) = changes
        .iter()
        .find(|c| c.path.kind() != Some(kind) || c.path.entity_name() != Some(entity))
    {
        return Err(CfConvergeError::Plan(PlanError::invariant(
            kind,
            entity,
            format!("change at '{}' belongs to another entity", foreign.path),
        )));
    }

    let added = changes.iter().filter(|c| c.is_object_added()).count();
    let removed = changes.iter().filter(|c| c.is_object_removed()).count();

    match (changes, added, removed) {
        (_, 0, 0) => Ok(Classification::Update(changes)),
        ([only], 1, 0) if only.path.is_entity_root() => Ok(Classification::Create(&only.affected)),
        ([only], 0, 1) if only.path.is_entity_root() => Ok(Classification::Delete(&only.affected)),
        ([only], _, _) => Err(CfConvergeError::Plan(PlanError::invariant(
            kind,
            entity,
            format!("{} below the entity root at '{}'", only.variant_name(), only.path),
        ))),
        (_, _, removed) if removed > 1 => Err(CfConvergeError::Plan(PlanError::invariant(
            kind,
            entity,
            format!("{removed} removals of the same entity"),
        ))),
        (_, added, _) if added > 1 => Err(CfConvergeError::Plan(PlanError::invariant(
            kind,
            entity,
            format!("{added} additions of the same entity"),
        ))),
        _ => Err(CfConvergeError::Plan(PlanError::invariant(
            kind,
            entity,
            "whole-record change mixed with field changes",
        ))),
    }
}

/// Builds the error for an affected record of the wrong type.
pub fn unexpected_affected(kind: EntityKind, entity: &str, affected: &AffectedObject) -> CfConvergeError {
    CfConvergeError::Plan(PlanError::invariant(
        kind,
        entity,
        format!("affected record is a {}, expected a {kind}", affected.type_name()),
    ))
}
