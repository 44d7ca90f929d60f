//! Grouping of a flat change list by entity.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{CfConvergeError, PlanError, Result};

use super::change::{Change, ChangeKind, EntityKind};

/// Changes grouped by entity kind and entity name.
///
/// Each entry holds exactly the changes whose path lies within that entity.
/// Entities without changes are absent.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffResult {
    application_changes: BTreeMap<String, Vec<Change>>,
    service_changes: BTreeMap<String, Vec<Change>>,
    space_developers_change: Option<Change>,
}

/// Per-entity counts of a diff.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DiffSummary {
    /// Entities that would be created.
    pub creates: usize,
    /// Entities that would be updated in place.
    pub updates: usize,
    /// Entities that would be deleted.
    pub deletes: usize,
}

impl DiffResult {
    /// Partitions a change list by entity.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation if a change path does not address
    /// an entity of its section, and an invariant violation if more than one
    /// space developer change is present.
    pub fn build(changes: Vec<Change>) -> Result<Self> {
        let mut result = Self::default();

        for change in changes {
            match change.path.kind() {
                Some(EntityKind::Applications) => {
                    let name = entity_name(&change)?;
                    result.application_changes.entry(name).or_default().push(change);
                }
                Some(EntityKind::Services) => {
                    let name = entity_name(&change)?;
                    result.service_changes.entry(name).or_default().push(change);
                }
                Some(EntityKind::SpaceDevelopers) => {
                    if !matches!(change.kind, ChangeKind::CollectionChanged { .. }) {
                        return Err(CfConvergeError::Plan(PlanError::invariant(
                            EntityKind::SpaceDevelopers,
                            "",
                            format!("unexpected {} change", change.variant_name()),
                        )));
                    }
                    if result.space_developers_change.is_some() {
                        return Err(CfConvergeError::Plan(PlanError::invariant(
                            EntityKind::SpaceDevelopers,
                            "",
                            "more than one change to the space developer list",
                        )));
                    }
                    result.space_developers_change = Some(change);
                }
                None => {
                    return Err(CfConvergeError::Plan(PlanError::precondition(format!(
                        "change path '{}' does not start with an entity kind",
                        change.path
                    ))));
                }
            }
        }

        Ok(result)
    }

    /// Returns application changes keyed by application name.
    #[must_use]
    pub const fn application_changes(&self) -> &BTreeMap<String, Vec<Change>> {
        &self.application_changes
    }

    /// Returns service changes keyed by service name.
    #[must_use]
    pub const fn service_changes(&self) -> &BTreeMap<String, Vec<Change>> {
        &self.service_changes
    }

    /// Returns the change to the space developer list, if any.
    #[must_use]
    pub const fn space_developers_change(&self) -> Option<&Change> {
        self.space_developers_change.as_ref()
    }

    /// Returns true if there are no changes at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.application_changes.is_empty()
            && self.service_changes.is_empty()
            && self.space_developers_change.is_none()
    }

    /// Returns the total number of changes.
    #[must_use]
    pub fn change_count(&self) -> usize {
        self.application_changes.values().map(Vec::len).sum::<usize>()
            + self.service_changes.values().map(Vec::len).sum::<usize>()
            + usize::from(self.space_developers_change.is_some())
    }

    /// Iterates over every change in the result.
    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.application_changes
            .values()
            .chain(self.service_changes.values())
            .flatten()
            .chain(self.space_developers_change.iter())
    }

    /// Counts entities by the transition they would go through.
    #[must_use]
    pub fn summary(&self) -> DiffSummary {
        let mut summary = DiffSummary::default();

        for changes in self.application_changes.values().chain(self.service_changes.values()) {
            match changes.as_slice() {
                [only] if only.is_object_added() => summary.creates += 1,
                [only] if only.is_object_removed() => summary.deletes += 1,
                _ => summary.updates += 1,
            }
        }
        if self.space_developers_change.is_some() {
            summary.updates += 1;
        }

        summary
    }
}

impl DiffSummary {
    /// Returns true if nothing would change.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.creates == 0 && self.updates == 0 && self.deletes == 0
    }
}

fn entity_name(change: &Change) -> Result<String> {
    change
        .path
        .entity_name()
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| {
            CfConvergeError::Plan(PlanError::precondition(format!(
                "change path '{}' does not name an entity",
                change.path
            )))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApplicationConfig, ManifestConfig, ServiceConfig};
    use crate::diff::{AffectedObject, ChangePath, PathSegment};

    fn manifest_change(app: &str, field: &'static str) -> Change {
        Change::value_changed(
            ChangePath::entity(EntityKind::Applications, app)
                .child("manifest")
                .child(field),
            AffectedObject::Manifest(ManifestConfig::default()),
            Some(String::from("1")),
            Some(String::from("2")),
        )
    }

    fn developers_change() -> Change {
        Change::collection_changed(
            ChangePath::root(EntityKind::SpaceDevelopers),
            AffectedObject::SpaceDevelopers(vec![]),
            vec![String::from("carol")],
            vec![],
        )
    }

    #[test]
    fn test_partition_is_exact() {
        let changes = vec![
            manifest_change("app1", "instances"),
            manifest_change("app1", "memory"),
            manifest_change("app2", "disk"),
            Change::object_added(
                ChangePath::entity(EntityKind::Services, "db"),
                AffectedObject::Service(ServiceConfig::new("postgres", "small")),
            ),
            developers_change(),
        ];

        let result = DiffResult::build(changes.clone()).unwrap();

        assert_eq!(result.application_changes()["app1"].len(), 2);
        assert_eq!(result.application_changes()["app2"].len(), 1);
        assert_eq!(result.service_changes()["db"].len(), 1);
        assert!(result.space_developers_change().is_some());
        assert_eq!(result.change_count(), changes.len());
        for change in &changes {
            assert!(result.iter().any(|c| c == change));
        }
    }

    #[test]
    fn test_empty_change_list() {
        let result = DiffResult::build(Vec::new()).unwrap();
        assert!(result.is_empty());
        assert!(result.summary().is_empty());
    }

    #[test]
    fn test_summary_counts_entities() {
        let changes = vec![
            Change::object_added(
                ChangePath::entity(EntityKind::Applications, "new"),
                AffectedObject::Application(ApplicationConfig::default()),
            ),
            Change::object_removed(
                ChangePath::entity(EntityKind::Services, "old"),
                AffectedObject::Service(ServiceConfig::default()),
            ),
            manifest_change("app1", "instances"),
            manifest_change("app1", "memory"),
        ];

        let summary = DiffResult::build(changes).unwrap().summary();
        assert_eq!(
            summary,
            DiffSummary {
                creates: 1,
                updates: 1,
                deletes: 1,
            }
        );
    }

    #[test]
    fn test_two_developer_changes_rejected() {
        let result = DiffResult::build(vec![developers_change(), developers_change()]);
        assert!(matches!(
            result,
            Err(CfConvergeError::Plan(PlanError::InvariantViolation { .. }))
        ));
    }

    #[test]
    fn test_path_without_entity_rejected() {
        let change = Change::object_added(
            ChangePath::from_segments(vec![PathSegment::Kind(EntityKind::Applications)]),
            AffectedObject::Application(ApplicationConfig::default()),
        );
        let result = DiffResult::build(vec![change]);
        assert!(matches!(
            result,
            Err(CfConvergeError::Plan(PlanError::PreconditionViolation { .. }))
        ));
    }
}
