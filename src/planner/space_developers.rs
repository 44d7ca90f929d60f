//! Planner for the space developer list.

use tracing::debug;

use crate::diff::{Change, ChangeKind, EntityKind};
use crate::error::{CfConvergeError, PlanError, Result};
use crate::platform::SpaceDevelopersOperations;

use super::unit::{Operation, UnitOfWork};

const KIND: EntityKind = EntityKind::SpaceDevelopers;

/// Translates a space developer list change into grant and revoke calls.
#[derive(Debug, Default)]
pub struct SpaceDevelopersRequestsPlanner;

impl SpaceDevelopersRequestsPlanner {
    /// Creates a new space developer planner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Plans one grant per added user and one revoke per removed user.
    ///
    /// # Errors
    ///
    /// Returns an invariant violation unless the list holds at most one
    /// collection change of the space developer list.
    pub fn plan<'a, P>(&self, ops: &'a P, changes: &[Change]) -> Result<Vec<UnitOfWork<'a>>>
    where
        P: SpaceDevelopersOperations + ?Sized,
    {
        let change = match changes {
            [] => return Ok(Vec::new()),
            [only] => only,
            _ => {
                return Err(CfConvergeError::Plan(PlanError::invariant(
                    KIND,
                    "",
                    format!("{} changes to the space developer list", changes.len()),
                )));
            }
        };

        let ChangeKind::CollectionChanged { added, removed } = &change.kind else {
            return Err(CfConvergeError::Plan(PlanError::invariant(
                KIND,
                "",
                format!("unexpected {} change", change.variant_name()),
            )));
        };
        if change.path.kind() != Some(KIND) {
            return Err(CfConvergeError::Plan(PlanError::invariant(
                KIND,
                "",
                format!("change at '{}' is not the space developer list", change.path),
            )));
        }

        let mut units = Vec::with_capacity(added.len() + removed.len());

        for username in added {
            let user = username.clone();
            units.push(UnitOfWork::new(
                KIND,
                "",
                Operation::GrantSpaceDeveloper {
                    username: username.clone(),
                },
                async move { ops.grant_space_developer(&user).await },
            ));
        }
        for username in removed {
            let user = username.clone();
            units.push(UnitOfWork::new(
                KIND,
                "",
                Operation::RevokeSpaceDeveloper {
                    username: username.clone(),
                },
                async move { ops.revoke_space_developer(&user).await },
            ));
        }

        debug!("Planned {} space developer calls", units.len());
        Ok(units)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigTree;
    use crate::diff::{AffectedObject, ChangePath, TreeDiffer};
    use crate::platform::MockSpaceDevelopersOperations;
    use futures::future::join_all;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_grant_and_revoke() {
        let changes = TreeDiffer::new().diff(
            &ConfigTree::from_space_developers(names(&["alice", "bob"])),
            &ConfigTree::from_space_developers(names(&["alice", "carol"])),
        );

        let mut ops = MockSpaceDevelopersOperations::new();
        ops.expect_grant_space_developer()
            .withf(|user| user == "carol")
            .times(1)
            .returning(|_| Ok(()));
        ops.expect_revoke_space_developer()
            .withf(|user| user == "bob")
            .times(1)
            .returning(|_| Ok(()));

        let units = SpaceDevelopersRequestsPlanner::new()
            .plan(&ops, &changes)
            .unwrap();
        assert_eq!(units.len(), 2);

        let results = join_all(units.into_iter().map(|u| u.into_parts().1)).await;
        assert!(results.iter().all(Result::is_ok));
    }

    #[test]
    fn test_wrong_change_kind_rejected() {
        let changes = vec![Change::object_added(
            ChangePath::root(KIND),
            AffectedObject::SpaceDevelopers(vec![]),
        )];

        let ops = MockSpaceDevelopersOperations::new();
        let result = SpaceDevelopersRequestsPlanner::new().plan(&ops, &changes);
        assert!(matches!(
            result,
            Err(CfConvergeError::Plan(PlanError::InvariantViolation { .. }))
        ));
    }

    #[test]
    fn test_no_change_no_calls() {
        let ops = MockSpaceDevelopersOperations::new();
        let units = SpaceDevelopersRequestsPlanner::new().plan(&ops, &[]).unwrap();
        assert!(units.is_empty());
    }
}
