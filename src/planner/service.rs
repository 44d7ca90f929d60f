//! Planner for service instances.
//!
//! Service instances can only be created or deleted. Any in-place change is
//! rejected so it is never silently dropped.

use tracing::debug;

use crate::diff::{AffectedObject, Change, EntityKind};
use crate::error::{CfConvergeError, PlanError, Result};
use crate::platform::ServicesOperations;

use super::classify::{Classification, classify, unexpected_affected};
use super::unit::{Operation, UnitOfWork};

const KIND: EntityKind = EntityKind::Services;

/// Translates service instance changes into remote calls.
#[derive(Debug, Default)]
pub struct ServiceRequestsPlanner;

impl ServiceRequestsPlanner {
    /// Creates a new service planner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Plans the remote calls converging one service instance.
    ///
    /// # Errors
    ///
    /// Returns a planning error if the change list is not a valid
    /// description of a creation or deletion, and an unsupported-change
    /// error for any field-level change.
    pub fn plan<'a, P>(
        &self,
        ops: &'a P,
        name: &str,
        changes: &[Change],
    ) -> Result<Vec<UnitOfWork<'a>>>
    where
        P: ServicesOperations + ?Sized,
    {
        match classify(KIND, name, changes)? {
            Classification::Create(AffectedObject::Service(config)) => {
                let entity = name.to_string();
                let config = config.clone();
                let operation = Operation::CreateService {
                    service: config.service.clone(),
                    plan: config.plan.clone(),
                };
                Ok(vec![UnitOfWork::new(KIND, name, operation, async move {
                    ops.create_service(&entity, &config).await
                })])
            }
            Classification::Delete(AffectedObject::Service(_)) => {
                let entity = name.to_string();
                Ok(vec![UnitOfWork::new(
                    KIND,
                    name,
                    Operation::DeleteService,
                    async move { ops.delete_service(&entity).await },
                )])
            }
            Classification::Create(other) | Classification::Delete(other) => {
                Err(unexpected_affected(KIND, name, other))
            }
            Classification::Update([]) => {
                debug!("Service '{name}' is up to date");
                Ok(Vec::new())
            }
            Classification::Update([first, ..]) => {
                Err(CfConvergeError::Plan(PlanError::UnsupportedChange {
                    kind: KIND,
                    entity: name.to_string(),
                    change: first.to_string(),
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::diff::{ChangePath, MapEntryChange};
    use crate::error::{PlatformError, ReconcileError};
    use crate::platform::MockServicesOperations;

    fn service_root(name: &str) -> ChangePath {
        ChangePath::entity(KIND, name)
    }

    #[tokio::test]
    async fn test_create_service() {
        let changes = vec![Change::object_added(
            service_root("db"),
            AffectedObject::Service(ServiceConfig::new("postgres", "small")),
        )];

        let mut ops = MockServicesOperations::new();
        ops.expect_create_service()
            .withf(|name, config| name == "db" && config.plan == "small")
            .times(1)
            .returning(|_, _| Ok(()));

        let units = ServiceRequestsPlanner::new().plan(&ops, "db", &changes).unwrap();
        assert_eq!(units.len(), 1);
        let (_, call) = units.into_iter().next().unwrap().into_parts();
        call.await.unwrap();
    }

    #[test]
    fn test_create_with_wrong_record_type() {
        let changes = vec![Change::object_added(
            service_root("db"),
            AffectedObject::SpaceDevelopers(vec![String::from("alice")]),
        )];

        let ops = MockServicesOperations::new();
        let result = ServiceRequestsPlanner::new().plan(&ops, "db", &changes);
        assert!(matches!(
            result,
            Err(CfConvergeError::Plan(PlanError::InvariantViolation { .. }))
        ));
    }

    #[test]
    fn test_two_removals_rejected() {
        let removal = Change::object_removed(
            service_root("db"),
            AffectedObject::Service(ServiceConfig::default()),
        );
        let changes = vec![removal.clone(), removal];

        let ops = MockServicesOperations::new();
        let result = ServiceRequestsPlanner::new().plan(&ops, "db", &changes);
        assert!(matches!(
            result,
            Err(CfConvergeError::Plan(PlanError::InvariantViolation { .. }))
        ));
    }

    #[tokio::test]
    async fn test_delete_failure_is_wrapped() {
        let changes = vec![Change::object_removed(
            service_root("db"),
            AffectedObject::Service(ServiceConfig::default()),
        )];

        let mut ops = MockServicesOperations::new();
        ops.expect_delete_service()
            .returning(|_| Err(CfConvergeError::Platform(PlatformError::not_found("service", "db"))));

        let units = ServiceRequestsPlanner::new().plan(&ops, "db", &changes).unwrap();
        let (_, call) = units.into_iter().next().unwrap().into_parts();
        assert!(matches!(
            call.await,
            Err(CfConvergeError::Reconcile(ReconcileError::ApplyFailed { .. }))
        ));
    }

    #[test]
    fn test_field_change_not_supported() {
        let changes = vec![Change::map_changed(
            service_root("db").child("params"),
            AffectedObject::Service(ServiceConfig::default()),
            vec![MapEntryChange::added("region", "eu")],
        )];

        let ops = MockServicesOperations::new();
        let error = ServiceRequestsPlanner::new()
            .plan(&ops, "db", &changes)
            .unwrap_err();
        assert!(matches!(
            error,
            CfConvergeError::Plan(PlanError::UnsupportedChange { .. })
        ));
        assert!(error.to_string().contains("Change type is not supported."));
    }

    #[test]
    fn test_no_changes_no_calls() {
        let ops = MockServicesOperations::new();
        let units = ServiceRequestsPlanner::new().plan(&ops, "db", &[]).unwrap();
        assert!(units.is_empty());
    }
}
