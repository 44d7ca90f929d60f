//! Planner for applications.

use tracing::{debug, warn};

use crate::config::{ApplicationConfig, ManifestConfig};
use crate::diff::{AffectedObject, Change, ChangeKind, EntityKind, EntryChangeKind};
use crate::error::Result;
use crate::platform::{ApplicationsOperations, ScaleParameters};

use super::classify::{Classification, classify, unexpected_affected};
use super::unit::{Operation, UnitOfWork};

const KIND: EntityKind = EntityKind::Applications;

/// Translates application changes into remote calls.
#[derive(Debug, Default)]
pub struct ApplicationRequestsPlanner;

/// Field changes that coalesce into a single call.
#[derive(Default)]
struct Pending<'c> {
    scale: ScaleParameters,
    health_check: Option<&'c ManifestConfig>,
}

impl ApplicationRequestsPlanner {
    /// Creates a new application planner.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Plans the remote calls converging one application.
    ///
    /// No call is issued until the returned units are polled.
    ///
    /// # Errors
    ///
    /// Returns a planning error if the change list is not a valid
    /// description of one application's transition.
    pub fn plan<'a, P>(
        &self,
        ops: &'a P,
        name: &str,
        changes: &[Change],
    ) -> Result<Vec<UnitOfWork<'a>>>
    where
        P: ApplicationsOperations + ?Sized,
    {
        match classify(KIND, name, changes)? {
            Classification::Create(AffectedObject::Application(config)) => {
                Ok(vec![Self::create(ops, name, config.clone())])
            }
            Classification::Delete(AffectedObject::Application(_)) => {
                let entity = name.to_string();
                Ok(vec![UnitOfWork::new(
                    KIND,
                    name,
                    Operation::DeleteApplication,
                    async move { ops.delete_application(&entity).await },
                )])
            }
            Classification::Create(other) | Classification::Delete(other) => {
                Err(unexpected_affected(KIND, name, other))
            }
            Classification::Update(changes) => Self::update(ops, name, changes),
        }
    }

    fn create<'a, P>(ops: &'a P, name: &str, config: ApplicationConfig) -> UnitOfWork<'a>
    where
        P: ApplicationsOperations + ?Sized,
    {
        let entity = name.to_string();
        UnitOfWork::new(KIND, name, Operation::CreateApplication, async move {
            ops.create_application(&entity, &config).await
        })
    }

    fn update<'a, P>(ops: &'a P, name: &str, changes: &[Change]) -> Result<Vec<UnitOfWork<'a>>>
    where
        P: ApplicationsOperations + ?Sized,
    {
        let mut units = Vec::new();
        let mut pending = Pending::default();

        for change in changes {
            let field = change.property().unwrap_or_default();
            debug!("Planning {change}");

            match (field, &change.kind) {
                ("instances" | "memory" | "disk", ChangeKind::ValueChanged { .. }) => {
                    let manifest = manifest_of(name, change)?;
                    let value = match field {
                        "instances" => manifest.instances,
                        "memory" => manifest.memory,
                        _ => manifest.disk,
                    };
                    match (field, value) {
                        (_, None) => warn!("Application '{name}': {field} cannot be unset, skipping"),
                        ("instances", value) => pending.scale.instances = value,
                        ("memory", value) => pending.scale.memory = value,
                        (_, value) => pending.scale.disk = value,
                    }
                }
                (
                    "healthCheckType" | "healthCheckHttpEndpoint",
                    ChangeKind::ValueChanged { .. },
                ) => {
                    pending.health_check = Some(manifest_of(name, change)?);
                }
                ("environmentVariables", ChangeKind::MapChanged { entries }) => {
                    for entry in entries {
                        units.push(Self::environment_unit(
                            ops,
                            name,
                            entry.kind,
                            &entry.key,
                            entry.after.clone(),
                        ));
                    }
                }
                ("services", ChangeKind::CollectionChanged { added, removed }) => {
                    for service in added {
                        units.push(Self::binding_unit(ops, name, service, true));
                    }
                    for service in removed {
                        units.push(Self::binding_unit(ops, name, service, false));
                    }
                }
                ("name", ChangeKind::ValueChanged { after: Some(new_name), .. }) => {
                    let entity = name.to_string();
                    let target = new_name.clone();
                    units.push(UnitOfWork::new(
                        KIND,
                        name,
                        Operation::RenameApplication {
                            new_name: new_name.clone(),
                        },
                        async move { ops.rename_application(&entity, &target).await },
                    ));
                }
                _ => {
                    warn!(
                        "Application '{name}': no remote call changes {}, skipping",
                        change.path
                    );
                }
            }
        }

        if !pending.scale.is_empty() {
            let entity = name.to_string();
            let scale = pending.scale;
            units.push(UnitOfWork::new(
                KIND,
                name,
                Operation::ScaleApplication(scale),
                async move { ops.scale_application(&entity, scale).await },
            ));
        }

        if let Some(manifest) = pending.health_check {
            match manifest.health_check_type {
                Some(health_check_type) => {
                    let entity = name.to_string();
                    let endpoint = manifest.health_check_http_endpoint.clone();
                    units.push(UnitOfWork::new(
                        KIND,
                        name,
                        Operation::SetHealthCheck {
                            health_check_type,
                            endpoint: endpoint.clone(),
                        },
                        async move {
                            ops.set_health_check(&entity, health_check_type, endpoint)
                                .await
                        },
                    ));
                }
                None => warn!("Application '{name}': health check type cannot be unset, skipping"),
            }
        }

        debug!("Planned {} calls for application '{name}'", units.len());
        Ok(units)
    }

    fn environment_unit<'a, P>(
        ops: &'a P,
        name: &str,
        kind: EntryChangeKind,
        key: &str,
        value: Option<String>,
    ) -> UnitOfWork<'a>
    where
        P: ApplicationsOperations + ?Sized,
    {
        let entity = name.to_string();
        let variable = key.to_string();

        match kind {
            EntryChangeKind::Added | EntryChangeKind::Changed => {
                let value = value.unwrap_or_default();
                UnitOfWork::new(
                    KIND,
                    name,
                    Operation::AddEnvironmentVariable {
                        key: key.to_string(),
                    },
                    async move {
                        ops.add_environment_variable(&entity, &variable, &value)
                            .await
                    },
                )
            }
            EntryChangeKind::Removed => UnitOfWork::new(
                KIND,
                name,
                Operation::RemoveEnvironmentVariable {
                    key: key.to_string(),
                },
                async move { ops.remove_environment_variable(&entity, &variable).await },
            ),
        }
    }

    fn binding_unit<'a, P>(ops: &'a P, name: &str, service: &str, bind: bool) -> UnitOfWork<'a>
    where
        P: ApplicationsOperations + ?Sized,
    {
        let entity = name.to_string();
        let instance = service.to_string();

        if bind {
            UnitOfWork::new(
                KIND,
                name,
                Operation::BindService {
                    service: service.to_string(),
                },
                async move { ops.bind_service(&entity, &instance).await },
            )
        } else {
            UnitOfWork::new(
                KIND,
                name,
                Operation::UnbindService {
                    service: service.to_string(),
                },
                async move { ops.unbind_service(&entity, &instance).await },
            )
        }
    }
}

/// Returns the desired manifest a manifest field change carries.
fn manifest_of<'c>(name: &str, change: &'c Change) -> Result<&'c ManifestConfig> {
    match &change.affected {
        AffectedObject::Manifest(manifest) => Ok(manifest),
        AffectedObject::Application(app) => Ok(&app.manifest),
        other => Err(unexpected_affected(KIND, name, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigTree, HealthCheckType};
    use crate::diff::{ChangePath, MapEntryChange, TreeDiffer};
    use crate::error::{CfConvergeError, PlanError, PlatformError, ReconcileError};
    use crate::platform::MockApplicationsOperations;
    use futures::future::join_all;
    use std::collections::BTreeMap;

    fn manifest_change(field: &'static str, manifest: ManifestConfig) -> Change {
        Change::value_changed(
            ChangePath::entity(KIND, "app1").child("manifest").child(field),
            AffectedObject::Manifest(manifest),
            None,
            None,
        )
    }

    async fn run_all(units: Vec<UnitOfWork<'_>>) -> Vec<Result<()>> {
        join_all(units.into_iter().map(|u| u.into_parts().1)).await
    }

    #[tokio::test]
    async fn test_create_issues_one_call_with_full_config() {
        let mut desired = BTreeMap::new();
        desired.insert(
            String::from("app1"),
            ApplicationConfig::with_manifest(ManifestConfig {
                buildpack: Some(String::from("ruby_buildpack")),
                ..ManifestConfig::default()
            }),
        );
        let changes = TreeDiffer::new().diff(
            &ConfigTree::new(),
            &ConfigTree::from_applications(desired),
        );

        let mut ops = MockApplicationsOperations::new();
        ops.expect_create_application()
            .withf(|name, config| {
                name == "app1" && config.manifest.buildpack.as_deref() == Some("ruby_buildpack")
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let units = ApplicationRequestsPlanner::new()
            .plan(&ops, "app1", &changes)
            .unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].operation(), &Operation::CreateApplication);

        let results = run_all(units).await;
        assert!(results.iter().all(Result::is_ok));
    }

    #[tokio::test]
    async fn test_delete_issues_one_call() {
        let changes = vec![Change::object_removed(
            ChangePath::entity(KIND, "app1"),
            AffectedObject::Application(ApplicationConfig::default()),
        )];

        let mut ops = MockApplicationsOperations::new();
        ops.expect_delete_application()
            .withf(|name| name == "app1")
            .times(1)
            .returning(|_| Ok(()));

        let units = ApplicationRequestsPlanner::new()
            .plan(&ops, "app1", &changes)
            .unwrap();
        assert!(run_all(units).await.iter().all(Result::is_ok));
    }

    #[tokio::test]
    async fn test_instances_change_scales_only_instances() {
        let manifest = ManifestConfig {
            instances: Some(3),
            memory: Some(256),
            ..ManifestConfig::default()
        };
        let changes = vec![manifest_change("instances", manifest)];

        let mut ops = MockApplicationsOperations::new();
        ops.expect_scale_application()
            .withf(|name, scale| {
                name == "app1"
                    && *scale
                        == ScaleParameters {
                            instances: Some(3),
                            memory: None,
                            disk: None,
                        }
            })
            .times(1)
            .returning(|_, _| Ok(()));

        let units = ApplicationRequestsPlanner::new()
            .plan(&ops, "app1", &changes)
            .unwrap();
        assert_eq!(units.len(), 1);
        assert!(run_all(units).await.iter().all(Result::is_ok));
    }

    #[test]
    fn test_scale_dimensions_coalesce() {
        let manifest = ManifestConfig {
            instances: Some(2),
            memory: Some(1024),
            disk: Some(2048),
            ..ManifestConfig::default()
        };
        let changes = vec![
            manifest_change("instances", manifest.clone()),
            manifest_change("memory", manifest.clone()),
            manifest_change("disk", manifest),
        ];

        let ops = MockApplicationsOperations::new();
        let units = ApplicationRequestsPlanner::new()
            .plan(&ops, "app1", &changes)
            .unwrap();

        assert_eq!(
            units.iter().map(UnitOfWork::operation).collect::<Vec<_>>(),
            vec![&Operation::ScaleApplication(ScaleParameters {
                instances: Some(2),
                memory: Some(1024),
                disk: Some(2048),
            })]
        );
    }

    #[test]
    fn test_environment_and_binding_changes() {
        let changes = vec![
            Change::map_changed(
                ChangePath::entity(KIND, "app1")
                    .child("manifest")
                    .child("environmentVariables"),
                AffectedObject::Manifest(ManifestConfig::default()),
                vec![
                    MapEntryChange::added("NEW", "1"),
                    MapEntryChange::changed("EDIT", "a", "b"),
                    MapEntryChange::removed("OLD", "x"),
                ],
            ),
            Change::collection_changed(
                ChangePath::entity(KIND, "app1").child("manifest").child("services"),
                AffectedObject::Manifest(ManifestConfig::default()),
                vec![String::from("db")],
                vec![String::from("cache")],
            ),
        ];

        let ops = MockApplicationsOperations::new();
        let units = ApplicationRequestsPlanner::new()
            .plan(&ops, "app1", &changes)
            .unwrap();

        let operations: Vec<String> = units.iter().map(|u| u.operation().to_string()).collect();
        assert_eq!(
            operations,
            vec![
                "set env NEW",
                "set env EDIT",
                "unset env OLD",
                "bind db",
                "unbind cache",
            ]
        );
    }

    #[test]
    fn test_health_check_uses_desired_manifest() {
        let manifest = ManifestConfig {
            health_check_type: Some(HealthCheckType::Http),
            health_check_http_endpoint: Some(String::from("/health")),
            ..ManifestConfig::default()
        };
        let changes = vec![
            manifest_change("healthCheckType", manifest.clone()),
            manifest_change("healthCheckHttpEndpoint", manifest),
        ];

        let ops = MockApplicationsOperations::new();
        let units = ApplicationRequestsPlanner::new()
            .plan(&ops, "app1", &changes)
            .unwrap();

        assert_eq!(units.len(), 1);
        assert_eq!(
            units[0].operation(),
            &Operation::SetHealthCheck {
                health_check_type: HealthCheckType::Http,
                endpoint: Some(String::from("/health")),
            }
        );
    }

    #[test]
    fn test_unset_health_check_and_unmapped_fields_produce_nothing() {
        let changes = vec![
            manifest_change("healthCheckType", ManifestConfig::default()),
            manifest_change("buildpack", ManifestConfig::default()),
            manifest_change("instances", ManifestConfig::default()),
        ];

        let ops = MockApplicationsOperations::new();
        let units = ApplicationRequestsPlanner::new()
            .plan(&ops, "app1", &changes)
            .unwrap();
        assert!(units.is_empty());
    }

    #[test]
    fn test_name_change_renames() {
        let changes = vec![Change::value_changed(
            ChangePath::entity(KIND, "app1").child("name"),
            AffectedObject::Application(ApplicationConfig::default()),
            Some(String::from("app1")),
            Some(String::from("app1-v2")),
        )];

        let ops = MockApplicationsOperations::new();
        let units = ApplicationRequestsPlanner::new()
            .plan(&ops, "app1", &changes)
            .unwrap();
        assert_eq!(
            units[0].operation(),
            &Operation::RenameApplication {
                new_name: String::from("app1-v2"),
            }
        );
    }

    #[test]
    fn test_wrong_affected_type_is_invariant_violation() {
        let changes = vec![Change::object_added(
            ChangePath::entity(KIND, "app1"),
            AffectedObject::SpaceDevelopers(vec![]),
        )];

        let ops = MockApplicationsOperations::new();
        let result = ApplicationRequestsPlanner::new().plan(&ops, "app1", &changes);
        assert!(matches!(
            result,
            Err(CfConvergeError::Plan(PlanError::InvariantViolation { .. }))
        ));
    }

    #[tokio::test]
    async fn test_remote_failure_is_wrapped() {
        let changes = vec![Change::object_removed(
            ChangePath::entity(KIND, "app1"),
            AffectedObject::Application(ApplicationConfig::default()),
        )];

        let mut ops = MockApplicationsOperations::new();
        ops.expect_delete_application()
            .returning(|_| Err(CfConvergeError::Platform(PlatformError::network("down"))));

        let units = ApplicationRequestsPlanner::new()
            .plan(&ops, "app1", &changes)
            .unwrap();
        let results = run_all(units).await;
        assert!(matches!(
            results[0],
            Err(CfConvergeError::Reconcile(ReconcileError::ApplyFailed { .. }))
        ));
    }
}
