//! Reconciler for converging live state to desired state.
//!
//! One run per entity kind: fetch the live entities of that kind, diff them
//! against the desired entities of the same kind, plan every changed entity
//! and submit all resulting units of work concurrently. A section absent
//! from the desired document is never reconciled.

use serde::Serialize;
use std::slice;
use tracing::{debug, info, warn};

use crate::config::{ConfigHasher, ConfigTree, SpecConfig};
use crate::diff::{Change, DiffResult, EntityKind, TreeDiffer};
use crate::error::{CfConvergeError, ReconcileError, Result};
use crate::planner::{
    ApplicationRequestsPlanner, BatchReport, PlanExecutor, PlannedOperation,
    ServiceRequestsPlanner, SpaceDevelopersRequestsPlanner, UnitOfWork,
};
use crate::platform::Platform;

/// Order in which `apply_all` reconciles kinds; bindings need their services.
pub const APPLY_ORDER: [EntityKind; 3] = [
    EntityKind::SpaceDevelopers,
    EntityKind::Services,
    EntityKind::Applications,
];

/// Reconciler for one space.
pub struct Reconciler<'a, P: Platform + ?Sized> {
    /// Remote platform.
    platform: &'a P,
    /// Desired state.
    desired: &'a SpecConfig,
    /// Tree differ.
    differ: TreeDiffer,
    /// Batch executor.
    executor: PlanExecutor,
    /// Configuration hasher.
    hasher: ConfigHasher,
}

/// An entity left untouched because its changes could not be planned.
#[derive(Debug, Clone, Serialize)]
pub struct SkippedEntity {
    /// Entity name; empty for the space developer list.
    pub entity: String,
    /// Why planning failed.
    pub reason: String,
}

/// Result of reconciling one entity kind.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunReport {
    /// Reconciled kind.
    pub kind: EntityKind,
    /// Short fingerprint of the desired section.
    pub fingerprint: String,
    /// Number of changes found.
    pub changes: usize,
    /// Number of entities whose calls were submitted.
    pub entities_planned: usize,
    /// Entities skipped by planning errors.
    pub skipped: Vec<SkippedEntity>,
    /// Outcome of the submitted calls.
    pub batch: BatchReport,
}

/// Result of planning one entity kind without submitting anything.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanReport {
    /// Planned kind.
    pub kind: EntityKind,
    /// Short fingerprint of the desired section.
    pub fingerprint: String,
    /// Calls that would be issued.
    pub operations: Vec<PlannedOperation>,
    /// Entities that could not be planned.
    pub skipped: Vec<SkippedEntity>,
}

/// Units of work of one kind, plus the entities that could not be planned.
struct PlannedBatch<'a> {
    units: Vec<UnitOfWork<'a>>,
    entities_planned: usize,
    skipped: Vec<SkippedEntity>,
}

impl<'a, P: Platform + ?Sized> Reconciler<'a, P> {
    /// Creates a new reconciler.
    #[must_use]
    pub const fn new(platform: &'a P, desired: &'a SpecConfig) -> Self {
        Self {
            platform,
            desired,
            differ: TreeDiffer::new(),
            executor: PlanExecutor::new(),
            hasher: ConfigHasher::new(),
        }
    }

    /// Reconciles applications.
    ///
    /// Returns `None` if the desired document has no applications section.
    ///
    /// # Errors
    ///
    /// Returns an error only if the live applications cannot be fetched.
    pub async fn apply_applications(&self) -> Result<Option<RunReport>> {
        self.apply(EntityKind::Applications).await
    }

    /// Reconciles service instances.
    ///
    /// Returns `None` if the desired document has no services section.
    ///
    /// # Errors
    ///
    /// Returns an error only if the live service instances cannot be fetched.
    pub async fn apply_services(&self) -> Result<Option<RunReport>> {
        self.apply(EntityKind::Services).await
    }

    /// Reconciles the space developer list.
    ///
    /// Returns `None` if the desired document has no space developer section.
    ///
    /// # Errors
    ///
    /// Returns an error only if the live space developers cannot be fetched.
    pub async fn apply_space_developers(&self) -> Result<Option<RunReport>> {
        self.apply(EntityKind::SpaceDevelopers).await
    }

    /// Reconciles every present section in [`APPLY_ORDER`].
    ///
    /// # Errors
    ///
    /// Returns the first fetch failure; kinds reconciled before it keep
    /// their effects.
    pub async fn apply_all(&self) -> Result<Vec<RunReport>> {
        let mut reports = Vec::new();
        for kind in APPLY_ORDER {
            if let Some(report) = self.apply(kind).await? {
                reports.push(report);
            }
        }
        Ok(reports)
    }

    /// Reconciles one kind.
    ///
    /// # Errors
    ///
    /// Returns an error only if the live state of the kind cannot be fetched.
    pub async fn apply(&self, kind: EntityKind) -> Result<Option<RunReport>> {
        let Some(desired) = self.desired_tree(kind) else {
            debug!("No {} section in the document, skipping", kind.field_name());
            return Ok(None);
        };
        let fingerprint = self.fingerprint(&desired);
        info!("Reconciling {} (desired {fingerprint})", kind.field_name());

        let diff = self.diff_against(kind, &desired).await?;
        let changes = diff.change_count();
        let batch = self.plan_units(kind, &diff);
        let report = self.executor.execute(batch.units).await;

        Ok(Some(RunReport {
            kind,
            fingerprint,
            changes,
            entities_planned: batch.entities_planned,
            skipped: batch.skipped,
            batch: report,
        }))
    }

    /// Plans every present section in [`APPLY_ORDER`] without submitting
    /// any call.
    ///
    /// # Errors
    ///
    /// Returns the first fetch failure.
    pub async fn plan_all(&self) -> Result<Vec<PlanReport>> {
        let mut reports = Vec::new();
        for kind in APPLY_ORDER {
            if let Some(report) = self.plan(kind).await? {
                reports.push(report);
            }
        }
        Ok(reports)
    }

    /// Plans one kind without submitting any call.
    ///
    /// # Errors
    ///
    /// Returns an error only if the live state of the kind cannot be fetched.
    pub async fn plan(&self, kind: EntityKind) -> Result<Option<PlanReport>> {
        let Some(desired) = self.desired_tree(kind) else {
            return Ok(None);
        };
        let fingerprint = self.fingerprint(&desired);

        let diff = self.diff_against(kind, &desired).await?;
        let batch = self.plan_units(kind, &diff);

        Ok(Some(PlanReport {
            kind,
            fingerprint,
            operations: batch
                .units
                .iter()
                .map(|u| u.description().clone())
                .collect(),
            skipped: batch.skipped,
        }))
    }

    /// Computes the changes of one kind.
    ///
    /// # Errors
    ///
    /// Returns an error only if the live state of the kind cannot be fetched.
    pub async fn diff(&self, kind: EntityKind) -> Result<Option<Vec<Change>>> {
        let Some(desired) = self.desired_tree(kind) else {
            return Ok(None);
        };
        let live = self.live_tree(kind).await?;
        Ok(Some(self.differ.diff(&live, &desired)))
    }

    /// Fetches the complete live state.
    ///
    /// # Errors
    ///
    /// Returns an error if any kind cannot be fetched.
    pub async fn fetch_live(&self) -> Result<ConfigTree> {
        let (applications, services, space_developers) = tokio::try_join!(
            self.live_tree(EntityKind::Applications),
            self.live_tree(EntityKind::Services),
            self.live_tree(EntityKind::SpaceDevelopers),
        )?;

        Ok(ConfigTree {
            applications: applications.applications,
            services: services.services,
            space_developers: space_developers.space_developers,
        })
    }

    fn desired_tree(&self, kind: EntityKind) -> Option<ConfigTree> {
        match kind {
            EntityKind::Applications => self
                .desired
                .apps
                .clone()
                .map(ConfigTree::from_applications),
            EntityKind::Services => self.desired.services.clone().map(ConfigTree::from_services),
            EntityKind::SpaceDevelopers => self
                .desired
                .space_developers
                .clone()
                .map(ConfigTree::from_space_developers),
        }
    }

    async fn live_tree(&self, kind: EntityKind) -> Result<ConfigTree> {
        let fetched = match kind {
            EntityKind::Applications => self
                .platform
                .fetch_applications()
                .await
                .map(ConfigTree::from_applications),
            EntityKind::Services => self
                .platform
                .fetch_services()
                .await
                .map(ConfigTree::from_services),
            EntityKind::SpaceDevelopers => self
                .platform
                .fetch_space_developers()
                .await
                .map(ConfigTree::from_space_developers),
        };

        fetched.map_err(|e| {
            CfConvergeError::Reconcile(ReconcileError::FetchFailed {
                kind,
                source: Box::new(e),
            })
        })
    }

    async fn diff_against(&self, kind: EntityKind, desired: &ConfigTree) -> Result<DiffResult> {
        let live = self.live_tree(kind).await?;
        debug!(
            "Live {}: {} entities, desired: {} entities",
            kind.field_name(),
            live.entity_count(),
            desired.entity_count()
        );

        let changes = self.differ.diff(&live, desired);
        info!("{} changes to {}", changes.len(), kind.field_name());
        DiffResult::build(changes)
    }

    fn fingerprint(&self, desired: &ConfigTree) -> String {
        self.hasher.short_hash(&self.hasher.hash_tree(desired))
    }

    /// Plans every entity of a kind; planning errors skip only that entity.
    fn plan_units(&self, kind: EntityKind, diff: &DiffResult) -> PlannedBatch<'a> {
        let mut batch = PlannedBatch {
            units: Vec::new(),
            entities_planned: 0,
            skipped: Vec::new(),
        };

        match kind {
            EntityKind::Applications => {
                let planner = ApplicationRequestsPlanner::new();
                for (name, changes) in diff.application_changes() {
                    batch.record(name, planner.plan(self.platform, name, changes));
                }
            }
            EntityKind::Services => {
                let planner = ServiceRequestsPlanner::new();
                for (name, changes) in diff.service_changes() {
                    batch.record(name, planner.plan(self.platform, name, changes));
                }
            }
            EntityKind::SpaceDevelopers => {
                if let Some(change) = diff.space_developers_change() {
                    let planner = SpaceDevelopersRequestsPlanner::new();
                    batch.record("", planner.plan(self.platform, slice::from_ref(change)));
                }
            }
        }

        batch
    }
}

impl<'a> PlannedBatch<'a> {
    fn record(&mut self, entity: &str, planned: Result<Vec<UnitOfWork<'a>>>) {
        match planned {
            Ok(units) => {
                self.entities_planned += 1;
                self.units.extend(units);
            }
            Err(e) => {
                warn!("Skipping '{entity}': {e}");
                self.skipped.push(SkippedEntity {
                    entity: entity.to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }
}

impl RunReport {
    /// Returns true if every submitted call succeeded and nothing was skipped.
    #[must_use]
    pub fn is_converged(&self) -> bool {
        self.skipped.is_empty() && self.batch.failed() == 0
    }
}

impl PlanReport {
    /// Returns true if nothing would be called and nothing was skipped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty() && self.skipped.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApplicationConfig, ManifestConfig, ServiceConfig};
    use crate::platform::InMemoryPlatform;
    use std::collections::BTreeMap;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    fn app(instances: u32, services: &[&str]) -> ApplicationConfig {
        ApplicationConfig::with_manifest(ManifestConfig {
            instances: Some(instances),
            memory: Some(256),
            services: names(services),
            ..ManifestConfig::default()
        })
    }

    fn desired_spec() -> SpecConfig {
        let mut services = BTreeMap::new();
        services.insert(String::from("db"), ServiceConfig::new("postgres", "small"));

        let mut apps = BTreeMap::new();
        apps.insert(String::from("app1"), app(3, &["db"]));
        apps.insert(String::from("app2"), app(1, &[]));

        SpecConfig {
            space_developers: Some(names(&["alice", "carol"])),
            services: Some(services),
            apps: Some(apps),
        }
    }

    fn live_tree() -> ConfigTree {
        let mut tree = ConfigTree::from_space_developers(names(&["alice", "bob"]));
        tree.applications.insert(String::from("app1"), app(1, &[]));
        tree.applications.insert(String::from("stale"), app(1, &[]));
        tree.services
            .insert(String::from("old-cache"), ServiceConfig::new("redis", "small"));
        tree
    }

    #[tokio::test]
    async fn test_apply_all_converges_and_is_idempotent() {
        let platform = InMemoryPlatform::with_tree(live_tree());
        let spec = desired_spec();
        let reconciler = Reconciler::new(&platform, &spec);

        let reports = reconciler.apply_all().await.unwrap();
        assert_eq!(reports.len(), 3);
        assert!(reports.iter().all(RunReport::is_converged));
        assert_eq!(
            reports.iter().map(|r| r.kind).collect::<Vec<_>>(),
            APPLY_ORDER.to_vec()
        );

        let live = platform.snapshot().unwrap();
        assert_eq!(live, ConfigTree::from_spec(&spec));

        let calls_after_first_run = platform.calls().unwrap().len();
        let reports = reconciler.apply_all().await.unwrap();
        assert!(reports.iter().all(|r| r.changes == 0 && r.batch.total() == 0));
        assert_eq!(platform.calls().unwrap().len(), calls_after_first_run);
    }

    #[tokio::test]
    async fn test_failed_unit_does_not_block_siblings() {
        let platform = InMemoryPlatform::new();
        platform.fail_on("create_application", "app1").unwrap();

        let mut apps = BTreeMap::new();
        apps.insert(String::from("app1"), app(1, &[]));
        apps.insert(String::from("app2"), app(1, &[]));
        apps.insert(String::from("app3"), app(1, &[]));
        let spec = SpecConfig {
            apps: Some(apps),
            ..SpecConfig::default()
        };

        let report = Reconciler::new(&platform, &spec)
            .apply_applications()
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.batch.total(), 3);
        assert_eq!(report.batch.failed(), 1);
        let live = platform.snapshot().unwrap();
        assert!(live.applications.contains_key("app2"));
        assert!(live.applications.contains_key("app3"));
        assert!(!live.applications.contains_key("app1"));
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_run() {
        let platform = InMemoryPlatform::new();
        platform.fail_on("fetch_services", "").unwrap();
        let spec = desired_spec();

        let result = Reconciler::new(&platform, &spec).apply_services().await;

        assert!(matches!(
            result,
            Err(CfConvergeError::Reconcile(ReconcileError::FetchFailed {
                kind: EntityKind::Services,
                ..
            }))
        ));
        assert!(platform.calls().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_absent_section_is_not_reconciled() {
        let platform = InMemoryPlatform::with_tree(live_tree());
        let spec = SpecConfig {
            space_developers: Some(names(&["alice", "bob"])),
            ..SpecConfig::default()
        };
        let reconciler = Reconciler::new(&platform, &spec);

        assert!(reconciler.apply_applications().await.unwrap().is_none());
        let reports = reconciler.apply_all().await.unwrap();
        assert_eq!(reports.len(), 1);
        assert!(platform.calls().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unsupported_service_change_skips_only_that_service() {
        let mut live = ConfigTree::new();
        live.services
            .insert(String::from("db"), ServiceConfig::new("postgres", "small"));
        let platform = InMemoryPlatform::with_tree(live);

        let mut services = BTreeMap::new();
        services.insert(String::from("db"), ServiceConfig::new("postgres", "large"));
        services.insert(String::from("cache"), ServiceConfig::new("redis", "small"));
        let spec = SpecConfig {
            services: Some(services),
            ..SpecConfig::default()
        };

        let report = Reconciler::new(&platform, &spec)
            .apply_services()
            .await
            .unwrap()
            .unwrap();

        assert_eq!(report.entities_planned, 1);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].entity, "db");
        assert!(report.skipped[0].reason.contains("Change type is not supported"));
        assert_eq!(report.batch.succeeded(), 1);

        let calls = platform.calls().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].target, "cache");
    }

    #[tokio::test]
    async fn test_plan_issues_no_calls() {
        let platform = InMemoryPlatform::with_tree(live_tree());
        let spec = desired_spec();

        let report = Reconciler::new(&platform, &spec)
            .plan(EntityKind::SpaceDevelopers)
            .await
            .unwrap()
            .unwrap();

        let operations: Vec<String> = report.operations.iter().map(ToString::to_string).collect();
        assert_eq!(
            operations,
            vec!["space developers: grant carol", "space developers: revoke bob"]
        );
        assert!(platform.calls().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_diff_and_fetch_live() {
        let platform = InMemoryPlatform::with_tree(live_tree());
        let spec = desired_spec();
        let reconciler = Reconciler::new(&platform, &spec);

        let changes = reconciler
            .diff(EntityKind::Applications)
            .await
            .unwrap()
            .unwrap();
        assert!(changes.iter().any(|c| c.path.to_string() == "applications/app2"));
        assert!(changes.iter().any(|c| c.path.to_string() == "applications/stale"));

        let live = reconciler.fetch_live().await.unwrap();
        assert_eq!(live, live_tree());
    }
}
