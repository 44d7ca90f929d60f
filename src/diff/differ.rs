//! Tree differ for comparing live vs desired config trees.
//!
//! The differ walks both trees in parallel and emits one [`Change`] per
//! structural difference. Unchanged nodes produce nothing, so diffing a tree
//! against itself yields an empty list.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use tracing::debug;

use crate::config::{ApplicationConfig, ConfigTree, ManifestConfig, ServiceConfig};

use super::change::{AffectedObject, Change, ChangePath, EntityKind, MapEntryChange};

/// Engine for computing changes between a live and a desired tree.
#[derive(Debug, Default)]
pub struct TreeDiffer;

/// Collects changes below one record.
///
/// The affected object is only cloned once a difference is found.
struct FieldRecorder<'a, F: Fn() -> AffectedObject> {
    path: &'a ChangePath,
    affected: F,
    changes: &'a mut Vec<Change>,
}

impl TreeDiffer {
    /// Creates a new tree differ.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes every change that turns `live` into `desired`.
    ///
    /// The order of the returned changes carries no meaning.
    #[must_use]
    pub fn diff(&self, live: &ConfigTree, desired: &ConfigTree) -> Vec<Change> {
        let mut changes = Vec::new();

        Self::diff_entities(
            EntityKind::Applications,
            &live.applications,
            &desired.applications,
            AffectedObject::Application,
            Self::diff_application,
            &mut changes,
        );
        Self::diff_entities(
            EntityKind::Services,
            &live.services,
            &desired.services,
            AffectedObject::Service,
            Self::diff_service,
            &mut changes,
        );
        Self::diff_space_developers(&live.space_developers, &desired.space_developers, &mut changes);

        debug!("Computed {} changes", changes.len());
        changes
    }

    /// Diffs one keyed section of the tree.
    fn diff_entities<T: Clone>(
        kind: EntityKind,
        live: &BTreeMap<String, T>,
        desired: &BTreeMap<String, T>,
        wrap: fn(T) -> AffectedObject,
        compare: fn(&ChangePath, &T, &T, &mut Vec<Change>),
        changes: &mut Vec<Change>,
    ) {
        for (name, desired_entity) in desired {
            let path = ChangePath::entity(kind, name);
            match live.get(name) {
                Some(live_entity) => compare(&path, live_entity, desired_entity, changes),
                None => {
                    debug!("{kind} '{name}' only exists in desired state");
                    changes.push(Change::object_added(path, wrap(desired_entity.clone())));
                }
            }
        }

        for (name, live_entity) in live {
            if !desired.contains_key(name) {
                debug!("{kind} '{name}' only exists in live state");
                changes.push(Change::object_removed(
                    ChangePath::entity(kind, name),
                    wrap(live_entity.clone()),
                ));
            }
        }
    }

    fn diff_application(
        path: &ChangePath,
        live: &ApplicationConfig,
        desired: &ApplicationConfig,
        changes: &mut Vec<Change>,
    ) {
        {
            let mut recorder = FieldRecorder {
                path,
                affected: || AffectedObject::Application(desired.clone()),
                changes: &mut *changes,
            };
            recorder.value("path", live.path.as_ref(), desired.path.as_ref());
            recorder.value("meta", live.meta.as_ref(), desired.meta.as_ref());
        }

        Self::diff_manifest(&path.child("manifest"), &live.manifest, &desired.manifest, changes);
    }

    fn diff_manifest(
        path: &ChangePath,
        live: &ManifestConfig,
        desired: &ManifestConfig,
        changes: &mut Vec<Change>,
    ) {
        let mut recorder = FieldRecorder {
            path,
            affected: || AffectedObject::Manifest(desired.clone()),
            changes,
        };

        recorder.value("buildpack", live.buildpack.as_ref(), desired.buildpack.as_ref());
        recorder.value("command", live.command.as_ref(), desired.command.as_ref());
        recorder.value("disk", live.disk.as_ref(), desired.disk.as_ref());
        recorder.value("dockerImage", live.docker_image.as_ref(), desired.docker_image.as_ref());
        recorder.value(
            "dockerUsername",
            live.docker_username.as_ref(),
            desired.docker_username.as_ref(),
        );
        recorder.map(
            "environmentVariables",
            &live.environment_variables,
            &desired.environment_variables,
        );
        recorder.value(
            "healthCheckHttpEndpoint",
            live.health_check_http_endpoint.as_ref(),
            desired.health_check_http_endpoint.as_ref(),
        );
        recorder.value(
            "healthCheckType",
            live.health_check_type.as_ref(),
            desired.health_check_type.as_ref(),
        );
        recorder.value("instances", live.instances.as_ref(), desired.instances.as_ref());
        recorder.value("memory", live.memory.as_ref(), desired.memory.as_ref());
        recorder.value("noRoute", live.no_route.as_ref(), desired.no_route.as_ref());
        recorder.value("randomRoute", live.random_route.as_ref(), desired.random_route.as_ref());
        recorder.value("routePath", live.route_path.as_ref(), desired.route_path.as_ref());
        recorder.collection("routes", &live.routes, &desired.routes);
        recorder.collection("services", &live.services, &desired.services);
        recorder.value("stack", live.stack.as_ref(), desired.stack.as_ref());
        recorder.value("timeout", live.timeout.as_ref(), desired.timeout.as_ref());
    }

    fn diff_service(
        path: &ChangePath,
        live: &ServiceConfig,
        desired: &ServiceConfig,
        changes: &mut Vec<Change>,
    ) {
        let mut recorder = FieldRecorder {
            path,
            affected: || AffectedObject::Service(desired.clone()),
            changes,
        };

        recorder.value("service", Some(&live.service), Some(&desired.service));
        recorder.value("plan", Some(&live.plan), Some(&desired.plan));
        recorder.collection("tags", &live.tags, &desired.tags);
        recorder.map("params", &live.params, &desired.params);
    }

    fn diff_space_developers(live: &[String], desired: &[String], changes: &mut Vec<Change>) {
        if let Some((added, removed)) = collection_delta(live, desired) {
            debug!(
                "Space developers differ: {} to grant, {} to revoke",
                added.len(),
                removed.len()
            );
            changes.push(Change::collection_changed(
                ChangePath::root(EntityKind::SpaceDevelopers),
                AffectedObject::SpaceDevelopers(desired.to_vec()),
                added,
                removed,
            ));
        }
    }
}

impl<F: Fn() -> AffectedObject> FieldRecorder<'_, F> {
    fn value<V: PartialEq + Display>(&mut self, field: &'static str, live: Option<&V>, desired: Option<&V>) {
        if live != desired {
            self.changes.push(Change::value_changed(
                self.path.child(field),
                (self.affected)(),
                live.map(ToString::to_string),
                desired.map(ToString::to_string),
            ));
        }
    }

    fn collection(&mut self, field: &'static str, live: &[String], desired: &[String]) {
        if let Some((added, removed)) = collection_delta(live, desired) {
            self.changes.push(Change::collection_changed(
                self.path.child(field),
                (self.affected)(),
                added,
                removed,
            ));
        }
    }

    fn map(
        &mut self,
        field: &'static str,
        live: &BTreeMap<String, String>,
        desired: &BTreeMap<String, String>,
    ) {
        let keys: BTreeSet<&String> = live.keys().chain(desired.keys()).collect();
        let entries: Vec<MapEntryChange> = keys
            .into_iter()
            .filter_map(|key| match (live.get(key), desired.get(key)) {
                (None, Some(after)) => Some(MapEntryChange::added(key, after)),
                (Some(before), None) => Some(MapEntryChange::removed(key, before)),
                (Some(before), Some(after)) if before != after => {
                    Some(MapEntryChange::changed(key, before, after))
                }
                _ => None,
            })
            .collect();

        if !entries.is_empty() {
            self.changes
                .push(Change::map_changed(self.path.child(field), (self.affected)(), entries));
        }
    }
}

/// Set difference of two lists, ignoring order and duplicates.
///
/// Returns `None` when both contain the same elements.
fn collection_delta(live: &[String], desired: &[String]) -> Option<(Vec<String>, Vec<String>)> {
    let live_set: BTreeSet<&String> = live.iter().collect();
    let desired_set: BTreeSet<&String> = desired.iter().collect();

    let added: Vec<String> = desired_set.difference(&live_set).map(|s| (*s).clone()).collect();
    let removed: Vec<String> = live_set.difference(&desired_set).map(|s| (*s).clone()).collect();

    if added.is_empty() && removed.is_empty() {
        None
    } else {
        Some((added, removed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::ChangeKind;

    fn app(manifest: ManifestConfig) -> ApplicationConfig {
        ApplicationConfig::with_manifest(manifest)
    }

    fn apps(entries: Vec<(&str, ApplicationConfig)>) -> ConfigTree {
        ConfigTree::from_applications(
            entries.into_iter().map(|(name, app)| (name.to_string(), app)).collect(),
        )
    }

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_identical_trees_have_no_changes() {
        let mut tree = apps(vec![(
            "app1",
            app(ManifestConfig {
                instances: Some(2),
                routes: names(&["a.example.com"]),
                ..ManifestConfig::default()
            }),
        )]);
        tree.services.insert(String::from("db"), ServiceConfig::new("postgres", "small"));
        tree.space_developers = names(&["alice"]);

        assert!(TreeDiffer::new().diff(&tree, &tree).is_empty());
    }

    #[test]
    fn test_new_application_is_one_object_added() {
        let desired = apps(vec![(
            "app1",
            app(ManifestConfig {
                buildpack: Some(String::from("ruby_buildpack")),
                ..ManifestConfig::default()
            }),
        )]);

        let changes = TreeDiffer::new().diff(&ConfigTree::new(), &desired);

        assert_eq!(changes.len(), 1);
        let change = &changes[0];
        assert!(change.is_object_added());
        assert_eq!(change.path.to_string(), "applications/app1");
        match &change.affected {
            AffectedObject::Application(app) => {
                assert_eq!(app.manifest.buildpack.as_deref(), Some("ruby_buildpack"));
            }
            other => panic!("unexpected affected object: {other:?}"),
        }
    }

    #[test]
    fn test_removed_services_carry_live_record() {
        let mut live = ConfigTree::new();
        live.services.insert(String::from("s1"), ServiceConfig::new("postgres", "small"));
        live.services.insert(String::from("s2"), ServiceConfig::new("redis", "large"));

        let changes = TreeDiffer::new().diff(&live, &ConfigTree::new());

        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(Change::is_object_removed));
        assert!(changes.iter().any(|c| {
            c.path.entity_name() == Some("s2")
                && c.affected == AffectedObject::Service(ServiceConfig::new("redis", "large"))
        }));
    }

    #[test]
    fn test_instances_change_is_a_manifest_value_change() {
        let live = apps(vec![(
            "app1",
            app(ManifestConfig {
                instances: Some(1),
                memory: Some(256),
                ..ManifestConfig::default()
            }),
        )]);
        let desired = apps(vec![(
            "app1",
            app(ManifestConfig {
                instances: Some(3),
                memory: Some(256),
                ..ManifestConfig::default()
            }),
        )]);

        let changes = TreeDiffer::new().diff(&live, &desired);

        assert_eq!(changes.len(), 1);
        let change = &changes[0];
        assert_eq!(change.path.to_string(), "applications/app1/manifest/instances");
        assert_eq!(
            change.kind,
            ChangeKind::ValueChanged {
                before: Some(String::from("1")),
                after: Some(String::from("3")),
            }
        );
        match &change.affected {
            AffectedObject::Manifest(manifest) => assert_eq!(manifest.instances, Some(3)),
            other => panic!("unexpected affected object: {other:?}"),
        }
    }

    #[test]
    fn test_space_developer_change() {
        let live = ConfigTree::from_space_developers(names(&["alice", "bob"]));
        let desired = ConfigTree::from_space_developers(names(&["alice", "carol"]));

        let changes = TreeDiffer::new().diff(&live, &desired);

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path.to_string(), "spaceDevelopers");
        assert_eq!(
            changes[0].kind,
            ChangeKind::CollectionChanged {
                added: names(&["carol"]),
                removed: names(&["bob"]),
            }
        );
    }

    #[test]
    fn test_collection_order_and_duplicates_ignored() {
        let live = ConfigTree::from_space_developers(names(&["bob", "alice"]));
        let desired = ConfigTree::from_space_developers(names(&["alice", "bob", "bob"]));

        assert!(TreeDiffer::new().diff(&live, &desired).is_empty());
    }

    #[test]
    fn test_environment_variable_map_change() {
        let mut live_env = BTreeMap::new();
        live_env.insert(String::from("KEEP"), String::from("1"));
        live_env.insert(String::from("DROP"), String::from("x"));
        live_env.insert(String::from("EDIT"), String::from("old"));
        let mut desired_env = BTreeMap::new();
        desired_env.insert(String::from("KEEP"), String::from("1"));
        desired_env.insert(String::from("EDIT"), String::from("new"));
        desired_env.insert(String::from("ADD"), String::from("y"));

        let live = apps(vec![(
            "app1",
            app(ManifestConfig {
                environment_variables: live_env,
                ..ManifestConfig::default()
            }),
        )]);
        let desired = apps(vec![(
            "app1",
            app(ManifestConfig {
                environment_variables: desired_env,
                ..ManifestConfig::default()
            }),
        )]);

        let changes = TreeDiffer::new().diff(&live, &desired);

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].property(), Some("environmentVariables"));
        let ChangeKind::MapChanged { entries } = &changes[0].kind else {
            panic!("expected a map change");
        };
        assert_eq!(
            entries,
            &vec![
                MapEntryChange::added("ADD", "y"),
                MapEntryChange::removed("DROP", "x"),
                MapEntryChange::changed("EDIT", "old", "new"),
            ]
        );
    }

    #[test]
    fn test_application_level_fields_use_application_record() {
        let live = apps(vec![("app1", ApplicationConfig::default())]);
        let mut changed = ApplicationConfig::default();
        changed.path = Some(String::from("./build.zip"));
        let desired = apps(vec![("app1", changed.clone())]);

        let changes = TreeDiffer::new().diff(&live, &desired);

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path.to_string(), "applications/app1/path");
        assert_eq!(changes[0].affected, AffectedObject::Application(changed));
    }

    #[test]
    fn test_service_plan_change() {
        let mut live = ConfigTree::new();
        live.services.insert(String::from("db"), ServiceConfig::new("postgres", "small"));
        let mut desired = ConfigTree::new();
        desired.services.insert(String::from("db"), ServiceConfig::new("postgres", "large"));

        let changes = TreeDiffer::new().diff(&live, &desired);

        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].path.to_string(), "services/db/plan");
    }
}
