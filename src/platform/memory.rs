//! In-memory platform.
//!
//! Holds a [`ConfigTree`] as the live state of one space and applies every
//! remote call to it. Mutating calls are recorded, and any call can be made
//! to fail for a given target.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::config::{ApplicationConfig, ConfigTree, HealthCheckType, ServiceConfig};
use crate::error::{CfConvergeError, PlatformError, Result};

use super::operations::{
    ApplicationsOperations, Platform, ScaleParameters, ServicesOperations,
    SpaceDevelopersOperations,
};

/// Platform backed by an in-memory config tree.
#[derive(Debug, Default)]
pub struct InMemoryPlatform {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    tree: ConfigTree,
    calls: Vec<RecordedCall>,
    failures: HashSet<(String, String)>,
}

/// One mutating call received by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    /// Operation name, e.g. `create_application`.
    pub operation: &'static str,
    /// Entity the call targeted.
    pub target: String,
}

impl std::fmt::Display for RecordedCall {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.operation, self.target)
    }
}

impl InMemoryPlatform {
    /// Creates an empty platform.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a platform whose live state is the given tree.
    #[must_use]
    pub fn with_tree(tree: ConfigTree) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                tree,
                ..MemoryState::default()
            }),
        }
    }

    /// Makes every call of `operation` on `target` fail.
    ///
    /// Fetch operations use an empty target.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    pub fn fail_on(&self, operation: &str, target: &str) -> Result<()> {
        self.lock()?
            .failures
            .insert((operation.to_string(), target.to_string()));
        Ok(())
    }

    /// Returns a copy of the current live state.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    pub fn snapshot(&self) -> Result<ConfigTree> {
        Ok(self.lock()?.tree.clone())
    }

    /// Returns every mutating call received so far.
    ///
    /// # Errors
    ///
    /// Returns an error if the state lock is poisoned.
    pub fn calls(&self) -> Result<Vec<RecordedCall>> {
        Ok(self.lock()?.calls.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| CfConvergeError::internal("in-memory platform state lock poisoned"))
    }

    /// Records a mutating call and applies it unless a failure is injected.
    fn mutate<F>(&self, operation: &'static str, target: &str, apply: F) -> Result<()>
    where
        F: FnOnce(&mut ConfigTree) -> std::result::Result<(), PlatformError>,
    {
        let mut state = self.lock()?;
        state.calls.push(RecordedCall {
            operation,
            target: target.to_string(),
        });
        debug!("In-memory platform: {operation} {target}");

        if state
            .failures
            .contains(&(operation.to_string(), target.to_string()))
        {
            return Err(injected(operation, target));
        }

        apply(&mut state.tree).map_err(CfConvergeError::from)
    }

    fn fetch<T, F>(&self, operation: &'static str, read: F) -> Result<T>
    where
        F: FnOnce(&ConfigTree) -> T,
    {
        let state = self.lock()?;
        if state.failures.contains(&(operation.to_string(), String::new())) {
            return Err(injected(operation, ""));
        }
        Ok(read(&state.tree))
    }
}

fn injected(operation: &str, target: &str) -> CfConvergeError {
    CfConvergeError::Platform(PlatformError::api_error(
        500,
        format!("injected failure for {operation} {target}"),
    ))
}

fn application<'t>(
    tree: &'t mut ConfigTree,
    name: &str,
) -> std::result::Result<&'t mut ApplicationConfig, PlatformError> {
    tree.applications
        .get_mut(name)
        .ok_or_else(|| PlatformError::not_found("application", name))
}

#[async_trait]
impl ApplicationsOperations for InMemoryPlatform {
    async fn fetch_applications(&self) -> Result<BTreeMap<String, ApplicationConfig>> {
        self.fetch("fetch_applications", |tree| tree.applications.clone())
    }

    async fn create_application(&self, name: &str, config: &ApplicationConfig) -> Result<()> {
        self.mutate("create_application", name, |tree| {
            if tree.applications.contains_key(name) {
                return Err(PlatformError::AlreadyExists {
                    resource_type: String::from("application"),
                    name: name.to_string(),
                });
            }
            tree.applications.insert(name.to_string(), config.clone());
            Ok(())
        })
    }

    async fn delete_application(&self, name: &str) -> Result<()> {
        self.mutate("delete_application", name, |tree| {
            tree.applications
                .remove(name)
                .map(|_| ())
                .ok_or_else(|| PlatformError::not_found("application", name))
        })
    }

    async fn rename_application(&self, name: &str, new_name: &str) -> Result<()> {
        self.mutate("rename_application", name, |tree| {
            let app = tree
                .applications
                .remove(name)
                .ok_or_else(|| PlatformError::not_found("application", name))?;
            tree.applications.insert(new_name.to_string(), app);
            Ok(())
        })
    }

    async fn scale_application(&self, name: &str, scale: ScaleParameters) -> Result<()> {
        self.mutate("scale_application", name, |tree| {
            let manifest = &mut application(tree, name)?.manifest;
            if scale.instances.is_some() {
                manifest.instances = scale.instances;
            }
            if scale.memory.is_some() {
                manifest.memory = scale.memory;
            }
            if scale.disk.is_some() {
                manifest.disk = scale.disk;
            }
            Ok(())
        })
    }

    async fn set_health_check(
        &self,
        name: &str,
        health_check_type: HealthCheckType,
        endpoint: Option<String>,
    ) -> Result<()> {
        self.mutate("set_health_check", name, |tree| {
            let manifest = &mut application(tree, name)?.manifest;
            manifest.health_check_type = Some(health_check_type);
            manifest.health_check_http_endpoint = endpoint;
            Ok(())
        })
    }

    async fn add_environment_variable(&self, name: &str, key: &str, value: &str) -> Result<()> {
        self.mutate("add_environment_variable", name, |tree| {
            application(tree, name)?
                .manifest
                .environment_variables
                .insert(key.to_string(), value.to_string());
            Ok(())
        })
    }

    async fn remove_environment_variable(&self, name: &str, key: &str) -> Result<()> {
        self.mutate("remove_environment_variable", name, |tree| {
            application(tree, name)?
                .manifest
                .environment_variables
                .remove(key);
            Ok(())
        })
    }

    async fn bind_service(&self, name: &str, service: &str) -> Result<()> {
        self.mutate("bind_service", name, |tree| {
            if !tree.services.contains_key(service) {
                return Err(PlatformError::not_found("service", service));
            }
            let bindings = &mut application(tree, name)?.manifest.services;
            if !bindings.iter().any(|s| s == service) {
                bindings.push(service.to_string());
            }
            Ok(())
        })
    }

    async fn unbind_service(&self, name: &str, service: &str) -> Result<()> {
        self.mutate("unbind_service", name, |tree| {
            application(tree, name)?.manifest.services.retain(|s| s != service);
            Ok(())
        })
    }
}

#[async_trait]
impl ServicesOperations for InMemoryPlatform {
    async fn fetch_services(&self) -> Result<BTreeMap<String, ServiceConfig>> {
        self.fetch("fetch_services", |tree| tree.services.clone())
    }

    async fn create_service(&self, name: &str, config: &ServiceConfig) -> Result<()> {
        self.mutate("create_service", name, |tree| {
            if tree.services.contains_key(name) {
                return Err(PlatformError::AlreadyExists {
                    resource_type: String::from("service"),
                    name: name.to_string(),
                });
            }
            tree.services.insert(name.to_string(), config.clone());
            Ok(())
        })
    }

    async fn delete_service(&self, name: &str) -> Result<()> {
        self.mutate("delete_service", name, |tree| {
            tree.services
                .remove(name)
                .map(|_| ())
                .ok_or_else(|| PlatformError::not_found("service", name))
        })
    }
}

#[async_trait]
impl SpaceDevelopersOperations for InMemoryPlatform {
    async fn fetch_space_developers(&self) -> Result<Vec<String>> {
        self.fetch("fetch_space_developers", |tree| tree.space_developers.clone())
    }

    async fn grant_space_developer(&self, username: &str) -> Result<()> {
        self.mutate("grant_space_developer", username, |tree| {
            if !tree.space_developers.iter().any(|u| u == username) {
                tree.space_developers.push(username.to_string());
            }
            Ok(())
        })
    }

    async fn revoke_space_developer(&self, username: &str) -> Result<()> {
        self.mutate("revoke_space_developer", username, |tree| {
            tree.space_developers.retain(|u| u != username);
            Ok(())
        })
    }
}

impl Platform for InMemoryPlatform {
    fn backend_type(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_then_fetch() {
        let platform = InMemoryPlatform::new();
        platform
            .create_application("app1", &ApplicationConfig::default())
            .await
            .unwrap();

        let apps = platform.fetch_applications().await.unwrap();
        assert!(apps.contains_key("app1"));
        assert_eq!(
            platform.calls().unwrap(),
            vec![RecordedCall {
                operation: "create_application",
                target: String::from("app1"),
            }]
        );
    }

    #[tokio::test]
    async fn test_scale_only_touches_given_dimensions() {
        let platform = InMemoryPlatform::new();
        platform
            .create_application("app1", &ApplicationConfig::default())
            .await
            .unwrap();
        platform
            .scale_application(
                "app1",
                ScaleParameters {
                    memory: Some(512),
                    ..ScaleParameters::default()
                },
            )
            .await
            .unwrap();

        let tree = platform.snapshot().unwrap();
        assert_eq!(tree.applications["app1"].manifest.memory, Some(512));
        assert_eq!(tree.applications["app1"].manifest.instances, None);
    }

    #[tokio::test]
    async fn test_injected_failure_leaves_state_untouched() {
        let platform = InMemoryPlatform::new();
        platform.fail_on("grant_space_developer", "mallory").unwrap();

        assert!(platform.grant_space_developer("mallory").await.is_err());
        assert!(platform.grant_space_developer("alice").await.is_ok());
        assert_eq!(
            platform.fetch_space_developers().await.unwrap(),
            vec![String::from("alice")]
        );
        assert_eq!(platform.calls().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_injected_fetch_failure() {
        let platform = InMemoryPlatform::new();
        platform.fail_on("fetch_services", "").unwrap();
        assert!(platform.fetch_services().await.is_err());
    }

    #[tokio::test]
    async fn test_bind_requires_existing_service() {
        let platform = InMemoryPlatform::new();
        platform
            .create_application("app1", &ApplicationConfig::default())
            .await
            .unwrap();

        let result = platform.bind_service("app1", "db").await;
        assert!(matches!(
            result,
            Err(CfConvergeError::Platform(PlatformError::NotFound { .. }))
        ));
    }
}
