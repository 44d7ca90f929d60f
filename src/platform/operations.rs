//! Remote-operations capability traits.
//!
//! Each trait covers one entity kind. Planners only see the trait of the
//! kind they plan for; the orchestrator holds a [`Platform`].

use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::{ApplicationConfig, HealthCheckType, ServiceConfig};
use crate::error::Result;

/// Target sizes of a scale call; `None` leaves the dimension untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScaleParameters {
    /// Number of instances.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instances: Option<u32>,
    /// Memory limit in MB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<u32>,
    /// Disk quota in MB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk: Option<u32>,
}

impl ScaleParameters {
    /// Returns true if no dimension is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.instances.is_none() && self.memory.is_none() && self.disk.is_none()
    }
}

impl std::fmt::Display for ScaleParameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts = Vec::new();
        if let Some(instances) = self.instances {
            parts.push(format!("instances={instances}"));
        }
        if let Some(memory) = self.memory {
            parts.push(format!("memory={memory}M"));
        }
        if let Some(disk) = self.disk {
            parts.push(format!("disk={disk}M"));
        }
        f.write_str(&parts.join(", "))
    }
}

/// Remote operations on applications of the targeted space.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ApplicationsOperations: Send + Sync {
    /// Fetches every application of the space.
    async fn fetch_applications(&self) -> Result<BTreeMap<String, ApplicationConfig>>;

    /// Creates and pushes an application.
    async fn create_application(&self, name: &str, config: &ApplicationConfig) -> Result<()>;

    /// Deletes an application.
    async fn delete_application(&self, name: &str) -> Result<()>;

    /// Renames an application.
    async fn rename_application(&self, name: &str, new_name: &str) -> Result<()>;

    /// Scales an application.
    async fn scale_application(&self, name: &str, scale: ScaleParameters) -> Result<()>;

    /// Sets the health check of an application.
    async fn set_health_check(
        &self,
        name: &str,
        health_check_type: HealthCheckType,
        endpoint: Option<String>,
    ) -> Result<()>;

    /// Adds or overwrites one environment variable.
    async fn add_environment_variable(&self, name: &str, key: &str, value: &str) -> Result<()>;

    /// Removes one environment variable.
    async fn remove_environment_variable(&self, name: &str, key: &str) -> Result<()>;

    /// Binds a service instance to an application.
    async fn bind_service(&self, name: &str, service: &str) -> Result<()>;

    /// Unbinds a service instance from an application.
    async fn unbind_service(&self, name: &str, service: &str) -> Result<()>;
}

/// Remote operations on service instances of the targeted space.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ServicesOperations: Send + Sync {
    /// Fetches every service instance of the space.
    async fn fetch_services(&self) -> Result<BTreeMap<String, ServiceConfig>>;

    /// Creates a service instance.
    async fn create_service(&self, name: &str, config: &ServiceConfig) -> Result<()>;

    /// Deletes a service instance.
    async fn delete_service(&self, name: &str) -> Result<()>;
}

/// Remote operations on the space developer role.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpaceDevelopersOperations: Send + Sync {
    /// Fetches the users holding the space developer role.
    async fn fetch_space_developers(&self) -> Result<Vec<String>>;

    /// Grants the space developer role to a user.
    async fn grant_space_developer(&self, username: &str) -> Result<()>;

    /// Revokes the space developer role from a user.
    async fn revoke_space_developer(&self, username: &str) -> Result<()>;
}

/// Every remote operation the reconciler needs.
pub trait Platform: ApplicationsOperations + ServicesOperations + SpaceDevelopersOperations {
    /// Gets the platform backend name.
    fn backend_type(&self) -> &'static str;
}
