//! Cloud Foundry v3 API types.
//!
//! Only the fields the reconciler reads or writes are modelled.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::ApplicationConfig;

/// Annotation holding an application's `meta` value.
pub const META_ANNOTATION: &str = "cfconverge.io/meta";

/// Annotation holding an application's source `path`.
pub const PATH_ANNOTATION: &str = "cfconverge.io/path";

/// Annotation holding the route path appended to every route.
pub const ROUTE_PATH_ANNOTATION: &str = "cfconverge.io/route-path";

/// A paginated list response.
#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<T> {
    /// Resources of this page.
    pub resources: Vec<T>,
    /// Resources requested through `include`.
    #[serde(default)]
    pub included: Included,
}

/// Side-loaded resources of a list response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Included {
    /// Users.
    #[serde(default)]
    pub users: Vec<User>,
    /// Service instances.
    #[serde(default)]
    pub service_instances: Vec<NamedResource>,
    /// Service offerings.
    #[serde(default)]
    pub service_offerings: Vec<NamedResource>,
}

/// Any resource with a guid and a name.
#[derive(Debug, Clone, Deserialize)]
pub struct NamedResource {
    /// Resource guid.
    pub guid: String,
    /// Resource name.
    pub name: String,
}

/// Reference to another resource by guid.
#[derive(Debug, Clone, Deserialize)]
pub struct GuidRef {
    /// Referenced guid.
    pub guid: String,
}

/// A to-one relationship.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToOne {
    /// The related resource, if any.
    pub data: Option<GuidRef>,
}

impl ToOne {
    /// Returns the related guid.
    #[must_use]
    pub fn guid(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.guid.as_str())
    }
}

/// An application.
#[derive(Debug, Clone, Deserialize)]
pub struct App {
    /// Application guid.
    pub guid: String,
    /// Application name.
    pub name: String,
    /// Staging lifecycle.
    #[serde(default)]
    pub lifecycle: Lifecycle,
    /// Labels and annotations.
    #[serde(default)]
    pub metadata: Metadata,
}

/// Metadata of a resource.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Metadata {
    /// Annotations by key.
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
}

impl Metadata {
    /// Returns a non-empty annotation value.
    #[must_use]
    pub fn annotation(&self, key: &str) -> Option<String> {
        self.annotations.get(key).filter(|v| !v.is_empty()).cloned()
    }
}

/// A package of an application.
#[derive(Debug, Clone, Deserialize)]
pub struct Package {
    /// Package guid.
    pub guid: String,
    /// `bits` or `docker`.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Docker settings of a docker package.
    #[serde(default)]
    pub data: PackageData,
}

/// Docker settings of a package.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageData {
    /// Docker image reference.
    pub image: Option<String>,
    /// Registry username.
    pub username: Option<String>,
}

/// Staging lifecycle of an application.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Lifecycle {
    /// `buildpack` or `docker`.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Lifecycle settings.
    #[serde(default)]
    pub data: LifecycleData,
}

/// Buildpack lifecycle settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LifecycleData {
    /// Buildpacks in order.
    #[serde(default)]
    pub buildpacks: Vec<String>,
    /// Stack name.
    pub stack: Option<String>,
}

/// A process of an application.
#[derive(Debug, Clone, Deserialize)]
pub struct Process {
    /// Process guid.
    pub guid: String,
    /// Start command.
    pub command: Option<String>,
    /// Number of instances.
    pub instances: u32,
    /// Memory limit in MB.
    pub memory_in_mb: u32,
    /// Disk quota in MB.
    pub disk_in_mb: u32,
    /// Health check settings.
    #[serde(default)]
    pub health_check: HealthCheck,
}

/// Health check settings of a process.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HealthCheck {
    /// Health check type.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Health check settings.
    #[serde(default)]
    pub data: HealthCheckData,
}

/// Health check parameters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HealthCheckData {
    /// HTTP endpoint.
    pub endpoint: Option<String>,
    /// Start timeout in seconds.
    pub timeout: Option<u32>,
}

/// User-provided environment variables of an application.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvironmentVariables {
    /// Variables; values may be any JSON scalar.
    #[serde(default)]
    pub var: BTreeMap<String, serde_json::Value>,
}

/// A route.
#[derive(Debug, Clone, Deserialize)]
pub struct Route {
    /// Full route URL without scheme.
    pub url: String,
}

/// A service credential binding.
#[derive(Debug, Clone, Deserialize)]
pub struct CredentialBinding {
    /// Binding guid.
    pub guid: String,
    /// Relationships.
    pub relationships: BindingRelationships,
}

/// Relationships of a credential binding.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BindingRelationships {
    /// Bound service instance.
    #[serde(default)]
    pub service_instance: ToOne,
}

/// A service instance.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceInstance {
    /// Instance guid.
    pub guid: String,
    /// Instance name.
    pub name: String,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Relationships.
    #[serde(default)]
    pub relationships: ServiceInstanceRelationships,
}

/// Relationships of a service instance.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServiceInstanceRelationships {
    /// Plan of a managed instance.
    #[serde(default)]
    pub service_plan: ToOne,
}

/// A service plan.
#[derive(Debug, Clone, Deserialize)]
pub struct ServicePlan {
    /// Plan guid.
    pub guid: String,
    /// Plan name.
    pub name: String,
    /// Relationships.
    #[serde(default)]
    pub relationships: ServicePlanRelationships,
}

/// Relationships of a service plan.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServicePlanRelationships {
    /// Offering the plan belongs to.
    #[serde(default)]
    pub service_offering: ToOne,
}

/// A role assignment.
#[derive(Debug, Clone, Deserialize)]
pub struct Role {
    /// Role guid.
    pub guid: String,
    /// Relationships.
    #[serde(default)]
    pub relationships: RoleRelationships,
}

/// Relationships of a role.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RoleRelationships {
    /// User holding the role.
    #[serde(default)]
    pub user: ToOne,
}

/// A user.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    /// User guid.
    pub guid: String,
    /// Username, absent for client credentials.
    pub username: Option<String>,
}

/// An asynchronous job.
#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    /// `PROCESSING`, `POLLING`, `COMPLETE` or `FAILED`.
    pub state: String,
    /// Errors of a failed job.
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

/// Error body of a failed request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorResponse {
    /// Errors.
    #[serde(default)]
    pub errors: Vec<ApiError>,
}

/// One API error.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    /// Human-readable detail.
    #[serde(default)]
    pub detail: String,
    /// Error title, e.g. `CF-ResourceNotFound`.
    #[serde(default)]
    pub title: String,
}

impl ErrorResponse {
    /// Joins every error detail into one message.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        if self.errors.is_empty() {
            return None;
        }
        Some(
            self.errors
                .iter()
                .map(|e| format!("{}: {}", e.title, e.detail))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }
}

/// Application manifest accepted by the space `apply_manifest` action.
#[derive(Debug, Clone, Serialize)]
pub struct ManifestDocument {
    /// Applications to apply.
    pub applications: Vec<ManifestApplication>,
}

/// One application of a manifest document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ManifestApplication {
    /// Application name.
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    buildpacks: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    command: Option<String>,
    #[serde(rename = "disk_quota", skip_serializing_if = "Option::is_none")]
    disk_quota: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    docker: Option<ManifestDocker>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    env: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    health_check_http_endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    health_check_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    instances: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    memory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    no_route: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    random_route: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    routes: Vec<ManifestRoute>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    services: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout: Option<u32>,
}

#[derive(Clone, Serialize)]
struct ManifestDocker {
    image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<String>,
}

impl std::fmt::Debug for ManifestDocker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestDocker")
            .field("image", &self.image)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

#[derive(Debug, Clone, Serialize)]
struct ManifestRoute {
    route: String,
}

impl ManifestApplication {
    /// Builds the manifest entry of an application.
    ///
    /// A route path is appended to every route. The docker password is only
    /// sent along with a docker image.
    #[must_use]
    pub fn from_config(
        name: &str,
        config: &ApplicationConfig,
        docker_password: Option<String>,
    ) -> Self {
        let manifest = &config.manifest;
        let route_path = manifest.route_path.as_deref().unwrap_or_default();

        Self {
            name: name.to_string(),
            buildpacks: manifest.buildpack.iter().cloned().collect(),
            command: manifest.command.clone(),
            disk_quota: manifest.disk.map(|d| format!("{d}M")),
            docker: manifest.docker_image.as_ref().map(|image| ManifestDocker {
                image: image.clone(),
                username: manifest.docker_username.clone(),
                password: docker_password,
            }),
            env: manifest.environment_variables.clone(),
            health_check_http_endpoint: manifest.health_check_http_endpoint.clone(),
            health_check_type: manifest.health_check_type.map(|t| t.as_str().to_string()),
            instances: manifest.instances,
            memory: manifest.memory.map(|m| format!("{m}M")),
            no_route: manifest.no_route,
            random_route: manifest.random_route,
            routes: manifest
                .routes
                .iter()
                .map(|route| ManifestRoute {
                    route: format!("{route}{route_path}"),
                })
                .collect(),
            services: manifest.services.clone(),
            stack: manifest.stack.clone(),
            timeout: manifest.timeout,
        }
    }
}

/// Annotations recording the document fields the platform does not model.
#[must_use]
pub fn application_annotations(config: &ApplicationConfig) -> BTreeMap<&'static str, String> {
    [
        (META_ANNOTATION, config.meta.as_ref()),
        (PATH_ANNOTATION, config.path.as_ref()),
        (ROUTE_PATH_ANNOTATION, config.manifest.route_path.as_ref()),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.filter(|v| !v.is_empty()).map(|v| (key, v.clone())))
    .collect()
}

/// Removes the route path appended at creation from a live route URL.
#[must_use]
pub fn strip_route_path(url: &str, route_path: Option<&str>) -> String {
    route_path
        .filter(|p| !p.is_empty())
        .and_then(|p| url.strip_suffix(p))
        .unwrap_or(url)
        .to_string()
}

/// Renders a JSON scalar the way it is written in a config document.
#[must_use]
pub fn scalar_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}
