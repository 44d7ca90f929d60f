//! Cloud Foundry API client implementation.
//!
//! This module provides the HTTP client for the Cloud Foundry v3 API, scoped
//! to the one organization and space resolved at connect time.

use async_trait::async_trait;
use futures::future::try_join_all;
use reqwest::{Client, Method, StatusCode, Url, header};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::{debug, info, trace};

use crate::config::{
    ApplicationConfig, ConfigParser, HealthCheckType, ManifestConfig, ServiceConfig,
    TargetConfig,
};
use crate::error::{CfConvergeError, ConfigError, PlatformError, Result};

use super::operations::{
    ApplicationsOperations, Platform, ScaleParameters, ServicesOperations,
    SpaceDevelopersOperations,
};
use super::types::{
    App, CredentialBinding, EnvironmentVariables, ErrorResponse, Job, ListResponse,
    META_ANNOTATION, ManifestApplication, ManifestDocument, NamedResource, PATH_ANNOTATION,
    Package, PackageData, Process, ROUTE_PATH_ANNOTATION, Role, Route, ServiceInstance,
    ServicePlan, application_annotations, scalar_to_string, strip_route_path,
};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Maximum number of retries for transient failures.
const MAX_RETRIES: u32 = 3;

/// Delay between retries in milliseconds.
const RETRY_DELAY_MS: u64 = 1000;

/// Page size for list requests; the API maximum.
const PAGE_SIZE: &str = "5000";

/// Number of times an asynchronous job is polled before giving up.
const JOB_POLL_ATTEMPTS: u32 = 120;

/// Delay between job polls in milliseconds.
const JOB_POLL_INTERVAL_MS: u64 = 1000;

/// Role type managed by this client.
const SPACE_DEVELOPER_ROLE: &str = "space_developer";

/// Cloud Foundry v3 API client.
#[derive(Debug, Clone)]
pub struct CfClient {
    /// HTTP client.
    client: Client,
    /// API endpoint.
    api_url: Url,
    /// Bearer token.
    token: String,
    /// Guid of the targeted space.
    space_guid: String,
}

/// Request body.
#[derive(Debug)]
enum Body {
    Json(serde_json::Value),
    Yaml(String),
}

/// Body and job location of a successful response.
#[derive(Debug)]
struct ApiResponse {
    body: String,
    location: Option<String>,
}

impl CfClient {
    /// Connects to the API and resolves the target organization and space.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is invalid, the HTTP client cannot be
    /// created, or the organization or space cannot be found.
    pub async fn connect(target: &TargetConfig, token: &str) -> Result<Self> {
        Self::connect_with_timeout(target, token, DEFAULT_TIMEOUT_SECS).await
    }

    /// Connects with a custom request timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is invalid, the HTTP client cannot be
    /// created, or the organization or space cannot be found.
    pub async fn connect_with_timeout(
        target: &TargetConfig,
        token: &str,
        timeout_secs: u64,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| PlatformError::network(format!("Failed to create HTTP client: {e}")))?;

        let api_url = Url::parse(&target.api).map_err(|e| {
            ConfigError::validation(format!("Invalid API endpoint: {e}"), "target.api")
        })?;

        let mut this = Self {
            client,
            api_url,
            token: token.to_string(),
            space_guid: String::new(),
        };

        let organization: NamedResource = this
            .find_one(
                "/v3/organizations",
                &[("names", target.organization.as_str())],
                "organization",
                &target.organization,
            )
            .await?;
        let space: NamedResource = this
            .find_one(
                "/v3/spaces",
                &[
                    ("names", target.space.as_str()),
                    ("organization_guids", organization.guid.as_str()),
                ],
                "space",
                &target.space,
            )
            .await?;

        info!(
            "Targeting {} / {} at {}",
            organization.name, space.name, target.api
        );
        this.space_guid = space.guid;
        Ok(this)
    }

    /// Returns the guid of the targeted space.
    #[must_use]
    pub fn space_guid(&self) -> &str {
        &self.space_guid
    }

    fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self
            .api_url
            .join(path)
            .map_err(|e| CfConvergeError::internal(format!("Invalid request path {path}: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query.iter().copied());
        }
        Ok(url)
    }

    /// Executes a request, retrying transient failures.
    async fn execute(&self, method: Method, url: Url, body: Option<&Body>) -> Result<ApiResponse> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                debug!("Retry attempt {attempt} of {MAX_RETRIES}");
                tokio::time::sleep(Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt)))
                    .await;
            }

            match self.execute_once(method.clone(), url.clone(), body).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if e.is_retryable() {
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            CfConvergeError::Platform(PlatformError::network("Max retries exceeded"))
        }))
    }

    /// Executes a single request.
    async fn execute_once(
        &self,
        method: Method,
        url: Url,
        body: Option<&Body>,
    ) -> Result<ApiResponse> {
        trace!("{method} {url}");

        let mut request = self.client.request(method, url).bearer_auth(&self.token);
        request = match body {
            Some(Body::Json(value)) => request.json(value),
            Some(Body::Yaml(text)) => request
                .header(header::CONTENT_TYPE, "application/x-yaml")
                .body(text.clone()),
            None => request,
        };

        let response = request
            .send()
            .await
            .map_err(|e| PlatformError::network(format!("Request failed: {e}")))?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or_default();
            let retry_after = if retry_after == 0 { 60 } else { retry_after };

            return Err(CfConvergeError::Platform(PlatformError::RateLimited {
                retry_after_secs: retry_after,
            }));
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(CfConvergeError::Platform(PlatformError::AuthenticationFailed {
                message: String::from("Invalid or expired access token"),
            }));
        }

        let location = response
            .headers()
            .get(header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(ToString::to_string);
        let text = response.text().await.unwrap_or_default();

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .ok()
                .and_then(|e| e.message())
                .unwrap_or(text);
            return Err(CfConvergeError::Platform(PlatformError::api_error(
                status.as_u16(),
                message,
            )));
        }

        Ok(ApiResponse {
            body: text,
            location,
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let response = self.execute(Method::GET, self.url(path, query)?, None).await?;
        serde_json::from_str(&response.body).map_err(|e| {
            CfConvergeError::Platform(PlatformError::invalid_response(format!(
                "Failed to parse response of {path}: {e}"
            )))
        })
    }

    async fn list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<ListResponse<T>> {
        let mut query = query.to_vec();
        query.push(("per_page", PAGE_SIZE));
        self.get(path, &query).await
    }

    async fn find_one<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
        resource_type: &str,
        name: &str,
    ) -> Result<T> {
        self.list::<T>(path, query)
            .await?
            .resources
            .into_iter()
            .next()
            .ok_or_else(|| CfConvergeError::Platform(PlatformError::not_found(resource_type, name)))
    }

    /// Sends a mutating request and waits for the job it started, if any.
    async fn send(&self, method: Method, path: &str, body: Option<Body>) -> Result<()> {
        let response = self
            .execute(method, self.url(path, &[])?, body.as_ref())
            .await?;

        match response.location {
            Some(location) if location.contains("/v3/jobs/") => self.wait_for_job(&location).await,
            _ => Ok(()),
        }
    }

    async fn wait_for_job(&self, location: &str) -> Result<()> {
        let url = Url::parse(location).map_err(|e| {
            PlatformError::invalid_response(format!("Invalid job location {location}: {e}"))
        })?;

        for _ in 0..JOB_POLL_ATTEMPTS {
            let response = self.execute(Method::GET, url.clone(), None).await?;
            let job: Job = serde_json::from_str(&response.body).map_err(|e| {
                PlatformError::invalid_response(format!("Failed to parse job: {e}"))
            })?;

            match job.state.as_str() {
                "COMPLETE" => return Ok(()),
                "FAILED" => {
                    let message = job
                        .errors
                        .iter()
                        .map(|e| e.detail.as_str())
                        .collect::<Vec<_>>()
                        .join("; ");
                    return Err(CfConvergeError::Platform(PlatformError::api_error(
                        422,
                        format!("Job failed: {message}"),
                    )));
                }
                state => {
                    trace!("Job {location} is {state}");
                    tokio::time::sleep(Duration::from_millis(JOB_POLL_INTERVAL_MS)).await;
                }
            }
        }

        Err(CfConvergeError::Platform(PlatformError::network(format!(
            "Job {location} did not finish in time"
        ))))
    }

    async fn app_guid(&self, name: &str) -> Result<String> {
        let app: NamedResource = self
            .find_one(
                "/v3/apps",
                &[("names", name), ("space_guids", self.space_guid.as_str())],
                "application",
                name,
            )
            .await?;
        Ok(app.guid)
    }

    async fn service_instance_guid(&self, name: &str) -> Result<String> {
        let instance: NamedResource = self
            .find_one(
                "/v3/service_instances",
                &[("names", name), ("space_guids", self.space_guid.as_str())],
                "service",
                name,
            )
            .await?;
        Ok(instance.guid)
    }

    /// Reads the full configuration of one application.
    async fn describe_application(&self, app: &App) -> Result<ApplicationConfig> {
        let guid = app.guid.as_str();
        let process_path = format!("/v3/apps/{guid}/processes/web");
        let env_path = format!("/v3/apps/{guid}/environment_variables");
        let routes_path = format!("/v3/apps/{guid}/routes");
        let binding_query = [("app_guids", guid), ("include", "service_instance")];

        let (process, env, routes, bindings) = tokio::try_join!(
            self.get::<Process>(&process_path, &[]),
            self.get::<EnvironmentVariables>(&env_path, &[]),
            self.list::<Route>(&routes_path, &[]),
            self.list::<CredentialBinding>("/v3/service_credential_bindings", &binding_query),
        )?;

        let instance_names: HashMap<&str, &str> = bindings
            .included
            .service_instances
            .iter()
            .map(|i| (i.guid.as_str(), i.name.as_str()))
            .collect();

        let docker = match app.lifecycle.kind.as_str() {
            "docker" => self.docker_package(guid).await?,
            _ => None,
        };

        let is_buildpack = app.lifecycle.kind == "buildpack";
        let route_path = app.metadata.annotation(ROUTE_PATH_ANNOTATION);
        let manifest = ManifestConfig {
            buildpack: app
                .lifecycle
                .data
                .buildpacks
                .first()
                .filter(|_| is_buildpack)
                .cloned(),
            command: process.command,
            disk: Some(process.disk_in_mb),
            docker_image: docker.as_ref().and_then(|d| d.image.clone()),
            docker_username: docker.and_then(|d| d.username),
            environment_variables: env
                .var
                .iter()
                .map(|(k, v)| (k.clone(), scalar_to_string(v)))
                .collect(),
            health_check_http_endpoint: process.health_check.data.endpoint,
            health_check_type: HealthCheckType::parse(&process.health_check.kind),
            instances: Some(process.instances),
            memory: Some(process.memory_in_mb),
            routes: routes
                .resources
                .iter()
                .map(|r| strip_route_path(&r.url, route_path.as_deref()))
                .collect(),
            route_path,
            services: bindings
                .resources
                .iter()
                .filter_map(|b| b.relationships.service_instance.guid())
                .filter_map(|g| instance_names.get(g).map(|n| (*n).to_string()))
                .collect(),
            stack: app.lifecycle.data.stack.clone().filter(|_| is_buildpack),
            timeout: process.health_check.data.timeout,
            ..ManifestConfig::default()
        };

        let mut config = ApplicationConfig::with_manifest(manifest);
        config.meta = app.metadata.annotation(META_ANNOTATION);
        config.path = app.metadata.annotation(PATH_ANNOTATION);
        Ok(config)
    }

    /// Returns the docker settings of the newest docker package of an app.
    async fn docker_package(&self, guid: &str) -> Result<Option<PackageData>> {
        let path = format!("/v3/apps/{guid}/packages");
        let packages: ListResponse<Package> = self
            .list(&path, &[("types", "docker"), ("order_by", "-created_at")])
            .await?;
        Ok(packages
            .resources
            .into_iter()
            .find(|p| p.kind == "docker")
            .map(|p| p.data))
    }

    /// Records the document fields the platform does not model as annotations.
    async fn annotate_application(&self, name: &str, config: &ApplicationConfig) -> Result<()> {
        let annotations = application_annotations(config);
        if annotations.is_empty() {
            return Ok(());
        }

        let guid = self.app_guid(name).await?;
        debug!("Annotating application {name} with {:?}", annotations.keys());
        let body = serde_json::json!({ "metadata": { "annotations": annotations } });
        self.send(Method::PATCH, &format!("/v3/apps/{guid}"), Some(Body::Json(body)))
            .await
    }

    async fn service_parameters(&self, guid: &str) -> BTreeMap<String, String> {
        let path = format!("/v3/service_instances/{guid}/parameters");
        match self.get::<BTreeMap<String, serde_json::Value>>(&path, &[]).await {
            Ok(params) => params
                .iter()
                .map(|(k, v)| (k.clone(), scalar_to_string(v)))
                .collect(),
            Err(e) => {
                debug!("Parameters of service instance {guid} unavailable: {e}");
                BTreeMap::new()
            }
        }
    }

    /// Returns (role guid, username) for every space developer.
    async fn space_developer_roles(&self) -> Result<Vec<(String, String)>> {
        let roles: ListResponse<Role> = self
            .list(
                "/v3/roles",
                &[
                    ("types", SPACE_DEVELOPER_ROLE),
                    ("space_guids", self.space_guid.as_str()),
                    ("include", "user"),
                ],
            )
            .await?;

        let usernames: HashMap<&str, &str> = roles
            .included
            .users
            .iter()
            .filter_map(|u| u.username.as_deref().map(|name| (u.guid.as_str(), name)))
            .collect();

        Ok(roles
            .resources
            .iter()
            .filter_map(|role| {
                let user = role.relationships.user.guid()?;
                let name = usernames.get(user)?;
                Some((role.guid.clone(), (*name).to_string()))
            })
            .collect())
    }
}

/// Body of an environment variable patch; `null` unsets the variable.
fn environment_patch(key: &str, value: serde_json::Value) -> serde_json::Value {
    let mut var = serde_json::Map::new();
    var.insert(key.to_string(), value);
    serde_json::json!({ "var": var })
}

#[async_trait]
impl ApplicationsOperations for CfClient {
    async fn fetch_applications(&self) -> Result<BTreeMap<String, ApplicationConfig>> {
        let apps: ListResponse<App> = self
            .list("/v3/apps", &[("space_guids", self.space_guid.as_str())])
            .await?;
        debug!("Fetched {} applications", apps.resources.len());

        let configs = try_join_all(apps.resources.iter().map(|app| self.describe_application(app)))
            .await?;

        Ok(apps
            .resources
            .into_iter()
            .map(|app| app.name)
            .zip(configs)
            .collect())
    }

    async fn create_application(&self, name: &str, config: &ApplicationConfig) -> Result<()> {
        let docker_password = ConfigParser::get_docker_password(&config.manifest)?;
        let document = ManifestDocument {
            applications: vec![ManifestApplication::from_config(name, config, docker_password)],
        };
        let manifest = serde_yaml::to_string(&document)
            .map_err(|e| CfConvergeError::internal(format!("Failed to render manifest: {e}")))?;

        info!("Applying manifest for application {name}");
        let path = format!("/v3/spaces/{}/actions/apply_manifest", self.space_guid);
        self.send(Method::POST, &path, Some(Body::Yaml(manifest))).await?;
        self.annotate_application(name, config).await
    }

    async fn delete_application(&self, name: &str) -> Result<()> {
        let guid = self.app_guid(name).await?;
        self.send(Method::DELETE, &format!("/v3/apps/{guid}"), None).await
    }

    async fn rename_application(&self, name: &str, new_name: &str) -> Result<()> {
        let guid = self.app_guid(name).await?;
        let body = serde_json::json!({ "name": new_name });
        self.send(Method::PATCH, &format!("/v3/apps/{guid}"), Some(Body::Json(body)))
            .await
    }

    async fn scale_application(&self, name: &str, scale: ScaleParameters) -> Result<()> {
        let guid = self.app_guid(name).await?;

        let mut body = serde_json::json!({});
        if let Some(instances) = scale.instances {
            body["instances"] = serde_json::json!(instances);
        }
        if let Some(memory) = scale.memory {
            body["memory_in_mb"] = serde_json::json!(memory);
        }
        if let Some(disk) = scale.disk {
            body["disk_in_mb"] = serde_json::json!(disk);
        }

        let path = format!("/v3/apps/{guid}/processes/web/actions/scale");
        self.send(Method::POST, &path, Some(Body::Json(body))).await
    }

    async fn set_health_check(
        &self,
        name: &str,
        health_check_type: HealthCheckType,
        endpoint: Option<String>,
    ) -> Result<()> {
        let guid = self.app_guid(name).await?;
        let process: Process = self
            .get(&format!("/v3/apps/{guid}/processes/web"), &[])
            .await?;

        let mut health_check = serde_json::json!({ "type": health_check_type.as_str() });
        if let Some(endpoint) = endpoint.filter(|_| health_check_type == HealthCheckType::Http) {
            health_check["data"] = serde_json::json!({ "endpoint": endpoint });
        }

        let body = serde_json::json!({ "health_check": health_check });
        let path = format!("/v3/processes/{}", process.guid);
        self.send(Method::PATCH, &path, Some(Body::Json(body))).await
    }

    async fn add_environment_variable(&self, name: &str, key: &str, value: &str) -> Result<()> {
        let guid = self.app_guid(name).await?;
        let body = environment_patch(key, serde_json::json!(value));
        let path = format!("/v3/apps/{guid}/environment_variables");
        self.send(Method::PATCH, &path, Some(Body::Json(body))).await
    }

    async fn remove_environment_variable(&self, name: &str, key: &str) -> Result<()> {
        let guid = self.app_guid(name).await?;
        let body = environment_patch(key, serde_json::Value::Null);
        let path = format!("/v3/apps/{guid}/environment_variables");
        self.send(Method::PATCH, &path, Some(Body::Json(body))).await
    }

    async fn bind_service(&self, name: &str, service: &str) -> Result<()> {
        let (app_guid, instance_guid) =
            tokio::try_join!(self.app_guid(name), self.service_instance_guid(service))?;

        let body = serde_json::json!({
            "type": "app",
            "relationships": {
                "app": { "data": { "guid": app_guid } },
                "service_instance": { "data": { "guid": instance_guid } },
            },
        });
        self.send(
            Method::POST,
            "/v3/service_credential_bindings",
            Some(Body::Json(body)),
        )
        .await
    }

    async fn unbind_service(&self, name: &str, service: &str) -> Result<()> {
        let (app_guid, instance_guid) =
            tokio::try_join!(self.app_guid(name), self.service_instance_guid(service))?;

        let binding: CredentialBinding = self
            .find_one(
                "/v3/service_credential_bindings",
                &[
                    ("app_guids", app_guid.as_str()),
                    ("service_instance_guids", instance_guid.as_str()),
                ],
                "service binding",
                &format!("{name}/{service}"),
            )
            .await?;

        let path = format!("/v3/service_credential_bindings/{}", binding.guid);
        self.send(Method::DELETE, &path, None).await
    }
}

#[async_trait]
impl ServicesOperations for CfClient {
    async fn fetch_services(&self) -> Result<BTreeMap<String, ServiceConfig>> {
        let instances: ListResponse<ServiceInstance> = self
            .list(
                "/v3/service_instances",
                &[("space_guids", self.space_guid.as_str()), ("type", "managed")],
            )
            .await?;
        debug!("Fetched {} service instances", instances.resources.len());

        if instances.resources.is_empty() {
            return Ok(BTreeMap::new());
        }

        let mut plan_guids: Vec<&str> = instances
            .resources
            .iter()
            .filter_map(|i| i.relationships.service_plan.guid())
            .collect();
        plan_guids.sort_unstable();
        plan_guids.dedup();
        let plan_guids = plan_guids.join(",");

        let plans: ListResponse<ServicePlan> = self
            .list(
                "/v3/service_plans",
                &[("guids", plan_guids.as_str()), ("include", "service_offering")],
            )
            .await?;
        let offerings: HashMap<&str, &str> = plans
            .included
            .service_offerings
            .iter()
            .map(|o| (o.guid.as_str(), o.name.as_str()))
            .collect();
        let plans_by_guid: HashMap<&str, &ServicePlan> =
            plans.resources.iter().map(|p| (p.guid.as_str(), p)).collect();

        let parameters =
            futures::future::join_all(instances.resources.iter().map(|i| self.service_parameters(&i.guid)))
                .await;

        Ok(instances
            .resources
            .iter()
            .zip(parameters)
            .map(|(instance, params)| {
                let plan = instance
                    .relationships
                    .service_plan
                    .guid()
                    .and_then(|g| plans_by_guid.get(g));
                let offering = plan
                    .and_then(|p| p.relationships.service_offering.guid())
                    .and_then(|g| offerings.get(g));

                let config = ServiceConfig {
                    service: offering.map(|o| (*o).to_string()).unwrap_or_default(),
                    plan: plan.map(|p| p.name.clone()).unwrap_or_default(),
                    tags: instance.tags.clone(),
                    params,
                };
                (instance.name.clone(), config)
            })
            .collect())
    }

    async fn create_service(&self, name: &str, config: &ServiceConfig) -> Result<()> {
        let plan: ServicePlan = self
            .find_one(
                "/v3/service_plans",
                &[
                    ("names", config.plan.as_str()),
                    ("service_offering_names", config.service.as_str()),
                    ("space_guids", self.space_guid.as_str()),
                ],
                "service plan",
                &format!("{}/{}", config.service, config.plan),
            )
            .await?;

        let body = serde_json::json!({
            "type": "managed",
            "name": name,
            "tags": config.tags,
            "parameters": config.params,
            "relationships": {
                "space": { "data": { "guid": self.space_guid } },
                "service_plan": { "data": { "guid": plan.guid } },
            },
        });

        info!("Creating service instance {name} ({}/{})", config.service, config.plan);
        self.send(Method::POST, "/v3/service_instances", Some(Body::Json(body)))
            .await
    }

    async fn delete_service(&self, name: &str) -> Result<()> {
        let guid = self.service_instance_guid(name).await?;
        self.send(Method::DELETE, &format!("/v3/service_instances/{guid}"), None)
            .await
    }
}

#[async_trait]
impl SpaceDevelopersOperations for CfClient {
    async fn fetch_space_developers(&self) -> Result<Vec<String>> {
        let roles = self.space_developer_roles().await?;
        Ok(roles.into_iter().map(|(_, name)| name).collect())
    }

    async fn grant_space_developer(&self, username: &str) -> Result<()> {
        let body = serde_json::json!({
            "type": SPACE_DEVELOPER_ROLE,
            "relationships": {
                "user": { "data": { "username": username } },
                "space": { "data": { "guid": self.space_guid } },
            },
        });
        self.send(Method::POST, "/v3/roles", Some(Body::Json(body))).await
    }

    async fn revoke_space_developer(&self, username: &str) -> Result<()> {
        let roles = self.space_developer_roles().await?;
        let (role_guid, _) = roles
            .into_iter()
            .find(|(_, name)| name == username)
            .ok_or_else(|| PlatformError::not_found("space developer", username))?;

        self.send(Method::DELETE, &format!("/v3/roles/{role_guid}"), None)
            .await
    }
}

impl Platform for CfClient {
    fn backend_type(&self) -> &'static str {
        "cloudfoundry"
    }
}
