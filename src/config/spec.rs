//! Configuration document types for the convergence system.
//!
//! This module defines all the structs that map to the configuration document.
//! These types are declarative and fully describe the desired state of one space.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// The root of a configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ConfigDocument {
    /// Document format version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    /// Platform endpoint and space the document applies to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<TargetConfig>,
    /// Desired state.
    #[serde(default)]
    pub spec: SpecConfig,
}

/// Platform endpoint and space selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TargetConfig {
    /// API endpoint (e.g. `https://api.example.com`).
    pub api: String,
    /// Organization name.
    pub organization: String,
    /// Space name.
    pub space: String,
}

/// Desired state of a space.
///
/// A section left out of the document is not reconciled at all.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SpecConfig {
    /// Users holding the space developer role.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space_developers: Option<Vec<String>>,
    /// Service instances by name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<BTreeMap<String, ServiceConfig>>,
    /// Applications by name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apps: Option<BTreeMap<String, ApplicationConfig>>,
}

/// Configuration for a single application.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApplicationConfig {
    /// Path to the application bits.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Free-form metadata stored alongside the application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<String>,
    /// Manifest settings.
    #[serde(default)]
    pub manifest: ManifestConfig,
}

/// Manifest settings of an application.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ManifestConfig {
    /// Buildpack name or URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buildpack: Option<String>,
    /// Start command.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    /// Disk quota in MB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk: Option<u32>,
    /// Docker image to run instead of buildpack-staged bits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker_image: Option<String>,
    /// Docker registry user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker_username: Option<String>,
    /// Environment variables.
    #[serde(
        deserialize_with = "deserialize_scalar_map",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub environment_variables: BTreeMap<String, String>,
    /// Endpoint checked by the `http` health check.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_http_endpoint: Option<String>,
    /// Health check type.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_type: Option<HealthCheckType>,
    /// Number of instances.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instances: Option<u32>,
    /// Memory limit in MB.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<u32>,
    /// Do not map any route.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_route: Option<bool>,
    /// Map a random route.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub random_route: Option<bool>,
    /// Route path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub route_path: Option<String>,
    /// Routes mapped to the application.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<String>,
    /// Names of service instances bound to the application.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<String>,
    /// Stack name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
    /// Start timeout in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
}

/// Health check types supported by the platform.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum HealthCheckType {
    /// HTTP request to an endpoint.
    Http,
    /// TCP port check.
    Port,
    /// Process liveness only.
    Process,
    /// No health check.
    None,
}

/// Configuration for a single service instance.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Service offering name.
    pub service: String,
    /// Service plan name.
    pub plan: String,
    /// Tags attached to the instance.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Provisioning parameters.
    #[serde(
        default,
        deserialize_with = "deserialize_scalar_map",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub params: BTreeMap<String, String>,
}

/// Accepts any YAML scalar as a map value and keeps its textual form.
fn deserialize_scalar_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<BTreeMap<String, serde_yaml::Value>>::deserialize(deserializer)?;
    raw.unwrap_or_default()
        .into_iter()
        .map(|(key, value)| {
            let text = match value {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Number(n) => n.to_string(),
                serde_yaml::Value::Bool(b) => b.to_string(),
                serde_yaml::Value::Null => String::new(),
                _ => {
                    return Err(<D::Error as serde::de::Error>::custom(format!(
                        "value of '{key}' must be a scalar"
                    )));
                }
            };
            Ok((key, text))
        })
        .collect()
}

impl HealthCheckType {
    /// Returns the platform's name for this health check type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Http => "http",
            Self::Port => "port",
            Self::Process => "process",
            Self::None => "none",
        }
    }

    /// Parses the platform's name for a health check type.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "http" => Some(Self::Http),
            "port" => Some(Self::Port),
            "process" => Some(Self::Process),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

impl std::fmt::Display for HealthCheckType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ConfigDocument {
    /// Returns a document holding the given desired state and no target.
    #[must_use]
    pub fn from_spec(spec: SpecConfig) -> Self {
        Self {
            api_version: Some(String::from("1.0")),
            target: None,
            spec,
        }
    }
}

impl SpecConfig {
    /// Returns true if no section is present.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.space_developers.is_none() && self.services.is_none() && self.apps.is_none()
    }
}

impl ApplicationConfig {
    /// Creates an application that only carries a manifest.
    #[must_use]
    pub fn with_manifest(manifest: ManifestConfig) -> Self {
        Self {
            path: None,
            meta: None,
            manifest,
        }
    }
}

impl ServiceConfig {
    /// Creates a service instance of the given offering and plan.
    #[must_use]
    pub fn new(service: impl Into<String>, plan: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            plan: plan.into(),
            tags: Vec::new(),
            params: BTreeMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_camel_case_fields() {
        let yaml = r"
buildpack: ruby_buildpack
healthCheckType: port
environmentVariables:
  PORT: 8080
  DEBUG: true
";
        let manifest: ManifestConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(manifest.buildpack.as_deref(), Some("ruby_buildpack"));
        assert_eq!(manifest.health_check_type, Some(HealthCheckType::Port));
        assert_eq!(manifest.environment_variables["PORT"], "8080");
        assert_eq!(manifest.environment_variables["DEBUG"], "true");
    }

    #[test]
    fn test_nested_env_value_rejected() {
        let yaml = r"
environmentVariables:
  NESTED:
    a: b
";
        let manifest: std::result::Result<ManifestConfig, _> = serde_yaml::from_str(yaml);
        assert!(manifest.is_err());
    }

    #[test]
    fn test_absent_sections_stay_absent() {
        let spec: SpecConfig = serde_yaml::from_str("services: {}").unwrap();
        assert!(spec.apps.is_none());
        assert!(spec.space_developers.is_none());
        assert_eq!(spec.services.map(|s| s.len()), Some(0));
    }

    #[test]
    fn test_health_check_type_parse() {
        assert_eq!(HealthCheckType::parse("HTTP"), Some(HealthCheckType::Http));
        assert_eq!(HealthCheckType::parse("none"), Some(HealthCheckType::None));
        assert_eq!(HealthCheckType::parse("tcp"), None);
    }
}
