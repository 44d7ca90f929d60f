//! Configuration validation for configuration documents.
//!
//! Catches documents that would only fail halfway through a run: empty
//! names, zero-sized quotas, bindings to services that do not exist.

use crate::error::{CfConvergeError, ConfigError, Result};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use super::spec::{
    ApplicationConfig, ConfigDocument, HealthCheckType, ManifestConfig, ServiceConfig,
    TargetConfig,
};

/// Validator for configuration documents.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a configuration document.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any were found.
    pub fn validate(&self, document: &ConfigDocument) -> Result<ValidationResult> {
        let result = self.check(document);

        match result.errors.first() {
            None => {
                debug!("Configuration validation passed");
                Ok(result)
            }
            Some(first_error) => Err(CfConvergeError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            })),
        }
    }

    /// Collects every error and warning without failing.
    #[must_use]
    pub fn check(&self, document: &ConfigDocument) -> ValidationResult {
        let mut result = ValidationResult::default();

        if let Some(target) = &document.target {
            Self::validate_target(target, &mut result);
        }
        if let Some(developers) = &document.spec.space_developers {
            Self::validate_space_developers(developers, &mut result);
        }
        if let Some(services) = &document.spec.services {
            Self::validate_services(services, &mut result);
        }
        if let Some(apps) = &document.spec.apps {
            Self::validate_apps(apps, document.spec.services.as_ref(), &mut result);
        }
        if document.spec.is_empty() {
            result
                .warnings
                .push(String::from("spec: no section present, nothing will be reconciled"));
        }

        result
    }

    /// Validates the target section.
    fn validate_target(target: &TargetConfig, result: &mut ValidationResult) {
        for (field, value) in [
            ("target.api", &target.api),
            ("target.organization", &target.organization),
            ("target.space", &target.space),
        ] {
            if value.trim().is_empty() {
                result.errors.push(ValidationError {
                    field: String::from(field),
                    message: format!("{field} cannot be empty"),
                });
            }
        }
    }

    /// Validates the space developer list.
    fn validate_space_developers(developers: &[String], result: &mut ValidationResult) {
        let mut seen = HashSet::new();

        for (i, developer) in developers.iter().enumerate() {
            if developer.trim().is_empty() {
                result.errors.push(ValidationError {
                    field: format!("spec.spaceDevelopers[{i}]"),
                    message: String::from("Space developer name cannot be empty"),
                });
            } else if !seen.insert(developer.as_str()) {
                result.warnings.push(format!(
                    "spec.spaceDevelopers[{i}]: '{developer}' is listed more than once"
                ));
            }
        }
    }

    /// Validates all service configurations.
    fn validate_services(services: &BTreeMap<String, ServiceConfig>, result: &mut ValidationResult) {
        for (name, service) in services {
            let prefix = format!("spec.services.{name}");
            Self::validate_entity_name(name, &prefix, result);

            if service.service.trim().is_empty() {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.service"),
                    message: format!("Service '{name}' has no service offering"),
                });
            }
            if service.plan.trim().is_empty() {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.plan"),
                    message: format!("Service '{name}' has no plan"),
                });
            }
        }
    }

    /// Validates all application configurations.
    fn validate_apps(
        apps: &BTreeMap<String, ApplicationConfig>,
        services: Option<&BTreeMap<String, ServiceConfig>>,
        result: &mut ValidationResult,
    ) {
        for (name, app) in apps {
            let prefix = format!("spec.apps.{name}");
            Self::validate_entity_name(name, &prefix, result);
            Self::validate_manifest(&app.manifest, &prefix, services, result);
        }
    }

    /// Validates manifest settings.
    fn validate_manifest(
        manifest: &ManifestConfig,
        prefix: &str,
        services: Option<&BTreeMap<String, ServiceConfig>>,
        result: &mut ValidationResult,
    ) {
        for (field, value) in [
            ("instances", manifest.instances),
            ("memory", manifest.memory),
            ("disk", manifest.disk),
            ("timeout", manifest.timeout),
        ] {
            if value == Some(0) {
                result.errors.push(ValidationError {
                    field: format!("{prefix}.manifest.{field}"),
                    message: format!("{field} must be greater than zero"),
                });
            }
        }

        if manifest.health_check_http_endpoint.is_some()
            && manifest.health_check_type.is_some_and(|t| t != HealthCheckType::Http)
        {
            result.warnings.push(format!(
                "{prefix}.manifest.healthCheckHttpEndpoint: ignored unless healthCheckType is http"
            ));
        }

        if let Some(services) = services {
            for (i, binding) in manifest.services.iter().enumerate() {
                if !services.contains_key(binding) {
                    result.warnings.push(format!(
                        "{prefix}.manifest.services[{i}]: '{binding}' is not declared in spec.services"
                    ));
                }
            }
        }
    }

    /// Validates an application or service name.
    fn validate_entity_name(name: &str, prefix: &str, result: &mut ValidationResult) {
        if !is_valid_name(name) {
            result.errors.push(ValidationError {
                field: String::from(prefix),
                message: format!("Name '{name}' is invalid. Must be non-empty without whitespace."),
            });
        }
    }
}

/// Validates that a name can be used as an entity name.
fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(char::is_whitespace)
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpecConfig;

    fn document_with_app(manifest: ManifestConfig) -> ConfigDocument {
        let mut apps = BTreeMap::new();
        apps.insert(String::from("app1"), ApplicationConfig::with_manifest(manifest));
        ConfigDocument::from_spec(SpecConfig {
            apps: Some(apps),
            ..SpecConfig::default()
        })
    }

    #[test]
    fn test_valid_name() {
        assert!(is_valid_name("app1"));
        assert!(is_valid_name("My_App.v2"));
        assert!(!is_valid_name(""));
        assert!(!is_valid_name("my app"));
    }

    #[test]
    fn test_zero_instances_rejected() {
        let document = document_with_app(ManifestConfig {
            instances: Some(0),
            ..ManifestConfig::default()
        });

        let result = ConfigValidator::new().validate(&document);
        assert!(matches!(
            result,
            Err(CfConvergeError::Config(ConfigError::ValidationError { .. }))
        ));
    }

    #[test]
    fn test_unknown_binding_is_a_warning() {
        let mut document = document_with_app(ManifestConfig {
            services: vec![String::from("missing-db")],
            ..ManifestConfig::default()
        });
        document.spec.services = Some(BTreeMap::new());

        let result = ConfigValidator::new().validate(&document).unwrap();
        assert_eq!(result.warning_count(), 1);
        assert!(result.warnings[0].contains("missing-db"));
    }

    #[test]
    fn test_empty_service_plan_rejected() {
        let mut services = BTreeMap::new();
        services.insert(String::from("db"), ServiceConfig::new("postgres", ""));
        let document = ConfigDocument::from_spec(SpecConfig {
            services: Some(services),
            ..SpecConfig::default()
        });

        let result = ConfigValidator::new().check(&document);
        assert_eq!(result.error_count(), 1);
        assert_eq!(result.errors[0].field, "spec.services.db.plan");
    }

    #[test]
    fn test_duplicate_developer_warns() {
        let document = ConfigDocument::from_spec(SpecConfig {
            space_developers: Some(vec![String::from("alice"), String::from("alice")]),
            ..SpecConfig::default()
        });

        let result = ConfigValidator::new().check(&document);
        assert!(result.is_valid());
        assert_eq!(result.warning_count(), 1);
    }
}
