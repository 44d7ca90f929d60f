//! Configuration parser for loading configuration documents.
//!
//! This module handles loading the desired state from YAML files and
//! environment variables, with proper precedence and error handling.

use crate::error::{CfConvergeError, ConfigError, Result};
use std::path::Path;
use tracing::{debug, info};

use super::spec::{ConfigDocument, ManifestConfig, TargetConfig};

/// Environment variable holding the platform bearer token.
pub const ACCESS_TOKEN_VAR: &str = "CF_ACCESS_TOKEN";

/// Environment variable holding the password of a private docker registry.
pub const DOCKER_PASSWORD_VAR: &str = "CF_DOCKER_PASSWORD";

/// Configuration parser for loading configuration documents.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving relative paths.
    base_path: Option<std::path::PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<std::path::PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads a configuration document from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<ConfigDocument> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(CfConvergeError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            CfConvergeError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses a configuration document from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<ConfigDocument> {
        debug!("Parsing YAML configuration");

        let document: ConfigDocument = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            CfConvergeError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!(
            "Parsed configuration with {} apps, {} services, {} space developers",
            document.spec.apps.as_ref().map_or(0, std::collections::BTreeMap::len),
            document.spec.services.as_ref().map_or(0, std::collections::BTreeMap::len),
            document.spec.space_developers.as_ref().map_or(0, Vec::len),
        );
        Ok(document)
    }

    /// Loads a configuration document with environment variable overrides.
    ///
    /// `CFCONVERGE_API`, `CFCONVERGE_ORGANIZATION` and `CFCONVERGE_SPACE`
    /// override the corresponding `target` fields.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_with_env(&self, path: impl AsRef<Path>) -> Result<ConfigDocument> {
        let mut document = self.load_file(path)?;
        Self::apply_overrides(&mut document, |name| std::env::var(name).ok());
        Ok(document)
    }

    /// Applies target overrides using the given variable lookup.
    ///
    /// A missing target is only created when all three variables are set.
    pub fn apply_overrides<F>(document: &mut ConfigDocument, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let api = lookup("CFCONVERGE_API");
        let organization = lookup("CFCONVERGE_ORGANIZATION");
        let space = lookup("CFCONVERGE_SPACE");

        match document.target.as_mut() {
            Some(target) => {
                if let Some(api) = api {
                    debug!("Overriding target.api from environment");
                    target.api = api;
                }
                if let Some(organization) = organization {
                    debug!("Overriding target.organization from environment");
                    target.organization = organization;
                }
                if let Some(space) = space {
                    debug!("Overriding target.space from environment");
                    target.space = space;
                }
            }
            None => {
                if let (Some(api), Some(organization), Some(space)) = (api, organization, space) {
                    debug!("Taking target from environment");
                    document.target = Some(TargetConfig {
                        api,
                        organization,
                        space,
                    });
                }
            }
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| std::path::PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                CfConvergeError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }

    /// Gets the platform access token from environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the token is not set.
    pub fn get_access_token() -> Result<String> {
        std::env::var(ACCESS_TOKEN_VAR).map_err(|_| {
            CfConvergeError::Config(ConfigError::MissingEnvVar {
                name: String::from(ACCESS_TOKEN_VAR),
            })
        })
    }

    /// Gets the docker registry password an application needs, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest names a docker image and user but the
    /// password is not set.
    pub fn get_docker_password(manifest: &ManifestConfig) -> Result<Option<String>> {
        Self::docker_password_with(manifest, |name| std::env::var(name).ok())
    }

    /// Resolves the docker registry password through a lookup function.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest names a docker image and user but the
    /// lookup yields no password.
    pub fn docker_password_with<F>(manifest: &ManifestConfig, lookup: F) -> Result<Option<String>>
    where
        F: Fn(&str) -> Option<String>,
    {
        if manifest.docker_image.is_none() || manifest.docker_username.is_none() {
            return Ok(None);
        }

        lookup(DOCKER_PASSWORD_VAR).map(Some).ok_or_else(|| {
            CfConvergeError::Config(ConfigError::MissingEnvVar {
                name: String::from(DOCKER_PASSWORD_VAR),
            })
        })
    }

    /// Serializes a document to YAML.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_yaml(document: &ConfigDocument) -> Result<String> {
        serde_yaml::to_string(document)
            .map_err(|e| CfConvergeError::internal(format!("Failed to serialize document: {e}")))
    }
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &[
    "cfconverge.yaml",
    "cfconverge.yml",
    "manifest.converge.yaml",
];

/// Finds the configuration file in the current directory or parent directories.
///
/// # Errors
///
/// Returns an error if no configuration file is found.
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Result<std::path::PathBuf> {
    let start = start_dir.as_ref();
    let mut current = start.to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Ok(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    Err(CfConvergeError::Config(ConfigError::FileNotFound {
        path: start.join(DEFAULT_CONFIG_FILES[0]),
    }))
}
