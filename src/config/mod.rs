//! Configuration module for the convergence system.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing configuration documents
//! - The config tree shape compared by the differ
//! - Validation of configuration values
//! - Computing configuration fingerprints

mod hash;
mod parser;
mod spec;
mod tree;
mod validator;

pub use hash::ConfigHasher;
pub use parser::{
    ACCESS_TOKEN_VAR, ConfigParser, DEFAULT_CONFIG_FILES, DOCKER_PASSWORD_VAR, find_config_file,
};
pub use spec::{
    ApplicationConfig, ConfigDocument, HealthCheckType, ManifestConfig, ServiceConfig,
    SpecConfig, TargetConfig,
};
pub use tree::ConfigTree;
pub use validator::{ConfigValidator, ValidationError, ValidationResult};
