//! Configuration hashing for run correlation.
//!
//! This module provides deterministic fingerprints of config trees so a
//! plan and the apply that follows it can be matched up in the output.

use sha2::{Digest, Sha256};

use super::spec::{ApplicationConfig, ServiceConfig};
use super::tree::ConfigTree;

/// Hasher for computing configuration fingerprints.
#[derive(Debug, Default)]
pub struct ConfigHasher;

impl ConfigHasher {
    /// Creates a new configuration hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Computes a hash of an entire config tree.
    ///
    /// Space developer order and duplicates do not affect the result.
    #[must_use]
    pub fn hash_tree(&self, tree: &ConfigTree) -> String {
        let mut hasher = Sha256::new();

        // Maps are ordered, so iteration is deterministic
        for (name, app) in &tree.applications {
            hasher.update(name.as_bytes());
            hasher.update(self.hash_application(app).as_bytes());
        }

        for (name, service) in &tree.services {
            hasher.update(name.as_bytes());
            hasher.update(self.hash_service(service).as_bytes());
        }

        let mut developers: Vec<&String> = tree.space_developers.iter().collect();
        developers.sort_unstable();
        developers.dedup();
        for developer in developers {
            hasher.update(developer.as_bytes());
            hasher.update([0u8]);
        }

        hex::encode(hasher.finalize())
    }

    /// Computes a hash for a single application.
    #[must_use]
    pub fn hash_application(&self, app: &ApplicationConfig) -> String {
        // The YAML rendering covers every field; BTreeMaps keep it stable
        let rendered = serde_yaml::to_string(app).unwrap_or_default();
        hex::encode(Sha256::digest(rendered.as_bytes()))
    }

    /// Computes a hash for a single service instance.
    #[must_use]
    pub fn hash_service(&self, service: &ServiceConfig) -> String {
        let mut hasher = Sha256::new();
        hasher.update(service.service.as_bytes());
        hasher.update([0u8]);
        hasher.update(service.plan.as_bytes());
        hasher.update([0u8]);

        let mut tags: Vec<&String> = service.tags.iter().collect();
        tags.sort_unstable();
        for tag in tags {
            hasher.update(tag.as_bytes());
            hasher.update([0u8]);
        }

        for (key, value) in &service.params {
            hasher.update(key.as_bytes());
            hasher.update([b'=']);
            hasher.update(value.as_bytes());
            hasher.update([0u8]);
        }

        hex::encode(hasher.finalize())
    }

    /// Computes a short hash (first 8 characters) for display purposes.
    #[must_use]
    pub fn short_hash(&self, hash: &str) -> String {
        hash.chars().take(8).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ManifestConfig;
    use std::collections::BTreeMap;

    fn tree_with_app(instances: u32) -> ConfigTree {
        let mut apps = BTreeMap::new();
        apps.insert(
            String::from("app1"),
            ApplicationConfig::with_manifest(ManifestConfig {
                instances: Some(instances),
                ..ManifestConfig::default()
            }),
        );
        ConfigTree::from_applications(apps)
    }

    #[test]
    fn test_tree_hash_deterministic() {
        let hasher = ConfigHasher::new();
        assert_eq!(hasher.hash_tree(&tree_with_app(1)), hasher.hash_tree(&tree_with_app(1)));
    }

    #[test]
    fn test_different_trees_different_hash() {
        let hasher = ConfigHasher::new();
        assert_ne!(hasher.hash_tree(&tree_with_app(1)), hasher.hash_tree(&tree_with_app(3)));
    }

    #[test]
    fn test_developer_order_ignored() {
        let hasher = ConfigHasher::new();
        let a = ConfigTree::from_space_developers(vec![String::from("alice"), String::from("bob")]);
        let b = ConfigTree::from_space_developers(vec![String::from("bob"), String::from("alice")]);
        assert_eq!(hasher.hash_tree(&a), hasher.hash_tree(&b));
    }

    #[test]
    fn test_short_hash() {
        let hasher = ConfigHasher::new();
        let short = hasher.short_hash("abcdef1234567890abcdef1234567890");
        assert_eq!(short, "abcdef12");
    }
}
