//! The config tree compared by the differ.

use serde::Serialize;
use std::collections::BTreeMap;

use super::spec::{ApplicationConfig, ServiceConfig, SpecConfig};

/// Full declarative state of a space, desired or live.
///
/// Unlike [`SpecConfig`] every section is present; an absent section is
/// simply empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConfigTree {
    /// Applications by name.
    pub applications: BTreeMap<String, ApplicationConfig>,
    /// Service instances by name.
    pub services: BTreeMap<String, ServiceConfig>,
    /// Authorized space developers.
    pub space_developers: Vec<String>,
}

impl ConfigTree {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tree restricted to applications.
    #[must_use]
    pub fn from_applications(applications: BTreeMap<String, ApplicationConfig>) -> Self {
        Self {
            applications,
            ..Self::default()
        }
    }

    /// Creates a tree restricted to service instances.
    #[must_use]
    pub fn from_services(services: BTreeMap<String, ServiceConfig>) -> Self {
        Self {
            services,
            ..Self::default()
        }
    }

    /// Creates a tree restricted to space developers.
    #[must_use]
    pub fn from_space_developers(space_developers: Vec<String>) -> Self {
        Self {
            space_developers,
            ..Self::default()
        }
    }

    /// Builds a tree from a document's desired state.
    #[must_use]
    pub fn from_spec(spec: &SpecConfig) -> Self {
        Self {
            applications: spec.apps.clone().unwrap_or_default(),
            services: spec.services.clone().unwrap_or_default(),
            space_developers: spec.space_developers.clone().unwrap_or_default(),
        }
    }

    /// Converts the tree back into a document spec with every section present.
    #[must_use]
    pub fn into_spec(self) -> SpecConfig {
        SpecConfig {
            space_developers: Some(self.space_developers),
            services: Some(self.services),
            apps: Some(self.applications),
        }
    }

    /// Returns the total number of entities in the tree.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.applications.len() + self.services.len() + self.space_developers.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restricted_trees_leave_other_kinds_empty() {
        let mut services = BTreeMap::new();
        services.insert(String::from("db"), ServiceConfig::new("postgres", "small"));

        let tree = ConfigTree::from_services(services);
        assert!(tree.applications.is_empty());
        assert!(tree.space_developers.is_empty());
        assert_eq!(tree.entity_count(), 1);
    }

    #[test]
    fn test_spec_round_trip_fills_sections() {
        let spec = SpecConfig {
            space_developers: Some(vec![String::from("alice")]),
            services: None,
            apps: None,
        };
        let tree = ConfigTree::from_spec(&spec);
        let back = tree.into_spec();
        assert_eq!(back.space_developers, Some(vec![String::from("alice")]));
        assert_eq!(back.services.map(|s| s.len()), Some(0));
    }
}
