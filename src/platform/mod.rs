//! Remote platform integration.
//!
//! This module provides the capability traits the planners and the
//! reconciler talk to, an HTTP client for the Cloud Foundry v3 API, and an
//! in-memory platform holding live state in process.

mod client;
mod memory;
mod operations;
mod types;

pub use client::CfClient;
pub use memory::{InMemoryPlatform, RecordedCall};
#[cfg(test)]
pub use operations::{
    MockApplicationsOperations, MockServicesOperations, MockSpaceDevelopersOperations,
};
pub use operations::{
    ApplicationsOperations, Platform, ScaleParameters, ServicesOperations,
    SpaceDevelopersOperations,
};
pub use types::{ManifestApplication, ManifestDocument};
