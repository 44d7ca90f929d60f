// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// Tests may unwrap and panic freely
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

// ============================================================================
// Crate Documentation
// ============================================================================

//! # cf-converge
//!
//! A declarative, idempotent reconciler for Cloud Foundry spaces.
//!
//! ## Overview
//!
//! cf-converge compares the desired configuration of a space with its live
//! state and issues the remote calls that make the live state match:
//!
//! - Define applications, service instances and space developers in YAML
//! - Show the structural differences between the document and the space
//! - Plan the remote calls without issuing them
//! - Apply every call concurrently; one failing call never stops the others
//!
//! ## Architecture
//!
//! The system is built around **desired state reconciliation**, one entity
//! kind at a time:
//!
//! 1. **Desired State**: the `spec` section of `cfconverge.yaml`
//! 2. **Live State**: fetched from the platform for the same kind
//! 3. **Differ**: produces a flat list of changes between the two trees
//! 4. **Planners**: turn each entity's changes into units of work
//! 5. **Executor**: submits all units together and reports each outcome
//!
//! ## Modules
//!
//! - [`config`]: Configuration parsing, validation and hashing
//! - [`diff`]: Change model, tree differ and diff result
//! - [`planner`]: Entity planners, units of work and the batch executor
//! - [`platform`]: Remote operations, HTTP client and in-memory platform
//! - [`reconciler`]: Reconciliation orchestrator
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! target:
//!   api: https://api.cf.example.com
//!   organization: my-org
//!   space: development
//!
//! spec:
//!   spaceDevelopers: [alice, bob]
//!   services:
//!     my-db:
//!       service: elephantsql
//!       plan: turtle
//!   apps:
//!     app1:
//!       manifest:
//!         buildpack: ruby_buildpack
//!         instances: 2
//!         services: [my-db]
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod diff;
pub mod error;
pub mod planner;
pub mod platform;
pub mod reconciler;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{ConfigDocument, ConfigHasher, ConfigParser, ConfigTree, ConfigValidator};
pub use diff::{Change, ChangeKind, ChangePath, DiffResult, EntityKind, TreeDiffer};
pub use error::{CfConvergeError, Result};
pub use planner::{
    ApplicationRequestsPlanner, BatchReport, PlanExecutor, ServiceRequestsPlanner,
    SpaceDevelopersRequestsPlanner, UnitOfWork,
};
pub use platform::{CfClient, InMemoryPlatform, Platform};
pub use reconciler::{PlanReport, Reconciler, RunReport};
