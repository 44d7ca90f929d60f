//! Planning and execution of remote calls.
//!
//! This module provides:
//! - Classification of an entity's change list
//! - One planner per entity kind
//! - Units of work and the concurrent batch executor

mod application;
mod classify;
mod executor;
mod service;
mod space_developers;
mod unit;

pub use application::ApplicationRequestsPlanner;
pub use classify::{Classification, classify};
pub use executor::{BatchReport, PlanExecutor, UnitOutcome};
pub use service::ServiceRequestsPlanner;
pub use space_developers::SpaceDevelopersRequestsPlanner;
pub use unit::{Operation, PlannedOperation, UnitOfWork};
