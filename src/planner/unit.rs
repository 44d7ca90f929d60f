//! Units of work produced by the planners.

use futures::future::BoxFuture;
use serde::Serialize;
use std::future::Future;

use crate::config::HealthCheckType;
use crate::diff::EntityKind;
use crate::error::{CfConvergeError, ReconcileError, Result};
use crate::platform::ScaleParameters;

/// Remote call described by a unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "operation", rename_all = "camelCase")]
pub enum Operation {
    /// Create and push an application.
    CreateApplication,
    /// Delete an application.
    DeleteApplication,
    /// Rename an application.
    #[serde(rename_all = "camelCase")]
    RenameApplication {
        /// Name after the call.
        new_name: String,
    },
    /// Scale an application.
    ScaleApplication(ScaleParameters),
    /// Set the health check of an application.
    #[serde(rename_all = "camelCase")]
    SetHealthCheck {
        /// Health check type.
        health_check_type: HealthCheckType,
        /// HTTP endpoint.
        #[serde(skip_serializing_if = "Option::is_none")]
        endpoint: Option<String>,
    },
    /// Add or overwrite an environment variable.
    AddEnvironmentVariable {
        /// Variable name.
        key: String,
    },
    /// Remove an environment variable.
    RemoveEnvironmentVariable {
        /// Variable name.
        key: String,
    },
    /// Bind a service instance.
    BindService {
        /// Service instance name.
        service: String,
    },
    /// Unbind a service instance.
    UnbindService {
        /// Service instance name.
        service: String,
    },
    /// Create a service instance.
    CreateService {
        /// Service offering.
        service: String,
        /// Service plan.
        plan: String,
    },
    /// Delete a service instance.
    DeleteService,
    /// Grant the space developer role.
    GrantSpaceDeveloper {
        /// User receiving the role.
        username: String,
    },
    /// Revoke the space developer role.
    RevokeSpaceDeveloper {
        /// User losing the role.
        username: String,
    },
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CreateApplication => write!(f, "create application"),
            Self::DeleteApplication => write!(f, "delete application"),
            Self::RenameApplication { new_name } => write!(f, "rename to {new_name}"),
            Self::ScaleApplication(scale) => write!(f, "scale ({scale})"),
            Self::SetHealthCheck {
                health_check_type,
                endpoint: Some(endpoint),
            } => write!(f, "set health check {health_check_type} {endpoint}"),
            Self::SetHealthCheck {
                health_check_type, ..
            } => write!(f, "set health check {health_check_type}"),
            Self::AddEnvironmentVariable { key } => write!(f, "set env {key}"),
            Self::RemoveEnvironmentVariable { key } => write!(f, "unset env {key}"),
            Self::BindService { service } => write!(f, "bind {service}"),
            Self::UnbindService { service } => write!(f, "unbind {service}"),
            Self::CreateService { service, plan } => {
                write!(f, "create service ({service}/{plan})")
            }
            Self::DeleteService => write!(f, "delete service"),
            Self::GrantSpaceDeveloper { username } => write!(f, "grant {username}"),
            Self::RevokeSpaceDeveloper { username } => write!(f, "revoke {username}"),
        }
    }
}

/// Serializable description of a unit of work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedOperation {
    /// Entity kind.
    pub kind: EntityKind,
    /// Entity name; empty for the space developer list.
    pub entity: String,
    /// The remote call.
    #[serde(flatten)]
    pub operation: Operation,
}

impl std::fmt::Display for PlannedOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.entity.is_empty() {
            write!(f, "{}: {}", self.kind, self.operation)
        } else {
            write!(f, "{} '{}': {}", self.kind, self.entity, self.operation)
        }
    }
}

/// One remote call and its eventual outcome.
///
/// The call does not start until the unit is polled.
pub struct UnitOfWork<'a> {
    description: PlannedOperation,
    future: BoxFuture<'a, Result<()>>,
}

impl<'a> UnitOfWork<'a> {
    /// Wraps a remote call.
    ///
    /// A failure of the call is reported as an apply failure of the entity.
    pub fn new<F>(kind: EntityKind, entity: &str, operation: Operation, call: F) -> Self
    where
        F: Future<Output = Result<()>> + Send + 'a,
    {
        let name = entity.to_string();
        let future = async move {
            call.await.map_err(|e| {
                CfConvergeError::Reconcile(ReconcileError::apply_failed(kind, &name, e))
            })
        };

        Self {
            description: PlannedOperation {
                kind,
                entity: entity.to_string(),
                operation,
            },
            future: Box::pin(future),
        }
    }

    /// Returns the description of the call.
    #[must_use]
    pub const fn description(&self) -> &PlannedOperation {
        &self.description
    }

    /// Returns the remote call.
    #[must_use]
    pub const fn operation(&self) -> &Operation {
        &self.description.operation
    }

    /// Splits the unit into its description and its call.
    #[must_use]
    pub fn into_parts(self) -> (PlannedOperation, BoxFuture<'a, Result<()>>) {
        (self.description, self.future)
    }
}

impl std::fmt::Debug for UnitOfWork<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlatformError;

    #[tokio::test]
    async fn test_failure_is_wrapped_as_apply_failed() {
        let unit = UnitOfWork::new(
            EntityKind::Services,
            "db",
            Operation::DeleteService,
            async { Err(CfConvergeError::Platform(PlatformError::network("down"))) },
        );

        let (description, future) = unit.into_parts();
        assert_eq!(description.to_string(), "service 'db': delete service");

        let error = future.await.unwrap_err();
        assert!(matches!(
            error,
            CfConvergeError::Reconcile(ReconcileError::ApplyFailed { ref name, .. }) if name == "db"
        ));
    }

    #[test]
    fn test_operation_serialization() {
        let operation = Operation::ScaleApplication(ScaleParameters {
            instances: Some(3),
            ..ScaleParameters::default()
        });
        let json = serde_json::to_value(&operation).unwrap();
        assert_eq!(json, serde_json::json!({ "operation": "scaleApplication", "instances": 3 }));
    }
}
