//! Error types for the declarative crate

use thiserror::Error;

/// Errors that can occur while declaring, planning or applying a stack
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed resource declaration
    #[error("invalid resource '{name}': {reason}")]
    Validation { name: String, reason: String },

    /// A resource or export with this name is already declared
    #[error("duplicate name: {0}")]
    DuplicateName(String),

    /// A reference points at a resource that is not in the graph
    #[error("'{from}' references unknown resource '{target}'")]
    UnknownReference { from: String, target: String },

    /// Following references leads back to the starting resource
    #[error("cyclic dependency: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    /// The provider failed to create a resource
    #[error("failed to apply '{resource}': {cause}")]
    Apply {
        resource: String,
        #[source]
        cause: anyhow::Error,
    },

    /// An applied resource did not return the requested output
    #[error("'{resource}' has no output '{output}'")]
    MissingOutput { resource: String, output: String },

    /// Outputs were requested before the resource was applied
    #[error("resource '{0}' has not been applied")]
    NotApplied(String),

    /// No resource with this name exists
    #[error("unknown resource: {0}")]
    UnknownResource(String),

    /// Operation not allowed in the stack's current state
    #[error("'{name}' is {state}, expected {expected}")]
    InvalidState {
        name: String,
        state: String,
        expected: String,
    },
}

impl Error {
    pub fn validation(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn apply(resource: impl Into<String>, cause: anyhow::Error) -> Self {
        Self::Apply {
            resource: resource.into(),
            cause,
        }
    }

    /// Whether this error was raised before any provider call
    ///
    /// Configuration mistakes never leave partial side effects.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::DuplicateName(_)
                | Self::UnknownReference { .. }
                | Self::CyclicDependency { .. }
        )
    }
}

/// Result type for declarative operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_display() {
        let err = Error::CyclicDependency {
            cycle: vec!["A".into(), "B".into(), "A".into()],
        };
        assert_eq!(err.to_string(), "cyclic dependency: A -> B -> A");
    }

    #[test]
    fn test_apply_error_keeps_source() {
        let err = Error::apply("Pipeline", anyhow::anyhow!("throttled"));
        assert!(err.to_string().contains("Pipeline"));
        assert!(err.to_string().contains("throttled"));
        assert!(std::error::Error::source(&err).is_some());
        assert!(!err.is_configuration_error());
    }

    #[test]
    fn test_configuration_errors() {
        assert!(Error::DuplicateName("A".into()).is_configuration_error());
        assert!(
            Error::UnknownReference {
                from: "A".into(),
                target: "B".into()
            }
            .is_configuration_error()
        );
        assert!(!Error::NotApplied("A".into()).is_configuration_error());
        assert!(
            !Error::MissingOutput {
                resource: "Repo".into(),
                output: "arn".into()
            }
            .is_configuration_error()
        );
    }
}
