//! Constructor methods and classification helpers for CpiError

use super::types::CpiError;

impl CpiError {
    /// Create a configuration error with component and message
    ///
    /// # Examples
    /// ```rust
    /// use vsphere_cpi_core::error::CpiError;
    ///
    /// let err = CpiError::configuration("nodes.internal_subnets", "invalid CIDR");
    /// assert!(err.to_string().contains("nodes.internal_subnets"));
    /// ```
    pub fn configuration(component: impl Into<String>, message: impl Into<String>) -> Self {
        CpiError::ConfigurationError {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a validation error for malformed input
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        CpiError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        CpiError::NotFound {
            resource: resource.into(),
        }
    }

    /// Not-found signal returned by VM locators
    pub fn vm_not_found(tenant: impl Into<String>, identifier: impl Into<String>) -> Self {
        CpiError::VmNotFound {
            tenant: tenant.into(),
            identifier: identifier.into(),
        }
    }

    /// Wrap a failure reported by an external collaborator
    pub fn collaborator<E: std::error::Error + Send + Sync + 'static>(
        tenant: impl Into<String>,
        operation: impl Into<String>,
        source: E,
    ) -> Self {
        CpiError::Collaborator {
            tenant: tenant.into(),
            operation: operation.into(),
            source: Box::new(source),
        }
    }

    /// Create a Serialization error with a boxed source
    pub fn serialization<E: std::error::Error + Send + Sync + 'static>(
        operation: impl Into<String>,
        source: E,
    ) -> Self {
        CpiError::Serialization {
            operation: operation.into(),
            source: Box::new(source),
        }
    }

    pub fn timeout(operation: impl Into<String>, duration: std::time::Duration) -> Self {
        CpiError::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        CpiError::Internal {
            message: message.into(),
        }
    }

    /// Whether this error means "the identifier does not resolve".
    ///
    /// Search strategies fall through to the next strategy only on these.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CpiError::NotFound { .. } | CpiError::VmNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_classification() {
        assert!(CpiError::not_found("node-1").is_not_found());
        assert!(CpiError::vm_not_found("vc1", "node-1").is_not_found());
        assert!(!CpiError::validation("uuid", "too short").is_not_found());
        assert!(!CpiError::collaborator(
            "vc1",
            "find VM by UUID",
            std::io::Error::new(std::io::ErrorKind::Other, "session expired"),
        )
        .is_not_found());
    }

    #[test]
    fn test_collaborator_error_keeps_source() {
        let err = CpiError::collaborator(
            "vc1",
            "list tags",
            std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset"),
        );
        let source = std::error::Error::source(&err).map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("reset"));
        assert_eq!(err.to_string(), "list tags failed against tenant vc1");
    }
}
