//! Error handling for the setkit library
//!
//! Containers report failures through a single status taxonomy. The same
//! enum doubles as the sticky status a container carries between calls, so
//! it is deliberately small and `Copy`.

use thiserror::Error;

/// Main error type for the setkit library.
///
/// Mutating container operations return `Result<_, SetKitError>`; the same
/// values are stored as the container status reported by `status()`.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetKitError {
    /// The container has not been created yet (or was destroyed).
    #[error("container is not initialized")]
    NotInitialized,

    /// `create` was called twice without an intervening `destroy`.
    #[error("container was already initialized")]
    DoubleInitialized,

    /// Rejected configuration or argument, e.g. a hash-null key.
    #[error("invalid arguments")]
    InvalidArguments,

    /// Buffer allocation failed, or a fixed buffer ran out of room.
    #[error("could not allocate table storage")]
    CouldNotAlloc,

    /// The requested key or key-value pair is not in the container.
    #[error("key not found")]
    NotFound,
}

impl SetKitError {
    /// Get the error category for logging/metrics.
    pub fn category(&self) -> &'static str {
        match self {
            Self::NotInitialized => "lifecycle",
            Self::DoubleInitialized => "lifecycle",
            Self::InvalidArguments => "config",
            Self::CouldNotAlloc => "memory",
            Self::NotFound => "domain",
        }
    }

    /// Check if this is a recoverable error.
    ///
    /// Domain and resource errors leave the container valid and usable;
    /// lifecycle and configuration errors are sticky until `destroy`.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::NotFound => true,
            Self::CouldNotAlloc => true,
            Self::InvalidArguments => true,
            Self::NotInitialized => false,
            Self::DoubleInitialized => false,
        }
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, SetKitError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(SetKitError::NotInitialized.category(), "lifecycle");
        assert_eq!(SetKitError::InvalidArguments.category(), "config");
        assert_eq!(SetKitError::CouldNotAlloc.category(), "memory");
        assert_eq!(SetKitError::NotFound.category(), "domain");
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(SetKitError::NotFound.is_recoverable());
        assert!(SetKitError::CouldNotAlloc.is_recoverable());
        assert!(!SetKitError::NotInitialized.is_recoverable());
        assert!(!SetKitError::DoubleInitialized.is_recoverable());
    }

    #[test]
    fn test_error_display() {
        let display = format!("{}", SetKitError::CouldNotAlloc);
        assert!(display.contains("allocate"));

        let display = format!("{}", SetKitError::NotFound);
        assert!(display.contains("not found"));
    }
}
