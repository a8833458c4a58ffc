//! # Domain errors
//!
//! Business rule violations. The service layer maps them to HTTP statuses:
//!
//! | Variant | HTTP status |
//! |---------|-------------|
//! | `Validation` | 400 Bad Request |
//! | `NotFound` | 404 Not Found |
//! | `InvalidStateTransition` | 409 Conflict |

use thiserror::Error;

/// Errors raised by domain logic
#[derive(Debug, Error)]
pub enum DomainError {
    /// Input does not satisfy a business rule (malformed id, unknown status...)
    #[error("validation error: {0}")]
    Validation(String),

    /// The entity does not exist
    #[error("{entity_type} not found: {id}")]
    NotFound {
        /// Entity name ("BillRun", "ReviewLicence"...)
        entity_type: &'static str,
        id:          String,
    },

    /// The entity's current state does not allow the operation
    #[error("cannot {action} {entity_type} {id} in status {status}")]
    InvalidStateTransition {
        entity_type: &'static str,
        id:          String,
        status:      String,
        action:      &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_entity_and_id() {
        let error = DomainError::NotFound {
            entity_type: "BillRun",
            id:          "b1".to_string(),
        };

        assert_eq!(error.to_string(), "BillRun not found: b1");
    }

    #[test]
    fn test_invalid_state_transition_message() {
        let error = DomainError::InvalidStateTransition {
            entity_type: "BillRun",
            id:          "b1".to_string(),
            status:      "sent".to_string(),
            action:      "cancel",
        };

        assert_eq!(error.to_string(), "cannot cancel BillRun b1 in status sent");
    }
}
