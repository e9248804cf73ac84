use thiserror::Error as ThisError;

use fedra_shared::{AttributeHandle, ObjectInstanceHandle};

/// Errors that can occur during attribute ownership operations.
///
/// Stale references (an attribute no longer in the expected state, a resigned
/// federate in a queue) are benign no-ops, not errors; only a handle the
/// object's ledger has never seen is surfaced.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum OwnershipError {
    /// Operation referenced an attribute the object does not carry
    #[error("object {object:?} has no attribute {attribute:?}")]
    UnknownAttribute {
        object: ObjectInstanceHandle,
        attribute: AttributeHandle,
    },
}
