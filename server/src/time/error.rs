use thiserror::Error as ThisError;

use fedra_shared::{FederateHandle, TimeArithmeticError};

/// Errors that can occur during time synchronization operations.
///
/// Every variant aborts only the triggering transition; validation happens
/// before any engine state is mutated, so a failed request never leaves the
/// federation's time state corrupted.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum TimeError {
    /// Interval arithmetic overflowed or produced an out-of-range time
    #[error("invalid time arithmetic: {0}")]
    InvalidTimeArithmetic(#[from] TimeArithmeticError),

    /// Lookahead must be a positive interval
    #[error("lookahead must be a positive interval")]
    InvalidLookahead,

    /// Federate attempted to register with the time engine twice
    #[error("federate {federate:?} is already registered with the time engine")]
    FederateAlreadyRegistered { federate: FederateHandle },

    /// Operation referenced a federate the time engine does not know
    #[error("federate {federate:?} is not registered with the time engine")]
    UnknownFederate { federate: FederateHandle },

    /// Time regulation was disabled while not enabled
    #[error("federate {federate:?} is not time regulating")]
    NotRegulating { federate: FederateHandle },

    /// Time regulation was enabled while already enabled
    #[error("federate {federate:?} is already time regulating")]
    AlreadyRegulating { federate: FederateHandle },

    /// Time constraint was disabled while not enabled
    #[error("federate {federate:?} is not time constrained")]
    NotConstrained { federate: FederateHandle },
}
