use crate::{AttributeHandle, FederateHandle, ObjectInstanceHandle};

/// A byte-string tag supplied by a federate and carried through to the
/// federates its operation affects.
pub type Tag = Vec<u8>;

/// Outbound callbacks emitted by the coordination server.
///
/// Delivery is fire-and-forget and order-preserving per destination; the
/// server never waits for a federate to consume its queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification<T> {
    // time synchronization

    /// The destination's view of GALT advanced.
    GaltUpdated { galt: T },

    /// GALT became undefined (the last regulating federate withdrew).
    GaltUndefined,

    /// The destination's pending advance request was granted.
    TimeAdvanceGranted { time: T },

    /// Time regulation took effect at the given (possibly adjusted) time.
    TimeRegulationEnabled { time: T },

    /// Time constraint took effect; may be deferred past the request when the
    /// federate's time is ahead of GALT.
    TimeConstrainedEnabled { time: T },

    // attribute ownership

    /// The destination now owns the listed attributes.
    AttributeOwnershipAcquisition {
        object: ObjectInstanceHandle,
        attributes: Vec<AttributeHandle>,
        tag: Option<Tag>,
    },

    /// Another federate wants the listed attributes; the destination owns
    /// them and has not signalled intent to divest.
    RequestAttributeOwnershipRelease {
        object: ObjectInstanceHandle,
        attributes: Vec<AttributeHandle>,
        tag: Option<Tag>,
    },

    /// The destination's negotiated divestiture can complete: another
    /// federate stands ready to take the listed attributes.
    RequestDivestitureConfirmation {
        object: ObjectInstanceHandle,
        attributes: Vec<AttributeHandle>,
    },

    /// An if-available acquisition could not take the listed attributes.
    AttributeOwnershipUnavailable {
        object: ObjectInstanceHandle,
        attributes: Vec<AttributeHandle>,
    },

    /// The destination's queued acquisition requests were withdrawn.
    ConfirmAttributeOwnershipAcquisitionCancellation {
        object: ObjectInstanceHandle,
        attributes: Vec<AttributeHandle>,
    },

    /// Ownership query reply: the attribute is owned by the given federate.
    InformAttributeOwnership {
        object: ObjectInstanceHandle,
        attribute: AttributeHandle,
        owner: FederateHandle,
    },

    /// Ownership query reply: nobody owns the attribute.
    AttributeIsNotOwned {
        object: ObjectInstanceHandle,
        attribute: AttributeHandle,
    },

    /// Ownership query reply: the attribute is a management attribute owned
    /// by the coordination server itself.
    AttributeIsOwnedByRti {
        object: ObjectInstanceHandle,
        attribute: AttributeHandle,
    },
}
