use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use fedra_shared::{AttributeHandle, FederateHandle, Tag};

/// How a class model declares one attribute of an object instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttributeDescriptor {
    pub handle: AttributeHandle,
    /// Management attributes stay owned by the coordinator itself and never
    /// change hands.
    pub rti_owned: bool,
}

impl AttributeDescriptor {
    pub fn new(handle: AttributeHandle) -> Self {
        Self {
            handle,
            rti_owned: false,
        }
    }

    pub fn rti_owned(handle: AttributeHandle) -> Self {
        Self {
            handle,
            rti_owned: true,
        }
    }
}

/// A completed ownership hand-off: the head of the acquisition queue became
/// the new owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Divestiture {
    pub new_owner: FederateHandle,
    /// The tag the previous owner supplied when it offered to divest.
    pub tag: Option<Tag>,
}

/// Where one acquisition request landed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquisitionDisposition {
    /// The attribute was unowned and transferred immediately
    Acquired,
    /// The acquiree already owns the attribute; nothing to do
    AlreadyOwned,
    /// Management attribute, never transferable
    OwnedByRti,
    /// Queued; the owner has divest-intent and must confirm
    AwaitingDivestitureConfirmation { owner: FederateHandle },
    /// Queued; the owner must be asked to release
    ReleaseRequested { owner: FederateHandle },
}

// AttributeInstance

/// Ownership state of a single attribute of a single object instance:
/// current owner, divest-intent, and the FIFO ordered-unique queue of
/// federates waiting to acquire.
///
/// All methods are pure ledger transitions; notification batching is the
/// owning [`ObjectInstance`](crate::ownership::ObjectInstance)'s concern.
/// Hand-offs are atomic: ownership moves from the old owner to the queue
/// head in one transition, so an unowned gap is never observable.
pub struct AttributeInstance {
    handle: AttributeHandle,
    rti_owned: bool,
    owner: Option<FederateHandle>,
    wants_to_divest: bool,
    divesting_tag: Option<Tag>,
    /// Insertion-ordered and idempotent: a federate queues at most once and
    /// keeps its original position.
    acquisition_queue: IndexSet<FederateHandle>,
}

impl AttributeInstance {
    pub fn new(descriptor: AttributeDescriptor) -> Self {
        Self {
            handle: descriptor.handle,
            rti_owned: descriptor.rti_owned,
            owner: None,
            wants_to_divest: false,
            divesting_tag: None,
            acquisition_queue: IndexSet::new(),
        }
    }

    /// An attribute already owned at creation, e.g. published by the
    /// registering federate.
    pub fn owned(descriptor: AttributeDescriptor, owner: FederateHandle) -> Self {
        let mut attribute = Self::new(descriptor);
        attribute.owner = Some(owner);
        attribute
    }

    pub fn handle(&self) -> AttributeHandle {
        self.handle
    }

    pub fn is_rti_owned(&self) -> bool {
        self.rti_owned
    }

    pub fn owner(&self) -> Option<FederateHandle> {
        self.owner
    }

    pub fn wants_to_divest(&self) -> bool {
        self.wants_to_divest
    }

    pub fn divesting_tag(&self) -> Option<&Tag> {
        self.divesting_tag.as_ref()
    }

    pub fn is_owned_by(&self, federate: FederateHandle) -> bool {
        self.owner == Some(federate)
    }

    fn pop_queue_head(&mut self) -> Option<FederateHandle> {
        let head = self.acquisition_queue.first().copied()?;
        self.acquisition_queue.shift_remove(&head);
        Some(head)
    }

    /// Releases ownership outright. When federates are queued the head takes
    /// over in the same transition; otherwise the attribute becomes unowned.
    /// The stored divesting tag travels with the hand-off.
    pub fn unconditional_divestiture(&mut self) -> Option<Divestiture> {
        self.wants_to_divest = false;
        let tag = self.divesting_tag.take();

        match self.pop_queue_head() {
            Some(new_owner) => {
                self.owner = Some(new_owner);
                Some(Divestiture { new_owner, tag })
            }
            None => {
                self.owner = None;
                None
            }
        }
    }

    /// Flags divest-intent with the offered tag. Returns true when federates
    /// are already queued, i.e. the owner should be asked to confirm now.
    pub fn negotiated_divestiture(&mut self, tag: Option<Tag>) -> bool {
        self.wants_to_divest = true;
        self.divesting_tag = tag;
        !self.acquisition_queue.is_empty()
    }

    /// The owner confirmed a negotiated divestiture; hands off like an
    /// unconditional divestiture.
    pub fn confirm_divestiture(&mut self) -> Option<Divestiture> {
        self.unconditional_divestiture()
    }

    /// Clears divest-intent. The caller has already verified the canceller
    /// still owns the attribute.
    pub fn cancel_negotiated_divestiture(&mut self) {
        self.wants_to_divest = false;
        self.divesting_tag = None;
    }

    /// A plain (queueing) acquisition request.
    pub fn acquisition(&mut self, acquiree: FederateHandle) -> AcquisitionDisposition {
        if self.rti_owned {
            return AcquisitionDisposition::OwnedByRti;
        }

        match self.owner {
            None => {
                self.owner = Some(acquiree);
                self.wants_to_divest = false;
                self.divesting_tag = None;
                AcquisitionDisposition::Acquired
            }
            Some(owner) if owner == acquiree => AcquisitionDisposition::AlreadyOwned,
            Some(owner) => {
                self.acquisition_queue.insert(acquiree);
                if self.wants_to_divest {
                    AcquisitionDisposition::AwaitingDivestitureConfirmation { owner }
                } else {
                    AcquisitionDisposition::ReleaseRequested { owner }
                }
            }
        }
    }

    /// Acquires only when currently unowned; never queues.
    pub fn acquisition_if_available(&mut self, acquiree: FederateHandle) -> AcquisitionDisposition {
        if self.rti_owned {
            return AcquisitionDisposition::OwnedByRti;
        }

        match self.owner {
            None => {
                self.owner = Some(acquiree);
                self.wants_to_divest = false;
                self.divesting_tag = None;
                AcquisitionDisposition::Acquired
            }
            Some(owner) if owner == acquiree => AcquisitionDisposition::AlreadyOwned,
            Some(owner) => AcquisitionDisposition::ReleaseRequested { owner },
        }
    }

    /// Hands off to the queue head if an acquirer is waiting. The call
    /// itself expresses the intent, so no prior negotiated offer is needed.
    pub fn divestiture_if_wanted(&mut self) -> Option<Divestiture> {
        if self.acquisition_queue.is_empty() {
            None
        } else {
            self.unconditional_divestiture()
        }
    }

    /// Removes `acquiree` from the queue; true when it was actually queued.
    pub fn cancel_acquisition(&mut self, acquiree: FederateHandle) -> bool {
        self.acquisition_queue.shift_remove(&acquiree)
    }

    pub fn queued(&self) -> impl Iterator<Item = FederateHandle> + '_ {
        self.acquisition_queue.iter().copied()
    }

    pub(crate) fn snapshot(&self) -> AttributeOwnershipSnapshot {
        AttributeOwnershipSnapshot {
            attribute: self.handle,
            owner: self.owner,
            wants_to_divest: self.wants_to_divest,
            divesting_tag: self.divesting_tag.clone(),
            queue: self.acquisition_queue.iter().copied().collect(),
        }
    }

    pub(crate) fn restore(&mut self, snapshot: AttributeOwnershipSnapshot) {
        self.owner = snapshot.owner;
        self.wants_to_divest = snapshot.wants_to_divest;
        self.divesting_tag = snapshot.divesting_tag;
        self.acquisition_queue = snapshot.queue.into_iter().collect();
    }
}

/// Verbatim persistable image of one attribute's ownership state,
/// queue order included.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeOwnershipSnapshot {
    pub attribute: AttributeHandle,
    pub owner: Option<FederateHandle>,
    pub wants_to_divest: bool,
    pub divesting_tag: Option<Tag>,
    pub queue: Vec<FederateHandle>,
}
