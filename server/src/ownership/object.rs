use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use log::{debug, trace};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use fedra_shared::{
    AttributeHandle, FederateHandle, LogicalTime, Notification, ObjectClassHandle,
    ObjectInstanceHandle, Tag,
};

use crate::ownership::attribute::{
    AcquisitionDisposition, AttributeDescriptor, AttributeInstance, AttributeOwnershipSnapshot,
    Divestiture,
};
use crate::ownership::error::OwnershipError;
use crate::session::SessionRegistry;

/// Verbatim persistable image of one object's attribute ownership, attributes
/// sorted by handle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectOwnershipSnapshot {
    pub object: ObjectInstanceHandle,
    pub attributes: Vec<AttributeOwnershipSnapshot>,
}

// ObjectInstance

/// One registered object instance and its attribute ownership ledger.
///
/// The ledger lock is object-granular and held for the whole
/// compute-and-notify sequence, so each multi-attribute operation batches its
/// notifications from one consistent snapshot and every federate observes one
/// total order of ownership notifications per object. Per-attribute locking
/// would break that batching contract.
pub struct ObjectInstance<T: LogicalTime> {
    handle: ObjectInstanceHandle,
    class: ObjectClassHandle,
    name: String,
    sessions: Arc<SessionRegistry<T>>,
    attributes: Mutex<HashMap<AttributeHandle, AttributeInstance>>,
}

impl<T: LogicalTime> ObjectInstance<T> {
    /// Registers an object instance. `owner` (typically the registering
    /// federate) starts out owning the attributes listed in `published`;
    /// coordinator-owned attributes ignore it.
    pub fn new(
        handle: ObjectInstanceHandle,
        class: ObjectClassHandle,
        name: String,
        descriptors: impl IntoIterator<Item = AttributeDescriptor>,
        owner: Option<FederateHandle>,
        published: &[AttributeHandle],
        sessions: Arc<SessionRegistry<T>>,
    ) -> Self {
        let mut attributes = HashMap::new();
        for descriptor in descriptors {
            let attribute = match owner {
                Some(owner) if !descriptor.rti_owned && published.contains(&descriptor.handle) => {
                    AttributeInstance::owned(descriptor, owner)
                }
                _ => AttributeInstance::new(descriptor),
            };
            attributes.insert(attribute.handle(), attribute);
        }

        Self {
            handle,
            class,
            name,
            sessions,
            attributes: Mutex::new(attributes),
        }
    }

    pub fn handle(&self) -> ObjectInstanceHandle {
        self.handle
    }

    pub fn class(&self) -> ObjectClassHandle {
        self.class
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner_of(&self, attribute: AttributeHandle) -> Option<FederateHandle> {
        self.attributes
            .lock()
            .get(&attribute)
            .and_then(AttributeInstance::owner)
    }

    // divestiture

    /// Releases the given attributes outright; queued acquirers take over
    /// FIFO and receive one batched acquisition notification each.
    pub fn unconditional_divestiture(
        &self,
        owner: FederateHandle,
        attributes: &[AttributeHandle],
    ) -> Result<(), OwnershipError> {
        let mut ledger = self.attributes.lock();
        self.validate_attributes(&ledger, attributes)?;

        let mut acquisitions: BTreeMap<(FederateHandle, Option<Tag>), Vec<AttributeHandle>> =
            BTreeMap::new();
        for &handle in attributes {
            if let Some(attribute) = ledger.get_mut(&handle) {
                if !attribute.is_owned_by(owner) {
                    trace!(
                        "federate {:?} divested attribute {:?} of object {:?} it does not own",
                        owner,
                        handle,
                        self.handle
                    );
                    continue;
                }
                if let Some(Divestiture { new_owner, tag }) = attribute.unconditional_divestiture()
                {
                    acquisitions.entry((new_owner, tag)).or_default().push(handle);
                }
            }
        }

        self.send_acquisitions(acquisitions);
        Ok(())
    }

    /// Flags divest-intent on the given attributes. The owner is asked to
    /// confirm right away for the subset that already has waiting acquirers;
    /// the rest stays owned with the intent recorded for future acquirers.
    pub fn negotiated_divestiture(
        &self,
        owner: FederateHandle,
        attributes: &[AttributeHandle],
        tag: Option<Tag>,
    ) -> Result<(), OwnershipError> {
        let mut ledger = self.attributes.lock();
        self.validate_attributes(&ledger, attributes)?;

        let mut awaiting_confirmation = Vec::new();
        for &handle in attributes {
            if let Some(attribute) = ledger.get_mut(&handle) {
                if !attribute.is_owned_by(owner) {
                    trace!(
                        "federate {:?} offered to divest attribute {:?} of object {:?} it does not own",
                        owner,
                        handle,
                        self.handle
                    );
                    continue;
                }
                if attribute.negotiated_divestiture(tag.clone()) {
                    awaiting_confirmation.push(handle);
                }
            }
        }

        if !awaiting_confirmation.is_empty() {
            self.sessions.send(
                &owner,
                Notification::RequestDivestitureConfirmation {
                    object: self.handle,
                    attributes: awaiting_confirmation,
                },
            );
        }
        Ok(())
    }

    /// The owner confirmed a negotiated divestiture; hands off the confirmed
    /// subset like an unconditional divestiture. Attributes without
    /// divest-intent are stale confirmations and skip.
    pub fn confirm_divestiture(
        &self,
        owner: FederateHandle,
        attributes: &[AttributeHandle],
    ) -> Result<(), OwnershipError> {
        let mut ledger = self.attributes.lock();
        self.validate_attributes(&ledger, attributes)?;

        let mut acquisitions: BTreeMap<(FederateHandle, Option<Tag>), Vec<AttributeHandle>> =
            BTreeMap::new();
        for &handle in attributes {
            if let Some(attribute) = ledger.get_mut(&handle) {
                if !attribute.is_owned_by(owner) || !attribute.wants_to_divest() {
                    trace!(
                        "federate {:?} confirmed a divestiture of attribute {:?} of object {:?} that is not pending",
                        owner,
                        handle,
                        self.handle
                    );
                    continue;
                }
                if let Some(Divestiture { new_owner, tag }) = attribute.confirm_divestiture() {
                    acquisitions.entry((new_owner, tag)).or_default().push(handle);
                }
            }
        }

        self.send_acquisitions(acquisitions);
        Ok(())
    }

    /// Hands off every requested attribute that has a waiting acquirer; the
    /// call itself expresses the intent. Returns the attribute-to-divestiture
    /// map (new owner and offered tag) alongside sending the batched
    /// acquisition notifications.
    pub fn divestiture_if_wanted(
        &self,
        owner: FederateHandle,
        attributes: &[AttributeHandle],
    ) -> Result<BTreeMap<AttributeHandle, Divestiture>, OwnershipError> {
        let mut ledger = self.attributes.lock();
        self.validate_attributes(&ledger, attributes)?;

        let mut divested = BTreeMap::new();
        let mut acquisitions: BTreeMap<(FederateHandle, Option<Tag>), Vec<AttributeHandle>> =
            BTreeMap::new();
        for &handle in attributes {
            if let Some(attribute) = ledger.get_mut(&handle) {
                if !attribute.is_owned_by(owner) {
                    continue;
                }
                if let Some(divestiture) = attribute.divestiture_if_wanted() {
                    acquisitions
                        .entry((divestiture.new_owner, divestiture.tag.clone()))
                        .or_default()
                        .push(handle);
                    divested.insert(handle, divestiture);
                }
            }
        }

        self.send_acquisitions(acquisitions);
        Ok(divested)
    }

    /// Clears divest-intent where `owner` still holds the attribute; a stale
    /// cancel racing a completed divestiture skips silently.
    pub fn cancel_negotiated_divestiture(
        &self,
        owner: FederateHandle,
        attributes: &[AttributeHandle],
    ) {
        let mut ledger = self.attributes.lock();
        for &handle in attributes {
            if let Some(attribute) = ledger.get_mut(&handle) {
                if attribute.is_owned_by(owner) && attribute.wants_to_divest() {
                    attribute.cancel_negotiated_divestiture();
                } else {
                    trace!(
                        "federate {:?} cancelled a divestiture of attribute {:?} of object {:?} that is not pending",
                        owner,
                        handle,
                        self.handle
                    );
                }
            }
        }
    }

    // acquisition

    /// A queueing acquisition request. Unowned attributes transfer
    /// immediately; for the rest the acquiree queues FIFO and the current
    /// owner is prompted once per disposition to release or to confirm a
    /// flagged divestiture.
    pub fn acquisition(
        &self,
        acquiree: FederateHandle,
        attributes: &[AttributeHandle],
        tag: Option<Tag>,
    ) -> Result<(), OwnershipError> {
        let mut ledger = self.attributes.lock();
        self.validate_attributes(&ledger, attributes)?;

        let mut acquired = Vec::new();
        let mut release: BTreeMap<FederateHandle, Vec<AttributeHandle>> = BTreeMap::new();
        let mut confirm: BTreeMap<FederateHandle, Vec<AttributeHandle>> = BTreeMap::new();
        for &handle in attributes {
            if let Some(attribute) = ledger.get_mut(&handle) {
                match attribute.acquisition(acquiree) {
                    AcquisitionDisposition::Acquired => acquired.push(handle),
                    AcquisitionDisposition::AlreadyOwned => {}
                    AcquisitionDisposition::OwnedByRti => {
                        debug!(
                            "federate {:?} requested coordinator-owned attribute {:?} of object {:?}",
                            acquiree, handle, self.handle
                        );
                    }
                    AcquisitionDisposition::AwaitingDivestitureConfirmation { owner } => {
                        confirm.entry(owner).or_default().push(handle);
                    }
                    AcquisitionDisposition::ReleaseRequested { owner } => {
                        release.entry(owner).or_default().push(handle);
                    }
                }
            }
        }

        if !acquired.is_empty() {
            self.sessions.send(
                &acquiree,
                Notification::AttributeOwnershipAcquisition {
                    object: self.handle,
                    attributes: acquired,
                    tag: tag.clone(),
                },
            );
        }
        for (owner, attributes) in confirm {
            self.sessions.send(
                &owner,
                Notification::RequestDivestitureConfirmation {
                    object: self.handle,
                    attributes,
                },
            );
        }
        for (owner, attributes) in release {
            self.sessions.send(
                &owner,
                Notification::RequestAttributeOwnershipRelease {
                    object: self.handle,
                    attributes,
                    tag: tag.clone(),
                },
            );
        }
        Ok(())
    }

    /// Acquires only currently-unowned attributes; the remainder is reported
    /// unavailable and nothing queues. Attributes the acquiree already owns
    /// are skipped without any notification.
    pub fn acquisition_if_available(
        &self,
        acquiree: FederateHandle,
        attributes: &[AttributeHandle],
    ) -> Result<(), OwnershipError> {
        let mut ledger = self.attributes.lock();
        self.validate_attributes(&ledger, attributes)?;

        let mut acquired = Vec::new();
        let mut unavailable = Vec::new();
        for &handle in attributes {
            if let Some(attribute) = ledger.get_mut(&handle) {
                match attribute.acquisition_if_available(acquiree) {
                    AcquisitionDisposition::Acquired => acquired.push(handle),
                    AcquisitionDisposition::AlreadyOwned => {}
                    AcquisitionDisposition::OwnedByRti
                    | AcquisitionDisposition::ReleaseRequested { .. } => {
                        unavailable.push(handle);
                    }
                    AcquisitionDisposition::AwaitingDivestitureConfirmation { .. } => {
                        unavailable.push(handle);
                    }
                }
            }
        }

        if !acquired.is_empty() {
            self.sessions.send(
                &acquiree,
                Notification::AttributeOwnershipAcquisition {
                    object: self.handle,
                    attributes: acquired,
                    tag: None,
                },
            );
        }
        if !unavailable.is_empty() {
            self.sessions.send(
                &acquiree,
                Notification::AttributeOwnershipUnavailable {
                    object: self.handle,
                    attributes: unavailable,
                },
            );
        }
        Ok(())
    }

    /// Withdraws pending acquisition requests; cancellation is confirmed only
    /// for attributes the acquiree was actually queued on. Unknown handles
    /// are stale and skip.
    pub fn cancel_acquisition(&self, acquiree: FederateHandle, attributes: &[AttributeHandle]) {
        let mut ledger = self.attributes.lock();

        let mut cancelled = Vec::new();
        for &handle in attributes {
            match ledger.get_mut(&handle) {
                Some(attribute) => {
                    if attribute.cancel_acquisition(acquiree) {
                        cancelled.push(handle);
                    }
                }
                None => {
                    trace!(
                        "federate {:?} cancelled acquisition of unknown attribute {:?} of object {:?}",
                        acquiree,
                        handle,
                        self.handle
                    );
                }
            }
        }

        if !cancelled.is_empty() {
            self.sessions.send(
                &acquiree,
                Notification::ConfirmAttributeOwnershipAcquisitionCancellation {
                    object: self.handle,
                    attributes: cancelled,
                },
            );
        }
    }

    // queries

    /// Replies to `requester` with the attribute's current ownership.
    pub fn query_ownership(
        &self,
        requester: FederateHandle,
        attribute: AttributeHandle,
    ) -> Result<(), OwnershipError> {
        let ledger = self.attributes.lock();
        let entry = ledger
            .get(&attribute)
            .ok_or(OwnershipError::UnknownAttribute {
                object: self.handle,
                attribute,
            })?;

        let notification = if entry.is_rti_owned() {
            Notification::AttributeIsOwnedByRti {
                object: self.handle,
                attribute,
            }
        } else {
            match entry.owner() {
                Some(owner) => Notification::InformAttributeOwnership {
                    object: self.handle,
                    attribute,
                    owner,
                },
                None => Notification::AttributeIsNotOwned {
                    object: self.handle,
                    attribute,
                },
            }
        };
        self.sessions.send(&requester, notification);
        Ok(())
    }

    // save/restore accessors

    pub fn snapshot(&self) -> ObjectOwnershipSnapshot {
        let ledger = self.attributes.lock();

        let mut attributes: Vec<AttributeOwnershipSnapshot> =
            ledger.values().map(AttributeInstance::snapshot).collect();
        attributes.sort_by_key(|snapshot| snapshot.attribute);

        ObjectOwnershipSnapshot {
            object: self.handle,
            attributes,
        }
    }

    /// Restores attribute ownership verbatim, queue order included. Snapshot
    /// entries for attributes this object does not carry are skipped.
    pub fn restore(&self, snapshot: ObjectOwnershipSnapshot) {
        let mut ledger = self.attributes.lock();
        for entry in snapshot.attributes {
            match ledger.get_mut(&entry.attribute) {
                Some(attribute) => attribute.restore(entry),
                None => debug!(
                    "snapshot for object {:?} names unknown attribute {:?}",
                    self.handle, entry.attribute
                ),
            }
        }
    }

    fn validate_attributes(
        &self,
        ledger: &HashMap<AttributeHandle, AttributeInstance>,
        attributes: &[AttributeHandle],
    ) -> Result<(), OwnershipError> {
        for &attribute in attributes {
            if !ledger.contains_key(&attribute) {
                return Err(OwnershipError::UnknownAttribute {
                    object: self.handle,
                    attribute,
                });
            }
        }
        Ok(())
    }

    fn send_acquisitions(&self, acquisitions: BTreeMap<(FederateHandle, Option<Tag>), Vec<AttributeHandle>>) {
        for ((federate, tag), attributes) in acquisitions {
            self.sessions.send(
                &federate,
                Notification::AttributeOwnershipAcquisition {
                    object: self.handle,
                    attributes,
                    tag,
                },
            );
        }
    }
}
