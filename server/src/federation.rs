use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};
use parking_lot::RwLock;
use thiserror::Error as ThisError;

use fedra_shared::{
    AttributeHandle, FederateHandle, LogicalTime, ObjectClassHandle, ObjectInstanceHandle, Tag,
};

use crate::ownership::{
    AttributeDescriptor, ObjectInstance, ObjectOwnershipSnapshot, OwnershipError,
};
use crate::session::{Session, SessionRegistry};
use crate::time::{TimeError, TimeManagerSnapshot, TimeSynchronizationEngine};

/// Errors surfaced by federation-level dispatch.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum FederationError {
    #[error(transparent)]
    Time(#[from] TimeError),

    #[error(transparent)]
    Ownership(#[from] OwnershipError),

    /// A federate joined under a handle that is already joined
    #[error("federate {federate:?} has already joined")]
    FederateAlreadyJoined { federate: FederateHandle },

    /// Operation referenced a federate that never joined or already resigned
    #[error("federate {federate:?} has not joined")]
    UnknownFederate { federate: FederateHandle },

    /// An object was registered under a handle that is already registered
    #[error("object {object:?} is already registered")]
    ObjectAlreadyRegistered { object: ObjectInstanceHandle },
}

// Federation

/// One federation execution: the federate roster, its time synchronization
/// engine, and the registered object instances.
///
/// Ownership operations aimed at an object that no longer exists are stale
/// requests racing a deletion and skip silently; the sender already observes
/// the deletion through its own notification stream.
pub struct Federation<T: LogicalTime> {
    name: String,
    sessions: Arc<SessionRegistry<T>>,
    time: TimeSynchronizationEngine<T>,
    objects: RwLock<HashMap<ObjectInstanceHandle, Arc<ObjectInstance<T>>>>,
}

impl<T: LogicalTime> Federation<T> {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();

        info!("federation created: {}", name);

        Self {
            name,
            sessions: Arc::new(SessionRegistry::new()),
            time: TimeSynchronizationEngine::new(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn time(&self) -> &TimeSynchronizationEngine<T> {
        &self.time
    }

    // federate lifecycle

    /// Joins a federate: registers its outbound session and creates its time
    /// state at the initial time.
    pub fn register_federate(
        &self,
        federate: FederateHandle,
        session: Arc<dyn Session<T>>,
    ) -> Result<(), FederationError> {
        if self.sessions.contains(&federate) {
            return Err(FederationError::FederateAlreadyJoined { federate });
        }

        self.sessions.insert(federate, Arc::clone(&session));
        self.time.register_federate(federate, session)?;

        info!("federate {:?} joined federation {}", federate, self.name);
        Ok(())
    }

    /// Resigns a federate: destroys its time state (rebalancing GALT if it
    /// was regulating) and drops its session. Attributes it owns stay owned
    /// by the departed handle until divested by a housekeeping pass.
    pub fn resign_federate(&self, federate: FederateHandle) -> Result<(), FederationError> {
        if !self.sessions.contains(&federate) {
            return Err(FederationError::UnknownFederate { federate });
        }

        self.time.resign_federate(federate)?;
        self.sessions.remove(&federate);

        info!("federate {:?} resigned from federation {}", federate, self.name);
        Ok(())
    }

    // object lifecycle

    /// Registers an object instance; `owner` starts out owning the
    /// `published` attributes.
    pub fn create_object(
        &self,
        object: ObjectInstanceHandle,
        class: ObjectClassHandle,
        name: impl Into<String>,
        descriptors: impl IntoIterator<Item = AttributeDescriptor>,
        owner: Option<FederateHandle>,
        published: &[AttributeHandle],
    ) -> Result<Arc<ObjectInstance<T>>, FederationError> {
        let mut objects = self.objects.write();
        if objects.contains_key(&object) {
            return Err(FederationError::ObjectAlreadyRegistered { object });
        }

        let instance = Arc::new(ObjectInstance::new(
            object,
            class,
            name.into(),
            descriptors,
            owner,
            published,
            Arc::clone(&self.sessions),
        ));
        objects.insert(object, Arc::clone(&instance));

        debug!("object {:?} registered in federation {}", object, self.name);
        Ok(instance)
    }

    pub fn delete_object(&self, object: ObjectInstanceHandle) -> Option<Arc<ObjectInstance<T>>> {
        let removed = self.objects.write().remove(&object);
        if removed.is_some() {
            debug!("object {:?} deleted from federation {}", object, self.name);
        }
        removed
    }

    pub fn object(&self, object: ObjectInstanceHandle) -> Option<Arc<ObjectInstance<T>>> {
        self.objects.read().get(&object).cloned()
    }

    // ownership dispatch

    pub fn unconditional_divestiture(
        &self,
        owner: FederateHandle,
        object: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
    ) -> Result<(), FederationError> {
        match self.object(object) {
            Some(instance) => Ok(instance.unconditional_divestiture(owner, attributes)?),
            None => Ok(self.stale_object(object)),
        }
    }

    pub fn negotiated_divestiture(
        &self,
        owner: FederateHandle,
        object: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
        tag: Option<Tag>,
    ) -> Result<(), FederationError> {
        match self.object(object) {
            Some(instance) => Ok(instance.negotiated_divestiture(owner, attributes, tag)?),
            None => Ok(self.stale_object(object)),
        }
    }

    pub fn confirm_divestiture(
        &self,
        owner: FederateHandle,
        object: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
    ) -> Result<(), FederationError> {
        match self.object(object) {
            Some(instance) => Ok(instance.confirm_divestiture(owner, attributes)?),
            None => Ok(self.stale_object(object)),
        }
    }

    pub fn acquisition(
        &self,
        acquiree: FederateHandle,
        object: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
        tag: Option<Tag>,
    ) -> Result<(), FederationError> {
        match self.object(object) {
            Some(instance) => Ok(instance.acquisition(acquiree, attributes, tag)?),
            None => Ok(self.stale_object(object)),
        }
    }

    pub fn acquisition_if_available(
        &self,
        acquiree: FederateHandle,
        object: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
    ) -> Result<(), FederationError> {
        match self.object(object) {
            Some(instance) => Ok(instance.acquisition_if_available(acquiree, attributes)?),
            None => Ok(self.stale_object(object)),
        }
    }

    pub fn divestiture_if_wanted(
        &self,
        owner: FederateHandle,
        object: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
    ) -> Result<(), FederationError> {
        match self.object(object) {
            Some(instance) => {
                instance.divestiture_if_wanted(owner, attributes)?;
                Ok(())
            }
            None => Ok(self.stale_object(object)),
        }
    }

    pub fn cancel_acquisition(
        &self,
        acquiree: FederateHandle,
        object: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
    ) {
        match self.object(object) {
            Some(instance) => instance.cancel_acquisition(acquiree, attributes),
            None => self.stale_object(object),
        }
    }

    pub fn cancel_negotiated_divestiture(
        &self,
        owner: FederateHandle,
        object: ObjectInstanceHandle,
        attributes: &[AttributeHandle],
    ) {
        match self.object(object) {
            Some(instance) => instance.cancel_negotiated_divestiture(owner, attributes),
            None => self.stale_object(object),
        }
    }

    pub fn query_ownership(
        &self,
        requester: FederateHandle,
        object: ObjectInstanceHandle,
        attribute: AttributeHandle,
    ) -> Result<(), FederationError> {
        match self.object(object) {
            Some(instance) => Ok(instance.query_ownership(requester, attribute)?),
            None => Ok(self.stale_object(object)),
        }
    }

    // save/restore accessors

    pub fn time_snapshot(&self) -> TimeManagerSnapshot<T> {
        self.time.snapshot()
    }

    pub fn restore_time(&self, snapshot: TimeManagerSnapshot<T>) {
        self.time.restore(snapshot);
    }

    /// Ownership snapshots for every registered object, sorted by object
    /// handle.
    pub fn ownership_snapshots(&self) -> Vec<ObjectOwnershipSnapshot> {
        let objects = self.objects.read();

        let mut snapshots: Vec<ObjectOwnershipSnapshot> =
            objects.values().map(|object| object.snapshot()).collect();
        snapshots.sort_by_key(|snapshot| snapshot.object);
        snapshots
    }

    pub fn restore_ownership(&self, snapshots: Vec<ObjectOwnershipSnapshot>) {
        let objects = self.objects.read();
        for snapshot in snapshots {
            match objects.get(&snapshot.object) {
                Some(object) => object.restore(snapshot),
                None => debug!(
                    "ownership snapshot names unknown object {:?} in federation {}",
                    snapshot.object, self.name
                ),
            }
        }
    }

    fn stale_object(&self, object: ObjectInstanceHandle) {
        debug!(
            "operation on unknown object {:?} in federation {}, likely racing a deletion",
            object, self.name
        );
    }
}
