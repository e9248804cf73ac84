use std::sync::Arc;

use fedra_server::ownership::{AttributeDescriptor, ObjectInstance};
use fedra_server::{Federation, Session};
use fedra_shared::{
    AttributeHandle, FederateHandle, Integer64Interval, Integer64Time, ObjectClassHandle,
    ObjectInstanceHandle,
};

use crate::helpers::RecordingSession;

pub fn time(value: i64) -> Integer64Time {
    Integer64Time::new(value)
}

pub fn interval(value: i64) -> Integer64Interval {
    Integer64Interval::new(value)
}

pub fn federates(count: u64) -> Vec<FederateHandle> {
    (1..=count).map(FederateHandle::new).collect()
}

pub fn attrs(handles: &[u32]) -> Vec<AttributeHandle> {
    handles.iter().copied().map(AttributeHandle::new).collect()
}

/// A federation with `RecordingSession`-backed federates, the shared fixture
/// for the scenario and property tests.
pub struct TestFederation {
    pub federation: Federation<Integer64Time>,
    sessions: Vec<(FederateHandle, Arc<RecordingSession>)>,
}

impl TestFederation {
    /// A federation with `count` joined federates, handles 1..=count.
    pub fn with_federates(count: u64) -> Self {
        crate::helpers::init_logger();

        let federation = Federation::new("test-federation");
        let mut sessions = Vec::new();
        for federate in federates(count) {
            let session = Arc::new(RecordingSession::new());
            federation
                .register_federate(
                    federate,
                    Arc::clone(&session) as Arc<dyn Session<Integer64Time>>,
                )
                .unwrap();
            sessions.push((federate, session));
        }

        Self {
            federation,
            sessions,
        }
    }

    pub fn session(&self, federate: FederateHandle) -> &RecordingSession {
        let (_, session) = self
            .sessions
            .iter()
            .find(|(handle, _)| *handle == federate)
            .expect("unknown federate in test fixture");
        session
    }

    /// Drops all recorded notifications, so assertions cover only what the
    /// operation under test sent.
    pub fn clear_notifications(&self) {
        for (_, session) in &self.sessions {
            session.clear();
        }
    }

    /// Registers an object with plain (non-coordinator) attributes, all
    /// published and owned by `owner` when given.
    pub fn register_object(
        &self,
        object: u64,
        attributes: &[u32],
        owner: Option<FederateHandle>,
    ) -> Arc<ObjectInstance<Integer64Time>> {
        let handles = attrs(attributes);
        let descriptors: Vec<AttributeDescriptor> = handles
            .iter()
            .copied()
            .map(AttributeDescriptor::new)
            .collect();

        self.federation
            .create_object(
                ObjectInstanceHandle::new(object),
                ObjectClassHandle::new(1),
                format!("object-{object}"),
                descriptors,
                owner,
                &handles,
            )
            .unwrap()
    }
}
