//! Federation time synchronization: per-federate clocks and pending advance
//! requests, GALT computation and propagation, advance grants.

mod engine;
mod error;
mod federate;

pub use engine::{TimeManagerSnapshot, TimeSynchronizationEngine};
pub use error::TimeError;
pub use federate::{AdvanceRequestKind, FederateTimeState};
