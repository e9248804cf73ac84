//! Attribute ownership transfer: divestiture, acquisition, and the
//! per-attribute FIFO queues of waiting acquirers.

mod attribute;
mod error;
mod object;

pub use attribute::{
    AcquisitionDisposition, AttributeDescriptor, AttributeInstance, AttributeOwnershipSnapshot,
    Divestiture,
};
pub use error::OwnershipError;
pub use object::{ObjectInstance, ObjectOwnershipSnapshot};
