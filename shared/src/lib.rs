//! # Fedra Shared
//! Common functionality shared between the fedra coordination server and
//! federate-side crates: handles, logical time, outbound notifications.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod decode_once;
mod handles;
mod hierarchy;
mod notification;
mod time;

pub use decode_once::DecodeOnce;
pub use handles::{
    AttributeHandle, FederateHandle, InteractionClassHandle, ObjectClassHandle,
    ObjectInstanceHandle,
};
pub use hierarchy::nearest_subscribed_ancestor;
pub use notification::{Notification, Tag};
pub use time::{
    Integer64Interval, Integer64Time, LogicalTime, LogicalTimeInterval, TimeArithmeticError,
};
