//! # Fedra Server
//! The coordinating server core of a federation execution: logical-time
//! synchronization (GALT computation and advance grants) and attribute
//! ownership transfer, behind a transport-agnostic session seam.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

mod federation;
pub mod ownership;
mod session;
pub mod time;

pub use federation::{Federation, FederationError};
pub use session::{Session, SessionRegistry};
