use serde::{Deserialize, Serialize};

// FederateHandle

/// Identifies a federate within a single federation execution.
///
/// Handles are plain values compared by value; they carry no interning or
/// lookup machinery and are assigned by the server when a federate joins.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug, Serialize, Deserialize)]
pub struct FederateHandle(u64);

impl FederateHandle {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

// ObjectInstanceHandle

/// Identifies a registered object instance within a federation execution.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ObjectInstanceHandle(u64);

impl ObjectInstanceHandle {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

// AttributeHandle

/// Identifies a class-defined attribute of an object instance.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug, Serialize, Deserialize)]
pub struct AttributeHandle(u32);

impl AttributeHandle {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

// ObjectClassHandle

#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ObjectClassHandle(u32);

impl ObjectClassHandle {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}

// InteractionClassHandle

#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug, Serialize, Deserialize)]
pub struct InteractionClassHandle(u32);

impl InteractionClassHandle {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }
}
