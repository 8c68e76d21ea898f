//! Test objects: the data artifacts under verification.

use crate::newtype_string::define_newtype_string;
use serde::{Deserialize, Serialize};
use std::fmt;

define_newtype_string! {
    /// Name of a data domain (e.g. `sales`).
    pub struct DomainName;
}

define_newtype_string! {
    /// Name of a table, view, or file-backed dataset inside a domain stage.
    pub struct ObjectName;
}

/// Where a test object lives: domain, stage/project, and instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinates {
    /// Domain the object belongs to
    pub domain: DomainName,

    /// Stage or project (e.g. `raw`, `core`, `mart`)
    pub stage: String,

    /// Instance (e.g. `dev`, `prod`)
    pub instance: String,
}

impl Coordinates {
    /// Create coordinates from their parts
    pub fn new(
        domain: impl Into<String>,
        stage: impl Into<String>,
        instance: impl Into<String>,
    ) -> Self {
        Self {
            domain: DomainName::new(domain),
            stage: stage.into(),
            instance: instance.into(),
        }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.domain, self.stage, self.instance)
    }
}

/// Identifies the data artifact a test case verifies.
///
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TestObject {
    coordinates: Coordinates,
    name: ObjectName,
}

impl TestObject {
    /// Create a test object at the given coordinates
    pub fn new(coordinates: Coordinates, name: impl Into<String>) -> Self {
        Self {
            coordinates,
            name: ObjectName::new(name),
        }
    }

    /// Coordinates of the object
    pub fn coordinates(&self) -> &Coordinates {
        &self.coordinates
    }

    /// Object name
    pub fn name(&self) -> &ObjectName {
        &self.name
    }

    /// Domain shortcut
    pub fn domain(&self) -> &DomainName {
        &self.coordinates.domain
    }
}

impl fmt::Display for TestObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.coordinates, self.name)
    }
}
