//! Specifications: typed business expectations attached to a test case.

use crate::schema::TableSchema;
use crate::test_object::TestObject;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Type tag of a specification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecType {
    /// Expected column schema (and primary keys)
    Schema,
    /// SQL returning the expected row count
    RowCount,
    /// Reference SQL whose result the test object must match
    Compare,
}

impl fmt::Display for SpecType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecType::Schema => write!(f, "schema"),
            SpecType::RowCount => write!(f, "rowcount"),
            SpecType::Compare => write!(f, "compare"),
        }
    }
}

/// Expected schema of a test object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaSpecification {
    /// Object the schema belongs to
    pub test_object: TestObject,

    /// Expected columns (platform-native or harmonized types)
    pub columns: TableSchema,

    /// Declared primary key columns, in key order
    #[serde(default)]
    pub primary_keys: Vec<String>,
}

/// A SQL-backed expectation (row-count or compare query)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpecification {
    /// Object the query verifies
    pub test_object: TestObject,

    /// Logical query; object references use `{{ ref("name") }}`
    pub query: String,
}

/// Payload of a specification, by type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpecKind {
    /// Expected schema
    Schema(SchemaSpecification),
    /// Expected row count query
    RowCount(QuerySpecification),
    /// Reference compare query
    Compare(QuerySpecification),
}

/// A typed expectation with its source location and validity flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Specification {
    /// Where the specification was authored (file plus field path)
    pub location: String,

    /// Whether the specification passed authoring-time validation
    pub valid: bool,

    /// Typed payload
    pub kind: SpecKind,
}

impl Specification {
    /// Create a valid specification
    pub fn new(location: impl Into<String>, kind: SpecKind) -> Self {
        Self {
            location: location.into(),
            valid: true,
            kind,
        }
    }

    /// Type tag of this specification
    pub fn spec_type(&self) -> SpecType {
        match self.kind {
            SpecKind::Schema(_) => SpecType::Schema,
            SpecKind::RowCount(_) => SpecType::RowCount,
            SpecKind::Compare(_) => SpecType::Compare,
        }
    }

    /// Schema payload, if this is a schema specification
    pub fn as_schema(&self) -> Option<&SchemaSpecification> {
        match &self.kind {
            SpecKind::Schema(spec) => Some(spec),
            _ => None,
        }
    }

    /// Row-count query, if this is a row-count specification
    pub fn as_rowcount(&self) -> Option<&QuerySpecification> {
        match &self.kind {
            SpecKind::RowCount(spec) => Some(spec),
            _ => None,
        }
    }

    /// Compare query, if this is a compare specification
    pub fn as_compare(&self) -> Option<&QuerySpecification> {
        match &self.kind {
            SpecKind::Compare(spec) => Some(spec),
            _ => None,
        }
    }
}

/// Find the single specification of the given type.
///
/// Returns `None` when there is not exactly one; callers gate on the
/// uniqueness precondition before relying on this.
pub fn find_unique(specs: &[Specification], spec_type: SpecType) -> Option<&Specification> {
    let mut matching = specs.iter().filter(|s| s.spec_type() == spec_type);
    let first = matching.next()?;
    if matching.next().is_some() {
        None
    } else {
        Some(first)
    }
}

/// Count specifications of the given type
pub fn count_of(specs: &[Specification], spec_type: SpecType) -> usize {
    specs.iter().filter(|s| s.spec_type() == spec_type).count()
}
