//! Test kinds: the test-type specific execution routines

pub mod compare;
pub mod rowcount;
pub mod schema;

pub use compare::CompareKind;
pub use rowcount::RowCountKind;
pub use schema::SchemaKind;
