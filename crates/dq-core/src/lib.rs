//! dq-core - Core library for dq
//!
//! This crate provides the shared data model: test objects, specifications,
//! column schemas, lifecycle status and verdicts, and domain configuration.

pub mod config;
pub mod error;
mod newtype_string;
pub mod schema;
pub mod specification;
pub mod status;
pub mod test_object;

pub use config::{
    CompareConfig, DatabaseConfig, DbType, DomainConfig, SampleSizeSource, SchemaDefinition,
    TestDefinition,
};
pub use error::{CoreError, CoreResult};
pub use schema::{Column, TableSchema};
pub use specification::{
    QuerySpecification, SchemaSpecification, SpecKind, SpecType, Specification,
};
pub use status::{Status, TestResult, TestType};
pub use test_object::{Coordinates, DomainName, ObjectName, TestObject};
