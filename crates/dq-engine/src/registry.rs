//! Test-type to test-kind registry

use crate::error::{EngineError, EngineResult};
use crate::kinds::{CompareKind, RowCountKind, SchemaKind};
use crate::test_case::TestKind;
use dq_core::TestType;
use std::collections::HashMap;
use std::sync::Arc;

/// Constructor of a test kind
pub type KindConstructor = fn() -> Arc<dyn TestKind>;

/// Explicit mapping from test type to the kind that runs it
#[derive(Debug, Default, Clone)]
pub struct TestKindRegistry {
    kinds: HashMap<TestType, KindConstructor>,
}

impl TestKindRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the schema, row-count and compare kinds
    pub fn with_defaults() -> Self {
        let mut kinds: HashMap<TestType, KindConstructor> = HashMap::new();
        kinds.insert(TestType::Schema, || Arc::new(SchemaKind));
        kinds.insert(TestType::RowCount, || Arc::new(RowCountKind));
        kinds.insert(TestType::Compare, || Arc::new(CompareKind));
        Self { kinds }
    }

    /// Register a constructor; each test type can be registered once
    pub fn register(
        &mut self,
        test_type: TestType,
        constructor: KindConstructor,
    ) -> EngineResult<()> {
        if self.kinds.contains_key(&test_type) {
            return Err(EngineError::DuplicateRegistration(test_type));
        }
        self.kinds.insert(test_type, constructor);
        Ok(())
    }

    /// Construct the kind registered for `test_type`
    pub fn create(&self, test_type: TestType) -> EngineResult<Arc<dyn TestKind>> {
        self.kinds
            .get(&test_type)
            .map(|constructor| constructor())
            .ok_or(EngineError::UnregisteredTestType(test_type))
    }

    /// Registered test types, sorted
    pub fn test_types(&self) -> Vec<TestType> {
        let mut types: Vec<_> = self.kinds.keys().copied().collect();
        types.sort();
        types
    }
}
