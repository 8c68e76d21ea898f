//! Domain configuration parsing for dq.yml

use crate::error::{CoreError, CoreResult};
use crate::schema::{Column, TableSchema};
use crate::specification::{QuerySpecification, SchemaSpecification, SpecKind, Specification};
use crate::status::TestType;
use crate::test_object::{Coordinates, DomainName, TestObject};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

/// Environment variable overriding `database.path`
pub const DATABASE_PATH_ENV: &str = "DQ_DATABASE_PATH";

const DEFAULT_DB_PATH: &str = ":memory:";

/// Domain configuration from dq.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DomainConfig {
    /// Domain name
    pub domain: DomainName,

    /// Default stage for test objects
    #[serde(default = "default_stage")]
    pub stage: String,

    /// Default instance for test objects
    #[serde(default = "default_instance")]
    pub instance: String,

    /// Data platform connection
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Compare test settings
    #[serde(default)]
    pub compare: CompareConfig,

    /// Test case definitions
    #[serde(default)]
    pub tests: Vec<TestDefinition>,
}

/// Data platform selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    /// DuckDB (default)
    #[default]
    DuckDb,
}

impl fmt::Display for DbType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbType::DuckDb => write!(f, "duckdb"),
        }
    }
}

/// Data platform connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Platform type
    #[serde(rename = "type", default)]
    pub db_type: DbType,

    /// Database path (file or `:memory:`)
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            db_type: DbType::default(),
            path: default_db_path(),
        }
    }
}

/// Settings for the compare test type
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompareConfig {
    /// Domain-wide default sample size
    #[serde(default)]
    pub sample_size: Option<usize>,

    /// Per test object sample size overrides, keyed by object name
    #[serde(default)]
    pub sample_sizes: HashMap<String, usize>,
}

/// Which configuration entry a sample size came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleSizeSource {
    /// `compare.sample_sizes.<object>`
    TestObject,
    /// `compare.sample_size`
    Domain,
}

impl fmt::Display for SampleSizeSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleSizeSource::TestObject => write!(f, "test object config"),
            SampleSizeSource::Domain => write!(f, "domain default"),
        }
    }
}

impl CompareConfig {
    /// Resolve the sample size for a test object, preferring the per-object
    /// override over the domain default
    pub fn resolve_sample_size(&self, object: &str) -> Option<(usize, SampleSizeSource)> {
        if let Some(size) = self.sample_sizes.get(object) {
            return Some((*size, SampleSizeSource::TestObject));
        }
        self.sample_size.map(|size| (size, SampleSizeSource::Domain))
    }
}

/// One test case as declared in dq.yml
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestDefinition {
    /// Explicit test id (default: `<type>_<object>`)
    #[serde(default)]
    pub id: Option<String>,

    /// Test type
    #[serde(rename = "type")]
    pub test_type: TestType,

    /// Test object name
    pub object: String,

    /// Stage override
    #[serde(default)]
    pub stage: Option<String>,

    /// Instance override
    #[serde(default)]
    pub instance: Option<String>,

    /// Expected schema
    #[serde(default)]
    pub schema: Option<SchemaDefinition>,

    /// SQL returning the expected row count
    #[serde(default)]
    pub rowcount_sql: Option<String>,

    /// Reference SQL for the compare test
    #[serde(default)]
    pub compare_sql: Option<String>,
}

/// Expected schema as declared in dq.yml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDefinition {
    /// Columns in declaration order
    #[serde(default)]
    pub columns: Vec<Column>,

    /// Primary key columns
    #[serde(default)]
    pub primary_keys: Vec<String>,
}

impl TestDefinition {
    /// Test id, explicit or derived from type and object
    pub fn id(&self) -> String {
        self.id
            .clone()
            .unwrap_or_else(|| format!("{}_{}", self.test_type, self.object))
    }

    /// Resolve the test object, applying stage/instance overrides
    pub fn test_object(&self, config: &DomainConfig) -> TestObject {
        let coordinates = Coordinates {
            domain: config.domain.clone(),
            stage: self.stage.clone().unwrap_or_else(|| config.stage.clone()),
            instance: self
                .instance
                .clone()
                .unwrap_or_else(|| config.instance.clone()),
        };
        TestObject::new(coordinates, self.object.clone())
    }

    /// Build the specifications declared by this definition.
    ///
    /// `location` is the `<file>#tests[i]` prefix; each specification gets
    /// the field it came from appended.
    pub fn specifications(&self, test_object: &TestObject, location: &str) -> Vec<Specification> {
        let mut specs = Vec::new();

        if let Some(schema) = &self.schema {
            specs.push(Specification::new(
                format!("{location}.schema"),
                SpecKind::Schema(SchemaSpecification {
                    test_object: test_object.clone(),
                    columns: TableSchema::new(schema.columns.clone()),
                    primary_keys: schema.primary_keys.clone(),
                }),
            ));
        }

        if let Some(sql) = &self.rowcount_sql {
            specs.push(Specification::new(
                format!("{location}.rowcount_sql"),
                SpecKind::RowCount(QuerySpecification {
                    test_object: test_object.clone(),
                    query: sql.clone(),
                }),
            ));
        }

        if let Some(sql) = &self.compare_sql {
            specs.push(Specification::new(
                format!("{location}.compare_sql"),
                SpecKind::Compare(QuerySpecification {
                    test_object: test_object.clone(),
                    query: sql.clone(),
                }),
            ));
        }

        specs
    }
}

fn default_stage() -> String {
    "core".to_string()
}

fn default_instance() -> String {
    "dev".to_string()
}

fn default_db_path() -> String {
    DEFAULT_DB_PATH.to_string()
}

impl DomainConfig {
    /// Load configuration from a file path
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Err(CoreError::ConfigNotFound {
                path: path.display().to_string(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CoreError::IoWithPath {
            path: path.display().to_string(),
            source: e,
        })?;
        let config = Self::parse(&content)?;
        log::debug!(
            "Loaded domain config '{}' with {} test(s) from {}",
            config.domain,
            config.tests.len(),
            path.display()
        );
        Ok(config)
    }

    /// Load configuration from a project directory.
    /// Looks for dq.yml or dq.yaml
    pub fn load_from_dir(dir: &Path) -> CoreResult<Self> {
        let yml_path = dir.join("dq.yml");
        let yaml_path = dir.join("dq.yaml");

        if yml_path.exists() {
            Self::load(&yml_path)
        } else if yaml_path.exists() {
            Self::load(&yaml_path)
        } else {
            Err(CoreError::ConfigNotFound {
                path: yml_path.display().to_string(),
            })
        }
    }

    /// Parse and validate configuration from a YAML string
    pub fn parse(content: &str) -> CoreResult<Self> {
        let config: DomainConfig =
            serde_yaml::from_str(content).map_err(|e| CoreError::ConfigParseError {
                message: e.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> CoreResult<()> {
        if self.stage.is_empty() || self.instance.is_empty() {
            return Err(CoreError::ConfigInvalid {
                message: "stage and instance must not be empty".to_string(),
            });
        }

        if self.compare.sample_size == Some(0) {
            return Err(CoreError::ConfigInvalid {
                message: "compare.sample_size must be greater than 0".to_string(),
            });
        }

        if let Some((object, _)) = self.compare.sample_sizes.iter().find(|(_, n)| **n == 0) {
            return Err(CoreError::ConfigInvalid {
                message: format!("compare.sample_sizes.{object} must be greater than 0"),
            });
        }

        let mut seen = HashSet::new();
        for test in &self.tests {
            let id = test.id();
            if !seen.insert(id.clone()) {
                return Err(CoreError::DuplicateTest { id });
            }
        }

        Ok(())
    }

    /// Database path, honoring the `DQ_DATABASE_PATH` override
    pub fn database_path(&self) -> String {
        std::env::var(DATABASE_PATH_ENV).unwrap_or_else(|_| self.database.path.clone())
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
