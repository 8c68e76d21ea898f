//! Logical-to-physical query translation
//!
//! Logical queries name test objects through `{{ ref("name") }}` (optionally
//! `{{ ref("name", "stage") }}` to reach another stage of the same domain
//! instance). Translation renders those references into quoted,
//! schema-qualified physical names.

use crate::error::{DbError, DbResult};
use dq_core::{Coordinates, TestObject};
use minijinja::{Environment, UndefinedBehavior};

/// Physical schema holding the objects at the given coordinates
pub fn physical_schema(coordinates: &Coordinates) -> String {
    format!(
        "{}_{}_{}",
        coordinates.domain, coordinates.stage, coordinates.instance
    )
}

/// Quote an SQL identifier
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quoted, schema-qualified physical name of a test object
pub fn qualified_name(object: &TestObject) -> String {
    format!(
        "{}.{}",
        quote_ident(&physical_schema(object.coordinates())),
        quote_ident(object.name())
    )
}

/// Render `ref()` calls in a logical query for the given coordinates
pub fn translate(query: &str, coordinates: &Coordinates) -> DbResult<String> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);

    let base = coordinates.clone();
    env.add_function("ref", move |name: String, stage: Option<String>| -> String {
        let mut coords = base.clone();
        if let Some(stage) = stage {
            coords.stage = stage;
        }
        format!(
            "{}.{}",
            quote_ident(&physical_schema(&coords)),
            quote_ident(&name)
        )
    });

    env.render_str(query, ())
        .map_err(|e| DbError::TranslationError(e.to_string()))
}
