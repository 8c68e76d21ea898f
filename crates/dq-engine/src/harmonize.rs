//! Schema harmonization
//!
//! Maps platform-native column type names onto a small canonical vocabulary
//! so schemas from different platforms (or different spellings on the same
//! platform) can be compared.

use dq_core::{Column, TableSchema};

/// Canonical integer type
pub const INT: &str = "int";
/// Canonical string type
pub const STRING: &str = "string";
/// Canonical date type
pub const DATE: &str = "date";
/// Canonical timestamp type
pub const TIMESTAMP: &str = "timestamp";
/// Canonical exact numeric type
pub const DECIMAL: &str = "decimal";
/// Canonical floating-point type
pub const FLOAT: &str = "float";

const COMPLEX_PREFIXES: [&str; 4] = ["array", "list", "interval", "struct"];

/// Harmonize every column type of a schema.
///
/// Column names and order are kept; the input is not modified.
pub fn harmonize(schema: &TableSchema) -> TableSchema {
    schema
        .iter()
        .map(|c| Column::new(c.name.clone(), harmonize_type(&c.data_type)))
        .collect()
}

/// Harmonize a single native type name (case-insensitive).
///
/// Complex types come back lowercased but otherwise unchanged, as do types
/// that match no family.
pub fn harmonize_type(native: &str) -> String {
    let lower = native.trim().to_ascii_lowercase();

    if is_complex(&lower) {
        return lower;
    }

    let base = lower.split('(').next().unwrap_or_default().trim();
    let canonical = match base {
        "tinyint" | "smallint" | "int" | "integer" | "bigint" | "hugeint" | "utinyint"
        | "usmallint" | "uinteger" | "ubigint" | "uhugeint" | "int1" | "int2" | "int4"
        | "int8" | "int16" | "int32" | "int64" | "byteint" | "short" | "long" | "signed" => INT,
        "date" => DATE,
        b if b == "datetime" || b.starts_with("timestamp") => TIMESTAMP,
        "varchar" | "char" | "character" | "character varying" | "nvarchar" | "nchar"
        | "bpchar" | "text" | "string" | "uuid" => STRING,
        "decimal" | "numeric" | "number" | "dec" => DECIMAL,
        "float" | "float4" | "float8" | "real" | "double" | "double precision" => FLOAT,
        _ => return lower,
    };
    canonical.to_string()
}

fn is_complex(lower: &str) -> bool {
    COMPLEX_PREFIXES.iter().any(|p| lower.starts_with(p)) || lower.ends_with(']')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(name: &str, native: &str) -> TableSchema {
        TableSchema::from_pairs([(name, native)])
    }

    #[test]
    fn test_string_family() {
        assert_eq!(
            harmonize(&single("a", "VARCHAR(10)")),
            single("a", "string")
        );
        for native in ["TEXT", "char(3)", "Character Varying(20)", "BPCHAR"] {
            assert_eq!(harmonize_type(native), STRING, "{native}");
        }
    }

    #[test]
    fn test_decimal_family() {
        assert_eq!(
            harmonize(&single("b", "DECIMAL(10,2)")),
            single("b", "decimal")
        );
        assert_eq!(harmonize_type("numeric"), DECIMAL);
    }

    #[test]
    fn test_complex_passthrough_lowercased() {
        assert_eq!(
            harmonize(&single("c", "STRUCT<x INT>")),
            single("c", "struct<x int>")
        );
        assert_eq!(harmonize_type("INTEGER[]"), "integer[]");
        assert_eq!(harmonize_type("LIST(VARCHAR)"), "list(varchar)");
        assert_eq!(harmonize_type("INTERVAL"), "interval");
        assert_eq!(harmonize_type("ARRAY<STRING>"), "array<string>");
    }

    #[test]
    fn test_integer_family() {
        for native in ["INTEGER", "bigint", "SMALLINT", "TinyInt", "HUGEINT", "int64"] {
            assert_eq!(harmonize_type(native), INT, "{native}");
        }
    }

    #[test]
    fn test_temporal_families() {
        assert_eq!(harmonize_type("DATE"), DATE);
        assert_eq!(harmonize_type("TIMESTAMP"), TIMESTAMP);
        assert_eq!(harmonize_type("TIMESTAMP WITH TIME ZONE"), TIMESTAMP);
        assert_eq!(harmonize_type("timestamp_ns"), TIMESTAMP);
        assert_eq!(harmonize_type("DATETIME"), TIMESTAMP);
    }

    #[test]
    fn test_float_family() {
        for native in ["FLOAT", "REAL", "DOUBLE", "double precision"] {
            assert_eq!(harmonize_type(native), FLOAT, "{native}");
        }
    }

    #[test]
    fn test_unmatched_passthrough() {
        assert_eq!(harmonize_type("BOOLEAN"), "boolean");
        assert_eq!(harmonize_type("geometry"), "geometry");
        assert_eq!(harmonize_type(""), "");
    }

    #[test]
    fn test_order_preserved_and_input_untouched() {
        let schema = TableSchema::from_pairs([("z", "BIGINT"), ("a", "VARCHAR"), ("m", "DATE")]);
        let before = schema.clone();

        let harmonized = harmonize(&schema);

        assert_eq!(schema, before);
        assert_eq!(harmonized.column_names(), vec!["z", "a", "m"]);
        assert_eq!(harmonized.type_of("z"), Some(INT));
        assert_eq!(harmonized.type_of("m"), Some(DATE));
    }
}
