//! Database column and parameter types.
//!
//! Column types are declared on [`TableMetadata`](crate::metadata::TableMetadata),
//! inferred for computed expressions, and reported with every bound parameter
//! and result column.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Database type of a column, expression or parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    /// Boolean (BOOLEAN, BIT).
    Bool,

    /// 16-bit signed integer (SMALLINT).
    Int16,

    /// 32-bit signed integer (INT, INTEGER).
    Int32,

    /// 64-bit signed integer (BIGINT).
    Int64,

    /// 64-bit floating point (DOUBLE PRECISION, FLOAT).
    Float64,

    /// Fixed-point decimal with precision and scale.
    Decimal(u8, u8),

    /// Character data of any length.
    String,

    /// Date without time.
    Date,

    /// Time without date.
    Time,

    /// Timestamp (DATETIME, DATETIME2).
    Timestamp,

    /// Binary data (VARBINARY, BLOB, BYTEA).
    Binary,

    /// UUID/GUID type.
    Uuid,

    /// Untyped NULL or an expression whose type cannot be inferred.
    Unknown,
}

impl DataType {
    /// Parse a SQL data type name, as found in metadata declarations.
    ///
    /// Length and precision arguments are accepted; lengths are discarded.
    ///
    /// ```ignore
    /// use relq::sql::types::DataType;
    ///
    /// assert_eq!(DataType::parse("bigint"), Some(DataType::Int64));
    /// assert_eq!(DataType::parse("nvarchar(50)"), Some(DataType::String));
    /// assert_eq!(DataType::parse("decimal(18,2)"), Some(DataType::Decimal(18, 2)));
    /// ```
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();

        if let Some(inner) = extract_parens(&s, "decimal").or_else(|| extract_parens(&s, "numeric")) {
            return parse_decimal_params(&inner);
        }

        let base = match s.find('(') {
            Some(idx) if s.ends_with(')') => s[..idx].trim(),
            Some(_) => return None,
            None => s.as_str(),
        };

        match base {
            "bool" | "boolean" | "bit" => Some(DataType::Bool),
            "smallint" | "int16" | "int2" | "tinyint" => Some(DataType::Int16),
            "int" | "integer" | "int32" | "int4" => Some(DataType::Int32),
            "bigint" | "int64" | "int8" => Some(DataType::Int64),
            "real" | "double" | "float" | "float8" | "float64" | "double precision" => {
                Some(DataType::Float64)
            }
            "decimal" | "numeric" | "money" => Some(DataType::Decimal(18, 2)),
            "text" | "string" | "ntext" | "char" | "nchar" | "varchar" | "nvarchar"
            | "character" | "character varying" => Some(DataType::String),
            "date" => Some(DataType::Date),
            "time" => Some(DataType::Time),
            "timestamp" | "datetime" | "datetime2" | "timestamptz" | "datetimeoffset" => {
                Some(DataType::Timestamp)
            }
            "binary" | "blob" | "bytea" | "varbinary" | "image" => Some(DataType::Binary),
            "uuid" | "guid" | "uniqueidentifier" => Some(DataType::Uuid),
            _ => None,
        }
    }

    /// Returns true if this is a string type.
    pub fn is_string(&self) -> bool {
        matches!(self, DataType::String)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Bool => write!(f, "BOOLEAN"),
            DataType::Int16 => write!(f, "SMALLINT"),
            DataType::Int32 => write!(f, "INTEGER"),
            DataType::Int64 => write!(f, "BIGINT"),
            DataType::Float64 => write!(f, "DOUBLE PRECISION"),
            DataType::Decimal(p, s) => write!(f, "DECIMAL({}, {})", p, s),
            DataType::String => write!(f, "TEXT"),
            DataType::Date => write!(f, "DATE"),
            DataType::Time => write!(f, "TIME"),
            DataType::Timestamp => write!(f, "TIMESTAMP"),
            DataType::Binary => write!(f, "BINARY"),
            DataType::Uuid => write!(f, "UUID"),
            DataType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

/// Extract content inside parentheses for a given type prefix.
/// e.g., extract_parens("decimal(10,2)", "decimal") returns Some("10,2")
fn extract_parens(s: &str, prefix: &str) -> Option<String> {
    let rest = s.strip_prefix(prefix)?.trim();
    if !rest.starts_with('(') || !rest.ends_with(')') {
        return None;
    }
    Some(rest[1..rest.len() - 1].to_string())
}

/// Parse decimal parameters "precision,scale" or "precision, scale".
fn parse_decimal_params(inner: &str) -> Option<DataType> {
    let parts: Vec<&str> = inner.split(',').map(|s| s.trim()).collect();
    match parts.as_slice() {
        [p] => Some(DataType::Decimal(p.parse().ok()?, 0)),
        [p, s] => Some(DataType::Decimal(p.parse().ok()?, s.parse().ok()?)),
        _ => None,
    }
}
