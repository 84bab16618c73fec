//! SQL dialect profiles.
//!
//! A dialect is a plain data value, [`DialectProfile`], describing how the
//! writer renders the parts of a statement that differ between engines:
//!
//! - Identifier quoting: `"` (PostgreSQL/SQLite/DuckDB), `` ` `` (MySQL), `[]` (T-SQL)
//! - Parameter placeholders: `@name`, `$1`, `?`
//! - Pagination: LIMIT/OFFSET vs OFFSET FETCH vs a ROW_NUMBER() window
//! - Boolean literals: true/false vs 1/0
//! - String concatenation: `||` vs `+` vs CONCAT()
//! - Function names: LENGTH vs LEN, SUBSTRING vs SUBSTR
//!
//! [`Dialect`] names the built-in presets. Callers that need something else
//! start from a preset and adjust fields:
//!
//! ```ignore
//! use relq::sql::dialect::{Dialect, PagingStrategy};
//!
//! let profile = Dialect::TSql
//!     .profile()
//!     .clone()
//!     .with_paging(PagingStrategy::RowNumber)
//!     .with_function_override("UPPER", "UCASE");
//! ```
//!
//! # Feature Matrix
//!
//! | Feature | T-SQL | PostgreSQL | MySQL | SQLite | DuckDB |
//! |---------|-------|------------|-------|--------|--------|
//! | INTERSECT / EXCEPT | ✓ | ✓ | ❌ | ✓ | ✓ |
//! | OFFSET without LIMIT | ✓ | ✓ | ❌ (huge LIMIT) | ❌ (LIMIT -1) | ✓ |
//! | Boolean values | ❌ (1/0) | ✓ | ❌ (1/0) | ❌ (1/0) | ✓ |
//! | Aliased UPDATE/DELETE target | ❌ (FROM clause) | ✓ | ✓ | ✓ | ✓ |

mod duckdb;
pub mod helpers;
mod mysql;
mod postgres;
mod sqlite;
mod tsql;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::Serialize;

/// Identifier quoting style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QuoteStyle {
    /// `"identifier"`
    Double,
    /// `` `identifier` ``
    Backtick,
    /// `[identifier]`
    Bracket,
}

/// Parameter placeholder syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParamStyle {
    /// Prefix plus parameter name: `@name`, `:name`.
    Named(char),
    /// Prefix plus 1-based ordinal: `$1`.
    Numbered(char),
    /// Bare `?`, one per occurrence.
    Positional,
}

/// How Skip/Take are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PagingStrategy {
    /// `LIMIT n OFFSET m`
    LimitOffset,
    /// `OFFSET m ROWS FETCH NEXT n ROWS ONLY` (requires ORDER BY)
    OffsetFetch,
    /// `TOP n` for plain takes, a `ROW_NUMBER() OVER (...)` subquery otherwise.
    RowNumber,
}

/// Boolean literal rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BoolLiteralForm {
    /// `true`/`false`; predicates are valid values.
    Keyword,
    /// `1`/`0`; predicates must be wrapped in CASE to be used as values.
    Numeric,
}

/// String concatenation rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ConcatStyle {
    Operator(&'static str),
    /// `CONCAT(a, b)`
    Function,
}

/// Null-coalescing rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CoalesceStyle {
    /// `COALESCE(a, b, c)`
    Function,
    /// `CASE WHEN a IS NOT NULL THEN a WHEN b IS NOT NULL THEN b ELSE c END`
    Case,
}

/// Substring search function and argument order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IndexOfStyle {
    /// `CHARINDEX(needle, haystack)`
    CharIndex,
    /// `STRPOS(haystack, needle)`
    StrPos,
    /// `INSTR(haystack, needle)`
    Instr,
}

/// How UPDATE and DELETE name an aliased target table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DmlTargetStyle {
    /// `UPDATE t AS a SET ...`, `DELETE FROM t AS a`
    Aliased,
    /// `UPDATE a SET ... FROM t AS a`, `DELETE a FROM t AS a`
    FromClause,
}

/// Everything the writer and translators need to know about a target engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DialectProfile {
    /// Dialect name for display/logging.
    pub name: String,
    pub quote_style: QuoteStyle,
    pub param_style: ParamStyle,
    pub paging_strategy: PagingStrategy,
    pub bool_literal_form: BoolLiteralForm,
    /// Canonical (upper-case) function name to dialect function name.
    pub function_overrides: BTreeMap<String, String>,
    pub concat_style: ConcatStyle,
    pub coalesce_style: CoalesceStyle,
    pub index_of_style: IndexOfStyle,
    /// Escape character used in LIKE patterns built from bound values.
    pub like_escape: char,
    /// LIMIT value to emit when only OFFSET is requested and the engine
    /// cannot express OFFSET alone.
    pub unbounded_limit: Option<String>,
    pub supports_intersect_except: bool,
    pub dml_target_style: DmlTargetStyle,
    /// Prefix non-ASCII string literals with `N`.
    pub unicode_string_prefix: bool,
    /// Backslash is an escape character inside string literals.
    pub backslash_escapes: bool,
}

impl DialectProfile {
    // =========================================================================
    // Identifier and Literal Quoting
    // =========================================================================

    /// Quote an identifier (table, column, alias).
    pub fn quote_identifier(&self, ident: &str) -> String {
        match self.quote_style {
            QuoteStyle::Double => helpers::quote_double(ident),
            QuoteStyle::Backtick => helpers::quote_backtick(ident),
            QuoteStyle::Bracket => helpers::quote_bracket(ident),
        }
    }

    /// Quote a string literal.
    pub fn quote_string(&self, s: &str) -> String {
        if self.unicode_string_prefix && !s.is_ascii() {
            helpers::quote_string_unicode(s)
        } else if self.backslash_escapes {
            helpers::quote_string_backslash(s)
        } else {
            helpers::quote_string_single(s)
        }
    }

    /// Format a boolean literal.
    pub fn format_bool(&self, b: bool) -> &'static str {
        match self.bool_literal_form {
            BoolLiteralForm::Keyword => helpers::format_bool_literal(b),
            BoolLiteralForm::Numeric => helpers::format_bool_numeric(b),
        }
    }

    // =========================================================================
    // Parameters
    // =========================================================================

    /// Render a placeholder. `ordinal` is 1-based.
    pub fn placeholder(&self, name: &str, ordinal: usize) -> String {
        match self.param_style {
            ParamStyle::Named(prefix) => format!("{}{}", prefix, name),
            ParamStyle::Numbered(prefix) => format!("{}{}", prefix, ordinal),
            ParamStyle::Positional => "?".into(),
        }
    }

    // =========================================================================
    // Function Remapping
    // =========================================================================

    /// Remap a function name for this dialect. Matching is case-insensitive.
    pub fn remap_function(&self, name: &str) -> Option<&str> {
        self.function_overrides
            .get(&name.to_uppercase())
            .map(String::as_str)
    }

    // =========================================================================
    // Builders
    // =========================================================================

    pub fn with_paging(mut self, strategy: PagingStrategy) -> Self {
        self.paging_strategy = strategy;
        self
    }

    pub fn with_param_style(mut self, style: ParamStyle) -> Self {
        self.param_style = style;
        self
    }

    pub fn with_function_override(mut self, canonical: &str, replacement: &str) -> Self {
        self.function_overrides
            .insert(canonical.to_uppercase(), replacement.into());
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.into();
        self
    }
}

impl fmt::Display for DialectProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Built-in dialect presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Dialect {
    /// SQL Server 2012+.
    #[default]
    TSql,
    /// SQL Server before 2012: ROW_NUMBER() paging.
    TSqlLegacy,
    Postgres,
    MySql,
    Sqlite,
    DuckDb,
}

static TSQL: Lazy<DialectProfile> = Lazy::new(tsql::profile);
static TSQL_LEGACY: Lazy<DialectProfile> = Lazy::new(tsql::legacy_profile);
static POSTGRES: Lazy<DialectProfile> = Lazy::new(postgres::profile);
static MYSQL: Lazy<DialectProfile> = Lazy::new(mysql::profile);
static SQLITE: Lazy<DialectProfile> = Lazy::new(sqlite::profile);
static DUCKDB: Lazy<DialectProfile> = Lazy::new(duckdb::profile);

impl Dialect {
    /// Get the preset profile.
    pub fn profile(&self) -> &'static DialectProfile {
        match self {
            Dialect::TSql => &TSQL,
            Dialect::TSqlLegacy => &TSQL_LEGACY,
            Dialect::Postgres => &POSTGRES,
            Dialect::MySql => &MYSQL,
            Dialect::Sqlite => &SQLITE,
            Dialect::DuckDb => &DUCKDB,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::TSql => "tsql",
            Dialect::TSqlLegacy => "tsql_legacy",
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
            Dialect::Sqlite => "sqlite",
            Dialect::DuckDb => "duckdb",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tsql" | "mssql" | "sqlserver" => Ok(Dialect::TSql),
            "tsql_legacy" | "sqlserver2008" => Ok(Dialect::TSqlLegacy),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "mysql" => Ok(Dialect::MySql),
            "sqlite" => Ok(Dialect::Sqlite),
            "duckdb" => Ok(Dialect::DuckDb),
            other => Err(format!("unknown dialect '{}'", other)),
        }
    }
}
