//! T-SQL (SQL Server / Azure SQL) dialect.
//!
//! T-SQL has significant differences from ANSI:
//! - Square bracket identifier quoting (`[name]`)
//! - No native boolean in SELECT (must use CASE)
//! - OFFSET FETCH for pagination (requires ORDER BY), ROW_NUMBER() before 2012
//! - N'...' prefix for Unicode strings
//! - String concatenation with `+`
//! - `@name` parameters

use super::helpers;
use super::{
    BoolLiteralForm, CoalesceStyle, ConcatStyle, DialectProfile, DmlTargetStyle, IndexOfStyle,
    PagingStrategy, ParamStyle, QuoteStyle,
};

pub(super) fn profile() -> DialectProfile {
    DialectProfile {
        name: "tsql".into(),
        quote_style: QuoteStyle::Bracket,
        param_style: ParamStyle::Named('@'),
        paging_strategy: PagingStrategy::OffsetFetch,
        bool_literal_form: BoolLiteralForm::Numeric,
        function_overrides: helpers::overrides(&[("LENGTH", "LEN"), ("SUBSTR", "SUBSTRING")]),
        concat_style: ConcatStyle::Operator("+"),
        coalesce_style: CoalesceStyle::Case,
        index_of_style: IndexOfStyle::CharIndex,
        like_escape: '\\',
        unbounded_limit: None,
        supports_intersect_except: true,
        dml_target_style: DmlTargetStyle::FromClause,
        unicode_string_prefix: true,
        backslash_escapes: false,
    }
}

/// SQL Server 2005/2008: no OFFSET FETCH.
pub(super) fn legacy_profile() -> DialectProfile {
    DialectProfile {
        name: "tsql_legacy".into(),
        paging_strategy: PagingStrategy::RowNumber,
        ..profile()
    }
}
