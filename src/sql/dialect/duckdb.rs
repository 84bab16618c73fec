//! DuckDB SQL dialect.
//!
//! DuckDB is largely PostgreSQL-compatible: ANSI quoting, native booleans,
//! `$n` parameters and LIMIT/OFFSET paging.

use super::helpers;
use super::{
    BoolLiteralForm, CoalesceStyle, ConcatStyle, DialectProfile, DmlTargetStyle, IndexOfStyle,
    PagingStrategy, ParamStyle, QuoteStyle,
};

pub(super) fn profile() -> DialectProfile {
    DialectProfile {
        name: "duckdb".into(),
        quote_style: QuoteStyle::Double,
        param_style: ParamStyle::Numbered('$'),
        paging_strategy: PagingStrategy::LimitOffset,
        bool_literal_form: BoolLiteralForm::Keyword,
        function_overrides: helpers::overrides(&[("LEN", "LENGTH")]),
        concat_style: ConcatStyle::Operator("||"),
        coalesce_style: CoalesceStyle::Function,
        index_of_style: IndexOfStyle::StrPos,
        like_escape: '\\',
        unbounded_limit: None,
        supports_intersect_except: true,
        dml_target_style: DmlTargetStyle::Aliased,
        unicode_string_prefix: false,
        backslash_escapes: false,
    }
}
