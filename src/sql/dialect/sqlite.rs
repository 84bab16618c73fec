//! SQLite dialect.
//!
//! SQLite stores booleans as integers, spells SUBSTRING as SUBSTR and
//! needs `LIMIT -1` to express an offset on its own.

use super::helpers;
use super::{
    BoolLiteralForm, CoalesceStyle, ConcatStyle, DialectProfile, DmlTargetStyle, IndexOfStyle,
    PagingStrategy, ParamStyle, QuoteStyle,
};

pub(super) fn profile() -> DialectProfile {
    DialectProfile {
        name: "sqlite".into(),
        quote_style: QuoteStyle::Double,
        param_style: ParamStyle::Positional,
        paging_strategy: PagingStrategy::LimitOffset,
        bool_literal_form: BoolLiteralForm::Numeric,
        function_overrides: helpers::overrides(&[("SUBSTRING", "SUBSTR"), ("LEN", "LENGTH")]),
        concat_style: ConcatStyle::Operator("||"),
        coalesce_style: CoalesceStyle::Function,
        index_of_style: IndexOfStyle::Instr,
        like_escape: '\\',
        unbounded_limit: Some("-1".into()),
        supports_intersect_except: true,
        dml_target_style: DmlTargetStyle::Aliased,
        unicode_string_prefix: false,
        backslash_escapes: false,
    }
}
