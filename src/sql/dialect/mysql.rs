//! MySQL dialect.
//!
//! MySQL differences:
//! - Backtick identifier quoting
//! - `||` is logical OR by default, so CONCAT() is used
//! - Backslash escapes inside string literals
//! - No INTERSECT/EXCEPT before 8.0.31
//! - OFFSET requires a LIMIT

use super::helpers;
use super::{
    BoolLiteralForm, CoalesceStyle, ConcatStyle, DialectProfile, DmlTargetStyle, IndexOfStyle,
    PagingStrategy, ParamStyle, QuoteStyle,
};

pub(super) fn profile() -> DialectProfile {
    DialectProfile {
        name: "mysql".into(),
        quote_style: QuoteStyle::Backtick,
        param_style: ParamStyle::Positional,
        paging_strategy: PagingStrategy::LimitOffset,
        bool_literal_form: BoolLiteralForm::Numeric,
        function_overrides: helpers::overrides(&[("LEN", "CHAR_LENGTH"), ("LENGTH", "CHAR_LENGTH")]),
        concat_style: ConcatStyle::Function,
        coalesce_style: CoalesceStyle::Function,
        index_of_style: IndexOfStyle::Instr,
        like_escape: '\\',
        unbounded_limit: Some("18446744073709551615".into()),
        supports_intersect_except: false,
        dml_target_style: DmlTargetStyle::Aliased,
        unicode_string_prefix: false,
        backslash_escapes: true,
    }
}
