//! String and scalar function mapping.

use crate::ast::{Expr, ScalarFn};
use crate::compile::CompileResult;
use crate::sql::dialect::IndexOfStyle;
use crate::sql::expr::{func, lit_int, lit_str, BinaryOperator, ExprExt, Literal, SqlExpr};
use crate::sql::types::DataType;

use super::filter::{Ctx, Typed};
use super::{TranslationError, Translator};

impl Translator<'_> {
    pub(crate) fn call(
        &mut self,
        ctx: Ctx<'_>,
        function: ScalarFn,
        target: &Expr,
        args: &[Expr],
    ) -> CompileResult<Typed> {
        let target = self.value(ctx, target)?;
        let arg = |i: usize| {
            args.get(i).ok_or_else(|| {
                TranslationError::invalid(&format!("{:?}", function), "missing argument")
            })
        };

        let typed = match function {
            ScalarFn::Contains | ScalarFn::StartsWith | ScalarFn::EndsWith => {
                let needle = arg(0)?;
                let (pattern, escape) = match needle {
                    // Bound patterns arrive escaped and wrapped.
                    Expr::Slot(_) => (self.value(ctx, needle)?.sql, Some(self.dialect.like_escape)),
                    other => {
                        let value = self.value(ctx, other)?.sql;
                        (wildcard(function, value), None)
                    }
                };
                Typed::predicate(SqlExpr::Like {
                    expr: Box::new(target.sql),
                    pattern: Box::new(pattern),
                    escape,
                    negated: false,
                })
            }
            ScalarFn::IsNullOrEmpty => {
                let empty = self.value(ctx, arg(0)?)?;
                Typed::predicate(target.sql.clone().is_null().or(target.sql.eq(empty.sql)))
            }
            ScalarFn::Replace => {
                let from = self.value(ctx, arg(0)?)?;
                let to = self.value(ctx, arg(1)?)?;
                Typed::value(
                    func("REPLACE", vec![target.sql, from.sql, to.sql]),
                    DataType::String,
                )
            }
            ScalarFn::Substring => {
                let start = self.value(ctx, arg(0)?)?;
                let length = match args.get(1) {
                    Some(len) => self.value(ctx, len)?.sql,
                    None => func("LENGTH", vec![target.sql.clone()]),
                };
                Typed::value(
                    func(
                        "SUBSTRING",
                        vec![target.sql, plus_one(start.sql), length],
                    ),
                    DataType::String,
                )
            }
            ScalarFn::IndexOf => {
                let needle = self.value(ctx, arg(0)?)?;
                let position = match self.dialect.index_of_style {
                    IndexOfStyle::CharIndex => func("CHARINDEX", vec![needle.sql, target.sql]),
                    IndexOfStyle::StrPos => func("STRPOS", vec![target.sql, needle.sql]),
                    IndexOfStyle::Instr => func("INSTR", vec![target.sql, needle.sql]),
                };
                Typed::value(
                    position.binary(BinaryOperator::Minus, lit_int(1)),
                    DataType::Int32,
                )
            }
            ScalarFn::ToUpper => string_fn("UPPER", target.sql),
            ScalarFn::ToLower => string_fn("LOWER", target.sql),
            ScalarFn::Trim => string_fn("LTRIM", func("RTRIM", vec![target.sql])),
            ScalarFn::TrimStart => string_fn("LTRIM", target.sql),
            ScalarFn::TrimEnd => string_fn("RTRIM", target.sql),
            ScalarFn::Length => Typed::value(func("LENGTH", vec![target.sql]), DataType::Int32),
        };
        Ok(typed)
    }
}

fn string_fn(name: &str, arg: SqlExpr) -> Typed {
    Typed::value(func(name, vec![arg]), DataType::String)
}

/// Pattern built from a column or expression; its own `%` and `_` stay live.
fn wildcard(function: ScalarFn, value: SqlExpr) -> SqlExpr {
    let percent = || lit_str("%");
    match function {
        ScalarFn::StartsWith => value.binary(BinaryOperator::Concat, percent()),
        ScalarFn::EndsWith => percent().binary(BinaryOperator::Concat, value),
        _ => percent()
            .binary(BinaryOperator::Concat, value)
            .binary(BinaryOperator::Concat, percent()),
    }
}

/// 0-based to 1-based, folding constants.
fn plus_one(start: SqlExpr) -> SqlExpr {
    match start {
        SqlExpr::Literal(Literal::Int(n)) => lit_int(n + 1),
        other => other.binary(BinaryOperator::Plus, lit_int(1)),
    }
}
