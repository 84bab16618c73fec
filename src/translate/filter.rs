//! Predicates and scalar expressions.
//!
//! Every logical expression is translated to a [`Typed`] SQL expression that
//! remembers whether it is a predicate (comparison, EXISTS, LIKE, ...) or a
//! value. Dialects with numeric booleans cannot use a predicate as a value
//! or a value as a predicate, so the two conversions below are the only
//! places that bridge them.

use crate::ast::{BinaryOp, ContainsSet, Expr, QueryNode, Value};
use crate::compile::CompileResult;
use crate::sql::dialect::{BoolLiteralForm, CoalesceStyle};
use crate::sql::expr::{case_when, func, lit_bool, lit_int, BinaryOperator, ExprExt, Literal, SqlExpr};
use crate::sql::types::DataType;

use super::scope::AliasResolutionError;
use super::{Finish, GroupState, OutputColumn, SelectState, TranslationError, Translator};

/// A translated expression.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Typed {
    pub sql: SqlExpr,
    pub data_type: DataType,
    /// A condition rather than a value.
    pub predicate: bool,
}

impl Typed {
    pub fn value(sql: SqlExpr, data_type: DataType) -> Self {
        Self {
            sql,
            data_type,
            predicate: false,
        }
    }

    pub fn predicate(sql: SqlExpr) -> Self {
        Self {
            sql,
            data_type: DataType::Bool,
            predicate: true,
        }
    }
}

impl From<&OutputColumn> for Typed {
    fn from(c: &OutputColumn) -> Self {
        Typed::value(c.sql.clone(), c.data_type)
    }
}

/// What an expression can read besides scope bindings.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Ctx<'s> {
    pub row: &'s [OutputColumn],
    pub group: Option<&'s GroupState>,
}

impl<'s> Ctx<'s> {
    pub fn of(state: &'s SelectState) -> Self {
        Self {
            row: &state.row,
            group: state.group.as_ref(),
        }
    }

    fn field(&self, name: &str) -> Option<&'s OutputColumn> {
        self.row.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

impl Translator<'_> {
    // =========================================================================
    // Filter
    // =========================================================================

    /// `Where(predicate)`. After a grouping, predicates over aggregates go to
    /// HAVING; predicates over keys only go to WHERE.
    pub(crate) fn filter(
        &mut self,
        state: SelectState,
        predicate: &Expr,
    ) -> CompileResult<SelectState> {
        let mut state = if state.is_sealed() || state.is_paged() {
            self.wrap(state)?
        } else {
            state
        };
        let sql = self.predicate(Ctx::of(&state), predicate)?;
        if state.group.is_some() && sql.contains_aggregate() {
            state.select.and_having(sql);
        } else {
            state.select.and_where(sql);
        }
        Ok(state)
    }

    // =========================================================================
    // Predicate / Value Conversion
    // =========================================================================

    /// Translate an expression used as a condition.
    pub(crate) fn predicate(&mut self, ctx: Ctx<'_>, e: &Expr) -> CompileResult<SqlExpr> {
        let typed = self.expr(ctx, e)?;
        Ok(self.as_predicate(typed))
    }

    /// Translate an expression used as a value.
    pub(crate) fn value(&mut self, ctx: Ctx<'_>, e: &Expr) -> CompileResult<Typed> {
        let typed = self.expr(ctx, e)?;
        Ok(self.as_value(typed))
    }

    fn as_predicate(&self, typed: Typed) -> SqlExpr {
        if typed.predicate || self.dialect.bool_literal_form == BoolLiteralForm::Keyword {
            return typed.sql;
        }
        match typed.sql {
            SqlExpr::Literal(Literal::Bool(b)) => lit_int(1).eq(lit_int(i64::from(b))),
            other => other.eq(lit_int(1)),
        }
    }

    pub(crate) fn as_value(&self, typed: Typed) -> Typed {
        if !typed.predicate {
            return typed;
        }
        match self.dialect.bool_literal_form {
            BoolLiteralForm::Keyword => Typed::value(typed.sql, DataType::Bool),
            BoolLiteralForm::Numeric => Typed::value(
                case_when(typed.sql, lit_bool(true), Some(lit_bool(false))),
                DataType::Bool,
            ),
        }
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    pub(crate) fn expr(&mut self, ctx: Ctx<'_>, e: &Expr) -> CompileResult<Typed> {
        match e {
            Expr::Member { source, member } => {
                let m = self.scope.resolve(source, member)?;
                Ok(Typed::value(m.sql, m.data_type))
            }
            Expr::Field(name) => ctx
                .field(name)
                .map(Typed::from)
                .ok_or_else(|| AliasResolutionError::UnknownField(name.clone()).into()),
            Expr::Literal(v) => Ok(literal(v)),
            Expr::Param { name, .. } => Err(TranslationError::invalid(
                "parameter",
                format!("'{}' was not assigned a slot", name),
            )
            .into()),
            Expr::Slot(slot) => {
                let info = self.slots.get(*slot).ok_or_else(|| {
                    TranslationError::invalid("parameter", format!("slot {} is out of range", slot))
                })?;
                Ok(Typed::value(SqlExpr::Param(*slot), info.data_type))
            }
            Expr::Binary { op, left, right } => self.binary(ctx, *op, left, right),
            Expr::Not(inner) => {
                let p = self.predicate(ctx, inner)?;
                Ok(Typed::predicate(p.not()))
            }
            Expr::Negate(inner) => {
                let v = self.value(ctx, inner)?;
                Ok(Typed::value(
                    SqlExpr::UnaryOp {
                        op: crate::sql::expr::UnaryOperator::Minus,
                        expr: Box::new(v.sql),
                    },
                    v.data_type,
                ))
            }
            Expr::Coalesce(items) => self.coalesce(ctx, items),
            Expr::Conditional {
                test,
                then,
                otherwise,
            } => {
                let test = self.predicate(ctx, test)?;
                let then = self.value(ctx, then)?;
                let otherwise = self.value(ctx, otherwise)?;
                let data_type = known_type(then.data_type, otherwise.data_type);
                Ok(Typed::value(
                    case_when(test, then.sql, Some(otherwise.sql)),
                    data_type,
                ))
            }
            Expr::Call {
                function,
                target,
                args,
            } => self.call(ctx, *function, target, args),
            Expr::Any { query, predicate } => {
                let subquery = self.exists_subquery(query, predicate.as_deref(), false)?;
                Ok(Typed::predicate(SqlExpr::Exists {
                    subquery: Box::new(subquery),
                    negated: false,
                }))
            }
            Expr::All { query, predicate } => {
                let subquery = self.exists_subquery(query, Some(predicate), true)?;
                Ok(Typed::predicate(SqlExpr::Exists {
                    subquery: Box::new(subquery),
                    negated: true,
                }))
            }
            Expr::Contains { value, set } => self.contains(ctx, value, set),
            Expr::Composite(_) => Err(TranslationError::invalid(
                "composite value",
                "only valid in comparisons, projections and keys",
            )
            .into()),
            Expr::Key => match ctx.group {
                Some(group) if group.single => group
                    .keys
                    .first()
                    .map(Typed::from)
                    .ok_or_else(|| AliasResolutionError::KeyOutsideGroup.into()),
                Some(_) => Err(TranslationError::invalid(
                    "Key",
                    "a composite key can only be compared, projected or read by member",
                )
                .into()),
                None => ctx
                    .field("Key")
                    .map(Typed::from)
                    .ok_or_else(|| AliasResolutionError::KeyOutsideGroup.into()),
            },
            Expr::KeyMember(name) => {
                let found = match ctx.group {
                    Some(group) => group.keys.iter().find(|k| k.name.eq_ignore_ascii_case(name)),
                    None => ctx.field(name),
                };
                found
                    .map(Typed::from)
                    .ok_or_else(|| AliasResolutionError::UnknownField(name.clone()).into())
            }
            Expr::Aggregate {
                function,
                arg,
                filter,
            } => self.group_aggregate(ctx, *function, arg.as_deref(), filter.as_deref()),
            Expr::Scalar(query) => self.scalar_subquery(query),
        }
    }

    /// Members of a composite value, or `None` for a plain expression.
    pub(crate) fn components(
        &mut self,
        ctx: Ctx<'_>,
        e: &Expr,
    ) -> CompileResult<Option<Vec<(String, Typed)>>> {
        match e {
            Expr::Composite(members) => {
                let mut out = Vec::with_capacity(members.len());
                for (name, member) in members {
                    out.push((name.clone(), self.value(ctx, member)?));
                }
                Ok(Some(out))
            }
            Expr::Key => match ctx.group {
                Some(group) if !group.single => Ok(Some(
                    group
                        .keys
                        .iter()
                        .map(|k| (k.name.clone(), Typed::from(k)))
                        .collect(),
                )),
                _ => Ok(None),
            },
            _ => Ok(None),
        }
    }

    fn binary(
        &mut self,
        ctx: Ctx<'_>,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
    ) -> CompileResult<Typed> {
        if op.is_logical() {
            let l = self.predicate(ctx, left)?;
            let r = self.predicate(ctx, right)?;
            return Ok(Typed::predicate(if op == BinaryOp::And {
                l.and(r)
            } else {
                l.or(r)
            }));
        }

        if op.is_comparison() {
            let lc = self.components(ctx, left)?;
            let rc = self.components(ctx, right)?;
            if let (Some(lc), Some(rc)) = (lc, rc) {
                return compare_composite(op, lc, rc).map(Typed::predicate);
            }

            let null_side = match (is_null(left), is_null(right)) {
                (_, true) => Some(left),
                (true, false) => Some(right),
                (false, false) => None,
            };
            if let Some(other) = null_side {
                let v = self.value(ctx, other)?;
                return match op {
                    BinaryOp::Eq => Ok(Typed::predicate(v.sql.is_null())),
                    BinaryOp::Ne => Ok(Typed::predicate(v.sql.is_not_null())),
                    _ => Err(TranslationError::invalid(
                        "comparison",
                        "only == and != can compare with null",
                    )
                    .into()),
                };
            }

            let l = self.value(ctx, left)?;
            let r = self.value(ctx, right)?;
            return Ok(Typed::predicate(l.sql.binary(comparison(op), r.sql)));
        }

        let l = self.value(ctx, left)?;
        let r = self.value(ctx, right)?;
        let (sql_op, data_type) = match op {
            BinaryOp::Concat => (BinaryOperator::Concat, DataType::String),
            BinaryOp::Add if l.data_type.is_string() || r.data_type.is_string() => {
                (BinaryOperator::Concat, DataType::String)
            }
            BinaryOp::Add => (BinaryOperator::Plus, numeric_type(l.data_type, r.data_type)),
            BinaryOp::Sub => (BinaryOperator::Minus, numeric_type(l.data_type, r.data_type)),
            BinaryOp::Mul => (BinaryOperator::Mul, numeric_type(l.data_type, r.data_type)),
            BinaryOp::Div => (BinaryOperator::Div, numeric_type(l.data_type, r.data_type)),
            _ => (BinaryOperator::Mod, numeric_type(l.data_type, r.data_type)),
        };
        Ok(Typed::value(l.sql.binary(sql_op, r.sql), data_type))
    }

    fn coalesce(&mut self, ctx: Ctx<'_>, items: &[Expr]) -> CompileResult<Typed> {
        let mut values = Vec::with_capacity(items.len());
        for item in items {
            values.push(self.value(ctx, item)?);
        }
        let data_type = values
            .iter()
            .map(|v| v.data_type)
            .fold(DataType::Unknown, known_type);
        let sql = self
            .coalesce_sql(values.into_iter().map(|v| v.sql).collect())
            .ok_or_else(|| TranslationError::invalid("coalesce", "no operands"))?;
        Ok(Typed::value(sql, data_type))
    }

    /// `a ?? b ?? c` in the dialect's form. `None` for no operands.
    pub(crate) fn coalesce_sql(&self, mut items: Vec<SqlExpr>) -> Option<SqlExpr> {
        let last = items.pop()?;
        if items.is_empty() {
            return Some(last);
        }
        Some(match self.dialect.coalesce_style {
            CoalesceStyle::Function => {
                items.push(last);
                func("COALESCE", items)
            }
            CoalesceStyle::Case => SqlExpr::Case {
                when_clauses: items
                    .into_iter()
                    .map(|e| (e.clone().is_not_null(), e))
                    .collect(),
                else_clause: Some(Box::new(last)),
            },
        })
    }

    // =========================================================================
    // Subqueries
    // =========================================================================

    /// Body of `[NOT] EXISTS (...)` for `Any`/`All`. `negate` filters on the
    /// negated predicate, which is what `All` checks for.
    pub(crate) fn exists_subquery(
        &mut self,
        query: &QueryNode,
        predicate: Option<&Expr>,
        negate: bool,
    ) -> CompileResult<crate::sql::query::Select> {
        self.in_scope(|t| {
            let mut state = t.node(query)?;
            if let Some(p) = predicate {
                state = if negate {
                    t.filter(state, &Expr::Not(Box::new(p.clone())))?
                } else {
                    t.filter(state, p)?
                };
            }
            minimal_projection(&mut state);
            t.finish(state, Finish::Nested)
        })
    }

    fn contains(&mut self, ctx: Ctx<'_>, value: &Expr, set: &ContainsSet) -> CompileResult<Typed> {
        let needle = self.value(ctx, value)?;
        match set {
            ContainsSet::Values(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.value(ctx, item)?.sql);
                }
                Ok(Typed::predicate(SqlExpr::In {
                    expr: Box::new(needle.sql),
                    values,
                    negated: false,
                }))
            }
            ContainsSet::Query(query) => {
                let subquery = self.in_scope(|t| {
                    let state = t.node(query)?;
                    if state.row.len() != 1 {
                        return Err(TranslationError::invalid(
                            "Contains",
                            format!(
                                "the subquery must select one column, not {}",
                                state.row.len()
                            ),
                        )
                        .into());
                    }
                    t.finish(state, Finish::Nested)
                })?;
                Ok(Typed::predicate(SqlExpr::InSubquery {
                    expr: Box::new(needle.sql),
                    subquery: Box::new(subquery),
                    negated: false,
                }))
            }
        }
    }

    fn scalar_subquery(&mut self, query: &QueryNode) -> CompileResult<Typed> {
        self.in_scope(|t| {
            let state = t.node(query)?;
            let data_type = match state.row.as_slice() {
                [only] => only.data_type,
                row => {
                    return Err(TranslationError::invalid(
                        "scalar subquery",
                        format!("must produce one column, not {}", row.len()),
                    )
                    .into())
                }
            };
            let select = t.finish(state, Finish::Nested)?;
            Ok(Typed::value(SqlExpr::Subquery(Box::new(select)), data_type))
        })
    }
}

/// Primary keys of the driving source when the row still reads from it,
/// otherwise every column of the row.
pub(crate) fn minimal_projection(state: &mut SelectState) {
    if state.keys.is_empty()
        || state.group.is_some()
        || state.select.distinct
        || state.is_sealed()
    {
        return;
    }
    state.row = state
        .keys
        .iter()
        .map(|k| {
            let name = match k {
                SqlExpr::Column { column, .. } => column.clone(),
                _ => "Key".to_string(),
            };
            OutputColumn::new(&name, k.clone(), DataType::Unknown)
        })
        .collect();
}

fn literal(value: &Value) -> Typed {
    let data_type = value.data_type();
    let literal = match value {
        Value::Null => Literal::Null,
        Value::Bool(b) => Literal::Bool(*b),
        Value::Int(n) => Literal::Int(*n),
        Value::Float(x) => Literal::Float(*x),
        Value::String(s) => Literal::String(s.clone()),
    };
    Typed::value(SqlExpr::Literal(literal), data_type)
}

fn is_null(e: &Expr) -> bool {
    matches!(e, Expr::Literal(Value::Null))
}

fn comparison(op: BinaryOp) -> BinaryOperator {
    match op {
        BinaryOp::Eq => BinaryOperator::Eq,
        BinaryOp::Ne => BinaryOperator::Ne,
        BinaryOp::Lt => BinaryOperator::Lt,
        BinaryOp::Lte => BinaryOperator::Lte,
        BinaryOp::Gt => BinaryOperator::Gt,
        _ => BinaryOperator::Gte,
    }
}

/// Member-by-member equality of two composite values, paired by position.
fn compare_composite(
    op: BinaryOp,
    left: Vec<(String, Typed)>,
    right: Vec<(String, Typed)>,
) -> CompileResult<SqlExpr> {
    if left.len() != right.len() || left.is_empty() {
        return Err(TranslationError::invalid(
            "composite comparison",
            format!("{} members compared with {}", left.len(), right.len()),
        )
        .into());
    }
    let pairs = left.into_iter().zip(right).map(|((_, l), (_, r))| (l.sql, r.sql));
    let combined = match op {
        BinaryOp::Eq => SqlExpr::conjunction(pairs.map(|(l, r)| l.eq(r)).collect()),
        BinaryOp::Ne => SqlExpr::disjunction(
            pairs
                .map(|(l, r)| l.binary(BinaryOperator::Ne, r))
                .collect(),
        ),
        _ => {
            return Err(TranslationError::invalid(
                "composite comparison",
                "only == and != apply to composite values",
            )
            .into())
        }
    };
    combined.ok_or_else(|| TranslationError::invalid("composite comparison", "no members").into())
}

fn known_type(a: DataType, b: DataType) -> DataType {
    if a == DataType::Unknown {
        b
    } else {
        a
    }
}

fn numeric_type(a: DataType, b: DataType) -> DataType {
    use DataType::*;
    match (a, b) {
        (Float64, _) | (_, Float64) => Float64,
        (Decimal(p, s), _) | (_, Decimal(p, s)) => Decimal(p, s),
        (Int64, _) | (_, Int64) => Int64,
        (Unknown, other) => other,
        (other, _) => other,
    }
}
