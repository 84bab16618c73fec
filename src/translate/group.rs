//! Grouping and aggregates.
//!
//! A grouping swaps the row for its key columns and keeps the previous row
//! as the group's elements; aggregate arguments are resolved against those
//! elements. Aggregates over a filtered group never use a subquery: the
//! filter moves inside the aggregate as a CASE.

use crate::ast::{AggregateFn, DefaultValue, Expr, GroupKey, QueryNode};
use crate::compile::CompileResult;
use crate::sql::expr::{case_when, count_star, func, lit_int, ExprExt, SqlExpr};
use crate::sql::query::Select;
use crate::sql::types::DataType;

use super::filter::{Ctx, Typed};
use super::{GroupState, OutputColumn, SelectState, TranslationError, Translator};

impl Translator<'_> {
    // =========================================================================
    // GroupBy
    // =========================================================================

    pub(crate) fn group_by(
        &mut self,
        state: SelectState,
        key: &GroupKey,
    ) -> CompileResult<SelectState> {
        let mut state = if state.is_sealed()
            || state.is_paged()
            || state.select.distinct
            || state.group.is_some()
        {
            self.wrap(state)?
        } else {
            state
        };
        state.ordering.clear();

        let ctx = Ctx::of(&state);
        let (keys, single) = match key {
            GroupKey::Single(e) => match self.components(ctx, e)? {
                Some(parts) => (named(parts), false),
                None => {
                    let v = self.value(ctx, e)?;
                    (vec![OutputColumn::new("Key", v.sql, v.data_type)], true)
                }
            },
            GroupKey::Composite(members) => {
                let mut keys = Vec::with_capacity(members.len());
                for (name, e) in members {
                    let v = self.value(ctx, e)?;
                    keys.push(OutputColumn::new(name, v.sql, v.data_type));
                }
                (keys, false)
            }
            GroupKey::Entity(source) => {
                let members = self.scope.lookup(source)?.members();
                (members.into_iter().map(OutputColumn::from).collect(), false)
            }
        };
        if keys.is_empty() {
            return Err(TranslationError::invalid("GroupBy", "empty key").into());
        }

        // Constants cannot appear in GROUP BY; the whole input is one group.
        state.select.group_by = keys
            .iter()
            .filter(|k| !k.sql.is_constant())
            .map(|k| k.sql.clone())
            .collect();
        let elements = std::mem::replace(&mut state.row, keys.clone());
        state.group = Some(GroupState {
            keys,
            single,
            elements,
        });
        state.keys.clear();
        Ok(state)
    }

    /// An aggregate over the current group, used inside a projection,
    /// filter or ordering after `GroupBy`.
    pub(crate) fn group_aggregate(
        &mut self,
        ctx: Ctx<'_>,
        function: AggregateFn,
        arg: Option<&Expr>,
        filter: Option<&Expr>,
    ) -> CompileResult<Typed> {
        let group = ctx.group.ok_or_else(|| {
            TranslationError::invalid(function.name(), "aggregate outside a grouping")
        })?;
        let elements = Ctx {
            row: &group.elements,
            group: None,
        };
        let filter = filter.map(|p| self.predicate(elements, p)).transpose()?;
        let arg = arg.map(|a| self.value(elements, a)).transpose()?;
        aggregate_sql(function, arg, filter)
    }

    // =========================================================================
    // Scalar Aggregates
    // =========================================================================

    /// A terminal aggregate over the whole input: one row, one column named
    /// after the function.
    pub(crate) fn aggregate(
        &mut self,
        input: &QueryNode,
        function: AggregateFn,
        arg: Option<&Expr>,
        filter: Option<&Expr>,
    ) -> CompileResult<SelectState> {
        let (input, default) = match input {
            QueryNode::DefaultIfEmpty { input, default } => (input.as_ref(), default.as_ref()),
            other => (other, None),
        };
        if matches!(function, AggregateFn::Any | AggregateFn::All) {
            return self.existence(input, function, filter);
        }

        let state = self.node(input)?;
        let mut state = if state.is_sealed()
            || state.is_paged()
            || state.select.distinct
            || state.group.is_some()
        {
            self.wrap(state)?
        } else {
            state
        };
        state.ordering.clear();

        let ctx = Ctx::of(&state);
        let filter_sql = filter.map(|p| self.predicate(ctx, p)).transpose()?;
        let arg_typed = arg.map(|a| self.value(ctx, a)).transpose()?;
        let mut typed = aggregate_sql(function, arg_typed, filter_sql)?;

        let counting = matches!(function, AggregateFn::Count | AggregateFn::LongCount);
        if let (false, Some(fallback)) = (counting, default.and_then(|d| default_for(d, arg))) {
            let fallback = self.value(ctx, fallback)?;
            typed.sql = self
                .coalesce_sql(vec![typed.sql.clone(), fallback.sql])
                .unwrap_or(typed.sql);
        }

        state.row = vec![OutputColumn::new(function.name(), typed.sql, typed.data_type)];
        state.keys.clear();
        state.aggregated = true;
        Ok(state)
    }

    /// `Any`/`All` as `SELECT [NOT] EXISTS (...)` without a FROM.
    fn existence(
        &mut self,
        input: &QueryNode,
        function: AggregateFn,
        filter: Option<&Expr>,
    ) -> CompileResult<SelectState> {
        let all = function == AggregateFn::All;
        if all && filter.is_none() {
            return Err(TranslationError::invalid("All", "a predicate is required").into());
        }
        let subquery = self.exists_subquery(input, filter, all)?;
        let exists = Typed::predicate(SqlExpr::Exists {
            subquery: Box::new(subquery),
            negated: all,
        });
        let typed = self.as_value(exists);
        let mut state = SelectState::new(
            Select::new(),
            vec![OutputColumn::new(function.name(), typed.sql, DataType::Bool)],
            Vec::new(),
        );
        state.aggregated = true;
        Ok(state)
    }
}

fn named(parts: Vec<(String, Typed)>) -> Vec<OutputColumn> {
    parts
        .into_iter()
        .map(|(name, t)| OutputColumn::new(&name, t.sql, t.data_type))
        .collect()
}

/// SQL for one aggregate. A filter becomes a CASE inside the aggregate.
fn aggregate_sql(
    function: AggregateFn,
    arg: Option<Typed>,
    filter: Option<SqlExpr>,
) -> CompileResult<Typed> {
    let counted = |filter: Option<SqlExpr>| match filter {
        Some(p) => func("SUM", vec![case_when(p, lit_int(1), Some(lit_int(0)))]),
        None => count_star(),
    };

    let typed = match function {
        AggregateFn::Count => Typed::value(counted(filter), DataType::Int32),
        AggregateFn::LongCount => Typed::value(counted(filter), DataType::Int64),
        AggregateFn::Any => Typed::predicate(counted(filter).gt(lit_int(0))),
        AggregateFn::All => {
            let p = filter.ok_or_else(|| {
                TranslationError::invalid("All", "a predicate is required")
            })?;
            Typed::predicate(
                func("SUM", vec![case_when(p, lit_int(0), Some(lit_int(1)))]).eq(lit_int(0)),
            )
        }
        AggregateFn::Sum | AggregateFn::Min | AggregateFn::Max | AggregateFn::Average => {
            let arg = arg.ok_or_else(|| {
                TranslationError::invalid(function.name(), "an argument is required")
            })?;
            let input = match filter {
                Some(p) => case_when(p, arg.sql, None),
                None => arg.sql,
            };
            let (name, data_type) = match function {
                AggregateFn::Sum => ("SUM", arg.data_type),
                AggregateFn::Min => ("MIN", arg.data_type),
                AggregateFn::Max => ("MAX", arg.data_type),
                _ => (
                    "AVG",
                    match arg.data_type {
                        DataType::Decimal(p, s) => DataType::Decimal(p, s),
                        _ => DataType::Float64,
                    },
                ),
            };
            Typed::value(func(name, vec![input]), data_type)
        }
    };
    Ok(typed)
}

/// Default member matching an aggregate argument, or the only member.
fn default_for<'d>(default: &'d DefaultValue, arg: Option<&Expr>) -> Option<&'d Expr> {
    let by_name = match arg {
        Some(Expr::Field(name)) | Some(Expr::Member { member: name, .. }) => default.get(name),
        _ => None,
    };
    match (by_name, default.members.as_slice()) {
        (Some(e), _) => Some(e),
        (None, [(_, only)]) => Some(only),
        _ => None,
    }
}
