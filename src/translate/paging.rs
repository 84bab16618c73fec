//! Ordering, paging and single-element reductions.
//!
//! Skip and take are kept logical on the [`SelectState`] and composed as
//! they arrive; only [`Translator::apply_paging`] turns them into the
//! dialect's TOP, LIMIT/OFFSET, OFFSET/FETCH or ROW_NUMBER form.

use crate::ast::{Direction, ElementKind, Expr};
use crate::compile::CompileResult;
use crate::sql::dialect::PagingStrategy;
use crate::sql::expr::{lit_int, table_col, BinaryOperator, ExprExt, SqlExpr};
use crate::sql::query::{LimitOffset, OrderByExpr, Select, SelectExpr, SortDir, TableRef};

use super::filter::Ctx;
use super::{Finish, OrderingRequiredError, SelectState, Translator};

/// Hidden column carrying the row number under ROW_NUMBER paging.
const ROW_NUMBER: &str = "__rownum";

impl Translator<'_> {
    // =========================================================================
    // Ordering
    // =========================================================================

    /// `OrderBy`/`ThenBy`. Constant keys are dropped.
    pub(crate) fn order_by(
        &mut self,
        state: SelectState,
        key: &Expr,
        direction: Direction,
        then: bool,
    ) -> CompileResult<SelectState> {
        let mut state = if state.is_paged() || state.is_sealed() || state.select.distinct {
            self.wrap(state)?
        } else {
            state
        };
        if then && state.ordering.is_empty() {
            return Err(OrderingRequiredError::new("ThenBy").into());
        }

        let dir = match direction {
            Direction::Ascending => SortDir::Asc,
            Direction::Descending => SortDir::Desc,
        };
        let ctx = Ctx::of(&state);
        let sqls = match self.components(ctx, key)? {
            Some(parts) => parts.into_iter().map(|(_, t)| t.sql).collect(),
            None => vec![self.value(ctx, key)?.sql],
        };
        let items: Vec<OrderByExpr> = sqls
            .into_iter()
            .filter(|sql| !sql.is_constant())
            .map(|expr| OrderByExpr { expr, dir })
            .collect();

        if !then {
            state.ordering.clear();
        }
        state.ordering.extend(items);
        Ok(state)
    }

    pub(crate) fn reverse(&mut self, state: SelectState) -> CompileResult<SelectState> {
        let mut state = if state.is_paged() || state.is_sealed() {
            self.wrap(state)?
        } else {
            state
        };
        if state.ordering.is_empty() {
            return Err(OrderingRequiredError::new("Reverse").into());
        }
        invert(&mut state.ordering);
        Ok(state)
    }

    // =========================================================================
    // Paging
    // =========================================================================

    /// `Skip`/`Take`, composed with any paging already on the state.
    pub(crate) fn page(
        &mut self,
        state: SelectState,
        skip: Option<u64>,
        take: Option<u64>,
    ) -> CompileResult<SelectState> {
        let skip = skip.filter(|s| *s > 0);
        let mut state = if state.is_sealed() {
            self.wrap(state)?
        } else {
            state
        };
        // Row numbers over DISTINCT would be computed before duplicates collapse.
        if skip.is_some()
            && state.select.distinct
            && self.dialect.paging_strategy == PagingStrategy::RowNumber
        {
            state = self.wrap(state)?;
        }

        if let Some(s) = skip {
            state.skip = Some(state.skip.unwrap_or(0).saturating_add(s));
            state.take = state.take.map(|t| t.saturating_sub(s));
        }
        if let Some(t) = take {
            state.take = Some(state.take.map_or(t, |current| current.min(t)));
        }
        Ok(state)
    }

    /// `SkipLast`/`TakeLast`: page the inverted ordering, then restore it
    /// outside.
    pub(crate) fn page_from_end(
        &mut self,
        state: SelectState,
        skip: Option<u64>,
        take: Option<u64>,
    ) -> CompileResult<SelectState> {
        let operation = if take.is_some() { "TakeLast" } else { "SkipLast" };
        let mut state = if state.is_paged() || state.is_sealed() {
            self.wrap(state)?
        } else {
            state
        };
        if state.ordering.is_empty() {
            return Err(OrderingRequiredError::new(operation).into());
        }
        invert(&mut state.ordering);
        let paged = self.page(state, skip, take)?;
        let mut state = self.wrap(paged)?;
        invert(&mut state.ordering);
        Ok(state)
    }

    /// `First`, `Single`, `Last` and `ElementAt`. `Single` reads two rows
    /// so the caller can tell "exactly one" from "more than one".
    pub(crate) fn element(
        &mut self,
        state: SelectState,
        kind: ElementKind,
    ) -> CompileResult<SelectState> {
        match kind {
            ElementKind::First => self.page(state, None, Some(1)),
            ElementKind::Single => self.page(state, None, Some(2)),
            ElementKind::ElementAt(n) => self.page(state, Some(n), Some(1)),
            ElementKind::Last => {
                let mut state = if state.is_paged() || state.is_sealed() {
                    self.wrap(state)?
                } else {
                    state
                };
                if state.ordering.is_empty() {
                    return Err(OrderingRequiredError::new("Last").into());
                }
                invert(&mut state.ordering);
                self.page(state, None, Some(1))
            }
        }
    }

    // =========================================================================
    // Dialect Paging
    // =========================================================================

    /// Apply logical skip/take to a finished select.
    pub(crate) fn apply_paging(
        &mut self,
        mut select: Select,
        skip: Option<u64>,
        take: Option<u64>,
        finish: Finish,
    ) -> Select {
        let skip = skip.filter(|s| *s > 0);
        if skip.is_none() && take.is_none() {
            return select;
        }
        // OFFSET/FETCH and ROW_NUMBER windows need at least one row to fetch.
        if take == Some(0) && self.dialect.paging_strategy != PagingStrategy::LimitOffset {
            select.top = Some(0);
            return select;
        }
        match (self.dialect.paging_strategy, skip) {
            (PagingStrategy::LimitOffset, _) => {
                select.limit_offset = Some(LimitOffset {
                    limit: take,
                    offset: skip,
                });
                select
            }
            (PagingStrategy::OffsetFetch, None) | (PagingStrategy::RowNumber, None) => {
                select.top = take;
                select
            }
            (PagingStrategy::OffsetFetch, Some(_)) => {
                select.limit_offset = Some(LimitOffset {
                    limit: take,
                    offset: skip,
                });
                select
            }
            (PagingStrategy::RowNumber, Some(s)) => self.row_number_page(select, s, take, finish),
        }
    }

    /// Number the rows in a derived table and filter on the number.
    fn row_number_page(
        &mut self,
        mut inner: Select,
        skip: u64,
        take: Option<u64>,
        finish: Finish,
    ) -> Select {
        let alias = self.scope.reserve_alias("");
        let names: Vec<String> = inner
            .output_names()
            .into_iter()
            .flatten()
            .map(String::from)
            .collect();
        let order_by = std::mem::take(&mut inner.order_by);
        inner
            .select
            .push(SelectExpr::new(SqlExpr::RowNumber { order_by }).with_alias(ROW_NUMBER));

        let rn = table_col(&alias, ROW_NUMBER);
        let mut outer = Select::new().from(TableRef::derived(inner, &alias));
        outer.select = names
            .iter()
            .map(|n| SelectExpr::new(table_col(&alias, n)).with_alias(n))
            .collect();
        outer.and_where(rn.clone().gt(lit_int(skip as i64)));
        if let Some(t) = take {
            outer.and_where(
                rn.clone()
                    .binary(BinaryOperator::Lte, lit_int(skip.saturating_add(t) as i64)),
            );
        }
        if finish == Finish::Statement {
            outer.order_by = vec![OrderByExpr::asc(rn)];
        }
        outer
    }
}

fn invert(ordering: &mut [OrderByExpr]) {
    for ob in ordering.iter_mut() {
        ob.dir = ob.dir.reversed();
    }
}
