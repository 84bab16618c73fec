//! Query tree to SELECT translation.
//!
//! The [`Translator`] walks a [`QueryNode`] chain bottom-up. Each node is
//! routed to the translator for its operation family, which extends a
//! [`SelectState`] in place or wraps it as a derived table first when the
//! new clause cannot be added to the current SELECT (a filter after paging,
//! anything after a set operation, a second grouping, ...).
//!
//! ```text
//! QueryNode ──▶ dispatch ──▶ filter / join / group / set_op / paging
//!                               │            │
//!                               ▼            ▼
//!                          AliasManager  MetadataRegistry
//!                               │
//!                               ▼
//!                         SelectState ──▶ finish ──▶ Select
//! ```
//!
//! Delete, Update and Insert roots go through
//! [`Translator::translate_command`] instead and produce a
//! [`Command`](crate::sql::dml::Command).

mod command;
mod error;
mod filter;
mod functions;
mod group;
mod join;
mod paging;
mod projection;
pub mod scope;
mod set_op;

use std::sync::Arc;

use serde::Serialize;

use crate::ast::slots::SlotInfo;
use crate::ast::{Expr, QueryNode};
use crate::compile::CompileResult;
use crate::metadata::{MetadataRegistry, TableMetadata};
use crate::sql::dialect::DialectProfile;
use crate::sql::expr::{table_col, SqlExpr};
use crate::sql::query::{OrderByExpr, Select, SelectExpr, TableRef};
use crate::sql::types::DataType;

pub use command::TranslatedCommand;
pub use error::{
    DialectUnsupportedError, OrderingRequiredError, SchemaMismatchError, TranslationError,
};
use scope::{AliasManager, Binding, ResolvedMember};

// =============================================================================
// Translation State
// =============================================================================

/// One named column of the current row.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OutputColumn {
    pub name: String,
    pub sql: SqlExpr,
    pub data_type: DataType,
}

impl OutputColumn {
    pub fn new(name: &str, sql: SqlExpr, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            sql,
            data_type,
        }
    }

    fn select_expr(&self) -> SelectExpr {
        SelectExpr::new(self.sql.clone()).with_alias(&self.name)
    }
}

impl From<ResolvedMember> for OutputColumn {
    fn from(m: ResolvedMember) -> Self {
        Self {
            name: m.name,
            sql: m.sql,
            data_type: m.data_type,
        }
    }
}

/// An active GROUP BY.
///
/// Key expressions are emitted once into GROUP BY and cloned into every
/// clause that reads `Key`, so all references are textually identical.
#[derive(Debug, Clone)]
pub(crate) struct GroupState {
    /// `Key` for a single key, member names otherwise.
    pub keys: Vec<OutputColumn>,
    pub single: bool,
    /// Row before grouping; aggregate arguments resolve against it.
    pub elements: Vec<OutputColumn>,
}

/// A SELECT under construction.
///
/// The select list is built from `row` only when the state is finished, so
/// projections can be replaced freely until then. Ordering and paging are
/// kept logical for the same reason.
#[derive(Debug, Clone)]
pub(crate) struct SelectState {
    pub select: Select,
    pub row: Vec<OutputColumn>,
    pub ordering: Vec<OrderByExpr>,
    pub skip: Option<u64>,
    pub take: Option<u64>,
    pub group: Option<GroupState>,
    /// Primary-key expressions of the driving source, for EXISTS projections.
    pub keys: Vec<SqlExpr>,
    /// Collapsed to one row by a scalar aggregate.
    pub aggregated: bool,
    /// Sources joined onto the row. Their members stay readable after a
    /// wrap even though the row does not expose them.
    pub joined: Vec<String>,
}

impl SelectState {
    fn new(select: Select, row: Vec<OutputColumn>, keys: Vec<SqlExpr>) -> Self {
        Self {
            select,
            row,
            ordering: Vec::new(),
            skip: None,
            take: None,
            group: None,
            keys,
            aggregated: false,
            joined: Vec::new(),
        }
    }

    pub fn is_paged(&self) -> bool {
        self.skip.is_some() || self.take.is_some()
    }

    /// No clause may be added without wrapping first.
    pub fn is_sealed(&self) -> bool {
        self.select.is_compound() || self.aggregated
    }

    pub fn column(&self, name: &str) -> Option<&OutputColumn> {
        self.row.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

/// Where a finished select ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Finish {
    /// The outermost statement: ordering is always emitted.
    Statement,
    /// Derived table or subquery: ordering only survives alongside paging.
    Nested,
}

/// Name and type of one result column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ResultColumn {
    pub name: String,
    pub data_type: DataType,
}

/// Output of [`Translator::translate`].
#[derive(Debug, Clone)]
pub struct Translated {
    pub select: Select,
    pub shape: Vec<ResultColumn>,
    pub timeout: Option<u32>,
}

// =============================================================================
// Translator
// =============================================================================

/// Translates one statement. Not reusable across statements: aliases are
/// unique per translator.
pub struct Translator<'a> {
    registry: &'a MetadataRegistry,
    dialect: &'a DialectProfile,
    slots: &'a [SlotInfo],
    scope: AliasManager,
    timeout: Option<u32>,
}

impl<'a> Translator<'a> {
    pub fn new(
        registry: &'a MetadataRegistry,
        dialect: &'a DialectProfile,
        slots: &'a [SlotInfo],
    ) -> Self {
        Self {
            registry,
            dialect,
            slots,
            scope: AliasManager::new(),
            timeout: None,
        }
    }

    /// Translate a whole statement.
    pub fn translate(&mut self, root: &QueryNode) -> CompileResult<Translated> {
        let state = self.node(root)?;
        let shape = state
            .row
            .iter()
            .map(|c| ResultColumn {
                name: c.name.clone(),
                data_type: c.data_type,
            })
            .collect();
        let select = self.finish(state, Finish::Statement)?;
        Ok(Translated {
            select,
            shape,
            timeout: self.timeout,
        })
    }

    /// Dispatch one node to its translator.
    pub(crate) fn node(&mut self, node: &QueryNode) -> CompileResult<SelectState> {
        match node {
            QueryNode::Source {
                entity,
                alias,
                table,
            } => self.source(entity, alias, table.as_deref()),
            QueryNode::Filter { input, predicate } => {
                let state = self.node(input)?;
                self.filter(state, predicate)
            }
            QueryNode::Project { input, columns } => {
                let state = self.node(input)?;
                self.project(state, columns)
            }
            QueryNode::Join {
                left,
                right,
                kind,
                left_key,
                right_key,
                default,
            } => self.join(left, right, *kind, left_key, right_key, default.as_ref()),
            QueryNode::GroupBy { input, key } => {
                let state = self.node(input)?;
                self.group_by(state, key)
            }
            QueryNode::OrderBy {
                input,
                key,
                direction,
                then,
            } => {
                let state = self.node(input)?;
                self.order_by(state, key, *direction, *then)
            }
            QueryNode::Reverse { input } => {
                let state = self.node(input)?;
                self.reverse(state)
            }
            QueryNode::SetOp { kind, left, right } => self.set_op(*kind, left, right),
            QueryNode::Paging {
                input,
                skip,
                take,
                from_end,
            } => {
                let state = self.node(input)?;
                if *from_end {
                    self.page_from_end(state, *skip, *take)
                } else {
                    self.page(state, *skip, *take)
                }
            }
            // Read over a set: TakeWhile keeps matching rows, SkipWhile the rest.
            QueryNode::TakeWhile { input, predicate } => {
                let state = self.node(input)?;
                self.filter(state, predicate)
            }
            QueryNode::SkipWhile { input, predicate } => {
                let state = self.node(input)?;
                self.filter(state, &Expr::Not(Box::new(predicate.clone())))
            }
            QueryNode::Distinct { input } => {
                let state = self.node(input)?;
                self.distinct(state)
            }
            QueryNode::Cast { input, target } => {
                let state = self.node(input)?;
                self.cast(state, target)
            }
            QueryNode::DefaultIfEmpty { .. } => Err(TranslationError::unsupported(
                node.operation(),
                "only valid on the optional side of a join or before an aggregate",
            )
            .into()),
            QueryNode::Aggregate {
                input,
                function,
                arg,
                filter,
            } => self.aggregate(input, *function, arg.as_ref(), filter.as_ref()),
            QueryNode::Element { input, kind, .. } => {
                let state = self.node(input)?;
                self.element(state, *kind)
            }
            QueryNode::Timeout { input, seconds } => {
                self.timeout = Some(*seconds);
                self.node(input)
            }
            QueryNode::Delete { .. } | QueryNode::Update { .. } | QueryNode::Insert { .. } => {
                Err(TranslationError::unsupported(
                    node.operation(),
                    "only valid at the root of a statement",
                )
                .into())
            }
        }
    }

    fn source(
        &mut self,
        entity: &str,
        alias: &str,
        table: Option<&str>,
    ) -> CompileResult<SelectState> {
        let (from, metadata, physical) = self.bind_source(entity, alias, table)?;
        let keys = metadata
            .keys()
            .map(|c| table_col(&physical, &c.column))
            .collect();
        let row = self
            .scope
            .lookup(alias)?
            .members()
            .into_iter()
            .map(OutputColumn::from)
            .collect();
        Ok(SelectState::new(Select::new().from(from), row, keys))
    }

    /// Resolve an entity, reserve its alias and bind it in the current frame.
    pub(crate) fn bind_source(
        &mut self,
        entity: &str,
        alias: &str,
        table: Option<&str>,
    ) -> CompileResult<(TableRef, Arc<TableMetadata>, String)> {
        let metadata = self.registry.resolve(entity)?;
        let physical = self.scope.reserve_alias(alias);
        let from = TableRef::table(
            metadata.schema.as_deref(),
            table.unwrap_or(&metadata.table),
            &physical,
        );
        self.scope
            .bind(Binding::table(alias, &physical, Arc::clone(&metadata)));
        Ok((from, metadata, physical))
    }

    /// Run `f` in a nested scope frame, leaving the frame on every path.
    pub(crate) fn in_scope<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> CompileResult<T>,
    ) -> CompileResult<T> {
        self.scope.enter_scope();
        let result = f(self);
        self.scope.exit_scope();
        result
    }

    // =========================================================================
    // Wrapping and Finishing
    // =========================================================================

    /// Turn the current SELECT into a derived table and select from it.
    ///
    /// Row columns keep their names. Orderings that are not row columns are
    /// carried through hidden columns so the outer query can still sort on
    /// them, and so are the members of joined sources (`<source>__<member>`).
    /// Bindings of the current frame are rebound to the derived table's
    /// columns; any other member the row does not expose becomes
    /// unresolvable.
    pub(crate) fn wrap(&mut self, state: SelectState) -> CompileResult<SelectState> {
        let alias = self.scope.reserve_alias("");
        let outer_col = |c: &OutputColumn| {
            OutputColumn::new(&c.name, table_col(&alias, &c.name), c.data_type)
        };
        let row: Vec<OutputColumn> = state.row.iter().map(outer_col).collect();

        if state.select.is_compound() {
            self.scope.replace_current(Vec::new());
            let from = TableRef::derived(state.select, &alias);
            return Ok(SelectState::new(Select::new().from(from), row, Vec::new()));
        }

        let mut hidden = Vec::new();
        let mut ordering = Vec::new();
        for (i, ob) in state.ordering.iter().enumerate() {
            let name = match state.row.iter().find(|c| c.sql == ob.expr) {
                Some(c) => c.name.clone(),
                // Extra columns would change what DISTINCT compares.
                None if state.select.distinct => continue,
                None => {
                    let name = format!("__order{}", i);
                    hidden.push(OutputColumn::new(&name, ob.expr.clone(), DataType::Unknown));
                    name
                }
            };
            ordering.push(OrderByExpr {
                expr: table_col(&alias, &name),
                dir: ob.dir,
            });
        }

        let keys = state
            .keys
            .iter()
            .map(|k| state.row.iter().find(|c| c.sql == *k))
            .collect::<Option<Vec<_>>>()
            .map(|cols| cols.into_iter().map(|c| table_col(&alias, &c.name)).collect())
            .unwrap_or_default();

        // Grouped or aggregated rows cannot read ungrouped columns.
        let carry = state.group.is_none() && !state.aggregated;
        let mut rebound = Vec::new();
        for binding in self.scope.current() {
            let joined = carry
                && state
                    .joined
                    .iter()
                    .any(|j| j.eq_ignore_ascii_case(&binding.source));
            let mut members = Vec::new();
            for m in binding.members() {
                let name = match state.row.iter().find(|c| c.sql == m.sql) {
                    Some(c) => c.name.clone(),
                    None if joined => {
                        let name = format!("{}__{}", binding.source, m.name);
                        hidden.push(OutputColumn::new(&name, m.sql.clone(), m.data_type));
                        name
                    }
                    None => continue,
                };
                members.push(ResolvedMember {
                    name: m.name,
                    sql: table_col(&alias, &name),
                    data_type: m.data_type,
                });
            }
            rebound.push(Binding::rebound(&binding.source, members));
        }
        self.scope.replace_current(rebound);

        let joined = if carry { state.joined.clone() } else { Vec::new() };
        let inner = self.finish_with(state, hidden, Finish::Nested)?;
        let mut wrapped = SelectState::new(
            Select::new().from(TableRef::derived(inner, &alias)),
            row,
            keys,
        );
        wrapped.ordering = ordering;
        wrapped.joined = joined;
        Ok(wrapped)
    }

    /// Build the final SELECT for a state.
    pub(crate) fn finish(&mut self, state: SelectState, finish: Finish) -> CompileResult<Select> {
        self.finish_with(state, Vec::new(), finish)
    }

    fn finish_with(
        &mut self,
        state: SelectState,
        hidden: Vec<OutputColumn>,
        finish: Finish,
    ) -> CompileResult<Select> {
        if state.select.is_compound() {
            return Ok(state.select);
        }
        let paged = state.is_paged();
        let mut select = state.select;
        select.select = state
            .row
            .iter()
            .chain(hidden.iter())
            .map(OutputColumn::select_expr)
            .collect();
        if finish == Finish::Statement || paged {
            select.order_by = state.ordering;
        }
        if paged {
            select = self.apply_paging(select, state.skip, state.take, finish);
        }
        Ok(select)
    }
}
