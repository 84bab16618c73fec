//! Typed query builder.

use std::sync::Arc;

use super::expr::{AggregateFn, Expr};
use super::{
    CastTarget, DefaultValue, Direction, ElementKind, GroupKey, JoinKind, QueryNode, SetOpKind,
};
use crate::metadata::Entity;

/// Immutable handle on a query chain.
///
/// Every method returns a new `Query` whose root is the new operation; the
/// receiver's nodes are shared, not copied.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "Query has no effect until compiled"]
pub struct Query {
    node: Arc<QueryNode>,
}

impl Query {
    // =========================================================================
    // Sources
    // =========================================================================

    /// Rows of `entity`, referenced as `alias` in member expressions.
    pub fn from_entity(entity: &str, alias: &str) -> Self {
        Self::wrap(QueryNode::Source {
            entity: entity.into(),
            alias: alias.into(),
            table: None,
        })
    }

    /// Rows of a typed entity.
    pub fn of<E: Entity>(alias: &str) -> Self {
        Self::from_entity(E::NAME, alias)
    }

    /// Read the source from another physical table with the same shape.
    ///
    /// Only valid directly on a source; on any other node it is ignored.
    pub fn from_table(self, table: &str) -> Self {
        match self.node.as_ref() {
            QueryNode::Source { entity, alias, .. } => Self::wrap(QueryNode::Source {
                entity: entity.clone(),
                alias: alias.clone(),
                table: Some(table.into()),
            }),
            _ => self,
        }
    }

    pub fn node(&self) -> &Arc<QueryNode> {
        &self.node
    }

    pub fn into_node(self) -> Arc<QueryNode> {
        self.node
    }

    fn wrap(node: QueryNode) -> Self {
        Self {
            node: Arc::new(node),
        }
    }

    // =========================================================================
    // Row Operations
    // =========================================================================

    pub fn filter(self, predicate: Expr) -> Self {
        Self::wrap(QueryNode::Filter {
            input: self.node,
            predicate,
        })
    }

    pub fn select(self, columns: Vec<(&str, Expr)>) -> Self {
        Self::wrap(QueryNode::Project {
            input: self.node,
            columns: columns
                .into_iter()
                .map(|(name, expr)| (name.to_string(), expr))
                .collect(),
        })
    }

    pub fn distinct(self) -> Self {
        Self::wrap(QueryNode::Distinct { input: self.node })
    }

    /// Restrict the row to the listed members.
    pub fn cast_to(self, members: Vec<&str>) -> Self {
        Self::wrap(QueryNode::Cast {
            input: self.node,
            target: CastTarget::Members(members.into_iter().map(String::from).collect()),
        })
    }

    /// Restrict the row to the members of another entity.
    pub fn cast_to_entity(self, entity: &str) -> Self {
        Self::wrap(QueryNode::Cast {
            input: self.node,
            target: CastTarget::Entity(entity.into()),
        })
    }

    pub fn default_if_empty(self, default: Option<DefaultValue>) -> Self {
        Self::wrap(QueryNode::DefaultIfEmpty {
            input: self.node,
            default,
        })
    }

    /// Command timeout handed to the execution boundary.
    pub fn timeout(self, seconds: u32) -> Self {
        Self::wrap(QueryNode::Timeout {
            input: self.node,
            seconds,
        })
    }

    // =========================================================================
    // Joins
    // =========================================================================

    /// INNER JOIN on `left_key = right_key`.
    pub fn join(self, right: Query, left_key: Expr, right_key: Expr) -> Self {
        self.join_with(right, JoinKind::Inner, left_key, right_key, None)
    }

    /// LEFT OUTER JOIN; `default` supplies values for unmatched right rows.
    pub fn left_join(
        self,
        right: Query,
        left_key: Expr,
        right_key: Expr,
        default: Option<DefaultValue>,
    ) -> Self {
        self.join_with(right, JoinKind::OuterWithDefault, left_key, right_key, default)
    }

    fn join_with(
        self,
        right: Query,
        kind: JoinKind,
        left_key: Expr,
        right_key: Expr,
        default: Option<DefaultValue>,
    ) -> Self {
        Self::wrap(QueryNode::Join {
            left: self.node,
            right: right.node,
            kind,
            left_key,
            right_key,
            default,
        })
    }

    // =========================================================================
    // Grouping
    // =========================================================================

    pub fn group_by(self, key: Expr) -> Self {
        self.group_by_key(GroupKey::Single(key))
    }

    pub fn group_by_composite(self, members: Vec<(&str, Expr)>) -> Self {
        self.group_by_key(GroupKey::Composite(
            members
                .into_iter()
                .map(|(name, expr)| (name.to_string(), expr))
                .collect(),
        ))
    }

    /// Group by every readable column of a bound source.
    pub fn group_by_entity(self, source: &str) -> Self {
        self.group_by_key(GroupKey::Entity(source.into()))
    }

    fn group_by_key(self, key: GroupKey) -> Self {
        Self::wrap(QueryNode::GroupBy {
            input: self.node,
            key,
        })
    }

    // =========================================================================
    // Ordering
    // =========================================================================

    pub fn order_by(self, key: Expr) -> Self {
        self.ordering(key, Direction::Ascending, false)
    }

    pub fn order_by_desc(self, key: Expr) -> Self {
        self.ordering(key, Direction::Descending, false)
    }

    pub fn then_by(self, key: Expr) -> Self {
        self.ordering(key, Direction::Ascending, true)
    }

    pub fn then_by_desc(self, key: Expr) -> Self {
        self.ordering(key, Direction::Descending, true)
    }

    fn ordering(self, key: Expr, direction: Direction, then: bool) -> Self {
        Self::wrap(QueryNode::OrderBy {
            input: self.node,
            key,
            direction,
            then,
        })
    }

    pub fn reverse(self) -> Self {
        Self::wrap(QueryNode::Reverse { input: self.node })
    }

    // =========================================================================
    // Paging
    // =========================================================================

    pub fn skip(self, n: u64) -> Self {
        self.paging(Some(n), None, false)
    }

    pub fn take(self, n: u64) -> Self {
        self.paging(None, Some(n), false)
    }

    pub fn skip_last(self, n: u64) -> Self {
        self.paging(Some(n), None, true)
    }

    pub fn take_last(self, n: u64) -> Self {
        self.paging(None, Some(n), true)
    }

    fn paging(self, skip: Option<u64>, take: Option<u64>, from_end: bool) -> Self {
        Self::wrap(QueryNode::Paging {
            input: self.node,
            skip,
            take,
            from_end,
        })
    }

    /// Compiles like [`filter`](Self::filter).
    pub fn take_while(self, predicate: Expr) -> Self {
        Self::wrap(QueryNode::TakeWhile {
            input: self.node,
            predicate,
        })
    }

    /// Compiles like a [`filter`](Self::filter) on the negated predicate.
    pub fn skip_while(self, predicate: Expr) -> Self {
        Self::wrap(QueryNode::SkipWhile {
            input: self.node,
            predicate,
        })
    }

    // =========================================================================
    // Set Operations
    // =========================================================================

    pub fn union(self, other: Query) -> Self {
        self.set_op(SetOpKind::Union, other)
    }

    /// UNION ALL.
    pub fn concat(self, other: Query) -> Self {
        self.set_op(SetOpKind::Concat, other)
    }

    pub fn intersect(self, other: Query) -> Self {
        self.set_op(SetOpKind::Intersect, other)
    }

    pub fn except(self, other: Query) -> Self {
        self.set_op(SetOpKind::Except, other)
    }

    fn set_op(self, kind: SetOpKind, other: Query) -> Self {
        Self::wrap(QueryNode::SetOp {
            kind,
            left: self.node,
            right: other.node,
        })
    }

    // =========================================================================
    // Scalar Aggregates
    // =========================================================================

    pub fn count(self) -> Self {
        self.aggregate(AggregateFn::Count, None, None)
    }

    pub fn count_where(self, predicate: Expr) -> Self {
        self.aggregate(AggregateFn::Count, None, Some(predicate))
    }

    pub fn long_count(self) -> Self {
        self.aggregate(AggregateFn::LongCount, None, None)
    }

    pub fn sum(self, arg: Expr) -> Self {
        self.aggregate(AggregateFn::Sum, Some(arg), None)
    }

    pub fn min(self, arg: Expr) -> Self {
        self.aggregate(AggregateFn::Min, Some(arg), None)
    }

    pub fn max(self, arg: Expr) -> Self {
        self.aggregate(AggregateFn::Max, Some(arg), None)
    }

    pub fn average(self, arg: Expr) -> Self {
        self.aggregate(AggregateFn::Average, Some(arg), None)
    }

    pub fn any(self) -> Self {
        self.aggregate(AggregateFn::Any, None, None)
    }

    pub fn any_where(self, predicate: Expr) -> Self {
        self.aggregate(AggregateFn::Any, None, Some(predicate))
    }

    pub fn all(self, predicate: Expr) -> Self {
        self.aggregate(AggregateFn::All, None, Some(predicate))
    }

    fn aggregate(self, function: AggregateFn, arg: Option<Expr>, filter: Option<Expr>) -> Self {
        Self::wrap(QueryNode::Aggregate {
            input: self.node,
            function,
            arg,
            filter,
        })
    }

    // =========================================================================
    // Element Reductions
    // =========================================================================

    pub fn first(self) -> Self {
        self.element(ElementKind::First, false)
    }

    pub fn first_or_default(self) -> Self {
        self.element(ElementKind::First, true)
    }

    pub fn single(self) -> Self {
        self.element(ElementKind::Single, false)
    }

    pub fn single_or_default(self) -> Self {
        self.element(ElementKind::Single, true)
    }

    pub fn last(self) -> Self {
        self.element(ElementKind::Last, false)
    }

    pub fn last_or_default(self) -> Self {
        self.element(ElementKind::Last, true)
    }

    pub fn element_at(self, index: u64) -> Self {
        self.element(ElementKind::ElementAt(index), false)
    }

    pub fn element_at_or_default(self, index: u64) -> Self {
        self.element(ElementKind::ElementAt(index), true)
    }

    fn element(self, kind: ElementKind, or_default: bool) -> Self {
        Self::wrap(QueryNode::Element {
            input: self.node,
            kind,
            or_default,
            message: None,
        })
    }

    /// Message reported when a required row is missing.
    ///
    /// Applies to the element reduction at the root of the chain, looking
    /// through a trailing timeout; otherwise the query is unchanged.
    pub fn no_result_error(self, message: &str) -> Self {
        match self.node.as_ref() {
            QueryNode::Element {
                input,
                kind,
                or_default,
                ..
            } => Self::wrap(QueryNode::Element {
                input: input.clone(),
                kind: *kind,
                or_default: *or_default,
                message: Some(message.into()),
            }),
            QueryNode::Timeout { input, seconds } => {
                let inner = Query {
                    node: input.clone(),
                }
                .no_result_error(message);
                inner.timeout(*seconds)
            }
            _ => self,
        }
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// `DELETE` the rows this query selects.
    pub fn delete(self) -> Self {
        Self::wrap(QueryNode::Delete { input: self.node })
    }

    /// `UPDATE` the rows this query selects, assigning each listed member.
    pub fn update(self, assignments: Vec<(&str, Expr)>) -> Self {
        Self::wrap(QueryNode::Update {
            input: self.node,
            assignments: assignments
                .into_iter()
                .map(|(member, expr)| (member.to_string(), expr))
                .collect(),
        })
    }

    /// `INSERT` the rows of `rows` into this source. Each column of `rows`
    /// names the target member it fills.
    pub fn insert(self, rows: Query) -> Self {
        Self::wrap(QueryNode::Insert {
            target: self.node,
            input: rows.node,
        })
    }
}

impl From<Query> for Arc<QueryNode> {
    fn from(query: Query) -> Self {
        query.node
    }
}

impl From<Arc<QueryNode>> for Query {
    fn from(node: Arc<QueryNode>) -> Self {
        Self { node }
    }
}
