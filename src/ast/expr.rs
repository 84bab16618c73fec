//! Logical expressions used inside query nodes.

use std::sync::Arc;

use serde::Serialize;

use super::{QueryNode, Value};

// =============================================================================
// Expression AST
// =============================================================================

/// A logical expression.
///
/// Member references are resolved by the translator against the bindings in
/// scope, so the same expression can be used before or after a subquery
/// boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Expr {
    /// Member of a named source: `u.Username`. Searches enclosing scopes.
    Member { source: String, member: String },
    /// Member of the current row.
    Field(String),
    /// Constant written by the caller.
    Literal(Value),
    /// Named captured value, always bound.
    Param { name: String, value: Value },
    /// Parameter slot, assigned by [`slots::abstract_literals`](super::slots::abstract_literals).
    Slot(usize),
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Not(Box<Expr>),
    Negate(Box<Expr>),
    /// `a ?? b ?? c`
    Coalesce(Vec<Expr>),
    /// `test ? then : otherwise`
    Conditional {
        test: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// String or scalar function applied to `target`.
    Call {
        function: ScalarFn,
        target: Box<Expr>,
        args: Vec<Expr>,
    },
    /// `query.Any(predicate)` in expression position.
    Any {
        query: Arc<QueryNode>,
        predicate: Option<Box<Expr>>,
    },
    /// `query.All(predicate)` in expression position.
    All {
        query: Arc<QueryNode>,
        predicate: Box<Expr>,
    },
    /// `set.Contains(value)`
    Contains { value: Box<Expr>, set: ContainsSet },
    /// Anonymous object: named members compared member by member.
    Composite(Vec<(String, Expr)>),
    /// Group key.
    Key,
    /// Member of a composite or entity group key.
    KeyMember(String),
    /// Aggregate over the current group. `filter` restricts the rows fed to it.
    Aggregate {
        function: AggregateFn,
        arg: Option<Box<Expr>>,
        filter: Option<Box<Expr>>,
    },
    /// Scalar subquery: a query ending in an aggregate or element reduction.
    Scalar(Arc<QueryNode>),
}

/// Right-hand side of `Contains`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ContainsSet {
    Values(Vec<Expr>),
    Query(Arc<QueryNode>),
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Concat,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Lte | BinaryOp::Gt | BinaryOp::Gte
        )
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }
}

/// Aggregate functions, for groups and whole queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AggregateFn {
    Count,
    LongCount,
    Sum,
    Min,
    Max,
    Average,
    Any,
    All,
}

impl AggregateFn {
    /// Operation name; also the result column of a scalar aggregate.
    pub fn name(self) -> &'static str {
        match self {
            AggregateFn::Count => "Count",
            AggregateFn::LongCount => "LongCount",
            AggregateFn::Sum => "Sum",
            AggregateFn::Min => "Min",
            AggregateFn::Max => "Max",
            AggregateFn::Average => "Average",
            AggregateFn::Any => "Any",
            AggregateFn::All => "All",
        }
    }
}

/// String and scalar functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ScalarFn {
    Contains,
    StartsWith,
    EndsWith,
    /// Takes the empty string as its argument, so it is bound like any
    /// other string.
    IsNullOrEmpty,
    Replace,
    /// 0-based start, optional length.
    Substring,
    /// 0-based result, -1 when absent.
    IndexOf,
    ToUpper,
    ToLower,
    Trim,
    TrimStart,
    TrimEnd,
    Length,
}

impl ScalarFn {
    /// Functions compiled to LIKE patterns.
    pub fn is_pattern(self) -> bool {
        matches!(self, ScalarFn::Contains | ScalarFn::StartsWith | ScalarFn::EndsWith)
    }
}

// =============================================================================
// Expression Constructors
// =============================================================================

/// Member of a named source.
pub fn member(source: &str, name: &str) -> Expr {
    Expr::Member {
        source: source.into(),
        member: name.into(),
    }
}

/// Member of the current row.
pub fn field(name: &str) -> Expr {
    Expr::Field(name.into())
}

/// Constant.
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Literal(value.into())
}

/// Named captured value.
pub fn param(name: &str, value: impl Into<Value>) -> Expr {
    Expr::Param {
        name: name.into(),
        value: value.into(),
    }
}

/// Group key.
pub fn key() -> Expr {
    Expr::Key
}

/// Member of a composite group key.
pub fn key_member(name: &str) -> Expr {
    Expr::KeyMember(name.into())
}

/// Anonymous object.
pub fn composite(members: Vec<(&str, Expr)>) -> Expr {
    Expr::Composite(
        members
            .into_iter()
            .map(|(name, expr)| (name.to_string(), expr))
            .collect(),
    )
}

/// `a ?? b ?? ...`
pub fn coalesce(exprs: Vec<Expr>) -> Expr {
    Expr::Coalesce(exprs)
}

/// `test ? then : otherwise`
pub fn iif(test: Expr, then: impl Into<Expr>, otherwise: impl Into<Expr>) -> Expr {
    Expr::Conditional {
        test: Box::new(test),
        then: Box::new(then.into()),
        otherwise: Box::new(otherwise.into()),
    }
}

/// `query.Any(predicate)`
pub fn any(query: impl Into<Arc<QueryNode>>, predicate: Option<Expr>) -> Expr {
    Expr::Any {
        query: query.into(),
        predicate: predicate.map(Box::new),
    }
}

/// `query.All(predicate)`
pub fn all(query: impl Into<Arc<QueryNode>>, predicate: Expr) -> Expr {
    Expr::All {
        query: query.into(),
        predicate: Box::new(predicate),
    }
}

/// `values.Contains(value)` over a local collection.
pub fn in_list<V: Into<Expr>>(value: Expr, values: impl IntoIterator<Item = V>) -> Expr {
    Expr::Contains {
        value: Box::new(value),
        set: ContainsSet::Values(values.into_iter().map(Into::into).collect()),
    }
}

/// `query.Contains(value)` over a single-column subquery.
pub fn in_query(value: Expr, query: impl Into<Arc<QueryNode>>) -> Expr {
    Expr::Contains {
        value: Box::new(value),
        set: ContainsSet::Query(query.into()),
    }
}

/// Scalar subquery.
pub fn scalar(query: impl Into<Arc<QueryNode>>) -> Expr {
    Expr::Scalar(query.into())
}

// Group aggregates

fn aggregate(function: AggregateFn, arg: Option<Expr>, filter: Option<Expr>) -> Expr {
    Expr::Aggregate {
        function,
        arg: arg.map(Box::new),
        filter: filter.map(Box::new),
    }
}

/// `g.Count()`
pub fn count() -> Expr {
    aggregate(AggregateFn::Count, None, None)
}

/// `g.Count(pred)`
pub fn count_where(pred: Expr) -> Expr {
    aggregate(AggregateFn::Count, None, Some(pred))
}

/// `g.LongCount()`
pub fn long_count() -> Expr {
    aggregate(AggregateFn::LongCount, None, None)
}

/// `g.Sum(x => arg)`
pub fn sum(arg: Expr) -> Expr {
    aggregate(AggregateFn::Sum, Some(arg), None)
}

/// `g.Min(x => arg)`
pub fn min(arg: Expr) -> Expr {
    aggregate(AggregateFn::Min, Some(arg), None)
}

/// `g.Max(x => arg)`
pub fn max(arg: Expr) -> Expr {
    aggregate(AggregateFn::Max, Some(arg), None)
}

/// `g.Average(x => arg)`
pub fn average(arg: Expr) -> Expr {
    aggregate(AggregateFn::Average, Some(arg), None)
}

/// `g.Any(pred)`
pub fn group_any(pred: Option<Expr>) -> Expr {
    aggregate(AggregateFn::Any, None, pred)
}

/// `g.All(pred)`
pub fn group_all(pred: Expr) -> Expr {
    aggregate(AggregateFn::All, None, Some(pred))
}

impl Expr {
    /// `g.Where(pred).Agg(...)`: restrict the rows an aggregate sees.
    /// Combines with an existing filter using AND.
    #[must_use]
    pub fn filtered(self, pred: Expr) -> Expr {
        match self {
            Expr::Aggregate {
                function,
                arg,
                filter,
            } => Expr::Aggregate {
                function,
                arg,
                filter: Some(Box::new(match filter {
                    Some(existing) => existing.and(pred),
                    None => pred,
                })),
            },
            other => other,
        }
    }

    /// Whether an aggregate occurs outside any nested subquery.
    pub fn contains_aggregate(&self) -> bool {
        let mut found = false;
        self.visit(&mut |e| found |= matches!(e, Expr::Aggregate { .. }));
        found
    }

    /// Visit this expression and its children, not descending into subqueries.
    pub fn visit(&self, f: &mut impl FnMut(&Expr)) {
        f(self);
        match self {
            Expr::Binary { left, right, .. } => {
                left.visit(f);
                right.visit(f);
            }
            Expr::Not(e) | Expr::Negate(e) => e.visit(f),
            Expr::Coalesce(items) => items.iter().for_each(|e| e.visit(f)),
            Expr::Conditional {
                test,
                then,
                otherwise,
            } => {
                test.visit(f);
                then.visit(f);
                otherwise.visit(f);
            }
            Expr::Call { target, args, .. } => {
                target.visit(f);
                args.iter().for_each(|e| e.visit(f));
            }
            Expr::Contains { value, set } => {
                value.visit(f);
                if let ContainsSet::Values(values) = set {
                    values.iter().for_each(|e| e.visit(f));
                }
            }
            Expr::Composite(members) => members.iter().for_each(|(_, e)| e.visit(f)),
            Expr::Aggregate { arg, filter, .. } => {
                if let Some(arg) = arg {
                    arg.visit(f);
                }
                if let Some(filter) = filter {
                    filter.visit(f);
                }
            }
            Expr::Member { .. }
            | Expr::Field(_)
            | Expr::Literal(_)
            | Expr::Param { .. }
            | Expr::Slot(_)
            | Expr::Any { .. }
            | Expr::All { .. }
            | Expr::Key
            | Expr::KeyMember(_)
            | Expr::Scalar(_) => {}
        }
    }
}

impl From<Value> for Expr {
    fn from(v: Value) -> Self {
        Expr::Literal(v)
    }
}

impl From<i64> for Expr {
    fn from(n: i64) -> Self {
        lit(n)
    }
}

impl From<i32> for Expr {
    fn from(n: i32) -> Self {
        lit(n)
    }
}

impl From<f64> for Expr {
    fn from(x: f64) -> Self {
        lit(x)
    }
}

impl From<bool> for Expr {
    fn from(b: bool) -> Self {
        lit(b)
    }
}

impl From<&str> for Expr {
    fn from(s: &str) -> Self {
        lit(s)
    }
}

impl From<String> for Expr {
    fn from(s: String) -> Self {
        lit(s)
    }
}

// =============================================================================
// Fluent Methods
// =============================================================================

/// Fluent builders for predicates, arithmetic and string functions.
///
/// Methods take `self` by value so `field("Id").eq(1)` resolves here rather
/// than to `PartialEq::eq`.
pub trait ExprExt: Sized {
    fn into_expr(self) -> Expr;

    fn binary(self, op: BinaryOp, other: impl Into<Expr>) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(self.into_expr()),
            right: Box::new(other.into()),
        }
    }

    fn eq(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Eq, other)
    }

    fn ne(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Ne, other)
    }

    fn lt(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Lt, other)
    }

    fn lte(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Lte, other)
    }

    fn gt(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Gt, other)
    }

    fn gte(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Gte, other)
    }

    fn and(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::And, other)
    }

    fn or(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Or, other)
    }

    fn not(self) -> Expr {
        Expr::Not(Box::new(self.into_expr()))
    }

    fn neg(self) -> Expr {
        Expr::Negate(Box::new(self.into_expr()))
    }

    fn add(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Add, other)
    }

    fn sub(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Sub, other)
    }

    fn mul(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Mul, other)
    }

    fn div(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Div, other)
    }

    fn rem(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Mod, other)
    }

    fn concat(self, other: impl Into<Expr>) -> Expr {
        self.binary(BinaryOp::Concat, other)
    }

    fn is_null(self) -> Expr {
        self.eq(Value::Null)
    }

    fn is_not_null(self) -> Expr {
        self.ne(Value::Null)
    }

    /// `a ?? b`
    fn or_else(self, other: impl Into<Expr>) -> Expr {
        match self.into_expr() {
            Expr::Coalesce(mut items) => {
                items.push(other.into());
                Expr::Coalesce(items)
            }
            first => Expr::Coalesce(vec![first, other.into()]),
        }
    }

    fn call(self, function: ScalarFn, args: Vec<Expr>) -> Expr {
        Expr::Call {
            function,
            target: Box::new(self.into_expr()),
            args,
        }
    }

    fn contains(self, needle: impl Into<Expr>) -> Expr {
        self.call(ScalarFn::Contains, vec![needle.into()])
    }

    fn starts_with(self, prefix: impl Into<Expr>) -> Expr {
        self.call(ScalarFn::StartsWith, vec![prefix.into()])
    }

    fn ends_with(self, suffix: impl Into<Expr>) -> Expr {
        self.call(ScalarFn::EndsWith, vec![suffix.into()])
    }

    fn is_null_or_empty(self) -> Expr {
        self.call(ScalarFn::IsNullOrEmpty, vec![lit("")])
    }

    fn replace(self, from: impl Into<Expr>, to: impl Into<Expr>) -> Expr {
        self.call(ScalarFn::Replace, vec![from.into(), to.into()])
    }

    fn substring(self, start: impl Into<Expr>, length: Option<Expr>) -> Expr {
        let mut args = vec![start.into()];
        args.extend(length);
        self.call(ScalarFn::Substring, args)
    }

    fn index_of(self, needle: impl Into<Expr>) -> Expr {
        self.call(ScalarFn::IndexOf, vec![needle.into()])
    }

    fn to_upper(self) -> Expr {
        self.call(ScalarFn::ToUpper, vec![])
    }

    fn to_lower(self) -> Expr {
        self.call(ScalarFn::ToLower, vec![])
    }

    fn trim(self) -> Expr {
        self.call(ScalarFn::Trim, vec![])
    }

    fn trim_start(self) -> Expr {
        self.call(ScalarFn::TrimStart, vec![])
    }

    fn trim_end(self) -> Expr {
        self.call(ScalarFn::TrimEnd, vec![])
    }

    fn length(self) -> Expr {
        self.call(ScalarFn::Length, vec![])
    }
}

impl ExprExt for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}
