//! Logical query tree.
//!
//! Callers build a [`QueryNode`] chain through the typed [`Query`] builder.
//! Nodes are immutable and shared through `Arc`, so a query can be extended
//! in several directions without copying its prefix.
//!
//! ```ignore
//! use relq::ast::{field, param, Query};
//!
//! let query = Query::from_entity("User", "u")
//!     .filter(field("Id").gt(0).and(field("Id").lt(param("y", 100))))
//!     .order_by_desc(field("Id"))
//!     .take(10);
//! ```

mod builder;
mod expr;
pub mod slots;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::sql::types::DataType;

pub use builder::Query;
pub use expr::{
    all, any, average, coalesce, composite, count, count_where, field, group_all, group_any, iif,
    in_list, in_query, key, key_member, lit, long_count, max, member, min, param, scalar, sum,
    AggregateFn, BinaryOp, ContainsSet, Expr, ExprExt, ScalarFn,
};

// =============================================================================
// Values
// =============================================================================

/// A constant carried by the tree: a literal, a parameter value or a default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Database type reported for a parameter holding this value.
    pub fn data_type(&self) -> DataType {
        match self {
            Value::Null => DataType::Unknown,
            Value::Bool(_) => DataType::Bool,
            Value::Int(n) if i32::try_from(*n).is_ok() => DataType::Int32,
            Value::Int(_) => DataType::Int64,
            Value::Float(_) => DataType::Float64,
            Value::String(_) => DataType::String,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

// =============================================================================
// Query Nodes
// =============================================================================

/// Sort direction of an ordering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Join flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JoinKind {
    Inner,
    /// LEFT OUTER JOIN; unmatched right columns fall back to the join default.
    OuterWithDefault,
}

/// Set operation flavour. `Concat` keeps duplicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SetOpKind {
    Union,
    Concat,
    Intersect,
    Except,
}

impl fmt::Display for SetOpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SetOpKind::Union => write!(f, "Union"),
            SetOpKind::Concat => write!(f, "Concat"),
            SetOpKind::Intersect => write!(f, "Intersect"),
            SetOpKind::Except => write!(f, "Except"),
        }
    }
}

/// Grouping key shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum GroupKey {
    /// One expression, exposed as `Key`.
    Single(Expr),
    /// Named members, exposed as `Key.<name>`.
    Composite(Vec<(String, Expr)>),
    /// Every readable column of a bound source.
    Entity(String),
}

/// Fallback row for an outer join or an empty aggregate input.
///
/// Members not listed fall back to NULL. Member values are constants or
/// expressions over the left-hand source.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DefaultValue {
    pub members: Vec<(String, Expr)>,
}

impl DefaultValue {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, member: &str, value: impl Into<Expr>) -> Self {
        self.members.push((member.into(), value.into()));
        self
    }

    /// Value supplied for a member, matched case-insensitively.
    pub fn get(&self, member: &str) -> Option<&Expr> {
        self.members
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(member))
            .map(|(_, expr)| expr)
    }
}

/// Which single row an element reduction picks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    First,
    Single,
    Last,
    ElementAt(u64),
}

/// Target shape of a `Cast`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CastTarget {
    Members(Vec<String>),
    Entity(String),
}

/// One operation in a query chain.
///
/// Every variant except `Source` and `SetOp` reads a single `input`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum QueryNode {
    /// Rows of an entity, bound to a logical source name.
    Source {
        entity: String,
        alias: String,
        /// Physical table replacing the one in metadata.
        table: Option<String>,
    },
    Filter {
        input: Arc<QueryNode>,
        predicate: Expr,
    },
    Project {
        input: Arc<QueryNode>,
        columns: Vec<(String, Expr)>,
    },
    Join {
        left: Arc<QueryNode>,
        right: Arc<QueryNode>,
        kind: JoinKind,
        left_key: Expr,
        right_key: Expr,
        default: Option<DefaultValue>,
    },
    GroupBy {
        input: Arc<QueryNode>,
        key: GroupKey,
    },
    /// `then` appends a secondary key; otherwise the ordering is replaced.
    OrderBy {
        input: Arc<QueryNode>,
        key: Expr,
        direction: Direction,
        then: bool,
    },
    Reverse {
        input: Arc<QueryNode>,
    },
    SetOp {
        kind: SetOpKind,
        left: Arc<QueryNode>,
        right: Arc<QueryNode>,
    },
    /// Skip/take. `from_end` counts from the end of the current ordering.
    Paging {
        input: Arc<QueryNode>,
        skip: Option<u64>,
        take: Option<u64>,
        from_end: bool,
    },
    TakeWhile {
        input: Arc<QueryNode>,
        predicate: Expr,
    },
    SkipWhile {
        input: Arc<QueryNode>,
        predicate: Expr,
    },
    Distinct {
        input: Arc<QueryNode>,
    },
    Cast {
        input: Arc<QueryNode>,
        target: CastTarget,
    },
    DefaultIfEmpty {
        input: Arc<QueryNode>,
        default: Option<DefaultValue>,
    },
    /// Terminal scalar aggregate over the whole input.
    Aggregate {
        input: Arc<QueryNode>,
        function: AggregateFn,
        arg: Option<Expr>,
        filter: Option<Expr>,
    },
    /// Terminal single-row reduction.
    Element {
        input: Arc<QueryNode>,
        kind: ElementKind,
        or_default: bool,
        message: Option<String>,
    },
    Timeout {
        input: Arc<QueryNode>,
        seconds: u32,
    },
    /// Delete the rows of a filtered source.
    Delete {
        input: Arc<QueryNode>,
    },
    /// Assign member values on the rows of a filtered source. Values may
    /// read the row being updated.
    Update {
        input: Arc<QueryNode>,
        assignments: Vec<(String, Expr)>,
    },
    /// Insert the rows of `input` into the `target` source. Input columns
    /// are matched to target members by name.
    Insert {
        target: Arc<QueryNode>,
        input: Arc<QueryNode>,
    },
}

impl QueryNode {
    /// Operation name used in error messages.
    pub fn operation(&self) -> &'static str {
        match self {
            QueryNode::Source { .. } => "Source",
            QueryNode::Filter { .. } => "Where",
            QueryNode::Project { .. } => "Select",
            QueryNode::Join { .. } => "Join",
            QueryNode::GroupBy { .. } => "GroupBy",
            QueryNode::OrderBy { then: false, .. } => "OrderBy",
            QueryNode::OrderBy { then: true, .. } => "ThenBy",
            QueryNode::Reverse { .. } => "Reverse",
            QueryNode::SetOp { .. } => "SetOp",
            QueryNode::Paging { from_end: false, .. } => "Skip/Take",
            QueryNode::Paging { from_end: true, .. } => "SkipLast/TakeLast",
            QueryNode::TakeWhile { .. } => "TakeWhile",
            QueryNode::SkipWhile { .. } => "SkipWhile",
            QueryNode::Distinct { .. } => "Distinct",
            QueryNode::Cast { .. } => "Cast",
            QueryNode::DefaultIfEmpty { .. } => "DefaultIfEmpty",
            QueryNode::Aggregate { .. } => "Aggregate",
            QueryNode::Element { .. } => "Element",
            QueryNode::Timeout { .. } => "Timeout",
            QueryNode::Delete { .. } => "Delete",
            QueryNode::Update { .. } => "Update",
            QueryNode::Insert { .. } => "Insert",
        }
    }

    /// The single upstream node, for every variant that has one.
    pub fn input(&self) -> Option<&Arc<QueryNode>> {
        match self {
            QueryNode::Source { .. } | QueryNode::Join { .. } | QueryNode::SetOp { .. } => None,
            QueryNode::Filter { input, .. }
            | QueryNode::Project { input, .. }
            | QueryNode::GroupBy { input, .. }
            | QueryNode::OrderBy { input, .. }
            | QueryNode::Reverse { input }
            | QueryNode::Paging { input, .. }
            | QueryNode::TakeWhile { input, .. }
            | QueryNode::SkipWhile { input, .. }
            | QueryNode::Distinct { input }
            | QueryNode::Cast { input, .. }
            | QueryNode::DefaultIfEmpty { input, .. }
            | QueryNode::Aggregate { input, .. }
            | QueryNode::Element { input, .. }
            | QueryNode::Timeout { input, .. }
            | QueryNode::Delete { input }
            | QueryNode::Update { input, .. }
            | QueryNode::Insert { input, .. } => Some(input),
        }
    }

    /// Whether the statement changes data, looking through a trailing
    /// timeout.
    pub fn is_command(&self) -> bool {
        match self {
            QueryNode::Timeout { input, .. } => input.is_command(),
            QueryNode::Delete { .. } | QueryNode::Update { .. } | QueryNode::Insert { .. } => true,
            _ => false,
        }
    }
}
