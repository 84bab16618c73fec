//! Literal abstraction.
//!
//! Replaces every bindable constant in a query tree with [`Expr::Slot`] and
//! collects the values separately. The rewritten tree depends only on the
//! query's structure, so it doubles as the statement cache key.
//!
//! Bound: explicit parameters, string literals, non-finite floats and the
//! constants of a join default. Inlined: integers, finite floats, booleans
//! and NULL. A NULL-valued parameter becomes a NULL literal so comparisons
//! against it compile to `IS NULL`.
//!
//! Pattern arguments of `Contains`/`StartsWith`/`EndsWith` are bound already
//! escaped and wrapped in `%`, using the dialect's LIKE escape character.

use std::sync::Arc;

use serde::Serialize;

use super::expr::{ContainsSet, Expr, ScalarFn};
use super::{DefaultValue, GroupKey, QueryNode, Value};
use crate::sql::dialect::helpers::escape_like;
use crate::sql::types::DataType;

/// Name and type of one parameter slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SlotInfo {
    pub name: String,
    pub data_type: DataType,
}

/// Result of [`abstract_literals`].
#[derive(Debug, Clone)]
pub struct Abstracted {
    pub root: Arc<QueryNode>,
    pub slots: Vec<SlotInfo>,
    pub values: Vec<Value>,
}

impl Abstracted {
    pub fn slot_names(&self) -> Vec<String> {
        self.slots.iter().map(|s| s.name.clone()).collect()
    }
}

/// Rewrite `root`, binding constants to slots in a deterministic walk order.
pub fn abstract_literals(root: &QueryNode, like_escape: char) -> Abstracted {
    let mut binder = Binder {
        like_escape,
        keys: Vec::new(),
        slots: Vec::new(),
        values: Vec::new(),
    };
    let root = Arc::new(binder.node(root));
    Abstracted {
        root,
        slots: binder.slots,
        values: binder.values,
    }
}

struct Binder {
    like_escape: char,
    /// (explicit name, value) per slot; identical keys share a slot.
    keys: Vec<(Option<String>, Value)>,
    slots: Vec<SlotInfo>,
    values: Vec<Value>,
}

impl Binder {
    fn bind(&mut self, name: Option<&str>, value: Value) -> Expr {
        let key = (name.map(String::from), value);
        if let Some(slot) = self.keys.iter().position(|k| *k == key) {
            return Expr::Slot(slot);
        }

        let base = match name {
            Some(n) => n.to_string(),
            None => format!("p{}", self.slots.len()),
        };
        let mut unique = base.clone();
        let mut suffix = 1;
        while self.slots.iter().any(|s| s.name.eq_ignore_ascii_case(&unique)) {
            unique = format!("{}_{}", base, suffix);
            suffix += 1;
        }

        let slot = self.slots.len();
        self.slots.push(SlotInfo {
            name: unique,
            data_type: key.1.data_type(),
        });
        self.values.push(key.1.clone());
        self.keys.push(key);
        Expr::Slot(slot)
    }

    fn shared(&mut self, node: &Arc<QueryNode>) -> Arc<QueryNode> {
        Arc::new(self.node(node))
    }

    fn node(&mut self, node: &QueryNode) -> QueryNode {
        match node {
            QueryNode::Source { .. } => node.clone(),
            QueryNode::Filter { input, predicate } => QueryNode::Filter {
                input: self.shared(input),
                predicate: self.expr(predicate),
            },
            QueryNode::Project { input, columns } => QueryNode::Project {
                input: self.shared(input),
                columns: self.members(columns),
            },
            QueryNode::Join {
                left,
                right,
                kind,
                left_key,
                right_key,
                default,
            } => QueryNode::Join {
                left: self.shared(left),
                right: self.shared(right),
                kind: *kind,
                left_key: self.expr(left_key),
                right_key: self.expr(right_key),
                default: default.as_ref().map(|d| self.default_value(d)),
            },
            QueryNode::GroupBy { input, key } => {
                let input = self.shared(input);
                let key = match key {
                    GroupKey::Single(e) => GroupKey::Single(self.expr(e)),
                    GroupKey::Composite(members) => GroupKey::Composite(self.members(members)),
                    GroupKey::Entity(source) => GroupKey::Entity(source.clone()),
                };
                QueryNode::GroupBy { input, key }
            }
            QueryNode::OrderBy {
                input,
                key,
                direction,
                then,
            } => QueryNode::OrderBy {
                input: self.shared(input),
                key: self.expr(key),
                direction: *direction,
                then: *then,
            },
            QueryNode::Reverse { input } => QueryNode::Reverse {
                input: self.shared(input),
            },
            QueryNode::SetOp { kind, left, right } => QueryNode::SetOp {
                kind: *kind,
                left: self.shared(left),
                right: self.shared(right),
            },
            QueryNode::Paging {
                input,
                skip,
                take,
                from_end,
            } => QueryNode::Paging {
                input: self.shared(input),
                skip: *skip,
                take: *take,
                from_end: *from_end,
            },
            QueryNode::TakeWhile { input, predicate } => QueryNode::TakeWhile {
                input: self.shared(input),
                predicate: self.expr(predicate),
            },
            QueryNode::SkipWhile { input, predicate } => QueryNode::SkipWhile {
                input: self.shared(input),
                predicate: self.expr(predicate),
            },
            QueryNode::Distinct { input } => QueryNode::Distinct {
                input: self.shared(input),
            },
            QueryNode::Cast { input, target } => QueryNode::Cast {
                input: self.shared(input),
                target: target.clone(),
            },
            QueryNode::DefaultIfEmpty { input, default } => QueryNode::DefaultIfEmpty {
                input: self.shared(input),
                default: default.as_ref().map(|d| self.default_value(d)),
            },
            QueryNode::Aggregate {
                input,
                function,
                arg,
                filter,
            } => QueryNode::Aggregate {
                input: self.shared(input),
                function: *function,
                arg: arg.as_ref().map(|e| self.expr(e)),
                filter: filter.as_ref().map(|e| self.expr(e)),
            },
            QueryNode::Element {
                input,
                kind,
                or_default,
                message,
            } => QueryNode::Element {
                input: self.shared(input),
                kind: *kind,
                or_default: *or_default,
                message: message.clone(),
            },
            QueryNode::Timeout { input, seconds } => QueryNode::Timeout {
                input: self.shared(input),
                seconds: *seconds,
            },
            QueryNode::Delete { input } => QueryNode::Delete {
                input: self.shared(input),
            },
            QueryNode::Update { input, assignments } => QueryNode::Update {
                input: self.shared(input),
                assignments: self.members(assignments),
            },
            QueryNode::Insert { target, input } => QueryNode::Insert {
                target: self.shared(target),
                input: self.shared(input),
            },
        }
    }

    fn members(&mut self, members: &[(String, Expr)]) -> Vec<(String, Expr)> {
        members
            .iter()
            .map(|(name, e)| (name.clone(), self.expr(e)))
            .collect()
    }

    fn default_value(&mut self, default: &DefaultValue) -> DefaultValue {
        let members = default
            .members
            .iter()
            .map(|(member, e)| {
                let e = match e {
                    Expr::Literal(v) if !v.is_null() => {
                        self.bind(Some(&member.to_lowercase()), v.clone())
                    }
                    other => self.expr(other),
                };
                (member.clone(), e)
            })
            .collect();
        DefaultValue { members }
    }

    fn boxed(&mut self, e: &Expr) -> Box<Expr> {
        Box::new(self.expr(e))
    }

    fn expr(&mut self, e: &Expr) -> Expr {
        match e {
            Expr::Literal(Value::String(s)) => self.bind(None, Value::String(s.clone())),
            Expr::Literal(Value::Float(x)) if !x.is_finite() => self.bind(None, Value::Float(*x)),
            Expr::Literal(_) | Expr::Slot(_) => e.clone(),
            Expr::Param { value: Value::Null, .. } => Expr::Literal(Value::Null),
            Expr::Param { name, value } => self.bind(Some(name), value.clone()),
            Expr::Member { .. } | Expr::Field(_) | Expr::Key | Expr::KeyMember(_) => e.clone(),
            Expr::Binary { op, left, right } => Expr::Binary {
                op: *op,
                left: self.boxed(left),
                right: self.boxed(right),
            },
            Expr::Not(inner) => Expr::Not(self.boxed(inner)),
            Expr::Negate(inner) => Expr::Negate(self.boxed(inner)),
            Expr::Coalesce(items) => Expr::Coalesce(items.iter().map(|i| self.expr(i)).collect()),
            Expr::Conditional {
                test,
                then,
                otherwise,
            } => Expr::Conditional {
                test: self.boxed(test),
                then: self.boxed(then),
                otherwise: self.boxed(otherwise),
            },
            Expr::Call {
                function,
                target,
                args,
            } => {
                let target = self.boxed(target);
                let args = args
                    .iter()
                    .map(|arg| match (function.is_pattern(), arg) {
                        (true, Expr::Literal(Value::String(s))) => {
                            let pattern = self.pattern(*function, s);
                            self.bind(None, pattern)
                        }
                        (true, Expr::Param { name, value: Value::String(s) }) => {
                            let pattern = self.pattern(*function, s);
                            self.bind(Some(name), pattern)
                        }
                        _ => self.expr(arg),
                    })
                    .collect();
                Expr::Call {
                    function: *function,
                    target,
                    args,
                }
            }
            Expr::Any { query, predicate } => Expr::Any {
                query: self.shared(query),
                predicate: predicate.as_ref().map(|p| self.boxed(p)),
            },
            Expr::All { query, predicate } => Expr::All {
                query: self.shared(query),
                predicate: self.boxed(predicate),
            },
            Expr::Contains { value, set } => {
                let value = self.boxed(value);
                let set = match set {
                    ContainsSet::Values(values) => {
                        ContainsSet::Values(values.iter().map(|v| self.expr(v)).collect())
                    }
                    ContainsSet::Query(query) => ContainsSet::Query(self.shared(query)),
                };
                Expr::Contains { value, set }
            }
            Expr::Composite(members) => Expr::Composite(self.members(members)),
            Expr::Aggregate {
                function,
                arg,
                filter,
            } => Expr::Aggregate {
                function: *function,
                arg: arg.as_ref().map(|a| self.boxed(a)),
                filter: filter.as_ref().map(|f| self.boxed(f)),
            },
            Expr::Scalar(query) => Expr::Scalar(self.shared(query)),
        }
    }

    fn pattern(&self, function: ScalarFn, needle: &str) -> Value {
        let escaped = escape_like(needle, self.like_escape);
        Value::String(match function {
            ScalarFn::StartsWith => format!("{}%", escaped),
            ScalarFn::EndsWith => format!("%{}", escaped),
            _ => format!("%{}%", escaped),
        })
    }
}
