//! SQL expression AST.
//!
//! Translators lower the logical query tree into these nodes; the writer
//! turns them into tokens. Parentheses are inserted from operator
//! precedence, so translators never need to add them by hand.

use super::dialect::{ConcatStyle, DialectProfile};
use super::query::{OrderByExpr, Select};
use super::token::{Token, TokenStream};

// =============================================================================
// Expression AST
// =============================================================================

/// A SQL expression.
///
/// Every variant must be handled in `to_tokens()` - the compiler enforces this.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlExpr {
    /// Column reference: optional table alias and column name
    Column {
        table: Option<String>,
        column: String,
    },

    /// Inline literal value
    Literal(Literal),

    /// Bound parameter, by slot index
    Param(usize),

    /// Binary operation: left op right
    BinaryOp {
        left: Box<SqlExpr>,
        op: BinaryOperator,
        right: Box<SqlExpr>,
    },

    /// Unary operation: op expr
    UnaryOp {
        op: UnaryOperator,
        expr: Box<SqlExpr>,
    },

    /// Function call: name(args)
    Function {
        name: String,
        args: Vec<SqlExpr>,
        distinct: bool,
    },

    /// Searched CASE: CASE WHEN ... THEN ... ELSE ... END
    Case {
        when_clauses: Vec<(SqlExpr, SqlExpr)>,
        else_clause: Option<Box<SqlExpr>>,
    },

    /// Scalar subquery: (SELECT ...)
    Subquery(Box<Select>),

    /// [NOT] EXISTS (SELECT ...)
    Exists { subquery: Box<Select>, negated: bool },

    /// expr [NOT] IN (values)
    In {
        expr: Box<SqlExpr>,
        values: Vec<SqlExpr>,
        negated: bool,
    },

    /// expr [NOT] IN (SELECT ...)
    InSubquery {
        expr: Box<SqlExpr>,
        subquery: Box<Select>,
        negated: bool,
    },

    /// expr IS [NOT] NULL
    IsNull { expr: Box<SqlExpr>, negated: bool },

    /// expr [NOT] LIKE pattern [ESCAPE 'c']
    Like {
        expr: Box<SqlExpr>,
        pattern: Box<SqlExpr>,
        escape: Option<char>,
        negated: bool,
    },

    /// Star: * or table.*
    Star { table: Option<String> },

    /// ROW_NUMBER() OVER (ORDER BY ...)
    RowNumber { order_by: Vec<OrderByExpr> },
}

/// Literal values that are written inline.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Null,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    // Comparison
    Eq,
    Ne,
    Lt,
    Gt,
    Lte,
    Gte,
    // Logical
    And,
    Or,
    // Arithmetic
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
    // String
    Concat,
}

impl BinaryOperator {
    fn precedence(self) -> u8 {
        match self {
            BinaryOperator::Or => 1,
            BinaryOperator::And => 2,
            BinaryOperator::Eq
            | BinaryOperator::Ne
            | BinaryOperator::Lt
            | BinaryOperator::Gt
            | BinaryOperator::Lte
            | BinaryOperator::Gte => PREC_COMPARISON,
            BinaryOperator::Plus | BinaryOperator::Minus | BinaryOperator::Concat => 5,
            BinaryOperator::Mul | BinaryOperator::Div | BinaryOperator::Mod => 6,
        }
    }

    fn is_associative(self) -> bool {
        matches!(
            self,
            BinaryOperator::And
                | BinaryOperator::Or
                | BinaryOperator::Plus
                | BinaryOperator::Mul
                | BinaryOperator::Concat
        )
    }

    fn is_comparison(self) -> bool {
        self.precedence() == PREC_COMPARISON
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Minus,
}

const PREC_COMPARISON: u8 = 4;
const PREC_ATOM: u8 = 10;

impl SqlExpr {
    fn precedence(&self) -> u8 {
        match self {
            SqlExpr::BinaryOp { op, .. } => op.precedence(),
            SqlExpr::UnaryOp {
                op: UnaryOperator::Not,
                ..
            } => 3,
            SqlExpr::UnaryOp { .. } => 7,
            SqlExpr::In { .. }
            | SqlExpr::InSubquery { .. }
            | SqlExpr::IsNull { .. }
            | SqlExpr::Like { .. } => PREC_COMPARISON,
            _ => PREC_ATOM,
        }
    }

    /// Whether this expression contains a bound parameter or literal only.
    pub fn is_constant(&self) -> bool {
        matches!(self, SqlExpr::Literal(_) | SqlExpr::Param(_))
    }

    /// Whether an aggregate call occurs outside any nested subquery.
    pub fn contains_aggregate(&self) -> bool {
        match self {
            SqlExpr::Function { name, args, .. } => {
                matches!(
                    name.to_uppercase().as_str(),
                    "COUNT" | "COUNT_BIG" | "SUM" | "MIN" | "MAX" | "AVG"
                ) || args.iter().any(SqlExpr::contains_aggregate)
            }
            SqlExpr::BinaryOp { left, right, .. } => {
                left.contains_aggregate() || right.contains_aggregate()
            }
            SqlExpr::UnaryOp { expr, .. }
            | SqlExpr::IsNull { expr, .. }
            | SqlExpr::InSubquery { expr, .. } => expr.contains_aggregate(),
            SqlExpr::Case {
                when_clauses,
                else_clause,
            } => {
                when_clauses
                    .iter()
                    .any(|(w, t)| w.contains_aggregate() || t.contains_aggregate())
                    || else_clause.as_ref().is_some_and(|e| e.contains_aggregate())
            }
            SqlExpr::In { expr, values, .. } => {
                expr.contains_aggregate() || values.iter().any(SqlExpr::contains_aggregate)
            }
            SqlExpr::Like { expr, pattern, .. } => {
                expr.contains_aggregate() || pattern.contains_aggregate()
            }
            SqlExpr::Column { .. }
            | SqlExpr::Literal(_)
            | SqlExpr::Param(_)
            | SqlExpr::Subquery(_)
            | SqlExpr::Exists { .. }
            | SqlExpr::Star { .. }
            | SqlExpr::RowNumber { .. } => false,
        }
    }

    /// AND together a list of predicates. Returns `None` for an empty list.
    pub fn conjunction(predicates: Vec<SqlExpr>) -> Option<SqlExpr> {
        predicates.into_iter().reduce(|acc, p| acc.and(p))
    }

    /// OR together a list of predicates. Returns `None` for an empty list.
    pub fn disjunction(predicates: Vec<SqlExpr>) -> Option<SqlExpr> {
        predicates.into_iter().reduce(|acc, p| acc.or(p))
    }

    /// Convert this expression to a token stream for a specific dialect.
    pub fn to_tokens(&self, dialect: &DialectProfile) -> TokenStream {
        let mut ts = TokenStream::new();

        match self {
            SqlExpr::Column { table, column } => {
                if let Some(t) = table {
                    ts.push(Token::Ident(t.clone()));
                    ts.push(Token::Dot);
                }
                ts.push(Token::Ident(column.clone()));
            }

            SqlExpr::Literal(lit) => {
                ts.push(match lit {
                    Literal::Int(n) => Token::LitInt(*n),
                    Literal::Float(f) => Token::LitFloat(*f),
                    Literal::String(s) => Token::LitString(s.clone()),
                    Literal::Bool(b) => Token::LitBool(*b),
                    Literal::Null => Token::LitNull,
                });
            }

            SqlExpr::Param(slot) => {
                ts.push(Token::Param(*slot));
            }

            SqlExpr::BinaryOp { left, op, right } => {
                if *op == BinaryOperator::Concat && dialect.concat_style == ConcatStyle::Function {
                    ts.push(Token::FunctionName("CONCAT".into()));
                    ts.lparen();
                    ts.append(&left.to_tokens(dialect));
                    ts.comma().space();
                    ts.append(&right.to_tokens(dialect));
                    ts.rparen();
                } else {
                    let prec = op.precedence();
                    let left_parens = left.precedence() < prec
                        || (op.is_comparison() && left.precedence() == prec);
                    let right_parens = right.precedence() < prec
                        || (!op.is_associative() && right.precedence() == prec);
                    append_operand(&mut ts, left, left_parens, dialect);
                    ts.space();
                    ts.push(binary_op_to_token(*op));
                    ts.space();
                    append_operand(&mut ts, right, right_parens, dialect);
                }
            }

            SqlExpr::UnaryOp { op, expr } => {
                match op {
                    UnaryOperator::Not => {
                        ts.push(Token::Not).space();
                    }
                    UnaryOperator::Minus => {
                        ts.push(Token::Minus);
                    }
                }
                append_operand(&mut ts, expr, expr.precedence() < PREC_ATOM, dialect);
            }

            SqlExpr::Function {
                name,
                args,
                distinct,
            } => {
                ts.push(Token::FunctionName(name.clone()));
                ts.lparen();
                if *distinct {
                    ts.push(Token::Distinct).space();
                }
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        ts.comma().space();
                    }
                    ts.append(&arg.to_tokens(dialect));
                }
                ts.rparen();
            }

            SqlExpr::Case {
                when_clauses,
                else_clause,
            } => {
                ts.push(Token::Case);
                for (when, then) in when_clauses {
                    ts.space().push(Token::When).space();
                    ts.append(&when.to_tokens(dialect));
                    ts.space().push(Token::Then).space();
                    ts.append(&then.to_tokens(dialect));
                }
                if let Some(else_expr) = else_clause {
                    ts.space().push(Token::Else).space();
                    ts.append(&else_expr.to_tokens(dialect));
                }
                ts.space().push(Token::End);
            }

            SqlExpr::Subquery(query) => {
                ts.lparen();
                ts.append(&query.to_tokens(dialect));
                ts.rparen();
            }

            SqlExpr::Exists { subquery, negated } => {
                if *negated {
                    ts.push(Token::Not).space();
                }
                ts.push(Token::Exists).space().lparen();
                ts.append(&subquery.to_tokens(dialect));
                ts.rparen();
            }

            SqlExpr::In {
                expr,
                values,
                negated,
            } => {
                // "x IN ()" is invalid SQL: empty IN is FALSE, empty NOT IN is TRUE
                if values.is_empty() {
                    ts.push(Token::LitInt(1))
                        .space()
                        .push(Token::Eq)
                        .space()
                        .push(Token::LitInt(if *negated { 1 } else { 0 }));
                } else {
                    append_operand(&mut ts, expr, expr.precedence() <= PREC_COMPARISON, dialect);
                    if *negated {
                        ts.space().push(Token::Not);
                    }
                    ts.space().push(Token::In).space().lparen();
                    for (i, val) in values.iter().enumerate() {
                        if i > 0 {
                            ts.comma().space();
                        }
                        ts.append(&val.to_tokens(dialect));
                    }
                    ts.rparen();
                }
            }

            SqlExpr::InSubquery {
                expr,
                subquery,
                negated,
            } => {
                append_operand(&mut ts, expr, expr.precedence() <= PREC_COMPARISON, dialect);
                if *negated {
                    ts.space().push(Token::Not);
                }
                ts.space().push(Token::In).space().lparen();
                ts.append(&subquery.to_tokens(dialect));
                ts.rparen();
            }

            SqlExpr::IsNull { expr, negated } => {
                append_operand(&mut ts, expr, expr.precedence() <= PREC_COMPARISON, dialect);
                ts.space();
                ts.push(if *negated {
                    Token::IsNotNull
                } else {
                    Token::IsNull
                });
            }

            SqlExpr::Like {
                expr,
                pattern,
                escape,
                negated,
            } => {
                append_operand(&mut ts, expr, expr.precedence() <= PREC_COMPARISON, dialect);
                if *negated {
                    ts.space().push(Token::Not);
                }
                ts.space().push(Token::Like).space();
                append_operand(
                    &mut ts,
                    pattern,
                    pattern.precedence() <= PREC_COMPARISON,
                    dialect,
                );
                if let Some(c) = escape {
                    ts.space()
                        .push(Token::Escape)
                        .space()
                        .push(Token::LitString(c.to_string()));
                }
            }

            SqlExpr::Star { table } => {
                if let Some(t) = table {
                    ts.push(Token::Ident(t.clone()));
                    ts.push(Token::Dot);
                }
                ts.push(Token::Star);
            }

            SqlExpr::RowNumber { order_by } => {
                ts.push(Token::FunctionName("ROW_NUMBER".into()))
                    .lparen()
                    .rparen()
                    .space()
                    .push(Token::Over)
                    .space()
                    .lparen()
                    .push(Token::OrderBy)
                    .space();
                if order_by.is_empty() {
                    ts.lparen()
                        .push(Token::Select)
                        .space()
                        .push(Token::Null)
                        .rparen();
                }
                for (i, ob) in order_by.iter().enumerate() {
                    if i > 0 {
                        ts.comma().space();
                    }
                    ts.append(&ob.to_tokens(dialect));
                }
                ts.rparen();
            }
        }

        ts
    }
}

fn append_operand(ts: &mut TokenStream, expr: &SqlExpr, parens: bool, dialect: &DialectProfile) {
    if parens {
        ts.lparen();
        ts.append(&expr.to_tokens(dialect));
        ts.rparen();
    } else {
        ts.append(&expr.to_tokens(dialect));
    }
}

fn binary_op_to_token(op: BinaryOperator) -> Token {
    match op {
        BinaryOperator::Eq => Token::Eq,
        BinaryOperator::Ne => Token::Ne,
        BinaryOperator::Lt => Token::Lt,
        BinaryOperator::Gt => Token::Gt,
        BinaryOperator::Lte => Token::Lte,
        BinaryOperator::Gte => Token::Gte,
        BinaryOperator::And => Token::And,
        BinaryOperator::Or => Token::Or,
        BinaryOperator::Plus => Token::Plus,
        BinaryOperator::Minus => Token::Minus,
        BinaryOperator::Mul => Token::Mul,
        BinaryOperator::Div => Token::Div,
        BinaryOperator::Mod => Token::Mod,
        BinaryOperator::Concat => Token::Concat,
    }
}

// =============================================================================
// Expression Constructors
// =============================================================================

/// Create a qualified column reference (table.column).
pub fn table_col(table: &str, column: &str) -> SqlExpr {
    SqlExpr::Column {
        table: Some(table.into()),
        column: column.into(),
    }
}

/// Create an unqualified column reference.
pub fn col(name: &str) -> SqlExpr {
    SqlExpr::Column {
        table: None,
        column: name.into(),
    }
}

/// Create an integer literal.
pub fn lit_int(n: i64) -> SqlExpr {
    SqlExpr::Literal(Literal::Int(n))
}

/// Create a string literal. Only for trusted fragments such as LIKE wildcards.
pub fn lit_str(s: &str) -> SqlExpr {
    SqlExpr::Literal(Literal::String(s.into()))
}

/// Create a boolean literal.
pub fn lit_bool(b: bool) -> SqlExpr {
    SqlExpr::Literal(Literal::Bool(b))
}

/// Create a NULL literal.
pub fn lit_null() -> SqlExpr {
    SqlExpr::Literal(Literal::Null)
}

/// COUNT(*)
pub fn count_star() -> SqlExpr {
    func("COUNT", vec![SqlExpr::Star { table: None }])
}

/// Generic function call.
pub fn func(name: &str, args: Vec<SqlExpr>) -> SqlExpr {
    SqlExpr::Function {
        name: name.into(),
        args,
        distinct: false,
    }
}

/// CASE WHEN cond THEN then [ELSE otherwise] END
pub fn case_when(cond: SqlExpr, then: SqlExpr, otherwise: Option<SqlExpr>) -> SqlExpr {
    SqlExpr::Case {
        when_clauses: vec![(cond, then)],
        else_clause: otherwise.map(Box::new),
    }
}

/// Fluent builders for predicates and arithmetic.
pub trait ExprExt: Sized {
    fn into_expr(self) -> SqlExpr;

    fn binary(self, op: BinaryOperator, other: SqlExpr) -> SqlExpr {
        SqlExpr::BinaryOp {
            left: Box::new(self.into_expr()),
            op,
            right: Box::new(other),
        }
    }

    fn eq(self, other: SqlExpr) -> SqlExpr {
        self.binary(BinaryOperator::Eq, other)
    }

    fn gt(self, other: SqlExpr) -> SqlExpr {
        self.binary(BinaryOperator::Gt, other)
    }

    fn and(self, other: SqlExpr) -> SqlExpr {
        self.binary(BinaryOperator::And, other)
    }

    fn or(self, other: SqlExpr) -> SqlExpr {
        self.binary(BinaryOperator::Or, other)
    }

    fn not(self) -> SqlExpr {
        match self.into_expr() {
            SqlExpr::Exists { subquery, negated } => SqlExpr::Exists {
                subquery,
                negated: !negated,
            },
            SqlExpr::IsNull { expr, negated } => SqlExpr::IsNull {
                expr,
                negated: !negated,
            },
            SqlExpr::In {
                expr,
                values,
                negated,
            } => SqlExpr::In {
                expr,
                values,
                negated: !negated,
            },
            SqlExpr::InSubquery {
                expr,
                subquery,
                negated,
            } => SqlExpr::InSubquery {
                expr,
                subquery,
                negated: !negated,
            },
            SqlExpr::Like {
                expr,
                pattern,
                escape,
                negated,
            } => SqlExpr::Like {
                expr,
                pattern,
                escape,
                negated: !negated,
            },
            SqlExpr::UnaryOp {
                op: UnaryOperator::Not,
                expr,
            } => *expr,
            other => SqlExpr::UnaryOp {
                op: UnaryOperator::Not,
                expr: Box::new(other),
            },
        }
    }

    fn is_null(self) -> SqlExpr {
        SqlExpr::IsNull {
            expr: Box::new(self.into_expr()),
            negated: false,
        }
    }

    fn is_not_null(self) -> SqlExpr {
        SqlExpr::IsNull {
            expr: Box::new(self.into_expr()),
            negated: true,
        }
    }
}

impl ExprExt for SqlExpr {
    fn into_expr(self) -> SqlExpr {
        self
    }
}
