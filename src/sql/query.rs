//! SELECT statement model.
//!
//! [`Select`] is the target of translation: translators fill in its clauses
//! and the writer serializes it. A select that needs another clause after
//! paging, grouping or a set operation is wrapped as a derived table by the
//! translator; nothing here reorders clauses.

use super::dialect::{helpers, DialectProfile, PagingStrategy};
use super::expr::SqlExpr;
use super::token::{Token, TokenStream};

// =============================================================================
// Select Expression (column with optional alias)
// =============================================================================

/// A SELECT list item: expression with optional alias.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct SelectExpr {
    pub expr: SqlExpr,
    pub alias: Option<String>,
}

impl SelectExpr {
    pub fn new(expr: SqlExpr) -> Self {
        Self { expr, alias: None }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Name this item produces in the result set, if it can be known.
    pub fn output_name(&self) -> Option<&str> {
        match (&self.alias, &self.expr) {
            (Some(alias), _) => Some(alias),
            (None, SqlExpr::Column { column, .. }) => Some(column),
            _ => None,
        }
    }

    pub fn to_tokens(&self, dialect: &DialectProfile) -> TokenStream {
        let mut ts = self.expr.to_tokens(dialect);
        let redundant = matches!(
            (&self.alias, &self.expr),
            (Some(alias), SqlExpr::Column { column, .. }) if alias == column
        );
        if let (Some(alias), false) = (&self.alias, redundant) {
            ts.space()
                .push(Token::As)
                .space()
                .push(Token::Ident(alias.clone()));
        }
        ts
    }
}

impl From<SqlExpr> for SelectExpr {
    fn from(expr: SqlExpr) -> Self {
        SelectExpr::new(expr)
    }
}

// =============================================================================
// Table Reference
// =============================================================================

/// What a FROM or JOIN item reads from.
#[derive(Debug, Clone, PartialEq)]
pub enum TableFactor {
    /// A physical table, optionally schema-qualified.
    Table { schema: Option<String>, name: String },
    /// A parenthesized subquery.
    Derived(Box<Select>),
}

/// A FROM/JOIN item with its alias. Every source gets an alias.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct TableRef {
    pub factor: TableFactor,
    pub alias: String,
}

impl TableRef {
    pub fn table(schema: Option<&str>, name: &str, alias: &str) -> Self {
        Self {
            factor: TableFactor::Table {
                schema: schema.map(String::from),
                name: name.into(),
            },
            alias: alias.into(),
        }
    }

    pub fn derived(select: Select, alias: &str) -> Self {
        Self {
            factor: TableFactor::Derived(Box::new(select)),
            alias: alias.into(),
        }
    }

    pub fn to_tokens(&self, dialect: &DialectProfile) -> TokenStream {
        let mut ts = TokenStream::new();
        match &self.factor {
            TableFactor::Table { schema, name } => {
                ts.push(Token::QualifiedIdent {
                    schema: schema.clone(),
                    name: name.clone(),
                });
            }
            TableFactor::Derived(select) => {
                ts.lparen();
                ts.append(&select.to_tokens(dialect));
                ts.rparen();
            }
        }
        ts.space()
            .push(Token::As)
            .space()
            .push(Token::Ident(self.alias.clone()));
        ts
    }
}

// =============================================================================
// Joins
// =============================================================================

/// Type of join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
}

/// A JOIN clause.
#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub join_type: JoinType,
    pub table: TableRef,
    pub on: SqlExpr,
}

impl Join {
    pub fn to_tokens(&self, dialect: &DialectProfile) -> TokenStream {
        let mut ts = TokenStream::new();

        match self.join_type {
            JoinType::Inner => ts.push(Token::Inner),
            JoinType::Left => ts.push(Token::Left).space().push(Token::Outer),
        };

        ts.space().push(Token::Join).space();
        ts.append(&self.table.to_tokens(dialect));
        ts.space().push(Token::On).space();
        ts.append(&self.on.to_tokens(dialect));

        ts
    }
}

// =============================================================================
// ORDER BY
// =============================================================================

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

impl SortDir {
    pub fn reversed(self) -> Self {
        match self {
            SortDir::Asc => SortDir::Desc,
            SortDir::Desc => SortDir::Asc,
        }
    }
}

/// An ORDER BY expression.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "builders have no effect until used"]
pub struct OrderByExpr {
    pub expr: SqlExpr,
    pub dir: SortDir,
}

impl OrderByExpr {
    pub fn asc(expr: SqlExpr) -> Self {
        Self {
            expr,
            dir: SortDir::Asc,
        }
    }

    pub fn reversed(self) -> Self {
        Self {
            expr: self.expr,
            dir: self.dir.reversed(),
        }
    }

    pub fn to_tokens(&self, dialect: &DialectProfile) -> TokenStream {
        let mut ts = self.expr.to_tokens(dialect);
        if self.dir == SortDir::Desc {
            ts.space().push(Token::Desc);
        }
        ts
    }
}

// =============================================================================
// LIMIT / OFFSET
// =============================================================================

/// LIMIT and OFFSET clause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LimitOffset {
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

impl LimitOffset {
    /// Convert to token stream using the profile's paging strategy.
    pub fn to_tokens(&self, dialect: &DialectProfile) -> TokenStream {
        match dialect.paging_strategy {
            PagingStrategy::LimitOffset => helpers::emit_limit_offset_standard(
                self.limit,
                self.offset,
                dialect.unbounded_limit.as_deref(),
            ),
            PagingStrategy::OffsetFetch | PagingStrategy::RowNumber => {
                helpers::emit_offset_fetch(self.limit, self.offset)
            }
        }
    }
}

// =============================================================================
// Set Operations (UNION, INTERSECT, EXCEPT)
// =============================================================================

/// Type of set operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOpType {
    Union,
    UnionAll,
    Intersect,
    Except,
}

/// A set operation applied to the select that owns it.
#[derive(Debug, Clone, PartialEq)]
pub struct SetOperation {
    pub op: SetOpType,
    pub right: Box<Select>,
}

// =============================================================================
// Select
// =============================================================================

/// A SELECT statement.
///
/// `set_ops` chains further branches onto this one:
/// `<this> UNION <right1> UNION ALL <right2>`. A select with set operations
/// never carries its own ORDER BY or paging.
#[derive(Debug, Clone, Default, PartialEq)]
#[must_use = "Select has no effect until converted to SQL"]
pub struct Select {
    pub select: Vec<SelectExpr>,
    pub distinct: bool,
    /// `TOP (n)` for engines without LIMIT.
    pub top: Option<u64>,
    pub from: Option<TableRef>,
    pub joins: Vec<Join>,
    pub where_clause: Option<SqlExpr>,
    pub group_by: Vec<SqlExpr>,
    pub having: Option<SqlExpr>,
    pub order_by: Vec<OrderByExpr>,
    pub limit_offset: Option<LimitOffset>,
    pub set_ops: Vec<SetOperation>,
}

impl Select {
    /// Create a new empty select.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the FROM item.
    pub fn from(mut self, table: TableRef) -> Self {
        self.from = Some(table);
        self
    }

    /// Add a WHERE condition (ANDed with existing conditions).
    pub fn and_where(&mut self, condition: SqlExpr) {
        self.where_clause = Some(match self.where_clause.take() {
            Some(existing) => super::expr::ExprExt::and(existing, condition),
            None => condition,
        });
    }

    /// Add a HAVING condition (ANDed with existing conditions).
    pub fn and_having(&mut self, condition: SqlExpr) {
        self.having = Some(match self.having.take() {
            Some(existing) => super::expr::ExprExt::and(existing, condition),
            None => condition,
        });
    }

    /// Whether the select is paged in any form.
    pub fn is_paged(&self) -> bool {
        self.top.is_some() || self.limit_offset.is_some()
    }

    /// Whether this select chains set operations.
    pub fn is_compound(&self) -> bool {
        !self.set_ops.is_empty()
    }

    /// Output column names in SELECT list order.
    pub fn output_names(&self) -> Vec<Option<&str>> {
        self.select.iter().map(SelectExpr::output_name).collect()
    }

    /// Convert to token stream for a specific dialect.
    pub fn to_tokens(&self, dialect: &DialectProfile) -> TokenStream {
        let mut ts = self.core_tokens(dialect);

        for set_op in &self.set_ops {
            ts.newline();
            match set_op.op {
                SetOpType::Union => ts.push(Token::Union),
                SetOpType::UnionAll => ts.push(Token::Union).space().push(Token::All),
                SetOpType::Intersect => ts.push(Token::Intersect),
                SetOpType::Except => ts.push(Token::Except),
            };
            ts.newline();
            ts.append(&set_op.right.to_tokens(dialect));
        }

        ts
    }

    fn core_tokens(&self, dialect: &DialectProfile) -> TokenStream {
        let mut ts = TokenStream::new();

        // SELECT
        ts.push(Token::Select);
        if self.distinct {
            ts.space().push(Token::Distinct);
        }
        if let Some(n) = self.top {
            ts.space()
                .push(Token::Top)
                .space()
                .lparen()
                .push(Token::LitInt(n as i64))
                .rparen();
        }

        // Columns
        if self.select.is_empty() {
            ts.space().push(Token::Star);
        }
        for (i, select_expr) in self.select.iter().enumerate() {
            if i == 0 {
                ts.newline().indent(1);
            } else {
                ts.comma().newline().indent(1);
            }
            ts.append(&select_expr.to_tokens(dialect));
        }

        // FROM
        if let Some(from) = &self.from {
            ts.newline().push(Token::From).space();
            ts.append(&from.to_tokens(dialect));
        }

        // JOINs
        for join in &self.joins {
            ts.newline();
            ts.append(&join.to_tokens(dialect));
        }

        // WHERE
        if let Some(where_clause) = &self.where_clause {
            ts.newline().push(Token::Where).space();
            ts.append(&where_clause.to_tokens(dialect));
        }

        // GROUP BY
        if !self.group_by.is_empty() {
            ts.newline().push(Token::GroupBy).space();
            for (i, expr) in self.group_by.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                ts.append(&expr.to_tokens(dialect));
            }
        }

        // HAVING
        if let Some(having) = &self.having {
            ts.newline().push(Token::Having).space();
            ts.append(&having.to_tokens(dialect));
        }

        // ORDER BY
        // OFFSET FETCH is only valid after an ORDER BY; without a requested
        // ordering emit ORDER BY (SELECT NULL), which leaves row order unspecified.
        let needs_order_by_placeholder = dialect.paging_strategy != PagingStrategy::LimitOffset
            && self.order_by.is_empty()
            && self.limit_offset.is_some();

        if !self.order_by.is_empty() {
            ts.newline().push(Token::OrderBy).space();
            for (i, order_expr) in self.order_by.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                ts.append(&order_expr.to_tokens(dialect));
            }
        } else if needs_order_by_placeholder {
            ts.newline()
                .push(Token::OrderBy)
                .space()
                .lparen()
                .push(Token::Select)
                .space()
                .push(Token::Null)
                .rparen();
        }

        // LIMIT / OFFSET
        if let Some(lo) = &self.limit_offset {
            ts.newline();
            ts.append(&lo.to_tokens(dialect));
        }

        ts
    }

    /// Render with `?` placeholders. Statement text with real placeholders
    /// comes from [`SqlWriter`](super::writer::SqlWriter).
    pub fn to_sql(&self, dialect: &DialectProfile) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }
}
