//! Data-changing statements.
//!
//! INSERT ... SELECT, UPDATE and DELETE, the targets of command
//! translation. Like [`Select`], they only describe the statement; the
//! writer assigns placeholders.
//!
//! ```ignore
//! use relq::sql::dml::{Delete, Update};
//! use relq::sql::expr::{lit_int, table_col, ExprExt};
//! use relq::sql::query::TableRef;
//!
//! let update = Update::table(TableRef::table(None, "users", "u"))
//!     .set("status", lit_int(1))
//!     .filter(table_col("u", "id").eq(lit_int(7)));
//!
//! let delete = Delete::from(TableRef::table(None, "users", "u"))
//!     .filter(table_col("u", "status").eq(lit_int(0)));
//! ```

use super::dialect::{DialectProfile, DmlTargetStyle};
use super::expr::{ExprExt, SqlExpr};
use super::query::{Select, TableRef};
use super::token::{Token, TokenStream};

// ============================================================================
// INSERT
// ============================================================================

/// `INSERT INTO table (columns) SELECT ...`.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "DML statements have no effect until converted to SQL with to_sql()"]
pub struct Insert {
    pub schema: Option<String>,
    pub table: String,
    pub columns: Vec<String>,
    pub source: Box<Select>,
}

impl Insert {
    pub fn into(schema: Option<&str>, table: &str, source: Select) -> Self {
        Self {
            schema: schema.map(String::from),
            table: table.into(),
            columns: Vec::new(),
            source: Box::new(source),
        }
    }

    /// Set the target columns, in the order the SELECT produces them.
    pub fn columns(mut self, cols: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.columns = cols.into_iter().map(|c| c.into()).collect();
        self
    }

    pub fn to_tokens(&self, dialect: &DialectProfile) -> TokenStream {
        let mut ts = TokenStream::new();

        ts.push(Token::Insert).space().push(Token::Into).space();
        ts.push(Token::QualifiedIdent {
            schema: self.schema.clone(),
            name: self.table.clone(),
        });

        if !self.columns.is_empty() {
            ts.space().lparen();
            for (i, col) in self.columns.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                ts.push(Token::Ident(col.clone()));
            }
            ts.rparen();
        }

        ts.newline().append(&self.source.to_tokens(dialect));
        ts
    }

    pub fn to_sql(&self, dialect: &DialectProfile) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }
}

// ============================================================================
// UPDATE
// ============================================================================

/// `UPDATE` of one aliased table.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "DML statements have no effect until converted to SQL with to_sql()"]
pub struct Update {
    pub table: TableRef,
    /// Unqualified column and the value assigned to it.
    pub set: Vec<(String, SqlExpr)>,
    pub filter: Option<SqlExpr>,
}

impl Update {
    pub fn table(table: TableRef) -> Self {
        Self {
            table,
            set: Vec::new(),
            filter: None,
        }
    }

    pub fn set(mut self, column: &str, value: SqlExpr) -> Self {
        self.set.push((column.into(), value));
        self
    }

    /// Add a WHERE condition, ANDed with any existing one.
    pub fn filter(mut self, condition: SqlExpr) -> Self {
        self.filter = Some(match self.filter {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    pub fn to_tokens(&self, dialect: &DialectProfile) -> TokenStream {
        let mut ts = TokenStream::new();

        // UPDATE target
        ts.push(Token::Update).space();
        match dialect.dml_target_style {
            DmlTargetStyle::Aliased => ts.append(&self.table.to_tokens(dialect)),
            DmlTargetStyle::FromClause => ts.push(Token::Ident(self.table.alias.clone())),
        };

        // SET clause
        ts.newline().push(Token::Set).space();
        for (i, (col, expr)) in self.set.iter().enumerate() {
            if i > 0 {
                ts.comma().space();
            }
            ts.push(Token::Ident(col.clone()))
                .space()
                .push(Token::Eq)
                .space()
                .append(&expr.to_tokens(dialect));
        }

        if dialect.dml_target_style == DmlTargetStyle::FromClause {
            ts.newline().push(Token::From).space();
            ts.append(&self.table.to_tokens(dialect));
        }

        if let Some(filter) = &self.filter {
            ts.newline().push(Token::Where).space();
            ts.append(&filter.to_tokens(dialect));
        }

        ts
    }

    pub fn to_sql(&self, dialect: &DialectProfile) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }
}

// ============================================================================
// DELETE
// ============================================================================

/// `DELETE` from one aliased table.
#[derive(Debug, Clone, PartialEq)]
#[must_use = "DML statements have no effect until converted to SQL with to_sql()"]
pub struct Delete {
    pub table: TableRef,
    pub filter: Option<SqlExpr>,
}

impl Delete {
    pub fn from(table: TableRef) -> Self {
        Self {
            table,
            filter: None,
        }
    }

    /// Add a WHERE condition, ANDed with any existing one.
    pub fn filter(mut self, condition: SqlExpr) -> Self {
        self.filter = Some(match self.filter {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    pub fn to_tokens(&self, dialect: &DialectProfile) -> TokenStream {
        let mut ts = TokenStream::new();

        ts.push(Token::Delete).space();
        if dialect.dml_target_style == DmlTargetStyle::FromClause {
            ts.push(Token::Ident(self.table.alias.clone())).newline();
        }
        ts.push(Token::From).space();
        ts.append(&self.table.to_tokens(dialect));

        if let Some(filter) = &self.filter {
            ts.newline().push(Token::Where).space();
            ts.append(&filter.to_tokens(dialect));
        }

        ts
    }

    pub fn to_sql(&self, dialect: &DialectProfile) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }
}

// ============================================================================
// Command
// ============================================================================

/// Any data-changing statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Insert(Insert),
    Update(Update),
    Delete(Delete),
}

impl Command {
    pub fn to_tokens(&self, dialect: &DialectProfile) -> TokenStream {
        match self {
            Command::Insert(insert) => insert.to_tokens(dialect),
            Command::Update(update) => update.to_tokens(dialect),
            Command::Delete(delete) => delete.to_tokens(dialect),
        }
    }

    pub fn to_sql(&self, dialect: &DialectProfile) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }
}
