//! Execution boundary.
//!
//! The compiler never talks to a database. A [`StatementExecutor`] runs a
//! [`CompiledStatement`] and hands back rows; the `fetch_*` helpers on top
//! of it enforce the statement's [`RowExpectation`]. Executor errors are
//! passed through unchanged and never retried.

use thiserror::Error;

use crate::compile::{CompiledStatement, RowExpectation};

/// Message used when a reduction carries none of its own.
pub const DEFAULT_NO_RESULT_MESSAGE: &str = "query returned no rows";

/// Runs compiled statements against a database.
pub trait StatementExecutor {
    type Row;
    type Error: std::error::Error + 'static;

    /// Run a query and return all of its rows.
    fn query(&self, statement: &CompiledStatement) -> Result<Vec<Self::Row>, Self::Error>;

    /// Run a statement returning a single integer, such as a count.
    fn query_count(&self, statement: &CompiledStatement) -> Result<u64, Self::Error>;
}

/// A required single-row reduction found no row.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct NoResultError {
    pub message: String,
}

impl NoResultError {
    fn for_expectation(expectation: Option<&RowExpectation>) -> Self {
        Self {
            message: expectation
                .and_then(|e| e.message.clone())
                .unwrap_or_else(|| DEFAULT_NO_RESULT_MESSAGE.to_string()),
        }
    }
}

pub type ExecuteResult<T, E> = Result<T, ExecuteError<E>>;

/// Errors raised while fetching results.
#[derive(Debug, Error)]
pub enum ExecuteError<E: std::error::Error + 'static> {
    #[error(transparent)]
    NoResult(#[from] NoResultError),

    /// `Single` matched more than one row.
    #[error("query returned more than one row")]
    MultipleRows,

    /// Error from the executor, unchanged.
    #[error(transparent)]
    Boundary(E),
}

/// One page of rows plus the unpaged total, when it was requested.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    pub rows: Vec<R>,
    pub total: Option<u64>,
}

/// Every row of the statement.
pub fn fetch_all<X: StatementExecutor>(
    executor: &X,
    statement: &CompiledStatement,
) -> ExecuteResult<Vec<X::Row>, X::Error> {
    executor.query(statement).map_err(ExecuteError::Boundary)
}

/// The row picked by a reduction, or `None` when an or-default reduction
/// found nothing.
///
/// Without a row expectation the first row is returned, if any.
pub fn fetch_optional<X: StatementExecutor>(
    executor: &X,
    statement: &CompiledStatement,
) -> ExecuteResult<Option<X::Row>, X::Error> {
    let expectation = statement.row_expectation.as_ref();
    let rows = fetch_all(executor, statement)?;

    if expectation.is_some_and(RowExpectation::is_single) && rows.len() > 1 {
        return Err(ExecuteError::MultipleRows);
    }
    match rows.into_iter().next() {
        Some(row) => Ok(Some(row)),
        None if expectation.is_some_and(|e| !e.or_default) => {
            Err(NoResultError::for_expectation(expectation).into())
        }
        None => Ok(None),
    }
}

/// The row picked by a reduction; an empty result is always an error.
pub fn fetch_one<X: StatementExecutor>(
    executor: &X,
    statement: &CompiledStatement,
) -> ExecuteResult<X::Row, X::Error> {
    fetch_optional(executor, statement)?.ok_or_else(|| {
        NoResultError::for_expectation(statement.row_expectation.as_ref()).into()
    })
}

/// Rows of the statement and, if it carries a count statement, the total
/// without paging.
pub fn fetch_page<X: StatementExecutor>(
    executor: &X,
    statement: &CompiledStatement,
) -> ExecuteResult<Page<X::Row>, X::Error> {
    let rows = fetch_all(executor, statement)?;
    let total = match &statement.count_statement {
        Some(count) => Some(
            executor
                .query_count(count)
                .map_err(ExecuteError::Boundary)?,
        ),
        None => None,
    };
    Ok(Page { rows, total })
}
