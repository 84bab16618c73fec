//! SQL generation.
//!
//! The target side of the compiler: small SELECT and DML models that
//! serialize to any configured dialect.
//!
//! - [`query`] - SELECT statement model
//! - [`dml`] - INSERT ... SELECT, UPDATE and DELETE
//! - [`expr`] - Expression AST and builder helpers
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - Dialect profiles and presets
//! - [`writer`] - Placeholder assignment and final statement text
//! - [`types`] - Column and parameter types

pub mod dialect;
pub mod dml;
pub mod expr;
pub mod query;
pub mod token;
pub mod types;
pub mod writer;

#[cfg(test)]
pub mod test_utils;

pub use dialect::{Dialect, DialectProfile, DmlTargetStyle, PagingStrategy, ParamStyle};
pub use dml::{Command, Delete, Insert, Update};
pub use expr::{BinaryOperator, ExprExt, Literal, SqlExpr, UnaryOperator};
pub use query::{
    Join, JoinType, LimitOffset, OrderByExpr, Select, SelectExpr, SetOpType, SetOperation,
    SortDir, TableFactor, TableRef,
};
pub use token::{Token, TokenStream};
pub use types::DataType;
pub use writer::{SqlWriter, WrittenStatement};
