//! # relq
//!
//! Compiles composable relational query trees into parameterised SQL for
//! several dialects.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │               Query builder (ast::Query)                 │
//! │  (filter, join, group, order, page, set ops, reduce)     │
//! │  (delete, update, insert ... select)                     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [slots]
//! ┌─────────────────────────────────────────────────────────┐
//! │          QueryNode tree with literals abstracted         │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [translate] ◀── MetadataRegistry
//! ┌─────────────────────────────────────────────────────────┐
//! │        SELECT model (sql::query) or sql::dml command     │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [writer] ◀── DialectProfile
//! ┌─────────────────────────────────────────────────────────┐
//! │   CompiledStatement { text, parameters, result_shape }   │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod ast;
pub mod cache;
pub mod compile;
pub mod config;
pub mod execute;
pub mod metadata;
pub mod sql;
pub mod translate;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::ast::{
        // Constructors
        all,
        any,
        average,
        coalesce,
        composite,
        count,
        count_where,
        field,
        group_all,
        group_any,
        iif,
        in_list,
        in_query,
        key,
        key_member,
        lit,
        long_count,
        max,
        member,
        min,
        param,
        scalar,
        sum,
        // Types
        DefaultValue,
        Expr,
        ExprExt,
        Query,
        QueryNode,
        Value,
    };
    pub use crate::compile::{
        CompileError, CompileOptions, CompileResult, CompiledStatement, Compiler, Parameter,
        RowExpectation,
    };
    pub use crate::metadata::{Entity, InMemorySource, MetadataRegistry, TableMetadata};
    pub use crate::sql::{DataType, Dialect, DialectProfile};
}

// Also export at crate root for convenience
pub use ast::Query;
pub use compile::{CompileError, CompileOptions, CompiledStatement, Compiler};
pub use sql::Dialect;
