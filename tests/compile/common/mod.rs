//! Shared fixtures for compile tests.

#![allow(dead_code)]

use std::sync::Arc;

use relq::metadata::{Entity, InMemorySource, MetadataRegistry, MetadataResult, TableMetadata};
use relq::prelude::*;
use sqlparser::dialect::{
    DuckDbDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect,
};
use sqlparser::parser::Parser;

pub struct User;

impl Entity for User {
    const NAME: &'static str = "User";

    fn table_metadata() -> MetadataResult<TableMetadata> {
        TableMetadata::builder(Self::NAME)
            .table("fei_users")
            .column_as("Id", "uid", DataType::Int64)
            .column("Bcid", DataType::Int32)
            .column_as("Username", "name", DataType::String)
            .column("Mobile", DataType::String)
            .column("Email", DataType::String)
            .column("IsActive", DataType::Bool)
            .key("Id")
            .build()
    }
}

pub struct UserDetail;

impl Entity for UserDetail {
    const NAME: &'static str = "UserDetail";

    fn table_metadata() -> MetadataResult<TableMetadata> {
        TableMetadata::builder(Self::NAME)
            .table("fei_userdetail")
            .column_as("Id", "uid", DataType::Int64)
            .column("Nickname", DataType::String)
            .column("Registertime", DataType::Timestamp)
            .key("Id")
            .build()
    }
}

pub fn registry() -> Arc<MetadataRegistry> {
    let source = InMemorySource::new()
        .with_entity::<User>()
        .and_then(|s| s.with_entity::<UserDetail>())
        .unwrap();
    Arc::new(MetadataRegistry::new(source))
}

pub fn compiler(dialect: Dialect) -> Compiler {
    Compiler::new(registry()).with_options(CompileOptions::default().with_dialect(dialect))
}

pub fn compile(query: &Query, dialect: Dialect) -> CompiledStatement {
    compiler(dialect).compile(query.node()).unwrap()
}

pub fn compile_err(query: &Query, dialect: Dialect) -> CompileError {
    compiler(dialect).compile(query.node()).unwrap_err()
}

pub fn users() -> Query {
    Query::of::<User>("u")
}

pub fn details() -> Query {
    Query::of::<UserDetail>("d")
}

/// Statement text must parse for its engine.
pub fn validate_sql(sql: &str, dialect: Dialect) -> Result<(), String> {
    let parser_dialect: Box<dyn sqlparser::dialect::Dialect> = match dialect {
        Dialect::Postgres => Box::new(PostgreSqlDialect {}),
        Dialect::DuckDb => Box::new(DuckDbDialect {}),
        Dialect::MySql => Box::new(MySqlDialect {}),
        Dialect::Sqlite => Box::new(SQLiteDialect {}),
        Dialect::TSql | Dialect::TSqlLegacy => Box::new(MsSqlDialect {}),
    };

    Parser::parse_sql(&*parser_dialect, sql)
        .map(|_| ())
        .map_err(|e| format!("Invalid SQL for {:?}: {}\nSQL: {}", dialect, e, sql))
}

pub fn parameter_names(statement: &CompiledStatement) -> Vec<&str> {
    statement.parameters.iter().map(|p| p.name.as_str()).collect()
}
