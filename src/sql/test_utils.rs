//! Test utilities for SQL emission validation.
//!
//! Parses emitted statements with sqlparser-rs to make sure every dialect
//! preset produces text its engine would accept.

use sqlparser::dialect::{
    DuckDbDialect, MsSqlDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect,
};
use sqlparser::parser::Parser;

use super::dialect::Dialect;

/// Validates that a SQL string is syntactically valid for the given dialect.
///
/// ```ignore
/// use crate::sql::test_utils::validate_sql;
/// use crate::sql::dialect::Dialect;
///
/// validate_sql("SELECT * FROM users", Dialect::Postgres).unwrap();
/// ```
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::expr::{lit_int, table_col, ExprExt};
    use crate::sql::query::{LimitOffset, Select, SelectExpr, TableRef};

    #[test]
    fn test_validate_invalid_sql() {
        let result = validate_sql("SELEC * FORM users", Dialect::Postgres);
        assert!(result.is_err());
    }

    #[test]
    fn test_paged_select_is_valid_everywhere() {
        let mut select = Select::new().from(TableRef::table(None, "users", "t0"));
        select.select = vec![SelectExpr::new(table_col("t0", "uid")).with_alias("Id")];
        select.and_where(table_col("t0", "uid").gt(lit_int(100)));
        select.limit_offset = Some(LimitOffset {
            limit: Some(10),
            offset: Some(20),
        });

        for dialect in [
            Dialect::TSql,
            Dialect::Postgres,
            Dialect::MySql,
            Dialect::Sqlite,
            Dialect::DuckDb,
        ] {
            let sql = select.to_sql(dialect.profile());
            validate_sql(&sql, dialect).unwrap();
        }
    }
}
