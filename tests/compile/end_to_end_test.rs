//! Whole-pipeline behaviour: clause ordering, idempotence, settings and
//! the execution boundary.

mod common;

use common::*;
use relq::config::Settings;
use relq::execute::{fetch_one, fetch_optional, fetch_page, ExecuteError, StatementExecutor};
use relq::prelude::*;

#[test]
fn test_clause_order_independent_of_composition() {
    let composed_late = users()
        .order_by_desc(field("Id"))
        .filter(field("Bcid").gt(1))
        .select(vec![("Id", field("Id")), ("Mail", field("Email"))])
        .filter(field("Mail").is_not_null())
        .take(5);
    let composed_early = users()
        .filter(field("Bcid").gt(1).and(field("Email").is_not_null()))
        .order_by_desc(field("Id"))
        .select(vec![("Id", field("Id")), ("Mail", field("Email"))])
        .take(5);

    let late = compile(&composed_late, Dialect::Postgres);
    let early = compile(&composed_early, Dialect::Postgres);
    assert_eq!(late.text, early.text);
    insta::assert_snapshot!(late.text, @r#"
SELECT
  "u"."uid" AS "Id",
  "u"."Email" AS "Mail"
FROM "fei_users" AS "u"
WHERE "u"."Bcid" > 1 AND "u"."Email" IS NOT NULL
ORDER BY "u"."uid" DESC
LIMIT 5
"#);
}

#[test]
fn test_compilation_is_idempotent() {
    let q = users()
        .join(details(), field("Id"), member("d", "Id"))
        .filter(field("Username").contains("admin").or(field("Mobile").eq(lit("911"))))
        .order_by(member("d", "Registertime"))
        .select(vec![("Name", field("Username")), ("Nick", member("d", "Nickname"))])
        .skip(5)
        .take(5);

    for dialect in [Dialect::TSql, Dialect::TSqlLegacy, Dialect::Postgres, Dialect::MySql] {
        let compiler = compiler(dialect);
        let first = compiler.compile(q.node()).unwrap();
        let second = compiler.compile(q.node()).unwrap();
        assert_eq!(first.text, second.text);
        assert_eq!(parameter_names(&first), parameter_names(&second));
        assert_eq!(first, second);
    }
}

#[test]
fn test_distinct_and_cast() {
    let q = users().select(vec![("Bcid", field("Bcid"))]).distinct();
    let stmt = compile(&q, Dialect::DuckDb);
    assert!(stmt.text.starts_with("SELECT DISTINCT\n  \"u\".\"Bcid\""), "{}", stmt.text);

    let q = users().cast_to_entity("UserDetail");
    let stmt = compile(&q, Dialect::TSql);
    let shape: Vec<_> = stmt.result_shape.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(shape, vec!["Id"]);
    assert!(stmt.text.starts_with("SELECT\n  [u].[uid] AS [Id]\nFROM"), "{}", stmt.text);
}

#[test]
fn test_compiler_from_settings() {
    let settings: Settings = r#"
[compiler]
dialect = "mysql"
with_total_count = true

[cache]
max_entries = 8
"#
    .parse()
    .unwrap();

    let mut compiler = Compiler::new(registry()).with_options(settings.compile_options().unwrap());
    if let Some(cache) = settings.statement_cache().unwrap() {
        compiler = compiler.with_cache(cache);
    }

    let q = users().filter(field("Username").eq(lit("ann"))).order_by(field("Id")).take(3);
    let stmt = compiler.compile(q.node()).unwrap();
    assert!(stmt.text.contains("`u`.`name` = ?"), "{}", stmt.text);
    assert!(stmt.count_statement.is_some());
    validate_sql(&stmt.text, Dialect::MySql).unwrap();
}

/// Answers every query with the configured rows.
struct Canned {
    rows: Vec<Vec<Value>>,
}

#[derive(Debug, thiserror::Error)]
#[error("closed")]
struct Closed;

impl StatementExecutor for Canned {
    type Row = Vec<Value>;
    type Error = Closed;

    fn query(&self, statement: &CompiledStatement) -> Result<Vec<Vec<Value>>, Closed> {
        let limit = if statement.text.contains("LIMIT 1") { 1 } else { self.rows.len() };
        Ok(self.rows.iter().take(limit).cloned().collect())
    }

    fn query_count(&self, _: &CompiledStatement) -> Result<u64, Closed> {
        Ok(self.rows.len() as u64)
    }
}

#[test]
fn test_execution_enforces_row_expectation() {
    let empty = Canned { rows: Vec::new() };
    let two = Canned {
        rows: vec![vec![Value::Int(1)], vec![Value::Int(2)]],
    };

    let first = compile(
        &users().order_by(field("Id")).first().no_result_error("no users"),
        Dialect::Postgres,
    );
    match fetch_one(&empty, &first) {
        Err(ExecuteError::NoResult(e)) => assert_eq!(e.message, "no users"),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(fetch_one(&two, &first).unwrap(), vec![Value::Int(1)]);

    let single = compile(&users().single_or_default(), Dialect::Postgres);
    assert!(fetch_optional(&empty, &single).unwrap().is_none());
    assert!(matches!(fetch_optional(&two, &single), Err(ExecuteError::MultipleRows)));
}

#[test]
fn test_page_with_total_count() {
    let options = CompileOptions::default()
        .with_dialect(Dialect::Postgres)
        .with_total_count(true);
    let compiler = Compiler::new(registry()).with_options(options);
    let stmt = compiler
        .compile(users().order_by(field("Id")).skip(1).take(1).node())
        .unwrap();

    let three = Canned {
        rows: vec![vec![Value::Int(1)], vec![Value::Int(2)], vec![Value::Int(3)]],
    };
    let page = fetch_page(&three, &stmt).unwrap();
    assert_eq!(page.total, Some(3));
}
