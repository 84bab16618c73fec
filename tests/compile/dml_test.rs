//! DELETE, UPDATE and INSERT ... SELECT built from query chains.

mod common;

use std::sync::Arc;

use common::*;
use relq::metadata::MetadataResult;
use relq::prelude::*;

#[test]
fn test_delete_by_predicate() {
    let q = users().filter(field("Username").eq(param("username", "admi"))).delete();

    let tsql = compile(&q, Dialect::TSql);
    insta::assert_snapshot!(tsql.text, @r"
DELETE [u]
FROM [fei_users] AS [u]
WHERE [u].[name] = @username
");
    assert_eq!(parameter_names(&tsql), vec!["username"]);
    assert!(tsql.result_shape.is_empty());
    validate_sql(&tsql.text, Dialect::TSql).unwrap();

    let pg = compile(&q, Dialect::Postgres);
    assert_eq!(pg.text, "DELETE FROM \"fei_users\" AS \"u\"\nWHERE \"u\".\"name\" = $1");
    validate_sql(&pg.text, Dialect::Postgres).unwrap();
}

#[test]
fn test_delete_with_subquery_predicate() {
    let q = users()
        .filter(
            any(
                details().into_node(),
                Some(member("d", "Id").eq(member("u", "Id"))),
            )
            .not(),
        )
        .delete()
        .timeout(120);
    let stmt = compile(&q, Dialect::TSql);
    assert!(stmt.text.contains("WHERE NOT EXISTS (SELECT"), "{}", stmt.text);
    assert!(stmt.text.contains("WHERE [d].[uid] = [u].[uid])"), "{}", stmt.text);
    assert_eq!(stmt.timeout, Some(120));
    validate_sql(&stmt.text, Dialect::TSql).unwrap();
}

#[test]
fn test_update_from_table_override() {
    let q = users()
        .from_table("fei_users_2019")
        .filter(field("Username").eq(lit("admin")))
        .update(vec![
            ("Bcid", lit(2)),
            ("Username", field("Username").substring(0, Some(lit(4)))),
        ]);

    let tsql = compile(&q, Dialect::TSql);
    insta::assert_snapshot!(tsql.text, @r"
UPDATE [u]
SET [Bcid] = 2, [name] = SUBSTRING([u].[name], 1, 4)
FROM [fei_users_2019] AS [u]
WHERE [u].[name] = @p0
");
    assert_eq!(tsql.parameters[0].value, Value::String("admin".into()));
    validate_sql(&tsql.text, Dialect::TSql).unwrap();

    let pg = compile(&q, Dialect::Postgres);
    assert!(
        pg.text
            .starts_with("UPDATE \"fei_users_2019\" AS \"u\"\nSET \"Bcid\" = 2, \"name\" = SUBSTRING("),
        "{}",
        pg.text
    );
    validate_sql(&pg.text, Dialect::Postgres).unwrap();
}

#[test]
fn test_insert_select_from_another_source() {
    let rows = details().take(10).select(vec![
        ("Username", member("d", "Nickname")),
        ("Mobile", lit("18980861011")),
        ("Email", lit("tinylit@foxmail.com")),
    ]);
    let q = users().insert(rows);

    let tsql = compile(&q, Dialect::TSql);
    insta::assert_snapshot!(tsql.text, @r"
INSERT INTO [fei_users] ([name], [Mobile], [Email])
SELECT TOP (10)
  [d].[Nickname] AS [Username],
  @p0 AS [Mobile],
  @p1 AS [Email]
FROM [fei_userdetail] AS [d]
");
    assert_eq!(parameter_names(&tsql), vec!["p0", "p1"]);
    validate_sql(&tsql.text, Dialect::TSql).unwrap();

    let pg = compile(&q, Dialect::Postgres);
    assert!(pg.text.ends_with("FROM \"fei_userdetail\" AS \"d\"\nLIMIT 10"), "{}", pg.text);
    validate_sql(&pg.text, Dialect::Postgres).unwrap();
}

#[test]
fn test_commands_only_change_a_filtered_source() {
    let paged = users().order_by(field("Id")).skip(5).delete();
    let err = compile_err(&paged, Dialect::TSql);
    assert!(matches!(err, CompileError::Translation(_)), "{:?}", err);

    let grouped = users().group_by(field("Bcid")).update(vec![("Bcid", lit(0))]);
    let err = compile_err(&grouped, Dialect::Postgres);
    assert!(matches!(err, CompileError::Translation(_)), "{:?}", err);

    // Commands cannot be nested inside a query.
    let nested = users().delete().take(1);
    let err = compile_err(&nested, Dialect::TSql);
    assert!(err.to_string().contains("root of a statement"), "{}", err);
}

struct Account;

impl Entity for Account {
    const NAME: &'static str = "Account";

    fn table_metadata() -> MetadataResult<TableMetadata> {
        TableMetadata::builder(Self::NAME)
            .table("accounts")
            .column("Id", DataType::Int64)
            .column("Balance", DataType::Float64)
            .column("CreatedAt", DataType::Timestamp)
            .key("Id")
            .read_only("CreatedAt")
            .build()
    }
}

#[test]
fn test_read_only_members_are_not_written() {
    let source = InMemorySource::new().with_entity::<Account>().unwrap();
    let compiler = Compiler::new(Arc::new(MetadataRegistry::new(source)))
        .with_options(CompileOptions::default().with_dialect(Dialect::Sqlite));

    let q = Query::of::<Account>("a").update(vec![("CreatedAt", lit(0))]);
    let err = compiler.compile(q.node()).unwrap_err();
    assert!(err.to_string().contains("'CreatedAt' is not writable"), "{}", err);

    let q = Query::of::<Account>("a")
        .filter(field("Id").eq(param("id", 7)))
        .update(vec![("Balance", field("Balance").add(lit(1.5)))]);
    let stmt = compiler.compile(q.node()).unwrap();
    assert_eq!(
        stmt.text,
        "UPDATE \"accounts\" AS \"a\"\nSET \"Balance\" = \"a\".\"Balance\" + 1.5\nWHERE \"a\".\"Id\" = ?"
    );
    validate_sql(&stmt.text, Dialect::Sqlite).unwrap();
}
