//! Filter, subquery and scalar function compilation.

mod common;

use common::*;
use relq::prelude::*;

#[test]
fn test_any_compiles_to_exists() {
    let q = users().filter(any(
        details().into_node(),
        Some(member("d", "Id").eq(member("u", "Id"))),
    ));
    let stmt = compile(&q, Dialect::TSql);
    insta::assert_snapshot!(stmt.text, @r"
SELECT
  [u].[uid] AS [Id],
  [u].[Bcid],
  [u].[name] AS [Username],
  [u].[Mobile],
  [u].[Email],
  [u].[IsActive]
FROM [fei_users] AS [u]
WHERE EXISTS (SELECT
  [d].[uid]
FROM [fei_userdetail] AS [d]
WHERE [d].[uid] = [u].[uid])
");
    validate_sql(&stmt.text, Dialect::TSql).unwrap();
}

#[test]
fn test_negated_any_compiles_to_not_exists() {
    let q = users().filter(
        any(
            details().into_node(),
            Some(member("d", "Id").eq(member("u", "Id"))),
        )
        .not(),
    );
    let stmt = compile(&q, Dialect::Postgres);
    assert!(stmt.text.contains("WHERE NOT EXISTS (SELECT"), "{}", stmt.text);
    validate_sql(&stmt.text, Dialect::Postgres).unwrap();
}

#[test]
fn test_literal_binding_policy() {
    let q = users()
        .filter(field("Username").eq(lit("ann")))
        .filter(field("Bcid").gt(7))
        .filter(field("IsActive").eq(true))
        .filter(field("Email").ne(param("email", "a@b.c")));
    let stmt = compile(&q, Dialect::TSql);

    assert!(
        stmt.text.contains(
            "WHERE [u].[name] = @p0 AND [u].[Bcid] > 7 AND [u].[IsActive] = 1 AND [u].[Email] <> @email"
        ),
        "{}",
        stmt.text
    );
    assert_eq!(parameter_names(&stmt), vec!["p0", "email"]);
    assert_eq!(stmt.parameters[1].value, Value::String("a@b.c".into()));
    assert_eq!(stmt.parameters[1].db_type, DataType::String);
}

#[test]
fn test_null_parameter_compiles_to_is_null() {
    let q = users()
        .filter(field("Email").eq(param("email", Value::Null)))
        .filter(field("Mobile").ne(lit(Value::Null)));
    let stmt = compile(&q, Dialect::Postgres);
    assert!(
        stmt.text
            .ends_with("WHERE \"u\".\"Email\" IS NULL AND \"u\".\"Mobile\" IS NOT NULL"),
        "{}",
        stmt.text
    );
    assert!(stmt.parameters.is_empty());
}

#[test]
fn test_like_patterns_are_escaped_and_bound() {
    let q = users().filter(field("Username").contains("50%_off"));
    let stmt = compile(&q, Dialect::Postgres);
    assert!(stmt.text.contains("\"u\".\"name\" LIKE $1 ESCAPE '\\'"), "{}", stmt.text);
    assert_eq!(stmt.parameters[0].value, Value::String("%50\\%\\_off%".into()));

    let q = users()
        .filter(field("Username").starts_with("adm"))
        .filter(field("Email").ends_with(".org"));
    let stmt = compile(&q, Dialect::MySql);
    let values: Vec<_> = stmt.parameters.iter().map(|p| p.value.clone()).collect();
    assert_eq!(
        values,
        vec![Value::String("adm%".into()), Value::String("%.org".into())]
    );
    validate_sql(&stmt.text, Dialect::MySql).unwrap();
}

#[test]
fn test_string_functions_per_dialect() {
    let q = users()
        .filter(field("Mobile").trim().length().gt(3))
        .select(vec![
            ("Upper", field("Username").to_upper()),
            ("Area", field("Mobile").substring(0, Some(lit(3)))),
        ]);

    let tsql = compile(&q, Dialect::TSql);
    assert!(tsql.text.contains("UPPER([u].[name]) AS [Upper]"), "{}", tsql.text);
    assert!(tsql.text.contains("SUBSTRING([u].[Mobile], 1, 3) AS [Area]"), "{}", tsql.text);
    assert!(tsql.text.contains("WHERE LEN(LTRIM(RTRIM([u].[Mobile]))) > 3"), "{}", tsql.text);
    validate_sql(&tsql.text, Dialect::TSql).unwrap();

    let pg = compile(&q, Dialect::Postgres);
    assert!(pg.text.contains("WHERE LENGTH(LTRIM(RTRIM(\"u\".\"Mobile\"))) > 3"), "{}", pg.text);
    validate_sql(&pg.text, Dialect::Postgres).unwrap();
}

#[test]
fn test_in_list_and_subquery() {
    let q = users().filter(in_list(field("Bcid"), vec![1, 2, 3]));
    let stmt = compile(&q, Dialect::Sqlite);
    assert!(stmt.text.ends_with("WHERE \"u\".\"Bcid\" IN (1, 2, 3)"), "{}", stmt.text);

    let ids = details()
        .filter(member("d", "Nickname").ne(lit("")))
        .select(vec![("Id", member("d", "Id"))]);
    let q = users().filter(in_query(field("Id"), ids.into_node()));
    let stmt = compile(&q, Dialect::Postgres);
    assert!(stmt.text.contains("WHERE \"u\".\"uid\" IN (SELECT"), "{}", stmt.text);
    validate_sql(&stmt.text, Dialect::Postgres).unwrap();
}

#[test]
fn test_take_while_and_skip_while_filter() {
    let stmt = compile(&users().take_while(field("Bcid").gt(0)), Dialect::TSql);
    assert!(stmt.text.ends_with("FROM [fei_users] AS [u]\nWHERE [u].[Bcid] > 0"), "{}", stmt.text);

    let q = users()
        .filter(field("IsActive").eq(true))
        .skip_while(field("Username").eq(lit("root")));
    let stmt = compile(&q, Dialect::Postgres);
    assert!(
        stmt.text
            .ends_with("WHERE \"u\".\"IsActive\" = true AND NOT (\"u\".\"name\" = $1)"),
        "{}",
        stmt.text
    );
    assert_eq!(stmt.parameters[0].value, Value::String("root".into()));
    validate_sql(&stmt.text, Dialect::Postgres).unwrap();
}

#[test]
fn test_is_null_or_empty_binds_the_empty_string() {
    let q = users().filter(field("Mobile").is_null_or_empty().not());
    let stmt = compile(&q, Dialect::TSql);
    assert!(
        stmt.text
            .ends_with("WHERE NOT ([u].[Mobile] IS NULL OR [u].[Mobile] = @p0)"),
        "{}",
        stmt.text
    );
    assert_eq!(parameter_names(&stmt), vec!["p0"]);
    assert_eq!(stmt.parameters[0].value, Value::String(String::new()));
    validate_sql(&stmt.text, Dialect::TSql).unwrap();
}

#[test]
fn test_unknown_member_and_entity() {
    let err = compile_err(&users().filter(field("Age").gt(3)), Dialect::TSql);
    assert!(matches!(err, CompileError::AliasResolution(_)), "{:?}", err);

    let err = compile_err(&Query::from_entity("Invoice", "i"), Dialect::TSql);
    assert!(matches!(err, CompileError::Metadata(_)), "{:?}", err);
}

#[test]
fn test_table_override() {
    let q = users().from_table("fei_users_2019").filter(field("Bcid").eq(1));
    let stmt = compile(&q, Dialect::TSql);
    assert!(stmt.text.contains("FROM [fei_users_2019] AS [u]"), "{}", stmt.text);
}
