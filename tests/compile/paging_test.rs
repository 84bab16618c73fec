//! Ordering, paging and single-row reductions across dialects.

mod common;

use common::*;
use relq::prelude::*;
use relq::ast::ElementKind;

fn page() -> Query {
    users()
        .select(vec![("Id", field("Id")), ("Name", field("Username"))])
        .order_by(field("Id"))
        .skip(20)
        .take(10)
}

#[test]
fn test_page_per_dialect() {
    let tsql = compile(&page(), Dialect::TSql);
    insta::assert_snapshot!(tsql.text, @r"
SELECT
  [u].[uid] AS [Id],
  [u].[name] AS [Name]
FROM [fei_users] AS [u]
ORDER BY [u].[uid]
OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY
");

    let pg = compile(&page(), Dialect::Postgres);
    assert!(pg.text.ends_with("ORDER BY \"u\".\"uid\"\nLIMIT 10 OFFSET 20"), "{}", pg.text);

    for dialect in [Dialect::TSql, Dialect::Postgres, Dialect::MySql, Dialect::Sqlite, Dialect::DuckDb] {
        let stmt = compile(&page(), dialect);
        validate_sql(&stmt.text, dialect).unwrap();
    }
}

#[test]
fn test_row_number_paging_on_legacy_tsql() {
    let stmt = compile(&page(), Dialect::TSqlLegacy);
    insta::assert_snapshot!(stmt.text, @r"
SELECT
  [t0].[Id],
  [t0].[Name]
FROM (SELECT
  [u].[uid] AS [Id],
  [u].[name] AS [Name],
  ROW_NUMBER() OVER (ORDER BY [u].[uid]) AS [__rownum]
FROM [fei_users] AS [u]) AS [t0]
WHERE [t0].[__rownum] > 20 AND [t0].[__rownum] <= 30
ORDER BY [t0].[__rownum]
");
    let shape: Vec<_> = stmt.result_shape.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(shape, vec!["Id", "Name"]);
    validate_sql(&stmt.text, Dialect::TSqlLegacy).unwrap();
}

#[test]
fn test_skip_without_take() {
    let q = users().order_by(field("Id")).skip(5);
    let mysql = compile(&q, Dialect::MySql);
    assert!(mysql.text.ends_with("LIMIT 18446744073709551615 OFFSET 5"), "{}", mysql.text);

    let sqlite = compile(&q, Dialect::Sqlite);
    assert!(sqlite.text.ends_with("LIMIT -1 OFFSET 5"), "{}", sqlite.text);

    let pg = compile(&q, Dialect::Postgres);
    assert!(pg.text.ends_with("ORDER BY \"u\".\"uid\"\nOFFSET 5"), "{}", pg.text);
}

#[test]
fn test_exhausted_page_fetches_nothing() {
    let q = users().order_by(field("Id")).take(5).skip(5);
    let stmt = compile(&q, Dialect::TSql);
    insta::assert_snapshot!(stmt.text, @r"
SELECT TOP (0)
  [u].[uid] AS [Id],
  [u].[Bcid],
  [u].[name] AS [Username],
  [u].[Mobile],
  [u].[Email],
  [u].[IsActive]
FROM [fei_users] AS [u]
ORDER BY [u].[uid]
");
    validate_sql(&stmt.text, Dialect::TSql).unwrap();

    let at = compile(&users().order_by(field("Id")).take(5).element_at(5), Dialect::TSql);
    assert!(at.text.starts_with("SELECT TOP (0)"), "{}", at.text);
    assert!(!at.text.contains("FETCH NEXT 0"), "{}", at.text);

    let legacy = compile(&q, Dialect::TSqlLegacy);
    assert!(legacy.text.starts_with("SELECT TOP (0)"), "{}", legacy.text);
    validate_sql(&legacy.text, Dialect::TSqlLegacy).unwrap();
}

#[test]
fn test_offset_fetch_without_ordering_uses_placeholder() {
    let stmt = compile(&users().skip(5).take(5), Dialect::TSql);
    assert!(
        stmt.text.ends_with("ORDER BY (SELECT NULL)\nOFFSET 5 ROWS FETCH NEXT 5 ROWS ONLY"),
        "{}",
        stmt.text
    );
}

#[test]
fn test_reverse_inverts_ordering() {
    let q = users().order_by(field("Bcid")).then_by_desc(field("Id")).reverse();
    let stmt = compile(&q, Dialect::TSql);
    assert!(stmt.text.ends_with("ORDER BY [u].[Bcid] DESC, [u].[uid]"), "{}", stmt.text);

    // A later explicit ordering replaces the reversed one.
    let q = users().order_by(field("Id")).reverse().order_by_desc(field("Bcid"));
    let stmt = compile(&q, Dialect::TSql);
    assert!(stmt.text.ends_with("ORDER BY [u].[Bcid] DESC"), "{}", stmt.text);
}

#[test]
fn test_reverse_requires_ordering() {
    let err = compile_err(&users().reverse(), Dialect::Postgres);
    match err {
        CompileError::OrderingRequired(e) => assert_eq!(e.operation, "Reverse"),
        other => panic!("unexpected {:?}", other),
    }

    for q in [users().take_last(2), users().skip_last(2), users().last()] {
        let err = compile_err(&q, Dialect::Postgres);
        assert!(matches!(err, CompileError::OrderingRequired(_)), "{:?}", err);
    }
}

#[test]
fn test_take_last() {
    let q = users().order_by(field("Id")).take_last(3);
    let stmt = compile(&q, Dialect::Postgres);
    assert!(stmt.text.contains("ORDER BY \"u\".\"uid\" DESC\nLIMIT 3) AS \"t0\""), "{}", stmt.text);
    assert!(stmt.text.ends_with("ORDER BY \"t0\".\"Id\""), "{}", stmt.text);
    validate_sql(&stmt.text, Dialect::Postgres).unwrap();
}

#[test]
fn test_element_reductions() {
    let first = compile(&users().order_by(field("Id")).first(), Dialect::TSql);
    assert!(first.text.starts_with("SELECT TOP (1)"), "{}", first.text);
    let expectation = first.row_expectation.unwrap();
    assert_eq!(expectation.kind, ElementKind::First);
    assert!(!expectation.or_default);

    let single = compile(&users().filter(field("Id").eq(7)).single(), Dialect::Postgres);
    assert!(single.text.ends_with("LIMIT 2"), "{}", single.text);
    assert!(single.row_expectation.unwrap().is_single());

    let last = compile(&users().order_by(field("Id")).last_or_default(), Dialect::Postgres);
    assert!(last.text.ends_with("ORDER BY \"u\".\"uid\" DESC\nLIMIT 1"), "{}", last.text);
    assert!(last.row_expectation.unwrap().or_default);

    let at = compile(&users().order_by(field("Id")).element_at(4), Dialect::Sqlite);
    assert!(at.text.ends_with("LIMIT 1 OFFSET 4"), "{}", at.text);
    assert!(!at.row_expectation.unwrap().or_default);

    let at = compile(&users().order_by(field("Id")).element_at_or_default(4), Dialect::Sqlite);
    assert_eq!(at.row_expectation.unwrap().kind, ElementKind::ElementAt(4));

    let first = compile(&users().order_by(field("Id")).first_or_default(), Dialect::MySql);
    assert!(first.text.ends_with("LIMIT 1"), "{}", first.text);
    assert!(first.row_expectation.unwrap().or_default);
}

#[test]
fn test_no_result_message_travels_with_statement() {
    let q = users()
        .filter(field("Id").eq(param("id", 42)))
        .first()
        .no_result_error("user not found")
        .timeout(5);
    let stmt = compile(&q, Dialect::TSql);
    assert_eq!(
        stmt.row_expectation.and_then(|e| e.message).as_deref(),
        Some("user not found")
    );
    assert_eq!(stmt.timeout, Some(5));
}

#[test]
fn test_total_count_statement() {
    let options = CompileOptions::default()
        .with_dialect(Dialect::TSql)
        .with_total_count(true);
    let compiler = Compiler::new(registry()).with_options(options);
    let q = users().filter(field("Username").contains("a")).order_by(field("Id")).skip(10).take(10);
    let stmt = compiler.compile(q.node()).unwrap();

    let count = stmt.count_statement.as_deref().unwrap();
    insta::assert_snapshot!(count.text, @r"
SELECT
  COUNT(*) AS [Count]
FROM [fei_users] AS [u]
WHERE [u].[name] LIKE @p0 ESCAPE '\'
");
    assert_eq!(count.parameters, stmt.parameters);
}
