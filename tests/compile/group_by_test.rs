//! Grouping, HAVING routing and scalar aggregates.

mod common;

use common::*;
use relq::prelude::*;

#[test]
fn test_composite_group_with_having() {
    let q = users()
        .group_by_composite(vec![("Mobile", field("Mobile")), ("Bcid", field("Bcid"))])
        .filter(
            key_member("Mobile")
                .eq(lit(""))
                .and(count_where(field("Bcid").gt(0)).gt(2)),
        )
        .select(vec![
            ("Mobile", key_member("Mobile")),
            ("Bcid", key_member("Bcid")),
            ("N", count()),
        ]);
    let stmt = compile(&q, Dialect::TSql);

    insta::assert_snapshot!(stmt.text, @r"
SELECT
  [u].[Mobile],
  [u].[Bcid],
  COUNT(*) AS [N]
FROM [fei_users] AS [u]
GROUP BY [u].[Mobile], [u].[Bcid]
HAVING [u].[Mobile] = @p0 AND SUM(CASE WHEN [u].[Bcid] > 0 THEN 1 ELSE 0 END) > 2
");
    assert_eq!(stmt.parameters[0].value, Value::String(String::new()));
    validate_sql(&stmt.text, Dialect::TSql).unwrap();
}

#[test]
fn test_key_only_filter_goes_to_where() {
    let q = users()
        .group_by(field("Bcid"))
        .filter(key().gt(10))
        .select(vec![("Code", key()), ("N", count())]);
    let stmt = compile(&q, Dialect::Postgres);
    assert!(stmt.text.contains("WHERE \"u\".\"Bcid\" > 10\nGROUP BY \"u\".\"Bcid\""), "{}", stmt.text);
    assert!(!stmt.text.contains("HAVING"), "{}", stmt.text);
}

#[test]
fn test_clause_order_is_fixed() {
    // Composed out of order: ordering first, filters on both sides of the grouping.
    let q = users()
        .filter(field("IsActive"))
        .group_by(field("Bcid"))
        .order_by(key())
        .filter(count().gt(1))
        .select(vec![("Code", key()), ("Total", sum(field("Id")))]);
    let stmt = compile(&q, Dialect::Postgres);

    let positions: Vec<usize> = ["\nWHERE ", "\nGROUP BY ", "\nHAVING ", "\nORDER BY "]
        .iter()
        .map(|clause| stmt.text.find(clause).unwrap_or_else(|| panic!("{} missing: {}", clause, stmt.text)))
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{}", stmt.text);
    validate_sql(&stmt.text, Dialect::Postgres).unwrap();
}

#[test]
fn test_aggregates_in_projection() {
    let q = users().group_by(field("Mobile")).select(vec![
        ("Mobile", key()),
        ("Low", min(field("Bcid"))),
        ("High", max(field("Bcid"))),
        ("Mean", average(field("Bcid"))),
        ("Rows", long_count()),
    ]);
    let stmt = compile(&q, Dialect::MySql);
    assert!(stmt.text.contains("MIN(`u`.`Bcid`) AS `Low`"), "{}", stmt.text);
    assert!(stmt.text.contains("AVG(`u`.`Bcid`) AS `Mean`"), "{}", stmt.text);

    let types: Vec<_> = stmt.result_shape.iter().map(|c| c.data_type).collect();
    assert_eq!(
        types,
        vec![
            DataType::String,
            DataType::Int32,
            DataType::Int32,
            DataType::Float64,
            DataType::Int64
        ]
    );
    validate_sql(&stmt.text, Dialect::MySql).unwrap();
}

#[test]
fn test_scalar_count() {
    let stmt = compile(&users().filter(field("Bcid").gt(1)).count(), Dialect::TSql);
    insta::assert_snapshot!(stmt.text, @r"
SELECT
  COUNT(*) AS [Count]
FROM [fei_users] AS [u]
WHERE [u].[Bcid] > 1
");
    assert_eq!(stmt.result_shape[0].data_type, DataType::Int32);
}

#[test]
fn test_scalar_sum_with_default() {
    let q = users()
        .default_if_empty(Some(DefaultValue::new().with("Bcid", 0)))
        .sum(field("Bcid"));
    let stmt = compile(&q, Dialect::Postgres);
    assert!(
        stmt.text.contains("COALESCE(SUM(\"u\".\"Bcid\"), $1) AS \"Sum\""),
        "{}",
        stmt.text
    );
    assert_eq!(parameter_names(&stmt), vec!["bcid"]);
    assert_eq!(stmt.parameters[0].value, Value::Int(0));
}

#[test]
fn test_default_if_empty_alone_is_rejected() {
    let err = compile_err(&users().default_if_empty(None), Dialect::TSql);
    assert!(matches!(err, CompileError::Translation(_)), "{:?}", err);
}

#[test]
fn test_scalar_any_and_all() {
    let stmt = compile(&users().any_where(field("Bcid").gt(1)), Dialect::Postgres);
    assert!(stmt.text.starts_with("SELECT\n  EXISTS (SELECT"), "{}", stmt.text);
    assert_eq!(stmt.result_shape[0].data_type, DataType::Bool);

    let stmt = compile(&users().all(field("IsActive")), Dialect::TSql);
    assert!(
        stmt.text.starts_with("SELECT\n  CASE WHEN NOT EXISTS (SELECT"),
        "{}",
        stmt.text
    );
    assert!(stmt.text.ends_with("THEN 1 ELSE 0 END AS [All]"), "{}", stmt.text);
}

#[test]
fn test_aggregate_needs_grouping() {
    let err = compile_err(&users().select(vec![("N", count())]), Dialect::TSql);
    assert!(err.to_string().contains("aggregate"), "{}", err);
}
