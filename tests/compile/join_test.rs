//! Inner joins, outer joins and the default-value rewrite.

mod common;

use common::*;
use relq::prelude::*;

#[test]
fn test_end_to_end_join_filter_order() {
    let q = users()
        .join(details(), field("Id"), member("d", "Id"))
        .filter(
            field("Id")
                .gt(0)
                .and(field("Id").lt(param("max", 100)))
                .and(field("Username").contains("admin")),
        )
        .order_by_desc(field("Id"))
        .select(vec![
            ("Id", field("Id")),
            ("Name", field("Username")),
            ("Nick", member("d", "Nickname")),
        ]);
    let stmt = compile(&q, Dialect::TSql);

    insta::assert_snapshot!(stmt.text, @r"
SELECT
  [u].[uid] AS [Id],
  [u].[name] AS [Name],
  [d].[Nickname] AS [Nick]
FROM [fei_users] AS [u]
INNER JOIN [fei_userdetail] AS [d] ON [u].[uid] = [d].[uid]
WHERE [u].[uid] > 0 AND [u].[uid] < @max AND [u].[name] LIKE @p1 ESCAPE '\'
ORDER BY [u].[uid] DESC
");
    assert_eq!(stmt.text.matches("INNER JOIN").count(), 1);
    assert_eq!(stmt.text.matches("WHERE").count(), 1);
    assert_eq!(stmt.text.matches("ORDER BY").count(), 1);

    assert_eq!(parameter_names(&stmt), vec!["max", "p1"]);
    assert_eq!(stmt.parameters[0].value, Value::Int(100));
    assert_eq!(stmt.parameters[1].value, Value::String("%admin%".into()));
    validate_sql(&stmt.text, Dialect::TSql).unwrap();
}

#[test]
fn test_left_join_without_default_reads_plain_columns() {
    let outer = users()
        .left_join(details(), field("Id"), member("d", "Id"), None)
        .select(vec![("Name", field("Username")), ("Nick", member("d", "Nickname"))]);
    let stmt = compile(&outer, Dialect::Postgres);

    insta::assert_snapshot!(stmt.text, @r#"
SELECT
  "u"."name" AS "Name",
  "d"."Nickname" AS "Nick"
FROM "fei_users" AS "u"
LEFT OUTER JOIN "fei_userdetail" AS "d" ON "u"."uid" = "d"."uid"
"#);
    validate_sql(&stmt.text, Dialect::Postgres).unwrap();
}

#[test]
fn test_default_is_substituted_in_every_clause() {
    let q = users()
        .left_join(
            details(),
            field("Id"),
            member("d", "Id"),
            Some(DefaultValue::new().with("Nickname", "n/a")),
        )
        .filter(member("d", "Nickname").ne(lit("root")))
        .order_by(member("d", "Nickname"))
        .select(vec![("Nick", member("d", "Nickname"))]);

    let rewrite = "CASE WHEN [d].[uid] IS NOT NULL THEN [d].[Nickname] ELSE @nickname END";
    let stmt = compile(&q, Dialect::TSql);
    assert!(stmt.text.contains(&format!("{} AS [Nick]", rewrite)), "{}", stmt.text);
    assert!(stmt.text.contains(&format!("WHERE {} <> @p1", rewrite)), "{}", stmt.text);
    assert!(stmt.text.ends_with(&format!("ORDER BY {}", rewrite)), "{}", stmt.text);

    // Named placeholders bind the default once.
    assert_eq!(parameter_names(&stmt), vec!["nickname", "p1"]);
    assert_eq!(stmt.parameters[0].value, Value::String("n/a".into()));

    // Positional placeholders repeat it per occurrence.
    let stmt = compile(&q, Dialect::MySql);
    assert_eq!(parameter_names(&stmt), vec!["nickname", "nickname", "p1", "nickname"]);
    validate_sql(&stmt.text, Dialect::MySql).unwrap();
}

#[test]
fn test_numeric_default() {
    let q = users()
        .left_join(
            details(),
            field("Id"),
            member("d", "Id"),
            Some(DefaultValue::new().with("Id", 0)),
        )
        .select(vec![("DetailId", member("d", "Id"))]);
    let stmt = compile(&q, Dialect::Postgres);
    assert!(
        stmt.text
            .contains("CASE WHEN \"d\".\"uid\" IS NOT NULL THEN \"d\".\"uid\" ELSE $1 END AS \"DetailId\""),
        "{}",
        stmt.text
    );
    assert_eq!(stmt.parameters[0].name, "id");
    assert_eq!(stmt.parameters[0].value, Value::Int(0));
}

#[test]
fn test_join_result_shape_and_aliases() {
    let q = users()
        .join(Query::of::<UserDetail>("u2"), field("Id"), member("u2", "Id"))
        .select(vec![("Id", field("Id")), ("Since", member("u2", "Registertime"))]);
    let stmt = compile(&q, Dialect::Sqlite);

    let shape: Vec<_> = stmt
        .result_shape
        .iter()
        .map(|c| (c.name.as_str(), c.data_type))
        .collect();
    assert_eq!(shape, vec![("Id", DataType::Int64), ("Since", DataType::Timestamp)]);
    assert!(stmt.text.contains("INNER JOIN \"fei_userdetail\" AS \"u2\""), "{}", stmt.text);
    validate_sql(&stmt.text, Dialect::Sqlite).unwrap();
}

#[test]
fn test_join_derived_right_side() {
    let active = details().filter(member("d", "Nickname").is_not_null());
    let q = users()
        .join(active, field("Id"), member("d", "Id"))
        .select(vec![("Nick", member("d", "Nickname"))]);
    let stmt = compile(&q, Dialect::DuckDb);
    assert!(stmt.text.contains("INNER JOIN (SELECT"), "{}", stmt.text);
    assert!(stmt.text.contains(") AS \"t0\" ON \"u\".\"uid\" = \"t0\".\"Id\""), "{}", stmt.text);
    validate_sql(&stmt.text, Dialect::DuckDb).unwrap();
}

#[test]
fn test_joined_members_readable_after_take() {
    let q = users()
        .join(details(), field("Id"), member("d", "Id"))
        .order_by(field("Id"))
        .take(5)
        .filter(member("d", "Nickname").ne(lit("")));
    let stmt = compile(&q, Dialect::TSql);
    assert!(stmt.text.contains("[d].[Nickname] AS [d__Nickname]"), "{}", stmt.text);
    assert!(stmt.text.contains("WHERE [t0].[d__Nickname] <> @p0"), "{}", stmt.text);
    let shape: Vec<_> = stmt.result_shape.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(shape, vec!["Id", "Bcid", "Username", "Mobile", "Email", "IsActive"]);
    validate_sql(&stmt.text, Dialect::TSql).unwrap();
}

#[test]
fn test_joined_members_readable_after_distinct() {
    let q = users()
        .left_join(details(), field("Id"), member("d", "Id"), None)
        .distinct()
        .select(vec![("Nick", member("d", "Nickname"))]);
    let stmt = compile(&q, Dialect::Postgres);
    insta::assert_snapshot!(stmt.text, @r#"
SELECT
  "t0"."d__Nickname" AS "Nick"
FROM (SELECT DISTINCT
  "u"."uid" AS "Id",
  "u"."Bcid",
  "u"."name" AS "Username",
  "u"."Mobile",
  "u"."Email",
  "u"."IsActive",
  "d"."uid" AS "d__Id",
  "d"."Nickname" AS "d__Nickname",
  "d"."Registertime" AS "d__Registertime"
FROM "fei_users" AS "u"
LEFT OUTER JOIN "fei_userdetail" AS "d" ON "u"."uid" = "d"."uid") AS "t0"
"#);
    validate_sql(&stmt.text, Dialect::Postgres).unwrap();
}

#[test]
fn test_group_by_joined_member_after_paging() {
    let q = users()
        .join(details(), field("Id"), member("d", "Id"))
        .order_by(field("Id"))
        .skip(10)
        .group_by(member("d", "Nickname"))
        .select(vec![("Nick", key()), ("N", count())]);
    let stmt = compile(&q, Dialect::Postgres);
    assert!(stmt.text.ends_with("GROUP BY \"t0\".\"d__Nickname\""), "{}", stmt.text);
    assert!(stmt.text.starts_with("SELECT\n  \"t0\".\"d__Nickname\" AS \"Nick\""), "{}", stmt.text);
    validate_sql(&stmt.text, Dialect::Postgres).unwrap();
}
