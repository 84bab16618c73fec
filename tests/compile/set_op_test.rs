//! UNION, UNION ALL, INTERSECT and EXCEPT.

mod common;

use common::*;
use relq::ast::SetOpKind;
use relq::prelude::*;

fn names(alias: &str) -> Query {
    Query::of::<User>(alias).select(vec![("Id", field("Id")), ("Name", field("Username"))])
}

#[test]
fn test_union_of_filtered_branches() {
    let q = names("a")
        .filter(field("Name").starts_with("a"))
        .union(names("b").filter(field("Id").lt(0)));
    let stmt = compile(&q, Dialect::Postgres);

    insta::assert_snapshot!(stmt.text, @r#"
SELECT
  "a"."uid" AS "Id",
  "a"."name" AS "Name"
FROM "fei_users" AS "a"
WHERE "a"."name" LIKE $1 ESCAPE '\'
UNION
SELECT
  "b"."uid" AS "Id",
  "b"."name" AS "Name"
FROM "fei_users" AS "b"
WHERE "b"."uid" < 0
"#);
    validate_sql(&stmt.text, Dialect::Postgres).unwrap();
}

#[test]
fn test_mismatch_iff_names_or_order_differ() {
    let swapped = Query::of::<User>("b").select(vec![("Name", field("Username")), ("Id", field("Id"))]);
    let renamed = Query::of::<User>("b").select(vec![("Id", field("Id")), ("Nick", field("Username"))]);
    let shorter = Query::of::<User>("b").select(vec![("Id", field("Id"))]);

    for right in [swapped, renamed, shorter] {
        for kind in [SetOpKind::Union, SetOpKind::Concat, SetOpKind::Intersect, SetOpKind::Except] {
            let left = names("a");
            let q = match kind {
                SetOpKind::Union => left.union(right.clone()),
                SetOpKind::Concat => left.concat(right.clone()),
                SetOpKind::Intersect => left.intersect(right.clone()),
                SetOpKind::Except => left.except(right.clone()),
            };
            let err = compile_err(&q, Dialect::TSql);
            assert!(matches!(err, CompileError::SchemaMismatch(_)), "{:?}", err);
        }
    }

    // Same names in the same order, different sources: compatible.
    let details = Query::of::<UserDetail>("d")
        .select(vec![("Id", member("d", "Id")), ("Name", member("d", "Nickname"))]);
    let stmt = compile(&names("a").intersect(details), Dialect::TSql);
    assert!(stmt.text.contains("\nINTERSECT\n"), "{}", stmt.text);
}

#[test]
fn test_concat_and_except() {
    let stmt = compile(&names("a").concat(names("b")), Dialect::Sqlite);
    assert!(stmt.text.contains("\nUNION ALL\n"), "{}", stmt.text);
    validate_sql(&stmt.text, Dialect::Sqlite).unwrap();

    let stmt = compile(&names("a").except(names("b")), Dialect::DuckDb);
    assert!(stmt.text.contains("\nEXCEPT\n"), "{}", stmt.text);
}

#[test]
fn test_mysql_rejects_intersect_and_except() {
    for q in [names("a").intersect(names("b")), names("a").except(names("b"))] {
        let err = compile_err(&q, Dialect::MySql);
        match err {
            CompileError::DialectUnsupported(e) => assert_eq!(e.dialect, "mysql"),
            other => panic!("unexpected {:?}", other),
        }
    }
    // UNION is fine.
    compile(&names("a").union(names("b")), Dialect::MySql);
}

#[test]
fn test_ordering_and_paging_after_union_wrap() {
    let q = names("a")
        .union(names("b"))
        .order_by(field("Name"))
        .take(20);
    let stmt = compile(&q, Dialect::Postgres);
    assert!(stmt.text.starts_with("SELECT\n  \"t0\".\"Id\",\n  \"t0\".\"Name\"\nFROM (SELECT"), "{}", stmt.text);
    assert!(stmt.text.ends_with("ORDER BY \"t0\".\"Name\"\nLIMIT 20"), "{}", stmt.text);
    validate_sql(&stmt.text, Dialect::Postgres).unwrap();
}

#[test]
fn test_parameters_follow_branch_order() {
    let q = names("a")
        .filter(field("Name").eq(lit("x")))
        .union(names("b").filter(field("Name").eq(param("other", "y"))));
    let stmt = compile(&q, Dialect::MySql);
    assert_eq!(parameter_names(&stmt), vec!["p0", "other"]);
    assert_eq!(stmt.result_shape.len(), 2);
}
