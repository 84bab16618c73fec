//! Statement cache behaviour through the compiler.

use std::sync::Arc;
use std::thread;

use relq::cache::StatementCache;
use relq::prelude::*;

fn registry() -> Arc<MetadataRegistry> {
    let users = TableMetadata::builder("User")
        .table("users")
        .column("Id", DataType::Int64)
        .column("Name", DataType::String)
        .column("Age", DataType::Int32)
        .key("Id")
        .build()
        .unwrap();
    Arc::new(MetadataRegistry::new(InMemorySource::new().with_table(users)))
}

fn cached(cache: &Arc<StatementCache>, dialect: Dialect) -> Compiler {
    Compiler::new(registry())
        .with_options(CompileOptions::default().with_dialect(dialect))
        .with_cache(Arc::clone(cache))
}

fn by_name(name: &str) -> Query {
    Query::from_entity("User", "u").filter(field("Name").eq(lit(name)))
}

#[test]
fn test_same_shape_hits() {
    let cache = Arc::new(StatementCache::new(16));
    let compiler = cached(&cache, Dialect::Postgres);

    let ann = compiler.compile(by_name("ann").node()).unwrap();
    let bob = compiler.compile(by_name("bob").node()).unwrap();

    assert_eq!(ann.text, bob.text);
    assert_eq!(ann.parameters[0].value, Value::String("ann".into()));
    assert_eq!(bob.parameters[0].value, Value::String("bob".into()));

    let stats = cache.stats();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.entries, 1);
    assert!((stats.hit_rate() - 0.5).abs() < f64::EPSILON);
}

#[test]
fn test_inlined_literals_and_dialects_miss() {
    let cache = Arc::new(StatementCache::new(16));
    let older = |age: i32| Query::from_entity("User", "u").filter(field("Age").gt(age));

    let pg = cached(&cache, Dialect::Postgres);
    let a = pg.compile(older(30).node()).unwrap();
    let b = pg.compile(older(40).node()).unwrap();
    assert_ne!(a.text, b.text);

    cached(&cache, Dialect::TSql).compile(older(30).node()).unwrap();
    assert_eq!(cache.stats().misses, 3);
    assert_eq!(cache.len(), 3);
}

#[test]
fn test_cached_output_matches_uncached() {
    let q = Query::from_entity("User", "u")
        .filter(field("Name").starts_with("a").and(field("Age").lt(param("max", 65))))
        .order_by(field("Name"))
        .take(10);
    let plain = Compiler::new(registry())
        .with_options(CompileOptions::default().with_dialect(Dialect::TSql));
    let cache = Arc::new(StatementCache::default());
    let compiler = cached(&cache, Dialect::TSql);

    let expected = plain.compile(q.node()).unwrap();
    assert_eq!(compiler.compile(q.node()).unwrap(), expected);
    assert_eq!(compiler.compile(q.node()).unwrap(), expected);
    assert_eq!(cache.stats().hits, 1);
}

#[test]
fn test_full_cache_keeps_compiling() {
    let cache = Arc::new(StatementCache::new(1));
    let compiler = cached(&cache, Dialect::Sqlite);
    let by_age = |age: i32| Query::from_entity("User", "u").filter(field("Age").eq(age));

    compiler.compile(by_age(1).node()).unwrap();
    let second = compiler.compile(by_age(2).node()).unwrap();
    assert!(second.text.ends_with("WHERE \"u\".\"Age\" = 2"), "{}", second.text);
    assert_eq!(cache.len(), 1);

    cache.clear();
    assert!(cache.is_empty());
}

#[test]
fn test_concurrent_misses_keep_one_entry() {
    let cache = Arc::new(StatementCache::new(16));
    let compiler = cached(&cache, Dialect::Postgres);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let compiler = compiler.clone();
            thread::spawn(move || {
                compiler
                    .compile(by_name(&format!("user{}", i)).node())
                    .unwrap()
                    .text
            })
        })
        .collect();
    let texts: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert!(texts.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.stats().hits + cache.stats().misses, 8);
}
