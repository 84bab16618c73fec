//! Read-through metadata cache.

use std::sync::Arc;

use dashmap::DashMap;
use log::debug;

use super::{MetadataResult, MetadataSource, TableMetadata};

/// Owns the metadata a compiler reads.
///
/// Entries are loaded from the source on first use and never change
/// afterwards, so concurrent readers never contend with a writer once the
/// registry is warm. Two threads missing the same entity may both load it;
/// the first insert wins and both observe the same `Arc`.
pub struct MetadataRegistry {
    source: Arc<dyn MetadataSource>,
    tables: DashMap<String, Arc<TableMetadata>>,
}

impl MetadataRegistry {
    pub fn new(source: impl MetadataSource + 'static) -> Self {
        Self {
            source: Arc::new(source),
            tables: DashMap::new(),
        }
    }

    /// Resolve an entity, loading it on first use.
    pub fn resolve(&self, entity: &str) -> MetadataResult<Arc<TableMetadata>> {
        let key = entity.to_lowercase();
        if let Some(table) = self.tables.get(&key) {
            return Ok(table.clone());
        }

        let loaded = Arc::new(self.source.load(entity)?);
        let table = self.tables.entry(key).or_insert(loaded).clone();
        debug!(
            "metadata for {} resolved to table {}",
            table.entity, table.table
        );
        Ok(table)
    }

    /// Load every entity the source lists, failing on the first bad mapping.
    pub fn preload(&self) -> MetadataResult<usize> {
        let entities = self.source.entities();
        for entity in &entities {
            self.resolve(entity)?;
        }
        Ok(entities.len())
    }

    /// Number of resolved entities.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

impl std::fmt::Debug for MetadataRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataRegistry")
            .field("resolved", &self.tables.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::{InMemorySource, MetadataError};
    use crate::sql::types::DataType;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        inner: InMemorySource,
        loads: AtomicUsize,
    }

    impl MetadataSource for CountingSource {
        fn load(&self, entity: &str) -> MetadataResult<TableMetadata> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            self.inner.load(entity)
        }
    }

    fn source() -> InMemorySource {
        InMemorySource::new().with_table(
            TableMetadata::builder("User")
                .column("Id", DataType::Int64)
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn test_resolve_is_cached() {
        let registry = MetadataRegistry::new(CountingSource {
            inner: source(),
            loads: AtomicUsize::new(0),
        });
        let a = registry.resolve("User").unwrap();
        let b = registry.resolve("user").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_entity() {
        let registry = MetadataRegistry::new(source());
        assert!(matches!(
            registry.resolve("Order"),
            Err(MetadataError::UnknownEntity(_))
        ));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_preload() {
        let registry = MetadataRegistry::new(source());
        assert_eq!(registry.preload().unwrap(), 1);
        assert_eq!(registry.len(), 1);
    }
}
