//! Metadata sources.
//!
//! The compiler never declares mappings itself. A [`MetadataSource`] supplies
//! them; [`Entity`] lets a Rust type carry its own mapping.

use std::collections::HashMap;

use super::{MetadataError, MetadataResult, TableMetadata};

/// A type mapped to a table.
///
/// ```ignore
/// struct User;
///
/// impl Entity for User {
///     const NAME: &'static str = "User";
///
///     fn table_metadata() -> MetadataResult<TableMetadata> {
///         TableMetadata::builder(Self::NAME)
///             .table("fei_users")
///             .column_as("Id", "uid", DataType::Int64)
///             .key("Id")
///             .build()
///     }
/// }
/// ```
pub trait Entity {
    /// Entity name used in [`Query::from_entity`](crate::ast::Query::from_entity).
    const NAME: &'static str;

    fn table_metadata() -> MetadataResult<TableMetadata>;
}

/// Supplies table metadata for entity names.
///
/// Implementations are called at most once per entity by
/// [`MetadataRegistry`](super::MetadataRegistry); they need not cache.
pub trait MetadataSource: Send + Sync {
    /// Load the mapping of `entity`. Lookup is case-insensitive.
    fn load(&self, entity: &str) -> MetadataResult<TableMetadata>;

    /// Entity names this source knows, for preloading.
    fn entities(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Source backed by mappings registered up front.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    tables: HashMap<String, TableMetadata>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a built mapping under its entity name.
    pub fn with_table(mut self, table: TableMetadata) -> Self {
        self.tables.insert(table.entity.to_lowercase(), table);
        self
    }

    /// Register a typed entity's mapping.
    pub fn with_entity<E: Entity>(self) -> MetadataResult<Self> {
        Ok(self.with_table(E::table_metadata()?))
    }
}

impl MetadataSource for InMemorySource {
    fn load(&self, entity: &str) -> MetadataResult<TableMetadata> {
        self.tables
            .get(&entity.to_lowercase())
            .cloned()
            .ok_or_else(|| MetadataError::UnknownEntity(entity.into()))
    }

    fn entities(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.values().map(|t| t.entity.clone()).collect();
        names.sort();
        names
    }
}
