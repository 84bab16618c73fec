//! Entity metadata.
//!
//! Maps entity members to physical columns. Mappings come from a
//! [`MetadataSource`] and are cached by a [`MetadataRegistry`] that the
//! compiler owns.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐   resolve("User")   ┌──────────────────────┐
//! │      Translator      │ ──────────────────▶ │   MetadataRegistry   │
//! └──────────────────────┘                     │  (DashMap, per name) │
//!                                              └──────────┬───────────┘
//!                                                         │ first use
//!                                                         ▼
//!                                              ┌──────────────────────┐
//!                                              │    MetadataSource    │
//!                                              │ (InMemorySource, ..) │
//!                                              └──────────────────────┘
//! ```

mod provider;
mod registry;
mod table;

pub use provider::{Entity, InMemorySource, MetadataSource};
pub use registry::MetadataRegistry;
pub use table::{ColumnMetadata, NamingConvention, TableMetadata, TableMetadataBuilder};

/// Result type for metadata operations.
pub type MetadataResult<T> = Result<T, MetadataError>;

/// Unresolvable or malformed entity mapping.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MetadataError {
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    #[error("Malformed mapping for entity {entity}: {reason}")]
    Malformed { entity: String, reason: String },
}
