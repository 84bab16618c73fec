//! Table and column metadata.

use std::collections::HashMap;
use std::str::FromStr;

use inflector::Inflector;
use serde::{Deserialize, Serialize};

use super::{MetadataError, MetadataResult};
use crate::sql::types::DataType;

// =============================================================================
// Naming
// =============================================================================

/// How member names map to physical names when no explicit name is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingConvention {
    #[default]
    AsIs,
    SnakeCase,
    CamelCase,
    PascalCase,
}

impl NamingConvention {
    pub fn apply(&self, name: &str) -> String {
        match self {
            NamingConvention::AsIs => name.to_string(),
            NamingConvention::SnakeCase => name.to_snake_case(),
            NamingConvention::CamelCase => name.to_camel_case(),
            NamingConvention::PascalCase => name.to_pascal_case(),
        }
    }
}

impl FromStr for NamingConvention {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "as_is" | "asis" | "none" => Ok(NamingConvention::AsIs),
            "snake_case" | "snake" => Ok(NamingConvention::SnakeCase),
            "camel_case" | "camel" => Ok(NamingConvention::CamelCase),
            "pascal_case" | "pascal" => Ok(NamingConvention::PascalCase),
            other => Err(format!("unknown naming convention '{}'", other)),
        }
    }
}

// =============================================================================
// Column Metadata
// =============================================================================

/// One mapped member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnMetadata {
    /// Member name as used in query expressions.
    pub member: String,
    /// Physical column name.
    pub column: String,
    pub data_type: DataType,
    /// Part of the primary key.
    pub key: bool,
    /// Appears in SELECT lists.
    pub readable: bool,
    /// Accepted by writes.
    pub writable: bool,
}

// =============================================================================
// Table Metadata
// =============================================================================

/// Mapping of one entity to a table. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableMetadata {
    pub entity: String,
    pub schema: Option<String>,
    pub table: String,
    columns: Vec<ColumnMetadata>,
    /// Lower-cased member name to position in `columns`.
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl TableMetadata {
    pub fn builder(entity: &str) -> TableMetadataBuilder {
        TableMetadataBuilder::new(entity)
    }

    /// All columns in declaration order.
    pub fn columns(&self) -> &[ColumnMetadata] {
        &self.columns
    }

    /// Look up a member, ignoring case.
    pub fn column(&self, member: &str) -> Option<&ColumnMetadata> {
        self.index
            .get(&member.to_lowercase())
            .map(|&i| &self.columns[i])
    }

    /// Primary-key columns in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &ColumnMetadata> {
        self.columns.iter().filter(|c| c.key)
    }

    pub fn readable(&self) -> impl Iterator<Item = &ColumnMetadata> {
        self.columns.iter().filter(|c| c.readable)
    }

    pub fn writable(&self) -> impl Iterator<Item = &ColumnMetadata> {
        self.columns.iter().filter(|c| c.writable)
    }
}

/// Builder for [`TableMetadata`]; validation happens in [`build`](Self::build).
///
/// ```ignore
/// let users = TableMetadata::builder("User")
///     .schema("dbo")
///     .table("fei_users")
///     .column_as("Id", "uid", DataType::Int64)
///     .column("Username", DataType::String)
///     .key("Id")
///     .build()?;
/// ```
#[derive(Debug, Clone)]
#[must_use = "builders have no effect until built"]
pub struct TableMetadataBuilder {
    entity: String,
    schema: Option<String>,
    table: Option<String>,
    naming: NamingConvention,
    columns: Vec<ColumnMetadata>,
    keys: Vec<String>,
    read_only: Vec<String>,
    write_only: Vec<String>,
}

impl TableMetadataBuilder {
    pub fn new(entity: &str) -> Self {
        Self {
            entity: entity.into(),
            schema: None,
            table: None,
            naming: NamingConvention::AsIs,
            columns: Vec::new(),
            keys: Vec::new(),
            read_only: Vec::new(),
            write_only: Vec::new(),
        }
    }

    pub fn schema(mut self, schema: &str) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Explicit table name. Defaults to the entity name under the naming convention.
    pub fn table(mut self, table: &str) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Applies to the table name and to columns added with [`column`](Self::column).
    pub fn naming(mut self, naming: NamingConvention) -> Self {
        self.naming = naming;
        self
    }

    pub fn column(self, member: &str, data_type: DataType) -> Self {
        let column = self.naming.apply(member);
        self.column_as(member, &column, data_type)
    }

    pub fn column_as(mut self, member: &str, column: &str, data_type: DataType) -> Self {
        self.columns.push(ColumnMetadata {
            member: member.into(),
            column: column.into(),
            data_type,
            key: false,
            readable: true,
            writable: true,
        });
        self
    }

    pub fn key(mut self, member: &str) -> Self {
        self.keys.push(member.into());
        self
    }

    /// Computed or database-generated member: selected, never written.
    pub fn read_only(mut self, member: &str) -> Self {
        self.read_only.push(member.into());
        self
    }

    /// Write-only member (e.g. a password hash): written, never selected.
    pub fn write_only(mut self, member: &str) -> Self {
        self.write_only.push(member.into());
        self
    }

    pub fn build(self) -> MetadataResult<TableMetadata> {
        let entity = self.entity;
        if entity.trim().is_empty() {
            return Err(MetadataError::Malformed {
                entity,
                reason: "entity name is empty".into(),
            });
        }
        if self.columns.is_empty() {
            return Err(MetadataError::Malformed {
                entity,
                reason: "no columns mapped".into(),
            });
        }

        let table = match self.table {
            Some(t) if t.trim().is_empty() => {
                return Err(MetadataError::Malformed {
                    entity,
                    reason: "table name is empty".into(),
                })
            }
            Some(t) => t,
            None => self.naming.apply(&entity),
        };

        let mut columns = self.columns;
        let mut index = HashMap::with_capacity(columns.len());
        for (i, col) in columns.iter().enumerate() {
            if index.insert(col.member.to_lowercase(), i).is_some() {
                return Err(MetadataError::Malformed {
                    reason: format!("member '{}' is mapped twice", col.member),
                    entity,
                });
            }
        }

        let flags = [
            (&self.keys, Flag::Key),
            (&self.read_only, Flag::ReadOnly),
            (&self.write_only, Flag::WriteOnly),
        ];
        for (members, flag) in flags {
            for member in members {
                let Some(&i) = index.get(&member.to_lowercase()) else {
                    return Err(MetadataError::Malformed {
                        reason: format!("{} member '{}' is not mapped", flag.label(), member),
                        entity,
                    });
                };
                match flag {
                    Flag::Key => columns[i].key = true,
                    Flag::ReadOnly => columns[i].writable = false,
                    Flag::WriteOnly => columns[i].readable = false,
                }
            }
        }

        if !columns.iter().any(|c| c.readable) {
            return Err(MetadataError::Malformed {
                entity,
                reason: "no readable columns".into(),
            });
        }

        Ok(TableMetadata {
            entity,
            schema: self.schema,
            table,
            columns,
            index,
        })
    }
}

#[derive(Clone, Copy)]
enum Flag {
    Key,
    ReadOnly,
    WriteOnly,
}

impl Flag {
    fn label(self) -> &'static str {
        match self {
            Flag::Key => "key",
            Flag::ReadOnly => "read-only",
            Flag::WriteOnly => "write-only",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> TableMetadata {
        TableMetadata::builder("User")
            .schema("dbo")
            .table("fei_users")
            .column_as("Id", "uid", DataType::Int64)
            .column("Username", DataType::String)
            .column("PasswordHash", DataType::String)
            .column("CreatedTime", DataType::Timestamp)
            .key("Id")
            .read_only("CreatedTime")
            .write_only("PasswordHash")
            .build()
            .unwrap()
    }

    #[test]
    fn test_case_insensitive_lookup() {
        let table = users();
        assert_eq!(table.column("id").unwrap().column, "uid");
        assert_eq!(table.column("USERNAME").unwrap().member, "Username");
        assert!(table.column("Nickname").is_none());
    }

    #[test]
    fn test_column_subsets() {
        let table = users();
        let keys: Vec<_> = table.keys().map(|c| c.member.as_str()).collect();
        assert_eq!(keys, vec!["Id"]);
        assert!(table.readable().all(|c| c.member != "PasswordHash"));
        assert!(table.writable().all(|c| c.member != "CreatedTime"));
    }

    #[test]
    fn test_naming_convention() {
        let table = TableMetadata::builder("UserDetail")
            .naming(NamingConvention::SnakeCase)
            .column("NickName", DataType::String)
            .build()
            .unwrap();
        assert_eq!(table.table, "user_detail");
        assert_eq!(table.columns()[0].column, "nick_name");
    }

    #[test]
    fn test_malformed_metadata() {
        let err = TableMetadata::builder("User").build().unwrap_err();
        assert!(matches!(err, MetadataError::Malformed { .. }));

        let err = TableMetadata::builder("User")
            .column("Id", DataType::Int64)
            .column("id", DataType::Int64)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("mapped twice"), "{}", err);

        let err = TableMetadata::builder("User")
            .column("Id", DataType::Int64)
            .key("Uid")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("key member 'Uid'"), "{}", err);
    }

    #[test]
    fn test_naming_from_str() {
        assert_eq!(
            "snake_case".parse::<NamingConvention>(),
            Ok(NamingConvention::SnakeCase)
        );
        assert!("kebab".parse::<NamingConvention>().is_err());
    }
}
