//! Alias and scope management.
//!
//! Every source in a statement gets a physical alias that is unique across
//! the whole statement, including nested subqueries. Bindings from logical
//! source names to those aliases live in a stack of frames; a correlated
//! subquery pushes a frame and can still see every enclosing binding.

use std::collections::HashSet;
use std::sync::Arc;

use crate::metadata::TableMetadata;
use crate::sql::expr::{case_when, table_col, ExprExt, SqlExpr};
use crate::sql::types::DataType;

/// Unbound source or member.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AliasResolutionError {
    #[error("Unknown source '{0}'")]
    UnknownSource(String),

    #[error("Source '{source_name}' has no readable member '{member}'")]
    UnknownMember { source_name: String, member: String },

    #[error("Current row has no member '{0}'")]
    UnknownField(String),

    #[error("Group key referenced outside a grouping")]
    KeyOutsideGroup,
}

pub type ScopeResult<T> = Result<T, AliasResolutionError>;

/// A resolved member: the SQL expression to emit and its type.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMember {
    pub name: String,
    pub sql: SqlExpr,
    pub data_type: DataType,
}

/// Outer-join fallback applied to every column of the optional side.
///
/// `test` is the right-hand join key; when it is NULL the row did not
/// match and the member's default (or NULL) is used instead.
#[derive(Debug, Clone, PartialEq)]
pub struct OuterRewrite {
    pub test: SqlExpr,
    /// Lower-cased member name to default expression.
    pub defaults: Vec<(String, SqlExpr)>,
}

impl OuterRewrite {
    fn apply(&self, member: &str, column: SqlExpr) -> SqlExpr {
        let fallback = self
            .defaults
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(member))
            .map(|(_, e)| e.clone());
        match fallback {
            Some(default) => case_when(
                self.test.clone().is_not_null(),
                column,
                Some(default),
            ),
            None => column,
        }
    }
}

/// What a logical source name is bound to.
#[derive(Debug, Clone)]
pub enum BindingTarget {
    /// A table in the current FROM/JOIN list.
    Table {
        alias: String,
        metadata: Arc<TableMetadata>,
    },
    /// Columns re-exposed by a derived table.
    Rebound { members: Vec<ResolvedMember> },
}

#[derive(Debug, Clone)]
pub struct Binding {
    pub source: String,
    pub target: BindingTarget,
    pub outer: Option<OuterRewrite>,
}

impl Binding {
    pub fn table(source: &str, alias: &str, metadata: Arc<TableMetadata>) -> Self {
        Self {
            source: source.into(),
            target: BindingTarget::Table {
                alias: alias.into(),
                metadata,
            },
            outer: None,
        }
    }

    pub fn rebound(source: &str, members: Vec<ResolvedMember>) -> Self {
        Self {
            source: source.into(),
            target: BindingTarget::Rebound { members },
            outer: None,
        }
    }

    /// Resolve one member, applying the outer-join rewrite.
    pub fn resolve(&self, member: &str) -> ScopeResult<ResolvedMember> {
        let raw = self.resolve_raw(member)?;
        Ok(match &self.outer {
            Some(outer) => ResolvedMember {
                sql: outer.apply(member, raw.sql),
                ..raw
            },
            None => raw,
        })
    }

    /// Resolve without the outer-join rewrite. Only join conditions read this.
    pub fn resolve_raw(&self, member: &str) -> ScopeResult<ResolvedMember> {
        let found = match &self.target {
            BindingTarget::Table { alias, metadata } => metadata
                .column(member)
                .filter(|c| c.readable)
                .map(|c| ResolvedMember {
                    name: c.member.clone(),
                    sql: table_col(alias, &c.column),
                    data_type: c.data_type,
                }),
            BindingTarget::Rebound { members } => members
                .iter()
                .find(|m| m.name.eq_ignore_ascii_case(member))
                .cloned(),
        };
        found.ok_or_else(|| AliasResolutionError::UnknownMember {
            source_name: self.source.clone(),
            member: member.into(),
        })
    }

    /// Every readable member in declaration order, rewritten.
    pub fn members(&self) -> Vec<ResolvedMember> {
        let names: Vec<String> = match &self.target {
            BindingTarget::Table { metadata, .. } => {
                metadata.readable().map(|c| c.member.clone()).collect()
            }
            BindingTarget::Rebound { members } => members.iter().map(|m| m.name.clone()).collect(),
        };
        names
            .iter()
            .filter_map(|name| self.resolve(name).ok())
            .collect()
    }
}

/// Per-statement alias allocator and binding stack.
#[derive(Debug)]
pub struct AliasManager {
    /// Lower-cased aliases handed out so far.
    used: HashSet<String>,
    frames: Vec<Vec<Binding>>,
}

impl Default for AliasManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AliasManager {
    pub fn new() -> Self {
        Self {
            used: HashSet::new(),
            frames: vec![Vec::new()],
        }
    }

    pub fn enter_scope(&mut self) {
        self.frames.push(Vec::new());
    }

    pub fn exit_scope(&mut self) {
        // The root frame lives as long as the statement.
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Nesting level; 0 is the statement itself.
    pub fn depth(&self) -> usize {
        self.frames.len() - 1
    }

    /// Allocate an alias unique within the statement.
    ///
    /// The preferred name is used as is when free, otherwise a numeric
    /// suffix is appended. An empty preference allocates `t0`, `t1`, ...
    pub fn reserve_alias(&mut self, preferred: &str) -> String {
        let base = if preferred.is_empty() { "t" } else { preferred };
        if !preferred.is_empty() && self.used.insert(base.to_lowercase()) {
            return base.to_string();
        }
        let mut n = if preferred.is_empty() { 0 } else { 1 };
        loop {
            let candidate = format!("{}{}", base, n);
            if self.used.insert(candidate.to_lowercase()) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Bind into the innermost frame, replacing a binding of the same name.
    pub fn bind(&mut self, binding: Binding) {
        let frame = self.innermost_mut();
        frame.retain(|b| !b.source.eq_ignore_ascii_case(&binding.source));
        frame.push(binding);
    }

    /// Find the binding of `source`, innermost frame first.
    pub fn lookup(&self, source: &str) -> ScopeResult<&Binding> {
        self.frames
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|b| b.source.eq_ignore_ascii_case(source))
            .ok_or_else(|| AliasResolutionError::UnknownSource(source.into()))
    }

    pub fn resolve(&self, source: &str, member: &str) -> ScopeResult<ResolvedMember> {
        self.lookup(source)?.resolve(member)
    }

    pub fn resolve_raw(&self, source: &str, member: &str) -> ScopeResult<ResolvedMember> {
        self.lookup(source)?.resolve_raw(member)
    }

    /// Attach an outer-join rewrite to a binding of the innermost frame.
    pub fn set_outer(&mut self, source: &str, outer: OuterRewrite) -> ScopeResult<()> {
        let binding = self
            .innermost_mut()
            .iter_mut()
            .find(|b| b.source.eq_ignore_ascii_case(source))
            .ok_or_else(|| AliasResolutionError::UnknownSource(source.into()))?;
        binding.outer = Some(outer);
        Ok(())
    }

    /// Bindings of the innermost frame.
    pub fn current(&self) -> &[Binding] {
        self.frames.last().map(Vec::as_slice).unwrap_or_default()
    }

    /// Replace the innermost frame's bindings.
    pub fn replace_current(&mut self, bindings: Vec<Binding>) {
        *self.innermost_mut() = bindings;
    }

    fn innermost_mut(&mut self) -> &mut Vec<Binding> {
        if self.frames.is_empty() {
            self.frames.push(Vec::new());
        }
        let last = self.frames.len() - 1;
        &mut self.frames[last]
    }
}
