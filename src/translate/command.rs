//! Data-changing statements.
//!
//! DELETE and UPDATE read a single source narrowed by filters; the filters
//! become the statement's WHERE through the same predicate translation as a
//! query. INSERT translates its rows as an ordinary query in a nested scope
//! and matches each output column to a writable member of the target.

use std::sync::Arc;

use crate::ast::{Expr, QueryNode};
use crate::compile::CompileResult;
use crate::metadata::{ColumnMetadata, TableMetadata};
use crate::sql::dml::{Command, Delete, Insert, Update};
use crate::sql::query::{TableFactor, TableRef};

use super::filter::Ctx;
use super::scope::{AliasResolutionError, BindingTarget};
use super::{Finish, SelectState, TranslationError, Translator};

/// Output of [`Translator::translate_command`].
#[derive(Debug, Clone)]
pub struct TranslatedCommand {
    pub command: Command,
    pub timeout: Option<u32>,
}

/// The table a DELETE or UPDATE changes, with the rows it selects.
struct Target {
    state: SelectState,
    table: TableRef,
    source: String,
    metadata: Arc<TableMetadata>,
}

impl Translator<'_> {
    /// Translate a DELETE, UPDATE or INSERT root.
    pub fn translate_command(&mut self, root: &QueryNode) -> CompileResult<TranslatedCommand> {
        let command = self.command(root)?;
        Ok(TranslatedCommand {
            command,
            timeout: self.timeout,
        })
    }

    fn command(&mut self, node: &QueryNode) -> CompileResult<Command> {
        match node {
            QueryNode::Timeout { input, seconds } => {
                self.timeout = Some(*seconds);
                self.command(input)
            }
            QueryNode::Delete { input } => {
                let target = self.target("Delete", input)?;
                let mut delete = Delete::from(target.table);
                if let Some(condition) = target.state.select.where_clause {
                    delete = delete.filter(condition);
                }
                Ok(Command::Delete(delete))
            }
            QueryNode::Update { input, assignments } => self.update(input, assignments),
            QueryNode::Insert { target, input } => self.insert(target, input),
            other => Err(TranslationError::invalid(
                other.operation(),
                "not a data-changing statement",
            )
            .into()),
        }
    }

    fn update(
        &mut self,
        input: &QueryNode,
        assignments: &[(String, Expr)],
    ) -> CompileResult<Command> {
        if assignments.is_empty() {
            return Err(TranslationError::invalid("Update", "no members assigned").into());
        }
        let target = self.target("Update", input)?;

        let mut update = Update::table(target.table.clone());
        for (i, (member, e)) in assignments.iter().enumerate() {
            if assignments[..i]
                .iter()
                .any(|(prior, _)| prior.eq_ignore_ascii_case(member))
            {
                return Err(TranslationError::invalid(
                    "Update",
                    format!("member '{}' is assigned twice", member),
                )
                .into());
            }
            let column = writable(&target.metadata, &target.source, member, "Update")?;
            let value = self.value(Ctx::of(&target.state), e)?;
            update = update.set(&column.column, value.sql);
        }
        if let Some(condition) = target.state.select.where_clause {
            update = update.filter(condition);
        }
        Ok(Command::Update(update))
    }

    fn insert(&mut self, target: &QueryNode, input: &QueryNode) -> CompileResult<Command> {
        let QueryNode::Source {
            entity,
            alias,
            table,
        } = target
        else {
            return Err(TranslationError::invalid("Insert", "the target must be a source").into());
        };
        let metadata = self.registry.resolve(entity)?;

        let (select, row) = self.in_scope(|t| {
            let state = t.node(input)?;
            let row = state.row.clone();
            Ok((t.finish(state, Finish::Nested)?, row))
        })?;

        let columns = row
            .iter()
            .map(|c| writable(&metadata, alias, &c.name, "Insert").map(|m| m.column.clone()))
            .collect::<CompileResult<Vec<_>>>()?;

        let insert = Insert::into(
            metadata.schema.as_deref(),
            table.as_deref().unwrap_or(&metadata.table),
            select,
        )
        .columns(columns);
        Ok(Command::Insert(insert))
    }

    /// Translate the rows a DELETE or UPDATE applies to. Only a single
    /// source narrowed by filters can be changed.
    fn target(&mut self, operation: &str, input: &QueryNode) -> CompileResult<Target> {
        let state = self.node(input)?;
        let plain = state.select.joins.is_empty()
            && !state.is_paged()
            && !state.is_sealed()
            && !state.select.distinct
            && state.group.is_none();
        let table = match &state.select.from {
            Some(from) if plain && matches!(from.factor, TableFactor::Table { .. }) => from.clone(),
            _ => {
                return Err(TranslationError::unsupported(
                    operation,
                    "only a filtered source can be changed",
                )
                .into())
            }
        };

        let (source, metadata) = self
            .scope
            .current()
            .iter()
            .find_map(|b| match &b.target {
                BindingTarget::Table { alias, metadata } if *alias == table.alias => {
                    Some((b.source.clone(), Arc::clone(metadata)))
                }
                _ => None,
            })
            .ok_or_else(|| TranslationError::invalid(operation, "source is not bound"))?;

        Ok(Target {
            state,
            table,
            source,
            metadata,
        })
    }
}

/// Look up a member that may be written.
fn writable<'m>(
    metadata: &'m TableMetadata,
    source: &str,
    member: &str,
    operation: &str,
) -> CompileResult<&'m ColumnMetadata> {
    let column = metadata
        .column(member)
        .ok_or_else(|| AliasResolutionError::UnknownMember {
            source_name: source.into(),
            member: member.into(),
        })?;
    if !column.writable {
        return Err(TranslationError::invalid(
            operation,
            format!("member '{}' is not writable", column.member),
        )
        .into());
    }
    Ok(column)
}
