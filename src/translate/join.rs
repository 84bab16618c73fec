//! Inner and outer joins.
//!
//! The right side is either a plain source, joined directly, or any other
//! chain, joined as a derived table whose columns are rebound under the
//! chain's leading source name. An outer join attaches an [`OuterRewrite`]
//! to the right binding, so every later read of a right-hand member turns
//! into `CASE WHEN <right key> IS NOT NULL THEN <column> ELSE <default> END`
//! where a default exists.

use crate::ast::{BinaryOp, DefaultValue, Expr, JoinKind, QueryNode};
use crate::compile::CompileResult;
use crate::sql::expr::table_col;
use crate::sql::query::{Join, JoinType, TableRef};

use super::filter::Ctx;
use super::scope::{Binding, OuterRewrite, ResolvedMember};
use super::{Finish, SelectState, TranslationError, Translator};

impl Translator<'_> {
    pub(crate) fn join(
        &mut self,
        left: &QueryNode,
        right: &QueryNode,
        kind: JoinKind,
        left_key: &Expr,
        right_key: &Expr,
        default: Option<&DefaultValue>,
    ) -> CompileResult<SelectState> {
        let state = self.node(left)?;
        let mut state = if state.is_sealed()
            || state.is_paged()
            || state.select.distinct
            || state.group.is_some()
        {
            self.wrap(state)?
        } else {
            state
        };

        let (table, source) = self.join_source(right)?;
        let ctx = Ctx::of(&state);
        let on = self.predicate(
            ctx,
            &Expr::Binary {
                op: BinaryOp::Eq,
                left: Box::new(left_key.clone()),
                right: Box::new(right_key.clone()),
            },
        )?;

        let join_type = match kind {
            JoinKind::Inner => JoinType::Inner,
            JoinKind::OuterWithDefault => {
                // Read before the rewrite is attached, so the test is the raw key.
                let test = match self.components(ctx, right_key)? {
                    Some(parts) => parts.into_iter().next().map(|(_, t)| t.sql),
                    None => Some(self.value(ctx, right_key)?.sql),
                }
                .ok_or_else(|| TranslationError::invalid("join", "empty right key"))?;

                let mut defaults = Vec::new();
                for (member, e) in default.map(|d| d.members.as_slice()).unwrap_or_default() {
                    self.scope.resolve_raw(&source, member)?;
                    defaults.push((member.to_lowercase(), self.value(ctx, e)?.sql));
                }
                self.scope.set_outer(&source, OuterRewrite { test, defaults })?;
                JoinType::Left
            }
        };

        state.select.joins.push(Join {
            join_type,
            table,
            on,
        });
        state.joined.push(source);
        Ok(state)
    }

    /// Bind the right side of a join; returns its FROM item and the logical
    /// source name its members resolve under.
    fn join_source(&mut self, right: &QueryNode) -> CompileResult<(TableRef, String)> {
        let source = leading_source(right)
            .ok_or_else(|| TranslationError::invalid("join", "right side has no source"))?
            .to_string();
        if self
            .scope
            .current()
            .iter()
            .any(|b| b.source.eq_ignore_ascii_case(&source))
        {
            return Err(TranslationError::invalid(
                "join",
                format!("source '{}' is bound on both sides", source),
            )
            .into());
        }

        if let QueryNode::Source { entity, table, .. } = right {
            let (table_ref, _, _) = self.bind_source(entity, &source, table.as_deref())?;
            return Ok((table_ref, source));
        }

        let (select, row) = self.in_scope(|t| {
            let state = t.node(right)?;
            let row = state.row.clone();
            Ok((t.finish(state, Finish::Nested)?, row))
        })?;
        let alias = self.scope.reserve_alias("");
        let members = row
            .iter()
            .map(|c| ResolvedMember {
                name: c.name.clone(),
                sql: table_col(&alias, &c.name),
                data_type: c.data_type,
            })
            .collect();
        self.scope.bind(Binding::rebound(&source, members));
        Ok((TableRef::derived(select, &alias), source))
    }
}

/// Logical name of the source a chain starts from, following left inputs.
fn leading_source(node: &QueryNode) -> Option<&str> {
    match node {
        QueryNode::Source { alias, .. } => Some(alias.as_str()),
        QueryNode::Join { left, .. } | QueryNode::SetOp { left, .. } => leading_source(left),
        other => other.input().and_then(|input| leading_source(input)),
    }
}
