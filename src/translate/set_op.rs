//! UNION, UNION ALL, INTERSECT and EXCEPT.

use crate::ast::{QueryNode, SetOpKind};
use crate::compile::CompileResult;
use crate::sql::query::{Select, SetOpType, SetOperation};

use super::{
    DialectUnsupportedError, Finish, OutputColumn, SchemaMismatchError, SelectState, Translator,
};

impl Translator<'_> {
    /// Combine two independently translated branches. Both must produce the
    /// same column names in the same order.
    pub(crate) fn set_op(
        &mut self,
        kind: SetOpKind,
        left: &QueryNode,
        right: &QueryNode,
    ) -> CompileResult<SelectState> {
        let op = match kind {
            SetOpKind::Union => SetOpType::Union,
            SetOpKind::Concat => SetOpType::UnionAll,
            SetOpKind::Intersect => SetOpType::Intersect,
            SetOpKind::Except => SetOpType::Except,
        };
        if matches!(op, SetOpType::Intersect | SetOpType::Except)
            && !self.dialect.supports_intersect_except
        {
            return Err(DialectUnsupportedError {
                dialect: self.dialect.name.clone(),
                feature: kind.to_string().to_uppercase(),
            }
            .into());
        }

        let (row, mut select) = self.branch(left, op, false)?;
        let (right_row, right_select) = self.branch(right, op, true)?;

        let same = row.len() == right_row.len()
            && row
                .iter()
                .zip(&right_row)
                .all(|(l, r)| l.name.eq_ignore_ascii_case(&r.name));
        if !same {
            return Err(SchemaMismatchError {
                kind,
                left: row.iter().map(|c| c.name.clone()).collect(),
                right: right_row.iter().map(|c| c.name.clone()).collect(),
            }
            .into());
        }

        select.set_ops.push(SetOperation {
            op,
            right: Box::new(right_select),
        });
        Ok(SelectState::new(select, row, Vec::new()))
    }

    /// Translate one branch in its own scope.
    ///
    /// A paged branch becomes a derived table, since ordering and paging
    /// cannot sit inside a set operation; an unpaged branch loses its
    /// ordering. A compound right branch, or a left one mixing other
    /// operators, is wrapped to keep the intended association.
    fn branch(
        &mut self,
        node: &QueryNode,
        op: SetOpType,
        right: bool,
    ) -> CompileResult<(Vec<OutputColumn>, Select)> {
        self.in_scope(|t| {
            let state = t.node(node)?;
            let regroup = state.select.is_compound()
                && (right || state.select.set_ops.iter().any(|s| s.op != op));
            let mut state = if state.is_paged() || regroup {
                t.wrap(state)?
            } else {
                state
            };
            state.ordering.clear();
            let row = state.row.clone();
            Ok((row, t.finish(state, Finish::Nested)?))
        })
    }
}
