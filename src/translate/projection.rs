//! Projection, DISTINCT and member casts.

use crate::ast::{CastTarget, Expr};
use crate::compile::CompileResult;

use super::filter::Ctx;
use super::{OutputColumn, SelectState, TranslationError, Translator};

impl Translator<'_> {
    /// `Select(columns)`. Composite values expand into one column per member.
    pub(crate) fn project(
        &mut self,
        state: SelectState,
        columns: &[(String, Expr)],
    ) -> CompileResult<SelectState> {
        let mut state = if state.is_sealed() || state.select.distinct {
            self.wrap(state)?
        } else {
            state
        };

        let mut row: Vec<OutputColumn> = Vec::with_capacity(columns.len());
        let ctx = Ctx::of(&state);
        for (name, e) in columns {
            match self.components(ctx, e)? {
                Some(parts) => row.extend(
                    parts
                        .into_iter()
                        .map(|(member, t)| OutputColumn::new(&member, t.sql, t.data_type)),
                ),
                None => {
                    let v = self.value(ctx, e)?;
                    row.push(OutputColumn::new(name, v.sql, v.data_type));
                }
            }
        }

        if row.is_empty() {
            return Err(TranslationError::invalid("Select", "no columns projected").into());
        }
        for (i, c) in row.iter().enumerate() {
            if row[..i].iter().any(|p| p.name.eq_ignore_ascii_case(&c.name)) {
                return Err(TranslationError::invalid(
                    "Select",
                    format!("column '{}' is projected twice", c.name),
                )
                .into());
            }
        }

        state.row = row;
        state.joined.clear();
        Ok(state)
    }

    /// `Distinct()`. Orderings over columns the row does not expose are
    /// dropped, since DISTINCT can only sort on what it returns. After a join
    /// the DISTINCT is sealed into a derived table at once, so it covers the
    /// joined members as well.
    pub(crate) fn distinct(&mut self, state: SelectState) -> CompileResult<SelectState> {
        let mut state = if state.is_paged() || state.is_sealed() {
            self.wrap(state)?
        } else {
            state
        };
        let row = &state.row;
        state
            .ordering
            .retain(|ob| row.iter().any(|c| c.sql == ob.expr));
        state.select.distinct = true;
        if !state.joined.is_empty() {
            // Joined members are compared along with the row.
            return self.wrap(state);
        }
        Ok(state)
    }

    /// `Cast<T>()`: narrow the row to the target's members, in target order.
    pub(crate) fn cast(
        &mut self,
        state: SelectState,
        target: &CastTarget,
    ) -> CompileResult<SelectState> {
        let mut state = if state.is_sealed() || state.select.distinct {
            self.wrap(state)?
        } else {
            state
        };
        let names: Vec<String> = match target {
            CastTarget::Members(members) => members.clone(),
            CastTarget::Entity(entity) => self
                .registry
                .resolve(entity)?
                .readable()
                .map(|c| c.member.clone())
                .collect(),
        };

        let row: Vec<OutputColumn> = names
            .iter()
            .filter_map(|n| state.column(n).cloned())
            .collect();
        if row.is_empty() {
            return Err(TranslationError::invalid(
                "Cast",
                format!("no column matches {}", names.join(", ")),
            )
            .into());
        }
        state.row = row;
        state.joined.clear();
        Ok(state)
    }
}
