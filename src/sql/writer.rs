//! Statement writer.
//!
//! Serializes a token stream into final statement text, replacing every
//! [`Token::Param`] with the profile's placeholder and recording which
//! parameter slot each placeholder binds.

use std::collections::HashMap;

use super::dialect::{DialectProfile, ParamStyle};
use super::token::{Token, TokenStream};

/// Statement text plus the slots it binds, in binding order.
///
/// For positional placeholders `bindings` has one entry per `?` in the text,
/// so a slot referenced twice appears twice. Named and numbered placeholders
/// reuse the same marker and list each slot once, in order of first use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenStatement {
    pub text: String,
    pub bindings: Vec<usize>,
}

/// Writes token streams for one dialect and one set of parameter names.
pub struct SqlWriter<'a> {
    dialect: &'a DialectProfile,
    names: &'a [String],
}

impl<'a> SqlWriter<'a> {
    /// `names[i]` is the parameter name of slot `i`.
    pub fn new(dialect: &'a DialectProfile, names: &'a [String]) -> Self {
        Self { dialect, names }
    }

    pub fn write(&self, tokens: &TokenStream) -> WrittenStatement {
        let mut text = String::new();
        let mut bindings = Vec::new();
        let mut ordinals: HashMap<usize, usize> = HashMap::new();

        for token in tokens.tokens() {
            let Token::Param(slot) = token else {
                text.push_str(&token.serialize(self.dialect));
                continue;
            };

            match self.dialect.param_style {
                ParamStyle::Positional => {
                    bindings.push(*slot);
                    text.push_str(&self.dialect.placeholder(&self.name_of(*slot), bindings.len()));
                }
                ParamStyle::Named(_) | ParamStyle::Numbered(_) => {
                    let next = ordinals.len() + 1;
                    let ordinal = *ordinals.entry(*slot).or_insert_with(|| {
                        bindings.push(*slot);
                        next
                    });
                    text.push_str(&self.dialect.placeholder(&self.name_of(*slot), ordinal));
                }
            }
        }

        WrittenStatement { text, bindings }
    }

    fn name_of(&self, slot: usize) -> String {
        self.names
            .get(slot)
            .cloned()
            .unwrap_or_else(|| format!("p{}", slot))
    }
}
