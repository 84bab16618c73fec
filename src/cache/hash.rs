//! Structural keys for compiled statements.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::ast::slots::{Abstracted, SlotInfo};
use crate::ast::QueryNode;
use crate::sql::dialect::DialectProfile;

/// SHA-256 of a value's JSON form, as 64 lowercase hex characters.
pub fn compute_hash<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_string(value)?;
    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

#[derive(Serialize)]
struct StatementShape<'a> {
    root: &'a QueryNode,
    slots: &'a [SlotInfo],
    dialect: &'a DialectProfile,
    with_total_count: bool,
}

/// Key of a statement template.
///
/// Covers the literal-free tree, the slot names and types, and everything
/// in the options that changes the emitted text. Bound values are not part
/// of the key.
pub fn statement_key(
    abstracted: &Abstracted,
    dialect: &DialectProfile,
    with_total_count: bool,
) -> Result<String, serde_json::Error> {
    compute_hash(&StatementShape {
        root: &abstracted.root,
        slots: &abstracted.slots,
        dialect,
        with_total_count,
    })
}
