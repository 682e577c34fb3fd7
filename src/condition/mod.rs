//! A restricted boolean/comparison expression evaluator.
//!
//! The grammar is closed by construction: identifiers resolve only against
//! the variables passed in, literals are numbers/strings/booleans, and the
//! only operators are `!`, `&&`, `||`, and the six comparisons. There is no
//! function call, indexing, or attribute-access production, so there is no
//! way to reach host I/O from an expression string no matter how it is
//! authored.
//!
//! Evaluation never fails outward: a parse error, an unresolved identifier,
//! or a type mismatch between operands all evaluate to `false`, with a
//! `tracing::warn!` describing why.

mod ast;
mod parser;

use std::collections::HashMap;

use crate::scenario::Value;

/// Evaluate `expr` against `variables`. Total: always returns a `bool`.
pub fn eval(expr: &str, variables: &HashMap<String, Value>) -> bool {
    match parser::parse(expr) {
        Ok(tree) => match ast::evaluate(&tree, variables) {
            Ok(b) => b,
            Err(reason) => {
                tracing::warn!(expr, reason = %reason, "condition evaluated to false");
                false
            }
        },
        Err(reason) => {
            tracing::warn!(expr, reason = %reason, "condition failed to parse, evaluating to false");
            false
        }
    }
}
