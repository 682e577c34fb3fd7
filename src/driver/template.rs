//! `${name}` template substitution: a literal, non-recursive replace. A
//! name absent from `variables` is left exactly as written; there is no
//! escaping and no nested expression support.

use std::collections::HashMap;

use crate::scenario::Value;

pub fn substitute(template: &str, variables: &HashMap<String, Value>) -> String {
    let mut out = template.to_string();
    for (name, value) in variables {
        out = out.replace(&format!("${{{name}}}"), &value.as_display());
    }
    out
}
