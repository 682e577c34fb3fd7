//! The expression tree and its tree-walking evaluator.

use std::collections::HashMap;

use crate::scenario::Value;

#[derive(Debug, Clone)]
pub enum Expr {
    Num(f64),
    Str(String),
    Bool(bool),
    Ident(String),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Cmp(CmpOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
enum Eval {
    Num(f64),
    Str(String),
    Bool(bool),
}

pub fn evaluate(expr: &Expr, variables: &HashMap<String, Value>) -> Result<bool, String> {
    match eval_node(expr, variables)? {
        Eval::Bool(b) => Ok(b),
        other => Err(format!("expression did not evaluate to a boolean: {other:?}")),
    }
}

fn eval_node(expr: &Expr, variables: &HashMap<String, Value>) -> Result<Eval, String> {
    match expr {
        Expr::Num(n) => Ok(Eval::Num(*n)),
        Expr::Str(s) => Ok(Eval::Str(s.clone())),
        Expr::Bool(b) => Ok(Eval::Bool(*b)),
        Expr::Ident(name) => {
            let value = variables
                .get(name)
                .ok_or_else(|| format!("unknown identifier: {name}"))?;
            Ok(match value {
                Value::Str(s) => Eval::Str(s.clone()),
                Value::Num(n) => Eval::Num(*n),
                Value::Bool(b) => Eval::Bool(*b),
            })
        }
        Expr::Not(inner) => match eval_node(inner, variables)? {
            Eval::Bool(b) => Ok(Eval::Bool(!b)),
            other => Err(format!("cannot negate non-boolean: {other:?}")),
        },
        Expr::And(lhs, rhs) => {
            let l = expect_bool(eval_node(lhs, variables)?)?;
            let r = expect_bool(eval_node(rhs, variables)?)?;
            Ok(Eval::Bool(l && r))
        }
        Expr::Or(lhs, rhs) => {
            let l = expect_bool(eval_node(lhs, variables)?)?;
            let r = expect_bool(eval_node(rhs, variables)?)?;
            Ok(Eval::Bool(l || r))
        }
        Expr::Cmp(op, lhs, rhs) => {
            let l = eval_node(lhs, variables)?;
            let r = eval_node(rhs, variables)?;
            Ok(Eval::Bool(compare(*op, &l, &r)?))
        }
    }
}

fn expect_bool(v: Eval) -> Result<bool, String> {
    match v {
        Eval::Bool(b) => Ok(b),
        other => Err(format!("expected boolean operand, got {other:?}")),
    }
}

fn compare(op: CmpOp, lhs: &Eval, rhs: &Eval) -> Result<bool, String> {
    match (lhs, rhs) {
        (Eval::Num(a), Eval::Num(b)) => Ok(apply_ord(op, a.partial_cmp(b))),
        (Eval::Str(a), Eval::Str(b)) => Ok(apply_ord(op, a.partial_cmp(b))),
        (Eval::Bool(a), Eval::Bool(b)) => match op {
            CmpOp::Eq => Ok(a == b),
            CmpOp::Ne => Ok(a != b),
            _ => Err("ordering comparisons are not defined for booleans".to_string()),
        },
        _ => Err(format!("type mismatch in comparison: {lhs:?} vs {rhs:?}")),
    }
}

fn apply_ord(op: CmpOp, ord: Option<std::cmp::Ordering>) -> bool {
    use std::cmp::Ordering::*;
    let Some(ord) = ord else { return false };
    match op {
        CmpOp::Eq => ord == Equal,
        CmpOp::Ne => ord != Equal,
        CmpOp::Lt => ord == Less,
        CmpOp::Le => ord != Greater,
        CmpOp::Gt => ord == Greater,
        CmpOp::Ge => ord != Less,
    }
}
