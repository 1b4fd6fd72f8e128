//! Narrow expression AST and evaluator the record manager's scan calls
//! through to filter materialized records.
//!
//! `recmgr` knows nothing about `Expr` beyond the [`Predicate`] trait:
//! `Scan::next` holds a `&dyn Predicate` and calls [`Predicate::eval`]
//! with the current record's attribute values in schema order. The
//! bundled [`Expr`] AST is one implementation of that trait; a caller
//! is free to supply any other (e.g. a closure-backed one) as long as
//! it returns a [`Value`].


use dbcore::{StoreError, StoreResult};
use std::cmp::Ordering;

/// The value domain an attribute (and therefore a predicate) can carry.
/// Mirrors `recmgr::DataType` one-for-one but lives here so this crate
/// has no dependency on the record manager.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Value {
    Int(i32),
    Float(f32),
    Bool(bool),
    String(String),
}

impl Value {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    fn cmp_same_type(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Bool(a), Value::Bool(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}

/// Binary comparison and logical operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

/// Unary operators (currently just logical NOT).
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum UnaryOp {
    Not,
}

/// Expression abstract syntax tree evaluated against one record's
/// attribute values.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Expr {
    Literal(Value),
    /// Zero-based index into the record's attribute list, i.e. the same
    /// index `get_attr`/`set_attr` take.
    Column(usize),
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
}

/// The interface `recmgr::Scan::next` calls through to decide whether a
/// materialized record matches. A non-`Bool` result is treated by the
/// caller as "no match", not an error (see the crate-level scan docs in
/// `recmgr`) — an open question for whoever designs a richer predicate
/// language later.
pub trait Predicate {
    fn eval(&self, attrs: &[Value]) -> StoreResult<Value>;
}

impl Predicate for Expr {
    fn eval(&self, attrs: &[Value]) -> StoreResult<Value> {
        match self {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Column(idx) => attrs.get(*idx).cloned().ok_or_else(|| {
                StoreError::Parameter(format!("predicate column index {idx} out of range"))
            }),
            Expr::Unary { op, expr } => {
                let v = expr.eval(attrs)?;
                match op {
                    UnaryOp::Not => {
                        let b = v.as_bool().ok_or_else(|| {
                            StoreError::Parameter(format!("NOT expects bool, got {v:?}"))
                        })?;
                        Ok(Value::Bool(!b))
                    }
                }
            }
            Expr::Binary { left, op, right } => {
                let lv = left.eval(attrs)?;
                let rv = right.eval(attrs)?;
                eval_binary(&lv, *op, &rv)
            }
        }
    }
}

fn eval_binary(l: &Value, op: BinaryOp, r: &Value) -> StoreResult<Value> {
    use BinaryOp::*;

    if matches!(op, And | Or) {
        let lb = l
            .as_bool()
            .ok_or_else(|| StoreError::Parameter(format!("AND/OR expects bools, got {l:?}")))?;
        let rb = r
            .as_bool()
            .ok_or_else(|| StoreError::Parameter(format!("AND/OR expects bools, got {r:?}")))?;
        return Ok(Value::Bool(match op {
            And => lb && rb,
            Or => lb || rb,
            _ => unreachable!(),
        }));
    }

    let ord = l.cmp_same_type(r).ok_or_else(|| {
        StoreError::Parameter(format!("incompatible types for {op:?}: {l:?}, {r:?}"))
    })?;

    let result = match op {
        Eq => ord == Ordering::Equal,
        Ne => ord != Ordering::Equal,
        Lt => ord == Ordering::Less,
        Le => ord != Ordering::Greater,
        Gt => ord == Ordering::Greater,
        Ge => ord != Ordering::Less,
        And | Or => unreachable!(),
    };

    Ok(Value::Bool(result))
}
