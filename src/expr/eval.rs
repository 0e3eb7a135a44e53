use std::cmp::Ordering;

use crate::core::{DbError, Result, Value};
use crate::relation::Row;

use super::ast::{CompareOp, Expr};
use super::namespace::ExpressionNamespace;

/// Evaluates `expr` with bare identifiers resolved against `row` first and
/// `namespace` second (`spec.md` §4.4).
pub fn eval(expr: &Expr, row: &Row, namespace: &ExpressionNamespace) -> Result<Value> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Ident(name) => row
            .get(name)
            .cloned()
            .or_else(|| namespace.lookup(name).cloned())
            .ok_or_else(|| DbError::InvalidPredicate {
                source: name.clone(),
                reason: format!("unbound identifier '{name}'"),
            }),
        Expr::Call { callee, args } => {
            let values = args.iter().map(|a| eval(a, row, namespace)).collect::<Result<Vec<_>>>()?;
            namespace.call(callee, &values)
        }
        Expr::Compare { operands, operators } => {
            let values = operands.iter().map(|o| eval(o, row, namespace)).collect::<Result<Vec<_>>>()?;
            for (pair, op) in values.windows(2).zip(operators.iter()) {
                if !compare_holds(&pair[0], &pair[1], *op)? {
                    return Ok(Value::Bool(false));
                }
            }
            Ok(Value::Bool(true))
        }
        Expr::And(l, r) => {
            let lv = eval(l, row, namespace)?.as_bool();
            if !lv {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(eval(r, row, namespace)?.as_bool()))
        }
        Expr::Or(l, r) => {
            let lv = eval(l, row, namespace)?.as_bool();
            if lv {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(eval(r, row, namespace)?.as_bool()))
        }
        Expr::Not(inner) => Ok(Value::Bool(!eval(inner, row, namespace)?.as_bool())),
        Expr::Add(l, r) => numeric_op(l, r, row, namespace, |a, b| a + b, |a, b| a + b),
        Expr::Sub(l, r) => numeric_op(l, r, row, namespace, |a, b| a - b, |a, b| a - b),
        Expr::Mul(l, r) => numeric_op(l, r, row, namespace, |a, b| a * b, |a, b| a * b),
        Expr::Div(l, r) => {
            let lv = eval(l, row, namespace)?;
            let rv = eval(r, row, namespace)?;
            let a = numeric(&lv)?;
            let b = numeric(&rv)?;
            if b == 0.0 {
                return Err(DbError::InvalidPredicate {
                    source: "/".to_string(),
                    reason: "division by zero".to_string(),
                });
            }
            if let (Value::Int(x), Value::Int(y)) = (&lv, &rv) {
                Ok(Value::Int(x / y))
            } else {
                Ok(Value::Float(a / b))
            }
        }
        Expr::Neg(inner) => match eval(inner, row, namespace)? {
            Value::Int(n) => Ok(Value::Int(-n)),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(DbError::InvalidPredicate {
                source: "-".to_string(),
                reason: format!("cannot negate {}", other.type_name()),
            }),
        },
    }
}

fn numeric(v: &Value) -> Result<f64> {
    v.as_f64().ok_or_else(|| DbError::InvalidPredicate {
        source: String::new(),
        reason: format!("expected a number, found {}", v.type_name()),
    })
}

fn numeric_op(
    l: &Expr,
    r: &Expr,
    row: &Row,
    namespace: &ExpressionNamespace,
    int_op: impl Fn(i64, i64) -> i64,
    float_op: impl Fn(f64, f64) -> f64,
) -> Result<Value> {
    let lv = eval(l, row, namespace)?;
    let rv = eval(r, row, namespace)?;
    if let (Value::Int(a), Value::Int(b)) = (&lv, &rv) {
        Ok(Value::Int(int_op(*a, *b)))
    } else {
        Ok(Value::Float(float_op(numeric(&lv)?, numeric(&rv)?)))
    }
}

fn compare_holds(a: &Value, b: &Value, op: CompareOp) -> Result<bool> {
    if op == CompareOp::Eq {
        return Ok(a == b);
    }
    if op == CompareOp::Ne {
        return Ok(a != b);
    }
    let ord = a.compare(b).ok_or_else(|| DbError::InvalidPredicate {
        source: String::new(),
        reason: format!("cannot compare {} with {}", a.type_name(), b.type_name()),
    })?;
    Ok(match op {
        CompareOp::Lt => ord == Ordering::Less,
        CompareOp::Le => ord != Ordering::Greater,
        CompareOp::Gt => ord == Ordering::Greater,
        CompareOp::Ge => ord != Ordering::Less,
        CompareOp::Eq | CompareOp::Ne => unreachable!(),
    })
}

/// Evaluates `expr` against `row`, coercing the result to a boolean. Any
/// evaluation error (unbound identifier, type mismatch, division by zero)
/// is treated as `false` rather than propagated, per `spec.md` §4.4 — the
/// cause is still available to the caller via `reason`.
pub fn eval_bool(expr: &Expr, row: &Row, namespace: &ExpressionNamespace) -> bool {
    eval_bool_verbose(expr, row, namespace).0
}

pub fn eval_bool_verbose(expr: &Expr, row: &Row, namespace: &ExpressionNamespace) -> (bool, Option<String>) {
    match eval(expr, row, namespace) {
        Ok(v) => (v.as_bool(), None),
        Err(e) => (false, Some(e.to_string())),
    }
}
