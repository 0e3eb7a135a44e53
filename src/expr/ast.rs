use crate::core::Value;

/// A single comparison operator inside a chained comparison such as
/// `0 <= mark <= 100`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

/// The predicate expression language's AST. Grounded in spirit on the
/// teacher's `parser::ast::Expr` (binary/unary ops, call expressions) but
/// scoped down to the boolean, chained-comparison language the constraint
/// engine needs — no subqueries, no SQL clauses.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Ident(String),
    /// `a OP b OP c ...` — operands.len() == operators.len() + 1.
    Compare { operands: Vec<Expr>, operators: Vec<CompareOp> },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    /// Arithmetic, needed for expressions like `mark + 5` in `update` RHS.
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    /// A call to a registered domain-type constructor, e.g. `CID("C1")`.
    Call { callee: String, args: Vec<Expr> },
}
