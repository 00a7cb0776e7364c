//! Condition and expression evaluation.
//!
//! Conditions are a tagged-union AST evaluated by a pure function against
//! variable bindings. Evaluation never mutates a fact, token, or memory.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use weft_foundation::{Error, ErrorKind, Result, Value};
use weft_storage::{Fact, Token};

/// Binary operators over evaluated operands.
///
/// Comparison and arithmetic normalize numeric operands to `f64` before
/// applying; `Mod` truncates both operands to `i64` first.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division.
    Div,
    /// Integer modulo (operands truncated to i64).
    Mod,
    /// Equality.
    Eq,
    /// Inequality.
    Ne,
    /// Less-than.
    Lt,
    /// Less-or-equal.
    Le,
    /// Greater-than.
    Gt,
    /// Greater-or-equal.
    Ge,
    /// Logical conjunction.
    And,
    /// Logical disjunction.
    Or,
}

impl BinaryOp {
    /// Returns true for the ordering comparisons (`< <= > >=`).
    #[must_use]
    pub const fn is_ordering(self) -> bool {
        matches!(self, Self::Lt | Self::Le | Self::Gt | Self::Ge)
    }

    /// Returns true for the arithmetic operators.
    #[must_use]
    pub const fn is_arithmetic(self) -> bool {
        matches!(self, Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Mod)
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "and",
            Self::Or => "or",
        };
        write!(f, "{symbol}")
    }
}

/// Condition/expression AST.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
    /// A literal scalar value.
    Literal(Value),
    /// Field access on a bound variable (`p.age`).
    Field {
        /// The bound variable.
        variable: Arc<str>,
        /// The accessed field.
        field: Arc<str>,
    },
    /// Reference to a bound variable; resolves to the fact's identifier.
    Var(Arc<str>),
    /// Binary operation.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        left: Box<Expr>,
        /// Right operand.
        right: Box<Expr>,
    },
    /// Logical negation.
    Not(Box<Expr>),
    /// Membership test against a list of expressions (`IN` / `NOT IN`).
    Membership {
        /// The tested value.
        needle: Box<Expr>,
        /// Candidate values.
        list: Vec<Expr>,
        /// True for `NOT IN`.
        negated: bool,
    },
}

impl Expr {
    /// Literal constructor.
    #[must_use]
    pub fn lit(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    /// Field access constructor (`variable.field`).
    #[must_use]
    pub fn field(variable: impl Into<Arc<str>>, field: impl Into<Arc<str>>) -> Self {
        Self::Field {
            variable: variable.into(),
            field: field.into(),
        }
    }

    /// Variable reference constructor.
    #[must_use]
    pub fn var(variable: impl Into<Arc<str>>) -> Self {
        Self::Var(variable.into())
    }

    /// Binary operation constructor.
    #[must_use]
    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// Conjunction of two expressions.
    #[must_use]
    pub fn and(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::And, left, right)
    }

    /// Disjunction of two expressions.
    #[must_use]
    pub fn or(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOp::Or, left, right)
    }

    /// Negation.
    #[must_use]
    pub fn not(inner: Expr) -> Self {
        Self::Not(Box::new(inner))
    }

    /// Membership constructor (`needle IN list`).
    #[must_use]
    pub fn in_list(needle: Expr, list: Vec<Expr>) -> Self {
        Self::Membership {
            needle: Box::new(needle),
            list,
            negated: false,
        }
    }

    /// Negated membership constructor (`needle NOT IN list`).
    #[must_use]
    pub fn not_in_list(needle: Expr, list: Vec<Expr>) -> Self {
        Self::Membership {
            needle: Box::new(needle),
            list,
            negated: true,
        }
    }

    /// Folds a list of conjuncts back into a single condition.
    ///
    /// Returns `None` for an empty list.
    #[must_use]
    pub fn conjoin(mut conjuncts: Vec<Expr>) -> Option<Expr> {
        let first = if conjuncts.is_empty() {
            return None;
        } else {
            conjuncts.remove(0)
        };
        Some(conjuncts.into_iter().fold(first, Expr::and))
    }

    /// Splits a condition into its top-level conjuncts.
    ///
    /// Only `And` nodes are flattened; everything else (including `Or`
    /// chains) stays intact as a single conjunct.
    #[must_use]
    pub fn conjuncts(&self) -> Vec<&Expr> {
        let mut out = Vec::new();
        self.collect_conjuncts(&mut out);
        out
    }

    fn collect_conjuncts<'a>(&'a self, out: &mut Vec<&'a Expr>) {
        if let Self::Binary {
            op: BinaryOp::And,
            left,
            right,
        } = self
        {
            left.collect_conjuncts(out);
            right.collect_conjuncts(out);
        } else {
            out.push(self);
        }
    }

    /// Collects the variables referenced by this expression.
    #[must_use]
    pub fn variables(&self) -> BTreeSet<Arc<str>> {
        let mut out = BTreeSet::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables(&self, out: &mut BTreeSet<Arc<str>>) {
        match self {
            Self::Literal(_) => {}
            Self::Field { variable, .. } | Self::Var(variable) => {
                out.insert(variable.clone());
            }
            Self::Binary { left, right, .. } => {
                left.collect_variables(out);
                right.collect_variables(out);
            }
            Self::Not(inner) => inner.collect_variables(out),
            Self::Membership { needle, list, .. } => {
                needle.collect_variables(out);
                for item in list {
                    item.collect_variables(out);
                }
            }
        }
    }

    /// Renders a canonical fingerprint with variable names erased.
    ///
    /// Two alpha conditions that differ only in the name of the single
    /// variable they constrain produce the same fingerprint, which is what
    /// node deduplication keys on.
    #[must_use]
    pub fn fingerprint(&self) -> String {
        let mut out = String::new();
        self.write_fingerprint(&mut out);
        out
    }

    fn write_fingerprint(&self, out: &mut String) {
        use std::fmt::Write;
        match self {
            Self::Literal(value) => {
                let _ = write!(out, "{value:?}");
            }
            Self::Field { field, .. } => {
                let _ = write!(out, "?.{field}");
            }
            Self::Var(_) => out.push('?'),
            Self::Binary { op, left, right } => {
                out.push('(');
                left.write_fingerprint(out);
                let _ = write!(out, " {op} ");
                right.write_fingerprint(out);
                out.push(')');
            }
            Self::Not(inner) => {
                out.push_str("(not ");
                inner.write_fingerprint(out);
                out.push(')');
            }
            Self::Membership {
                needle,
                list,
                negated,
            } => {
                out.push('(');
                needle.write_fingerprint(out);
                out.push_str(if *negated { " not-in [" } else { " in [" });
                for (i, item) in list.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write_fingerprint(out);
                }
                out.push_str("])");
            }
        }
    }
}

/// Variable bindings an expression is evaluated against.
#[derive(Copy, Clone)]
pub enum Bindings<'a> {
    /// A single fact bound to one variable (alpha evaluation).
    Single {
        /// The bound variable name.
        variable: &'a str,
        /// The bound fact.
        fact: &'a Fact,
    },
    /// A token binding several variables (join and guard evaluation).
    Token(&'a Token),
}

impl Bindings<'_> {
    /// Looks up the fact bound to a variable.
    #[must_use]
    pub fn lookup(&self, variable: &str) -> Option<&Fact> {
        match self {
            Self::Single { variable: v, fact } => (*v == variable).then_some(*fact),
            Self::Token(token) => token.binding(variable).map(AsRef::as_ref),
        }
    }
}

/// Evaluates an expression against bindings.
///
/// Pure: never mutates a fact, token, or node memory.
///
/// # Errors
///
/// Returns an evaluation error for unbound variables, missing fields,
/// incompatible operand types, and division or modulo by zero.
pub fn evaluate(expr: &Expr, bindings: &Bindings<'_>) -> Result<Value> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Field { variable, field } => {
            let fact = bindings
                .lookup(variable)
                .ok_or_else(|| Error::unbound_variable(variable.as_ref()))?;
            fact.field(field)
                .ok_or_else(|| Error::field_not_found(variable.as_ref(), field.as_ref()))
        }
        Expr::Var(variable) => {
            let fact = bindings
                .lookup(variable)
                .ok_or_else(|| Error::unbound_variable(variable.as_ref()))?;
            fact.field(weft_storage::ID_FIELD)
                .ok_or_else(|| Error::field_not_found(variable.as_ref(), weft_storage::ID_FIELD))
        }
        Expr::Binary { op, left, right } => {
            let lhs = evaluate(left, bindings)?;
            let rhs = evaluate(right, bindings)?;
            apply_binary(*op, &lhs, &rhs)
        }
        Expr::Not(inner) => {
            let value = evaluate(inner, bindings)?;
            match value {
                Value::Bool(b) => Ok(Value::Bool(!b)),
                other => Err(Error::new(ErrorKind::ExpectedBoolean(other.value_type()))),
            }
        }
        Expr::Membership {
            needle,
            list,
            negated,
        } => {
            let value = evaluate(needle, bindings)?;
            let mut found = false;
            for item in list {
                let candidate = evaluate(item, bindings)?;
                if value_eq(&value, &candidate) {
                    found = true;
                    break;
                }
            }
            Ok(Value::Bool(found != *negated))
        }
    }
}

/// Evaluates an expression and coerces the result to a boolean.
///
/// # Errors
///
/// Returns an evaluation error if the expression fails to evaluate or does
/// not produce a boolean.
pub fn evaluate_bool(expr: &Expr, bindings: &Bindings<'_>) -> Result<bool> {
    match evaluate(expr, bindings)? {
        Value::Bool(b) => Ok(b),
        other => Err(Error::new(ErrorKind::ExpectedBoolean(other.value_type()))),
    }
}

/// Equality with numeric normalization: `1 == 1.0` holds, kinds never
/// coerce otherwise. Mismatched kinds compare unequal, never error.
fn value_eq(left: &Value, right: &Value) -> bool {
    match (left.as_number(), right.as_number()) {
        (Some(l), Some(r)) => l == r,
        _ => left == right,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn apply_binary(op: BinaryOp, left: &Value, right: &Value) -> Result<Value> {
    match op {
        BinaryOp::And | BinaryOp::Or => {
            let (Value::Bool(l), Value::Bool(r)) = (left, right) else {
                return Err(Error::incompatible_operands(
                    op.to_string(),
                    left.value_type(),
                    right.value_type(),
                ));
            };
            Ok(Value::Bool(match op {
                BinaryOp::And => *l && *r,
                _ => *l || *r,
            }))
        }
        BinaryOp::Eq => Ok(Value::Bool(value_eq(left, right))),
        BinaryOp::Ne => Ok(Value::Bool(!value_eq(left, right))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            // Ordering requires numeric operands on both sides; nothing
            // is silently coerced.
            let (Some(l), Some(r)) = (left.as_number(), right.as_number()) else {
                return Err(Error::incompatible_operands(
                    op.to_string(),
                    left.value_type(),
                    right.value_type(),
                ));
            };
            Ok(Value::Bool(match op {
                BinaryOp::Lt => l < r,
                BinaryOp::Le => l <= r,
                BinaryOp::Gt => l > r,
                _ => l >= r,
            }))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
            let (Some(l), Some(r)) = (left.as_number(), right.as_number()) else {
                return Err(Error::incompatible_operands(
                    op.to_string(),
                    left.value_type(),
                    right.value_type(),
                ));
            };
            match op {
                BinaryOp::Add => Ok(Value::Float(l + r)),
                BinaryOp::Sub => Ok(Value::Float(l - r)),
                BinaryOp::Mul => Ok(Value::Float(l * r)),
                BinaryOp::Div => {
                    if r == 0.0 {
                        return Err(Error::new(ErrorKind::DivisionByZero));
                    }
                    Ok(Value::Float(l / r))
                }
                _ => {
                    // Modulo truncates both operands to integers first.
                    let (li, ri) = (l as i64, r as i64);
                    if ri == 0 {
                        return Err(Error::new(ErrorKind::DivisionByZero));
                    }
                    #[allow(clippy::cast_precision_loss)]
                    Ok(Value::Float((li % ri) as f64))
                }
            }
        }
    }
}
