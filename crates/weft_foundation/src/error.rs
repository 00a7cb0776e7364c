//! Error types for the Weft system.
//!
//! Uses `thiserror` for ergonomic error definition with rich context.

use std::fmt;

use thiserror::Error;

use crate::types::Type;

/// The main error type for Weft operations.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional context about where the error occurred.
    pub context: Option<ErrorContext>,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: None,
        }
    }

    /// Adds context to this error.
    #[must_use]
    pub fn with_context(mut self, context: ErrorContext) -> Self {
        self.context = Some(context);
        self
    }

    /// Creates a field type mismatch error.
    #[must_use]
    pub fn type_mismatch(
        type_name: impl Into<String>,
        field: impl Into<String>,
        expected: Type,
        actual: Type,
    ) -> Self {
        Self::new(ErrorKind::TypeMismatch {
            type_name: type_name.into(),
            field: field.into(),
            expected,
            actual,
        })
    }

    /// Creates a missing required field error.
    #[must_use]
    pub fn missing_field(type_name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new(ErrorKind::MissingField {
            type_name: type_name.into(),
            field: field.into(),
        })
    }

    /// Creates an unknown field error.
    #[must_use]
    pub fn unknown_field(type_name: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownField {
            type_name: type_name.into(),
            field: field.into(),
        })
    }

    /// Creates an unknown fact type error.
    #[must_use]
    pub fn unknown_type(type_name: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownType(type_name.into()))
    }

    /// Creates a duplicate fact error.
    #[must_use]
    pub fn duplicate_fact(key: impl Into<String>) -> Self {
        Self::new(ErrorKind::DuplicateFact(key.into()))
    }

    /// Creates a fact not found error.
    #[must_use]
    pub fn fact_not_found(key: impl Into<String>) -> Self {
        Self::new(ErrorKind::FactNotFound(key.into()))
    }

    /// Creates an incompatible operands error.
    #[must_use]
    pub fn incompatible_operands(operator: impl Into<String>, left: Type, right: Type) -> Self {
        Self::new(ErrorKind::IncompatibleOperands {
            operator: operator.into(),
            left,
            right,
        })
    }

    /// Creates an unbound variable error.
    #[must_use]
    pub fn unbound_variable(variable: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnboundVariable(variable.into()))
    }

    /// Creates a field access error.
    #[must_use]
    pub fn field_not_found(variable: impl Into<String>, field: impl Into<String>) -> Self {
        Self::new(ErrorKind::FieldNotFound {
            variable: variable.into(),
            field: field.into(),
        })
    }

    /// Creates an invalid policy configuration error.
    #[must_use]
    pub fn invalid_policy(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidPolicy(reason.into()))
    }

    /// Creates an unknown action handler error.
    #[must_use]
    pub fn unknown_action(name: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownAction(name.into()))
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal(message.into()))
    }
}

/// Categorized error kinds for pattern matching.
#[derive(Debug, Error)]
pub enum ErrorKind {
    // ------------------------------------------------------------------
    // Schema errors (raised at the type-node boundary)
    // ------------------------------------------------------------------
    /// Field value does not match the declared field type.
    #[error("type mismatch: {type_name}.{field} expects {expected}, got {actual}")]
    TypeMismatch {
        /// The fact type being validated.
        type_name: String,
        /// The offending field.
        field: String,
        /// The declared type.
        expected: Type,
        /// The submitted type.
        actual: Type,
    },

    /// A required field is absent from the submitted fact.
    #[error("missing field: {type_name}.{field}")]
    MissingField {
        /// The fact type being validated.
        type_name: String,
        /// The missing field.
        field: String,
    },

    /// The submitted fact carries a field the schema does not declare.
    #[error("unknown field: {type_name}.{field}")]
    UnknownField {
        /// The fact type being validated.
        type_name: String,
        /// The undeclared field.
        field: String,
    },

    /// The fact names a type the program does not declare.
    #[error("unknown fact type: {0}")]
    UnknownType(String),

    /// A fact with the same key already exists.
    #[error("duplicate fact: {0}")]
    DuplicateFact(String),

    /// No fact with the given key exists.
    #[error("fact not found: {0}")]
    FactNotFound(String),

    // ------------------------------------------------------------------
    // Evaluation errors (raised by the expression evaluator)
    // ------------------------------------------------------------------
    /// Operand types are incompatible with the operator.
    #[error("operator '{operator}' cannot combine {left} and {right}")]
    IncompatibleOperands {
        /// The operator applied.
        operator: String,
        /// Left operand type.
        left: Type,
        /// Right operand type.
        right: Type,
    },

    /// Division or modulo by zero.
    #[error("division by zero")]
    DivisionByZero,

    /// A variable referenced in an expression has no binding.
    #[error("unbound variable: {0}")]
    UnboundVariable(String),

    /// Field access on a fact that does not carry the field.
    #[error("field not found: {variable}.{field}")]
    FieldNotFound {
        /// The bound variable.
        variable: String,
        /// The accessed field.
        field: String,
    },

    /// A condition evaluated to a non-boolean value.
    #[error("condition must evaluate to bool, got {0}")]
    ExpectedBoolean(Type),

    // ------------------------------------------------------------------
    // Policy configuration errors (raised at space construction)
    // ------------------------------------------------------------------
    /// Invalid selection/consumption/retention parameters.
    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    /// A space with the given name already exists.
    #[error("xuple space already exists: {0}")]
    DuplicateSpace(String),

    /// No space with the given name exists.
    #[error("xuple space not found: {0}")]
    SpaceNotFound(String),

    /// The space reached its configured maximum size.
    #[error("xuple space full: {0}")]
    SpaceFull(String),

    /// A retrieval was attempted with an empty agent identifier.
    #[error("agent id must not be empty")]
    EmptyAgentId,

    /// No xuple with the given id exists in the space.
    #[error("xuple not found: {0}")]
    XupleNotFound(String),

    /// The xuple exists but cannot be consumed by the agent.
    #[error("xuple not available: {0}")]
    XupleNotAvailable(String),

    // ------------------------------------------------------------------
    // Action dispatch errors
    // ------------------------------------------------------------------
    /// No handler registered under the action name.
    #[error("unknown action: {0}")]
    UnknownAction(String),

    // ------------------------------------------------------------------
    // Checkpoint errors
    // ------------------------------------------------------------------
    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O failure in a checkpoint backend.
    #[error("io error: {0}")]
    Io(String),

    // ------------------------------------------------------------------
    // Structural / internal errors
    // ------------------------------------------------------------------
    /// Internal invariant violation (should not happen).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Context about where an error occurred.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// Rule name, if the error arose while matching or firing a rule.
    pub rule: Option<String>,
    /// Node identifier, if the error arose inside a specific node.
    pub node: Option<String>,
}

impl ErrorContext {
    /// Creates a new empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the rule name.
    #[must_use]
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }

    /// Sets the node identifier.
    #[must_use]
    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(rule) = &self.rule {
            write!(f, "in rule {rule}")?;
        }
        if let Some(node) = &self.node {
            if self.rule.is_some() {
                write!(f, " ")?;
            }
            write!(f, "at node {node}")?;
        }
        Ok(())
    }
}
