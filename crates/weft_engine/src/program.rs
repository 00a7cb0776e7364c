//! Validated program model: fact types, rules, and actions.
//!
//! The text-to-AST compiler and the static validator live outside this
//! crate; the network consumes their output through these types and treats
//! inconsistencies beyond this contract as internal errors.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use weft_foundation::{Error, Result, Type};
use weft_storage::{Fact, ID_FIELD};

use crate::expr::Expr;

/// A declared fact field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDef {
    /// Field name.
    pub name: Arc<str>,
    /// Declared scalar type.
    pub ty: Type,
}

/// A declared fact type with its schema.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeDef {
    /// Type name.
    pub name: Arc<str>,
    /// Declared fields; all are required.
    pub fields: Vec<FieldDef>,
    /// Key fields used to derive fact identifiers, in declaration order.
    pub key: Vec<Arc<str>>,
}

impl TypeDef {
    /// Creates a type with no fields.
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            key: Vec::new(),
        }
    }

    /// Adds a field declaration.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<Arc<str>>, ty: Type) -> Self {
        self.fields.push(FieldDef {
            name: name.into(),
            ty,
        });
        self
    }

    /// Declares a field as part of the identifier key.
    ///
    /// Key fields must also be declared with [`Self::with_field`].
    #[must_use]
    pub fn with_key(mut self, name: impl Into<Arc<str>>) -> Self {
        self.key.push(name.into());
        self
    }

    /// Returns the declaration of a field by name.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name.as_ref() == name)
    }

    /// Validates a submitted fact against this schema.
    ///
    /// Checks field presence (all declared fields are required), rejects
    /// undeclared fields, and checks scalar type compatibility.
    ///
    /// # Errors
    ///
    /// Returns a schema error describing the first violation found.
    pub fn validate(&self, fact: &Fact) -> Result<()> {
        for field in &self.fields {
            let Some(value) = fact.field(&field.name) else {
                return Err(Error::missing_field(self.name.as_ref(), field.name.as_ref()));
            };
            let actual = value.value_type();
            if !field.ty.accepts(actual) {
                return Err(Error::type_mismatch(
                    self.name.as_ref(),
                    field.name.as_ref(),
                    field.ty,
                    actual,
                ));
            }
        }
        for (name, _) in fact.fields() {
            if name.as_ref() != ID_FIELD && self.field(name).is_none() {
                return Err(Error::unknown_field(self.name.as_ref(), name.as_ref()));
            }
        }
        Ok(())
    }

    /// Derives a stable identifier for a fact of this type.
    ///
    /// Key fields produce `value1_value2_...` in declaration order; with no
    /// declared key the identifier is a hash of the full field map.
    ///
    /// # Errors
    ///
    /// Returns a schema error if a key field is absent.
    pub fn derive_id(&self, fact: &Fact) -> Result<String> {
        if self.key.is_empty() {
            let mut hasher = DefaultHasher::new();
            for (name, value) in fact.fields() {
                name.hash(&mut hasher);
                value.hash(&mut hasher);
            }
            return Ok(format!("{:016x}", hasher.finish()));
        }

        let mut parts = Vec::with_capacity(self.key.len());
        for key_field in &self.key {
            let Some(value) = fact.field(key_field) else {
                return Err(Error::missing_field(self.name.as_ref(), key_field.as_ref()));
            };
            parts.push(value.to_string());
        }
        Ok(parts.join("_"))
    }
}

/// A typed variable declared by a rule.
#[derive(Clone, Debug, PartialEq)]
pub struct VarDecl {
    /// Variable name.
    pub variable: Arc<str>,
    /// The fact type the variable ranges over.
    pub type_name: Arc<str>,
}

/// The single action a rule fires.
#[derive(Clone, Debug, PartialEq)]
pub enum ActionSpec {
    /// Invoke a caller-registered handler with evaluated arguments.
    Invoke {
        /// Handler name.
        name: Arc<str>,
        /// Argument expressions, evaluated against the firing token.
        args: Vec<Expr>,
    },
    /// Publish a tuple built from a fact template into a xuple-space.
    Publish {
        /// Target space name.
        space: Arc<str>,
        /// Type name of the published fact.
        fact_type: Arc<str>,
        /// Field templates, evaluated against the firing token.
        fields: Vec<(Arc<str>, Expr)>,
    },
}

impl ActionSpec {
    /// Returns the action name observers see.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Invoke { name, .. } => name,
            Self::Publish { space, .. } => space,
        }
    }
}

/// A declarative condition/action rule.
#[derive(Clone, Debug, PartialEq)]
pub struct RuleDef {
    /// Rule name (unique within a program).
    pub name: Arc<str>,
    /// Typed variables bound by the rule, in declaration order.
    pub decls: Vec<VarDecl>,
    /// Boolean condition over the bound variables; `None` matches always.
    pub condition: Option<Expr>,
    /// The action fired per complete match.
    pub action: ActionSpec,
}

impl RuleDef {
    /// Starts building a rule; the action must be set with
    /// [`Self::invoke`] or [`Self::publish`].
    #[must_use]
    pub fn new(name: impl Into<Arc<str>>) -> RuleBuilder {
        RuleBuilder {
            name: name.into(),
            decls: Vec::new(),
            condition: None,
        }
    }
}

/// Builder for [`RuleDef`].
pub struct RuleBuilder {
    name: Arc<str>,
    decls: Vec<VarDecl>,
    condition: Option<Expr>,
}

impl RuleBuilder {
    /// Binds a variable to a fact type.
    #[must_use]
    pub fn bind(mut self, variable: impl Into<Arc<str>>, type_name: impl Into<Arc<str>>) -> Self {
        self.decls.push(VarDecl {
            variable: variable.into(),
            type_name: type_name.into(),
        });
        self
    }

    /// Sets the rule condition.
    #[must_use]
    pub fn when(mut self, condition: Expr) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Finishes the rule with a named-handler action.
    #[must_use]
    pub fn invoke(self, name: impl Into<Arc<str>>, args: Vec<Expr>) -> RuleDef {
        RuleDef {
            name: self.name,
            decls: self.decls,
            condition: self.condition,
            action: ActionSpec::Invoke {
                name: name.into(),
                args,
            },
        }
    }

    /// Finishes the rule with a tuple-publish action.
    #[must_use]
    pub fn publish(
        self,
        space: impl Into<Arc<str>>,
        fact_type: impl Into<Arc<str>>,
        fields: Vec<(Arc<str>, Expr)>,
    ) -> RuleDef {
        RuleDef {
            name: self.name,
            decls: self.decls,
            condition: self.condition,
            action: ActionSpec::Publish {
                space: space.into(),
                fact_type: fact_type.into(),
                fields,
            },
        }
    }
}

/// A validated program: the network's sole input.
#[derive(Clone, Debug, Default)]
pub struct Program {
    /// Declared fact types.
    pub types: Vec<TypeDef>,
    /// Declared rules.
    pub rules: Vec<RuleDef>,
    /// Facts submitted immediately after the graph is built.
    pub initial_facts: Vec<Fact>,
}

impl Program {
    /// Creates an empty program.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a type declaration.
    #[must_use]
    pub fn with_type(mut self, type_def: TypeDef) -> Self {
        self.types.push(type_def);
        self
    }

    /// Adds a rule.
    #[must_use]
    pub fn with_rule(mut self, rule: RuleDef) -> Self {
        self.rules.push(rule);
        self
    }

    /// Adds an initial fact.
    #[must_use]
    pub fn with_fact(mut self, fact: Fact) -> Self {
        self.initial_facts.push(fact);
        self
    }

    /// Returns a declared type by name.
    #[must_use]
    pub fn type_def(&self, name: &str) -> Option<&TypeDef> {
        self.types.iter().find(|t| t.name.as_ref() == name)
    }
}
