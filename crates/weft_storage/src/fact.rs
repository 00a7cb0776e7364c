//! Immutable typed facts.

use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use im::OrdMap;
use serde::{Deserialize, Serialize};

use weft_foundation::Value;

/// Name of the virtual field exposing a fact's identifier.
///
/// The identifier is accessible in expressions as a field but is stored in
/// [`Fact::id`], not in the field map.
pub const ID_FIELD: &str = "id";

/// Unique key of a fact across the engine: `Type~id`.
///
/// The separator never appears in type names, so keys parse unambiguously.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FactKey(Arc<str>);

impl FactKey {
    /// Builds a key from a type name and fact identifier.
    #[must_use]
    pub fn new(type_name: &str, id: &str) -> Self {
        Self(format!("{type_name}~{id}").into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses a key back into `(type_name, id)`.
    ///
    /// Returns `None` if the string does not contain the separator.
    #[must_use]
    pub fn split(&self) -> Option<(&str, &str)> {
        self.0.split_once('~')
    }
}

impl fmt::Debug for FactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FactKey({})", self.0)
    }
}

impl fmt::Display for FactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FactKey {
    fn from(s: &str) -> Self {
        Self(s.into())
    }
}

/// Immutable typed data record submitted to the engine.
///
/// A fact never changes after submission; an "update" is a retraction
/// followed by a fresh assertion. Facts are shared read-only (behind `Arc`)
/// across every memory and token that references them.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    /// Stable identifier, unique within the fact's type.
    ///
    /// `None` until the engine derives one from the type's declared key
    /// fields (or a content hash when no key is declared).
    id: Option<Arc<str>>,
    /// Declared fact type name.
    type_name: Arc<str>,
    /// Field values, ordered by field name for deterministic iteration.
    fields: OrdMap<Arc<str>, Value>,
    /// Submission timestamp.
    timestamp: SystemTime,
}

impl Fact {
    /// Creates a fact of the given type with no fields and no identifier.
    #[must_use]
    pub fn new(type_name: impl Into<Arc<str>>) -> Self {
        Self {
            id: None,
            type_name: type_name.into(),
            fields: OrdMap::new(),
            timestamp: SystemTime::now(),
        }
    }

    /// Sets the fact identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<Arc<str>>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Adds a field value.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<Arc<str>>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Returns the fact identifier, if assigned.
    #[must_use]
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Returns the fact type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Returns the unique key (`Type~id`), if an identifier is assigned.
    #[must_use]
    pub fn key(&self) -> Option<FactKey> {
        self.id
            .as_deref()
            .map(|id| FactKey::new(&self.type_name, id))
    }

    /// Returns the submission timestamp.
    #[must_use]
    pub fn timestamp(&self) -> SystemTime {
        self.timestamp
    }

    /// Returns a field value by name.
    ///
    /// The virtual [`ID_FIELD`] resolves to the assigned identifier,
    /// falling back to a declared `id` field before one is assigned.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<Value> {
        if name == ID_FIELD {
            if let Some(id) = &self.id {
                return Some(Value::String(id.clone()));
            }
        }
        self.fields.get(name).cloned()
    }

    /// Returns true if the fact carries the named field.
    #[must_use]
    pub fn has_field(&self, name: &str) -> bool {
        (name == ID_FIELD && self.id.is_some()) || self.fields.contains_key(name)
    }

    /// Iterates over the declared fields in name order.
    pub fn fields(&self) -> impl Iterator<Item = (&Arc<str>, &Value)> {
        self.fields.iter()
    }

    /// Returns the number of declared fields.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

impl fmt::Debug for Fact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fact({}", self.type_name)?;
        if let Some(id) = &self.id {
            write!(f, "~{id}")?;
        }
        write!(f, " {{")?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{name}: {value:?}")?;
        }
        write!(f, "}})")
    }
}
