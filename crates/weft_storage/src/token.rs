//! Tokens: partial matches accumulated while joining facts.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use im::OrdMap;
use serde::{Deserialize, Serialize};

use crate::fact::{Fact, FactKey};

/// Process-wide token counter; ids only need to be unique, not dense.
static TOKEN_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique token identifier.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TokenId(u64);

impl TokenId {
    /// Allocates a fresh identifier.
    #[must_use]
    pub fn next() -> Self {
        Self(TOKEN_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw counter value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TokenId({})", self.0)
    }
}

/// Ordered sequence of bound facts flowing through the join network.
///
/// Bindings are immutable: a join never mutates an existing token, it
/// produces a longer one sharing the parent's facts. A token lives no
/// longer than its shortest-lived contributing fact; retraction of any
/// bound fact destroys it.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Unique identifier.
    id: TokenId,
    /// Bound facts in join order.
    facts: Vec<Arc<Fact>>,
    /// Variable bindings (name to bound fact).
    bindings: OrdMap<Arc<str>, Arc<Fact>>,
    /// Identifier of the node that created this token.
    node_id: Arc<str>,
}

impl Token {
    /// Creates a token binding a single fact to a variable.
    #[must_use]
    pub fn with_fact(
        variable: impl Into<Arc<str>>,
        fact: Arc<Fact>,
        node_id: impl Into<Arc<str>>,
    ) -> Self {
        let mut bindings = OrdMap::new();
        bindings.insert(variable.into(), fact.clone());
        Self {
            id: TokenId::next(),
            facts: vec![fact],
            bindings,
            node_id: node_id.into(),
        }
    }

    /// Creates a longer token by joining a new fact onto this one.
    ///
    /// The parent is untouched; facts are shared, not copied.
    #[must_use]
    pub fn join(
        &self,
        variable: impl Into<Arc<str>>,
        fact: Arc<Fact>,
        node_id: impl Into<Arc<str>>,
    ) -> Self {
        let mut facts = Vec::with_capacity(self.facts.len() + 1);
        facts.extend(self.facts.iter().cloned());
        facts.push(fact.clone());

        let mut bindings = self.bindings.clone();
        bindings.insert(variable.into(), fact);

        Self {
            id: TokenId::next(),
            facts,
            bindings,
            node_id: node_id.into(),
        }
    }

    /// Returns the token identifier.
    #[must_use]
    pub fn id(&self) -> TokenId {
        self.id
    }

    /// Returns the bound facts in join order.
    #[must_use]
    pub fn facts(&self) -> &[Arc<Fact>] {
        &self.facts
    }

    /// Returns the identifier of the creating node.
    #[must_use]
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Returns the fact bound to a variable.
    #[must_use]
    pub fn binding(&self, variable: &str) -> Option<&Arc<Fact>> {
        self.bindings.get(variable)
    }

    /// Returns true if the variable is bound.
    #[must_use]
    pub fn has_binding(&self, variable: &str) -> bool {
        self.bindings.contains_key(variable)
    }

    /// Iterates over bound variables in name order.
    pub fn variables(&self) -> impl Iterator<Item = &Arc<str>> {
        self.bindings.keys()
    }

    /// Returns true if any bound fact has the given key.
    #[must_use]
    pub fn contains_fact(&self, key: &FactKey) -> bool {
        self.facts
            .iter()
            .any(|f| f.key().as_ref() == Some(key))
    }

    /// Returns the number of bound facts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.facts.len()
    }

    /// Returns true if the token binds no facts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({} @{} [", self.id.value(), self.node_id)?;
        for (i, (var, fact)) in self.bindings.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            match fact.key() {
                Some(key) => write!(f, "{var}={key}")?,
                None => write!(f, "{var}=?")?,
            }
        }
        write!(f, "])")
    }
}
