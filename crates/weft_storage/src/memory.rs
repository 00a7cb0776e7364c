//! Per-node working memory.

use std::fmt;
use std::sync::Arc;

use im::OrdMap;
use serde::{Deserialize, Serialize};

use weft_foundation::{Error, Result};

use crate::fact::{Fact, FactKey};
use crate::token::{Token, TokenId};

/// Store of facts and tokens owned by exactly one node.
///
/// Backed by persistent maps, so cloning a memory for a snapshot is O(1)
/// and never blocks the owning node for longer than the clone.
///
/// Invariant: a stored token only ever references facts that were present
/// when it was created; removal is retraction-driven, via [`Self::retract`].
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingMemory {
    /// Identifier of the owning node.
    node_id: Arc<str>,
    /// Facts keyed by `Type~id`.
    facts: OrdMap<FactKey, Arc<Fact>>,
    /// Tokens keyed by their identifier.
    tokens: OrdMap<TokenId, Token>,
}

impl WorkingMemory {
    /// Creates an empty memory owned by the given node.
    #[must_use]
    pub fn new(node_id: impl Into<Arc<str>>) -> Self {
        Self {
            node_id: node_id.into(),
            facts: OrdMap::new(),
            tokens: OrdMap::new(),
        }
    }

    /// Returns the owning node identifier.
    #[must_use]
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// Inserts a fact.
    ///
    /// # Errors
    ///
    /// Returns a duplicate-fact error if a fact with the same key is
    /// already present, and an internal error if the fact has no id.
    pub fn insert_fact(&mut self, fact: Arc<Fact>) -> Result<()> {
        let Some(key) = fact.key() else {
            return Err(Error::internal(format!(
                "fact of type {} has no id assigned",
                fact.type_name()
            )));
        };
        if self.facts.contains_key(&key) {
            return Err(Error::duplicate_fact(key.as_str()));
        }
        self.facts.insert(key, fact);
        Ok(())
    }

    /// Returns a fact by key.
    #[must_use]
    pub fn fact(&self, key: &FactKey) -> Option<&Arc<Fact>> {
        self.facts.get(key)
    }

    /// Returns true if a fact with the key is present.
    #[must_use]
    pub fn contains_fact(&self, key: &FactKey) -> bool {
        self.facts.contains_key(key)
    }

    /// Iterates over stored facts in key order.
    pub fn facts(&self) -> impl Iterator<Item = &Arc<Fact>> {
        self.facts.values()
    }

    /// Returns the number of stored facts.
    #[must_use]
    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    /// Inserts a token.
    pub fn insert_token(&mut self, token: Token) {
        self.tokens.insert(token.id(), token);
    }

    /// Removes a token by id, returning it if present.
    pub fn remove_token(&mut self, id: TokenId) -> Option<Token> {
        self.tokens.remove(&id)
    }

    /// Iterates over stored tokens.
    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.tokens.values()
    }

    /// Returns the number of stored tokens.
    #[must_use]
    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    /// Removes a fact and every token built from it.
    ///
    /// Returns whether the fact was present, plus the removed tokens so
    /// the caller can cascade the invalidation downstream.
    pub fn retract(&mut self, key: &FactKey) -> (bool, Vec<Token>) {
        let fact_removed = self.facts.remove(key).is_some();

        let doomed: Vec<TokenId> = self
            .tokens
            .values()
            .filter(|t| t.contains_fact(key))
            .map(Token::id)
            .collect();

        let mut removed = Vec::with_capacity(doomed.len());
        for id in doomed {
            if let Some(token) = self.tokens.remove(&id) {
                removed.push(token);
            }
        }

        (fact_removed, removed)
    }

    /// Clears all facts and tokens.
    pub fn clear(&mut self) {
        self.facts = OrdMap::new();
        self.tokens = OrdMap::new();
    }

    /// Returns true if the memory holds no facts and no tokens.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty() && self.tokens.is_empty()
    }
}

impl fmt::Debug for WorkingMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "WorkingMemory({}: {} facts, {} tokens)",
            self.node_id,
            self.facts.len(),
            self.tokens.len()
        )
    }
}
