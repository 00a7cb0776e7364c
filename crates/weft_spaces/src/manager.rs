//! Registry of xuple-spaces.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use weft_foundation::{Error, ErrorKind, Result};
use weft_storage::Fact;

use crate::space::{SpaceConfig, XupleSpace};
use crate::xuple::XupleId;

/// Name-to-space registry, created and torn down with the program that
/// owns it.
///
/// Always an explicitly owned context object handed to whatever publishes
/// into it; never a process-wide global.
#[derive(Default)]
pub struct XupleManager {
    spaces: RwLock<HashMap<Arc<str>, Arc<XupleSpace>>>,
}

impl XupleManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new space under the given name.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty name, a duplicate name, or an
    /// invalid configuration.
    pub fn create_space(&self, name: &str, config: SpaceConfig) -> Result<Arc<XupleSpace>> {
        if name.is_empty() {
            return Err(Error::invalid_policy("space name must not be empty"));
        }

        let space = Arc::new(XupleSpace::new(name, config)?);

        let mut spaces = self.spaces.write();
        if spaces.contains_key(name) {
            return Err(Error::new(ErrorKind::DuplicateSpace(name.to_string())));
        }
        spaces.insert(name.into(), space.clone());

        debug!(space = name, "created xuple space");
        Ok(space)
    }

    /// Returns a space by name.
    ///
    /// # Errors
    ///
    /// Returns an error if no space with the name exists.
    pub fn space(&self, name: &str) -> Result<Arc<XupleSpace>> {
        self.spaces
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::new(ErrorKind::SpaceNotFound(name.to_string())))
    }

    /// Lists the registered space names, sorted.
    #[must_use]
    pub fn list_spaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.spaces.read().keys().map(ToString::to_string).collect();
        names.sort();
        names
    }

    /// Publishes a fact into the named space.
    ///
    /// # Errors
    ///
    /// Returns an error if the space does not exist or rejects the
    /// publish (e.g. it is full).
    pub fn publish(
        &self,
        space_name: &str,
        fact: Arc<Fact>,
        triggering: Vec<Arc<Fact>>,
    ) -> Result<XupleId> {
        self.space(space_name)?.publish(fact, triggering)
    }

    /// Sweeps every space and drops the registry.
    pub fn close(&self) {
        let mut spaces = self.spaces.write();
        for space in spaces.values() {
            space.sweep_expired();
        }
        spaces.clear();
    }
}

impl fmt::Debug for XupleManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "XupleManager({} spaces)", self.spaces.read().len())
    }
}
