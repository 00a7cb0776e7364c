//! Named, policy-governed xuple containers.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace};

use weft_foundation::{Error, ErrorKind, Result};
use weft_storage::Fact;

use crate::policy::{Consumption, Retention, Selection};
use crate::xuple::{Xuple, XupleId};

/// Configuration of a xuple-space.
#[derive(Clone, Debug)]
pub struct SpaceConfig {
    /// How one candidate is picked among available xuples.
    pub selection: Selection,
    /// How many retrievals a xuple survives, and by whom.
    pub consumption: Consumption,
    /// How long a xuple stays retrievable.
    pub retention: Retention,
    /// Maximum number of stored xuples; publishing into a full space is
    /// rejected (never evicted). `None` means unbounded.
    pub max_size: Option<usize>,
    /// Seed for the Random selection policy, for deterministic replay.
    pub seed: u64,
}

impl Default for SpaceConfig {
    fn default() -> Self {
        Self {
            selection: Selection::Fifo,
            consumption: Consumption::Once,
            retention: Retention::Unlimited,
            max_size: None,
            seed: 0,
        }
    }
}

impl SpaceConfig {
    /// Creates the default configuration (FIFO / once / unlimited).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the selection policy.
    #[must_use]
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    /// Sets the consumption policy.
    #[must_use]
    pub fn with_consumption(mut self, consumption: Consumption) -> Self {
        self.consumption = consumption;
        self
    }

    /// Sets the retention policy.
    #[must_use]
    pub fn with_retention(mut self, retention: Retention) -> Self {
        self.retention = retention;
        self
    }

    /// Sets the maximum size.
    #[must_use]
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    /// Sets the random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Validates all policy parameters.
    ///
    /// # Errors
    ///
    /// Returns the first configuration error found; a space is never
    /// constructed from an invalid configuration.
    pub fn validate(&self) -> Result<()> {
        self.consumption.validate()?;
        self.retention.validate()?;
        if self.max_size == Some(0) {
            return Err(Error::invalid_policy("max size must be positive"));
        }
        Ok(())
    }
}

struct SpaceInner {
    /// Stored in insertion order; FIFO/LIFO are defined by this order.
    xuples: Vec<Xuple>,
    rng: ChaCha8Rng,
}

/// A named container of xuples governed by injected policies.
///
/// Every operation that reads or writes consumption state runs under one
/// internal lock, so select-then-mark-consumed is atomic with respect to
/// concurrent retrievals: under a `Once` policy two racing retrievals can
/// never both succeed.
pub struct XupleSpace {
    name: Arc<str>,
    config: SpaceConfig,
    inner: Mutex<SpaceInner>,
}

impl XupleSpace {
    /// Creates a space with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before any xuple exists if the
    /// configuration is invalid.
    pub fn new(name: impl Into<Arc<str>>, config: SpaceConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            name: name.into(),
            config: config.clone(),
            inner: Mutex::new(SpaceInner {
                xuples: Vec::new(),
                rng: ChaCha8Rng::seed_from_u64(config.seed),
            }),
        })
    }

    /// Returns the space name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the space configuration.
    #[must_use]
    pub fn config(&self) -> &SpaceConfig {
        &self.config
    }

    /// Publishes a fact as a new xuple.
    ///
    /// # Errors
    ///
    /// Returns a space-full error when a configured maximum size is
    /// reached; the publish is rejected, nothing is evicted.
    pub fn publish(&self, fact: Arc<Fact>, triggering: Vec<Arc<Fact>>) -> Result<XupleId> {
        let mut inner = self.inner.lock();

        if let Some(max) = self.config.max_size {
            if inner.xuples.len() >= max {
                return Err(Error::new(ErrorKind::SpaceFull(self.name.to_string())));
            }
        }

        let xuple = Xuple::new(
            fact,
            triggering,
            self.config.retention.expires_at(Instant::now()),
        );
        let id = xuple.id();
        inner.xuples.push(xuple);

        debug!(space = %self.name, xuple = %id, "published xuple");
        Ok(id)
    }

    /// Retrieves one xuple for an agent, or `None` if nothing is
    /// available to it.
    ///
    /// Selection and consumption-marking happen atomically under the
    /// space lock; the returned xuple is a snapshot taken at that moment.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty agent id.
    pub fn retrieve(&self, agent_id: &str) -> Result<Option<Xuple>> {
        if agent_id.is_empty() {
            return Err(Error::new(ErrorKind::EmptyAgentId));
        }

        let mut inner = self.inner.lock();
        Ok(Self::retrieve_locked(&mut inner, &self.config, agent_id).inspect(|xuple| {
            trace!(space = %self.name, agent = agent_id, xuple = %xuple.id(), "retrieved xuple");
        }))
    }

    /// Retrieves up to `n` xuples for an agent in one atomic operation.
    ///
    /// Fewer than `n` available is not an error; `n == 0` returns an
    /// empty vector.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty agent id.
    pub fn retrieve_multiple(&self, agent_id: &str, n: usize) -> Result<Vec<Xuple>> {
        if agent_id.is_empty() {
            return Err(Error::new(ErrorKind::EmptyAgentId));
        }

        let mut inner = self.inner.lock();
        let mut retrieved = Vec::new();
        while retrieved.len() < n {
            match Self::retrieve_locked(&mut inner, &self.config, agent_id) {
                Some(xuple) => retrieved.push(xuple),
                None => break,
            }
        }
        Ok(retrieved)
    }

    /// One selection + consumption step; the caller holds the lock.
    fn retrieve_locked(
        inner: &mut SpaceInner,
        config: &SpaceConfig,
        agent_id: &str,
    ) -> Option<Xuple> {
        let now = Instant::now();

        // Lazy expiry: flip state on access rather than via a timer.
        for xuple in &mut inner.xuples {
            if xuple.is_available() && xuple.is_expired(now) {
                xuple.mark_expired();
            }
        }

        let candidates: Vec<usize> = inner
            .xuples
            .iter()
            .enumerate()
            .filter(|(_, x)| x.is_available() && config.consumption.can_consume(x, agent_id))
            .map(|(i, _)| i)
            .collect();

        let picked = config.selection.pick(candidates.len(), &mut inner.rng)?;
        let index = candidates[picked];

        let xuple = &mut inner.xuples[index];
        xuple.record_consumption(agent_id);
        if config.consumption.exhausted(xuple) {
            xuple.mark_consumed();
        }
        Some(xuple.clone())
    }

    /// Marks a specific xuple as consumed by an agent without selection.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty agent id, an unknown xuple id, or a
    /// xuple the agent may not consume under the active policy.
    pub fn mark_consumed(&self, id: XupleId, agent_id: &str) -> Result<()> {
        if agent_id.is_empty() {
            return Err(Error::new(ErrorKind::EmptyAgentId));
        }

        let mut inner = self.inner.lock();
        let now = Instant::now();

        let Some(xuple) = inner.xuples.iter_mut().find(|x| x.id() == id) else {
            return Err(Error::new(ErrorKind::XupleNotFound(id.to_string())));
        };

        if xuple.is_available() && xuple.is_expired(now) {
            xuple.mark_expired();
        }
        if !xuple.is_available() || !self.config.consumption.can_consume(xuple, agent_id) {
            return Err(Error::new(ErrorKind::XupleNotAvailable(id.to_string())));
        }

        xuple.record_consumption(agent_id);
        if self.config.consumption.exhausted(xuple) {
            xuple.mark_consumed();
        }
        Ok(())
    }

    /// Returns the number of currently-available xuples.
    #[must_use]
    pub fn count(&self) -> usize {
        let inner = self.inner.lock();
        let now = Instant::now();
        inner
            .xuples
            .iter()
            .filter(|x| x.is_available() && !x.is_expired(now))
            .count()
    }

    /// Returns snapshots of all xuples, including consumed and expired
    /// ones. Applies no policy; intended for introspection.
    #[must_use]
    pub fn list_all(&self) -> Vec<Xuple> {
        self.inner.lock().xuples.clone()
    }

    /// Removes expired xuples, returning how many were swept.
    ///
    /// Expiry is otherwise lazy; this bounds memory held by
    /// expired-but-unread xuples.
    pub fn sweep_expired(&self) -> usize {
        let mut inner = self.inner.lock();
        let now = Instant::now();
        let before = inner.xuples.len();
        inner.xuples.retain(|x| !x.is_expired(now));
        let swept = before - inner.xuples.len();
        if swept > 0 {
            debug!(space = %self.name, swept, "swept expired xuples");
        }
        swept
    }
}

impl fmt::Debug for XupleSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "XupleSpace({} selection: {}, consumption: {}, retention: {})",
            self.name, self.config.selection, self.config.consumption, self.config.retention
        )
    }
}
