//! Xuples: published tuples with provenance and consumption state.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use weft_storage::Fact;

/// Process-wide xuple counter.
static XUPLE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Unique xuple identifier.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct XupleId(u64);

impl XupleId {
    /// Allocates a fresh identifier.
    #[must_use]
    pub fn next() -> Self {
        Self(XUPLE_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw counter value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for XupleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "XupleId({})", self.0)
    }
}

impl fmt::Display for XupleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "xuple_{}", self.0)
    }
}

/// Lifecycle state of a xuple.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum XupleState {
    /// Retrievable, subject to the consumption policy.
    Available,
    /// Fully consumed; never retrievable again.
    Consumed,
    /// Past its retention window; never retrievable again.
    Expired,
}

impl fmt::Display for XupleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available => write!(f, "available"),
            Self::Consumed => write!(f, "consumed"),
            Self::Expired => write!(f, "expired"),
        }
    }
}

/// A published tuple: one immutable fact plus provenance and mutable
/// consumption metadata.
///
/// The wrapped fact and the triggering facts never change; the space
/// mutates the metadata only inside its own critical section. Clones
/// handed out by retrieval are snapshots.
#[derive(Clone, Debug)]
pub struct Xuple {
    id: XupleId,
    fact: Arc<Fact>,
    triggering: Vec<Arc<Fact>>,
    created_at: Instant,
    expires_at: Option<Instant>,
    consumption_count: u32,
    consumed_by: HashMap<Arc<str>, Instant>,
    state: XupleState,
}

impl Xuple {
    /// Creates an available xuple wrapping the given fact.
    #[must_use]
    pub fn new(fact: Arc<Fact>, triggering: Vec<Arc<Fact>>, expires_at: Option<Instant>) -> Self {
        Self {
            id: XupleId::next(),
            fact,
            triggering,
            created_at: Instant::now(),
            expires_at,
            consumption_count: 0,
            consumed_by: HashMap::new(),
            state: XupleState::Available,
        }
    }

    /// Returns the xuple identifier.
    #[must_use]
    pub fn id(&self) -> XupleId {
        self.id
    }

    /// Returns the wrapped fact.
    #[must_use]
    pub fn fact(&self) -> &Arc<Fact> {
        &self.fact
    }

    /// Returns the facts whose match produced this xuple (audit only).
    #[must_use]
    pub fn triggering(&self) -> &[Arc<Fact>] {
        &self.triggering
    }

    /// Returns the creation instant.
    #[must_use]
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub fn state(&self) -> XupleState {
        self.state
    }

    /// Returns the total number of retrievals so far.
    #[must_use]
    pub fn consumption_count(&self) -> u32 {
        self.consumption_count
    }

    /// Returns true if the given agent has retrieved this xuple.
    #[must_use]
    pub fn consumed_by(&self, agent_id: &str) -> bool {
        self.consumed_by.contains_key(agent_id)
    }

    /// Returns true if the xuple is in the available state.
    #[must_use]
    pub fn is_available(&self) -> bool {
        self.state == XupleState::Available
    }

    /// Returns true if the retention window has passed at `now`.
    ///
    /// Read-only; the owning space flips the state inside its lock.
    #[must_use]
    pub fn is_expired(&self, now: Instant) -> bool {
        if self.state == XupleState::Expired {
            return true;
        }
        self.expires_at.is_some_and(|at| now >= at)
    }

    /// Marks the retention window as passed.
    pub(crate) fn mark_expired(&mut self) {
        self.state = XupleState::Expired;
    }

    /// Marks the xuple as fully consumed.
    pub(crate) fn mark_consumed(&mut self) {
        self.state = XupleState::Consumed;
    }

    /// Records one retrieval by an agent.
    pub(crate) fn record_consumption(&mut self, agent_id: &str) {
        self.consumed_by.insert(agent_id.into(), Instant::now());
        self.consumption_count += 1;
    }
}
