//! Selection, consumption, and retention policies.

use std::fmt;
use std::time::{Duration, Instant};

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use weft_foundation::{Error, Result};

use crate::xuple::Xuple;

/// Picks one candidate among the currently-available xuples.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Selection {
    /// Oldest first (insertion order).
    Fifo,
    /// Newest first.
    Lifo,
    /// Uniformly random among candidates.
    Random,
}

impl Selection {
    /// Picks an index into a candidate list of the given length.
    ///
    /// Returns `None` for an empty list. Candidates are assumed to be in
    /// insertion order, which is what FIFO/LIFO are scoped to.
    pub(crate) fn pick(self, len: usize, rng: &mut ChaCha8Rng) -> Option<usize> {
        if len == 0 {
            return None;
        }
        Some(match self {
            Self::Fifo => 0,
            Self::Lifo => len - 1,
            Self::Random => rng.gen_range(0..len),
        })
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fifo => write!(f, "fifo"),
            Self::Lifo => write!(f, "lifo"),
            Self::Random => write!(f, "random"),
        }
    }
}

/// Governs how many retrievals a xuple survives, and by whom.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Consumption {
    /// The first successful retrieval makes the xuple unavailable to all.
    Once,
    /// Each distinct agent may retrieve the xuple exactly once.
    PerAgent,
    /// Up to `n` total retrievals across all agents.
    Limited(u32),
}

impl Consumption {
    /// Validates policy parameters.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for `Limited(0)`.
    pub fn validate(self) -> Result<()> {
        match self {
            Self::Limited(0) => Err(Error::invalid_policy(
                "limited consumption requires a positive count",
            )),
            _ => Ok(()),
        }
    }

    /// Returns true if the agent may consume the xuple under this policy.
    ///
    /// Availability and expiry are checked by the caller; this only
    /// applies the consumption rule itself.
    #[must_use]
    pub fn can_consume(self, xuple: &Xuple, agent_id: &str) -> bool {
        match self {
            Self::Once => xuple.consumption_count() == 0,
            Self::PerAgent => !xuple.consumed_by(agent_id),
            Self::Limited(n) => xuple.consumption_count() < n,
        }
    }

    /// Returns true if the xuple is fully consumed after a retrieval.
    #[must_use]
    pub fn exhausted(self, xuple: &Xuple) -> bool {
        match self {
            Self::Once => xuple.consumption_count() >= 1,
            // New agents may always appear, so per-agent xuples are only
            // ever retired by retention.
            Self::PerAgent => false,
            Self::Limited(n) => xuple.consumption_count() >= n,
        }
    }
}

impl fmt::Display for Consumption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Once => write!(f, "once"),
            Self::PerAgent => write!(f, "per-agent"),
            Self::Limited(n) => write!(f, "limited({n})"),
        }
    }
}

/// Governs how long a xuple stays retrievable, independent of consumption.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Retention {
    /// Xuples never expire.
    Unlimited,
    /// Xuples expire this long after creation.
    Duration(Duration),
}

impl Retention {
    /// Validates policy parameters.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a zero duration.
    pub fn validate(self) -> Result<()> {
        match self {
            Self::Duration(d) if d.is_zero() => Err(Error::invalid_policy(
                "retention duration must be positive",
            )),
            _ => Ok(()),
        }
    }

    /// Computes the expiry instant for a xuple created at `created_at`.
    #[must_use]
    pub fn expires_at(self, created_at: Instant) -> Option<Instant> {
        match self {
            Self::Unlimited => None,
            Self::Duration(d) => Some(created_at + d),
        }
    }
}

impl fmt::Display for Retention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlimited => write!(f, "unlimited"),
            Self::Duration(d) => write!(f, "duration({d:?})"),
        }
    }
}
