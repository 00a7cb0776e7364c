//! Node arena for the RETE graph.
//!
//! Nodes live in a flat arena addressed by [`NodeId`] handles; children
//! hold handles only, never references, so the graph cannot form
//! reference cycles and every node's memory can be locked independently.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use weft_storage::WorkingMemory;

use crate::expr::Expr;
use crate::program::{ActionSpec, TypeDef};

/// Stable handle of a node in the arena.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Returns the arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({})", self.0)
    }
}

/// Which input of the target node an edge activates.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Side {
    /// Token input.
    Left,
    /// Fact input.
    Right,
}

/// A parent-to-child edge in the graph.
#[derive(Clone, Debug)]
pub struct Edge {
    /// The activated child.
    pub target: NodeId,
    /// Which input the child receives the activation on.
    pub side: Side,
    /// Variable to bind when this edge converts a fact into a token
    /// (set on alpha-to-left edges only).
    pub variable: Option<Arc<str>>,
}

/// Firing statistics kept per terminal node, for introspection and tests.
#[derive(Clone, Debug, Default)]
pub struct TerminalStats {
    /// Total firings (guard-passing complete matches).
    pub firings: u64,
    /// Firings whose action failed.
    pub failures: u64,
    /// Message of the most recent failure.
    pub last_error: Option<String>,
}

/// Closed sum of node behaviors.
pub enum NodeKind {
    /// Routes facts to the type node matching their declared type.
    Root,
    /// Validates facts against one type schema, stores, forwards.
    Type {
        /// The validated schema.
        def: TypeDef,
    },
    /// Single-fact filter; accepts right-activations only.
    Alpha {
        /// Variable the condition is written against.
        variable: Arc<str>,
        /// Filter condition; `None` passes every fact through.
        condition: Option<Expr>,
    },
    /// Two-input join of left tokens against right facts.
    Beta {
        /// Variable the right input binds.
        right_var: Arc<str>,
        /// Cross-variable join condition; `None` joins unconditionally.
        condition: Option<Expr>,
    },
    /// Runtime realization of one rule; fires its action on a complete,
    /// guard-satisfying token.
    Terminal {
        /// The rule this terminal realizes.
        rule: Arc<str>,
        /// Residual guard evaluated over the complete token.
        guard: Option<Expr>,
        /// The action fired per match.
        action: ActionSpec,
        /// Firing statistics.
        stats: Mutex<TerminalStats>,
    },
}

impl NodeKind {
    /// Returns the kind as a short name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Type { .. } => "type",
            Self::Alpha { .. } => "alpha",
            Self::Beta { .. } => "beta",
            Self::Terminal { .. } => "terminal",
        }
    }
}

/// One node of the graph: behavior, children, and its working memory.
pub struct Node {
    /// Arena handle.
    pub id: NodeId,
    /// Human-readable identifier (`type_Person`, `alpha_0`, ...); also the
    /// key node memories are checkpointed under.
    pub label: Arc<str>,
    /// Node behavior.
    pub kind: NodeKind,
    /// Child edges in registration order.
    pub(crate) children: Vec<Edge>,
    /// This node's exclusively-owned memory; the per-node critical section.
    pub(crate) memory: Mutex<WorkingMemory>,
}

impl Node {
    /// Creates a node with an empty memory and no children.
    #[must_use]
    pub(crate) fn new(id: NodeId, label: Arc<str>, kind: NodeKind) -> Self {
        let memory = Mutex::new(WorkingMemory::new(label.clone()));
        Self {
            id,
            label,
            kind,
            children: Vec::new(),
            memory,
        }
    }

    /// Returns the child edges.
    #[must_use]
    pub fn children(&self) -> &[Edge] {
        &self.children
    }

    /// Returns a point-in-time copy of this node's memory.
    ///
    /// Consistent for this node only; concurrent mutation of other nodes
    /// is not frozen.
    #[must_use]
    pub fn snapshot(&self) -> WorkingMemory {
        self.memory.lock().clone()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let memory = self.memory.lock();
        write!(
            f,
            "Node({} [{}] facts: {}, tokens: {}, children: {})",
            self.label,
            self.kind.name(),
            memory.fact_count(),
            memory.token_count(),
            self.children.len()
        )
    }
}
