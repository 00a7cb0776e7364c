//! The network façade: graph compilation, fact submission, retraction,
//! and introspection.
//!
//! The graph is compiled once from a validated program. Submission and
//! retraction are the sole write paths afterwards; both lock one node
//! memory at a time, so unrelated nodes update concurrently.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use weft_foundation::{Error, ErrorContext, Result};
use weft_storage::{Fact, FactKey, MemoryStore, Token};

use crate::dispatch::{ActionHandler, ActionObserver, Dispatcher};
use crate::expr::{Bindings, Expr, evaluate_bool};
use crate::node::{Edge, Node, NodeId, NodeKind, Side, TerminalStats};
use crate::program::{Program, RuleDef};

/// Point-in-time description of one node's memory.
#[derive(Clone, Debug)]
pub struct NodeState {
    /// Node label.
    pub label: String,
    /// Node kind name.
    pub kind: &'static str,
    /// Keys of the stored facts, in key order.
    pub fact_keys: Vec<String>,
    /// Number of stored tokens.
    pub token_count: usize,
}

/// Per-node-consistent snapshot of the whole network.
///
/// Each node is snapshotted under its own lock; under concurrent mutation
/// the snapshot is consistent per node, not network-wide.
#[derive(Clone, Debug)]
pub struct NetworkState {
    /// One entry per node, in arena order.
    pub nodes: Vec<NodeState>,
}

impl NetworkState {
    /// Returns the state of the node with the given label.
    #[must_use]
    pub fn node(&self, label: &str) -> Option<&NodeState> {
        self.nodes.iter().find(|n| n.label == label)
    }
}

/// The compiled RETE network.
pub struct Network {
    nodes: Vec<Node>,
    root: NodeId,
    /// Root's routing index: type name to type node.
    types: HashMap<Arc<str>, NodeId>,
    /// Alpha deduplication index: (type name, condition fingerprint).
    alpha_index: HashMap<(Arc<str>, String), NodeId>,
    store: Arc<dyn MemoryStore>,
    dispatcher: Dispatcher,
}

impl Network {
    /// Compiles a validated program into a network and submits its
    /// initial facts.
    ///
    /// Structurally identical type and alpha nodes are deduplicated, so
    /// compiling equivalent rules never duplicates children.
    ///
    /// # Errors
    ///
    /// Returns an internal error for structural inconsistencies in the
    /// program (duplicate type or rule names, rules without variables,
    /// conditions over undeclared variables), and any error the initial
    /// facts produce on submission.
    pub fn build(
        program: &Program,
        store: Arc<dyn MemoryStore>,
        dispatcher: Dispatcher,
    ) -> Result<Self> {
        let mut network = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            types: HashMap::new(),
            alpha_index: HashMap::new(),
            store,
            dispatcher,
        };
        network.root = network.add_node("root", NodeKind::Root);

        for type_def in &program.types {
            if network.types.contains_key(&type_def.name) {
                return Err(Error::internal(format!(
                    "duplicate type declaration: {}",
                    type_def.name
                )));
            }
            let label = format!("type_{}", type_def.name);
            let id = network.add_node(label, NodeKind::Type {
                def: type_def.clone(),
            });
            network.add_child(network.root, id, Side::Right, None)?;
            network.types.insert(type_def.name.clone(), id);
        }

        let mut rule_names: HashSet<Arc<str>> = HashSet::new();
        for rule in &program.rules {
            if !rule_names.insert(rule.name.clone()) {
                return Err(Error::internal(format!(
                    "duplicate rule declaration: {}",
                    rule.name
                )));
            }
            network.compile_rule(rule)?;
        }

        debug!(nodes = network.nodes.len(), "network compiled");

        for fact in program.initial_facts.iter().cloned() {
            network.submit_fact(fact)?;
        }

        Ok(network)
    }

    /// Submits a fact: schema validation at its type node, then
    /// propagation through the graph, firing any completed rules.
    ///
    /// # Errors
    ///
    /// Returns schema errors (unknown type, field mismatch, duplicate
    /// fact), evaluation errors raised while matching, and action errors
    /// from rules the fact fired. Already-matched state is left exactly
    /// as it was before the failing operation.
    pub fn submit_fact(&self, fact: Fact) -> Result<()> {
        let Some(&type_node) = self.types.get(fact.type_name()) else {
            return Err(Error::unknown_type(fact.type_name()));
        };
        let NodeKind::Type { def } = &self.node(type_node).kind else {
            return Err(Error::internal("type index points at a non-type node"));
        };

        def.validate(&fact)?;
        let fact = if fact.id().is_none() {
            let id = def.derive_id(&fact)?;
            fact.with_id(id)
        } else {
            fact
        };
        let fact = Arc::new(fact);
        let Some(key) = fact.key() else {
            return Err(Error::internal("fact id missing after derivation"));
        };

        debug!(fact = %key, "submitting fact");
        self.node(type_node).memory.lock().insert_fact(fact.clone())?;
        self.forward_fact(type_node, &fact)
    }

    /// Submits a batch of facts in order; the first error aborts and is
    /// returned.
    ///
    /// # Errors
    ///
    /// Same as [`Self::submit_fact`].
    pub fn submit_facts(&self, facts: impl IntoIterator<Item = Fact>) -> Result<()> {
        for fact in facts {
            self.submit_fact(fact)?;
        }
        Ok(())
    }

    /// Retracts a fact by its key (`Type~id`), removing it from every
    /// memory holding it and invalidating, recursively, every downstream
    /// token built from it.
    ///
    /// # Errors
    ///
    /// Returns a fact-not-found error if no such fact was submitted.
    pub fn retract_fact(&self, key: &str) -> Result<()> {
        let fact_key = FactKey::from(key);
        let Some((type_name, _)) = fact_key.split() else {
            return Err(Error::fact_not_found(key));
        };
        let Some(&type_node) = self.types.get(type_name) else {
            return Err(Error::fact_not_found(key));
        };

        let removed = self.node(type_node).memory.lock().retract(&fact_key).0;
        if !removed {
            return Err(Error::fact_not_found(key));
        }

        debug!(fact = key, "retracting fact");
        let children: Vec<NodeId> = self
            .node(type_node)
            .children
            .iter()
            .map(|e| e.target)
            .collect();
        for child in children {
            self.cascade_retract(child, &fact_key);
        }
        Ok(())
    }

    /// Registers a named action handler.
    pub fn register_handler(&self, name: impl Into<Arc<str>>, handler: Arc<dyn ActionHandler>) {
        self.dispatcher.register_handler(name, handler);
    }

    /// Registers an observer notified synchronously on every firing.
    pub fn register_observer(&self, observer: Arc<dyn ActionObserver>) {
        self.dispatcher.register_observer(observer);
    }

    /// Returns a per-node-consistent snapshot of every node's memory.
    #[must_use]
    pub fn network_state(&self) -> NetworkState {
        let nodes = self
            .nodes
            .iter()
            .map(|node| {
                let memory = node.memory.lock();
                NodeState {
                    label: node.label.to_string(),
                    kind: node.kind.name(),
                    fact_keys: memory
                        .facts()
                        .filter_map(|f| f.key().map(|k| k.as_str().to_string()))
                        .collect(),
                    token_count: memory.token_count(),
                }
            })
            .collect();
        NetworkState { nodes }
    }

    /// Renders the graph as an indented diagnostic tree.
    ///
    /// Shared nodes appear once per parent; `[L]`/`[R]` mark which input
    /// of the child each edge activates.
    #[must_use]
    pub fn print_tree(&self) -> String {
        let mut out = String::new();
        self.write_node(&mut out, self.root, 0, None);
        out
    }

    /// Returns the firing statistics of a rule's terminal node.
    #[must_use]
    pub fn terminal_stats(&self, rule: &str) -> Option<TerminalStats> {
        self.nodes.iter().find_map(|node| match &node.kind {
            NodeKind::Terminal { rule: r, stats, .. } if r.as_ref() == rule => {
                Some(stats.lock().clone())
            }
            _ => None,
        })
    }

    /// Saves every node's memory to the checkpoint store.
    ///
    /// # Errors
    ///
    /// Returns the first store error encountered.
    pub fn checkpoint(&self) -> Result<()> {
        for node in &self.nodes {
            self.store.save_memory(&node.label, &node.snapshot())?;
        }
        Ok(())
    }

    /// Restores node memories from the checkpoint store; nodes without a
    /// stored memory keep their current one.
    ///
    /// # Errors
    ///
    /// Returns the first store error encountered.
    pub fn restore(&self) -> Result<()> {
        for node in &self.nodes {
            if let Some(memory) = self.store.load_memory(&node.label)? {
                *node.memory.lock() = memory;
            }
        }
        Ok(())
    }

    /// Clears every node's memory, keeping the compiled graph.
    pub fn reset(&self) {
        for node in &self.nodes {
            node.memory.lock().clear();
        }
    }

    /// Returns the number of nodes in the graph.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // ------------------------------------------------------------------
    // Compilation
    // ------------------------------------------------------------------

    fn add_node(&mut self, label: impl Into<Arc<str>>, kind: NodeKind) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).expect("too many nodes"));
        self.nodes.push(Node::new(id, label.into(), kind));
        id
    }

    /// Adds a parent-to-child edge.
    ///
    /// Edges always point at later arena slots, which is what makes the
    /// graph a DAG by construction; an identical edge is skipped, keeping
    /// compilation idempotent.
    fn add_child(
        &mut self,
        parent: NodeId,
        child: NodeId,
        side: Side,
        variable: Option<Arc<str>>,
    ) -> Result<()> {
        if child.0 <= parent.0 {
            return Err(Error::internal(format!(
                "edge {} -> {} would not point forward",
                self.node(parent).label,
                self.node(child).label
            )));
        }
        let node = &mut self.nodes[parent.index()];
        if node
            .children
            .iter()
            .any(|e| e.target == child && e.side == side)
        {
            return Ok(());
        }
        node.children.push(Edge {
            target: child,
            side,
            variable,
        });
        Ok(())
    }

    fn compile_rule(&mut self, rule: &RuleDef) -> Result<()> {
        if rule.decls.is_empty() {
            return Err(Error::internal(format!(
                "rule {} declares no variables",
                rule.name
            )));
        }

        let declared: BTreeSet<Arc<str>> =
            rule.decls.iter().map(|d| d.variable.clone()).collect();
        let conjuncts: Vec<Expr> = rule
            .condition
            .as_ref()
            .map(|c| c.conjuncts().into_iter().cloned().collect())
            .unwrap_or_default();
        let conjunct_vars: Vec<BTreeSet<Arc<str>>> =
            conjuncts.iter().map(Expr::variables).collect();
        for vars in &conjunct_vars {
            if !vars.is_subset(&declared) {
                return Err(Error::internal(format!(
                    "rule {} constrains an undeclared variable",
                    rule.name
                )));
            }
        }
        let mut used = vec![false; conjuncts.len()];

        // One alpha chain entry per declared variable: the conjunction of
        // the conjuncts constraining that variable alone.
        let mut alphas = Vec::with_capacity(rule.decls.len());
        for decl in &rule.decls {
            let mine: Vec<Expr> = conjuncts
                .iter()
                .zip(conjunct_vars.iter())
                .zip(used.iter_mut())
                .filter(|((_, vars), used)| {
                    !**used && vars.len() == 1 && vars.contains(&decl.variable)
                })
                .map(|((expr, _), used)| {
                    *used = true;
                    expr.clone()
                })
                .collect();
            let condition = Expr::conjoin(mine);
            alphas.push(self.alpha_node(&decl.type_name, &decl.variable, condition)?);
        }

        // Join chain over the declared variables in declaration order.
        let mut scope: BTreeSet<Arc<str>> =
            std::iter::once(rule.decls[0].variable.clone()).collect();
        let mut upstream = alphas[0];
        let mut upstream_var = Some(rule.decls[0].variable.clone());
        for (k, decl) in rule.decls.iter().enumerate().skip(1) {
            scope.insert(decl.variable.clone());
            let join_condition: Vec<Expr> = conjuncts
                .iter()
                .zip(conjunct_vars.iter())
                .zip(used.iter_mut())
                .filter(|((_, vars), used)| {
                    !**used && vars.len() > 1 && vars.is_subset(&scope)
                })
                .map(|((expr, _), used)| {
                    *used = true;
                    expr.clone()
                })
                .collect();

            let label = format!("join_{}", self.nodes.len());
            let beta = self.add_node(label, NodeKind::Beta {
                right_var: decl.variable.clone(),
                condition: Expr::conjoin(join_condition),
            });
            self.add_child(upstream, beta, Side::Left, upstream_var.take())?;
            self.add_child(alphas[k], beta, Side::Right, None)?;
            upstream = beta;
        }

        // Whatever could not be placed on an alpha or a join (constant
        // conjuncts) becomes the terminal guard.
        let residual: Vec<Expr> = conjuncts
            .iter()
            .zip(used.iter())
            .filter(|(_, used)| !**used)
            .map(|(expr, _)| expr.clone())
            .collect();

        let terminal = self.add_node(format!("terminal_{}", rule.name), NodeKind::Terminal {
            rule: rule.name.clone(),
            guard: Expr::conjoin(residual),
            action: rule.action.clone(),
            stats: Mutex::new(TerminalStats::default()),
        });
        self.add_child(upstream, terminal, Side::Left, upstream_var)?;
        Ok(())
    }

    /// Returns the alpha node for `(type, condition)`, creating it only
    /// if no structurally identical one exists.
    fn alpha_node(
        &mut self,
        type_name: &Arc<str>,
        variable: &Arc<str>,
        condition: Option<Expr>,
    ) -> Result<NodeId> {
        let Some(&type_node) = self.types.get(type_name) else {
            return Err(Error::internal(format!(
                "rule variable ranges over undeclared type {type_name}"
            )));
        };

        let fingerprint = condition
            .as_ref()
            .map_or_else(|| "passthrough".to_string(), Expr::fingerprint);
        let key = (type_name.clone(), fingerprint);
        if let Some(&existing) = self.alpha_index.get(&key) {
            return Ok(existing);
        }

        let label = format!("alpha_{}", self.alpha_index.len());
        let id = self.add_node(label, NodeKind::Alpha {
            variable: variable.clone(),
            condition,
        });
        self.add_child(type_node, id, Side::Right, None)?;
        self.alpha_index.insert(key, id);
        Ok(id)
    }

    // ------------------------------------------------------------------
    // Activation
    // ------------------------------------------------------------------

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    /// Propagates a stored fact along a node's child edges, converting it
    /// into a single-binding token on left edges.
    fn forward_fact(&self, from: NodeId, fact: &Arc<Fact>) -> Result<()> {
        let node = self.node(from);
        for edge in &node.children {
            match edge.side {
                Side::Right => self.right_activate(edge.target, fact)?,
                Side::Left => {
                    let Some(variable) = edge.variable.clone() else {
                        return Err(Error::internal(format!(
                            "left edge from {} carries no binding variable",
                            node.label
                        )));
                    };
                    let token = Token::with_fact(variable, fact.clone(), node.label.clone());
                    self.left_activate(edge.target, token)?;
                }
            }
        }
        Ok(())
    }

    fn forward_token(&self, from: NodeId, token: &Token) -> Result<()> {
        let node = self.node(from);
        for edge in &node.children {
            if edge.side == Side::Right {
                return Err(Error::internal(format!(
                    "token cannot flow along a right edge out of {}",
                    node.label
                )));
            }
            self.left_activate(edge.target, token.clone())?;
        }
        Ok(())
    }

    fn right_activate(&self, id: NodeId, fact: &Arc<Fact>) -> Result<()> {
        let node = self.node(id);
        match &node.kind {
            NodeKind::Alpha {
                variable,
                condition,
            } => {
                if let Some(condition) = condition {
                    let bindings = Bindings::Single {
                        variable: variable.as_ref(),
                        fact: fact.as_ref(),
                    };
                    let matched = evaluate_bool(condition, &bindings).map_err(|e| {
                        e.with_context(ErrorContext::new().with_node(node.label.as_ref()))
                    })?;
                    if !matched {
                        return Ok(());
                    }
                }

                {
                    let mut memory = node.memory.lock();
                    if fact.key().is_some_and(|k| memory.contains_fact(&k)) {
                        // Already seen through a shared edge; don't
                        // propagate twice.
                        return Ok(());
                    }
                    memory.insert_fact(fact.clone())?;
                }
                trace!(node = %node.label, "alpha matched");
                self.forward_fact(id, fact)
            }
            NodeKind::Beta {
                right_var,
                condition,
            } => {
                // Store and read the opposite side under one lock so a
                // racing left activation cannot produce the same pair.
                let candidates: Vec<Token> = {
                    let mut memory = node.memory.lock();
                    if fact.key().is_some_and(|k| memory.contains_fact(&k)) {
                        return Ok(());
                    }
                    memory.insert_fact(fact.clone())?;
                    memory.tokens().cloned().collect()
                };

                for token in candidates {
                    let joined = token.join(right_var.clone(), fact.clone(), node.label.clone());
                    if self.join_passes(node, condition.as_ref(), &joined)? {
                        self.forward_token(id, &joined)?;
                    }
                }
                Ok(())
            }
            NodeKind::Terminal { .. } => Err(Error::internal(format!(
                "terminal node {} cannot receive a direct fact activation",
                node.label
            ))),
            NodeKind::Root | NodeKind::Type { .. } => Err(Error::internal(format!(
                "node {} is not activated through the graph",
                node.label
            ))),
        }
    }

    fn left_activate(&self, id: NodeId, token: Token) -> Result<()> {
        let node = self.node(id);
        match &node.kind {
            NodeKind::Beta {
                right_var,
                condition,
            } => {
                let facts: Vec<Arc<Fact>> = {
                    let mut memory = node.memory.lock();
                    memory.insert_token(token.clone());
                    memory.facts().cloned().collect()
                };

                for fact in facts {
                    let joined = token.join(right_var.clone(), fact, node.label.clone());
                    if self.join_passes(node, condition.as_ref(), &joined)? {
                        self.forward_token(id, &joined)?;
                    }
                }
                Ok(())
            }
            NodeKind::Terminal {
                rule,
                guard,
                action,
                stats,
            } => {
                if let Some(guard) = guard {
                    let passed =
                        evaluate_bool(guard, &Bindings::Token(&token)).map_err(|e| {
                            e.with_context(ErrorContext::new().with_rule(rule.as_ref()))
                        })?;
                    if !passed {
                        return Ok(());
                    }
                }

                node.memory.lock().insert_token(token.clone());
                debug!(rule = %rule, "rule fired");

                let result = self.dispatcher.dispatch(rule, action, &token);
                let mut stats = stats.lock();
                stats.firings += 1;
                if let Err(err) = &result {
                    stats.failures += 1;
                    stats.last_error = Some(err.to_string());
                }
                result
            }
            NodeKind::Root | NodeKind::Type { .. } | NodeKind::Alpha { .. } => {
                Err(Error::internal(format!(
                    "node {} cannot receive a token activation",
                    node.label
                )))
            }
        }
    }

    fn join_passes(&self, node: &Node, condition: Option<&Expr>, token: &Token) -> Result<bool> {
        let Some(condition) = condition else {
            return Ok(true);
        };
        evaluate_bool(condition, &Bindings::Token(token))
            .map_err(|e| e.with_context(ErrorContext::new().with_node(node.label.as_ref())))
    }

    // ------------------------------------------------------------------
    // Retraction
    // ------------------------------------------------------------------

    /// Removes the fact and dependent tokens here, then keeps cascading
    /// only while something was actually removed.
    fn cascade_retract(&self, id: NodeId, key: &FactKey) {
        let node = self.node(id);
        let (removed_fact, removed_tokens) = node.memory.lock().retract(key);
        if removed_fact || !removed_tokens.is_empty() {
            for edge in &node.children {
                self.cascade_retract(edge.target, key);
            }
        }
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    fn write_node(&self, out: &mut String, id: NodeId, depth: usize, side: Option<Side>) {
        let node = self.node(id);
        let (fact_count, token_count) = {
            let memory = node.memory.lock();
            (memory.fact_count(), memory.token_count())
        };
        for _ in 0..depth {
            out.push_str("  ");
        }
        let marker = match side {
            Some(Side::Left) => "[L] ",
            Some(Side::Right) => "[R] ",
            None => "",
        };
        let _ = writeln!(
            out,
            "{marker}{} [{}] facts: {fact_count}, tokens: {token_count}",
            node.label,
            node.kind.name(),
        );
        for edge in &node.children {
            self.write_node(out, edge.target, depth + 1, Some(edge.side));
        }
    }
}
