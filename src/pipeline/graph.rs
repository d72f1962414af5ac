use super::conversion::IntoPipeline;
use super::definition::PipelineDefinition;
use super::kind::NodeKind;
use super::model::{
    EdgeId, EdgeState, InputSocket, NodeData, NodeId, PipelineEdge, PipelineNode, ProposedEdge,
};
use super::typing::{self, Diagnostic, NodeTypes, TypeCache};
use super::validator::{self, DroppedEdge, LoadReport, RejectedEdge, RevalidationReport};
use super::GraphConfig;
use crate::error::{DefinitionError, GraphError, LoadError};
use crate::schedule::{
    Adjacency, ExecutionPlan, PostOrder, Reachable, ScheduleMode, Scheduler, find_cycle,
};
use crate::scope::Scope;
use crate::types::Type;
use ahash::{AHashMap, AHashSet};
use log::{debug, info};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Registers node kinds against a scope and produces an empty [`PipelineGraph`].
pub struct GraphBuilder {
    scope: Arc<Scope>,
    kinds: AHashMap<String, Arc<NodeKind>>,
    aliases: Vec<(String, String)>,
    config: GraphConfig,
}

impl GraphBuilder {
    pub fn new(scope: Arc<Scope>) -> Self {
        Self {
            scope,
            kinds: AHashMap::new(),
            aliases: Vec::new(),
            config: GraphConfig::default(),
        }
    }

    pub fn with_kind(mut self, kind: NodeKind) -> Self {
        self.kinds.insert(kind.name().to_string(), Arc::new(kind));
        self
    }

    /// Makes `user_kind` instantiate the registered kind `registered_kind`.
    pub fn with_kind_alias(mut self, user_kind: &str, registered_kind: &str) -> Self {
        self.aliases
            .push((user_kind.to_string(), registered_kind.to_string()));
        self
    }

    pub fn with_config(mut self, config: GraphConfig) -> Self {
        self.config = config;
        self
    }

    /// Checks every socket expression of every kind against the scope.
    pub fn build(self) -> Result<PipelineGraph, DefinitionError> {
        let mut kinds = self.kinds;

        let mut names: Vec<&String> = kinds.keys().collect();
        names.sort();
        for name in names {
            kinds[name].check_references(&self.scope)?;
        }

        for (user_kind, registered_kind) in self.aliases {
            let Some(kind) = kinds.get(&registered_kind).cloned() else {
                return Err(DefinitionError::InvalidNodeKind {
                    kind: user_kind,
                    message: format!("alias of unregistered kind '{}'", registered_kind),
                });
            };
            kinds.insert(user_kind, kind);
        }

        Ok(PipelineGraph {
            scope: self.scope,
            kinds,
            config: self.config,
            nodes: Vec::new(),
            edges: BTreeMap::new(),
            next_edge: 0,
            cache: RefCell::new(TypeCache::default()),
        })
    }
}

/// The editing session's pipeline: nodes in insertion order plus committed edges.
///
/// Every mutation either succeeds and leaves the graph satisfying its
/// invariants (acyclic, in-range sockets, bounded arity, compatible types), or
/// fails and leaves the graph untouched. Socket types are computed on demand
/// and cached until something upstream changes.
#[derive(Debug)]
pub struct PipelineGraph {
    scope: Arc<Scope>,
    kinds: AHashMap<String, Arc<NodeKind>>,
    config: GraphConfig,
    nodes: Vec<PipelineNode>,
    edges: BTreeMap<EdgeId, PipelineEdge>,
    next_edge: u64,
    cache: RefCell<TypeCache>,
}

impl PipelineGraph {
    pub fn scope(&self) -> &Arc<Scope> {
        &self.scope
    }

    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn kind(&self, name: &str) -> Option<&NodeKind> {
        self.kinds.get(name).map(Arc::as_ref)
    }

    pub fn nodes(&self) -> &[PipelineNode] {
        &self.nodes
    }

    pub fn node(&self, id: &NodeId) -> Option<&PipelineNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    /// Committed edges in commit order.
    pub fn edges(&self) -> impl Iterator<Item = &PipelineEdge> {
        self.edges.values()
    }

    pub fn edge(&self, id: EdgeId) -> Option<&PipelineEdge> {
        self.edges.get(&id)
    }

    pub(crate) fn effective_arity(&self, socket: &InputSocket) -> usize {
        socket.arity.unwrap_or(self.config.default_arity)
    }

    // Mutations

    pub fn add_node(
        &mut self,
        id: impl Into<NodeId>,
        kind: &str,
        data: NodeData,
    ) -> Result<(), GraphError> {
        let id = id.into();
        if self.node(&id).is_some() {
            return Err(GraphError::DuplicateNode(id));
        }
        let Some(node_kind) = self.kinds.get(kind) else {
            return Err(GraphError::UnknownNodeKind {
                node: id,
                kind: kind.to_string(),
            });
        };
        debug!("Added node '{}' of kind '{}'", id, kind);
        let node = node_kind.instantiate(id, data);
        self.nodes.push(node);
        Ok(())
    }

    /// Removes a node and every edge touching it.
    pub fn remove_node(&mut self, id: &NodeId) -> Result<RevalidationReport, GraphError> {
        let Some(position) = self.nodes.iter().position(|n| &n.id == id) else {
            return Err(GraphError::NodeNotFound(id.clone()));
        };
        self.invalidate_from(id);

        let incident: Vec<EdgeId> = self
            .edges
            .values()
            .filter(|e| &e.source == id || &e.target == id)
            .map(|e| e.id)
            .collect();
        let removed: Vec<PipelineEdge> = incident
            .iter()
            .filter_map(|edge_id| self.edges.remove(edge_id))
            .collect();
        self.nodes.remove(position);
        debug!("Removed node '{}' and {} incident edge(s)", id, removed.len());

        let mut report = self.after_change();
        report.removed = removed;
        Ok(report)
    }

    /// Checks a proposed edge against the committed graph without changing it.
    pub fn check_edge(&self, edge: &ProposedEdge) -> Result<(), GraphError> {
        validator::check_edge(self, edge)
    }

    pub fn propose_edge(&self, edge: &ProposedEdge) -> EdgeState {
        match self.check_edge(edge) {
            Ok(()) => EdgeState::Valid,
            Err(reason) => EdgeState::Rejected(reason),
        }
    }

    /// Checks and commits an edge. A rejected edge leaves the graph unchanged.
    pub fn add_edge(&mut self, edge: ProposedEdge) -> Result<EdgeId, GraphError> {
        if let Err(reason) = self.check_edge(&edge) {
            debug!(
                "Rejected edge '{}'[{}] -> '{}'[{}]: {}",
                edge.source, edge.source_socket, edge.target, edge.target_socket, reason
            );
            return Err(reason);
        }
        let id = EdgeId(self.next_edge);
        self.next_edge += 1;
        self.commit(PipelineEdge::commit(id, edge));
        Ok(id)
    }

    /// Like [`add_edge`](Self::add_edge), reporting the outcome as an [`EdgeState`].
    pub fn apply_edge(&mut self, edge: ProposedEdge) -> EdgeState {
        match self.add_edge(edge) {
            Ok(id) => EdgeState::Committed(id),
            Err(reason) => EdgeState::Rejected(reason),
        }
    }

    pub fn remove_edge(&mut self, id: EdgeId) -> Result<RevalidationReport, GraphError> {
        let Some(target) = self.edges.get(&id).map(|e| e.target.clone()) else {
            return Err(GraphError::EdgeNotFound(id));
        };
        self.invalidate_from(&target);
        self.edges.remove(&id);
        debug!("Removed edge {}", id);
        Ok(self.after_change())
    }

    /// Replaces a node's data. Types of the node and everything downstream are recomputed.
    pub fn update_node_data(
        &mut self,
        id: &NodeId,
        data: NodeData,
    ) -> Result<RevalidationReport, GraphError> {
        self.invalidate_from(id);
        let Some(node) = self.nodes.iter_mut().find(|n| &n.id == id) else {
            return Err(GraphError::NodeNotFound(id.clone()));
        };
        node.data = data;
        Ok(self.after_change())
    }

    /// Adds every node of a definition, then applies its edges in order.
    /// Node errors abort the load before anything is added; rejected edges
    /// are reported and skipped.
    pub fn load(&mut self, definition: PipelineDefinition) -> Result<LoadReport, GraphError> {
        let mut seen = AHashSet::new();
        for node in &definition.nodes {
            if self.node(&node.id).is_some() || !seen.insert(&node.id) {
                return Err(GraphError::DuplicateNode(node.id.clone()));
            }
            if !self.kinds.contains_key(&node.kind) {
                return Err(GraphError::UnknownNodeKind {
                    node: node.id.clone(),
                    kind: node.kind.clone(),
                });
            }
        }

        let mut report = LoadReport::default();
        for node in definition.nodes {
            self.add_node(node.id, &node.kind, node.data)?;
        }
        for edge in definition.edges {
            let edge: ProposedEdge = edge.into();
            match self.add_edge(edge.clone()) {
                Ok(id) => report.committed.push(id),
                Err(reason) => report.rejected.push(RejectedEdge { edge, reason }),
            }
        }
        info!(
            "Loaded pipeline: {} node(s), {} edge(s) committed, {} rejected",
            self.nodes.len(),
            report.committed.len(),
            report.rejected.len()
        );
        Ok(report)
    }

    /// Converts a custom format with [`IntoPipeline`] and loads it.
    pub fn load_from<P: IntoPipeline>(&mut self, source: P) -> Result<LoadReport, LoadError> {
        let definition = source.into_pipeline()?;
        Ok(self.load(definition)?)
    }

    fn commit(&mut self, edge: PipelineEdge) {
        self.invalidate_from(&edge.target);
        debug!(
            "Committed edge {}: '{}'[{}] -> '{}'[{}]",
            edge.id, edge.source, edge.source_socket, edge.target, edge.target_socket
        );
        self.edges.insert(edge.id, edge);
    }

    fn after_change(&mut self) -> RevalidationReport {
        if self.config.revalidate_on_change {
            self.revalidate()
        } else {
            RevalidationReport::default()
        }
    }

    /// Replays every committed edge through the validator, upstream edges
    /// first, and drops those that no longer pass.
    pub fn revalidate(&mut self) -> RevalidationReport {
        let adjacency = self.adjacency();
        let position: AHashMap<NodeId, usize> = PostOrder::new(&adjacency)
            .enumerate()
            .map(|(position, index)| (adjacency.id(index).clone(), position))
            .collect();

        let mut edges: Vec<PipelineEdge> = std::mem::take(&mut self.edges).into_values().collect();
        edges.sort_by_key(|e| (position.get(&e.source).copied().unwrap_or(usize::MAX), e.id));
        self.cache.borrow_mut().clear();

        let mut report = RevalidationReport::default();
        for edge in edges {
            match validator::check_edge(self, &edge.to_proposed()) {
                Ok(()) => {
                    self.invalidate_from(&edge.target);
                    self.edges.insert(edge.id, edge);
                }
                Err(reason) => {
                    info!("Dropped edge {} during re-validation: {}", edge.id, reason);
                    report.dropped.push(DroppedEdge { edge, reason });
                }
            }
        }
        debug_assert!(find_cycle(&self.adjacency()).is_none());
        report
    }

    /// Drops cached types of `id` and every node downstream of it.
    fn invalidate_from(&self, id: &NodeId) {
        let adjacency = self.adjacency();
        let Some(start) = adjacency.index_of(id) else {
            return;
        };
        let mut cache = self.cache.borrow_mut();
        for index in Reachable::forward(&adjacency, start) {
            cache.invalidate(adjacency.id(index));
        }
    }

    // Queries

    pub fn adjacency(&self) -> Adjacency {
        Adjacency::new(
            self.nodes.iter().map(|n| &n.id),
            self.edges.values().map(|e| (&e.source, &e.target)),
        )
    }

    fn node_types(&self, id: &NodeId) -> Result<NodeTypes, GraphError> {
        if let Some(types) = self.cache.borrow().get(id) {
            return Ok(types.clone());
        }

        let adjacency = self.adjacency();
        let start = adjacency
            .index_of(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;

        // Ancestors come first, so every source type is cached before it is needed.
        for index in PostOrder::ancestors_of(&adjacency, start) {
            let node_id = adjacency.id(index);
            if self.cache.borrow().contains(node_id) {
                continue;
            }
            let node = self
                .node(node_id)
                .ok_or_else(|| GraphError::NodeNotFound(node_id.clone()))?;
            let incoming = self.incoming_types(node);
            let types = typing::compute_node(&self.scope, &self.config, node, incoming);
            self.cache.borrow_mut().insert(node_id.clone(), types);
        }

        self.cache
            .borrow()
            .get(id)
            .cloned()
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))
    }

    fn incoming_types(&self, node: &PipelineNode) -> Vec<Vec<Type>> {
        let cache = self.cache.borrow();
        let mut incoming = vec![Vec::new(); node.inputs.len()];
        for edge in self.edges.values().filter(|e| e.target == node.id) {
            let Some(slot) = incoming.get_mut(edge.target_socket) else {
                continue;
            };
            let ty = cache
                .get(&edge.source)
                .and_then(|types| types.outputs.get(edge.source_socket))
                .cloned()
                .unwrap_or(Type::Any);
            slot.push(ty);
        }
        incoming
    }

    pub fn output_type(&self, id: &NodeId, socket: usize) -> Result<Type, GraphError> {
        self.node_types(id)?
            .outputs
            .get(socket)
            .cloned()
            .ok_or_else(|| GraphError::DanglingReference {
                node: id.clone(),
                socket,
                side: "output",
            })
    }

    /// The input's type narrowed by everything connected to it.
    pub fn input_type(&self, id: &NodeId, socket: usize) -> Result<Type, GraphError> {
        self.node_types(id)?
            .inputs
            .get(socket)
            .cloned()
            .ok_or_else(|| dangling_input(id, socket))
    }

    /// The input's type as its socket declares it, ignoring connections.
    pub fn declared_input_type(&self, id: &NodeId, socket: usize) -> Result<Type, GraphError> {
        self.node_types(id)?
            .declared_inputs
            .get(socket)
            .cloned()
            .ok_or_else(|| dangling_input(id, socket))
    }

    /// Socket expressions that failed to evaluate, across every node.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.nodes
            .iter()
            .filter_map(|n| self.node_types(&n.id).ok())
            .flat_map(|types| types.diagnostics)
            .collect()
    }

    pub fn scheduler(&self) -> Scheduler {
        Scheduler::new(self.adjacency())
    }

    pub fn execution_order(&self) -> Vec<NodeId> {
        self.scheduler().global_order()
    }

    pub fn path_decomposition(&self) -> Vec<Vec<NodeId>> {
        self.scheduler().paths()
    }

    pub fn plan(&self, mode: ScheduleMode) -> ExecutionPlan {
        self.scheduler().plan(mode)
    }
}

fn dangling_input(id: &NodeId, socket: usize) -> GraphError {
    GraphError::DanglingReference {
        node: id.clone(),
        socket,
        side: "input",
    }
}
