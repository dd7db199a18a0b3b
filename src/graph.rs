// Dependency graph
//
//  Copyright (C) 2014-2023 Ryan Specialty Group, LLC.
//
//  This file is part of swfld.
//
//  This program is free software: you can redistribute it and/or modify
//  it under the terms of the GNU General Public License as published by
//  the Free Software Foundation, either version 3 of the License, or
//  (at your option) any later version.
//
//  This program is distributed in the hope that it will be useful,
//  but WITHOUT ANY WARRANTY; without even the implied warranty of
//  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
//  GNU General Public License for more details.
//
//  You should have received a copy of the GNU General Public License
//  along with this program.  If not, see <http://www.gnu.org/licenses/>.

//! Generic directed dependency graph over named vertices.
//!
//! This implementation is currently based on [`petgraph`].
//!
//! Edges are typed by [`DependencyKind`]:
//!   [`Prerequisite`](DependencyKind::Prerequisite) edges are hard
//!   ordering constraints
//!     (the target must be positioned at or before the source),
//!   while [`Dependency`](DependencyKind::Dependency) edges are soft
//!     (ordering is preferred but they may participate in cycles).
//! The prerequisite relation must be acyclic;
//!   [`check_cycles`](DependencyGraph::check_cycles) enforces this and is
//!   invoked by [`topological_order`](DependencyGraph::topological_order)
//!   before any ordering is attempted,
//!     since an ordering of a cyclic graph would be meaningless.
//!
//! Determinism
//! ===========
//! Two runs over identical insertion sequences must produce identical
//!   orderings,
//!     since the output of the linker must be reproducible.
//! Vertices are therefore iterated in insertion order,
//!   and the topological sort breaks ties between mutually-unordered
//!   vertices by that same order.
//! Note that [`petgraph`] yields a vertex's edges in _reverse_ insertion
//!   order;
//!     every traversal here restores insertion order before use.

use fixedbitset::FixedBitSet;
use fxhash::FxHashMap;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::VecDeque;
use std::fmt::{self, Display};
use std::result::Result;

pub type GraphResult<T> = Result<T, GraphError>;

/// Classification of a dependency edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependencyKind {
    /// Hard ordering constraint derived from inheritance.
    ///
    /// The target must be emitted in the same position set or earlier;
    ///   violating this breaks runtime class resolution.
    Prerequisite,

    /// Soft reference
    ///   (expression, namespace, or type use).
    ///
    /// Ordering before the source is preferred but not required.
    Dependency,
}

/// Reference to a vertex of a [`DependencyGraph`].
///
/// A `VertexRef` should only be produced by the graph it refers to.
/// Since vertices are never deleted,
///   references remain valid for the lifetime of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexRef(NodeIndex);

impl VertexRef {
    fn new(index: NodeIndex) -> Self {
        Self(index)
    }
}

impl From<VertexRef> for NodeIndex {
    fn from(vref: VertexRef) -> Self {
        vref.0
    }
}

/// Vertex payload along with its identifying name.
#[derive(Debug)]
struct Vertex<T> {
    name: String,
    payload: T,
}

/// Directed graph of named vertices with typed dependency edges.
///
/// Names are indexed for `O(1)` lookup.
/// For the determinism guarantees,
///   see the [module-level documentation](self).
#[derive(Debug)]
pub struct DependencyGraph<T> {
    graph: DiGraph<Vertex<T>, DependencyKind>,
    index: FxHashMap<String, NodeIndex>,
}

impl<T> DependencyGraph<T> {
    /// Create a new, empty graph.
    ///
    /// See also [`with_capacity`](DependencyGraph::with_capacity).
    pub fn new() -> Self {
        Self::with_capacity(0, 0)
    }

    /// Create a graph with the provided initial capacity.
    pub fn with_capacity(vertices: usize, edges: usize) -> Self {
        Self {
            graph: DiGraph::with_capacity(vertices, edges),
            index: FxHashMap::default(),
        }
    }

    /// Add a vertex keyed by `name`.
    ///
    /// Names are identities:
    ///   attempting to add a second vertex under the same name fails with
    ///   [`GraphError::DuplicateVertex`] rather than replacing the
    ///   existing payload.
    pub fn add_vertex(
        &mut self,
        name: impl Into<String>,
        payload: T,
    ) -> GraphResult<VertexRef> {
        let name = name.into();

        if self.index.contains_key(&name) {
            return Err(GraphError::DuplicateVertex(name));
        }

        let index = self.graph.add_node(Vertex {
            name: name.clone(),
            payload,
        });
        self.index.insert(name, index);

        Ok(VertexRef::new(index))
    }

    /// Attempt to retrieve a vertex by name.
    pub fn lookup(&self, name: &str) -> Option<VertexRef> {
        self.index.get(name).map(|&index| VertexRef::new(index))
    }

    pub fn contains_vertex(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Retrieve a vertex's payload.
    pub fn get(&self, vref: VertexRef) -> Option<&T> {
        self.graph.node_weight(vref.into()).map(|v| &v.payload)
    }

    /// Retrieve a vertex's identifying name.
    pub fn name(&self, vref: VertexRef) -> Option<&str> {
        self.graph.node_weight(vref.into()).map(|v| v.name.as_str())
    }

    /// Declare that `dep` must be considered when ordering `vref`.
    ///
    /// The edge is added only if no edge of the same kind already exists
    ///   between the pair,
    ///     so repeated references do not skew traversal.
    pub fn add_dependency(
        &mut self,
        vref: VertexRef,
        dep: VertexRef,
        kind: DependencyKind,
    ) {
        let (from, to) = (vref.into(), dep.into());

        let exists = self
            .graph
            .edges_connecting(from, to)
            .any(|edge| *edge.weight() == kind);

        if !exists {
            self.graph.add_edge(from, to, kind);
        }
    }

    /// Check whether any dependency edge exists from `vref` to `dep`.
    pub fn has_dependency(&self, vref: VertexRef, dep: VertexRef) -> bool {
        self.graph.contains_edge(vref.into(), dep.into())
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Iterate all vertices in insertion order.
    pub fn vertices(&self) -> impl Iterator<Item = VertexRef> + '_ {
        self.graph.node_indices().map(VertexRef::new)
    }

    /// Edge targets of `vref` of the given kind,
    ///   in edge insertion order.
    pub fn dependencies_of(
        &self,
        vref: VertexRef,
        kind: DependencyKind,
    ) -> Vec<VertexRef> {
        let mut targets: Vec<_> = self
            .graph
            .edges_directed(vref.into(), Direction::Outgoing)
            .filter(|edge| *edge.weight() == kind)
            .map(|edge| VertexRef::new(edge.target()))
            .collect();

        // petgraph yields reverse insertion order.
        targets.reverse();
        targets
    }

    /// Verify that the prerequisite relation is acyclic.
    ///
    /// This must happen before any ordering is derived from the graph:
    ///   a prerequisite cycle means that no valid load order exists,
    ///     which must fail loudly rather than being silently broken by a
    ///     traversal's visited set.
    /// Cycles among [`Dependency`](DependencyKind::Dependency) edges are
    ///   permitted.
    ///
    /// Detection is a depth-first traversal tracking an in-progress set;
    ///   revisiting an in-progress vertex names that vertex in the
    ///   resulting [`GraphError::Cycle`].
    pub fn check_cycles(&self) -> GraphResult<()> {
        enum Walk {
            Enter(NodeIndex),
            Exit(NodeIndex),
        }

        let count = self.graph.node_count();
        let mut discovered = FixedBitSet::with_capacity(count);
        let mut finished = FixedBitSet::with_capacity(count);
        let mut stack = Vec::new();

        for start in self.graph.node_indices() {
            if discovered.contains(start.index()) {
                continue;
            }

            stack.push(Walk::Enter(start));

            while let Some(walk) = stack.pop() {
                match walk {
                    Walk::Enter(node) => {
                        if finished.contains(node.index()) {
                            continue;
                        }

                        if discovered.contains(node.index()) {
                            // In progress; we have looped back onto our
                            // own path.
                            let name = self
                                .graph
                                .node_weight(node)
                                .expect("internal error: missing vertex")
                                .name
                                .clone();

                            return Err(GraphError::Cycle(name));
                        }

                        discovered.insert(node.index());
                        stack.push(Walk::Exit(node));

                        let prereqs =
                            self.dependencies_of(
                                VertexRef::new(node),
                                DependencyKind::Prerequisite,
                            );

                        // Reversed so that pops observe insertion order.
                        for dep in prereqs.into_iter().rev() {
                            if !finished.contains(NodeIndex::from(dep).index())
                            {
                                stack.push(Walk::Enter(dep.into()));
                            }
                        }
                    }

                    Walk::Exit(node) => {
                        finished.insert(node.index());
                    }
                }
            }
        }

        Ok(())
    }

    /// Produce a total ordering of all vertices in which every
    ///   prerequisite precedes its dependents.
    ///
    /// Ties between mutually-unordered vertices are broken by vertex
    ///   insertion order,
    ///     guaranteeing reproducible output for identical inputs.
    /// Fails with [`GraphError::Cycle`] if the prerequisite relation is
    ///   cyclic
    ///     (see [`check_cycles`](DependencyGraph::check_cycles)).
    pub fn topological_order(&self) -> GraphResult<Vec<VertexRef>> {
        self.check_cycles()?;

        let count = self.graph.node_count();
        let mut order = Vec::with_capacity(count);
        let mut ready = VecDeque::new();

        // Remaining unemitted prerequisites per vertex.
        let mut remaining: Vec<usize> = self
            .graph
            .node_indices()
            .map(|node| {
                self.graph
                    .edges_directed(node, Direction::Outgoing)
                    .filter(|edge| {
                        *edge.weight() == DependencyKind::Prerequisite
                    })
                    .count()
            })
            .collect();

        for node in self.graph.node_indices() {
            if remaining[node.index()] == 0 {
                ready.push_back(node);
            }
        }

        while let Some(node) = ready.pop_front() {
            order.push(VertexRef::new(node));

            let mut dependents: Vec<_> = self
                .graph
                .edges_directed(node, Direction::Incoming)
                .filter(|edge| *edge.weight() == DependencyKind::Prerequisite)
                .map(|edge| edge.source())
                .collect();
            dependents.reverse();

            for dependent in dependents {
                remaining[dependent.index()] -= 1;

                if remaining[dependent.index()] == 0 {
                    ready.push_back(dependent);
                }
            }
        }

        debug_assert!(order.len() == count);

        Ok(order)
    }
}

/// Error during graph construction or ordering.
#[derive(Debug, PartialEq, Eq)]
pub enum GraphError {
    /// A vertex was added under a name that is already present.
    DuplicateVertex(String),

    /// The prerequisite relation contains a cycle;
    ///   the named vertex participates in it.
    Cycle(String),
}

impl Display for GraphError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::DuplicateVertex(name) => {
                write!(fmt, "vertex `{}` is already present", name)
            }
            Self::Cycle(name) => {
                write!(fmt, "circular prerequisite involving `{}`", name)
            }
        }
    }
}

impl std::error::Error for GraphError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}
