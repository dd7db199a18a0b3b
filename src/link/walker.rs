// Frame-assignment dependency walker
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

//! Frame-by-frame partitioning of the live symbol graph.
//!
//! [`traverse`] is invoked once per output frame,
//!   in frame order,
//!   against a single [`LinkState`] that persists across the whole link:
//!     a unit visited on an earlier frame is never revisited,
//!       so each frame receives exactly the units first reachable from its
//!       root class list.
//!
//! The walk is depth-first so that inheritance chains stay close together
//!   in the output,
//!     and a unit's _prerequisites_ are always walked before the unit
//!     itself:
//!       the player resolves inheritance at class-definition time and
//!       faults on a forward base-class reference,
//!         so a superclass's bytecode must precede its subclass's.
//! Soft _dependencies_ are walked next
//!   (order-preferred, not order-required),
//!   and only then is the unit yielded to the visitor.
//!
//! Extern handling
//! ===============
//! A name found in the extern set resolves without emission---the
//!   loading environment guarantees its presence---but only when the
//!   caller permits it,
//!     which by policy is the final frame only:
//!       an externally-supplied symbol can only be promised present at the
//!       end of the load sequence.
//! Extern-resolved and definer-less names both accumulate in the
//!   unresolved set;
//!     [`LinkState::undefined`] computes which of those are real failures
//!     once every frame has been walked.
//! Names in the include set are forced into the final frame whether or not
//!   anything references them,
//!     and externs never apply to them.
//!
//! Prerequisite cycles must be rejected
//!   (see [`check_cycles`](crate::graph::DependencyGraph::check_cycles))
//!   _before_ walking;
//!     the walk's own in-progress set then only ever cuts soft dependency
//!     cycles,
//!       which are permitted.

use super::error::LinkResult;
use super::linkable::{Linkable, SymbolGraph};
use crate::graph::VertexRef;
use fixedbitset::FixedBitSet;
use fxhash::FxHashSet;
use petgraph::graph::NodeIndex;

fn bit(vref: VertexRef) -> usize {
    NodeIndex::from(vref).index()
}

/// Working set of one link invocation.
///
/// Holds the extern/include/unresolved name sets and the visitation state
///   shared by every frame of the link.
/// A `LinkState` must not be shared across concurrent links;
///   it is scoped to one `generate` call and destroyed with it.
#[derive(Debug)]
pub struct LinkState<'a, 'g> {
    sg: &'g SymbolGraph<'a>,

    /// Names guaranteed to exist in the loading environment.
    externs: FxHashSet<String>,

    /// Names forced into the output even if unreferenced.
    includes: Vec<String>,

    /// Names referenced but not emitted here,
    ///   pending post-walk validation.
    unresolved: FxHashSet<String>,

    /// Units already emitted on this or an earlier frame.
    visited: FixedBitSet,

    /// Units currently on the recursion path.
    progress: FixedBitSet,
}

impl<'a, 'g> LinkState<'a, 'g> {
    pub fn new(
        sg: &'g SymbolGraph<'a>,
        externs: FxHashSet<String>,
        includes: Vec<String>,
        unresolved: FxHashSet<String>,
    ) -> Self {
        Self {
            sg,
            externs,
            includes,
            unresolved,
            visited: FixedBitSet::with_capacity(sg.len()),
            progress: FixedBitSet::with_capacity(sg.len()),
        }
    }

    pub fn externs(&self) -> &FxHashSet<String> {
        &self.externs
    }

    /// Declare `name` as guaranteed present in the loading environment.
    pub fn add_extern(&mut self, name: impl Into<String>) {
        self.externs.insert(name.into());
    }

    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    pub fn unresolved(&self) -> &FxHashSet<String> {
        &self.unresolved
    }

    pub fn is_visited(&self, vref: VertexRef) -> bool {
        self.visited.contains(bit(vref))
    }

    /// Unresolved names excused by an extern declaration,
    ///   sorted.
    ///
    /// These are the names the output expects its loading environment to
    ///   supply.
    pub fn external_defs(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .unresolved
            .iter()
            .filter(|name| self.externs.contains(*name))
            .cloned()
            .collect();

        names.sort();
        names
    }

    /// Unresolved names with no excuse,
    ///   sorted.
    ///
    /// A non-empty result after the final frame means the link must fail.
    pub fn undefined(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .unresolved
            .iter()
            .filter(|name| !self.externs.contains(*name))
            .cloned()
            .collect();

        names.sort();
        names
    }
}

/// Walk one frame's worth of the graph.
///
/// Every unit first reachable from `roots` is yielded to `visitor` in
///   emission order,
///     prerequisites always preceding their dependents.
/// `allow_externs` permits names to resolve via the extern set;
///   `is_last_frame` additionally walks the include set.
/// By policy both are true only for the final frame.
///
/// See the [module-level documentation](self) for the full contract.
pub fn traverse<'a, F>(
    roots: &[String],
    state: &mut LinkState<'a, '_>,
    allow_externs: bool,
    is_last_frame: bool,
    visitor: &mut F,
) -> LinkResult<()>
where
    F: FnMut(VertexRef, &Linkable<'a>),
{
    for name in roots {
        visit_name(name, state, allow_externs, visitor)?;
    }

    if is_last_frame {
        let includes = state.includes.to_vec();

        for name in &includes {
            visit_name(name, state, false, visitor)?;
        }
    }

    Ok(())
}

fn visit_name<'a, F>(
    name: &str,
    state: &mut LinkState<'a, '_>,
    allow_externs: bool,
    visitor: &mut F,
) -> LinkResult<()>
where
    F: FnMut(VertexRef, &Linkable<'a>),
{
    let sg = state.sg;

    if let Some(vref) = sg.definer(name) {
        if state.is_visited(vref) {
            return Ok(());
        }
    }

    if allow_externs && state.externs.contains(name) {
        // Resolved externally; catalogued for validation and reporting.
        state.unresolved.insert(name.to_owned());
        return Ok(());
    }

    let vref = match sg.definer(name) {
        Some(vref) => vref,
        None => {
            // Not fatal yet: the name may be excused by an extern, and
            // collecting the rest first lets one run report every broken
            // reference.
            state.unresolved.insert(name.to_owned());
            return Ok(());
        }
    };

    if state.progress.contains(bit(vref)) {
        // Back-edge on the recursion path.  Prerequisite cycles were
        // rejected before the walk, so this can only cut a soft
        // dependency cycle.
        return Ok(());
    }

    state.progress.insert(bit(vref));

    let linkable = sg
        .linkable(vref)
        .expect("internal error: definer index out of sync with graph");

    for prereq in linkable.prerequisites() {
        visit_name(prereq, state, allow_externs, visitor)?;
    }

    for dep in linkable.dependencies() {
        visit_name(dep, state, allow_externs, visitor)?;
    }

    visitor(vref, linkable);
    state.visited.insert(bit(vref));

    Ok(())
}
