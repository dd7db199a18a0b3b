// Linkable units and symbol graph extraction
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

//! Lowering of [`CompilationUnit`]s into a [`DependencyGraph`].
//!
//! [`extract`] is exclusively responsible for this lowering operation.
//! Each unit becomes one [`Linkable`] vertex keyed by its source path,
//!   with its raw name-sets normalized into two edge categories:
//!
//!   - names in the unit's `inheritance` set become
//!       [`Prerequisite`](DependencyKind::Prerequisite) edges to the
//!       defining unit; and
//!   - every other reference
//!       (expression, namespace, type, auxiliary class, resource bundle)
//!     becomes a [`Dependency`](DependencyKind::Dependency) edge.
//!
//! Names resolve through a global name→definer map built in a first pass
//!   over all units.
//! Two units defining the same name is a configuration error
//!   ([`LinkError::MultipleDefinitions`], naming both locations),
//!   as is providing the same unit twice
//!   ([`LinkError::DuplicateUnit`]).
//! References to names with no definer produce no edge at all;
//!   whether such a name is an error is decided during the
//!   [walk](super::walker),
//!     not here.
//!
//! Extraction never mutates a unit.

use super::error::{LinkError, LinkResult};
use crate::graph::{DependencyGraph, DependencyKind, VertexRef};
use crate::unit::{CompilationUnit, NameSet};
use fxhash::{FxHashMap, FxHashSet};

/// A [`CompilationUnit`] normalized for graph purposes.
///
/// The name-sets here are derived once at construction:
///   `defs` is the set of names other units may legally depend upon to
///   reach this one,
///     and `prereqs`/`deps` are the hard and soft edges out.
#[derive(Debug)]
pub struct Linkable<'a> {
    unit: &'a CompilationUnit,
    defs: NameSet,
    prereqs: NameSet,
    deps: NameSet,
}

impl<'a> Linkable<'a> {
    pub fn new(unit: &'a CompilationUnit) -> Self {
        let defs = unit.top_level_definitions.clone();
        let prereqs = unit.inheritance.clone();

        let mut deps = NameSet::new();
        for set in [
            &unit.expressions,
            &unit.namespaces,
            &unit.types,
            &unit.extra_classes,
            &unit.resource_bundles,
        ] {
            for name in set {
                deps.add(name.clone());
            }
        }

        Self {
            unit,
            defs,
            prereqs,
            deps,
        }
    }

    /// Source path identifying the wrapped unit.
    pub fn name(&self) -> &str {
        self.unit.name()
    }

    pub fn unit(&self) -> &'a CompilationUnit {
        self.unit
    }

    pub fn last_modified(&self) -> u64 {
        self.unit.source.last_modified
    }

    /// Size of the unit's bytecode in bytes.
    pub fn size(&self) -> usize {
        self.unit.bytecode.len()
    }

    pub fn has_definition(&self, name: &str) -> bool {
        self.defs.contains(name)
    }

    pub fn definitions(&self) -> &NameSet {
        &self.defs
    }

    pub fn prerequisites(&self) -> &NameSet {
        &self.prereqs
    }

    pub fn dependencies(&self) -> &NameSet {
        &self.deps
    }

    pub fn depends_on(&self, name: &str) -> bool {
        self.deps.contains(name) || self.prereqs.contains(name)
    }

    pub fn is_internal(&self) -> bool {
        self.unit.is_internal()
    }

    pub fn is_root(&self) -> bool {
        self.unit.is_root()
    }
}

/// A [`DependencyGraph`] of [`Linkable`]s along with the global
///   name→definer index used to build it.
#[derive(Debug)]
pub struct SymbolGraph<'a> {
    graph: DependencyGraph<Linkable<'a>>,
    defs: FxHashMap<String, VertexRef>,
}

impl<'a> SymbolGraph<'a> {
    pub fn graph(&self) -> &DependencyGraph<Linkable<'a>> {
        &self.graph
    }

    /// Vertex of the unit defining `name`,
    ///   if any.
    pub fn definer(&self, name: &str) -> Option<VertexRef> {
        self.defs.get(name).copied()
    }

    /// Payload of the vertex defining `name`.
    pub fn definer_linkable(&self, name: &str) -> Option<&Linkable<'a>> {
        self.definer(name).and_then(|vref| self.graph.get(vref))
    }

    pub fn linkable(&self, vref: VertexRef) -> Option<&Linkable<'a>> {
        self.graph.get(vref)
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }
}

/// Lower `units` into a [`SymbolGraph`].
///
/// See the [module-level documentation](self) for the edge categories and
///   failure modes.
pub fn extract(units: &[CompilationUnit]) -> LinkResult<SymbolGraph> {
    let linkables: Vec<Linkable> = units.iter().map(Linkable::new).collect();

    // First pass: global name → definer index.
    let mut seen_units = FxHashSet::default();
    let mut defs: FxHashMap<String, usize> = FxHashMap::default();

    for (i, linkable) in linkables.iter().enumerate() {
        if !seen_units.insert(linkable.name()) {
            return Err(LinkError::DuplicateUnit {
                name: linkable.name().into(),
            });
        }

        for def in linkable.definitions() {
            if let Some(&prev) = defs.get(def) {
                return Err(LinkError::MultipleDefinitions {
                    symbol: def.clone(),
                    location1: linkables[prev].name().into(),
                    location2: linkable.name().into(),
                });
            }

            defs.insert(def.clone(), i);
        }
    }

    drop(seen_units);

    // Second pass: resolve references into typed edges.  Self-references
    // never become edges.
    let mut edges: Vec<(usize, usize, DependencyKind)> = Vec::new();

    for (i, linkable) in linkables.iter().enumerate() {
        for name in linkable.prerequisites() {
            if let Some(&to) = defs.get(name) {
                if to != i {
                    edges.push((i, to, DependencyKind::Prerequisite));
                }
            }
        }

        for name in linkable.dependencies() {
            if let Some(&to) = defs.get(name) {
                if to != i {
                    edges.push((i, to, DependencyKind::Dependency));
                }
            }
        }
    }

    let mut graph =
        DependencyGraph::with_capacity(linkables.len(), edges.len());
    let mut vrefs = Vec::with_capacity(linkables.len());

    for linkable in linkables {
        let name = linkable.name().to_owned();
        vrefs.push(graph.add_vertex(name, linkable)?);
    }

    for (from, to, kind) in edges {
        match kind {
            DependencyKind::Prerequisite => {
                graph.add_dependency(vrefs[from], vrefs[to], kind)
            }
            // A prerequisite between the same pair subsumes the soft edge.
            DependencyKind::Dependency => {
                if !graph.has_dependency(vrefs[from], vrefs[to]) {
                    graph.add_dependency(vrefs[from], vrefs[to], kind);
                }
            }
        }
    }

    let defs = defs
        .into_iter()
        .map(|(name, i)| (name, vrefs[i]))
        .collect();

    Ok(SymbolGraph { graph, defs })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::unit::Source;

    fn unit(
        name: &str,
        defs: &[&str],
        inherit: &[&str],
        refs: &[&str],
    ) -> CompilationUnit {
        let mut unit = CompilationUnit::new(Source::new(name));

        unit.top_level_definitions = defs.iter().copied().collect();
        unit.inheritance = inherit.iter().copied().collect();
        unit.expressions = refs.iter().copied().collect();

        unit
    }

    #[test]
    fn linkable_categorizes_name_sets() {
        let mut u = unit("App.as", &["App"], &["Base"], &["util.Str"]);
        u.namespaces = ["ns.public"].into();
        u.types = ["util.Type"].into();
        u.extra_classes = ["App_extra"].into();
        u.resource_bundles = ["core"].into();
        u.source.last_modified = 42;
        u.bytecode = vec![0; 7];

        let sut = Linkable::new(&u);

        assert_eq!("App.as", sut.name());
        assert_eq!(42, sut.last_modified());
        assert_eq!(7, sut.size());

        assert!(sut.has_definition("App"));
        assert!(!sut.has_definition("Base"));

        assert_eq!(
            vec!["Base"],
            sut.prerequisites().iter().map(String::as_str).collect::<Vec<_>>(),
        );

        // Soft dependencies accumulate in a fixed set order.
        assert_eq!(
            vec!["util.Str", "ns.public", "util.Type", "App_extra", "core"],
            sut.dependencies().iter().map(String::as_str).collect::<Vec<_>>(),
        );

        assert!(sut.depends_on("Base"));
        assert!(sut.depends_on("core"));
        assert!(!sut.depends_on("App"));
    }

    #[test]
    fn extract_builds_typed_edges() -> LinkResult<()> {
        let units = vec![
            unit("App.as", &["App"], &["Base"], &["util.Str"]),
            unit("Base.as", &["Base"], &[], &[]),
            unit("Str.as", &["util.Str"], &[], &[]),
        ];

        let sut = extract(&units)?;
        assert_eq!(3, sut.len());

        let app = sut.definer("App").unwrap();
        let base = sut.definer("Base").unwrap();
        let str_ = sut.definer("util.Str").unwrap();

        assert_eq!(
            vec![base],
            sut.graph().dependencies_of(app, DependencyKind::Prerequisite),
        );
        assert_eq!(
            vec![str_],
            sut.graph().dependencies_of(app, DependencyKind::Dependency),
        );

        assert_eq!("Base.as", sut.definer_linkable("Base").unwrap().name());

        Ok(())
    }

    #[test]
    fn extract_rejects_multiple_definitions() {
        let units = vec![
            unit("first.as", &["dup.Sym"], &[], &[]),
            unit("second.as", &["dup.Sym"], &[], &[]),
        ];

        assert_eq!(
            Err(LinkError::MultipleDefinitions {
                symbol: "dup.Sym".into(),
                location1: "first.as".into(),
                location2: "second.as".into(),
            }),
            extract(&units).map(|_| ()),
        );
    }

    #[test]
    fn extract_rejects_duplicate_units() {
        let units = vec![
            unit("same.as", &["A"], &[], &[]),
            unit("same.as", &["B"], &[], &[]),
        ];

        assert_eq!(
            Err(LinkError::DuplicateUnit {
                name: "same.as".into()
            }),
            extract(&units).map(|_| ()),
        );
    }

    #[test]
    fn extract_skips_unknown_and_self_references() -> LinkResult<()> {
        let units = vec![unit(
            "App.as",
            &["App"],
            &["missing.Base"],
            &["App", "missing.Ref"],
        )];

        let sut = extract(&units)?;
        let app = sut.definer("App").unwrap();

        assert!(sut
            .graph()
            .dependencies_of(app, DependencyKind::Prerequisite)
            .is_empty());
        assert!(sut
            .graph()
            .dependencies_of(app, DependencyKind::Dependency)
            .is_empty());

        assert_eq!(None, sut.definer("missing.Base"));

        Ok(())
    }

    #[test]
    fn prerequisite_subsumes_soft_dependency() -> LinkResult<()> {
        // App both inherits from and references Base.
        let units = vec![
            unit("App.as", &["App"], &["Base"], &["Base"]),
            unit("Base.as", &["Base"], &[], &[]),
        ];

        let sut = extract(&units)?;
        let app = sut.definer("App").unwrap();
        let base = sut.definer("Base").unwrap();

        assert_eq!(
            vec![base],
            sut.graph().dependencies_of(app, DependencyKind::Prerequisite),
        );
        assert!(sut
            .graph()
            .dependencies_of(app, DependencyKind::Dependency)
            .is_empty());

        Ok(())
    }
}
