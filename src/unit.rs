// Compilation unit input model
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

//! Compiled unit data consumed by the linker.
//!
//! A [`CompilationUnit`] is the sole input to the linker:
//!   one fully-analyzed translation unit carrying its generated bytecode
//!   and the symbol sets derived during semantic analysis.
//! Units are produced by an external front end and are _read-only_ to this
//!   crate;
//!     nothing here ever mutates one.
//!
//! Name identity is a fully-qualified name string.
//! [`NameSet`] preserves the front end's discovery order while rejecting
//!   duplicates,
//!     which is what makes link output reproducible across runs
//!     (see [`crate::graph`] for the ordering guarantees built atop it).

use crate::movie::frame::{DefineFont, DefineTag};
use fxhash::FxHashSet;
use std::slice::Iter;

/// Ordered set of fully-qualified names.
///
/// Insertion order is preserved and duplicates are ignored.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NameSet {
    names: Vec<String>,
    present: FxHashSet<String>,
}

impl NameSet {
    pub fn new() -> Self {
        Default::default()
    }

    /// Add a name,
    ///   returning whether it was newly added.
    pub fn add(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();

        if self.present.contains(&name) {
            return false;
        }

        self.present.insert(name.clone());
        self.names.push(name);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.present.contains(name)
    }

    /// Iterate names in insertion order.
    pub fn iter(&self) -> Iter<String> {
        self.names.iter()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<'a> IntoIterator for &'a NameSet {
    type Item = &'a String;
    type IntoIter = Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.names.iter()
    }
}

impl<S: Into<String>> FromIterator<S> for NameSet {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        let mut set = Self::new();

        for name in iter {
            set.add(name);
        }

        set
    }
}

impl<S: Into<String>, const N: usize> From<[S; N]> for NameSet {
    fn from(names: [S; N]) -> Self {
        names.into_iter().collect()
    }
}

/// Identity of a unit's origin.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Source {
    /// Path of the originating file.
    ///
    /// This is the unit's identity;
    ///   two units must never share one.
    pub name: String,

    /// Modification timestamp of the originating file.
    pub last_modified: u64,

    /// Whether this unit was supplied by the loading environment.
    ///
    /// Internal units participate in dependency resolution but their
    ///   bytecode is never emitted into the output.
    pub internal: bool,

    /// Whether this unit defines the program root.
    pub root: bool,
}

impl Source {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// A symbol-class asset exported alongside a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Class name the definition is bound to.
    pub name: String,

    /// Definition tag referenced by the binding.
    pub tag: DefineTag,
}

/// One fully-compiled translation unit.
///
/// The four name-sets drive graph construction:
///   [`inheritance`](CompilationUnit::inheritance) produces hard
///   _prerequisite_ edges
///     (a superclass must be fully defined before its subclass),
///   while [`expressions`](CompilationUnit::expressions),
///     [`namespaces`](CompilationUnit::namespaces),
///     and [`types`](CompilationUnit::types) produce soft _dependency_
///     edges.
/// [`extra_classes`](CompilationUnit::extra_classes) and
///   [`resource_bundles`](CompilationUnit::resource_bundles) are auxiliary
///   names exported alongside the primary definitions and are treated as
///   dependencies.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CompilationUnit {
    pub source: Source,

    /// Generated bytecode for this unit.
    pub bytecode: Vec<u8>,

    /// Names this unit defines at the top level.
    pub top_level_definitions: NameSet,

    /// Superclasses and interfaces;
    ///   hard ordering prerequisites.
    pub inheritance: NameSet,

    /// Names referenced from expression position.
    pub expressions: NameSet,

    /// Namespaces referenced by this unit.
    pub namespaces: NameSet,

    /// Types referenced by this unit.
    pub types: NameSet,

    /// Generated companion classes exported with this unit.
    pub extra_classes: NameSet,

    /// Resource bundle classes this unit pulls in.
    pub resource_bundles: NameSet,

    /// Class responsible for loading this unit's frame,
    ///   if any.
    ///
    /// Loader classes get their own frame _preceding_ the frame of the
    ///   class they load.
    pub loader_class: Option<String>,

    /// Symbol-class bindings exported when this unit is emitted.
    pub assets: Vec<Asset>,

    /// Font tags carried alongside this unit.
    ///
    /// Font embedding happens upstream;
    ///   these are opaque here.
    pub fonts: Vec<DefineFont>,

    /// Metadata names that must be preserved by a post-link optimizer if
    ///   this unit is linked into the output.
    pub metadata: Vec<String>,
}

impl CompilationUnit {
    pub fn new(source: Source) -> Self {
        Self {
            source,
            ..Default::default()
        }
    }

    pub fn is_root(&self) -> bool {
        self.source.root
    }

    pub fn is_internal(&self) -> bool {
        self.source.internal
    }

    /// Name of the originating file.
    pub fn name(&self) -> &str {
        &self.source.name
    }
}
