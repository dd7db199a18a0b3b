// Movie frames and tags
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

//! One frame of a movie and the tags it carries.
//!
//! A frame is one sequential unit of the output artifact's load/execute
//!   order:
//!     the player materializes each frame's definitions and runs its
//!     bytecode before moving on to the next.
//! Frames are append-only while the movie is being assembled and are not
//!   modified once [`generate`](crate::movie::Movie::generate) returns.
//!
//! Tag payloads are opaque here;
//!   producing them
//!     (code generation, font embedding)
//!   and encoding them into the container format both happen outside this
//!   crate.

use fxhash::FxHashMap;

/// Execute the bytecode lazily,
///   on first reference rather than at load.
pub const DO_ABC_LAZY_INITIALIZE: u32 = 1;

/// One emitted bytecode blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoAbc {
    /// Name of the unit the blob was generated from.
    pub name: String,

    /// Bit flags
    ///   (see [`DO_ABC_LAZY_INITIALIZE`]).
    pub flags: u32,

    /// The bytecode itself.
    pub abc: Vec<u8>,
}

impl DoAbc {
    pub fn new(name: impl Into<String>, flags: u32, abc: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            flags,
            abc,
        }
    }

    pub fn is_lazy(&self) -> bool {
        self.flags & DO_ABC_LAZY_INITIALIZE != 0
    }
}

/// A definition tag exported by a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefineTag {
    /// Character id within the movie.
    pub id: u16,

    /// Export name of the definition.
    pub name: String,
}

impl DefineTag {
    pub fn new(id: u16, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// An embedded font carried alongside a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefineFont {
    pub name: String,
    pub data: Vec<u8>,
}

/// An opaque control tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlTag {
    pub code: u16,
    pub data: Vec<u8>,
}

/// Label naming a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameLabel {
    pub label: String,
}

/// Table binding class names to their definition tags.
///
/// Bindings are insertion-ordered;
///   rebinding a name replaces the tag in place.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SymbolClass {
    entries: Vec<(String, DefineTag)>,
    index: FxHashMap<String, usize>,
}

impl SymbolClass {
    pub fn new() -> Self {
        Default::default()
    }

    /// Bind `class_name` to `tag`,
    ///   replacing any existing binding for the name.
    pub fn add(&mut self, class_name: impl Into<String>, tag: DefineTag) {
        let class_name = class_name.into();

        match self.index.get(&class_name) {
            Some(&pos) => self.entries[pos].1 = tag,
            None => {
                self.index.insert(class_name.clone(), self.entries.len());
                self.entries.push((class_name, tag));
            }
        }
    }

    /// Copy every binding of `other` into this table.
    pub fn merge(&mut self, other: &SymbolClass) {
        for (name, tag) in other.iter() {
            self.add(name.clone(), tag.clone());
        }
    }

    pub fn get(&self, class_name: &str) -> Option<&DefineTag> {
        self.index
            .get(class_name)
            .map(|&pos| &self.entries[pos].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, DefineTag)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One frame of the output artifact.
///
/// All collections are ordered by time of addition,
///   which during assembly is unit-visitation order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Position within the movie,
    ///   1-based.
    pub pos: usize,

    pub label: Option<FrameLabel>,

    control_tags: Vec<ControlTag>,
    export_defs: Vec<DefineTag>,
    symbol_class: SymbolClass,
    fonts: Vec<DefineFont>,
    do_abcs: Vec<DoAbc>,
}

impl Frame {
    pub fn new(pos: usize) -> Self {
        Self {
            pos,
            ..Default::default()
        }
    }

    pub fn add_control_tag(&mut self, tag: ControlTag) {
        self.control_tags.push(tag);
    }

    pub fn control_tags(&self) -> &[ControlTag] {
        &self.control_tags
    }

    /// Export a definition.
    ///
    /// Re-exporting a name moves its definition to the end of the export
    ///   list rather than duplicating it.
    pub fn add_export(&mut self, def: DefineTag) {
        if let Some(pos) =
            self.export_defs.iter().position(|d| d.name == def.name)
        {
            self.export_defs.remove(pos);
        }

        self.export_defs.push(def);
    }

    pub fn remove_export(&mut self, name: &str) {
        self.export_defs.retain(|d| d.name != name);
    }

    pub fn has_exports(&self) -> bool {
        !self.export_defs.is_empty()
    }

    pub fn exports(&self) -> &[DefineTag] {
        &self.export_defs
    }

    pub fn add_symbol_class(
        &mut self,
        class_name: impl Into<String>,
        tag: DefineTag,
    ) {
        self.symbol_class.add(class_name, tag);
    }

    pub fn merge_symbol_class(&mut self, other: &SymbolClass) {
        self.symbol_class.merge(other);
    }

    pub fn has_symbol_classes(&self) -> bool {
        !self.symbol_class.is_empty()
    }

    pub fn symbol_class(&self) -> &SymbolClass {
        &self.symbol_class
    }

    pub fn add_font(&mut self, font: DefineFont) {
        self.fonts.push(font);
    }

    pub fn has_fonts(&self) -> bool {
        !self.fonts.is_empty()
    }

    pub fn fonts(&self) -> &[DefineFont] {
        &self.fonts
    }

    pub fn add_do_abc(&mut self, abc: DoAbc) {
        self.do_abcs.push(abc);
    }

    pub fn do_abcs(&self) -> &[DoAbc] {
        &self.do_abcs
    }
}

#[cfg(test)]
mod test {
    use super::*;

    type Sut = Frame;

    #[test]
    fn new_frame_is_empty() {
        let sut = Sut::new(1);

        assert_eq!(1, sut.pos);
        assert_eq!(None, sut.label);
        assert!(!sut.has_exports());
        assert!(!sut.has_symbol_classes());
        assert!(!sut.has_fonts());
        assert!(sut.do_abcs().is_empty());
        assert!(sut.control_tags().is_empty());
    }

    #[test]
    fn control_tags_append_in_order() {
        let mut sut = Sut::new(1);

        sut.add_control_tag(ControlTag {
            code: 9,
            data: vec![0xff, 0x00, 0x00],
        });
        sut.add_control_tag(ControlTag {
            code: 43,
            data: vec![],
        });

        let codes: Vec<_> =
            sut.control_tags().iter().map(|t| t.code).collect();
        assert_eq!(vec![9, 43], codes);
    }

    #[test]
    fn reexport_moves_to_end() {
        let mut sut = Sut::new(1);

        sut.add_export(DefineTag::new(1, "A"));
        sut.add_export(DefineTag::new(2, "B"));
        sut.add_export(DefineTag::new(3, "A"));

        let names: Vec<_> =
            sut.exports().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(vec!["B", "A"], names);

        // The later tag won.
        assert_eq!(3, sut.exports().last().unwrap().id);
    }

    #[test]
    fn remove_export_by_name() {
        let mut sut = Sut::new(1);

        sut.add_export(DefineTag::new(1, "A"));
        sut.add_export(DefineTag::new(2, "B"));
        sut.remove_export("A");

        let names: Vec<_> =
            sut.exports().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(vec!["B"], names);
    }

    #[test]
    fn symbol_class_rebind_replaces_in_place() {
        let mut sut = SymbolClass::new();

        sut.add("app.Main", DefineTag::new(1, "app.Main"));
        sut.add("app.Other", DefineTag::new(2, "app.Other"));
        sut.add("app.Main", DefineTag::new(3, "app.Main"));

        assert_eq!(2, sut.len());
        assert_eq!(Some(&DefineTag::new(3, "app.Main")), sut.get("app.Main"));

        let order: Vec<_> =
            sut.iter().map(|(name, _)| name.as_str()).collect();
        assert_eq!(vec!["app.Main", "app.Other"], order);
    }

    #[test]
    fn symbol_class_merge() {
        let mut a = SymbolClass::new();
        a.add("One", DefineTag::new(1, "One"));

        let mut b = SymbolClass::new();
        b.add("Two", DefineTag::new(2, "Two"));
        b.add("One", DefineTag::new(9, "One"));

        a.merge(&b);

        assert_eq!(2, a.len());
        assert_eq!(Some(&DefineTag::new(9, "One")), a.get("One"));
    }

    #[test]
    fn do_abc_lazy_flag() {
        let lazy = DoAbc::new("a", DO_ABC_LAZY_INITIALIZE, vec![]);
        let eager = DoAbc::new("b", 0, vec![]);

        assert!(lazy.is_lazy());
        assert!(!eager.is_lazy());
    }
}
