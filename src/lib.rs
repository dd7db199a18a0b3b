// swfld library
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

//! Linker for frame-ordered bytecode movies.
//!
//! This crate takes a set of fully-analyzed [compilation
//!   units](crate::unit::CompilationUnit) and produces a single loadable
//!   [`Movie`](crate::movie::Movie):
//!     an ordered sequence of frames,
//!       each carrying the bytecode and export tables of the units assigned
//!       to it.
//! Everything upstream of the unit
//!   (parsing, semantic analysis, code generation)
//!   and everything downstream of the movie
//!   (encoding, optimization)
//!   are external collaborators;
//!     this crate is only the whole-program analysis between them.
//!
//! The interesting work happens in three stages:
//!
//!   1. [`link::linkable`] derives a [dependency graph](crate::graph) from
//!        each unit's symbol sets;
//!   2. [`link::walker`] partitions the live portion of that graph into
//!        frames,
//!          honoring the hard ordering imposed by inheritance; and
//!   3. [`movie`] accumulates the visited units into the final artifact.
//!
//! See [`link::link`] for the entry point.

// We build docs for private items.
#![allow(rustdoc::private_intra_doc_links)]

pub mod diagnose;
pub mod fs;
pub mod graph;
pub mod link;
pub mod movie;
pub mod report;
pub mod unit;
