// Console application assembly
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

//! Frameless sibling of [`Movie`](super::Movie) for headless execution.
//!
//! A console application has no frame structure and no tag tables:
//!   it is a flat list of bytecode blobs in dependency order,
//!     with the root unit's blob last so its initialization code runs
//!     after every supporting class is defined.
//! Ordering comes from a deterministic topological sort of the full unit
//!   graph rather than a root-reachability walk,
//!     so every non-internal unit is emitted whether referenced or not.

use crate::diagnose::Diagnostics;
use crate::link::error::{LinkError, LinkResult};
use crate::link::linkable::extract;
use crate::unit::CompilationUnit;

/// Flat linked artifact:
///   ordered bytecode with no frame structure.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ConsoleApplication {
    abcs: Vec<Vec<u8>>,
    exported_units: Vec<String>,
}

impl ConsoleApplication {
    /// Link `units` into a flat bytecode list.
    ///
    /// Fails on the same structural errors as a movie link
    ///   (duplicate definitions, inheritance cycles);
    ///   there is no symbol-level resolution gate because nothing is
    ///   excluded by reachability.
    pub fn generate(
        units: &[CompilationUnit],
        diag: &mut Diagnostics,
    ) -> LinkResult<ConsoleApplication> {
        let sg = extract(units).map_err(|e| {
            diag.error(e.to_string());
            e
        })?;

        let order = sg.graph().topological_order().map_err(|e| {
            let e = LinkError::from(e);
            diag.error(e.to_string());
            e
        })?;

        let mut abcs = Vec::new();
        let mut exported_units = Vec::new();
        let mut main = None;

        for vref in order {
            let linkable = sg
                .linkable(vref)
                .expect("internal error: sorted vertex missing");
            let unit = linkable.unit();

            if unit.is_internal() {
                continue;
            }

            if unit.is_root() {
                main = Some(unit.bytecode.clone());
            } else {
                abcs.push(unit.bytecode.clone());
            }

            exported_units.push(unit.name().to_owned());
        }

        if let Some(main) = main {
            abcs.push(main);
        }

        Ok(ConsoleApplication {
            abcs,
            exported_units,
        })
    }

    /// Bytecode blobs in execution order.
    pub fn abcs(&self) -> &[Vec<u8>] {
        &self.abcs
    }

    /// Source names of every emitted unit,
    ///   in visitation order.
    pub fn exported_units(&self) -> &[String] {
        &self.exported_units
    }
}
