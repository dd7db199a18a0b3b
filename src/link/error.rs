// Linker errors
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

//! Typed linker error family.
//!
//! Every way a link can fail is a variant of [`LinkError`] carrying enough
//!   structure
//!     (symbol names, the conflicting source locations)
//!   to produce an actionable message;
//!     callers pattern-match rather than inspecting strings.
//!
//! Two failure disciplines apply:
//!
//!   - _Structural_ errors
//!       (cycles, duplicate definitions, a missing root)
//!     abort immediately,
//!       since the graph itself is unusable; and
//!   - _resolution_ errors are accumulated across the entire walk and
//!     raised as one [`LinkError::LinkingFailed`],
//!       so a single run reports every broken reference rather than just
//!       the first.
//!
//! Failures writing optional report files are warnings,
//!   not members of this family.

use crate::graph::GraphError;
use std::fmt::{self, Display};

pub type LinkResult<T> = Result<T, LinkError>;

/// Error during a link operation.
#[derive(Debug, PartialEq, Eq)]
pub enum LinkError {
    /// Two units define the same top-level name.
    ///
    /// Both defining locations are named so the user can remove one.
    MultipleDefinitions {
        symbol: String,
        location1: String,
        location2: String,
    },

    /// Two units share the same source identity.
    DuplicateUnit { name: String },

    /// The inheritance relation contains a cycle;
    ///   the named unit participates in it.
    ///
    /// Frame semantics require an acyclic load order,
    ///   so this cannot be broken silently.
    CircularReference { name: String },

    /// A symbol required during frame construction has no defining unit.
    UndefinedSymbol { symbol: String },

    /// One or more reachable symbols had neither a defining unit nor an
    ///   extern declaration.
    ///
    /// Accumulated over the whole walk;
    ///   `undefined` holds every such name,
    ///     sorted.
    LinkingFailed { undefined: Vec<String> },
}

impl Display for LinkError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::MultipleDefinitions {
                symbol,
                location1,
                location2,
            } => write!(
                fmt,
                "symbol `{}` is defined by both `{}` and `{}`",
                symbol, location1, location2,
            ),
            Self::DuplicateUnit { name } => {
                write!(fmt, "unit `{}` was provided more than once", name)
            }
            Self::CircularReference { name } => {
                write!(fmt, "circular reference involving `{}`", name)
            }
            Self::UndefinedSymbol { symbol } => {
                write!(fmt, "undefined symbol `{}`", symbol)
            }
            Self::LinkingFailed { undefined } => write!(
                fmt,
                "linking failed with {} undefined symbol(s): {}",
                undefined.len(),
                undefined.join(", "),
            ),
        }
    }
}

impl std::error::Error for LinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

impl From<GraphError> for LinkError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::DuplicateVertex(name) => Self::DuplicateUnit { name },
            GraphError::Cycle(name) => Self::CircularReference { name },
        }
    }
}
