// Diagnostic collection
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

//! Diagnostic collection for link operations.
//!
//! A [`Diagnostics`] collector is passed explicitly into the link entry
//!   points and accumulates every message the link produces,
//!     in the order it was produced.
//! This replaces the global, per-thread log sink that systems of this kind
//!   have historically reached for:
//!     the collector is owned by the caller,
//!       so two concurrent links cannot observe one another's messages and
//!       the caller decides how (and whether) messages are rendered.
//!
//! Levels classify messages only;
//!   rendering is the caller's concern.
//! In particular,
//!   a [`Level::Warning`] does not affect the outcome of a link,
//!   whereas every fatal error path logs a [`Level::Error`] message before
//!   the error is returned.

use std::fmt::{self, Display};

/// Diagnostic severity level.
///
/// Lower levels are more severe
///   (e.g. level 1 is the worst).
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Clone, Copy)]
#[repr(u8)]
pub enum Level {
    /// A condition that causes the link to fail.
    Error = 1,

    /// A recoverable condition;
    ///   the link result is still produced.
    Warning,

    /// Useful information that supplements other messages.
    Info,
}

impl Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
            Level::Info => write!(f, "info"),
        }
    }
}

/// A single collected message.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Diagnostic {
    level: Level,
    message: String,
}

impl Diagnostic {
    pub fn level(&self) -> Level {
        self.level
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.level, self.message)
    }
}

/// Ordered accumulator of [`Diagnostic`]s.
///
/// See the [module-level documentation](self) for more information.
#[derive(Debug, Default)]
pub struct Diagnostics {
    messages: Vec<Diagnostic>,
}

impl Diagnostics {
    /// New collector with no messages.
    pub fn new() -> Self {
        Default::default()
    }

    /// Record a message at the provided level.
    pub fn log(&mut self, level: Level, message: impl Into<String>) {
        self.messages.push(Diagnostic {
            level,
            message: message.into(),
        });
    }

    /// Record an error-level message.
    pub fn error(&mut self, message: impl Into<String>) {
        self.log(Level::Error, message);
    }

    /// Record a warning-level message.
    pub fn warning(&mut self, message: impl Into<String>) {
        self.log(Level::Warning, message);
    }

    /// Record an info-level message.
    pub fn info(&mut self, message: impl Into<String>) {
        self.log(Level::Info, message);
    }

    /// Number of error-level messages collected so far.
    pub fn error_count(&self) -> usize {
        self.messages
            .iter()
            .filter(|d| d.level == Level::Error)
            .count()
    }

    /// All collected messages, in collection order.
    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    type Sut = Diagnostics;

    #[test]
    fn collects_in_order() {
        let mut sut = Sut::new();

        sut.error("first");
        sut.warning("second");
        sut.info("third");

        let collected: Vec<_> =
            sut.iter().map(|d| (d.level(), d.message())).collect();

        assert_eq!(
            vec![
                (Level::Error, "first"),
                (Level::Warning, "second"),
                (Level::Info, "third"),
            ],
            collected,
        );
    }

    #[test]
    fn counts_only_errors() {
        let mut sut = Sut::new();

        sut.warning("w");
        assert_eq!(0, sut.error_count());

        sut.error("e1");
        sut.error("e2");
        assert_eq!(2, sut.error_count());
        assert_eq!(3, sut.len());
    }

    #[test]
    fn display_includes_level() {
        let mut sut = Sut::new();
        sut.warning("something questionable");

        assert_eq!(
            "warning: something questionable",
            sut.iter().next().unwrap().to_string(),
        );
    }
}
