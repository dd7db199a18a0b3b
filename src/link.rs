// Linker entry points
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

//! The linker is responsible for combining individually compiled units
//!   into a final executable artifact.
//!
//! [`link`] produces a frame-ordered [`Movie`];
//! [`link_console`] produces a flat
//!   [`ConsoleApplication`](crate::movie::console::ConsoleApplication)
//!   for headless execution.
//! Both consume the same inputs:
//!   an immutable unit list,
//!   a [`Configuration`] assembled by the caller
//!     (option _parsing_ happens elsewhere),
//!   and a [`Diagnostics`] collector that receives every message the link
//!   produces.
//!
//! Linking is deterministic:
//!   identical inputs produce identical artifacts,
//!     and a retry without input changes would reproduce the same error.
//! Each invocation's working state is private to that invocation,
//!   so concurrent links are safe as long as each gets its own
//!   collector.

pub mod error;
pub mod linkable;
pub mod walker;

pub use self::error::{LinkError, LinkResult};

use crate::diagnose::Diagnostics;
use crate::fs::VanillaFilesystem;
use crate::movie::console::ConsoleApplication;
use crate::movie::Movie;
use crate::report;
use crate::unit::CompilationUnit;
use fxhash::FxHashSet;
use std::collections::BTreeSet;
use std::fs;
use std::io::BufWriter;
use std::path::PathBuf;

/// One declared output frame:
///   an optional label and the root class names seeding it.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FrameInfo {
    pub label: Option<String>,

    /// Root symbol names whose reachable closure lands on this frame.
    pub frame_classes: Vec<String>,
}

/// Caller-assembled link configuration.
///
/// This crate never parses options;
///   whatever produced this struct did.
#[derive(Debug, Default, Clone)]
pub struct Configuration {
    /// Name of the class that defines the program root.
    ///
    /// Frame planning starts here;
    ///   `None` links only the explicitly configured
    ///   [`frame_list`](Configuration::frame_list).
    pub root_class_name: Option<String>,

    /// Explicitly declared frames,
    ///   appended after the implicit ones.
    pub frame_list: Vec<FrameInfo>,

    /// Names guaranteed to be supplied by an already-loaded artifact.
    pub externs: FxHashSet<String>,

    /// Names forced into the output even if unreferenced.
    pub includes: Vec<String>,

    /// Names already known to be unresolved from an earlier pass.
    pub unresolved: FxHashSet<String>,

    /// Resource bundle names for the bundle list report.
    pub resource_bundles: BTreeSet<String>,

    pub generate_link_report: bool,
    pub link_report_path: Option<PathBuf>,

    pub generate_rb_list: bool,
    pub rb_list_path: Option<PathBuf>,

    /// Mark emitted bytecode for lazy initialization.
    pub lazy_init: bool,
}

/// Post-link transformation hook.
///
/// Optimization itself is an external concern;
///   this is only the seam it plugs into.
pub trait PostLink {
    fn run(&mut self, movie: &mut Movie);

    fn run_console(&mut self, _app: &mut ConsoleApplication) {}
}

/// Put the compilation units together into a [`Movie`].
///
/// On success,
///   any configured reports have been written
///     (failures there are warnings on `diag`, not errors)
///   and the post-link hook has run.
/// See [`Movie::generate`] for failure modes.
pub fn link(
    units: &[CompilationUnit],
    config: &Configuration,
    post_link: Option<&mut dyn PostLink>,
    diag: &mut Diagnostics,
) -> LinkResult<Movie> {
    let mut movie = Movie::generate(units, config, diag)?;

    let mut fs = VanillaFilesystem::<BufWriter<fs::File>>::default();
    report::write_reports(&movie, config, &mut fs, diag);

    if let Some(post) = post_link {
        post.run(&mut movie);
    }

    Ok(movie)
}

/// Put the compilation units together into a flat
///   [`ConsoleApplication`].
pub fn link_console(
    units: &[CompilationUnit],
    _config: &Configuration,
    post_link: Option<&mut dyn PostLink>,
    diag: &mut Diagnostics,
) -> LinkResult<ConsoleApplication> {
    let mut app = ConsoleApplication::generate(units, diag)?;

    if let Some(post) = post_link {
        post.run_console(&mut app);
    }

    Ok(app)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::unit::Source;

    fn unit(name: &str, defs: &[&str], inherit: &[&str]) -> CompilationUnit {
        let mut unit = CompilationUnit::new(Source::new(name));

        unit.top_level_definitions = defs.iter().copied().collect();
        unit.inheritance = inherit.iter().copied().collect();
        unit.bytecode = name.as_bytes().to_vec();

        unit
    }

    #[test]
    fn link_produces_movie() -> LinkResult<()> {
        let mut app = unit("App.as", &["App"], &["Base"]);
        app.source.root = true;
        let base = unit("Base.as", &["Base"], &[]);

        let config = Configuration {
            root_class_name: Some("App".to_owned()),
            ..Default::default()
        };

        let mut diag = Diagnostics::new();
        let movie = link(&[app, base], &config, None, &mut diag)?;

        assert_eq!(1, movie.frame_count());
        assert_eq!(0, diag.error_count());

        Ok(())
    }

    #[test]
    fn link_console_produces_flat_artifact() -> LinkResult<()> {
        let units =
            vec![unit("A.as", &["A"], &[]), unit("B.as", &["B"], &["A"])];

        let app = link_console(
            &units,
            &Configuration::default(),
            None,
            &mut Diagnostics::new(),
        )?;

        assert_eq!(2, app.abcs().len());

        Ok(())
    }

    #[test]
    fn post_link_hook_runs_after_generation() -> LinkResult<()> {
        struct CountingPostLink {
            movie_runs: usize,
            console_runs: usize,
        }

        impl PostLink for CountingPostLink {
            fn run(&mut self, movie: &mut Movie) {
                assert_eq!(1, movie.frame_count());
                self.movie_runs += 1;
            }

            fn run_console(&mut self, _app: &mut ConsoleApplication) {
                self.console_runs += 1;
            }
        }

        let mut post = CountingPostLink {
            movie_runs: 0,
            console_runs: 0,
        };

        let mut app = unit("App.as", &["App"], &[]);
        app.source.root = true;
        let units = vec![app];

        let config = Configuration {
            root_class_name: Some("App".to_owned()),
            ..Default::default()
        };

        link(&units, &config, Some(&mut post), &mut Diagnostics::new())?;
        link_console(
            &units,
            &config,
            Some(&mut post),
            &mut Diagnostics::new(),
        )?;

        assert_eq!(1, post.movie_runs);
        assert_eq!(1, post.console_runs);

        Ok(())
    }

    #[test]
    fn failed_link_surfaces_error_and_diagnostics() {
        let units = vec![unit("A.as", &["A"], &["missing.Base"])];

        let config = Configuration {
            root_class_name: Some("A".to_owned()),
            ..Default::default()
        };

        let mut diag = Diagnostics::new();
        let result = link(&units, &config, None, &mut diag);

        assert_eq!(
            Err(LinkError::LinkingFailed {
                undefined: vec!["missing.Base".into()],
            }),
            result,
        );
        assert!(diag.error_count() > 0);
    }
}
