// Movie assembly
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

//! Assembly of walked units into a frame-ordered [`Movie`].
//!
//! [`Movie::generate`] is one complete link:
//!   it lowers the units into a graph,
//!     rejects structural errors,
//!     plans the frame list,
//!     walks each frame
//!       (see [`walker`](crate::link::walker)),
//!     and accumulates every visited unit's bytecode and export tables
//!     into [`Frame`]s.
//!
//! Frame planning starts from the configured root class and follows
//!   `loader_class` chains,
//!     so a loader always occupies a frame _before_ the class it loads;
//!   explicitly configured frames are appended after the implicit ones.
//! Within a frame,
//!   the root unit's bytecode is always placed last so the player executes
//!   initialization code only after all supporting classes are defined.
//!
//! The movie is never mutated once `generate` returns.

pub mod console;
pub mod frame;

use crate::diagnose::Diagnostics;
use crate::graph::VertexRef;
use crate::link::error::{LinkError, LinkResult};
use crate::link::linkable::{extract, Linkable, SymbolGraph};
use crate::link::walker::{traverse, LinkState};
use crate::link::{Configuration, FrameInfo};
use crate::report;
use crate::unit::CompilationUnit;
use self::frame::{DoAbc, Frame, FrameLabel, DO_ABC_LAZY_INITIALIZE};
use fxhash::FxHashSet;

/// The fully assembled, frame-ordered link output.
///
/// Created once per link invocation and immutable thereafter.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Movie {
    frames: Vec<Frame>,
    top_level_class: Option<String>,
    metadata: FxHashSet<String>,
    exported_units: Vec<String>,
    link_report: Option<String>,
    rb_list: Option<String>,
}

impl Movie {
    /// Link `units` into a movie per `config`.
    ///
    /// Structural errors
    ///   (duplicate definitions, prerequisite cycles, an unresolvable
    ///   root class)
    ///   abort immediately;
    ///     unresolved symbols are batched and raised as one
    ///     [`LinkError::LinkingFailed`] after every frame has been walked.
    /// Every fatal path logs to `diag` before returning.
    pub fn generate(
        units: &[CompilationUnit],
        config: &Configuration,
        diag: &mut Diagnostics,
    ) -> LinkResult<Movie> {
        let sg = extract(units).map_err(|e| {
            diag.error(e.to_string());
            e
        })?;

        sg.graph().check_cycles().map_err(|e| {
            let e = LinkError::from(e);
            diag.error(e.to_string());
            e
        })?;

        let frame_infos = prelink(&sg, config).map_err(|e| {
            diag.error(e.to_string());
            e
        })?;

        let top_level_class = frame_infos
            .first()
            .and_then(|info| info.frame_classes.first())
            .map(|name| format_symbol_class_name(name));

        // Internal units are guaranteed present in the loading
        // environment, so their definitions behave as externs.
        let mut externs = config.externs.clone();
        for unit in units {
            if unit.is_internal() {
                for def in &unit.top_level_definitions {
                    externs.insert(def.clone());
                }
            }
        }

        let mut state = LinkState::new(
            &sg,
            externs,
            config.includes.clone(),
            config.unresolved.clone(),
        );

        let mut frames = Vec::with_capacity(frame_infos.len());
        let mut metadata = FxHashSet::default();
        let mut exported_units = Vec::new();
        let mut exported: Vec<(VertexRef, usize)> = Vec::new();

        let count = frame_infos.len();
        for (i, info) in frame_infos.iter().enumerate() {
            let is_last = i + 1 == count;
            let pos = i + 1;

            let mut frame = Frame::new(pos);
            frame.label = info
                .label
                .as_ref()
                .map(|label| FrameLabel {
                    label: label.clone(),
                });

            let mut root_abc = None;

            traverse(
                &info.frame_classes,
                &mut state,
                is_last,
                is_last,
                &mut |vref, linkable| {
                    let emitted = export_unit_on_frame(
                        linkable,
                        &mut frame,
                        config.lazy_init,
                        &mut root_abc,
                    );

                    if emitted {
                        metadata
                            .extend(linkable.unit().metadata.iter().cloned());
                        exported_units.push(linkable.name().to_owned());
                        exported.push((vref, pos));
                    }
                },
            )?;

            if let Some(abc) = root_abc.take() {
                frame.add_do_abc(abc);
            }

            frames.push(frame);
        }

        let link_report = if config.generate_link_report {
            let scripts: Vec<(usize, &Linkable)> = exported
                .iter()
                .map(|&(vref, pos)| {
                    (
                        pos,
                        sg.linkable(vref).expect(
                            "internal error: exported vertex missing",
                        ),
                    )
                })
                .collect();

            match report::render_link_report(&scripts, &state.external_defs())
            {
                Ok(text) => Some(text),
                Err(e) => {
                    diag.warning(format!(
                        "unable to render link report: {}",
                        e
                    ));
                    None
                }
            }
        } else {
            None
        };

        let rb_list = config
            .generate_rb_list
            .then(|| report::render_rb_list(&config.resource_bundles));

        // The single most important correctness gate: every reachable
        // reference must be either defined or explicitly excused.
        let undefined = state.undefined();
        if !undefined.is_empty() {
            for symbol in &undefined {
                diag.error(
                    LinkError::UndefinedSymbol {
                        symbol: symbol.clone(),
                    }
                    .to_string(),
                );
            }

            return Err(LinkError::LinkingFailed { undefined });
        }

        Ok(Movie {
            frames,
            top_level_class,
            metadata,
            exported_units,
            link_report,
            rb_list,
        })
    }

    /// Frames in load/execute order.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Formatted name of the class the player instantiates first.
    pub fn top_level_class(&self) -> Option<&str> {
        self.top_level_class.as_deref()
    }

    /// Metadata names a post-link optimizer must preserve.
    pub fn metadata(&self) -> &FxHashSet<String> {
        &self.metadata
    }

    /// Source names of every emitted unit,
    ///   in final emission order.
    pub fn exported_units(&self) -> &[String] {
        &self.exported_units
    }

    pub fn link_report(&self) -> Option<&str> {
        self.link_report.as_deref()
    }

    pub fn rb_list(&self) -> Option<&str> {
        self.rb_list.as_deref()
    }
}

/// Normalize a qualified name for symbol-class binding
///   (`pkg:Class` becomes `pkg.Class`).
pub fn format_symbol_class_name(name: &str) -> String {
    name.replace(':', ".")
}

/// Frame labels permit alphanumerics only;
///   everything else becomes `_`.
fn sanitize_label(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Plan the frame list.
///
/// Implicit frames come from the root class's `loader_class` chain;
///   configured frames follow.
fn prelink(
    sg: &SymbolGraph,
    config: &Configuration,
) -> LinkResult<Vec<FrameInfo>> {
    let mut infos = Vec::new();

    if let Some(root_class) = &config.root_class_name {
        let mut progress = FxHashSet::default();
        build_frames(sg, root_class, &mut infos, &mut progress)?;
    }

    infos.extend(config.frame_list.iter().cloned());

    Ok(infos)
}

fn build_frames(
    sg: &SymbolGraph,
    class_name: &str,
    infos: &mut Vec<FrameInfo>,
    progress: &mut FxHashSet<String>,
) -> LinkResult<()> {
    let already_planned = infos
        .iter()
        .any(|info| info.frame_classes.iter().any(|c| c == class_name));

    if already_planned || !progress.insert(class_name.to_owned()) {
        return Ok(());
    }

    let linkable = sg.definer_linkable(class_name).ok_or_else(|| {
        LinkError::UndefinedSymbol {
            symbol: class_name.to_owned(),
        }
    })?;
    let unit = linkable.unit();

    // The loader's frame must precede ours.
    if let Some(loader) = &unit.loader_class {
        build_frames(sg, loader, infos, progress)?;
    }

    let mut frame_classes = vec![class_name.to_owned()];
    frame_classes.extend(unit.resource_bundles.iter().cloned());
    frame_classes.extend(unit.extra_classes.iter().cloned());

    infos.push(FrameInfo {
        label: Some(sanitize_label(class_name)),
        frame_classes,
    });

    Ok(())
}

/// Emit one visited unit onto `frame`,
///   returning whether anything was emitted.
///
/// Internal units are never emitted.
/// The root unit's bytecode is parked in `root_abc` for the caller to
///   append once the frame is otherwise complete.
fn export_unit_on_frame(
    linkable: &Linkable,
    frame: &mut Frame,
    lazy: bool,
    root_abc: &mut Option<DoAbc>,
) -> bool {
    let unit = linkable.unit();

    if unit.is_internal() {
        return false;
    }

    let flags = if lazy { DO_ABC_LAZY_INITIALIZE } else { 0 };
    let abc = DoAbc::new(unit.name(), flags, unit.bytecode.clone());

    if unit.is_root() {
        *root_abc = Some(abc);
    } else {
        frame.add_do_abc(abc);
    }

    for asset in &unit.assets {
        frame.add_symbol_class(
            format_symbol_class_name(&asset.name),
            asset.tag.clone(),
        );
        frame.add_export(asset.tag.clone());
    }

    for font in &unit.fonts {
        frame.add_font(font.clone());
    }

    true
}
