// Link report generation
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

//! Read-only report projections of a completed link.
//!
//! Two optional flat-text artifacts can accompany a movie:
//!
//!   - the _link report_,
//!       an XML dump listing every emitted unit with its frame,
//!       definitions, prerequisites, and dependencies,
//!       followed by the names the output expects its loading environment
//!       to supply; and
//!   - the _resource bundle list_,
//!       a single `bundles = ...` line.
//!
//! Reports are rendered into strings during the link and written to disk
//!   afterwards by [`write_reports`].
//! A failure to write a report is a warning on the diagnostics collector,
//!   never a link failure:
//!     the in-memory result has already been produced and remains valid.

use crate::diagnose::Diagnostics;
use crate::fs::{File, Filesystem};
use crate::link::linkable::Linkable;
use crate::link::Configuration;
use crate::movie::Movie;
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::Error as XmlError;
use quick_xml::Writer as XmlWriter;
use std::collections::BTreeSet;
use std::fmt::{self, Display};
use std::io::{self, Write};
use std::path::Path;
use std::string::FromUtf8Error;

pub type ReportResult<T = ()> = Result<T, ReportError>;

/// Error rendering a report.
#[derive(Debug)]
pub enum ReportError {
    /// Propagated IO error
    Io(io::Error),
    /// Propagated XML error
    Xml(XmlError),
    /// Rendered report was not valid UTF-8
    Utf8(FromUtf8Error),
}

impl Display for ReportError {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Io(inner) => inner.fmt(fmt),
            Self::Xml(inner) => inner.fmt(fmt),
            Self::Utf8(inner) => inner.fmt(fmt),
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

impl From<io::Error> for ReportError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<XmlError> for ReportError {
    fn from(err: XmlError) -> Self {
        Self::Xml(err)
    }
}

impl From<FromUtf8Error> for ReportError {
    fn from(err: FromUtf8Error) -> Self {
        Self::Utf8(err)
    }
}

/// Render the XML link report.
///
/// `scripts` pairs each emitted unit with the 1-based frame it landed on,
///   in emission order;
/// `external_defs` holds the extern-excused names,
///   already sorted.
pub fn render_link_report(
    scripts: &[(usize, &Linkable)],
    external_defs: &[String],
) -> ReportResult<String> {
    let mut writer = XmlWriter::new_with_indent(Vec::new(), b' ', 2);

    writer.write_event(Event::Start(BytesStart::borrowed_name(b"report")))?;
    writer.write_event(Event::Start(BytesStart::borrowed_name(b"scripts")))?;

    for (frame, linkable) in scripts {
        let last_modified = linkable.last_modified().to_string();
        let size = linkable.size().to_string();
        let frame = frame.to_string();

        writer.write_event(Event::Start(
            BytesStart::borrowed_name(b"script").with_attributes(vec![
                ("name", linkable.name()),
                ("mod", last_modified.as_str()),
                ("size", size.as_str()),
                ("frame", frame.as_str()),
            ]),
        ))?;

        for def in linkable.definitions() {
            write_id(&mut writer, b"def", def)?;
        }

        for pre in linkable.prerequisites() {
            write_id(&mut writer, b"pre", pre)?;
        }

        for dep in linkable.dependencies() {
            write_id(&mut writer, b"dep", dep)?;
        }

        writer.write_event(Event::End(BytesEnd::borrowed(b"script")))?;
    }

    writer.write_event(Event::End(BytesEnd::borrowed(b"scripts")))?;

    writer.write_event(Event::Start(BytesStart::borrowed_name(
        b"external-defs",
    )))?;

    for ext in external_defs {
        write_id(&mut writer, b"ext", ext)?;
    }

    writer.write_event(Event::End(BytesEnd::borrowed(b"external-defs")))?;
    writer.write_event(Event::End(BytesEnd::borrowed(b"report")))?;

    Ok(String::from_utf8(writer.into_inner())?)
}

fn write_id<W: Write>(
    writer: &mut XmlWriter<W>,
    element: &[u8],
    id: &str,
) -> ReportResult {
    writer.write_event(Event::Empty(
        BytesStart::borrowed_name(element)
            .with_attributes(vec![("id", id)]),
    ))?;

    Ok(())
}

/// Render the resource bundle list.
pub fn render_rb_list(bundles: &BTreeSet<String>) -> String {
    let mut out = String::from("bundles = ");

    for name in bundles {
        out.push_str(name);
        out.push(' ');
    }

    out
}

/// Write any rendered reports to their configured paths.
///
/// Failures are logged as warnings;
///   the link result stands regardless.
pub fn write_reports<F, FS>(
    movie: &Movie,
    config: &Configuration,
    fs: &mut FS,
    diag: &mut Diagnostics,
) where
    F: File,
    FS: Filesystem<F>,
{
    if let (Some(report), Some(path)) =
        (movie.link_report(), config.link_report_path.as_ref())
    {
        if let Err(e) = write_file(fs, path, report) {
            diag.warning(format!(
                "unable to write link report `{}`: {}",
                path.display(),
                e,
            ));
        }
    }

    if let (Some(rb_list), Some(path)) =
        (movie.rb_list(), config.rb_list_path.as_ref())
    {
        if let Err(e) = write_file(fs, path, rb_list) {
            diag.warning(format!(
                "unable to write resource bundle list `{}`: {}",
                path.display(),
                e,
            ));
        }
    }
}

// The file is closed when dropped, whether or not writing succeeded.
fn write_file<F: File, FS: Filesystem<F>>(
    fs: &mut FS,
    path: &Path,
    contents: &str,
) -> io::Result<()> {
    let mut file = fs.create(path)?;

    file.write_all(contents.as_bytes())?;
    file.flush()
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::link::linkable::{extract, SymbolGraph};
    use crate::unit::{CompilationUnit, Source};
    use fxhash::FxHashMap;
    use std::cell::RefCell;
    use std::path::PathBuf;
    use std::rc::Rc;

    fn fixture_units() -> Vec<CompilationUnit> {
        let mut app = CompilationUnit::new(Source::new("App.as"));
        app.source.last_modified = 42;
        app.bytecode = vec![0; 7];
        app.top_level_definitions = ["App"].into();
        app.inheritance = ["Base"].into();
        app.expressions = ["util.Str"].into();

        let mut base = CompilationUnit::new(Source::new("Base.as"));
        base.top_level_definitions = ["Base"].into();

        vec![app, base]
    }

    fn scripts<'a>(sg: &'a SymbolGraph<'a>) -> Vec<(usize, &'a Linkable<'a>)> {
        vec![
            (1, sg.definer_linkable("Base").unwrap()),
            (1, sg.definer_linkable("App").unwrap()),
        ]
    }

    #[test]
    fn link_report_structure() -> ReportResult {
        let units = fixture_units();
        let sg = extract(&units).expect("extraction failed");

        let report = render_link_report(
            &scripts(&sg),
            &["util.Str".to_owned()],
        )?;

        assert!(report.starts_with("<report>"));
        assert!(report.contains(
            r#"<script name="App.as" mod="42" size="7" frame="1">"#
        ));
        assert!(report.contains(r#"<def id="App"/>"#));
        assert!(report.contains(r#"<pre id="Base"/>"#));
        assert!(report.contains(r#"<dep id="util.Str"/>"#));
        assert!(report.contains(r#"<ext id="util.Str"/>"#));
        assert!(report.ends_with("</report>"));

        // Emission order is preserved.
        let base_pos = report.find(r#"name="Base.as""#).unwrap();
        let app_pos = report.find(r#"name="App.as""#).unwrap();
        assert!(base_pos < app_pos);

        Ok(())
    }

    #[test]
    fn rb_list_sorted_with_trailing_spaces() {
        let bundles: BTreeSet<String> =
            ["core".to_owned(), "alerts".to_owned()].into_iter().collect();

        assert_eq!("bundles = alerts core ", render_rb_list(&bundles));
    }

    #[test]
    fn rb_list_empty() {
        assert_eq!("bundles = ", render_rb_list(&BTreeSet::new()));
    }

    // In-memory filesystem retaining created file contents.
    #[derive(Debug, Default)]
    struct MemFs {
        files: FxHashMap<PathBuf, Rc<RefCell<Vec<u8>>>>,
    }

    #[derive(Debug)]
    struct MemFile(Rc<RefCell<Vec<u8>>>);

    impl File for MemFile {
        fn create<P: AsRef<Path>>(_path: P) -> io::Result<Self> {
            Ok(Self(Default::default()))
        }
    }

    impl Write for MemFile {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Filesystem<MemFile> for MemFs {
        fn create<P: AsRef<Path>>(&mut self, path: P) -> io::Result<MemFile> {
            let buf: Rc<RefCell<Vec<u8>>> = Default::default();
            self.files
                .insert(path.as_ref().to_path_buf(), Rc::clone(&buf));

            Ok(MemFile(buf))
        }
    }

    // Filesystem on which every create fails.
    #[derive(Debug, Default)]
    struct FailFs;

    impl Filesystem<MemFile> for FailFs {
        fn create<P: AsRef<Path>>(&mut self, _path: P) -> io::Result<MemFile> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
        }
    }

    fn reporting_movie() -> Movie {
        let mut units = fixture_units();
        units[0].source.root = true;
        units[0].expressions = crate::unit::NameSet::new();

        let config = Configuration {
            root_class_name: Some("App".to_owned()),
            generate_link_report: true,
            generate_rb_list: true,
            resource_bundles: ["core".to_owned()].into_iter().collect(),
            ..Default::default()
        };

        Movie::generate(&units, &config, &mut Diagnostics::new())
            .expect("link failed")
    }

    #[test]
    fn write_reports_emits_both_files() {
        let movie = reporting_movie();

        let config = Configuration {
            link_report_path: Some("out/link-report.xml".into()),
            rb_list_path: Some("out/bundles.txt".into()),
            ..Default::default()
        };

        let mut fs = MemFs::default();
        let mut diag = Diagnostics::new();

        write_reports(&movie, &config, &mut fs, &mut diag);

        assert!(diag.is_empty());

        let report = fs.files[Path::new("out/link-report.xml")].borrow();
        assert!(String::from_utf8_lossy(&report).contains("App.as"));

        let rb = fs.files[Path::new("out/bundles.txt")].borrow();
        assert_eq!("bundles = core ", String::from_utf8_lossy(&rb));
    }

    #[test]
    fn write_failure_downgrades_to_warning() {
        let movie = reporting_movie();

        let config = Configuration {
            link_report_path: Some("out/link-report.xml".into()),
            rb_list_path: Some("out/bundles.txt".into()),
            ..Default::default()
        };

        let mut fs = FailFs;
        let mut diag = Diagnostics::new();

        write_reports(&movie, &config, &mut fs, &mut diag);

        assert_eq!(0, diag.error_count());
        assert_eq!(2, diag.len());
        assert!(diag
            .iter()
            .next()
            .unwrap()
            .message()
            .contains("link-report.xml"));
    }

    #[test]
    fn unconfigured_paths_write_nothing() {
        let movie = reporting_movie();
        let config = Configuration::default();

        let mut fs = MemFs::default();
        let mut diag = Diagnostics::new();

        write_reports(&movie, &config, &mut fs, &mut diag);

        assert!(fs.files.is_empty());
        assert!(diag.is_empty());
    }
}
