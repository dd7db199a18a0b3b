// Light filesystem abstractions
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

//! Lightweight filesystem abstraction.
//!
//! This abstraction is intended to provide generics missing from Rust
//!   core,
//!     but makes no attempt to be comprehensive---it
//!       includes only what is needed for report emission.
//!
//!   - [`File`] provides a trait for creating writable files; and
//!   - [`Filesystem`] provides a generic way to create them by path.
//!
//! The only writes this crate performs are the optional report files,
//!   whose failures must downgrade to warnings rather than failing the
//!   link;
//!     pushing file creation behind these traits keeps that policy
//!     testable without touching disk.
//! Files are closed when dropped,
//!   on both success and error paths.

use std::fs;
use std::io::{BufWriter, Result, Write};
use std::marker::PhantomData;
use std::path::Path;

/// A writable file.
pub trait File: Write
where
    Self: Sized,
{
    /// Create (or truncate) the file at `path`.
    fn create<P: AsRef<Path>>(path: P) -> Result<Self>;
}

impl File for fs::File {
    fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::create(path)
    }
}

impl<F: File + Write> File for BufWriter<F> {
    /// Create the file at `path` and construct a [`BufWriter`] around it.
    fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(BufWriter::new(F::create(path)?))
    }
}

/// A filesystem.
///
/// Creating a file (using [`create`](Filesystem::create)) proxies to
///   `F::create`.
/// The type of files created by this abstraction can therefore be
///   controlled via generics.
pub trait Filesystem<F: File>
where
    Self: Sized,
{
    fn create<P: AsRef<Path>>(&mut self, path: P) -> Result<F> {
        F::create(path)
    }
}

/// Vanilla filesystem access.
///
/// This provides access to the filesystem as one would expect.
/// The actual operations are delegated to `F`.
#[derive(Debug)]
pub struct VanillaFilesystem<F: File> {
    _file: PhantomData<F>,
}

impl<F: File> Default for VanillaFilesystem<F> {
    fn default() -> Self {
        Self {
            _file: Default::default(),
        }
    }
}

impl<F: File> Filesystem<F> for VanillaFilesystem<F> {
    fn create<P: AsRef<Path>>(&mut self, path: P) -> Result<F> {
        F::create(path)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::PathBuf;

    #[derive(Debug, PartialEq)]
    struct DummyFile(PathBuf, Vec<u8>);

    impl File for DummyFile {
        fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
            Ok(Self(path.as_ref().to_path_buf(), vec![]))
        }
    }

    impl Write for DummyFile {
        fn write(&mut self, buf: &[u8]) -> Result<usize> {
            self.1.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn buf_writer_file() {
        let path: PathBuf = "buf/path".into();
        let result: BufWriter<DummyFile> = File::create(path.clone()).unwrap();

        assert_eq!(DummyFile(path, vec![]), result.into_inner().unwrap());
    }

    #[test]
    fn vanilla_fs_delegates() {
        let mut fs = VanillaFilesystem::<DummyFile>::default();
        let path: PathBuf = "foo/bar".into();

        let mut file = fs.create(path.clone()).unwrap();
        file.write_all(b"written").unwrap();

        assert_eq!(DummyFile(path, b"written".to_vec()), file);
    }
}
