// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/frigate-alerts

//! Size-rotated log file writer

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::config::LoggingConfig;

/// Append-only log file that rolls over once it reaches a byte limit.
///
/// On rollover `<path>` becomes `<path>.1`, `<path>.1` becomes `<path>.2`
/// and so on up to `<path>.<max_keep>`; the oldest file is removed. A
/// `max_bytes` of `0` never rolls over.
#[derive(Debug)]
pub struct RotatingFile {
    path: PathBuf,
    max_bytes: u64,
    max_keep: usize,
    file: File,
    written: u64,
}

impl RotatingFile {
    /// Open (or create) `path`, continuing from its current size
    pub fn open(path: impl AsRef<Path>, max_bytes: u64, max_keep: usize) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = Self::append(&path)?;
        let written = file.metadata()?.len();
        Ok(Self {
            path,
            max_bytes,
            max_keep,
            file,
            written,
        })
    }

    /// Open the file `[logging]` points at, honouring its rotation settings
    pub fn from_config(path: &Path, config: &LoggingConfig) -> io::Result<Self> {
        Self::open(path, config.max_bytes(), config.max_keep)
    }

    /// Path of the `index`-th rolled-over file
    pub fn backup_path(&self, index: usize) -> PathBuf {
        let mut name: OsString = self.path.as_os_str().to_owned();
        name.push(format!(".{}", index));
        PathBuf::from(name)
    }

    fn append(path: &Path) -> io::Result<File> {
        OpenOptions::new().create(true).append(true).open(path)
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;

        let oldest = self.backup_path(self.max_keep);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }
        for index in (1..self.max_keep).rev() {
            let from = self.backup_path(index);
            if from.exists() {
                fs::rename(&from, self.backup_path(index + 1))?;
            }
        }
        fs::rename(&self.path, self.backup_path(1))?;

        self.file = Self::append(&self.path)?;
        self.written = 0;
        Ok(())
    }
}

impl Write for RotatingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let limit = self.max_bytes > 0 && self.max_keep > 0;
        if limit && self.written > 0 && self.written + buf.len() as u64 > self.max_bytes {
            self.rotate()?;
        }
        let written = self.file.write(buf)?;
        self.written += written as u64;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}
