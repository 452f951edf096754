//! Append-only audit log file with single-generation rotation.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing_subscriber::fmt::MakeWriter;

/// Shared handle to the audit log file.
///
/// Every write goes through one mutex, so concurrent requests never
/// interleave partial lines. Once the file grows past `max_bytes` it is
/// renamed to `<path>.old` (replacing any previous backup) and a fresh file
/// is started.
#[derive(Clone)]
pub struct AuditLog {
    inner: Arc<Mutex<AuditFile>>,
}

struct AuditFile {
    path: PathBuf,
    backup_path: PathBuf,
    max_bytes: u64,
    file: Option<File>,
    size: u64,
}

impl AuditLog {
    /// Create a log handle for `path`. The file is opened lazily on the
    /// first write.
    pub fn new(path: impl Into<PathBuf>, max_bytes: u64) -> Self {
        let path = path.into();
        let backup_path = backup_path_for(&path);

        Self {
            inner: Arc::new(Mutex::new(AuditFile {
                path,
                backup_path,
                max_bytes,
                file: None,
                size: 0,
            })),
        }
    }

    /// Path of the active log file.
    pub fn path(&self) -> PathBuf {
        self.lock().path.clone()
    }

    /// Path the log is rotated to.
    pub fn backup_path(&self) -> PathBuf {
        self.lock().backup_path.clone()
    }

    /// Append one formatted line. Errors are swallowed: logging is
    /// best-effort and must never fail a request.
    pub fn append(&self, line: &[u8]) {
        let mut file = self.lock();
        if file.append(line).is_err() {
            // Reopen on the next write in case the file was removed underneath us.
            file.file = None;
        }
    }

    fn lock(&self) -> MutexGuard<'_, AuditFile> {
        // A panic while holding the lock leaves the state usable.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl AuditFile {
    fn append(&mut self, line: &[u8]) -> io::Result<()> {
        if self.file.is_none() {
            self.open()?;
        }

        // A failed rotation keeps appending to the current file; it is
        // retried on the next write.
        if self.size > self.max_bytes {
            let _ = self.rotate();
        }

        if let Some(file) = self.file.as_mut() {
            file.write_all(line)?;
            self.size += line.len() as u64;
        }

        Ok(())
    }

    fn open(&mut self) -> io::Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        self.size = file.metadata().map(|m| m.len()).unwrap_or(0);
        self.file = Some(file);
        Ok(())
    }

    fn rotate(&mut self) -> io::Result<()> {
        fs::rename(&self.path, &self.backup_path)?;
        // The old handle still points at the renamed file.
        self.file = None;
        self.open()
    }
}

/// `sns-log.txt` -> `sns-log.txt.old`
fn backup_path_for(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".old");
    PathBuf::from(name)
}

/// Writer handed out to the fmt layer for a single event.
pub struct AuditWriter<'a> {
    log: &'a AuditLog,
}

impl Write for AuditWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.log.append(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for AuditLog {
    type Writer = AuditWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        AuditWriter { log: self }
    }
}
