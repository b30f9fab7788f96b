//! Append-only JSONL log file output.
//!
//! Each service writes to `~/.pixelforge/logs/<service>.jsonl` unless a path
//! is configured. Lines are flushed as they are written so `tail -f` sees
//! them immediately.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::fmt::MakeWriter;

/// Default log file for a service, or `None` when no home directory exists.
pub(crate) fn default_log_path(service_name: &str) -> Option<PathBuf> {
    dirs::home_dir().map(|home| {
        home.join(".pixelforge")
            .join("logs")
            .join(format!("{service_name}.jsonl"))
    })
}

/// Line-flushed writer shared by every event the subscriber formats.
#[derive(Clone)]
pub struct LogFileWriter {
    inner: Arc<Mutex<BufWriter<File>>>,
}

impl LogFileWriter {
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            inner: Arc::new(Mutex::new(BufWriter::with_capacity(8192, file))),
        })
    }
}

impl io::Write for LogFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.inner.lock();
        let written = guard.write(buf)?;
        guard.flush()?;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().flush()
    }
}

impl<'a> MakeWriter<'a> for LogFileWriter {
    type Writer = LogFileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
