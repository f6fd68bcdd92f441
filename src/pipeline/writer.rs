use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;

/// How bucket files are opened. A run normally owns its outdir and truncates;
/// append mode lets results accumulate across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Truncate,
    Append,
}

/// An append-only, LF-terminated line writer over one bucket file.
pub struct LineWriter {
    path: PathBuf,
    file: Mutex<BufWriter<File>>,
}

impl LineWriter {
    /// Open the file, creating parent directories as needed.
    pub fn open(path: &Path, mode: OpenMode) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let mut opts = OpenOptions::new();
        opts.create(true).write(true);
        match mode {
            OpenMode::Truncate => opts.truncate(true),
            OpenMode::Append => opts.append(true),
        };
        let file = opts.open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn write_line(&self, line: &str) -> io::Result<()> {
        let mut f = self.file.lock();
        f.write_all(line.as_bytes())?;
        f.write_all(b"\n")
    }

    pub fn flush(&self) -> io::Result<()> {
        self.file.lock().flush()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Writers keyed by path relative to the output root. The common buckets are
/// opened eagerly at construction; rare category buckets materialize on first
/// write so open-fd counts stay modest.
pub struct WriterPool {
    root: PathBuf,
    mode: OpenMode,
    writers: DashMap<String, Arc<LineWriter>>,
}

impl WriterPool {
    /// Open the pool, eagerly materializing `eager`. Any failure releases the
    /// writers opened so far and reports the error.
    pub fn open(root: &Path, mode: OpenMode, eager: &[&str]) -> io::Result<Self> {
        let pool = Self {
            root: root.to_path_buf(),
            mode,
            writers: DashMap::new(),
        };
        for rel in eager {
            if let Err(e) = pool.writer(rel) {
                let _ = pool.close();
                return Err(e);
            }
        }
        Ok(pool)
    }

    /// The writer for `rel`, opening it lazily on first use.
    pub fn writer(&self, rel: &str) -> io::Result<Arc<LineWriter>> {
        if let Some(w) = self.writers.get(rel) {
            return Ok(w.clone());
        }
        match self.writers.entry(rel.to_string()) {
            Entry::Occupied(e) => Ok(e.get().clone()),
            Entry::Vacant(v) => {
                let w = Arc::new(LineWriter::open(&self.root.join(rel), self.mode)?);
                v.insert(w.clone());
                Ok(w)
            }
        }
    }

    pub fn append(&self, rel: &str, line: &str) -> io::Result<()> {
        self.writer(rel)?.write_line(line)
    }

    /// Flush every writer, reporting the first error.
    pub fn flush_all(&self) -> io::Result<()> {
        let mut first_err = None;
        for entry in self.writers.iter() {
            if let Err(e) = entry.value().flush() {
                tracing::error!(path = %entry.value().path().display(), error = %e, "flush failed");
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Release the pool. Buffers are flushed; files close when the pool drops.
    pub fn close(&self) -> io::Result<()> {
        self.flush_all()
    }
}
