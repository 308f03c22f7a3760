//! Handlers: named sinks with their own level and formatter.
//!
//! A handler renders each record through its [`Formatter`] and writes the
//! line straight to its [`HandlerStream`]. Nothing here goes through the
//! `tracing` dispatcher, so handlers can be driven from inside a `tracing`
//! layer on any thread.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, TryLockError};

use super::format::Formatter;
use super::level::Level;
use crate::error::LogError;
use crate::redirect;

pub const FILE_HANDLER: &str = "logging.FileHandler";
pub const STREAM_HANDLER: &str = "logging.StreamHandler";
pub const NULL_HANDLER: &str = "logging.NullHandler";

/// Backing output stream of a handler.
///
/// Cloning shares the underlying file, so the panic hook and the handler
/// write through the same descriptor. `Stderr` is the process's standard
/// error as it was before any diagnostic redirection.
#[derive(Debug, Clone)]
pub enum HandlerStream {
    File(Arc<Mutex<File>>),
    Stdout,
    Stderr,
}

impl HandlerStream {
    /// Write all of `buf`, waiting for the file lock if needed.
    pub fn emit(&self, buf: &[u8]) -> io::Result<()> {
        match self {
            HandlerStream::File(file) => {
                let mut guard = file.lock().unwrap_or_else(PoisonError::into_inner);
                guard.write_all(buf)?;
                guard.flush()
            }
            HandlerStream::Stdout => {
                let mut out = io::stdout().lock();
                out.write_all(buf)?;
                out.flush()
            }
            HandlerStream::Stderr => redirect::write_real_stderr(buf),
        }
    }

    /// Like [`HandlerStream::emit`], but never blocks on the file lock.
    /// When the lock is held (by this thread or another) the bytes go to
    /// standard output instead.
    pub fn try_emit(&self, buf: &[u8]) -> io::Result<()> {
        match self {
            HandlerStream::File(file) => match file.try_lock() {
                Ok(mut guard) => {
                    guard.write_all(buf)?;
                    guard.flush()
                }
                Err(TryLockError::Poisoned(poisoned)) => {
                    let mut guard = poisoned.into_inner();
                    guard.write_all(buf)?;
                    guard.flush()
                }
                Err(TryLockError::WouldBlock) => HandlerStream::Stdout.emit(buf),
            },
            other => other.emit(buf),
        }
    }
}

impl Write for HandlerStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.emit(buf)?;
        Ok(buf.len())
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.emit(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// `FileHandler` open mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileMode {
    #[default]
    Append,
    Truncate,
}

impl FileMode {
    pub fn parse(mode: &str) -> Result<FileMode, LogError> {
        match mode {
            "a" => Ok(FileMode::Append),
            "w" => Ok(FileMode::Truncate),
            other => Err(LogError::ConfigApply(format!("unsupported file mode '{other}'"))),
        }
    }
}

#[derive(Debug, Clone)]
enum Kind {
    File(PathBuf),
    Stream,
    Null,
}

/// One record as handed to a handler.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Record<'a> {
    pub logger: &'a str,
    pub level: Level,
    pub message: &'a str,
}

pub struct Handler {
    name: String,
    level: Level,
    kind: Kind,
    stream: Option<HandlerStream>,
    formatter: Formatter,
}

impl Handler {
    /// Open `path` and build a file handler over it.
    pub fn file(
        name: &str,
        path: &Path,
        mode: FileMode,
        level: Level,
        formatter: Formatter,
    ) -> Result<Self, LogError> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(mode == FileMode::Append)
            .truncate(mode == FileMode::Truncate)
            .open(path)
            .map_err(|e| {
                LogError::ConfigApply(format!(
                    "handler '{name}': cannot open log file '{}': {e}",
                    path.display()
                ))
            })?;
        let stream = HandlerStream::File(Arc::new(Mutex::new(file)));
        Ok(Self::with_stream(name, Kind::File(path.to_path_buf()), stream, level, formatter))
    }

    /// A handler writing to the process's standard output or standard error.
    pub fn stream(name: &str, stream: HandlerStream, level: Level, formatter: Formatter) -> Self {
        Self::with_stream(name, Kind::Stream, stream, level, formatter)
    }

    /// A handler that discards every record and exposes no stream.
    pub fn null(name: &str, level: Level) -> Self {
        Self {
            name: name.to_owned(),
            level,
            kind: Kind::Null,
            stream: None,
            formatter: Formatter::default(),
        }
    }

    fn with_stream(
        name: &str,
        kind: Kind,
        stream: HandlerStream,
        level: Level,
        formatter: Formatter,
    ) -> Self {
        Self {
            name: name.to_owned(),
            level,
            kind,
            stream: Some(stream),
            formatter,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn class_name(&self) -> &'static str {
        match self.kind {
            Kind::File(_) => FILE_HANDLER,
            Kind::Stream => STREAM_HANDLER,
            Kind::Null => NULL_HANDLER,
        }
    }

    pub fn filename(&self) -> Option<&Path> {
        match &self.kind {
            Kind::File(path) => Some(path),
            _ => None,
        }
    }

    /// The handler's backing stream, if it writes to one.
    pub fn stream_handle(&self) -> Option<&HandlerStream> {
        self.stream.as_ref()
    }

    pub(crate) fn handle(&self, record: &Record<'_>) {
        if record.level < self.level {
            return;
        }
        let Some(stream) = &self.stream else {
            return;
        };
        let mut line = self.formatter.render(record);
        line.push('\n');
        // Logging must never fail the caller.
        let _ = stream.emit(line.as_bytes());
    }
}

impl std::fmt::Debug for Handler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handler")
            .field("name", &self.name)
            .field("class", &self.class_name())
            .field("level", &self.level)
            .field("filename", &self.filename())
            .finish()
    }
}
