//! Process-wide diagnostic redirection.
//!
//! Two pieces of global state are taken over once a logger is resolved:
//!
//! - the process's standard error. File descriptor 2 is pointed at a pipe
//!   whose reader thread feeds a [`StreamToLogger`] adapter, so every line
//!   written by `eprintln!`, `io::stderr()` or foreign code becomes an ERROR
//!   record;
//! - the panic hook, replaced by one that writes the raw panic report and a
//!   backtrace to the stream of the logger's primary handler.
//!
//! Handlers targeting standard error, and the last-resort output, write to a
//! copy of descriptor 2 taken before the first redirection, so a redirected
//! logger never feeds itself.
//!
//! The redirection is non-reentrant. Installing twice stacks a new pipe over
//! the previous one; only [`DiagnosticRedirection::restore`] (or dropping
//! the record) undoes an install, and only in reverse order.

use std::backtrace::Backtrace;
use std::fmt;
use std::io::{self, Write};
use std::panic::{self, PanicHookInfo};
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, warn};

use crate::error::LogError;
use crate::facility::{HandlerStream, Level, Logger};

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

/// Installs currently in effect.
static DEPTH: AtomicUsize = AtomicUsize::new(0);

/// Write to standard error as it was before any redirection.
pub(crate) fn write_real_stderr(buf: &[u8]) -> io::Result<()> {
    capture::write_real_stderr(buf)
}

/// File-like adapter that forwards writes to a logger.
pub struct StreamToLogger {
    logger: Logger,
    level: Level,
}

impl StreamToLogger {
    pub fn new(logger: Logger, level: Level) -> Self {
        Self { logger, level }
    }
}

impl Write for StreamToLogger {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        for line in text.trim_end().lines() {
            let line = line.trim_end();
            if !line.is_empty() {
                self.logger.log(self.level, line);
            }
        }
        Ok(buf.len())
    }

    /// Buffering is the logger's business.
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(unix)]
mod capture {
    use std::fs::File;
    use std::io::{self, BufRead, BufReader, Write};
    use std::os::fd::{AsFd, AsRawFd, OwnedFd};
    use std::sync::OnceLock;
    use std::thread::JoinHandle;

    use nix::unistd::{dup2, pipe};

    use super::StreamToLogger;

    static REAL_STDERR: OnceLock<Option<File>> = OnceLock::new();

    fn real_stderr() -> Option<&'static File> {
        REAL_STDERR
            .get_or_init(|| io::stderr().as_fd().try_clone_to_owned().ok().map(File::from))
            .as_ref()
    }

    pub(super) fn write_real_stderr(buf: &[u8]) -> io::Result<()> {
        match real_stderr() {
            Some(mut file) => file.write_all(buf),
            None => io::stderr().lock().write_all(buf),
        }
    }

    /// Descriptor 2 redirected into a pipe drained by a reader thread.
    pub(super) struct StderrCapture {
        saved: OwnedFd,
        reader: Option<JoinHandle<()>>,
    }

    impl StderrCapture {
        pub(super) fn install(mut adapter: StreamToLogger) -> io::Result<Self> {
            // Pin the pre-redirection descriptor before touching fd 2.
            real_stderr();

            let stderr = io::stderr();
            let saved = stderr.as_fd().try_clone_to_owned()?;
            let (read_end, write_end) = pipe()?;
            let reader = std::thread::Builder::new()
                .name("stderr-to-logger".into())
                .spawn(move || pump(File::from(read_end), &mut adapter))?;

            dup2(write_end.as_raw_fd(), stderr.as_raw_fd())?;
            drop(write_end);
            Ok(Self { saved, reader: Some(reader) })
        }

        /// Put the saved descriptor back and wait until everything written
        /// so far has been logged.
        pub(super) fn restore(mut self) -> io::Result<()> {
            dup2(self.saved.as_raw_fd(), io::stderr().as_raw_fd())?;
            // Closing the last write end above ends the reader at EOF.
            if let Some(reader) = self.reader.take() {
                let _ = reader.join();
            }
            Ok(())
        }
    }

    fn pump(source: File, adapter: &mut StreamToLogger) {
        let mut reader = BufReader::new(source);
        let mut line = Vec::new();
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let _ = adapter.write(&line);
                }
            }
        }
    }
}

#[cfg(not(unix))]
mod capture {
    use std::io::{self, Write};

    use super::StreamToLogger;

    pub(super) fn write_real_stderr(buf: &[u8]) -> io::Result<()> {
        io::stderr().lock().write_all(buf)
    }

    pub(super) struct StderrCapture;

    impl StderrCapture {
        pub(super) fn install(_adapter: StreamToLogger) -> io::Result<Self> {
            Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "standard error redirection needs a unix platform",
            ))
        }

        pub(super) fn restore(self) -> io::Result<()> {
            Ok(())
        }
    }
}

use capture::StderrCapture;

/// Stream the panic hook writes to: the first attached handler exposing a
/// stream, else standard output. Resolved once, at install time.
pub fn exception_stream(logger: &Logger) -> HandlerStream {
    logger
        .handlers()
        .iter()
        .find_map(|h| h.stream_handle().cloned())
        .unwrap_or(HandlerStream::Stdout)
}

fn panic_report(info: &PanicHookInfo<'_>) -> String {
    let thread = std::thread::current();
    let name = thread.name().unwrap_or("<unnamed>");
    let payload = info
        .payload()
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| info.payload().downcast_ref::<String>().map(String::as_str))
        .unwrap_or("Box<dyn Any>");
    let location = info
        .location()
        .map(|l| l.to_string())
        .unwrap_or_else(|| "<unknown>".into());
    let backtrace = Backtrace::force_capture();

    format!("thread '{name}' panicked at {location}:\n{payload}\nstack backtrace:\n{backtrace}\n")
}

/// Record of an installed redirection and of the state it replaced.
pub struct DiagnosticRedirection {
    capture: Option<StderrCapture>,
    previous_hook: Option<PanicHook>,
    stream: HandlerStream,
}

impl DiagnosticRedirection {
    /// Redirect standard error and the panic hook to `logger`.
    pub fn install(logger: &Logger) -> Result<Self, LogError> {
        if DEPTH.load(Ordering::SeqCst) > 0 {
            warn!(logger = logger.name(), "stderr already redirected; stacking a new pipe");
        }
        let capture = StderrCapture::install(StreamToLogger::new(logger.clone(), Level::ERROR))?;
        DEPTH.fetch_add(1, Ordering::SeqCst);

        let stream = exception_stream(logger);
        let hook_stream = stream.clone();
        let previous_hook = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            // The panicking thread may hold the stream's lock already.
            let _ = hook_stream.try_emit(panic_report(info).as_bytes());
        }));

        debug!(logger = logger.name(), stream = ?stream, "diagnostic redirection installed");
        Ok(Self {
            capture: Some(capture),
            previous_hook: Some(previous_hook),
            stream,
        })
    }

    /// The stream the panic hook writes to.
    pub fn exception_stream(&self) -> &HandlerStream {
        &self.stream
    }

    /// Put the previous standard error and panic hook back. Returns once
    /// every line written before the call has reached the logger.
    pub fn restore(mut self) {
        self.release();
    }

    /// Keep the redirection for the rest of the process.
    pub fn persist(mut self) {
        self.capture = None;
        self.previous_hook = None;
    }

    fn release(&mut self) {
        if let Some(capture) = self.capture.take() {
            if let Err(e) = capture.restore() {
                let _ = write_real_stderr(format!("cannot restore stderr: {e}\n").as_bytes());
            }
            DEPTH.fetch_sub(1, Ordering::SeqCst);
        }
        // The panic hook cannot be swapped from a panicking thread.
        if std::thread::panicking() {
            return;
        }
        if let Some(hook) = self.previous_hook.take() {
            panic::set_hook(hook);
        }
    }
}

impl fmt::Debug for DiagnosticRedirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiagnosticRedirection")
            .field("stream", &self.stream)
            .field("active", &self.capture.is_some())
            .finish()
    }
}

impl Drop for DiagnosticRedirection {
    fn drop(&mut self) {
        self.release();
    }
}
