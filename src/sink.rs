use std::fs::File;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Byte-oriented destination for encoded log lines.
///
/// The core shares one sink between every derived core and calls it from
/// whatever thread emitted the event, without any locking of its own.
/// Implementations must therefore serialize concurrent `write` calls so
/// that lines never interleave.
pub trait WriteSyncer: Send + Sync {
    /// Append one encoded line.
    ///
    /// **Returns**
    /// - `Ok(n)` with the number of bytes accepted.
    /// - `Err(..)` if the destination rejected the bytes. The core does not
    ///   retry.
    fn write(&self, buf: &[u8]) -> io::Result<usize>;

    /// Flush anything buffered by the destination.
    fn sync(&self) -> io::Result<()>;
}

impl<T: WriteSyncer + ?Sized> WriteSyncer for Arc<T> {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        (**self).write(buf)
    }

    fn sync(&self) -> io::Result<()> {
        (**self).sync()
    }
}

/// Serializes access to any [`io::Write`] behind a mutex; `sync` maps to
/// [`Write::flush`].
#[derive(Debug, Default)]
pub struct LockedWriter<W> {
    inner: Mutex<W>,
}

impl<W: Write + Send> LockedWriter<W> {
    pub fn new(inner: W) -> Self {
        LockedWriter { inner: Mutex::new(inner) }
    }

    pub fn into_inner(self) -> W {
        match self.inner.into_inner() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, W> {
        // A panic in another writer leaves the bytes as they were.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> WriteSyncer for LockedWriter<W> {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self.lock();
        guard.write_all(buf)?;
        Ok(buf.len())
    }

    fn sync(&self) -> io::Result<()> {
        self.lock().flush()
    }
}

/// File-backed sink whose `sync` commits data to the device.
///
/// On stdout/stderr this is where the platform-specific flush errors come
/// from; see [`crate::sync_error`].
#[derive(Debug)]
pub struct FileSink {
    file: Mutex<File>,
}

impl FileSink {
    pub fn new(file: File) -> Self {
        FileSink { file: Mutex::new(file) }
    }

    /// A sink over a duplicate of the process's stdout descriptor.
    #[cfg(unix)]
    pub fn stdout() -> io::Result<Self> {
        use std::os::fd::AsFd;

        let fd = io::stdout().as_fd().try_clone_to_owned()?;
        Ok(FileSink::new(File::from(fd)))
    }

    /// A sink over a duplicate of the process's stderr descriptor.
    #[cfg(unix)]
    pub fn stderr() -> io::Result<Self> {
        use std::os::fd::AsFd;

        let fd = io::stderr().as_fd().try_clone_to_owned()?;
        Ok(FileSink::new(File::from(fd)))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, File> {
        self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl WriteSyncer for FileSink {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        self.lock().write_all(buf)?;
        Ok(buf.len())
    }

    fn sync(&self) -> io::Result<()> {
        self.lock().sync_all()
    }
}

/// Adapter for sinks without a meaningful flush: writes go through,
/// `sync` always succeeds.
#[derive(Debug, Default, Clone)]
pub struct NopSync<W> {
    inner: W,
}

impl<W> NopSync<W> {
    pub fn new(inner: W) -> Self {
        NopSync { inner }
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }
}

impl<W: Write + Send> NopSync<LockedWriter<W>> {
    /// Wrap a raw byte writer: writes are serialized, flushes never reach it.
    pub fn writer(inner: W) -> Self {
        NopSync::new(LockedWriter::new(inner))
    }
}

impl<W: WriteSyncer> WriteSyncer for NopSync<W> {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf)
    }

    fn sync(&self) -> io::Result<()> {
        Ok(())
    }
}

/// A sink that simply drops all bytes.
///
/// Useful for measuring the overhead of the core itself without any I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl WriteSyncer for Discard {
    fn write(&self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn sync(&self) -> io::Result<()> {
        Ok(())
    }
}
