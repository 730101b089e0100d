//! Durable storage of the registry
//!
//! The registry is written to a single sink (normally the state file) by a
//! dedicated background thread. Request handlers never touch the sink; they
//! only send flush signals through a [`Flusher`], and the [`Throttler`]
//! decides whether enough time passed since the last write to rewrite the
//! whole registry.

mod throttler;

pub use throttler::{Flusher, Throttle, ThrottleState, Throttler, FLUSH_QUEUE_CAPACITY};

use std::fs::File;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};

use crate::errors::Result;
use crate::registry::Registry;

/// Something that can serialize its full state to a writer
pub trait Dumper: Send + Sync {
    /// Returns the number of bytes written
    fn dump(&self, w: &mut dyn Write) -> Result<usize>;
}

/// Something that can merge state read from a reader
pub trait Loader {
    fn load(&self, r: &mut dyn Read) -> Result<()>;
}

/// A rewindable, truncatable byte store
pub trait Sink: Read + Write + Seek + Send {
    fn truncate(&mut self, len: u64) -> io::Result<()>;

    /// Push written bytes to durable storage
    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Dumper for Registry {
    fn dump(&self, w: &mut dyn Write) -> Result<usize> {
        Registry::dump(self, w)
    }
}

impl Loader for Registry {
    fn load(&self, r: &mut dyn Read) -> Result<()> {
        Registry::load(self, r)
    }
}

impl Sink for File {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }

    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

impl Sink for Cursor<Vec<u8>> {
    fn truncate(&mut self, len: u64) -> io::Result<()> {
        let len = usize::try_from(len).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        self.get_mut().truncate(len);
        Ok(())
    }
}

/// Rewind `src` and merge its content into `dst`
///
/// Used once at startup, before the throttler takes ownership of the sink.
pub fn load<S, L>(src: &mut S, dst: &L) -> Result<()>
where
    S: Read + Seek,
    L: Loader + ?Sized,
{
    src.seek(SeekFrom::Start(0))?;
    dst.load(src)
}

/// Replace the sink's content with a fresh dump
pub(crate) fn rewrite<D, S>(src: &D, dst: &mut S) -> Result<usize>
where
    D: Dumper + ?Sized,
    S: Sink,
{
    dst.seek(SeekFrom::Start(0))?;
    dst.truncate(0)?;
    let wrote = src.dump(&mut *dst)?;
    dst.flush()?;
    dst.sync()?;
    Ok(wrote)
}
