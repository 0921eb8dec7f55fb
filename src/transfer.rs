//! Chunked copying between two byte streams.
//!
//! A transfer reads [`CHUNK_SIZE`] bytes from the source, writes them to the destination
//! and reports a [`Progress`] for that chunk before reading the next one. Nothing is
//! verified or retried here: the first failing read, write or progress report ends the
//! transfer and the error is handed back to the caller unchanged.
use std::io::{self, ErrorKind, Read, Write};

use log::trace;

const MIB: usize = 1024 * 1024;

/// Bytes moved per read/write round trip.
pub const CHUNK_SIZE: usize = 4 * MIB;

/// Counters reported after each chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress<'a> {
    pub oid: &'a str,
    pub bytes_so_far: u64,
    pub bytes_since_last: u64,
}

/// Copies `source` into `destination` in [`CHUNK_SIZE`] chunks, calling `on_progress`
/// after every chunk. Returns the number of bytes copied.
pub fn transfer<R, W, F, E>(
    oid: &str,
    source: &mut R,
    destination: &mut W,
    on_progress: F,
) -> Result<u64, E>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
    F: FnMut(&Progress<'_>) -> Result<(), E>,
    E: From<io::Error>,
{
    transfer_with_chunk_size(oid, source, destination, CHUNK_SIZE, on_progress)
}

/// Like [`transfer`], with an explicit chunk size. A zero chunk size is rejected with
/// [`ErrorKind::InvalidInput`] before anything is read.
pub fn transfer_with_chunk_size<R, W, F, E>(
    oid: &str,
    source: &mut R,
    destination: &mut W,
    chunk_size: usize,
    mut on_progress: F,
) -> Result<u64, E>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
    F: FnMut(&Progress<'_>) -> Result<(), E>,
    E: From<io::Error>,
{
    if chunk_size == 0 {
        return Err(io::Error::new(ErrorKind::InvalidInput, "chunk size must not be zero").into());
    }

    let mut buf = vec![0u8; chunk_size];
    let mut total = 0u64;

    loop {
        let len = read_chunk(source, &mut buf)?;
        if len == 0 {
            break;
        }

        destination.write_all(&buf[..len])?;
        total += len as u64;
        trace!("{oid}: {total} bytes transferred");

        on_progress(&Progress {
            oid,
            bytes_so_far: total,
            bytes_since_last: len as u64,
        })?;

        if len < chunk_size {
            break;
        }
    }

    destination.flush()?;
    Ok(total)
}

/// Fills `buf` from `source`. Anything shorter than `buf` means the source is exhausted.
fn read_chunk<R: Read + ?Sized>(source: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
