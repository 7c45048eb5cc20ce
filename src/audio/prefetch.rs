//! Double-buffered file reader for canonical PCM artifacts.
//!
//! The consumer drains one chunk while the next is read from disk in the
//! background, so sequential reads only touch the filesystem at a chunk
//! swap that catches the background load mid-read.

use crate::constants::{CHUNK_SIZE, CHUNK_SWAP_TIMEOUT};
use bytes::Bytes;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;

/// The chunk behind the active one. `Loading` holds the file handle hostage
/// in the loader thread until the chunk (and the handle) come back over the
/// channel; dropping the reader mid-load just drops the receiver, and the
/// loader thread discards both on its way out.
enum Passive {
    Ready(Bytes),
    Loading(Receiver<(File, io::Result<Bytes>)>),
    Exhausted,
}

/// Read-only byte stream over a raw PCM file, double-buffered ahead of the
/// consumer. A read shorter than requested means end-of-stream; no further
/// data will ever be produced.
pub struct PrefetchingReader {
    path: PathBuf,
    /// None while a background load owns the handle.
    file: Option<File>,
    len: u64,
    /// Bytes handed to chunks so far (the file cursor position).
    loaded: u64,
    active: Bytes,
    active_pos: usize,
    passive: Passive,
    /// False until the file has been opened and measured. Open errors at
    /// construction defer initialization to the first read.
    initialized: bool,
    background_loads: usize,
}

impl PrefetchingReader {
    /// Opens `path` and synchronously loads the first chunk (and the second,
    /// when the file is larger than one chunk). Never fails: if the file
    /// cannot be opened right now, initialization is retried on first use
    /// and only a persistent failure surfaces there.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let mut reader = PrefetchingReader {
            path: path.as_ref().to_path_buf(),
            file: None,
            len: 0,
            loaded: 0,
            active: Bytes::new(),
            active_pos: 0,
            passive: Passive::Exhausted,
            initialized: false,
            background_loads: 0,
        };

        if let Err(e) = reader.initialize() {
            debug!(
                "Deferring open of {}: {e}",
                reader.path.display()
            );
        }

        reader
    }

    fn initialize(&mut self) -> io::Result<()> {
        let mut file = File::open(&self.path)?;
        self.len = file.metadata()?.len();

        self.active = read_chunk(&mut file, CHUNK_SIZE)?;
        self.active_pos = 0;
        self.loaded = self.active.len() as u64;

        self.passive = if self.loaded < self.len {
            let chunk = read_chunk(&mut file, CHUNK_SIZE)?;
            self.loaded += chunk.len() as u64;
            Passive::Ready(chunk)
        } else {
            Passive::Exhausted
        };

        self.file = Some(file);
        self.initialized = true;
        Ok(())
    }

    /// Total length of the underlying file in bytes. Triggers the deferred
    /// open when construction could not complete it.
    pub fn len(&mut self) -> io::Result<u64> {
        if !self.initialized {
            self.initialize()?;
        }
        Ok(self.len)
    }

    pub fn is_empty(&mut self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Number of background chunk loads started so far (for diagnostics).
    pub fn background_loads(&self) -> usize {
        self.background_loads
    }

    /// Reads into `buf`, crossing chunk boundaries as needed. Returns the
    /// number of bytes filled; anything short of `buf.len()` means the file
    /// is exhausted.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.initialized {
            self.initialize()?;
        }

        let mut filled = 0;

        loop {
            let available = self.active.len() - self.active_pos;
            let take = available.min(buf.len() - filled);
            buf[filled..filled + take]
                .copy_from_slice(&self.active[self.active_pos..self.active_pos + take]);
            self.active_pos += take;
            filled += take;

            if filled == buf.len() || !self.swap_chunks()? {
                return Ok(filled);
            }
        }
    }

    /// Retires the drained active chunk and promotes the passive one,
    /// kicking off the next background load. Returns false once the file
    /// has nothing further to offer.
    fn swap_chunks(&mut self) -> io::Result<bool> {
        let passive = std::mem::replace(&mut self.passive, Passive::Exhausted);

        let chunk = match passive {
            Passive::Ready(chunk) => chunk,
            Passive::Loading(rx) => {
                // A swap caught the background load mid-read: wait for it,
                // bounded. Serving a half-loaded chunk is never an option.
                let (file, result) = rx.recv_timeout(CHUNK_SWAP_TIMEOUT).map_err(|e| match e {
                    RecvTimeoutError::Timeout => io::Error::new(
                        io::ErrorKind::TimedOut,
                        format!("chunk load of {} timed out", self.path.display()),
                    ),
                    RecvTimeoutError::Disconnected => io::Error::new(
                        io::ErrorKind::BrokenPipe,
                        format!("chunk loader for {} died", self.path.display()),
                    ),
                })?;
                self.file = Some(file);
                let chunk = result?;
                self.loaded += chunk.len() as u64;
                chunk
            }
            Passive::Exhausted => return Ok(false),
        };

        if chunk.is_empty() {
            return Ok(false);
        }

        self.active = chunk;
        self.active_pos = 0;
        self.start_background_load();
        Ok(true)
    }

    /// Starts loading the next chunk on a separate thread. At most one load
    /// is ever in flight; the handle travels with it and comes back on the
    /// reply channel. An empty chunk coming back marks exhaustion at the
    /// following swap.
    fn start_background_load(&mut self) {
        let Some(mut file) = self.file.take() else {
            // Handle already out with a loader; keep whatever passive state
            // we have. Structurally this does not happen.
            return;
        };

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let result = read_chunk(&mut file, CHUNK_SIZE);
            // A failed send means the reader was dropped; the chunk and the
            // file handle are released right here.
            let _ = tx.send((file, result));
        });

        self.passive = Passive::Loading(rx);
        self.background_loads += 1;
    }
}

impl Read for PrefetchingReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_bytes(buf)
    }
}

/// Reads up to `max` bytes from the file's current position. Returns fewer
/// only at end of file.
fn read_chunk(file: &mut File, max: usize) -> io::Result<Bytes> {
    let mut buf = vec![0u8; max];
    let mut filled = 0;

    while filled < max {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    buf.truncate(filled);
    Ok(buf.into())
}
