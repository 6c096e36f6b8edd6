//! Growable response buffers.
//!
//! A [`ResponseBuffer`] keeps a logical `size`/`capacity` split so a handle
//! can be reused across transfers without reallocating. Capacity grows
//! geometrically from a fixed seed (see [`grown_capacity`]) and only shrinks on
//! an explicit [`ResponseBuffer::clear`]. Content is always followed by a NUL
//! terminator once storage exists, so a C-string view is always available.
//!
//! Callers never borrow the live storage; [`ResponseBuffer::snapshot`] and
//! [`ResponseBuffer::copy_from`] hand out independent copies.

use crate::base::neterror::NetError;
use bytes::Bytes;
use std::ffi::CStr;

/// Seed capacity of a body buffer.
pub const BODY_SEED_CAPACITY: usize = 4096;

/// Seed capacity of a header buffer.
pub const HEADER_SEED_CAPACITY: usize = 2048;

/// Computes the capacity needed to hold `needed` bytes.
///
/// Returns `current` unchanged when it already fits. Otherwise starts from
/// `seed` (when `current` is zero) or `current * 2` and keeps doubling.
/// Returns `None` on arithmetic overflow.
pub fn grown_capacity(current: usize, seed: usize, needed: usize) -> Option<usize> {
    if needed <= current {
        return Some(current);
    }
    let mut capacity = if current == 0 {
        seed.max(1)
    } else {
        current.checked_mul(2)?
    };
    while capacity < needed {
        capacity = capacity.checked_mul(2)?;
    }
    Some(capacity)
}

/// Byte buffer with explicit size/capacity bookkeeping.
#[derive(Debug, Clone)]
pub struct ResponseBuffer {
    // Holds `size` content bytes plus the terminator once capacity > 0.
    data: Vec<u8>,
    size: usize,
    capacity: usize,
    seed: usize,
}

impl ResponseBuffer {
    /// Create an empty buffer that grows from `seed`.
    pub fn with_seed(seed: usize) -> Self {
        Self {
            data: Vec::new(),
            size: 0,
            capacity: 0,
            seed,
        }
    }

    /// Create an empty body buffer.
    pub fn body() -> Self {
        Self::with_seed(BODY_SEED_CAPACITY)
    }

    /// Create an empty header buffer.
    pub fn headers() -> Self {
        Self::with_seed(HEADER_SEED_CAPACITY)
    }

    /// Append bytes, growing capacity if `size + len + 1` does not fit.
    pub fn append(&mut self, bytes: &[u8]) -> Result<(), NetError> {
        let needed = self
            .size
            .checked_add(bytes.len())
            .and_then(|n| n.checked_add(1))
            .ok_or(NetError::OutOfMemory("response buffer"))?;

        if needed > self.capacity {
            let capacity = grown_capacity(self.capacity, self.seed, needed)
                .ok_or(NetError::OutOfMemory("response buffer"))?;
            let additional = capacity - self.data.len();
            self.data
                .try_reserve_exact(additional)
                .map_err(|_| NetError::OutOfMemory("response buffer"))?;
            tracing::trace!(from = self.capacity, to = capacity, "response buffer grown");
            self.capacity = capacity;
        }

        self.data.truncate(self.size);
        self.data.extend_from_slice(bytes);
        self.data.push(0);
        self.size += bytes.len();
        Ok(())
    }

    /// Forget the content but keep the capacity.
    pub fn truncate(&mut self) {
        self.size = 0;
        self.data.clear();
        if self.capacity > 0 {
            self.data.push(0);
        }
    }

    /// Forget the content and release the storage.
    pub fn clear(&mut self) {
        self.data = Vec::new();
        self.size = 0;
        self.capacity = 0;
    }

    /// Number of content bytes.
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Logical capacity, always a power-of-two multiple of the seed or zero.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn seed(&self) -> usize {
        self.seed
    }

    /// Borrow the content bytes.
    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.data[..self.size]
    }

    /// Independent copy of the content.
    pub fn snapshot(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_bytes())
    }

    /// Independent copy of the content from `offset` to the end.
    ///
    /// Empty when `offset` is at or past the end.
    pub fn copy_from(&self, offset: usize) -> Bytes {
        if offset >= self.size {
            return Bytes::new();
        }
        Bytes::copy_from_slice(&self.data[offset..self.size])
    }

    /// C-string view up to the first NUL byte.
    pub fn as_c_str(&self) -> &CStr {
        if self.data.is_empty() {
            return <&CStr>::default();
        }
        CStr::from_bytes_until_nul(&self.data).unwrap_or_default()
    }
}

impl Default for ResponseBuffer {
    fn default() -> Self {
        Self::body()
    }
}

/// Header buffer that detects the blank line ending the header section.
#[derive(Debug, Clone)]
pub struct HeaderBuffer {
    buffer: ResponseBuffer,
    complete: bool,
    // The block being received started with a 1xx status line.
    interim: bool,
}

impl Default for HeaderBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaderBuffer {
    pub fn new() -> Self {
        Self {
            buffer: ResponseBuffer::headers(),
            complete: false,
            interim: false,
        }
    }

    /// Append a header chunk.
    ///
    /// Returns `true` only for the append that completed the header section:
    /// the first `"\r\n"` chunk since the last reset that ends a final
    /// (non-1xx) header block. Interim blocks such as `100 Continue` never
    /// complete the section.
    pub fn append(&mut self, chunk: &[u8]) -> Result<bool, NetError> {
        self.buffer.append(chunk)?;
        if is_status_line(chunk) {
            self.interim = is_interim_status(chunk);
            return Ok(false);
        }
        if chunk != b"\r\n" {
            return Ok(false);
        }
        if self.interim {
            self.interim = false;
            return Ok(false);
        }
        if !self.complete {
            self.complete = true;
            tracing::trace!(len = self.buffer.len(), "response headers complete");
            return Ok(true);
        }
        Ok(false)
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Clear the completion flag without touching the content.
    pub fn reset_complete(&mut self) {
        self.complete = false;
    }

    /// Forget content and completion, keep capacity.
    pub fn truncate(&mut self) {
        self.buffer.truncate();
        self.complete = false;
        self.interim = false;
    }

    /// Forget content and completion, release storage.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.complete = false;
        self.interim = false;
    }

    pub fn buffer(&self) -> &ResponseBuffer {
        &self.buffer
    }
}

fn is_status_line(chunk: &[u8]) -> bool {
    chunk.starts_with(b"HTTP/")
}

/// `HTTP/x.y 1xx ...`
fn is_interim_status(line: &[u8]) -> bool {
    let code = line
        .split(|&b| b == b' ')
        .filter(|part| !part.is_empty())
        .nth(1)
        .unwrap_or_default();
    code.len() >= 3 && code[0] == b'1' && code[..3].iter().all(u8::is_ascii_digit)
}
