#![forbid(unsafe_code)]

use std::io::{ErrorKind, Read, Write};

/// Buffer size used when streaming file content in and out of an archive.
pub const COPY_BUF_LEN: usize = 64 * 1024;

// All integer fields are native-endian, matching archives produced on the same host.

pub fn write_u8(w: &mut dyn Write, v: u8) -> std::io::Result<()> {
    w.write_all(&[v])
}

pub fn write_u64(w: &mut dyn Write, v: u64) -> std::io::Result<()> {
    w.write_all(&v.to_ne_bytes())
}

pub fn u64_from_bytes(b: [u8; 8]) -> u64 {
    u64::from_ne_bytes(b)
}

/// Read until `buf` is full or the stream ends. Returns the number of bytes read.
pub fn read_full(r: &mut dyn Read, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

/// Which side of a [`copy_exact`] failed.
#[derive(Debug)]
pub enum CopyError {
    Read(std::io::Error),
    Write(std::io::Error),
    /// The reader ran dry after `copied` bytes.
    Short { copied: u64 },
}

/// Copy exactly `len` bytes from `r` to `w`, never more.
pub fn copy_exact(
    r: &mut dyn Read,
    w: &mut dyn Write,
    len: u64,
    buf: &mut [u8],
) -> Result<(), CopyError> {
    let mut copied = 0u64;
    while copied < len {
        let want = (len - copied).min(buf.len() as u64) as usize;
        let n = read_full(r, &mut buf[..want]).map_err(CopyError::Read)?;
        if n > 0 {
            w.write_all(&buf[..n]).map_err(CopyError::Write)?;
            copied += n as u64;
        }
        if n < want {
            return Err(CopyError::Short { copied });
        }
    }
    Ok(())
}

/// Reader that remembers how many bytes it has handed out.
pub struct CountingReader<R> {
    inner: R,
    pos: u64,
}

impl<R: Read> CountingReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, pos: 0 }
    }

    pub fn pos(&self) -> u64 {
        self.pos
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.pos += n as u64;
        Ok(n)
    }
}

pub fn hex32(v: &[u8; 32]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(64);
    for b in v.iter().copied() {
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0xF) as usize] as char);
    }
    out
}
