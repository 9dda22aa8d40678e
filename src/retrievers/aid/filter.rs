//! Byte-level filter applied to web-service bodies before XML parsing.
use std::io::{self, Read};

/// `Read` adaptor replacing control bytes (< 0x20) other than TAB, LF and CR by a
/// space. Such bytes are not allowed in XML 1.0 documents and would abort parsing.
pub struct ControlByteFilter<R> {
    inner: R,
}

impl<R: Read> ControlByteFilter<R> {
    pub fn new(inner: R) -> Self {
        ControlByteFilter { inner }
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

#[inline]
fn filter_byte(b: u8) -> u8 {
    match b {
        b'\t' | b'\n' | b'\r' => b,
        0..=0x1f => b' ',
        _ => b,
    }
}

impl<R: Read> Read for ControlByteFilter<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        buf[..n].iter_mut().for_each(|b| *b = filter_byte(*b));
        Ok(n)
    }
}
