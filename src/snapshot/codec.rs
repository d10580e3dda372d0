//! Big-endian primitives shared by the section decoders.

use std::io::{self, Read};

use crate::errors::{MetaError, MetaResult};

/// Sequential big-endian field reader over a fixed record buffer.
///
/// Callers size the buffer for the fields they pull, so reads past the end
/// are programming errors rather than input errors.
pub struct Fields<'a> {
    bytes: &'a [u8],
    at: usize,
}

impl<'a> Fields<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, at: 0 }
    }

    pub fn u8(&mut self) -> u8 {
        let value = self.bytes[self.at];
        self.at += 1;
        value
    }

    pub fn u16(&mut self) -> u16 {
        let value = u16::from_be_bytes([self.bytes[self.at], self.bytes[self.at + 1]]);
        self.at += 2;
        value
    }

    pub fn u32(&mut self) -> u32 {
        let value = u32::from_be_bytes([
            self.bytes[self.at],
            self.bytes[self.at + 1],
            self.bytes[self.at + 2],
            self.bytes[self.at + 3],
        ]);
        self.at += 4;
        value
    }

    pub fn u64(&mut self) -> u64 {
        let value = u64::from_be_bytes([
            self.bytes[self.at],
            self.bytes[self.at + 1],
            self.bytes[self.at + 2],
            self.bytes[self.at + 3],
            self.bytes[self.at + 4],
            self.bytes[self.at + 5],
            self.bytes[self.at + 6],
            self.bytes[self.at + 7],
        ]);
        self.at += 8;
        value
    }

    pub fn skip(&mut self, count: usize) {
        self.at += count;
    }
}

/// Fills `buffer` completely or reports which record was cut short.
pub fn read_exact<R: Read>(
    source: &mut R,
    buffer: &mut [u8],
    what: &'static str,
) -> MetaResult<()> {
    source
        .read_exact(buffer)
        .map_err(|err| MetaError::from_read(err, what))
}

pub fn read_u8<R: Read>(source: &mut R, what: &'static str) -> MetaResult<u8> {
    let mut byte = [0u8; 1];
    read_exact(source, &mut byte, what)?;
    Ok(byte[0])
}

pub fn read_vec<R: Read>(
    source: &mut R,
    length: usize,
    what: &'static str,
) -> MetaResult<Vec<u8>> {
    let mut buffer = vec![0u8; length];
    read_exact(source, &mut buffer, what)?;
    Ok(buffer)
}

/// Discards `count` bytes without leaving the read buffer.
pub fn skip<R: Read>(source: &mut R, count: u64, what: &'static str) -> MetaResult<()> {
    if count == 0 {
        return Ok(());
    }
    let copied = io::copy(&mut Read::take(&mut *source, count), &mut io::sink())?;
    if copied != count {
        return Err(MetaError::Truncated { what });
    }
    Ok(())
}

/// Read adapter that keeps the absolute file offset without asking the OS.
pub struct Tracked<'a, R> {
    inner: &'a mut R,
    position: u64,
}

impl<'a, R: Read> Tracked<'a, R> {
    pub fn new(inner: &'a mut R, position: u64) -> Self {
        Self { inner, position }
    }

    pub fn position(&self) -> u64 {
        self.position
    }
}

impl<R: Read> Read for Tracked<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let count = self.inner.read(buf)?;
        self.position += count as u64;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_fields_decode_big_endian() {
        let bytes = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0, 0, 0, 0, 0, 0, 0, 0x2A];
        let mut fields = Fields::new(&bytes);
        assert_eq!(fields.u8(), 0x01);
        assert_eq!(fields.u16(), 0x0203);
        assert_eq!(fields.u32(), 0x0405_0607);
        assert_eq!(fields.u64(), 0x2A);
    }

    #[test]
    fn test_short_reads_are_truncation() {
        let mut source = Cursor::new(vec![1u8, 2, 3]);
        let mut buffer = [0u8; 4];
        let err = read_exact(&mut source, &mut buffer, "edge record").unwrap_err();
        assert!(matches!(err, MetaError::Truncated { what: "edge record" }));

        let mut inner = Cursor::new(vec![0u8; 10]);
        let mut source = Tracked::new(&mut inner, 100);
        assert!(skip(&mut source, 10, "names").is_ok());
        assert_eq!(source.position(), 110);
        assert!(matches!(
            skip(&mut source, 1, "names"),
            Err(MetaError::Truncated { .. })
        ));
    }
}
