// Copyright (c) 2025 Cloudflare, Inc.
// Licensed under the BSD-3-Clause license found in the LICENSE file or at https://opensource.org/licenses/BSD-3-Clause

//! Big-endian length-prefixed byte strings, as used by TLS presentation
//! language encodings (`opaque data<0..2^(8*nbytes)-1>`).

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Error, ErrorKind, Read, Result, Write};

/// Returns the largest length representable in an `nbytes`-byte prefix.
fn max_length(nbytes: usize) -> u64 {
    if nbytes >= 8 {
        u64::MAX
    } else {
        (1u64 << (8 * nbytes)) - 1
    }
}

pub trait ReadLengthPrefixedBytesExt: Read {
    /// Reads an `nbytes`-byte big-endian length followed by that many bytes.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Read::read_exact`], or
    /// [`ErrorKind::InvalidData`] if the length does not fit in memory.
    ///
    /// # Panics
    ///
    /// `read_uint` requires that `1 <= nbytes <= 8`, and will panic otherwise.
    #[inline]
    fn read_length_prefixed(&mut self, nbytes: usize) -> Result<Vec<u8>> {
        let length = self.read_uint::<BigEndian>(nbytes)?;
        let expected = usize::try_from(length)
            .map_err(|_| Error::new(ErrorKind::InvalidData, "length prefix too large"))?;
        let mut buffer = Vec::new();
        Read::take(&mut *self, length).read_to_end(&mut buffer)?;
        if buffer.len() != expected {
            return Err(Error::from(ErrorKind::UnexpectedEof));
        }
        Ok(buffer)
    }
}

impl<R: Read + ?Sized> ReadLengthPrefixedBytesExt for R {}

pub trait WriteLengthPrefixedBytesExt: Write {
    /// Writes `data` preceded by its length as an `nbytes`-byte big-endian integer.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidInput`] if `data` is too long for the prefix,
    /// and otherwise the same errors as [`Write::write_all`].
    ///
    /// # Panics
    ///
    /// `write_uint` requires that `1 <= nbytes <= 8`, and will panic otherwise.
    #[inline]
    fn write_length_prefixed(&mut self, data: &[u8], nbytes: usize) -> Result<()> {
        let length = data.len() as u64;
        if length > max_length(nbytes) {
            return Err(Error::new(
                ErrorKind::InvalidInput,
                format!("{length} bytes do not fit a {nbytes}-byte length prefix"),
            ));
        }
        self.write_uint::<BigEndian>(length, nbytes)?;
        self.write_all(data)
    }
}

impl<W: Write + ?Sized> WriteLengthPrefixedBytesExt for W {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_prefix_widths() {
        let mut buf = Vec::new();
        buf.write_length_prefixed(b"abc", 3).unwrap();
        assert_eq!(buf, [0, 0, 3, b'a', b'b', b'c']);

        buf.clear();
        buf.write_length_prefixed(&[], 2).unwrap();
        assert_eq!(buf, [0, 0]);
    }

    #[test]
    fn test_write_too_long() {
        let mut buf = Vec::new();
        let err = buf.write_length_prefixed(&[0; 256], 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(buf.is_empty());
        buf.write_length_prefixed(&[0; 255], 1).unwrap();
        assert_eq!(buf.len(), 256);
    }

    #[test]
    fn test_read() {
        let data = [0, 2, 7, 8, 9];
        let mut reader = &data[..];
        assert_eq!(reader.read_length_prefixed(2).unwrap(), [7, 8]);
        assert_eq!(reader, [9]);
    }

    #[test]
    fn test_read_truncated() {
        let data = [0, 0, 5, 1, 2];
        let err = (&data[..]).read_length_prefixed(3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    }
}
