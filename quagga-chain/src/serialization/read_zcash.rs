use std::io;

use byteorder::{LittleEndian, ReadBytesExt};

/// Extends [`io::Read`] with methods for reading Zcash/Bitcoin types.
pub trait ReadZcashExt: io::Read {
    /// Reads a `u64` using the Bitcoin `CompactSize` encoding.
    #[inline]
    fn read_compactsize(&mut self) -> io::Result<u64> {
        let flag_byte = self.read_u8()?;
        match flag_byte {
            n @ 0x00..=0xfc => Ok(n as u64),
            0xfd => {
                let n = self.read_u16::<LittleEndian>()?;
                if n < 0xfd {
                    Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "non-canonical compactsize",
                    ))
                } else {
                    Ok(n as u64)
                }
            }
            0xfe => {
                let n = self.read_u32::<LittleEndian>()?;
                if n < 0x1_0000 {
                    Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "non-canonical compactsize",
                    ))
                } else {
                    Ok(n as u64)
                }
            }
            0xff => {
                let n = self.read_u64::<LittleEndian>()?;
                if n < 0x1_0000_0000 {
                    Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "non-canonical compactsize",
                    ))
                } else {
                    Ok(n)
                }
            }
        }
    }

    /// Convenience method to read a `[u8; 4]`.
    #[inline]
    fn read_4_bytes(&mut self) -> io::Result<[u8; 4]> {
        let mut bytes = [0; 4];
        self.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    /// Convenience method to read a `[u8; 32]`.
    #[inline]
    fn read_32_bytes(&mut self) -> io::Result<[u8; 32]> {
        let mut bytes = [0; 32];
        self.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    /// Convenience method to read a `[u8; 64]`.
    #[inline]
    fn read_64_bytes(&mut self) -> io::Result<[u8; 64]> {
        let mut bytes = [0; 64];
        self.read_exact(&mut bytes)?;
        Ok(bytes)
    }
}

/// Mark all types implementing `Read` as implementing the extension.
impl<R: io::Read + ?Sized> ReadZcashExt for R {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compactsize_round_trips() {
        use crate::serialization::WriteZcashExt;

        for &n in &[0u64, 1, 0xfc, 0xfd, 0xffff, 0x1_0000, 0xffff_ffff, 0x1_0000_0000] {
            let mut bytes = Vec::new();
            bytes.write_compactsize(n).unwrap();
            assert_eq!(bytes.as_slice().read_compactsize().unwrap(), n);
        }
    }

    #[test]
    fn compactsize_rejects_non_canonical() {
        // 0xfd prefix used for a value that fits in one byte
        let bytes = [0xfdu8, 0x01, 0x00];
        assert!(bytes.as_slice().read_compactsize().is_err());
    }
}
