//! SHA-256d, a double round of SHA-256.

use std::io;

use sha2::{Digest, Sha256};

/// A type that lets you write out SHA-256d (double SHA-256) digests.
#[derive(Default)]
pub struct Writer {
    hash: Sha256,
}

impl io::Write for Writer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.hash.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Writer {
    /// Consume the Writer and produce the hash result.
    pub fn finish(self) -> [u8; 32] {
        let result1 = self.hash.finalize();
        let result2 = Sha256::digest(&result1);
        let mut buffer = [0u8; 32];
        buffer[0..32].copy_from_slice(&result2[0..32]);
        buffer
    }
}

/// Compute the SHA-256d digest of `data` in one call.
pub fn digest(data: &[u8]) -> [u8; 32] {
    use io::Write;

    let mut writer = Writer::default();
    writer.write_all(data).expect("writer is infallible");
    writer.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_hash_matches_two_single_rounds() {
        let once = Sha256::digest(b"quagga");
        let twice = Sha256::digest(&once);

        assert_eq!(digest(b"quagga")[..], twice[..]);
    }
}
