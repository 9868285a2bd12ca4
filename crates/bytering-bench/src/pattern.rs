//! Byte pattern carried through the queues during a stress run.
//!
//! The producer counts down: the byte written when `remaining` bytes are
//! still to be produced is `remaining as u8`. The consumer tracks its own
//! countdown and can check every byte without sharing state with the
//! producer.

/// Pattern byte at the point where `remaining` bytes are left.
#[inline]
pub fn pattern_byte(remaining: u64) -> u8 {
    remaining as u8
}

/// Fills `buf` with the pattern starting at `remaining`.
#[inline]
pub fn fill_pattern(buf: &mut [u8], remaining: u64) {
    for (i, b) in buf.iter_mut().enumerate() {
        *b = pattern_byte(remaining.wrapping_sub(i as u64));
    }
}

/// First byte of a checked slice that broke the pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mismatch {
    /// Index into the checked slice.
    pub offset: usize,
    /// Pattern byte expected at that index.
    pub expected: u8,
    /// Byte found there.
    pub actual: u8,
}

/// Checks that `bytes` continue the pattern at `remaining`.
#[inline]
pub fn verify_pattern(bytes: &[u8], remaining: u64) -> Result<(), Mismatch> {
    for (offset, &actual) in bytes.iter().enumerate() {
        let expected = pattern_byte(remaining.wrapping_sub(offset as u64));
        if actual != expected {
            return Err(Mismatch {
                offset,
                expected,
                actual,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_counts_down() {
        let mut buf = [0u8; 4];
        fill_pattern(&mut buf, 258);
        assert_eq!(buf, [2, 1, 0, 255]);
    }

    #[test]
    fn test_verify_reports_first_mismatch() {
        let mut buf = [0u8; 8];
        fill_pattern(&mut buf, 1000);
        assert_eq!(verify_pattern(&buf, 1000), Ok(()));

        // Continuing from the middle of the stream
        assert_eq!(verify_pattern(&buf[3..], 997), Ok(()));

        buf[5] ^= 0xFF;
        assert_eq!(
            verify_pattern(&buf, 1000),
            Err(Mismatch {
                offset: 5,
                expected: pattern_byte(995),
                actual: pattern_byte(995) ^ 0xFF,
            })
        );
    }
}
