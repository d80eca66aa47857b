//! Strict HTTP Range header parsing.
//!
//! Only single-range `bytes=` specs are accepted; anything else is the
//! caller's 400. The parser clamps the end against the file size but never
//! the start, so an out-of-bounds seek is rejected instead of silently
//! rewound.

/// An inclusive, validated byte window within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    /// First byte, inclusive.
    pub start: u64,
    /// Last byte, inclusive.
    pub end: u64,
}

impl ByteRange {
    /// Number of bytes the window covers.
    pub fn content_length(&self) -> u64 {
        self.end - self.start + 1
    }

    /// `Content-Range` header value for this window.
    pub fn content_range(&self, file_size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, file_size)
    }
}

/// Errors from Range header parsing. Both map to HTTP 400.
#[derive(Debug, thiserror::Error)]
pub enum RangeError {
    /// The header is not a well-formed single `bytes=` spec.
    #[error("malformed Range header: {header}")]
    Malformed {
        /// The offending header value.
        header: String,
    },

    /// The spec parsed but cannot be satisfied against the file.
    #[error("unsatisfiable Range: {header}")]
    Unsatisfiable {
        /// The offending header value.
        header: String,
    },
}

/// Parses a `Range` header value against a file of `file_size` bytes.
///
/// Accepted forms, per RFC 9110 minus multi-range:
/// - `bytes=N-` — from N to the end
/// - `bytes=N-M` — N through M, M clamped to the last byte
/// - `bytes=-S` — the final S bytes, S > 0
///
/// # Errors
/// - `RangeError::Malformed` - missing `bytes=` prefix, multi-range comma,
///   or non-numeric bounds
/// - `RangeError::Unsatisfiable` - `start ≥ file_size`, `end < start`, or an
///   empty suffix
pub fn parse_byte_range(header: &str, file_size: u64) -> Result<ByteRange, RangeError> {
    let malformed = || RangeError::Malformed {
        header: header.to_string(),
    };
    let unsatisfiable = || RangeError::Unsatisfiable {
        header: header.to_string(),
    };

    let spec = header.strip_prefix("bytes=").ok_or_else(malformed)?;
    if spec.contains(',') {
        return Err(malformed());
    }
    let (first, second) = spec.split_once('-').ok_or_else(malformed)?;

    match (first.is_empty(), second.is_empty()) {
        // "bytes=-S": suffix of S bytes
        (true, false) => {
            let suffix: u64 = second.parse().map_err(|_| malformed())?;
            if suffix == 0 || file_size == 0 {
                return Err(unsatisfiable());
            }
            Ok(ByteRange {
                start: file_size.saturating_sub(suffix),
                end: file_size - 1,
            })
        }
        // "bytes=N-": open-ended
        (false, true) => {
            let start: u64 = first.parse().map_err(|_| malformed())?;
            if start >= file_size {
                return Err(unsatisfiable());
            }
            Ok(ByteRange {
                start,
                end: file_size - 1,
            })
        }
        // "bytes=N-M"
        (false, false) => {
            let start: u64 = first.parse().map_err(|_| malformed())?;
            let end: u64 = second.parse().map_err(|_| malformed())?;
            if end < start || start >= file_size {
                return Err(unsatisfiable());
            }
            Ok(ByteRange {
                start,
                end: end.min(file_size - 1),
            })
        }
        (true, true) => Err(malformed()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_ended_range_runs_to_last_byte() {
        let range = parse_byte_range("bytes=500-", 1000).unwrap();
        assert_eq!(range, ByteRange { start: 500, end: 999 });
        assert_eq!(range.content_length(), 500);
    }

    #[test]
    fn bounded_range_is_inclusive() {
        let range = parse_byte_range("bytes=100-199", 1000).unwrap();
        assert_eq!(range, ByteRange { start: 100, end: 199 });
        assert_eq!(range.content_length(), 100);
        assert_eq!(range.content_range(1000), "bytes 100-199/1000");
    }

    #[test]
    fn end_is_clamped_to_file_size() {
        let range = parse_byte_range("bytes=0-999999999", 4096).unwrap();
        assert_eq!(range, ByteRange { start: 0, end: 4095 });
    }

    #[test]
    fn suffix_takes_final_bytes() {
        let range = parse_byte_range("bytes=-100", 1000).unwrap();
        assert_eq!(range, ByteRange { start: 900, end: 999 });
    }

    #[test]
    fn oversized_suffix_starts_at_zero() {
        let range = parse_byte_range("bytes=-5000", 1000).unwrap();
        assert_eq!(range, ByteRange { start: 0, end: 999 });
    }

    #[test]
    fn single_byte_windows() {
        let first = parse_byte_range("bytes=0-0", 1000).unwrap();
        assert_eq!(first.content_length(), 1);
        let last = parse_byte_range("bytes=-1", 1000).unwrap();
        assert_eq!(last, ByteRange { start: 999, end: 999 });
        assert_eq!(last.content_length(), 1);
    }

    #[test]
    fn start_at_file_size_is_unsatisfiable() {
        assert!(matches!(
            parse_byte_range("bytes=1000-", 1000),
            Err(RangeError::Unsatisfiable { .. })
        ));
        assert!(matches!(
            parse_byte_range("bytes=1000-1005", 1000),
            Err(RangeError::Unsatisfiable { .. })
        ));
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(matches!(
            parse_byte_range("bytes=200-100", 1000),
            Err(RangeError::Unsatisfiable { .. })
        ));
    }

    #[test]
    fn empty_suffix_is_rejected() {
        assert!(matches!(
            parse_byte_range("bytes=-0", 1000),
            Err(RangeError::Unsatisfiable { .. })
        ));
    }

    #[test]
    fn multi_range_is_rejected() {
        assert!(matches!(
            parse_byte_range("bytes=0-10,20-30", 1000),
            Err(RangeError::Malformed { .. })
        ));
    }

    #[test]
    fn garbage_is_rejected() {
        for header in ["", "bytes", "bytes=", "bytes=-", "octets=0-1", "bytes=a-b", "bytes= 0-1"] {
            assert!(
                matches!(
                    parse_byte_range(header, 1000),
                    Err(RangeError::Malformed { .. })
                ),
                "{header:?} should be malformed"
            );
        }
    }

    #[test]
    fn valid_ranges_stay_inside_the_file() {
        // Law: any accepted range satisfies 0 <= start <= end < file_size.
        let file_size = 333u64;
        for header in [
            "bytes=0-",
            "bytes=0-0",
            "bytes=332-",
            "bytes=100-200",
            "bytes=100-999999",
            "bytes=-1",
            "bytes=-333",
            "bytes=-9999",
        ] {
            let range = parse_byte_range(header, file_size).unwrap();
            assert!(range.start <= range.end, "{header}");
            assert!(range.end < file_size, "{header}");
        }
    }
}
