use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::protocol::RangeError;

static RANGE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^bytes=(\d+)?-(\d+)?$").expect("range regex is valid"));

/// The part of a resource a response carries, resolved from a `Range` request header.
///
/// Only a single byte range is understood. Anything that does not look like one is ignored
/// and the whole resource is served.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangedSlice {
    size: u64,
    start: u64,
    /// Inclusive; meaningless when `size` is zero.
    end: u64,
    ranged: bool,
}

impl RangedSlice {
    /// The whole resource.
    pub fn full(size: u64) -> Self {
        Self { size, start: 0, end: size.saturating_sub(1), ranged: false }
    }

    /// Resolves a `Range` header value against a resource of `size` bytes.
    ///
    /// Handles `bytes=N-M`, `bytes=N-` and the suffix form `bytes=-N`. An end past the last
    /// byte is clamped. A start at or past the end of the resource, a start after the end,
    /// a zero suffix or any range on an empty resource is unsatisfiable.
    pub fn resolve(range: Option<&str>, size: u64) -> Result<Self, RangeError> {
        let Some(range) = range else {
            return Ok(Self::full(size));
        };

        let Some(captures) = RANGE_REGEX.captures(range.trim()) else {
            debug!(range, "ignoring malformed range header");
            return Ok(Self::full(size));
        };

        // digits only, so parsing can only overflow; saturate in that case
        let first = captures.get(1).map(|m| m.as_str().parse::<u64>().unwrap_or(u64::MAX));
        let last = captures.get(2).map(|m| m.as_str().parse::<u64>().unwrap_or(u64::MAX));

        let unsatisfiable = RangeError::Unsatisfiable { size };
        let (start, end) = match (first, last) {
            (None, None) => {
                debug!(range, "ignoring range without bounds");
                return Ok(Self::full(size));
            }
            (None, Some(suffix)) => {
                if suffix == 0 || size == 0 {
                    return Err(unsatisfiable);
                }
                (size.saturating_sub(suffix), size - 1)
            }
            (Some(start), None) => {
                if start >= size {
                    return Err(unsatisfiable);
                }
                (start, size - 1)
            }
            (Some(start), Some(end)) => {
                if start > end || start >= size {
                    return Err(unsatisfiable);
                }
                (start, end.min(size - 1))
            }
        };

        Ok(Self { size, start, end, ranged: true })
    }

    /// Size of the whole resource.
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[inline]
    pub fn start(&self) -> u64 {
        self.start
    }

    /// Last byte of the slice, inclusive.
    #[inline]
    pub fn end(&self) -> u64 {
        self.end
    }

    /// Whether a satisfiable range was requested, i.e. the response should be a 206.
    #[inline]
    pub fn is_ranged(&self) -> bool {
        self.ranged
    }

    /// Number of bytes in the slice.
    pub fn len(&self) -> u64 {
        if self.size == 0 { 0 } else { self.end - self.start + 1 }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `Content-Range` value for this slice, e.g. `bytes 0-99/1000`.
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(range: &str, size: u64) -> Result<(u64, u64), RangeError> {
        RangedSlice::resolve(Some(range), size).map(|slice| {
            assert!(slice.is_ranged());
            (slice.start(), slice.end())
        })
    }

    #[test]
    fn no_range_is_the_whole_resource() {
        let slice = RangedSlice::resolve(None, 1000).unwrap();
        assert!(!slice.is_ranged());
        assert_eq!((slice.start(), slice.end(), slice.len()), (0, 999, 1000));

        let empty = RangedSlice::resolve(None, 0).unwrap();
        assert_eq!(empty.len(), 0);
        assert!(empty.is_empty());
    }

    #[test]
    fn bounded_ranges() {
        assert_eq!(resolve("bytes=0-99", 1000), Ok((0, 99)));
        assert_eq!(resolve("bytes=500-", 1000), Ok((500, 999)));
        assert_eq!(resolve("bytes=900-5000", 1000), Ok((900, 999)));
        assert_eq!(resolve("bytes=999-999", 1000), Ok((999, 999)));
        assert_eq!(resolve("bytes=0-99999999999999999999999", 1000), Ok((0, 999)));
    }

    #[test]
    fn suffix_ranges() {
        assert_eq!(resolve("bytes=-100", 1000), Ok((900, 999)));
        assert_eq!(resolve("bytes=-5000", 1000), Ok((0, 999)));
        assert_eq!(resolve("bytes=-1", 1), Ok((0, 0)));
    }

    #[test]
    fn unsatisfiable_ranges() {
        let unsatisfiable = Err(RangeError::Unsatisfiable { size: 1000 });
        assert_eq!(resolve("bytes=2000-", 1000), unsatisfiable);
        assert_eq!(resolve("bytes=1000-1000", 1000), unsatisfiable);
        assert_eq!(resolve("bytes=50-10", 1000), unsatisfiable);
        assert_eq!(resolve("bytes=-0", 1000), unsatisfiable);
        assert_eq!(resolve("bytes=0-0", 0), Err(RangeError::Unsatisfiable { size: 0 }));
        assert_eq!(resolve("bytes=-10", 0), Err(RangeError::Unsatisfiable { size: 0 }));
    }

    #[test]
    fn malformed_ranges_are_ignored() {
        for range in ["bytes=-", "bytes=0-10,20-30", "items=0-10", "bytes=a-b", "0-10", ""] {
            let slice = RangedSlice::resolve(Some(range), 1000).unwrap();
            assert!(!slice.is_ranged(), "{range} should be ignored");
            assert_eq!(slice.len(), 1000);
        }
    }

    #[test]
    fn satisfiable_slices_stay_within_bounds() {
        let size = 37;
        for start in 0..40 {
            for end in 0..40 {
                if let Ok((s, e)) = resolve(&format!("bytes={start}-{end}"), size) {
                    assert!(s <= e && e < size);
                }
            }
            if let Ok((s, e)) = resolve(&format!("bytes=-{start}"), size) {
                assert!(s <= e && e < size);
            }
        }
    }

    #[test]
    fn content_range() {
        let slice = RangedSlice::resolve(Some("bytes=0-99"), 1000).unwrap();
        assert_eq!(slice.content_range(), "bytes 0-99/1000");
        assert_eq!(slice.len(), 100);
    }
}
