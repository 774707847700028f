use std::fmt;
use std::fmt::{Display, Formatter};

/// An HTTP protocol version as a `major.minor` pair.
///
/// Ordering is numeric on major first, then minor, so `1.10` is newer than `1.9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HttpVersion {
    major: u32,
    minor: u32,
}

impl HttpVersion {
    pub const HTTP_10: HttpVersion = HttpVersion::new(1, 0);
    pub const HTTP_11: HttpVersion = HttpVersion::new(1, 1);

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    #[inline]
    pub fn major(&self) -> u32 {
        self.major
    }

    #[inline]
    pub fn minor(&self) -> u32 {
        self.minor
    }

    /// Returns true if this version is `other` or newer.
    #[inline]
    pub fn at_least(&self, other: HttpVersion) -> bool {
        *self >= other
    }
}

impl Default for HttpVersion {
    fn default() -> Self {
        Self::HTTP_11
    }
}

impl Display for HttpVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_numeric() {
        assert!(HttpVersion::new(1, 10) > HttpVersion::new(1, 9));
        assert!(HttpVersion::new(2, 0) > HttpVersion::new(1, 99));
        assert!(HttpVersion::HTTP_11.at_least(HttpVersion::HTTP_10));
        assert!(HttpVersion::HTTP_11.at_least(HttpVersion::HTTP_11));
        assert!(!HttpVersion::HTTP_10.at_least(HttpVersion::HTTP_11));
    }

    #[test]
    fn display() {
        assert_eq!(HttpVersion::HTTP_10.to_string(), "1.0");
        assert_eq!(HttpVersion::new(1, 12).to_string(), "1.12");
        assert_eq!(HttpVersion::default(), HttpVersion::HTTP_11);
    }
}
