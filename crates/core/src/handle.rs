//! Object handles
//!
//! Every record in a [`Workspace`](crate::Workspace) is identified by a
//! [`Handle`] drawn from a monotonically increasing counter. Handles are never
//! reused, even after the object they named has been removed, so a stale
//! handle simply fails to resolve.
//!
//! Reference fields store the target handle in its text form, `#<n>`.

use std::fmt;
use std::str::FromStr;

/// Opaque, stable identity of one record within a workspace
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Handle(u64);

impl Handle {
    /// Create a handle from its raw counter value
    #[inline]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw counter value
    #[inline]
    pub const fn raw(&self) -> u64 {
        self.0
    }

    /// The handle after this one
    #[inline]
    pub(crate) const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle(#{})", self.0)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Error returned when text is not a serialized handle
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a handle: {0:?}")]
pub struct ParseHandleError(String);

impl FromStr for Handle {
    type Err = ParseHandleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .strip_prefix('#')
            .filter(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|digits| digits.parse().ok())
            .map(Handle)
            .ok_or_else(|| ParseHandleError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_display() {
        let handle = Handle::from_raw(17);
        assert_eq!(format!("{}", handle), "#17");
        assert_eq!(format!("{:?}", handle), "Handle(#17)");
    }

    #[test]
    fn test_handle_parse() {
        assert_eq!("#17".parse::<Handle>(), Ok(Handle::from_raw(17)));
        assert_eq!(" #3 ".parse::<Handle>(), Ok(Handle::from_raw(3)));
        assert!("17".parse::<Handle>().is_err());
        assert!("#".parse::<Handle>().is_err());
        assert!("#-1".parse::<Handle>().is_err());
        assert!("#1a".parse::<Handle>().is_err());
        assert!("Zone 1".parse::<Handle>().is_err());
    }

    #[test]
    fn test_handle_ordering() {
        let first = Handle::from_raw(1);
        let second = first.next();
        assert!(first < second);
        assert_eq!(second.raw(), 2);
    }

    #[test]
    fn test_handle_clone_copy() {
        let handle1 = Handle::from_raw(5);
        let handle2 = handle1;
        let handle3 = handle1.clone();
        assert_eq!(handle1, handle2);
        assert_eq!(handle1, handle3);
    }
}
