use std::fmt;

use serde::{Serialize, Serializer};

/// Result of a derived getter.
///
/// `Unknown` means at least one input has not been reported yet. It is not
/// zero and not an error; callers decide how to render it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Derived<T> {
    #[default]
    Unknown,
    Known(T),
}

impl<T> Derived<T> {
    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known(_))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// `Some` for a known value, `None` for the sentinel.
    pub fn known(self) -> Option<T> {
        match self {
            Self::Known(v) => Some(v),
            Self::Unknown => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Derived<U> {
        match self {
            Self::Known(v) => Derived::Known(f(v)),
            Self::Unknown => Derived::Unknown,
        }
    }
}

impl<T> From<Option<T>> for Derived<T> {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Unknown, Self::Known)
    }
}

impl<T: fmt::Display> fmt::Display for Derived<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Known(v) => v.fmt(f),
            Self::Unknown => f.write_str("unknown"),
        }
    }
}

/// Serialized as the bare value, or `null` when unknown.
impl<T: Serialize> Serialize for Derived<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Known(v) => v.serialize(serializer),
            Self::Unknown => serializer.serialize_none(),
        }
    }
}
