use std::cmp::Ordering;
use std::fmt;

/// Child key ordered the way the realtime database orders keys: keys that
/// parse as a 32-bit integer come first in numeric order, every other key
/// follows in lexicographic order.
///
/// Push ids are generated so that lexicographic order is insertion order, and
/// arrays come back with integer keys, so the maximum key is the most
/// recently appended child in both layouts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LogKey(String);

impl LogKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn as_index(&self) -> Option<i32> {
        // "007" or "+7" are string keys for the database
        let canonical =
            self.0 == "0" || !(self.0.starts_with(['0', '+']) || self.0.starts_with("-0"));
        if canonical {
            self.0.parse::<i32>().ok()
        } else {
            None
        }
    }
}

impl Ord for LogKey {
    fn cmp(
        &self,
        other: &Self,
    ) -> Ordering {
        match (self.as_index(), other.as_index()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for LogKey {
    fn partial_cmp(
        &self,
        other: &Self,
    ) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for LogKey {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LogKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}
