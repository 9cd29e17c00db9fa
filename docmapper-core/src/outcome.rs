//! Tri-state result of repository writes.

use std::fmt;

/// Signed count describing what a write did.
///
/// - positive: the write was acknowledged (shard count, or version for creates)
/// - zero: nothing happened, e.g. creating a document that already exists
/// - negative: the write conflicted with a concurrent change
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Outcome(pub i64);

impl Outcome {
    pub const NONE: Outcome = Outcome(0);
    pub const CONFLICT: Outcome = Outcome(-1);

    pub fn count(&self) -> i64 {
        self.0
    }

    pub fn is_acknowledged(&self) -> bool {
        self.0 > 0
    }

    pub fn is_none(&self) -> bool {
        self.0 == 0
    }

    pub fn is_conflict(&self) -> bool {
        self.0 < 0
    }
}

impl From<i64> for Outcome {
    fn from(count: i64) -> Self {
        Outcome(count)
    }
}

impl From<Outcome> for i64 {
    fn from(outcome: Outcome) -> Self {
        outcome.0
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_decides_the_state() {
        assert!(Outcome(1).is_acknowledged());
        assert!(Outcome::NONE.is_none());
        assert!(Outcome::CONFLICT.is_conflict());
        assert!(!Outcome(2).is_conflict());
    }
}
