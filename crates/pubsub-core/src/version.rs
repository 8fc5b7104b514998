use std::fmt;
use std::ops::Sub;

/// A node's version, seeded once from a non-repeating source at node
/// creation and incremented by one on every subsequent update. Two versions
/// sampled independently (different nodes, different process runs) are, with
/// overwhelming probability, distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeVersion(u32);

impl NodeVersion {
    /// Seeds a fresh version from the process RNG.
    #[must_use]
    pub fn generate() -> Self {
        use rand::Rng;
        Self(rand::thread_rng().gen())
    }

    #[must_use]
    pub fn increment(self) -> Self {
        Self(self.0.wrapping_add(1))
    }

    /// Signed distance `self - other`, saturating to `i32`'s range. Used to
    /// decide whether a client's last-known version is reachable within the
    /// node's retained history.
    #[must_use]
    pub fn distance(self, other: Self) -> i32 {
        let diff = i64::from(self.0) - i64::from(other.0);
        diff.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
    }
}

impl Sub for NodeVersion {
    type Output = i32;

    fn sub(self, rhs: Self) -> i32 {
        self.distance(rhs)
    }
}

impl fmt::Display for NodeVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
