use std::{fmt::Display, str::FromStr};
pub use time::OffsetDateTime as Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
/// A coarse-grained timestamp with second resolution, encoded as the decimal integer
/// `yyyyMMddHHmmss` (UTC). Used to name buffer files and to bucket records.
///
/// The encoding preserves chronological order, so buckets compare like the instants they
/// stand for.
pub struct TimeBucket(i64);

impl TimeBucket {
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// The second bucket containing `ts`, in UTC.
    pub fn second_of(ts: Timestamp) -> Self {
        let ts = ts.to_offset(time::UtcOffset::UTC);
        Self(
            ts.year() as i64 * 10_000_000_000
                + u8::from(ts.month()) as i64 * 100_000_000
                + ts.day() as i64 * 1_000_000
                + ts.hour() as i64 * 10_000
                + ts.minute() as i64 * 100
                + ts.second() as i64,
        )
    }

    /// The second bucket containing a unix timestamp in milliseconds.
    pub fn from_unix_millis(millis: i64) -> Option<Self> {
        Timestamp::from_unix_timestamp(millis.div_euclid(1000))
            .ok()
            .map(Self::second_of)
    }

    pub fn now() -> Self {
        Self::second_of(Timestamp::now_utc())
    }

    /// The smallest bucket strictly after this one. The result keeps ordering, but may not
    /// stand for a valid calendar second.
    pub fn succ(&self) -> Self {
        Self(self.0 + 1)
    }
}

impl Display for TimeBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TimeBucket {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}
