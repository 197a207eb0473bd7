//! UTC instants for snapshots and record bookkeeping.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Immutable point in time, always UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Creates a timestamp from Unix seconds as reported by the processor.
    pub fn from_unix_secs(secs: i64) -> Result<Self, ValidationError> {
        Utc.timestamp_opt(secs, 0)
            .single()
            .map(Self)
            .ok_or_else(|| ValidationError::invalid_format("timestamp", "out of range"))
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Self::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_falls_between_surrounding_clock_reads() {
        let before = Utc::now();
        let ts = Timestamp::now();

        assert!(*ts.as_datetime() >= before);
        assert!(*ts.as_datetime() <= Utc::now());
    }

    #[test]
    fn unix_secs_round_trip() {
        let ts = Timestamp::from_unix_secs(1_704_067_200).unwrap();
        assert_eq!(ts.as_datetime().timestamp(), 1_704_067_200);
    }

    #[test]
    fn out_of_range_unix_secs_is_rejected() {
        assert!(Timestamp::from_unix_secs(i64::MAX).is_err());
    }
}
