// Half-open stay ranges and the overlap rule used for admission

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BookingError;

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// A stay `[check_in, check_out)`. Construction guarantees `check_in < check_out`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRange", into = "RawRange")]
pub struct DateRange {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct RawRange {
    check_in: DateTime<Utc>,
    check_out: DateTime<Utc>,
}

impl TryFrom<RawRange> for DateRange {
    type Error = BookingError;

    fn try_from(raw: RawRange) -> Result<Self, Self::Error> {
        DateRange::new(raw.check_in, raw.check_out)
    }
}

impl From<DateRange> for RawRange {
    fn from(range: DateRange) -> Self {
        RawRange {
            check_in: range.start,
            check_out: range.end,
        }
    }
}

impl DateRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, BookingError> {
        if end <= start {
            return Err(BookingError::InvalidRange(format!(
                "check-out {} must be after check-in {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    // Whole calendar days, midnight UTC to midnight UTC
    pub fn from_dates(check_in: NaiveDate, check_out: NaiveDate) -> Result<Self, BookingError> {
        Self::new(
            check_in.and_time(chrono::NaiveTime::MIN).and_utc(),
            check_out.and_time(chrono::NaiveTime::MIN).and_utc(),
        )
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }

    /// Number of nights, rounding a partial day up.
    pub fn nights(&self) -> i64 {
        let seconds = self.duration().num_seconds();
        (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY
    }

    // [a0, a1) and [b0, b1) intersect iff a0 < b1 && b0 < a1
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start < other.end && other.start < self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::Rng;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn range(a: NaiveDate, b: NaiveDate) -> DateRange {
        DateRange::from_dates(a, b).unwrap()
    }

    #[test]
    fn test_rejects_empty_and_inverted_ranges() {
        let d = day(2024, 6, 1);
        assert!(matches!(
            DateRange::from_dates(d, d),
            Err(BookingError::InvalidRange(_))
        ));
        assert!(matches!(
            DateRange::from_dates(day(2024, 6, 5), d),
            Err(BookingError::InvalidRange(_))
        ));
    }

    #[test]
    fn test_all_overlap_shapes() {
        let existing = range(day(2024, 6, 1), day(2024, 6, 5));

        // partial on the trailing edge
        assert!(existing.overlaps(&range(day(2024, 6, 4), day(2024, 6, 8))));
        // partial on the leading edge
        assert!(existing.overlaps(&range(day(2024, 5, 28), day(2024, 6, 2))));
        // containing
        assert!(existing.overlaps(&range(day(2024, 5, 30), day(2024, 6, 10))));
        // contained
        assert!(existing.overlaps(&range(day(2024, 6, 2), day(2024, 6, 3))));
        // identical
        assert!(existing.overlaps(&existing));

        // touching boundaries do not overlap
        assert!(!existing.overlaps(&range(day(2024, 6, 5), day(2024, 6, 8))));
        assert!(!existing.overlaps(&range(day(2024, 5, 28), day(2024, 6, 1))));
    }

    #[test]
    fn test_overlap_is_symmetric() {
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut rng = rand::thread_rng();

        for _ in 0..2000 {
            let a0 = rng.gen_range(0..240);
            let a1 = a0 + rng.gen_range(1..72);
            let b0 = rng.gen_range(0..240);
            let b1 = b0 + rng.gen_range(1..72);

            let a = DateRange::new(base + Duration::hours(a0), base + Duration::hours(a1)).unwrap();
            let b = DateRange::new(base + Duration::hours(b0), base + Duration::hours(b1)).unwrap();

            assert_eq!(a.overlaps(&b), b.overlaps(&a), "{:?} vs {:?}", a, b);
        }
    }

    #[test]
    fn test_nights_round_partial_days_up() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 15, 0, 0).unwrap();

        let r = DateRange::new(start, start + Duration::days(3)).unwrap();
        assert_eq!(r.nights(), 3);

        let r = DateRange::new(start, start + Duration::days(2) + Duration::hours(5)).unwrap();
        assert_eq!(r.nights(), 3);

        let r = DateRange::new(start, start + Duration::minutes(1)).unwrap();
        assert_eq!(r.nights(), 1);
    }

    #[test]
    fn test_deserialize_validates_order() {
        let ok = r#"{"check_in":"2024-06-01T00:00:00Z","check_out":"2024-06-03T00:00:00Z"}"#;
        let parsed: DateRange = serde_json::from_str(ok).unwrap();
        assert_eq!(parsed.nights(), 2);

        let bad = r#"{"check_in":"2024-06-03T00:00:00Z","check_out":"2024-06-01T00:00:00Z"}"#;
        assert!(serde_json::from_str::<DateRange>(bad).is_err());
    }
}
