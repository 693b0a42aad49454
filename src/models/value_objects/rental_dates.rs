//! Start and end dates of a rental

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::ValidationError;

/// Tolerated clock skew for dates slightly in the past
pub const CLOCK_SKEW_MINUTES: i64 = 5;
/// Furthest a rental date may lie in the future
pub const MAX_ADVANCE_DAYS: i64 = 365;
/// Longest rental period
pub const MAX_RENTAL_DAYS: i64 = 30;

/// Parse an RFC 3339 timestamp into UTC
pub fn parse_timestamp(field: &'static str, raw: &str) -> Result<DateTime<Utc>, ValidationError> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|d| d.with_timezone(&Utc))
        .map_err(|e| ValidationError::format(field, format!("invalid date '{}': {}", raw.trim(), e)))
}

fn check_window(field: &'static str, date: DateTime<Utc>, now: DateTime<Utc>) -> Result<(), ValidationError> {
    if date < now - Duration::minutes(CLOCK_SKEW_MINUTES) {
        return Err(ValidationError::range(field, "date cannot be in the past"));
    }
    if date > now + Duration::days(MAX_ADVANCE_DAYS) {
        return Err(ValidationError::range(field, "date cannot be more than one year in the future"));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RentalStartDate(DateTime<Utc>);

impl RentalStartDate {
    pub fn new(date: DateTime<Utc>, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        check_window("start_date", date, now)?;
        Ok(Self(date))
    }

    pub fn parse(raw: &str, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        Self::new(parse_timestamp("start_date", raw)?, now)
    }

    pub fn value(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RentalEndDate(DateTime<Utc>);

impl RentalEndDate {
    /// Validate the end date on its own and against `start`
    pub fn new(end: DateTime<Utc>, start: &RentalStartDate, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        check_window("end_date", end, now)?;
        Self::check_span(end, start.value())?;
        Ok(Self(end))
    }

    pub fn parse(raw: &str, start: &RentalStartDate, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        Self::new(parse_timestamp("end_date", raw)?, start, now)
    }

    /// End strictly after start, at most 30 days later
    pub fn check_span(end: DateTime<Utc>, start: DateTime<Utc>) -> Result<(), ValidationError> {
        if end <= start {
            return Err(ValidationError::range("end_date", "end date must be after the start date"));
        }
        if end - start > Duration::days(MAX_RENTAL_DAYS) {
            return Err(ValidationError::range("end_date", "rental period cannot exceed 30 days"));
        }
        Ok(())
    }

    pub fn value(&self) -> DateTime<Utc> {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_start_date_window() {
        assert!(RentalStartDate::new(now(), now()).is_ok());
        assert!(RentalStartDate::new(now() - Duration::minutes(4), now()).is_ok());
        assert!(RentalStartDate::new(now() - Duration::minutes(6), now()).is_err());
        assert!(RentalStartDate::new(now() + Duration::days(365), now()).is_ok());
        assert!(RentalStartDate::new(now() + Duration::days(366), now()).is_err());
    }

    #[test]
    fn test_end_date_span() {
        let start = RentalStartDate::new(now(), now()).unwrap();

        assert!(RentalEndDate::new(now(), &start, now()).is_err());
        assert!(RentalEndDate::new(now() - Duration::minutes(1), &start, now()).is_err());
        assert!(RentalEndDate::new(now() + Duration::days(1), &start, now()).is_ok());
        assert!(RentalEndDate::new(now() + Duration::days(30), &start, now()).is_ok());
        assert!(RentalEndDate::new(now() + Duration::days(30) + Duration::seconds(1), &start, now()).is_err());
    }

    #[test]
    fn test_end_date_future_bound_applies_independently() {
        let start = RentalStartDate::new(now() + Duration::days(360), now()).unwrap();
        let err = RentalEndDate::new(now() + Duration::days(370), &start, now()).unwrap_err();
        assert_eq!(err.field, "end_date");
        assert!(err.message.contains("one year"));
    }

    #[test]
    fn test_parse() {
        let start = RentalStartDate::parse("2026-03-02T10:00:00Z", now()).unwrap();
        assert!(RentalEndDate::parse("2026-03-10T10:00:00+01:00", &start, now()).is_ok());
        assert!(RentalStartDate::parse("next tuesday", now()).is_err());
    }
}
