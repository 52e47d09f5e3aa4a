//! Form field validators.
//!
//! Validators judge a single raw field value and report a named reason on
//! failure. Reason keys (`required`, `dateAfterNow`) are what the form layer
//! uses to pick the message shown under a field.
//!
//! Temporal checks never read the wall clock directly; they go through a
//! [`Clock`] so fixed instants can be injected.

use std::fmt::Debug;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use serde_json::{json, Value};
use thiserror::Error;

/// Source of the current instant
pub trait Clock: Debug {
    fn now(&self) -> DateTime<Local>;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<Local> {
        (**self).now()
    }
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A clock frozen at one instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Local>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

/// Why a field value was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The field is empty
    #[error("This field is required")]
    Required,
    /// The date lies before the current instant
    #[error("Date must not be in the past: {value}")]
    DateAfterNow { value: String },
}

impl ValidationError {
    /// Reason key understood by the form layer
    pub fn key(&self) -> &'static str {
        match self {
            ValidationError::Required => "required",
            ValidationError::DateAfterNow { .. } => "dateAfterNow",
        }
    }

    /// Named-key record, e.g. `{"dateAfterNow": {"value": "2017-01-01"}}`
    pub fn to_record(&self) -> Value {
        match self {
            ValidationError::Required => json!({ "required": true }),
            ValidationError::DateAfterNow { value } => {
                json!({ "dateAfterNow": { "value": value } })
            }
        }
    }
}

/// `Ok(())` means the value is valid
pub type ValidationResult = Result<(), ValidationError>;

/// A check over one raw field value
pub trait Validator {
    fn validate(&self, value: &str) -> ValidationResult;
}

/// Rejects empty and whitespace-only values
#[derive(Debug, Clone, Copy, Default)]
pub struct Required;

impl Validator for Required {
    fn validate(&self, value: &str) -> ValidationResult {
        if value.trim().is_empty() {
            return Err(ValidationError::Required);
        }
        Ok(())
    }
}

/// Rejects parseable dates that lie before the clock's current instant.
///
/// Empty or unparseable input passes: presence and syntax are the job of
/// other validators. Date-only input is taken at local midnight and compared
/// with the full current instant, so a bare "today" is already in the past.
#[derive(Debug, Clone, Copy, Default)]
pub struct DateAfterNow<C = SystemClock> {
    clock: C,
}

impl<C: Clock> DateAfterNow<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> Validator for DateAfterNow<C> {
    fn validate(&self, value: &str) -> ValidationResult {
        let Some(input) = parse_date_candidate(value) else {
            return Ok(());
        };
        if input < self.clock.now() {
            return Err(ValidationError::DateAfterNow {
                value: value.to_string(),
            });
        }
        Ok(())
    }
}

/// Run every validator against `value` and collect all failures
pub fn validate_all(value: &str, validators: &[&dyn Validator]) -> Vec<ValidationError> {
    validators
        .iter()
        .filter_map(|v| v.validate(value).err())
        .collect()
}

const LOCAL_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Parse user input into a local instant.
///
/// Accepts `YYYY-MM-DD`, local date-times and RFC 3339 timestamps.
pub fn parse_date_candidate(value: &str) -> Option<DateTime<Local>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Local));
    }

    for format in LOCAL_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Local.from_local_datetime(&naive).earliest();
        }
    }

    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
    start_of_local_day(date)
}

/// First existing local instant of `date` (midnight unless skipped by DST)
fn start_of_local_day(date: NaiveDate) -> Option<DateTime<Local>> {
    (0..24).find_map(|hour| {
        let naive = date.and_hms_opt(hour, 0, 0)?;
        Local.from_local_datetime(&naive).earliest()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn noon(y: i32, m: u32, d: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn validator_at(now: DateTime<Local>) -> DateAfterNow<FixedClock> {
        DateAfterNow::new(FixedClock(now))
    }

    #[test]
    fn test_empty_value_is_valid() {
        let v = validator_at(noon(2024, 6, 15));
        assert_eq!(v.validate(""), Ok(()));
        assert_eq!(v.validate("   "), Ok(()));
    }

    #[test]
    fn test_malformed_value_is_valid() {
        let v = validator_at(noon(2024, 6, 15));
        for input in ["not a date", "2017-13-45", "2017/01/01x", "yesterday"] {
            assert_eq!(v.validate(input), Ok(()), "input {:?}", input);
        }
    }

    #[test]
    fn test_past_date_fails_and_echoes_value() {
        let v = validator_at(noon(2024, 6, 15));
        let err = v.validate("2017-01-01").unwrap_err();
        assert_eq!(err.key(), "dateAfterNow");
        assert_eq!(
            err,
            ValidationError::DateAfterNow {
                value: "2017-01-01".to_string()
            }
        );
        assert_eq!(
            err.to_record(),
            json!({ "dateAfterNow": { "value": "2017-01-01" } })
        );
    }

    #[test]
    fn test_future_date_is_valid() {
        let now = noon(2024, 6, 15);
        let v = validator_at(now);
        let week_ahead = (now + Duration::days(7)).format("%Y-%m-%d").to_string();
        assert_eq!(v.validate(&week_ahead), Ok(()));
        assert_eq!(v.validate("2024-06-16"), Ok(()));
    }

    #[test]
    fn test_same_day_is_rejected_after_midnight() {
        let v = validator_at(noon(2024, 6, 15));
        assert!(v.validate("2024-06-15").is_err());
    }

    #[test]
    fn test_instant_equal_to_now_is_valid() {
        let now = Local.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap();
        let v = validator_at(now);
        assert_eq!(v.validate("2024-06-15"), Ok(()));
        assert_eq!(v.validate("2024-06-15T00:00:00"), Ok(()));
        assert!(v.validate("2024-06-14T23:59:59").is_err());
    }

    #[test]
    fn test_rfc3339_input_is_compared_as_instant() {
        let now = noon(2024, 6, 15);
        let v = validator_at(now);
        let later = (now + Duration::seconds(1)).to_rfc3339();
        let earlier = (now - Duration::seconds(1)).to_rfc3339();
        assert_eq!(v.validate(&later), Ok(()));
        assert!(v.validate(&earlier).is_err());
    }

    #[test]
    fn test_validation_is_idempotent_for_fixed_clock() {
        let v = validator_at(noon(2024, 6, 15));
        assert_eq!(v.validate("2020-02-02"), v.validate("2020-02-02"));
    }

    #[test]
    fn test_required() {
        assert_eq!(Required.validate(""), Err(ValidationError::Required));
        assert_eq!(Required.validate("  "), Err(ValidationError::Required));
        assert_eq!(Required.validate("x"), Ok(()));
        assert_eq!(ValidationError::Required.to_record(), json!({ "required": true }));
    }

    #[test]
    fn test_validate_all_collects_every_failure() {
        let v = validator_at(noon(2024, 6, 15));
        let errors = validate_all("", &[&Required, &v]);
        assert_eq!(errors, vec![ValidationError::Required]);

        let errors = validate_all("2017-01-01", &[&Required, &v]);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].key(), "dateAfterNow");

        assert!(validate_all("2030-01-01", &[&Required, &v]).is_empty());
    }

    #[test]
    fn test_parse_date_candidate_date_only_is_local_midnight() {
        let parsed = parse_date_candidate("2024-03-10").unwrap();
        assert_eq!(parsed.date_naive(), NaiveDate::from_ymd_opt(2024, 3, 10).unwrap());
        assert!(parse_date_candidate("").is_none());
        assert!(parse_date_candidate("10.03.2024").is_none());
    }
}
