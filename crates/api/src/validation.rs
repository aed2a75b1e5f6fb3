use std::borrow::Cow;

use tutorhub_domain::fees::parse_month;
use validator::{Validate, ValidationError};

use crate::error::ApiError;

pub fn validate<T: Validate>(value: &T) -> Result<(), ApiError> {
    value
        .validate()
        .map_err(|err| ApiError::Validation(err.to_string()))?;
    Ok(())
}

/// `YYYY-MM` billing month.
pub fn month(value: &str) -> Result<(), ValidationError> {
    parse_month(value).map(|_| ()).map_err(|_| {
        ValidationError::new("month").with_message(Cow::Borrowed("expected YYYY-MM"))
    })
}

/// `YYYY-MM-DD` calendar date.
pub fn calendar_date(value: &str) -> Result<(), ValidationError> {
    let format = time::macros::format_description!("[year]-[month]-[day]");
    time::Date::parse(value, format).map(|_| ()).map_err(|_| {
        ValidationError::new("date").with_message(Cow::Borrowed("expected YYYY-MM-DD"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_months_and_dates() {
        assert!(month("2026-10").is_ok());
        assert!(month("2026-1").is_err());
        assert!(calendar_date("2026-10-31").is_ok());
        assert!(calendar_date("2026-02-30").is_err());
    }
}
