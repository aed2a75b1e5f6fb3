use time::{Date, OffsetDateTime, format_description::well_known::Rfc3339};
use uuid::Uuid;

pub fn uuid_v7_without_dashes() -> String {
    Uuid::now_v7().simple().to_string()
}

pub fn format_rfc3339(value: OffsetDateTime) -> String {
    value
        .format(&Rfc3339)
        .unwrap_or("1970-01-01T00:00:00Z".to_string())
}

pub fn format_date(value: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        value.year(),
        u8::from(value.month()),
        value.day()
    )
}

/// Treats blank strings the same as a missing value.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn formats_dates_with_padding() {
        assert_eq!(format_date(date!(2026 - 03 - 05)), "2026-03-05");
    }

    #[test]
    fn formats_utc_instants() {
        assert_eq!(
            format_rfc3339(datetime!(2026-10-19 08:30:00 UTC)),
            "2026-10-19T08:30:00Z"
        );
    }

    #[test]
    fn blank_values_are_absent() {
        assert_eq!(non_blank(Some("  ")), None);
        assert_eq!(non_blank(Some(" b-1 ")), Some("b-1"));
        assert_eq!(non_blank(None), None);
    }
}
