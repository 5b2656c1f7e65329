use chrono::{Local, NaiveDate, NaiveTime};
use chrono_english::{parse_date_string, Dialect};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InputError {
    #[error("Failed to parse date '{0}': {1}")]
    Date(String, String),
    #[error("Failed to parse time '{0}': expected HH:MM or H:MM am/pm")]
    Time(String),
}

/// Parses an ISO date (`2024-01-15`) or a natural-language one (`next monday`).
pub fn parse_date(input: &str) -> Result<NaiveDate, InputError> {
    let trimmed = input.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(date);
    }
    parse_date_string(trimmed, Local::now(), Dialect::Uk)
        .map(|dt| dt.date_naive())
        .map_err(|e| InputError::Date(input.to_string(), e.to_string()))
}

pub fn parse_time(input: &str) -> Result<NaiveTime, InputError> {
    let trimmed = input.trim();
    ["%H:%M", "%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(trimmed, fmt).ok())
        .or_else(|| parse_twelve_hour(&trimmed.to_uppercase()))
        .ok_or_else(|| InputError::Time(input.to_string()))
}

/// `6:30 pm`, `9am`
fn parse_twelve_hour(upper: &str) -> Option<NaiveTime> {
    let (clock, pm) = match (upper.strip_suffix("PM"), upper.strip_suffix("AM")) {
        (Some(clock), _) => (clock.trim(), true),
        (_, Some(clock)) => (clock.trim(), false),
        _ => return None,
    };
    let (hour, minute) = match clock.split_once(':') {
        Some((h, m)) => (h.parse::<u32>().ok()?, m.parse::<u32>().ok()?),
        None => (clock.parse::<u32>().ok()?, 0),
    };
    if !(1..=12).contains(&hour) {
        return None;
    }
    NaiveTime::from_hms_opt(hour % 12 + if pm { 12 } else { 0 }, minute, 0)
}

pub fn parse_optional_date(input: Option<&str>) -> Result<Option<NaiveDate>, InputError> {
    input.map(parse_date).transpose()
}

pub fn parse_optional_time(input: Option<&str>) -> Result<Option<NaiveTime>, InputError> {
    input.map(parse_time).transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("18:00", 18, 0)]
    #[case("07:45:00", 7, 45)]
    #[case("6:30 pm", 18, 30)]
    #[case("9am", 9, 0)]
    fn test_parse_time(#[case] input: &str, #[case] hour: u32, #[case] minute: u32) {
        assert_eq!(parse_time(input).unwrap(), NaiveTime::from_hms_opt(hour, minute, 0).unwrap());
    }

    #[test]
    fn test_parse_time_rejects_garbage() {
        assert!(parse_time("teatime").is_err());
    }

    #[test]
    fn test_parse_iso_date() {
        assert_eq!(
            parse_date("2024-01-15").unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
        );
    }

    #[test]
    fn test_parse_relative_date() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date("today").unwrap(), today);
    }
}
