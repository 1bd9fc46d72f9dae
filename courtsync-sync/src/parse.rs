//! Small parsers shared by the mappers: minutes, clocks, dates, heights and
//! season names. All of them are tolerant; providers disagree on formats
//! and occasionally ship garbage.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// `MM:SS` -> total seconds. Empty or malformed input counts as 0 minutes
/// played (a DNP row).
pub fn parse_minutes_to_seconds(minutes: &str) -> i32 {
    let mut parts = minutes.split(':');
    let (Some(m), Some(s), None) = (parts.next(), parts.next(), parts.next()) else {
        return 0;
    };
    match (m.trim().parse::<i32>(), s.trim().parse::<i32>()) {
        (Ok(m), Ok(s)) if m >= 0 && s >= 0 => m * 60 + s,
        _ => 0,
    }
}

/// Inverse of [`parse_minutes_to_seconds`] for display and round-trips.
pub fn format_seconds_as_minutes(total_seconds: i32) -> String {
    let total_seconds = total_seconds.max(0);
    format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
}

/// Game clock `MM:SS` -> seconds remaining in the period, fractional-safe
/// for the link-inference deltas. Malformed clocks read as 0.0.
pub fn parse_clock_seconds(clock: &str) -> f64 {
    f64::from(parse_minutes_to_seconds(clock))
}

/// Game date parsing chain: ISO-8601 -> `DD/MM/YYYY` ->
/// `YYYY-MM-DD HH:MM:SS` -> `YYYY-MM-DD` -> `Oct 03, 2024`. Empty or
/// unparseable dates fall back to "now" so a schedule row is never dropped
/// over a bad date.
pub fn parse_game_datetime(date: &str) -> DateTime<Utc> {
    try_parse_datetime(date).unwrap_or_else(Utc::now)
}

pub fn try_parse_datetime(date: &str) -> Option<DateTime<Utc>> {
    let date = date.trim();
    if date.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(&date.replace("Z", "+00:00")) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(d) = NaiveDate::parse_from_str(date, "%d/%m/%Y") {
        return Some(midnight_utc(d));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(date, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }
    if let Ok(d) = NaiveDate::parse_from_str(date, "%Y-%m-%d") {
        return Some(midnight_utc(d));
    }
    if let Ok(d) = NaiveDate::parse_from_str(date, "%b %d, %Y") {
        return Some(midnight_utc(d));
    }
    None
}

/// Birth date parsing: `YYYY-MM-DD`, `DD/MM/YYYY`, `DD.MM.YYYY`, or the
/// long form `12 March, 1998`. Invalid dates are simply absent.
pub fn parse_birth_date(date: &str) -> Option<NaiveDate> {
    let date = date.trim();
    if date.is_empty() {
        return None;
    }
    for format in ["%Y-%m-%d", "%d/%m/%Y", "%d.%m.%Y", "%d %B, %Y"] {
        if let Ok(d) = NaiveDate::parse_from_str(date, format) {
            return Some(d);
        }
    }
    None
}

fn midnight_utc(d: NaiveDate) -> DateTime<Utc> {
    d.and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time")
        .and_utc()
}

/// Heights arrive either in meters (`"2.02"`, comma decimals tolerated) or
/// already in centimeters (`"202"`). Meters convert by `round(m * 100)`.
pub fn parse_height_cm(height: &str) -> Option<i32> {
    let height = height.trim().replace(',', ".");
    if height.is_empty() {
        return None;
    }
    if height.contains('.') {
        let meters: f64 = height.parse().ok()?;
        return Some((meters * 100.0).round() as i32);
    }
    let digits: String = height.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Normalized season name for a start year: `2024` -> `"2024-25"`,
/// `1999` -> `"1999-00"`.
pub fn season_name_from_start_year(start_year: i32) -> String {
    format!("{}-{:02}", start_year, (start_year + 1) % 100)
}

/// Parses a normalized (or close to normalized) season name back into
/// (start_year, end_year). `"2024-25"` -> (2024, 2025); a bare `"2024"`
/// reads as (2024, 2025).
pub fn season_years_from_name(name: &str) -> Option<(i32, i32)> {
    let mut parts = name.split('-');
    let start: i32 = parts.next()?.trim().parse().ok()?;
    match parts.next() {
        None => Some((start, start + 1)),
        Some(end) => {
            let end: i32 = end.trim().parse().ok()?;
            if end < 100 {
                // Two-digit end year; century wraps (1999-00 ends in 2000).
                let mut end = (start / 100) * 100 + end;
                if end < start {
                    end += 100;
                }
                Some((start, end))
            } else {
                Some((start, end))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minutes_round_trip() {
        for seconds in [0, 1, 59, 60, 61, 1626, 3599] {
            let formatted = format_seconds_as_minutes(seconds);
            assert_eq!(parse_minutes_to_seconds(&formatted), seconds);
        }
    }

    #[test]
    fn minutes_tolerate_garbage() {
        assert_eq!(parse_minutes_to_seconds(""), 0);
        assert_eq!(parse_minutes_to_seconds("DNP"), 0);
        assert_eq!(parse_minutes_to_seconds("27:06:01"), 0);
        assert_eq!(parse_minutes_to_seconds("27:06"), 1626);
    }

    #[test]
    fn datetime_formats() {
        assert_eq!(
            try_parse_datetime("2024-10-03T19:00:00Z").map(|d| d.date_naive().to_string()),
            Some("2024-10-03".to_string())
        );
        assert_eq!(
            try_parse_datetime("03/10/2024").map(|d| d.date_naive().to_string()),
            Some("2024-10-03".to_string())
        );
        assert_eq!(
            try_parse_datetime("2024-10-03 19:00:00").map(|d| d.date_naive().to_string()),
            Some("2024-10-03".to_string())
        );
        assert_eq!(
            try_parse_datetime("Oct 03, 2024").map(|d| d.date_naive().to_string()),
            Some("2024-10-03".to_string())
        );
        assert_eq!(try_parse_datetime("not a date"), None);
    }

    #[test]
    fn birth_date_formats() {
        let expected = NaiveDate::from_ymd_opt(1998, 3, 12);
        assert_eq!(parse_birth_date("1998-03-12"), expected);
        assert_eq!(parse_birth_date("12/03/1998"), expected);
        assert_eq!(parse_birth_date("12.03.1998"), expected);
        assert_eq!(parse_birth_date("12 March, 1998"), expected);
        assert_eq!(parse_birth_date(""), None);
        assert_eq!(parse_birth_date("March 1998"), None);
    }

    #[test]
    fn height_meters_and_centimeters() {
        assert_eq!(parse_height_cm("2.02"), Some(202));
        assert_eq!(parse_height_cm("1,93"), Some(193));
        assert_eq!(parse_height_cm("193"), Some(193));
        assert_eq!(parse_height_cm(""), None);
        assert_eq!(parse_height_cm("tall"), None);
    }

    #[test]
    fn height_conversion_is_injective_at_cm_granularity() {
        let mut last = 0;
        for cm in 150..=230 {
            let meters = format!("{:.2}", f64::from(cm) / 100.0);
            let converted = parse_height_cm(&meters).unwrap();
            assert!(converted > last);
            last = converted;
        }
    }

    #[test]
    fn season_names() {
        assert_eq!(season_name_from_start_year(2024), "2024-25");
        assert_eq!(season_name_from_start_year(1999), "1999-00");
        assert_eq!(season_years_from_name("2024-25"), Some((2024, 2025)));
        assert_eq!(season_years_from_name("1999-00"), Some((1999, 2000)));
        assert_eq!(season_years_from_name("2024"), Some((2024, 2025)));
        assert_eq!(season_years_from_name("bad"), None);
    }
}
