use chrono::{Datelike, Duration, NaiveDate};

use crate::config::Locale;

const MONTHS_RU_GENITIVE: [&str; 12] = [
    "января",
    "февраля",
    "марта",
    "апреля",
    "мая",
    "июня",
    "июля",
    "августа",
    "сентября",
    "октября",
    "ноября",
    "декабря",
];

const MONTHS_EN: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// The day before `today`.
pub fn yesterday(today: NaiveDate) -> NaiveDate {
    today - Duration::days(1)
}

/// Monday of the week containing `d`.
pub fn week_start(d: NaiveDate) -> NaiveDate {
    d - Duration::days(d.weekday().num_days_from_monday() as i64)
}

/// Inclusive `[today - days, today - 1]` window used by the weekly digests.
pub fn trailing_window(today: NaiveDate, days: u32) -> (NaiveDate, NaiveDate) {
    (today - Duration::days(days as i64), yesterday(today))
}

/// Render a date as `<dd> <month> <yyyy>`, e.g. `05 июля 2025`.
pub fn format_report_date(d: NaiveDate, locale: Locale) -> String {
    let idx = d.month0() as usize;
    let month = match locale {
        Locale::Ru => MONTHS_RU_GENITIVE[idx],
        Locale::En => MONTHS_EN[idx],
    };
    format!("{:02} {} {}", d.day(), month, d.year())
}

pub fn format_iso(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// Parse a `YYYY-MM-DD` day string as returned by the store.
pub fn parse_iso(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()
}

/// Russian plural of "day" for a count.
pub fn ru_days(n: u32) -> &'static str {
    let rem100 = n % 100;
    let rem10 = n % 10;
    if (11..=14).contains(&rem100) {
        "дней"
    } else if rem10 == 1 {
        "день"
    } else if (2..=4).contains(&rem10) {
        "дня"
    } else {
        "дней"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_week_start() {
        // 2025-07-16 is a Wednesday
        assert_eq!(week_start(d(2025, 7, 16)), d(2025, 7, 14));
        assert_eq!(week_start(d(2025, 7, 14)), d(2025, 7, 14));
        assert_eq!(week_start(d(2025, 7, 20)), d(2025, 7, 14));
    }

    #[test]
    fn test_trailing_window_excludes_today() {
        let (start, end) = trailing_window(d(2025, 7, 18), 8);
        assert_eq!(start, d(2025, 7, 10));
        assert_eq!(end, d(2025, 7, 17));
    }

    #[test]
    fn test_format_report_date_ru() {
        assert_eq!(format_report_date(d(2025, 7, 5), Locale::Ru), "05 июля 2025");
        assert_eq!(
            format_report_date(d(2024, 12, 31), Locale::Ru),
            "31 декабря 2024"
        );
    }

    #[test]
    fn test_format_report_date_en() {
        assert_eq!(format_report_date(d(2025, 3, 9), Locale::En), "09 March 2025");
    }

    #[test]
    fn test_parse_iso() {
        assert_eq!(parse_iso("2025-07-05"), Some(d(2025, 7, 5)));
        assert_eq!(parse_iso(" 2025-07-05 "), Some(d(2025, 7, 5)));
        assert_eq!(parse_iso("05.07.2025"), None);
    }

    #[test]
    fn test_ru_days() {
        assert_eq!(ru_days(1), "день");
        assert_eq!(ru_days(3), "дня");
        assert_eq!(ru_days(7), "дней");
        assert_eq!(ru_days(11), "дней");
        assert_eq!(ru_days(21), "день");
        assert_eq!(ru_days(24), "дня");
    }
}
