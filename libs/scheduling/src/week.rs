//! Monday-start week arithmetic.
//!
//! Week boundaries are computed as Monday-start regardless of locale; the
//! weekly views key their groupings by these English day names.

use chrono::{Datelike, Duration, NaiveDate};

/// Day names in week order, Monday first.
pub const WEEKDAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// The Monday of the week containing `date`.
pub fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Inclusive `[Monday, Sunday]` bounds of the week containing `date`.
pub fn week_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = monday_of(date);
    (start, start + Duration::days(6))
}

pub fn weekday_name(date: NaiveDate) -> &'static str {
    WEEKDAY_NAMES[date.weekday().num_days_from_monday() as usize]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn monday_is_its_own_week_start() {
        assert_eq!(monday_of(d("2025-06-02")), d("2025-06-02"));
    }

    #[test]
    fn every_day_of_a_week_maps_to_the_same_monday() {
        for offset in 0..7 {
            let date = d("2025-06-02") + Duration::days(offset);
            assert_eq!(monday_of(date), d("2025-06-02"));
        }
    }

    #[test]
    fn sunday_belongs_to_the_preceding_monday() {
        assert_eq!(monday_of(d("2025-06-08")), d("2025-06-02"));
    }

    #[test]
    fn bounds_span_seven_days() {
        let (start, end) = week_bounds(d("2025-06-05"));
        assert_eq!(start, d("2025-06-02"));
        assert_eq!(end, d("2025-06-08"));
    }

    #[test]
    fn day_names_follow_the_monday_start_order() {
        assert_eq!(weekday_name(d("2025-06-02")), "Monday");
        assert_eq!(weekday_name(d("2025-06-07")), "Saturday");
        assert_eq!(weekday_name(d("2025-06-08")), "Sunday");
    }
}
