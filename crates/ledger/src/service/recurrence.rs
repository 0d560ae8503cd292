use std::collections::HashMap;

use chrono::{Datelike as _, Months, NaiveDate, Weekday};

/// Dates a recurrence rule expands to: every day after the template's date
/// (exclusive) up to `months` ahead (exclusive) whose weekday is in the
/// set, capped at `times_per_week` per ISO week. A zero quota means no
/// weekly cap.
pub fn expand_dates(
    template_date: NaiveDate,
    weekdays: &[Weekday],
    months: u32,
    times_per_week: u32,
) -> Vec<NaiveDate> {
    let Some(horizon) = template_date.checked_add_months(Months::new(months)) else {
        return Vec::new();
    };

    let mut week_count: HashMap<(i32, u32), u32> = HashMap::new();
    let mut dates = Vec::new();
    let mut day = template_date + chrono::Duration::days(1);
    while day < horizon {
        if weekdays.contains(&day.weekday()) {
            let week = day.iso_week();
            let count = week_count.entry((week.year(), week.week())).or_insert(0);
            if times_per_week == 0 || *count < times_per_week {
                *count += 1;
                dates.push(day);
            }
        }
        day += chrono::Duration::days(1);
    }
    dates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_monday_only_over_one_month() {
        // 2024-06-10 is a Monday; the template's own date is excluded
        let dates = expand_dates(date(2024, 6, 10), &[Weekday::Mon], 1, 1);
        assert_eq!(
            vec![
                date(2024, 6, 17),
                date(2024, 6, 24),
                date(2024, 7, 1),
                date(2024, 7, 8),
            ],
            dates
        );
    }

    #[test]
    fn test_month_length_yields_four_or_five() {
        // starting late in a 31-day month picks up an extra Monday
        let dates = expand_dates(date(2024, 7, 1), &[Weekday::Mon], 1, 1);
        assert_eq!(4, dates.len());

        let dates = expand_dates(date(2024, 6, 3), &[Weekday::Mon], 1, 1);
        assert_eq!(4, dates.len());

        // five Mondays fit between 2024-06-30 and 2024-07-30
        let dates = expand_dates(date(2024, 6, 30), &[Weekday::Mon], 1, 1);
        assert_eq!(5, dates.len());
    }

    #[test]
    fn test_times_per_week_caps_each_iso_week() {
        let dates = expand_dates(
            date(2024, 6, 10),
            &[Weekday::Mon, Weekday::Wed, Weekday::Fri],
            1,
            2,
        );
        // first week: template Monday excluded, Wed + Fri chosen
        assert_eq!(date(2024, 6, 12), dates[0]);
        assert_eq!(date(2024, 6, 14), dates[1]);
        // later weeks: Mon + Wed, Friday over quota
        assert_eq!(date(2024, 6, 17), dates[2]);
        assert_eq!(date(2024, 6, 19), dates[3]);
        assert!(!dates.contains(&date(2024, 6, 21)));
    }

    #[test]
    fn test_two_month_horizon() {
        let dates = expand_dates(date(2024, 6, 10), &[Weekday::Mon], 2, 1);
        assert_eq!(8, dates.len());
        assert!(dates.iter().all(|d| d.weekday() == Weekday::Mon));
        assert!(dates.iter().all(|d| *d > date(2024, 6, 10)));
        assert!(dates.iter().all(|d| *d < date(2024, 8, 10)));
    }

    #[test]
    fn test_zero_quota_means_no_weekly_cap() {
        let dates = expand_dates(date(2024, 6, 10), &[Weekday::Mon, Weekday::Wed], 1, 0);
        // every Monday and Wednesday in the window, none dropped
        assert_eq!(8, dates.len());
    }

    #[test]
    fn test_long_daily_rule_exceeds_one_batch() {
        let every_day = [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ];
        let dates = expand_dates(date(2024, 6, 10), &every_day, 120, 0);
        // the expansion itself is unbounded, the batch cap lives in the
        // booking operation
        assert!(dates.len() > crate::service::availability::MAX_GENERATED_RECORDS);
    }
}
