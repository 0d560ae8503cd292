use chrono::{DateTime, Datelike as _, IsoWeek, Local, NaiveDate, TimeZone as _, Utc, Weekday};

/// A calendar day, normalized to local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DayId(DateTime<Utc>);

impl DayId {
    pub fn new(date_time: DateTime<Local>) -> Self {
        DayId::from_date(date_time.date_naive())
    }

    pub fn from_date(date: NaiveDate) -> Self {
        let midnight = date.and_hms_opt(0, 0, 0).unwrap_or_default();
        let local = Local
            .from_local_datetime(&midnight)
            .earliest()
            .unwrap_or_default();
        DayId(local.with_timezone(&Utc))
    }

    pub fn local(&self) -> DateTime<Local> {
        self.0.with_timezone(&Local)
    }

    pub fn id(&self) -> DateTime<Utc> {
        self.0
    }

    pub fn date(&self) -> NaiveDate {
        self.local().date_naive()
    }

    pub fn week_day(&self) -> Weekday {
        self.local().weekday()
    }

    pub fn iso_week(&self) -> IsoWeek {
        self.date().iso_week()
    }

    pub fn next(&self) -> Self {
        DayId::from_date(self.date() + chrono::Duration::days(1))
    }

    pub fn prev(&self) -> Self {
        DayId::from_date(self.date() - chrono::Duration::days(1))
    }
}

impl From<DateTime<Local>> for DayId {
    fn from(date_time: DateTime<Local>) -> Self {
        DayId::new(date_time)
    }
}

impl From<DateTime<Utc>> for DayId {
    fn from(date_time: DateTime<Utc>) -> Self {
        DayId::from(date_time.with_timezone(&Local))
    }
}

impl Default for DayId {
    fn default() -> Self {
        DayId::new(Local::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_day_id_roundtrip() {
        let date = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
        let day = DayId::from_date(date);
        assert_eq!(date, day.date());
        assert_eq!(Weekday::Mon, day.week_day());
        assert_eq!(date + chrono::Duration::days(1), day.next().date());
        assert_eq!(date - chrono::Duration::days(1), day.prev().date());
    }
}
