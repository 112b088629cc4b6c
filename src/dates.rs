use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone};

/// Epoch milliseconds of 23:59:59 on `date` in `tz`.
///
/// This is the single boundary used both to count a day's activity and to
/// fetch the day's log list, so the two always agree on what "that day" is.
pub fn end_of_day_millis<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> i64 {
    match local_datetime(tz, date, 23, 59, 59) {
        Some(end) => end.timestamp_millis(),
        None => start_of_day_millis(next_day(date), tz) - 1000,
    }
}

/// Epoch milliseconds of the first valid local instant on `date`.
pub fn start_of_day_millis<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> i64 {
    // Midnight can fall inside a DST gap in a few zones.
    (0..4)
        .find_map(|hour| local_datetime(tz, date, hour, 0, 0))
        .map(|start| start.timestamp_millis())
        .unwrap_or_else(|| date.and_time(NaiveTime::MIN).and_utc().timestamp_millis())
}

/// Half-open `[start, next_start)` millisecond bounds of the local day
/// containing `timestamp_millis`.
pub fn day_bounds_for_timestamp<Tz: TimeZone>(timestamp_millis: i64, tz: &Tz) -> Option<(i64, i64)> {
    let date = local_date_of_millis(timestamp_millis, tz)?;
    Some((
        start_of_day_millis(date, tz),
        start_of_day_millis(next_day(date), tz),
    ))
}

pub fn local_date_of_millis<Tz: TimeZone>(timestamp_millis: i64, tz: &Tz) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(timestamp_millis).map(|utc| utc.with_timezone(tz).date_naive())
}

pub fn first_day_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| "Invalid date format. Use YYYY-MM-DD.".to_string())
}

fn next_day(date: NaiveDate) -> NaiveDate {
    date.succ_opt().unwrap_or(date)
}

fn local_datetime<Tz: TimeZone>(
    tz: &Tz,
    date: NaiveDate,
    hour: u32,
    minute: u32,
    second: u32,
) -> Option<DateTime<Tz>> {
    let naive = date.and_hms_opt(hour, minute, second)?;
    tz.from_local_datetime(&naive).earliest()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, Utc};

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn parse_date_valid() {
        let date = parse_date("2026-02-03").unwrap();
        assert_eq!(date.year(), 2026);
        assert_eq!(date.month(), 2);
        assert_eq!(date.day(), 3);
    }

    #[test]
    fn parse_date_invalid() {
        assert!(parse_date("02-03-2026").is_err());
    }

    #[test]
    fn end_of_day_in_utc() {
        assert_eq!(end_of_day_millis(date(2024, 6, 15), &Utc), 1_718_495_999_000);
    }

    #[test]
    fn end_of_day_respects_offset() {
        let tz = FixedOffset::east_opt(2 * 3600).unwrap();
        assert_eq!(end_of_day_millis(date(2024, 6, 15), &tz), 1_718_488_799_000);
    }

    #[test]
    fn end_of_day_is_stable() {
        let first = end_of_day_millis(date(2024, 2, 29), &chrono::Local);
        let second = end_of_day_millis(date(2024, 2, 29), &chrono::Local);
        assert_eq!(first, second);
    }

    #[test]
    fn day_bounds_cover_the_whole_local_day() {
        let end = end_of_day_millis(date(2024, 6, 15), &Utc);
        let (start, next) = day_bounds_for_timestamp(end, &Utc).unwrap();
        assert_eq!(start, 1_718_409_600_000);
        assert_eq!(next, start + 86_400_000);
        assert!(end >= start && end < next);
    }

    #[test]
    fn local_date_of_end_of_day_round_trips() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        let day = date(2024, 12, 31);
        let end = end_of_day_millis(day, &tz);
        assert_eq!(local_date_of_millis(end, &tz), Some(day));
    }

    #[test]
    fn local_datetime_resolves_in_any_zone() {
        fn noon<Tz: TimeZone>(tz: &Tz) -> Option<i64> {
            local_datetime(tz, date(2024, 6, 15), 12, 0, 0).map(|value| value.timestamp_millis())
        }
        assert_eq!(noon(&Utc), Some(1_718_452_800_000));
        assert_eq!(noon(&FixedOffset::east_opt(3600).unwrap()), Some(1_718_449_200_000));
    }

    #[test]
    fn first_day_of_month_resets_day() {
        assert_eq!(first_day_of_month(date(2024, 2, 29)), date(2024, 2, 1));
    }
}
