use chrono::{Datelike, Months, NaiveDate, TimeZone};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

use crate::dates::{
    end_of_day_millis, first_day_of_month, local_date_of_millis, start_of_day_millis,
};
use crate::storage::{ExerciseLogSource, StoreError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCalendarData {
    pub day: NaiveDate,
    pub is_future_date: bool,
    pub exercise_activity_count: usize,
}

impl DayCalendarData {
    pub fn has_activity(&self) -> bool {
        self.exercise_activity_count > 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthCalendarData {
    /// First day of the month.
    pub month: NaiveDate,
    pub daily_data_list: Vec<DayCalendarData>,
}

impl MonthCalendarData {
    pub fn label(&self) -> String {
        self.month.format("%B %Y").to_string()
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DayCalendarData> {
        if date.year() != self.month.year() || date.month() != self.month.month() {
            return None;
        }
        self.daily_data_list.get(date.day0() as usize)
    }
}

#[derive(Debug, Error)]
pub enum AggregationError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Calendar load cancelled")]
    Cancelled,
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let Some(start) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return 0;
    };
    match start.checked_add_months(Months::new(1)) {
        Some(next) => next.signed_duration_since(start).num_days() as u32,
        None => 31,
    }
}

/// One entry per month from January through `today`'s month, one query per
/// day. `cancelled` is checked before every day.
pub fn build_year_calendar<Tz, S>(
    today: NaiveDate,
    tz: &Tz,
    source: &S,
    cancelled: &AtomicBool,
) -> Result<Vec<MonthCalendarData>, AggregationError>
where
    Tz: TimeZone,
    S: ExerciseLogSource + ?Sized,
{
    aggregate_months(today, tz, source, cancelled)?.ok_or(AggregationError::Cancelled)
}

fn aggregate_months<Tz, S>(
    today: NaiveDate,
    tz: &Tz,
    source: &S,
    cancelled: &AtomicBool,
) -> Result<Option<Vec<MonthCalendarData>>, StoreError>
where
    Tz: TimeZone,
    S: ExerciseLogSource + ?Sized,
{
    let mut months = Vec::new();
    for month in 1..=today.month() {
        let Some(start) = NaiveDate::from_ymd_opt(today.year(), month, 1) else {
            continue;
        };
        let total_days = days_in_month(today.year(), month);
        let mut daily_data_list = Vec::with_capacity(total_days as usize);
        for day in 1..=total_days {
            if cancelled.load(Ordering::Relaxed) {
                return Ok(None);
            }
            let Some(date) = NaiveDate::from_ymd_opt(today.year(), month, day) else {
                continue;
            };
            let logs = source.logs_by_date_time_stamp(end_of_day_millis(date, tz))?;
            daily_data_list.push(DayCalendarData {
                day: date,
                is_future_date: date > today,
                exercise_activity_count: logs.len(),
            });
        }
        months.push(MonthCalendarData {
            month: start,
            daily_data_list,
        });
    }
    Ok(Some(months))
}

/// Same counts as [`build_year_calendar`] from a single range query.
pub fn build_year_calendar_batched<Tz, S>(
    today: NaiveDate,
    tz: &Tz,
    source: &S,
) -> Result<Vec<MonthCalendarData>, StoreError>
where
    Tz: TimeZone,
    S: ExerciseLogSource + ?Sized,
{
    let Some(year_start) = NaiveDate::from_ymd_opt(today.year(), 1, 1) else {
        return Ok(Vec::new());
    };
    let Some(range_end) = first_day_of_month(today).checked_add_months(Months::new(1)) else {
        return Ok(Vec::new());
    };

    let logs = source.logs_between(
        start_of_day_millis(year_start, tz),
        start_of_day_millis(range_end, tz),
    )?;

    let mut counts: HashMap<NaiveDate, usize> = HashMap::new();
    for log in &logs {
        if let Some(date) = local_date_of_millis(log.finished_date_time, tz) {
            *counts.entry(date).or_insert(0) += 1;
        }
    }

    let mut months = Vec::new();
    for month in 1..=today.month() {
        let Some(start) = NaiveDate::from_ymd_opt(today.year(), month, 1) else {
            continue;
        };
        let daily_data_list = start
            .iter_days()
            .take(days_in_month(today.year(), month) as usize)
            .map(|date| DayCalendarData {
                day: date,
                is_future_date: date > today,
                exercise_activity_count: *counts.get(&date).unwrap_or(&0),
            })
            .collect();
        months.push(MonthCalendarData {
            month: start,
            daily_data_list,
        });
    }
    Ok(months)
}
