use chrono::{Local, NaiveDate, TimeZone};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use crate::calendar::{AggregationError, MonthCalendarData, build_year_calendar};
use crate::dates::end_of_day_millis;
use crate::models::ExerciseLog;
use crate::storage::{ExerciseLogSource, StoreError};

#[derive(Debug)]
pub enum LoadOutcome {
    Loaded { months: usize },
    Failed(String),
}

struct PendingLoad {
    receiver: Receiver<Result<Vec<MonthCalendarData>, StoreError>>,
    cancelled: Arc<AtomicBool>,
}

impl Drop for PendingLoad {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }
}

/// State behind the history screen: the published month list and the
/// selected day's query timestamp.
pub struct HistoryViewModel<S, Tz: TimeZone = Local> {
    source: Arc<S>,
    tz: Tz,
    months: Vec<MonthCalendarData>,
    selected_timestamp: Option<i64>,
    pending: Option<PendingLoad>,
}

impl<S> HistoryViewModel<S, Local>
where
    S: ExerciseLogSource + Send + Sync + 'static,
{
    pub fn new(source: Arc<S>) -> Self {
        Self::with_time_zone(source, Local)
    }
}

impl<S, Tz> HistoryViewModel<S, Tz>
where
    S: ExerciseLogSource + Send + Sync + 'static,
    Tz: TimeZone + Send + 'static,
{
    pub fn with_time_zone(source: Arc<S>, tz: Tz) -> Self {
        Self {
            source,
            tz,
            months: Vec::new(),
            selected_timestamp: None,
            pending: None,
        }
    }

    /// Starts a background aggregation for the year of `today`. A load already
    /// in flight is cancelled and its result discarded.
    pub fn load_calendar_data(&mut self, today: NaiveDate) {
        let (sender, receiver) = mpsc::channel();
        let cancelled = Arc::new(AtomicBool::new(false));
        let source = Arc::clone(&self.source);
        let tz = self.tz.clone();
        let flag = Arc::clone(&cancelled);

        // Replacing the pending load drops the old one, which cancels it.
        self.pending = Some(PendingLoad {
            receiver,
            cancelled,
        });

        tracing::info!(%today, "loading calendar data");
        thread::spawn(move || {
            match build_year_calendar(today, &tz, source.as_ref(), &flag) {
                Ok(months) => {
                    let _ = sender.send(Ok(months));
                }
                Err(AggregationError::Store(err)) => {
                    let _ = sender.send(Err(err));
                }
                Err(AggregationError::Cancelled) => {
                    tracing::debug!(%today, "calendar load cancelled");
                }
            }
        });
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Publishes a finished load. Never blocks.
    pub fn poll(&mut self) -> Option<LoadOutcome> {
        let pending = self.pending.as_ref()?;
        let result = match pending.receiver.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => {
                self.pending = None;
                tracing::warn!("calendar worker exited without a result");
                return Some(LoadOutcome::Failed("Calendar load was interrupted.".to_string()));
            }
        };
        self.pending = None;

        match result {
            Ok(months) => {
                let count = months.len();
                self.months = months;
                tracing::info!(months = count, "calendar data published");
                Some(LoadOutcome::Loaded { months: count })
            }
            Err(err) => {
                tracing::error!(error = %err, "calendar load failed");
                Some(LoadOutcome::Failed(err.to_string()))
            }
        }
    }

    #[cfg(test)]
    pub fn wait(&mut self) -> Option<LoadOutcome> {
        let pending = self.pending.as_ref()?;
        let result = pending.receiver.recv();
        self.pending = None;
        match result {
            Ok(Ok(months)) => {
                let count = months.len();
                self.months = months;
                Some(LoadOutcome::Loaded { months: count })
            }
            Ok(Err(err)) => Some(LoadOutcome::Failed(err.to_string())),
            Err(_) => Some(LoadOutcome::Failed("Calendar load was interrupted.".to_string())),
        }
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn months(&self) -> &[MonthCalendarData] {
        &self.months
    }

    /// Stores and returns the end-of-day timestamp for `date`.
    pub fn set_selected_date(&mut self, date: NaiveDate) -> i64 {
        let timestamp = end_of_day_millis(date, &self.tz);
        self.selected_timestamp = Some(timestamp);
        timestamp
    }

    #[cfg(test)]
    pub fn selected_timestamp(&self) -> Option<i64> {
        self.selected_timestamp
    }

    pub fn selected_logs(&self) -> Result<Vec<ExerciseLog>, StoreError> {
        match self.selected_timestamp {
            Some(timestamp) => self.source.logs_by_date_time_stamp(timestamp),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::LogStore;
    use chrono::Utc;
    use std::sync::Mutex;
    use std::sync::mpsc::Sender;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn millis(value: &str) -> i64 {
        chrono::DateTime::parse_from_rfc3339(value)
            .unwrap()
            .timestamp_millis()
    }

    fn store() -> Arc<LogStore<Utc>> {
        let mut store = LogStore::in_memory(Utc);
        let plan = store.add_plan("Upper");
        let row = store.add_exercise(plan, "Row", Vec::new()).unwrap();
        for at in [
            "2024-06-14T22:00:00Z",
            "2024-06-15T06:00:00Z",
            "2024-06-15T21:15:00Z",
            "2024-06-16T00:00:01Z",
        ] {
            store.log_set(plan, row, 10, 50.0, millis(at)).unwrap();
        }
        Arc::new(store)
    }

    /// Blocks every query until released, so a test can observe a load in flight.
    struct GatedSource {
        gate: Mutex<Receiver<()>>,
        started: Mutex<Sender<()>>,
        fail: bool,
    }

    impl ExerciseLogSource for GatedSource {
        fn logs_between(&self, _: i64, _: i64) -> Result<Vec<ExerciseLog>, StoreError> {
            Ok(Vec::new())
        }

        fn logs_by_date_time_stamp(&self, timestamp: i64) -> Result<Vec<ExerciseLog>, StoreError> {
            let _ = self.started.lock().unwrap().send(());
            let _ = self.gate.lock().unwrap().recv();
            if self.fail {
                return Err(StoreError::InvalidTimestamp(timestamp));
            }
            Ok(Vec::new())
        }
    }

    #[test]
    fn load_publishes_whole_year() {
        let mut model = HistoryViewModel::with_time_zone(store(), Utc);
        model.load_calendar_data(date(2024, 6, 15));
        assert!(model.is_loading());

        let outcome = model.wait();
        assert!(matches!(outcome, Some(LoadOutcome::Loaded { months: 6 })));
        assert!(!model.is_loading());

        let june = &model.months()[5];
        assert_eq!(june.day(date(2024, 6, 15)).unwrap().exercise_activity_count, 2);
        assert_eq!(june.day(date(2024, 6, 14)).unwrap().exercise_activity_count, 1);
    }

    #[test]
    fn selected_date_matches_aggregated_count() {
        let mut model = HistoryViewModel::with_time_zone(store(), Utc);
        model.load_calendar_data(date(2024, 6, 15));
        model.wait();

        let timestamp = model.set_selected_date(date(2024, 6, 15));
        assert_eq!(timestamp, 1_718_495_999_000);
        assert_eq!(model.selected_timestamp(), Some(timestamp));

        let logs = model.selected_logs().unwrap();
        let count = model.months()[5]
            .day(date(2024, 6, 15))
            .unwrap()
            .exercise_activity_count;
        assert_eq!(logs.len(), count);
        assert!(logs.iter().all(|log| {
            log.finished_date_time >= millis("2024-06-15T00:00:00Z")
                && log.finished_date_time <= millis("2024-06-15T23:59:59Z")
        }));
    }

    #[test]
    fn failed_load_keeps_previous_months() {
        let (gate_tx, gate_rx) = mpsc::channel();
        let (started_tx, started_rx) = mpsc::channel();
        let source = Arc::new(GatedSource {
            gate: Mutex::new(gate_rx),
            started: Mutex::new(started_tx),
            fail: true,
        });
        let mut model = HistoryViewModel::with_time_zone(source, Utc);
        model.months = vec![MonthCalendarData {
            month: date(2024, 1, 1),
            daily_data_list: Vec::new(),
        }];

        model.load_calendar_data(date(2024, 1, 10));
        started_rx.recv().unwrap();
        assert!(model.poll().is_none());
        gate_tx.send(()).unwrap();

        let outcome = model.wait();
        assert!(matches!(outcome, Some(LoadOutcome::Failed(_))));
        assert_eq!(model.months().len(), 1);
    }

    #[test]
    fn cancelled_load_publishes_nothing() {
        let (gate_tx, gate_rx) = mpsc::channel();
        let (started_tx, started_rx) = mpsc::channel();
        let source = Arc::new(GatedSource {
            gate: Mutex::new(gate_rx),
            started: Mutex::new(started_tx),
            fail: false,
        });
        let mut model = HistoryViewModel::with_time_zone(source, Utc);

        model.load_calendar_data(date(2024, 1, 10));
        started_rx.recv().unwrap();
        model.cancel();
        assert!(!model.is_loading());
        drop(gate_tx);

        assert!(model.poll().is_none());
        assert!(model.months().is_empty());
    }
}
